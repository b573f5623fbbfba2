// --- File: crates/opsdesk_meetings/src/availability.rs ---
//! Availability engine.
//!
//! A [`SchedulingContext`] holds everything that decides whether a slot can be
//! offered: the operator's settings, weekly hours, time off, active meetings
//! and any busy time reported by an external calendar. From it,
//! [`SchedulingContext::slots`] yields a lazy, restartable sequence of slots
//! and [`SchedulingContext::check_slot`] answers the same question for one
//! requested start time.
//!
//! Slots tile each configured interval from its start in steps of the slot
//! duration, in the operator's local time. A slot is offered when it is far
//! enough ahead (`min_notice`), not too far ahead (`max_days_in_advance`),
//! clear of time off, and clear of every active meeting padded by the buffers.

use chrono::{DateTime, Datelike, Duration, NaiveDate, NaiveTime, TimeZone, Utc};
use chrono_tz::Tz;
use opsdesk_common::models::{
    buffered_overlap, AvailabilityDay, Meeting, OperatorMeetingSettings, TimeOff, TimeRange,
    ALLOWED_DURATIONS,
};
use opsdesk_common::services::BusyInterval;
use opsdesk_db::SchedulingStore;
use tracing::debug;

use crate::error::MeetingError;
use crate::models::Slot;

/// An active meeting as the engine sees it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BookedBlock {
    pub meeting_id: String,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct SchedulingContext {
    pub settings: OperatorMeetingSettings,
    tz: Tz,
    /// Indexed by day of week, Sunday first. Empty for disabled days.
    week: [Vec<TimeRange>; 7],
    time_off: Vec<TimeOff>,
    booked: Vec<BookedBlock>,
    external_busy: Vec<BusyInterval>,
}

impl SchedulingContext {
    pub fn new(
        settings: OperatorMeetingSettings,
        availability: &[AvailabilityDay],
        time_off: Vec<TimeOff>,
        meetings: &[Meeting],
        external_busy: Vec<BusyInterval>,
    ) -> Self {
        let mut week: [Vec<TimeRange>; 7] = Default::default();
        for day in availability.iter().filter(|d| d.enabled && d.day_of_week < 7) {
            let mut intervals = day.intervals.clone();
            intervals.sort_by_key(|range| range.start);
            week[usize::from(day.day_of_week)] = intervals;
        }

        let booked = meetings
            .iter()
            .filter(|m| m.status.is_active())
            .map(|m| BookedBlock {
                meeting_id: m.id.clone(),
                start: m.start_at,
                end: m.end_at,
            })
            .collect();

        Self {
            tz: settings.tz(),
            settings,
            week,
            time_off,
            booked,
            external_busy,
        }
    }

    /// Drops a meeting from the conflict set, for moving it elsewhere.
    pub fn excluding_meeting(mut self, meeting_id: &str) -> Self {
        self.booked.retain(|block| block.meeting_id != meeting_id);
        self
    }

    pub fn tz(&self) -> Tz {
        self.tz
    }

    fn intervals_for(&self, date: NaiveDate) -> &[TimeRange] {
        &self.week[date.weekday().num_days_from_sunday() as usize]
    }

    fn localize(&self, date: NaiveDate, time: NaiveTime) -> Option<DateTime<Utc>> {
        self.tz
            .from_local_datetime(&date.and_time(time))
            .earliest()
            .map(|local| local.with_timezone(&Utc))
    }

    /// Rejections that depend only on when the slot starts relative to `now`.
    fn timing_rejection(&self, start: DateTime<Utc>, now: DateTime<Utc>) -> Option<MeetingError> {
        if start < now + self.settings.min_notice() {
            return Some(MeetingError::NoticePeriodViolation(format!(
                "{} {}",
                self.settings.min_notice_value,
                self.settings.min_notice_unit.as_str()
            )));
        }
        if start > now + Duration::days(self.settings.max_days_in_advance) {
            return Some(MeetingError::BeyondBookingWindow {
                max_days: self.settings.max_days_in_advance,
            });
        }
        None
    }

    /// Whether `[start, end)` hits time off, a padded meeting or external busy time.
    fn is_blocked(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> bool {
        if self.time_off.iter().any(|t| t.overlaps(start, end)) {
            return true;
        }
        let before = self.settings.buffer_before();
        let after = self.settings.buffer_after();
        if self
            .booked
            .iter()
            .any(|b| buffered_overlap(b.start, b.end, start, end, before, after))
        {
            return true;
        }
        self.external_busy
            .iter()
            .any(|busy| start < busy.end && end > busy.start)
    }

    fn offer(
        &self,
        date: NaiveDate,
        time: NaiveTime,
        duration: Duration,
        now: DateTime<Utc>,
    ) -> Option<Slot> {
        let start = self.localize(date, time)?;
        let end = start + duration;
        if self.timing_rejection(start, now).is_some() || self.is_blocked(start, end) {
            return None;
        }
        Some(self.format_slot(start, duration))
    }

    fn format_slot(&self, start: DateTime<Utc>, duration: Duration) -> Slot {
        let local = start.with_timezone(&self.tz);
        Slot {
            datetime: start,
            duration: duration.num_minutes(),
            formatted_date: local.format("%A, %B %-d, %Y").to_string(),
            formatted_time: local.format("%H:%M").to_string(),
        }
    }

    /// Bookable slots on the local days `from..=to`, in chronological order.
    pub fn slots(
        &self,
        from: NaiveDate,
        to: NaiveDate,
        duration_minutes: i64,
        now: DateTime<Utc>,
    ) -> SlotIter<'_> {
        SlotIter {
            ctx: self,
            now,
            duration: Duration::minutes(duration_minutes),
            day: from,
            // A non-positive duration would never advance.
            last_day: if duration_minutes > 0 { to } else { NaiveDate::MIN },
            interval: 0,
            cursor: None,
        }
    }

    /// Single-slot feasibility, with the same rules [`Self::slots`] applies.
    pub fn check_slot(
        &self,
        start: DateTime<Utc>,
        duration_minutes: i64,
        now: DateTime<Utc>,
    ) -> Result<(), MeetingError> {
        if !ALLOWED_DURATIONS.contains(&duration_minutes) {
            return Err(MeetingError::InvalidDuration(duration_minutes));
        }
        let duration = Duration::minutes(duration_minutes);

        if let Some(err) = self.timing_rejection(start, now) {
            return Err(err);
        }

        let local = start.with_timezone(&self.tz);
        let on_grid = self
            .intervals_for(local.date_naive())
            .iter()
            .any(|range| fits_grid(*range, local.time(), duration));
        if !on_grid {
            debug!(%start, "Requested start is outside the operator's hours");
            return Err(MeetingError::SlotUnavailable);
        }

        if self.is_blocked(start, start + duration) {
            return Err(MeetingError::SlotUnavailable);
        }
        Ok(())
    }
}

/// Whether `time` is one of the tiles of `range` for this duration.
fn fits_grid(range: TimeRange, time: NaiveTime, duration: Duration) -> bool {
    if time < range.start {
        return false;
    }
    let (end, wrapped) = time.overflowing_add_signed(duration);
    if wrapped != 0 || end > range.end {
        return false;
    }
    let offset = time - range.start;
    offset.num_milliseconds() % duration.num_milliseconds() == 0
}

/// Lazy slot sequence over a date range. Holds no state beyond its position,
/// so calling [`SchedulingContext::slots`] again starts a fresh pass.
#[derive(Debug, Clone)]
pub struct SlotIter<'a> {
    ctx: &'a SchedulingContext,
    now: DateTime<Utc>,
    duration: Duration,
    day: NaiveDate,
    last_day: NaiveDate,
    interval: usize,
    cursor: Option<NaiveTime>,
}

impl Iterator for SlotIter<'_> {
    type Item = Slot;

    fn next(&mut self) -> Option<Slot> {
        while self.day <= self.last_day {
            let Some(range) = self.ctx.intervals_for(self.day).get(self.interval).copied() else {
                self.day = self.day.succ_opt()?;
                self.interval = 0;
                self.cursor = None;
                continue;
            };

            let start = self.cursor.unwrap_or(range.start);
            let (end, wrapped) = start.overflowing_add_signed(self.duration);
            if wrapped != 0 || end > range.end {
                self.interval += 1;
                self.cursor = None;
                continue;
            }
            self.cursor = Some(end);

            if let Some(slot) = self.ctx.offer(self.day, start, self.duration, self.now) {
                return Some(slot);
            }
        }
        None
    }
}

/// Parses and bounds a `YYYY-MM-DD` range. `end_date` is inclusive.
pub fn parse_date_range(
    start_date: &str,
    end_date: &str,
    max_range_days: i64,
) -> Result<(NaiveDate, NaiveDate), MeetingError> {
    let parse = |raw: &str| {
        NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
            .map_err(|_| MeetingError::InvalidDateRange(format!("'{raw}' is not a YYYY-MM-DD date")))
    };
    let start = parse(start_date)?;
    let end = parse(end_date)?;
    if end < start {
        return Err(MeetingError::InvalidDateRange(
            "end_date is before start_date".to_string(),
        ));
    }
    if (end - start).num_days() > max_range_days {
        return Err(MeetingError::RangeTooLarge {
            max_days: max_range_days,
        });
    }
    Ok((start, end))
}

/// UTC bounds of a local calendar day.
pub fn local_day_bounds(tz: Tz, date: NaiveDate) -> (DateTime<Utc>, DateTime<Utc>) {
    let midnight = |d: NaiveDate| {
        tz.from_local_datetime(&d.and_time(NaiveTime::MIN))
            .earliest()
            .map(|local| local.with_timezone(&Utc))
            .unwrap_or_else(|| Utc.from_utc_datetime(&d.and_time(NaiveTime::MIN)))
    };
    let next = date.succ_opt().unwrap_or(date);
    (midnight(date), midnight(next))
}

/// Loads the context for slots in `[from, to)`.
///
/// Settings and the weekly schedule are seeded with defaults on first access.
/// The meeting window is widened by a day on each side so buffers around
/// neighbouring meetings are seen.
pub async fn load_context<S: SchedulingStore>(
    store: &S,
    settings: OperatorMeetingSettings,
    from: DateTime<Utc>,
    to: DateTime<Utc>,
    external_busy: Vec<BusyInterval>,
) -> Result<SchedulingContext, MeetingError> {
    let operator_id = settings.operator_id.clone();
    let week = store
        .get_or_init_availability(&operator_id, AvailabilityDay::default_week(&operator_id))
        .await?;
    let time_off = store.list_time_off(&operator_id).await?;
    let meetings = store
        .list_active_between(&operator_id, from - Duration::days(1), to + Duration::days(1))
        .await?;

    debug!(
        operator_id = %operator_id,
        meetings = meetings.len(),
        time_off = time_off.len(),
        external = external_busy.len(),
        "Loaded scheduling context"
    );
    Ok(SchedulingContext::new(
        settings,
        &week,
        time_off,
        &meetings,
        external_busy,
    ))
}
