#[cfg(test)]
mod tests {
    use chrono::{DateTime, Datelike, Duration, NaiveDate, NaiveTime, Utc};
    use opsdesk_common::models::{
        buffered_overlap, AvailabilityDay, Meeting, TimeOff, TimeRange, ALLOWED_DURATIONS,
    };
    use proptest::prelude::*;

    use crate::availability::SchedulingContext;
    use crate::test_support::{at, meeting, utc_settings, OPERATOR};

    // One week starting on Sunday 2025-06-01, all in UTC.
    fn first_day() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 6, 1).unwrap()
    }

    fn week(enabled: &[bool], start_hours: &[u32], end_hours: &[u32]) -> Vec<AvailabilityDay> {
        (0..7u8)
            .map(|day| {
                let i = usize::from(day);
                AvailabilityDay {
                    operator_id: OPERATOR.to_string(),
                    day_of_week: day,
                    enabled: enabled[i],
                    intervals: vec![TimeRange::hours(start_hours[i], end_hours[i])],
                }
            })
            .collect()
    }

    fn booked(offsets: &[(i64, usize)]) -> Vec<Meeting> {
        offsets
            .iter()
            .enumerate()
            .map(|(i, (quarter_hours, duration_index))| {
                let start = at(2025, 6, 1, 0, 0) + Duration::minutes(15 * quarter_hours);
                meeting(&format!("m-{i}"), start, ALLOWED_DURATIONS[*duration_index])
            })
            .collect()
    }

    fn time_off(ranges: &[(i64, i64)]) -> Vec<TimeOff> {
        ranges
            .iter()
            .enumerate()
            .map(|(i, (start_hours, length_hours))| {
                let start = at(2025, 6, 1, 0, 0) + Duration::hours(*start_hours);
                TimeOff {
                    id: format!("t-{i}"),
                    operator_id: OPERATOR.to_string(),
                    title: "Away".to_string(),
                    reason: None,
                    start_at: start,
                    end_at: start + Duration::hours(*length_hours),
                    recurring: false,
                }
            })
            .collect()
    }

    fn interval_end(days: &[AvailabilityDay], at: DateTime<Utc>) -> NaiveTime {
        let day = &days[at.weekday().num_days_from_sunday() as usize];
        day.intervals[0].end
    }

    proptest! {
        #[test]
        fn test_produced_slots_honour_every_rule(
            enabled in proptest::collection::vec(any::<bool>(), 7),
            start_hours in proptest::collection::vec(6u32..12, 7),
            end_hours in proptest::collection::vec(13u32..21, 7),
            duration_index in 0usize..3,
            buffer_before in 0i64..45,
            buffer_after in 0i64..45,
            notice_hours in 0i64..48,
            now_offset_minutes in 0i64..(24 * 60),
            meetings in proptest::collection::vec((0i64..(7 * 96), 0usize..3), 0..8),
            blackouts in proptest::collection::vec((0i64..(7 * 24), 1i64..6), 0..3),
        ) {
            let mut settings = utc_settings();
            settings.buffer_before_minutes = buffer_before;
            settings.buffer_after_minutes = buffer_after;
            settings.min_notice_value = notice_hours;

            let days = week(&enabled, &start_hours, &end_hours);
            let meetings = booked(&meetings);
            let blackouts = time_off(&blackouts);
            let duration = ALLOWED_DURATIONS[duration_index];
            let now = at(2025, 5, 31, 0, 0) + Duration::minutes(now_offset_minutes);

            let ctx = SchedulingContext::new(settings, &days, blackouts.clone(), &meetings, vec![]);
            let last_day = first_day() + Duration::days(6);

            for slot in ctx.slots(first_day(), last_day, duration, now) {
                let start = slot.datetime;
                let end = slot.end();
                let day = start.weekday().num_days_from_sunday() as usize;

                prop_assert!(enabled[day], "slot on disabled day {}", day);
                prop_assert!(end.time() <= interval_end(&days, start));
                prop_assert!(start >= now + Duration::hours(notice_hours));
                prop_assert!(!blackouts.iter().any(|t| t.overlaps(start, end)));
                prop_assert!(!meetings.iter().any(|m| buffered_overlap(
                    m.start_at,
                    m.end_at,
                    start,
                    end,
                    Duration::minutes(buffer_before),
                    Duration::minutes(buffer_after),
                )));
                prop_assert!(ctx.check_slot(start, duration, now).is_ok());
            }
        }

        #[test]
        fn test_check_slot_rejects_off_grid_starts(
            quarter in 0i64..(7 * 96),
            duration_index in 1usize..3,
        ) {
            let ctx = SchedulingContext::new(
                utc_settings(),
                &AvailabilityDay::default_week(OPERATOR),
                vec![],
                &[],
                vec![],
            );
            let now = at(2025, 5, 20, 0, 0);
            let duration = ALLOWED_DURATIONS[duration_index];
            let start = at(2025, 6, 1, 0, 0) + Duration::minutes(15 * quarter);

            let offered = ctx
                .slots(first_day(), first_day() + Duration::days(6), duration, now)
                .any(|slot| slot.datetime == start);
            prop_assert_eq!(ctx.check_slot(start, duration, now).is_ok(), offered);
        }
    }
}
