use chrono::Duration;
use chrono::{DateTime, Utc};
use opsdesk_common::models::{ActorKind, MeetingStatus, ReminderKind};
use opsdesk_db::{Buffers, MeetingRepository, MemoryStore, StatusChange, WriteOutcome};
use std::sync::Arc;

use crate::dispatch::MeetingEvent;
use crate::reminders::ReminderScheduler;
use crate::test_support::{at, meeting, RecordingSink};

async fn store_with(meetings: &[(&str, DateTime<Utc>)]) -> MemoryStore {
    let store = MemoryStore::new();
    for (id, start) in meetings {
        let outcome = store
            .insert_meeting_guarded(meeting(id, *start, 30), Buffers::default())
            .await
            .unwrap();
        assert_eq!(outcome, WriteOutcome::Written);
    }
    store
}

fn reminder_kinds(sink: &RecordingSink) -> Vec<(String, ReminderKind)> {
    sink.events()
        .into_iter()
        .filter_map(|event| match event {
            MeetingEvent::Reminder { meeting, kind } => Some((meeting.id, kind)),
            _ => None,
        })
        .collect()
}

#[tokio::test]
async fn test_day_before_reminder_is_sent_once() {
    let now = at(2025, 6, 1, 12, 0);
    let store = store_with(&[
        ("tomorrow", at(2025, 6, 2, 10, 0)),
        ("later", at(2025, 6, 5, 10, 0)),
    ])
    .await;
    let sink = Arc::new(RecordingSink::default());
    let scheduler = ReminderScheduler::new(store.clone(), sink.clone());

    assert_eq!(scheduler.run_once(now).await.unwrap(), 1);
    assert_eq!(scheduler.run_once(now + Duration::minutes(5)).await.unwrap(), 0);

    assert_eq!(
        reminder_kinds(&sink),
        vec![("tomorrow".to_string(), ReminderKind::DayBefore)]
    );
    let stored = store.find_meeting("tomorrow").await.unwrap().unwrap();
    assert!(stored.reminder_24h_sent);
    assert!(!stored.reminder_1h_sent);
}

#[tokio::test]
async fn test_hour_before_follows_day_before() {
    let start = at(2025, 6, 2, 10, 0);
    let store = store_with(&[("m1", start)]).await;
    let sink = Arc::new(RecordingSink::default());
    let scheduler = ReminderScheduler::new(store, sink.clone());

    scheduler.run_once(start - Duration::hours(20)).await.unwrap();
    scheduler.run_once(start - Duration::minutes(50)).await.unwrap();
    scheduler.run_once(start - Duration::minutes(45)).await.unwrap();

    assert_eq!(
        reminder_kinds(&sink),
        vec![
            ("m1".to_string(), ReminderKind::DayBefore),
            ("m1".to_string(), ReminderKind::HourBefore),
        ]
    );
}

#[tokio::test]
async fn test_late_booking_only_gets_the_hour_reminder() {
    // First pass already inside the last hour: the 24h flag is claimed silently.
    let start = at(2025, 6, 2, 10, 0);
    let store = store_with(&[("m1", start)]).await;
    let sink = Arc::new(RecordingSink::default());
    let scheduler = ReminderScheduler::new(store.clone(), sink.clone());

    assert_eq!(scheduler.run_once(start - Duration::minutes(30)).await.unwrap(), 1);
    assert_eq!(
        reminder_kinds(&sink),
        vec![("m1".to_string(), ReminderKind::HourBefore)]
    );
    let stored = store.find_meeting("m1").await.unwrap().unwrap();
    assert!(stored.reminder_24h_sent && stored.reminder_1h_sent);
}

#[tokio::test]
async fn test_cancelled_and_past_meetings_are_skipped() {
    let now = at(2025, 6, 1, 12, 0);
    let store = store_with(&[
        ("cancelled", at(2025, 6, 2, 9, 0)),
        ("past", at(2025, 6, 1, 11, 0)),
    ])
    .await;
    let change = StatusChange {
        meeting_id: "cancelled".to_string(),
        from: MeetingStatus::ACTIVE.to_vec(),
        to: MeetingStatus::Cancelled,
        at: now,
        by: ActorKind::Client,
        reason: None,
    };
    assert_eq!(store.transition_status(change).await.unwrap(), WriteOutcome::Written);

    let sink = Arc::new(RecordingSink::default());
    let scheduler = ReminderScheduler::new(store, sink.clone());
    assert_eq!(scheduler.run_once(now).await.unwrap(), 0);
    assert!(sink.events().is_empty());
}
