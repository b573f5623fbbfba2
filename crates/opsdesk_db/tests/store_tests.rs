use chrono::{DateTime, Duration, TimeZone, Utc};
use opsdesk_common::models::{
    ActorKind, AuditEntry, AvailabilityDay, CalendarAccount, IssuedToken, Meeting, MeetingFilter,
    MeetingStatus, MeetingTokens, OperatorMeetingSettings, ReminderKind, TimeOff, TimeRange,
};
use opsdesk_db::{
    Buffers, MemoryStore, RescheduleWrite, SchedulingStore, SqlStore, StatusChange, WriteOutcome,
};
use opsdesk_db::{
    AuditRepository, AvailabilityRepository, CalendarAccountRepository, DbClient,
    MeetingRepository, SettingsRepository, TimeOffRepository,
};

async fn sql_store() -> SqlStore {
    let store = SqlStore::new(DbClient::from_url("sqlite::memory:").await.unwrap());
    store.init_schema().await.unwrap();
    store
}

fn at(hour: u32, minute: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2030, 6, 2, hour, minute, 0).unwrap()
}

fn token(label: &str, expires_at: DateTime<Utc>) -> IssuedToken {
    IssuedToken {
        token: format!("tok-{label}"),
        expires_at,
    }
}

fn meeting(id: &str, start: DateTime<Utc>, minutes: i64) -> Meeting {
    let created = Utc.with_ymd_and_hms(2030, 6, 1, 8, 0, 0).unwrap();
    Meeting {
        id: id.to_string(),
        operator_id: "op-1".to_string(),
        meeting_type_id: None,
        client_name: "Client".to_string(),
        client_email: "client@example.com".to_string(),
        client_phone: Some("+966500000000".to_string()),
        client_company: None,
        subject: "Onboarding".to_string(),
        notes: None,
        start_at: start,
        end_at: start + Duration::minutes(minutes),
        duration_minutes: minutes,
        timezone: "Asia/Riyadh".to_string(),
        status: MeetingStatus::Confirmed,
        tokens: MeetingTokens {
            view: token("view", start + Duration::days(7)),
            cancel: token("cancel", start),
            reschedule: token("reschedule", start),
        },
        reschedule_count: 0,
        original_start_at: None,
        cancelled_at: None,
        cancelled_by: None,
        cancellation_reason: None,
        rescheduled_at: None,
        rescheduled_by: None,
        reschedule_reason: None,
        reminder_24h_sent: false,
        reminder_1h_sent: false,
        source: "public_booking".to_string(),
        request_ip: Some("203.0.113.9".to_string()),
        user_agent: None,
        dedupe_key: Some(format!("key-{id}")),
        calendar_event_id: None,
        created_at: created,
        updated_at: created,
    }
}

const BUFFERS: Buffers = Buffers {
    before_minutes: 15,
    after_minutes: 15,
};

async fn guarded_insert_respects_buffers<S: SchedulingStore>(store: S) {
    let first = meeting("m-1", at(10, 0), 30);
    assert_eq!(
        store.insert_meeting_guarded(first.clone(), BUFFERS).await.unwrap(),
        WriteOutcome::Written
    );
    assert_eq!(store.find_meeting("m-1").await.unwrap(), Some(first));

    // 10:30 + 15 minute buffer blocks a 10:30 start; 09:30 ends inside 09:45-10:00.
    for (id, start) in [("m-2", at(10, 30)), ("m-3", at(9, 30)), ("m-4", at(10, 15))] {
        assert_eq!(
            store.insert_meeting_guarded(meeting(id, start, 30), BUFFERS).await.unwrap(),
            WriteOutcome::Conflict,
            "{id} should collide"
        );
    }

    // Exactly at the padded edges is fine.
    assert_eq!(
        store.insert_meeting_guarded(meeting("m-5", at(10, 45), 30), BUFFERS).await.unwrap(),
        WriteOutcome::Written
    );
    assert_eq!(
        store.insert_meeting_guarded(meeting("m-6", at(9, 0), 30), BUFFERS).await.unwrap(),
        WriteOutcome::Written
    );

    let active = store.list_active_between("op-1", at(0, 0), at(23, 59)).await.unwrap();
    let ids: Vec<&str> = active.iter().map(|m| m.id.as_str()).collect();
    assert_eq!(ids, vec!["m-6", "m-1", "m-5"]);
}

#[tokio::test]
async fn test_sql_guarded_insert_respects_buffers() {
    guarded_insert_respects_buffers(sql_store().await).await;
}

#[tokio::test]
async fn test_memory_guarded_insert_respects_buffers() {
    guarded_insert_respects_buffers(MemoryStore::new()).await;
}

async fn cancel_only_once<S: SchedulingStore>(store: S) {
    store
        .insert_meeting_guarded(meeting("m-1", at(10, 0), 30), Buffers::default())
        .await
        .unwrap();

    let change = StatusChange {
        meeting_id: "m-1".to_string(),
        from: MeetingStatus::ACTIVE.to_vec(),
        to: MeetingStatus::Cancelled,
        at: at(8, 0),
        by: ActorKind::Client,
        reason: Some("conflict".to_string()),
    };
    assert_eq!(store.transition_status(change.clone()).await.unwrap(), WriteOutcome::Written);
    assert_eq!(store.transition_status(change).await.unwrap(), WriteOutcome::Stale);

    let cancelled = store.find_meeting("m-1").await.unwrap().unwrap();
    assert_eq!(cancelled.status, MeetingStatus::Cancelled);
    assert_eq!(cancelled.cancelled_by, Some(ActorKind::Client));
    assert_eq!(cancelled.cancellation_reason.as_deref(), Some("conflict"));
    assert_eq!(cancelled.last_transition_at(), Some(at(8, 0)));

    // The slot is free again.
    assert_eq!(
        store
            .insert_meeting_guarded(meeting("m-2", at(10, 0), 30), Buffers::default())
            .await
            .unwrap(),
        WriteOutcome::Written
    );
}

#[tokio::test]
async fn test_sql_cancel_only_once() {
    cancel_only_once(sql_store().await).await;
}

#[tokio::test]
async fn test_memory_cancel_only_once() {
    cancel_only_once(MemoryStore::new()).await;
}

fn reschedule_write(expected_count: i64, new_start: DateTime<Utc>) -> RescheduleWrite {
    RescheduleWrite {
        meeting_id: "m-1".to_string(),
        operator_id: "op-1".to_string(),
        expected_count,
        new_start,
        new_end: new_start + Duration::minutes(30),
        original_start: at(10, 0),
        at: at(7, 0),
        by: ActorKind::Client,
        reason: None,
        tokens: MeetingTokens {
            view: token("view2", new_start + Duration::days(7)),
            cancel: token("cancel2", new_start),
            reschedule: token("reschedule2", new_start),
        },
        buffers: Buffers::default(),
    }
}

async fn reschedule_guards<S: SchedulingStore>(store: S) {
    store
        .insert_meeting_guarded(meeting("m-1", at(10, 0), 30), Buffers::default())
        .await
        .unwrap();
    store
        .insert_meeting_guarded(meeting("other", at(14, 0), 30), Buffers::default())
        .await
        .unwrap();

    // Moving onto another meeting conflicts.
    assert_eq!(
        store.reschedule_guarded(reschedule_write(0, at(14, 0))).await.unwrap(),
        WriteOutcome::Conflict
    );
    // Overlapping its own current slot is fine.
    assert_eq!(
        store.reschedule_guarded(reschedule_write(0, at(10, 15))).await.unwrap(),
        WriteOutcome::Written
    );
    // A writer holding the old counter loses.
    assert_eq!(
        store.reschedule_guarded(reschedule_write(0, at(12, 0))).await.unwrap(),
        WriteOutcome::Stale
    );
    assert_eq!(
        store.reschedule_guarded(reschedule_write(1, at(12, 0))).await.unwrap(),
        WriteOutcome::Written
    );

    let moved = store.find_meeting("m-1").await.unwrap().unwrap();
    assert_eq!(moved.status, MeetingStatus::Rescheduled);
    assert_eq!(moved.reschedule_count, 2);
    assert_eq!(moved.start_at, at(12, 0));
    assert_eq!(moved.end_at, at(12, 30));
    assert_eq!(moved.original_start_at, Some(at(10, 0)));
    assert_eq!(moved.tokens.cancel.token, "tok-cancel2");
}

#[tokio::test]
async fn test_sql_reschedule_guards() {
    reschedule_guards(sql_store().await).await;
}

#[tokio::test]
async fn test_memory_reschedule_guards() {
    reschedule_guards(MemoryStore::new()).await;
}

async fn rate_limit_windows<S: SchedulingStore>(store: S) {
    let now = at(9, 0);
    let end = now + Duration::minutes(60);
    assert!(store.find_live_window("1.2.3.4", now).await.unwrap().is_none());
    assert!(store.open_window("1.2.3.4", now, end).await.unwrap());
    assert!(!store.open_window("1.2.3.4", now, end).await.unwrap());

    for _ in 0..4 {
        assert!(store.increment_live_window("1.2.3.4", now, 5).await.unwrap());
    }
    assert!(!store.increment_live_window("1.2.3.4", now, 5).await.unwrap());
    let window = store.find_live_window("1.2.3.4", now).await.unwrap().unwrap();
    assert_eq!(window.request_count, 5);

    assert_eq!(store.purge_expired_windows(end).await.unwrap(), 1);
    assert!(store.find_live_window("1.2.3.4", end).await.unwrap().is_none());
}

#[tokio::test]
async fn test_sql_rate_limit_windows() {
    rate_limit_windows(sql_store().await).await;
}

#[tokio::test]
async fn test_memory_rate_limit_windows() {
    rate_limit_windows(MemoryStore::new()).await;
}

#[tokio::test]
async fn test_settings_and_availability_are_seeded_once() {
    let store = sql_store().await;
    let defaults = OperatorMeetingSettings::defaults("op-1", "Asia/Riyadh");

    let first = store.get_or_init_settings(defaults.clone()).await.unwrap();
    assert_eq!(first, defaults);

    let mut changed = first.clone();
    changed.slot_duration_minutes = 60;
    changed.accepting_meetings = false;
    store.update_settings(changed.clone()).await.unwrap();

    let again = store.get_or_init_settings(defaults).await.unwrap();
    assert_eq!(again, changed);

    let week = store
        .get_or_init_availability("op-1", AvailabilityDay::default_week("op-1"))
        .await
        .unwrap();
    assert_eq!(week, AvailabilityDay::default_week("op-1"));

    let split = vec![AvailabilityDay {
        operator_id: "op-1".to_string(),
        day_of_week: 0,
        enabled: true,
        intervals: vec![TimeRange::hours(9, 12), TimeRange::hours(13, 17)],
    }];
    let replaced = store.replace_availability("op-1", split.clone()).await.unwrap();
    assert_eq!(replaced, split);

    // Seeding never overwrites an existing week.
    let kept = store
        .get_or_init_availability("op-1", AvailabilityDay::default_week("op-1"))
        .await
        .unwrap();
    assert_eq!(kept, split);
}

#[tokio::test]
async fn test_time_off_audit_and_calendar_account() {
    let store = sql_store().await;

    let time_off = TimeOff {
        id: "t-1".to_string(),
        operator_id: "op-1".to_string(),
        title: "Eid".to_string(),
        reason: None,
        start_at: at(0, 0),
        end_at: at(23, 0),
        recurring: true,
    };
    store.create_time_off(time_off.clone()).await.unwrap();
    assert_eq!(store.list_time_off("op-1").await.unwrap(), vec![time_off]);
    assert!(!store.delete_time_off("op-2", "t-1").await.unwrap());
    assert!(store.delete_time_off("op-1", "t-1").await.unwrap());

    let entry = AuditEntry {
        id: "a-1".to_string(),
        meeting_id: "m-1".to_string(),
        action: "created".to_string(),
        performed_by: ActorKind::Client,
        actor_id: None,
        ip: Some("203.0.113.9".to_string()),
        user_agent: None,
        metadata: serde_json::json!({ "start": "2030-06-02T10:00:00Z" }),
        created_at: at(8, 0),
    };
    store.append_audit(entry.clone()).await.unwrap();
    assert_eq!(store.list_audit("m-1").await.unwrap(), vec![entry]);

    store
        .upsert_calendar_account(CalendarAccount {
            operator_id: "op-1".to_string(),
            provider_email: Some("op@example.com".to_string()),
            encrypted_refresh_token: "aa:bb:cc".to_string(),
            calendar_id: "primary".to_string(),
            sync_enabled: true,
            last_synced_at: None,
            sync_error: None,
        })
        .await
        .unwrap();
    store
        .record_sync_result("op-1", Some("invalid_grant".to_string()), at(9, 0))
        .await
        .unwrap();
    let account = store.get_calendar_account("op-1").await.unwrap().unwrap();
    assert_eq!(account.sync_error.as_deref(), Some("invalid_grant"));
    assert_eq!(account.last_synced_at, None);

    store.record_sync_result("op-1", None, at(9, 5)).await.unwrap();
    let account = store.get_calendar_account("op-1").await.unwrap().unwrap();
    assert_eq!(account.sync_error, None);
    assert_eq!(account.last_synced_at, Some(at(9, 5)));

    assert!(store.delete_calendar_account("op-1").await.unwrap());
    assert!(store.get_calendar_account("op-1").await.unwrap().is_none());
}

#[tokio::test]
async fn test_listing_dedupe_and_reminders() {
    let store = sql_store().await;
    for (id, hour) in [("m-1", 9), ("m-2", 11), ("m-3", 13)] {
        store
            .insert_meeting_guarded(meeting(id, at(hour, 0), 30), Buffers::default())
            .await
            .unwrap();
    }
    store
        .transition_status(StatusChange {
            meeting_id: "m-2".to_string(),
            from: MeetingStatus::ACTIVE.to_vec(),
            to: MeetingStatus::Completed,
            at: at(12, 0),
            by: ActorKind::Operator,
            reason: None,
        })
        .await
        .unwrap();

    let page = store
        .list_meetings(MeetingFilter {
            operator_id: "op-1".to_string(),
            page: 1,
            per_page: 2,
            ..Default::default()
        })
        .await
        .unwrap();
    assert_eq!(page.total, 3);
    let ids: Vec<&str> = page.items.iter().map(|m| m.id.as_str()).collect();
    assert_eq!(ids, vec!["m-3", "m-2"]);

    let completed = store
        .list_meetings(MeetingFilter {
            operator_id: "op-1".to_string(),
            status: Some(MeetingStatus::Completed),
            page: 1,
            per_page: 10,
            ..Default::default()
        })
        .await
        .unwrap();
    assert_eq!(completed.total, 1);

    assert_eq!(
        store
            .count_active_starting_between("op-1", at(0, 0), at(23, 59))
            .await
            .unwrap(),
        2
    );

    let since = Utc.with_ymd_and_hms(2030, 6, 1, 7, 30, 0).unwrap();
    let found = store.find_by_dedupe_key("op-1", "key-m-1", since).await.unwrap();
    assert_eq!(found.map(|m| m.id), Some("m-1".to_string()));
    // Finished meetings no longer answer for their key.
    assert!(store.find_by_dedupe_key("op-1", "key-m-2", since).await.unwrap().is_none());
    let later = Utc.with_ymd_and_hms(2030, 6, 1, 8, 30, 0).unwrap();
    assert!(store.find_by_dedupe_key("op-1", "key-m-1", later).await.unwrap().is_none());

    let due = store.due_for_reminder(ReminderKind::HourBefore, at(8, 30)).await.unwrap();
    assert_eq!(due.iter().map(|m| m.id.as_str()).collect::<Vec<_>>(), vec!["m-1"]);
    assert!(store.mark_reminder_sent("m-1", ReminderKind::HourBefore).await.unwrap());
    assert!(!store.mark_reminder_sent("m-1", ReminderKind::HourBefore).await.unwrap());
    assert!(store
        .due_for_reminder(ReminderKind::HourBefore, at(8, 30))
        .await
        .unwrap()
        .is_empty());
}
