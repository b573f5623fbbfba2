use chrono::Duration;
use opsdesk_common::models::{MeetingStatus, NoticeUnit, TimeRange};
use opsdesk_db::MemoryStore;
use std::sync::Arc;

use crate::error::MeetingError;
use crate::extract::ClientMeta;
use crate::models::{
    AvailabilityUpdate, DayInput, MeetingListQuery, SettingsUpdate, TimeOffRequest,
};
use crate::operator::OperatorService;
use crate::test_support::{
    at, booking, request, store_with_operator, test_config, RecordingSink, OPERATOR,
};

fn service(store: &MemoryStore) -> OperatorService<MemoryStore> {
    OperatorService::new(store.clone(), test_config())
}

fn settings_update() -> SettingsUpdate {
    SettingsUpdate {
        booking_slug: " Op-One ".to_string(),
        slot_duration_minutes: 60,
        buffer_before_minutes: 10,
        buffer_after_minutes: 5,
        max_days_in_advance: 14,
        min_notice_value: 1,
        min_notice_unit: NoticeUnit::Days,
        max_meetings_per_day: 4,
        accepting_meetings: true,
        timezone: "Europe/Berlin".to_string(),
        welcome_message: Some("Hello".to_string()),
        meeting_title: None,
    }
}

#[tokio::test]
async fn test_settings_default_on_first_read() {
    let store = MemoryStore::new();
    let settings = service(&store).settings(OPERATOR).await.unwrap();

    assert_eq!(settings.operator_id, OPERATOR);
    assert_eq!(settings.slot_duration_minutes, 30);
    assert_eq!(settings.timezone, "UTC");
    assert!(settings.accepting_meetings);
}

#[tokio::test]
async fn test_update_settings_normalizes_and_persists() {
    let store = MemoryStore::new();
    let svc = service(&store);

    let saved = svc.update_settings(OPERATOR, settings_update()).await.unwrap();
    assert_eq!(saved.booking_slug, "op-one");
    assert_eq!(saved.min_notice(), Duration::days(1));

    let reread = svc.settings(OPERATOR).await.unwrap();
    assert_eq!(reread, saved);
}

#[tokio::test]
async fn test_update_settings_rejects_invalid_values() {
    let store = MemoryStore::new();
    let svc = service(&store);

    let mut bad_duration = settings_update();
    bad_duration.slot_duration_minutes = 45;
    let mut bad_zone = settings_update();
    bad_zone.timezone = "Mars/Olympus".to_string();
    let mut bad_cap = settings_update();
    bad_cap.max_meetings_per_day = 0;

    for update in [bad_duration, bad_zone, bad_cap] {
        assert!(matches!(
            svc.update_settings(OPERATOR, update).await,
            Err(MeetingError::Validation(_))
        ));
    }
    // Nothing was written beyond the defaults.
    assert_eq!(svc.settings(OPERATOR).await.unwrap().slot_duration_minutes, 30);
}

#[tokio::test]
async fn test_default_week_is_sunday_to_thursday() {
    let store = MemoryStore::new();
    let week = service(&store).availability(OPERATOR).await.unwrap();

    assert_eq!(week.len(), 7);
    let enabled: Vec<u8> = week.iter().filter(|d| d.enabled).map(|d| d.day_of_week).collect();
    assert_eq!(enabled, vec![0, 1, 2, 3, 4]);
    assert_eq!(week[0].intervals, vec![TimeRange::hours(9, 17)]);
}

#[tokio::test]
async fn test_replace_availability_disables_missing_days() {
    let store = MemoryStore::new();
    let svc = service(&store);

    let update = AvailabilityUpdate {
        days: vec![DayInput {
            day_of_week: 2,
            enabled: true,
            intervals: vec![TimeRange::hours(13, 17), TimeRange::hours(8, 12)],
        }],
    };
    let week = svc.replace_availability(OPERATOR, update).await.unwrap();

    assert_eq!(week.len(), 7);
    assert_eq!(week.iter().filter(|d| d.enabled).count(), 1);
    assert_eq!(
        week[2].intervals,
        vec![TimeRange::hours(8, 12), TimeRange::hours(13, 17)]
    );
    assert_eq!(svc.availability(OPERATOR).await.unwrap(), week);
}

#[tokio::test]
async fn test_replace_availability_validation() {
    let store = MemoryStore::new();
    let svc = service(&store);

    let duplicate = AvailabilityUpdate {
        days: vec![
            DayInput {
                day_of_week: 1,
                enabled: false,
                intervals: vec![],
            },
            DayInput {
                day_of_week: 1,
                enabled: false,
                intervals: vec![],
            },
        ],
    };
    let overlapping = AvailabilityUpdate {
        days: vec![DayInput {
            day_of_week: 1,
            enabled: true,
            intervals: vec![TimeRange::hours(9, 12), TimeRange::hours(11, 14)],
        }],
    };
    let empty_enabled = AvailabilityUpdate {
        days: vec![DayInput {
            day_of_week: 3,
            enabled: true,
            intervals: vec![],
        }],
    };
    let out_of_range = AvailabilityUpdate {
        days: vec![DayInput {
            day_of_week: 7,
            enabled: false,
            intervals: vec![],
        }],
    };

    for update in [duplicate, overlapping, empty_enabled, out_of_range] {
        assert!(matches!(
            svc.replace_availability(OPERATOR, update).await,
            Err(MeetingError::Validation(_))
        ));
    }
}

#[tokio::test]
async fn test_time_off_lifecycle() {
    let store = MemoryStore::new();
    let svc = service(&store);

    let created = svc
        .create_time_off(
            OPERATOR,
            TimeOffRequest {
                title: "  Eid holiday ".to_string(),
                reason: Some("   ".to_string()),
                start_at: at(2025, 6, 6, 0, 0),
                end_at: at(2025, 6, 9, 0, 0),
                recurring: true,
            },
        )
        .await
        .unwrap();
    assert_eq!(created.title, "Eid holiday");
    assert_eq!(created.reason, None);

    assert_eq!(svc.time_off(OPERATOR).await.unwrap(), vec![created.clone()]);
    assert!(svc.time_off("op-2").await.unwrap().is_empty());

    // Another operator cannot delete it.
    assert!(matches!(
        svc.delete_time_off("op-2", &created.id).await,
        Err(MeetingError::TimeOffNotFound)
    ));
    svc.delete_time_off(OPERATOR, &created.id).await.unwrap();
    assert!(matches!(
        svc.delete_time_off(OPERATOR, &created.id).await,
        Err(MeetingError::TimeOffNotFound)
    ));
}

#[tokio::test]
async fn test_time_off_validation() {
    let store = MemoryStore::new();
    let svc = service(&store);
    let start = at(2025, 6, 6, 0, 0);

    let untitled = TimeOffRequest {
        title: " ".to_string(),
        reason: None,
        start_at: start,
        end_at: start + Duration::hours(1),
        recurring: false,
    };
    let backwards = TimeOffRequest {
        title: "Offsite".to_string(),
        reason: None,
        start_at: start,
        end_at: start,
        recurring: false,
    };
    for request in [untitled, backwards] {
        assert!(matches!(
            svc.create_time_off(OPERATOR, request).await,
            Err(MeetingError::Validation(_))
        ));
    }
}

#[tokio::test]
async fn test_list_meetings_filters_and_pages() {
    let store = store_with_operator().await;
    let bookings = booking(store.clone(), Arc::new(RecordingSink::default()));
    let now = at(2025, 6, 1, 0, 0);

    let mut ids = Vec::new();
    for (i, hour) in [9, 11, 13].into_iter().enumerate() {
        let mut req = request(at(2025, 6, 3, hour, 0), 30);
        req.client_email = format!("c{i}@example.com");
        let outcome = bookings
            .book(OPERATOR, req, &ClientMeta::default(), now)
            .await
            .unwrap();
        ids.push(outcome.meeting.id);
    }
    bookings
        .cancel_as_operator(OPERATOR, &ids[1], None, now)
        .await
        .unwrap();

    let svc = service(&store);
    let page = svc
        .list_meetings(
            OPERATOR,
            MeetingListQuery {
                per_page: Some(2),
                ..MeetingListQuery::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(page.total, 3);
    assert_eq!(page.per_page, 2);
    assert_eq!(page.items.len(), 2);

    let cancelled = svc
        .list_meetings(
            OPERATOR,
            MeetingListQuery {
                status: Some(MeetingStatus::Cancelled),
                ..MeetingListQuery::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(cancelled.total, 1);
    assert_eq!(cancelled.items[0].id, ids[1]);

    let clamped = svc
        .list_meetings(
            OPERATOR,
            MeetingListQuery {
                page: Some(0),
                per_page: Some(1000),
                ..MeetingListQuery::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(clamped.page, 1);
    assert_eq!(clamped.per_page, 100);

    assert!(matches!(
        svc.list_meetings(
            OPERATOR,
            MeetingListQuery {
                from: Some(at(2025, 6, 4, 0, 0)),
                to: Some(at(2025, 6, 3, 0, 0)),
                ..MeetingListQuery::default()
            },
        )
        .await,
        Err(MeetingError::InvalidDateRange(_))
    ));
}

#[tokio::test]
async fn test_meeting_detail_includes_audit_trail() {
    let store = store_with_operator().await;
    let bookings = booking(store.clone(), Arc::new(RecordingSink::default()));
    let now = at(2025, 6, 1, 0, 0);
    let meeting = bookings
        .book(OPERATOR, request(at(2025, 6, 3, 10, 0), 30), &ClientMeta::default(), now)
        .await
        .unwrap()
        .meeting;
    bookings
        .cancel_as_operator(OPERATOR, &meeting.id, Some("Double booked".to_string()), now)
        .await
        .unwrap();

    let svc = service(&store);
    let (detail, audit) = svc.meeting_detail(OPERATOR, &meeting.id).await.unwrap();
    assert_eq!(detail.status, MeetingStatus::Cancelled);
    let actions: Vec<&str> = audit.iter().map(|e| e.action.as_str()).collect();
    assert_eq!(actions, vec!["created", "cancelled"]);
    assert_eq!(audit[1].actor_id.as_deref(), Some(OPERATOR));
    assert_eq!(audit[1].metadata["reason"], "Double booked");

    assert!(matches!(
        svc.meeting_detail("op-2", &meeting.id).await,
        Err(MeetingError::MeetingNotFound)
    ));
}
