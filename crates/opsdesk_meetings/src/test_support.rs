// Fixtures shared by the unit tests of this crate.

use chrono::{DateTime, Duration, TimeZone, Utc};
use opsdesk_codec::TokenSigner;
use opsdesk_common::models::{
    IssuedToken, Meeting, MeetingStatus, MeetingTokens, OperatorMeetingSettings, OperatorProfile,
};
use opsdesk_common::services::{
    BoxFuture, BoxedError, BusyInterval, CalendarEvent, CalendarEventResult, CalendarService,
    NotificationResult, NotificationService,
};
use opsdesk_config::MeetingsConfig;
use opsdesk_db::{MemoryStore, OperatorRepository};
use std::sync::{Arc, Mutex};

use crate::booking::BookingService;
use crate::dispatch::{EventSink, MeetingEvent};
use crate::models::BookMeetingRequest;
use crate::tokens::TokenPolicy;

pub const OPERATOR: &str = "op-1";

pub fn at(year: i32, month: u32, day: u32, hour: u32, minute: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(year, month, day, hour, minute, 0).unwrap()
}

pub fn test_config() -> MeetingsConfig {
    MeetingsConfig {
        public_base_url: "https://book.example.com/".to_string(),
        default_timezone: "UTC".to_string(),
        ..MeetingsConfig::default()
    }
}

pub fn utc_settings() -> OperatorMeetingSettings {
    OperatorMeetingSettings::defaults(OPERATOR, "UTC")
}

pub fn token_policy() -> TokenPolicy {
    TokenPolicy::new(Arc::new(TokenSigner::new("test-signing-secret")), 7)
}

pub fn meeting(id: &str, start: DateTime<Utc>, duration_minutes: i64) -> Meeting {
    let token = |name: &str| IssuedToken {
        token: format!("{id}-{name}"),
        expires_at: start,
    };
    Meeting {
        id: id.to_string(),
        operator_id: OPERATOR.to_string(),
        meeting_type_id: None,
        client_name: "Client".to_string(),
        client_email: "client@example.com".to_string(),
        client_phone: None,
        client_company: None,
        subject: "Intro".to_string(),
        notes: None,
        start_at: start,
        end_at: start + Duration::minutes(duration_minutes),
        duration_minutes,
        timezone: "UTC".to_string(),
        status: MeetingStatus::Confirmed,
        tokens: MeetingTokens {
            view: token("view"),
            cancel: token("cancel"),
            reschedule: token("reschedule"),
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
        source: "booking_page".to_string(),
        request_ip: None,
        user_agent: None,
        dedupe_key: None,
        calendar_event_id: None,
        created_at: start - Duration::days(1),
        updated_at: start - Duration::days(1),
    }
}

/// Keeps every emitted event for later assertions.
#[derive(Default)]
pub struct RecordingSink {
    events: Mutex<Vec<MeetingEvent>>,
}

impl RecordingSink {
    pub fn events(&self) -> Vec<MeetingEvent> {
        self.events.lock().unwrap().clone()
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.events().iter().map(MeetingEvent::name).collect()
    }
}

impl EventSink for RecordingSink {
    fn emit(&self, event: MeetingEvent) {
        self.events.lock().unwrap().push(event);
    }
}

pub async fn store_with_operator() -> MemoryStore {
    let store = MemoryStore::new();
    store
        .upsert_operator(OperatorProfile {
            id: OPERATOR.to_string(),
            display_name: "Operator One".to_string(),
            email: "ops@example.com".to_string(),
            active: true,
        })
        .await
        .unwrap();
    store
}

pub fn booking(store: MemoryStore, sink: Arc<RecordingSink>) -> BookingService<MemoryStore> {
    BookingService::new(store, token_policy(), sink, test_config())
}

pub fn request(datetime: DateTime<Utc>, duration: i64) -> BookMeetingRequest {
    BookMeetingRequest {
        datetime,
        duration,
        client_name: "Dana Client".to_string(),
        client_email: "Dana@Example.com".to_string(),
        client_phone: None,
        client_company: Some("Acme".to_string()),
        subject: "Onboarding call".to_string(),
        notes: None,
        meeting_type_id: None,
        turnstile_token: None,
        idempotency_key: None,
        source: None,
    }
}

/// Calendar double that records calls and can fail or stall on demand.
#[derive(Default)]
pub struct FakeCalendar {
    pub busy: Vec<BusyInterval>,
    pub fail: bool,
    pub delay: Option<std::time::Duration>,
    calls: Mutex<Vec<String>>,
}

impl FakeCalendar {
    pub fn with_busy(busy: Vec<BusyInterval>) -> Self {
        Self {
            busy,
            ..Self::default()
        }
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    pub fn stalling(delay: std::time::Duration) -> Self {
        Self {
            delay: Some(delay),
            ..Self::default()
        }
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    fn record(&self, call: String) {
        self.calls.lock().unwrap().push(call);
    }

    async fn outcome(&self) -> Result<(), BoxedError> {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if self.fail {
            return Err(BoxedError::msg("calendar unavailable"));
        }
        Ok(())
    }
}

impl CalendarService for FakeCalendar {
    type Error = BoxedError;

    fn get_busy_times(
        &self,
        operator_id: &str,
        _start_time: DateTime<Utc>,
        _end_time: DateTime<Utc>,
    ) -> BoxFuture<'_, Vec<BusyInterval>, BoxedError> {
        self.record(format!("busy:{operator_id}"));
        Box::pin(async move {
            self.outcome().await?;
            Ok(self.busy.clone())
        })
    }

    fn create_event(
        &self,
        operator_id: &str,
        event: CalendarEvent,
    ) -> BoxFuture<'_, CalendarEventResult, BoxedError> {
        self.record(format!("create:{operator_id}:{}", event.start_time.to_rfc3339()));
        Box::pin(async move {
            self.outcome().await?;
            Ok(CalendarEventResult {
                event_id: Some("evt-1".to_string()),
                status: "confirmed".to_string(),
            })
        })
    }

    fn update_event(
        &self,
        operator_id: &str,
        event_id: &str,
        event: CalendarEvent,
    ) -> BoxFuture<'_, CalendarEventResult, BoxedError> {
        self.record(format!(
            "update:{operator_id}:{event_id}:{}",
            event.start_time.to_rfc3339()
        ));
        let event_id = event_id.to_string();
        Box::pin(async move {
            self.outcome().await?;
            Ok(CalendarEventResult {
                event_id: Some(event_id),
                status: "confirmed".to_string(),
            })
        })
    }

    fn delete_event(&self, operator_id: &str, event_id: &str) -> BoxFuture<'_, (), BoxedError> {
        self.record(format!("delete:{operator_id}:{event_id}"));
        Box::pin(async move { self.outcome().await })
    }
}

/// Notification double that records every message.
#[derive(Default)]
pub struct FakeNotifier {
    sent: Mutex<Vec<(String, String)>>,
}

impl FakeNotifier {
    /// `(recipient or channel, subject or text)` pairs in send order.
    pub fn sent(&self) -> Vec<(String, String)> {
        self.sent.lock().unwrap().clone()
    }
}

impl NotificationService for FakeNotifier {
    type Error = BoxedError;

    fn send_email(
        &self,
        to: &str,
        subject: &str,
        _body: &str,
        _is_html: bool,
    ) -> BoxFuture<'_, NotificationResult, BoxedError> {
        self.sent
            .lock()
            .unwrap()
            .push((to.to_string(), subject.to_string()));
        Box::pin(async {
            Ok(NotificationResult {
                id: "msg-1".to_string(),
                status: "sent".to_string(),
            })
        })
    }

    fn send_chat(&self, channel: &str, text: &str) -> BoxFuture<'_, NotificationResult, BoxedError> {
        self.sent
            .lock()
            .unwrap()
            .push((format!("chat:{channel}"), text.to_string()));
        Box::pin(async {
            Ok(NotificationResult {
                id: "chat-1".to_string(),
                status: "sent".to_string(),
            })
        })
    }
}
