// --- File: crates/services/opsdesk_backend/src/service_factory.rs ---
//! Service factory implementation.
//!
//! Builds the calendar and notification collaborators from the application
//! configuration and hands them out behind the shared service traits.
use chrono::{DateTime, Utc};
use opsdesk_codec::SecretCipher;
use opsdesk_common::services::{
    BoxFuture, BoxedError, BusyInterval, CalendarEvent, CalendarEventResult, CalendarService,
    NotificationResult, NotificationService, ServiceFactory,
};
use opsdesk_config::AppConfig;
use opsdesk_db::CalendarAccountRepository;
use opsdesk_gcal::GoogleCalendarService;
use std::sync::Arc;
use tracing::{info, warn};
use uuid::Uuid;

fn boxed<E: std::error::Error + Send + Sync + 'static>(err: E) -> BoxedError {
    BoxedError(Box::new(err))
}

/// Erases the Google adapter's error type so it fits `CalendarService<Error = BoxedError>`.
struct BoxedCalendarService<S> {
    inner: GoogleCalendarService<S>,
}

impl<S> CalendarService for BoxedCalendarService<S>
where
    S: CalendarAccountRepository + Send + Sync,
{
    type Error = BoxedError;

    fn get_busy_times(
        &self,
        operator_id: &str,
        start_time: DateTime<Utc>,
        end_time: DateTime<Utc>,
    ) -> BoxFuture<'_, Vec<BusyInterval>, Self::Error> {
        let fut = self.inner.get_busy_times(operator_id, start_time, end_time);
        Box::pin(async move { fut.await.map_err(boxed) })
    }

    fn create_event(
        &self,
        operator_id: &str,
        event: CalendarEvent,
    ) -> BoxFuture<'_, CalendarEventResult, Self::Error> {
        let fut = self.inner.create_event(operator_id, event);
        Box::pin(async move { fut.await.map_err(boxed) })
    }

    fn update_event(
        &self,
        operator_id: &str,
        event_id: &str,
        event: CalendarEvent,
    ) -> BoxFuture<'_, CalendarEventResult, Self::Error> {
        let fut = self.inner.update_event(operator_id, event_id, event);
        Box::pin(async move { fut.await.map_err(boxed) })
    }

    fn delete_event(&self, operator_id: &str, event_id: &str) -> BoxFuture<'_, (), Self::Error> {
        let fut = self.inner.delete_event(operator_id, event_id);
        Box::pin(async move { fut.await.map_err(boxed) })
    }
}

/// Notification channel that writes every message to the log.
///
/// Stands in for a mail or chat provider; the meeting flow treats delivery as
/// best effort either way.
pub struct LogNotificationService;

impl NotificationService for LogNotificationService {
    type Error = BoxedError;

    fn send_email(
        &self,
        to: &str,
        subject: &str,
        body: &str,
        is_html: bool,
    ) -> BoxFuture<'_, NotificationResult, Self::Error> {
        let id = Uuid::new_v4().to_string();
        info!(message_id = %id, to, subject, is_html, bytes = body.len(), "Email notification");
        Box::pin(async move {
            Ok(NotificationResult {
                id,
                status: "logged".to_string(),
            })
        })
    }

    fn send_chat(&self, channel: &str, text: &str) -> BoxFuture<'_, NotificationResult, Self::Error> {
        let id = Uuid::new_v4().to_string();
        info!(message_id = %id, channel, "Chat notification: {}", text);
        Box::pin(async move {
            Ok(NotificationResult {
                id,
                status: "logged".to_string(),
            })
        })
    }
}

/// Collaborators selected by configuration.
pub struct OpsdeskServiceFactory {
    calendar_service: Option<Arc<dyn CalendarService<Error = BoxedError>>>,
    notification_service: Option<Arc<dyn NotificationService<Error = BoxedError>>>,
}

impl OpsdeskServiceFactory {
    pub fn new<S>(config: &AppConfig, store: S, cipher: Arc<SecretCipher>) -> Self
    where
        S: CalendarAccountRepository + Send + Sync + 'static,
    {
        let calendar_service: Option<Arc<dyn CalendarService<Error = BoxedError>>> =
            match (config.use_gcal, config.gcal.as_ref()) {
                (true, Some(gcal)) => {
                    info!("Google Calendar sync enabled");
                    Some(Arc::new(BoxedCalendarService {
                        inner: GoogleCalendarService::new(store, cipher, gcal.clone()),
                    }))
                }
                (true, None) => {
                    warn!("use_gcal is set but the gcal section is missing; calendar sync disabled");
                    None
                }
                (false, _) => {
                    info!("Google Calendar sync disabled via runtime config");
                    None
                }
            };

        Self {
            calendar_service,
            notification_service: Some(Arc::new(LogNotificationService)),
        }
    }
}

impl ServiceFactory for OpsdeskServiceFactory {
    fn calendar_service(&self) -> Option<Arc<dyn CalendarService<Error = BoxedError>>> {
        self.calendar_service.clone()
    }

    fn notification_service(&self) -> Option<Arc<dyn NotificationService<Error = BoxedError>>> {
        self.notification_service.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use opsdesk_config::{DatabaseConfig, GcalConfig, SecretsConfig, ServerConfig};
    use opsdesk_db::MemoryStore;

    fn config(use_gcal: bool, gcal: Option<GcalConfig>) -> AppConfig {
        AppConfig {
            server: ServerConfig {
                host: "127.0.0.1".to_string(),
                port: 8086,
            },
            use_gcal,
            database: DatabaseConfig {
                url: "sqlite::memory:".to_string(),
            },
            secrets: SecretsConfig {
                encryption_secret: "enc".to_string(),
                token_signing_secret: "sign".to_string(),
                operator_api_secret: "op".to_string(),
                turnstile_secret: None,
            },
            logging: Default::default(),
            meetings: Default::default(),
            rate_limit: Default::default(),
            gcal,
            operators: Vec::new(),
        }
    }

    fn cipher() -> Arc<SecretCipher> {
        Arc::new(SecretCipher::new("enc").unwrap())
    }

    #[test]
    fn test_calendar_only_when_enabled_and_configured() {
        let gcal = GcalConfig {
            client_id: "client".to_string(),
            client_secret: "secret".to_string(),
            redirect_uri: "http://localhost:8086/api/calendar/oauth/callback".to_string(),
            default_calendar_id: "primary".to_string(),
        };

        let on = OpsdeskServiceFactory::new(
            &config(true, Some(gcal.clone())),
            MemoryStore::new(),
            cipher(),
        );
        assert!(on.calendar_service().is_some());

        let off =
            OpsdeskServiceFactory::new(&config(false, Some(gcal)), MemoryStore::new(), cipher());
        assert!(off.calendar_service().is_none());

        let missing =
            OpsdeskServiceFactory::new(&config(true, None), MemoryStore::new(), cipher());
        assert!(missing.calendar_service().is_none());
        assert!(missing.notification_service().is_some());
    }

    #[tokio::test]
    async fn test_log_notifications_report_logged() {
        let result = LogNotificationService
            .send_email("client@example.com", "Hello", "Body", false)
            .await
            .unwrap();
        assert_eq!(result.status, "logged");
        assert!(!result.id.is_empty());
    }
}
