// --- File: crates/opsdesk_meetings/src/links.rs ---
// Client-facing URLs: the three action links and add-to-calendar links.

use chrono::{DateTime, Utc};
use opsdesk_common::models::{Meeting, MeetingTokens};

use crate::models::{ActionLinks, CalendarLinks};

const GOOGLE_TEMPLATE_URL: &str = "https://calendar.google.com/calendar/render";
const OUTLOOK_COMPOSE_URL: &str = "https://outlook.live.com/calendar/0/deeplink/compose";

#[derive(Debug, Clone)]
pub struct LinkBuilder {
    base_url: String,
}

impl LinkBuilder {
    pub fn new(base_url: &str) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    fn action_url(&self, action: &str, token: &str) -> String {
        let query = serde_urlencoded::to_string([("token", token)]).unwrap_or_default();
        format!("{}/meetings/{}?{}", self.base_url, action, query)
    }

    pub fn action_links(&self, tokens: &MeetingTokens) -> ActionLinks {
        ActionLinks {
            view_url: self.action_url("view", &tokens.view.token),
            cancel_url: self.action_url("cancel", &tokens.cancel.token),
            reschedule_url: self.action_url("reschedule", &tokens.reschedule.token),
        }
    }

    pub fn calendar_links(&self, meeting: &Meeting) -> CalendarLinks {
        let details = format!(
            "{}\n\nManage this meeting: {}",
            meeting.notes.as_deref().unwrap_or(&meeting.subject),
            self.action_url("view", &meeting.tokens.view.token)
        );

        let dates = format!("{}/{}", compact(meeting.start_at), compact(meeting.end_at));
        let google = serde_urlencoded::to_string([
            ("action", "TEMPLATE"),
            ("text", meeting.subject.as_str()),
            ("dates", dates.as_str()),
            ("details", details.as_str()),
            ("ctz", meeting.timezone.as_str()),
        ])
        .unwrap_or_default();

        let start = meeting.start_at.to_rfc3339();
        let end = meeting.end_at.to_rfc3339();
        let outlook = serde_urlencoded::to_string([
            ("path", "/calendar/action/compose"),
            ("rru", "addevent"),
            ("subject", meeting.subject.as_str()),
            ("startdt", start.as_str()),
            ("enddt", end.as_str()),
            ("body", details.as_str()),
        ])
        .unwrap_or_default();

        CalendarLinks {
            google: format!("{GOOGLE_TEMPLATE_URL}?{google}"),
            outlook: format!("{OUTLOOK_COMPOSE_URL}?{outlook}"),
        }
    }
}

// 20250601T060000Z
fn compact(at: DateTime<Utc>) -> String {
    at.format("%Y%m%dT%H%M%SZ").to_string()
}
