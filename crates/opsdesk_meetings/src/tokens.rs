// --- File: crates/opsdesk_meetings/src/tokens.rs ---
// Capability tokens for unauthenticated meeting actions.
//
// View tokens stay valid for a while after the meeting ends; cancel and
// reschedule tokens expire when the meeting starts. A presented token must
// also match the one currently stored on the meeting, so links minted before
// a reschedule stop working.

use chrono::{DateTime, Duration, Utc};
use opsdesk_codec::{CapabilityClaims, TokenAction, TokenSigner};
use opsdesk_common::models::{IssuedToken, Meeting, MeetingTokens};
use std::sync::Arc;
use tracing::debug;

use crate::error::MeetingError;

#[derive(Clone)]
pub struct TokenPolicy {
    signer: Arc<TokenSigner>,
    view_ttl: Duration,
}

impl TokenPolicy {
    pub fn new(signer: Arc<TokenSigner>, view_ttl_days: i64) -> Self {
        Self {
            signer,
            view_ttl: Duration::days(view_ttl_days),
        }
    }

    pub fn mint(
        &self,
        meeting_id: &str,
        client_email: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> Result<MeetingTokens, MeetingError> {
        let issue = |action: TokenAction, expires_at: DateTime<Utc>| -> Result<IssuedToken, MeetingError> {
            let token = self
                .signer
                .mint_capability(meeting_id, client_email, action, now, expires_at)?;
            Ok(IssuedToken { token, expires_at })
        };

        Ok(MeetingTokens {
            view: issue(TokenAction::View, end + self.view_ttl)?,
            cancel: issue(TokenAction::Cancel, start)?,
            reschedule: issue(TokenAction::Reschedule, start)?,
        })
    }

    /// Stateless check: signature, action and expiry.
    pub fn verify(
        &self,
        token: &str,
        action: TokenAction,
        now: DateTime<Utc>,
    ) -> Result<CapabilityClaims, MeetingError> {
        Ok(self.signer.verify_capability_at(token, action, now)?)
    }

    /// Confirms the claims still describe `meeting` and the token is current.
    pub fn ensure_current(
        meeting: &Meeting,
        claims: &CapabilityClaims,
        presented: &str,
    ) -> Result<(), MeetingError> {
        let stored = match claims.action {
            TokenAction::View => &meeting.tokens.view,
            TokenAction::Cancel => &meeting.tokens.cancel,
            TokenAction::Reschedule => &meeting.tokens.reschedule,
        };
        if stored.token != presented || !claims.client_email.eq_ignore_ascii_case(&meeting.client_email) {
            debug!(meeting_id = %meeting.id, action = %claims.action, "Superseded capability token");
            return Err(MeetingError::InvalidToken);
        }
        Ok(())
    }
}
