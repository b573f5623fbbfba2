use chrono::{Duration, TimeZone, Utc};

use crate::{CapabilityClaims, CodecError, TokenAction, TokenSigner};

fn signer() -> TokenSigner {
    TokenSigner::new("signing-secret")
}

#[test]
fn test_capability_verifies_before_expiry_and_fails_after() {
    let issued = Utc.with_ymd_and_hms(2026, 3, 1, 8, 0, 0).unwrap();
    let expires = issued + Duration::days(2);
    let token = signer()
        .mint_capability("m-1", "client@example.com", TokenAction::Cancel, issued, expires)
        .unwrap();

    let claims = signer()
        .verify_capability_at(&token, TokenAction::Cancel, issued + Duration::hours(1))
        .unwrap();
    assert_eq!(
        claims,
        CapabilityClaims {
            meeting_id: "m-1".into(),
            client_email: "client@example.com".into(),
            action: TokenAction::Cancel,
            iat: issued.timestamp(),
            exp: expires.timestamp(),
        }
    );

    let late = signer().verify_capability_at(&token, TokenAction::Cancel, expires);
    assert_eq!(late, Err(CodecError::Expired));
}

#[test]
fn test_cancel_token_is_rejected_for_reschedule() {
    let now = Utc::now();
    let token = signer()
        .mint_capability("m-1", "c@example.com", TokenAction::Cancel, now, now + Duration::days(1))
        .unwrap();

    let result = signer().verify_capability(&token, TokenAction::Reschedule);
    assert_eq!(
        result,
        Err(CodecError::WrongAction {
            expected: TokenAction::Reschedule,
            actual: TokenAction::Cancel,
        })
    );
}

#[test]
fn test_other_secret_or_edited_payload_fails_signature() {
    let now = Utc::now();
    let token = signer()
        .mint_capability("m-1", "c@example.com", TokenAction::View, now, now + Duration::days(1))
        .unwrap();

    let foreign = TokenSigner::new("another-secret").verify_capability(&token, TokenAction::View);
    assert_eq!(foreign, Err(CodecError::BadSignature));

    let forged = TokenSigner::new("another-secret")
        .mint_capability("m-2", "c@example.com", TokenAction::View, now, now + Duration::days(1))
        .unwrap();
    let parts: Vec<&str> = token.split('.').collect();
    let forged_parts: Vec<&str> = forged.split('.').collect();
    let spliced = format!("{}.{}.{}", parts[0], forged_parts[1], parts[2]);
    assert_eq!(
        signer().verify_capability(&spliced, TokenAction::View),
        Err(CodecError::BadSignature)
    );
}

#[test]
fn test_garbage_is_malformed() {
    assert_eq!(
        signer().verify_capability("abc", TokenAction::View),
        Err(CodecError::Malformed)
    );
    assert_eq!(
        signer().verify_capability("a.b.c.d", TokenAction::View),
        Err(CodecError::Malformed)
    );
}

#[test]
fn test_oauth_state_round_trip_and_expiry() {
    let now = Utc.with_ymd_and_hms(2026, 3, 1, 8, 0, 0).unwrap();
    let state = signer()
        .sign_oauth_state("op-1", "n0nce", now, Duration::minutes(10))
        .unwrap();

    let claims = signer().verify_oauth_state(&state, now + Duration::minutes(5)).unwrap();
    assert_eq!(claims.operator_id, "op-1");
    assert_eq!(
        signer().verify_oauth_state(&state, now + Duration::minutes(11)),
        Err(CodecError::Expired)
    );
}
