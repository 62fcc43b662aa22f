//! Property tests for signed-webhook authentication through the router.
//!
//! A correctly signed, fresh request is accepted exactly once; any tampering
//! with the body, signature or timestamp is rejected before a ticket exists.

use axum::{body::Body, http::StatusCode};
use proptest::prelude::*;
use serde_json::json;
use ticketbridge_core::Clock;
use ticketbridge_test_utils::{fixtures::sample_note_text, sign_body};
use tokio::runtime::Runtime;

#[path = "support/app.rs"]
mod app_support;
use app_support::{post_json, send, signed_post, signed_webhook_app, WEBHOOK_SECRET};

const INGEST: &str = "/api/v1/escalations";
const WINDOW_SECS: i64 = 300;

#[derive(Debug, Clone)]
enum Tamper {
    None,
    Body(String),
    FlipSignatureNibble(usize),
    Skew(i64),
    DropTimestamp,
    DropSignature,
    NonHexSignature,
}

fn tamper_strategy() -> impl Strategy<Value = Tamper> {
    prop_oneof![
        Just(Tamper::None),
        "[a-z ]{1,40}".prop_map(Tamper::Body),
        (0usize..64).prop_map(Tamper::FlipSignatureNibble),
        prop_oneof![
            (WINDOW_SECS + 1)..(WINDOW_SECS * 10),
            -(WINDOW_SECS * 10)..-(WINDOW_SECS + 1)
        ]
        .prop_map(Tamper::Skew),
        Just(Tamper::DropTimestamp),
        Just(Tamper::DropSignature),
        Just(Tamper::NonHexSignature),
    ]
}

fn flip_nibble(signature: &str, index: usize) -> String {
    signature
        .chars()
        .enumerate()
        .map(|(i, c)| {
            if i == index {
                if c == '0' {
                    '1'
                } else {
                    '0'
                }
            } else {
                c
            }
        })
        .collect()
}

fn body_with(oa_key: &str) -> serde_json::Value {
    json!({ "note": sample_note_text(), "oaKey": oa_key })
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(48))]

    #[test]
    fn prop_only_untampered_requests_pass(
        tamper in tamper_strategy(),
        oa_key in "[A-Za-z0-9_-]{6,32}",
    ) {
        let rt = Runtime::new().map_err(|e| TestCaseError::fail(e.to_string()))?;
        let outcome: Result<(StatusCode, usize), String> = rt.block_on(async {
            let app = signed_webhook_app();
            let body = body_with(&oa_key);
            let raw = body.to_string();
            let now = app.clock.now_epoch_secs();

            let mut timestamp = now.to_string();
            let mut sent_body = raw.clone();
            if let Tamper::Skew(skew) = &tamper {
                timestamp = (now + skew).to_string();
            }

            let mut signature = sign_body(WEBHOOK_SECRET, &timestamp, raw.as_bytes());

            match &tamper {
                Tamper::Body(extra) => {
                    sent_body = body_with(&format!("{}{}", oa_key, extra.len())).to_string();
                }
                Tamper::FlipSignatureNibble(index) => {
                    let hex = &signature["sha256=".len()..];
                    signature = format!("sha256={}", flip_nibble(hex, *index));
                }
                Tamper::NonHexSignature => signature = "sha256=not-hex-at-all".to_string(),
                _ => {}
            }

            let mut builder = post_json(INGEST);
            if !matches!(tamper, Tamper::DropTimestamp) {
                builder = builder.header("x-timestamp", timestamp);
            }
            if !matches!(tamper, Tamper::DropSignature) {
                builder = builder.header("x-signature", signature);
            }
            let request = builder
                .body(Body::from(sent_body))
                .map_err(|e| e.to_string())?;

            let response = send(&app.router, request).await?;
            Ok((response.status, app.helpdesk.ticket_count()))
        });

        let (status, tickets) = outcome.map_err(TestCaseError::fail)?;
        match tamper {
            Tamper::None => {
                prop_assert_eq!(status, StatusCode::OK);
                prop_assert_eq!(tickets, 1);
            }
            Tamper::DropTimestamp | Tamper::DropSignature | Tamper::NonHexSignature => {
                prop_assert_eq!(status, StatusCode::UNAUTHORIZED);
                prop_assert_eq!(tickets, 0);
            }
            Tamper::Body(_) | Tamper::FlipSignatureNibble(_) | Tamper::Skew(_) => {
                prop_assert_eq!(status, StatusCode::FORBIDDEN);
                prop_assert_eq!(tickets, 0);
            }
        }
    }
}

#[tokio::test]
async fn test_signed_request_cannot_be_replayed() -> Result<(), String> {
    let app = signed_webhook_app();
    let body = body_with("oa-12345");

    // Same clock reading and body, so both carry the same signature.
    let accepted = send(&app.router, signed_post(&app, INGEST, &body)?).await?;
    assert_eq!(accepted.status, StatusCode::OK);

    let rejected = send(&app.router, signed_post(&app, INGEST, &body)?).await?;
    assert_eq!(rejected.status, StatusCode::FORBIDDEN);
    assert_eq!(rejected.body["code"], "AUTH_FAILED");
    assert_eq!(app.helpdesk.ticket_count(), 1);
    Ok(())
}

#[tokio::test]
async fn test_stale_signed_request_is_rejected() -> Result<(), String> {
    let app = signed_webhook_app();
    let body = body_with("oa-67890");

    let request = signed_post(&app, INGEST, &body)?;
    app.clock
        .advance(std::time::Duration::from_secs(WINDOW_SECS as u64 + 1));

    let response = send(&app.router, request).await?;
    assert_eq!(response.status, StatusCode::FORBIDDEN);
    assert_eq!(app.helpdesk.ticket_count(), 0);
    Ok(())
}
