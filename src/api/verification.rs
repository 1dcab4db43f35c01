use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::post,
    Json, Router,
};
use chrono::Utc;
use secrecy::ExposeSecret;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::api::{caller::Caller, AppState};
use crate::error::{AppError, Result};
use crate::models::card::CardRecord;
use crate::models::entry_log::EntryLog;
use crate::services::scan_verifier::{self, RejectReason, ScanOutcome};

#[derive(Debug, Deserialize)]
pub struct VerifyScanRequest {
    /// The string extracted from the QR glyph by the scanning device.
    pub payload: String,
    pub location: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct CardSummary {
    pub id: Uuid,
    pub holder_name: String,
    pub admission_number: String,
}

impl From<&CardRecord> for CardSummary {
    fn from(card: &CardRecord) -> Self {
        Self {
            id: card.id,
            holder_name: card.holder_name.clone(),
            admission_number: card.admission_number.clone(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct VerifyScanResponse {
    pub decision: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub card: Option<CardSummary>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub entry: Option<EntryLog>,
}

/// Scan verification endpoint for gate devices.
///
/// Rejections are ordinary outcomes carried in the response body; only
/// storage faults surface as errors.
async fn verify_scan(
    State(state): State<AppState>,
    caller: Caller,
    Json(request): Json<VerifyScanRequest>,
) -> Result<Response> {
    if !caller.is_staff() {
        return Err(AppError::Forbidden);
    }

    let location = request.location.unwrap_or_else(|| "Unknown".to_string());

    let outcome = scan_verifier::verify(
        &state.pool,
        state.config.signing_key.expose_secret().as_bytes(),
        &request.payload,
        &location,
        Utc::now(),
    )
    .await?;

    tracing::info!(result = outcome.result_type(), %location, "scan verified");

    // A lost card showing up at a gate alerts the holder. Best-effort,
    // after the audit row is already committed.
    if let ScanOutcome::Rejected {
        reason: RejectReason::Lost,
        card: Some(card),
    } = &outcome
    {
        let body = format!(
            "Your ID card that was reported as lost has been scanned at {}. \
             Please contact security immediately.",
            location
        );
        if let Err(e) = state
            .notifier
            .notify(&card.holder_email, "Alert: Lost ID Card Used", &body)
            .await
        {
            tracing::warn!(card_id = %card.id, error = %e, "lost-card alert delivery failed");
        }
    }

    let (status, response) = match outcome {
        ScanOutcome::Accepted { card, entry } => (
            StatusCode::OK,
            VerifyScanResponse {
                decision: "accept",
                reason: None,
                card: Some(CardSummary::from(&card)),
                entry: Some(entry),
            },
        ),
        ScanOutcome::Rejected { reason, card } => {
            let status = match reason {
                RejectReason::Malformed => StatusCode::BAD_REQUEST,
                RejectReason::UnknownCard => StatusCode::NOT_FOUND,
                RejectReason::Lost | RejectReason::Expired | RejectReason::Deactivated => {
                    StatusCode::FORBIDDEN
                }
            };
            (
                status,
                VerifyScanResponse {
                    decision: "reject",
                    reason: Some(reason.as_str()),
                    card: card.as_ref().map(CardSummary::from),
                    entry: None,
                },
            )
        }
    };

    Ok((status, Json(response)).into_response())
}

pub fn router() -> Router<AppState> {
    Router::new().route("/verify", post(verify_scan))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::services::notifier::Notifier;
    use axum::body::Body;
    use axum::http::Request;
    use secrecy::Secret;
    use tower::ServiceExt;

    fn test_state() -> AppState {
        // connect_lazy: handlers that never touch the pool need no server.
        let pool = sqlx::postgres::PgPoolOptions::new()
            .connect_lazy("postgres://127.0.0.1:1/gatepass")
            .unwrap();

        AppState {
            pool,
            config: Config {
                database_url: "postgres://127.0.0.1:1/gatepass".to_string(),
                host: "127.0.0.1".to_string(),
                port: 0,
                signing_key: Secret::new("test-signing-key".to_string()),
                notify_webhook_url: None,
            },
            notifier: Notifier::disabled(),
        }
    }

    fn verify_request(caller: Option<&str>, body: &str) -> Request<Body> {
        let mut builder = Request::builder()
            .method("POST")
            .uri("/verify")
            .header("content-type", "application/json");
        if let Some(caller) = caller {
            builder = builder.header("x-caller", caller);
        }
        builder.body(Body::from(body.to_string())).unwrap()
    }

    #[tokio::test]
    async fn test_malformed_payload_rejected_without_storage() {
        let app = router().with_state(test_state());

        let response = app
            .oneshot(verify_request(
                Some("security"),
                r#"{"payload":"!!garbage!!","location":"Gate1"}"#,
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["decision"], "reject");
        assert_eq!(json["reason"], "malformed");
    }

    #[tokio::test]
    async fn test_student_caller_cannot_verify() {
        let app = router().with_state(test_state());
        let caller = format!("student:{}", Uuid::new_v4());

        let response = app
            .oneshot(verify_request(Some(&caller), r#"{"payload":"x"}"#))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn test_missing_caller_header_is_unauthorized() {
        let app = router().with_state(test_state());

        let response = app
            .oneshot(verify_request(None, r#"{"payload":"x"}"#))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }
}
