use serde_json::json;

#[derive(thiserror::Error, Debug)]
pub enum DeliveryError {
    #[error("notification request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("notification endpoint returned {0}")]
    Endpoint(reqwest::StatusCode),
}

/// Best-effort notification sender.
///
/// Delivery is a webhook POST to whatever gateway is configured (mail
/// bridge, chat relay). Callers log failures and carry on; a notification
/// must never fail or roll back the operation that triggered it.
#[derive(Debug, Clone)]
pub struct Notifier {
    client: reqwest::Client,
    webhook_url: Option<String>,
}

impl Notifier {
    pub fn new(webhook_url: Option<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            webhook_url,
        }
    }

    /// A notifier with no endpoint configured; every send is a no-op.
    pub fn disabled() -> Self {
        Self::new(None)
    }

    #[tracing::instrument(skip(self, body))]
    pub async fn notify(
        &self,
        email: &str,
        subject: &str,
        body: &str,
    ) -> Result<(), DeliveryError> {
        let Some(url) = &self.webhook_url else {
            tracing::debug!("notification webhook not configured, skipping send");
            return Ok(());
        };

        let response = self
            .client
            .post(url)
            .json(&json!({
                "to": email,
                "subject": subject,
                "body": body,
            }))
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(DeliveryError::Endpoint(response.status()));
        }

        tracing::debug!(to = %email, %subject, "notification delivered");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn test_unconfigured_notifier_is_noop() {
        let notifier = Notifier::disabled();
        assert!(notifier
            .notify("holder@example.com", "subject", "body")
            .await
            .is_ok());
    }

    #[tokio::test]
    async fn test_posts_message_to_webhook() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/notify"))
            .and(body_partial_json(serde_json::json!({
                "to": "holder@example.com",
                "subject": "ID Card Reported Lost",
            })))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        let notifier = Notifier::new(Some(format!("{}/notify", server.uri())));
        let result = notifier
            .notify("holder@example.com", "ID Card Reported Lost", "body")
            .await;

        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn test_endpoint_failure_surfaces_delivery_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let notifier = Notifier::new(Some(server.uri()));
        let result = notifier.notify("holder@example.com", "subject", "body").await;

        assert!(matches!(result, Err(DeliveryError::Endpoint(status)) if status.as_u16() == 500));
    }
}
