//! REST collaborator for conversation creation.
//!
//! Conversation records are server-owned; creating one happens out-of-band
//! from the realtime channel. Failures are surfaced as `None` — the calling
//! layer decides user-facing messaging, nothing here ever propagates an
//! error to the caller.

use serde::{Deserialize, Serialize};
use tracing::warn;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct CreateConversationRequest<'a> {
    other_user_email: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    project_name: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    job_id: Option<&'a str>,
}

#[derive(Debug, Deserialize)]
struct CreateConversationResponse {
    success: bool,
    data: Option<ConversationRef>,
}

#[derive(Debug, Deserialize)]
struct ConversationRef {
    id: String,
}

#[derive(Debug, Clone)]
pub struct ConversationApi {
    client: reqwest::Client,
    base_url: String,
}

impl ConversationApi {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into(),
        }
    }

    /// `POST {base}/conversations`. Returns the new conversation id, or
    /// `None` on any failure (network error or unsuccessful response).
    pub async fn create_conversation(
        &self,
        other_user_email: &str,
        project_name: Option<&str>,
        job_id: Option<&str>,
    ) -> Option<String> {
        let url = format!("{}/conversations", self.base_url);
        let body = CreateConversationRequest {
            other_user_email,
            project_name,
            job_id,
        };

        let resp = match self.client.post(&url).json(&body).send().await {
            Ok(resp) => resp,
            Err(e) => {
                warn!("[REST] create_conversation request failed: {}", e);
                return None;
            }
        };
        if !resp.status().is_success() {
            warn!("[REST] create_conversation returned {}", resp.status());
            return None;
        }
        match resp.json::<CreateConversationResponse>().await {
            Ok(body) if body.success => match body.data {
                Some(conversation) => Some(conversation.id),
                None => {
                    warn!("[REST] create_conversation succeeded without an id");
                    None
                }
            },
            Ok(_) => {
                warn!("[REST] create_conversation reported failure");
                None
            }
            Err(e) => {
                warn!("[REST] create_conversation response unparseable: {}", e);
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_body_wire_shape() {
        let body = CreateConversationRequest {
            other_user_email: "bob@example.com",
            project_name: Some("Logo redesign"),
            job_id: None,
        };
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["otherUserEmail"], "bob@example.com");
        assert_eq!(json["projectName"], "Logo redesign");
        assert!(json.get("jobId").is_none());
    }

    #[test]
    fn response_parses_success_and_failure() {
        let ok: CreateConversationResponse =
            serde_json::from_str(r#"{"success":true,"data":{"id":"c-42"}}"#).unwrap();
        assert!(ok.success);
        assert_eq!(ok.data.unwrap().id, "c-42");

        let failed: CreateConversationResponse =
            serde_json::from_str(r#"{"success":false,"data":null}"#).unwrap();
        assert!(!failed.success);
        assert!(failed.data.is_none());
    }

    #[tokio::test]
    async fn network_failure_returns_none() {
        // Nothing listens on this port; the request must degrade to None.
        let api = ConversationApi::new("http://127.0.0.1:1/api");
        let id = api
            .create_conversation("bob@example.com", None, None)
            .await;
        assert!(id.is_none());
    }
}
