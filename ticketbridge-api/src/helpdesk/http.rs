//! HTTP helpdesk client
//!
//! Wire contract:
//!
//! | Operation     | Request                          | Success body                   |
//! |---------------|----------------------------------|--------------------------------|
//! | create ticket | `POST {base}/tickets`            | `{"ticketId", "ticketUrl"}`    |
//! | append note   | `POST {base}/tickets/{id}/notes` | `{"success"?, "message"?}`     |
//! | health        | `GET {base}/health`              | any 2xx                        |
//!
//! Requests carry `Authorization: Bearer <api key>` when a key is configured.
//! Non-2xx answers become [`HelpdeskError::Upstream`] with the upstream status.
//! Path segments such as the ticket id are percent-encoded, so `/`, `?` and
//! `#` inside an id never change the target route.

use crate::config::HelpdeskConfig;
use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response, StatusCode, Url};
use secrecy::{ExposeSecret, SecretString};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use ticketbridge_core::{
    AppendNoteOutcome, ConfigError, CreatedTicket, HelpdeskCapability, HelpdeskError, NewTicket,
    NoteAuthor,
};

/// Helpdesk reached over HTTP.
pub struct HttpHelpdesk {
    client: Client,
    base_url: Url,
    api_key: Option<SecretString>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct AppendNoteBody<'a> {
    note: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    author: Option<NoteAuthor>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AppendNoteReply {
    #[serde(default = "default_success")]
    success: bool,
    #[serde(default)]
    message: Option<String>,
}

fn default_success() -> bool {
    true
}

/// Error payload some helpdesks return; either field may carry the text.
#[derive(Debug, Default, Deserialize)]
struct ErrorReply {
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

impl HttpHelpdesk {
    pub fn new(config: &HelpdeskConfig) -> Result<Self, ConfigError> {
        let raw = config
            .url
            .as_deref()
            .map(|url| url.trim_end_matches('/'))
            .filter(|url| !url.is_empty())
            .ok_or_else(|| ConfigError::MissingRequired {
                field: "TICKETBRIDGE_HELPDESK_URL".to_string(),
            })?;

        let invalid_url = |reason: String| ConfigError::InvalidValue {
            field: "TICKETBRIDGE_HELPDESK_URL".to_string(),
            value: raw.to_string(),
            reason,
        };
        let base_url = Url::parse(raw).map_err(|e| invalid_url(e.to_string()))?;
        if base_url.cannot_be_a_base() || !matches!(base_url.scheme(), "http" | "https") {
            return Err(invalid_url("expected an http(s) base URL".to_string()));
        }

        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| ConfigError::InvalidValue {
                field: "TICKETBRIDGE_HELPDESK_TIMEOUT_SECS".to_string(),
                value: config.timeout.as_secs().to_string(),
                reason: format!("failed to build HTTP client: {}", e),
            })?;

        Ok(Self {
            client,
            base_url,
            api_key: config.api_key.clone(),
        })
    }

    pub fn base_url(&self) -> &str {
        self.base_url.as_str()
    }

    /// Base URL with `segments` appended, each one percent-encoded.
    fn endpoint(&self, segments: &[&str]) -> Result<Url, HelpdeskError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| HelpdeskError::Transport {
                message: format!("Helpdesk URL {} cannot take a path", self.base_url),
            })?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    fn authorized(&self, builder: RequestBuilder) -> RequestBuilder {
        match &self.api_key {
            Some(key) => builder.bearer_auth(key.expose_secret()),
            None => builder,
        }
    }

    async fn send(&self, builder: RequestBuilder) -> Result<Response, HelpdeskError> {
        self.authorized(builder)
            .send()
            .await
            .map_err(|e| HelpdeskError::Transport {
                message: e.to_string(),
            })
    }

    async fn read_json<T: DeserializeOwned>(response: Response) -> Result<T, HelpdeskError> {
        response
            .json::<T>()
            .await
            .map_err(|e| HelpdeskError::InvalidResponse {
                message: format!("Failed to parse response: {}", e),
            })
    }

    async fn upstream_error(response: Response) -> HelpdeskError {
        let status = response.status();
        let text = response
            .text()
            .await
            .unwrap_or_else(|_| "Unknown error".to_string());
        let reply = serde_json::from_str::<ErrorReply>(&text).unwrap_or_default();
        let message = reply
            .message
            .or(reply.error)
            .unwrap_or_else(|| if text.is_empty() { status.to_string() } else { text });

        HelpdeskError::Upstream {
            status: status.as_u16(),
            message,
        }
    }
}

impl std::fmt::Debug for HttpHelpdesk {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpHelpdesk")
            .field("base_url", &self.base_url.as_str())
            .field("api_key", &self.api_key.as_ref().map(|_| "[REDACTED]"))
            .finish()
    }
}

#[async_trait]
impl HelpdeskCapability for HttpHelpdesk {
    fn name(&self) -> &'static str {
        "http"
    }

    async fn create_ticket(&self, ticket: NewTicket) -> Result<CreatedTicket, HelpdeskError> {
        let url = self.endpoint(&["tickets"])?;
        let response = self.send(self.client.post(url).json(&ticket)).await?;

        if response.status().is_success() {
            Self::read_json::<CreatedTicket>(response).await
        } else {
            Err(Self::upstream_error(response).await)
        }
    }

    async fn append_note(
        &self,
        ticket_id: &str,
        note: &str,
        author: Option<NoteAuthor>,
    ) -> Result<AppendNoteOutcome, HelpdeskError> {
        // Dot segments are dropped by URL normalisation and would address
        // another route.
        if matches!(ticket_id, "" | "." | "..") {
            return Err(HelpdeskError::TicketNotFound {
                ticket_id: ticket_id.to_string(),
            });
        }

        let url = self.endpoint(&["tickets", ticket_id, "notes"])?;
        let body = AppendNoteBody { note, author };
        let response = self.send(self.client.post(url).json(&body)).await?;

        match response.status() {
            status if status.is_success() => {
                let reply = Self::read_json::<AppendNoteReply>(response).await?;
                Ok(AppendNoteOutcome {
                    success: reply.success,
                    message: reply
                        .message
                        .unwrap_or_else(|| format!("Note appended to {}", ticket_id)),
                })
            }
            StatusCode::NOT_FOUND => Err(HelpdeskError::TicketNotFound {
                ticket_id: ticket_id.to_string(),
            }),
            _ => Err(Self::upstream_error(response).await),
        }
    }

    async fn health_check(&self) -> bool {
        let url = match self.endpoint(&["health"]) {
            Ok(url) => url,
            Err(err) => {
                tracing::debug!(error = %err, "Helpdesk health URL unusable");
                return false;
            }
        };
        match self.send(self.client.get(url)).await {
            Ok(response) => response.status().is_success(),
            Err(err) => {
                tracing::debug!(error = %err, "Helpdesk health check failed");
                false
            }
        }
    }
}
