use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::models::MessageRecord;

const RESEND_ENDPOINT: &str = "https://api.resend.com/emails";

/// OutgoingEmail
///
/// Provider-neutral transactional email. Serializes to the body the Resend
/// API expects.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OutgoingEmail {
    pub from: String,
    pub to: Vec<String>,
    pub subject: String,
    pub html: String,
}

#[derive(Debug, Error, PartialEq)]
pub enum MailError {
    #[error("email provider is not configured")]
    NotConfigured,
    #[error("email provider returned {status}: {body}")]
    Provider { status: u16, body: String },
    #[error("email provider unreachable: {0}")]
    Transport(String),
}

// 1. Mailer Contract
/// Mailer
///
/// Sends one transactional email and returns the provider's message id. The
/// real client talks to Resend; `MockMailer` records messages for tests.
#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, email: &OutgoingEmail) -> Result<String, MailError>;
}

/// MailerState
///
/// The concrete type used to share the mailer across the application state.
pub type MailerState = Arc<dyn Mailer>;

// 2. The Real Implementation (Resend)
/// ResendMailer
///
/// Posts to the Resend REST API with the API key as a bearer credential. No
/// retries: a failed send is reported to the caller once.
#[derive(Clone)]
pub struct ResendMailer {
    client: reqwest::Client,
    api_key: Option<String>,
    endpoint: String,
}

#[derive(Deserialize)]
struct ResendResponse {
    id: String,
}

impl ResendMailer {
    pub fn new(api_key: Option<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key,
            endpoint: RESEND_ENDPOINT.to_string(),
        }
    }

    /// Points the client at a different base URL (staging proxy, local stub).
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }
}

#[async_trait]
impl Mailer for ResendMailer {
    async fn send(&self, email: &OutgoingEmail) -> Result<String, MailError> {
        let api_key = self.api_key.as_deref().ok_or(MailError::NotConfigured)?;

        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(api_key)
            .json(email)
            .send()
            .await
            .map_err(|e| MailError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(MailError::Provider {
                status: status.as_u16(),
                body,
            });
        }

        let sent = response
            .json::<ResendResponse>()
            .await
            .map_err(|e| MailError::Transport(e.to_string()))?;
        Ok(sent.id)
    }
}

// 3. The Mock Implementation (For Tests)
/// MockMailer
///
/// Records every message it is asked to send.
#[derive(Default)]
pub struct MockMailer {
    /// When true, every send fails with a provider error.
    pub should_fail: bool,
    sent: Mutex<Vec<OutgoingEmail>>,
}

impl MockMailer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn new_failing() -> Self {
        Self {
            should_fail: true,
            ..Self::default()
        }
    }

    pub fn sent(&self) -> Vec<OutgoingEmail> {
        self.sent
            .lock()
            .map(|sent| sent.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl Mailer for MockMailer {
    async fn send(&self, email: &OutgoingEmail) -> Result<String, MailError> {
        if self.should_fail {
            return Err(MailError::Provider {
                status: 500,
                body: "Mock Mailer Error: Simulation requested".to_string(),
            });
        }
        let mut sent = self
            .sent
            .lock()
            .map_err(|e| MailError::Transport(e.to_string()))?;
        sent.push(email.clone());
        Ok(format!("mock-{}", sent.len()))
    }
}

/// message_email
///
/// Renders the "new message" notification for a freshly inserted message row.
pub fn message_email(record: &MessageRecord, from: &str, to: &str) -> OutgoingEmail {
    let html = format!(
        "<h2>New message received</h2>\
         <p><strong>From user:</strong> {}</p>\
         <p><strong>Sent at:</strong> {}</p>\
         <blockquote>{}</blockquote>",
        escape_html(&record.sender_id),
        escape_html(&record.created_at),
        escape_html(&record.content).replace('\n', "<br>"),
    );

    OutgoingEmail {
        from: from.to_string(),
        to: vec![to.to_string()],
        subject: "New message received".to_string(),
        html,
    }
}

fn escape_html(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}
