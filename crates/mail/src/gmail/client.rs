//! Gmail API HTTP client
//!
//! Implements [`MailTransport`] against the Gmail REST API.
//! Uses synchronous HTTP (ureq) to be executor-agnostic.

use log::debug;
use serde::de::DeserializeOwned;

use super::GmailAuth;
use super::api::{AttachmentResponse, GmailMessage, ListMessagesResponse, SentMessage};
use crate::compose::WireMessage;
use crate::error::{Error, Result};
use crate::transport::{MailTransport, MessageFormat};

/// Gmail API client for the authenticated user
pub struct GmailClient {
    auth: GmailAuth,
}

impl GmailClient {
    /// Gmail API base URL
    const BASE_URL: &'static str = "https://gmail.googleapis.com/gmail/v1";

    /// Create a new Gmail client
    pub fn new(auth: GmailAuth) -> Self {
        Self { auth }
    }

    fn access_token(&self) -> Result<String> {
        self.auth.get_access_token().map_err(Error::Auth)
    }

    /// GET a URL and decode the JSON response
    fn get_json<T: DeserializeOwned>(&self, url: &str, what: &str) -> Result<T> {
        let access_token = self.access_token()?;
        debug!("GET {}", url);

        let mut response = ureq::get(url)
            .header("Authorization", &format!("Bearer {}", access_token))
            .call()
            .map_err(|e| classify(format!("Failed to send {} request", what), e))?;

        response
            .body_mut()
            .read_json()
            .map_err(|e| Error::transport(format!("Failed to parse {} response", what), e))
    }
}

impl MailTransport for GmailClient {
    fn list_messages(
        &self,
        query: &str,
        page_token: Option<&str>,
    ) -> Result<ListMessagesResponse> {
        let mut url = format!(
            "{}/users/me/messages?q={}",
            Self::BASE_URL,
            urlencoding::encode(query)
        );

        if let Some(token) = page_token {
            url.push_str(&format!("&pageToken={}", urlencoding::encode(token)));
        }

        self.get_json(&url, "list messages")
    }

    fn get_message(&self, id: &str, format: MessageFormat) -> Result<GmailMessage> {
        let url = format!(
            "{}/users/me/messages/{}?format={}",
            Self::BASE_URL,
            urlencoding::encode(id),
            format.as_str()
        );

        self.get_json(&url, "get message")
    }

    fn get_attachment(&self, message_id: &str, attachment_id: &str) -> Result<AttachmentResponse> {
        let url = format!(
            "{}/users/me/messages/{}/attachments/{}",
            Self::BASE_URL,
            urlencoding::encode(message_id),
            urlencoding::encode(attachment_id)
        );

        self.get_json(&url, "get attachment")
    }

    fn send_message(&self, message: &WireMessage) -> Result<SentMessage> {
        let access_token = self.access_token()?;
        let url = format!("{}/users/me/messages/send", Self::BASE_URL);
        debug!("POST {}", url);

        let mut response = ureq::post(&url)
            .header("Authorization", &format!("Bearer {}", access_token))
            .send_json(message)
            .map_err(|e| classify("Failed to send message".to_string(), e))?;

        response
            .body_mut()
            .read_json()
            .map_err(|e| Error::transport("Failed to parse send response", e))
    }
}

/// Rejected credentials are an auth problem, everything else is transport
fn classify(context: String, err: ureq::Error) -> Error {
    match err {
        ureq::Error::StatusCode(status @ (401 | 403)) => Error::Auth(anyhow::anyhow!(
            "{}: Gmail rejected the access token (HTTP {})",
            context,
            status
        )),
        other => Error::transport(context, other),
    }
}
