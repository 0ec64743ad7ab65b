//! In-memory transport implementation
//!
//! Serves canned messages and attachments and records everything sent.
//! Used by the test suite.

use base64::prelude::*;
use std::collections::{HashMap, HashSet};
use std::sync::RwLock;

use super::{MailTransport, MessageFormat};
use crate::compose::WireMessage;
use crate::error::{Error, Result};
use crate::gmail::api::{
    AttachmentResponse, GmailMessage, ListMessagesResponse, MessageRef, SentMessage,
};

/// In-memory implementation of MailTransport
///
/// Uses HashMaps protected by RwLocks for thread-safe access.
#[derive(Default)]
pub struct MemoryTransport {
    /// query -> pages of message IDs
    queries: RwLock<HashMap<String, Vec<Vec<String>>>>,
    /// message ID -> (raw format, full format)
    messages: RwLock<HashMap<String, (GmailMessage, GmailMessage)>>,
    /// (message ID, attachment ID) -> base64url data
    attachments: RwLock<HashMap<(String, String), String>>,
    failing_attachments: RwLock<HashSet<(String, String)>>,
    sent: RwLock<Vec<WireMessage>>,
    calls: RwLock<Vec<String>>,
}

impl MemoryTransport {
    /// Create a new empty transport
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a message in both its raw and full shapes
    pub fn add_message(&self, raw: GmailMessage, full: GmailMessage) {
        self.messages
            .write()
            .unwrap()
            .insert(raw.id.clone(), (raw, full));
    }

    /// Make `query` return the given message IDs on a single page
    pub fn add_query(&self, query: &str, ids: &[&str]) {
        self.add_query_pages(query, &[ids]);
    }

    /// Make `query` return the given pages, linked by page tokens
    pub fn add_query_pages(&self, query: &str, pages: &[&[&str]]) {
        let pages = pages
            .iter()
            .map(|page| page.iter().map(|id| id.to_string()).collect())
            .collect();
        self.queries
            .write()
            .unwrap()
            .insert(query.to_string(), pages);
    }

    /// Register attachment bytes, stored base64url-encoded like Gmail returns them
    pub fn add_attachment(&self, message_id: &str, attachment_id: &str, data: &[u8]) {
        self.attachments.write().unwrap().insert(
            (message_id.to_string(), attachment_id.to_string()),
            BASE64_URL_SAFE.encode(data),
        );
    }

    /// Make fetching this attachment fail with a server error
    pub fn fail_attachment(&self, message_id: &str, attachment_id: &str) {
        self.failing_attachments
            .write()
            .unwrap()
            .insert((message_id.to_string(), attachment_id.to_string()));
    }

    /// Messages passed to `send_message`, in order
    pub fn sent(&self) -> Vec<WireMessage> {
        self.sent.read().unwrap().clone()
    }

    /// Every call made so far, formatted as `op:arg[:arg]`
    pub fn calls(&self) -> Vec<String> {
        self.calls.read().unwrap().clone()
    }

    fn record(&self, call: String) {
        self.calls.write().unwrap().push(call);
    }
}

impl MailTransport for MemoryTransport {
    fn list_messages(
        &self,
        query: &str,
        page_token: Option<&str>,
    ) -> Result<ListMessagesResponse> {
        self.record(format!("list:{}", query));

        let queries = self.queries.read().unwrap();
        let Some(pages) = queries.get(query) else {
            return Ok(ListMessagesResponse {
                result_size_estimate: Some(0),
                ..Default::default()
            });
        };

        let index = match page_token {
            Some(token) => token
                .parse::<usize>()
                .map_err(|_| Error::transport("Invalid page token", ureq::Error::StatusCode(400)))?,
            None => 0,
        };
        let page = pages.get(index).cloned().unwrap_or_default();
        let next_page_token = (index + 1 < pages.len()).then(|| (index + 1).to_string());

        Ok(ListMessagesResponse {
            messages: if page.is_empty() {
                None
            } else {
                Some(
                    page.into_iter()
                        .map(|id| MessageRef {
                            id,
                            thread_id: String::new(),
                        })
                        .collect(),
                )
            },
            next_page_token,
            result_size_estimate: Some(pages.iter().map(Vec::len).sum::<usize>() as u32),
        })
    }

    fn get_message(&self, id: &str, format: MessageFormat) -> Result<GmailMessage> {
        self.record(format!("get:{}:{}", id, format.as_str()));

        let messages = self.messages.read().unwrap();
        let (raw, full) = messages.get(id).ok_or_else(|| {
            Error::transport(
                format!("Failed to fetch message {}", id),
                ureq::Error::StatusCode(404),
            )
        })?;

        Ok(match format {
            MessageFormat::Raw => raw.clone(),
            MessageFormat::Full => full.clone(),
        })
    }

    fn get_attachment(&self, message_id: &str, attachment_id: &str) -> Result<AttachmentResponse> {
        self.record(format!("attachment:{}:{}", message_id, attachment_id));

        let key = (message_id.to_string(), attachment_id.to_string());
        if self.failing_attachments.read().unwrap().contains(&key) {
            return Err(Error::transport(
                format!("Failed to fetch attachment {}", attachment_id),
                ureq::Error::StatusCode(500),
            ));
        }

        let data = self.attachments.read().unwrap().get(&key).cloned();
        Ok(AttachmentResponse {
            attachment_id: Some(attachment_id.to_string()),
            size: None,
            data,
        })
    }

    fn send_message(&self, message: &WireMessage) -> Result<SentMessage> {
        self.record("send".to_string());
        // Gmail rejects envelopes whose raw field does not decode
        message.decode()?;

        let mut sent = self.sent.write().unwrap();
        sent.push(message.clone());
        Ok(SentMessage {
            id: format!("sent-{}", sent.len()),
            thread_id: String::new(),
            label_ids: Some(vec!["SENT".to_string()]),
        })
    }
}
