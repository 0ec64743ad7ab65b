//! Provider transport boundary
//!
//! The pipeline talks to the mail provider only through [`MailTransport`].
//! [`GmailClient`](crate::gmail::GmailClient) is the REST implementation,
//! [`MemoryTransport`] an in-process one for tests and dry runs.

mod memory;

pub use memory::MemoryTransport;

use crate::compose::WireMessage;
use crate::error::Result;
use crate::gmail::api::{AttachmentResponse, GmailMessage, ListMessagesResponse, SentMessage};

/// Response shape requested from `get_message`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MessageFormat {
    /// Whole MIME message as a base64url blob
    Raw,
    /// Parsed payload tree with attachment references
    Full,
}

impl MessageFormat {
    /// Value of the `format` query parameter
    pub fn as_str(&self) -> &'static str {
        match self {
            MessageFormat::Raw => "raw",
            MessageFormat::Full => "full",
        }
    }
}

/// Logical operations the pipeline needs from a mail provider
///
/// All calls act on the authenticated user (`me`) and block until done.
pub trait MailTransport: Send + Sync {
    /// List message references matching a search query (one page)
    fn list_messages(&self, query: &str, page_token: Option<&str>)
    -> Result<ListMessagesResponse>;

    /// Fetch one message in the given format
    fn get_message(&self, id: &str, format: MessageFormat) -> Result<GmailMessage>;

    /// Fetch the content of one attachment
    fn get_attachment(&self, message_id: &str, attachment_id: &str)
    -> Result<AttachmentResponse>;

    /// Send an encoded message
    fn send_message(&self, message: &WireMessage) -> Result<SentMessage>;
}
