//! Mail crate - Gmail search and send automation
//!
//! This crate provides:
//! - Outgoing MIME message construction and sending
//! - Search with per-message materialization into [`MailRecord`]s
//! - Attachment download into a `<label>/<date>` folder tree
//! - Gmail API client and OAuth authentication
//! - An in-memory transport for tests

pub mod attachments;
pub mod compose;
pub mod config;
pub mod error;
pub mod extract;
pub mod gmail;
pub mod search;
pub mod transport;

pub use attachments::{AttachmentStore, date_slice};
pub use compose::{OutgoingMessage, WireMessage, send};
pub use config::{GmailCredentials, Settings};
pub use error::{Error, Result};
pub use extract::{MailRecord, MailRecordExtractor};
pub use gmail::{GmailAuth, GmailClient};
pub use search::MailSearch;
pub use transport::{MailTransport, MemoryTransport, MessageFormat};

use base64::prelude::*;

/// Decode base64url data as Gmail returns it
///
/// Gmail uses URL-safe base64 but padding can vary, so we try multiple decoders.
pub(crate) fn decode_base64url(data: &str) -> Option<Vec<u8>> {
    let decoders: &[&base64::engine::GeneralPurpose] = &[
        &BASE64_URL_SAFE_NO_PAD,
        &BASE64_URL_SAFE,
        &BASE64_STANDARD,
        &BASE64_STANDARD_NO_PAD,
    ];

    decoders.iter().find_map(|decoder| decoder.decode(data).ok())
}
