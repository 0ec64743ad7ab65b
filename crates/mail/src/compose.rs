//! Outgoing message construction
//!
//! Builds MIME messages with `mail-builder` and encodes them into the
//! `{raw: ...}` envelope accepted by `users.messages.send`.

use base64::prelude::*;
use log::{debug, info};
use mail_builder::MessageBuilder;
use mail_builder::mime::MimePart;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};
use crate::gmail::api::SentMessage;
use crate::transport::MailTransport;

/// Fallback content type for anything that cannot be identified
const OCTET_STREAM: &str = "application/octet-stream";

/// Extensions that denote a compression wrapper rather than a content type
const ENCODING_EXTENSIONS: &[&str] = &["gz", "Z", "bz2", "xz", "br", "zst"];

/// A message ready to be sent
///
/// Built once through the consuming setters, then handed to [`send`].
#[derive(Debug, Clone)]
pub struct OutgoingMessage {
    sender: Option<String>,
    recipient: String,
    subject: String,
    body: String,
    attachments: Vec<PathBuf>,
}

/// Provider envelope for a MIME message
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WireMessage {
    /// base64url-encoded MIME bytes
    pub raw: String,
}

impl WireMessage {
    /// Wrap MIME bytes
    pub fn encode(mime: &[u8]) -> Self {
        Self {
            raw: BASE64_URL_SAFE.encode(mime),
        }
    }

    /// Recover the MIME bytes
    pub fn decode(&self) -> Result<Vec<u8>> {
        crate::decode_base64url(&self.raw)
            .ok_or_else(|| Error::Encoding("Wire message is not valid base64url".to_string()))
    }
}

impl OutgoingMessage {
    /// Create a message without attachments and without an explicit sender
    pub fn new(
        recipient: impl Into<String>,
        subject: impl Into<String>,
        body: impl Into<String>,
    ) -> Self {
        Self {
            sender: None,
            recipient: recipient.into(),
            subject: subject.into(),
            body: body.into(),
            attachments: Vec::new(),
        }
    }

    /// Set the From address (Gmail fills in the account address otherwise)
    pub fn sender(mut self, sender: impl Into<String>) -> Self {
        self.sender = Some(sender.into());
        self
    }

    /// Append an attachment by file path
    pub fn attach(mut self, path: impl Into<PathBuf>) -> Self {
        self.attachments.push(path.into());
        self
    }

    /// Serialize to MIME bytes
    ///
    /// Without attachments the message is a single `text/plain` part,
    /// otherwise a `multipart/mixed` holding the text and one part per file.
    pub fn to_mime_bytes(&self) -> Result<Vec<u8>> {
        let mut builder = MessageBuilder::new();
        if let Some(sender) = &self.sender {
            builder = builder.from(sender.as_str());
        }
        builder = builder
            .to(self.recipient.as_str())
            .subject(self.subject.as_str());

        builder = if self.attachments.is_empty() {
            builder.text_body(self.body.as_str())
        } else {
            let mut parts = Vec::with_capacity(self.attachments.len() + 1);
            parts.push(MimePart::new("text/plain", self.body.as_str()));
            for path in &self.attachments {
                parts.push(attachment_part(path)?);
            }
            builder.body(MimePart::new("multipart/mixed", parts))
        };

        builder
            .write_to_vec()
            .map_err(|e| Error::Encoding(format!("Failed to write MIME message: {}", e)))
    }

    /// Encode for the transport
    pub fn build(&self) -> Result<WireMessage> {
        Ok(WireMessage::encode(&self.to_mime_bytes()?))
    }
}

/// Build and send a message through the given transport
pub fn send<T: MailTransport + ?Sized>(
    transport: &T,
    message: &OutgoingMessage,
) -> Result<SentMessage> {
    let wire = message.build()?;
    debug!(
        "Sending message to {} ({} attachments, {} encoded bytes)",
        message.recipient,
        message.attachments.len(),
        wire.raw.len()
    );

    let ack = transport.send_message(&wire)?;
    info!("Sent message {} to {}", ack.id, message.recipient);
    Ok(ack)
}

/// Read one file and turn it into an attachment part
fn attachment_part(path: &Path) -> Result<MimePart<'static>> {
    let bytes = std::fs::read(path).map_err(|e| Error::filesystem(path, e))?;
    let content_type = guess_content_type(path);
    let (main_type, _) = content_type
        .split_once('/')
        .ok_or_else(|| Error::Encoding(format!("Unusable content type {}", content_type)))?;

    let filename = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .ok_or_else(|| Error::Encoding(format!("No file name in {}", path.display())))?;

    // Text goes in as decoded text; image, audio and everything else as
    // binary, distinguished only by the content type
    let part = if main_type == "text" {
        let text = String::from_utf8(bytes).map_err(|_| {
            Error::Encoding(format!("{} is not valid UTF-8 text", path.display()))
        })?;
        MimePart::new(content_type, text)
    } else {
        MimePart::new(content_type, bytes)
    };

    debug!("Attaching {}", filename);
    Ok(part.attachment(filename))
}

/// Guess a `main/sub` content type from the file name
fn guess_content_type(path: &Path) -> String {
    let guess = mime_guess::from_path(path).first();
    normalize_content_type(guess.as_ref().map_or("", |mime| mime.essence_str()), path)
}

/// Apply the octet-stream fallback to a guessed type
fn normalize_content_type(guess: &str, path: &Path) -> String {
    let compressed = path
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ENCODING_EXTENSIONS.contains(&ext));

    match guess.split_once('/') {
        Some((main, sub)) if !compressed && !main.is_empty() && !sub.is_empty() => {
            guess.to_string()
        }
        _ => OCTET_STREAM.to_string(),
    }
}
