//! Provider message to [`MailRecord`] materialization
//!
//! A search hit is fetched twice: the raw MIME blob supplies headers and
//! body, the full payload tree supplies attachment references.

use log::{debug, warn};
use mail_parser::{Message, MessageParser, MessagePart, MessagePartId, PartType};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::attachments::AttachmentStore;
use crate::decode_base64url;
use crate::error::{Error, Result};
use crate::gmail::api::{GmailMessage, MessagePart as PayloadPart};
use crate::transport::MailTransport;

/// Structured view of one search result
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MailRecord {
    /// First label of the message (e.g. "INBOX", "SENT")
    pub label_id: String,
    pub subject: Option<String>,
    pub from: Option<String>,
    pub to: Option<String>,
    /// Date header exactly as sent
    pub date: Option<String>,
    pub body: String,
    /// Absolute paths of the attachments written to disk, in part order
    pub attachments: Vec<PathBuf>,
}

/// Where the body text lives in the MIME tree
///
/// Received mail usually nests a `multipart/alternative` as the first
/// child; mail sent from this tool has the text part directly.
#[derive(Debug, Clone, Copy)]
enum BodyShape<'a> {
    /// First child is itself multipart: body is its first child, trimmed
    Alternative(&'a MessagePart<'a>),
    /// First child (or the root of a single-part message): body as is
    Simple(&'a MessagePart<'a>),
}

impl<'a> BodyShape<'a> {
    fn classify(message: &'a Message<'a>) -> Result<Self> {
        let root = message
            .part(0)
            .ok_or_else(|| Error::malformed("MIME message has no parts"))?;

        let PartType::Multipart(children) = &root.body else {
            return Ok(BodyShape::Simple(root));
        };
        let first = first_child(message, children)?;

        match &first.body {
            PartType::Multipart(nested) => {
                Ok(BodyShape::Alternative(first_child(message, nested)?))
            }
            _ => Ok(BodyShape::Simple(first)),
        }
    }

    fn body(&self) -> String {
        match self {
            BodyShape::Alternative(part) => part_text(part).trim().to_string(),
            BodyShape::Simple(part) => part_text(part),
        }
    }
}

/// Turns provider messages into [`MailRecord`]s, saving attachments on the way
pub struct MailRecordExtractor<'a, T: MailTransport + ?Sized> {
    transport: &'a T,
    store: &'a AttachmentStore,
}

impl<'a, T: MailTransport + ?Sized> MailRecordExtractor<'a, T> {
    pub fn new(transport: &'a T, store: &'a AttachmentStore) -> Self {
        Self { transport, store }
    }

    /// Build a record from the raw-format and full-format fetches of one message
    ///
    /// Any failure, including a single attachment download, fails the
    /// whole record. Attachments already written stay on disk.
    pub fn extract(&self, raw: &GmailMessage, full: &GmailMessage) -> Result<MailRecord> {
        let blob = raw
            .raw
            .as_deref()
            .ok_or_else(|| Error::malformed(format!("Message {} has no raw content", raw.id)))?;
        let bytes = decode_base64url(blob).ok_or_else(|| {
            Error::malformed(format!("Message {} raw content is not base64url", raw.id))
        })?;
        let mime = MessageParser::default()
            .parse(&bytes)
            .ok_or_else(|| Error::malformed(format!("Message {} is not valid MIME", raw.id)))?;

        let label_id = raw
            .label_ids
            .as_ref()
            .and_then(|labels| labels.first())
            .cloned()
            .ok_or_else(|| Error::malformed(format!("Message {} has no labels", raw.id)))?;

        let subject = mime.subject().map(str::to_string);
        let from = header_value(&mime, "From");
        let to = header_value(&mime, "To");
        let date = header_value(&mime, "Date");

        let body = BodyShape::classify(&mime)?.body();

        let attachments = self.save_attachments(&raw.id, full, &label_id, date.as_deref())?;

        debug!(
            "Extracted message {} ({}, {} attachments)",
            raw.id,
            label_id,
            attachments.len()
        );

        Ok(MailRecord {
            label_id,
            subject,
            from,
            to,
            date,
            body,
            attachments,
        })
    }

    /// Download every top-level part marked as an attachment
    fn save_attachments(
        &self,
        message_id: &str,
        full: &GmailMessage,
        label_id: &str,
        date: Option<&str>,
    ) -> Result<Vec<PathBuf>> {
        let payload = full
            .payload
            .as_ref()
            .ok_or_else(|| Error::malformed(format!("Message {} has no payload", message_id)))?;
        let Some(parts) = &payload.parts else {
            return Ok(Vec::new());
        };

        let mut folder = None;
        let mut written = Vec::new();

        for (index, part) in parts.iter().enumerate() {
            if !is_attachment(part) {
                continue;
            }
            let part_id = part.part_id.clone().unwrap_or_else(|| index.to_string());

            let filename = part
                .filename
                .as_deref()
                .filter(|name| !name.is_empty())
                .ok_or_else(|| {
                    Error::MissingFilename(format!("part {} of message {}", part_id, message_id))
                })?;
            let attachment_id = part
                .body
                .as_ref()
                .and_then(|body| body.attachment_id.as_deref())
                .ok_or_else(|| {
                    Error::malformed(format!(
                        "Attachment {} in message {} has no attachment id",
                        filename, message_id
                    ))
                })?;

            let attachment = self.transport.get_attachment(message_id, attachment_id)?;
            let Some(data) = attachment.data.filter(|data| !data.is_empty()) else {
                warn!(
                    "Attachment {} in message {} has no data, skipping",
                    filename, message_id
                );
                continue;
            };
            let bytes = decode_base64url(&data).ok_or_else(|| {
                Error::malformed(format!(
                    "Attachment {} in message {} is not base64url",
                    filename, message_id
                ))
            })?;

            let target = match folder.take() {
                Some(target) => target,
                None => {
                    let date = date.ok_or_else(|| {
                        Error::malformed(format!("Message {} has no Date header", message_id))
                    })?;
                    self.store.ensure_folder(label_id, date)?
                }
            };
            written.push(self.store.write(&target, filename, &bytes)?);
            folder = Some(target);
        }

        Ok(written)
    }
}

/// Whether a payload part carries `Content-Disposition: attachment...`
///
/// Header name and disposition type are both matched case-insensitively.
fn is_attachment(part: &PayloadPart) -> bool {
    part.header("Content-Disposition")
        .is_some_and(|value| value.to_ascii_lowercase().contains("attachment"))
}

/// Raw value of a top-level header, unfolded and trimmed
fn header_value(message: &Message<'_>, name: &'static str) -> Option<String> {
    message
        .header_raw(name)
        .map(|raw| raw.replace("\r\n", "").replace('\n', "").trim().to_string())
}

fn first_child<'a>(message: &'a Message<'a>, children: &[MessagePartId]) -> Result<&'a MessagePart<'a>> {
    children
        .first()
        .and_then(|id| message.part(*id))
        .ok_or_else(|| Error::malformed("Multipart section has no children"))
}

/// Transfer-decoded text of a leaf part
fn part_text(part: &MessagePart<'_>) -> String {
    match &part.body {
        PartType::Text(text) | PartType::Html(text) => text.to_string(),
        _ => String::from_utf8_lossy(part.contents()).into_owned(),
    }
}
