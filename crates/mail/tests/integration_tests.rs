//! Integration tests for the mail crate
//!
//! These tests drive search and send end to end against the in-memory
//! transport, with attachments written to a temporary directory.

use base64::prelude::*;
use mail::gmail::api::{GmailMessage, Header, MessageBody, MessagePart, MessagePayload};
use mail::{
    AttachmentStore, Error, MailSearch, MailTransport, MemoryTransport, OutgoingMessage,
    date_slice, send,
};
use tempfile::TempDir;

/// Helper to create a received message: multipart/mixed around a
/// multipart/alternative body, like Gmail stores inbox mail
fn inbox_mime(subject: &str, date: &str) -> Vec<u8> {
    format!(
        "From: Alice <alice@example.com>\r\n\
         To: me@example.com\r\n\
         Subject: {subject}\r\n\
         Date: {date}\r\n\
         MIME-Version: 1.0\r\n\
         Content-Type: multipart/mixed; boundary=\"outer\"\r\n\
         \r\n\
         --outer\r\n\
         Content-Type: multipart/alternative; boundary=\"inner\"\r\n\
         \r\n\
         --inner\r\n\
         Content-Type: text/plain; charset=utf-8\r\n\
         \r\n\
         \r\n  Please find the report attached.  \r\n\
         --inner\r\n\
         Content-Type: text/html; charset=utf-8\r\n\
         \r\n\
         <p>Please find the report attached.</p>\r\n\
         --inner--\r\n\
         --outer\r\n\
         Content-Type: application/pdf; name=\"report.pdf\"\r\n\
         Content-Disposition: attachment; filename=\"report.pdf\"\r\n\
         Content-Transfer-Encoding: base64\r\n\
         \r\n\
         JVBERi0xLjQ=\r\n\
         --outer--\r\n"
    )
    .into_bytes()
}

/// Helper to create the full-format payload Gmail returns for the message above
fn inbox_payload(id: &str, attachment_id: &str) -> GmailMessage {
    GmailMessage {
        id: id.to_string(),
        payload: Some(MessagePayload {
            mime_type: Some("multipart/mixed".to_string()),
            parts: Some(vec![
                MessagePart {
                    part_id: Some("0".to_string()),
                    mime_type: Some("multipart/alternative".to_string()),
                    filename: Some(String::new()),
                    headers: Some(vec![Header::new(
                        "Content-Type",
                        "multipart/alternative; boundary=\"b1\"",
                    )]),
                    ..Default::default()
                },
                MessagePart {
                    part_id: Some("1".to_string()),
                    mime_type: Some("application/pdf".to_string()),
                    filename: Some("report.pdf".to_string()),
                    headers: Some(vec![
                        Header::new("Content-Type", "application/pdf; name=\"report.pdf\""),
                        Header::new(
                            "Content-Disposition",
                            "attachment; filename=\"report.pdf\"",
                        ),
                    ]),
                    body: Some(MessageBody {
                        attachment_id: Some(attachment_id.to_string()),
                        size: Some(8),
                        data: None,
                    }),
                    ..Default::default()
                },
            ]),
            ..Default::default()
        }),
        ..Default::default()
    }
}

fn raw(id: &str, labels: &[&str], mime: &[u8]) -> GmailMessage {
    GmailMessage {
        id: id.to_string(),
        label_ids: Some(labels.iter().map(|l| l.to_string()).collect()),
        raw: Some(BASE64_URL_SAFE.encode(mime)),
        ..Default::default()
    }
}

#[test]
fn test_search_saves_attachments_by_label_and_date() {
    let dir = TempDir::new().unwrap();
    let store = AttachmentStore::new(dir.path().join("attachments")).unwrap();
    let transport = MemoryTransport::new();

    let date = "Mon, 5 Jan 2024 10:00:00 +0000";
    transport.add_message(
        raw("m1", &["INBOX", "UNREAD"], &inbox_mime("Report", date)),
        inbox_payload("m1", "att-1"),
    );
    transport.add_attachment("m1", "att-1", b"%PDF-1.4");
    transport.add_query("has:attachment", &["m1"]);

    let records = MailSearch::new(&transport, &store)
        .search("has:attachment")
        .unwrap();

    assert_eq!(records.len(), 1);
    let record = &records[0];
    assert_eq!(record.label_id, "INBOX");
    assert_eq!(record.subject.as_deref(), Some("Report"));
    assert_eq!(record.date.as_deref(), Some(date));
    assert_eq!(record.body, "Please find the report attached.");

    let expected = dir
        .path()
        .join("attachments/INBOX/5 Jan 2024 10:00:00/report.pdf");
    assert_eq!(record.attachments, vec![expected.clone()]);
    assert_eq!(std::fs::read(&expected).unwrap(), b"%PDF-1.4");
}

#[test]
fn test_messages_sharing_label_and_date_share_folder() {
    let dir = TempDir::new().unwrap();
    let store = AttachmentStore::new(dir.path()).unwrap();
    let transport = MemoryTransport::new();

    let date = "Tue, 16 Apr 2024 09:15:42 -0700";
    for (id, att) in [("m1", "a1"), ("m2", "a2")] {
        transport.add_message(
            raw(id, &["INBOX"], &inbox_mime(id, date)),
            inbox_payload(id, att),
        );
    }
    transport.add_attachment("m1", "a1", b"first");
    transport.add_attachment("m2", "a2", b"second");
    transport.add_query("report", &["m1", "m2"]);

    let records = MailSearch::new(&transport, &store).search("report").unwrap();

    let folder = dir.path().join("INBOX").join(date_slice(date));
    assert_eq!(records[0].attachments[0], folder.join("report.pdf"));
    assert_eq!(records[1].attachments[0], folder.join("report.pdf"));
    // No dedup: the later message's attachment replaces the earlier one
    assert_eq!(std::fs::read(folder.join("report.pdf")).unwrap(), b"second");
    assert_eq!(std::fs::read_dir(&folder).unwrap().count(), 1);
}

#[test]
fn test_failed_attachment_fails_whole_search() {
    let dir = TempDir::new().unwrap();
    let store = AttachmentStore::new(dir.path()).unwrap();
    let transport = MemoryTransport::new();

    let date = "Mon, 5 Jan 2024 10:00:00 +0000";
    transport.add_message(raw("m1", &["INBOX"], &inbox_mime("ok", date)), inbox_payload("m1", "a1"));
    transport.add_message(raw("m2", &["INBOX"], &inbox_mime("bad", date)), inbox_payload("m2", "a2"));
    transport.add_attachment("m1", "a1", b"fine");
    transport.fail_attachment("m2", "a2");
    transport.add_query("q", &["m1", "m2"]);

    let err = MailSearch::new(&transport, &store).search("q").unwrap_err();
    assert!(matches!(err, Error::Transport { .. }));
}

#[test]
fn test_unlabelled_hit_is_malformed() {
    let dir = TempDir::new().unwrap();
    let store = AttachmentStore::new(dir.path()).unwrap();
    let transport = MemoryTransport::new();

    let date = "Mon, 5 Jan 2024 10:00:00 +0000";
    transport.add_message(raw("m1", &[], &inbox_mime("x", date)), inbox_payload("m1", "a1"));
    transport.add_query("q", &["m1"]);

    let err = MailSearch::new(&transport, &store).search("q").unwrap_err();
    assert!(matches!(err, Error::MalformedMessage(_)));
}

#[test]
fn test_sent_message_reads_back_as_record() {
    let dir = TempDir::new().unwrap();
    let store = AttachmentStore::new(dir.path()).unwrap();
    let transport = MemoryTransport::new();

    let notes = dir.path().join("notes.bin");
    std::fs::write(&notes, [1u8, 2, 3, 4]).unwrap();
    let message = OutgoingMessage::new("a@b.com", "S", "B").attach(&notes);
    send(&transport, &message).unwrap();

    // Feed the sent bytes back in as a SENT search hit
    let wire = transport.sent().remove(0);
    transport.add_message(
        GmailMessage {
            id: "s1".to_string(),
            label_ids: Some(vec!["SENT".to_string()]),
            raw: Some(wire.raw),
            ..Default::default()
        },
        GmailMessage {
            id: "s1".to_string(),
            payload: Some(MessagePayload::default()),
            ..Default::default()
        },
    );
    transport.add_query("in:sent", &["s1"]);

    let records = MailSearch::new(&transport, &store).search("in:sent").unwrap();

    assert_eq!(records[0].label_id, "SENT");
    assert_eq!(records[0].subject.as_deref(), Some("S"));
    assert!(records[0].to.as_deref().unwrap().contains("a@b.com"));
    assert_eq!(records[0].body, "B");
}

#[test]
fn test_transport_is_object_safe() {
    let transport = MemoryTransport::new();
    let dynamic: &dyn MailTransport = &transport;
    let dir = TempDir::new().unwrap();
    let store = AttachmentStore::new(dir.path()).unwrap();

    let records = MailSearch::new(dynamic, &store).search("nothing").unwrap();
    assert!(records.is_empty());
}
