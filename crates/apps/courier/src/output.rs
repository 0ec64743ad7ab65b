//! Human-readable rendering of search results

use mail::MailRecord;

/// Scale a byte count to a short human form
///
/// e.g. 1253656 => "1.20MB", 1253656678 => "1.17GB"
pub fn format_size(bytes: u64) -> String {
    const FACTOR: f64 = 1024.0;
    let mut value = bytes as f64;

    for unit in ["", "K", "M", "G", "T", "P", "E", "Z"] {
        if value < FACTOR {
            return format!("{:.2}{}B", value, unit);
        }
        value /= FACTOR;
    }
    format!("{:.2}YB", value)
}

pub fn print_records(records: &[MailRecord]) {
    if records.is_empty() {
        println!("No messages found");
        return;
    }

    for (index, record) in records.iter().enumerate() {
        if index > 0 {
            println!();
        }
        println!("[{}] {}", record.label_id, record.subject.as_deref().unwrap_or("(no subject)"));
        println!("From: {}", record.from.as_deref().unwrap_or("-"));
        println!("To:   {}", record.to.as_deref().unwrap_or("-"));
        println!("Date: {}", record.date.as_deref().unwrap_or("-"));
        println!();
        println!("{}", record.body);

        for path in &record.attachments {
            let size = std::fs::metadata(path)
                .map(|m| format_size(m.len()))
                .unwrap_or_else(|_| "?".to_string());
            println!("  + {} ({})", path.display(), size);
        }
    }
}
