//! Query -> ordered list of [`MailRecord`]s

use log::{debug, info};

use crate::attachments::AttachmentStore;
use crate::error::Result;
use crate::extract::{MailRecord, MailRecordExtractor};
use crate::gmail::api::MessageRef;
use crate::transport::{MailTransport, MessageFormat};

/// Runs a search and materializes every hit, one at a time
pub struct MailSearch<'a, T: MailTransport + ?Sized> {
    transport: &'a T,
    extractor: MailRecordExtractor<'a, T>,
}

impl<'a, T: MailTransport + ?Sized> MailSearch<'a, T> {
    pub fn new(transport: &'a T, store: &'a AttachmentStore) -> Self {
        Self {
            transport,
            extractor: MailRecordExtractor::new(transport, store),
        }
    }

    /// Search and extract the first page of results, in provider order
    ///
    /// A query with no hits gives an empty list. Any failing hit fails the
    /// whole search.
    pub fn search(&self, query: &str) -> Result<Vec<MailRecord>> {
        let list = self.transport.list_messages(query, None)?;
        let refs = list.messages.unwrap_or_default();
        if list.next_page_token.is_some() {
            debug!("Query {:?} has more pages; only the first is processed", query);
        }

        let records = self.extract_all(&refs)?;
        info!("Query {:?} returned {} messages", query, records.len());
        Ok(records)
    }

    /// Like [`search`](Self::search) but follows page tokens to the end
    pub fn search_all_pages(&self, query: &str) -> Result<Vec<MailRecord>> {
        let mut records = Vec::new();
        let mut page_token = None;

        loop {
            let list = self.transport.list_messages(query, page_token.as_deref())?;

            if let Some(refs) = list.messages {
                records.extend(self.extract_all(&refs)?);
            }

            match list.next_page_token {
                Some(token) => page_token = Some(token),
                None => break,
            }
        }

        info!(
            "Query {:?} returned {} messages across all pages",
            query,
            records.len()
        );
        Ok(records)
    }

    fn extract_all(&self, refs: &[MessageRef]) -> Result<Vec<MailRecord>> {
        refs.iter().map(|item| self.fetch_one(&item.id)).collect()
    }

    fn fetch_one(&self, id: &str) -> Result<MailRecord> {
        debug!("Fetching message {}", id);
        let raw = self.transport.get_message(id, MessageFormat::Raw)?;
        let full = self.transport.get_message(id, MessageFormat::Full)?;
        self.extractor.extract(&raw, &full)
    }
}
