//! On-disk attachment layout
//!
//! Directory structure:
//! ```text
//! attachments/
//!   INBOX/
//!     5 Jan 2024 10:00:00/
//!       report.pdf
//!   SENT/
//!     12 Feb 2024 08:30:12/
//!       photo.jpg
//! ```
//!
//! The date level is the `Date` header with its first 5 and last 6
//! characters removed (`"Mon, 5 Jan 2024 10:00:00 +0000"` becomes
//! `"5 Jan 2024 10:00:00"`).

use std::fs;
use std::path::{Component, Path, PathBuf};

use log::debug;

use crate::error::{Error, Result};

/// Characters stripped from the front of the date header (weekday prefix)
const DATE_PREFIX_CHARS: usize = 5;
/// Characters stripped from the back of the date header (zone suffix)
const DATE_SUFFIX_CHARS: usize = 6;

/// Writes attachments under `<root>/<label>/<date slice>/`
#[derive(Debug, Clone)]
pub struct AttachmentStore {
    root: PathBuf,
}

impl AttachmentStore {
    /// Create a store rooted at `root`
    ///
    /// A relative root is resolved against the current working directory
    /// here, once. Nothing else in the store looks at the working directory.
    pub fn new(root: impl AsRef<Path>) -> Result<Self> {
        let root = root.as_ref();
        let root = if root.is_absolute() {
            root.to_path_buf()
        } else {
            let cwd = std::env::current_dir().map_err(|e| Error::filesystem(root, e))?;
            cwd.join(root)
        };
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Compute the folder for a label and date header without touching disk
    pub fn folder_for(&self, label_id: &str, date_header: &str) -> Result<PathBuf> {
        let date = date_slice(date_header);
        check_component("label", label_id)?;
        check_component("date", &date)?;
        Ok(self.root.join(label_id).join(date))
    }

    /// Compute the folder and create whatever part of it is missing
    ///
    /// Calling this again with the same arguments is a no-op that returns
    /// the same path.
    pub fn ensure_folder(&self, label_id: &str, date_header: &str) -> Result<PathBuf> {
        let folder = self.folder_for(label_id, date_header)?;
        if !folder.is_dir() {
            debug!("Creating attachment folder {}", folder.display());
            fs::create_dir_all(&folder).map_err(|e| Error::filesystem(&folder, e))?;
        }
        Ok(folder)
    }

    /// Write attachment bytes into `folder`, replacing any file of the same name
    ///
    /// Only the base name of `filename` is used. Returns the written path.
    pub fn write(&self, folder: &Path, filename: &str, bytes: &[u8]) -> Result<PathBuf> {
        let name = Path::new(filename)
            .file_name()
            .filter(|name| !name.is_empty())
            .ok_or_else(|| Error::MissingFilename(format!("{:?}", filename)))?;

        let path = folder.join(name);
        fs::write(&path, bytes).map_err(|e| Error::filesystem(&path, e))?;
        debug!("Wrote {} bytes to {}", bytes.len(), path.display());
        Ok(path)
    }
}

/// Drop the weekday prefix and zone suffix of a date header
///
/// Counts characters, not bytes. Headers too short to slice give an
/// empty string.
pub fn date_slice(date_header: &str) -> String {
    let len = date_header.chars().count();
    if len <= DATE_PREFIX_CHARS + DATE_SUFFIX_CHARS {
        return String::new();
    }
    date_header
        .chars()
        .skip(DATE_PREFIX_CHARS)
        .take(len - DATE_PREFIX_CHARS - DATE_SUFFIX_CHARS)
        .collect()
}

/// A folder key component must be a single, non-empty, plain path segment
fn check_component(what: &str, value: &str) -> Result<()> {
    let mut components = Path::new(value).components();
    match (components.next(), components.next()) {
        (Some(Component::Normal(_)), None) if !value.contains(['/', '\\']) => Ok(()),
        _ => Err(Error::malformed(format!(
            "Cannot use {:?} as attachment {} folder",
            value, what
        ))),
    }
}
