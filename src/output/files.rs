//! File-backed feed sink
//!
//! Feeds land at `{directory}/{name}.xml`. Each write goes to a sibling
//! `.xml.tmp` file first and is renamed into place, so readers never observe a
//! half-written feed.

use crate::output::traits::{validate_feed_name, FeedSink, OutputError, OutputResult};
use std::fs;
use std::path::{Path, PathBuf};

/// Writes feeds as `{name}.xml` files inside one directory
#[derive(Debug, Clone)]
pub struct FileFeedSink {
    directory: PathBuf,
}

impl FileFeedSink {
    pub fn new(directory: impl Into<PathBuf>) -> Self {
        Self {
            directory: directory.into(),
        }
    }

    pub fn directory(&self) -> &Path {
        &self.directory
    }

    /// Path a feed of the given name is written to
    pub fn feed_path(&self, name: &str) -> PathBuf {
        self.directory.join(format!("{}.xml", name))
    }
}

impl FeedSink for FileFeedSink {
    fn write_feed(&self, name: &str, document: &str) -> OutputResult<()> {
        write_feed_file(&self.directory, name, document)
    }
}

/// Writes one serialized feed to `{directory}/{name}.xml`, replacing any previous file
pub fn write_feed_file(directory: &Path, name: &str, document: &str) -> OutputResult<()> {
    validate_feed_name(name)?;

    let wrap = |source: std::io::Error| OutputError::Write {
        name: name.to_string(),
        source,
    };

    fs::create_dir_all(directory).map_err(wrap)?;

    let final_path = directory.join(format!("{}.xml", name));
    let tmp_path = directory.join(format!("{}.xml.tmp", name));

    fs::write(&tmp_path, document.as_bytes()).map_err(wrap)?;
    if let Err(e) = fs::rename(&tmp_path, &final_path) {
        if let Err(cleanup) = fs::remove_file(&tmp_path) {
            tracing::debug!("Could not remove {}: {}", tmp_path.display(), cleanup);
        }
        return Err(wrap(e));
    }

    tracing::debug!("Wrote feed {}", final_path.display());
    Ok(())
}
