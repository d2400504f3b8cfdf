//! Reading and writing page fixtures as JSON.

use std::fs;
use std::path::{Path, PathBuf};

use crate::dom::PageSpec;

#[derive(Debug, thiserror::Error)]
pub enum PageError {
    #[error("failed to read page {path}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("page {path} is not a valid fixture")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("failed to serialize page")]
    Serialize(#[from] serde_json::Error),
}

/// Load a page fixture from disk.
///
/// # Errors
/// Fails when the file cannot be read or is not a page fixture.
pub fn read_page(path: &Path) -> Result<PageSpec, PageError> {
    let text = fs::read_to_string(path).map_err(|source| PageError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    parse_page(&text).map_err(|err| match err {
        PageError::Serialize(source) => PageError::Parse {
            path: path.to_path_buf(),
            source,
        },
        other => other,
    })
}

/// Parse a page fixture from JSON text.
///
/// # Errors
/// Fails when the text is not a page fixture.
pub fn parse_page(text: &str) -> Result<PageSpec, PageError> {
    Ok(serde_json::from_str(text)?)
}

/// Pretty-printed JSON for a page.
///
/// # Errors
/// Fails only if serialization itself fails.
pub fn write_page(spec: &PageSpec) -> Result<String, PageError> {
    Ok(serde_json::to_string_pretty(spec)?)
}
