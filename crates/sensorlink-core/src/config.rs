//! Layout definitions loaded from JSON.
//!
//! A layout file looks like:
//!
//! ```json
//! {
//!   "layouts": [
//!     {
//!       "name": "outdoor",
//!       "expected_len": 6,
//!       "fields": [
//!         { "name": "Battery", "offset": 0, "width": 16, "signed": true },
//!         { "name": "Temperature", "offset": 2, "width": 16, "signed": true, "scale": 100.0 },
//!         { "name": "Uptime", "offset": 2, "width": 32 }
//!       ]
//!     }
//!   ]
//! }
//! ```
//!
//! Every entry goes through the same validation as the built-in layouts;
//! the example above is rejected because `Uptime` overlaps `Temperature`.

use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;
use tracing::info;

use crate::payload::{FieldSpec, Layout, LayoutError};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read layout file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid layout file: {0}")]
    Json(#[from] serde_json::Error),
    #[error("invalid layout \"{name}\": {source}")]
    Layout {
        name: String,
        #[source]
        source: LayoutError,
    },
    #[error("layout file defines no layouts")]
    NoLayouts,
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct LayoutFile {
    layouts: Vec<LayoutEntry>,
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct LayoutEntry {
    name: String,
    expected_len: usize,
    fields: Vec<FieldSpec>,
}

/// Read and validate every layout in a JSON layout file.
///
/// # Errors
/// Returns `ConfigError` when the file cannot be read, is not valid JSON,
/// defines no layouts, or contains a layout that fails validation.
pub fn load_layouts(path: &Path) -> Result<Vec<Layout>, ConfigError> {
    let text = fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let layouts = parse_layouts(&text)?;
    info!(path = %path.display(), count = layouts.len(), "loaded layout file");
    Ok(layouts)
}

/// Parse and validate layouts from a JSON document.
pub fn parse_layouts(text: &str) -> Result<Vec<Layout>, ConfigError> {
    let file: LayoutFile = serde_json::from_str(text)?;
    if file.layouts.is_empty() {
        return Err(ConfigError::NoLayouts);
    }
    file.layouts
        .into_iter()
        .map(|entry| {
            let name = entry.name.clone();
            Layout::new(entry.name, entry.expected_len, entry.fields)
                .map_err(|source| ConfigError::Layout { name, source })
        })
        .collect()
}
