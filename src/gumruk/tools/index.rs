use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::{info, instrument};

use crate::gumruk::tools::error::Result;
use crate::gumruk::tools::io::xml_read;
use crate::gumruk::tools::layout::declaration_number;
use crate::gumruk::tools::sync::collect_inputs;

/// Declaration number found in one result document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IndexEntry {
    pub file: PathBuf,
    pub declaration_number: String,
}

/// Reads the `Beyanname_no` of every result document under `inputs`.
#[instrument(level = "info", skip_all)]
pub fn index_documents(inputs: &[PathBuf]) -> Result<Vec<IndexEntry>> {
    let documents = collect_inputs(inputs)?;
    let entries = documents
        .iter()
        .map(|path| index_document(path))
        .collect::<Result<Vec<_>>>()?;
    info!(entry_count = entries.len(), "indexed result documents");
    Ok(entries)
}

fn index_document(path: &Path) -> Result<IndexEntry> {
    let root = xml_read::read_document(path)?;
    Ok(IndexEntry {
        file: path.to_path_buf(),
        declaration_number: declaration_number(&root)?.to_string(),
    })
}

/// Serialises index entries as pretty-printed JSON.
pub fn to_json(entries: &[IndexEntry]) -> Result<String> {
    Ok(serde_json::to_string_pretty(entries)?)
}
