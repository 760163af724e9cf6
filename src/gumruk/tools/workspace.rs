use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use tracing::info;

use crate::gumruk::tools::error::Result;
use crate::gumruk::tools::layout::DocumentKind;

/// Directory receiving workbooks converted from incoming declarations.
pub const GELEN_DIR: &str = "XMLParser_Gelen";
/// Directory receiving workbooks converted from result documents.
pub const SONUC_DIR: &str = "XMLParser_Sonuc";

/// Outcome of ensuring a directory exists.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DirStatus {
    Created,
    Existing,
}

/// Output location shared by every conversion of a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Workspace {
    root: PathBuf,
}

impl Workspace {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Directory holding workbooks of the given document kind.
    pub fn kind_dir(&self, kind: DocumentKind) -> PathBuf {
        match kind {
            DocumentKind::Gelen => self.root.join(GELEN_DIR),
            DocumentKind::Sonuc => self.root.join(SONUC_DIR),
        }
    }

    /// Creates the root and per-kind directories.
    ///
    /// Directories that already exist are reported as [`DirStatus::Existing`]
    /// and are not an error.
    pub fn prepare(&self) -> Result<Vec<(PathBuf, DirStatus)>> {
        let dirs = [
            self.root.clone(),
            self.kind_dir(DocumentKind::Gelen),
            self.kind_dir(DocumentKind::Sonuc),
        ];

        dirs.into_iter()
            .map(|dir| -> Result<(PathBuf, DirStatus)> {
                let status = ensure_dir(&dir)?;
                Ok((dir, status))
            })
            .collect()
    }

    /// Workbook path for `input` converted as `kind`: `<kind dir>/<stem>.xlsx`.
    pub fn output_path(&self, kind: DocumentKind, input: &Path) -> PathBuf {
        let stem = input
            .file_stem()
            .map(|stem| stem.to_string_lossy().into_owned())
            .unwrap_or_else(|| kind.to_string());
        self.kind_dir(kind).join(format!("{stem}.xlsx"))
    }
}

/// Creates `path` if needed, reporting whether it was already there.
pub fn ensure_dir(path: &Path) -> Result<DirStatus> {
    match fs::create_dir(path) {
        Ok(()) => {
            info!(path = %path.display(), "created directory");
            Ok(DirStatus::Created)
        }
        Err(error) if error.kind() == ErrorKind::AlreadyExists && path.is_dir() => {
            info!(path = %path.display(), "directory already exists");
            Ok(DirStatus::Existing)
        }
        Err(error) if error.kind() == ErrorKind::NotFound => {
            fs::create_dir_all(path)?;
            info!(path = %path.display(), "created directory");
            Ok(DirStatus::Created)
        }
        Err(error) => Err(error.into()),
    }
}
