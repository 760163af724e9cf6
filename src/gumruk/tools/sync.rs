use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, error, info, instrument};

use crate::gumruk::tools::error::{Result, ToolError};
use crate::gumruk::tools::flatten::ShapePolicy;
use crate::gumruk::tools::io::excel_write;
use crate::gumruk::tools::io::xml_read;
use crate::gumruk::tools::layout::{DocumentKind, flatten_document};
use crate::gumruk::tools::workspace::Workspace;

/// Settings applied to every document of a conversion run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ConvertOptions {
    /// Forces the document kind instead of detecting it.
    pub kind: Option<DocumentKind>,
    pub shape: ShapePolicy,
}

/// Result of converting one document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConversionOutcome {
    pub input: PathBuf,
    pub output: PathBuf,
    pub kind: DocumentKind,
    pub sheet_count: usize,
}

/// Per-document results of a batch run.
#[derive(Debug, Default)]
pub struct BatchReport {
    pub outcomes: Vec<(PathBuf, Result<ConversionOutcome>)>,
}

impl BatchReport {
    pub fn succeeded(&self) -> impl Iterator<Item = &ConversionOutcome> {
        self.outcomes
            .iter()
            .filter_map(|(_, outcome)| outcome.as_ref().ok())
    }

    pub fn failed(&self) -> impl Iterator<Item = (&Path, &ToolError)> {
        self.outcomes
            .iter()
            .filter_map(|(input, outcome)| outcome.as_ref().err().map(|e| (input.as_path(), e)))
    }

    pub fn is_success(&self) -> bool {
        self.failed().next().is_none()
    }
}

/// Converts a single customs document into a workbook inside `workspace`.
///
/// The workspace directories must already exist, see [`Workspace::prepare`].
#[instrument(level = "info", skip_all, fields(input = %input.display()))]
pub fn convert_document(
    input: &Path,
    workspace: &Workspace,
    options: &ConvertOptions,
) -> Result<ConversionOutcome> {
    convert_into(input, workspace, options, &mut OutputNames::default())
}

fn convert_into(
    input: &Path,
    workspace: &Workspace,
    options: &ConvertOptions,
    outputs: &mut OutputNames,
) -> Result<ConversionOutcome> {
    if !input.exists() {
        return Err(ToolError::MissingInput(input.to_path_buf()));
    }

    let root = xml_read::read_document(input)?;
    let kind = match options.kind {
        Some(kind) => kind,
        None => DocumentKind::detect(&root)?,
    };
    debug!(%kind, "document kind resolved");

    let workbook = flatten_document(&root, kind, options.shape)?;
    let output = outputs.claim(workspace.output_path(kind, input));
    excel_write::write_workbook(&output, &workbook)?;
    info!(output = %output.display(), sheet_count = workbook.tables.len(), "workbook written");

    Ok(ConversionOutcome {
        input: input.to_path_buf(),
        output,
        kind,
        sheet_count: workbook.tables.len(),
    })
}

/// Converts every input, expanding directories to the XML files they contain.
///
/// A failing document is recorded in the report and does not stop the run.
/// Inputs that share a file stem get `_1`, `_2`, ... appended to their
/// workbook names so no output of the run is overwritten.
#[instrument(level = "info", skip_all, fields(root = %workspace.root().display()))]
pub fn convert_batch(
    inputs: &[PathBuf],
    workspace: &Workspace,
    options: &ConvertOptions,
) -> Result<BatchReport> {
    workspace.prepare()?;
    let documents = collect_inputs(inputs)?;
    let total = documents.len();
    info!(document_count = total, "starting conversion");

    let mut report = BatchReport::default();
    let mut outputs = OutputNames::default();
    for (index, document) in documents.into_iter().enumerate() {
        info!(progress = %format!("{}/{}", index + 1, total), input = %document.display(), "converting");
        let outcome = convert_into(&document, workspace, options, &mut outputs);
        if let Err(err) = &outcome {
            error!(input = %document.display(), error = %err, "conversion failed");
        }
        report.outcomes.push((document, outcome));
    }

    Ok(report)
}

/// Workbook paths already handed out during a run.
#[derive(Debug, Default)]
struct OutputNames {
    used: HashSet<String>,
}

impl OutputNames {
    // Keys are lowercased for case-insensitive filesystems.
    fn claim(&mut self, path: PathBuf) -> PathBuf {
        if self.used.insert(path_key(&path)) {
            return path;
        }

        let stem = path
            .file_stem()
            .map(|stem| stem.to_string_lossy().into_owned())
            .unwrap_or_default();
        let mut counter = 1;
        loop {
            let candidate = path.with_file_name(format!("{stem}_{counter}.xlsx"));
            if self.used.insert(path_key(&candidate)) {
                return candidate;
            }
            counter += 1;
        }
    }
}

fn path_key(path: &Path) -> String {
    path.to_string_lossy().to_lowercase()
}

/// Expands directories into their `*.xml` files, sorted by path.
///
/// Plain file paths are kept as given, even if they do not exist, so the
/// failure is reported against that document.
pub fn collect_inputs(inputs: &[PathBuf]) -> Result<Vec<PathBuf>> {
    let mut documents = Vec::new();

    for input in inputs {
        if input.is_dir() {
            let mut found: Vec<PathBuf> = fs::read_dir(input)?
                .map(|entry| entry.map(|entry| entry.path()))
                .collect::<std::io::Result<Vec<_>>>()?
                .into_iter()
                .filter(|path| path.is_file() && is_xml(path))
                .collect();
            found.sort();
            debug!(dir = %input.display(), found = found.len(), "expanded directory");
            documents.extend(found);
        } else {
            documents.push(input.clone());
        }
    }

    Ok(documents)
}

fn is_xml(path: &Path) -> bool {
    path.extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("xml"))
}
