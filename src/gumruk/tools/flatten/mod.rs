use std::collections::{HashMap, HashSet};

use crate::gumruk::tools::error::{Result, ToolError};
use crate::gumruk::tools::model::XmlNode;

/// Maximum length Excel accepts for a worksheet name.
pub const MAX_SHEET_NAME_LEN: usize = 31;

/// A table that will be materialised as an Excel sheet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SheetTable {
    pub sheet_name: String,
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Option<String>>>,
}

impl SheetTable {
    /// Creates a table without columns or rows.
    pub fn empty(sheet_name: impl Into<String>) -> Self {
        Self {
            sheet_name: sheet_name.into(),
            columns: Vec::new(),
            rows: Vec::new(),
        }
    }

    /// Returns `true` when the table holds no data rows.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Value of `column` in the row at `row_idx`, if both exist and the cell is not null.
    pub fn cell(&self, row_idx: usize, column: &str) -> Option<&str> {
        let col_idx = self.columns.iter().position(|name| name == column)?;
        self.rows.get(row_idx)?.get(col_idx)?.as_deref()
    }
}

/// Represents all tables required to materialise the Excel workbook.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct WorkbookData {
    pub tables: Vec<SheetTable>,
}

impl WorkbookData {
    /// Builds a workbook, renaming tables so every sheet name is valid and unique.
    pub fn from_tables(tables: impl IntoIterator<Item = SheetTable>) -> Self {
        let mut sheet_names = SheetNameRegistry::default();
        let tables = tables
            .into_iter()
            .map(|mut table| {
                table.sheet_name = sheet_names.assign(&table.sheet_name);
                table
            })
            .collect();
        Self { tables }
    }

    /// Looks up a table by its sheet name.
    pub fn table(&self, sheet_name: &str) -> Option<&SheetTable> {
        self.tables.iter().find(|table| table.sheet_name == sheet_name)
    }
}

/// How rows whose tag layout differs from the first row are handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ShapePolicy {
    /// Reject the section with [`ToolError::ShapeMismatch`].
    #[default]
    Strict,
    /// Place values by column name, appending unseen columns and padding with nulls.
    Align,
}

/// Flattens the `row_tag` children of `section` into a table.
///
/// The columns are the tag names visited by a depth-first walk of the first
/// row, excluding the row element itself. A section without matching rows
/// yields a table with neither columns nor rows.
pub fn flatten_rows(
    sheet_name: &str,
    section: &XmlNode,
    row_tag: &str,
    policy: ShapePolicy,
) -> Result<SheetTable> {
    let mut rows = section.find_all(row_tag);
    let Some(first) = rows.next() else {
        return Ok(SheetTable::empty(sheet_name));
    };

    let first_row = RowWalk::of(first);
    match policy {
        ShapePolicy::Strict => {
            let mut table = SheetTable {
                sheet_name: sheet_name.to_string(),
                columns: unique_columns(&first_row.tags),
                rows: vec![first_row.values],
            };
            for (index, row) in rows.enumerate() {
                let walk = RowWalk::of(row);
                if walk.tags != first_row.tags {
                    return Err(ToolError::ShapeMismatch {
                        section: sheet_name.to_string(),
                        row: index + 2,
                        expected: first_row.tags,
                        found: walk.tags,
                    });
                }
                table.rows.push(walk.values);
            }
            Ok(table)
        }
        ShapePolicy::Align => {
            let mut builder = AlignedTableBuilder::default();
            builder.push(first_row);
            for row in rows {
                builder.push(RowWalk::of(row));
            }
            Ok(builder.into_table(sheet_name))
        }
    }
}

/// Treats `section` itself as the only row of the table.
pub fn flatten_record(sheet_name: &str, section: &XmlNode) -> SheetTable {
    let walk = RowWalk::of(section);
    if walk.tags.is_empty() {
        return SheetTable::empty(sheet_name);
    }
    SheetTable {
        sheet_name: sheet_name.to_string(),
        columns: unique_columns(&walk.tags),
        rows: vec![walk.values],
    }
}

/// Emits one column per direct leaf child of `section`, as a single row.
///
/// Children that contain elements are skipped; they are expected to be
/// flattened as sections of their own.
pub fn flatten_fields(sheet_name: &str, section: &XmlNode) -> SheetTable {
    let (tags, values): (Vec<String>, Vec<Option<String>>) = section
        .children
        .iter()
        .filter(|child| child.is_leaf())
        .map(|child| (child.name.clone(), child.text.clone()))
        .unzip();

    if tags.is_empty() {
        return SheetTable::empty(sheet_name);
    }
    SheetTable {
        sheet_name: sheet_name.to_string(),
        columns: unique_columns(&tags),
        rows: vec![values],
    }
}

/// Tag names and text values of one row, in depth-first order.
struct RowWalk {
    tags: Vec<String>,
    values: Vec<Option<String>>,
}

impl RowWalk {
    fn of(row: &XmlNode) -> Self {
        let (tags, values) = row
            .descendants()
            .map(|node| (node.name.clone(), node.text.clone()))
            .unzip();
        Self { tags, values }
    }
}

/// Makes repeated tag names unique by suffixing `_1`, `_2`, ... in order.
///
/// Excel table headers must differ ignoring case, so `Kod` and `kod` count
/// as the same name.
fn unique_columns(tags: &[String]) -> Vec<String> {
    let mut used: HashSet<String> = HashSet::with_capacity(tags.len());
    let mut columns = Vec::with_capacity(tags.len());

    for tag in tags {
        if used.insert(tag.to_lowercase()) {
            columns.push(tag.clone());
            continue;
        }

        let mut counter = 1;
        loop {
            let candidate = format!("{tag}_{counter}");
            if used.insert(candidate.to_lowercase()) {
                columns.push(candidate);
                break;
            }
            counter += 1;
        }
    }

    columns
}

#[derive(Default)]
struct AlignedTableBuilder {
    columns: Vec<String>,
    positions: HashMap<String, usize>,
    rows: Vec<Vec<Option<String>>>,
}

impl AlignedTableBuilder {
    fn push(&mut self, walk: RowWalk) {
        let names = unique_columns(&walk.tags);
        let mut cells = vec![None; self.columns.len()];

        for (name, value) in names.into_iter().zip(walk.values) {
            let position = match self.positions.get(&name) {
                Some(&position) => position,
                None => {
                    let position = self.columns.len();
                    self.positions.insert(name.clone(), position);
                    self.columns.push(name);
                    cells.push(None);
                    position
                }
            };
            cells[position] = value;
        }

        self.rows.push(cells);
    }

    fn into_table(mut self, sheet_name: &str) -> SheetTable {
        let width = self.columns.len();
        for row in &mut self.rows {
            row.resize(width, None);
        }

        // Rows may spell the same tag with different case.
        SheetTable {
            sheet_name: sheet_name.to_string(),
            columns: unique_columns(&self.columns),
            rows: self.rows,
        }
    }
}

#[derive(Debug, Default)]
struct SheetNameRegistry {
    used: HashSet<String>,
}

impl SheetNameRegistry {
    // Excel compares sheet names ignoring case.
    fn assign(&mut self, raw: &str) -> String {
        let base = sanitize_sheet_name(raw);
        if self.used.insert(base.to_lowercase()) {
            return base;
        }

        let mut counter = 1;
        loop {
            let suffix = format!("_{counter}");
            let prefix = truncate_chars(&base, MAX_SHEET_NAME_LEN - suffix.len());
            let candidate = format!("{prefix}{suffix}");
            if self.used.insert(candidate.to_lowercase()) {
                return candidate;
            }
            counter += 1;
        }
    }
}

fn sanitize_sheet_name(raw: &str) -> String {
    let invalid = [':', '\\', '/', '?', '*', '[', ']', '\'', '"'];
    let sanitized: String = raw
        .chars()
        .map(|ch| {
            if invalid.contains(&ch) || ch.is_control() {
                '_'
            } else {
                ch
            }
        })
        .collect();

    let sanitized = sanitized.trim();
    if sanitized.is_empty() {
        return "Sheet".to_string();
    }

    truncate_chars(sanitized, MAX_SHEET_NAME_LEN)
}

// Sheet names such as "Dokümanlar" are not ASCII, so lengths count chars.
fn truncate_chars(value: &str, max_chars: usize) -> String {
    value.chars().take(max_chars).collect()
}
