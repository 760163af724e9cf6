use std::path::Path;

use calamine::{DataType, Reader, Xlsx, open_workbook};

use crate::gumruk::tools::error::{Result, ToolError};
use crate::gumruk::tools::flatten::{SheetTable, WorkbookData};

/// Reads every sheet of a workbook produced by
/// [`write_workbook`](crate::gumruk::tools::io::excel_write::write_workbook).
///
/// The first row of each sheet provides the columns; blank cells come back as
/// `None`. Sheet order is preserved.
pub fn read_workbook(path: &Path) -> Result<WorkbookData> {
    let mut workbook: Xlsx<_> = open_workbook(path)?;
    let sheet_names = workbook.sheet_names().to_vec();

    let mut tables = Vec::with_capacity(sheet_names.len());
    for sheet_name in sheet_names {
        let range = read_required_sheet(&mut workbook, &sheet_name)?;
        tables.push(range_to_table(sheet_name, &range));
    }

    Ok(WorkbookData { tables })
}

fn read_required_sheet<R: std::io::Read + std::io::Seek>(
    workbook: &mut Xlsx<R>,
    name: &str,
) -> Result<calamine::Range<DataType>> {
    let range_result = workbook
        .worksheet_range(name)
        .ok_or_else(|| ToolError::InvalidWorkbook(format!("missing sheet '{name}'")))?;
    let range = range_result.map_err(ToolError::from)?;
    Ok(range)
}

fn range_to_table(sheet_name: String, range: &calamine::Range<DataType>) -> SheetTable {
    let mut rows = range.rows();
    let columns: Vec<String> = match rows.next() {
        Some(header) => header
            .iter()
            .map(|cell| cell_to_string(Some(cell)).unwrap_or_default())
            .collect(),
        None => Vec::new(),
    };

    let rows = rows
        .map(|row| {
            (0..columns.len())
                .map(|col_idx| cell_to_string(row.get(col_idx)))
                .collect()
        })
        .collect();

    SheetTable {
        sheet_name,
        columns,
        rows,
    }
}

fn cell_to_string(cell: Option<&DataType>) -> Option<String> {
    match cell {
        Some(DataType::String(value)) => Some(value.clone()),
        Some(DataType::Float(value)) => Some(value.to_string()),
        Some(DataType::Int(value)) => Some(value.to_string()),
        Some(DataType::Bool(value)) => Some(value.to_string()),
        Some(DataType::Empty) | None => None,
        Some(other) => Some(other.to_string()),
    }
}
