use std::path::Path;

use rust_xlsxwriter::Workbook;
use tracing::{debug, instrument};

use crate::gumruk::tools::error::Result;
use crate::gumruk::tools::flatten::WorkbookData;

/// Writes the provided workbook data to the given path.
///
/// Null cells are left blank. Sheets with data rows are wrapped in an
/// autofiltered Excel table.
#[instrument(level = "debug", skip_all, fields(path = %path.display()))]
pub fn write_workbook(path: &Path, workbook: &WorkbookData) -> Result<()> {
    let mut workbook_writer = Workbook::new();

    for table in &workbook.tables {
        let worksheet = workbook_writer.add_worksheet();
        worksheet.set_name(&table.sheet_name)?;

        for (col_idx, header) in table.columns.iter().enumerate() {
            worksheet.write_string(0, col_idx as u16, header)?;
        }

        for (row_idx, row) in table.rows.iter().enumerate() {
            for (col_idx, cell) in row.iter().enumerate() {
                if let Some(value) = cell {
                    worksheet.write_string((row_idx + 1) as u32, col_idx as u16, value)?;
                }
            }
        }

        if table.columns.is_empty() || table.rows.is_empty() {
            debug!(sheet = %table.sheet_name, "writing sheet without table range");
            continue;
        }

        let mut excel_table = rust_xlsxwriter::Table::new();
        excel_table.set_autofilter(true);
        let col_end = (table.columns.len() as u16).saturating_sub(1);
        let row_end = table.rows.len() as u32;
        worksheet.add_table(0, 0, row_end, col_end, &excel_table)?;
    }

    workbook_writer.save(path)?;
    Ok(())
}
