//! Export of the filtered record set.
//!
//! Exports always cover the whole filtered set with the user's current column
//! subset — never just the visible page — and append one synthetic grand-total
//! row with the numeric columns summed. Two encodings: delimited text (CSV)
//! and a spreadsheet workbook (XLSX).

use anyhow::{Context, Result};
use rust_xlsxwriter::Workbook;

use crate::models::{LedgerRecord, Measure};
use crate::report::aggregate::sum_measure;
use crate::report::columns::{column_value, CellValue};

/// Label stamped on the appended totals row. Kept identical to the incumbent
/// dashboard's downloads so existing spreadsheets keep reconciling.
pub const GRAND_TOTAL_LABEL: &str = "TOTAL GERAL";

/// A fully materialized export: header plus data rows plus the totals row.
#[derive(Debug, Clone, PartialEq)]
pub struct ExportTable {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<CellValue>>,
}

/// Build the export table for a filtered set and column subset.
pub fn build_export(records: &[LedgerRecord], columns: &[String]) -> ExportTable {
    let mut rows: Vec<Vec<CellValue>> = records
        .iter()
        .map(|r| columns.iter().map(|c| column_value(r, c)).collect())
        .collect();

    rows.push(grand_total_row(records, columns));

    ExportTable {
        columns: columns.to_vec(),
        rows,
    }
}

/// The synthetic totals row: sums where the column is measurable and
/// available, the marker label in the first non-measure column (or the first
/// column when every selected column is a measure).
fn grand_total_row(records: &[LedgerRecord], columns: &[String]) -> Vec<CellValue> {
    let label_idx = columns
        .iter()
        .position(|c| Measure::from_column(c).is_none())
        .unwrap_or(0);

    columns
        .iter()
        .enumerate()
        .map(|(i, c)| {
            if i == label_idx && Measure::from_column(c).is_none() {
                return CellValue::Text(GRAND_TOTAL_LABEL.to_string());
            }
            match Measure::from_column(c) {
                Some(m) => CellValue::Number(sum_measure(records, m)),
                None => CellValue::Text(String::new()),
            }
        })
        .collect()
}

/// Encode as CSV (UTF-8, `\n` terminated, header first).
pub fn write_csv(table: &ExportTable) -> Result<Vec<u8>> {
    let mut writer = csv::WriterBuilder::new()
        .terminator(csv::Terminator::Any(b'\n'))
        .from_writer(Vec::new());

    writer
        .write_record(&table.columns)
        .context("CSV header write failed")?;

    for row in &table.rows {
        let record: Vec<String> = row.iter().map(CellValue::to_export_string).collect();
        writer.write_record(&record).context("CSV row write failed")?;
    }

    let bytes = writer
        .into_inner()
        .map_err(|e| anyhow::anyhow!("CSV writer flush failed: {e}"))?;
    Ok(bytes)
}

/// Encode as a single-sheet XLSX workbook. Numbers stay numbers so the
/// spreadsheet can keep computing on them.
pub fn write_xlsx(table: &ExportTable) -> Result<Vec<u8>> {
    let mut workbook = Workbook::new();
    let sheet = workbook.add_worksheet();

    for (col, name) in table.columns.iter().enumerate() {
        sheet.write_string(0, col as u16, name)?;
    }

    for (i, row) in table.rows.iter().enumerate() {
        let excel_row = (i + 1) as u32;
        for (col, cell) in row.iter().enumerate() {
            let excel_col = col as u16;
            match cell {
                CellValue::Text(s) => {
                    if !s.is_empty() {
                        sheet.write_string(excel_row, excel_col, s)?;
                    }
                }
                CellValue::Number(Some(v)) => {
                    sheet.write_number(excel_row, excel_col, *v)?;
                }
                CellValue::Number(None) => {}
            }
        }
    }

    let buf = workbook.save_to_buffer()?;
    Ok(buf)
}
