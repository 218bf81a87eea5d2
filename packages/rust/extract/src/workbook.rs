//! Workbook parsing shared by the spreadsheet extractors.
//!
//! One sheet per class; the first row is the header. The key column is the
//! one named `id` or `@id`, otherwise the first column.

use std::collections::BTreeMap;
use std::io::Cursor;

use calamine::{Data, Reader, open_workbook_auto_from_rs};
use tracing::debug;

use curator_shared::{CuratorError, RawPayload, RawRecord, Result};

/// Parse workbook bytes (xlsx, xlsm, xls or ods) into raw records.
///
/// Sheets whose name starts with `_` are ignored, as are rows with an empty key.
/// A key repeated within one sheet is a `SourceFormat` error.
pub fn parse_workbook(bytes: Vec<u8>, location: &str) -> Result<Vec<RawRecord>> {
    let mut workbook = open_workbook_auto_from_rs(Cursor::new(bytes))
        .map_err(|e| CuratorError::source_format(location, format!("not a readable workbook: {e}")))?;

    let mut records = Vec::new();
    for sheet in workbook.sheet_names() {
        if sheet.starts_with('_') {
            debug!(sheet = %sheet, "skipping private sheet");
            continue;
        }
        let range = workbook
            .worksheet_range(&sheet)
            .map_err(|e| CuratorError::source_format(location, format!("sheet {sheet:?}: {e}")))?;

        let mut rows = range.rows();
        let Some(header_row) = rows.next() else {
            debug!(sheet = %sheet, "skipping empty sheet");
            continue;
        };
        let header: Vec<String> = header_row.iter().map(|c| cell_text(c).trim().to_string()).collect();
        let key_col = key_column(&header);

        let mut seen = BTreeMap::new();
        for (index, row) in rows.enumerate() {
            let key = row.get(key_col).map(cell_text).unwrap_or_default().trim().to_string();
            if key.is_empty() {
                continue;
            }
            // Header row is spreadsheet row 1.
            let row_number = index + 2;
            if let Some(first) = seen.insert(key.clone(), row_number) {
                return Err(CuratorError::source_format(
                    location,
                    format!("sheet {sheet:?}: key {key:?} on rows {first} and {row_number}"),
                ));
            }

            let cells = header
                .iter()
                .enumerate()
                .filter(|(col, name)| *col != key_col && !name.is_empty())
                .map(|(col, name)| {
                    let text = row.get(col).map(cell_text).unwrap_or_default();
                    (name.clone(), text)
                })
                .collect();

            records.push(RawRecord {
                class_name: sheet.clone(),
                key,
                payload: RawPayload::Row { cells },
            });
        }
        debug!(sheet = %sheet, rows = seen.len(), "parsed sheet");
    }
    Ok(records)
}

fn key_column(header: &[String]) -> usize {
    header
        .iter()
        .position(|h| h.eq_ignore_ascii_case("id") || h.eq_ignore_ascii_case("@id"))
        .unwrap_or(0)
}

/// Text form of a cell. Whole floats print without a fraction; dates print as ISO 8601.
fn cell_text(cell: &Data) -> String {
    match cell {
        Data::Empty => String::new(),
        Data::String(s) | Data::DateTimeIso(s) | Data::DurationIso(s) => s.clone(),
        Data::Int(i) => i.to_string(),
        Data::Float(f) if f.fract() == 0.0 && f.abs() < 1e15 => format!("{}", *f as i64),
        Data::Float(f) => f.to_string(),
        Data::Bool(b) => b.to_string(),
        Data::DateTime(dt) => match dt.as_datetime() {
            Some(ts) if ts.time() == chrono::NaiveTime::MIN => ts.date().to_string(),
            Some(ts) => ts.format("%Y-%m-%dT%H:%M:%S").to_string(),
            None => dt.as_f64().to_string(),
        },
        Data::Error(e) => format!("{e:?}"),
    }
}
