//! Workbook inspection: every sheet rendered as CSV text.
//!
//! The first row of a sheet is its header. Cells are written the way a
//! dataframe export would: no index column, minimal quoting, `\n` line endings.

use std::collections::HashMap;
use std::fs::File;
use std::io::{BufReader, Write};
use std::path::Path;

use calamine::{open_workbook_auto, Data, Range, Reader, Sheets};
use chrono::TimeDelta;

use crate::error::{AppError, Context, Result};

/// CSV text of one sheet, tagged with its name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SheetCsv {
    pub name: String,
    pub csv: String,
}

impl SheetCsv {
    /// `Sheet: <name>` line, the CSV body, then a blank line.
    pub fn render(&self) -> String {
        format!("Sheet: {}\n{}\n", self.name, self.csv)
    }
}

/// Convert every sheet of the workbook at `path`, in workbook order.
pub fn convert_workbook(path: &Path) -> Result<Vec<SheetCsv>> {
    let mut sheets = Vec::new();
    visit_workbook(path, |sheet| {
        sheets.push(sheet);
        Ok(())
    })?;
    Ok(sheets)
}

/// Stream every sheet of the workbook at `path` to `out`, one sheet at a time.
pub fn print_workbook<W: Write>(path: &Path, out: &mut W) -> Result<()> {
    visit_workbook(path, |sheet| {
        out.write_all(sheet.render().as_bytes())?;
        Ok(())
    })?;
    out.flush()?;
    Ok(())
}

/// Open any workbook format calamine understands (xlsx, xlsm, xlsb, xls, ods).
pub fn open_workbook(path: &Path) -> Result<Sheets<BufReader<File>>> {
    Ok(open_workbook_auto(path)
        .with_context(|| format!("Failed to open workbook {}", path.display()))?)
}

fn visit_workbook<F>(path: &Path, mut visit: F) -> Result<()>
where
    F: FnMut(SheetCsv) -> Result<()>,
{
    let mut workbook = open_workbook(path)?;

    for name in workbook.sheet_names() {
        let range = workbook.worksheet_range(&name)?;
        log::debug!("converting sheet `{name}` ({:?})", range.get_size());
        let csv = sheet_to_csv(&range)?;
        visit(SheetCsv { name, csv })?;
    }
    Ok(())
}

/// Concatenate the rendered blocks of `sheets`.
pub fn render(sheets: &[SheetCsv]) -> String {
    sheets.iter().map(SheetCsv::render).collect()
}

/// Serialize `range` to CSV with its first row as header. Rows with no values
/// are skipped and an empty range yields an empty string.
pub fn sheet_to_csv(range: &Range<Data>) -> Result<String> {
    let mut rows = range.rows();
    let Some(header) = rows.next() else {
        return Ok(String::new());
    };

    let mut writer = csv::WriterBuilder::new()
        .terminator(csv::Terminator::Any(b'\n'))
        .from_writer(Vec::new());

    writer.write_record(header_names(header))?;
    for row in rows.filter(|row| !is_blank(row)) {
        writer.write_record(row.iter().map(cell_to_string))?;
    }

    let bytes = writer
        .into_inner()
        .map_err(|err| AppError::message(format!("Failed to flush CSV buffer: {err}")))?;
    Ok(String::from_utf8(bytes).context("CSV output was not valid UTF-8")?)
}

fn is_blank(row: &[Data]) -> bool {
    row.iter().all(|cell| matches!(cell, Data::Empty))
}

/// Blank header cells become `Unnamed: <column>`; repeated names get `.1`,
/// `.2`, ... suffixes so every column stays addressable.
fn header_names(header: &[Data]) -> Vec<String> {
    let mut seen: HashMap<String, usize> = HashMap::new();
    header
        .iter()
        .enumerate()
        .map(|(column, cell)| {
            let name = cell_to_string(cell);
            let name = if name.trim().is_empty() {
                format!("Unnamed: {column}")
            } else {
                name
            };

            let count = seen.entry(name.clone()).or_insert(0);
            let unique = if *count == 0 {
                name
            } else {
                format!("{name}.{count}")
            };
            *count += 1;
            unique
        })
        .collect()
}

pub fn cell_to_string(cell: &Data) -> String {
    match cell {
        Data::String(s) => s.clone(),
        Data::Float(f) => format_float(*f),
        Data::Int(i) => i.to_string(),
        Data::Bool(true) => "True".to_string(),
        Data::Bool(false) => "False".to_string(),
        Data::DateTime(value) => {
            if value.is_duration() {
                value
                    .as_duration()
                    .map(format_duration)
                    .unwrap_or_else(|| value.as_f64().to_string())
            } else {
                value
                    .as_datetime()
                    .map(|dt| dt.format("%Y-%m-%d %H:%M:%S%.f").to_string())
                    .unwrap_or_else(|| value.as_f64().to_string())
            }
        }
        Data::DateTimeIso(s) => s.clone(),
        Data::DurationIso(s) => s.clone(),
        Data::Error(err) => err.to_string(),
        Data::Empty => String::new(),
    }
}

/// `<days> days HH:MM:SS`, matching how timedeltas print.
fn format_duration(duration: TimeDelta) -> String {
    let sign = if duration < TimeDelta::zero() { "-" } else { "" };
    let total = duration.num_seconds().abs();
    let days = total / 86_400;
    let rest = total % 86_400;
    format!(
        "{sign}{days} days {:02}:{:02}:{:02}",
        rest / 3600,
        (rest % 3600) / 60,
        rest % 60
    )
}

fn format_float(value: f64) -> String {
    if value.is_finite() && value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        value.to_string()
    }
}
