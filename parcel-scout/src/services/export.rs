//! CSV export of the displayed parcels
//!
//! Header row first, then one row per parcel in display order. Nested records flatten
//! into dotted columns. Keys kept in [`Parcel::extra`] follow the fixed columns as the
//! sorted union across all exported rows.
//!
//! Quoting follows RFC 4180: a cell holding a comma, double quote, CR or LF is quoted
//! with inner quotes doubled. Absent values are empty cells. Rows end with `\n`.

use crate::error::ScoutResult;
use parcel_common::Parcel;
use serde_json::Value;
use std::collections::BTreeSet;
use std::io::{self, Write};
use std::mem::take;
use std::path::Path;

const SEP: char = ',';

/// Fixed leading columns, in output order
pub const COLUMNS: [&str; 17] = [
    "parcelId",
    "owner",
    "address",
    "acreage",
    "zoning",
    "zoning_desc",
    "zoningFitScore",
    "investmentScore",
    "assessedValue",
    "ownerType",
    "yearsOwned",
    "outOfState",
    "gps.lat",
    "gps.lon",
    "contactInfo",
    "highwayDistance.distanceMiles",
    "highwayDistanceScore",
];

/// Header row for `parcels`: fixed columns then sorted extra keys
pub fn header(parcels: &[Parcel]) -> Vec<String> {
    let extra: BTreeSet<&str> = parcels
        .iter()
        .flat_map(|p| p.extra.keys().map(String::as_str))
        .filter(|k| !COLUMNS.contains(k))
        .collect();

    COLUMNS
        .iter()
        .copied()
        .chain(extra)
        .map(str::to_string)
        .collect()
}

fn real(value: Option<f64>) -> String {
    value.map(|v| v.to_string()).unwrap_or_default()
}

fn text(value: Option<&str>) -> String {
    value.unwrap_or_default().to_string()
}

fn extra_cell(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
    }
}

/// One row aligned with `columns`
pub fn row(parcel: &Parcel, columns: &[String]) -> Vec<String> {
    columns
        .iter()
        .map(|column| match column.as_str() {
            "parcelId" => parcel.parcel_id.clone(),
            "owner" => text(parcel.owner.as_deref()),
            "address" => text(parcel.address.as_deref()),
            "acreage" => real(parcel.acreage),
            "zoning" => text(parcel.zoning.as_deref()),
            "zoning_desc" => text(parcel.zoning_desc.as_deref()),
            "zoningFitScore" => real(parcel.zoning_fit_score),
            "investmentScore" => real(parcel.investment_score),
            "assessedValue" => real(parcel.assessed_value),
            "ownerType" => text(parcel.owner_type.as_deref()),
            "yearsOwned" => parcel.years_owned.map(|v| v.to_string()).unwrap_or_default(),
            "outOfState" => parcel.out_of_state.map(|v| v.to_string()).unwrap_or_default(),
            "gps.lat" => real(parcel.latitude()),
            "gps.lon" => real(parcel.longitude()),
            "contactInfo" => text(parcel.contact_info.as_deref()),
            "highwayDistance.distanceMiles" => real(parcel.distance_miles()),
            "highwayDistanceScore" => real(parcel.highway_distance_score),
            key => extra_cell(parcel.extra.get(key)),
        })
        .collect()
}

fn needs_quotes(field: &str) -> bool {
    field.contains(SEP) || field.contains('"') || field.contains('\n') || field.contains('\r')
}

/// Write a single CSV row to any writer
pub fn write_row<W: Write>(mut w: W, row: &[String]) -> io::Result<()> {
    let mut first = true;
    for cell in row {
        if !first {
            write!(w, "{}", SEP)?;
        } else {
            first = false;
        }
        if needs_quotes(cell) {
            write!(w, "\"{}\"", cell.replace('"', "\"\""))?;
        } else {
            write!(w, "{}", cell)?;
        }
    }
    writeln!(w)
}

/// Write header and rows for `parcels`
pub fn write_csv<W: Write>(mut w: W, parcels: &[Parcel]) -> io::Result<()> {
    let columns = header(parcels);
    write_row(&mut w, &columns)?;
    for parcel in parcels {
        write_row(&mut w, &row(parcel, &columns))?;
    }
    Ok(())
}

/// Whole export as a string
pub fn to_csv_string(parcels: &[Parcel]) -> String {
    let mut buf: Vec<u8> = Vec::new();
    // Writing into a Vec cannot fail
    let _ = write_csv(&mut buf, parcels);
    String::from_utf8_lossy(&buf).into_owned()
}

/// Write the export to `path`, replacing any existing file
pub fn export_to_file(path: &Path, parcels: &[Parcel]) -> ScoutResult<()> {
    let file = std::fs::File::create(path)?;
    let mut writer = io::BufWriter::new(file);
    write_csv(&mut writer, parcels)?;
    writer.flush()?;

    tracing::info!(
        path = %path.display(),
        rows = parcels.len(),
        "Exported parcels to CSV"
    );
    Ok(())
}

/// Minimal CSV reader (quotes and CRLF tolerant), inverse of [`write_csv`]
pub fn parse_rows(text: &str) -> Vec<Vec<String>> {
    let mut rows = Vec::new();
    let mut field = String::new();
    let mut row = Vec::new();
    let mut in_quotes = false;
    let mut chars = text.chars().peekable();

    while let Some(ch) = chars.next() {
        match ch {
            '"' => {
                if in_quotes {
                    if matches!(chars.peek(), Some('"')) {
                        chars.next();
                        field.push('"');
                    } else {
                        in_quotes = false;
                    }
                } else {
                    in_quotes = true;
                }
            }
            c if c == SEP && !in_quotes => row.push(take(&mut field)),
            '\n' | '\r' if !in_quotes => {
                if ch == '\r' && matches!(chars.peek(), Some('\n')) {
                    chars.next();
                }
                row.push(take(&mut field));
                if !(row.len() == 1 && row[0].is_empty()) {
                    rows.push(take(&mut row));
                } else {
                    row.clear();
                }
            }
            _ => field.push(ch),
        }
    }

    // Trailing row without a final newline
    if !field.is_empty() || !row.is_empty() {
        row.push(field);
        rows.push(row);
    }

    rows
}
