use std::io::Read;

use crate::workflows::screening::{RawRecord, RawValue};

/// Read a CSV export into raw records. Headers and cells are trimmed; empty
/// cells become nulls. Everything else stays text for the normalizer.
pub(crate) fn parse_records<R: Read>(reader: R) -> Result<Vec<RawRecord>, csv::Error> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(reader);
    let headers = csv_reader.headers()?.clone();
    let mut records = Vec::new();

    for row in csv_reader.records() {
        let row = row?;
        let record = headers
            .iter()
            .zip(row.iter())
            .filter(|(header, _)| !header.is_empty())
            .map(|(header, cell)| (header, cell_value(cell)))
            .collect::<RawRecord>();
        if record.iter().all(|(_, value)| *value == RawValue::Null) {
            continue;
        }
        records.push(record);
    }

    Ok(records)
}

fn cell_value(cell: &str) -> RawValue {
    if cell.is_empty() {
        RawValue::Null
    } else {
        RawValue::Text(cell.to_string())
    }
}
