use crate::types::ClinicRecord;

use std::io::Write;

/// Fixed output schema. Order matters: consumers of the export key on it.
pub const COLUMNS: [&str; 5] = ["Name of Clinic", "Address", "Email", "Phone", "Services"];

#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    #[error("CSV write failed: {0}")]
    CsvError(#[from] csv::Error),
    #[error("CSV output is not valid UTF-8: {0}")]
    Utf8Error(#[from] std::string::FromUtf8Error),
}

/// Write records as CSV with the fixed five-column header. Fields that
/// extraction never filled come out as empty cells, not missing ones.
pub fn write_csv<W: Write>(records: &[ClinicRecord], writer: W) -> Result<(), ExportError> {
    let mut csv_writer = csv::Writer::from_writer(writer);
    csv_writer.write_record(COLUMNS)?;

    for record in records {
        csv_writer.write_record([
            &record.name,
            &record.address,
            &record.email,
            &record.phone,
            &record.services,
        ])?;
    }

    csv_writer.flush().map_err(csv::Error::from)?;
    Ok(())
}

pub fn to_csv_string(records: &[ClinicRecord]) -> Result<String, ExportError> {
    let mut buf = Vec::new();
    write_csv(records, &mut buf)?;
    Ok(String::from_utf8(buf)?)
}
