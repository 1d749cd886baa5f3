use std::io::Write;
use std::path::Path;

use crate::error::Result;
use crate::types::PriceRecord;

const HEADER: [&str; 7] = ["ticker", "trade_date", "open", "high", "low", "close", "volume"];

/// Write records as CSV. The header is written even when `records` is empty.
pub fn write_records<W: Write>(writer: W, records: &[PriceRecord]) -> Result<()> {
    let mut wtr = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(writer);

    wtr.write_record(HEADER)?;
    for record in records {
        wtr.serialize(record)?;
    }
    wtr.flush()?;
    Ok(())
}

pub fn export_to_path(path: &Path, records: &[PriceRecord]) -> Result<()> {
    let file = std::fs::File::create(path)?;
    write_records(file, records)
}
