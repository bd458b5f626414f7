use std::fs::File;
use std::io::{Read, Write};

use anyhow::{Context, Result};
use csv::{ReaderBuilder, StringRecord, Writer};
use rayon::prelude::*;
use tracing::*;

use crate::*;

/// The header of the column appended by [`canonize_csv`].
pub const CANONICAL_COLUMN: &str = "canonical_smiles";

/// Counts from one pass over a CSV database.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DatabaseSummary {
    pub total: usize,
    pub canonized: usize,
    pub failed: usize,
}

fn canonize_record(
    line: usize,
    record: &StringRecord,
    column: usize,
    options: &ParseOptions,
) -> Option<String> {
    let smiles = record.get(column).unwrap_or("").trim();
    if smiles.is_empty() {
        warn!("Skipping record {} with an empty SMILES field: {:?}", line, record);
        return None;
    }
    match parse_smiles_with(smiles, options) {
        Ok(molecule) => Some(molecule.to_canonical_form()),
        Err(e) => {
            warn!("Could not canonize record {} ({:?}): {}", line, smiles, e);
            None
        }
    }
}

/// Read a CSV database with a header row and write it back with the canonical
/// SMILES of `column` appended to every record.
///
/// Records are canonized in parallel. A record whose SMILES is missing or
/// invalid keeps its place in the output with an empty canonical field.
pub fn canonize_csv<R: Read, W: Write>(
    reader: R,
    writer: W,
    column: usize,
    options: &ParseOptions,
) -> Result<DatabaseSummary> {
    let mut rdr = ReaderBuilder::new().has_headers(true).from_reader(reader);
    let mut headers = rdr.headers().context("Failed to read CSV header")?.clone();
    let records = rdr
        .records()
        .collect::<Result<Vec<StringRecord>, _>>()
        .context("Failed to read CSV record")?;
    debug!("Read {} records, canonizing column {}", records.len(), column);

    let canonical: Vec<Option<String>> = records
        .par_iter()
        .enumerate()
        .map(|(line, record)| canonize_record(line + 1, record, column, options))
        .collect();

    let mut wtr = Writer::from_writer(writer);
    headers.push_field(CANONICAL_COLUMN);
    wtr.write_record(&headers)?;

    let mut summary = DatabaseSummary {
        total: records.len(),
        ..DatabaseSummary::default()
    };
    for (mut record, smiles) in records.into_iter().zip(canonical) {
        match smiles {
            Some(smiles) => {
                summary.canonized += 1;
                record.push_field(&smiles);
            }
            None => {
                summary.failed += 1;
                record.push_field("");
            }
        }
        wtr.write_record(&record)?;
    }
    wtr.flush()?;
    Ok(summary)
}

/// Canonize the SMILES column of `csv_file` and write the extended database to
/// `output_filename`.
pub fn extend_and_write_csv_database(
    csv_file: &str,
    output_filename: &str,
    column: usize,
    options: &ParseOptions,
) -> Result<DatabaseSummary> {
    let input = File::open(csv_file).with_context(|| format!("Failed to open {}", csv_file))?;
    let output =
        File::create(output_filename).with_context(|| format!("Failed to create {}", output_filename))?;
    let summary = canonize_csv(input, output, column, options)?;
    info!(
        "Extended CSV database written to {} ({} of {} records canonized)",
        output_filename, summary.canonized, summary.total
    );
    Ok(summary)
}
