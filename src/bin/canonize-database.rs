use anyhow::{bail, Context, Result};
use smiles_graph::*;
use tracing::*;

fn main() -> Result<()> {
    init_logging(&std::env::var("SMILES_LOG").unwrap_or_else(|_| "info".to_string()));

    let args: Vec<String> = std::env::args().skip(1).collect();
    let (input_csv, output_csv, column) = match args.as_slice() {
        [input, output] => (input, output, 0),
        [input, output, column] => (
            input,
            output,
            column
                .parse::<usize>()
                .with_context(|| format!("Column must be a number, got {:?}", column))?,
        ),
        _ => bail!("Usage: canonize-database <input.csv> <output.csv> [column]"),
    };

    let summary =
        extend_and_write_csv_database(input_csv, output_csv, column, &ParseOptions::default())?;
    if summary.failed > 0 {
        warn!("{} record(s) could not be canonized", summary.failed);
    }
    Ok(())
}
