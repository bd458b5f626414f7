use anyhow::{bail, Context, Result};
use smiles_graph::*;
use tracing::*;

fn main() -> Result<()> {
    init_logging(&std::env::var("SMILES_LOG").unwrap_or_else(|_| "info".to_string()));

    let mut options = ParseOptions::default();
    let mut inputs = Vec::new();
    for arg in std::env::args().skip(1) {
        match arg.as_str() {
            "--lenient" => options = ParseOptions::lenient(),
            "--strict" => options = ParseOptions::strict(),
            _ => inputs.push(arg),
        }
    }
    if inputs.is_empty() {
        bail!("Usage: smiles-graph [--lenient] <SMILES>...");
    }

    let mut failed = 0;
    for smiles in &inputs {
        let result = parse_smiles_with(smiles, &options)
            .with_context(|| format!("Failed to parse {:?}", smiles));
        match result {
            Ok(molecule) => println!(
                "{}\t{} atoms\t{} bonds\t{}",
                smiles,
                molecule.atom_count(),
                molecule.bond_count(),
                molecule.to_canonical_form()
            ),
            Err(e) => {
                error!("{:#}", e);
                failed += 1;
            }
        }
    }

    if failed > 0 {
        bail!("{} of {} inputs could not be parsed", failed, inputs.len());
    }
    Ok(())
}
