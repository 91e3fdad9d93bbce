//! Command-line surface of the `stockledger` binary.

use std::io::Write;
use std::path::PathBuf;

use clap::{Parser, Subcommand};
use serde::Serialize;

use crate::outcome::Outcome;
use crate::services::AppServices;

#[derive(Debug, Parser)]
#[command(name = "stockledger")]
#[command(about = "Inventory catalog with a reconciled stock ledger", long_about = None)]
pub struct Cli {
    /// Staging directory (overrides STOCKLEDGER_STAGING_DIR)
    #[arg(short, long, global = true)]
    pub staging_dir: Option<PathBuf>,

    /// Ledger and catalog directory (overrides STOCKLEDGER_DATA_DIR)
    #[arg(short, long, global = true)]
    pub data_dir: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Process staged files in order (create/delete partitions by key prefix)
    Process {
        /// Staging keys, e.g. for_create/batch-001.csv
        #[arg(required = true)]
        keys: Vec<String>,

        /// After processing, export the catalog (to KEY or the configured key)
        #[arg(long, num_args = 0..=1, default_missing_value = "")]
        export: Option<String>,

        /// After processing, run the low-inventory sweep
        #[arg(long)]
        low_inventory: bool,
    },
}

/// Execute `command`, writing one JSON outcome per line to `out`.
///
/// Returns the number of error outcomes.
pub fn run(services: &AppServices, command: Command, out: &mut impl Write) -> anyhow::Result<usize> {
    let mut errors = 0;
    match command {
        Command::Process {
            keys,
            export,
            low_inventory,
        } => {
            for key in &keys {
                errors += emit(out, &services.process_staged(key))?;
            }
            if let Some(key) = export {
                let key = Some(key.as_str()).filter(|k| !k.is_empty());
                errors += emit(out, &services.export_catalog(key))?;
            }
            if low_inventory {
                errors += emit(out, &services.check_low_inventory())?;
            }
        }
    }
    Ok(errors)
}

fn emit<T: Serialize>(out: &mut impl Write, outcome: &Outcome<T>) -> anyhow::Result<usize> {
    serde_json::to_writer(&mut *out, outcome)?;
    writeln!(out)?;
    Ok(usize::from(!outcome.is_ok()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_process_with_bare_export_flag() {
        let cli = Cli::try_parse_from([
            "stockledger",
            "process",
            "for_create/a.csv",
            "for_delete/b.csv",
            "--export",
            "--low-inventory",
        ])
        .unwrap();
        match cli.command {
            Command::Process {
                keys,
                export,
                low_inventory,
            } => {
                assert_eq!(keys, vec!["for_create/a.csv", "for_delete/b.csv"]);
                assert_eq!(export.as_deref(), Some(""));
                assert!(low_inventory);
            }
        }
    }

    #[test]
    fn directory_overrides_are_global() {
        let cli = Cli::try_parse_from([
            "stockledger",
            "process",
            "for_delete/x.csv",
            "--data-dir",
            "/srv/stock",
            "-s",
            "/srv/staging",
        ])
        .unwrap();
        assert_eq!(cli.data_dir, Some(PathBuf::from("/srv/stock")));
        assert_eq!(cli.staging_dir, Some(PathBuf::from("/srv/staging")));
    }

    #[test]
    fn process_requires_a_key() {
        assert!(Cli::try_parse_from(["stockledger", "process"]).is_err());
    }
}
