use crate::driver;
use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Reconcile a restraint file against a coordinate model
    Process {
        /// Coordinate file (mmCIF or PDB)
        #[arg(short, long)]
        coordinates: String,

        /// Restraint file (generic whitespace/comma-separated rows)
        #[arg(short, long)]
        restraints: String,

        /// Emit the full report as JSON instead of a text summary
        #[arg(long)]
        json: bool,

        /// Stop after the first pass even when reparse reasons were found
        #[arg(long)]
        single_pass: bool,
    },
}

impl Cli {
    pub fn execute(&self) -> anyhow::Result<()> {
        match &self.command {
            Commands::Process {
                coordinates,
                restraints,
                json,
                single_pass,
            } => {
                let report = driver::process_file(coordinates, restraints, !*single_pass)?;
                if *json {
                    println!("{}", serde_json::to_string_pretty(&report)?);
                } else {
                    report.print_summary();
                }
                Ok(())
            }
        }
    }
}
