//! Dossier CLI — extract, normalize and chunk source material about subjects.
//!
//! Reads per-subject extraction metadata, pulls the reference article and
//! listed web pages for each subject, and writes overlapping text chunks.

mod commands;

use clap::Parser;
use color_eyre::eyre::Result;

use commands::Cli;

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;
    let cli = Cli::parse();
    commands::init_tracing(&cli);
    commands::run(cli).await
}
