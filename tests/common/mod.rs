#[cfg(test)]
mod fixture;
pub use fixture::Fixture;

use anyhow::Result;
use clap::Parser;

/// Parse a whitespace-separated command line and run it.
pub fn varsim(args: &str) -> Result<()> {
    eprintln!("{args}");
    let cli = parser::Cli::try_parse_from(args.split_whitespace())?;
    varsim_rs::run(cli)
}
