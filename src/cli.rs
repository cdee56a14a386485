use clap::Parser;
use std::path::PathBuf;

/// Command-line arguments for tabedit
#[derive(Parser, Debug)]
#[command(version, about = "tabedit")]
pub struct Args {
    /// Explicit data source path; without it, exactly one matching file in
    /// the working directory is used
    #[arg(short = 'f', long = "file")]
    pub file: Option<PathBuf>,

    /// Dump the table to stdout as plain text and exit
    #[arg(short = 'l', long = "list", action)]
    pub list: bool,

    /// Enable debug logging to tabedit.log
    #[arg(long = "debug", action)]
    pub debug: bool,
}
