use clap::Parser;
use std::path::PathBuf;

const LONG_VERSION: &str = concat!(
    env!("CARGO_PKG_VERSION"),
    " (",
    env!("GIT_HASH"),
    ", built ",
    env!("BUILD_TIME"),
    ")"
);

#[derive(Parser, Debug, Clone, Default)]
#[command(
    name = "dscan",
    version,
    long_version = LONG_VERSION,
    about = "Sequential WHOIS scanner with rotating NDJSON output",
    long_about = "dscan reads a list of domains, looks each one up in a WHOIS JSON API and appends the\nregistrar and registrant data to size-bounded, sequentially numbered NDJSON files.\nA new run continues numbering after the highest existing output file."
)]
pub struct Args {
    /// TOML configuration file
    #[arg(short = 'c', long = "config", value_name = "FILE")]
    pub config_path: Option<PathBuf>,

    /// Env file with DSCAN_* settings [default: .dScan, if present]
    #[arg(long = "env-file", value_name = "FILE")]
    pub env_file: Option<PathBuf>,

    /// File containing the list of domains (overrides DSCAN_DOMAIN_FILE)
    #[arg(short = 'l', long = "list", value_name = "FILE")]
    pub domains_file: Option<PathBuf>,

    /// Verbose logging
    #[arg(short = 'v', long = "verbose")]
    pub verbose: bool,
}

impl Args {
    pub fn log_level(&self) -> log::LevelFilter {
        if self.verbose {
            log::LevelFilter::Debug
        } else {
            log::LevelFilter::Info
        }
    }
}
