use clap::Parser;

#[derive(clap::Parser, Debug)]
#[command(author, version, about = "Enumerate public blob containers by brute-forcing container names", long_about = None)]
pub struct Cli {
    /// Single storage account to scan (ignored when --accounts is given)
    pub target: Option<String>,

    /// File with target storage account names, one per line
    #[arg(long, value_name = "FILE")]
    pub accounts: Option<String>,

    /// Wordlist with candidate container names
    #[arg(long, value_name = "FILE", default_value = "wordlists/goblob-folder-names.txt")]
    pub containers: String,

    /// Maximum number of concurrent probes
    #[arg(short = 'c', long, default_value_t = 5000_usize)]
    pub max_tasks: usize,

    /// Append found URLs to this file
    #[arg(short = 'o', long, value_name = "FILE")]
    pub output: Option<String>,

    /// Verbosity level (0 = quiet, 1 = progress, 2 = errors, 3 = misses)
    #[arg(short = 'v', long, default_value_t = 1_u8)]
    pub verbose: u8,

    /// Show each blob URL instead of container URLs
    #[arg(long, default_value_t = false)]
    pub blobs: bool,

    /// Maximum listing pages per container (negative = unlimited)
    #[arg(long, default_value_t = 20_i64, allow_negative_numbers = true)]
    pub max_pages: i64,

    /// Iterate container names in the outer loop (one name across all accounts at a time)
    #[arg(long, default_value_t = false)]
    pub invert: bool,

    /// Request timeout in seconds
    #[arg(long, default_value_t = 90_u64)]
    pub timeout: u64,

    /// Maximum idle pooled connections per host
    #[arg(long, default_value_t = 10_usize)]
    pub max_idle_per_host: usize,

    /// Skip TLS certificate verification
    #[arg(long, default_value_t = false)]
    pub skip_tls: bool,

    /// Save the final summary as JSON
    #[arg(long, value_name = "FILE")]
    pub report: Option<String>,
}

pub fn parse_cli() -> Cli {
    Cli::parse()
}
