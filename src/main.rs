use anyhow::Result;
use clap::Parser;
use sqlite_reader::cli::{self, Args};
use tracing_subscriber::{fmt, EnvFilter};

fn main() -> Result<()> {
    let args = Args::parse();

    // Logs go to stderr so stdout only carries command output
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(args.log_level()));
    fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let stdout = std::io::stdout();
    cli::run(&args, &mut stdout.lock())
}
