//! genl-mcast command - list generic netlink families and their multicast groups.

use std::io::Write;
use std::time::Duration;

use clap::Parser;
use nlmcast::output::{OutputFormat, OutputOptions, Printable, PrintableList};
use nlmcast::{DiscoveryConfig, FailurePolicy, build_catalog_with};

#[derive(Parser)]
#[command(
    name = "genl-mcast",
    version,
    about = "List generic netlink families and their multicast groups"
)]
struct Cli {
    /// Output JSON.
    #[arg(short = 'j', long)]
    json: bool,

    /// Pretty print JSON.
    #[arg(short = 'p', long)]
    pretty: bool,

    /// Print family IDs in hex.
    #[arg(short = 'x', long)]
    hex: bool,

    /// Only print this family.
    #[arg(short = 'f', long, value_name = "NAME")]
    family: Option<String>,

    /// Time to wait for each kernel reply, in milliseconds (0 waits forever).
    #[arg(long, value_name = "N", default_value_t = 5000)]
    timeout_ms: u64,

    /// Leave out families whose groups cannot be read instead of failing.
    #[arg(long)]
    skip_failed: bool,

    /// Log protocol steps to stderr.
    #[arg(short = 'v', long)]
    verbose: bool,
}

impl Cli {
    fn discovery_config(&self) -> DiscoveryConfig {
        let timeout = (self.timeout_ms > 0).then(|| Duration::from_millis(self.timeout_ms));
        let policy = if self.skip_failed {
            FailurePolicy::SkipFamily
        } else {
            FailurePolicy::Abort
        };

        DiscoveryConfig::new().timeout(timeout).policy(policy)
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let level = if cli.verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::WARN
    };
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env().add_directive(level.into()),
        )
        .init();

    let format = if cli.json {
        OutputFormat::Json
    } else {
        OutputFormat::Text
    };

    let opts = OutputOptions {
        hex: cli.hex,
        pretty: cli.pretty,
    };

    let catalog = build_catalog_with(&cli.discovery_config())
        .await
        .map_err(|e| {
            let stage = e.stage();
            anyhow::Error::new(e).context(format!("discovery failed at {} stage", stage))
        })?;

    let mut stdout = std::io::stdout().lock();
    match &cli.family {
        Some(name) => {
            let Some(family) = catalog.family(name) else {
                anyhow::bail!("family {} not found", name);
            };
            family.print(&mut stdout, format, &opts)?;
        }
        None => catalog.print(&mut stdout, format, &opts)?,
    }
    stdout.flush()?;

    Ok(())
}
