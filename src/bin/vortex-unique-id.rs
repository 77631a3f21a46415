use clap::Parser;
use tracing_subscriber::EnvFilter;
use vortex::config::RuntimeConfig;
use vortex::error::Result;
use vortex::runtime::Runtime;
use vortex::workloads::unique_id;

#[derive(Parser, Debug)]
#[command(name = "vortex-unique-id")]
#[command(about = "Unique ID generator node for the Maelstrom unique-ids workload")]
struct Cli {
    #[arg(long, env = "VORTEX_CONFIG")]
    config: Option<String>,

    #[arg(long, env = "VORTEX_RPC_TIMEOUT_MS")]
    rpc_timeout_ms: Option<u64>,

    #[arg(long, env = "VORTEX_MAX_IN_FLIGHT")]
    max_in_flight: Option<usize>,
}

#[tokio::main]
async fn main() -> Result<()> {
    // stdout carries the protocol, so logs go to stderr.
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,vortex=info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
    let cli = Cli::parse();

    let config = RuntimeConfig::load(cli.config.as_deref())?
        .with_overrides(cli.rpc_timeout_ms, cli.max_in_flight)?;
    let mut runtime = Runtime::new(config);
    unique_id::register(&mut runtime)?;
    runtime.run_stdio().await
}
