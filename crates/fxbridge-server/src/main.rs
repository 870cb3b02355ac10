use clap::Parser;
use fxbridge_core::CatalogService;
use fxbridge_host::mock::MockHost;
use fxbridge_server::BridgeServer;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(
    name = "fxbridge-server",
    about = "Local HTTP control surface over a simulated audio host"
)]
struct Args {
    /// Address to bind the HTTP listener on
    #[arg(long, default_value = "127.0.0.1:8888")]
    addr: String,

    /// Number of empty tracks to seed the simulated project with
    #[arg(long, default_value_t = 1)]
    tracks: usize,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .try_init()
        .ok();

    let args = Args::parse();
    let host = MockHost::demo(args.tracks);
    let service = CatalogService::new(host);
    tracing::info!(addr = %args.addr, "starting FxBridge over a simulated host");
    BridgeServer::new(service).run(&args.addr)
}
