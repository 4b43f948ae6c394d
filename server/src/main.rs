use clap::Parser;
use log::info;
use server::network::Server;
use std::time::Duration;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Server IP address to bind to
    #[arg(short = 'H', long, default_value = "127.0.0.1")]
    host: String,

    /// Server port to listen on
    #[arg(short, long, default_value = "8080")]
    port: u16,

    /// Tick rate (updates per second)
    #[arg(short, long, default_value = "60")]
    tick_rate: u32,

    /// Score every board starts the game with
    #[arg(short, long, default_value = "501")]
    starting_score: u32,

    /// Disable the exact-finish (bust) rule
    #[arg(long)]
    no_exact_finish: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    if std::env::var("RUST_LOG").is_err() {
        eprintln!("Set RUST_LOG=info for detailed logging");
    }

    let args = Args::parse();
    let addr = format!("{}:{}", args.host, args.port);
    let tick_duration = Duration::from_secs_f64(1.0 / args.tick_rate.max(1) as f64);

    info!("Starting darts server on {}", addr);
    info!(
        "Boards start at {}, exact finish {}",
        args.starting_score,
        if args.no_exact_finish { "off" } else { "on" }
    );

    let mut server = Server::new(
        &addr,
        tick_duration,
        args.starting_score,
        !args.no_exact_finish,
    )
    .await?;

    tokio::select! {
        result = server.run() => result,
        _ = tokio::signal::ctrl_c() => {
            info!("Received Ctrl+C, shutting down gracefully...");
            Ok(())
        }
    }
}
