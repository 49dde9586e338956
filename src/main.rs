use std::path::PathBuf;
use std::time::Duration;

use clap::error::ErrorKind;
use clap::{CommandFactory, Parser, Subcommand};
use deploier::config::{Config, DEFAULT_DB, DEFAULT_RUNTIME, RUN_ARGS_PATH};
use deploier::protocol::CHANNEL;
use deploier::{Listener, Noticer};

#[derive(Parser)]
#[command(name = "deploier")]
#[command(about = "Deploy containers on request from a redis channel")]
struct Args {
    /// Redis server address (host:port or redis:// URL)
    #[arg(long, global = true)]
    redis: Option<String>,

    /// Redis database for bare host:port addresses
    #[arg(long, global = true, default_value_t = DEFAULT_DB)]
    db: i64,

    /// Channel deployment requests travel on
    #[arg(long, global = true, default_value = CHANNEL)]
    channel: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Listen for deployment requests and apply them (deploier)
    #[command(alias = "deploier")]
    Listen {
        /// JSON file with extra `run` arguments per service
        #[arg(long, default_value = RUN_ARGS_PATH)]
        run_args: PathBuf,

        /// Container runtime binary
        #[arg(long, default_value = DEFAULT_RUNTIME)]
        runtime: String,

        /// Give up on a runtime command after this many seconds
        #[arg(long)]
        command_timeout: Option<u64>,

        /// Cancel an in-flight deployment on SIGTERM/SIGINT
        #[arg(long)]
        abandon_on_shutdown: bool,
    },

    /// Publish a deployment request (noticer)
    #[command(alias = "noticer")]
    Notice {
        /// Service name
        #[arg(long)]
        service: String,

        /// Image to deploy for the service
        #[arg(long)]
        version: String,
    },
}

#[tokio::main]
async fn main() {
    let args = Args::parse();

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let redis = require_redis(args.redis).unwrap_or_else(|e| e.exit());

    let mut config = Config::new(redis);
    config.db = args.db;
    config.channel = args.channel;

    let result: Result<(), Box<dyn std::error::Error>> = match args.command {
        Command::Listen {
            run_args,
            runtime,
            command_timeout,
            abandon_on_shutdown,
        } => {
            config.run_args = run_args;
            config.runtime = runtime;
            config.command_timeout = command_timeout.map(Duration::from_secs);
            config.abandon_on_shutdown = abandon_on_shutdown;
            listen(&config).await
        }
        Command::Notice { service, version } => notice(&config, &service, &version).await,
    };

    if let Err(e) = result {
        log::error!("{}", e);
        std::process::exit(1);
    }
}

/// `--redis` is global, which clap cannot mark required, so check it here
fn require_redis(redis: Option<String>) -> Result<String, clap::Error> {
    redis.ok_or_else(|| {
        Args::command().error(ErrorKind::MissingRequiredArgument, "--redis <REDIS> is required")
    })
}

async fn listen(config: &Config) -> Result<(), Box<dyn std::error::Error>> {
    let reason = Listener::new(config)?.run().await?;
    log::info!("{}", reason);
    Ok(())
}

async fn notice(config: &Config, service: &str, version: &str) -> Result<(), Box<dyn std::error::Error>> {
    Noticer::new(config)?.notice(service, version).await?;
    Ok(())
}
