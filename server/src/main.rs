mod broadcaster;
mod room_registry;
mod room_service;
mod server_config;
mod web_server;
mod ws_handler;

use clap::Parser;

use common::config::{ConfigManager, FileContentConfigProvider, YamlConfigSerializer};
use common::{log, logger};

use broadcaster::Broadcaster;
use room_registry::RoomRegistry;
use room_service::RoomService;
use server_config::{DEFAULT_CONFIG_FILE, ServerConfig};
use web_server::{WebServerState, run_web_server};

#[derive(Parser)]
#[command(name = "duel_server")]
struct Args {
    #[arg(long)]
    use_log_prefix: bool,

    /// YAML config file; defaults apply when it does not exist.
    #[arg(long, default_value = DEFAULT_CONFIG_FILE)]
    config: String,

    /// Overrides `listen_address` from the config file.
    #[arg(long)]
    listen_address: Option<String>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let prefix = if args.use_log_prefix {
        Some("Server".to_string())
    } else {
        None
    };
    logger::init_logger(prefix);

    let config_manager: ConfigManager<FileContentConfigProvider, ServerConfig, YamlConfigSerializer> =
        ConfigManager::from_yaml_file(&args.config);
    let mut config = config_manager.get_config()?;
    if let Some(listen_address) = args.listen_address {
        config.listen_address = listen_address;
    }

    let broadcaster = Broadcaster::new();
    let room_service = RoomService::new(RoomRegistry::new(), broadcaster.clone());
    let state = WebServerState {
        room_service,
        broadcaster,
    };

    let shutdown_signal = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            log!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
        log!("Shutdown signal received");
    };

    run_web_server(state, &config, shutdown_signal).await?;

    log!("Server shut down gracefully");

    Ok(())
}
