mod config;
mod terminal;

use clap::{Parser, ValueEnum};

use common::session::{Mode, SessionCoordinator};
use common::{log, logger};

use config::{DEFAULT_CONFIG_FILE, get_config_manager};

#[derive(Clone, Copy, Debug, ValueEnum)]
enum ModeArg {
    Cpu,
    Local,
    Online,
}

impl From<ModeArg> for Mode {
    fn from(mode: ModeArg) -> Self {
        match mode {
            ModeArg::Cpu => Mode::Cpu,
            ModeArg::Local => Mode::Local,
            ModeArg::Online => Mode::Online,
        }
    }
}

#[derive(Parser)]
#[command(name = "duel_client")]
struct Args {
    #[arg(long)]
    use_log_prefix: bool,

    #[arg(long, value_enum, default_value = "cpu")]
    mode: ModeArg,

    #[arg(long, default_value = DEFAULT_CONFIG_FILE)]
    config: String,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let prefix = if args.use_log_prefix {
        Some("Client".to_string())
    } else {
        None
    };
    logger::init_logger(prefix);

    let config = get_config_manager(&args.config).get_config()?;
    log!("Starting in {} mode", Mode::from(args.mode));

    let coordinator = SessionCoordinator::new(config.timings());
    terminal::run(coordinator, args.mode.into(), config.server_url).await
}
