use clap::{Parser, Subcommand};

use bossbot_config::BotConfig;
use bossbot_sched::ScheduleStore;

#[derive(Parser)]
#[command(name = "bossbot", about = "One-shot boss spawn announcements for Discord")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Connect to Discord and serve scheduled announcements
    Run,
    /// Print the configured timezone and stored schedule count, offline
    Debug,
}

fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let config = BotConfig::from_env()?;

    match cli.command {
        Commands::Run => {
            let rt = tokio::runtime::Runtime::new()?;
            rt.block_on(bossbot_channel_discord::start(config))?;
        }
        Commands::Debug => {
            let rt = tokio::runtime::Runtime::new()?;
            let count = rt.block_on(async {
                let store = ScheduleStore::new(&config.schedule_file);
                anyhow::Ok(store.load_all().await?.len())
            })?;
            println!("TIMEZONE={}", config.timezone);
            println!("Schedules carregados: {count}");
        }
    }

    Ok(())
}
