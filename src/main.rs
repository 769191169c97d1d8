//! # wlstart - minimal Wayland client
//!
//! Opens one xdg-shell toplevel showing a shared-memory checker pattern
//! and exits when the compositor closes it.

use anyhow::Result;
use clap::Parser;
use log::{error, info};

use wlstart::config::ClientConfig;
use wlstart::{client, ClientOptions};

#[derive(Parser)]
#[command(name = "wlstart")]
#[command(about = "A minimal Wayland client showing a shared-memory buffer in a toplevel")]
#[command(version)]
struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "~/.config/wlstart/wlstart.toml")]
    config: String,

    /// Enable debug logging
    #[arg(short, long)]
    debug: bool,

    /// Window title
    #[arg(long)]
    title: Option<String>,

    /// Buffer width in pixels
    #[arg(long)]
    width: Option<u32>,

    /// Buffer height in pixels
    #[arg(long)]
    height: Option<u32>,
}

impl Cli {
    /// Applies command line overrides on top of the loaded config
    fn apply(&self, config: &mut ClientConfig) {
        if let Some(title) = &self.title {
            config.window.title = title.clone();
        }
        if let Some(width) = self.width {
            config.window.width = width;
        }
        if let Some(height) = self.height {
            config.window.height = height;
        }
        if self.debug {
            config.general.debug = true;
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Configuration is read before logging so `general.debug` can raise the level
    let loaded = ClientConfig::load(&cli.config);
    let mut config = match &loaded {
        Ok(config) => config.clone(),
        Err(_) => ClientConfig::default(),
    };
    cli.apply(&mut config);

    let default_filter = if config.general.debug { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .init();

    info!("🚀 Starting wlstart {}", wlstart::VERSION);
    info!(
        "📄 Built {} (commit {})",
        env!("BUILD_DATE"),
        option_env!("GIT_COMMIT").unwrap_or("unknown")
    );

    match loaded {
        Ok(_) => info!("✅ Configuration loaded from: {}", cli.config),
        Err(e) => {
            info!("📝 No usable configuration ({}), using defaults", e);
        }
    }

    config.validate()?;
    let options = ClientOptions::from_config(&config)?;

    match client::run(&options) {
        Ok(summary) => {
            info!(
                "👋 Closed cleanly: {} configures acked, {} pings answered, {} loop iterations",
                summary.handshake.configures_acked,
                summary.handshake.pongs_sent,
                summary.event_loop.iterations
            );
            Ok(())
        }
        Err(e) => {
            error!("❌ {} failed: {}", e.phase(), e);
            Err(anyhow::anyhow!("{} failed: {}", e.phase(), e))
        }
    }
}
