//! OverText - screen translation overlay core
//!
//! Command-line front end for configuration management and for smoke-testing
//! the configured translation backend. The capture/OCR/render collaborators
//! are supplied by platform hosts linking the library.

use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::EnvFilter;

use overtext::config::{self, AppConfig};
use overtext::translate::{build_translator, expansion_factor};

/// OverText - screen translation overlay core
#[derive(Parser, Debug)]
#[command(name = "overtext")]
#[command(about = "Translates text in a captured screen region and re-renders it in place")]
struct Args {
    /// Path to the configuration file (default: platform config dir)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Print the effective configuration as TOML and exit
    #[arg(long)]
    print_config: bool,

    /// Translate TEXT with the configured backend and exit
    #[arg(long, value_name = "TEXT")]
    translate: Option<String>,
}

fn main() -> Result<()> {
    // RUST_LOG overrides the default level
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let args = Args::parse();

    let config = load_or_create_config(args.config.as_deref())?;

    if args.print_config {
        println!("{}", toml::to_string_pretty(&config)?);
        return Ok(());
    }

    if let Some(text) = args.translate {
        let source = &config.languages.source;
        let target = &config.languages.target;
        info!(
            "translating {} -> {} via {:?} (expansion factor {:.1})",
            source,
            target,
            config.translation.service,
            expansion_factor(source, target)
        );

        let translator = build_translator(&config.translation)?;
        let translated = translator.translate(&text, source, target)?;
        println!("{translated}");
        return Ok(());
    }

    info!("configuration loaded; no action requested");
    info!("use --print-config to inspect settings or --translate TEXT to test the backend");

    Ok(())
}

/// Load configuration from the given path or the platform config dir,
/// writing the defaults on first run
fn load_or_create_config(path: Option<&std::path::Path>) -> Result<AppConfig> {
    let config_path = match path {
        Some(path) => path.to_path_buf(),
        None => config::get_config_dir()?.join("config.toml"),
    };

    if config_path.exists() {
        let config = config::load_config(&config_path)?;
        info!("loaded configuration from {:?}", config_path);
        return Ok(config);
    }

    let config = AppConfig::default();
    config::save_config(&config, &config_path)?;
    info!("wrote default configuration to {:?}", config_path);
    Ok(config)
}
