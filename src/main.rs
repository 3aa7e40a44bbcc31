mod cli;

use hlsgate::{config, server, store::MediaStore, transcode};

use anyhow::Result;
use clap::Parser;
use cli::{Cli, Commands};

async fn start_server(
    host: Option<String>,
    port: Option<u16>,
    config_path: Option<&std::path::Path>,
) -> Result<()> {
    let mut config = config::load_config_or_default(config_path)?;

    if let Some(host) = host {
        config.server.host = host;
    }
    if let Some(port) = port {
        config.server.port = port;
    }

    tracing::info!("Starting hlsgate server");
    tracing::info!(
        "Server will listen on {}:{}",
        config.server.host,
        config.server.port
    );

    let secret = config::ensure_secret(&mut config, config_path)?;

    std::fs::create_dir_all(&config.storage.data_dir)?;
    let db_path = config.storage.db_path();
    tracing::info!("Opening metadata store at {:?}", db_path);
    let store = MediaStore::open(db_path)?;
    tracing::info!("Loaded {} media records", store.len());

    if let Err(e) = transcode::find_ffmpeg() {
        tracing::warn!("{e:#}; uploads will fail until ffmpeg is installed");
    }

    let ctx = server::AppContext::new(config, store, secret);
    server::start_server(ctx).await
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Respect RUST_LOG if set, otherwise use defaults based on verbose flag
    let env_filter = std::env::var("RUST_LOG").unwrap_or_else(|_| {
        if cli.verbose {
            "hlsgate=trace,tower_http=debug".to_string()
        } else {
            "hlsgate=debug,tower_http=info".to_string()
        }
    });

    tracing_subscriber::fmt()
        .with_env_filter(&env_filter)
        .init();

    match cli.command {
        Commands::Start { host, port } => {
            let rt = tokio::runtime::Runtime::new()?;
            rt.block_on(start_server(host, port, cli.config.as_deref()))
        }
        Commands::Validate {
            config: config_path,
        } => {
            let path = config_path.or(cli.config);
            validate_config(path.as_deref())
        }
        Commands::GenerateSecret => {
            println!("{}", config::generate_secret());
            Ok(())
        }
        Commands::CheckTools => check_tools(),
        Commands::Version => {
            println!("hlsgate {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
    }
}

fn validate_config(path: Option<&std::path::Path>) -> Result<()> {
    match path {
        Some(p) => {
            println!("Validating config: {:?}", p);
            let config = config::load_config(p)?;
            println!("✓ Configuration is valid");
            println!("  Server: {}:{}", config.server.host, config.server.port);
            println!("  Data dir: {:?}", config.storage.data_dir);
            println!("  Algorithm: {}", config.tokens.algorithm);
            println!(
                "  Expiry: default {} min, max {} min",
                config.tokens.default_expiry_minutes, config.tokens.max_expiry_minutes
            );
            println!(
                "  Signing secret: {}",
                if config.tokens.secret_key.is_some() {
                    "configured"
                } else {
                    "will be generated on first start"
                }
            );
        }
        None => {
            println!("No config file specified, using defaults");
            let config = config::Config::default();
            println!("Default config:");
            println!("  Server: {}:{}", config.server.host, config.server.port);
            println!("  Data dir: {:?}", config.storage.data_dir);
        }
    }

    Ok(())
}

fn check_tools() -> Result<()> {
    match transcode::find_ffmpeg() {
        Ok(path) => {
            println!("✓ ffmpeg - {}", path.display());
            Ok(())
        }
        Err(e) => {
            println!("✗ ffmpeg not found");
            Err(e)
        }
    }
}
