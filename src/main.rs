use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use sentinel_cache::config::{Config, ConfigError};
use sentinel_cache::store::PooledConnection;
use sentinel_cache::{manager_from_config, ConnectionDescriptor};
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "sentinel-cache")]
#[command(about = "Failover-aware Redis Sentinel connection manager for cache backends")]
#[command(version = env!("CARGO_PKG_VERSION"))]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Ask the sentinels for the node a connection would use
    Discover {
        /// Path to configuration file
        #[arg(short, long, default_value = "config/sentinel.toml")]
        config: PathBuf,
        /// Discover a read connection instead of the primary
        #[arg(long)]
        read: bool,
    },
    /// Send PING through the manager with failover recovery
    Ping {
        #[arg(short, long, default_value = "config/sentinel.toml")]
        config: PathBuf,
        #[arg(long)]
        read: bool,
    },
    /// Generate an example configuration file
    Config {
        /// Output file path
        #[arg(short, long)]
        output: PathBuf,
    },
    /// Validate configuration file
    Validate {
        #[arg(short, long)]
        config: PathBuf,
    },
    /// Show version information
    Version,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Discover { config, read } => discover(config, read).await,
        Commands::Ping { config, read } => ping(config, read).await,
        Commands::Config { output } => generate_config(output),
        Commands::Validate { config } => validate_config(config),
        Commands::Version => {
            show_version();
            Ok(())
        }
    }
}

fn load(config_path: &PathBuf) -> Result<Config> {
    let config = Config::load_from_file(config_path)
        .with_context(|| format!("Failed to load config from {:?}", config_path))?;
    init_logging(&config);
    info!("Configuration loaded from: {:?}", config_path);
    Ok(config)
}

async fn discover(config_path: PathBuf, read: bool) -> Result<()> {
    let config = load(&config_path)?;
    let manager = manager_from_config(&config)?;

    let conn = manager.get_connection(!read).await?;
    println!(
        "{} connection for '{}': {}",
        if read { "read" } else { "write" },
        manager.descriptor().cluster_name,
        conn.locator()
    );
    Ok(())
}

async fn ping(config_path: PathBuf, read: bool) -> Result<()> {
    let config = load(&config_path)?;
    let manager = manager_from_config(&config)?;

    let reply: String = manager.query(!read, &redis::cmd("PING")).await?;
    println!("{}", reply);
    Ok(())
}

fn generate_config(output: PathBuf) -> Result<()> {
    println!("Generating configuration file: {:?}", output);

    Config::create_example_config(&output)
        .with_context(|| format!("Failed to generate config {:?}", output))?;

    println!("Configuration file generated successfully!");
    println!("Edit the descriptor to match your sentinels and run:");
    println!("  sentinel-cache discover --config {:?}", output);

    Ok(())
}

fn validate_config(config_path: PathBuf) -> Result<()> {
    println!("Validating configuration file: {:?}", config_path);

    match Config::load_from_file(&config_path) {
        Ok(config) => {
            println!("✓ Configuration file is valid");
            if let Ok(descriptor) = ConnectionDescriptor::parse(&config.connection.descriptor) {
                println!("  Cluster: {}", descriptor.cluster_name);
                println!("  Database: {}", descriptor.db_index);
                println!("  Sentinels: {} instances", descriptor.monitor_endpoints.len());
                for (i, endpoint) in descriptor.monitor_endpoints.iter().enumerate() {
                    println!("    {}: {}", i + 1, endpoint);
                }
            }
            println!("  Sentinel timeout: {}s", config.sentinel.sentinel_timeout_sec);
            println!("  Read strategy: {}", config.sentinel.read_strategy);
            println!("  Close connections on reset: {}", config.sentinel.close_connection);
            Ok(())
        }
        Err(e) => {
            eprintln!("✗ Configuration file validation failed:");
            match &e {
                ConfigError::IoError(msg) => eprintln!("  File error: {}", msg),
                ConfigError::ParseError(msg) => eprintln!("  Parse error: {}", msg),
                ConfigError::ValidationError(msg) => eprintln!("  Validation error: {}", msg),
                ConfigError::SerializeError(msg) => eprintln!("  Serialization error: {}", msg),
                ConfigError::DescriptorError(raw) => eprintln!("  Bad descriptor: {}", raw),
            }
            Err(e.into())
        }
    }
}

fn show_version() {
    println!("sentinel-cache v{}", env!("CARGO_PKG_VERSION"));
    println!("Failover-aware Redis Sentinel connection manager for cache backends");
    println!();
    println!("Target: {}", std::env::consts::ARCH);
}

fn init_logging(config: &Config) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.logging.level.as_str()));

    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    let result = match config.logging.format.as_str() {
        "compact" => builder.compact().try_init(),
        _ => builder.try_init(),
    };

    if result.is_ok() {
        info!("Logging initialized at level: {}", config.logging.level);
    }
}
