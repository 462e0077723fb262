mod analyze_cmd;
mod doctor_cmd;
mod terminal_output;

use std::net::SocketAddr;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use tracing::{info, warn};

use meterlens_config::{config_file_path, load_and_prepare, MeterLensConfig};
use meterlens_core::OutputShape;
use meterlens_gateway::{start_server, GatewayState};
use meterlens_understanding::{to_json_schema, MeterAnalyzer, SchemaDialect};

#[derive(Parser)]
#[command(name = "meterlens")]
#[command(about = "MeterLens: read electric meters from photos")]
#[command(version)]
struct Cli {
    /// Config file (defaults to METERLENS_CONFIG or the platform config dir)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Analyze one meter photo
    Analyze {
        /// PNG, JPEG or WEBP image
        path: PathBuf,
        /// Print the result as JSON
        #[arg(long)]
        json: bool,
        /// Also ask for the utility authority
        #[arg(long)]
        with_authority: bool,
    },
    /// Start the HTTP gateway
    Serve {
        /// Port to bind the HTTP server to
        #[arg(short, long)]
        port: Option<u16>,
        /// Address to bind the HTTP server to
        #[arg(short, long)]
        bind: Option<String>,
    },
    /// Print the instructions sent with each image
    Prompt {
        #[arg(long)]
        with_authority: bool,
    },
    /// Print the output-shape declaration
    Schema {
        #[arg(long)]
        with_authority: bool,
        #[arg(long, value_enum, default_value_t = DialectArg::Gemini)]
        dialect: DialectArg,
    },
    /// Check configuration and credentials
    Doctor,
}

#[derive(Clone, Copy, ValueEnum)]
enum DialectArg {
    Gemini,
    Openai,
}

impl From<DialectArg> for SchemaDialect {
    fn from(arg: DialectArg) -> Self {
        match arg {
            DialectArg::Gemini => SchemaDialect::Gemini,
            DialectArg::Openai => SchemaDialect::OpenAi,
        }
    }
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    let config_path = config_file_path(cli.config.as_deref());
    let (mut config, report) = load_and_prepare(&config_path).await?;

    meterlens_logging::init_logger(config.logging.level(), config.logging.log_dir.as_deref());
    report.log();

    match cli.command {
        Commands::Analyze {
            path,
            json,
            with_authority,
        } => {
            enable_authority(&mut config, with_authority);
            let analyzer = MeterAnalyzer::from_config(&config)?;
            let ok = analyze_cmd::run(&analyzer, &path, json).await?;
            return Ok(if ok { ExitCode::SUCCESS } else { ExitCode::FAILURE });
        }
        Commands::Serve { port, bind } => {
            if port.is_some() {
                config.server.port = port;
            }
            if bind.is_some() {
                config.server.bind_address = bind;
            }
            run_server(config).await?;
        }
        Commands::Prompt { with_authority } => {
            enable_authority(&mut config, with_authority);
            let analyzer = MeterAnalyzer::from_config(&config)?;
            println!("{}", analyzer.instructions().as_str());
        }
        Commands::Schema {
            with_authority,
            dialect,
        } => {
            let shape = if with_authority || config.analysis.with_authority() {
                OutputShape::with_authority()
            } else {
                OutputShape::standard()
            };
            let schema = to_json_schema(&shape, dialect.into());
            println!("{}", serde_json::to_string_pretty(&schema)?);
        }
        Commands::Doctor => {
            let healthy = doctor_cmd::run(&config_path, &config, &report);
            return Ok(if healthy { ExitCode::SUCCESS } else { ExitCode::FAILURE });
        }
    }

    Ok(ExitCode::SUCCESS)
}

fn enable_authority(config: &mut MeterLensConfig, requested: bool) {
    if requested {
        config.analysis.with_authority = Some(true);
    }
}

async fn run_server(config: MeterLensConfig) -> Result<()> {
    let addr: SocketAddr = config
        .server
        .addr()
        .parse()
        .with_context(|| format!("Invalid bind address: {}", config.server.addr()))?;

    let analyzer = MeterAnalyzer::from_config(&config)?;
    if !analyzer.has_credential() {
        warn!("No API key configured; every analysis will fail until one is set");
    }
    info!(
        addr = %addr,
        provider = analyzer.backend_name(),
        model = analyzer.model(),
        "Starting MeterLens gateway"
    );

    start_server(addr, GatewayState::new(Arc::new(analyzer))).await
}
