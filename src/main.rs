use clap::{Parser, Subcommand};
use miette::{IntoDiagnostic, Result};
use payment_settlement::config::Config;
use payment_settlement::domain::ports::Page;
use payment_settlement::interfaces::csv::payment_writer::PaymentWriter;
use payment_settlement::interfaces::http::router;
use payment_settlement::{app, telemetry};
use std::io;
use std::path::PathBuf;
use tokio::net::TcpListener;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run the HTTP API
    Serve {
        /// TOML configuration file
        #[arg(long)]
        config: Option<PathBuf>,

        /// Address to listen on, overrides the configuration
        #[arg(long)]
        bind: Option<String>,
    },
    /// Write every stored payment to stdout as CSV
    ExportPayments {
        /// TOML configuration file
        #[arg(long)]
        config: Option<PathBuf>,

        /// Path to persistent database, overrides the configuration
        #[arg(long)]
        db_path: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    telemetry::init();
    let cli = Cli::parse();

    match cli.command {
        Command::Serve { config, bind } => {
            let mut config = Config::load(config.as_deref()).into_diagnostic()?;
            if let Some(bind) = bind {
                config.server.bind_address = bind;
            }
            serve(config).await
        }
        Command::ExportPayments { config, db_path } => {
            let mut config = Config::load(config.as_deref()).into_diagnostic()?;
            if db_path.is_some() {
                config.storage.db_path = db_path;
            }
            export_payments(&config).await
        }
    }
}

async fn serve(config: Config) -> Result<()> {
    let service = app::from_config(&config).into_diagnostic()?;

    let listener = TcpListener::bind(&config.server.bind_address)
        .await
        .into_diagnostic()?;
    tracing::info!(
        address = %config.server.bind_address,
        gateways = ?service.state.gateways,
        "payment settlement service listening"
    );

    axum::serve(listener, router(service.state))
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
        })
        .await
        .into_diagnostic()?;

    tracing::info!("shutdown complete");
    Ok(())
}

async fn export_payments(config: &Config) -> Result<()> {
    let stores = app::open_stores(config.storage.db_path.as_deref()).into_diagnostic()?;

    let mut payments = Vec::new();
    loop {
        let batch = stores
            .payments
            .list(None, Page::new(payments.len(), Page::MAX_LIMIT))
            .await
            .into_diagnostic()?;
        let done = batch.len() < Page::MAX_LIMIT;
        payments.extend(batch);
        if done {
            break;
        }
    }

    let stdout = io::stdout();
    let mut writer = PaymentWriter::new(stdout.lock());
    writer.write_payments(&payments).into_diagnostic()?;
    Ok(())
}
