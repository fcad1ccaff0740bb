//! fitfleet - class booking CLI.

/// Application configuration (TOML).
mod config;

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::instrument;
use tracing_subscriber::filter::EnvFilter;
#[cfg(not(feature = "otel"))]
use tracing_subscriber::fmt;
#[cfg(feature = "otel")]
use tracing_subscriber::layer::SubscriberExt;
#[cfg(feature = "otel")]
use tracing_subscriber::util::SubscriberInitExt;

use crate::config::{AppConfig, BASE_URL_ENV, CONFIG_DIR_ENV, resolve_config_path};
use fitfleet_api::booking::{BookingClient, BookingRequest, LocalBookingApi};

/// CLI argument parser.
#[derive(Parser)]
#[command(about, version)]
struct Cli {
    /// Override config directory. Overrides `FITFLEET_CONFIG_DIR`.
    #[arg(long, global = true)]
    dir: Option<PathBuf>,

    /// Booking API base URL. Overrides `FITFLEET_API_BASE_URL` and config.
    #[arg(long, global = true)]
    base_url: Option<String>,

    /// Transport timeout in seconds (default: none).
    #[arg(long, global = true)]
    timeout_secs: Option<u64>,

    /// Subcommand to run.
    #[command(subcommand)]
    command: Commands,
}

/// Available subcommands.
#[derive(Subcommand)]
enum Commands {
    /// List class schedules.
    Schedules,
    /// Book a class.
    Book(ReservationArgs),
    /// Cancel a reservation.
    Cancel(ReservationArgs),
}

/// Arguments for the `book` and `cancel` subcommands.
#[derive(clap::Args)]
struct ReservationArgs {
    /// Class ID.
    #[arg(long, required = true)]
    class_id: u64,
    /// User ID.
    #[arg(long, required = true)]
    user_id: String,
}

/// Environment values consulted when building the client.
#[derive(Debug, Default)]
struct EnvOverrides {
    /// `FITFLEET_API_BASE_URL`.
    base_url: Option<String>,
    /// `FITFLEET_CONFIG_DIR`.
    config_dir: Option<String>,
}

impl EnvOverrides {
    fn from_env() -> Self {
        Self {
            base_url: std::env::var(BASE_URL_ENV).ok(),
            config_dir: std::env::var(CONFIG_DIR_ENV).ok(),
        }
    }
}

/// Builds a `BookingClient` from flags, environment and config file.
///
/// # Errors
///
/// Returns an error if the config file cannot be loaded or the client fails to build.
#[instrument(skip_all)]
fn build_booking_client(cli: &Cli, env: &EnvOverrides) -> Result<BookingClient> {
    let config_path = resolve_config_path(cli.dir.as_deref(), env.config_dir.as_deref())
        .context("failed to resolve config path")?;
    let config = AppConfig::load(&config_path).context("failed to load config")?;

    let base_url = config.resolve_base_url(cli.base_url.as_deref(), env.base_url.as_deref());
    if base_url.is_empty() {
        tracing::warn!("No base URL configured. Set --base-url or {BASE_URL_ENV}.");
    }

    let mut builder = BookingClient::builder().base_url(base_url);
    if let Some(ref ua) = config.api.user_agent {
        builder = builder.user_agent(ua);
    }
    if let Some(timeout) = config.resolve_timeout(cli.timeout_secs) {
        builder = builder.timeout(timeout);
    }
    builder.build().context("failed to build booking client")
}

/// Runs the `schedules` subcommand.
///
/// # Errors
///
/// Returns an error if the API request fails.
#[instrument(skip_all)]
async fn run_schedules(client: &impl LocalBookingApi) -> Result<()> {
    let schedules = client
        .fetch_schedules()
        .await
        .context("failed to fetch class schedules")?;

    tracing::info!("ID\tDate\t\tTime\tName");
    for schedule in &schedules {
        tracing::info!(
            "{}\t{}\t{}\t{}",
            schedule.id,
            schedule.date,
            schedule.time,
            schedule.name,
        );
    }
    tracing::info!("Total: {} classes", schedules.len());

    Ok(())
}

/// Runs the `book` subcommand.
///
/// # Errors
///
/// Returns an error if the API request fails.
#[instrument(skip_all)]
async fn run_book(client: &impl LocalBookingApi, args: &ReservationArgs) -> Result<()> {
    let request = BookingRequest::new(args.class_id, args.user_id.clone());
    client
        .book_class(&request)
        .await
        .with_context(|| format!("failed to book class {}", args.class_id))
}

/// Runs the `cancel` subcommand.
///
/// # Errors
///
/// Returns an error if the API request fails.
#[instrument(skip_all)]
async fn run_cancel(client: &impl LocalBookingApi, args: &ReservationArgs) -> Result<()> {
    client
        .cancel_reservation(args.class_id, &args.user_id)
        .await
        .with_context(|| format!("failed to cancel reservation for class {}", args.class_id))
}

/// Installs the global tracing subscriber.
///
/// With the `otel` feature, spans are also exported over OTLP when
/// `OTEL_EXPORTER_OTLP_ENDPOINT` is set.
fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    #[cfg(not(feature = "otel"))]
    {
        fmt().with_env_filter(env_filter).with_target(false).init();
    }

    #[cfg(feature = "otel")]
    {
        let fmt_layer = tracing_subscriber::fmt::layer().with_target(false);

        let otel_layer = std::env::var("OTEL_EXPORTER_OTLP_ENDPOINT")
            .ok()
            .and_then(|_| {
                let exporter = opentelemetry_otlp::SpanExporter::builder()
                    .with_http()
                    .build()
                    .ok()?;

                let tracer_provider = opentelemetry_sdk::trace::SdkTracerProvider::builder()
                    .with_simple_exporter(exporter)
                    .build();

                let tracer = opentelemetry::trace::TracerProvider::tracer(
                    &tracer_provider,
                    env!("CARGO_PKG_NAME"),
                );
                opentelemetry::global::set_tracer_provider(tracer_provider);

                Some(tracing_opentelemetry::layer().with_tracer(tracer))
            });

        tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt_layer)
            .with(otel_layer)
            .init();
    }
}

/// Entry point.
///
/// # Errors
///
/// Returns an error if subcommand execution fails.
#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    init_tracing();

    let env = EnvOverrides::from_env();
    let cli = Cli::parse();
    let client = build_booking_client(&cli, &env)?;

    match cli.command {
        Commands::Schedules => run_schedules(&client).await,
        Commands::Book(ref args) => run_book(&client, args).await,
        Commands::Cancel(ref args) => run_cancel(&client, args).await,
    }
}
