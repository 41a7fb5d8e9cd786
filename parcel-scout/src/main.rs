//! parcel-scout - county parcel catalog client
//!
//! Streams a county catalog from the parcel backend, then filters, ranks, enriches
//! and exports it from the command line.

use anyhow::{bail, Context, Result};
use clap::Parser;
use parcel_common::config::{write_toml_config, CompiledDefaults, TomlConfig};
use parcel_common::events::EventBus;
use parcel_common::format::{
    format_count, format_enriched, format_flag, format_number, format_text, truncate,
};
use parcel_common::Parcel;
use parcel_scout::cli::{Cli, Command, FetchArgs};
use parcel_scout::models::IngestState;
use parcel_scout::services::{
    export, map_handoff, ranking, Availability, EnrichmentCoordinator, IngestionController,
    ParcelApiClient,
};
use parcel_scout::CatalogState;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    if let Command::InitConfig { path, force } = &cli.command {
        return init_config(path.as_deref().or(cli.config.as_deref()), *force);
    }

    let config = cli
        .config_resolver()
        .resolve()
        .context("Failed to resolve configuration")?;

    // Initialize tracing; RUST_LOG wins over the configured level
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&config.logging.level)),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    info!(backend_url = %config.backend_url, "Starting parcel-scout");

    let client = ParcelApiClient::from_config(&config).context("Failed to create backend client")?;

    match cli.command {
        Command::Status { county } => status(&client, &county).await,
        Command::Fetch(args) => fetch(&config, client, args).await,
        Command::InitConfig { .. } => Ok(()),
    }
}

fn init_config(path: Option<&Path>, force: bool) -> Result<()> {
    let path = match path {
        Some(path) => path.to_path_buf(),
        None => CompiledDefaults::config_file_path()
            .context("Could not determine config directory; pass --path")?,
    };

    if path.exists() && !force {
        bail!("{} already exists (use --force to overwrite)", path.display());
    }

    write_toml_config(&TomlConfig::default(), &path)
        .with_context(|| format!("Failed to write {}", path.display()))?;
    println!("Wrote default configuration to {}", path.display());
    Ok(())
}

async fn status(client: &ParcelApiClient, county: &str) -> Result<()> {
    let availability = client.check_availability(county).await;
    println!("{}: {}", county, availability);
    Ok(())
}

async fn fetch(config: &TomlConfig, client: ParcelApiClient, args: FetchArgs) -> Result<()> {
    let criteria = args.criteria().context("Invalid filter bounds")?;
    let event_bus = EventBus::new(100);
    let state = Arc::new(CatalogState::new());
    let cancel = CancellationToken::new();

    tokio::spawn(cancel_on_ctrl_c(cancel.clone()));
    let progress = tokio::spawn(render_progress(Arc::clone(&state), config.ingest.expected_total));

    let controller = IngestionController::new(config.ingest.clone(), event_bus.clone());
    let (availability, session) = tokio::join!(
        client.check_availability(&args.county),
        controller.ingest_county(&client, &args.county, &state, &cancel),
    );
    progress.abort();
    eprintln!();

    if availability == Availability::Missing {
        warn!(county = %args.county, "Backend reports no catalog file for county");
    }

    match session.state {
        IngestState::Cancelled => {
            eprintln!("Cancelled after {} parcels", session.record_count);
            return Ok(());
        }
        IngestState::Failed => {
            eprintln!(
                "Loading stopped early: {} ({} parcels kept)",
                session.error.as_deref().unwrap_or("unknown error"),
                session.record_count
            );
        }
        _ => {
            eprintln!(
                "Loaded {} parcels ({} malformed lines skipped)",
                session.record_count, session.malformed_lines
            );
        }
    }

    if !criteria.is_unbounded() {
        let shown = state.apply_filter(&criteria);
        eprintln!("{} parcels match the filter", shown.len());
    }

    if args.high_potential {
        let shown = Arc::new(ranking::high_potential(&state.displayed()));
        eprintln!("{} high-potential parcels", shown.len());
        state.set_displayed(shown);
    }

    if let Some(n) = args.ranking_size(config.ranking.top_n) {
        if args.enrich {
            let candidates = ranking::initial_ranking(&state.displayed(), n);
            let coordinator = EnrichmentCoordinator::new(client, event_bus, n);
            match coordinator.enrich(&state, &candidates).await {
                Ok(outcome) => {
                    eprintln!("Enriched {} parcels with highway distance", outcome.enriched_count);
                    if let Some(advisory) = outcome.advisory {
                        eprintln!("Note: {}", advisory);
                    }
                }
                Err(e) => {
                    eprintln!("Enrichment failed, showing unenriched ranking: {}", e);
                    state.set_displayed(Arc::new(ranking::top_n(&candidates, n)));
                }
            }
        } else {
            state.set_displayed(Arc::new(ranking::top_n(&state.displayed(), n)));
        }
    }

    let displayed = state.displayed();
    print_table(&displayed, args.limit);

    if let Some(target) = &args.export {
        let path = export_path(target, &config.export.file_name);
        export::export_to_file(&path, &displayed)
            .with_context(|| format!("Failed to export {}", path.display()))?;
        eprintln!("Exported {} parcels to {}", displayed.len(), path.display());
    }

    if args.markers {
        let handoff = map_handoff::markers(&displayed);
        if handoff.skipped > 0 {
            eprintln!("{} parcels have no usable coordinates", handoff.skipped);
        }
        println!("{}", serde_json::to_string_pretty(&handoff)?);
    }

    Ok(())
}

/// A directory target receives the configured file name
fn export_path(target: &Path, file_name: &str) -> PathBuf {
    if target.is_dir() {
        target.join(file_name)
    } else {
        target.to_path_buf()
    }
}

async fn cancel_on_ctrl_c(cancel: CancellationToken) {
    if signal::ctrl_c().await.is_ok() {
        info!("Received Ctrl+C, cancelling");
        cancel.cancel();
    }
}

/// Single-line progress indicator on stderr
async fn render_progress(state: Arc<CatalogState>, expected_total: usize) {
    let mut rx = state.subscribe();
    while rx.changed().await.is_ok() {
        let progress = rx.borrow_and_update().ingest;
        eprint!(
            "\rLoading parcels... {:>3}% ({} of ~{})",
            progress.percent, progress.record_count, expected_total
        );
        if !progress.state.is_loading() {
            break;
        }
    }
}

fn print_table(parcels: &[Parcel], limit: usize) {
    if limit == 0 {
        return;
    }

    println!(
        "{:<14} {:<28} {:>9} {:<6} {:>6} {:>6} {:>5} {:>4} {:>8}",
        "Parcel", "Owner", "Acres", "Zone", "Fit", "Invest", "Years", "OOS", "Hwy mi"
    );
    for parcel in parcels.iter().take(limit) {
        println!(
            "{:<14} {:<28} {:>9} {:<6} {:>6} {:>6} {:>5} {:>4} {:>8}",
            truncate(&parcel.parcel_id, 14),
            truncate(&format_text(parcel.owner.as_deref()), 28),
            format_number(parcel.acreage),
            truncate(&format_text(parcel.zoning.as_deref()), 6),
            format_number(parcel.zoning_fit_score),
            format_number(parcel.investment_score),
            format_count(parcel.years_owned),
            format_flag(parcel.out_of_state),
            format_enriched(parcel.distance_miles()),
        );
    }
    if parcels.len() > limit {
        println!("... {} more", parcels.len() - limit);
    }
}
