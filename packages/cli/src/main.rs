#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! CLI entry point for spotted searches.
//!
//! Uses `indicatif-log-bridge` (via [`spotted_cli_utils::init_logger`]) to
//! route `log` output through `indicatif::MultiProgress` so that log lines
//! and progress bars never fight for the terminal.

use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use spotted_cli_utils::IndicatifProgress;
use spotted_geometry::layer::layers_from_geojson;
use spotted_geometry_models::{DrawnLayer, Shape};
use spotted_query_models::Filter;
use spotted_search::config::SearchConfig;
use spotted_search::project::{parse_project, search_artifact};
use spotted_search::{
    CancelHandle, HttpBackend, RoundReport, RoundRequest, SearchSession, SpatialBackend,
};

#[derive(Parser)]
#[command(name = "spotted", about = "Search points of interest inside drawn areas")]
struct Cli {
    /// TOML configuration file (defaults to the built-in configuration)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Classify drawn layers without contacting the backend
    Classify {
        /// `GeoJSON` file with the drawn layers (Feature or `FeatureCollection`)
        layers: PathBuf,
    },
    /// Search the drawn layers for the given filters
    Search {
        /// `GeoJSON` file with the drawn layers (Feature or `FeatureCollection`)
        layers: PathBuf,
        /// Comma-separated filters (e.g. "benches,lighting")
        #[arg(long)]
        filters: String,
        /// City to search (overrides the configuration)
        #[arg(long)]
        city: Option<String>,
        /// Match points outside circles instead of inside
        #[arg(long)]
        external: bool,
        /// Write the result artifact to this file
        #[arg(long)]
        output: Option<PathBuf>,
    },
    /// List the filters available for a city
    Filters {
        /// City to list (overrides the configuration)
        #[arg(long)]
        city: Option<String>,
    },
    /// Reload a saved project
    Reload {
        /// Project document identifier
        id: String,
        /// Write the reloaded markers to this file
        #[arg(long)]
        output: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let multi = spotted_cli_utils::init_logger();
    let cli = Cli::parse();
    let config = SearchConfig::load(cli.config.as_deref())?;

    match cli.command {
        Commands::Classify { layers } => {
            let mut session = SearchSession::new();
            let stored = session.store_layers(read_layers(&layers)?);
            log::info!("Classifying {stored} distinct layers from {}", layers.display());
            for (index, layer) in session.layers().enumerate() {
                match spotted_geometry::classify_layer(layer) {
                    Ok(shape) => println!("{index:>4}  {}", describe(&shape)),
                    Err(e) => println!("{index:>4}  rejected: {e}"),
                }
            }
        }
        Commands::Search {
            layers,
            filters,
            city,
            external,
            output,
        } => {
            let backend = HttpBackend::new(&config.backend)?;
            let mut session = SearchSession::new();
            let stored = session.store_layers(read_layers(&layers)?);
            log::info!("Stored {stored} layers from {}", layers.display());

            let request = RoundRequest {
                city: city.unwrap_or_else(|| config.search.city.clone()),
                filters: parse_filters(&filters),
                external: external || config.search.external,
            };
            let filters = request.filters.clone();

            let cancel = CancelHandle::new();
            let ctrl_c = cancel.clone();
            tokio::spawn(async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    ctrl_c.cancel();
                }
            });

            let progress = IndicatifProgress::search_bar(&multi, &request.city);
            let report = session
                .search(&backend, request, progress, cancel.signal())
                .await?;
            print_report(&report);

            if let Some(round) = session.current_round() {
                println!("{} layers searched", round.layers().len());
                for (filter, markers) in round.markers() {
                    println!("{:<24} {}", filter.as_str(), markers.len());
                }
                if let Some(path) = output {
                    let artifact = search_artifact(round.markers(), &filters);
                    std::fs::write(&path, serde_json::to_string_pretty(&artifact)?)?;
                    log::info!("Wrote {}", path.display());
                }
            }
        }
        Commands::Filters { city } => {
            let city = city.unwrap_or(config.search.city);
            let backend = HttpBackend::new(&config.backend)?;
            let spinner = IndicatifProgress::spinner(&multi, &format!("Listing filters for {city}"));
            let filters = backend.filters(&city).await;
            spinner.finish_and_clear();
            for filter in filters? {
                println!("{filter}");
            }
        }
        Commands::Reload { id, output } => {
            let backend = HttpBackend::new(&config.backend)?;
            let spinner = IndicatifProgress::spinner(&multi, &format!("Reloading {id}"));
            let doc = backend.project(&id).await;
            spinner.finish_and_clear();
            let project = parse_project(&doc?)?;

            let mut session = SearchSession::new();
            let seeded = session.seed_from_project(&project);
            println!("{} ({}): {}", project.name, project.city, project.description);
            println!("{seeded} layers");
            for (filter, markers) in &project.markers {
                println!("{:<24} {}", filter.as_str(), markers.len());
            }

            if let Some(path) = output {
                let artifact = search_artifact(&project.markers, &project.filters);
                std::fs::write(&path, serde_json::to_string_pretty(&artifact)?)?;
                log::info!("Wrote {}", path.display());
            }
        }
    }

    Ok(())
}

fn read_layers(path: &Path) -> Result<Vec<DrawnLayer>, Box<dyn std::error::Error>> {
    let text = std::fs::read_to_string(path)?;
    Ok(layers_from_geojson(&text)?)
}

fn parse_filters(text: &str) -> Vec<Filter> {
    text.split(',')
        .map(str::trim)
        .filter(|f| !f.is_empty())
        .map(Filter::from)
        .collect()
}

fn describe(shape: &Shape) -> String {
    match shape {
        Shape::Circle { center, radius_m } => format!(
            "circle at ({:.6}, {:.6}) r={radius_m:.1}m",
            center.latitude, center.longitude
        ),
        Shape::Polygon { vertices } => match spotted_geometry::tessellate(vertices) {
            Ok(triangles) => format!(
                "polygon, {} vertices, {} triangles",
                vertices.len(),
                triangles.len()
            ),
            Err(e) => format!("polygon, {} vertices, not searchable: {e}", vertices.len()),
        },
    }
}

fn print_report(report: &RoundReport) {
    println!(
        "{} requests: {} succeeded, {} soft, {} failed{}",
        report.requests,
        report.succeeded,
        report.soft.len(),
        report.failures.len(),
        if report.cancelled { " (cancelled)" } else { "" },
    );
    for failure in &report.failures {
        let filters: Vec<&str> = failure.filters.iter().map(Filter::as_str).collect();
        match failure.layer_index {
            Some(index) => println!("  layer {index} [{}]: {}", filters.join(", "), failure.error),
            None => println!("  [{}]: {}", filters.join(", "), failure.error),
        }
    }
}
