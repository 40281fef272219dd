//! autoroute demo server
//!
//! # Start-up
//!
//! ```text
//!   --config ──▶ AppConfig ──▶ logging
//!                    │
//!                    ▼
//!   route manifest | source scan | defaults ──▶ Registrar ◀── demo controllers
//!                                                  │
//!                     --gen-docs ──▶ markdown/ + swagger/ + manifest
//!                                                  │
//!                                                  ▼
//!                                  HttpServer (trace, timeout, body limit)
//! ```

use std::path::PathBuf;

use clap::Parser;
use tokio::net::TcpListener;

use autoroute::config::{load_config, AppConfig};
use autoroute::demo::{self, Hello, Users};
use autoroute::docs::ApiDoc;
use autoroute::observability::logging;
use autoroute::routing::{Registrar, RegistrarOptions, Registry};
use autoroute::scrape::{RouteTable, SourceScraper};
use autoroute::HttpServer;

#[derive(Debug, Parser)]
#[command(name = "autoroute", version, about = "Serve the demo controllers")]
struct Cli {
    /// TOML configuration file; defaults apply when omitted.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Generate API docs and the route manifest before serving.
    #[arg(long)]
    gen_docs: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => load_config(path)?,
        None => AppConfig::default(),
    };
    logging::init(&config.logging)?;

    tracing::info!(
        bind_address = %config.server.bind_address,
        group = %config.routing.group,
        naming = ?config.routing.naming,
        duplicate_policy = ?config.routing.duplicate_policy,
        "Configuration loaded"
    );

    let mut registrar = demo::with_app_context(route_source(&config));
    let mounted = demo::register(&mut registrar)?;
    tracing::info!(routes = mounted, "Controllers registered");

    if cli.gen_docs || config.docs.enabled {
        generate_docs(&registrar, &config);
    }

    let listener = TcpListener::bind(&config.server.bind_address).await?;
    let (router, _registry) = registrar.finish();
    HttpServer::new(router, config.server).run(listener).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}

/// Registrar reading routes from the manifest, else from a live source scan.
fn route_source(config: &AppConfig) -> Registrar {
    let registrar = Registrar::new(RegistrarOptions::from(config), Registry::new());

    if let Some(path) = config.routing.route_table.as_ref().filter(|p| p.exists()) {
        match RouteTable::load(path) {
            Ok(table) => {
                tracing::info!(path = %path.display(), routes = table.len(), "Using route manifest");
                return registrar.with_route_source(table);
            }
            Err(err) => tracing::warn!(error = %err, "Ignoring unreadable route manifest"),
        }
    }

    if config.docs.source_root.is_dir() {
        match SourceScraper::open(&config.docs.source_root) {
            Ok(scraper) => {
                tracing::info!(
                    root = %config.docs.source_root.display(),
                    files = scraper.files(),
                    "Reading route annotations from source"
                );
                return registrar.with_route_source(scraper);
            }
            Err(err) => tracing::warn!(error = %err, "Source scan failed, using default routes"),
        }
    }

    registrar
}

fn generate_docs(registrar: &Registrar, config: &AppConfig) {
    let scraper = match SourceScraper::open(&config.docs.source_root) {
        Ok(scraper) => scraper,
        Err(err) => {
            tracing::warn!(error = %err, "Source scan failed, skipping documentation");
            return;
        }
    };

    let mut doc = ApiDoc::new(config.docs.title.clone(), config.routing.group.clone());
    let mut table = RouteTable::new();
    let documented = registrar.document::<Hello>(&scraper, &mut doc, &mut table)
        + registrar.document::<Users>(&scraper, &mut doc, &mut table);

    match doc.write_to(&config.docs.out_dir) {
        Ok(paths) => tracing::info!(methods = documented, files = ?paths, "Documentation written"),
        Err(err) => tracing::warn!(error = %err, "Failed to write documentation"),
    }

    if let Some(path) = &config.routing.route_table {
        match table.save(path) {
            Ok(()) => tracing::info!(path = %path.display(), routes = table.len(), "Route manifest written"),
            Err(err) => tracing::warn!(error = %err, "Failed to write route manifest"),
        }
    }
}
