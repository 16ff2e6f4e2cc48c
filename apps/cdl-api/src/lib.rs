pub mod routes;
pub mod state;

use std::{net::SocketAddr, path::PathBuf};

use axum::http::{HeaderValue, Method, header};
use clap::Parser;
use color_eyre::eyre;
use tokio::net::TcpListener;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tracing_subscriber::EnvFilter;

use crate::state::AppState;

#[derive(Debug, Parser)]
#[command(
	version = cdl_cli::VERSION,
	rename_all = "kebab",
	styles = cdl_cli::styles(),
)]
pub struct Args {
	#[arg(long, short = 'c', value_name = "FILE")]
	pub config: PathBuf,
}

pub async fn run(args: Args) -> color_eyre::Result<()> {
	let config = cdl_config::load(&args.config)?;

	init_tracing(&config)?;

	let http_addr: SocketAddr = config.service.http_bind.parse()?;
	let admin_addr: SocketAddr = config.service.admin_bind.parse()?;

	if !admin_addr.ip().is_loopback() {
		return Err(eyre::eyre!("admin_bind must be a loopback address."));
	}

	let cors = cors_layer(&config.service.cors_allowed_origins)?;
	let state = AppState::new(config).await?;
	let mut app = routes::router(state.clone());

	if let Some(cors) = cors {
		app = app.layer(cors);
	}

	let admin_app = routes::admin_router(state.clone());
	let http_listener = TcpListener::bind(http_addr).await?;

	tracing::info!(%http_addr, "HTTP server listening.");

	let http_server = axum::serve(http_listener, app);
	let admin_listener = TcpListener::bind(admin_addr).await?;

	tracing::info!(%admin_addr, "Admin server listening.");

	let admin_server = axum::serve(admin_listener, admin_app);

	tokio::try_join!(http_server, admin_server)?;

	state.service.embedder.shutdown();

	Ok(())
}

/// Builds the CORS layer for the configured browser origins. `None` when no origin is allowed.
pub fn cors_layer(origins: &[String]) -> color_eyre::Result<Option<CorsLayer>> {
	if origins.is_empty() {
		return Ok(None);
	}

	let origins = origins
		.iter()
		.map(|origin| HeaderValue::from_str(origin))
		.collect::<Result<Vec<_>, _>>()?;
	let layer = CorsLayer::new()
		.allow_origin(AllowOrigin::list(origins))
		.allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
		.allow_headers([header::CONTENT_TYPE])
		.allow_credentials(true);

	Ok(Some(layer))
}

fn init_tracing(config: &cdl_config::Config) -> color_eyre::Result<()> {
	let filter =
		EnvFilter::try_new(&config.service.log_level).unwrap_or_else(|_| EnvFilter::new("info"));

	tracing_subscriber::fmt().with_env_filter(filter).init();

	Ok(())
}
