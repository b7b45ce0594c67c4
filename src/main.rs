use anyhow::Context;
use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use authproxy::auth_proxy::{self, AuthProxy};
use authproxy::cli;
use authproxy::config::{self, Config};
use authproxy::middleware::key_inject::AccessToken;
use authproxy::models::route::Route;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cfg = config::load()?;
    init_tracing(cfg.log_json);

    let args = cli::Cli::parse();

    let result = match args.command {
        Some(cli::Commands::Serve { port }) => run_server(cfg, port).await,
        Some(cli::Commands::Properties { port, json }) => print_properties(&cfg, port, json),
        None => run_server(cfg, None).await,
    };

    if let Err(ref e) = result {
        eprintln!("Error: {:?}", e);
    }
    result
}

fn init_tracing(json: bool) {
    let filter = tracing_subscriber::EnvFilter::new(
        std::env::var("RUST_LOG").unwrap_or_else(|_| "authproxy=info,tower_http=info".into()),
    );
    let registry = tracing_subscriber::registry().with(filter);

    if json {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}

fn routes(cfg: &Config) -> anyhow::Result<Vec<Route>> {
    Ok(vec![
        Route::session(cfg.session_host.as_str())?,
        Route::services(cfg.services_host.as_str())?,
    ])
}

async fn run_server(cfg: Config, port: Option<u16>) -> anyhow::Result<()> {
    let real_token = cfg
        .real_token
        .as_deref()
        .context("AUTHPROXY_REAL_TOKEN must be set to serve")?;
    let access_token = AccessToken::new(real_token, cfg.sandbox_token.as_str())?;

    let settings = cfg.settings(port.unwrap_or(cfg.port));
    let proxy = AuthProxy::start_with_routes(settings, access_token, routes(&cfg)?)?;

    for route in proxy.routes() {
        tracing::info!("Forwarding {} -> {}", route.prefix, route.upstream_host);
    }
    // The launcher reads these from stdout.
    for argument in proxy.arguments() {
        println!("{}", argument);
    }

    tokio::signal::ctrl_c()
        .await
        .context("failed to listen for shutdown signal")?;

    tracing::info!("Shutting down");
    proxy.close().await;
    Ok(())
}

fn print_properties(cfg: &Config, port: Option<u16>, json: bool) -> anyhow::Result<()> {
    let routes = routes(cfg)?;
    let surface = auth_proxy::redirect_surface(port.unwrap_or(cfg.port), &routes);

    if json {
        println!("{}", serde_json::to_string_pretty(&surface)?);
    } else {
        for argument in auth_proxy::arguments(&surface.properties) {
            println!("{}", argument);
        }
    }
    Ok(())
}
