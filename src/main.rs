mod config;
mod logging;
mod media;
mod models;
mod provider;
mod request_id;
mod routes;
mod upload;

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};
use clap::Parser;
use config::ProviderConfig;
use provider::ProviderClient;
use routes::{convert_image, generate_image, transform_image, AppState};
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use tower_http::cors::CorsLayer;
use tracing::{info, Level};

#[derive(Parser, Debug)]
#[command(name = "image-proxy")]
#[command(about = "A proxy that forwards image uploads and prompts to an image-generation API")]
struct Args {
    #[arg(short, long, default_value = "0.0.0.0")]
    ip: String,

    #[arg(short, long, default_value = "8000")]
    port: u16,

    /// Base URL of the image-generation provider
    #[arg(long, default_value = "https://api.openai.com/v1")]
    api_base: String,

    /// Bearer credential for the provider
    #[arg(long, env = "OPENAI_API_KEY", hide_env_values = true)]
    api_key: String,

    /// Model for the text-to-image operation
    #[arg(long, default_value = "dall-e-3")]
    image_model: String,

    /// Model for the multimodal chat operation
    #[arg(long, default_value = "gpt-4o")]
    chat_model: String,

    /// Outbound request timeout in seconds
    #[arg(long, default_value = "60")]
    timeout: u64,

    /// trace, debug, info, warn, error
    #[arg(short, long, default_value = "info")]
    log_level: String,

    /// Append logs to this file in addition to stdout
    #[arg(long)]
    log_file: Option<String>,

    /// socks and http proxy, example: socks5://192.168.0.2:10080
    #[arg(long)]
    proxy: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let log_level = Level::from_str(&args.log_level).unwrap_or_else(|_| {
        eprintln!("Invalid log level: {}. Using INFO level.", args.log_level);
        Level::INFO
    });
    logging::init_logging(log_level, args.log_file.as_deref());

    let provider_config = Arc::new(ProviderConfig {
        api_base: args.api_base,
        api_key: args.api_key,
        image_model: args.image_model,
        chat_model: args.chat_model,
    });

    // One client for the whole process; the timeout bounds every outbound call
    let mut client_builder =
        reqwest::Client::builder().timeout(Duration::from_secs(args.timeout));
    if let Some(proxy) = &args.proxy {
        client_builder = client_builder.proxy(reqwest::Proxy::all(proxy)?);
    }
    let http_client = Arc::new(client_builder.build()?);

    let app_state = AppState {
        provider: Arc::new(ProviderClient::new(http_client, provider_config)),
    };

    let app = Router::new()
        .route("/api/generate-image", post(generate_image))
        .route("/api/convert-image", post(convert_image))
        .route("/api/transform-image", post(transform_image))
        .route("/health", get(|| async { "OK" }))
        // Leave headroom above the 5 MiB upload ceiling so our own size check
        // produces the descriptive error
        .layer(DefaultBodyLimit::max(8 * 1024 * 1024))
        .layer(axum::middleware::from_fn(request_id::inject_request_id))
        .layer(CorsLayer::permissive())
        .with_state(app_state);

    let bind_address = format!("{}:{}", args.ip, args.port);
    let listener = tokio::net::TcpListener::bind(&bind_address).await?;
    info!("Server started on http://{}", bind_address);

    axum::serve(listener, app).await?;
    Ok(())
}
