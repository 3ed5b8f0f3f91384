use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use tradehub::api;

fn init_tracing() {
    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env())
        .with(fmt::layer().json().flatten_event(true))
        .init();
}

#[tokio::main]
async fn main() {
    init_tracing();
    dotenv::dotenv().ok();

    if let Err(e) = api::start_http_server().await {
        tracing::error!(action = "server_failed", error = %e);
        std::process::exit(1);
    }
}
