use mock_server::{MockConfig, MockState};
use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() -> Result<(), std::io::Error> {
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let port = std::env::var("PORT").unwrap_or_else(|_| "3000".to_string());
    let mut config = MockConfig::default();
    if let Ok(page_size) = std::env::var("PAGE_SIZE") {
        config.page_size = page_size.parse().unwrap_or(config.page_size);
    }
    if let (Ok(name), Ok(value)) = (std::env::var("PARAMETER_NAME"), std::env::var("PARAMETER_VALUE")) {
        config.parameters.insert(name, value);
    }

    let addr = format!("127.0.0.1:{port}");
    let listener = TcpListener::bind(&addr).await?;
    info!(%addr, base = %config.base_id, table = %config.table_name, "mock services listening");
    mock_server::run(listener, MockState::new(config)).await
}
