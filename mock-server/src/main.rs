use mock_server::{Account, Lead};
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), std::io::Error> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let port = std::env::var("PORT").unwrap_or_else(|_| "3000".to_string());
    let addr = format!("127.0.0.1:{port}");
    let listener = TcpListener::bind(&addr).await?;

    let leads = vec![
        Lead {
            id: 1,
            name: "Поставка оборудования".to_string(),
        },
        Lead {
            id: 2,
            name: "Годовой контракт".to_string(),
        },
    ];
    tracing::info!(%addr, "mock amoCRM listening");
    mock_server::run(listener, Account::default(), leads).await
}
