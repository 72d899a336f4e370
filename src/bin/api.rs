use realty_advisor_suite::{
    api::{start_server, ApiState},
    cloud::CloudConfig,
    content::ContentStudio,
    gateway::GeminiClient,
    leads::LeadStore,
    settings::SettingsStore,
    storage::JsonFileStorage,
};
use std::sync::Arc;
use tracing::info;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .init();

    // Load environment variables
    dotenv::dotenv().ok();

    let gemini_api_key = std::env::var("GEMINI_API_KEY").unwrap_or_else(|_| {
        eprintln!("⚠️  GEMINI_API_KEY not set in .env");
        eprintln!("📌 Content endpoints will report gateway errors until it is configured");
        String::new()
    });

    let api_port: u16 = std::env::var("PORT")
        .or_else(|_| std::env::var("API_PORT"))
        .unwrap_or_else(|_| "8080".to_string())
        .parse()?;

    let data_dir = std::env::var("SUITE_DATA_DIR").unwrap_or_else(|_| "./data".to_string());

    info!("🚀 Realty Advisor Suite - API Server");
    info!("📍 Port: {}", api_port);
    info!("🗂  Data dir: {}", data_dir);

    // Create components
    let storage = Arc::new(JsonFileStorage::new(&data_dir)?);
    let cloud = Arc::new(CloudConfig::from_env());
    let settings = Arc::new(SettingsStore::new(storage.clone()));
    let leads = Arc::new(LeadStore::from_cloud(&cloud, storage));
    let gateway = Arc::new(GeminiClient::new(gemini_api_key));
    let studio = Arc::new(ContentStudio::new(gateway, settings.clone()));

    if cloud.is_connected() {
        info!("☁️  Cloud sync configured");
    } else {
        info!("💾 Running on local persistence");
    }

    info!("✅ Stores initialized");
    info!("📡 Starting API server...");

    let state = ApiState {
        settings,
        leads,
        studio,
        cloud,
    };

    // Start API server
    start_server(state, api_port).await?;

    Ok(())
}
