use daily_stock_report::{api::start_server, config::AppConfig, DailyReportPipeline};
use std::sync::Arc;
use tracing::{info, warn};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load environment variables
    dotenv::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "daily_stock_report=info,tower_http=info".into()),
        )
        .init();

    let config = AppConfig::from_env()?;

    if config.gemini_api_key.is_none() {
        warn!("GEMINI_API_KEY not set, plans are built from cues only");
    }
    if config.live_tools && config.dart_api_key.is_none() {
        warn!("REPORT_LIVE_TOOLS is on but DART_API_KEY is missing, report requests will fail");
    }

    let api_port = config.api_port;

    info!("Daily Stock Report - API Server");
    info!("Port: {}", api_port);
    info!(
        live_tools = config.live_tools,
        minimum_quality = config.execution.minimum_quality,
        main_threshold = config.execution.main_threshold,
        "Configuration loaded"
    );

    // built once: the Gemini and provider clients are pooled across requests
    let pipeline = DailyReportPipeline::from_config(&config)?;

    start_server(Arc::new(pipeline), api_port).await?;

    Ok(())
}
