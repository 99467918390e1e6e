use chrono::NaiveDate;
use clap::Parser;
use daily_stock_report::{config::AppConfig, pipeline::today_kst, DailyReportPipeline};
use tracing::info;

#[derive(Parser, Debug)]
#[command(name = "daily-report")]
#[command(version, about = "Daily Korean stock market report")]
struct Cli {
    #[arg(long, help = "Report date as YYYY-MM-DD (default: today in KST)")]
    date: Option<NaiveDate>,

    #[arg(long, help = "Fetch index, disclosure and news data from live providers")]
    live: bool,

    #[arg(long, help = "Print the summarization prompt payload instead of the report")]
    prompt: bool,

    /// Market cues that drive plan enrichment
    cues: Vec<String>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    dotenv::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "daily_stock_report=info".into()),
        )
        .init();

    let mut config = AppConfig::from_env()?;
    if cli.live {
        config.live_tools = true;
    }

    let target_date = cli.date.unwrap_or_else(today_kst);

    info!(
        date = %target_date,
        cues = ?cli.cues,
        live_tools = config.live_tools,
        "Daily report starting"
    );

    let pipeline = DailyReportPipeline::from_config(&config)?;

    if cli.prompt {
        let plan = pipeline.build_plan(target_date, &cli.cues, None).await?;
        let data = pipeline.collect(&plan).await?;
        let prompt = pipeline.build_llm_prompt(&data);
        println!("{}", serde_json::to_string_pretty(&prompt)?);
        return Ok(());
    }

    match pipeline.run(target_date, &cli.cues, None).await {
        Ok(output) => {
            println!("{}", output.to_text());
            Ok(())
        }
        Err(e) => {
            eprintln!("Report generation failed: {}", e);
            Err(Box::new(e) as Box<dyn std::error::Error>)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flags_and_cues() {
        let cli = Cli::try_parse_from([
            "daily-report",
            "--date",
            "2025-12-04",
            "--prompt",
            "밸류업",
            "코스닥",
        ])
        .unwrap();

        assert_eq!(cli.date, NaiveDate::from_ymd_opt(2025, 12, 4));
        assert!(cli.prompt);
        assert!(!cli.live);
        assert_eq!(cli.cues, vec!["밸류업", "코스닥"]);
    }

    #[test]
    fn test_no_args_means_today_without_cues() {
        let cli = Cli::try_parse_from(["daily-report"]).unwrap();
        assert!(cli.date.is_none());
        assert!(cli.cues.is_empty());
    }

    #[test]
    fn test_mistyped_flag_is_rejected() {
        // must not become a cue
        assert!(Cli::try_parse_from(["daily-report", "--dat", "2025-12-04"]).is_err());
        assert!(Cli::try_parse_from(["daily-report", "--lvie"]).is_err());
    }

    #[test]
    fn test_bad_date_is_rejected() {
        assert!(Cli::try_parse_from(["daily-report", "--date", "12/04/2025"]).is_err());
        assert!(Cli::try_parse_from(["daily-report", "--date"]).is_err());
    }
}
