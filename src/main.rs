use std::process::ExitCode;

use anyhow::Context;
use celcat_scraper::{
    Metrics, NoopMetrics, ScraperConfig, StatsdMetrics, WebDriverForm,
    config::{LoadFromEnv, MetricsEnv},
    run,
};
use chrono::Local;
use dotenv::dotenv;
use log::{LevelFilter, error, info, warn};

fn metrics_sink() -> Box<dyn Metrics> {
    let statsd_server = MetricsEnv::load_from_env()
        .map(|env| env.statsd_server)
        .unwrap_or_else(|_| "localhost".to_string());
    match StatsdMetrics::new(&statsd_server) {
        Ok(metrics) => Box::new(metrics),
        Err(e) => {
            warn!("Metrics disabled, could not reach statsd at {statsd_server}: {e}");
            Box::new(NoopMetrics)
        }
    }
}

async fn run_once(metrics: &dyn Metrics) -> anyhow::Result<()> {
    let config = ScraperConfig::new()?;
    let form = WebDriverForm::connect(&config.webdriver_url)
        .await
        .context("failed to start headless browser")?;
    let today = Local::now().date_naive();
    let summary = run(&config, form, today, metrics).await?;
    info!(
        "Done: {} people, {} notifications sent, {} failed, {} fetch failures, {} invalid responses",
        summary.people_processed,
        summary.notifications_sent,
        summary.notification_failures,
        summary.fetch_failures,
        summary.invalid_responses,
    );
    Ok(())
}

#[tokio::main]
async fn main() -> ExitCode {
    dotenv().ok();
    env_logger::Builder::new()
        .filter_level(LevelFilter::Info)
        .parse_default_env()
        .init();

    let metrics = metrics_sink();
    match run_once(metrics.as_ref()).await {
        Ok(()) => {
            metrics.incr("success");
            ExitCode::SUCCESS
        }
        Err(e) => {
            metrics.incr("failure");
            error!("Run failed: {e:#}");
            ExitCode::FAILURE
        }
    }
}
