use log::{error, info, warn};
use std::collections::HashMap;
use tokio::fs::File;
use tokio::io::{AsyncBufReadExt, BufReader};

use economizer_rcx::config::AgentConfig;
use economizer_rcx::database::store_verdict;
use economizer_rcx::models::{Color, Verdict};
use economizer_rcx::trend::parse_line;
use economizer_rcx::utils::format_datetime;
use economizer_rcx::Application;

/// Running verdict counts for one device
#[derive(Debug, Default)]
struct VerdictSummary {
    red: usize,
    green: usize,
    grey: usize,
}

impl VerdictSummary {
    fn count(&mut self, verdict: &Verdict) {
        match verdict.color {
            Color::Red => self.red += 1,
            Color::Green => self.green += 1,
            Color::Grey => self.grey += 1,
        }
    }
}

async fn publish(device: &str, verdict: &Verdict, config: &AgentConfig) {
    info!(
        "[{}] {} {} | {} | code {} | energy impact {} kWh/h | {}",
        device,
        format_datetime(&verdict.timestamp),
        verdict.diagnostic,
        verdict.color,
        verdict.code.value(),
        verdict.energy_impact,
        verdict.message
    );

    if let Some(database_url) = &config.database_url {
        if let Err(e) = store_verdict(device, verdict, database_url).await {
            error!("Failed to store verdict for device {}: {}", device, e);
        }
    }
}

async fn main_loop(config: AgentConfig) -> Result<(), Box<dyn std::error::Error>> {
    info!("Starting economizer RCx diagnostics on {}", config.trend_file);

    let file = File::open(&config.trend_file).await?;
    let mut lines = BufReader::new(file).lines();

    // One independent set of diagnostics per device
    let mut applications: HashMap<String, Application> = HashMap::new();
    let mut summaries: HashMap<String, VerdictSummary> = HashMap::new();
    let mut line_number = 0;

    while let Some(line) = lines.next_line().await? {
        line_number += 1;
        let record = match parse_line(&line, line_number) {
            Ok(Some(record)) => record,
            Ok(None) => continue,
            Err(e) => {
                warn!("{}", e);
                continue;
            }
        };

        let application = applications
            .entry(record.device.clone())
            .or_insert_with(|| Application::new(config.rcx.clone(), config.points.clone()));
        let result = application.run(record.timestamp, &record.points);

        let summary = summaries.entry(record.device.clone()).or_default();
        for verdict in &result.verdicts {
            summary.count(verdict);
            publish(&record.device, verdict, &config).await;
        }
    }

    // Print summary
    for (device, summary) in summaries.iter() {
        info!("Summary for {}:", device);
        info!("  RED verdicts: {}", summary.red);
        info!("  GREEN verdicts: {}", summary.green);
        info!("  GREY verdicts: {}", summary.grey);
    }

    // Warning if nothing was concluded
    if summaries.values().all(|s| s.red + s.green + s.grey == 0) {
        warn!("No diagnostic verdicts were produced from {} lines!", line_number);
    }

    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Info)
        .parse_default_env()
        .format_timestamp_secs()
        .init();

    // Load configuration
    let config = match AgentConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            error!("Failed to load configuration: {}", e);
            return Err(e.into());
        }
    };

    // Handle Ctrl+C gracefully
    let (tx, mut rx) = tokio::sync::oneshot::channel();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            let _ = tx.send(());
        }
    });

    tokio::select! {
        result = main_loop(config) => {
            match result {
                Ok(_) => info!("Program completed successfully"),
                Err(e) => error!("Fatal error: {}", e),
            }
        }
        _ = &mut rx => {
            info!("Program terminated by user. Exiting gracefully.");
        }
    }

    Ok(())
}
