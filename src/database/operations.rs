/// Database operations for storing diagnostic verdicts
use crate::database::connection::execute_with_retry;
use crate::models::Verdict;

/// Store one diagnostic verdict row in the results table
///
/// This function inserts a verdict into the economizer_rcx_results table.
/// It uses the retry mechanism to handle transient database connection issues.
///
/// # Arguments
/// * `device` - Name of the diagnosed air handler
/// * `verdict` - Verdict produced by the diagnostics
/// * `database_url` - PostgreSQL connection string
///
/// # Returns
/// Result indicating success or failure
pub async fn store_verdict(
    device: &str,
    verdict: &Verdict,
    database_url: &str,
) -> Result<(), String> {
    // Clone data for move into async closure
    let device = device.to_string();
    let verdict = verdict.clone();

    execute_with_retry(database_url, move |client| {
        let device = device.clone();
        let verdict = verdict.clone();
        async move {
            client.execute(
                "INSERT INTO economizer_rcx_results(device, time, diagnostic_name, diagnostic_code, message, color, energy_impact)
                 VALUES ($1, $2, $3, $4, $5, $6, $7)",
                &[
                    &device,
                    &verdict.timestamp,
                    &verdict.diagnostic.as_str(),
                    &verdict.code.value(),
                    &verdict.message,
                    &verdict.color.as_str(),
                    &verdict.energy_impact,
                ],
            ).await
        }
    }).await
}
