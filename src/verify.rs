//! Query Service Verification Module
//!
//! Runs every query service route once against a live deployment and
//! records which ones respond and decode into the data model. Use it after
//! pointing the service at a new backend, or when a dashboard panel is
//! stuck on an "unavailable" label.

use chrono::Utc;
use serde::Serialize;

use crate::ingest::PlotSource;
use crate::ingest::query_service::{Endpoint, QueryServiceClient};
use crate::model::PlotError;

// ============================================================================
// Verification Results
// ============================================================================

#[derive(Debug, Clone, Serialize)]
pub struct VerificationReport {
    pub timestamp: String,
    pub base_url: String,
    pub plot_id: String,
    pub user_id: Option<String>,
    pub results: Vec<EndpointVerification>,
    pub summary: VerificationSummary,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct VerificationSummary {
    pub total: usize,
    pub working: usize,
    pub failed: usize,
    pub skipped: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EndpointVerification {
    pub endpoint: String,
    pub status: VerificationStatus,
    /// Rows, entries or fields decoded from the response.
    pub item_count: usize,
    pub error_message: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub enum VerificationStatus {
    /// Responded and decoded with data.
    Success,
    /// Responded and decoded, but empty.
    PartialSuccess,
    Failed,
    /// User-scoped route with no user configured.
    Skipped,
}

impl EndpointVerification {
    fn from_count(endpoint: Endpoint, count: Result<usize, PlotError>) -> Self {
        let (status, item_count, error_message) = match count {
            Ok(0) => (VerificationStatus::PartialSuccess, 0, None),
            Ok(n) => (VerificationStatus::Success, n, None),
            Err(e) => (VerificationStatus::Failed, 0, Some(e.to_string())),
        };
        EndpointVerification {
            endpoint: endpoint.path().to_string(),
            status,
            item_count,
            error_message,
        }
    }

    fn skipped(endpoint: Endpoint) -> Self {
        EndpointVerification {
            endpoint: endpoint.path().to_string(),
            status: VerificationStatus::Skipped,
            item_count: 0,
            error_message: Some("no user id configured".to_string()),
        }
    }
}

impl VerificationSummary {
    fn tally(results: &[EndpointVerification]) -> Self {
        let mut summary = VerificationSummary {
            total: results.len(),
            ..VerificationSummary::default()
        };
        for result in results {
            match result.status {
                VerificationStatus::Success | VerificationStatus::PartialSuccess => summary.working += 1,
                VerificationStatus::Failed => summary.failed += 1,
                VerificationStatus::Skipped => summary.skipped += 1,
            }
        }
        summary
    }
}

// ============================================================================
// Endpoint Checks
// ============================================================================

fn check_endpoint(
    client: &QueryServiceClient,
    endpoint: Endpoint,
    plot_id: &str,
    user_id: Option<&str>,
) -> EndpointVerification {
    let user_id = match (endpoint.is_user_scoped(), user_id) {
        (true, None) => return EndpointVerification::skipped(endpoint),
        (_, user_id) => user_id.unwrap_or_default(),
    };

    let count = match endpoint {
        Endpoint::Plots => client.fetch_plots(user_id).map(|plots| plots.len()),
        Endpoint::Plot => client.fetch_plot(plot_id).map(|_| 1),
        Endpoint::Analytics => client.fetch_analytics(plot_id).map(|a| {
            a.moisture_readings.len() + a.nutrient_readings.len() + a.irrigation_logs.len()
        }),
        Endpoint::AiSummary => client
            .fetch_ai_summary(plot_id)
            .map(|s| usize::from(s.headline.is_some()) + usize::from(s.short_summary.is_some())),
        Endpoint::AiHistory => client.fetch_ai_history(plot_id).map(|entries| entries.len()),
        Endpoint::UserSensors => client.fetch_user_sensors(user_id).map(|sensors| sensors.len()),
        Endpoint::SensorCount => client
            .fetch_sensor_counts(plot_id)
            .map(|counts| counts.values().sum()),
        Endpoint::UserDevice => client
            .fetch_user_device(user_id)
            .map(|device| usize::from(device.is_some())),
        Endpoint::IrrigationHistory => client
            .fetch_irrigation_history(user_id)
            .map(|logs| logs.len()),
    };
    EndpointVerification::from_count(endpoint, count)
}

// ============================================================================
// Full Verification Runner
// ============================================================================

pub fn verify_endpoints(
    client: &QueryServiceClient,
    plot_id: &str,
    user_id: Option<&str>,
) -> VerificationReport {
    println!("🔍 Verifying query service at {} ...", client.base_url());

    let mut results = Vec::new();
    for endpoint in Endpoint::ALL {
        print!("  {} ... ", endpoint.path());
        let result = check_endpoint(client, endpoint, plot_id, user_id);
        match result.status {
            VerificationStatus::Success => println!("✓ OK ({} items)", result.item_count),
            VerificationStatus::PartialSuccess => println!("⚠ Responsive but empty"),
            VerificationStatus::Failed => println!(
                "✗ FAILED: {}",
                result.error_message.as_deref().unwrap_or("Unknown")
            ),
            VerificationStatus::Skipped => println!("- skipped (no user id)"),
        }
        results.push(result);
    }

    VerificationReport {
        timestamp: Utc::now().to_rfc3339(),
        base_url: client.base_url().to_string(),
        plot_id: plot_id.to_string(),
        user_id: user_id.map(String::from),
        summary: VerificationSummary::tally(&results),
        results,
    }
}

pub fn print_summary(report: &VerificationReport) {
    let s = &report.summary;
    println!("\n═══════════════════════════════════════════════════════════");
    println!("📊 VERIFICATION SUMMARY");
    println!("═══════════════════════════════════════════════════════════");
    println!();
    println!("Endpoints:   {}/{} working  ({} failed, {} skipped)", s.working, s.total, s.failed, s.skipped);

    let checked = s.total - s.skipped;
    let success_rate = if checked > 0 {
        (s.working as f64 / checked as f64) * 100.0
    } else {
        0.0
    };
    println!("Overall Success Rate: {:.1}% ({}/{})", success_rate, s.working, checked);
    println!("═══════════════════════════════════════════════════════════");
}
