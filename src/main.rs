// src/main.rs

use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use clap::Parser;
use serde_json::json;
use std::collections::BTreeMap;
use std::error::Error;
use std::path::PathBuf;

use agrimon_service::analysis::groupings::Density;
use agrimon_service::config::{Config, DEFAULT_CONFIG_PATH};
use agrimon_service::dashboard::{DashboardRequest, build_dashboard, irrigation_history_panel};
use agrimon_service::ingest::query_service::QueryServiceClient;
use agrimon_service::logging::{self, Service};
use agrimon_service::model::{Cadence, PlotError};
use agrimon_service::store::PlotStore;
use agrimon_service::verify;
use agrimon_service::window::{RangeSelection, RangeToken};

/// Plot monitoring dashboard backed by the plot query service
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Cli {
    /// Configuration file
    #[arg(long, default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::Subcommand, Debug)]
enum Commands {
    /// Builds the dashboard for one plot and prints it as JSON.
    Dashboard {
        plot_id: String,
        /// 1D, 1W, 1M, 3M or custom
        #[arg(long, default_value = "1W")]
        range: String,
        /// Start date of a custom range (YYYY-MM-DD, viewer timezone)
        #[arg(long)]
        from: Option<NaiveDate>,
        /// Last day of a custom range; defaults to the start date
        #[arg(long)]
        to: Option<NaiveDate>,
        /// Daily or Weekly; defaults to viewer.cadence
        #[arg(long)]
        cadence: Option<String>,
        #[arg(long)]
        language: Option<String>,
        /// Page of the analysis history and irrigation lists
        #[arg(long, default_value_t = 1)]
        page: usize,
        /// Ten rows per page instead of five
        #[arg(long)]
        expanded: bool,
    },
    /// Lists the user's plots, sensors, controller and irrigation runs as JSON.
    Inventory {
        #[arg(long)]
        user: Option<String>,
        /// Page of the irrigation history
        #[arg(long, default_value_t = 1)]
        page: usize,
        /// Ten rows per page instead of five
        #[arg(long)]
        expanded: bool,
    },
    /// Checks every query service route against a live deployment.
    Verify {
        plot_id: String,
        #[arg(long)]
        user: Option<String>,
        /// Also write the report to this file
        #[arg(long)]
        json: Option<PathBuf>,
    },
}

fn local_time<Tz: TimeZone>(tz: &Tz, date: NaiveDate, h: u32, m: u32, s: u32, ms: u32) -> Result<DateTime<Tz>, PlotError> {
    date.and_hms_milli_opt(h, m, s, ms)
        .and_then(|naive| tz.from_local_datetime(&naive).earliest())
        .ok_or_else(|| PlotError::InvalidRange(format!("{} does not exist in the viewer timezone", date)))
}

fn range_selection<Tz: TimeZone>(
    tz: &Tz,
    range: &str,
    from: Option<NaiveDate>,
    to: Option<NaiveDate>,
) -> Result<RangeSelection<Tz>, PlotError> {
    let token: RangeToken = range.parse()?;
    match (token, from) {
        (_, Some(from)) => Ok(RangeSelection::Custom {
            start: local_time(tz, from, 0, 0, 0, 0)?,
            end: to.map(|to| local_time(tz, to, 23, 59, 59, 999)).transpose()?,
        }),
        (RangeToken::Custom, None) => Err(PlotError::InvalidRange("custom range needs --from".to_string())),
        (token, None) => Ok(RangeSelection::Last(token)),
    }
}

fn startup_message(config: &Config) -> String {
    format!(
        "query service {} (viewer timezone {}, language {}, user {})",
        config.service.base_url,
        config.viewer.timezone,
        config.viewer.language,
        config.service.user_id.as_deref().unwrap_or("none")
    )
}

fn main() -> Result<(), Box<dyn Error>> {
    let cli = Cli::parse();
    let config = Config::load(&cli.config)?;
    logging::init_logger(
        config.log_level()?,
        config.logging.file.as_deref(),
        config.logging.console_timestamps,
    );
    logging::info(Service::System, None, &startup_message(&config));
    let client = QueryServiceClient::from_config(&config)?;

    match cli.command {
        Commands::Dashboard {
            plot_id,
            range,
            from,
            to,
            cadence,
            language,
            page,
            expanded,
        } => {
            let tz = config.timezone()?;
            let cadence: Cadence = match cadence {
                Some(c) => c.parse()?,
                None => config.viewer.cadence,
            };

            let mut store = PlotStore::new();
            store.select_plot(&plot_id);
            store.refresh(&client)?;

            let request = DashboardRequest {
                range: range_selection(&tz, &range, from, to)?,
                language: language.unwrap_or_else(|| config.viewer.language.clone()),
                cadence,
                now: Utc::now().with_timezone(&tz),
                history_page: page,
                irrigation_page: page,
                density: if expanded { Density::Expanded } else { Density::Compact },
            };
            let dashboard = build_dashboard(&store, &request);
            println!("{}", serde_json::to_string_pretty(&dashboard)?);
        }
        Commands::Inventory { user, page, expanded } => {
            let user_id = user
                .or_else(|| config.service.user_id.clone())
                .ok_or("no user id: pass --user or set AGRIMON_USER_ID")?;

            let plots = client.fetch_plots(&user_id)?;
            let mut sensor_counts = BTreeMap::new();
            for plot in &plots {
                match client.fetch_sensor_counts(&plot.plot_id) {
                    Ok(counts) => {
                        sensor_counts.insert(plot.plot_id.clone(), counts);
                    }
                    Err(e) => logging::log_fetch_failure(
                        Service::Inventory,
                        Some(&plot.plot_id),
                        "fetch sensor counts",
                        &e,
                    ),
                }
            }
            // The device and sensor listings are optional extras.
            let sensors = client.fetch_user_sensors(&user_id).unwrap_or_else(|e| {
                logging::log_fetch_failure(Service::Inventory, None, "fetch user sensors", &e);
                Vec::new()
            });
            let device = client.fetch_user_device(&user_id).unwrap_or_else(|e| {
                logging::log_fetch_failure(Service::Inventory, None, "fetch user device", &e);
                None
            });

            let runs = client.fetch_irrigation_history(&user_id).unwrap_or_else(|e| {
                logging::log_fetch_failure(Service::Inventory, None, "fetch irrigation history", &e);
                Vec::new()
            });
            let density = if expanded { Density::Expanded } else { Density::Compact };
            let irrigation = irrigation_history_panel(&runs, &config.timezone()?, density, page);

            let inventory = json!({
                "user_id": user_id,
                "plots": plots,
                "sensor_counts": sensor_counts,
                "sensors": sensors,
                "device": device,
                "irrigation_history": irrigation,
            });
            println!("{}", serde_json::to_string_pretty(&inventory)?);
        }
        Commands::Verify { plot_id, user, json } => {
            let user_id = user.or_else(|| config.service.user_id.clone());
            let report = verify::verify_endpoints(&client, &plot_id, user_id.as_deref());
            verify::print_summary(&report);
            if let Some(path) = json {
                std::fs::write(&path, serde_json::to_string_pretty(&report)?)?;
                println!("Report written to {}", path.display());
            }
        }
    }

    Ok(())
}
