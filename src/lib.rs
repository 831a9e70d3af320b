pub mod alert;
pub mod analysis;
pub mod chart;
pub mod config;
pub mod dashboard;
pub mod ingest;
pub mod logging;
pub mod metrics;
pub mod model;
pub mod store;
pub mod verify;
pub mod window;
