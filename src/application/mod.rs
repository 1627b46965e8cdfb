pub mod aggregator;
pub mod analytics;
pub mod app;
pub mod submitter;
pub mod transfer;
