pub mod align;
pub mod config;
pub mod motion;
pub mod pose;
pub mod report;
pub mod similarity;

/// Application name for XDG paths
pub const APP_NAME: &str = "stepsync";
