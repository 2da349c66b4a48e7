//! Configuration and CLI argument handling

use std::time::Duration;

use clap::Parser;

/// CLI argument parsing structure
#[derive(Parser)]
#[command(name = "rotation-timer")]
#[command(about = "A shared rotation timer service for chapter meetings")]
#[command(version)]
pub struct Config {
    /// Port to bind the server to
    #[arg(short, long, default_value = "20554")]
    pub port: u16,

    /// Host address to bind to
    #[arg(long, default_value = "0.0.0.0")]
    pub host: String,

    /// Ticker period in milliseconds
    #[arg(short, long, default_value = "250")]
    pub tick_ms: u64,

    /// Disable the server-side phase auto-switch ticker
    #[arg(long)]
    pub no_auto_switch: bool,

    /// Uid stamped on auto-switch writes made by the service ticker
    #[arg(long, default_value = "service-ticker")]
    pub service_uid: String,

    /// Email stamped on auto-switch writes made by the service ticker
    #[arg(long, default_value = "timer@chapter.local")]
    pub service_email: String,

    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,
}

impl Config {
    /// Parse configuration from command line arguments
    pub fn parse() -> Self {
        Parser::parse()
    }

    /// Get the server address as a formatted string
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Get the ticker period as a Duration
    pub fn tick_period(&self) -> Duration {
        Duration::from_millis(self.tick_ms.max(1))
    }

    /// Get the appropriate log level based on verbose flag
    pub fn log_level(&self) -> &'static str {
        if self.verbose {
            "debug"
        } else {
            "info"
        }
    }
}
