//! Daemon side of the sphere device agent: command line configuration,
//! binding of the board's GPIO LEDs and button, and log setup. The agent
//! itself lives in `sphere-link`.

pub mod config;
pub mod gpio;
pub mod logging;

use thiserror::Error;

pub use config::{Cli, Config, ConfigError};

#[derive(Error, Debug)]
pub enum SphereError {
    #[error("I/O Error")]
    Io(#[from] std::io::Error),
    #[error("Configuration Error")]
    Config(#[from] ConfigError),
    #[error("GPIO {0} setup failed: {1}")]
    Gpio(u64, String),
    #[error("Logging setup failed: {0}")]
    Logging(String),
}

pub type SphereResult<T> = Result<T, SphereError>;
