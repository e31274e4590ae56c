use std::{path::PathBuf, time::Duration};

use clap::{CommandFactory, Parser};
use sphere_link::{ExitCode, Provisioning, POLLS_PER_TELEMETRY};
use thiserror::Error;

#[derive(Error, Debug, PartialEq)]
pub enum ConfigError {
    #[error("Connection type must be one of DPS or Direct")]
    ConnectionType,
    #[error("Scope ID is required for DPS connections")]
    ScopeId,
    #[error("Hub hostname is required for Direct connections")]
    Hostname,
    #[error("Device ID is required for Direct connections and must be lowercase")]
    DeviceId,
}

impl ConfigError {
    pub fn exit_code(&self) -> ExitCode {
        match self {
            ConfigError::ConnectionType => ExitCode::ValidateConnectionType,
            ConfigError::ScopeId => ExitCode::ValidateScopeId,
            ConfigError::Hostname => ExitCode::ValidateIotHubHostname,
            ConfigError::DeviceId => ExitCode::ValidateDeviceId,
        }
    }
}

fn parse_millis(s: &str) -> Result<Duration, std::num::ParseIntError> {
    let millis: u64 = s.parse()?;
    Ok(Duration::from_millis(millis))
}

#[derive(Clone, Debug, Parser)]
#[command(version, about = "Sphere device agent", long_about = None)]
pub struct Cli {
    /// How to reach the hub: DPS or Direct
    #[arg(env = "SPHERE_CONNECTION_TYPE", long = "connection-type", value_name = "type")]
    pub connection_type: Option<String>,

    /// Device provisioning service scope, required for DPS
    #[arg(env = "SPHERE_SCOPE_ID", long = "scope-id", value_name = "id")]
    pub scope_id: Option<String>,

    /// Hub hostname, required for Direct
    #[arg(env = "SPHERE_HOSTNAME", long = "hostname", value_name = "host")]
    pub hostname: Option<String>,

    /// Lowercase device id, required for Direct
    #[arg(env = "SPHERE_DEVICE_ID", long = "device-id", value_name = "id")]
    pub device_id: Option<String>,

    /// Network interface whose state decides reachability
    #[arg(
        env = "SPHERE_INTERFACE",
        long = "interface",
        value_name = "iface",
        default_value = "wlan0"
    )]
    pub interface: String,

    /// Authenticated polls between climate telemetry samples
    #[arg(
        env = "SPHERE_TELEMETRY_POLLS",
        long = "telemetry-polls",
        value_name = "n",
        default_value_t = POLLS_PER_TELEMETRY
    )]
    pub telemetry_polls: u32,

    /// Sysfs GPIO of the status LED
    #[arg(env = "SPHERE_STATUS_LED_GPIO", long = "status-led-gpio", value_name = "gpio")]
    pub status_led_gpio: Option<u64>,

    /// Sysfs GPIO of the red LED
    #[arg(env = "SPHERE_RED_LED_GPIO", long = "red-led-gpio", value_name = "gpio")]
    pub red_led_gpio: Option<u64>,

    /// Sysfs GPIO of the green LED
    #[arg(env = "SPHERE_GREEN_LED_GPIO", long = "green-led-gpio", value_name = "gpio")]
    pub green_led_gpio: Option<u64>,

    /// Sysfs GPIO of the blue LED
    #[arg(env = "SPHERE_BLUE_LED_GPIO", long = "blue-led-gpio", value_name = "gpio")]
    pub blue_led_gpio: Option<u64>,

    /// Sysfs GPIO of the push button sending press telemetry
    #[arg(env = "SPHERE_BUTTON_GPIO", long = "button-gpio", value_name = "gpio")]
    pub button_gpio: Option<u64>,

    /// Button poll interval in milliseconds
    #[arg(
        env = "SPHERE_BUTTON_POLL_MS",
        long = "button-poll-ms",
        value_name = "ms",
        value_parser = parse_millis,
        default_value = "1"
    )]
    pub button_poll: Duration,

    /// Number of initial hub client setups the loopback hub refuses
    #[arg(
        env = "SPHERE_LOOPBACK_FAILURES",
        long = "loopback-failures",
        value_name = "n",
        default_value_t = 0
    )]
    pub loopback_failures: u32,

    /// Write logs to daily rolling files in this directory instead of stderr
    #[arg(env = "SPHERE_LOG_DIR", long = "log-dir", value_name = "dir")]
    pub log_dir: Option<PathBuf>,
}

/// Validated agent configuration
#[derive(Clone, Debug)]
pub struct Config {
    pub provisioning: Provisioning,
    pub interface: String,
    pub telemetry_polls: u32,
    /// Status, red, green and blue LED GPIOs, in twin property order
    pub led_gpios: [Option<u64>; 4],
    pub button_gpio: Option<u64>,
    pub button_poll: Duration,
    pub loopback_failures: u32,
}

fn present(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.is_empty())
}

impl Cli {
    pub fn usage() -> String {
        Cli::command().render_usage().to_string()
    }

    fn provisioning(&self) -> Result<Provisioning, ConfigError> {
        match present(&self.connection_type) {
            Some("DPS") => {
                let scope_id = present(&self.scope_id).ok_or(ConfigError::ScopeId)?;
                Ok(Provisioning::Dps {
                    scope_id: scope_id.to_string(),
                })
            }
            Some("Direct") => {
                let device_id = present(&self.device_id);
                // device ids are lowercase only
                if device_id.is_some_and(|id| id.chars().any(|c| c.is_ascii_uppercase())) {
                    return Err(ConfigError::DeviceId);
                }
                let hostname = present(&self.hostname).ok_or(ConfigError::Hostname)?;
                let device_id = device_id.ok_or(ConfigError::DeviceId)?;
                Ok(Provisioning::Direct {
                    hostname: hostname.to_string(),
                    device_id: device_id.to_string(),
                })
            }
            _ => Err(ConfigError::ConnectionType),
        }
    }

    pub fn validate(&self) -> Result<Config, ConfigError> {
        Ok(Config {
            provisioning: self.provisioning()?,
            interface: self.interface.clone(),
            telemetry_polls: self.telemetry_polls,
            led_gpios: [
                self.status_led_gpio,
                self.red_led_gpio,
                self.green_led_gpio,
                self.blue_led_gpio,
            ],
            button_gpio: self.button_gpio,
            button_poll: self.button_poll,
            loopback_failures: self.loopback_failures,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn validate(args: &[&str]) -> Result<Config, ConfigError> {
        let mut argv = vec!["sphered"];
        argv.extend_from_slice(args);
        Cli::try_parse_from(argv).unwrap().validate()
    }

    #[test]
    fn dps_needs_a_scope() {
        let config = validate(&["--connection-type", "DPS", "--scope-id", "0ne000A1B2C"]).unwrap();
        assert_eq!(
            config.provisioning,
            Provisioning::Dps {
                scope_id: "0ne000A1B2C".to_string()
            }
        );
        assert_eq!(
            validate(&["--connection-type", "DPS"]).unwrap_err(),
            ConfigError::ScopeId
        );
    }

    #[test]
    fn direct_needs_hostname_and_lowercase_device() {
        let config = validate(&[
            "--connection-type",
            "Direct",
            "--hostname",
            "hub.example.net",
            "--device-id",
            "sphere-01",
        ])
        .unwrap();
        assert!(matches!(config.provisioning, Provisioning::Direct { .. }));

        // uppercase is reported before a missing hostname
        assert_eq!(
            validate(&["--connection-type", "Direct", "--device-id", "Sphere"]).unwrap_err(),
            ConfigError::DeviceId
        );
        assert_eq!(
            validate(&["--connection-type", "Direct", "--device-id", "sphere"]).unwrap_err(),
            ConfigError::Hostname
        );
        assert_eq!(
            validate(&["--connection-type", "Direct", "--hostname", "hub"]).unwrap_err(),
            ConfigError::DeviceId
        );
    }

    #[test]
    fn connection_type_is_required_and_exact() {
        for args in [&[][..], &["--connection-type", "dps"][..]] {
            let err = validate(args).unwrap_err();
            assert_eq!(err, ConfigError::ConnectionType);
            assert_eq!(err.exit_code(), ExitCode::ValidateConnectionType);
        }
    }

    #[test]
    fn defaults() {
        let config = validate(&["--connection-type", "DPS", "--scope-id", "s"]).unwrap();
        assert_eq!(config.interface, "wlan0");
        assert_eq!(config.telemetry_polls, 10);
        assert_eq!(config.button_poll, Duration::from_millis(1));
        assert_eq!(config.led_gpios, [None; 4]);
        assert_eq!(config.loopback_failures, 0);
    }
}
