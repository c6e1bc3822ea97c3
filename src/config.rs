use std::time::Duration;
use thiserror::Error;

/// The guest agent prints encrypted passwords to COM4.
pub const DEFAULT_SERIAL_PORT: u8 = 4;
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(120);

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("{0} must not be empty")]
    EmptyField(&'static str),
    #[error("serial port must be in 1..=4, got {0}")]
    InvalidPort(u8),
    #[error("timeout must be non-zero")]
    ZeroTimeout,
}

/// Invocation parameters for a password reset.
///
/// `email` is advisory and may be empty; everything else identifies the
/// target instance and account and is validated before any API call.
#[derive(Clone, Debug)]
pub struct ResetConfig {
    pub project: String,
    pub zone: String,
    pub instance: String,
    pub username: String,
    pub email: String,
    pub port: u8,
    pub timeout: Duration,
}

impl ResetConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.project.is_empty() {
            return Err(ConfigError::EmptyField("project"));
        }
        if self.zone.is_empty() {
            return Err(ConfigError::EmptyField("zone"));
        }
        if self.instance.is_empty() {
            return Err(ConfigError::EmptyField("instance"));
        }
        if self.username.is_empty() {
            return Err(ConfigError::EmptyField("username"));
        }
        if !(1..=4).contains(&self.port) {
            return Err(ConfigError::InvalidPort(self.port));
        }
        if self.timeout.is_zero() {
            return Err(ConfigError::ZeroTimeout);
        }
        Ok(())
    }
}
