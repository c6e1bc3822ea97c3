use crate::compute::{ApiError, ComputeClient};
use crate::config::{ConfigError, ResetConfig};
use crate::key::{HandshakeKey, HashFunction, KeyError};
use crate::metadata::{self, MergeOutcome, WindowsKeyEntry};
use crate::serial::{self, SerialEntry};
use log::{debug, info};
use std::thread;
use std::time::{Duration, Instant};
use thiserror::Error;

const INITIAL_POLL_DELAY: Duration = Duration::from_secs(1);
const MAX_POLL_DELAY: Duration = Duration::from_secs(8);

#[derive(Error, Debug)]
pub enum ResetError {
    #[error("invalid configuration")]
    Config(#[from] ConfigError),
    #[error("compute API error")]
    Api(#[from] ApiError),
    #[error("key error")]
    Key(#[from] KeyError),
    #[error("failed to encode windows-keys entry")]
    Encode(#[from] serde_json::Error),
    #[error("guest agent reported an error: {0}")]
    Agent(String),
    #[error("agent response carried no encrypted password")]
    MissingPassword,
    #[error("no matching response on serial port {port} within {waited:?}")]
    TimedOut { port: u8, waited: Duration },
}

#[derive(Debug)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

/// Run the full handshake: generate a key pair, publish it under the
/// `windows-keys` metadata key, poll the serial output until the agent
/// answers for our modulus, and decrypt the password.
pub fn reset_password(
    client: &ComputeClient,
    config: &ResetConfig,
) -> Result<Credentials, ResetError> {
    config.validate()?;

    let instance = client.get_instance(&config.project, &config.zone, &config.instance)?;

    info!("generating 2048-bit RSA key pair");
    let key = HandshakeKey::generate()?;
    let modulus = key.modulus_b64();

    let entry = WindowsKeyEntry::new(&config.username, &config.email, &modulus, &key.exponent_b64());
    let (updated, outcome) = metadata::merge(&instance.metadata, &entry.to_json()?);
    if outcome == MergeOutcome::Appended {
        info!("no existing {} item, appending one", metadata::WINDOWS_KEYS);
    }

    info!("publishing {} metadata", metadata::WINDOWS_KEYS);
    let operation = client.set_metadata(&config.project, &config.zone, &config.instance, &updated)?;
    debug!("setMetadata operation {} is {}", operation.name, operation.status);

    info!("waiting for encrypted password on serial port {}", config.port);
    let entry = poll_serial(client, config, &modulus)?;
    credentials_from_entry(&key, entry, &config.username)
}

/// Turn the matched serial record into credentials. An agent-side error
/// aborts here; a record without a password is a protocol violation, not
/// a retry case.
fn credentials_from_entry(
    key: &HandshakeKey,
    entry: SerialEntry,
    username: &str,
) -> Result<Credentials, ResetError> {
    let SerialEntry {
        error_message,
        encrypted_password,
        hash_function,
        ..
    } = entry;

    if let Some(message) = error_message.filter(|m| !m.is_empty()) {
        return Err(ResetError::Agent(message));
    }
    let encrypted = encrypted_password.ok_or(ResetError::MissingPassword)?;
    let hash = hash_function
        .as_deref()
        .map(str::parse::<HashFunction>)
        .transpose()?
        .unwrap_or_default();

    info!("decrypting password");
    let password = key.decrypt_password(&encrypted, hash)?;

    Ok(Credentials {
        username: username.to_string(),
        password,
    })
}

/// Poll the serial output until a line matches `modulus` or the configured
/// deadline passes. The delay doubles per attempt up to a cap; an empty scan
/// only means the guest has not answered yet.
fn poll_serial(
    client: &ComputeClient,
    config: &ResetConfig,
    modulus: &str,
) -> Result<SerialEntry, ResetError> {
    let deadline = Instant::now() + config.timeout;
    let mut delay = INITIAL_POLL_DELAY;
    loop {
        thread::sleep(delay);
        let output = client.serial_port_output(
            &config.project,
            &config.zone,
            &config.instance,
            config.port,
        )?;
        if let Some(entry) = serial::find_response(&output, modulus) {
            return Ok(entry);
        }
        if Instant::now() >= deadline {
            return Err(ResetError::TimedOut {
                port: config.port,
                waited: config.timeout,
            });
        }
        debug!("no response yet, retrying in {:?}", delay);
        delay = (delay * 2).min(MAX_POLL_DELAY);
    }
}
