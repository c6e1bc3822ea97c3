//! This library retrieves a one-time Windows administrator password from a
//! [Google Compute Engine](https://cloud.google.com/compute) instance. It
//! implements the client side of the `windows-keys` handshake spoken by the
//! GCE Windows guest agent: an RSA public key is published as instance
//! metadata, the agent creates (or resets) the account, encrypts the fresh
//! password with that key, and writes the result as a JSON line to serial
//! port 4. The response is correlated to the request by the base64-encoded
//! public modulus.
//!
//! # Password Reset
//!
//! The following code generates a key pair, publishes it, polls the serial
//! output until the agent answers, and decrypts the password.
//!
//! ```no_run
//! use gce_windows_password::compute::ComputeClient;
//! use gce_windows_password::config::ResetConfig;
//! use gce_windows_password::reset;
//! use std::error::Error;
//! use std::time::Duration;
//!
//! fn main() -> Result<(), Box<dyn Error>> {
//!   let config = ResetConfig {
//!     project: "my-project".into(),
//!     zone: "us-central1-a".into(),
//!     instance: "my-instance".into(),
//!     username: "example-user".into(),
//!     email: "user@example.com".into(),
//!     port: 4,
//!     timeout: Duration::from_secs(120),
//!   };
//!
//!   let client = ComputeClient::new("<access-token>");
//!   let creds = reset::reset_password(&client, &config)?;
//!   println!("{}: {}", creds.username, creds.password);
//!
//!   Ok(())
//! }
//! ```

pub mod compute;
pub mod config;
pub mod key;
pub mod metadata;
pub mod reset;
pub mod serial;
