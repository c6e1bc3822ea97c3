use crate::metadata::Metadata;
use serde::Deserialize;
use thiserror::Error;

const COMPUTE_ENDPOINT: &str = "https://compute.googleapis.com/compute/v1";

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("HTTP error")]
    Http(#[from] Box<ureq::Error>),
    #[error("failed to read HTTP response")]
    Io(#[from] std::io::Error),
}

#[derive(Deserialize, Debug)]
pub struct Instance {
    #[serde(default)]
    pub metadata: Metadata,
}

/// Asynchronous compute operation handle. Completion is not awaited; the
/// serial poll is the only readiness signal for the guest.
#[derive(Deserialize, Debug)]
pub struct Operation {
    pub name: String,
    pub status: String,
}

#[derive(Deserialize, Debug)]
struct SerialPortOutput {
    contents: String,
}

/// Minimal compute v1 client covering the three calls the handshake needs.
/// Authentication is an opaque bearer token supplied by the caller.
pub struct ComputeClient {
    endpoint: String,
    token: String,
}

impl ComputeClient {
    pub fn new(token: impl Into<String>) -> Self {
        Self::with_endpoint(COMPUTE_ENDPOINT, token)
    }

    /// Endpoint override, mainly for tests.
    pub fn with_endpoint(endpoint: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            token: token.into(),
        }
    }

    fn instance_url(&self, project: &str, zone: &str, instance: &str) -> String {
        format!(
            "{}/projects/{project}/zones/{zone}/instances/{instance}",
            self.endpoint
        )
    }

    fn bearer(&self) -> String {
        format!("Bearer {}", self.token)
    }

    pub fn get_instance(
        &self,
        project: &str,
        zone: &str,
        instance: &str,
    ) -> Result<Instance, ApiError> {
        let url = self.instance_url(project, zone, instance);
        let res: Instance = ureq::get(&url)
            .set("Authorization", &self.bearer())
            .call()
            .map_err(Box::new)?
            .into_json()?;
        Ok(res)
    }

    pub fn set_metadata(
        &self,
        project: &str,
        zone: &str,
        instance: &str,
        metadata: &Metadata,
    ) -> Result<Operation, ApiError> {
        let url = format!("{}/setMetadata", self.instance_url(project, zone, instance));
        let res: Operation = ureq::post(&url)
            .set("Authorization", &self.bearer())
            .send_json(metadata)
            .map_err(Box::new)?
            .into_json()?;
        Ok(res)
    }

    /// Full buffered output of the given serial port, not just new content.
    pub fn serial_port_output(
        &self,
        project: &str,
        zone: &str,
        instance: &str,
        port: u8,
    ) -> Result<String, ApiError> {
        let url = format!("{}/serialPort", self.instance_url(project, zone, instance));
        let res: SerialPortOutput = ureq::get(&url)
            .query("port", &port.to_string())
            .set("Authorization", &self.bearer())
            .call()
            .map_err(Box::new)?
            .into_json()?;
        Ok(res.contents)
    }
}
