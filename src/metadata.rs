use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Metadata key watched by the guest agent.
pub const WINDOWS_KEYS: &str = "windows-keys";

// Entries are one-time use, so the horizon only needs to absorb clock skew
// between client and guest.
const EXPIRE_WINDOW_MINUTES: i64 = 5;

/// Instance metadata as returned by the compute API. The fingerprint must be
/// echoed back on `setMetadata`, so it is carried along.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Metadata {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fingerprint: Option<String>,
    #[serde(default)]
    pub items: Vec<MetadataItem>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MetadataItem {
    pub key: String,
    #[serde(default)]
    pub value: String,
}

/// JSON payload published under the `windows-keys` metadata key.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WindowsKeyEntry {
    pub user_name: String,
    pub modulus: String,
    pub exponent: String,
    pub email: String,
    pub expire_on: String,
}

impl WindowsKeyEntry {
    pub fn new(username: &str, email: &str, modulus: &str, exponent: &str) -> Self {
        Self {
            user_name: username.to_string(),
            modulus: modulus.to_string(),
            exponent: exponent.to_string(),
            email: email.to_string(),
            expire_on: expire_on(Utc::now()),
        }
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

/// RFC3339 UTC timestamp five minutes past `now`.
pub fn expire_on(now: DateTime<Utc>) -> String {
    let expire = now + Duration::minutes(EXPIRE_WINDOW_MINUTES);
    expire.format("%Y-%m-%dT%H:%M:%SZ").to_string()
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum MergeOutcome {
    /// An existing `windows-keys` item was overwritten.
    Replaced,
    /// No `windows-keys` item existed; a new one was appended.
    Appended,
}

/// Produce updated metadata carrying `entry_json` under the `windows-keys`
/// key. The first matching item is overwritten in place; when the key is
/// absent a new item is appended and the outcome says so.
pub fn merge(metadata: &Metadata, entry_json: &str) -> (Metadata, MergeOutcome) {
    let mut updated = metadata.clone();
    if let Some(item) = updated.items.iter_mut().find(|i| i.key == WINDOWS_KEYS) {
        item.value = entry_json.to_string();
        return (updated, MergeOutcome::Replaced);
    }
    updated.items.push(MetadataItem {
        key: WINDOWS_KEYS.to_string(),
        value: entry_json.to_string(),
    });
    (updated, MergeOutcome::Appended)
}
