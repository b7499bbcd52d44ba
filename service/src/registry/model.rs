//! The device/key registry's record types (spec.md §3, §4.G).

use chrono::{DateTime, Utc};
use geocam_crypto::PublicKeyId;
use serde::Serialize;
use uuid::Uuid;

/// A registered device, as stored in the `devices` table.
///
/// Devices are never destroyed once registered (`Absent -> Registered ->
/// Revoked` is monotonic); `revoked` is the only field ever mutated after
/// insert.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Device {
    pub device_id: Uuid,
    pub installation_id: String,
    pub public_key_base64: String,
    pub public_key_id: PublicKeyId,
    pub public_key_fingerprint: String,
    pub algorithm: String,
    pub device_model: String,
    pub os_name: String,
    pub os_version: String,
    pub registered_at: DateTime<Utc>,
    pub sequence: i64,
    pub revoked: bool,
}

impl Device {
    /// The human-readable `"GeoCam<sequence>"` label derived from
    /// `sequence`.
    #[must_use]
    pub fn geocam_name(&self) -> String {
        format!("GeoCam{}", self.sequence)
    }
}

/// Fields accepted by [`crate::registry::repo::DeviceRegistry::register`].
#[derive(Debug, Clone)]
pub struct NewDevice {
    pub installation_id: String,
    pub device_model: String,
    pub os_name: String,
    pub os_version: String,
    pub public_key_base64: String,
    pub algorithm: String,
}
