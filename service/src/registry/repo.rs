//! Device/key registry storage (component G).
//!
//! Grounded on the host stack's device-key repository: a narrow trait over
//! a `PgPool`-backed implementation, free functions taking a generic
//! `sqlx::Executor` so callers can run them against either the pool or an
//! open transaction, and a `Mutex`-guarded mock for handler unit tests.

use async_trait::async_trait;
use chrono::Utc;
use geocam_crypto::PublicKeyId;
use sqlx::PgPool;
use uuid::Uuid;

use super::model::{Device, NewDevice};

pub const SUPPORTED_ALGORITHM: &str = "secp256k1";

/// Arbitrary key for the transaction-scoped advisory lock serializing
/// `sequence` allocation (spec.md §5: sequence assignment is serialized
/// globally). Released automatically when the transaction ends.
const SEQUENCE_LOCK_KEY: i64 = 0x6765_6f63_616d_0001;

/// Default and maximum page sizes for [`DeviceRegistry::list_devices`]
/// (spec.md SUPPLEMENT-1).
pub const DEFAULT_PAGE_LIMIT: i64 = 50;
pub const MAX_PAGE_LIMIT: i64 = 200;

#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    #[error("installation_id is already bound to a different public key")]
    InstallationKeyConflict,
    #[error("unsupported signing algorithm: {0}")]
    UnsupportedAlgorithm(String),
    #[error("no device matches the given installation_id and key_fingerprint")]
    NotFound,
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// The outcome of [`DeviceRegistry::register`]: either a freshly created
/// record or the pre-existing one (registration is idempotent on a
/// matching `(installation_id, public_key)` pair).
#[derive(Debug, Clone, PartialEq)]
pub struct RegisteredDevice {
    pub device: Device,
    pub was_new: bool,
}

#[async_trait]
pub trait DeviceRegistry: Send + Sync {
    async fn register(&self, new_device: NewDevice) -> Result<RegisteredDevice, RegistryError>;
    async fn lookup_by_public_key(
        &self,
        public_key_base64: &str,
    ) -> Result<Option<Device>, RegistryError>;
    async fn lookup_by_public_key_id(
        &self,
        public_key_id: &PublicKeyId,
    ) -> Result<Option<Device>, RegistryError>;
    async fn list_devices(
        &self,
        limit: i64,
        offset: i64,
    ) -> Result<(Vec<Device>, i64), RegistryError>;
    async fn delete_by_installation(
        &self,
        installation_id: &str,
        key_fingerprint: &str,
    ) -> Result<(), RegistryError>;
    async fn revoke(&self, device_id: Uuid) -> Result<(), RegistryError>;
}

pub struct PgDeviceRegistry {
    pool: PgPool,
}

impl PgDeviceRegistry {
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl DeviceRegistry for PgDeviceRegistry {
    async fn register(&self, new_device: NewDevice) -> Result<RegisteredDevice, RegistryError> {
        register_device(&self.pool, new_device).await
    }

    async fn lookup_by_public_key(
        &self,
        public_key_base64: &str,
    ) -> Result<Option<Device>, RegistryError> {
        lookup_device_by_public_key(&self.pool, public_key_base64).await
    }

    async fn lookup_by_public_key_id(
        &self,
        public_key_id: &PublicKeyId,
    ) -> Result<Option<Device>, RegistryError> {
        lookup_device_by_public_key_id(&self.pool, public_key_id).await
    }

    async fn list_devices(
        &self,
        limit: i64,
        offset: i64,
    ) -> Result<(Vec<Device>, i64), RegistryError> {
        list_devices(&self.pool, limit, offset).await
    }

    async fn delete_by_installation(
        &self,
        installation_id: &str,
        key_fingerprint: &str,
    ) -> Result<(), RegistryError> {
        delete_device_by_installation(&self.pool, installation_id, key_fingerprint).await
    }

    async fn revoke(&self, device_id: Uuid) -> Result<(), RegistryError> {
        revoke_device(&self.pool, device_id).await
    }
}

async fn register_device(
    pool: &PgPool,
    new_device: NewDevice,
) -> Result<RegisteredDevice, RegistryError> {
    if new_device.algorithm != SUPPORTED_ALGORITHM {
        return Err(RegistryError::UnsupportedAlgorithm(new_device.algorithm));
    }

    let public_key_id = PublicKeyId::derive(&new_device.public_key_base64);
    let public_key_fingerprint = geocam_crypto::fingerprint(&new_device.public_key_base64);

    let mut tx = pool.begin().await?;

    // Holds for the rest of the transaction, so the MAX(sequence)+1 read
    // below and the INSERT that relies on it can't race with another
    // concurrent registration under READ COMMITTED.
    sqlx::query("SELECT pg_advisory_xact_lock($1)")
        .bind(SEQUENCE_LOCK_KEY)
        .execute(&mut *tx)
        .await?;

    if let Some(existing) =
        lookup_device_by_public_key(&mut *tx, &new_device.public_key_base64).await?
    {
        tx.commit().await?;
        return Ok(RegisteredDevice {
            device: existing,
            was_new: false,
        });
    }

    let existing_for_installation = sqlx::query_as::<_, DeviceRow>(
        "SELECT * FROM devices WHERE installation_id = $1 ORDER BY registered_at ASC LIMIT 1",
    )
    .bind(&new_device.installation_id)
    .fetch_optional(&mut *tx)
    .await?;

    if existing_for_installation.is_some() {
        return Err(RegistryError::InstallationKeyConflict);
    }

    let device_id = Uuid::new_v4();
    let registered_at = Utc::now();

    let row = sqlx::query_as::<_, DeviceRow>(
        r"
        INSERT INTO devices (
            device_id, installation_id, public_key_base64, public_key_id,
            public_key_fingerprint, algorithm, device_model, os_name, os_version,
            registered_at, sequence, revoked
        )
        VALUES (
            $1, $2, $3, $4, $5, $6, $7, $8, $9, $10,
            (SELECT COALESCE(MAX(sequence), 0) + 1 FROM devices),
            FALSE
        )
        RETURNING *
        ",
    )
    .bind(device_id)
    .bind(&new_device.installation_id)
    .bind(&new_device.public_key_base64)
    .bind(public_key_id.as_str())
    .bind(&public_key_fingerprint)
    .bind(&new_device.algorithm)
    .bind(&new_device.device_model)
    .bind(&new_device.os_name)
    .bind(&new_device.os_version)
    .bind(registered_at)
    .fetch_one(&mut *tx)
    .await?;

    tx.commit().await?;

    Ok(RegisteredDevice {
        device: row.into_device(),
        was_new: true,
    })
}

async fn lookup_device_by_public_key<'e, E>(
    executor: E,
    public_key_base64: &str,
) -> Result<Option<Device>, RegistryError>
where
    E: sqlx::Executor<'e, Database = sqlx::Postgres>,
{
    let row = sqlx::query_as::<_, DeviceRow>("SELECT * FROM devices WHERE public_key_base64 = $1")
        .bind(public_key_base64)
        .fetch_optional(executor)
        .await?;
    Ok(row.map(DeviceRow::into_device))
}

async fn lookup_device_by_public_key_id<'e, E>(
    executor: E,
    public_key_id: &PublicKeyId,
) -> Result<Option<Device>, RegistryError>
where
    E: sqlx::Executor<'e, Database = sqlx::Postgres>,
{
    let row = sqlx::query_as::<_, DeviceRow>("SELECT * FROM devices WHERE public_key_id = $1")
        .bind(public_key_id.as_str())
        .fetch_optional(executor)
        .await?;
    Ok(row.map(DeviceRow::into_device))
}

async fn list_devices(
    pool: &PgPool,
    limit: i64,
    offset: i64,
) -> Result<(Vec<Device>, i64), RegistryError> {
    let limit = limit.clamp(1, MAX_PAGE_LIMIT);
    let rows = sqlx::query_as::<_, DeviceRow>(
        "SELECT * FROM devices ORDER BY sequence ASC LIMIT $1 OFFSET $2",
    )
    .bind(limit)
    .bind(offset.max(0))
    .fetch_all(pool)
    .await?;

    let total_count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM devices")
        .fetch_one(pool)
        .await?;

    Ok((rows.into_iter().map(DeviceRow::into_device).collect(), total_count))
}

async fn delete_device_by_installation(
    pool: &PgPool,
    installation_id: &str,
    key_fingerprint: &str,
) -> Result<(), RegistryError> {
    let result = sqlx::query(
        "DELETE FROM devices WHERE installation_id = $1 AND public_key_fingerprint = $2",
    )
    .bind(installation_id)
    .bind(key_fingerprint)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(RegistryError::NotFound);
    }
    Ok(())
}

async fn revoke_device(pool: &PgPool, device_id: Uuid) -> Result<(), RegistryError> {
    let result = sqlx::query("UPDATE devices SET revoked = TRUE WHERE device_id = $1")
        .bind(device_id)
        .execute(pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(RegistryError::NotFound);
    }
    Ok(())
}

#[derive(sqlx::FromRow)]
struct DeviceRow {
    device_id: Uuid,
    installation_id: String,
    public_key_base64: String,
    public_key_id: String,
    public_key_fingerprint: String,
    algorithm: String,
    device_model: String,
    os_name: String,
    os_version: String,
    registered_at: chrono::DateTime<Utc>,
    sequence: i64,
    revoked: bool,
}

impl DeviceRow {
    fn into_device(self) -> Device {
        Device {
            device_id: self.device_id,
            installation_id: self.installation_id,
            public_key_base64: self.public_key_base64,
            public_key_id: self
                .public_key_id
                .parse()
                .unwrap_or_else(|_| PublicKeyId::derive("")),
            public_key_fingerprint: self.public_key_fingerprint,
            algorithm: self.algorithm,
            device_model: self.device_model,
            os_name: self.os_name,
            os_version: self.os_version,
            registered_at: self.registered_at,
            sequence: self.sequence,
            revoked: self.revoked,
        }
    }
}

#[cfg(any(test, feature = "test-utils"))]
pub mod mock {
    use super::{Device, DeviceRegistry, NewDevice, RegisteredDevice, RegistryError};
    use async_trait::async_trait;
    use geocam_crypto::PublicKeyId;
    use parking_lot::Mutex;
    use uuid::Uuid;

    /// An in-memory [`DeviceRegistry`] for handler unit tests.
    #[derive(Default)]
    pub struct MockDeviceRegistry {
        devices: Mutex<Vec<Device>>,
    }

    impl MockDeviceRegistry {
        #[must_use]
        pub fn new() -> Self {
            Self::default()
        }

        /// Seed a device directly, bypassing `register`'s conflict checks.
        pub fn seed(&self, device: Device) {
            self.devices.lock().push(device);
        }
    }

    #[async_trait]
    impl DeviceRegistry for MockDeviceRegistry {
        async fn register(
            &self,
            new_device: NewDevice,
        ) -> Result<RegisteredDevice, RegistryError> {
            if new_device.algorithm != super::SUPPORTED_ALGORITHM {
                return Err(RegistryError::UnsupportedAlgorithm(new_device.algorithm));
            }

            let mut devices = self.devices.lock();
            if let Some(existing) = devices
                .iter()
                .find(|d| d.public_key_base64 == new_device.public_key_base64)
            {
                return Ok(RegisteredDevice {
                    device: existing.clone(),
                    was_new: false,
                });
            }
            if devices
                .iter()
                .any(|d| d.installation_id == new_device.installation_id)
            {
                return Err(RegistryError::InstallationKeyConflict);
            }

            let public_key_id = PublicKeyId::derive(&new_device.public_key_base64);
            let public_key_fingerprint = geocam_crypto::fingerprint(&new_device.public_key_base64);
            let sequence = devices.iter().map(|d| d.sequence).max().unwrap_or(0) + 1;

            let device = Device {
                device_id: Uuid::new_v4(),
                installation_id: new_device.installation_id,
                public_key_base64: new_device.public_key_base64,
                public_key_id,
                public_key_fingerprint,
                algorithm: new_device.algorithm,
                device_model: new_device.device_model,
                os_name: new_device.os_name,
                os_version: new_device.os_version,
                registered_at: chrono::Utc::now(),
                sequence,
                revoked: false,
            };
            devices.push(device.clone());
            Ok(RegisteredDevice {
                device,
                was_new: true,
            })
        }

        async fn lookup_by_public_key(
            &self,
            public_key_base64: &str,
        ) -> Result<Option<Device>, RegistryError> {
            Ok(self
                .devices
                .lock()
                .iter()
                .find(|d| d.public_key_base64 == public_key_base64)
                .cloned())
        }

        async fn lookup_by_public_key_id(
            &self,
            public_key_id: &PublicKeyId,
        ) -> Result<Option<Device>, RegistryError> {
            Ok(self
                .devices
                .lock()
                .iter()
                .find(|d| &d.public_key_id == public_key_id)
                .cloned())
        }

        async fn list_devices(
            &self,
            limit: i64,
            offset: i64,
        ) -> Result<(Vec<Device>, i64), RegistryError> {
            let devices = self.devices.lock();
            let total_count = devices.len() as i64;
            let limit = limit.clamp(1, super::MAX_PAGE_LIMIT) as usize;
            let offset = offset.max(0) as usize;
            let page = devices.iter().skip(offset).take(limit).cloned().collect();
            Ok((page, total_count))
        }

        async fn delete_by_installation(
            &self,
            installation_id: &str,
            key_fingerprint: &str,
        ) -> Result<(), RegistryError> {
            let mut devices = self.devices.lock();
            let before = devices.len();
            devices.retain(|d| {
                !(d.installation_id == installation_id
                    && d.public_key_fingerprint == key_fingerprint)
            });
            if devices.len() == before {
                return Err(RegistryError::NotFound);
            }
            Ok(())
        }

        async fn revoke(&self, device_id: Uuid) -> Result<(), RegistryError> {
            let mut devices = self.devices.lock();
            let device = devices
                .iter_mut()
                .find(|d| d.device_id == device_id)
                .ok_or(RegistryError::NotFound)?;
            device.revoked = true;
            Ok(())
        }
    }
}
