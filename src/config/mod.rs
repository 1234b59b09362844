// dbbackup/src/config/mod.rs
//! Job specifications and the sources they are built from.
//!
//! A job is resolved from an ordered list of settings layers (command-line
//! flags or a JSON config file, then built-in defaults). Each field is taken
//! from the first layer that sets it, and the merged result is validated once.

use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

use crate::backup::encrypt::KEY_LEN;
use crate::errors::{BackupError, Result};
use crate::utils::databases::DatabaseKind;

const DEFAULT_DB_TYPE: &str = "mysql";
const DEFAULT_HOST: &str = "localhost";
const DEFAULT_USER: &str = "root";
pub const DEFAULT_BACKUP_FILE: &str = "backup.sql";

// Settings layers as they appear on disk (camelCase keys) or come off the command line.
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ConnectionSettings {
    pub db_type: Option<String>,
    pub host: Option<String>,
    pub port: Option<u16>,
    pub user: Option<String>,
    pub password: Option<String>,
    pub db_name: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct BackupSettings {
    #[serde(flatten)]
    pub connection: ConnectionSettings,
    #[serde(rename = "out")]
    pub output: Option<PathBuf>,
    pub compress: Option<bool>,
    pub use_timestamp: Option<bool>,
    pub encrypt: Option<bool>,
    pub encrypt_key: Option<String>,
    pub upload_s3: Option<bool>,
    pub s3_bucket: Option<String>,
    pub s3_region: Option<String>,
    pub s3_prefix: Option<String>,
    pub s3_endpoint: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RestoreSettings {
    #[serde(flatten)]
    pub connection: ConnectionSettings,
    pub input: Option<PathBuf>,
}

fn present(value: Option<String>) -> Option<String> {
    value.filter(|s| !s.trim().is_empty())
}

impl ConnectionSettings {
    /// Fields set on `self` win; the rest come from `fallback`.
    pub fn merge(self, fallback: Self) -> Self {
        ConnectionSettings {
            db_type: present(self.db_type).or(present(fallback.db_type)),
            host: present(self.host).or(present(fallback.host)),
            port: self.port.or(fallback.port),
            user: present(self.user).or(present(fallback.user)),
            password: present(self.password).or(present(fallback.password)),
            db_name: present(self.db_name).or(present(fallback.db_name)),
        }
    }

    fn resolve(self) -> Result<ConnectionSpec> {
        let kind: DatabaseKind = self
            .db_type
            .as_deref()
            .unwrap_or(DEFAULT_DB_TYPE)
            .parse()?;
        let db_name = self
            .db_name
            .ok_or_else(|| BackupError::Config("database name (--db / dbName) is required".to_string()))?;

        Ok(ConnectionSpec {
            kind,
            host: self.host.unwrap_or_else(|| DEFAULT_HOST.to_string()),
            port: self.port.unwrap_or_else(|| kind.default_port()),
            user: self.user.unwrap_or_else(|| DEFAULT_USER.to_string()),
            password: self.password,
            db_name,
        })
    }
}

impl BackupSettings {
    pub fn merge(self, fallback: Self) -> Self {
        BackupSettings {
            connection: self.connection.merge(fallback.connection),
            output: self.output.or(fallback.output),
            compress: self.compress.or(fallback.compress),
            use_timestamp: self.use_timestamp.or(fallback.use_timestamp),
            encrypt: self.encrypt.or(fallback.encrypt),
            encrypt_key: present(self.encrypt_key).or(present(fallback.encrypt_key)),
            upload_s3: self.upload_s3.or(fallback.upload_s3),
            s3_bucket: present(self.s3_bucket).or(present(fallback.s3_bucket)),
            s3_region: present(self.s3_region).or(present(fallback.s3_region)),
            s3_prefix: present(self.s3_prefix).or(present(fallback.s3_prefix)),
            s3_endpoint: present(self.s3_endpoint).or(present(fallback.s3_endpoint)),
        }
    }

    pub fn from_json_file(path: &Path) -> Result<Self> {
        load_json(path, "backup")
    }
}

impl RestoreSettings {
    pub fn merge(self, fallback: Self) -> Self {
        RestoreSettings {
            connection: self.connection.merge(fallback.connection),
            input: self.input.or(fallback.input),
        }
    }

    pub fn from_json_file(path: &Path) -> Result<Self> {
        load_json(path, "restore")
    }
}

fn load_json<T: for<'de> Deserialize<'de>>(path: &Path, what: &str) -> Result<T> {
    let content = fs::read_to_string(path).map_err(|e| {
        BackupError::Config(format!("read {what} config file {}: {e}", path.display()))
    })?;
    serde_json::from_str(&content).map_err(|e| {
        BackupError::Config(format!("parse {what} config JSON {}: {e}", path.display()))
    })
}

// Fully resolved job specifications.
#[derive(Debug, Clone, PartialEq)]
pub struct ConnectionSpec {
    pub kind: DatabaseKind,
    pub host: String,
    pub port: u16,
    pub user: String,
    pub password: Option<String>,
    pub db_name: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct UploadTarget {
    pub bucket: String,
    pub region: String,
    pub prefix: String,
    /// Custom endpoint for S3-compatible stores; AWS is used when unset.
    pub endpoint: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BackupJob {
    pub connection: ConnectionSpec,
    pub output: PathBuf,
    pub use_timestamp: bool,
    pub compress: bool,
    /// Present exactly when encryption was requested; always `KEY_LEN` bytes.
    pub encryption_key: Option<Vec<u8>>,
    pub upload: Option<UploadTarget>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RestoreJob {
    pub connection: ConnectionSpec,
    pub input: PathBuf,
}

impl BackupJob {
    /// Merges `layers` in priority order and validates the result.
    pub fn resolve(layers: impl IntoIterator<Item = BackupSettings>) -> Result<Self> {
        let merged = layers
            .into_iter()
            .fold(BackupSettings::default(), |acc, layer| acc.merge(layer));

        let connection = merged.connection.resolve()?;

        let encryption_key = if merged.encrypt.unwrap_or(false) {
            let key = merged.encrypt_key.ok_or_else(|| {
                BackupError::Config("Encryption requested but no key provided".to_string())
            })?;
            if key.len() != KEY_LEN {
                return Err(BackupError::InvalidKeyLength(key.len()));
            }
            Some(key.into_bytes())
        } else {
            None
        };

        let upload = if merged.upload_s3.unwrap_or(false) {
            match (merged.s3_bucket, merged.s3_region) {
                (Some(bucket), Some(region)) => Some(UploadTarget {
                    bucket,
                    region,
                    prefix: merged.s3_prefix.unwrap_or_default(),
                    endpoint: merged.s3_endpoint,
                }),
                _ => {
                    return Err(BackupError::Config(
                        "S3 upload requested but bucket or region is empty".to_string(),
                    ));
                }
            }
        } else {
            None
        };

        Ok(BackupJob {
            connection,
            output: merged
                .output
                .unwrap_or_else(|| PathBuf::from(DEFAULT_BACKUP_FILE)),
            use_timestamp: merged.use_timestamp.unwrap_or(false),
            compress: merged.compress.unwrap_or(false),
            encryption_key,
            upload,
        })
    }

    /// Reads the job from a JSON config file.
    pub fn from_config_file(path: &Path) -> Result<Self> {
        Self::resolve([BackupSettings::from_json_file(path)?])
    }
}

impl RestoreJob {
    pub fn resolve(layers: impl IntoIterator<Item = RestoreSettings>) -> Result<Self> {
        let merged = layers
            .into_iter()
            .fold(RestoreSettings::default(), |acc, layer| acc.merge(layer));

        Ok(RestoreJob {
            connection: merged.connection.resolve()?,
            input: merged
                .input
                .unwrap_or_else(|| PathBuf::from(DEFAULT_BACKUP_FILE)),
        })
    }

    pub fn from_config_file(path: &Path) -> Result<Self> {
        Self::resolve([RestoreSettings::from_json_file(path)?])
    }
}
