// dbbackup/src/backup/logic.rs
use anyhow::{Context, Result};
use chrono::{Local, NaiveDateTime};
use std::ffi::OsString;
use std::fs;
use std::future::Future;
use std::path::{Path, PathBuf};

use super::{archive, db_dump, encrypt, s3_upload};
use crate::config::{BackupJob, ConnectionSpec, UploadTarget};
use crate::errors;

pub const COMPRESSED_SUFFIX: &str = ".gz";
pub const ENCRYPTED_SUFFIX: &str = ".enc";

/// The individual steps of a backup run.
///
/// `SystemStages` wires these to the real database clients, gzip, AES-GCM and
/// S3; tests substitute their own implementations.
pub trait BackupStages {
    fn dump(&self, conn: &ConnectionSpec, output: &Path) -> errors::Result<()>;

    fn compress(&self, input: &Path, output: &Path) -> errors::Result<()>;

    fn encrypt(&self, input: &Path, output: &Path, key: &[u8]) -> errors::Result<()>;

    /// Returns the key the object was stored under.
    fn upload(
        &self,
        target: &UploadTarget,
        key: &str,
        file: &Path,
    ) -> impl Future<Output = errors::Result<String>>;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SystemStages;

impl BackupStages for SystemStages {
    fn dump(&self, conn: &ConnectionSpec, output: &Path) -> errors::Result<()> {
        db_dump::dump_database(conn, output)
    }

    fn compress(&self, input: &Path, output: &Path) -> errors::Result<()> {
        archive::compress_file(input, output)
    }

    fn encrypt(&self, input: &Path, output: &Path, key: &[u8]) -> errors::Result<()> {
        encrypt::encrypt_file(input, output, key)
    }

    async fn upload(&self, target: &UploadTarget, key: &str, file: &Path) -> errors::Result<String> {
        s3_upload::upload_file_to_s3(target, key, file).await
    }
}

/// What a successful run produced.
#[derive(Debug, Clone, PartialEq)]
pub struct BackupReport {
    pub final_path: PathBuf,
    pub uploaded_key: Option<String>,
}

/// `{db}-{YYYYMMDD-HHMMSS}.sql` for the given local time.
pub fn timestamped_output_path(db_name: &str, now: NaiveDateTime) -> PathBuf {
    PathBuf::from(format!("{}-{}.sql", db_name, now.format("%Y%m%d-%H%M%S")))
}

fn with_suffix(path: &Path, suffix: &str) -> PathBuf {
    let mut name = OsString::from(path.as_os_str());
    name.push(suffix);
    PathBuf::from(name)
}

fn base_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

// Failing to delete a superseded artifact never fails the run.
fn discard_superseded(path: &Path, what: &str) {
    match fs::remove_file(path) {
        Ok(()) => tracing::info!(path = %path.display(), "Removed {what}"),
        Err(e) => {
            println!("Warning: could not remove {what} {}: {e}", path.display());
            tracing::warn!(path = %path.display(), error = %e, "Could not remove {what}");
        }
    }
}

/// Runs dump → compress? → encrypt? → upload? for one job, stopping at the
/// first failing stage.
pub struct BackupPipeline<S = SystemStages> {
    stages: S,
}

impl BackupPipeline<SystemStages> {
    pub fn new() -> Self {
        Self::with_stages(SystemStages)
    }
}

impl<S: BackupStages> BackupPipeline<S> {
    pub fn with_stages(stages: S) -> Self {
        Self { stages }
    }

    pub async fn run(&self, job: &BackupJob) -> Result<BackupReport> {
        self.run_at(job, Local::now().naive_local()).await
    }

    /// Like [`run`](Self::run) with an explicit local time for timestamped names.
    pub async fn run_at(&self, job: &BackupJob, now: NaiveDateTime) -> Result<BackupReport> {
        let conn = &job.connection;
        let output = if job.use_timestamp {
            timestamped_output_path(&conn.db_name, now)
        } else {
            job.output.clone()
        };

        println!("Starting backup...");
        println!("  db-type : {}", conn.kind);
        println!("  host    : {}", conn.host);
        println!("  port    : {}", conn.port);
        println!("  user    : {}", conn.user);
        println!("  db      : {}", conn.db_name);
        println!("  out     : {}", output.display());
        println!("  compress: {}", job.compress);
        println!("  encrypt : {}", job.encryption_key.is_some());
        tracing::info!(
            db_type = %conn.kind,
            host = %conn.host,
            port = conn.port,
            user = %conn.user,
            db = %conn.db_name,
            out = %output.display(),
            compress = job.compress,
            encrypt = job.encryption_key.is_some(),
            upload = job.upload.is_some(),
            "Starting backup"
        );

        // 1) Dump
        self.stages
            .dump(conn, &output)
            .with_context(|| format!("Dump of database {} failed", conn.db_name))?;

        let mut final_path = output;

        // 2) Optional compression
        if job.compress {
            let gz_path = with_suffix(&final_path, COMPRESSED_SUFFIX);
            println!("Compressing backup to: {}", gz_path.display());
            tracing::info!(path = %gz_path.display(), "Compressing backup");

            self.stages
                .compress(&final_path, &gz_path)
                .context("Compression failed")?;

            discard_superseded(&final_path, "uncompressed backup");
            final_path = gz_path;
        }

        // 3) Optional encryption
        if let Some(key) = &job.encryption_key {
            let enc_path = with_suffix(&final_path, ENCRYPTED_SUFFIX);
            println!("Encrypting backup to: {}", enc_path.display());
            tracing::info!(path = %enc_path.display(), "Encrypting backup");

            self.stages
                .encrypt(&final_path, &enc_path, key)
                .context("Encryption failed")?;

            discard_superseded(&final_path, "unencrypted backup");
            final_path = enc_path;
        }

        // 4) Optional upload
        let uploaded_key = match &job.upload {
            Some(target) => {
                let key = format!("{}{}", target.prefix, base_name(&final_path));
                println!("Uploading backup to S3: {} key: {}", target.bucket, key);

                let stored = self
                    .stages
                    .upload(target, &key, &final_path)
                    .await
                    .context("S3 upload failed")?;

                println!("S3 upload completed.");
                tracing::info!(bucket = %target.bucket, key = %stored, "S3 upload completed");
                Some(stored)
            }
            None => None,
        };

        println!(
            "Backup completed successfully. Final file: {}",
            final_path.display()
        );
        tracing::info!(final_path = %final_path.display(), "Backup completed successfully");

        Ok(BackupReport {
            final_path,
            uploaded_key,
        })
    }
}

impl Default for BackupPipeline<SystemStages> {
    fn default() -> Self {
        Self::new()
    }
}
