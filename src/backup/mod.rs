pub(crate) mod archive; // gzip stage
pub(crate) mod db_dump; // vendor dump client
pub(crate) mod encrypt; // AES-256-GCM stage
pub(crate) mod logic;
pub(crate) mod s3_upload;

use anyhow::Result;

use crate::config::BackupJob;
pub use logic::{BackupPipeline, BackupReport};

/// Public entry point for one backup run against the real clients and S3.
pub async fn run_backup_flow(job: &BackupJob) -> Result<BackupReport> {
    BackupPipeline::new().run(job).await
}
