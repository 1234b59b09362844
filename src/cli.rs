//! Command-line interface, parsed with clap.

use clap::error::ErrorKind;
use clap::{ArgGroup, Args, Parser, Subcommand};
use std::path::PathBuf;

use crate::config::{BackupJob, BackupSettings, ConnectionSettings, RestoreJob, RestoreSettings};
use crate::errors::Result;
use crate::logging::DEFAULT_LOG_FILE;
use crate::schedule::Schedule;

/// Database backup and restore using the vendor command-line clients
#[derive(Parser, Debug)]
#[command(name = "dbbackup")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Log file to append to
    #[arg(long, global = true, value_name = "PATH", default_value = DEFAULT_LOG_FILE)]
    pub log_file: PathBuf,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, global = true, value_name = "LEVEL", default_value = "info")]
    pub log_level: String,

    #[command(subcommand)]
    pub command: Commands,
}

/// Text to report for a failed parse, or `None` when clap is only showing
/// help or the version.
pub fn parse_failure(err: &clap::Error) -> Option<String> {
    match err.kind() {
        ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => None,
        _ => Some(err.to_string()),
    }
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Dump a database, then optionally compress, encrypt and upload it
    Backup(BackupArgs),

    /// Load a plain SQL dump back into a database
    Restore(RestoreArgs),

    /// Run the backup from a config file on a recurring schedule
    Schedule(ScheduleArgs),

    /// Print the version
    Version,
}

/// Connection flags shared by backup and restore.
#[derive(Args, Debug, Default, Clone)]
pub struct ConnectionArgs {
    /// Database kind (mysql, postgres)
    #[arg(long, value_name = "KIND")]
    pub db_type: Option<String>,

    /// Database server host (default localhost)
    #[arg(long)]
    pub host: Option<String>,

    /// Defaults to the standard port of the database kind
    #[arg(long)]
    pub port: Option<u16>,

    /// Database user (default root)
    #[arg(long)]
    pub user: Option<String>,

    /// Database password; omitted from logged command lines
    #[arg(long)]
    pub password: Option<String>,

    /// Database name
    #[arg(long = "db", value_name = "NAME")]
    pub db_name: Option<String>,
}

impl ConnectionArgs {
    fn to_settings(&self) -> ConnectionSettings {
        ConnectionSettings {
            db_type: self.db_type.clone(),
            host: self.host.clone(),
            port: self.port,
            user: self.user.clone(),
            password: self.password.clone(),
            db_name: self.db_name.clone(),
        }
    }
}

#[derive(Args, Debug, Default)]
#[command(group(
    ArgGroup::new("backup_flags")
        .multiple(true)
        .args([
            "db_type", "host", "port", "user", "password", "db_name", "out", "compress",
            "encrypt", "encrypt_key", "use_timestamp", "upload_s3", "s3_bucket",
            "s3_region", "s3_prefix", "s3_endpoint",
        ])
))]
pub struct BackupArgs {
    /// Read the job from a JSON config file instead of flags
    #[arg(long, value_name = "FILE", conflicts_with = "backup_flags")]
    pub config: Option<PathBuf>,

    #[command(flatten)]
    pub connection: ConnectionArgs,

    /// Output file for the dump
    #[arg(long, value_name = "FILE")]
    pub out: Option<PathBuf>,

    /// Gzip the dump
    #[arg(long)]
    pub compress: bool,

    /// Encrypt the backup with AES-256-GCM
    #[arg(long)]
    pub encrypt: bool,

    /// 32-byte encryption key
    #[arg(long, value_name = "KEY")]
    pub encrypt_key: Option<String>,

    /// Name the dump <db>-<YYYYMMDD-HHMMSS>.sql instead of --out
    #[arg(long)]
    pub use_timestamp: bool,

    /// Upload the final file to S3
    #[arg(long)]
    pub upload_s3: bool,

    /// Target S3 bucket
    #[arg(long, value_name = "BUCKET")]
    pub s3_bucket: Option<String>,

    /// Region of the S3 bucket
    #[arg(long, value_name = "REGION")]
    pub s3_region: Option<String>,

    /// Prepended to the file name to form the object key
    #[arg(long, value_name = "PREFIX")]
    pub s3_prefix: Option<String>,

    /// Endpoint URL of an S3-compatible store
    #[arg(long, value_name = "URL")]
    pub s3_endpoint: Option<String>,
}

impl BackupArgs {
    pub fn to_settings(&self) -> BackupSettings {
        BackupSettings {
            connection: self.connection.to_settings(),
            output: self.out.clone(),
            compress: self.compress.then_some(true),
            use_timestamp: self.use_timestamp.then_some(true),
            encrypt: self.encrypt.then_some(true),
            encrypt_key: self.encrypt_key.clone(),
            upload_s3: self.upload_s3.then_some(true),
            s3_bucket: self.s3_bucket.clone(),
            s3_region: self.s3_region.clone(),
            s3_prefix: self.s3_prefix.clone(),
            s3_endpoint: self.s3_endpoint.clone(),
        }
    }

    /// The job from `--config` when given, otherwise from the flags.
    pub fn job(&self) -> Result<BackupJob> {
        match &self.config {
            Some(path) => BackupJob::from_config_file(path),
            None => BackupJob::resolve([self.to_settings()]),
        }
    }
}

#[derive(Args, Debug, Default)]
#[command(group(
    ArgGroup::new("restore_flags")
        .multiple(true)
        .args(["db_type", "host", "port", "user", "password", "db_name", "input"])
))]
pub struct RestoreArgs {
    /// Read the job from a JSON config file instead of flags
    #[arg(long, value_name = "FILE", conflicts_with = "restore_flags")]
    pub config: Option<PathBuf>,

    #[command(flatten)]
    pub connection: ConnectionArgs,

    /// SQL file to restore from
    #[arg(long = "in", value_name = "FILE")]
    pub input: Option<PathBuf>,
}

impl RestoreArgs {
    pub fn to_settings(&self) -> RestoreSettings {
        RestoreSettings {
            connection: self.connection.to_settings(),
            input: self.input.clone(),
        }
    }

    pub fn job(&self) -> Result<RestoreJob> {
        match &self.config {
            Some(path) => RestoreJob::from_config_file(path),
            None => RestoreJob::resolve([self.to_settings()]),
        }
    }
}

#[derive(Args, Debug)]
pub struct ScheduleArgs {
    /// Backup config file, re-read before every run
    #[arg(long, value_name = "FILE")]
    pub config: PathBuf,

    /// Run at this interval, e.g. 30m, 6h, 1h30m
    #[arg(long, value_name = "DURATION", conflicts_with = "daily")]
    pub every: Option<String>,

    /// Run once a day at this local time (HH:MM)
    #[arg(long, value_name = "HH:MM")]
    pub daily: Option<String>,
}

impl ScheduleArgs {
    pub fn schedule(&self) -> Result<Schedule> {
        Schedule::from_args(self.every.as_deref(), self.daily.as_deref())
    }
}
