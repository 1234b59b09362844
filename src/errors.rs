use thiserror::Error;

#[derive(Error, Debug)]
pub enum BackupError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Encryption key must be exactly 32 bytes for AES-256 (got {0})")]
    InvalidKeyLength(usize),

    #[error("Unsupported db-type: {0}")]
    UnsupportedDatabase(String),

    #[error("{program} failed: {reason}")]
    ExternalProcess { program: String, reason: String },

    #[error("{context}: {source}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Cipher error: {0}")]
    Cipher(String),

    #[error("S3 error: {0}")]
    Upload(String),
}

impl BackupError {
    /// Wraps an I/O error with the step that produced it.
    pub fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        BackupError::Io {
            context: context.into(),
            source,
        }
    }
}

pub type Result<T> = std::result::Result<T, BackupError>;
