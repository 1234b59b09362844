// dbbackup/src/backup/archive.rs
use flate2::{Compression, GzBuilder};
use std::fs::File;
use std::io::{self, BufReader};
use std::path::Path;

use crate::errors::{BackupError, Result};

/// Gzip-compresses `input_path` into `output_path`.
///
/// The input's file name is recorded in the gzip header, so `gunzip -N`
/// restores it. The input is left in place; removing it is up to the caller
/// once the compressed file has been written.
pub fn compress_file(input_path: &Path, output_path: &Path) -> Result<()> {
    let input = File::open(input_path).map_err(|e| {
        BackupError::io(format!("open src for gzip ({})", input_path.display()), e)
    })?;
    let output = File::create(output_path).map_err(|e| {
        BackupError::io(format!("create dst for gzip ({})", output_path.display()), e)
    })?;

    let mut reader = BufReader::new(input);
    let name = input_path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let mut encoder = GzBuilder::new()
        .filename(name)
        .write(output, Compression::default());

    io::copy(&mut reader, &mut encoder)
        .map_err(|e| BackupError::io("copy to gzip writer", e))?;

    // The gzip trailer is only written by finish(); dropping the encoder would swallow errors.
    let output = encoder
        .finish()
        .map_err(|e| BackupError::io("close gzip writer", e))?;
    output
        .sync_all()
        .map_err(|e| BackupError::io(format!("flush {}", output_path.display()), e))?;

    tracing::debug!(
        input = %input_path.display(),
        output = %output_path.display(),
        "Compressed backup file"
    );
    Ok(())
}
