pub mod databases;
pub mod duration;

use std::path::{Path, PathBuf};
use std::process::Stdio;
use which::which;

use crate::errors::{BackupError, Result};
use databases::ClientCommand;

/// Finds a database client executable in the system PATH.
pub fn find_client_executable(program: &str) -> Result<PathBuf> {
    which(program).map_err(|e| BackupError::ExternalProcess {
        program: program.to_string(),
        reason: format!(
            "executable not found in PATH ({e}). Please ensure the database client tools are installed and in your PATH."
        ),
    })
}

/// Runs `invocation` through `executable` with the given stdin and stdout,
/// inheriting stderr, and waits for it to exit.
///
/// A spawn failure or a non-zero exit is an `ExternalProcess` error naming
/// `db_name`.
pub fn run_client(
    invocation: &ClientCommand,
    executable: &Path,
    stdin: Stdio,
    stdout: Stdio,
    db_name: &str,
) -> Result<()> {
    let status = invocation
        .to_command(executable)
        .stdin(stdin)
        .stdout(stdout)
        .stderr(Stdio::inherit())
        .status()
        .map_err(|e| BackupError::ExternalProcess {
            program: invocation.program.to_string(),
            reason: format!("could not start {}: {e}", executable.display()),
        })?;

    if !status.success() {
        return Err(BackupError::ExternalProcess {
            program: invocation.program.to_string(),
            reason: format!("{status} for database {db_name}"),
        });
    }
    Ok(())
}
