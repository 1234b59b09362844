// dbbackup/src/backup/db_dump.rs
use std::fs::File;
use std::path::Path;
use std::process::Stdio;

use crate::config::ConnectionSpec;
use crate::errors::{BackupError, Result};
use crate::utils::databases::ClientCommand;
use crate::utils::{find_client_executable, run_client};

/// Dumps the database to `output_path` by running the vendor dump client with
/// its stdout redirected into the file.
///
/// The file is created (or truncated) only after the client has been found.
pub fn dump_database(conn: &ConnectionSpec, output_path: &Path) -> Result<()> {
    let invocation = ClientCommand::dump(conn);
    let executable = find_client_executable(invocation.program)?;
    dump_with_client(conn, &invocation, &executable, output_path)
}

fn dump_with_client(
    conn: &ConnectionSpec,
    invocation: &ClientCommand,
    executable: &Path,
    output_path: &Path,
) -> Result<()> {
    let outfile = File::create(output_path).map_err(|e| {
        BackupError::io(
            format!("could not create output file {}", output_path.display()),
            e,
        )
    })?;

    println!("Running command: {}", invocation.masked());
    tracing::info!(command = %invocation.masked(), db = %conn.db_name, "Running dump");

    run_client(
        invocation,
        executable,
        Stdio::null(),
        Stdio::from(outfile),
        &conn.db_name,
    )?;

    println!("✓ Database {} dumped to {}", conn.db_name, output_path.display());
    Ok(())
}
