// dbbackup/src/restore/db_restore.rs
use std::fs::File;
use std::path::Path;
use std::process::Stdio;

use crate::config::ConnectionSpec;
use crate::errors::{BackupError, Result};
use crate::utils::databases::ClientCommand;
use crate::utils::{find_client_executable, run_client};

/// Replays the SQL file at `input_path` into the database by feeding it to
/// the vendor client on stdin.
pub fn restore_database(conn: &ConnectionSpec, input_path: &Path) -> Result<()> {
    let infile = File::open(input_path).map_err(|e| {
        BackupError::io(
            format!("could not open input file {}", input_path.display()),
            e,
        )
    })?;

    let invocation = ClientCommand::restore(conn);
    let executable = find_client_executable(invocation.program)?;
    restore_with_client(conn, &invocation, &executable, infile)
}

fn restore_with_client(
    conn: &ConnectionSpec,
    invocation: &ClientCommand,
    executable: &Path,
    infile: File,
) -> Result<()> {
    println!("Running command: {}", invocation.masked());
    tracing::info!(command = %invocation.masked(), db = %conn.db_name, "Running restore");

    run_client(
        invocation,
        executable,
        Stdio::from(infile),
        Stdio::inherit(),
        &conn.db_name,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::databases::DatabaseKind;
    use std::fs;
    use tempfile::TempDir;

    fn conn() -> ConnectionSpec {
        ConnectionSpec {
            kind: DatabaseKind::MySql,
            host: "localhost".to_string(),
            port: 3306,
            user: "root".to_string(),
            password: None,
            db_name: "orders".to_string(),
        }
    }

    #[test]
    fn test_missing_input_fails_before_running_client() {
        let dir = TempDir::new().unwrap();

        let err = restore_database(&conn(), &dir.path().join("nope.sql")).unwrap_err();
        assert!(matches!(err, BackupError::Io { .. }));
        assert!(err.to_string().starts_with("could not open input file"));
    }

    #[cfg(unix)]
    fn shell(script: &str) -> ClientCommand {
        ClientCommand {
            program: "mysql",
            args: vec!["-c".to_string(), script.to_string()],
            envs: Vec::new(),
        }
    }

    #[cfg(unix)]
    #[test]
    fn test_input_file_is_fed_to_client_stdin() {
        let dir = TempDir::new().unwrap();
        let input = dir.path().join("orders.sql");
        fs::write(&input, "INSERT INTO orders VALUES (1);\n").unwrap();

        // Succeeds only if stdin carries the dump.
        restore_with_client(
            &conn(),
            &shell("grep -q 'INSERT INTO orders'"),
            Path::new("/bin/sh"),
            File::open(&input).unwrap(),
        )
        .unwrap();
    }

    #[cfg(unix)]
    #[test]
    fn test_failing_client_is_external_process_error() {
        let dir = TempDir::new().unwrap();
        let input = dir.path().join("orders.sql");
        fs::write(&input, "broken sql").unwrap();

        let err = restore_with_client(
            &conn(),
            &shell("cat >/dev/null; exit 1"),
            Path::new("/bin/sh"),
            File::open(&input).unwrap(),
        )
        .unwrap_err();

        assert!(matches!(err, BackupError::ExternalProcess { ref program, .. } if program == "mysql"));
        assert!(err.to_string().ends_with("for database orders"));
    }
}
