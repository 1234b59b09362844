pub(crate) mod db_restore;

use anyhow::{Context, Result};

use crate::config::RestoreJob;

/// Public entry point for the restore process.
pub fn run_restore_flow(job: &RestoreJob) -> Result<()> {
    let conn = &job.connection;
    println!("Starting restore...");
    println!("  db-type : {}", conn.kind);
    println!("  host    : {}", conn.host);
    println!("  port    : {}", conn.port);
    println!("  user    : {}", conn.user);
    println!("  db      : {}", conn.db_name);
    println!("  in      : {}", job.input.display());
    tracing::info!(
        db_type = %conn.kind,
        host = %conn.host,
        db = %conn.db_name,
        input = %job.input.display(),
        "Starting restore"
    );

    db_restore::restore_database(conn, &job.input)
        .with_context(|| format!("Restore of {} into {} failed", job.input.display(), conn.db_name))?;

    println!("Restore completed successfully.");
    tracing::info!(db = %conn.db_name, "Restore completed successfully");
    Ok(())
}
