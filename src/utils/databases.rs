use std::fmt;
use std::path::Path;
use std::process::Command;
use std::str::FromStr;

use crate::config::ConnectionSpec;
use crate::errors::BackupError;

/// Database engines whose command-line clients we know how to drive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DatabaseKind {
    MySql,
    Postgres,
}

impl DatabaseKind {
    pub fn default_port(self) -> u16 {
        match self {
            DatabaseKind::MySql => 3306,
            DatabaseKind::Postgres => 5432,
        }
    }

    /// Client used to produce a dump on stdout.
    pub fn dump_program(self) -> &'static str {
        match self {
            DatabaseKind::MySql => "mysqldump",
            DatabaseKind::Postgres => "pg_dump",
        }
    }

    /// Client used to replay a dump read from stdin.
    pub fn restore_program(self) -> &'static str {
        match self {
            DatabaseKind::MySql => "mysql",
            DatabaseKind::Postgres => "psql",
        }
    }
}

impl FromStr for DatabaseKind {
    type Err = BackupError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "mysql" | "mariadb" => Ok(DatabaseKind::MySql),
            "postgres" | "postgresql" => Ok(DatabaseKind::Postgres),
            other => Err(BackupError::UnsupportedDatabase(other.to_string())),
        }
    }
}

impl fmt::Display for DatabaseKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DatabaseKind::MySql => write!(f, "mysql"),
            DatabaseKind::Postgres => write!(f, "postgres"),
        }
    }
}

/// A fully assembled invocation of a database client.
#[derive(Debug, Clone, PartialEq)]
pub struct ClientCommand {
    pub program: &'static str,
    pub args: Vec<String>,
    pub envs: Vec<(&'static str, String)>,
}

impl ClientCommand {
    /// Command that writes a dump of the database to stdout.
    pub fn dump(conn: &ConnectionSpec) -> Self {
        let program = conn.kind.dump_program();
        match conn.kind {
            DatabaseKind::MySql => Self::mysql(program, conn),
            DatabaseKind::Postgres => Self::postgres(program, conn, Vec::new()),
        }
    }

    /// Command that replays SQL read from stdin into the database.
    pub fn restore(conn: &ConnectionSpec) -> Self {
        let program = conn.kind.restore_program();
        match conn.kind {
            DatabaseKind::MySql => Self::mysql(program, conn),
            DatabaseKind::Postgres => Self::postgres(
                program,
                conn,
                vec![
                    "-X".to_string(), // Do not read psqlrc
                    "-q".to_string(),
                    "-v".to_string(),
                    "ON_ERROR_STOP=1".to_string(),
                ],
            ),
        }
    }

    fn mysql(program: &'static str, conn: &ConnectionSpec) -> Self {
        let mut args = vec![
            "-h".to_string(),
            conn.host.clone(),
            "-P".to_string(),
            conn.port.to_string(),
            "-u".to_string(),
            conn.user.clone(),
        ];
        if let Some(password) = &conn.password {
            args.push(format!("-p{password}"));
        }
        args.push(conn.db_name.clone());
        ClientCommand {
            program,
            args,
            envs: Vec::new(),
        }
    }

    // libpq clients take the password from the environment; -w stops them prompting for one.
    fn postgres(program: &'static str, conn: &ConnectionSpec, extra: Vec<String>) -> Self {
        let mut args = vec![
            "-h".to_string(),
            conn.host.clone(),
            "-p".to_string(),
            conn.port.to_string(),
            "-U".to_string(),
            conn.user.clone(),
            "-w".to_string(),
        ];
        args.extend(extra);
        if program == "psql" {
            args.push("-d".to_string());
        }
        args.push(conn.db_name.clone());
        let envs = conn
            .password
            .as_ref()
            .map(|p| vec![("PGPASSWORD", p.clone())])
            .unwrap_or_default();
        ClientCommand {
            program,
            args,
            envs,
        }
    }

    /// Printable form of the command line with secrets masked.
    pub fn masked(&self) -> String {
        let mut parts = vec![self.program.to_string()];
        for (key, _) in &self.envs {
            parts.insert(0, format!("{key}=****"));
        }
        for arg in &self.args {
            if arg.starts_with("-p") && arg.len() > 2 && self.program.starts_with("mysql") {
                parts.push("-p****".to_string());
            } else {
                parts.push(arg.clone());
            }
        }
        parts.join(" ")
    }

    pub fn to_command(&self, executable: &Path) -> Command {
        let mut cmd = Command::new(executable);
        cmd.args(&self.args);
        for (key, value) in &self.envs {
            cmd.env(key, value);
        }
        cmd
    }
}
