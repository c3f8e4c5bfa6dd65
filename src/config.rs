//! `config` module: the startup configuration gate.
//!
//! All required settings come from the process environment as plain strings.
//! [`Settings::from_env`] is the only place the environment is read: it builds
//! an explicit value object once at startup, which is then passed by reference
//! into the upload procedure. Any missing variable, or a `CSV_PATH` that does
//! not resolve to an existing file, is a fatal configuration error surfaced
//! before the server accepts its first tool call.
//!
//! # Errors
//! All errors here use `anyhow::Error` so the binary boundary can print a
//! single context-rich diagnostic naming the missing item and exit non-zero.

use anyhow::{bail, Result};
use std::env;
use std::path::PathBuf;
use tracing::{error, info};

/// Environment variables that must be present (and non-empty) at startup.
pub const REQUIRED_ENV: [&str; 8] = [
    "CSV_PATH",
    "SNOWFLAKE_ACCOUNT",
    "SNOWFLAKE_USER",
    "SNOWFLAKE_PASSWORD",
    "SNOWFLAKE_WAREHOUSE",
    "SNOWFLAKE_DATABASE",
    "SNOWFLAKE_SCHEMA",
    "SNOWFLAKE_TABLE",
];

/// Validated application settings, constructed once at startup.
///
/// The Debug impl redacts the password so settings can be logged safely.
#[derive(Clone)]
pub struct Settings {
    pub csv_path: PathBuf,
    pub account: String,
    pub user: String,
    pub password: String,
    pub warehouse: String,
    pub database: String,
    pub schema: String,
    pub table: String,
}

impl Settings {
    /// Reads and validates all required environment variables.
    ///
    /// An unset or empty variable counts as missing. The referenced CSV file
    /// must exist at startup; its contents are only read per tool call.
    pub fn from_env() -> Result<Self> {
        let csv_path = PathBuf::from(required_var("CSV_PATH")?);
        let settings = Settings {
            csv_path: csv_path.clone(),
            account: required_var("SNOWFLAKE_ACCOUNT")?,
            user: required_var("SNOWFLAKE_USER")?,
            password: required_var("SNOWFLAKE_PASSWORD")?,
            warehouse: required_var("SNOWFLAKE_WAREHOUSE")?,
            database: required_var("SNOWFLAKE_DATABASE")?,
            schema: required_var("SNOWFLAKE_SCHEMA")?,
            table: required_var("SNOWFLAKE_TABLE")?,
        };

        if !csv_path.exists() {
            error!(csv_path = %csv_path.display(), "CSV file not found");
            bail!("CSV file not found: {}", csv_path.display());
        }
        info!(csv_path = %csv_path.display(), "CSV file found");

        Ok(settings)
    }
}

impl std::fmt::Debug for Settings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Settings")
            .field("csv_path", &self.csv_path)
            .field("account", &self.account)
            .field("user", &self.user)
            .field("password", &"<redacted>")
            .field("warehouse", &self.warehouse)
            .field("database", &self.database)
            .field("schema", &self.schema)
            .field("table", &self.table)
            .finish()
    }
}

fn required_var(name: &str) -> Result<String> {
    match env::var(name) {
        Ok(value) if !value.is_empty() => Ok(value),
        _ => {
            error!(variable = name, "Missing environment variable");
            bail!("Missing environment variable: {name}")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn debug_output_redacts_the_password() {
        let settings = Settings {
            csv_path: PathBuf::from("/tmp/data.csv"),
            account: "testacct".to_string(),
            user: "tester".to_string(),
            password: "hunter2".to_string(),
            warehouse: "COMPUTE_WH".to_string(),
            database: "ANALYTICS".to_string(),
            schema: "PUBLIC".to_string(),
            table: "ORDERS".to_string(),
        };

        let rendered = format!("{settings:?}");
        assert!(!rendered.contains("hunter2"), "got: {rendered}");
        assert!(rendered.contains("<redacted>"));
        assert!(rendered.contains("testacct"));
    }
}
