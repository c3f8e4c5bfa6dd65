//! High-level pipeline: read CSV, normalise columns, connect, bulk-insert, verify.
//!
//! This module orchestrates the single tool operation. The flow is strictly
//! linear with one terminal success state and one terminal error state per
//! invocation:
//!   - Parse the configured CSV file into a [`Dataset`]
//!   - Upper-case every column name before any transmission
//!   - Open a fresh warehouse session via the injected [`WarehouseConnector`]
//!   - Bulk-insert the dataset into the configured table
//!   - Verify with `SELECT COUNT(*)` on the same session
//!
//! # Error Handling
//! Nothing here crashes the hosting process. Every failure is classified into
//! [`UploadError`] and mapped to the wire-level [`UploadResult`] at the
//! boundary; callers always receive a well-formed result object.
//!
//! The session is released on every exit path once the connect step has
//! succeeded, including load rejection and verification failure.

use serde::Serialize;
use tracing::{error, info};

use crate::config::Settings;
use crate::contract::{WarehouseConnector, WarehouseSession};
use crate::dataset::Dataset;

/// The sole externally observable artifact of the procedure.
///
/// Serialises to `{"status":"success","rows_uploaded":N,"total_rows_in_table":T}`
/// or `{"status":"error","message":"..."}`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum UploadResult {
    Success {
        rows_uploaded: usize,
        total_rows_in_table: i64,
    },
    Error {
        message: String,
    },
}

impl UploadResult {
    pub fn is_error(&self) -> bool {
        matches!(self, UploadResult::Error { .. })
    }
}

/// Closed classification of upload failures, mapped to the two wire-level
/// statuses at the boundary. The stage tag is informational: it only shapes
/// the human-readable message.
#[derive(Debug)]
pub enum UploadError {
    Parse(String),
    Connect(String),
    LoadRejected,
    Verify(String),
    Unexpected(String),
}

impl UploadError {
    fn into_message(self) -> String {
        match self {
            UploadError::Parse(cause) => format!("Error reading CSV: {cause}"),
            UploadError::Connect(cause) => format!("Connection failed: {cause}"),
            UploadError::LoadRejected => "Upload to Snowflake failed".to_string(),
            UploadError::Verify(cause) | UploadError::Unexpected(cause) => {
                format!("Upload error: {cause}")
            }
        }
    }
}

/// Runs one upload invocation and maps the outcome to the wire result.
///
/// Re-running re-uploads the same file: each successful call appends the
/// file's rows again, so the remote total grows per call.
pub async fn run_upload(settings: &Settings, connector: &dyn WarehouseConnector) -> UploadResult {
    info!(table = %settings.table, "Starting CSV upload");
    match upload(settings, connector).await {
        Ok((rows_uploaded, total_rows_in_table)) => {
            info!(rows_uploaded, total_rows_in_table, "Upload succeeded");
            UploadResult::Success {
                rows_uploaded,
                total_rows_in_table,
            }
        }
        Err(err) => {
            error!(error = ?err, "Upload failed");
            UploadResult::Error {
                message: err.into_message(),
            }
        }
    }
}

async fn upload(
    settings: &Settings,
    connector: &dyn WarehouseConnector,
) -> Result<(usize, i64), UploadError> {
    let mut dataset = Dataset::from_csv_path(&settings.csv_path)
        .map_err(|e| UploadError::Parse(e.to_string()))?;
    dataset.normalize_columns();

    let session = connector
        .connect()
        .await
        .map_err(|e| UploadError::Connect(e.to_string()))?;
    info!("Connected to Snowflake");

    // Release the session on every path past this point, not only on success.
    let result = load_and_verify(session.as_ref(), &settings.table, &dataset).await;
    session.close().await;
    result
}

async fn load_and_verify(
    session: &dyn WarehouseSession,
    table: &str,
    dataset: &Dataset,
) -> Result<(usize, i64), UploadError> {
    let outcome = session
        .bulk_insert(table, dataset)
        .await
        .map_err(|e| UploadError::Unexpected(e.to_string()))?;
    if !outcome.success {
        error!(table, "Bulk load rejected by Snowflake");
        return Err(UploadError::LoadRejected);
    }
    info!(rows = outcome.rows_loaded, table, "Bulk load accepted");

    // Sanity/observability step: the authoritative post-upload total. Its
    // value is reported as-is and never triggers a rollback.
    let total = session
        .count_rows(table)
        .await
        .map_err(|e| UploadError::Verify(e.to_string()))?;

    Ok((outcome.rows_loaded, total))
}
