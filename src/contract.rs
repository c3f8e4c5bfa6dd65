//! # contract: warehouse connector and session interfaces
//!
//! This module defines the traits the upload procedure depends on, decoupling
//! it from the concrete Snowflake client so tests can inject deterministic
//! mocks.
//!
//! ## Interface & Extensibility
//! - [`WarehouseConnector`] establishes one session per invocation.
//! - [`WarehouseSession`] covers the vendor driver surface the procedure
//!   needs: a bulk loader that reports a success flag distinct from transport
//!   errors, a row-count query, and explicit release.
//! - Implement both traits to target another warehouse backend.
//!
//! ## Mocking & Testing
//! Both traits are annotated for `mockall`, exported under the
//! `test-export-mocks` feature so integration tests can generate mocks.

use async_trait::async_trait;
#[cfg(any(test, feature = "test-export-mocks"))]
use mockall::automock;
use thiserror::Error;

use crate::dataset::Dataset;

/// Transport- and statement-level failures from a warehouse client.
#[derive(Debug, Error)]
pub enum WarehouseError {
    #[error("login rejected: {0}")]
    AuthRejected(String),
    #[error("transport failure: {0}")]
    Transport(String),
    #[error("statement failed: {0}")]
    Statement(String),
    #[error("malformed response: {0}")]
    MalformedResponse(String),
}

impl From<reqwest::Error> for WarehouseError {
    fn from(err: reqwest::Error) -> Self {
        WarehouseError::Transport(err.to_string())
    }
}

/// Outcome of a bulk load. `success` is the loader's own acceptance flag,
/// reported separately from errors: a reachable server can still reject a
/// load without raising a transport failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BulkLoadOutcome {
    pub success: bool,
    pub rows_loaded: usize,
}

/// An established warehouse session, scoped to a single invocation.
#[cfg_attr(any(test, feature = "test-export-mocks"), automock)]
#[async_trait]
pub trait WarehouseSession: Send + Sync {
    /// Inserts all dataset rows into `table` in one batched statement.
    async fn bulk_insert(
        &self,
        table: &str,
        dataset: &Dataset,
    ) -> Result<BulkLoadOutcome, WarehouseError>;

    /// Returns `SELECT COUNT(*)` for `table` on this session.
    async fn count_rows(&self, table: &str) -> Result<i64, WarehouseError>;

    /// Releases the session. Best-effort: failures are logged, not surfaced.
    async fn close(&self);
}

/// Factory for warehouse sessions. Each invocation of the upload procedure
/// connects afresh; sessions are never shared across invocations.
#[cfg_attr(any(test, feature = "test-export-mocks"), automock)]
#[async_trait]
pub trait WarehouseConnector: Send + Sync {
    async fn connect(&self) -> Result<Box<dyn WarehouseSession>, WarehouseError>;
}
