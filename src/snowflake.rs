#![doc = "Snowflake integration: bridges the warehouse trait abstraction to the actual REST endpoints used by the vendor drivers."]
//
//! # Snowflake client (concrete `WarehouseConnector`/`WarehouseSession`)
//!
//! Speaks the driver-facing REST surface of a Snowflake account:
//! - `POST /session/v1/login-request`: password login scoped to the
//!   configured warehouse, database and schema; yields a session token.
//! - `POST /queries/v1/query-request`: statement execution with a
//!   per-request UUID, authorised via `Authorization: Snowflake Token="..."`.
//! - `POST /session/logout-request`: best-effort session release.
//!
//! The bulk load is a single multi-row `INSERT INTO … VALUES` statement with
//! escaped string literals; the gateway's own `success` flag is surfaced as
//! [`BulkLoadOutcome::success`], distinct from transport errors.
//!
//! All transport, serialization and error handling is encapsulated here; the
//! upload pipeline only sees the traits in [`crate::contract`].

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::config::Settings;
use crate::contract::{BulkLoadOutcome, WarehouseConnector, WarehouseError, WarehouseSession};
use crate::dataset::Dataset;

const CLIENT_APP_ID: &str = "snowload";

/// Envelope shared by the login and query gateways.
#[derive(Debug, Deserialize)]
struct GatewayResponse<T> {
    success: bool,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    data: Option<T>,
}

#[derive(Debug, Default, Deserialize)]
struct LoginData {
    token: String,
}

#[derive(Debug, Default, Deserialize)]
struct QueryData {
    #[serde(default)]
    rowset: Vec<Vec<serde_json::Value>>,
}

/// Connector for a single Snowflake account, constructed once at startup
/// from the validated [`Settings`].
pub struct SnowflakeConnector {
    client: reqwest::Client,
    base_url: String,
    user: String,
    password: String,
    account: String,
    warehouse: String,
    database: String,
    schema: String,
}

impl SnowflakeConnector {
    pub fn new(settings: &Settings) -> Self {
        SnowflakeConnector {
            client: reqwest::Client::new(),
            base_url: format!("https://{}.snowflakecomputing.com", settings.account),
            user: settings.user.clone(),
            password: settings.password.clone(),
            account: settings.account.clone(),
            warehouse: settings.warehouse.clone(),
            database: settings.database.clone(),
            schema: settings.schema.clone(),
        }
    }
}

#[async_trait]
impl WarehouseConnector for SnowflakeConnector {
    async fn connect(&self) -> Result<Box<dyn WarehouseSession>, WarehouseError> {
        let url = format!(
            "{}/session/v1/login-request?requestId={}&warehouse={}&databaseName={}&schemaName={}",
            self.base_url,
            Uuid::new_v4(),
            self.warehouse,
            self.database,
            self.schema,
        );
        let body = json!({
            "data": {
                "ACCOUNT_NAME": self.account,
                "LOGIN_NAME": self.user,
                "PASSWORD": self.password,
                "CLIENT_APP_ID": CLIENT_APP_ID,
                "CLIENT_APP_VERSION": env!("CARGO_PKG_VERSION"),
            }
        });

        info!(account = %self.account, user = %self.user, "Logging in to Snowflake");
        let response: GatewayResponse<LoginData> = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .await?
            .json()
            .await?;

        if !response.success {
            let message = response
                .message
                .unwrap_or_else(|| "login rejected without message".to_string());
            return Err(WarehouseError::AuthRejected(message));
        }
        let token = response
            .data
            .map(|d| d.token)
            .ok_or_else(|| {
                WarehouseError::MalformedResponse("login response carried no token".to_string())
            })?;

        info!("Snowflake session established");
        Ok(Box::new(SnowflakeSession {
            client: self.client.clone(),
            base_url: self.base_url.clone(),
            token,
        }))
    }
}

/// One authenticated session, opened and closed within a single invocation.
pub struct SnowflakeSession {
    client: reqwest::Client,
    base_url: String,
    token: String,
}

impl SnowflakeSession {
    /// Executes one SQL statement and returns the gateway envelope.
    async fn execute(&self, sql: &str) -> Result<GatewayResponse<QueryData>, WarehouseError> {
        let url = format!(
            "{}/queries/v1/query-request?requestId={}",
            self.base_url,
            Uuid::new_v4()
        );
        debug!(sql, "Executing statement");
        let response = self
            .client
            .post(&url)
            .header(
                reqwest::header::AUTHORIZATION,
                format!("Snowflake Token=\"{}\"", self.token),
            )
            .json(&json!({ "sqlText": sql, "sequenceId": 1 }))
            .send()
            .await?
            .json()
            .await?;
        Ok(response)
    }
}

#[async_trait]
impl WarehouseSession for SnowflakeSession {
    async fn bulk_insert(
        &self,
        table: &str,
        dataset: &Dataset,
    ) -> Result<BulkLoadOutcome, WarehouseError> {
        if dataset.is_empty() {
            // Nothing to send; the vendor loader reports a successful
            // zero-row load in this case and so do we.
            info!(table, "Dataset has no rows; skipping INSERT");
            return Ok(BulkLoadOutcome {
                success: true,
                rows_loaded: 0,
            });
        }

        let sql = build_insert_sql(table, dataset);
        info!(table, rows = dataset.row_count(), "Bulk-inserting dataset");
        let response = self.execute(&sql).await?;
        if !response.success {
            warn!(
                table,
                message = response.message.as_deref().unwrap_or(""),
                "Gateway rejected bulk load"
            );
        }
        Ok(BulkLoadOutcome {
            success: response.success,
            rows_loaded: if response.success {
                dataset.row_count()
            } else {
                0
            },
        })
    }

    async fn count_rows(&self, table: &str) -> Result<i64, WarehouseError> {
        let sql = format!("SELECT COUNT(*) FROM {table}");
        let response = self.execute(&sql).await?;
        if !response.success {
            return Err(WarehouseError::Statement(
                response
                    .message
                    .unwrap_or_else(|| "count query rejected without message".to_string()),
            ));
        }

        let cell = response
            .data
            .as_ref()
            .and_then(|d| d.rowset.first())
            .and_then(|row| row.first())
            .ok_or_else(|| {
                WarehouseError::MalformedResponse("count query returned no rows".to_string())
            })?;
        parse_count(cell)
    }

    async fn close(&self) {
        let url = format!(
            "{}/session/logout-request?requestId={}",
            self.base_url,
            Uuid::new_v4()
        );
        let result = self
            .client
            .post(&url)
            .header(
                reqwest::header::AUTHORIZATION,
                format!("Snowflake Token=\"{}\"", self.token),
            )
            .send()
            .await;
        match result {
            Ok(_) => debug!("Snowflake session closed"),
            Err(err) => warn!(error = %err, "Failed to close Snowflake session"),
        }
    }
}

/// Builds the multi-row `INSERT` statement. Column names are already
/// upper-cased by the pipeline; cells are emitted as escaped string literals
/// and Snowflake coerces them to the target column types.
fn build_insert_sql(table: &str, dataset: &Dataset) -> String {
    let columns = dataset.columns.join(", ");
    let values: Vec<String> = dataset
        .rows
        .iter()
        .map(|row| {
            let cells: Vec<String> = row.iter().map(|cell| quote_literal(cell)).collect();
            format!("({})", cells.join(", "))
        })
        .collect();
    format!(
        "INSERT INTO {table} ({columns}) VALUES {}",
        values.join(", ")
    )
}

/// Single-quoted SQL string literal with embedded quotes doubled.
fn quote_literal(cell: &str) -> String {
    format!("'{}'", cell.replace('\'', "''"))
}

/// The gateway returns rowset cells as JSON strings even for numeric columns.
fn parse_count(cell: &serde_json::Value) -> Result<i64, WarehouseError> {
    match cell {
        serde_json::Value::Number(n) => n.as_i64().ok_or_else(|| {
            WarehouseError::MalformedResponse(format!("count was not an integer: {n}"))
        }),
        serde_json::Value::String(s) => s.parse::<i64>().map_err(|_| {
            WarehouseError::MalformedResponse(format!("count was not an integer: {s}"))
        }),
        other => Err(WarehouseError::MalformedResponse(format!(
            "unexpected count cell: {other}"
        ))),
    }
}
