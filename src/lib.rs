#![doc = "snowload: load a CSV file into a Snowflake table over an MCP stdio tool."]

//! This crate wires a single remotely invokable tool, `upload_csv_to_snowflake`,
//! into an MCP server speaking JSON-RPC over stdin/stdout. The tool reads the
//! configured CSV file, upper-cases its column names, bulk-inserts the rows into
//! the configured Snowflake table and verifies the post-upload row count.
//!
//! # Modules
//! - [`config`]: the startup configuration gate (env vars, file presence)
//! - [`dataset`]: CSV parsing and column-name normalisation
//! - [`contract`]: warehouse connector/session traits for real and mock clients
//! - [`snowflake`]: the concrete reqwest-based Snowflake REST client
//! - [`upload`]: the upload-and-verify procedure and its result type
//! - [`server`]: the MCP stdio request loop and tool dispatch

pub mod config;
pub mod contract;
pub mod dataset;
pub mod server;
pub mod snowflake;
pub mod upload;
