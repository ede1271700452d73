//! Glue between DuckDB's C API and the table functions
pub(crate) mod bridge;
