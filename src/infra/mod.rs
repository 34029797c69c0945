//! Adapters for the outside world: Postgres, HTTP, telemetry, and media storage.

pub mod db;
pub mod error;
pub mod http;
pub mod telemetry;
pub mod uploads;
