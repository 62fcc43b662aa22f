//! Service Layer
//!
//! Business logic shared by the ingest endpoint and the tool entry points.

mod ticket_service;

pub use ticket_service::*;
