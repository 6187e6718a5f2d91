//! Middleware for observability.
//!
//! This module provides:
//! - Request logging with latency tracking and request ids

pub mod logging;

pub use logging::{request_logging, REQUEST_ID_HEADER};
