//! docgate - rate-limited document registration client
//!
//! This crate submits documents to a remote registration endpoint while
//! keeping the number of requests per time window under a fixed limit,
//! however many tasks submit concurrently. Callers over the limit wait for
//! the next window instead of being rejected.

pub mod client;
pub mod config;
pub mod document;
pub mod error;
pub mod ratelimit;

pub use client::DocumentClient;
pub use config::DocgateConfig;
pub use document::{Description, Document, Product};
pub use error::{DocgateError, Result};
pub use ratelimit::{RateLimiter, TimeWindow};
