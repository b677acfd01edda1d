//! Comptoir back-office client library.
//!
//! Everything the back-office needs between the REST backend and the
//! screens:
//! - [`api`] - HTTP client for orders, products and dashboard statistics
//! - [`cache`] - Shared query cache with per-family invalidation and
//!   cancellation of in-flight fetches
//! - [`filters`] - Date, status and search filtering of the order list
//! - [`orders`] - Order synchronisation with optimistic status changes, the
//!   confirmation gate, and the per-session order board
//! - [`catalog`] - Product and variant management
//! - [`telemetry`] - Logging and Sentry setup
//!
//! # Security
//!
//! The API token grants staff-level access to every order and customer
//! record. Never log it; [`config::ApiConfig`] redacts it from `Debug`.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod api;
pub mod cache;
pub mod catalog;
pub mod clock;
pub mod config;
pub mod error;
pub mod filters;
pub mod notify;
pub mod orders;
pub mod telemetry;

pub use api::ApiClient;
pub use cache::QueryCache;
pub use config::AdminConfig;
pub use error::ApiError;
