//! Comptoir Core - Shared types library.
//!
//! This crate provides the domain types used by the Comptoir back-office:
//! - orders, their line items, customers and addresses
//! - products, images and variants
//! - dashboard statistics
//! - the `{ success, message, data }` response envelope of the REST backend
//!
//! # Architecture
//!
//! The core crate contains only types and pure functions - no I/O, no caching,
//! no HTTP clients. This keeps it lightweight and allows it to be used anywhere.
//!
//! # Modules
//!
//! - [`types`] - Newtype IDs, statuses and backend DTOs
//! - [`policy`] - Which order statuses staff may edit and which targets the
//!   status picker offers

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod policy;
pub mod types;

pub use types::*;
