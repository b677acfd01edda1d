//! Core types for Comptoir.
//!
//! This module provides type-safe wrappers and DTOs for the back-office domain.

pub mod dashboard;
pub mod id;
pub mod order;
pub mod product;
pub mod response;
pub mod status;

pub use dashboard::*;
pub use id::*;
pub use order::*;
pub use product::*;
pub use response::{ApiResponse, ListMeta};
pub use status::*;
