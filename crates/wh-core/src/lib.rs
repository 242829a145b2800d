//! whistly/crates/wh-core/src/lib.rs
//!
//! The central domain logic and interface definitions for Whistly.

pub mod access;
pub mod accounts;
pub mod birds;
pub mod error;
pub mod models;
pub mod moderation;
pub mod pagination;
pub mod search;
pub mod seeds;
pub mod traits;
pub mod validation;

// Re-exporting for easier access in other crates
pub use error::*;
pub use models::*;
pub use traits::*;
