//! repocache - Package Repository Index Cache
//!
//! Keeps channel repodata cached on disk, revalidates it with conditional
//! requests, and splices revalidation headers into the cached index without
//! re-parsing it.

pub mod cache;
pub mod channel;
pub mod cli;
pub mod config;
pub mod error;
pub mod transfer;
pub mod ui;

pub use error::{RepoCacheError, RepoCacheResult};
