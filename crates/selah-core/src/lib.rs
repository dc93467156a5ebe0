//! selah-core - Core library for Selah
//!
//! This crate contains the shared models, database layer, repositories,
//! sync conflict resolution, and legacy migration used by all Selah
//! clients.

pub mod clock;
pub mod db;
pub mod error;
pub mod export;
pub mod legacy;
pub mod models;
pub mod repository;
pub mod resolver;
pub mod store;
pub mod sync;
pub mod telemetry;

pub use error::{Error, Result};
pub use models::{Entry, EntryId, EntryKind};
pub use repository::EntryRepository;
pub use store::StoreService;
