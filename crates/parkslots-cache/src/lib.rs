//! ParkSlots Cache - Local key-value persistence
//!
//! String key-value storage for:
//! - Resolved SharePoint site and list identifiers
//! - The identity provider's account list and active account
//!
//! ## Architecture
//!
//! This crate implements the `IKeyValueStore` port from `parkslots-core`.
//! It is a driven (secondary) adapter in the hexagonal architecture.
//!
//! ## Key Components
//!
//! - [`FileKeyValueStore`] - JSON file on disk, rewritten atomically
//! - [`MemoryKeyValueStore`] - Process-local map for tests and dry runs
//!
//! ## Usage
//!
//! ```no_run
//! use parkslots_cache::FileKeyValueStore;
//! use parkslots_core::ports::IKeyValueStore;
//!
//! # fn example() -> Result<(), parkslots_core::ports::StoreError> {
//! let store = FileKeyValueStore::open(&FileKeyValueStore::default_path())?;
//! store.set_item("greeting", "hello")?;
//! # Ok(())
//! # }
//! ```

pub mod memory;
pub mod store;

pub use memory::MemoryKeyValueStore;
pub use store::FileKeyValueStore;
