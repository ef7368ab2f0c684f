//! Domain entities
//!
//! This module contains the core domain types for ParkSlots:
//! - The parking slot record and its create/patch payloads
//! - List location and resolved site/list identifiers
//! - Identity-provider accounts
//! - Domain-specific error types

pub mod account;
pub mod errors;
pub mod location;
pub mod parking_slot;

// Re-export commonly used types
pub use account::Account;
pub use errors::DomainError;
pub use location::{ListLocation, ResolvedIds};
pub use parking_slot::{NewParkingSlot, ParkingSlot, ParkingSlotPatch};
