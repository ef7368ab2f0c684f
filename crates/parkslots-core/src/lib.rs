//! ParkSlots Core - Domain logic and business rules
//!
//! This crate contains the hexagonal architecture core with:
//! - **Domain entities** - `ParkingSlot`, `ListLocation`, `ResolvedIds`, `Account`
//! - **OData layer** - Filter/orderby parsing, field-name rewriting, query encoding
//! - **Use cases** - `ParkingSlotsService`, `IdentityAdapter`, `AuthSession`
//! - **Port definitions** - Traits for adapters: `IGraphTransport`, `IKeyValueStore`,
//!   `IIdentityProvider`, `IAccessTokenSource`
//!
//! # Architecture
//!
//! This crate follows the hexagonal (ports & adapters) architecture pattern.
//! The domain module contains pure business logic with no external dependencies.
//! Ports define trait interfaces that adapter crates implement.
//! Use cases orchestrate domain entities through port interfaces.

pub mod config;
pub mod domain;
pub mod odata;
pub mod ports;
pub mod usecases;

#[cfg(test)]
pub(crate) mod testing;
