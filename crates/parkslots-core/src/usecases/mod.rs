//! Use cases (interactors) for ParkSlots
//!
//! This module contains the application use cases that orchestrate
//! domain entities and port interfaces. Use cases are thin coordinators
//! that delegate business rules to domain methods and I/O to ports.
//!
//! ## Use Cases
//!
//! - [`ParkingSlotsService`] - CRUD and queries on the parking slots list
//! - [`IdentityAdapter`] - Account selection, silent-then-interactive tokens
//! - [`AuthSession`] - Startup login and signed-in state

pub mod authenticate;
pub mod parking_slots;
pub mod session;

pub use authenticate::{IdentityAdapter, DEFAULT_SCOPES};
pub use parking_slots::{
    disponibles_options, GetAllOptions, ListError, ParkingSlotsService, DEFAULT_DISPONIBLES_TOP,
    DEFAULT_FIND_TOP,
};
pub use session::AuthSession;
