//! Integration tests for parkslots-graph
//!
//! Uses wiremock to simulate Microsoft Graph and the identity platform and
//! verifies end-to-end behavior of the GraphClient, the parking slots
//! service running over it, and the OAuth identity provider.

mod common;

mod test_errors;
mod test_identity;
mod test_parking_slots;
