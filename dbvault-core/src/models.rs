//! Core data models for `dbvault`
//!
//! This module defines the connection identifier and the credential bundle
//! stored for each connection.

mod connection_id;
mod credentials;

pub use connection_id::ConnectionId;
pub use credentials::CredentialBundle;
