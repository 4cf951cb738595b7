//! Domain primitives shared by every appflow crate.
//!
//! Nothing in here touches the database, the network or the HTTP layer, so
//! the rules can be unit tested in isolation and reused by the API and any
//! future tooling.

pub mod error;
pub mod flow;
pub mod roles;
pub mod search;
pub mod types;
pub mod validation;
