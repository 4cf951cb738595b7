//! Domain model structs and DTOs.
//!
//! Each submodule contains:
//! - A `FromRow` + `Serialize` entity struct matching the database row
//! - A `Deserialize` create DTO for inserts
//! - A `Deserialize` update DTO (all `Option` fields) for patches
//!
//! JSON payloads use camelCase keys to match the frontend contract.

pub mod app;
pub mod flow;
pub mod role;
pub mod search_outbox;
pub mod techno;
pub mod user;
