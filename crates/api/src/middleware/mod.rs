//! Authentication and authorization extractors.
//!
//! - [`auth::AuthUser`] -- Resolves the active user behind a JWT Bearer token.
//! - [`rbac::RequireUser`] -- Requires `ROLE_USER`.
//! - [`rbac::RequireAppEditor`] -- Requires `ROLE_EDIT_APPS`.
//! - [`rbac::RequireFlowEditor`] -- Requires `ROLE_EDIT_FLOWS`.
//! - [`rbac::RequireAdmin`] -- Requires `ROLE_ADMIN`.

pub mod auth;
pub mod rbac;
