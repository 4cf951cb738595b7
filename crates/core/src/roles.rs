//! Well-known role name constants and the role policy.
//!
//! These must match the seed data in `20260301000002_create_users_and_roles.sql`.

/// Read access to apps, flows and technologies.
pub const ROLE_USER: &str = "ROLE_USER";
/// Create, update and delete apps.
pub const ROLE_EDIT_APPS: &str = "ROLE_EDIT_APPS";
/// Create, update and delete flows and technologies.
pub const ROLE_EDIT_FLOWS: &str = "ROLE_EDIT_FLOWS";
/// Satisfies every role requirement.
pub const ROLE_ADMIN: &str = "ROLE_ADMIN";

/// Returns `true` when the granted role names satisfy `required`.
///
/// `ROLE_ADMIN` is a superset of every other role.
pub fn has_role<S: AsRef<str>>(granted: &[S], required: &str) -> bool {
    granted
        .iter()
        .any(|r| r.as_ref() == required || r.as_ref() == ROLE_ADMIN)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exact_role_is_granted() {
        assert!(has_role(&[ROLE_USER], ROLE_USER));
    }

    #[test]
    fn missing_role_is_denied() {
        assert!(!has_role(&[ROLE_USER], ROLE_EDIT_APPS));
        assert!(!has_role::<&str>(&[], ROLE_USER));
    }

    #[test]
    fn admin_satisfies_everything() {
        let granted = vec![ROLE_ADMIN.to_string()];
        assert!(has_role(&granted, ROLE_USER));
        assert!(has_role(&granted, ROLE_EDIT_APPS));
        assert!(has_role(&granted, ROLE_EDIT_FLOWS));
    }

    #[test]
    fn role_names_are_case_sensitive() {
        assert!(!has_role(&["role_user"], ROLE_USER));
    }
}
