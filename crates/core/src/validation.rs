//! Bridge from `validator` derive checks to [`CoreError::Validation`].

use validator::{Validate, ValidationErrors, ValidationErrorsKind};

use crate::error::CoreError;

/// Run the derived validation rules of `input`.
///
/// Field errors are flattened into a single message sorted by field name,
/// e.g. `"description: too long; name: must not be empty"`.
pub fn validate_input<T: Validate>(input: &T) -> Result<(), CoreError> {
    input
        .validate()
        .map_err(|errors| CoreError::Validation(describe(&errors)))
}

/// Reject a value that is empty once surrounding whitespace is removed.
pub fn require_non_blank(field: &str, value: &str) -> Result<(), CoreError> {
    if value.trim().is_empty() {
        return Err(CoreError::Validation(format!("{field}: must not be blank")));
    }
    Ok(())
}

fn describe(errors: &ValidationErrors) -> String {
    let mut messages: Vec<String> = Vec::new();
    collect(errors, "", &mut messages);
    messages.sort();
    messages.join("; ")
}

fn collect(errors: &ValidationErrors, prefix: &str, out: &mut Vec<String>) {
    for (field, kind) in errors.errors() {
        let path = if prefix.is_empty() {
            field.to_string()
        } else {
            format!("{prefix}.{field}")
        };
        match kind {
            ValidationErrorsKind::Field(list) => {
                for err in list {
                    let msg = err
                        .message
                        .as_ref()
                        .map(|m| m.to_string())
                        .unwrap_or_else(|| err.code.to_string());
                    out.push(format!("{path}: {msg}"));
                }
            }
            ValidationErrorsKind::Struct(inner) => collect(inner, &path, out),
            ValidationErrorsKind::List(items) => {
                for (idx, inner) in items {
                    collect(inner, &format!("{path}[{idx}]"), out);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;
    use validator::Validate;

    use super::*;

    #[derive(Validate)]
    struct Named {
        #[validate(length(min = 1, message = "must not be empty"))]
        name: String,
        #[validate(length(max = 3))]
        code: String,
    }

    #[test]
    fn valid_input_passes() {
        let input = Named {
            name: "CRM".into(),
            code: "ab".into(),
        };
        assert!(validate_input(&input).is_ok());
    }

    #[test]
    fn blank_values_are_rejected() {
        assert!(require_non_blank("name", "CRM").is_ok());
        assert_matches!(
            require_non_blank("name", "   "),
            Err(CoreError::Validation(ref msg)) if msg == "name: must not be blank"
        );
    }

    #[test]
    fn errors_are_flattened_and_sorted() {
        let input = Named {
            name: String::new(),
            code: "abcd".into(),
        };
        let err = validate_input(&input).unwrap_err();
        assert_matches!(err, CoreError::Validation(ref msg)
            if msg == "code: length; name: must not be empty");
    }
}
