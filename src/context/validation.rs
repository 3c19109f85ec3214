use serde_json::Value;
use validator::{ValidationError, ValidationErrors, ValidationErrorsKind};

use crate::error::{ApiError, FieldError};

fn param(err: &ValidationError, name: &str) -> Option<String> {
    err.params.get(name).map(|v| match v {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    })
}

/// Message for one failing rule on `field`.
pub fn validation_message(field: &str, err: &ValidationError) -> String {
    if let Some(message) = &err.message {
        return message.to_string();
    }
    let min = param(err, "min");
    let max = param(err, "max");
    match &*err.code {
        "required" => format!("The {field} field is required"),
        "email" => format!("The {field} must be a valid email address"),
        "url" => format!("The {field} must be a valid URL"),
        "length" => match (min, max, param(err, "equal")) {
            (_, _, Some(equal)) => format!("The {field} must be exactly {equal} characters"),
            (Some(min), Some(max), _) => {
                format!("The {field} must be between {min} and {max} characters")
            }
            (Some(min), None, _) => format!("The {field} must be at least {min} characters"),
            (None, Some(max), _) => {
                format!("The {field} must not be greater than {max} characters")
            }
            (None, None, _) => format!("The {field} field is invalid (failed length validation)"),
        },
        "range" => match (min, max) {
            (Some(min), Some(max)) => format!("The {field} must be between {min} and {max}"),
            (Some(min), None) => format!("The {field} must be at least {min}"),
            (None, Some(max)) => format!("The {field} must not be greater than {max}"),
            (None, None) => format!("The {field} field is invalid (failed range validation)"),
        },
        code => format!("The {field} field is invalid (failed {code} validation)"),
    }
}

/// Collapse `validator` output into a 422 with one message per failing field.
///
/// Errors from nested structs and lists are flattened into dotted paths such
/// as `address.city` or `contacts.1.email`.
pub fn validation_error(errors: &ValidationErrors) -> ApiError {
    let mut fields = Vec::new();
    collect_field_errors("", errors, &mut fields);
    ApiError::validation_failed(fields)
}

fn collect_field_errors(prefix: &str, errors: &ValidationErrors, out: &mut Vec<FieldError>) {
    for (field, kind) in errors.errors() {
        let path = if prefix.is_empty() {
            field.to_string()
        } else {
            format!("{prefix}.{field}")
        };
        match kind {
            ValidationErrorsKind::Field(errs) => {
                if let Some(first) = errs.first() {
                    let message = validation_message(&path, first);
                    out.push(FieldError::new(path, message));
                }
            }
            ValidationErrorsKind::Struct(inner) => collect_field_errors(&path, inner, out),
            ValidationErrorsKind::List(items) => {
                for (index, inner) in items {
                    collect_field_errors(&format!("{path}.{index}"), inner, out);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::borrow::Cow;
    use validator::Validate;

    fn error(code: &'static str, params: &[(&'static str, Value)]) -> ValidationError {
        let mut err = ValidationError::new(code);
        for (name, value) in params {
            err.add_param(Cow::Borrowed(*name), value);
        }
        err
    }

    #[test]
    fn test_messages_per_rule() {
        assert_eq!(
            validation_message("name", &error("required", &[])),
            "The name field is required"
        );
        assert_eq!(
            validation_message("email", &error("email", &[])),
            "The email must be a valid email address"
        );
        assert_eq!(
            validation_message("site", &error("url", &[])),
            "The site must be a valid URL"
        );
        assert_eq!(
            validation_message("name", &error("length", &[("min", Value::from(2))])),
            "The name must be at least 2 characters"
        );
        assert_eq!(
            validation_message("bio", &error("length", &[("max", Value::from(8))])),
            "The bio must not be greater than 8 characters"
        );
        assert_eq!(
            validation_message(
                "age",
                &error("range", &[("min", Value::from(1)), ("max", Value::from(5))])
            ),
            "The age must be between 1 and 5"
        );
        assert_eq!(
            validation_message("code", &error("custom_rule", &[])),
            "The code field is invalid (failed custom_rule validation)"
        );
    }

    #[derive(Validate)]
    struct Address {
        #[validate(length(min = 2))]
        city: String,
    }

    #[derive(Validate)]
    struct Registration {
        #[validate(length(min = 1))]
        name: String,
        #[validate(nested)]
        address: Address,
        #[validate(nested)]
        previous: Vec<Address>,
    }

    fn address(city: &str) -> Address {
        Address { city: city.to_string() }
    }

    #[test]
    fn test_nested_errors_are_flattened() {
        let registration = Registration {
            name: String::new(),
            address: address("x"),
            previous: vec![address("Oslo"), address("y")],
        };
        let err = validation_error(&registration.validate().unwrap_err());
        assert_eq!(err.status(), 422);
        let details = err.details();
        assert_eq!(details.len(), 3);
        assert!(details.contains_key("name"));
        assert_eq!(
            details.get("address.city").map(String::as_str),
            Some("The address.city must be at least 2 characters")
        );
        assert!(details.contains_key("previous.1.city"));
    }

    #[test]
    fn test_explicit_message_wins() {
        let err = ValidationError::new("length").with_message(Cow::Borrowed("too short"));
        assert_eq!(validation_message("name", &err), "too short");
    }
}
