// ABOUTME: Input validation run before any container or tool is touched
// ABOUTME: Rejects empty fields and names a tool could mistake for options

use super::models::{DestinationDescriptor, SourceDescriptor};
use crate::error::ClonerError;

pub fn validate_request(
    source: &SourceDescriptor,
    destination: &DestinationDescriptor,
) -> Result<(), ClonerError> {
    require("source host", &source.host)?;
    if source.port == 0 {
        return Err(ClonerError::Validation("source port is required".to_string()));
    }
    require("source database", &source.database)?;
    require("source user", &source.user)?;
    require("source password", &source.password)?;
    require("destination container name", &destination.container_name)?;
    require("destination database", &destination.database)?;

    for (field, value) in [
        ("source host", source.host.as_str()),
        ("source database", source.database.as_str()),
        ("source user", source.user.as_str()),
        ("destination database", destination.database.as_str()),
    ] {
        check_argument(field, value)?;
    }
    check_container_name(&destination.container_name)
}

fn require(field: &str, value: &str) -> Result<(), ClonerError> {
    if value.trim().is_empty() {
        return Err(ClonerError::Validation(format!("{} is required", field)));
    }
    Ok(())
}

/// Values are passed as discrete argv entries; a leading dash would still
/// be parsed as an option by the tool.
fn check_argument(field: &str, value: &str) -> Result<(), ClonerError> {
    if value.starts_with('-') {
        return Err(ClonerError::Validation(format!(
            "{} must not start with '-'",
            field
        )));
    }
    if value.contains('\0') {
        return Err(ClonerError::Validation(format!(
            "{} contains a NUL byte",
            field
        )));
    }
    Ok(())
}

// Docker container names: [a-zA-Z0-9][a-zA-Z0-9_.-]*
fn check_container_name(name: &str) -> Result<(), ClonerError> {
    let mut chars = name.chars();
    let valid_first = chars.next().is_some_and(|c| c.is_ascii_alphanumeric());
    let valid_rest = chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '-'));
    if !(valid_first && valid_rest) {
        return Err(ClonerError::Validation(format!(
            "'{}' is not a valid container name",
            name
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn source() -> SourceDescriptor {
        SourceDescriptor {
            host: "localhost".to_string(),
            port: 5434,
            database: "postgres".to_string(),
            user: "test".to_string(),
            password: "password".to_string(),
        }
    }

    fn destination() -> DestinationDescriptor {
        DestinationDescriptor {
            container_name: "test-cloner-container".to_string(),
            database: "test_clone_db".to_string(),
        }
    }

    #[test]
    fn test_valid_request() {
        assert!(validate_request(&source(), &destination()).is_ok());
    }

    #[test]
    fn test_each_empty_field_rejected() {
        let mutations: [fn(&mut SourceDescriptor, &mut DestinationDescriptor); 7] = [
            |s, _| s.host.clear(),
            |s, _| s.port = 0,
            |s, _| s.database = "  ".to_string(),
            |s, _| s.user.clear(),
            |s, _| s.password.clear(),
            |_, d| d.container_name.clear(),
            |_, d| d.database.clear(),
        ];

        for mutate in mutations {
            let (mut s, mut d) = (source(), destination());
            mutate(&mut s, &mut d);
            assert!(matches!(
                validate_request(&s, &d),
                Err(ClonerError::Validation(_))
            ));
        }
    }

    #[test]
    fn test_option_like_names_rejected() {
        let mut d = destination();
        d.database = "--help".to_string();
        let err = validate_request(&source(), &d).unwrap_err();
        assert!(err.to_string().contains("must not start with '-'"));
    }

    #[test]
    fn test_container_name_charset() {
        let mut d = destination();
        d.container_name = "pg; rm -rf /".to_string();
        assert!(validate_request(&source(), &d).is_err());

        d.container_name = "pg_dev.1-a".to_string();
        assert!(validate_request(&source(), &d).is_ok());
    }
}
