//! Field checks applied before a record is created or patched.

use crate::error::CrmError;

pub const MIN_PASSWORD_LEN: usize = 6;

/// Require `value` to hold at least `min` characters once trimmed.
pub fn min_chars(field: &'static str, value: &str, min: usize) -> Result<(), CrmError> {
    if value.trim().chars().count() < min {
        return Err(CrmError::invalid(
            field,
            format!("deve ter pelo menos {min} caracteres"),
        ));
    }
    Ok(())
}

/// Loose syntactic e-mail check: one `@`, non-empty local part, a dotted domain
/// and no whitespace.
pub fn email(field: &'static str, value: &str) -> Result<(), CrmError> {
    let invalid = || CrmError::invalid(field, "e-mail inválido");

    if value.chars().any(char::is_whitespace) {
        return Err(invalid());
    }
    let (local, domain) = value.split_once('@').ok_or_else(invalid)?;
    if local.is_empty() || domain.contains('@') {
        return Err(invalid());
    }
    let dotted = domain
        .split_once('.')
        .map(|(head, tail)| !head.is_empty() && !tail.is_empty() && !tail.ends_with('.'))
        .unwrap_or(false);
    if !dotted {
        return Err(invalid());
    }
    Ok(())
}

pub fn password(value: &str) -> Result<(), CrmError> {
    if value.chars().count() < MIN_PASSWORD_LEN {
        return Err(CrmError::invalid(
            "password",
            format!("a senha deve ter pelo menos {MIN_PASSWORD_LEN} caracteres"),
        ));
    }
    Ok(())
}

/// Case-insensitive e-mail comparison used for uniqueness and login lookup.
pub fn same_email(a: &str, b: &str) -> bool {
    a.trim().to_lowercase() == b.trim().to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_plain_addresses() {
        assert!(email("email", "maria@nexaautomations.com").is_ok());
        assert!(email("email", "a.b+c@sub.example.com.br").is_ok());
    }

    #[test]
    fn rejects_malformed_addresses() {
        for bad in ["", "maria", "@x.com", "maria@", "maria@local", "ma ria@x.com", "a@b@c.com", "a@x."] {
            assert!(email("email", bad).is_err(), "{bad} should be rejected");
        }
    }

    #[test]
    fn min_chars_ignores_surrounding_whitespace() {
        assert!(min_chars("title", "  ab  ", 3).is_err());
        assert!(min_chars("title", "abc", 3).is_ok());
    }

    #[test]
    fn email_match_is_case_insensitive() {
        assert!(same_email("ADMIN@NEXAAUTOMATIONS.COM", "admin@nexaautomations.com"));
        assert!(!same_email("admin@nexa.com", "maria@nexa.com"));
    }

    #[test]
    fn short_password_is_rejected() {
        assert!(password("12345").is_err());
        assert!(password("123456").is_ok());
    }
}
