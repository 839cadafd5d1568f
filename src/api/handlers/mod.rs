//! API handlers and shared input checks.

pub mod admin;
pub mod auth;
pub mod dashboard;
pub mod health;
pub mod root;
pub mod session;

use regex::Regex;

/// Lightweight email sanity check; the identity service does the real validation.
pub fn valid_email(email: &str) -> bool {
    Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").is_ok_and(|re| re.is_match(email))
}

/// Only same-origin relative paths are followed after sign-in or an email link.
pub fn is_safe_redirect(target: &str) -> bool {
    target.starts_with('/')
        && !target.starts_with("//")
        && !target.contains('\\')
        && !target.chars().any(char::is_control)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_email() {
        assert!(valid_email("ana@example.com"));
        assert!(valid_email("ventas+norte@empresa.com.mx"));
        assert!(!valid_email("ana@"));
        assert!(!valid_email("ana example.com"));
        assert!(!valid_email(""));
    }

    #[test]
    fn test_is_safe_redirect() {
        assert!(is_safe_redirect("/dashboard"));
        assert!(is_safe_redirect("/reset-password?step=2"));
        assert!(!is_safe_redirect("//evil.example.com"));
        assert!(!is_safe_redirect("/\\evil.example.com"));
        assert!(!is_safe_redirect("https://evil.example.com"));
        assert!(!is_safe_redirect("dashboard"));
        assert!(!is_safe_redirect("/ok\r\nSet-Cookie: x=y"));
    }
}
