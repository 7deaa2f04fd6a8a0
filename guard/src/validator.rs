use crate::blocklist::BlockListConfig;
use crate::form::{Field, Form};

/// Verdict for a single field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Allow,
    /// Carries the message the host shows next to the rejected field.
    Deny(String),
}

impl Outcome {
    pub fn is_valid(&self) -> bool {
        matches!(self, Outcome::Allow)
    }

    pub fn message(&self) -> Option<&str> {
        match self {
            Outcome::Allow => None,
            Outcome::Deny(message) => Some(message),
        }
    }
}

/// Returns whatever follows the last `@`, or `None` when there is no `@`.
///
/// No normalization happens here: `user@Gmail.com` yields `Gmail.com`.
pub fn extract_domain(email: &str) -> Option<&str> {
    email.rsplit_once('@').map(|(_, domain)| domain)
}

/// Checks one submitted address against the block-list.
pub fn check_email(email: &str, config: &BlockListConfig) -> Outcome {
    match extract_domain(email) {
        Some(domain) if config.contains(domain) => Outcome::Deny(config.rejection_message.clone()),
        _ => Outcome::Allow,
    }
}

/// Full decision for a field of `form`: only email fields on forms with the
/// guard switched on are ever denied.
pub fn check_field(form: &Form, field: &Field, config: &BlockListConfig) -> Outcome {
    if !form.is_enabled() || !field.is_email() {
        return Outcome::Allow;
    }
    check_email(&field.value, config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blocklist::DEFAULT_MESSAGE;
    use crate::form::FieldType;

    fn config() -> BlockListConfig {
        BlockListConfig::from_csv("gmail.com,yahoo.com", DEFAULT_MESSAGE)
    }

    fn enabled_form() -> Form {
        let mut form = Form::new("42");
        form.set_enabled(true);
        form
    }

    #[test]
    fn test_extract_domain_normal() {
        assert_eq!(extract_domain("user@gmail.com"), Some("gmail.com"));
    }

    #[test]
    fn test_extract_domain_uses_last_at() {
        assert_eq!(extract_domain("\"a@b\"@yahoo.com"), Some("yahoo.com"));
    }

    #[test]
    fn test_extract_domain_no_at() {
        assert_eq!(extract_domain("gmail.com"), None);
        assert_eq!(extract_domain(""), None);
    }

    #[test]
    fn test_extract_domain_trailing_at() {
        assert_eq!(extract_domain("user@"), Some(""));
    }

    #[test]
    fn test_blocked_domain_denied() {
        let outcome = check_field(&enabled_form(), &Field::email("user@gmail.com"), &config());
        assert_eq!(outcome, Outcome::Deny(DEFAULT_MESSAGE.to_string()));
        assert!(!outcome.is_valid());
        assert_eq!(outcome.message(), Some(DEFAULT_MESSAGE));
    }

    #[test]
    fn test_other_domain_allowed() {
        let outcome = check_field(&enabled_form(), &Field::email("user@company.com"), &config());
        assert_eq!(outcome, Outcome::Allow);
        assert_eq!(outcome.message(), None);
    }

    #[test]
    fn test_disabled_form_allows_everything() {
        let form = Form::new("42");
        assert!(check_field(&form, &Field::email("user@gmail.com"), &config()).is_valid());
    }

    #[test]
    fn test_non_email_field_ignored() {
        let field = Field::new(FieldType::Text, "user@gmail.com");
        assert!(check_field(&enabled_form(), &field, &config()).is_valid());
    }

    #[test]
    fn test_missing_at_never_matches() {
        assert!(check_email("gmail.com", &config()).is_valid());
    }

    #[test]
    fn test_case_sensitive_match() {
        assert!(check_email("user@GMAIL.COM", &config()).is_valid());
        assert!(check_email("user@sub.gmail.com", &config()).is_valid());
    }

    #[test]
    fn test_empty_list_allows_everything() {
        let cfg = BlockListConfig::from_csv("", DEFAULT_MESSAGE);
        assert!(check_email("user@gmail.com", &cfg).is_valid());
        assert!(check_email("user@", &cfg).is_valid());
    }

    #[test]
    fn test_custom_message() {
        let cfg = BlockListConfig::from_csv("gmail.com", "Use your work address.");
        assert_eq!(
            check_email("user@gmail.com", &cfg).message(),
            Some("Use your work address.")
        );
    }

    #[test]
    fn test_verdict_is_repeatable() {
        let form = enabled_form();
        let field = Field::email("user@yahoo.com");
        let cfg = config();
        assert_eq!(check_field(&form, &field, &cfg), check_field(&form, &field, &cfg));
    }
}
