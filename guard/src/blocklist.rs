use serde::{Deserialize, Serialize};

pub const DEFAULT_DOMAINS: &str = "gmail.com,yahoo.com,gmx.com,gmx.de,icloud.com,mail.com,mail.ru,protonmail.com,yandex.com,tutanota.com,fastmail.com,aol.com";

pub const DEFAULT_MESSAGE: &str = "Free email addresses are not allowed.";

/// Disallowed domains plus the message shown when a submission hits one.
///
/// Domains are kept in the order the administrator entered them, trimmed but
/// otherwise untouched. Matching is literal and case-sensitive.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockListConfig {
    pub domains: Vec<String>,
    pub rejection_message: String,
}

impl Default for BlockListConfig {
    fn default() -> Self {
        BlockListConfig::from_csv(DEFAULT_DOMAINS, DEFAULT_MESSAGE)
    }
}

impl BlockListConfig {
    pub fn new(domains: Vec<String>, rejection_message: impl Into<String>) -> Self {
        BlockListConfig {
            domains: domains
                .into_iter()
                .map(|d| d.trim().to_string())
                .filter(|d| !d.is_empty())
                .collect(),
            rejection_message: rejection_message.into(),
        }
    }

    /// Parses the comma-separated form administrators type into the settings
    /// page. Blank entries are dropped so an empty list blocks nothing.
    pub fn from_csv(domains: &str, rejection_message: impl Into<String>) -> Self {
        Self::new(
            domains.split(',').map(str::to_string).collect(),
            rejection_message,
        )
    }

    pub fn domains_csv(&self) -> String {
        self.domains.join(",")
    }

    pub fn contains(&self, domain: &str) -> bool {
        self.domains.iter().any(|d| d == domain)
    }
}
