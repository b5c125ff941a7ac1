//! Contacts, phone number normalization and chat addresses.

use serde::{Deserialize, Serialize};

/// Name used when a contact arrives without one.
pub const DEFAULT_CONTACT_NAME: &str = "Cliente";

/// Domain suffix for one-to-one chats.
pub const USER_CHAT_SUFFIX: &str = "@c.us";

/// Domain suffix for group chats.
pub const GROUP_CHAT_SUFFIX: &str = "@g.us";

/// A recipient of a bulk dispatch.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Contact {
    /// Digits only. Empty means the input had no usable digits.
    pub number: String,
    pub name: String,
    /// Verbatim chat address when the input already carried a chat suffix.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chat_id: Option<String>,
}

impl Contact {
    /// Build a contact from raw input, normalizing the number and falling
    /// back to [`DEFAULT_CONTACT_NAME`] for a missing or blank name.
    pub fn new(raw_number: &str, name: Option<&str>) -> Self {
        Self::with_default_name(raw_number, name, DEFAULT_CONTACT_NAME)
    }

    pub fn with_default_name(raw_number: &str, name: Option<&str>, default_name: &str) -> Self {
        let raw = raw_number.trim();
        let (number, chat_id) = match strip_chat_suffix(raw) {
            Some(local) => {
                let digits = normalize_number(local);
                let chat_id = (!digits.is_empty()).then(|| raw.to_string());
                (digits, chat_id)
            }
            // Any other `@` address (e-mail, unknown domain) is not a phone number.
            None if raw.contains('@') => (String::new(), None),
            None => (normalize_number(raw), None),
        };

        let name = name
            .map(str::trim)
            .filter(|n| !n.is_empty())
            .unwrap_or(default_name)
            .to_string();

        Self { number, name, chat_id }
    }

    /// A contact is dispatchable only if normalization left some digits.
    pub fn is_valid(&self) -> bool {
        !self.number.is_empty()
    }
}

/// Strip everything that is not an ASCII digit.
///
/// `"(11) 98888-7777"` becomes `"11988887777"`.
pub fn normalize_number(raw: &str) -> String {
    raw.chars().filter(|c| c.is_ascii_digit()).collect()
}

/// Local part of a `@c.us` / `@g.us` address.
fn strip_chat_suffix(raw: &str) -> Option<&str> {
    [USER_CHAT_SUFFIX, GROUP_CHAT_SUFFIX]
        .iter()
        .find_map(|suffix| raw.strip_suffix(suffix))
}

/// Canonical recipient identifier: `<countrycode><number>@c.us`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(transparent)]
pub struct ChatAddress(String);

impl ChatAddress {
    /// Parse free-form user input. A chat address with digits before its
    /// `@c.us` / `@g.us` suffix is used as-is; other `@` input is rejected;
    /// anything else is normalized and gets the country prefix.
    /// Returns `None` when no digits remain.
    pub fn parse(raw: &str, country_code: &str) -> Option<Self> {
        let raw = raw.trim();
        if let Some(local) = strip_chat_suffix(raw) {
            return (!normalize_number(local).is_empty()).then(|| Self(raw.to_string()));
        }
        if raw.contains('@') {
            return None;
        }
        let digits = normalize_number(raw);
        if digits.is_empty() {
            return None;
        }
        Some(Self::from_digits(&digits, country_code))
    }

    /// Address for a contact; `None` if its number is empty.
    pub fn for_contact(contact: &Contact, country_code: &str) -> Option<Self> {
        if !contact.is_valid() {
            return None;
        }
        if let Some(chat_id) = &contact.chat_id {
            return Some(Self(chat_id.clone()));
        }
        Some(Self::from_digits(&contact.number, country_code))
    }

    fn from_digits(digits: &str, country_code: &str) -> Self {
        Self(format!("{country_code}{digits}{USER_CHAT_SUFFIX}"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ChatAddress {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}
