use lazy_static::lazy_static;
use regex::Regex;
use std::collections::HashMap;

pub const TEST_EMAIL: &str = "testuser@example.com";
pub const TEST_LOGIN: &str = "testuser";
pub const TEST_FIRST_NAME: &str = "Test";
pub const TEST_LAST_NAME: &str = "User";
pub const TEST_FULL_NAME: &str = "Test User";
pub const REDACTED_TEXT: &str = "Redacted text";
pub const REDACTED_VALUE: &str = "Redacted value";
pub const REDACTED_TOKEN: &str = "REDACTED";
pub const REDACTED_XML_DESCRIPTION: &str = r#"Description="Redacted description""#;

/// Resource types whose names are classification labels rather than user
/// content. Their `Name` survives redaction.
pub const PRESERVED_RESOURCE_TYPES: &[&str] = &[
    "EntityState",
    "EntityType",
    "Priority",
    "Role",
    "Process",
    "Workflow",
];

/// Placeholder resource type for objects that carry no type tag.
pub const UNTYPED_RESOURCE: &str = "Entity";

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum Strategy {
    Email,
    Login,
    FirstName,
    LastName,
    FullName,
    /// Keep the value but move it to the replacement domain.
    Url,
    Text,
}

impl Strategy {
    /// The replacement for fixed strategies; `None` for [`Strategy::Url`],
    /// which rewrites the original value instead.
    pub fn fixed_value(self) -> Option<&'static str> {
        match self {
            Strategy::Email => Some(TEST_EMAIL),
            Strategy::Login => Some(TEST_LOGIN),
            Strategy::FirstName => Some(TEST_FIRST_NAME),
            Strategy::LastName => Some(TEST_LAST_NAME),
            Strategy::FullName => Some(TEST_FULL_NAME),
            Strategy::Text => Some(REDACTED_TEXT),
            Strategy::Url => None,
        }
    }
}

lazy_static! {
    /// Field name (case-exact) to anonymization strategy.
    pub static ref FIELD_STRATEGIES: HashMap<&'static str, Strategy> = {
        let mut strategies = HashMap::new();
        strategies.insert("Description", Strategy::Text);
        strategies.insert("Login", Strategy::Login);
        strategies.insert("Email", Strategy::Email);
        strategies.insert("FirstName", Strategy::FirstName);
        strategies.insert("LastName", Strategy::LastName);
        strategies.insert("FullName", Strategy::FullName);
        strategies.insert("Icon", Strategy::Url);
        strategies.insert("AvatarUri", Strategy::Url);
        strategies.insert("Company", Strategy::Text);
        strategies.insert("Phone", Strategy::Text);
        strategies.insert("Tags", Strategy::Text);
        strategies.insert("CustomField1", Strategy::Text);
        strategies.insert("CustomField2", Strategy::Text);
        strategies.insert("CustomField3", Strategy::Text);
        strategies
    };
    pub static ref EMAIL_REGEX: Regex =
        Regex::new(r"[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}").unwrap();
    pub static ref XML_DESCRIPTION_REGEX: Regex = Regex::new(r#"Description="[^"]*""#).unwrap();
}

pub fn is_name_field(field_name: &str) -> bool {
    field_name == "Name" || field_name == "name"
}

pub fn keeps_name(resource_type: Option<&str>) -> bool {
    resource_type.map_or(false, |rt| PRESERVED_RESOURCE_TYPES.contains(&rt))
}
