//! Scrubs captured simulations of credentials, real domains and personal data
//! while keeping the shape a test might assert on: status codes, field names,
//! and the names of structural resource types.
//!
//! Entity names are replaced by `Test <ResourceType> <N>` with a counter per
//! resource type owned by one [`Redactor`]. Every occurrence takes the next
//! number, so the same source entity seen twice gets two different names;
//! fixtures must not rely on names lining up across pairs.

mod field_rules;
mod text_replace;

pub use field_rules::Strategy;
pub use text_replace::{LiteralReplace, RegexReplace};

use crate::data::{Body, Pair, Simulation};
use crate::util::ACCESS_TOKEN_PARAM;
use field_rules::{
    EMAIL_REGEX, FIELD_STRATEGIES, REDACTED_TOKEN, REDACTED_VALUE, REDACTED_XML_DESCRIPTION,
    TEST_EMAIL, UNTYPED_RESOURCE, XML_DESCRIPTION_REGEX,
};
use serde_json::{Map, Value};
use std::{collections::HashMap, fmt::Debug};
use tracing::debug;

pub const DEFAULT_REPLACEMENT_DOMAIN: &str = "test.tpondemand.com";

pub trait TextRedaction: Debug {
    fn redact(&self, text: &mut String);
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RedactOptions {
    /// The live domain to hide. Empty disables domain substitution.
    pub real_domain: String,
    pub replacement_domain: String,
    /// A credential to scrub from every string it shows up in.
    pub access_token: Option<String>,
}

impl RedactOptions {
    pub fn new<S: Into<String>>(real_domain: S) -> Self {
        Self {
            real_domain: real_domain.into(),
            replacement_domain: String::from(DEFAULT_REPLACEMENT_DOMAIN),
            access_token: None,
        }
    }

    pub fn with_replacement_domain<S: Into<String>>(mut self, replacement_domain: S) -> Self {
        self.replacement_domain = replacement_domain.into();
        self
    }

    pub fn with_access_token<S: Into<String>>(mut self, access_token: S) -> Self {
        self.access_token = Some(access_token.into());
        self
    }
}

/// Per-resource-type counters for generated entity names.
#[derive(Debug, Default, Clone)]
pub struct NameCounters {
    counters: HashMap<String, u32>,
}

impl NameCounters {
    pub fn next(&mut self, resource_type: &str) -> u32 {
        let counter = self.counters.entry(resource_type.to_string()).or_insert(0);
        *counter += 1;
        *counter
    }

    pub fn reset(&mut self) {
        self.counters.clear();
    }
}

type Rules = Vec<Box<dyn TextRedaction + Send + Sync>>;

#[derive(Debug)]
pub struct Redactor {
    options: RedactOptions,
    /// Domain and token substitution, applied to every string that is kept.
    literal_rules: Rules,
    /// Applied to free strings in JSON bodies after the literal rules.
    string_rules: Rules,
    /// Applied to non-JSON bodies after the literal rules.
    markup_rules: Rules,
    names: NameCounters,
}

impl Redactor {
    pub fn new(options: RedactOptions) -> Self {
        let mut literal_rules: Rules = Vec::new();
        if let Some(rule) =
            LiteralReplace::new(options.real_domain.as_str(), options.replacement_domain.as_str())
        {
            literal_rules.push(Box::new(rule));
        }
        if let Some(rule) = options
            .access_token
            .as_deref()
            .and_then(|token| LiteralReplace::new(token, REDACTED_TOKEN))
        {
            literal_rules.push(Box::new(rule));
        }

        let string_rules: Rules = vec![Box::new(RegexReplace::new(&EMAIL_REGEX, TEST_EMAIL))];
        let markup_rules: Rules = vec![Box::new(RegexReplace::new(
            &XML_DESCRIPTION_REGEX,
            REDACTED_XML_DESCRIPTION,
        ))];

        Self {
            options,
            literal_rules,
            string_rules,
            markup_rules,
            names: NameCounters::default(),
        }
    }

    pub fn options(&self) -> &RedactOptions {
        &self.options
    }

    /// Forgets generated names; call between independent capture sessions.
    pub fn reset(&mut self) {
        self.names.reset();
    }

    pub fn redact(&mut self, mut simulation: Simulation) -> Simulation {
        for pair in &mut simulation.pairs {
            self.redact_pair(pair);
        }
        debug!("redacted {} pairs", simulation.pairs.len());
        simulation
    }

    pub fn redact_pair(&mut self, pair: &mut Pair) {
        for (key, value) in pair.request.query.iter_mut() {
            if key == ACCESS_TOKEN_PARAM {
                *value = String::from(REDACTED_TOKEN);
            } else {
                self.replace_literals(value);
            }
        }

        let body = std::mem::take(&mut pair.response.body);
        pair.response.body = self.redact_body(body);

        for value in pair.response.headers.values_mut() {
            self.replace_literals(value);
        }
    }

    pub fn redact_body(&mut self, body: Body) -> Body {
        match body {
            Body::Json(value) => Body::Json(self.redact_value(value)),
            Body::Opaque(mut text) => {
                self.replace_literals(&mut text);
                Self::apply(&self.markup_rules, &mut text);
                Body::Opaque(text)
            }
        }
    }

    fn redact_value(&mut self, value: Value) -> Value {
        match value {
            Value::Object(object) => Value::Object(self.redact_object(object)),
            Value::Array(items) => {
                Value::Array(items.into_iter().map(|item| self.redact_value(item)).collect())
            }
            Value::String(mut text) => {
                self.replace_literals(&mut text);
                Self::apply(&self.string_rules, &mut text);
                Value::String(text)
            }
            other => other,
        }
    }

    fn redact_object(&mut self, object: Map<String, Value>) -> Map<String, Value> {
        let resource_type = Self::resource_type(&object);

        object
            .into_iter()
            .map(|(key, value)| {
                let value = self.redact_field(&key, value, resource_type.as_deref());
                (key, value)
            })
            .collect()
    }

    fn redact_field(
        &mut self,
        field_name: &str,
        value: Value,
        resource_type: Option<&str>,
    ) -> Value {
        let mut text = match value {
            Value::String(text) if !text.is_empty() => text,
            other => return self.redact_value(other),
        };

        if let Some(strategy) = FIELD_STRATEGIES.get(field_name) {
            return Value::String(match strategy.fixed_value() {
                Some(fixed) => String::from(fixed),
                None => {
                    self.replace_literals(&mut text);
                    text
                }
            });
        }

        if field_rules::is_name_field(field_name) && !field_rules::keeps_name(resource_type) {
            let resource_type = resource_type.unwrap_or(UNTYPED_RESOURCE);
            let number = self.names.next(resource_type);
            return Value::String(format!("Test {} {}", resource_type, number));
        }

        if field_name == "Value" && resource_type.is_none() {
            return Value::String(String::from(REDACTED_VALUE));
        }

        self.redact_value(Value::String(text))
    }

    /// The resource type tag of an object; an empty tag counts as untagged.
    fn resource_type(object: &Map<String, Value>) -> Option<String> {
        ["ResourceType", "resourceType"]
            .iter()
            .find_map(|key| object.get(*key).and_then(Value::as_str))
            .filter(|rt| !rt.is_empty())
            .map(String::from)
    }

    fn replace_literals(&self, text: &mut String) {
        Self::apply(&self.literal_rules, text);
    }

    fn apply(rules: &Rules, text: &mut String) {
        for rule in rules {
            rule.redact(text);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{RequestData, ResponseData};
    use serde_json::json;

    const REAL_DOMAIN: &str = "acme.tpondemand.com";

    fn redactor() -> Redactor {
        Redactor::new(RedactOptions::new(REAL_DOMAIN))
    }

    fn json_pair(body: Value) -> Pair {
        Pair::new(
            RequestData::new("GET", "/api/v2/UserStory"),
            ResponseData::new(200, Body::Json(body)),
        )
    }

    fn redact_json(redactor: &mut Redactor, body: Value) -> Value {
        match redactor.redact_body(Body::Json(body)) {
            Body::Json(value) => value,
            Body::Opaque(text) => panic!("expected a JSON body, got {}", text),
        }
    }

    #[test]
    fn test_query_token_and_domain_are_scrubbed() {
        let mut pair = json_pair(json!({}));
        pair.request = RequestData::new("GET", "/api/v1/Generals")
            .with_query("access_token", "s3cr3t")
            .with_query("where", "Url eq 'https://acme.tpondemand.com/x'")
            .with_query("take", "3");

        redactor().redact_pair(&mut pair);

        assert_eq!(pair.request.query["access_token"], "REDACTED");
        assert_eq!(pair.request.query["where"], "Url eq 'https://test.tpondemand.com/x'");
        assert_eq!(pair.request.query["take"], "3");
    }

    #[test]
    fn test_headers_get_domain_substitution() {
        let mut pair = json_pair(json!({}));
        pair.response = pair
            .response
            .with_header("Link", "<https://acme.tpondemand.com/api/v2/UserStory?skip=3>");

        redactor().redact_pair(&mut pair);

        assert_eq!(
            pair.response.headers["Link"],
            "<https://test.tpondemand.com/api/v2/UserStory?skip=3>"
        );
    }

    #[test]
    fn test_contact_fields_use_fixed_placeholders() {
        let body = json!({
            "ResourceType": "GeneralUser",
            "Email": "jane@corp.example.org",
            "Login": "jdoe",
            "FirstName": "Jane",
            "LastName": "Doe",
            "FullName": "Jane Doe",
            "Phone": "+1 555 0100",
            "Company": "Corp",
            "Tags": "vip, beta",
            "CustomField2": "internal",
            "AvatarUri": "https://acme.tpondemand.com/avatar/42",
            "Id": 42
        });

        let redacted = redact_json(&mut redactor(), body);

        assert_eq!(
            redacted,
            json!({
                "ResourceType": "GeneralUser",
                "Email": "testuser@example.com",
                "Login": "testuser",
                "FirstName": "Test",
                "LastName": "User",
                "FullName": "Test User",
                "Phone": "Redacted text",
                "Company": "Redacted text",
                "Tags": "Redacted text",
                "CustomField2": "Redacted text",
                "AvatarUri": "https://test.tpondemand.com/avatar/42",
                "Id": 42
            })
        );
    }

    #[test]
    fn test_empty_and_non_string_table_fields_pass_through() {
        let body = json!({"Description": "", "Tags": null, "Email": 7});

        let redacted = redact_json(&mut redactor(), body.clone());

        assert_eq!(redacted, body);
    }

    #[test]
    fn test_structural_names_are_preserved() {
        let body = json!({
            "ResourceType": "UserStory",
            "Name": "Checkout is slow",
            "EntityState": {"ResourceType": "EntityState", "Name": "In Progress"},
            "Project": {"ResourceType": "Project", "Name": "Payments"},
            "Priority": {"resourceType": "Priority", "name": "Must Have"}
        });

        let redacted = redact_json(&mut redactor(), body);

        assert_eq!(redacted["Name"], "Test UserStory 1");
        assert_eq!(redacted["EntityState"]["Name"], "In Progress");
        assert_eq!(redacted["Project"]["Name"], "Test Project 1");
        assert_eq!(redacted["Priority"]["name"], "Must Have");
    }

    #[test]
    fn test_untyped_names_use_entity_placeholder() {
        let redacted = redact_json(&mut redactor(), json!({"items": [{"id": 1, "name": "Foo"}]}));

        assert_eq!(redacted["items"][0]["name"], "Test Entity 1");
    }

    #[test]
    fn test_repeated_entities_get_distinct_names() {
        let mut redactor = redactor();
        let story = json!({"ResourceType": "UserStory", "Id": 7, "Name": "Same story"});
        let simulation = Simulation::new(vec![json_pair(story.clone()), json_pair(story)]);

        let redacted = redactor.redact(simulation);

        let names: Vec<_> = redacted
            .pairs
            .iter()
            .map(|pair| match &pair.response.body {
                Body::Json(value) => value["Name"].clone(),
                Body::Opaque(_) => Value::Null,
            })
            .collect();
        assert_eq!(names, vec![json!("Test UserStory 1"), json!("Test UserStory 2")]);
    }

    #[test]
    fn test_reset_restarts_numbering() {
        let mut redactor = redactor();
        let project = json!({"ResourceType": "Project", "Name": "Payments"});

        redact_json(&mut redactor, project.clone());
        redactor.reset();
        let redacted = redact_json(&mut redactor, project);

        assert_eq!(redacted["Name"], "Test Project 1");
    }

    #[test]
    fn test_custom_field_values_are_replaced() {
        let body = json!({
            "ResourceType": "Bug",
            "CustomFields": [
                {"Name": "Customer", "Type": "Text", "Value": "Globex"},
                {"Name": "Budget", "Type": "Number", "Value": 1200}
            ],
            "Value": "typed objects keep their Value"
        });

        let redacted = redact_json(&mut redactor(), body);

        assert_eq!(redacted["CustomFields"][0]["Value"], "Redacted value");
        assert_eq!(redacted["CustomFields"][0]["Name"], "Test Entity 1");
        assert_eq!(redacted["CustomFields"][1]["Value"], 1200);
        assert_eq!(redacted["CustomFields"][1]["Name"], "Test Entity 2");
        assert_eq!(redacted["Value"], "typed objects keep their Value");
    }

    #[test]
    fn test_free_strings_lose_emails_and_domain() {
        let body = json!({
            "Comment": "ping bob@corp.io on https://acme.tpondemand.com/entity/5",
            "Links": ["https://acme.tpondemand.com/a", 3, true]
        });

        let redacted = redact_json(&mut redactor(), body);

        assert_eq!(
            redacted,
            json!({
                "Comment": "ping testuser@example.com on https://test.tpondemand.com/entity/5",
                "Links": ["https://test.tpondemand.com/a", 3, true]
            })
        );
    }

    #[test]
    fn test_access_token_is_scrubbed_everywhere() {
        let mut redactor =
            Redactor::new(RedactOptions::new(REAL_DOMAIN).with_access_token("tok-123"));

        let redacted = redact_json(
            &mut redactor,
            json!({"Next": "https://acme.tpondemand.com/api/v2/Bug?access_token=tok-123&skip=3"}),
        );

        assert_eq!(
            redacted["Next"],
            "https://test.tpondemand.com/api/v2/Bug?access_token=REDACTED&skip=3"
        );
    }

    #[test]
    fn test_opaque_bodies_keep_structure() {
        let xml = r#"<ResourceMetadataDescription Name="UserStory" Description="Secret plans" Uri="https://acme.tpondemand.com/api/v1/UserStories"><Field Name="Effort" Description="Hours"/></ResourceMetadataDescription>"#;

        let redacted = redactor().redact_body(Body::Opaque(xml.to_string()));

        assert_eq!(
            redacted,
            Body::Opaque(
                r#"<ResourceMetadataDescription Name="UserStory" Description="Redacted description" Uri="https://test.tpondemand.com/api/v1/UserStories"><Field Name="Effort" Description="Redacted description"/></ResourceMetadataDescription>"#
                    .to_string()
            )
        );
    }

    #[test]
    fn test_empty_real_domain_disables_substitution() {
        let mut redactor = Redactor::new(RedactOptions::new(""));

        let redacted = redact_json(&mut redactor, json!({"Url": "https://acme.tpondemand.com"}));

        assert_eq!(redacted["Url"], "https://acme.tpondemand.com");
    }

    #[test]
    fn test_key_order_is_preserved() {
        let redacted = redact_json(&mut redactor(), json!({"z": 1, "a": 2, "m": 3}));

        let keys: Vec<_> = redacted.as_object().unwrap().keys().cloned().collect();
        assert_eq!(keys, vec!["z", "a", "m"]);
    }
}
