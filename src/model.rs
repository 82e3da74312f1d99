use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Selects which collection (and route family) a request targets.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Kind {
    Link,
    Social,
}

impl Kind {
    /// Discriminator stored next to every document.
    pub fn collection(self) -> &'static str {
        match self {
            Kind::Link => "link",
            Kind::Social => "social",
        }
    }

    pub fn path(self) -> &'static str {
        match self {
            Kind::Link => "/api/links",
            Kind::Social => "/api/social",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Kind::Link => "Link",
            Kind::Social => "Social media entry",
        }
    }

    pub fn not_found_message(self) -> String {
        format!("{} not found", self.label())
    }

    pub fn deleted_message(self) -> String {
        format!("{} deleted successfully", self.label())
    }

    pub fn delete_prompt(self) -> &'static str {
        match self {
            Kind::Link => "Are you sure you want to delete this link?",
            Kind::Social => "Are you sure you want to delete this social media link?",
        }
    }
}

impl fmt::Display for Kind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.collection())
    }
}

/// Write-time rules that differ between deployments.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ValidationRules {
    pub link_description_required: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    pub kind: Kind,
    pub fields: Vec<&'static str>,
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let schema = match self.kind {
            Kind::Link => "Link",
            Kind::Social => "Social",
        };
        write!(f, "{schema} validation failed: ")?;
        let missing: Vec<String> = self
            .fields
            .iter()
            .map(|field| format!("{field} is required"))
            .collect();
        f.write_str(&missing.join(", "))
    }
}

impl std::error::Error for ValidationError {}

/// A stored document kind with one schema and one input payload shape.
///
/// `Input` has every field optional: creation demands the required ones,
/// updates replace only what is supplied.
pub trait Entity:
    Serialize + DeserializeOwned + Clone + fmt::Debug + Send + Sync + 'static
{
    const KIND: Kind;

    type Input: Serialize + DeserializeOwned + Clone + Default + fmt::Debug + Send + Sync + 'static;

    fn from_input(input: Self::Input, rules: &ValidationRules) -> Result<Self, ValidationError>;

    fn check_patch(input: &Self::Input, rules: &ValidationRules) -> Result<(), ValidationError>;

    fn to_input(&self) -> Self::Input;
}

struct FieldCheck {
    kind: Kind,
    failed: Vec<&'static str>,
}

impl FieldCheck {
    fn new(kind: Kind) -> Self {
        Self {
            kind,
            failed: Vec::new(),
        }
    }

    fn required(&mut self, field: &'static str, value: Option<String>) -> String {
        match value {
            Some(value) if !value.is_empty() => value,
            _ => {
                self.failed.push(field);
                String::new()
            }
        }
    }

    fn supplied(&mut self, field: &'static str, value: &Option<String>) {
        if matches!(value, Some(value) if value.is_empty()) {
            self.failed.push(field);
        }
    }

    fn finish(self) -> Result<(), ValidationError> {
        if self.failed.is_empty() {
            Ok(())
        } else {
            Err(ValidationError {
                kind: self.kind,
                fields: self.failed,
            })
        }
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Link {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub url: String,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct LinkInput {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

impl Entity for Link {
    const KIND: Kind = Kind::Link;

    type Input = LinkInput;

    fn from_input(input: LinkInput, rules: &ValidationRules) -> Result<Self, ValidationError> {
        let mut check = FieldCheck::new(Kind::Link);
        let name = check.required("name", input.name);
        let description = if rules.link_description_required {
            Some(check.required("description", input.description))
        } else {
            input.description
        };
        let url = check.required("url", input.url);
        check.finish()?;
        Ok(Link {
            name,
            description,
            url,
        })
    }

    fn check_patch(input: &LinkInput, rules: &ValidationRules) -> Result<(), ValidationError> {
        let mut check = FieldCheck::new(Kind::Link);
        check.supplied("name", &input.name);
        if rules.link_description_required {
            check.supplied("description", &input.description);
        }
        check.supplied("url", &input.url);
        check.finish()
    }

    fn to_input(&self) -> LinkInput {
        LinkInput {
            name: Some(self.name.clone()),
            description: self.description.clone(),
            url: Some(self.url.clone()),
        }
    }
}

/// A social-media profile. `platform` is free text; the picklist offered to
/// users lives in [`crate::client::KNOWN_PLATFORMS`] and is not enforced here.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Social {
    pub platform: String,
    pub username: String,
    pub url: String,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SocialInput {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub platform: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

impl Entity for Social {
    const KIND: Kind = Kind::Social;

    type Input = SocialInput;

    fn from_input(input: SocialInput, _rules: &ValidationRules) -> Result<Self, ValidationError> {
        let mut check = FieldCheck::new(Kind::Social);
        let platform = check.required("platform", input.platform);
        let username = check.required("username", input.username);
        let url = check.required("url", input.url);
        check.finish()?;
        Ok(Social {
            platform,
            username,
            url,
        })
    }

    fn check_patch(input: &SocialInput, _rules: &ValidationRules) -> Result<(), ValidationError> {
        let mut check = FieldCheck::new(Kind::Social);
        check.supplied("platform", &input.platform);
        check.supplied("username", &input.username);
        check.supplied("url", &input.url);
        check.finish()
    }

    fn to_input(&self) -> SocialInput {
        SocialInput {
            platform: Some(self.platform.clone()),
            username: Some(self.username.clone()),
            url: Some(self.url.clone()),
        }
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Record<E> {
    pub id: String,
    #[serde(flatten)]
    pub fields: E,
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn link_input(name: Option<&str>, description: Option<&str>, url: Option<&str>) -> LinkInput {
        LinkInput {
            name: name.map(String::from),
            description: description.map(String::from),
            url: url.map(String::from),
        }
    }

    #[test]
    fn link_requires_name_and_url() {
        let err = Link::from_input(link_input(None, None, Some("")), &ValidationRules::default())
            .unwrap_err();
        assert_eq!(err.fields, vec!["name", "url"]);
        assert_eq!(
            err.to_string(),
            "Link validation failed: name is required, url is required"
        );
    }

    #[test]
    fn whitespace_counts_as_a_value() {
        let link = Link::from_input(
            link_input(Some("  "), Some(" "), Some(" ")),
            &ValidationRules {
                link_description_required: true,
            },
        )
        .unwrap();
        assert_eq!(link.name, "  ");

        assert!(Social::check_patch(
            &SocialInput {
                username: Some(" ".into()),
                ..Default::default()
            },
            &ValidationRules::default(),
        )
        .is_ok());
    }

    #[test]
    fn link_description_is_optional_by_default() {
        let link = Link::from_input(
            link_input(Some("Docs"), None, Some("docs.rs")),
            &ValidationRules::default(),
        )
        .unwrap();
        assert_eq!(link.description, None);
        assert_eq!(link.url, "docs.rs");
    }

    #[test]
    fn link_description_rule_is_configurable() {
        let rules = ValidationRules {
            link_description_required: true,
        };
        let err = Link::from_input(link_input(Some("Docs"), Some(""), Some("docs.rs")), &rules)
            .unwrap_err();
        assert_eq!(err.fields, vec!["description"]);

        assert!(Link::check_patch(&link_input(None, Some(""), None), &rules).is_err());
        assert!(
            Link::check_patch(&link_input(None, Some(""), None), &ValidationRules::default())
                .is_ok()
        );
    }

    #[test]
    fn patch_checks_only_supplied_fields() {
        let rules = ValidationRules::default();
        assert!(Link::check_patch(&LinkInput::default(), &rules).is_ok());
        assert!(Link::check_patch(&link_input(Some("New"), None, None), &rules).is_ok());
        let err = Social::check_patch(
            &SocialInput {
                username: Some("".into()),
                ..Default::default()
            },
            &rules,
        )
        .unwrap_err();
        assert_eq!(err.fields, vec!["username"]);
    }

    #[test]
    fn platform_accepts_any_text() {
        let social = Social::from_input(
            SocialInput {
                platform: Some("Mastodon".into()),
                username: Some("ferris".into()),
                url: Some("https://hachyderm.io/@ferris".into()),
            },
            &ValidationRules::default(),
        )
        .unwrap();
        assert_eq!(social.platform, "Mastodon");
    }

    #[test]
    fn input_ignores_server_assigned_fields() {
        let input: LinkInput = serde_json::from_str(
            r#"{"id":"abc","createdAt":"2020-01-01T00:00:00Z","name":"A","url":"a.com","extra":1}"#,
        )
        .unwrap();
        assert_eq!(input, link_input(Some("A"), None, Some("a.com")));
        assert_eq!(
            serde_json::to_value(&input).unwrap(),
            serde_json::json!({"name": "A", "url": "a.com"})
        );
    }

    #[test]
    fn record_flattens_fields() {
        let record = Record {
            id: "x1".to_string(),
            fields: Social {
                platform: "GitHub".into(),
                username: "ferris".into(),
                url: "https://github.com/ferris".into(),
            },
            created_at: DateTime::parse_from_rfc3339("2024-05-01T10:00:00Z")
                .unwrap()
                .with_timezone(&Utc),
        };
        assert_eq!(
            serde_json::to_value(&record).unwrap(),
            serde_json::json!({
                "id": "x1",
                "platform": "GitHub",
                "username": "ferris",
                "url": "https://github.com/ferris",
                "createdAt": "2024-05-01T10:00:00Z"
            })
        );
    }
}
