//! Raw issue payloads as returned by `GET /api/issues`.
//!
//! YouTrack does not guarantee which custom fields exist on an issue nor the
//! shape of their values, so everything here is decoded leniently: a value
//! of the wrong type becomes `None`/[`CustomFieldValue::Absent`] instead of
//! failing the whole response.

use serde::de::Deserializer;
use serde::Deserialize;
use serde_json::Value;

#[derive(Debug, Deserialize, Clone, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RawIssue {
    #[serde(default, deserialize_with = "deserialize_string_field")]
    pub id_readable: Option<String>,
    #[serde(default, deserialize_with = "deserialize_string_field")]
    pub summary: Option<String>,
    #[serde(default, deserialize_with = "deserialize_custom_fields")]
    pub custom_fields: Vec<CustomField>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CustomField {
    pub name: String,
    pub value: CustomFieldValue,
}

/// Value of a custom field after shape resolution.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum CustomFieldValue {
    #[default]
    Absent,
    /// A single `{ "name": ... }` object.
    Named(String),
    /// A list of `{ "name": ... }` objects; elements without a string name are dropped.
    NamedList(Vec<String>),
}

impl CustomFieldValue {
    pub fn from_value(value: Option<&Value>) -> Self {
        match value {
            Some(Value::Object(map)) => match map.get("name") {
                Some(Value::String(name)) => CustomFieldValue::Named(name.clone()),
                _ => CustomFieldValue::Absent,
            },
            Some(Value::Array(items)) => CustomFieldValue::NamedList(
                items
                    .iter()
                    .filter_map(|item| item.get("name").and_then(Value::as_str))
                    .map(str::to_string)
                    .collect(),
            ),
            _ => CustomFieldValue::Absent,
        }
    }

    pub fn as_name(&self) -> Option<&str> {
        match self {
            CustomFieldValue::Named(name) => Some(name),
            _ => None,
        }
    }

    pub fn as_names(&self) -> Option<&[String]> {
        match self {
            CustomFieldValue::NamedList(names) => Some(names),
            _ => None,
        }
    }
}

impl RawIssue {
    /// Decodes one array element. Returns `None` only when the element is not
    /// an object at all.
    pub fn from_value(value: Value) -> Option<Self> {
        if !value.is_object() {
            return None;
        }
        serde_json::from_value(value).ok()
    }

    pub fn field(&self, name: &str) -> Option<&CustomFieldValue> {
        self.custom_fields
            .iter()
            .rev()
            .find(|field| field.name == name)
            .map(|field| &field.value)
    }
}

fn deserialize_string_field<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::String(text)) => Some(text),
        _ => None,
    })
}

fn deserialize_custom_fields<'de, D>(deserializer: D) -> Result<Vec<CustomField>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    let Some(Value::Array(items)) = value else {
        return Ok(Vec::new());
    };
    Ok(items
        .iter()
        .filter_map(|item| {
            let name = item.get("name")?.as_str()?.to_string();
            let value = CustomFieldValue::from_value(item.get("value"));
            Some(CustomField { name, value })
        })
        .collect())
}
