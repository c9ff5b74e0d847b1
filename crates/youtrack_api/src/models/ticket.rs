//! Normalized local ticket built from a [`RawIssue`].

use serde::{Deserialize, Deserializer, Serialize};

use super::issue::{CustomFieldValue, RawIssue};

pub const FIELD_TYPE: &str = "Type";
pub const FIELD_PRIORITY: &str = "Priority";
pub const FIELD_SPRINTS: &str = "Sprints";

/// Represents a cached issue: readable id, summary, type, priority, sprint
/// membership and a browser URL derived from the configured base URL.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
#[serde(default)]
pub struct Ticket {
    #[serde(deserialize_with = "null_as_default")]
    pub id: String,
    #[serde(deserialize_with = "null_as_default")]
    pub summary: String,
    #[serde(rename = "type", deserialize_with = "null_as_default")]
    pub issue_type: String,
    #[serde(deserialize_with = "null_as_default")]
    pub priority: String,
    #[serde(deserialize_with = "null_as_default")]
    pub sprints: Vec<String>,
    #[serde(deserialize_with = "null_as_default")]
    pub url: String,
}

/// Reads an explicit `null` as the type's default. Older cache writers emit
/// `null` for empty lists.
pub fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

impl Ticket {
    /// Builds a ticket from a raw issue. `base_url` must already be normalized.
    ///
    /// Returns `None` when the issue has no usable readable id. The URL is
    /// always computed from `base_url`; a server-supplied `url` is ignored so
    /// links follow base-URL overrides.
    pub fn from_raw(raw: &RawIssue, base_url: &str) -> Option<Self> {
        let id = raw
            .id_readable
            .as_deref()
            .map(str::trim)
            .filter(|id| !id.is_empty())?
            .to_string();

        let named = |field: &str| {
            raw.field(field)
                .and_then(CustomFieldValue::as_name)
                .map(str::to_string)
                .unwrap_or_default()
        };

        Some(Ticket {
            url: issue_url(base_url, &id),
            summary: raw.summary.clone().unwrap_or_default(),
            issue_type: named(FIELD_TYPE),
            priority: named(FIELD_PRIORITY),
            sprints: raw
                .field(FIELD_SPRINTS)
                .and_then(CustomFieldValue::as_names)
                .map(<[String]>::to_vec)
                .unwrap_or_default(),
            id,
        })
    }
}

pub fn issue_url(base_url: &str, id: &str) -> String {
    format!("{base_url}/issues/{id}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn raw(value: serde_json::Value) -> RawIssue {
        RawIssue::from_value(value).expect("raw issue")
    }

    #[test]
    fn normalizes_priority_and_sprints() {
        let issue = raw(json!({
            "idReadable": "AGV-1",
            "summary": "x",
            "customFields": [
                {"name": "Priority", "value": {"name": "Critical"}},
                {"name": "Sprints", "value": [{"name": "S1"}, {"name": "S2"}]}
            ]
        }));

        let ticket = Ticket::from_raw(&issue, "https://h").expect("ticket");
        assert_eq!(
            ticket,
            Ticket {
                id: "AGV-1".into(),
                summary: "x".into(),
                issue_type: String::new(),
                priority: "Critical".into(),
                sprints: vec!["S1".into(), "S2".into()],
                url: "https://h/issues/AGV-1".into(),
            }
        );
    }

    #[test]
    fn unexpected_shapes_fall_back_to_zero_values() {
        let issue = raw(json!({
            "idReadable": "AGV-2",
            "summary": "y",
            "url": "https://elsewhere/issue/AGV-2",
            "customFields": [
                {"name": "Type", "value": [{"name": "Bug"}]},
                {"name": "Priority", "value": null},
                {"name": "Sprints", "value": {"name": "S1"}},
                {"name": "Estimation", "value": {"minutes": 60}}
            ]
        }));

        let ticket = Ticket::from_raw(&issue, "https://h").expect("ticket");
        assert_eq!(ticket.issue_type, "");
        assert_eq!(ticket.priority, "");
        assert!(ticket.sprints.is_empty());
        assert_eq!(ticket.url, "https://h/issues/AGV-2");
    }

    #[test]
    fn missing_or_blank_id_skips_issue() {
        assert!(Ticket::from_raw(&raw(json!({"summary": "no id"})), "https://h").is_none());
        assert!(Ticket::from_raw(&raw(json!({"idReadable": "  "})), "https://h").is_none());
        assert!(Ticket::from_raw(&raw(json!({"idReadable": 12})), "https://h").is_none());
    }

    #[test]
    fn null_fields_in_cached_record_read_as_empty() {
        let tickets: Vec<Ticket> = serde_json::from_value(json!([
            {"id": "AGV-1", "summary": null, "type": "Bug", "priority": "", "sprints": null, "url": "https://h/issues/AGV-1"},
            {"id": "AGV-2", "summary": "y", "sprints": ["S"]}
        ]))
        .expect("lenient decode");

        assert_eq!(tickets.len(), 2);
        assert!(tickets[0].sprints.is_empty());
        assert_eq!(tickets[0].summary, "");
        assert_eq!(tickets[0].issue_type, "Bug");
        assert_eq!(tickets[1].sprints, vec!["S"]);
    }

    #[test]
    fn serializes_type_field_name() {
        let ticket = Ticket {
            id: "AGV-3".into(),
            issue_type: "Bug".into(),
            ..Ticket::default()
        };
        let value = serde_json::to_value(&ticket).expect("serialize");
        assert_eq!(value["type"], "Bug");
        assert_eq!(value["sprints"], json!([]));
    }
}
