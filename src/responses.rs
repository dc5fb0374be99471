//! Jira REST response and request bodies, and their conversion to domain types.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

use crate::types::{FieldRequirement, FieldValue, Issue, IssueState, Resolution, User, WorkflowAction};

/// A user as embedded in issues and returned by `/myself`.
///
/// Server instances identify users by `name`, cloud instances by `accountId`.
#[derive(Deserialize, Debug, Clone)]
pub struct JiraUser {
    pub name: Option<String>,
    #[serde(rename = "accountId")]
    pub account_id: Option<String>,
    #[serde(rename = "displayName")]
    pub display_name: Option<String>,
}

impl JiraUser {
    pub fn login(&self) -> Option<&str> {
        self.name.as_deref().or(self.account_id.as_deref())
    }

    pub fn into_user(self, display_names: bool) -> Option<User> {
        let login = self.login()?.to_string();
        let name = match self.display_name {
            Some(display) if display_names && !display.is_empty() => display,
            _ => login.clone(),
        };
        Some(User::new(login, name))
    }
}

#[derive(Deserialize, Debug)]
pub struct FilterNode {
    pub id: String,
    pub name: String,
}

#[derive(Deserialize, Debug)]
pub struct SearchResponse {
    #[serde(default)]
    pub issues: Vec<IssueNode>,
}

#[derive(Deserialize, Debug)]
pub struct IssueNode {
    pub id: String,
    pub key: String,
    #[serde(default)]
    pub fields: Map<String, Value>,
}

#[derive(Deserialize)]
struct NamedNode {
    id: String,
    name: String,
}

#[derive(Deserialize, Debug)]
pub struct TransitionsResponse {
    #[serde(default)]
    pub transitions: Vec<TransitionNode>,
}

#[derive(Deserialize, Debug)]
pub struct TransitionNode {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub fields: HashMap<String, TransitionField>,
}

#[derive(Deserialize, Debug)]
pub struct TransitionField {
    pub name: String,
}

impl TransitionNode {
    pub fn action(&self) -> WorkflowAction {
        WorkflowAction::new(&self.id, &self.name)
    }

    /// Required fields, ordered by id for stable requests.
    pub fn requirements(&self) -> Vec<FieldRequirement> {
        let mut fields: Vec<FieldRequirement> = self
            .fields
            .iter()
            .map(|(id, field)| FieldRequirement::new(id, &field.name))
            .collect();
        fields.sort_by(|a, b| a.id.cmp(&b.id));
        fields
    }
}

#[derive(Deserialize, Debug)]
pub struct ResolutionNode {
    pub id: String,
    pub name: String,
}

impl From<ResolutionNode> for Resolution {
    fn from(node: ResolutionNode) -> Self {
        Resolution::new(node.id, node.name)
    }
}

#[derive(Serialize)]
pub struct WorklogBody<'a> {
    pub comment: &'a str,
    #[serde(rename = "timeSpent")]
    pub time_spent: &'a str,
    pub started: String,
}

#[derive(Serialize)]
pub struct CommentBody<'a> {
    pub body: &'a str,
}

/// Jira's timestamp layout, e.g. `2024-01-01T09:00:00.000+0000`.
pub const JIRA_TIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.3f%z";

fn parse_time(value: Option<&Value>) -> DateTime<Utc> {
    value
        .and_then(Value::as_str)
        .and_then(|s| DateTime::parse_from_str(s, JIRA_TIME_FORMAT).ok())
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_default()
}

fn string_field(fields: &Map<String, Value>, id: &str) -> String {
    fields
        .get(id)
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string()
}

fn user_field(fields: &Map<String, Value>, id: &str, display_names: bool) -> Option<User> {
    let value = fields.get(id).filter(|v| !v.is_null())?;
    serde_json::from_value::<JiraUser>(value.clone())
        .ok()?
        .into_user(display_names)
}

/// The identifying string of a stored value: ids for objects, raw scalars.
fn scalar_value(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Object(map) => ["id", "accountId", "name", "value", "key"]
            .iter()
            .find_map(|k| map.get(*k).and_then(scalar_value)),
        Value::Array(_) => None,
    }
}

/// Flatten stored field values to lists of strings.
pub fn flatten_fields(fields: &Map<String, Value>) -> HashMap<String, Vec<String>> {
    fields
        .iter()
        .filter_map(|(id, value)| {
            let values: Vec<String> = match value {
                Value::Array(items) => items.iter().filter_map(scalar_value).collect(),
                other => scalar_value(other).into_iter().collect(),
            };
            (!values.is_empty()).then(|| (id.clone(), values))
        })
        .collect()
}

impl IssueNode {
    pub fn into_issue(self, display_names: bool) -> Issue {
        let fields = &self.fields;
        let state = fields
            .get("status")
            .and_then(|v| serde_json::from_value::<NamedNode>(v.clone()).ok())
            .map(|s| IssueState::new(s.id, s.name));

        Issue {
            title: string_field(fields, "summary"),
            description: string_field(fields, "description"),
            state,
            assignee: user_field(fields, "assignee", display_names),
            reporter: user_field(fields, "reporter", display_names),
            created_at: parse_time(fields.get("created")),
            updated_at: parse_time(fields.get("updated")),
            fields: flatten_fields(fields),
            id: self.id,
            key: self.key,
        }
    }
}

const ID_OBJECT_FIELDS: &[&str] = &["resolution", "priority", "issuetype", "security"];
const NAME_OBJECT_FIELDS: &[&str] = &["assignee", "reporter"];
const ID_ARRAY_FIELDS: &[&str] = &["fixVersions", "versions", "components"];

/// Shape a field value the way the transition endpoint expects it.
pub fn encode_field(field: &FieldValue) -> Value {
    let id = field.id.as_str();
    let values = &field.values;
    let first = values.first().map(String::as_str).unwrap_or_default();
    if ID_OBJECT_FIELDS.contains(&id) {
        json!({ "id": first })
    } else if NAME_OBJECT_FIELDS.contains(&id) {
        json!({ "name": first })
    } else if ID_ARRAY_FIELDS.contains(&id) {
        Value::Array(values.iter().map(|v| json!({ "id": v })).collect())
    } else if values.len() == 1 {
        json!(first)
    } else {
        json!(values)
    }
}

/// Body for `POST /issue/{key}/transitions`; fields without values are left out.
pub fn transition_body(action_id: &str, fields: &[FieldValue], comment: &str) -> Value {
    let encoded: Map<String, Value> = fields
        .iter()
        .filter(|f| !f.values.is_empty())
        .map(|f| (f.id.clone(), encode_field(f)))
        .collect();

    let mut body = json!({ "transition": { "id": action_id } });
    if !encoded.is_empty() {
        body["fields"] = Value::Object(encoded);
    }
    if !comment.trim().is_empty() {
        body["update"] = json!({ "comment": [{ "add": { "body": comment } }] });
    }
    body
}
