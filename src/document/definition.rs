use indexmap::IndexMap;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

/// The persisted form of a workflow.
///
/// Field order is the order of emission: qualified name, header, inputs, outputs, steps.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct WorkflowDocument {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub qualified_name: Option<String>,
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub header: Map<String, Value>,
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub input: IndexMap<String, ConnectorDocument>,
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub output: IndexMap<String, ConnectorDocument>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub steps: Vec<StepDocument>,
}

/// One entry of a workflow's `steps` list.
///
/// Exactly one of `op`, `workflow` and `expression` selects the step type; when several are
/// present they are tried in that order.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct StepDocument {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub op: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub workflow: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expression: Option<String>,
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub input: IndexMap<String, ConnectorDocument>,
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub output: IndexMap<String, ConnectorDocument>,
}

/// The binding of one connector, plus any declared properties.
///
/// `value: Some(Value::Null)` is an explicit `null` literal and differs from `None`
/// ("no binding"). A bare string in a document is shorthand for `{"source": ...}`.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(from = "ConnectorRepr")]
pub struct ConnectorDocument {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<Value>,
    #[serde(flatten)]
    pub properties: Map<String, Value>,
}

impl ConnectorDocument {
    pub fn source(reference: impl Into<String>) -> Self {
        Self {
            source: Some(reference.into()),
            ..Self::default()
        }
    }

    pub fn value(value: Value) -> Self {
        Self {
            value: Some(value),
            ..Self::default()
        }
    }

    pub fn with_properties(mut self, properties: Map<String, Value>) -> Self {
        self.properties = properties;
        self
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum ConnectorRepr {
    Reference(String),
    Spec(ConnectorSpec),
}

#[derive(Deserialize)]
struct ConnectorSpec {
    #[serde(default)]
    source: Option<String>,
    #[serde(default, deserialize_with = "deserialize_some")]
    value: Option<Value>,
    #[serde(flatten)]
    properties: Map<String, Value>,
}

impl From<ConnectorRepr> for ConnectorDocument {
    fn from(repr: ConnectorRepr) -> Self {
        match repr {
            ConnectorRepr::Reference(reference) => ConnectorDocument::source(reference),
            ConnectorRepr::Spec(spec) => ConnectorDocument {
                source: spec.source,
                value: spec.value,
                properties: spec.properties,
            },
        }
    }
}

// A present key always yields `Some`, so an explicit `null` survives as `Some(Value::Null)`.
fn deserialize_some<'de, D>(deserializer: D) -> Result<Option<Value>, D::Error>
where
    D: Deserializer<'de>,
{
    Value::deserialize(deserializer).map(Some)
}
