use std::fmt;

/// An unresolved connector reference as written in a document's `source` field.
///
/// | text          | node_id  | name     | meaning                                 |
/// |---------------|----------|----------|-----------------------------------------|
/// | `"step.out"`  | `step`   | `out`    | a specific connector of a node          |
/// | `"step"`      | `step`   | -        | the sole output of a node               |
/// | `".x"`        | -        | `x`      | nearest connector named `x` in scope    |
///
/// Only the last `.` separates the node id from the connector name.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SourceRef {
    pub node_id: Option<String>,
    pub name: Option<String>,
}

impl SourceRef {
    pub fn connector(node_id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            node_id: Some(node_id.into()),
            name: Some(name.into()),
        }
    }

    pub fn sole_output(node_id: impl Into<String>) -> Self {
        Self {
            node_id: Some(node_id.into()),
            name: None,
        }
    }

    pub fn scope(name: impl Into<String>) -> Self {
        Self {
            node_id: None,
            name: Some(name.into()),
        }
    }

    /// Parses the textual form; returns `None` when neither a node id nor a name is present.
    pub fn parse(text: &str) -> Option<Self> {
        let (node_id, name) = match text.rsplit_once('.') {
            Some((node_id, name)) => (node_id, name),
            None => (text, ""),
        };
        let non_empty = |s: &str| (!s.is_empty()).then(|| s.to_string());
        let reference = Self {
            node_id: non_empty(node_id),
            name: non_empty(name),
        };
        if reference.node_id.is_none() && reference.name.is_none() {
            None
        } else {
            Some(reference)
        }
    }
}

impl fmt::Display for SourceRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.node_id, &self.name) {
            (Some(node_id), Some(name)) => write!(f, "{}.{}", node_id, name),
            (Some(node_id), None) => write!(f, "{}", node_id),
            (None, Some(name)) => write!(f, ".{}", name),
            (None, None) => Ok(()),
        }
    }
}
