//! Declared input/output contracts of operations and nodes.

use indexmap::IndexMap;
use serde_json::{Map, Value};

/// Free-form properties of a declared input or output (`data_type`, `description`, ...).
pub type Properties = Map<String, Value>;

/// Name of the synthetic output that receives the whole result of a single-valued node.
pub const RETURN_OUTPUT_NAME: &str = "return";

/// The declared input/output contract of an operation, step or workflow.
///
/// Input and output names keep their declaration order, which is also the order in which
/// connectors are created and serialized.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct OperationSignature {
    pub qualified_name: String,
    pub header: Properties,
    pub inputs: IndexMap<String, Properties>,
    pub outputs: IndexMap<String, Properties>,
}

impl OperationSignature {
    pub fn new(qualified_name: impl Into<String>) -> Self {
        Self {
            qualified_name: qualified_name.into(),
            ..Self::default()
        }
    }

    /// Adds an input with no properties.
    pub fn with_input(mut self, name: impl Into<String>) -> Self {
        self.inputs.entry(name.into()).or_default();
        self
    }

    /// Adds an output with no properties.
    pub fn with_output(mut self, name: impl Into<String>) -> Self {
        self.outputs.entry(name.into()).or_default();
        self
    }

    pub fn with_input_properties(mut self, name: impl Into<String>, properties: Properties) -> Self {
        self.inputs.insert(name.into(), properties);
        self
    }

    pub fn with_output_properties(
        mut self,
        name: impl Into<String>,
        properties: Properties,
    ) -> Self {
        self.outputs.insert(name.into(), properties);
        self
    }

    pub fn with_header(mut self, header: Properties) -> Self {
        self.header = header;
        self
    }

    /// Adds the synthetic `return` output when nothing else is declared.
    pub fn ensure_return_output(&mut self) {
        if self.outputs.is_empty() {
            self.outputs
                .insert(RETURN_OUTPUT_NAME.to_string(), Properties::new());
        }
    }

    /// `false` only when the sole output is the synthetic `return` output.
    ///
    /// A node with named outputs must produce a mapping that is distributed by name; any other
    /// node assigns its whole result to `return`.
    pub fn has_named_outputs(&self) -> bool {
        !(self.outputs.len() == 1 && self.outputs.contains_key(RETURN_OUTPUT_NAME))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn return_output_is_only_injected_when_empty() {
        let mut bare = OperationSignature::new("demo.noop");
        bare.ensure_return_output();
        assert!(!bare.has_named_outputs());

        let mut named = OperationSignature::new("demo.divmod").with_output("q");
        named.ensure_return_output();
        assert_eq!(named.outputs.len(), 1);
        assert!(named.has_named_outputs());
    }
}
