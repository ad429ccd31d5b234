use crate::error::ConstructionError;
use crate::monitor::Monitor;
use crate::signature::OperationSignature;
use ahash::AHashMap;
use indexmap::IndexMap;
use serde_json::Value;
use std::fmt;
use std::sync::Arc;

/// Named input values handed to an operation, in signature order.
pub type Inputs = IndexMap<String, Value>;

/// Defines the contract for a callable that an operation step can invoke.
///
/// An operation with named outputs returns a JSON object keyed by output name; any other
/// operation returns the value of its single `return` output. Operations that honour
/// cancellation return [`crate::monitor::Interrupted`] (converted into `anyhow::Error`).
pub trait Operation: Send + Sync {
    fn signature(&self) -> &OperationSignature;
    fn invoke(&self, inputs: &Inputs, monitor: &dyn Monitor) -> anyhow::Result<Value>;
}

/// Adapts a closure into an [`Operation`].
pub struct FnOperation<F> {
    signature: OperationSignature,
    function: F,
}

impl<F> FnOperation<F>
where
    F: Fn(&Inputs, &dyn Monitor) -> anyhow::Result<Value> + Send + Sync,
{
    /// Wraps `function`; a signature without outputs gets the synthetic `return` output.
    pub fn new(mut signature: OperationSignature, function: F) -> Self {
        signature.ensure_return_output();
        Self {
            signature,
            function,
        }
    }
}

impl<F> Operation for FnOperation<F>
where
    F: Fn(&Inputs, &dyn Monitor) -> anyhow::Result<Value> + Send + Sync,
{
    fn signature(&self) -> &OperationSignature {
        &self.signature
    }

    fn invoke(&self, inputs: &Inputs, monitor: &dyn Monitor) -> anyhow::Result<Value> {
        (self.function)(inputs, monitor)
    }
}

impl<F> fmt::Debug for FnOperation<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnOperation")
            .field("signature", &self.signature.qualified_name)
            .finish()
    }
}

impl fmt::Debug for dyn Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Operation")
            .field("signature", &self.signature().qualified_name)
            .finish()
    }
}

/// Operations available to workflow documents, keyed by qualified name.
#[derive(Default, Clone)]
pub struct OperationRegistry {
    operations: AHashMap<String, Arc<dyn Operation>>,
}

impl OperationRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers an operation under its signature's qualified name, replacing any previous
    /// registration.
    pub fn register(&mut self, operation: Arc<dyn Operation>) -> &mut Self {
        let name = operation.signature().qualified_name.clone();
        self.operations.insert(name, operation);
        self
    }

    pub fn register_fn<F>(&mut self, signature: OperationSignature, function: F) -> &mut Self
    where
        F: Fn(&Inputs, &dyn Monitor) -> anyhow::Result<Value> + Send + Sync + 'static,
    {
        self.register(Arc::new(FnOperation::new(signature, function)))
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn Operation>> {
        self.operations.get(name).cloned()
    }

    /// Like [`OperationRegistry::get`], but a missing name is a construction error.
    pub fn lookup(&self, name: &str) -> Result<Arc<dyn Operation>, ConstructionError> {
        self.get(name)
            .ok_or_else(|| ConstructionError::OperationNotFound {
                name: name.to_string(),
            })
    }

    /// Registered names in sorted order.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.operations.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    pub fn len(&self) -> usize {
        self.operations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.operations.is_empty()
    }
}

impl fmt::Debug for OperationRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OperationRegistry")
            .field("operations", &self.names())
            .finish()
    }
}
