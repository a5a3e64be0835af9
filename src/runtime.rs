use std::collections::HashMap;

use crate::error::{Error, Result};
use crate::spec::RuntimeSpec;

/// Execution context handed to a runtime implementation.
#[derive(Debug, Clone, Default)]
pub struct RuntimeContext {
    /// Working directory for runtime operations
    pub work_dir: String,
    /// Environment variables passed to components
    pub env: HashMap<String, String>,
}

/// Contract implemented once per AVS architecture variant. Implementations
/// are looked up by the `kind` declared in a runtime spec.
pub trait Runtime {
    /// API version this runtime implements, e.g. "eigenruntime/v1alpha1"
    fn api_version(&self) -> &str;

    /// The AVS architecture this runtime manages, e.g. "Hourglass"
    fn kind(&self) -> &str;

    /// Check that the spec is valid for this runtime beyond the structural
    /// checks the core already performs.
    fn validate(&self, ctx: &RuntimeContext, spec: &RuntimeSpec) -> Result<()>;

    /// Deploy the components described by the spec. Idempotent.
    fn run(&self, ctx: &RuntimeContext, spec: &RuntimeSpec) -> Result<()>;

    /// Tear down the components described by the spec.
    fn remove(&self, ctx: &RuntimeContext, spec: &RuntimeSpec) -> Result<()>;
}

/// Dispatches runtime specs to the registered implementation whose kind
/// matches.
#[derive(Default)]
pub struct RuntimeRegistry {
    runtimes: HashMap<String, Box<dyn Runtime>>,
}

impl RuntimeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, runtime: Box<dyn Runtime>) {
        self.runtimes.insert(runtime.kind().to_string(), runtime);
    }

    /// Find the runtime handling `spec.kind`.
    pub fn for_spec(&self, spec: &RuntimeSpec) -> Result<&dyn Runtime> {
        self.runtimes
            .get(&spec.kind)
            .map(|runtime| runtime.as_ref())
            .ok_or_else(|| Error::NotFound(format!("no runtime registered for kind {:?}", spec.kind)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    struct StubRuntime;

    impl Runtime for StubRuntime {
        fn api_version(&self) -> &str {
            "eigenruntime/v1alpha1"
        }

        fn kind(&self) -> &str {
            "Hourglass"
        }

        fn validate(&self, _ctx: &RuntimeContext, spec: &RuntimeSpec) -> Result<()> {
            spec.validate()
        }

        fn run(&self, _ctx: &RuntimeContext, _spec: &RuntimeSpec) -> Result<()> {
            Ok(())
        }

        fn remove(&self, _ctx: &RuntimeContext, _spec: &RuntimeSpec) -> Result<()> {
            Ok(())
        }
    }

    fn spec_of_kind(kind: &str) -> RuntimeSpec {
        RuntimeSpec {
            api_version: "v1".to_string(),
            kind: kind.to_string(),
            name: "demo".to_string(),
            version: "v1".to_string(),
            spec: BTreeMap::new(),
        }
    }

    #[test]
    fn dispatches_by_kind() {
        let mut registry = RuntimeRegistry::new();
        registry.register(Box::new(StubRuntime));

        let runtime = registry.for_spec(&spec_of_kind("Hourglass")).unwrap();
        assert_eq!(runtime.api_version(), "eigenruntime/v1alpha1");

        assert!(matches!(
            registry.for_spec(&spec_of_kind("Unknown")),
            Err(Error::NotFound(_))
        ));
    }
}
