//! # Type Information
//!
//! Namespace-qualified type names attached to evaluation results so an engine can answer
//! `is`, `as` and `type()` without knowing the Rust types behind a value.

/// A namespace-qualified type name such as `FHIR.Coding` or `System.String`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TypeInfoResult {
    pub namespace: String,
    pub name: String,
}

impl TypeInfoResult {
    pub fn new(namespace: &str, name: &str) -> Self {
        Self {
            namespace: namespace.to_string(),
            name: name.to_string(),
        }
    }

    /// Type in the `FHIR` namespace.
    pub fn fhir(name: &str) -> Self {
        Self::new("FHIR", name)
    }

    /// Type in the `System` namespace.
    pub fn system(name: &str) -> Self {
        Self::new("System", name)
    }

    /// `namespace.name`
    pub fn qualified_name(&self) -> String {
        format!("{}.{}", self.namespace, self.name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn qualified_name_joins_namespace_and_name() {
        assert_eq!(TypeInfoResult::fhir("Coding").qualified_name(), "FHIR.Coding");
        assert_eq!(TypeInfoResult::system("String").qualified_name(), "System.String");
    }
}
