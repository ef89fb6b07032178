/// Failure reported by an expression engine while evaluating a constraint.
///
/// The document validator never aborts on these: an invariant whose expression cannot be
/// evaluated is reported as an issue carrying the error text as diagnostics.
///
/// ```rust
/// use atrius_fhirpath_support::EvaluationError;
///
/// let error = EvaluationError::UndefinedVariable("%resource".to_string());
/// assert_eq!(error.to_string(), "Undefined Variable: %resource");
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EvaluationError {
    /// Operand or argument of an unexpected type.
    ///
    /// Example: "Expected Boolean, found Integer"
    TypeError(String),
    /// Invalid argument provided to a function.
    InvalidArgument(String),
    /// Reference to an environment variable the engine was not given.
    ///
    /// Example: "%rootResource"
    UndefinedVariable(String),
    /// A singleton was required but the input had zero or several items.
    SingletonEvaluationError(String),
    /// The expression is well formed but violates a semantic rule of the language.
    SemanticError(String),
    /// The engine recognises the function but does not implement it.
    ///
    /// Example: "memberOf"
    UnsupportedFunction(String),
    /// The engine has no way of evaluating the given constraint at all.
    UnsupportedConstraint(String),
    /// Anything not covered above.
    Other(String),
}

impl std::error::Error for EvaluationError {}

impl std::fmt::Display for EvaluationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EvaluationError::TypeError(msg) => write!(f, "Type Error: {}", msg),
            EvaluationError::InvalidArgument(msg) => write!(f, "Invalid Argument: {}", msg),
            EvaluationError::UndefinedVariable(name) => write!(f, "Undefined Variable: {}", name),
            EvaluationError::SingletonEvaluationError(msg) => {
                write!(f, "Singleton Evaluation Error: {}", msg)
            }
            EvaluationError::SemanticError(msg) => write!(f, "Semantic Error: {}", msg),
            EvaluationError::UnsupportedFunction(msg) => write!(f, "Unsupported Function: {}", msg),
            EvaluationError::UnsupportedConstraint(key) => {
                write!(f, "Unsupported Constraint: {}", key)
            }
            EvaluationError::Other(msg) => write!(f, "Evaluation Error: {}", msg),
        }
    }
}
