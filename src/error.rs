use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ResourceError {
    #[error("Parse error: {message}")]
    Parse { message: String, line: Option<usize>, col: Option<usize> },
    #[error("Unsupported ast item: {0}")]
    UnsupportedNode(String),
    #[error("Unsupported name/value {0}")]
    UnsupportedValue(String),
    #[error("Unsupported operator {0}")]
    UnsupportedOperator(String),
    #[error("Unsupported function {0}")]
    UnsupportedFunction(String),
    #[error("Function call can access at most one namespace ({first} != {second})")]
    NamespaceConflict { first: String, second: String },
    #[error("Function calls with no namespace are unsupported: {0}")]
    NoNamespace(String),
    #[error("Unsupported comparison of namespaces with operands {left} and {right}")]
    NamespaceComparison { left: String, right: String },
    #[error("Unsupported chained comparison: {0}")]
    ChainedComparison(String),
    #[error("Unsupported collection of non-constant values: {0}")]
    NonConstantCollection(String),
    #[error("{function}() takes {expected} argument(s), {found} given")]
    Arity { function: String, expected: String, found: usize },
    #[error("Type error: {0}")]
    Type(String),
    #[error("Conversion error: {0}")]
    Conversion(String),
    #[error("Unknown namespace: {0}")]
    UnknownNamespace(String),
    #[error("Config error: {0}")]
    Config(String),
}

impl ResourceError {
    /// True for the failures that can only show up while records are drained.
    pub fn is_runtime(&self) -> bool {
        matches!(self, Self::Type(_) | Self::Conversion(_))
    }
}

pub type Result<T> = std::result::Result<T, ResourceError>;

// Helper conversions
impl From<config::ConfigError> for ResourceError {
    fn from(e: config::ConfigError) -> Self { Self::Config(e.to_string()) }
}

impl<R: pest::RuleType> From<pest::error::Error<R>> for ResourceError {
    fn from(e: pest::error::Error<R>) -> Self {
        let (line, col) = match e.line_col {
            pest::error::LineColLocation::Pos((line, col)) => (line, col),
            pest::error::LineColLocation::Span((line, col), _) => (line, col),
        };
        Self::Parse { message: e.variant.message().to_string(), line: Some(line), col: Some(col) }
    }
}
