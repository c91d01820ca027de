// Evaluation options, optionally read from a config file and the environment.

use std::path::Path;

// config lets you read the options from a separate config file
use config::{Config, Environment, File};
use serde::Deserialize;

use crate::error::Result;

const ENV_PREFIX: &str = "RESOURCE_EXPR";

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Options {
    /// Qualifier tried for a bare namespace name before the built-in default.
    pub implicit_namespace: String,
    /// Report what every constraint does to its namespace.
    pub explain: bool,
    /// How many records explain mode shows before and after a constraint.
    pub explain_max_items: usize,
}

impl Default for Options {
    fn default() -> Self {
        Self { implicit_namespace: String::new(), explain: false, explain_max_items: 5 }
    }
}

impl Options {
    pub fn with_implicit_namespace(mut self, implicit_namespace: impl Into<String>) -> Self {
        self.implicit_namespace = implicit_namespace.into();
        self
    }

    pub fn with_explain(mut self, explain: bool) -> Self {
        self.explain = explain;
        self
    }

    /// Defaults, overridden by `path` (any format `config` knows from the
    /// extension), overridden by `RESOURCE_EXPR_*` environment variables.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let defaults = Options::default();
        let mut builder = Config::builder()
            .set_default("implicit_namespace", defaults.implicit_namespace)?
            .set_default("explain", defaults.explain)?
            .set_default("explain_max_items", defaults.explain_max_items as i64)?;
        if let Some(path) = path {
            builder = builder.add_source(File::from(path).required(true));
        }
        let options = builder
            .add_source(Environment::with_prefix(ENV_PREFIX).try_parsing(true))
            .build()?
            .try_deserialize()?;
        Ok(options)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ResourceError;
    use std::fs;

    #[test]
    fn builders() {
        let options = Options::default().with_implicit_namespace("com.example").with_explain(true);
        assert_eq!(options.implicit_namespace, "com.example");
        assert!(options.explain);
        assert_eq!(options.explain_max_items, 5);
    }

    #[test]
    fn loads_a_toml_file() {
        let path = std::env::temp_dir().join(format!("resource-expr-options-{}.toml", std::process::id()));
        fs::write(&path, "implicit_namespace = \"com.example\"\nexplain_max_items = 2\n").unwrap();
        let options = Options::load(Some(&path));
        fs::remove_file(&path).unwrap();
        let options = options.expect("options ok");
        assert_eq!(options.implicit_namespace, "com.example");
        assert_eq!(options.explain_max_items, 2);
        assert!(!options.explain);
    }

    #[test]
    fn missing_file_is_a_config_error() {
        let path = std::env::temp_dir().join("resource-expr-options-does-not-exist.toml");
        let err = Options::load(Some(&path)).unwrap_err();
        assert!(matches!(err, ResourceError::Config(_)));
    }
}
