//! Registry configuration

#[cfg(feature = "config")]
use crate::error::{DiError, DiResult};

/// What to do when only a similar (shape-mismatched) match exists
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(
    feature = "config",
    derive(serde::Serialize, serde::Deserialize),
    serde(rename_all = "lowercase")
)]
pub enum SimilarMatchPolicy {
    /// Coerce silently
    Allow,
    /// Coerce and emit a warning event
    #[default]
    Warn,
    /// Treat similar matches as misses
    Deny,
}

impl SimilarMatchPolicy {
    /// Whether similar matches may be used at all
    pub fn permits_coercion(self) -> bool {
        !matches!(self, SimilarMatchPolicy::Deny)
    }
}

/// Default nesting limit for recursive struct construction
pub const DEFAULT_MAX_INJECTION_DEPTH: usize = 32;

/// Registry configuration, inherited by scoped registries
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(
    feature = "config",
    derive(serde::Serialize, serde::Deserialize),
    serde(default)
)]
pub struct RegistryConfig {
    /// Handling of similar matches during by-type resolution
    pub similar_match: SimilarMatchPolicy,
    /// Maximum nesting of struct shapes constructed by injection
    pub max_injection_depth: usize,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            similar_match: SimilarMatchPolicy::default(),
            max_injection_depth: DEFAULT_MAX_INJECTION_DEPTH,
        }
    }
}

impl RegistryConfig {
    /// Set the similar-match policy
    pub fn with_similar_match(mut self, policy: SimilarMatchPolicy) -> Self {
        self.similar_match = policy;
        self
    }

    /// Set the injection depth limit
    pub fn with_max_injection_depth(mut self, depth: usize) -> Self {
        self.max_injection_depth = depth;
        self
    }
}

#[cfg(feature = "config")]
impl RegistryConfig {
    /// Load configuration from TOML string
    pub fn from_toml(toml_str: &str) -> DiResult<Self> {
        toml::from_str(toml_str)
            .map_err(|e| DiError::ConfigError(format!("Failed to parse TOML: {}", e)))
    }

    /// Load configuration from JSON string
    pub fn from_json(json_str: &str) -> DiResult<Self> {
        serde_json::from_str(json_str)
            .map_err(|e| DiError::ConfigError(format!("Failed to parse JSON: {}", e)))
    }
}

// Example configuration file format:
// ```toml
// similar_match = "deny"
// max_injection_depth = 8
// ```
