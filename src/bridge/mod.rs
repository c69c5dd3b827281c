//! Provider contract and method dispatch.
//!
//! A `Bridge` is the external capability provider: it owns the actual
//! business logic and exposes it as named methods over `TaggedValue`s.

mod dispatch;
mod table;

pub use dispatch::MethodDispatcher;
pub use table::MethodTable;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::BridgeResult;
use crate::value::TaggedValue;

/// Descriptive metadata of a provider
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BridgeMetadata {
    pub name: String,
    pub version: String,
    pub description: String,
    #[serde(default)]
    pub dependencies: Vec<String>,
    #[serde(default)]
    pub author: String,
    #[serde(default)]
    pub license: String,
}

/// One parameter of a provider method
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParameterInfo {
    pub name: String,
    #[serde(rename = "type")]
    pub type_name: String,
    pub required: bool,
    #[serde(default)]
    pub description: String,
}

/// Description of a provider method
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MethodInfo {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub parameters: Vec<ParameterInfo>,
    #[serde(default)]
    pub return_type: String,
}

impl MethodInfo {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: String::new(),
            parameters: Vec::new(),
            return_type: "any".to_string(),
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_param(mut self, name: impl Into<String>, type_name: impl Into<String>, required: bool) -> Self {
        self.parameters.push(ParameterInfo {
            name: name.into(),
            type_name: type_name.into(),
            required,
            description: String::new(),
        });
        self
    }

    pub fn returning(mut self, return_type: impl Into<String>) -> Self {
        self.return_type = return_type.into();
        self
    }
}

/// An external provider of named methods.
///
/// Implementations must be safe to call from several script threads if they
/// are shared between script environments.
#[async_trait]
pub trait Bridge: Send + Sync {
    /// Stable identifier, exposed to scripts as `_bridge`
    fn id(&self) -> &str;

    fn metadata(&self) -> BridgeMetadata;

    /// Methods this provider answers to
    fn methods(&self) -> Vec<MethodInfo>;

    /// Run a method. Argument validation is the provider's job.
    async fn execute_method(&self, method: &str, args: Vec<TaggedValue>) -> BridgeResult<TaggedValue>;
}
