//! Spellbridge: expose bridge providers to Lua scripts.
//!
//! This library provides:
//! - `TaggedValue`, a language-neutral value model shared with providers
//! - Lossless-where-possible conversion between Lua values and `TaggedValue`
//! - Name-based method dispatch onto a `Bridge` provider
//! - A uniform script calling convention (`value, nil` or `nil, message`)
//! - Declarative adapters for the agent, events, structured, state, tools and
//!   modelinfo modules
//! - A module registry that makes adapters `require`-able
//!
//! # Example
//!
//! ```rust
//! use std::sync::Arc;
//! use spellbridge::{BridgeModule, Config, MethodTable, ModuleRegistry, ScriptHost, TaggedValue};
//!
//! let bridge = MethodTable::new("greeter")
//!     .method("greet", |args| {
//!         let name = args.first().and_then(TaggedValue::as_str).unwrap_or("world");
//!         Ok(format!("hello {}", name).into())
//!     });
//!
//! let config = Config::default();
//! let mut registry = ModuleRegistry::new();
//! registry.register(BridgeModule::new(Arc::new(bridge), &config)).unwrap();
//!
//! let host = ScriptHost::new(config).unwrap();
//! host.install(&registry).unwrap();
//! let greeting: String = host.eval(r#"return require("greeter").greet("lua")"#).unwrap();
//! assert_eq!(greeting, "hello lua");
//! ```

pub mod adapters;
pub mod bridge;
pub mod error;
pub mod lua;
pub mod registry;
pub mod value;

pub use crate::adapters::{flatten_name, AdapterSpec, Binding, Layout, ScriptAdapter};
pub use crate::bridge::{Bridge, BridgeMetadata, MethodDispatcher, MethodInfo, MethodTable, ParameterInfo};
pub use crate::error::{BridgeError, BridgeResult};
pub use crate::lua::{LuaConverter, Returns, ScriptHost};
pub use crate::registry::{BridgeModule, ModuleRegistry, ScriptModule};
pub use crate::value::{CustomValue, ObjectMap, ScriptFunction, TaggedValue, ValueKind};

use std::sync::Arc;

use serde::Deserialize;
use tokio_util::sync::CancellationToken;

/// Configuration for script adapters
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Tables nested deeper than this convert to nil
    pub max_conversion_depth: usize,
    /// Check argument shapes before calling the provider
    pub check_arguments: bool,
    /// Add `_adapter`, `_version`, `_bridge` and `_description` to modules
    pub expose_metadata: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            max_conversion_depth: lua::DEFAULT_MAX_DEPTH,
            check_arguments: true,
            expose_metadata: true,
        }
    }
}

/// Registry holding the six standard adapters over their providers.
///
/// Each provider is optional; only modules with a provider are registered.
#[derive(Default)]
pub struct StandardBridges {
    pub agent: Option<Arc<dyn Bridge>>,
    pub events: Option<Arc<dyn Bridge>>,
    pub structured: Option<Arc<dyn Bridge>>,
    pub state: Option<Arc<dyn Bridge>>,
    pub tools: Option<Arc<dyn Bridge>>,
    pub modelinfo: Option<Arc<dyn Bridge>>,
}

impl StandardBridges {
    /// Build a registry of adapters sharing `config` and `cancel`
    pub fn into_registry(
        self,
        config: &Config,
        cancel: CancellationToken,
    ) -> BridgeResult<ModuleRegistry> {
        let mut registry = ModuleRegistry::new();
        let providers = [
            (&adapters::agent::AGENT, self.agent),
            (&adapters::events::EVENTS, self.events),
            (&adapters::structured::STRUCTURED, self.structured),
            (&adapters::state::STATE, self.state),
            (&adapters::tools::TOOLS, self.tools),
            (&adapters::modelinfo::MODELINFO, self.modelinfo),
        ];
        for (spec, bridge) in providers {
            if let Some(bridge) = bridge {
                registry.register(ScriptAdapter::new(spec, bridge, config).with_cancellation(cancel.clone()))?;
            }
        }
        Ok(registry)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_default() {
        let config = Config::default();
        assert_eq!(config.max_conversion_depth, 32);
        assert!(config.check_arguments);
        assert!(config.expose_metadata);
    }

    #[test]
    fn test_config_from_partial_json() {
        let config: Config = serde_json::from_str(r#"{ "check_arguments": false }"#).unwrap();
        assert!(!config.check_arguments);
        assert_eq!(config.max_conversion_depth, 32);
    }
}
