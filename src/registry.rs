//! Script modules and the registry that makes them loadable.
//!
//! A registry is an ordinary value owned by the embedder. Installing it into a
//! Lua state puts one loader per module into `package.preload`, so scripts
//! pick modules up with `require "name"`.

use std::collections::BTreeMap;
use std::sync::Arc;

use rlua::{Lua, MultiValue, Result as LuaResult, Table};
use tokio_util::sync::CancellationToken;
use tracing::trace;

use crate::bridge::{Bridge, MethodDispatcher};
use crate::error::{BridgeError, BridgeResult};
use crate::lua::{CallSite, LuaConverter, Returns};
use crate::Config;

/// Something that can build a Lua module table
pub trait ScriptModule: Send + Sync {
    /// Name scripts `require`
    fn name(&self) -> &str;

    fn create_module<'lua>(&self, lua: &'lua Lua) -> LuaResult<Table<'lua>>;
}

/// Exposes every method a provider advertises under its own name.
///
/// Used for providers without a dedicated adapter.
pub struct BridgeModule {
    name: String,
    site: CallSite,
    expose_metadata: bool,
}

impl BridgeModule {
    /// Module named after the provider's id
    pub fn new(bridge: Arc<dyn Bridge>, config: &Config) -> Self {
        let name = bridge.id().to_string();
        Self::named(name, bridge, config)
    }

    pub fn named(name: impl Into<String>, bridge: Arc<dyn Bridge>, config: &Config) -> Self {
        let site = CallSite::new(
            Arc::new(MethodDispatcher::new(bridge)),
            LuaConverter::from_config(config),
            config.check_arguments,
            CancellationToken::new(),
        );
        Self {
            name: name.into(),
            site,
            expose_metadata: config.expose_metadata,
        }
    }

    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.site = self.site.with_cancellation(cancel);
        self
    }
}

impl ScriptModule for BridgeModule {
    fn name(&self) -> &str {
        &self.name
    }

    fn create_module<'lua>(&self, lua: &'lua Lua) -> LuaResult<Table<'lua>> {
        let module = lua.create_table()?;
        let dispatcher = self.site.dispatcher();
        if self.expose_metadata {
            let metadata = dispatcher.metadata();
            module.set("_bridge", dispatcher.bridge_id())?;
            module.set("_version", metadata.version)?;
            module.set("_description", metadata.description)?;
        }
        for method in dispatcher.methods() {
            let func = self.site.wrap(lua, method, method, &[], Returns::Value)?;
            module.set(method, func)?;
        }
        Ok(module)
    }
}

/// Named collection of script modules
#[derive(Default)]
pub struct ModuleRegistry {
    modules: BTreeMap<String, Arc<dyn ScriptModule>>,
}

impl ModuleRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a module; names are unique within a registry
    pub fn register<M: ScriptModule + 'static>(&mut self, module: M) -> BridgeResult<()> {
        self.register_arc(Arc::new(module))
    }

    pub fn register_arc(&mut self, module: Arc<dyn ScriptModule>) -> BridgeResult<()> {
        let name = module.name().to_string();
        if self.modules.contains_key(&name) {
            return Err(BridgeError::ModuleExists(name));
        }
        trace!(module = %name, "module registered");
        self.modules.insert(name, module);
        Ok(())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.modules.contains_key(name)
    }

    /// Registered names in sorted order
    pub fn names(&self) -> Vec<&str> {
        self.modules.keys().map(String::as_str).collect()
    }

    pub fn len(&self) -> usize {
        self.modules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.modules.is_empty()
    }

    /// Put a loader for every module into `package.preload`
    pub fn install(&self, lua: &Lua) -> BridgeResult<()> {
        let package: Table = lua.globals().get("package")?;
        let preload: Table = package.get("preload")?;
        for (name, module) in &self.modules {
            let module = module.clone();
            let loader = lua.create_function(move |lua, _: MultiValue| module.create_module(lua))?;
            preload.set(name.as_str(), loader)?;
            trace!(module = %name, "loader installed");
        }
        Ok(())
    }

    /// Build a module table directly, bypassing `require`
    pub fn load<'lua>(&self, lua: &'lua Lua, name: &str) -> BridgeResult<Table<'lua>> {
        let module = self
            .modules
            .get(name)
            .ok_or_else(|| BridgeError::ModuleNotFound(name.to_string()))?;
        Ok(module.create_module(lua)?)
    }
}
