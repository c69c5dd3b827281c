//! Script-facing adapters over bridge providers.
//!
//! An adapter is a static binding table: namespaces of script names mapped to
//! provider methods, plus upper-case constant groups. `ScriptAdapter` turns a
//! table and a provider into a Lua module.

pub mod agent;
pub mod events;
pub mod modelinfo;
pub mod state;
pub mod structured;
pub mod tools;

use std::sync::Arc;

use rlua::{Lua, Result as LuaResult, Table};
use tokio_util::sync::CancellationToken;
use tracing::trace;

use crate::bridge::{Bridge, MethodDispatcher};
use crate::lua::{ArgSpec, CallSite, LuaConverter, ResultView, Returns};
use crate::registry::ScriptModule;
use crate::Config;

/// One script-visible function
#[derive(Clone, Copy)]
pub struct Binding {
    /// Name inside its namespace
    pub name: &'static str,
    /// Provider method it forwards to
    pub method: &'static str,
    pub args: &'static [ArgSpec],
    pub returns: Returns,
    /// Projection over the method's result; the method is called without arguments
    pub view: Option<ResultView>,
    /// Only installed when the provider advertises `method`
    pub if_provided: bool,
}

impl Binding {
    pub const fn new(name: &'static str, method: &'static str, args: &'static [ArgSpec]) -> Self {
        Self {
            name,
            method,
            args,
            returns: Returns::Value,
            view: None,
            if_provided: false,
        }
    }

    /// Result handed back as one table, never unpacked
    pub const fn table(name: &'static str, method: &'static str, args: &'static [ArgSpec]) -> Self {
        Self::new(name, method, args).returning(Returns::Table)
    }

    /// Result ignored
    pub const fn void(name: &'static str, method: &'static str, args: &'static [ArgSpec]) -> Self {
        Self::new(name, method, args).returning(Returns::Discard)
    }

    pub const fn view(
        name: &'static str,
        method: &'static str,
        args: &'static [ArgSpec],
        view: ResultView,
    ) -> Self {
        Self {
            view: Some(view),
            ..Self::new(name, method, args)
        }
    }

    pub const fn returning(self, returns: Returns) -> Self {
        Self { returns, ..self }
    }

    pub const fn if_provided(self) -> Self {
        Self {
            if_provided: true,
            ..self
        }
    }
}

/// Upper-case constants table, e.g. `TYPES.BASIC = "basic"`
pub struct ConstantGroup {
    pub name: &'static str,
    pub entries: &'static [(&'static str, &'static str)],
}

pub struct Namespace {
    pub name: &'static str,
    pub bindings: &'static [Binding],
    /// Constants placed inside the namespace table (nested layout only)
    pub constants: &'static [(&'static str, &'static str)],
}

/// Where namespaced functions end up in the module table
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Layout {
    /// `module.ns.verb`
    Nested,
    /// `module.nsVerb`
    Flattened,
}

/// Hook run after the declarative part of a module is built
pub type ModuleExtension = for<'lua> fn(&'lua Lua, &Table<'lua>, &ScriptAdapter) -> LuaResult<()>;

pub struct AdapterSpec {
    pub name: &'static str,
    pub version: &'static str,
    pub layout: Layout,
    /// Expose every provider method under its own name beneath the adapter surface
    pub bridge_methods: bool,
    pub namespaces: &'static [Namespace],
    /// Functions placed directly on the module
    pub root: &'static [Binding],
    pub constants: &'static [ConstantGroup],
    pub extend: Option<ModuleExtension>,
}

/// `flatten_name("validation", "validateJSON") == "validationValidateJSON"`
pub fn flatten_name(namespace: &str, verb: &str) -> String {
    let mut chars = verb.chars();
    match chars.next() {
        Some(first) if !namespace.is_empty() => {
            let mut name = String::with_capacity(namespace.len() + verb.len());
            name.push_str(namespace);
            name.extend(first.to_uppercase());
            name.push_str(chars.as_str());
            name
        }
        _ => format!("{}{}", namespace, verb),
    }
}

/// A binding table bound to a provider, loadable as a script module
pub struct ScriptAdapter {
    spec: &'static AdapterSpec,
    site: CallSite,
    expose_metadata: bool,
}

impl ScriptAdapter {
    pub fn new(spec: &'static AdapterSpec, bridge: Arc<dyn Bridge>, config: &Config) -> Self {
        let site = CallSite::new(
            Arc::new(MethodDispatcher::new(bridge)),
            LuaConverter::from_config(config),
            config.check_arguments,
            CancellationToken::new(),
        );
        Self {
            spec,
            site,
            expose_metadata: config.expose_metadata,
        }
    }

    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.site = self.site.with_cancellation(cancel);
        self
    }

    pub fn spec(&self) -> &'static AdapterSpec {
        self.spec
    }

    pub fn dispatcher(&self) -> &Arc<MethodDispatcher> {
        self.site.dispatcher()
    }

    pub fn call_site(&self) -> &CallSite {
        &self.site
    }

    /// Every function path the module exposes (`ns.verb`, `nsVerb` or `name`),
    /// without the bridge's own method names and extension additions
    pub fn script_names(&self) -> Vec<String> {
        let mut names = Vec::new();
        for ns in self.spec.namespaces {
            for binding in ns.bindings.iter().filter(|b| self.installs(b)) {
                names.push(match self.spec.layout {
                    Layout::Nested => format!("{}.{}", ns.name, binding.name),
                    Layout::Flattened => flatten_name(ns.name, binding.name),
                });
            }
        }
        names.extend(
            self.spec
                .root
                .iter()
                .filter(|b| self.installs(b))
                .map(|b| b.name.to_string()),
        );
        names
    }

    fn installs(&self, binding: &Binding) -> bool {
        !binding.if_provided || self.dispatcher().has_method(binding.method)
    }

    fn function<'lua>(&self, lua: &'lua Lua, script_name: &str, binding: &Binding) -> LuaResult<rlua::Function<'lua>> {
        match binding.view {
            Some(view) => self
                .site
                .wrap_view(lua, script_name, binding.method, binding.args, binding.returns, view),
            None => self
                .site
                .wrap(lua, script_name, binding.method, binding.args, binding.returns),
        }
    }
}

impl ScriptModule for ScriptAdapter {
    fn name(&self) -> &str {
        self.spec.name
    }

    fn create_module<'lua>(&self, lua: &'lua Lua) -> LuaResult<Table<'lua>> {
        let module = lua.create_table()?;
        let dispatcher = self.dispatcher();

        if self.spec.bridge_methods {
            for method in dispatcher.methods() {
                module.set(method, self.site.wrap(lua, method, method, &[], Returns::Value)?)?;
            }
        }

        if self.expose_metadata {
            let metadata = dispatcher.metadata();
            module.set("_adapter", self.spec.name)?;
            module.set("_version", self.spec.version)?;
            module.set("_bridge", dispatcher.bridge_id())?;
            module.set("_description", metadata.description)?;
        }

        for ns in self.spec.namespaces {
            match self.spec.layout {
                Layout::Nested => {
                    let table = lua.create_table()?;
                    for binding in ns.bindings.iter().filter(|b| self.installs(b)) {
                        table.set(binding.name, self.function(lua, binding.name, binding)?)?;
                    }
                    for (key, value) in ns.constants {
                        table.set(*key, *value)?;
                    }
                    module.set(ns.name, table)?;
                }
                Layout::Flattened => {
                    for binding in ns.bindings.iter().filter(|b| self.installs(b)) {
                        let name = flatten_name(ns.name, binding.name);
                        module.set(name.as_str(), self.function(lua, &name, binding)?)?;
                    }
                }
            }
        }

        for binding in self.spec.root.iter().filter(|b| self.installs(b)) {
            module.set(binding.name, self.function(lua, binding.name, binding)?)?;
        }

        for group in self.spec.constants {
            let table = lua.create_table()?;
            for (key, value) in group.entries {
                table.set(*key, *value)?;
            }
            module.set(group.name, table)?;
        }

        if let Some(extend) = self.spec.extend {
            extend(lua, &module, self)?;
        }

        trace!(adapter = self.spec.name, bridge = dispatcher.bridge_id(), "module created");
        Ok(module)
    }
}
