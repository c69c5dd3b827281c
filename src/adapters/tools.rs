//! `tools` module: tool discovery, execution, registration and the
//! `createBuilder` fluent definition API.
//!
//! Listing functions unpack their results into separate return values; the
//! registry functions are only present when the provider offers them.

use rlua::{Function, Lua, Result as LuaResult, Table};

use super::{AdapterSpec, Binding, ConstantGroup, Layout, ScriptAdapter};
use crate::lua::arg::{STR, TABLE};

const TOOL_BUILDER: &str = include_str!("../../lua/tool_builder.lua");

pub static TOOLS: AdapterSpec = AdapterSpec {
    name: "tools",
    version: "2.0.0",
    layout: Layout::Nested,
    bridge_methods: false,
    namespaces: &[],
    root: &[
        Binding::new("listTools", "listTools", &[]),
        Binding::new("searchTools", "searchTools", &[STR]),
        Binding::table("getToolInfo", "getToolInfo", &[STR]),
        Binding::table("getToolSchema", "getToolSchema", &[STR]),
        Binding::new("getCategories", "getToolCategories", &[]),
        Binding::new("listByCategory", "listToolsByCategory", &[STR]),
        Binding::new("listByTags", "listToolsByTags", &[TABLE]),
        Binding::table("executeTool", "executeTool", &[STR, TABLE]),
        Binding::table("executeAsync", "executeToolAsync", &[STR, TABLE]),
        Binding::table("registerCustomTool", "registerCustomTool", &[TABLE]),
        Binding::table("validateToolInput", "validateToolInput", &[STR, TABLE]),
        Binding::table("getToolMetrics", "getToolMetrics", &[STR]),
        // registry
        Binding::table("getTool", "getTool", &[STR]).if_provided(),
        Binding::new("listToolsByPermission", "listToolsByPermission", &[STR]).if_provided(),
        Binding::new("listToolsByResourceUsage", "listToolsByResourceUsage", &[TABLE]).if_provided(),
        Binding::table("getToolDocumentation", "getToolDocumentation", &[STR]).if_provided(),
        Binding::table("exportToolToMCP", "exportToolToMCP", &[STR]).if_provided(),
        Binding::table("exportAllToolsToMCP", "exportAllToolsToMCP", &[]).if_provided(),
        Binding::table("clearRegistry", "clearRegistry", &[]).if_provided(),
        Binding::table("getRegistryStats", "getRegistryStats", &[]).if_provided(),
    ],
    constants: &[
        ConstantGroup {
            name: "CATEGORIES",
            entries: &[
                ("MATH", "math"),
                ("API", "api"),
                ("TEXT", "text"),
                ("FILE", "file"),
                ("SYSTEM", "system"),
            ],
        },
        ConstantGroup {
            name: "PERMISSIONS",
            entries: &[
                ("NETWORK", "network"),
                ("FILE_READ", "file_read"),
                ("FILE_WRITE", "file_write"),
                ("SYSTEM", "system"),
            ],
        },
        ConstantGroup {
            name: "RESOURCE_USAGE",
            entries: &[("LOW", "low"), ("MEDIUM", "medium"), ("HIGH", "high")],
        },
    ],
    extend: Some(install_builder),
};

/// Adds `createBuilder(name)`; `build()` registers through `registerCustomTool`
fn install_builder<'lua>(lua: &'lua Lua, module: &Table<'lua>, _adapter: &ScriptAdapter) -> LuaResult<()> {
    let register: Function = module.get("registerCustomTool")?;
    let factory: Function = lua.load(TOOL_BUILDER).set_name("tool_builder").eval()?;
    let create: Function = factory.call(register)?;
    module.set("createBuilder", create)
}
