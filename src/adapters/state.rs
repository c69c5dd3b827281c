//! `state` module: transforms, shared context and persistence of agent
//! state, flattened onto the module table (`transformsApply`).
//!
//! Tables returned by the provider's `createState` gain `get`, `set` and
//! `has` so scripts can write `s:get("key")`.

use rlua::{Function, Lua, MultiValue, Result as LuaResult, Table, Value};

use super::{AdapterSpec, Binding, ConstantGroup, Layout, Namespace, ScriptAdapter};
use crate::lua::arg::{BOOL, FUNC, OPT_TABLE, STR, TABLE, TABLE_OR_EMPTY};

const STATE_METHODS: [&str; 3] = ["get", "set", "has"];

pub static STATE: AdapterSpec = AdapterSpec {
    name: "state",
    version: "1.0.0",
    layout: Layout::Flattened,
    bridge_methods: true,
    namespaces: &[
        Namespace {
            name: "transforms",
            bindings: &[
                Binding::new("apply", "applyTransform", &[STR, TABLE, TABLE_OR_EMPTY]),
                Binding::void("register", "registerTransform", &[STR, FUNC]),
                Binding::new("chain", "chainTransforms", &[TABLE, TABLE]),
                Binding::new("validate", "validateTransform", &[STR]),
                Binding::new("getAvailable", "getAvailableTransforms", &[]),
            ],
            constants: &[],
        },
        Namespace {
            name: "context",
            bindings: &[
                Binding::new("get", "getContext", &[STR]),
                Binding::void("set", "setContext", &[STR]),
                Binding::void("merge", "mergeContext", &[TABLE]),
                Binding::void("clear", "clearContext", &[]),
                Binding::new("createShared", "createSharedContext", &[OPT_TABLE]),
                Binding::new("withInheritance", "withInheritanceConfig", &[TABLE, BOOL, BOOL, BOOL]),
            ],
            constants: &[],
        },
        Namespace {
            name: "persistence",
            bindings: &[
                Binding::void("save", "saveState", &[TABLE]),
                Binding::new("load", "loadState", &[STR]),
                Binding::new("exists", "stateExists", &[STR]),
                Binding::table("listVersions", "listStates", &[]),
                Binding::void("delete", "deleteState", &[STR]),
            ],
            constants: &[],
        },
    ],
    root: &[
        Binding::new("mergeStates", "mergeStates", &[TABLE, STR]),
        Binding::new("get", "get", &[TABLE, STR]),
        Binding::new("set", "set", &[TABLE, STR]),
        Binding::new("has", "has", &[TABLE, STR]),
    ],
    constants: &[
        ConstantGroup {
            name: "TRANSFORM_TYPES",
            entries: &[("FILTER", "filter"), ("FLATTEN", "flatten"), ("SANITIZE", "sanitize")],
        },
        ConstantGroup {
            name: "MERGE_STRATEGIES",
            entries: &[("LAST", "last"), ("MERGE_ALL", "merge_all"), ("UNION", "union")],
        },
    ],
    extend: Some(extend_state_module),
};

fn extend_state_module<'lua>(lua: &'lua Lua, module: &Table<'lua>, _adapter: &ScriptAdapter) -> LuaResult<()> {
    module.set("TRANSFORM_FILTER", "filter")?;
    module.set("TRANSFORM_FLATTEN", "flatten")?;
    module.set("TRANSFORM_SANITIZE", "sanitize")?;

    let create = match module.get::<_, Option<Function>>("createState")? {
        Some(create) => lua.create_registry_value(create)?,
        None => return Ok(()),
    };
    let methods = lua.create_table()?;
    for name in STATE_METHODS {
        methods.set(name, module.get::<_, Value>(name)?)?;
    }
    let methods = lua.create_registry_value(methods)?;

    let wrapped = lua.create_function(move |lua, args: MultiValue| {
        let create: Function = lua.registry_value(&create)?;
        let results = create.call::<_, MultiValue>(args)?.into_vec();
        if let Some(Value::Table(state)) = results.first() {
            let methods: Table = lua.registry_value(&methods)?;
            for name in STATE_METHODS {
                state.set(name, methods.get::<_, Value>(name)?)?;
            }
        }
        Ok(MultiValue::from_vec(results))
    })?;
    module.set("createState", wrapped)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::bridge::MethodTable;
    use crate::registry::ScriptModule;
    use crate::value::TaggedValue;
    use crate::Config;

    fn state_bridge() -> MethodTable {
        MethodTable::new("state")
            .method("createState", |_| {
                Ok(TaggedValue::object([("data", TaggedValue::object([("k", "v".into())]))]))
            })
            .method("get", |args| {
                let key = args.get(1).and_then(TaggedValue::as_str).unwrap_or_default();
                let value = args
                    .first()
                    .and_then(|s| s.get("data"))
                    .and_then(|data| data.get(key))
                    .cloned();
                Ok(value.unwrap_or_default())
            })
            .method("has", |args| {
                let key = args.get(1).and_then(TaggedValue::as_str).unwrap_or_default();
                let found = args.first().and_then(|s| s.get("data")).and_then(|d| d.get(key)).is_some();
                Ok(found.into())
            })
            .method("listStates", |_| Ok(TaggedValue::Array(vec!["v1".into(), "v2".into()])))
    }

    fn load(lua: &Lua) {
        let adapter = ScriptAdapter::new(&STATE, Arc::new(state_bridge()), &Config::default());
        lua.globals().set("state", adapter.create_module(lua).unwrap()).unwrap();
    }

    #[test]
    fn test_state_object_methods() {
        let lua = Lua::new();
        load(&lua);
        let (value, has, missing): (String, bool, bool) = lua
            .load(
                r#"
                local s = state.createState()
                return s:get("k"), s:has("k"), s:has("other")
                "#,
            )
            .eval()
            .unwrap();
        assert_eq!(value, "v");
        assert!(has);
        assert!(!missing);
    }

    #[test]
    fn test_list_versions_stays_a_table() {
        let lua = Lua::new();
        load(&lua);
        let (count, err): (i64, Option<String>) = lua
            .load("local v, err = state.persistenceListVersions() return #v, err")
            .eval()
            .unwrap();
        assert_eq!(count, 2);
        assert!(err.is_none());
    }

    #[test]
    fn test_module_constants() {
        let lua = Lua::new();
        load(&lua);
        let (flat, grouped, union): (String, String, String) = lua
            .load("return state.TRANSFORM_FLATTEN, state.TRANSFORM_TYPES.FLATTEN, state.MERGE_STRATEGIES.UNION")
            .eval()
            .unwrap();
        assert_eq!(flat, grouped);
        assert_eq!(union, "union");
    }
}
