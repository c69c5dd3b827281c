//! Conversion between Lua values and `TaggedValue`.
//!
//! Both directions are total: anything Lua can hand us becomes some
//! `TaggedValue`, degrading to `Nil` for types outside the model, for tables
//! nested deeper than the configured limit and for self-referencing tables.

use std::ffi::c_void;

use rlua::{AnyUserData, Lua, MetaMethod, MultiValue, Result as LuaResult, Table, UserData, UserDataMethods, Value};
use tracing::warn;

use super::calling::{into_returns, Returns};
use crate::value::{CustomValue, ObjectMap, ScriptFunction, ScriptHandle, TaggedValue};
use crate::Config;

/// Default nesting limit for table conversion
pub const DEFAULT_MAX_DEPTH: usize = 32;

/// Userdata standing in for a host `Custom` value inside Lua
struct OpaqueValue(CustomValue);

impl UserData for OpaqueValue {
    fn add_methods<'lua, M: UserDataMethods<'lua, Self>>(methods: &mut M) {
        methods.add_meta_method(MetaMethod::ToString, |_, this, ()| {
            Ok(format!("{}: custom", this.0.type_name()))
        });
        methods.add_method("typeName", |_, this, ()| Ok(this.0.type_name().to_string()));
    }
}

/// Bidirectional Lua/`TaggedValue` converter
#[derive(Debug, Clone, Copy)]
pub struct LuaConverter {
    max_depth: usize,
}

impl Default for LuaConverter {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_DEPTH)
    }
}

impl LuaConverter {
    pub fn new(max_depth: usize) -> Self {
        Self { max_depth }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(config.max_conversion_depth)
    }

    pub fn max_depth(&self) -> usize {
        self.max_depth
    }

    /// Convert a Lua value into a `TaggedValue`. Never fails.
    pub fn to_tagged<'lua>(&self, lua: &'lua Lua, value: Value<'lua>) -> TaggedValue {
        let mut visiting = Vec::new();
        self.to_tagged_at(lua, value, 0, &mut visiting)
    }

    /// Convert every value of a call's argument list
    pub fn args_to_tagged<'lua>(&self, lua: &'lua Lua, args: MultiValue<'lua>) -> Vec<TaggedValue> {
        args.into_iter().map(|v| self.to_tagged(lua, v)).collect()
    }

    fn to_tagged_at<'lua>(
        &self,
        lua: &'lua Lua,
        value: Value<'lua>,
        depth: usize,
        visiting: &mut Vec<*const c_void>,
    ) -> TaggedValue {
        match value {
            Value::Nil => TaggedValue::Nil,
            Value::Boolean(b) => TaggedValue::Bool(b),
            Value::Integer(i) => TaggedValue::Number(i as f64),
            Value::Number(n) => TaggedValue::Number(n),
            Value::String(s) => TaggedValue::String(s.to_string_lossy().into_owned()),
            Value::Table(table) => self.table_to_tagged(lua, table, depth, visiting),
            Value::Function(f) => match lua.create_registry_value(f) {
                Ok(key) => TaggedValue::Function(ScriptFunction::script("lua_function", ScriptHandle::new(key))),
                Err(err) => {
                    warn!(error = %err, "could not pin Lua function, converting to nil");
                    TaggedValue::Nil
                }
            },
            Value::UserData(ud) => userdata_to_tagged(lua, ud),
            Value::Error(err) => TaggedValue::Error(err.to_string()),
            _ => TaggedValue::Nil,
        }
    }

    fn table_to_tagged<'lua>(
        &self,
        lua: &'lua Lua,
        table: Table<'lua>,
        depth: usize,
        visiting: &mut Vec<*const c_void>,
    ) -> TaggedValue {
        if depth > self.max_depth {
            warn!(max_depth = self.max_depth, "table nested too deeply, converting to nil");
            return TaggedValue::Nil;
        }
        let identity = table.to_pointer();
        if visiting.contains(&identity) {
            warn!("self-referencing table, converting to nil");
            return TaggedValue::Nil;
        }

        let mut entries = Vec::new();
        for pair in table.clone().pairs::<Value, Value>() {
            match pair {
                Ok(entry) => entries.push(entry),
                Err(err) => warn!(error = %err, "skipping unreadable table entry"),
            }
        }

        visiting.push(identity);
        let converted = match sequence_len(&entries) {
            Some(len) => {
                let mut items = vec![TaggedValue::Nil; len];
                for (key, value) in entries {
                    if let Some(index) = array_index(&key, len) {
                        items[index - 1] = self.to_tagged_at(lua, value, depth + 1, visiting);
                    }
                }
                TaggedValue::Array(items)
            }
            None => {
                let mut fields = ObjectMap::new();
                for (position, (key, value)) in entries.into_iter().enumerate() {
                    let key = object_key(&key, position);
                    let value = self.to_tagged_at(lua, value, depth + 1, visiting);
                    fields.insert(key, value);
                }
                TaggedValue::Object(fields)
            }
        };
        visiting.pop();
        converted
    }

    /// Convert a `TaggedValue` into a Lua value.
    ///
    /// Only Lua allocation failures produce an error.
    pub fn from_tagged<'lua>(&self, lua: &'lua Lua, value: &TaggedValue) -> LuaResult<Value<'lua>> {
        self.from_tagged_at(lua, value, 0)
    }

    fn from_tagged_at<'lua>(&self, lua: &'lua Lua, value: &TaggedValue, depth: usize) -> LuaResult<Value<'lua>> {
        if depth > self.max_depth {
            warn!(max_depth = self.max_depth, "value nested too deeply, converting to nil");
            return Ok(Value::Nil);
        }
        let converted = match value {
            TaggedValue::Nil => Value::Nil,
            TaggedValue::Bool(b) => Value::Boolean(*b),
            TaggedValue::Number(n) => number_to_lua(*n),
            TaggedValue::String(s) | TaggedValue::Error(s) => Value::String(lua.create_string(s)?),
            TaggedValue::Array(items) => {
                let table = lua.create_table()?;
                for (i, item) in items.iter().enumerate() {
                    table.raw_set(i + 1, self.from_tagged_at(lua, item, depth + 1)?)?;
                }
                Value::Table(table)
            }
            TaggedValue::Object(fields) => {
                let table = lua.create_table()?;
                for (key, item) in fields {
                    table.raw_set(key.as_str(), self.from_tagged_at(lua, item, depth + 1)?)?;
                }
                Value::Table(table)
            }
            TaggedValue::Function(f) => self.function_to_lua(lua, f)?,
            TaggedValue::Custom(custom) => match custom.script_handle() {
                Some(handle) => pinned_value(lua, handle),
                None => Value::UserData(lua.create_userdata(OpaqueValue(custom.clone()))?),
            },
        };
        Ok(converted)
    }

    fn function_to_lua<'lua>(&self, lua: &'lua Lua, f: &ScriptFunction) -> LuaResult<Value<'lua>> {
        if let Some(handle) = f.script_handle() {
            return Ok(pinned_value(lua, handle));
        }
        let native = match f.native_fn() {
            Some(native) => native,
            None => return Ok(Value::Nil),
        };
        let converter = *self;
        let func = lua.create_function(move |lua, args: MultiValue| {
            let args = converter.args_to_tagged(lua, args);
            into_returns(lua, &converter, native(args), Returns::Value)
        })?;
        Ok(Value::Function(func))
    }
}

fn userdata_to_tagged<'lua>(lua: &'lua Lua, ud: AnyUserData<'lua>) -> TaggedValue {
    let existing = ud.borrow::<OpaqueValue>().ok().map(|opaque| opaque.0.clone());
    if let Some(custom) = existing {
        return TaggedValue::Custom(custom);
    }
    match lua.create_registry_value(ud) {
        Ok(key) => TaggedValue::Custom(CustomValue::script("userdata", ScriptHandle::new(key))),
        Err(err) => {
            warn!(error = %err, "could not pin userdata, converting to nil");
            TaggedValue::Nil
        }
    }
}

/// Fetch a value pinned by a handle; handles from another Lua state yield nil
fn pinned_value<'lua>(lua: &'lua Lua, handle: &ScriptHandle) -> Value<'lua> {
    match lua.registry_value::<Value>(handle.key()) {
        Ok(value) => value,
        Err(err) => {
            warn!(error = %err, "script handle not usable in this Lua state");
            Value::Nil
        }
    }
}

fn number_to_lua<'lua>(n: f64) -> Value<'lua> {
    if n.fract() == 0.0 && n >= i64::MIN as f64 && n < i64::MAX as f64 {
        Value::Integer(n as i64)
    } else {
        Value::Number(n)
    }
}

fn array_index(key: &Value, len: usize) -> Option<usize> {
    let index = match key {
        Value::Integer(i) => *i,
        Value::Number(n) if n.fract() == 0.0 => *n as i64,
        _ => return None,
    };
    if index >= 1 && index as usize <= len {
        Some(index as usize)
    } else {
        None
    }
}

/// Length of the table as a sequence, if its keys are exactly `1..=n`.
/// Empty tables are not sequences.
fn sequence_len(entries: &[(Value, Value)]) -> Option<usize> {
    let len = entries.len();
    if len == 0 {
        return None;
    }
    // keys are unique, so n in-range integer keys cover 1..=n exactly
    if entries.iter().all(|(key, _)| array_index(key, len).is_some()) {
        Some(len)
    } else {
        None
    }
}

fn object_key(key: &Value, position: usize) -> String {
    match key {
        Value::String(s) => s.to_string_lossy().into_owned(),
        Value::Integer(i) => i.to_string(),
        Value::Number(n) => n.to_string(),
        Value::Boolean(b) => b.to_string(),
        other => format!("{}#{}", other.type_name(), position + 1),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn eval<'lua>(lua: &'lua Lua, code: &str) -> Value<'lua> {
        lua.load(code).eval().unwrap()
    }

    #[test]
    fn test_scalars_round_trip() {
        let lua = Lua::new();
        let conv = LuaConverter::default();

        for code in ["'hello'", "42", "3.5", "true", "false", "-7"] {
            let original = eval(&lua, code);
            let back = conv.from_tagged(&lua, &conv.to_tagged(&lua, original.clone())).unwrap();
            let same: bool = lua
                .load("local a, b = ...; return a == b and math.type(a) == math.type(b)")
                .call((original, back))
                .unwrap();
            assert!(same, "round trip changed {}", code);
        }
    }

    #[test]
    fn test_sequence_becomes_array_in_order() {
        let lua = Lua::new();
        let conv = LuaConverter::default();
        let tagged = conv.to_tagged(&lua, eval(&lua, "{'a', 'b', 'c'}"));
        assert_eq!(
            tagged,
            TaggedValue::Array(vec!["a".into(), "b".into(), "c".into()])
        );
    }

    #[test]
    fn test_sparse_or_keyed_table_becomes_object() {
        let lua = Lua::new();
        let conv = LuaConverter::default();

        let sparse = conv.to_tagged(&lua, eval(&lua, "{[1] = 'a', [3] = 'c'}"));
        assert_eq!(sparse, TaggedValue::object([("1", "a".into()), ("3", "c".into())]));

        let mixed = conv.to_tagged(&lua, eval(&lua, "{'a', name = 'x'}"));
        assert_eq!(mixed, TaggedValue::object([("1", "a".into()), ("name", "x".into())]));

        let zero_based = conv.to_tagged(&lua, eval(&lua, "{[0] = 'z', [1] = 'a'}"));
        assert_eq!(zero_based.kind(), crate::value::ValueKind::Object);
    }

    #[test]
    fn test_empty_table_is_empty_object() {
        let lua = Lua::new();
        let conv = LuaConverter::default();
        assert_eq!(conv.to_tagged(&lua, eval(&lua, "{}")), TaggedValue::Object(ObjectMap::new()));
    }

    #[test]
    fn test_nested_tables() {
        let lua = Lua::new();
        let conv = LuaConverter::default();
        let tagged = conv.to_tagged(&lua, eval(&lua, "{id = 'a', tags = {'x', 'y'}, meta = {n = 1}}"));
        assert_eq!(tagged.get("tags"), Some(&TaggedValue::Array(vec!["x".into(), "y".into()])));
        assert_eq!(tagged.get("meta").and_then(|m| m.get("n")), Some(&TaggedValue::Number(1.0)));
    }

    #[test]
    fn test_cycles_degrade_to_nil() {
        let lua = Lua::new();
        let conv = LuaConverter::default();
        let tagged = conv.to_tagged(&lua, eval(&lua, "local t = {name = 'loop'}; t.self = t; return t"));
        assert_eq!(tagged.get("name"), Some(&TaggedValue::from("loop")));
        assert_eq!(tagged.get("self"), Some(&TaggedValue::Nil));
    }

    #[test]
    fn test_depth_limit_degrades_to_nil() {
        let lua = Lua::new();
        let conv = LuaConverter::new(1);
        let tagged = conv.to_tagged(&lua, eval(&lua, "{a = {b = {c = 1}}}"));
        assert_eq!(tagged.get("a").and_then(|a| a.get("b")), Some(&TaggedValue::Nil));
    }

    #[test]
    fn test_lua_function_round_trips_to_same_function() {
        let lua = Lua::new();
        let conv = LuaConverter::default();
        let original = eval(&lua, "function(x) return x + 1 end");
        let tagged = conv.to_tagged(&lua, original.clone());

        let func = match &tagged {
            TaggedValue::Function(f) => f.clone(),
            other => panic!("expected function, got {:?}", other),
        };
        assert!(!func.is_native());
        assert!(func.call(vec![]).is_err());

        let back = conv.from_tagged(&lua, &tagged).unwrap();
        let same: bool = lua.load("local a, b = ...; return rawequal(a, b)").call((original, back)).unwrap();
        assert!(same);
    }

    #[test]
    fn test_native_function_follows_calling_convention() {
        let lua = Lua::new();
        let conv = LuaConverter::default();
        let add = TaggedValue::Function(ScriptFunction::native("add", |args| {
            let sum: f64 = args.iter().filter_map(TaggedValue::as_f64).sum();
            Ok(TaggedValue::Number(sum))
        }));
        lua.globals().set("add", conv.from_tagged(&lua, &add).unwrap()).unwrap();
        let (sum, err): (i64, Option<String>) = lua.load("return add(1, 2, 3)").eval().unwrap();
        assert_eq!(sum, 6);
        assert!(err.is_none());
    }

    #[test]
    fn test_custom_value_round_trips_through_userdata() {
        let lua = Lua::new();
        let conv = LuaConverter::default();
        let custom = CustomValue::new("session", 99u64);
        let value = conv.from_tagged(&lua, &TaggedValue::Custom(custom.clone())).unwrap();

        lua.globals().set("handle", value.clone()).unwrap();
        let text: String = lua.load("return tostring(handle)").eval().unwrap();
        assert_eq!(text, "session: custom");

        match conv.to_tagged(&lua, value) {
            TaggedValue::Custom(back) => assert!(back.same_as(&custom)),
            other => panic!("expected custom, got {:?}", other),
        }
    }

    struct ForeignHandle;

    impl UserData for ForeignHandle {}

    #[test]
    fn test_foreign_userdata_round_trips_to_same_userdata() {
        let lua = Lua::new();
        let conv = LuaConverter::default();
        let original = Value::UserData(lua.create_userdata(ForeignHandle).unwrap());

        let tagged = conv.to_tagged(&lua, original.clone());
        match &tagged {
            TaggedValue::Custom(custom) => {
                assert_eq!(custom.type_name(), "userdata");
                assert!(custom.downcast_ref::<ForeignHandle>().is_none());
            }
            other => panic!("expected custom, got {:?}", other),
        }

        let back = conv.from_tagged(&lua, &tagged).unwrap();
        let same: bool = lua.load("local a, b = ...; return rawequal(a, b)").call((original, back)).unwrap();
        assert!(same);
    }

    #[test]
    fn test_lua_error_value_becomes_error() {
        let lua = Lua::new();
        let conv = LuaConverter::default();
        let value = Value::Error(rlua::Error::RuntimeError("quota exceeded".into()));
        match conv.to_tagged(&lua, value) {
            TaggedValue::Error(message) => assert!(message.contains("quota exceeded")),
            other => panic!("expected error, got {:?}", other),
        }
    }

    #[test]
    fn test_handles_from_another_state_become_nil() {
        let home = Lua::new();
        let other = Lua::new();
        let conv = LuaConverter::default();

        let func = conv.to_tagged(&home, eval(&home, "function() end"));
        let userdata = conv.to_tagged(&home, Value::UserData(home.create_userdata(ForeignHandle).unwrap()));
        assert!(matches!(func, TaggedValue::Function(_)));
        assert!(matches!(userdata, TaggedValue::Custom(_)));

        assert!(conv.from_tagged(&other, &func).unwrap().is_nil());
        assert!(conv.from_tagged(&other, &userdata).unwrap().is_nil());
        // still usable where they were pinned
        assert!(!conv.from_tagged(&home, &func).unwrap().is_nil());
    }

    #[test]
    fn test_error_becomes_string() {
        let lua = Lua::new();
        let conv = LuaConverter::default();
        let value = conv.from_tagged(&lua, &TaggedValue::Error("quota exceeded".into())).unwrap();
        match value {
            Value::String(s) => assert_eq!(s.to_str().unwrap(), "quota exceeded"),
            other => panic!("expected string, got {:?}", other),
        }
    }

    #[test]
    fn test_unsupported_values_become_nil() {
        let lua = Lua::new();
        let conv = LuaConverter::default();
        let thread = eval(&lua, "coroutine.create(function() end)");
        assert_eq!(conv.to_tagged(&lua, thread), TaggedValue::Nil);
    }

    #[test]
    fn test_array_to_lua_sequence() {
        let lua = Lua::new();
        let conv = LuaConverter::default();
        let value = conv
            .from_tagged(&lua, &TaggedValue::Array(vec!["x".into(), TaggedValue::Number(2.0)]))
            .unwrap();
        lua.globals().set("seq", value).unwrap();
        let (len, first, second): (i64, String, i64) =
            lua.load("return #seq, seq[1], seq[2]").eval().unwrap();
        assert_eq!((len, first.as_str(), second), (2, "x", 2));
    }
}
