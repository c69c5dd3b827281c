//! Argument-position checks performed before a bridge call

use rlua::Value;

use crate::error::{BridgeError, BridgeResult};
use crate::value::{ObjectMap, TaggedValue};

/// Shape a binding expects at one argument position
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArgKind {
    Any,
    String,
    Number,
    Bool,
    Table,
    Function,
}

impl ArgKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ArgKind::Any => "value",
            ArgKind::String => "string",
            ArgKind::Number => "number",
            ArgKind::Bool => "boolean",
            ArgKind::Table => "table",
            ArgKind::Function => "function",
        }
    }

    fn accepts(&self, value: &Value) -> bool {
        match self {
            ArgKind::Any => !matches!(value, Value::Nil),
            // Lua coerces numbers to strings in string positions
            ArgKind::String => matches!(value, Value::String(_) | Value::Integer(_) | Value::Number(_)),
            ArgKind::Number => matches!(value, Value::Integer(_) | Value::Number(_)),
            ArgKind::Bool => matches!(value, Value::Boolean(_)),
            ArgKind::Table => matches!(value, Value::Table(_)),
            ArgKind::Function => matches!(value, Value::Function(_)),
        }
    }
}

/// Expectation for a single argument position
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ArgSpec {
    pub kind: ArgKind,
    pub optional: bool,
    /// A missing table at this position is sent to the provider as `{}`
    pub empty_default: bool,
}

impl ArgSpec {
    pub const fn required(kind: ArgKind) -> Self {
        Self {
            kind,
            optional: false,
            empty_default: false,
        }
    }

    pub const fn optional(kind: ArgKind) -> Self {
        Self {
            kind,
            optional: true,
            empty_default: false,
        }
    }

    /// Optional table that defaults to an empty object
    pub const fn table_or_empty() -> Self {
        Self {
            kind: ArgKind::Table,
            optional: true,
            empty_default: true,
        }
    }
}

/// Shorthands used by the adapter binding tables
pub mod arg {
    use super::{ArgKind, ArgSpec};

    pub const ANY: ArgSpec = ArgSpec::required(ArgKind::Any);
    pub const STR: ArgSpec = ArgSpec::required(ArgKind::String);
    pub const NUM: ArgSpec = ArgSpec::required(ArgKind::Number);
    pub const BOOL: ArgSpec = ArgSpec::required(ArgKind::Bool);
    pub const TABLE: ArgSpec = ArgSpec::required(ArgKind::Table);
    pub const FUNC: ArgSpec = ArgSpec::required(ArgKind::Function);
    pub const OPT_STR: ArgSpec = ArgSpec::optional(ArgKind::String);
    pub const OPT_TABLE: ArgSpec = ArgSpec::optional(ArgKind::Table);
    pub const TABLE_OR_EMPTY: ArgSpec = ArgSpec::table_or_empty();
}

/// Type name as Lua reports it in argument errors
pub fn lua_type_name(value: Option<&Value>) -> &'static str {
    match value {
        None => "no value",
        Some(Value::Nil) => "nil",
        Some(Value::Boolean(_)) => "boolean",
        Some(Value::Integer(_)) | Some(Value::Number(_)) => "number",
        Some(Value::String(_)) => "string",
        Some(Value::Table(_)) => "table",
        Some(Value::Function(_)) => "function",
        Some(Value::Thread(_)) => "thread",
        Some(Value::UserData(_)) | Some(Value::LightUserData(_)) => "userdata",
        Some(Value::Error(_)) => "error",
        #[allow(unreachable_patterns)]
        Some(_) => "value",
    }
}

/// Check script arguments against a binding's expectations.
///
/// Positions beyond `specs` are not checked and are forwarded as-is.
pub fn check_args(method: &str, specs: &[ArgSpec], args: &[Value]) -> BridgeResult<()> {
    for (index, spec) in specs.iter().enumerate() {
        let value = args.get(index);
        let missing = matches!(value, None | Some(Value::Nil));
        if missing && spec.optional {
            continue;
        }
        let ok = value.map(|v| spec.kind.accepts(v)).unwrap_or(false);
        if !ok {
            return Err(BridgeError::ConversionFailure {
                method: method.to_string(),
                position: index + 1,
                expected: spec.kind.as_str().to_string(),
                found: lua_type_name(value).to_string(),
            });
        }
    }
    Ok(())
}

/// Substitute `{}` for missing arguments at `empty_default` positions
pub fn fill_defaults(specs: &[ArgSpec], args: &mut Vec<TaggedValue>) {
    for (index, spec) in specs.iter().enumerate() {
        if !spec.empty_default {
            continue;
        }
        if args.len() <= index {
            args.resize(index + 1, TaggedValue::Nil);
        }
        if args[index].is_nil() {
            args[index] = TaggedValue::Object(ObjectMap::new());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::arg::*;
    use super::*;
    use rlua::Lua;

    #[test]
    fn test_check_args_accepts_matching_shapes() {
        let lua = Lua::new();
        let table = lua.create_table().unwrap();
        let args = vec![
            Value::String(lua.create_string("agent-1").unwrap()),
            Value::Table(table),
        ];
        assert!(check_args("create", &[STR, TABLE], &args).is_ok());
        // numbers are acceptable where strings are expected
        assert!(check_args("get", &[STR], &[Value::Integer(7)]).is_ok());
    }

    #[test]
    fn test_check_args_reports_position_and_types() {
        let lua = Lua::new();
        let args = vec![
            Value::String(lua.create_string("agent-1").unwrap()),
            Value::String(lua.create_string("oops").unwrap()),
        ];
        let err = check_args("create", &[STR, TABLE], &args).unwrap_err();
        assert_eq!(err.to_string(), "bad argument #2 to 'create' (table expected, got string)");

        let err = check_args("get", &[STR], &[]).unwrap_err();
        assert_eq!(err.to_string(), "bad argument #1 to 'get' (string expected, got no value)");
    }

    #[test]
    fn test_optional_positions() {
        assert!(check_args("merge", &[OPT_TABLE, OPT_STR], &[]).is_ok());
        assert!(check_args("merge", &[OPT_TABLE], &[Value::Nil]).is_ok());
        let err = check_args("merge", &[OPT_TABLE], &[Value::Boolean(true)]).unwrap_err();
        assert!(err.to_string().contains("table expected, got boolean"));
    }

    #[test]
    fn test_fill_defaults() {
        let mut args = vec![TaggedValue::from("gpt")];
        fill_defaults(&[STR, TABLE_OR_EMPTY], &mut args);
        assert_eq!(args, vec![TaggedValue::from("gpt"), TaggedValue::Object(ObjectMap::new())]);

        // explicit tables and positions without a default are left alone
        let config = TaggedValue::object([("model", "x".into())]);
        let mut args = vec![TaggedValue::from("gpt"), config.clone()];
        fill_defaults(&[STR, TABLE_OR_EMPTY], &mut args);
        assert_eq!(args[1], config);

        let mut args = vec![];
        fill_defaults(&[OPT_TABLE], &mut args);
        assert!(args.is_empty());

        assert!(check_args("createLLM", &[STR, TABLE_OR_EMPTY], &[Value::Integer(1)]).is_ok());
    }

    #[test]
    fn test_any_rejects_missing() {
        assert!(check_args("publish", &[ANY], &[Value::Nil]).is_err());
        assert!(check_args("publish", &[ANY], &[Value::Boolean(false)]).is_ok());
    }
}
