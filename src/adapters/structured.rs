//! `structured` module: schema validation, generation, storage and
//! import/export, flattened onto the module table (`validationValidateJSON`).

use super::{AdapterSpec, Binding, ConstantGroup, Layout, Namespace};
use crate::lua::arg::{OPT_STR, STR, TABLE, TABLE_OR_EMPTY};

pub static STRUCTURED: AdapterSpec = AdapterSpec {
    name: "structured",
    version: "2.0.0",
    layout: Layout::Flattened,
    bridge_methods: true,
    namespaces: &[
        Namespace {
            name: "validation",
            bindings: &[
                Binding::new("validateJSON", "validateJSON", &[TABLE, TABLE]),
                Binding::new("validateStruct", "validateStruct", &[TABLE, TABLE]),
            ],
            constants: &[],
        },
        Namespace {
            name: "generation",
            bindings: &[
                Binding::new("fromType", "generateSchemaFromType", &[TABLE]),
                Binding::new("fromTags", "generateFromTags", &[TABLE]),
                Binding::new("fromJSONSchema", "convertJSONSchema", &[STR]),
            ],
            constants: &[],
        },
        Namespace {
            name: "repository",
            bindings: &[
                Binding::void("save", "saveSchema", &[STR, TABLE]),
                Binding::new("get", "getSchema", &[STR]),
                Binding::void("delete", "deleteSchema", &[STR]),
                Binding::void("initializeFile", "initializeFileRepository", &[STR]),
            ],
            constants: &[],
        },
        Namespace {
            name: "importExport",
            bindings: &[
                Binding::new("toJSONSchema", "exportToJSONSchema", &[TABLE]),
                Binding::new("toOpenAPI", "exportToOpenAPI", &[TABLE]),
                Binding::new("fromFile", "importFromFile", &[STR, OPT_STR]),
                Binding::new("merge", "mergeSchemas", &[TABLE, OPT_STR]),
            ],
            constants: &[],
        },
        Namespace {
            name: "custom",
            bindings: &[
                Binding::void("registerValidator", "registerCustomValidator", &[STR, TABLE]),
                Binding::new("validate", "validateWithCustom", &[TABLE, STR]),
                Binding::new("listValidators", "listCustomValidators", &[]),
                Binding::new("validateAsync", "validateAsync", &[TABLE, TABLE]),
                Binding::new("getMetrics", "getValidationMetrics", &[]),
            ],
            constants: &[],
        },
        Namespace {
            name: "utils",
            bindings: &[Binding::new("generateDiff", "generateDiff", &[TABLE, TABLE])],
            constants: &[],
        },
    ],
    root: &[Binding::new("createProperty", "createProperty", &[STR, TABLE_OR_EMPTY])],
    constants: &[
        ConstantGroup {
            name: "TYPES",
            entries: &[
                ("STRING", "string"),
                ("NUMBER", "number"),
                ("INTEGER", "integer"),
                ("BOOLEAN", "boolean"),
                ("OBJECT", "object"),
                ("ARRAY", "array"),
                ("NULL", "null"),
            ],
        },
        ConstantGroup {
            name: "FORMATS",
            entries: &[
                ("EMAIL", "email"),
                ("DATE", "date"),
                ("DATETIME", "date-time"),
                ("TIME", "time"),
                ("URI", "uri"),
                ("UUID", "uuid"),
                ("IPV4", "ipv4"),
                ("IPV6", "ipv6"),
            ],
        },
        ConstantGroup {
            name: "OPERATORS",
            entries: &[("AND", "and"), ("OR", "or"), ("NOT", "not")],
        },
    ],
    extend: None,
};

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use rlua::Lua;

    use super::*;
    use crate::adapters::ScriptAdapter;
    use crate::bridge::MethodTable;
    use crate::registry::ScriptModule;
    use crate::value::TaggedValue;
    use crate::Config;

    fn structured_bridge() -> MethodTable {
        MethodTable::new("structured")
            .method("validateJSON", |args| {
                let required = args
                    .first()
                    .and_then(|schema| schema.get("required"))
                    .and_then(TaggedValue::as_array)
                    .map(<[TaggedValue]>::to_vec)
                    .unwrap_or_default();
                let data = args.get(1).cloned().unwrap_or_default();
                let missing: Vec<TaggedValue> = required
                    .into_iter()
                    .filter(|key| key.as_str().map_or(false, |k| data.get(k).is_none()))
                    .collect();
                Ok(TaggedValue::object([
                    ("valid", missing.is_empty().into()),
                    ("missing", TaggedValue::Array(missing)),
                ]))
            })
            .method("listCustomValidators", |_| Ok(TaggedValue::Array(vec!["email".into(), "range".into()])))
    }

    #[test]
    fn test_flattened_names() {
        let adapter = ScriptAdapter::new(&STRUCTURED, Arc::new(structured_bridge()), &Config::default());
        let names = adapter.script_names();
        assert!(names.contains(&"validationValidateJSON".to_string()));
        assert!(names.contains(&"importExportToOpenAPI".to_string()));
        assert!(names.contains(&"repositoryInitializeFile".to_string()));
        assert!(names.contains(&"createProperty".to_string()));
        assert!(!names.iter().any(|n| n.contains('.')));
    }

    #[test]
    fn test_validation_through_flattened_function() {
        let lua = Lua::new();
        let adapter = ScriptAdapter::new(&STRUCTURED, Arc::new(structured_bridge()), &Config::default());
        lua.globals().set("structured", adapter.create_module(&lua).unwrap()).unwrap();

        let (valid, missing, first, second): (bool, String, String, String) = lua
            .load(
                r#"
                local schema = { type = structured.TYPES.OBJECT, required = { "name", "email" } }
                local result = structured.validationValidateJSON(schema, { name = "x" })
                local a, b = structured.customListValidators()
                return result.valid, result.missing[1], a, b
                "#,
            )
            .eval()
            .unwrap();
        assert!(!valid);
        assert_eq!(missing, "email");
        assert_eq!((first.as_str(), second.as_str()), ("email", "range"));
    }

    #[test]
    fn test_error_message_names_flattened_function() {
        let lua = Lua::new();
        let adapter = ScriptAdapter::new(&STRUCTURED, Arc::new(structured_bridge()), &Config::default());
        lua.globals().set("structured", adapter.create_module(&lua).unwrap()).unwrap();
        let err: String = lua
            .load(r#"return select(2, structured.validationValidateJSON("schema", {}))"#)
            .eval()
            .unwrap();
        assert_eq!(err, "bad argument #1 to 'validationValidateJSON' (table expected, got string)");
    }
}
