use rlua::{FromLuaMulti, Lua, MultiValue, Result as LuaResult, Value};
use tokio_util::sync::CancellationToken;
use tracing::{info, instrument, trace};

use super::convert::LuaConverter;
use crate::error::BridgeResult;
use crate::registry::ModuleRegistry;
use crate::value::TaggedValue;
use crate::Config;

/// A Lua state that scripts run in, with bridge modules made `require`-able.
///
/// Each host owns one state; calls from a script are sequential, so a host is
/// used from one thread at a time.
pub struct ScriptHost {
    lua: Lua,
    config: Config,
    cancel: CancellationToken,
}

impl ScriptHost {
    pub fn new(config: Config) -> BridgeResult<Self> {
        let lua = Lua::new();

        // print goes to the log instead of stdout
        let print = lua.create_function(|_, args: MultiValue| {
            let line = args.into_iter().map(|v| display_value(&v)).collect::<Vec<_>>().join("\t");
            info!(target: "spellbridge::script", "{}", line);
            Ok(())
        })?;
        lua.globals().set("print", print)?;

        Ok(Self {
            lua,
            config,
            cancel: CancellationToken::new(),
        })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Token to hand to adapters so that `cancel` aborts their pending calls
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Abort pending bridge calls made through adapters sharing this host's token
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Make every module of `registry` loadable with `require`
    pub fn install(&self, registry: &ModuleRegistry) -> BridgeResult<()> {
        registry.install(&self.lua)?;
        trace!(modules = ?registry.names(), "modules installed");
        Ok(())
    }

    #[instrument(skip(self, code), fields(len = code.len()))]
    pub fn exec(&self, code: &str) -> BridgeResult<()> {
        self.lua.load(code).exec()?;
        Ok(())
    }

    pub fn eval<'lua, T: FromLuaMulti<'lua>>(&'lua self, code: &str) -> BridgeResult<T> {
        Ok(self.lua.load(code).eval()?)
    }

    /// Evaluate `code` and convert its first result into a `TaggedValue`
    pub fn eval_tagged(&self, code: &str) -> BridgeResult<TaggedValue> {
        let value: Value = self.lua.load(code).eval()?;
        Ok(LuaConverter::from_config(&self.config).to_tagged(&self.lua, value))
    }

    pub fn with_lua<F, R>(&self, f: F) -> LuaResult<R>
    where
        F: FnOnce(&Lua) -> LuaResult<R>,
    {
        f(&self.lua)
    }
}

fn display_value(value: &Value) -> String {
    match value {
        Value::Nil => "nil".to_string(),
        Value::Boolean(b) => b.to_string(),
        Value::Integer(i) => i.to_string(),
        Value::Number(n) => n.to_string(),
        Value::String(s) => s.to_string_lossy().into_owned(),
        other => other.type_name().to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_host_creation() {
        let host = ScriptHost::new(Config::default()).unwrap();
        assert!(host.exec("local x = 1 + 1").is_ok());
    }

    #[test]
    fn test_print() {
        let host = ScriptHost::new(Config::default()).unwrap();
        assert!(host.exec(r#"print("Hello from Lua!", 1, nil, {})"#).is_ok());
    }

    #[test]
    fn test_eval() {
        let host = ScriptHost::new(Config::default()).unwrap();
        let sum: i64 = host.eval("return 2 + 4 + 6").unwrap();
        assert_eq!(sum, 12);
        let (a, b): (String, bool) = host.eval(r#"return "x", true"#).unwrap();
        assert_eq!(a, "x");
        assert!(b);
    }

    #[test]
    fn test_eval_tagged() {
        let host = ScriptHost::new(Config::default()).unwrap();
        let value = host.eval_tagged(r#"return { name = "a", tags = { "x", "y" } }"#).unwrap();
        assert_eq!(value.get("name"), Some(&TaggedValue::from("a")));
        assert_eq!(
            value.get("tags"),
            Some(&TaggedValue::Array(vec!["x".into(), "y".into()]))
        );
    }

    #[test]
    fn test_syntax_error_is_reported() {
        let host = ScriptHost::new(Config::default()).unwrap();
        let err = host.exec("local = ").unwrap_err();
        assert!(matches!(err, crate::error::BridgeError::Lua(_)));
    }

    #[test]
    fn test_with_lua() {
        let host = ScriptHost::new(Config::default()).unwrap();
        let result = host.with_lua(|lua| {
            lua.globals().set("answer", 42)?;
            lua.load("return answer * 2").eval::<i64>()
        });
        assert_eq!(result.unwrap(), 84);
    }

    #[test]
    fn test_cancel_token_is_shared() {
        let host = ScriptHost::new(Config::default()).unwrap();
        let token = host.cancellation_token();
        host.cancel();
        assert!(token.is_cancelled());
    }
}
