//! The script-facing calling convention.
//!
//! Every wrapped call returns through the same shapes:
//!
//! | outcome                        | Lua returns             |
//! |--------------------------------|-------------------------|
//! | failure                        | `nil, message`          |
//! | success, `nil` result          | `nil`                   |
//! | success, one-element array     | `element, nil`          |
//! | success, n-element array       | `e1, ..., en`           |
//! | success, any other value       | `value, nil`            |

use std::sync::Arc;

use rlua::{Function, Lua, MultiValue, Result as LuaResult, Value};
use tokio_util::sync::CancellationToken;

use super::args::{check_args, fill_defaults, ArgSpec};
use super::convert::LuaConverter;
use crate::bridge::MethodDispatcher;
use crate::error::BridgeResult;
use crate::value::TaggedValue;

/// How a binding hands a successful result back to the script
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Returns {
    /// Variant-driven shapes (arrays unpack into separate slots)
    Value,
    /// Always `value, nil`; arrays stay tables
    Table,
    /// Result ignored; a single `nil`
    Discard,
}

/// Turn a call outcome into Lua return values
pub fn into_returns<'lua>(
    lua: &'lua Lua,
    converter: &LuaConverter,
    outcome: BridgeResult<TaggedValue>,
    returns: Returns,
) -> LuaResult<MultiValue<'lua>> {
    let value = match outcome {
        Ok(value) => value,
        Err(err) => {
            let message = lua.create_string(&err.to_string())?;
            return Ok(MultiValue::from_vec(vec![Value::Nil, Value::String(message)]));
        }
    };

    let slots = match (returns, value) {
        (Returns::Discard, _) | (Returns::Value, TaggedValue::Nil) => vec![Value::Nil],
        (Returns::Value, TaggedValue::Array(items)) if items.len() == 1 => {
            vec![converter.from_tagged(lua, &items[0])?, Value::Nil]
        }
        (Returns::Value, TaggedValue::Array(items)) => items
            .iter()
            .map(|item| converter.from_tagged(lua, item))
            .collect::<LuaResult<Vec<_>>>()?,
        (_, value) => vec![converter.from_tagged(lua, &value)?, Value::Nil],
    };
    Ok(MultiValue::from_vec(slots))
}

/// Everything a wrapped bridge method needs at call time
#[derive(Clone)]
pub struct CallSite {
    dispatcher: Arc<MethodDispatcher>,
    converter: LuaConverter,
    check_arguments: bool,
    cancel: CancellationToken,
}

impl CallSite {
    pub fn new(
        dispatcher: Arc<MethodDispatcher>,
        converter: LuaConverter,
        check_arguments: bool,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            dispatcher,
            converter,
            check_arguments,
            cancel,
        }
    }

    /// Same call site, cancelled through `cancel`
    pub fn with_cancellation(self, cancel: CancellationToken) -> Self {
        Self { cancel, ..self }
    }

    pub fn dispatcher(&self) -> &Arc<MethodDispatcher> {
        &self.dispatcher
    }

    pub fn converter(&self) -> LuaConverter {
        self.converter
    }

    /// Wrap `method` as a Lua function forwarding all script arguments
    pub fn wrap<'lua>(
        &self,
        lua: &'lua Lua,
        script_name: impl Into<String>,
        method: impl Into<String>,
        specs: &'static [ArgSpec],
        returns: Returns,
    ) -> LuaResult<Function<'lua>> {
        let site = self.clone();
        let script_name = script_name.into();
        let method = method.into();
        lua.create_function(move |lua, args: MultiValue| {
            let args: Vec<Value> = args.into_iter().collect();
            if site.check_arguments {
                if let Err(err) = check_args(&script_name, specs, &args) {
                    return into_returns(lua, &site.converter, Err(err), returns);
                }
            }
            let mut args: Vec<TaggedValue> = args.into_iter().map(|v| site.converter.to_tagged(lua, v)).collect();
            fill_defaults(specs, &mut args);
            let outcome = site.dispatcher.invoke_blocking(&method, args, &site.cancel);
            into_returns(lua, &site.converter, outcome, returns)
        })
    }

    /// Wrap `method` as a Lua function that checks script arguments, calls the
    /// method without arguments and derives the result from what it returned.
    pub fn wrap_view<'lua>(
        &self,
        lua: &'lua Lua,
        script_name: impl Into<String>,
        method: impl Into<String>,
        specs: &'static [ArgSpec],
        returns: Returns,
        view: ResultView,
    ) -> LuaResult<Function<'lua>> {
        let site = self.clone();
        let script_name = script_name.into();
        let method = method.into();
        lua.create_function(move |lua, args: MultiValue| {
            let args: Vec<Value> = args.into_iter().collect();
            if site.check_arguments {
                if let Err(err) = check_args(&script_name, specs, &args) {
                    return into_returns(lua, &site.converter, Err(err), returns);
                }
            }
            let args: Vec<TaggedValue> = args.into_iter().map(|v| site.converter.to_tagged(lua, v)).collect();
            let outcome = site
                .dispatcher
                .invoke_blocking(&method, Vec::new(), &site.cancel)
                .and_then(|result| view(&args, result));
            into_returns(lua, &site.converter, outcome, returns)
        })
    }
}

/// Projection applied to a provider result, given the script's arguments
pub type ResultView = fn(&[TaggedValue], TaggedValue) -> BridgeResult<TaggedValue>;
