//! Opaque payloads carried by `TaggedValue::Function` and `TaggedValue::Custom`

use std::any::Any;
use std::fmt;
use std::sync::Arc;

use rlua::RegistryKey;

use super::TaggedValue;
use crate::error::{BridgeError, BridgeResult};

/// Signature of a host-side function that scripts may call
pub type NativeFn = dyn Fn(Vec<TaggedValue>) -> BridgeResult<TaggedValue> + Send + Sync;

/// Handle to a value pinned in a Lua registry.
///
/// Handles keep script closures and foreign userdata alive while they travel
/// through the host as tagged values, so they can be handed back unchanged.
#[derive(Clone)]
pub struct ScriptHandle(Arc<RegistryKey>);

impl ScriptHandle {
    pub(crate) fn new(key: RegistryKey) -> Self {
        Self(Arc::new(key))
    }

    pub(crate) fn key(&self) -> &RegistryKey {
        &self.0
    }

    fn ptr_eq(&self, other: &ScriptHandle) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

#[derive(Clone)]
enum Callable {
    Native(Arc<NativeFn>),
    Script(ScriptHandle),
}

/// A callable reference crossing the script/host boundary
#[derive(Clone)]
pub struct ScriptFunction {
    name: String,
    callable: Callable,
}

impl ScriptFunction {
    /// Wrap a host closure so scripts can call it
    pub fn native<F>(name: impl Into<String>, f: F) -> Self
    where
        F: Fn(Vec<TaggedValue>) -> BridgeResult<TaggedValue> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            callable: Callable::Native(Arc::new(f)),
        }
    }

    pub(crate) fn script(name: impl Into<String>, handle: ScriptHandle) -> Self {
        Self {
            name: name.into(),
            callable: Callable::Script(handle),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// True when the function is implemented on the host side
    pub fn is_native(&self) -> bool {
        matches!(self.callable, Callable::Native(_))
    }

    pub(crate) fn script_handle(&self) -> Option<&ScriptHandle> {
        match &self.callable {
            Callable::Script(handle) => Some(handle),
            Callable::Native(_) => None,
        }
    }

    pub(crate) fn native_fn(&self) -> Option<Arc<NativeFn>> {
        match &self.callable {
            Callable::Native(f) => Some(f.clone()),
            Callable::Script(_) => None,
        }
    }

    /// Invoke the function from the host.
    ///
    /// Script closures are not re-entered synchronously from the host; calling
    /// one fails with `UnsupportedOperation`.
    pub fn call(&self, args: Vec<TaggedValue>) -> BridgeResult<TaggedValue> {
        match &self.callable {
            Callable::Native(f) => f(args),
            Callable::Script(_) => Err(BridgeError::UnsupportedOperation(format!(
                "script function '{}' cannot be called from the host",
                self.name
            ))),
        }
    }

    /// Identity comparison
    pub fn same_as(&self, other: &ScriptFunction) -> bool {
        match (&self.callable, &other.callable) {
            (Callable::Native(a), Callable::Native(b)) => Arc::ptr_eq(a, b),
            (Callable::Script(a), Callable::Script(b)) => a.ptr_eq(b),
            _ => false,
        }
    }
}

impl fmt::Debug for ScriptFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = if self.is_native() { "native" } else { "script" };
        f.debug_struct("ScriptFunction")
            .field("name", &self.name)
            .field("kind", &kind)
            .finish()
    }
}

#[derive(Clone)]
enum Payload {
    Host(Arc<dyn Any + Send + Sync>),
    Script(ScriptHandle),
}

/// An opaque value tagged with a type name
#[derive(Clone)]
pub struct CustomValue {
    type_name: String,
    payload: Payload,
}

impl CustomValue {
    /// Wrap a host value
    pub fn new<T: Any + Send + Sync>(type_name: impl Into<String>, value: T) -> Self {
        Self {
            type_name: type_name.into(),
            payload: Payload::Host(Arc::new(value)),
        }
    }

    pub(crate) fn script(type_name: impl Into<String>, handle: ScriptHandle) -> Self {
        Self {
            type_name: type_name.into(),
            payload: Payload::Script(handle),
        }
    }

    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    /// Borrow the host payload as `T`, if it is one
    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        match &self.payload {
            Payload::Host(value) => value.downcast_ref::<T>(),
            Payload::Script(_) => None,
        }
    }

    pub(crate) fn script_handle(&self) -> Option<&ScriptHandle> {
        match &self.payload {
            Payload::Script(handle) => Some(handle),
            Payload::Host(_) => None,
        }
    }

    /// Same type name and the very same payload
    pub fn same_as(&self, other: &CustomValue) -> bool {
        if self.type_name != other.type_name {
            return false;
        }
        match (&self.payload, &other.payload) {
            (Payload::Host(a), Payload::Host(b)) => Arc::ptr_eq(a, b),
            (Payload::Script(a), Payload::Script(b)) => a.ptr_eq(b),
            _ => false,
        }
    }
}

impl fmt::Debug for CustomValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CustomValue")
            .field("type_name", &self.type_name)
            .finish_non_exhaustive()
    }
}
