use std::any::Any;
use std::collections::HashMap;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures::FutureExt;
use tokio::runtime::{Handle, RuntimeFlavor};
use tokio_util::sync::CancellationToken;
use tracing::{debug, instrument, warn};

use super::{Bridge, BridgeMetadata, MethodInfo};
use crate::error::{BridgeError, BridgeResult};
use crate::value::TaggedValue;

/// Invokes named methods on a provider.
///
/// The set of callable names is taken from `Bridge::methods` once, at
/// construction, and is read-only afterwards.
pub struct MethodDispatcher {
    bridge: Arc<dyn Bridge>,
    methods: HashMap<String, MethodInfo>,
}

impl MethodDispatcher {
    pub fn new(bridge: Arc<dyn Bridge>) -> Self {
        let methods = bridge
            .methods()
            .into_iter()
            .map(|info| (info.name.clone(), info))
            .collect();
        Self { bridge, methods }
    }

    pub fn bridge(&self) -> &Arc<dyn Bridge> {
        &self.bridge
    }

    pub fn bridge_id(&self) -> &str {
        self.bridge.id()
    }

    pub fn metadata(&self) -> BridgeMetadata {
        self.bridge.metadata()
    }

    /// Sorted method names
    pub fn methods(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.methods.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    pub fn has_method(&self, name: &str) -> bool {
        self.methods.contains_key(name)
    }

    pub fn method_info(&self, name: &str) -> BridgeResult<&MethodInfo> {
        self.methods
            .get(name)
            .ok_or_else(|| BridgeError::MethodNotFound(name.to_string()))
    }

    /// Invoke `method` with positional arguments.
    ///
    /// Unknown names fail with `MethodNotFound` without reaching the provider.
    /// Cancelling `cancel` resolves a pending call to `Cancelled`. A panicking
    /// provider is reported as a `Provider` error prefixed with `panic:`.
    #[instrument(skip(self, args, cancel), fields(bridge = %self.bridge.id(), argc = args.len()))]
    pub async fn invoke(
        &self,
        method: &str,
        args: Vec<TaggedValue>,
        cancel: &CancellationToken,
    ) -> BridgeResult<TaggedValue> {
        if !self.methods.contains_key(method) {
            debug!("method not advertised by bridge");
            return Err(BridgeError::MethodNotFound(method.to_string()));
        }
        if cancel.is_cancelled() {
            return Err(BridgeError::Cancelled(method.to_string()));
        }

        let result = tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(BridgeError::Cancelled(method.to_string())),
            result = AssertUnwindSafe(self.bridge.execute_method(method, args)).catch_unwind() => {
                result.unwrap_or_else(|payload| Err(BridgeError::Provider(format!("panic: {}", panic_message(&payload)))))
            }
        };

        match &result {
            Ok(value) => debug!(kind = %value.kind(), "bridge call succeeded"),
            Err(err) => debug!(error = %err, "bridge call failed"),
        }
        result
    }

    /// Blocking form of `invoke` for synchronous script callbacks.
    ///
    /// Inside a multi-threaded tokio runtime the call is driven by that
    /// runtime. Outside any runtime it runs on a local executor. A
    /// current-thread runtime cannot make progress while its only thread is
    /// blocked, so there the call gets a single poll and fails with
    /// `UnsupportedOperation` if the provider is not ready.
    pub fn invoke_blocking(
        &self,
        method: &str,
        args: Vec<TaggedValue>,
        cancel: &CancellationToken,
    ) -> BridgeResult<TaggedValue> {
        let call = self.invoke(method, args, cancel);
        match Handle::try_current() {
            Ok(handle) if handle.runtime_flavor() == RuntimeFlavor::MultiThread => {
                tokio::task::block_in_place(|| handle.block_on(call))
            }
            Ok(_) => call.now_or_never().unwrap_or_else(|| {
                warn!(method, "provider not ready inside a current-thread runtime");
                Err(BridgeError::UnsupportedOperation(format!(
                    "blocking call to '{}' inside a current-thread runtime",
                    method
                )))
            }),
            Err(_) => futures::executor::block_on(call),
        }
    }
}

fn panic_message(payload: &Box<dyn Any + Send>) -> &str {
    if let Some(msg) = payload.downcast_ref::<&str>() {
        msg
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg
    } else {
        "unknown panic"
    }
}
