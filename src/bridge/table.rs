//! A provider assembled from an explicit name → handler map

use std::collections::BTreeMap;
use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;
use futures::future::BoxFuture;
use futures::FutureExt;

use super::{Bridge, BridgeMetadata, MethodInfo};
use crate::error::{BridgeError, BridgeResult};
use crate::value::TaggedValue;

type Handler = Arc<dyn Fn(Vec<TaggedValue>) -> BoxFuture<'static, BridgeResult<TaggedValue>> + Send + Sync>;

struct Entry {
    info: MethodInfo,
    handler: Handler,
}

/// `Bridge` backed by a table of handlers built at registration time
pub struct MethodTable {
    id: String,
    metadata: BridgeMetadata,
    entries: BTreeMap<String, Entry>,
}

impl MethodTable {
    pub fn new(id: impl Into<String>) -> Self {
        let id = id.into();
        let metadata = BridgeMetadata {
            name: id.clone(),
            version: "1.0.0".to_string(),
            ..Default::default()
        };
        Self {
            id,
            metadata,
            entries: BTreeMap::new(),
        }
    }

    pub fn with_metadata(mut self, metadata: BridgeMetadata) -> Self {
        self.metadata = metadata;
        self
    }

    /// Register a synchronous handler
    pub fn method<F>(self, name: impl Into<String>, f: F) -> Self
    where
        F: Fn(Vec<TaggedValue>) -> BridgeResult<TaggedValue> + Send + Sync + 'static,
    {
        let f = Arc::new(f);
        let handler: Handler = Arc::new(move |args| {
            let result = f(args);
            async move { result }.boxed()
        });
        self.insert(name.into(), handler)
    }

    /// Register an asynchronous handler
    pub fn async_method<F, Fut>(self, name: impl Into<String>, f: F) -> Self
    where
        F: Fn(Vec<TaggedValue>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = BridgeResult<TaggedValue>> + Send + 'static,
    {
        let handler: Handler = Arc::new(move |args| f(args).boxed());
        self.insert(name.into(), handler)
    }

    /// Attach a description to an already registered method
    pub fn describe(mut self, info: MethodInfo) -> Self {
        if let Some(entry) = self.entries.get_mut(&info.name) {
            entry.info = info;
        }
        self
    }

    fn insert(mut self, name: String, handler: Handler) -> Self {
        let info = MethodInfo::new(name.clone());
        // re-registering a name replaces the earlier handler
        self.entries.insert(name, Entry { info, handler });
        self
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[async_trait]
impl Bridge for MethodTable {
    fn id(&self) -> &str {
        &self.id
    }

    fn metadata(&self) -> BridgeMetadata {
        self.metadata.clone()
    }

    fn methods(&self) -> Vec<MethodInfo> {
        self.entries.values().map(|e| e.info.clone()).collect()
    }

    async fn execute_method(&self, method: &str, args: Vec<TaggedValue>) -> BridgeResult<TaggedValue> {
        let handler = self
            .entries
            .get(method)
            .map(|e| e.handler.clone())
            .ok_or_else(|| BridgeError::MethodNotFound(method.to_string()))?;
        handler(args).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_sync_and_async_handlers() {
        let table = MethodTable::new("echo")
            .method("echo", |args| Ok(args.into_iter().next().unwrap_or_default()))
            .async_method("later", |_| async {
                tokio::task::yield_now().await;
                Ok(TaggedValue::from("done"))
            });

        assert_eq!(table.len(), 2);
        let echoed = table.execute_method("echo", vec!["hi".into()]).await.unwrap();
        assert_eq!(echoed, TaggedValue::from("hi"));
        let later = table.execute_method("later", vec![]).await.unwrap();
        assert_eq!(later, TaggedValue::from("done"));
    }

    #[tokio::test]
    async fn test_unknown_method() {
        let table = MethodTable::new("empty");
        let err = table.execute_method("nope", vec![]).await.unwrap_err();
        assert!(matches!(err, BridgeError::MethodNotFound(name) if name == "nope"));
    }

    #[test]
    fn test_methods_are_listed_with_descriptions() {
        let table = MethodTable::new("agent")
            .method("listAgents", |_| Ok(TaggedValue::Array(vec![])))
            .method("createAgent", |_| Ok(TaggedValue::Nil))
            .describe(MethodInfo::new("createAgent").with_param("id", "string", true));

        let methods = table.methods();
        let names: Vec<&str> = methods.iter().map(|m| m.name.as_str()).collect();
        assert_eq!(names, vec!["createAgent", "listAgents"]);
        assert_eq!(methods[0].parameters.len(), 1);
        assert!(table.contains("listAgents"));
    }
}
