use serde_json::Value;
use std::collections::HashMap;
use std::future::{ready, Ready};
use std::sync::Arc;

use crate::{DocumentLoader, LoadDocumentOptions, RemoteDocument};

/// Failure reported by the loaders in this crate.
#[derive(Debug, thiserror::Error)]
pub enum LoaderError {
    #[error("document loading is disabled, refusing to load {0}")]
    Disabled(String),

    #[error("no document registered for {0}")]
    NotFound(String),
}

/// A loader that refuses every request. Documents which only use inline
/// contexts never need anything else.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoLoader;

impl DocumentLoader for NoLoader {
    type Error = LoaderError;
    type Future = Ready<Result<RemoteDocument, LoaderError>>;

    fn load_document(&self, url: &str, _options: &LoadDocumentOptions) -> Self::Future {
        ready(Err(LoaderError::Disabled(url.to_owned())))
    }
}

/// Serves documents from an in-memory table keyed by URL.
///
/// ```
/// use jsonld_expand::StaticLoader;
/// use serde_json::json;
///
/// let loader = StaticLoader::new()
///     .with_document("https://example.org/context.jsonld", json!({"@context": {}}));
/// assert_eq!(loader.len(), 1);
/// ```
#[derive(Clone, Debug, Default)]
pub struct StaticLoader {
    documents: Arc<HashMap<String, Value>>,
}

impl StaticLoader {
    pub fn new() -> StaticLoader {
        StaticLoader::default()
    }

    pub fn with_document(mut self, url: impl Into<String>, document: Value) -> StaticLoader {
        self.insert(url, document);
        self
    }

    pub fn insert(&mut self, url: impl Into<String>, document: Value) {
        Arc::make_mut(&mut self.documents).insert(url.into(), document);
    }

    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }
}

impl DocumentLoader for StaticLoader {
    type Error = LoaderError;
    type Future = Ready<Result<RemoteDocument, LoaderError>>;

    fn load_document(&self, url: &str, _options: &LoadDocumentOptions) -> Self::Future {
        let loaded = match self.documents.get(url) {
            Some(document) => Ok(RemoteDocument {
                document: document.clone(),
                document_url: url.to_owned(),
                content_type: "application/ld+json".to_owned(),
                context_url: None,
            }),
            None => Err(LoaderError::NotFound(url.to_owned())),
        };

        ready(loaded)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[async_std::test]
    async fn static_loader_serves_registered_documents() {
        let loader = StaticLoader::new().with_document("http://a/ctx", json!({"@context": {}}));

        let found = loader
            .load_document("http://a/ctx", &LoadDocumentOptions::default())
            .await
            .unwrap();
        assert_eq!(found.document, json!({"@context": {}}));
        assert_eq!(found.document_url, "http://a/ctx");

        let missing = loader
            .load_document("http://a/other", &LoadDocumentOptions::default())
            .await;
        assert!(matches!(missing, Err(LoaderError::NotFound(_))));
    }

    #[async_std::test]
    async fn no_loader_refuses() {
        let result = NoLoader
            .load_document("http://a/", &LoadDocumentOptions::default())
            .await;
        assert!(matches!(result, Err(LoaderError::Disabled(_))));
    }
}
