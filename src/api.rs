use serde::Deserialize;
use serde_json::Value;
use std::borrow::Cow;
use std::time::Duration;
use url::Url;

use crate::context::{Context, ProcessingMode, Processor, DEFAULT_MAX_DEPTH};
use crate::error::{JsonLdError, Result};
use crate::expanded::ExpandedValue;
use crate::{DocumentLoader, LoadDocumentOptions};

/// Options that may be passed to `expand`.
///
/// Deserializes from the `option` object of the W3C test manifests.
#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct JsonLdOptions {
    /// The base IRI of the document. Used to resolve relative references.
    pub base: Option<String>,

    /// A context applied before the document's own.
    pub expand_context: Option<Value>,

    pub processing_mode: ProcessingMode,

    /// How deeply the input may nest before expansion gives up.
    pub max_depth: usize,

    /// Deadline for each individual document load.
    #[serde(skip)]
    pub load_timeout: Option<Duration>,
}

impl Default for JsonLdOptions {
    fn default() -> JsonLdOptions {
        JsonLdOptions {
            base: None,
            expand_context: None,
            processing_mode: ProcessingMode::default(),
            max_depth: DEFAULT_MAX_DEPTH,
            load_timeout: None,
        }
    }
}

/// Takes a JSON value, pulls out the relevant @context value.
fn unwrap_context(value: &Value) -> &Value {
    match value {
        Value::Object(map) => map.get("@context").unwrap_or(value),
        _ => value,
    }
}

/// Expands a JSON-LD document, as the JSON-LD 1.1 API `expand()` method does.
///
/// A JSON string `input` is taken to be the URL of the document, and is
/// fetched through `loader`.
pub async fn expand<L: DocumentLoader>(
    input: &Value,
    options: &JsonLdOptions,
    loader: L,
) -> Result<ExpandedValue> {
    let processor = Processor::new(loader, options.processing_mode)
        .with_max_depth(options.max_depth)
        .with_load_timeout(options.load_timeout);

    expand_with(&processor, input, options).await
}

/// Like [`expand`], reusing an existing processor and its context cache.
pub async fn expand_with<L: DocumentLoader>(
    processor: &Processor<L>,
    input: &Value,
    options: &JsonLdOptions,
) -> Result<ExpandedValue> {
    let (document, document_url, context_url) = match input {
        Value::String(url) => {
            let remote = processor
                .load(url, &LoadDocumentOptions::default())
                .await
                .map_err(|source| JsonLdError::LoadingDocumentFailed {
                    url: url.clone(),
                    source: Some(source),
                })?;

            let document_url = if remote.document_url.is_empty() {
                url.clone()
            } else {
                remote.document_url
            };

            (Cow::Owned(remote.document), Some(document_url), remote.context_url)
        }
        other => (Cow::Borrowed(other), None, None),
    };

    let base = match &options.base {
        Some(base) => {
            Url::parse(base).map_err(|_| JsonLdError::InvalidBaseIri(base.clone()))?;
            Some(base.clone())
        }
        None => document_url.clone(),
    };

    let mut active = Context::new(base.clone());

    if let Some(expand_context) = &options.expand_context {
        let next = active
            .process(processor, unwrap_context(expand_context), base.as_deref())
            .await?;
        active = next;
    }

    if let Some(context_url) = context_url {
        let next = active
            .process(processor, &Value::String(context_url), document_url.as_deref())
            .await?;
        active = next;
    }

    let base_url = document_url.as_deref().or(base.as_deref());
    let expanded = active.expand(processor, &document, base_url).await?;

    tracing::debug!(
        nodes = expanded.as_array().map_or(0, |nodes| nodes.len()),
        "expanded document"
    );

    Ok(expanded)
}
