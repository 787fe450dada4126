//! JSON-LD 1.1 context processing and expansion.
//!
//! The entry point is [`expand`], which turns a JSON-LD document into its
//! expanded form: full IRIs everywhere, explicit value objects, no contexts.
//!
//! ```no_run
//! use jsonld_expand::{expand, JsonLdOptions, NoLoader};
//! use serde_json::json;
//!
//! # async_std::task::block_on(async {
//! let doc = json!({
//!     "@context": {"@vocab": "http://example.org/"},
//!     "name": "Alice"
//! });
//!
//! let expanded = expand(&doc, &JsonLdOptions::default(), NoLoader).await.unwrap();
//! assert_eq!(
//!     serde_json::Value::from(expanded),
//!     json!([{"http://example.org/name": [{"@value": "Alice"}]}])
//! );
//! # });
//! ```

mod api;
mod context;
mod creation;
mod expand;
mod expanded;
mod iri;
mod keyword;
mod loader;

pub mod error;

pub use crate::api::*;
pub use crate::context::{
    Container, Context, Direction, ProcessingMode, Processor, TermDefinition, DEFAULT_MAX_DEPTH,
};
pub use crate::creation::ProcessOptions;
pub use crate::error::{JsonLdError, Result};
pub use crate::expanded::ExpandedValue;
pub use crate::iri::ExpandedIri;
pub use crate::keyword::Keyword;
pub use crate::loader::{LoaderError, NoLoader, StaticLoader};

use serde_json::Value;
use std::error::Error;
use std::future::Future;
use std::pin::Pin;

pub(crate) type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Profile requested when dereferencing a remote context.
pub const CONTEXT_PROFILE: &str = "http://www.w3.org/ns/json-ld#context";

/// A document returned by a [`DocumentLoader`].
#[derive(Clone, Debug, PartialEq)]
pub struct RemoteDocument {
    pub document: Value,
    /// The final URL of the document, after redirects.
    pub document_url: String,
    pub content_type: String,
    /// Context URL advertised out of band, e.g. in an HTTP `Link` header.
    pub context_url: Option<String>,
}

/// Options passed along with each load request.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct LoadDocumentOptions {
    pub extract_all_scripts: bool,
    pub profile: Option<String>,
    pub request_profile: Vec<String>,
}

impl LoadDocumentOptions {
    pub(crate) fn context() -> LoadDocumentOptions {
        LoadDocumentOptions {
            extract_all_scripts: false,
            profile: Some(CONTEXT_PROFILE.to_owned()),
            request_profile: vec![CONTEXT_PROFILE.to_owned()],
        }
    }
}

/// This trait is implemented by consumers of the API, to provide remote documents and contexts.
///
/// Implementations that cache across calls must be safe to use concurrently.
pub trait DocumentLoader: Send + Sync {
    type Error: Error + Send + Sync + 'static;
    type Future: Future<Output = std::result::Result<RemoteDocument, Self::Error>> + Send;

    /// Loads the document at `url`.
    fn load_document(&self, url: &str, options: &LoadDocumentOptions) -> Self::Future;
}
