use async_std::sync::Mutex;
use serde::Deserialize;
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use crate::error::BoxError;
use crate::iri::ExpandedIri;
use crate::keyword::Keyword;
use crate::{DocumentLoader, LoadDocumentOptions, RemoteDocument};

/// Upper bound on nesting used when no other limit is configured.
pub const DEFAULT_MAX_DEPTH: usize = 128;

/// The JSON-LD processing mode.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
pub enum ProcessingMode {
    #[serde(rename = "json-ld-1.0")]
    JsonLd10,
    #[default]
    #[serde(rename = "json-ld-1.1")]
    JsonLd11,
}

impl fmt::Display for ProcessingMode {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            ProcessingMode::JsonLd10 => f.write_str("json-ld-1.0"),
            ProcessingMode::JsonLd11 => f.write_str("json-ld-1.1"),
        }
    }
}

/// Base direction of a string.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Direction {
    Ltr,
    Rtl,
}

impl Direction {
    pub fn parse(val: &str) -> Option<Direction> {
        match val {
            "ltr" => Some(Direction::Ltr),
            "rtl" => Some(Direction::Rtl),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Direction::Ltr => "ltr",
            Direction::Rtl => "rtl",
        }
    }
}

/// The set of container keywords attached to a term.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Container(u8);

impl Container {
    const KINDS: [Keyword; 7] = [
        Keyword::Graph,
        Keyword::Id,
        Keyword::Index,
        Keyword::Language,
        Keyword::List,
        Keyword::Set,
        Keyword::Type,
    ];

    fn bit(keyword: Keyword) -> Option<u8> {
        Container::KINDS
            .iter()
            .position(|k| *k == keyword)
            .map(|pos| 1 << pos)
    }

    /// Returns `false` if `keyword` cannot appear in a container mapping.
    pub(crate) fn insert(&mut self, keyword: Keyword) -> bool {
        match Container::bit(keyword) {
            Some(bit) => {
                self.0 |= bit;
                true
            }
            None => false,
        }
    }

    pub fn contains(self, keyword: Keyword) -> bool {
        Container::bit(keyword).map_or(false, |bit| self.0 & bit != 0)
    }

    pub fn is_empty(self) -> bool {
        self.0 == 0
    }

    pub fn len(self) -> usize {
        self.0.count_ones() as usize
    }

    pub fn iter(self) -> impl Iterator<Item = Keyword> {
        Container::KINDS
            .into_iter()
            .filter(move |k| self.contains(*k))
    }
}

/// The resolved meaning of a single term.
#[derive(Clone, Debug, PartialEq)]
pub struct TermDefinition {
    pub iri_mapping: ExpandedIri,
    pub prefix: bool,
    pub protected: bool,
    pub reverse_property: bool,
    /// Base URL the scoped context was found under.
    pub base_url: Option<String>,
    /// Scoped context, kept raw and reprocessed whenever the term is used.
    pub context: Option<Value>,
    pub container_mapping: Container,
    /// `Some(None)` records an explicit `null`, which suppresses the default.
    pub direction_mapping: Option<Option<Direction>>,
    /// `Some(None)` records an explicit `null`, which suppresses the default.
    pub language_mapping: Option<Option<String>>,
    pub index_mapping: Option<String>,
    pub nest_value: Option<String>,
    pub type_mapping: Option<ExpandedIri>,
}

impl TermDefinition {
    pub(crate) fn new(iri_mapping: ExpandedIri) -> TermDefinition {
        TermDefinition {
            iri_mapping,
            prefix: false,
            protected: false,
            reverse_property: false,
            base_url: None,
            context: None,
            container_mapping: Container::default(),
            direction_mapping: None,
            language_mapping: None,
            index_mapping: None,
            nest_value: None,
            type_mapping: None,
        }
    }

    /// Structural equality, disregarding the protected flag.
    pub(crate) fn same_as(&self, other: &TermDefinition) -> bool {
        self.iri_mapping == other.iri_mapping
            && self.prefix == other.prefix
            && self.reverse_property == other.reverse_property
            && self.base_url == other.base_url
            && self.context == other.context
            && self.container_mapping == other.container_mapping
            && self.direction_mapping == other.direction_mapping
            && self.language_mapping == other.language_mapping
            && self.index_mapping == other.index_mapping
            && self.nest_value == other.nest_value
            && self.type_mapping == other.type_mapping
    }

    pub fn has_type_mapping(&self, keyword: Keyword) -> bool {
        self.type_mapping == Some(ExpandedIri::Keyword(keyword))
    }
}

/// An active context.
///
/// Contexts are values: processing a local context returns a new one and
/// never touches its input. Term definitions are shared between clones.
#[derive(Clone, Debug, Default)]
pub struct Context {
    pub(crate) terms: Arc<BTreeMap<String, Arc<TermDefinition>>>,
    pub(crate) base_iri: Option<String>,
    pub(crate) original_base_iri: Option<String>,
    pub(crate) vocabulary_mapping: Option<ExpandedIri>,
    pub(crate) default_language: Option<String>,
    pub(crate) default_direction: Option<Direction>,
    pub(crate) previous_context: Option<Arc<Context>>,
}

impl Context {
    pub fn new(base_iri: Option<String>) -> Context {
        Context {
            original_base_iri: base_iri.clone(),
            base_iri,
            ..Context::default()
        }
    }

    pub fn base_iri(&self) -> Option<&str> {
        self.base_iri.as_deref()
    }

    pub fn original_base_iri(&self) -> Option<&str> {
        self.original_base_iri.as_deref()
    }

    pub fn vocabulary_mapping(&self) -> Option<&ExpandedIri> {
        self.vocabulary_mapping.as_ref()
    }

    pub fn default_language(&self) -> Option<&str> {
        self.default_language.as_deref()
    }

    pub fn default_direction(&self) -> Option<Direction> {
        self.default_direction
    }

    /// The context to fall back to once a non-propagated scope ends.
    pub fn previous_context(&self) -> Option<&Context> {
        self.previous_context.as_deref()
    }

    pub fn term(&self, term: &str) -> Option<&TermDefinition> {
        self.terms.get(term).map(|def| def.as_ref())
    }

    pub fn terms(&self) -> impl Iterator<Item = (&str, &TermDefinition)> {
        self.terms.iter().map(|(k, v)| (k.as_str(), v.as_ref()))
    }

    pub(crate) fn set_term(&mut self, term: &str, definition: Arc<TermDefinition>) {
        Arc::make_mut(&mut self.terms).insert(term.to_owned(), definition);
    }

    pub(crate) fn remove_term(&mut self, term: &str) -> Option<Arc<TermDefinition>> {
        if !self.terms.contains_key(term) {
            return None;
        }

        Arc::make_mut(&mut self.terms).remove(term)
    }

    pub fn has_protected_terms(&self) -> bool {
        self.terms.values().any(|def| def.protected)
    }

    /// Container mapping of `property`, empty if the term is undefined.
    pub(crate) fn container_of(&self, property: Option<&str>) -> Container {
        property
            .and_then(|p| self.term(p))
            .map(|def| def.container_mapping)
            .unwrap_or_default()
    }
}

/// A loaded `@context` value and the URL it was found under.
#[derive(Debug)]
pub(crate) struct LoadedContext {
    pub document_url: String,
    pub context: Value,
}

/// Per-call state shared by every algorithm: processing mode, document
/// loader, limits, and the cache of dereferenced contexts.
pub struct Processor<L> {
    pub(crate) mode: ProcessingMode,
    pub(crate) loader: L,
    pub(crate) max_depth: usize,
    pub(crate) load_timeout: Option<Duration>,
    pub(crate) cache: Mutex<HashMap<String, Arc<LoadedContext>>>,
}

impl<L: DocumentLoader> Processor<L> {
    pub fn new(loader: L, mode: ProcessingMode) -> Processor<L> {
        Processor {
            mode,
            loader,
            max_depth: DEFAULT_MAX_DEPTH,
            load_timeout: None,
            cache: Mutex::new(HashMap::new()),
        }
    }

    pub fn with_max_depth(mut self, max_depth: usize) -> Processor<L> {
        self.max_depth = max_depth;
        self
    }

    pub fn with_load_timeout(mut self, timeout: Option<Duration>) -> Processor<L> {
        self.load_timeout = timeout;
        self
    }

    pub fn processing_mode(&self) -> ProcessingMode {
        self.mode
    }

    pub(crate) fn is_json_ld_10(&self) -> bool {
        self.mode == ProcessingMode::JsonLd10
    }

    /// Calls the loader, bounded by the configured timeout.
    pub(crate) async fn load(
        &self,
        url: &str,
        options: &LoadDocumentOptions,
    ) -> Result<RemoteDocument, BoxError> {
        tracing::debug!(url, "loading remote document");
        let loading = self.loader.load_document(url, options);

        match self.load_timeout {
            Some(limit) => match async_std::future::timeout(limit, loading).await {
                Ok(loaded) => loaded.map_err(|e| Box::new(e) as BoxError),
                Err(elapsed) => Err(Box::new(elapsed) as BoxError),
            },
            None => loading.await.map_err(|e| Box::new(e) as BoxError),
        }
    }
}

impl<L> fmt::Debug for Processor<L> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("Processor")
            .field("mode", &self.mode)
            .field("max_depth", &self.max_depth)
            .field("load_timeout", &self.load_timeout)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn container_holds_only_container_keywords() {
        let mut container = Container::default();
        assert!(container.insert(Keyword::Graph));
        assert!(container.insert(Keyword::Index));
        assert!(!container.insert(Keyword::Vocab));

        assert_eq!(container.len(), 2);
        assert!(container.contains(Keyword::Graph));
        assert!(!container.contains(Keyword::Set));
        assert_eq!(
            container.iter().collect::<Vec<_>>(),
            vec![Keyword::Graph, Keyword::Index]
        );
    }

    #[test]
    fn cloning_shares_term_definitions() {
        let mut ctx = Context::new(Some("http://example.com/".to_owned()));
        ctx.set_term(
            "name",
            Arc::new(TermDefinition::new(ExpandedIri::Iri(
                "http://schema.org/name".to_owned(),
            ))),
        );

        let mut copy = ctx.clone();
        copy.remove_term("name");

        assert!(ctx.term("name").is_some());
        assert!(copy.term("name").is_none());
    }

    #[test]
    fn equality_ignores_protection() {
        let plain = TermDefinition::new(ExpandedIri::Iri("http://a/".to_owned()));
        let mut protected = plain.clone();
        protected.protected = true;

        assert!(plain.same_as(&protected));
        assert_ne!(plain, protected);
    }
}
