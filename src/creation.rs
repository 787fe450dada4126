use serde_json::{Map, Value};
use std::borrow::Cow;
use std::collections::HashMap;
use std::sync::Arc;
use url::Url;

use crate::context::{Container, Context, Direction, LoadedContext, Processor, TermDefinition};
use crate::error::{JsonLdError, Result};
use crate::iri::{
    ends_with_gen_delim, is_absolute_iri, is_well_formed_language, resolve, split_compact_iri,
    ExpandedIri,
};
use crate::keyword::{is_keyword, is_keyword_shaped, Keyword};
use crate::{BoxFuture, DocumentLoader, LoadDocumentOptions};

/// Maximum number of remote contexts a single processing chain may pull in.
pub const MAX_REMOTE_CONTEXTS: usize = 128;

/// Context entries handled by context processing itself rather than as terms.
const CONTEXT_KEYWORDS: [&str; 8] = [
    "@base",
    "@direction",
    "@import",
    "@language",
    "@propagate",
    "@protected",
    "@version",
    "@vocab",
];

/// Entries allowed in an expanded term definition.
const TERM_KEYWORDS: [&str; 11] = [
    "@container",
    "@context",
    "@direction",
    "@id",
    "@index",
    "@language",
    "@nest",
    "@prefix",
    "@protected",
    "@reverse",
    "@type",
];

/// Progress of each term while one local context is processed.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum DefineStatus {
    Undefined,
    InProgress,
    Completed,
}

fn status(defined: &HashMap<String, DefineStatus>, term: &str) -> DefineStatus {
    defined.get(term).copied().unwrap_or(DefineStatus::Undefined)
}

/// Flags controlling one run of context processing.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ProcessOptions {
    /// Allow protected terms to be redefined or nulled.
    pub override_protected: bool,
    /// Whether the resulting context survives into nested node objects.
    pub propagate: bool,
    /// When false, remote contexts already being processed are skipped
    /// rather than re-entered.
    pub validate_scoped_context: bool,
}

impl Default for ProcessOptions {
    fn default() -> ProcessOptions {
        ProcessOptions {
            override_protected: false,
            propagate: true,
            validate_scoped_context: true,
        }
    }
}

/// Everything term creation needs that stays fixed for one local context.
pub(crate) struct TermScope<'a, L> {
    processor: &'a Processor<L>,
    local_context: &'a Map<String, Value>,
    base_url: Option<&'a str>,
    protected: bool,
    override_protected: bool,
    remote_contexts: &'a [String],
}

/// Dereferences a remote context, consulting the per-call cache first.
async fn load_context<L: DocumentLoader>(
    processor: &Processor<L>,
    url: &str,
) -> Result<Arc<LoadedContext>> {
    let cached = processor.cache.lock().await.get(url).cloned();
    if let Some(loaded) = cached {
        tracing::trace!(url, "remote context cache hit");
        return Ok(loaded);
    }

    let remote = processor
        .load(url, &LoadDocumentOptions::context())
        .await
        .map_err(|source| JsonLdError::LoadingRemoteContextFailed {
            url: url.to_owned(),
            source,
        })?;

    let context = match remote.document {
        Value::Object(mut obj) => obj
            .remove("@context")
            .ok_or_else(|| JsonLdError::InvalidRemoteContext(url.to_owned()))?,
        _ => return Err(JsonLdError::InvalidRemoteContext(url.to_owned())),
    };

    let document_url = if remote.document_url.is_empty() {
        url.to_owned()
    } else {
        remote.document_url
    };

    let loaded = Arc::new(LoadedContext {
        document_url,
        context,
    });
    processor
        .cache
        .lock()
        .await
        .insert(url.to_owned(), loaded.clone());

    Ok(loaded)
}

fn resolve_against(base_url: Option<&str>, reference: &str) -> String {
    match base_url {
        Some(base) => resolve(base, reference),
        None => reference.to_owned(),
    }
}

fn parse_container(value: &Value, json_ld_10: bool, term: &str) -> Result<Container> {
    let invalid = || JsonLdError::InvalidContainerMapping(term.to_owned());

    let items: Vec<&Value> = match value {
        Value::String(_) => vec![value],
        Value::Array(items) if !json_ld_10 => items.iter().collect(),
        _ => return Err(invalid()),
    };

    let mut container = Container::default();
    for item in items {
        let keyword = item.as_str().and_then(Keyword::parse).ok_or_else(invalid)?;

        if json_ld_10 && matches!(keyword, Keyword::Graph | Keyword::Id | Keyword::Type) {
            return Err(invalid());
        }

        if !container.insert(keyword) {
            return Err(invalid());
        }
    }

    let valid = if container.len() <= 1 {
        true
    } else if container.contains(Keyword::List) {
        false
    } else if container.contains(Keyword::Graph) {
        container
            .iter()
            .all(|k| matches!(k, Keyword::Graph | Keyword::Id | Keyword::Index | Keyword::Set))
            && !(container.contains(Keyword::Id) && container.contains(Keyword::Index))
    } else {
        container.contains(Keyword::Set)
    };

    if valid {
        Ok(container)
    } else {
        Err(invalid())
    }
}

impl Context {
    /// Applies `local_context` on top of this context and returns the result.
    pub async fn process<L: DocumentLoader>(
        &self,
        processor: &Processor<L>,
        local_context: &Value,
        base_url: Option<&str>,
    ) -> Result<Context> {
        self.process_with(processor, local_context, base_url, ProcessOptions::default())
            .await
    }

    /// Like [`Context::process`], with explicit processing flags.
    pub async fn process_with<L: DocumentLoader>(
        &self,
        processor: &Processor<L>,
        local_context: &Value,
        base_url: Option<&str>,
        options: ProcessOptions,
    ) -> Result<Context> {
        self.process_inner(processor, local_context, base_url, Vec::new(), options)
            .await
    }

    pub(crate) fn process_inner<'a, L: DocumentLoader>(
        &'a self,
        processor: &'a Processor<L>,
        local_context: &'a Value,
        base_url: Option<&'a str>,
        mut remote_contexts: Vec<String>,
        options: ProcessOptions,
    ) -> BoxFuture<'a, Result<Context>> {
        Box::pin(async move {
            let mut result = self.clone();
            if matches!(local_context, Value::Array(items) if items.is_empty()) {
                return Ok(result);
            }

            let propagate = match local_context {
                Value::Object(map) => map
                    .get("@propagate")
                    .and_then(Value::as_bool)
                    .unwrap_or(options.propagate),
                _ => options.propagate,
            };

            if !propagate && result.previous_context.is_none() {
                result.previous_context = Some(Arc::new(self.clone()));
            }

            let local_context: Vec<&Value> = match local_context {
                Value::Array(items) => items.iter().collect(),
                _ => vec![local_context],
            };

            for context in local_context {
                match context {
                    Value::Null => {
                        if !options.override_protected && result.has_protected_terms() {
                            return Err(JsonLdError::InvalidContextNullification);
                        }

                        let previous = result;
                        result = Context::new(self.original_base_iri.clone());
                        if !propagate {
                            result.previous_context = Some(Arc::new(previous));
                        }
                    }

                    Value::String(reference) => {
                        let url = resolve_against(base_url, reference);
                        if !is_absolute_iri(&url) {
                            return Err(JsonLdError::LoadingDocumentFailed { url, source: None });
                        }

                        if !options.validate_scoped_context && remote_contexts.contains(&url) {
                            continue;
                        }

                        if remote_contexts.len() >= MAX_REMOTE_CONTEXTS {
                            return Err(JsonLdError::ContextOverflow(url));
                        }
                        remote_contexts.push(url.clone());

                        let loaded = load_context(processor, &url).await?;
                        let next = result
                            .process_inner(
                                processor,
                                &loaded.context,
                                Some(loaded.document_url.as_str()),
                                remote_contexts.clone(),
                                ProcessOptions {
                                    override_protected: false,
                                    propagate: true,
                                    validate_scoped_context: options.validate_scoped_context,
                                },
                            )
                            .await?;
                        result = next;
                    }

                    Value::Object(map) => {
                        let next = result
                            .process_object(processor, map, base_url, &remote_contexts, options)
                            .await?;
                        result = next;
                    }

                    _ => return Err(JsonLdError::InvalidLocalContext),
                }
            }

            Ok(result)
        })
    }

    async fn process_object<L: DocumentLoader>(
        &self,
        processor: &Processor<L>,
        map: &Map<String, Value>,
        base_url: Option<&str>,
        remote_contexts: &[String],
        options: ProcessOptions,
    ) -> Result<Context> {
        let mut result = self.clone();
        let json_ld_10 = processor.is_json_ld_10();
        let mut context = Cow::Borrowed(map);

        if let Some(version) = map.get("@version") {
            if version.as_f64() != Some(1.1) {
                return Err(JsonLdError::InvalidVersionValue);
            }

            if json_ld_10 {
                return Err(JsonLdError::ProcessingModeConflict);
            }
        }

        if let Some(import) = map.get("@import") {
            if json_ld_10 {
                return Err(JsonLdError::InvalidContextEntry("@import".to_owned()));
            }

            let import = import.as_str().ok_or(JsonLdError::InvalidImportValue)?;
            let url = resolve_against(base_url, import);
            let loaded = load_context(processor, &url).await?;

            let imported = match &loaded.context {
                Value::Object(imported) => imported,
                _ => return Err(JsonLdError::InvalidRemoteContext(url)),
            };

            if imported.contains_key("@import") {
                return Err(JsonLdError::InvalidContextEntry("@import".to_owned()));
            }

            let mut merged = imported.clone();
            for (key, value) in map {
                merged.insert(key.clone(), value.clone());
            }
            context = Cow::Owned(merged);
        }

        if let Some(base) = context.get("@base") {
            if remote_contexts.is_empty() {
                result.base_iri = match base {
                    Value::Null => None,
                    Value::String(base) if is_absolute_iri(base) => {
                        Url::parse(base).map_err(|_| JsonLdError::InvalidBaseIri(base.clone()))?;
                        Some(base.clone())
                    }
                    Value::String(base) => match &result.base_iri {
                        Some(current) => Some(resolve(current, base)),
                        None => return Err(JsonLdError::InvalidBaseIri(base.clone())),
                    },
                    other => return Err(JsonLdError::InvalidBaseIri(other.to_string())),
                };
            }
        }

        if let Some(vocab) = context.get("@vocab") {
            result.vocabulary_mapping = match vocab {
                Value::Null => None,
                Value::String(vocab) => {
                    let expanded = if json_ld_10 {
                        ExpandedIri::from_string(vocab.clone())
                    } else {
                        result.expand_iri(vocab, true, true)
                    };

                    match &expanded {
                        ExpandedIri::BlankNode(_) => {
                            tracing::warn!(vocab = %vocab, "blank node @vocab is obsolete");
                        }
                        ExpandedIri::Iri(iri) if is_absolute_iri(iri) => {}
                        _ => return Err(JsonLdError::InvalidVocabMapping),
                    }

                    Some(expanded)
                }
                _ => return Err(JsonLdError::InvalidVocabMapping),
            };
        }

        if let Some(language) = context.get("@language") {
            result.default_language = match language {
                Value::Null => None,
                Value::String(language) => {
                    if !is_well_formed_language(language) {
                        tracing::warn!(language = %language, "malformed default language tag");
                    }
                    Some(language.to_lowercase())
                }
                _ => return Err(JsonLdError::InvalidDefaultLanguage),
            };
        }

        if let Some(direction) = context.get("@direction") {
            if json_ld_10 {
                return Err(JsonLdError::InvalidContextEntry("@direction".to_owned()));
            }

            result.default_direction = match direction {
                Value::Null => None,
                Value::String(direction) => {
                    Some(Direction::parse(direction).ok_or(JsonLdError::InvalidBaseDirection)?)
                }
                _ => return Err(JsonLdError::InvalidBaseDirection),
            };
        }

        if let Some(propagate) = context.get("@propagate") {
            if json_ld_10 {
                return Err(JsonLdError::InvalidContextEntry("@propagate".to_owned()));
            }

            if !propagate.is_boolean() {
                return Err(JsonLdError::InvalidPropagateValue);
            }
        }

        let protected = match context.get("@protected") {
            None => false,
            Some(_) if json_ld_10 => {
                return Err(JsonLdError::InvalidContextEntry("@protected".to_owned()));
            }
            Some(Value::Bool(protected)) => *protected,
            Some(_) => return Err(JsonLdError::InvalidProtectedValue),
        };

        let scope = TermScope {
            processor,
            local_context: &context,
            base_url,
            protected,
            override_protected: options.override_protected,
            remote_contexts,
        };

        let mut terms: Vec<&str> = context
            .keys()
            .map(String::as_str)
            .filter(|key| !CONTEXT_KEYWORDS.contains(key))
            .collect();
        terms.sort_unstable();

        let mut defined = HashMap::new();
        for term in terms {
            result.create_term(&scope, term, &mut defined).await?;
        }

        Ok(result)
    }

    /// IRI expansion while a local context is being processed: terms of the
    /// local context that are referenced before being defined get defined first.
    async fn expand_iri_mut<'a, L: DocumentLoader>(
        &mut self,
        scope: &TermScope<'a, L>,
        value: &str,
        document_relative: bool,
        vocab: bool,
        defined: &mut HashMap<String, DefineStatus>,
    ) -> Result<ExpandedIri> {
        if is_keyword_shaped(value) {
            return Ok(self.expand_iri(value, document_relative, vocab));
        }

        if scope.local_context.contains_key(value)
            && status(defined, value) != DefineStatus::Completed
        {
            self.create_term(scope, value, defined).await?;
        }

        if let Some(definition) = self.term(value) {
            if vocab || matches!(definition.iri_mapping, ExpandedIri::Keyword(_)) {
                return Ok(definition.iri_mapping.clone());
            }
        }

        if let Some((prefix, suffix)) = split_compact_iri(value) {
            if prefix != "_"
                && !suffix.starts_with("//")
                && scope.local_context.contains_key(prefix)
                && status(defined, prefix) != DefineStatus::Completed
            {
                self.create_term(scope, prefix, defined).await?;
            }
        }

        Ok(self.expand_iri(value, document_relative, vocab))
    }

    /// Creates the term definition for `term` of the local context in `scope`.
    fn create_term<'s, 'a: 's, L: DocumentLoader>(
        &'s mut self,
        scope: &'s TermScope<'a, L>,
        term: &'s str,
        defined: &'s mut HashMap<String, DefineStatus>,
    ) -> BoxFuture<'s, Result<()>> {
        Box::pin(async move {
            match status(defined, term) {
                DefineStatus::Completed => return Ok(()),
                DefineStatus::InProgress => {
                    return Err(JsonLdError::CyclicIriMapping(term.to_owned()))
                }
                DefineStatus::Undefined => {}
            }

            if term.is_empty() {
                return Err(JsonLdError::InvalidTermDefinition(term.to_owned()));
            }

            defined.insert(term.to_owned(), DefineStatus::InProgress);

            let json_ld_10 = scope.processor.is_json_ld_10();
            let value = scope.local_context.get(term).cloned().unwrap_or(Value::Null);

            if term == "@type" {
                let only_set_or_protected = match &value {
                    Value::Object(map) => {
                        !map.is_empty()
                            && map.iter().all(|(key, val)| match key.as_str() {
                                "@container" => val.as_str() == Some("@set"),
                                "@protected" => true,
                                _ => false,
                            })
                    }
                    _ => false,
                };

                if json_ld_10 || !only_set_or_protected {
                    return Err(JsonLdError::KeywordRedefinition(term.to_owned()));
                }
            } else if is_keyword(term) {
                return Err(JsonLdError::KeywordRedefinition(term.to_owned()));
            } else if is_keyword_shaped(term) {
                tracing::warn!(term, "ignoring keyword-like term");
                defined.insert(term.to_owned(), DefineStatus::Completed);
                return Ok(());
            }

            let previous = self.remove_term(term);

            let (map, simple_term) = match value {
                Value::Null => {
                    let mut map = Map::new();
                    map.insert("@id".to_owned(), Value::Null);
                    (map, false)
                }
                Value::String(id) => {
                    let mut map = Map::new();
                    map.insert("@id".to_owned(), Value::String(id));
                    (map, true)
                }
                Value::Object(map) => (map, false),
                _ => return Err(JsonLdError::InvalidTermDefinition(term.to_owned())),
            };

            let mut definition = TermDefinition::new(ExpandedIri::Nil);
            definition.protected = scope.protected;

            if let Some(protected) = map.get("@protected") {
                if json_ld_10 {
                    return Err(JsonLdError::InvalidTermDefinition(term.to_owned()));
                }
                definition.protected = protected
                    .as_bool()
                    .ok_or(JsonLdError::InvalidProtectedValue)?;
            }

            if let Some(type_mapping) = map.get("@type") {
                let type_mapping = type_mapping
                    .as_str()
                    .ok_or_else(|| JsonLdError::InvalidTypeMapping(term.to_owned()))?;
                let expanded = self
                    .expand_iri_mut(scope, type_mapping, false, true, defined)
                    .await?;

                let valid = match &expanded {
                    ExpandedIri::Keyword(Keyword::Json) | ExpandedIri::Keyword(Keyword::None) => {
                        !json_ld_10
                    }
                    ExpandedIri::Keyword(Keyword::Id) | ExpandedIri::Keyword(Keyword::Vocab) => {
                        true
                    }
                    other => other.is_absolute_iri(),
                };

                if !valid {
                    return Err(JsonLdError::InvalidTypeMapping(term.to_owned()));
                }
                definition.type_mapping = Some(expanded);
            }

            if let Some(reverse) = map.get("@reverse") {
                if map.contains_key("@id") || map.contains_key("@nest") {
                    return Err(JsonLdError::InvalidReverseProperty(term.to_owned()));
                }

                let reverse = reverse
                    .as_str()
                    .ok_or_else(|| JsonLdError::InvalidIriMapping(term.to_owned()))?;

                if is_keyword_shaped(reverse) {
                    tracing::warn!(term, reverse, "ignoring keyword-like @reverse");
                    defined.insert(term.to_owned(), DefineStatus::Completed);
                    return Ok(());
                }

                let iri = self
                    .expand_iri_mut(scope, reverse, false, true, defined)
                    .await?;
                if !iri.is_iri_or_blank_node() {
                    return Err(JsonLdError::InvalidIriMapping(term.to_owned()));
                }
                definition.iri_mapping = iri;

                match map.get("@container") {
                    None | Some(Value::Null) => {}
                    Some(Value::String(container))
                        if container == "@set" || container == "@index" =>
                    {
                        if let Some(keyword) = Keyword::parse(container) {
                            definition.container_mapping.insert(keyword);
                        }
                    }
                    Some(_) => return Err(JsonLdError::InvalidReverseProperty(term.to_owned())),
                }

                definition.reverse_property = true;
            } else if let Some(id) = map.get("@id").filter(|id| id.as_str() != Some(term)) {
                match id {
                    Value::Null => definition.iri_mapping = ExpandedIri::Nil,
                    Value::String(id) => {
                        if !is_keyword(id) && is_keyword_shaped(id) {
                            tracing::warn!(term, id = %id, "ignoring keyword-like @id");
                            defined.insert(term.to_owned(), DefineStatus::Completed);
                            return Ok(());
                        }

                        let iri = self.expand_iri_mut(scope, id, false, true, defined).await?;
                        match &iri {
                            ExpandedIri::Keyword(Keyword::Context) => {
                                return Err(JsonLdError::InvalidKeywordAlias(term.to_owned()));
                            }
                            ExpandedIri::Keyword(_) => {}
                            other if other.is_iri_or_blank_node() => {}
                            _ => return Err(JsonLdError::InvalidIriMapping(term.to_owned())),
                        }

                        let inner_colon = term
                            .char_indices()
                            .any(|(pos, c)| c == ':' && pos > 0 && pos + 1 < term.len());
                        if inner_colon || term.contains('/') {
                            defined.insert(term.to_owned(), DefineStatus::Completed);
                            let own = self.expand_iri_mut(scope, term, false, true, defined).await?;
                            if own != iri {
                                return Err(JsonLdError::InvalidIriMapping(term.to_owned()));
                            }
                        }

                        if !term.contains([':', '/']) && simple_term {
                            definition.prefix = match &iri {
                                ExpandedIri::Iri(iri) => ends_with_gen_delim(iri),
                                ExpandedIri::BlankNode(_) => true,
                                _ => false,
                            };
                        }

                        definition.iri_mapping = iri;
                    }
                    _ => return Err(JsonLdError::InvalidIriMapping(term.to_owned())),
                }
            } else if let Some((prefix, suffix)) = split_compact_iri(term) {
                if scope.local_context.contains_key(prefix) {
                    self.create_term(scope, prefix, defined).await?;
                }

                definition.iri_mapping = match self.term(prefix).and_then(|d| d.iri_mapping.as_str()) {
                    Some(prefix_iri) => ExpandedIri::from_string(format!("{}{}", prefix_iri, suffix)),
                    None => ExpandedIri::from_string(term.to_owned()),
                };
            } else if term.contains('/') {
                let iri = self.expand_iri_mut(scope, term, false, true, defined).await?;
                if !iri.is_absolute_iri() {
                    return Err(JsonLdError::InvalidIriMapping(term.to_owned()));
                }
                definition.iri_mapping = iri;
            } else if term == "@type" {
                definition.iri_mapping = ExpandedIri::Keyword(Keyword::Type);
            } else {
                let vocab = self
                    .vocabulary_mapping
                    .as_ref()
                    .and_then(|vocab| vocab.as_str())
                    .ok_or_else(|| JsonLdError::InvalidIriMapping(term.to_owned()))?;
                definition.iri_mapping = ExpandedIri::from_string(format!("{}{}", vocab, term));
            }

            if let Some(container) = map.get("@container") {
                if !definition.reverse_property {
                    definition.container_mapping = parse_container(container, json_ld_10, term)?;

                    if definition.container_mapping.contains(Keyword::Type) {
                        match &definition.type_mapping {
                            None => {
                                definition.type_mapping = Some(ExpandedIri::Keyword(Keyword::Id))
                            }
                            Some(ExpandedIri::Keyword(Keyword::Id))
                            | Some(ExpandedIri::Keyword(Keyword::Vocab)) => {}
                            Some(_) => return Err(JsonLdError::InvalidTypeMapping(term.to_owned())),
                        }
                    }
                }
            }

            if let Some(index) = map.get("@index") {
                if json_ld_10 || !definition.container_mapping.contains(Keyword::Index) {
                    return Err(JsonLdError::InvalidTermDefinition(term.to_owned()));
                }

                let index = index
                    .as_str()
                    .ok_or_else(|| JsonLdError::InvalidTermDefinition(term.to_owned()))?;
                let expanded = self.expand_iri_mut(scope, index, false, true, defined).await?;
                if !expanded.is_absolute_iri() {
                    return Err(JsonLdError::InvalidTermDefinition(term.to_owned()));
                }

                definition.index_mapping = Some(index.to_owned());
            }

            if let Some(scoped) = map.get("@context") {
                if json_ld_10 {
                    return Err(JsonLdError::InvalidTermDefinition(term.to_owned()));
                }

                // Processed only to surface errors now; the raw value is applied on use.
                let validated = self
                    .process_inner(
                        scope.processor,
                        scoped,
                        scope.base_url,
                        scope.remote_contexts.to_vec(),
                        ProcessOptions {
                            override_protected: true,
                            propagate: true,
                            validate_scoped_context: false,
                        },
                    )
                    .await;

                if let Err(source) = validated {
                    return Err(JsonLdError::InvalidScopedContext {
                        term: term.to_owned(),
                        source: Box::new(source),
                    });
                }

                definition.context = Some(scoped.clone());
                definition.base_url = scope.base_url.map(str::to_owned);
            }

            if !map.contains_key("@type") {
                if let Some(language) = map.get("@language") {
                    definition.language_mapping = Some(match language {
                        Value::Null => None,
                        Value::String(language) => {
                            if !is_well_formed_language(language) {
                                tracing::warn!(term, language = %language, "malformed language tag");
                            }
                            Some(language.to_lowercase())
                        }
                        _ => return Err(JsonLdError::InvalidLanguageMapping(term.to_owned())),
                    });
                }

                if let Some(direction) = map.get("@direction") {
                    if json_ld_10 {
                        return Err(JsonLdError::InvalidTermDefinition(term.to_owned()));
                    }

                    definition.direction_mapping = Some(match direction {
                        Value::Null => None,
                        Value::String(direction) => Some(
                            Direction::parse(direction).ok_or(JsonLdError::InvalidBaseDirection)?,
                        ),
                        _ => return Err(JsonLdError::InvalidBaseDirection),
                    });
                }
            }

            if let Some(nest) = map.get("@nest") {
                if json_ld_10 {
                    return Err(JsonLdError::InvalidTermDefinition(term.to_owned()));
                }

                match nest.as_str() {
                    Some(nest) if nest == "@nest" || !is_keyword(nest) => {
                        definition.nest_value = Some(nest.to_owned());
                    }
                    _ => return Err(JsonLdError::InvalidNestValue),
                }
            }

            if let Some(prefix) = map.get("@prefix") {
                if json_ld_10 || term.contains([':', '/']) {
                    return Err(JsonLdError::InvalidTermDefinition(term.to_owned()));
                }

                let prefix = prefix.as_bool().ok_or(JsonLdError::InvalidPrefixValue)?;
                if prefix && matches!(definition.iri_mapping, ExpandedIri::Keyword(_)) {
                    return Err(JsonLdError::InvalidTermDefinition(term.to_owned()));
                }
                definition.prefix = prefix;
            }

            if map.keys().any(|key| !TERM_KEYWORDS.contains(&key.as_str())) {
                return Err(JsonLdError::InvalidTermDefinition(term.to_owned()));
            }

            let definition = match previous {
                Some(previous) if !scope.override_protected && previous.protected => {
                    if !definition.same_as(&previous) {
                        return Err(JsonLdError::ProtectedTermRedefinition(term.to_owned()));
                    }
                    previous
                }
                _ => Arc::new(definition),
            };

            self.set_term(term, definition);
            defined.insert(term.to_owned(), DefineStatus::Completed);

            Ok(())
        })
    }
}
