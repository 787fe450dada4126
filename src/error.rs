//! The closed set of errors raised by context processing and expansion.

use std::error::Error as StdError;

/// A boxed cause, as produced by document loaders and timeouts.
pub type BoxError = Box<dyn StdError + Send + Sync + 'static>;

#[derive(Debug, thiserror::Error)]
/// Every way context processing or expansion can fail.
///
/// Each variant corresponds to one of the JSON-LD 1.1 error codes, apart from
/// [`JsonLdError::DepthLimitExceeded`] which guards against adversarially deep input.
pub enum JsonLdError {
    /// Two properties which expand to the same keyword have been detected.
    #[error("colliding keywords: {0}")]
    CollidingKeywords(String),

    /// Too many remote contexts have been included, or a cycle was detected.
    #[error("context overflow while including {0}")]
    ContextOverflow(String),

    /// A term is defined in terms of itself.
    #[error("cyclic IRI mapping for term {0:?}")]
    CyclicIriMapping(String),

    #[error("invalid @id value")]
    InvalidIdValue,

    #[error("invalid @import value")]
    InvalidImportValue,

    /// An `@included` entry holds something other than node objects.
    #[error("invalid @included value")]
    InvalidIncludedValue,

    #[error("invalid @index value")]
    InvalidIndexValue,

    #[error("invalid @nest value")]
    InvalidNestValue,

    #[error("invalid @prefix value")]
    InvalidPrefixValue,

    #[error("invalid @propagate value")]
    InvalidPropagateValue,

    #[error("invalid @protected value")]
    InvalidProtectedValue,

    #[error("invalid @reverse value")]
    InvalidReverseValue,

    #[error("invalid @version value")]
    InvalidVersionValue,

    #[error("invalid base direction")]
    InvalidBaseDirection,

    #[error("invalid base IRI {0:?}")]
    InvalidBaseIri(String),

    #[error("invalid container mapping for term {0:?}")]
    InvalidContainerMapping(String),

    #[error("invalid context entry {0:?}")]
    InvalidContextEntry(String),

    /// Attempted to nullify a context containing protected terms.
    #[error("invalid context nullification")]
    InvalidContextNullification,

    #[error("invalid default language")]
    InvalidDefaultLanguage,

    #[error("invalid IRI mapping for term {0:?}")]
    InvalidIriMapping(String),

    #[error("invalid keyword alias for term {0:?}")]
    InvalidKeywordAlias(String),

    #[error("invalid language map value")]
    InvalidLanguageMapValue,

    #[error("invalid language mapping for term {0:?}")]
    InvalidLanguageMapping(String),

    #[error("invalid language-tagged string")]
    InvalidLanguageTaggedString,

    #[error("invalid language-tagged value")]
    InvalidLanguageTaggedValue,

    #[error("invalid local context")]
    InvalidLocalContext,

    #[error("invalid remote context {0}")]
    InvalidRemoteContext(String),

    #[error("invalid reverse property for term {0:?}")]
    InvalidReverseProperty(String),

    #[error("invalid reverse property map")]
    InvalidReversePropertyMap,

    #[error("invalid reverse property value")]
    InvalidReversePropertyValue,

    /// The scoped context of a term failed to process when the term was defined.
    #[error("invalid scoped context for term {term:?}")]
    InvalidScopedContext {
        term: String,
        #[source]
        source: Box<JsonLdError>,
    },

    #[error("invalid set or list object")]
    InvalidSetOrListObject,

    #[error("invalid term definition for term {0:?}")]
    InvalidTermDefinition(String),

    #[error("invalid type mapping for term {0:?}")]
    InvalidTypeMapping(String),

    #[error("invalid type value")]
    InvalidTypeValue,

    #[error("invalid typed value")]
    InvalidTypedValue,

    #[error("invalid value object")]
    InvalidValueObject,

    #[error("invalid value object value")]
    InvalidValueObjectValue,

    #[error("invalid vocab mapping")]
    InvalidVocabMapping,

    #[error("keyword redefinition of {0:?}")]
    KeywordRedefinition(String),

    /// Only raised in `json-ld-1.0` mode; 1.1 allows lists of lists.
    #[error("list of lists")]
    ListOfLists,

    #[error("loading document {url} failed")]
    LoadingDocumentFailed {
        url: String,
        #[source]
        source: Option<BoxError>,
    },

    #[error("loading remote context {url} failed")]
    LoadingRemoteContextFailed {
        url: String,
        #[source]
        source: BoxError,
    },

    #[error("processing mode conflict")]
    ProcessingModeConflict,

    #[error("protected term redefinition of {0:?}")]
    ProtectedTermRedefinition(String),

    /// Input nesting exceeded the configured ceiling.
    #[error("maximum nesting depth of {0} exceeded")]
    DepthLimitExceeded(usize),
}

impl JsonLdError {
    /// The JSON-LD error code string, as used by the W3C test suite.
    pub fn code(&self) -> &'static str {
        match self {
            JsonLdError::CollidingKeywords(_) => "colliding keywords",
            JsonLdError::ContextOverflow(_) => "context overflow",
            JsonLdError::CyclicIriMapping(_) => "cyclic IRI mapping",
            JsonLdError::InvalidIdValue => "invalid @id value",
            JsonLdError::InvalidImportValue => "invalid @import value",
            JsonLdError::InvalidIncludedValue => "invalid @included value",
            JsonLdError::InvalidIndexValue => "invalid @index value",
            JsonLdError::InvalidNestValue => "invalid @nest value",
            JsonLdError::InvalidPrefixValue => "invalid @prefix value",
            JsonLdError::InvalidPropagateValue => "invalid @propagate value",
            JsonLdError::InvalidProtectedValue => "invalid @protected value",
            JsonLdError::InvalidReverseValue => "invalid @reverse value",
            JsonLdError::InvalidVersionValue => "invalid @version value",
            JsonLdError::InvalidBaseDirection => "invalid base direction",
            JsonLdError::InvalidBaseIri(_) => "invalid base IRI",
            JsonLdError::InvalidContainerMapping(_) => "invalid container mapping",
            JsonLdError::InvalidContextEntry(_) => "invalid context entry",
            JsonLdError::InvalidContextNullification => "invalid context nullification",
            JsonLdError::InvalidDefaultLanguage => "invalid default language",
            JsonLdError::InvalidIriMapping(_) => "invalid IRI mapping",
            JsonLdError::InvalidKeywordAlias(_) => "invalid keyword alias",
            JsonLdError::InvalidLanguageMapValue => "invalid language map value",
            JsonLdError::InvalidLanguageMapping(_) => "invalid language mapping",
            JsonLdError::InvalidLanguageTaggedString => "invalid language-tagged string",
            JsonLdError::InvalidLanguageTaggedValue => "invalid language-tagged value",
            JsonLdError::InvalidLocalContext => "invalid local context",
            JsonLdError::InvalidRemoteContext(_) => "invalid remote context",
            JsonLdError::InvalidReverseProperty(_) => "invalid reverse property",
            JsonLdError::InvalidReversePropertyMap => "invalid reverse property map",
            JsonLdError::InvalidReversePropertyValue => "invalid reverse property value",
            JsonLdError::InvalidScopedContext { .. } => "invalid scoped context",
            JsonLdError::InvalidSetOrListObject => "invalid set or list object",
            JsonLdError::InvalidTermDefinition(_) => "invalid term definition",
            JsonLdError::InvalidTypeMapping(_) => "invalid type mapping",
            JsonLdError::InvalidTypeValue => "invalid type value",
            JsonLdError::InvalidTypedValue => "invalid typed value",
            JsonLdError::InvalidValueObject => "invalid value object",
            JsonLdError::InvalidValueObjectValue => "invalid value object value",
            JsonLdError::InvalidVocabMapping => "invalid vocab mapping",
            JsonLdError::KeywordRedefinition(_) => "keyword redefinition",
            JsonLdError::ListOfLists => "list of lists",
            JsonLdError::LoadingDocumentFailed { .. } => "loading document failed",
            JsonLdError::LoadingRemoteContextFailed { .. } => "loading remote context failed",
            JsonLdError::ProcessingModeConflict => "processing mode conflict",
            JsonLdError::ProtectedTermRedefinition(_) => "protected term redefinition",
            JsonLdError::DepthLimitExceeded(_) => "depth limit exceeded",
        }
    }
}

pub type Result<T> = std::result::Result<T, JsonLdError>;
