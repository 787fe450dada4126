use lazy_static::lazy_static;
use std::collections::HashMap;
use std::fmt;

/// A JSON-LD keyword.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Keyword {
    Base,
    Container,
    Context,
    Direction,
    Graph,
    Id,
    Import,
    Included,
    Index,
    Json,
    Language,
    List,
    Nest,
    None,
    Prefix,
    Propagate,
    Protected,
    Reverse,
    Set,
    Type,
    Value,
    Version,
    Vocab,
}

lazy_static! {
    static ref KEYWORDS: HashMap<&'static str, Keyword> = vec![
        ("@base", Keyword::Base),
        ("@container", Keyword::Container),
        ("@context", Keyword::Context),
        ("@direction", Keyword::Direction),
        ("@graph", Keyword::Graph),
        ("@id", Keyword::Id),
        ("@import", Keyword::Import),
        ("@included", Keyword::Included),
        ("@index", Keyword::Index),
        ("@json", Keyword::Json),
        ("@language", Keyword::Language),
        ("@list", Keyword::List),
        ("@nest", Keyword::Nest),
        ("@none", Keyword::None),
        ("@prefix", Keyword::Prefix),
        ("@propagate", Keyword::Propagate),
        ("@protected", Keyword::Protected),
        ("@reverse", Keyword::Reverse),
        ("@set", Keyword::Set),
        ("@type", Keyword::Type),
        ("@value", Keyword::Value),
        ("@version", Keyword::Version),
        ("@vocab", Keyword::Vocab),
    ]
    .into_iter()
    .collect();
}

impl Keyword {
    /// Looks up a keyword by its `@`-prefixed spelling.
    pub fn parse(val: &str) -> Option<Keyword> {
        KEYWORDS.get(val).copied()
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Keyword::Base => "@base",
            Keyword::Container => "@container",
            Keyword::Context => "@context",
            Keyword::Direction => "@direction",
            Keyword::Graph => "@graph",
            Keyword::Id => "@id",
            Keyword::Import => "@import",
            Keyword::Included => "@included",
            Keyword::Index => "@index",
            Keyword::Json => "@json",
            Keyword::Language => "@language",
            Keyword::List => "@list",
            Keyword::Nest => "@nest",
            Keyword::None => "@none",
            Keyword::Prefix => "@prefix",
            Keyword::Propagate => "@propagate",
            Keyword::Protected => "@protected",
            Keyword::Reverse => "@reverse",
            Keyword::Set => "@set",
            Keyword::Type => "@type",
            Keyword::Value => "@value",
            Keyword::Version => "@version",
            Keyword::Vocab => "@vocab",
        }
    }
}

impl fmt::Display for Keyword {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

pub fn is_keyword(val: &str) -> bool {
    KEYWORDS.contains_key(val)
}

/// Matches `@` followed by one or more ASCII letters. Such tokens are reserved
/// for future keywords and are ignored rather than treated as terms.
pub fn is_keyword_shaped(val: &str) -> bool {
    match val.strip_prefix('@') {
        Some(rest) => !rest.is_empty() && rest.bytes().all(|b| b.is_ascii_alphabetic()),
        None => false,
    }
}
