use serde_json::Value;
use std::fmt;

use crate::context::Context;
use crate::keyword::{is_keyword_shaped, Keyword};

/// The result of resolving a token through the active context.
#[derive(Clone, Debug, PartialEq)]
pub enum ExpandedIri {
    /// The token does not map to anything, and should be dropped.
    Nil,
    Keyword(Keyword),
    /// An absolute IRI, or a relative one if no base was available.
    Iri(String),
    /// A blank node identifier, including its `_:` prefix.
    BlankNode(String),
    /// A non-string token passed through untouched.
    RawValue(Value),
}

impl ExpandedIri {
    /// Classifies an already-expanded string.
    pub(crate) fn from_string(val: String) -> ExpandedIri {
        if let Some(keyword) = Keyword::parse(&val) {
            ExpandedIri::Keyword(keyword)
        } else if val.starts_with("_:") {
            ExpandedIri::BlankNode(val)
        } else {
            ExpandedIri::Iri(val)
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            ExpandedIri::Keyword(keyword) => Some(keyword.as_str()),
            ExpandedIri::Iri(iri) | ExpandedIri::BlankNode(iri) => Some(iri),
            ExpandedIri::Nil | ExpandedIri::RawValue(_) => None,
        }
    }

    pub fn is_nil(&self) -> bool {
        matches!(self, ExpandedIri::Nil)
    }

    pub fn keyword(&self) -> Option<Keyword> {
        match self {
            ExpandedIri::Keyword(keyword) => Some(*keyword),
            _ => None,
        }
    }

    pub fn is_keyword(&self, keyword: Keyword) -> bool {
        self.keyword() == Some(keyword)
    }

    /// True for IRIs which carry a scheme.
    pub fn is_absolute_iri(&self) -> bool {
        match self {
            ExpandedIri::Iri(iri) => is_absolute_iri(iri),
            _ => false,
        }
    }

    /// True for absolute IRIs and blank nodes: the things a property or
    /// node identifier may resolve to.
    pub fn is_iri_or_blank_node(&self) -> bool {
        matches!(self, ExpandedIri::BlankNode(_)) || self.is_absolute_iri()
    }

    pub fn into_value(self) -> Value {
        match self {
            ExpandedIri::Nil => Value::Null,
            ExpandedIri::Keyword(keyword) => Value::String(keyword.as_str().to_owned()),
            ExpandedIri::Iri(iri) | ExpandedIri::BlankNode(iri) => Value::String(iri),
            ExpandedIri::RawValue(value) => value,
        }
    }
}

impl fmt::Display for ExpandedIri {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            ExpandedIri::Nil => f.write_str("null"),
            ExpandedIri::RawValue(value) => write!(f, "{}", value),
            other => f.write_str(other.as_str().unwrap_or_default()),
        }
    }
}

impl Context {
    /// Expands `value` to an IRI, keyword, or blank node.
    ///
    /// Never fails: unknown keyword-shaped tokens become [`ExpandedIri::Nil`],
    /// anything else unresolvable is handed back unchanged.
    pub fn expand_iri(&self, value: &str, document_relative: bool, vocab: bool) -> ExpandedIri {
        if let Some(keyword) = Keyword::parse(value) {
            return ExpandedIri::Keyword(keyword);
        }

        if is_keyword_shaped(value) {
            tracing::warn!(value, "ignoring keyword-like token");
            return ExpandedIri::Nil;
        }

        if let Some(definition) = self.term(value) {
            if vocab || matches!(definition.iri_mapping, ExpandedIri::Keyword(_)) {
                return definition.iri_mapping.clone();
            }
        }

        if let Some((prefix, suffix)) = split_compact_iri(value) {
            if prefix == "_" {
                return ExpandedIri::BlankNode(value.to_owned());
            }

            if suffix.starts_with("//") {
                return ExpandedIri::Iri(value.to_owned());
            }

            if let Some(definition) = self.term(prefix) {
                if definition.prefix {
                    if let ExpandedIri::Iri(iri) | ExpandedIri::BlankNode(iri) =
                        &definition.iri_mapping
                    {
                        return ExpandedIri::from_string(format!("{}{}", iri, suffix));
                    }
                }
            }

            // Strings without path, fragment, or query delimiters are taken as
            // IRIs even when the prefix is not a valid scheme.
            if !value.contains(['/', '#', '?']) || is_absolute_iri(value) {
                return ExpandedIri::Iri(value.to_owned());
            }
        }

        if vocab {
            if let Some(mapping) = self.vocabulary_mapping.as_ref().and_then(|v| v.as_str()) {
                return ExpandedIri::from_string(format!("{}{}", mapping, value));
            }
        }

        if document_relative {
            if let Some(base) = &self.base_iri {
                return ExpandedIri::Iri(resolve(base, value));
            }
        }

        ExpandedIri::from_string(value.to_owned())
    }

    /// Expands an arbitrary input token. Non-string scalars are passed through
    /// as [`ExpandedIri::RawValue`].
    pub fn expand_iri_value(&self, value: &Value, document_relative: bool, vocab: bool) -> ExpandedIri {
        match value {
            Value::Null => ExpandedIri::Nil,
            Value::String(val) => self.expand_iri(val, document_relative, vocab),
            other => ExpandedIri::RawValue(other.clone()),
        }
    }
}

/// Splits at the first colon, provided it is not the first character.
pub(crate) fn split_compact_iri(value: &str) -> Option<(&str, &str)> {
    match value.find(':') {
        Some(pos) if pos > 0 => Some((&value[..pos], &value[pos + 1..])),
        _ => None,
    }
}

fn is_scheme(val: &str) -> bool {
    let mut bytes = val.bytes();
    match bytes.next() {
        Some(first) if first.is_ascii_alphabetic() => {
            bytes.all(|b| b.is_ascii_alphanumeric() || b == b'+' || b == b'-' || b == b'.')
        }
        _ => false,
    }
}

/// Returns true if the IRI starts with an RFC 3986 scheme.
pub fn is_absolute_iri(iri: &str) -> bool {
    match iri.find(':') {
        Some(pos) => is_scheme(&iri[..pos]),
        None => false,
    }
}

/// Ends with one of the RFC 3986 `gen-delims`.
pub(crate) fn ends_with_gen_delim(iri: &str) -> bool {
    iri.ends_with([':', '/', '?', '#', '[', ']', '@'])
}

/// Loose BCP-47 shape check; failures are only ever reported as warnings.
pub(crate) fn is_well_formed_language(tag: &str) -> bool {
    let mut subtags = tag.split('-');
    let primary_ok = subtags
        .next()
        .map_or(false, |s| (1..=8).contains(&s.len()) && s.bytes().all(|b| b.is_ascii_alphabetic()));

    primary_ok && subtags.all(|s| (1..=8).contains(&s.len()) && s.bytes().all(|b| b.is_ascii_alphanumeric()))
}

struct Parts<'a> {
    scheme: Option<&'a str>,
    authority: Option<&'a str>,
    path: &'a str,
    query: Option<&'a str>,
    fragment: Option<&'a str>,
}

fn split(iri: &str) -> Parts<'_> {
    let (rest, fragment) = match iri.find('#') {
        Some(pos) => (&iri[..pos], Some(&iri[pos + 1..])),
        None => (iri, None),
    };

    let (rest, query) = match rest.find('?') {
        Some(pos) => (&rest[..pos], Some(&rest[pos + 1..])),
        None => (rest, None),
    };

    let (scheme, rest) = match rest.find(':') {
        Some(pos) if is_scheme(&rest[..pos]) => (Some(&rest[..pos]), &rest[pos + 1..]),
        _ => (None, rest),
    };

    let (authority, path) = match rest.strip_prefix("//") {
        Some(after) => {
            let end = after.find('/').unwrap_or(after.len());
            (Some(&after[..end]), &after[end..])
        }
        None => (None, rest),
    };

    Parts {
        scheme,
        authority,
        path,
        query,
        fragment,
    }
}

fn pop_segment(output: &mut String) {
    match output.rfind('/') {
        Some(pos) => output.truncate(pos),
        None => output.clear(),
    }
}

/// RFC 3986 §5.2.4.
fn remove_dot_segments(path: &str) -> String {
    let mut input = path.to_owned();
    let mut output = String::with_capacity(path.len());

    while !input.is_empty() {
        if input.starts_with("../") {
            input.drain(..3);
        } else if input.starts_with("./") {
            input.drain(..2);
        } else if input.starts_with("/./") {
            input.replace_range(..3, "/");
        } else if input == "/." {
            input = "/".to_owned();
        } else if input.starts_with("/../") {
            input.replace_range(..4, "/");
            pop_segment(&mut output);
        } else if input == "/.." {
            input = "/".to_owned();
            pop_segment(&mut output);
        } else if input == "." || input == ".." {
            input.clear();
        } else {
            let start = if input.starts_with('/') { 1 } else { 0 };
            let end = input[start..]
                .find('/')
                .map_or(input.len(), |pos| pos + start);
            output.push_str(&input[..end]);
            input.drain(..end);
        }
    }

    output
}

fn merge(base: &Parts, reference_path: &str) -> String {
    if base.authority.is_some() && base.path.is_empty() {
        format!("/{}", reference_path)
    } else {
        match base.path.rfind('/') {
            Some(pos) => format!("{}{}", &base.path[..=pos], reference_path),
            None => reference_path.to_owned(),
        }
    }
}

/// Resolves `reference` against `base` following RFC 3986 §5.2, without
/// any further normalization.
pub fn resolve(base: &str, reference: &str) -> String {
    let r = split(reference);
    let b = split(base);

    let (scheme, authority, path, query) = if r.scheme.is_some() {
        (r.scheme, r.authority, remove_dot_segments(r.path), r.query)
    } else if r.authority.is_some() {
        (b.scheme, r.authority, remove_dot_segments(r.path), r.query)
    } else if r.path.is_empty() {
        (b.scheme, b.authority, b.path.to_owned(), r.query.or(b.query))
    } else if r.path.starts_with('/') {
        (b.scheme, b.authority, remove_dot_segments(r.path), r.query)
    } else {
        (b.scheme, b.authority, remove_dot_segments(&merge(&b, r.path)), r.query)
    };

    let mut target = String::with_capacity(base.len() + reference.len());
    if let Some(scheme) = scheme {
        target.push_str(scheme);
        target.push(':');
    }
    if let Some(authority) = authority {
        target.push_str("//");
        target.push_str(authority);
    }
    target.push_str(&path);
    if let Some(query) = query {
        target.push('?');
        target.push_str(query);
    }
    if let Some(fragment) = r.fragment {
        target.push('#');
        target.push_str(fragment);
    }

    target
}
