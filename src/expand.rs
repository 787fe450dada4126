use serde_json::{Map, Value};
use std::borrow::Cow;
use std::collections::BTreeMap;

use crate::context::{Container, Context, Direction, Processor};
use crate::creation::ProcessOptions;
use crate::error::{JsonLdError, Result};
use crate::expanded::ExpandedValue;
use crate::iri::{is_absolute_iri, is_well_formed_language, ExpandedIri};
use crate::keyword::Keyword;
use crate::{BoxFuture, DocumentLoader};

type Object = BTreeMap<String, ExpandedValue>;

const VALUE_OBJECT_KEYS: [&str; 5] = ["@direction", "@index", "@language", "@type", "@value"];

fn single(key: &str, value: ExpandedValue) -> ExpandedValue {
    let mut map = Object::new();
    map.insert(key.to_owned(), value);
    ExpandedValue::Object(map)
}

fn iri_value(iri: ExpandedIri) -> ExpandedValue {
    ExpandedValue::ScalarPrimitive(iri.into_value())
}

/// Appends `value` to the array stored under `key`, flattening arrays.
fn add_value(map: &mut Object, key: &str, value: ExpandedValue) {
    let mut items = map
        .remove(key)
        .map(ExpandedValue::into_vec)
        .unwrap_or_default();
    items.extend(value.into_vec());
    map.insert(key.to_owned(), ExpandedValue::Array(items));
}

fn reverse_bucket(result: &mut Object) -> &mut Object {
    let slot = result
        .entry("@reverse".to_owned())
        .or_insert_with(|| ExpandedValue::Object(Object::new()));

    if !matches!(slot, ExpandedValue::Object(_)) {
        *slot = ExpandedValue::Object(Object::new());
    }

    match slot {
        ExpandedValue::Object(map) => map,
        _ => unreachable!(),
    }
}

fn is_node_object(value: &ExpandedValue) -> bool {
    match value {
        ExpandedValue::Object(map) => {
            !map.contains_key("@value") && !map.contains_key("@list") && !map.contains_key("@set")
        }
        _ => false,
    }
}

/// Scoped context attached to `term`, with the base URL it was defined under.
fn scoped_context<'c>(context: &'c Context, term: &str) -> Option<(&'c Value, Option<&'c str>)> {
    context
        .term(term)
        .and_then(|def| def.context.as_ref().map(|ctx| (ctx, def.base_url.as_deref())))
}

impl Context {
    /// Turns a scalar found under `active_property` into a value object, or a
    /// node reference when the term is typed `@id`/`@vocab`.
    pub fn expand_value(&self, active_property: &str, value: &Value) -> ExpandedValue {
        let definition = self.term(active_property);
        let type_mapping = definition.and_then(|def| def.type_mapping.as_ref());

        if let Value::String(val) = value {
            match type_mapping.and_then(ExpandedIri::keyword) {
                Some(Keyword::Id) => return single("@id", iri_value(self.expand_iri(val, true, false))),
                Some(Keyword::Vocab) => {
                    return single("@id", iri_value(self.expand_iri(val, true, true)))
                }
                _ => {}
            }
        }

        let mut result = Object::new();
        result.insert("@value".to_owned(), ExpandedValue::ScalarPrimitive(value.clone()));

        match type_mapping {
            Some(typ)
                if !matches!(
                    typ.keyword(),
                    Some(Keyword::Id) | Some(Keyword::Vocab) | Some(Keyword::None)
                ) =>
            {
                result.insert("@type".to_owned(), iri_value(typ.clone()));
            }
            _ if value.is_string() => {
                let language = match definition.and_then(|def| def.language_mapping.as_ref()) {
                    Some(mapped) => mapped.as_deref(),
                    None => self.default_language(),
                };
                let direction = match definition.and_then(|def| def.direction_mapping) {
                    Some(mapped) => mapped,
                    None => self.default_direction(),
                };

                if let Some(language) = language {
                    result.insert("@language".to_owned(), language.into());
                }

                if let Some(direction) = direction {
                    result.insert("@direction".to_owned(), direction.as_str().into());
                }
            }
            _ => {}
        }

        ExpandedValue::Object(result)
    }

    /// Expands a whole document: the result is always an array.
    pub async fn expand<L: DocumentLoader>(
        &self,
        processor: &Processor<L>,
        element: &Value,
        base_url: Option<&str>,
    ) -> Result<ExpandedValue> {
        let expanded = self
            .expand_element(processor, None, element, base_url, false, 0)
            .await?;

        let expanded = match expanded {
            Some(ExpandedValue::Object(mut map)) if map.len() == 1 && map.contains_key("@graph") => {
                map.remove("@graph")
                    .unwrap_or_else(|| ExpandedValue::Array(Vec::new()))
            }
            Some(other) => other,
            None => ExpandedValue::Array(Vec::new()),
        };

        Ok(ExpandedValue::Array(expanded.into_vec()))
    }

    /// Expands one element found under `active_property`. `Ok(None)` means the
    /// element expanded to nothing and must be dropped by the caller.
    pub fn expand_element<'a, L: DocumentLoader>(
        &'a self,
        processor: &'a Processor<L>,
        active_property: Option<&'a str>,
        element: &'a Value,
        base_url: Option<&'a str>,
        from_map: bool,
        depth: usize,
    ) -> BoxFuture<'a, Result<Option<ExpandedValue>>> {
        Box::pin(async move {
            if depth > processor.max_depth {
                return Err(JsonLdError::DepthLimitExceeded(processor.max_depth));
            }

            // 3
            let property_scoped = active_property.and_then(|prop| scoped_context(self, prop));

            match element {
                // 1
                Value::Null => Ok(None),

                // 5
                Value::Array(items) => {
                    let container = self.container_of(active_property);
                    let mut result = Vec::new();

                    for item in items {
                        let expanded = self
                            .expand_element(processor, active_property, item, base_url, from_map, depth + 1)
                            .await?;
                        let expanded = match expanded {
                            Some(expanded) => expanded,
                            None => continue,
                        };

                        if processor.is_json_ld_10()
                            && (active_property == Some("@list") || container.contains(Keyword::List))
                            && (matches!(expanded, ExpandedValue::Array(_)) || expanded.is_list_object())
                        {
                            return Err(JsonLdError::ListOfLists);
                        }

                        match expanded {
                            ExpandedValue::Array(inner) if container.contains(Keyword::List) => {
                                result.push(single("@list", ExpandedValue::Array(inner)))
                            }
                            ExpandedValue::Array(inner) => result.extend(inner),
                            other => result.push(other),
                        }
                    }

                    Ok(Some(ExpandedValue::Array(result)))
                }

                // 6
                Value::Object(map) => {
                    self.expand_object(
                        processor,
                        active_property,
                        property_scoped,
                        map,
                        base_url,
                        from_map,
                        depth,
                    )
                    .await
                }

                // 4
                scalar => {
                    let property = match active_property {
                        None | Some("@graph") => return Ok(None),
                        Some(property) => property,
                    };

                    match property_scoped {
                        Some((scoped, scoped_base)) => {
                            let active = self
                                .process_with(
                                    processor,
                                    scoped,
                                    scoped_base,
                                    ProcessOptions {
                                        override_protected: true,
                                        ..ProcessOptions::default()
                                    },
                                )
                                .await?;
                            Ok(Some(active.expand_value(property, scalar)))
                        }
                        None => Ok(Some(self.expand_value(property, scalar))),
                    }
                }
            }
        })
    }

    #[allow(clippy::too_many_arguments)]
    async fn expand_object<L: DocumentLoader>(
        &self,
        processor: &Processor<L>,
        active_property: Option<&str>,
        property_scoped: Option<(&Value, Option<&str>)>,
        element: &Map<String, Value>,
        base_url: Option<&str>,
        from_map: bool,
        depth: usize,
    ) -> Result<Option<ExpandedValue>> {
        let mut active = Cow::Borrowed(self);

        // 7
        if let Some(previous) = self.previous_context() {
            let expands_to = |key: &str, keyword: Keyword| self.expand_iri(key, false, true).is_keyword(keyword);
            let keeps_scope = from_map
                || element.keys().any(|key| expands_to(key.as_str(), Keyword::Value))
                || (element.len() == 1
                    && element.keys().all(|key| expands_to(key.as_str(), Keyword::Id)));

            if !keeps_scope {
                active = Cow::Borrowed(previous);
            }
        }

        // 8
        if let Some((scoped, scoped_base)) = property_scoped {
            let next = active
                .process_with(
                    processor,
                    scoped,
                    scoped_base,
                    ProcessOptions {
                        override_protected: true,
                        ..ProcessOptions::default()
                    },
                )
                .await?;
            active = Cow::Owned(next);
        }

        // 9
        if let Some(local) = element.get("@context") {
            let next = active.process(processor, local, base_url).await?;
            active = Cow::Owned(next);
        }

        // 10, 11
        let type_scoped = active.clone();
        let mut type_keys: Vec<&str> = element
            .keys()
            .map(String::as_str)
            .filter(|key| active.expand_iri(key, false, true).is_keyword(Keyword::Type))
            .collect();
        type_keys.sort_unstable();

        for key in &type_keys {
            let mut types: Vec<&str> = match &element[*key] {
                Value::String(typ) => vec![typ.as_str()],
                Value::Array(types) => types.iter().filter_map(Value::as_str).collect(),
                _ => Vec::new(),
            };
            types.sort_unstable();

            for typ in types {
                if let Some((scoped, scoped_base)) = scoped_context(&type_scoped, typ) {
                    let next = active
                        .process_with(
                            processor,
                            scoped,
                            scoped_base,
                            ProcessOptions {
                                propagate: false,
                                ..ProcessOptions::default()
                            },
                        )
                        .await?;
                    active = Cow::Owned(next);
                }
            }
        }

        // 12
        let json_input = type_keys
            .first()
            .and_then(|key| match &element[*key] {
                Value::String(typ) => Some(typ.as_str()),
                Value::Array(types) => types.last().and_then(Value::as_str),
                _ => None,
            })
            .map_or(false, |typ| active.expand_iri(typ, false, true).is_keyword(Keyword::Json));

        let mut result = Object::new();
        let expansion = ObjectExpansion {
            active: &active,
            type_scoped: &type_scoped,
            processor,
            active_property,
            json_input,
            base_url,
            depth,
        };
        expansion.expand_entries(element, &mut result).await?;

        finish_object(result, active_property)
    }
}

/// Legalizes the entries gathered for one JSON object.
fn finish_object(mut result: Object, active_property: Option<&str>) -> Result<Option<ExpandedValue>> {
    if let Some(value) = result.get("@value") {
        // 15
        if result.keys().any(|key| !VALUE_OBJECT_KEYS.contains(&key.as_str()))
            || (result.contains_key("@type")
                && (result.contains_key("@language") || result.contains_key("@direction")))
        {
            return Err(JsonLdError::InvalidValueObject);
        }

        let is_json = result.get("@type").and_then(ExpandedValue::as_str) == Some("@json");
        if !is_json {
            if value.is_null() || value.as_array().map_or(false, |items| items.is_empty()) {
                return Ok(None);
            }

            if value.as_str().is_none() && result.contains_key("@language") {
                return Err(JsonLdError::InvalidLanguageTaggedValue);
            }

            if let Some(typ) = result.get("@type") {
                match typ.as_str() {
                    Some(typ) if is_absolute_iri(typ) => {}
                    _ => return Err(JsonLdError::InvalidTypedValue),
                }
            }
        }
    } else if let Some(typ) = result.get_mut("@type") {
        // 16
        if !matches!(typ, ExpandedValue::Array(_)) {
            let lone = std::mem::replace(typ, ExpandedValue::Array(Vec::new()));
            *typ = ExpandedValue::Array(vec![lone]);
        }
    } else if result.contains_key("@set") || result.contains_key("@list") {
        // 17
        if result.len() > 2 || (result.len() == 2 && !result.contains_key("@index")) {
            return Err(JsonLdError::InvalidSetOrListObject);
        }

        if let Some(set) = result.remove("@set") {
            return Ok(Some(set));
        }
    }

    // 18
    if result.len() == 1 && result.contains_key("@language") {
        return Ok(None);
    }

    // 19
    if matches!(active_property, None | Some("@graph")) {
        if result.is_empty() || result.contains_key("@value") || result.contains_key("@list") {
            return Ok(None);
        }

        if result.len() == 1 && result.contains_key("@id") {
            return Ok(None);
        }
    }

    Ok(Some(ExpandedValue::Object(result)))
}

/// State shared by every entry of one JSON object, including the entries of
/// its `@nest` blocks.
struct ObjectExpansion<'a, L> {
    active: &'a Context,
    type_scoped: &'a Context,
    processor: &'a Processor<L>,
    active_property: Option<&'a str>,
    json_input: bool,
    base_url: Option<&'a str>,
    depth: usize,
}

impl<'a, L: DocumentLoader> ObjectExpansion<'a, L> {
    async fn recurse(
        &self,
        context: &Context,
        active_property: Option<&str>,
        value: &Value,
        from_map: bool,
    ) -> Result<Option<ExpandedValue>> {
        context
            .expand_element(
                self.processor,
                active_property,
                value,
                self.base_url,
                from_map,
                self.depth + 1,
            )
            .await
    }

    fn expand_entries<'s>(
        &'s self,
        element: &'s Map<String, Value>,
        result: &'s mut Object,
    ) -> BoxFuture<'s, Result<()>> {
        Box::pin(async move {
            let active = self.active;
            let mut nests = Vec::new();

            let mut keys: Vec<&str> = element.keys().map(String::as_str).collect();
            keys.sort_unstable();

            for key in keys {
                let value = &element[key];

                // 13.1
                if key == "@context" {
                    continue;
                }

                // 13.2, 13.3
                let property = match active.expand_iri(key, false, true) {
                    ExpandedIri::Keyword(Keyword::Nest) => {
                        nests.push(key);
                        continue;
                    }
                    ExpandedIri::Keyword(keyword) => {
                        self.expand_keyword(keyword, value, result).await?;
                        continue;
                    }
                    ExpandedIri::Iri(iri) if iri.contains(':') => iri,
                    ExpandedIri::BlankNode(id) => id,
                    _ => continue,
                };

                let definition = active.term(key);
                let container = active.container_of(Some(key));

                let expanded = match value {
                    // 13.6
                    _ if definition.map_or(false, |def| def.has_type_mapping(Keyword::Json)) => {
                        let mut literal = Object::new();
                        literal.insert("@value".to_owned(), ExpandedValue::ScalarPrimitive(value.clone()));
                        literal.insert("@type".to_owned(), "@json".into());
                        Some(ExpandedValue::Object(literal))
                    }

                    // 13.7
                    Value::Object(map) if container.contains(Keyword::Language) => {
                        Some(self.expand_language_map(key, map)?)
                    }

                    // 13.8
                    Value::Object(map)
                        if container.contains(Keyword::Index)
                            || container.contains(Keyword::Type)
                            || container.contains(Keyword::Id) =>
                    {
                        Some(self.expand_index_map(key, container, map).await?)
                    }

                    // 13.9
                    _ => self.recurse(active, Some(key), value, false).await?,
                };

                // 13.10
                let mut expanded = match expanded {
                    Some(expanded) => expanded,
                    None => continue,
                };

                // 13.11
                if container.contains(Keyword::List) && !expanded.is_list_object() {
                    expanded = single("@list", ExpandedValue::Array(expanded.into_vec()));
                }

                // 13.12
                if container.contains(Keyword::Graph)
                    && !container.contains(Keyword::Id)
                    && !container.contains(Keyword::Index)
                {
                    expanded = ExpandedValue::Array(
                        expanded
                            .into_vec()
                            .into_iter()
                            .map(|ev| single("@graph", ExpandedValue::Array(ev.into_vec())))
                            .collect(),
                    );
                }

                // 13.13
                if definition.map_or(false, |def| def.reverse_property) {
                    let reverse = reverse_bucket(result);
                    for item in expanded.into_vec() {
                        if item.is_value_object() || item.is_list_object() {
                            return Err(JsonLdError::InvalidReversePropertyValue);
                        }
                        add_value(reverse, &property, item);
                    }
                } else {
                    add_value(result, &property, expanded);
                }
            }

            // 14
            for nest in nests {
                let nested_values: Vec<&Value> = match &element[nest] {
                    Value::Array(items) => items.iter().collect(),
                    other => vec![other],
                };

                for nested in nested_values {
                    let nested = match nested {
                        Value::Object(nested)
                            if !nested.keys().any(|k| {
                                active.expand_iri(k, false, true).is_keyword(Keyword::Value)
                            }) =>
                        {
                            nested
                        }
                        _ => return Err(JsonLdError::InvalidNestValue),
                    };

                    self.expand_entries(nested, &mut *result).await?;
                }
            }

            Ok(())
        })
    }

    async fn expand_keyword(&self, keyword: Keyword, value: &Value, result: &mut Object) -> Result<()> {
        let active = self.active;
        let json_ld_10 = self.processor.is_json_ld_10();

        // 13.4.1
        if self.active_property == Some("@reverse") {
            return Err(JsonLdError::InvalidReversePropertyMap);
        }

        // 13.4.2
        if result.contains_key(keyword.as_str())
            && (json_ld_10 || !matches!(keyword, Keyword::Included | Keyword::Type))
        {
            return Err(JsonLdError::CollidingKeywords(keyword.as_str().to_owned()));
        }

        let expanded = match keyword {
            Keyword::Id => match value {
                Value::String(id) => match active.expand_iri(id, true, false) {
                    ExpandedIri::Nil => return Ok(()),
                    iri => iri_value(iri),
                },
                _ => return Err(JsonLdError::InvalidIdValue),
            },

            Keyword::Type => {
                let expand_type = |typ: &str| self.type_scoped.expand_iri(typ, true, true);
                let expanded = match value {
                    Value::String(typ) => match expand_type(typ) {
                        ExpandedIri::Nil => return Ok(()),
                        iri => iri_value(iri),
                    },
                    Value::Array(types) => {
                        let mut expanded = Vec::with_capacity(types.len());
                        for typ in types {
                            let typ = typ.as_str().ok_or(JsonLdError::InvalidTypeValue)?;
                            match expand_type(typ) {
                                ExpandedIri::Nil => {}
                                iri => expanded.push(iri_value(iri)),
                            }
                        }
                        ExpandedValue::Array(expanded)
                    }
                    _ => return Err(JsonLdError::InvalidTypeValue),
                };

                match result.remove("@type") {
                    Some(existing) => {
                        let mut types = existing.into_vec();
                        types.extend(expanded.into_vec());
                        ExpandedValue::Array(types)
                    }
                    None => expanded,
                }
            }

            Keyword::Graph => ExpandedValue::Array(
                self.recurse(active, Some("@graph"), value, false)
                    .await?
                    .map(ExpandedValue::into_vec)
                    .unwrap_or_default(),
            ),

            Keyword::Included => {
                if json_ld_10 {
                    return Err(JsonLdError::InvalidIncludedValue);
                }

                let included = self
                    .recurse(active, self.active_property, value, false)
                    .await?
                    .map(ExpandedValue::into_vec)
                    .unwrap_or_default();

                if !included.iter().all(is_node_object) {
                    return Err(JsonLdError::InvalidIncludedValue);
                }

                let mut items = result
                    .remove("@included")
                    .map(ExpandedValue::into_vec)
                    .unwrap_or_default();
                items.extend(included);
                ExpandedValue::Array(items)
            }

            Keyword::Value => {
                if self.json_input {
                    if json_ld_10 {
                        return Err(JsonLdError::InvalidValueObjectValue);
                    }
                    ExpandedValue::ScalarPrimitive(value.clone())
                } else {
                    match value {
                        Value::Object(_) | Value::Array(_) => {
                            return Err(JsonLdError::InvalidValueObjectValue)
                        }
                        scalar => ExpandedValue::ScalarPrimitive(scalar.clone()),
                    }
                }
            }

            Keyword::Language => match value {
                Value::String(language) => {
                    if !is_well_formed_language(language) {
                        tracing::warn!(language = %language, "malformed language tag");
                    }
                    language.to_lowercase().into()
                }
                _ => return Err(JsonLdError::InvalidLanguageTaggedString),
            },

            Keyword::Direction => {
                if json_ld_10 {
                    return Ok(());
                }

                match value.as_str().and_then(Direction::parse) {
                    Some(direction) => direction.as_str().into(),
                    None => return Err(JsonLdError::InvalidBaseDirection),
                }
            }

            Keyword::Index => match value {
                Value::String(index) => index.as_str().into(),
                _ => return Err(JsonLdError::InvalidIndexValue),
            },

            Keyword::List => {
                if matches!(self.active_property, None | Some("@graph")) {
                    return Ok(());
                }

                let items = self
                    .recurse(active, self.active_property, value, false)
                    .await?
                    .map(ExpandedValue::into_vec)
                    .unwrap_or_default();

                if json_ld_10 && items.iter().any(ExpandedValue::is_list_object) {
                    return Err(JsonLdError::ListOfLists);
                }

                ExpandedValue::Array(items)
            }

            Keyword::Set => match self.recurse(active, self.active_property, value, false).await? {
                Some(expanded) => expanded,
                None => return Ok(()),
            },

            Keyword::Reverse => {
                if !value.is_object() {
                    return Err(JsonLdError::InvalidReverseValue);
                }

                let mut expanded = match self.recurse(active, Some("@reverse"), value, false).await? {
                    Some(ExpandedValue::Object(expanded)) => expanded,
                    _ => return Ok(()),
                };

                if let Some(ExpandedValue::Object(reversed)) = expanded.remove("@reverse") {
                    for (property, item) in reversed {
                        add_value(result, &property, item);
                    }
                }

                if !expanded.is_empty() {
                    let reverse = reverse_bucket(result);
                    for (property, items) in expanded {
                        for item in items.into_vec() {
                            if item.is_value_object() || item.is_list_object() {
                                return Err(JsonLdError::InvalidReversePropertyValue);
                            }
                            add_value(reverse, &property, item);
                        }
                    }
                }

                return Ok(());
            }

            _ => return Ok(()),
        };

        result.insert(keyword.as_str().to_owned(), expanded);
        Ok(())
    }

    fn expand_language_map(&self, key: &str, map: &Map<String, Value>) -> Result<ExpandedValue> {
        let active = self.active;
        let direction = match active.term(key).and_then(|def| def.direction_mapping) {
            Some(mapped) => mapped,
            None => active.default_direction(),
        };

        let mut languages: Vec<&String> = map.keys().collect();
        languages.sort_unstable();

        let mut items = Vec::new();
        for language in languages {
            let values: Vec<&Value> = match &map[language.as_str()] {
                Value::Array(values) => values.iter().collect(),
                other => vec![other],
            };

            for item in values {
                match item {
                    Value::Null => continue,
                    Value::String(_) => {}
                    _ => return Err(JsonLdError::InvalidLanguageMapValue),
                }

                let mut value = Object::new();
                value.insert("@value".to_owned(), ExpandedValue::ScalarPrimitive(item.clone()));

                if language != "@none" && !active.expand_iri(language, false, true).is_keyword(Keyword::None) {
                    if !is_well_formed_language(language) {
                        tracing::warn!(language = %language, "malformed language map key");
                    }
                    value.insert("@language".to_owned(), language.to_lowercase().into());
                }

                if let Some(direction) = direction {
                    value.insert("@direction".to_owned(), direction.as_str().into());
                }

                items.push(ExpandedValue::Object(value));
            }
        }

        Ok(ExpandedValue::Array(items))
    }

    /// Index, id and type maps.
    async fn expand_index_map(
        &self,
        key: &str,
        container: Container,
        map: &Map<String, Value>,
    ) -> Result<ExpandedValue> {
        let active = self.active;
        let index_key = active
            .term(key)
            .and_then(|def| def.index_mapping.as_deref())
            .unwrap_or("@index");

        let mut indexes: Vec<&String> = map.keys().collect();
        indexes.sort_unstable();

        let mut items = Vec::new();
        for index in indexes {
            // Id and type maps are expanded without any type-scoped terms.
            let map_context = if container.contains(Keyword::Id) || container.contains(Keyword::Type) {
                let outer = active.previous_context().unwrap_or(active);
                match scoped_context(outer, index).filter(|_| container.contains(Keyword::Type)) {
                    Some((scoped, scoped_base)) => Cow::Owned(
                        outer
                            .process(self.processor, scoped, scoped_base)
                            .await?,
                    ),
                    None => Cow::Borrowed(outer),
                }
            } else {
                Cow::Borrowed(active)
            };

            let expanded_index = active.expand_iri(index, false, true);
            let is_none = expanded_index.is_keyword(Keyword::None);

            let expanded = self
                .recurse(&map_context, Some(key), &map[index.as_str()], true)
                .await?
                .map(ExpandedValue::into_vec)
                .unwrap_or_default();

            for mut item in expanded {
                if container.contains(Keyword::Graph) && !item.is_graph_object() {
                    item = single("@graph", ExpandedValue::Array(item.into_vec()));
                }

                if let ExpandedValue::Object(obj) = &mut item {
                    if container.contains(Keyword::Index) && index_key != "@index" && !is_none {
                        if obj.contains_key("@value") {
                            return Err(JsonLdError::InvalidValueObject);
                        }

                        let re_expanded = active.expand_value(index_key, &Value::String(index.clone()));
                        if let Some(property) = active.expand_iri(index_key, false, true).as_str() {
                            let mut values = vec![re_expanded];
                            values.extend(
                                obj.remove(property)
                                    .map(ExpandedValue::into_vec)
                                    .unwrap_or_default(),
                            );
                            obj.insert(property.to_owned(), ExpandedValue::Array(values));
                        }
                    } else if container.contains(Keyword::Index) && !obj.contains_key("@index") && !is_none {
                        obj.insert("@index".to_owned(), index.as_str().into());
                    } else if container.contains(Keyword::Id) && !obj.contains_key("@id") && !is_none {
                        obj.insert("@id".to_owned(), iri_value(active.expand_iri(index, true, false)));
                    } else if container.contains(Keyword::Type) && !is_none {
                        let mut types = vec![iri_value(expanded_index.clone())];
                        types.extend(
                            obj.remove("@type")
                                .map(ExpandedValue::into_vec)
                                .unwrap_or_default(),
                        );
                        obj.insert("@type".to_owned(), ExpandedValue::Array(types));
                    }
                }

                items.push(item);
            }
        }

        Ok(ExpandedValue::Array(items))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::{ProcessingMode, TermDefinition};
    use crate::loader::NoLoader;
    use serde_json::json;
    use std::sync::Arc;

    fn vocab_context() -> Context {
        let mut ctx = Context::default();
        ctx.vocabulary_mapping = Some(ExpandedIri::Iri("http://example.org/".to_owned()));
        ctx
    }

    #[test]
    fn value_expansion_uses_type_mapping() {
        let mut ctx = vocab_context();
        let mut link = TermDefinition::new(ExpandedIri::Iri("http://example.org/link".to_owned()));
        link.type_mapping = Some(ExpandedIri::Keyword(Keyword::Id));
        ctx.set_term("link", Arc::new(link));

        let mut date = TermDefinition::new(ExpandedIri::Iri("http://example.org/date".to_owned()));
        date.type_mapping = Some(ExpandedIri::Iri("http://www.w3.org/2001/XMLSchema#date".to_owned()));
        ctx.set_term("date", Arc::new(date));
        ctx.default_language = Some("en".to_owned());

        assert_eq!(
            Value::from(ctx.expand_value("link", &json!("other"))),
            json!({"@id": "http://example.org/other"})
        );
        assert_eq!(
            Value::from(ctx.expand_value("date", &json!("2020-01-01"))),
            json!({"@value": "2020-01-01", "@type": "http://www.w3.org/2001/XMLSchema#date"})
        );
        assert_eq!(
            Value::from(ctx.expand_value("name", &json!("Alice"))),
            json!({"@value": "Alice", "@language": "en"})
        );
        assert_eq!(
            Value::from(ctx.expand_value("name", &json!(5))),
            json!({"@value": 5})
        );
    }

    #[test]
    fn explicit_null_language_suppresses_the_default() {
        let mut ctx = vocab_context();
        ctx.default_language = Some("en".to_owned());
        let mut plain = TermDefinition::new(ExpandedIri::Iri("http://example.org/code".to_owned()));
        plain.language_mapping = Some(None);
        ctx.set_term("code", Arc::new(plain));

        assert_eq!(
            Value::from(ctx.expand_value("code", &json!("x1"))),
            json!({"@value": "x1"})
        );
    }

    #[async_std::test]
    async fn depth_limit_is_enforced() {
        let processor = Processor::new(NoLoader, ProcessingMode::JsonLd11).with_max_depth(3);
        let doc = json!({"http://a/": {"http://a/": {"http://a/": {"http://a/": "deep"}}}});

        let err = vocab_context().expand(&processor, &doc, None).await.unwrap_err();
        assert!(matches!(err, JsonLdError::DepthLimitExceeded(3)));
    }

    #[async_std::test]
    async fn json_literals_stay_opaque() {
        let processor = Processor::new(NoLoader, ProcessingMode::JsonLd11);
        let mut ctx = vocab_context();
        let mut data = TermDefinition::new(ExpandedIri::Iri("http://example.org/data".to_owned()));
        data.type_mapping = Some(ExpandedIri::Keyword(Keyword::Json));
        ctx.set_term("data", Arc::new(data));

        let doc = json!({
            "data": {"a": [1, 2]},
            "http://example.org/raw": {"@value": [true, null], "@type": "@json"}
        });
        let expanded = ctx.expand(&processor, &doc, None).await.unwrap();
        let node = expanded.as_array().unwrap()[0].as_object().unwrap();

        for (property, payload) in [
            ("http://example.org/data", json!({"a": [1, 2]})),
            ("http://example.org/raw", json!([true, null])),
        ] {
            let literal = node[property].as_array().unwrap()[0].as_object().unwrap();
            assert!(
                matches!(&literal["@value"], ExpandedValue::ScalarPrimitive(value) if *value == payload),
                "{} was not kept as a single JSON value",
                property
            );
        }
    }

    #[async_std::test]
    async fn lone_graph_is_unwrapped() {
        let processor = Processor::new(NoLoader, ProcessingMode::JsonLd11);
        let doc = json!({"@graph": [{"@id": "http://a/", "http://p/": "v"}]});

        let expanded = Context::default().expand(&processor, &doc, None).await.unwrap();
        assert_eq!(
            Value::from(expanded),
            json!([{"@id": "http://a/", "http://p/": [{"@value": "v"}]}])
        );
    }
}
