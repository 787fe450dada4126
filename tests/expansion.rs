use jsonld_expand::{expand, JsonLdError, JsonLdOptions, NoLoader, ProcessingMode, StaticLoader};
use pretty_assertions::assert_eq;
use serde_json::{json, Value};

async fn expand_doc(doc: Value) -> Value {
    let expanded = expand(&doc, &JsonLdOptions::default(), NoLoader)
        .await
        .expect("expansion failed");
    Value::from(expanded)
}

async fn expand_err(doc: Value, options: &JsonLdOptions) -> JsonLdError {
    expand(&doc, options, NoLoader)
        .await
        .expect_err("expansion should have failed")
}

fn json_ld_10() -> JsonLdOptions {
    JsonLdOptions {
        processing_mode: ProcessingMode::JsonLd10,
        ..JsonLdOptions::default()
    }
}

#[async_std::test]
async fn vocabulary_mapping_expands_plain_terms() {
    let doc = json!({
        "@context": {"@vocab": "http://example.org/"},
        "name": "Alice"
    });

    assert_eq!(
        expand_doc(doc).await,
        json!([{"http://example.org/name": [{"@value": "Alice"}]}])
    );
}

#[async_std::test]
async fn compact_iris_expand_through_prefixes() {
    let doc = json!({
        "@context": {"ex": "http://example.org/"},
        "@id": "ex:subject",
        "ex:knows": {"@id": "ex:other"}
    });

    assert_eq!(
        expand_doc(doc).await,
        json!([{
            "@id": "http://example.org/subject",
            "http://example.org/knows": [{"@id": "http://example.org/other"}]
        }])
    );
}

#[async_std::test]
async fn undefined_terms_are_dropped() {
    let doc = json!({"name": "Alice", "http://example.org/p": "kept"});
    assert_eq!(
        expand_doc(doc).await,
        json!([{"http://example.org/p": [{"@value": "kept"}]}])
    );

    assert_eq!(expand_doc(json!({"name": "Alice"})).await, json!([]));
}

#[async_std::test]
async fn list_container_wraps_once() {
    let context = json!({"list": {"@id": "http://example.org/list", "@container": "@list"}});
    let expected = json!([{
        "http://example.org/list": [{"@list": [{"@value": 1}, {"@value": 2}]}]
    }]);

    let bare = json!({"@context": context.clone(), "list": [1, 2]});
    assert_eq!(expand_doc(bare).await, expected);

    let explicit = json!({"@context": context, "list": {"@list": [1, 2]}});
    assert_eq!(expand_doc(explicit).await, expected);
}

#[async_std::test]
async fn nested_arrays_in_list_containers_become_lists_of_lists() {
    let doc = json!({
        "@context": {"l": {"@id": "http://example.org/l", "@container": "@list"}},
        "l": [[1]]
    });

    assert_eq!(
        expand_doc(doc.clone()).await,
        json!([{"http://example.org/l": [{"@list": [{"@list": [{"@value": 1}]}]}]}])
    );

    let err = expand_err(doc, &json_ld_10()).await;
    assert_eq!(err.code(), "list of lists");
}

#[async_std::test]
async fn default_language_applies_to_untyped_strings_only() {
    let doc = json!({
        "@context": {
            "@language": "en",
            "name": "http://example.org/name",
            "date": {
                "@id": "http://example.org/date",
                "@type": "http://www.w3.org/2001/XMLSchema#date"
            }
        },
        "name": "Alice",
        "date": "2020-01-01"
    });

    assert_eq!(
        expand_doc(doc).await,
        json!([{
            "http://example.org/date": [{
                "@type": "http://www.w3.org/2001/XMLSchema#date",
                "@value": "2020-01-01"
            }],
            "http://example.org/name": [{"@language": "en", "@value": "Alice"}]
        }])
    );
}

#[async_std::test]
async fn expansion_is_idempotent() {
    let doc = json!({
        "@context": {
            "ex": "http://example.org/",
            "@language": "en",
            "tags": {"@id": "ex:tags", "@container": "@list"}
        },
        "@id": "ex:subject",
        "@type": "ex:Thing",
        "ex:knows": {"@id": "ex:other"},
        "ex:label": "hello",
        "tags": ["a", "b"]
    });

    let once = expand_doc(doc).await;
    let twice = expand_doc(once.clone()).await;
    assert_eq!(once, twice);
}

#[async_std::test]
async fn nest_blocks_merge_into_their_node() {
    let doc = json!({
        "@context": {"@vocab": "http://example.org/", "details": "@nest"},
        "@id": "http://example.org/x",
        "details": {"age": 5, "details": {"height": 180}}
    });

    assert_eq!(
        expand_doc(doc).await,
        json!([{
            "@id": "http://example.org/x",
            "http://example.org/age": [{"@value": 5}],
            "http://example.org/height": [{"@value": 180}]
        }])
    );
}

#[async_std::test]
async fn nest_values_must_be_maps() {
    let doc = json!({
        "@context": {"@vocab": "http://example.org/", "details": "@nest"},
        "details": "flat"
    });

    let err = expand_err(doc, &JsonLdOptions::default()).await;
    assert_eq!(err.code(), "invalid @nest value");
}

#[async_std::test]
async fn included_blocks_hold_node_objects() {
    let doc = json!({
        "@context": {"@vocab": "http://example.org/"},
        "@id": "http://example.org/x",
        "@included": [{"@id": "http://example.org/y", "name": "Y"}]
    });

    assert_eq!(
        expand_doc(doc.clone()).await,
        json!([{
            "@id": "http://example.org/x",
            "@included": [{
                "@id": "http://example.org/y",
                "http://example.org/name": [{"@value": "Y"}]
            }]
        }])
    );

    let err = expand_err(doc, &json_ld_10()).await;
    assert_eq!(err.code(), "invalid @included value");
}

#[async_std::test]
async fn language_maps() {
    let doc = json!({
        "@context": {"label": {"@id": "http://example.org/label", "@container": "@language"}},
        "label": {"en": "Hi", "DE": ["Hallo"], "@none": "x"}
    });

    assert_eq!(
        expand_doc(doc).await,
        json!([{
            "http://example.org/label": [
                {"@value": "x"},
                {"@value": "Hallo", "@language": "de"},
                {"@value": "Hi", "@language": "en"}
            ]
        }])
    );
}

#[async_std::test]
async fn index_maps_inject_their_keys() {
    let doc = json!({
        "@context": {
            "@vocab": "http://example.org/",
            "post": {"@id": "http://example.org/post", "@container": "@index"}
        },
        "post": {"one": {"title": "First"}, "two": "plain"}
    });

    assert_eq!(
        expand_doc(doc).await,
        json!([{
            "http://example.org/post": [
                {"@index": "one", "http://example.org/title": [{"@value": "First"}]},
                {"@index": "two", "@value": "plain"}
            ]
        }])
    );
}

#[async_std::test]
async fn id_and_type_maps() {
    let doc = json!({
        "@context": {
            "@vocab": "http://example.org/",
            "people": {"@id": "http://example.org/people", "@container": "@id"},
            "byType": {"@id": "http://example.org/byType", "@container": "@type"}
        },
        "people": {"http://example.org/alice": {"name": "Alice"}},
        "byType": {"Person": {"name": "Bob"}}
    });

    assert_eq!(
        expand_doc(doc).await,
        json!([{
            "http://example.org/byType": [{
                "@type": ["http://example.org/Person"],
                "http://example.org/name": [{"@value": "Bob"}]
            }],
            "http://example.org/people": [{
                "@id": "http://example.org/alice",
                "http://example.org/name": [{"@value": "Alice"}]
            }]
        }])
    );
}

#[async_std::test]
async fn graph_containers_wrap_values() {
    let doc = json!({
        "@context": {"input": {"@id": "http://example.org/input", "@container": "@graph"}},
        "input": {"@id": "http://example.org/x", "http://example.org/p": "v"}
    });

    assert_eq!(
        expand_doc(doc).await,
        json!([{
            "http://example.org/input": [{
                "@graph": [{
                    "@id": "http://example.org/x",
                    "http://example.org/p": [{"@value": "v"}]
                }]
            }]
        }])
    );
}

#[async_std::test]
async fn reverse_properties_collect_under_reverse() {
    let doc = json!({
        "@context": {
            "@vocab": "http://example.org/",
            "children": {"@reverse": "http://example.org/parent"}
        },
        "@id": "http://example.org/p",
        "children": {"@id": "http://example.org/c"}
    });

    assert_eq!(
        expand_doc(doc).await,
        json!([{
            "@id": "http://example.org/p",
            "@reverse": {"http://example.org/parent": [{"@id": "http://example.org/c"}]}
        }])
    );
}

#[async_std::test]
async fn json_literals_are_kept_verbatim() {
    let doc = json!({
        "@context": {"data": {"@id": "http://example.org/data", "@type": "@json"}},
        "data": {"b": [1, {"c": true}]}
    });

    assert_eq!(
        expand_doc(doc).await,
        json!([{
            "http://example.org/data": [{"@value": {"b": [1, {"c": true}]}, "@type": "@json"}]
        }])
    );
}

#[async_std::test]
async fn property_scoped_contexts_apply_to_values() {
    let doc = json!({
        "@context": {
            "@vocab": "http://example.org/",
            "knows": {"@id": "http://example.org/knows", "@context": {"@vocab": "http://other.org/"}}
        },
        "knows": {"name": "inner"},
        "name": "outer"
    });

    assert_eq!(
        expand_doc(doc).await,
        json!([{
            "http://example.org/knows": [{"http://other.org/name": [{"@value": "inner"}]}],
            "http://example.org/name": [{"@value": "outer"}]
        }])
    );
}

#[async_std::test]
async fn type_scoped_contexts_do_not_propagate() {
    let doc = json!({
        "@context": {
            "@vocab": "http://example.org/",
            "Person": {"@id": "http://example.org/Person", "@context": {"@vocab": "http://person.org/"}}
        },
        "@type": "Person",
        "name": "outer",
        "knows": {"name": "inner"}
    });

    assert_eq!(
        expand_doc(doc).await,
        json!([{
            "@type": ["http://example.org/Person"],
            "http://person.org/name": [{"@value": "outer"}],
            "http://person.org/knows": [{"http://example.org/name": [{"@value": "inner"}]}]
        }])
    );
}

#[async_std::test]
async fn remote_contexts_come_from_the_loader() {
    let loader = StaticLoader::new().with_document(
        "http://example.org/ctx.jsonld",
        json!({"@context": {"name": "http://schema.org/name"}}),
    );
    let doc = json!({"@context": "http://example.org/ctx.jsonld", "name": "x"});

    let expanded = expand(&doc, &JsonLdOptions::default(), loader).await.unwrap();
    assert_eq!(
        Value::from(expanded),
        json!([{"http://schema.org/name": [{"@value": "x"}]}])
    );
}

#[async_std::test]
async fn remote_documents_set_the_base() {
    let loader = StaticLoader::new().with_document(
        "http://example.org/doc.jsonld",
        json!({"@id": "relative", "http://example.org/p": {"@id": "other"}}),
    );

    let input = json!("http://example.org/doc.jsonld");
    let expanded = expand(&input, &JsonLdOptions::default(), loader).await.unwrap();
    assert_eq!(
        Value::from(expanded),
        json!([{
            "@id": "http://example.org/relative",
            "http://example.org/p": [{"@id": "http://example.org/other"}]
        }])
    );
}

#[async_std::test]
async fn expand_context_option_is_applied_first() {
    let options = JsonLdOptions {
        expand_context: Some(json!({"@context": {"@vocab": "http://example.org/"}})),
        ..JsonLdOptions::default()
    };

    let expanded = expand(&json!({"name": "x"}), &options, NoLoader).await.unwrap();
    assert_eq!(
        Value::from(expanded),
        json!([{"http://example.org/name": [{"@value": "x"}]}])
    );
}

#[test]
fn options_deserialize_from_manifest_form() {
    let options: JsonLdOptions = serde_json::from_value(json!({
        "base": "http://example.org/",
        "processingMode": "json-ld-1.0"
    }))
    .unwrap();

    assert_eq!(options.base.as_deref(), Some("http://example.org/"));
    assert_eq!(options.processing_mode, ProcessingMode::JsonLd10);
    assert_eq!(options.max_depth, jsonld_expand::DEFAULT_MAX_DEPTH);
}

#[async_std::test]
async fn shape_errors() {
    let options = JsonLdOptions::default();

    let cases = vec![
        (json!({"@id": 5}), "invalid @id value"),
        (json!({"@type": {"a": 1}}), "invalid type value"),
        (
            json!({"http://example.org/p": {"@value": "x", "@type": "http://t/", "@language": "en"}}),
            "invalid value object",
        ),
        (
            json!({"http://example.org/p": {"@value": 5, "@language": "en"}}),
            "invalid language-tagged value",
        ),
        (
            json!({"http://example.org/p": {"@value": "x", "@type": "relative"}}),
            "invalid typed value",
        ),
        (
            json!({"http://example.org/p": {"@value": ["x"]}}),
            "invalid value object value",
        ),
        (
            json!({"@context": {"id": "@id"}, "@id": "http://a/", "id": "http://b/"}),
            "colliding keywords",
        ),
        (
            json!({"http://example.org/p": {"@list": [], "http://example.org/q": 1}}),
            "invalid set or list object",
        ),
        (json!({"@reverse": "nope"}), "invalid @reverse value"),
        (json!({"http://example.org/p": {"@index": 1, "@value": "x"}}), "invalid @index value"),
    ];

    for (doc, code) in cases {
        let err = expand_err(doc.clone(), &options).await;
        assert_eq!(err.code(), code, "for {}", doc);
    }
}

#[async_std::test]
async fn null_values_drop_their_node() {
    let doc = json!({"http://example.org/p": {"@value": null, "@type": "http://t/"}});
    assert_eq!(expand_doc(doc).await, json!([]));
}

#[async_std::test]
async fn invalid_base_option_is_rejected() {
    let options = JsonLdOptions {
        base: Some("not a url".to_owned()),
        ..JsonLdOptions::default()
    };

    let err = expand_err(json!({}), &options).await;
    assert_eq!(err.code(), "invalid base IRI");
}

#[async_std::test]
async fn depth_ceiling_comes_from_options() {
    let options = JsonLdOptions {
        max_depth: 2,
        ..JsonLdOptions::default()
    };
    let doc = json!({"http://a/": {"http://a/": {"http://a/": {"http://a/": 1}}}});

    let err = expand_err(doc, &options).await;
    assert!(matches!(err, JsonLdError::DepthLimitExceeded(2)));
}

/// `levels` nested node objects around a single string value.
fn nested_document(levels: usize) -> Value {
    (0..levels).fold(json!("leaf"), |inner, _| json!({"http://a/p": inner}))
}

/// Runs a default expansion on a thread with a 2 MiB stack.
fn expand_on_small_stack(doc: Value) -> Result<Value, JsonLdError> {
    std::thread::Builder::new()
        .stack_size(2 * 1024 * 1024)
        .spawn(move || {
            async_std::task::block_on(expand(&doc, &JsonLdOptions::default(), NoLoader))
                .map(Value::from)
        })
        .unwrap()
        .join()
        .unwrap()
}

#[test]
fn default_depth_ceiling_fits_a_small_stack() {
    let deepest = expand_on_small_stack(nested_document(jsonld_expand::DEFAULT_MAX_DEPTH))
        .expect("expansion at the ceiling failed");
    assert_eq!(deepest.as_array().map(Vec::len), Some(1));

    let err = expand_on_small_stack(nested_document(jsonld_expand::DEFAULT_MAX_DEPTH + 1))
        .unwrap_err();
    assert!(matches!(
        err,
        JsonLdError::DepthLimitExceeded(limit) if limit == jsonld_expand::DEFAULT_MAX_DEPTH
    ));
}

#[async_std::test]
async fn self_referencing_scoped_remote_context() {
    let loader = StaticLoader::new().with_document(
        "http://a/c",
        json!({"@context": {
            "t": {"@id": "http://a/t", "@context": "http://a/c"},
            "v": "http://a/v"
        }}),
    );
    let doc = json!({"@context": "http://a/c", "t": {"t": {"v": "x"}}});

    let expanded = expand(&doc, &JsonLdOptions::default(), loader).await.unwrap();
    assert_eq!(
        Value::from(expanded),
        json!([{"http://a/t": [{"http://a/t": [{"http://a/v": [{"@value": "x"}]}]}]}])
    );
}
