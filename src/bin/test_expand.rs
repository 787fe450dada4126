//! Runs the W3C JSON-LD expansion test manifest against local copies of the
//! test files.
//!
//! Usage: `test_expand [directory containing expand-manifest.jsonld]`

use jsonld_expand::{
    expand, DocumentLoader, JsonLdOptions, LoadDocumentOptions, ProcessingMode, RemoteDocument,
};
use serde::Deserialize;
use serde_json::Value;
use std::error::Error;
use std::future::{ready, Ready};
use std::path::{Path, PathBuf};

#[derive(Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct TestOptions {
    base: Option<String>,
    expand_context: Option<String>,
    processing_mode: Option<ProcessingMode>,
    spec_version: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct TestEntry {
    #[serde(rename = "@id")]
    id: String,

    #[serde(rename = "@type")]
    types: Vec<String>,

    name: String,
    purpose: Option<String>,
    input: String,
    expect: Option<String>,
    expect_error_code: Option<String>,

    #[serde(default)]
    option: TestOptions,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct Manifest {
    base_iri: String,
    sequence: Vec<TestEntry>,
}

#[derive(Debug, thiserror::Error)]
enum SuiteError {
    #[error("{0} is not part of the test suite")]
    Outside(String),

    #[error("reading {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("parsing {path:?}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

fn read_json(path: &Path) -> Result<Value, SuiteError> {
    let text = std::fs::read_to_string(path).map_err(|source| SuiteError::Io {
        path: path.to_owned(),
        source,
    })?;

    serde_json::from_str(&text).map_err(|source| SuiteError::Json {
        path: path.to_owned(),
        source,
    })
}

/// Maps URLs below the manifest's base IRI onto the local test directory.
#[derive(Clone, Debug)]
struct SuiteLoader {
    base_iri: String,
    dir: PathBuf,
}

impl DocumentLoader for SuiteLoader {
    type Error = SuiteError;
    type Future = Ready<Result<RemoteDocument, SuiteError>>;

    fn load_document(&self, url: &str, _options: &LoadDocumentOptions) -> Self::Future {
        let loaded = match url.strip_prefix(&self.base_iri) {
            Some(relative) => read_json(&self.dir.join(relative)).map(|document| RemoteDocument {
                document,
                document_url: url.to_owned(),
                content_type: "application/ld+json".to_owned(),
                context_url: None,
            }),
            None => Err(SuiteError::Outside(url.to_owned())),
        };

        ready(loaded)
    }
}

enum Outcome {
    Passed,
    Failed,
    Skipped,
}

fn run_single_test(test: &TestEntry, loader: &SuiteLoader) -> Result<Outcome, SuiteError> {
    if test.option.spec_version.as_deref() == Some("json-ld-1.0") || !test.input.ends_with(".jsonld") {
        return Ok(Outcome::Skipped);
    }

    let expand_context = match &test.option.expand_context {
        Some(path) => Some(read_json(&loader.dir.join(path))?),
        None => None,
    };

    let options = JsonLdOptions {
        base: Some(
            test.option
                .base
                .clone()
                .unwrap_or_else(|| format!("{}{}", loader.base_iri, test.input)),
        ),
        expand_context,
        processing_mode: test.option.processing_mode.unwrap_or_default(),
        ..JsonLdOptions::default()
    };

    let input = Value::String(format!("{}{}", loader.base_iri, test.input));
    let result = async_std::task::block_on(expand(&input, &options, loader.clone()));

    println!("{} {}\n: {}", test.id, test.name, test.purpose.as_deref().unwrap_or(""));

    let positive = test.types.iter().any(|t| t == "jld:PositiveEvaluationTest");
    let passed = match (&result, &test.expect, &test.expect_error_code) {
        (Ok(expanded), Some(expect), _) if positive => {
            let expect = read_json(&loader.dir.join(expect))?;
            let expanded = Value::from(expanded.clone());

            if expect != expanded {
                println!(
                    "Diff: {}\n{}",
                    serde_json::to_string_pretty(&expect).unwrap_or_default(),
                    serde_json::to_string_pretty(&expanded).unwrap_or_default()
                );
            }

            expect == expanded
        }
        (Err(err), _, Some(code)) => {
            if err.code() != code {
                println!("Expected {:?}, got {:?} ({})", code, err.code(), err);
            }

            err.code() == code
        }
        (Ok(_), _, Some(code)) => {
            println!("Expected {:?}, but expansion succeeded", code);
            false
        }
        (Err(err), _, None) => {
            println!("Failed: {}", err);
            false
        }
        _ => return Ok(Outcome::Skipped),
    };

    println!("{}\n------", if passed { "Ok!" } else { "FAILED" });

    Ok(if passed { Outcome::Passed } else { Outcome::Failed })
}

fn main() -> Result<(), Box<dyn Error>> {
    let dir = PathBuf::from(std::env::args().nth(1).unwrap_or_else(|| "tests".to_owned()));
    let manifest: Manifest = serde_json::from_value(read_json(&dir.join("expand-manifest.jsonld"))?)?;

    let loader = SuiteLoader {
        base_iri: manifest.base_iri.clone(),
        dir,
    };

    let (mut passed, mut failed, mut skipped) = (0, 0, 0);
    for test in &manifest.sequence {
        match run_single_test(test, &loader)? {
            Outcome::Passed => passed += 1,
            Outcome::Failed => failed += 1,
            Outcome::Skipped => skipped += 1,
        }
    }

    println!("{} passed, {} failed, {} skipped", passed, failed, skipped);

    if failed > 0 {
        std::process::exit(1);
    }

    Ok(())
}
