//! JSON test-definition loader.
//!
//! Loads test definitions and response maps from JSON files and directories,
//! and validates test content for authoring mistakes.

use std::collections::HashSet;
use std::path::Path;

use anyhow::{Context, Result};

use crate::model::{QuestionType, ResponseMap, TestDefinition};

/// Parse a single JSON file into a `TestDefinition`.
pub fn parse_test_definition(path: &Path) -> Result<TestDefinition> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read test file: {}", path.display()))?;

    parse_test_definition_str(&content, path)
}

/// Parse a JSON string into a `TestDefinition` (useful for testing).
///
/// The document must be a JSON object; missing collections default to empty.
pub fn parse_test_definition_str(content: &str, source_path: &Path) -> Result<TestDefinition> {
    let value: serde_json::Value = serde_json::from_str(content)
        .with_context(|| format!("failed to parse JSON: {}", source_path.display()))?;

    if !value.is_object() {
        anyhow::bail!(
            "test definition must be a JSON object: {}",
            source_path.display()
        );
    }

    serde_json::from_value(value)
        .with_context(|| format!("invalid test definition: {}", source_path.display()))
}

/// Recursively load all `.json` test definitions from a directory.
pub fn load_test_directory(dir: &Path) -> Result<Vec<TestDefinition>> {
    let mut tests = Vec::new();

    if !dir.is_dir() {
        anyhow::bail!("not a directory: {}", dir.display());
    }

    let mut entries = std::fs::read_dir(dir)
        .with_context(|| format!("failed to read directory: {}", dir.display()))?
        .collect::<std::io::Result<Vec<_>>>()?;
    entries.sort_by_key(|e| e.path());

    for entry in entries {
        let path = entry.path();

        if path.is_dir() {
            tests.extend(load_test_directory(&path)?);
        } else if path.extension().is_some_and(|ext| ext == "json") {
            match parse_test_definition(&path) {
                Ok(test) => tests.push(test),
                Err(e) => {
                    tracing::warn!("skipping {}: {e:#}", path.display());
                }
            }
        }
    }

    Ok(tests)
}

/// Parse a response map: a JSON object of question key to string or list.
pub fn parse_responses(path: &Path) -> Result<ResponseMap> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read responses file: {}", path.display()))?;
    serde_json::from_str(&content)
        .with_context(|| format!("failed to parse responses: {}", path.display()))
}

/// A warning from test validation.
#[derive(Debug, Clone)]
pub struct ValidationWarning {
    /// The question key or group id (if applicable).
    pub key: Option<String>,
    /// Warning message.
    pub message: String,
}

impl ValidationWarning {
    fn keyed(key: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            key: Some(key.into()),
            message: message.into(),
        }
    }
}

/// Validate a test definition for common authoring issues.
///
/// Warnings never block grading; they describe content the grader will skip
/// or score in a way the author may not expect.
pub fn validate_test(test: &TestDefinition) -> Vec<ValidationWarning> {
    let mut warnings = Vec::new();

    // Check for sections without questions
    for section in &test.sections {
        if section.questions.is_empty() {
            warnings.push(ValidationWarning {
                key: None,
                message: format!("section '{}' has no questions", section.id),
            });
        }
    }

    // Check for duplicate question keys
    let mut seen_keys = HashSet::new();
    for q in test.questions() {
        if !seen_keys.insert(q.key.as_str()) {
            warnings.push(ValidationWarning::keyed(
                &q.key,
                format!("duplicate question key: {}", q.key),
            ));
        }
    }

    // Check answer key entries against questions
    for (key, rule) in &test.answer_key {
        if !seen_keys.contains(key.as_str()) {
            warnings.push(ValidationWarning::keyed(
                key,
                "answer key entry has no matching question",
            ));
        }
        if rule.kind == Some(QuestionType::MultiLetter) && rule.accepted_set.is_empty() {
            warnings.push(ValidationWarning::keyed(
                key,
                "multi_letter rule has an empty acceptedSet",
            ));
        }
    }

    // Check answer groups
    let mut grouped: HashSet<&str> = HashSet::new();
    for group in &test.answer_groups {
        let group_key = group.detail_key();
        if group.accepted_set.is_empty() || group.expected_count.unwrap_or(0) == 0 {
            warnings.push(ValidationWarning::keyed(
                &group_key,
                "group has no acceptedSet or expectedCount and will be skipped",
            ));
        }
        for key in &group.keys {
            if !seen_keys.contains(key.as_str()) {
                warnings.push(ValidationWarning::keyed(
                    &group_key,
                    format!("group key {key} has no matching question"),
                ));
            }
            if test.answer_key.contains_key(key) {
                warnings.push(ValidationWarning::keyed(
                    key,
                    format!("key is also in answer group {group_key}; the group score wins"),
                ));
            }
            grouped.insert(key.as_str());
        }
    }

    // Check for questions nothing will score
    for q in test.questions() {
        if !test.answer_key.contains_key(&q.key) && !grouped.contains(q.key.as_str()) {
            warnings.push(ValidationWarning::keyed(
                &q.key,
                "question has no answer rule and will not be scored",
            ));
        }
    }

    warnings
}
