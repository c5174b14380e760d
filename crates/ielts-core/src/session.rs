//! Exam session state.
//!
//! An [`ExamSession`] owns navigation, responses, flags and timing metadata
//! for one loaded test, and persists them through a [`KeyValueStore`] after
//! every mutation. Persistence is best-effort: read failures and corrupt
//! records load as a fresh session, write failures are logged and skipped.

use std::borrow::Cow;
use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use uuid::Uuid;

use crate::grader::grade;
use crate::model::{Question, Response, ResponseMap, TestDefinition};
use crate::report::GradedAttempt;
use crate::traits::KeyValueStore;

/// Default prefix for storage keys.
pub const DEFAULT_STORAGE_PREFIX: &str = "ielts";

/// Identifier scoping a test's session state.
///
/// The test's own `id` when it has one. Otherwise a test loaded from disk is
/// identified by its source path (`file-{uuid v5 of the path}`), and only a
/// test with neither falls back to its title or `"untitled"`.
pub fn session_test_id<'a>(test: &'a TestDefinition, source: Option<&Path>) -> Cow<'a, str> {
    if let Some(id) = test.id.as_deref().filter(|id| !id.trim().is_empty()) {
        return Cow::Borrowed(id);
    }
    match source {
        Some(path) => {
            let path = path.to_string_lossy();
            Cow::Owned(format!(
                "file-{}",
                Uuid::new_v5(&Uuid::NAMESPACE_URL, path.as_bytes())
            ))
        }
        None => Cow::Borrowed(test.storage_id()),
    }
}

/// Storage key for a session record: `{prefix}:{module}:{test id}`.
pub fn session_storage_key(
    prefix: &str,
    module: &str,
    test: &TestDefinition,
    source: Option<&Path>,
) -> String {
    format!("{prefix}:{module}:{}", session_test_id(test, source))
}

/// Storage key for the flag list belonging to a session key.
pub fn flags_storage_key(session_key: &str) -> String {
    format!("{session_key}:flags")
}

/// Render seconds as `m:ss`.
pub fn format_clock(seconds: u64) -> String {
    format!("{}:{:02}", seconds / 60, seconds % 60)
}

/// A question annotated with its owning section, in flat navigation order.
#[derive(Debug, Clone)]
pub struct FlatQuestion {
    pub section_id: String,
    pub section_title: Option<String>,
    pub question: Question,
}

/// Timing metadata.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionMeta {
    #[serde(default)]
    pub started_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub submitted_at: Option<DateTime<Utc>>,
}

/// Lifecycle phase, derived from [`SessionMeta`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
    Created,
    InProgress,
    Submitted,
}

/// Persisted shape of a session.
///
/// Decoding is lenient: null fields take their defaults and null response
/// entries are dropped rather than failing the whole record.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SessionRecord {
    #[serde(default, deserialize_with = "null_as_default")]
    q_index: i64,
    /// Written for compatibility; recomputed from `q_index` on load.
    #[serde(default, deserialize_with = "null_as_default")]
    section_index: usize,
    #[serde(default, deserialize_with = "skip_null_responses")]
    responses: ResponseMap,
    #[serde(default, deserialize_with = "null_as_default")]
    meta: SessionMeta,
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

fn skip_null_responses<'de, D>(deserializer: D) -> Result<ResponseMap, D::Error>
where
    D: Deserializer<'de>,
{
    let entries: Option<BTreeMap<String, Option<Response>>> = Option::deserialize(deserializer)?;
    Ok(entries
        .unwrap_or_default()
        .into_iter()
        .filter_map(|(key, value)| value.map(|v| (key, v)))
        .collect())
}

/// Navigation and response state for one test instance.
pub struct ExamSession {
    test: TestDefinition,
    module: String,
    storage_key: String,
    flags_key: String,
    store: Arc<dyn KeyValueStore>,
    questions: Vec<FlatQuestion>,
    q_index: usize,
    section_index: usize,
    responses: ResponseMap,
    meta: SessionMeta,
    flags: BTreeSet<String>,
}

impl ExamSession {
    /// Open a session under the default key prefix, restoring prior state.
    ///
    /// A test without an `id` is keyed by its title; use [`Self::open_from`]
    /// when the definition came from a file.
    pub fn open(test: TestDefinition, module: &str, store: Arc<dyn KeyValueStore>) -> Self {
        let key = session_storage_key(DEFAULT_STORAGE_PREFIX, module, &test, None);
        Self::open_with_key(test, module, key, store)
    }

    /// Open a session for a test loaded from `source`, so id-less tests from
    /// different files keep separate state.
    pub fn open_from(
        test: TestDefinition,
        source: &Path,
        module: &str,
        store: Arc<dyn KeyValueStore>,
    ) -> Self {
        let key = session_storage_key(DEFAULT_STORAGE_PREFIX, module, &test, Some(source));
        Self::open_with_key(test, module, key, store)
    }

    /// Open a session persisted under an explicit storage key.
    pub fn open_with_key(
        test: TestDefinition,
        module: &str,
        storage_key: String,
        store: Arc<dyn KeyValueStore>,
    ) -> Self {
        let questions = flatten_questions(&test);
        let mut session = Self {
            flags_key: flags_storage_key(&storage_key),
            storage_key,
            module: module.to_string(),
            store,
            questions,
            q_index: 0,
            section_index: 0,
            responses: ResponseMap::new(),
            meta: SessionMeta::default(),
            flags: BTreeSet::new(),
            test,
        };
        session.load();
        session.load_flags();
        session
    }

    pub fn test(&self) -> &TestDefinition {
        &self.test
    }

    pub fn module(&self) -> &str {
        &self.module
    }

    pub fn storage_key(&self) -> &str {
        &self.storage_key
    }

    /// All questions in navigation order.
    pub fn questions(&self) -> &[FlatQuestion] {
        &self.questions
    }

    pub fn total_questions(&self) -> usize {
        self.questions.len()
    }

    pub fn current_index(&self) -> usize {
        self.q_index
    }

    /// Index of the current question's section within the test.
    pub fn section_index(&self) -> usize {
        self.section_index
    }

    /// The current question, `None` only for a test without questions.
    pub fn current(&self) -> Option<&FlatQuestion> {
        self.questions.get(self.q_index)
    }

    /// Questions sharing the current question's section.
    pub fn questions_in_current_section(&self) -> Vec<&FlatQuestion> {
        let Some(current) = self.current() else {
            return Vec::new();
        };
        self.questions
            .iter()
            .filter(|q| q.section_id == current.section_id)
            .collect()
    }

    /// Navigate to `index`, clamped into the question range.
    pub fn go_to_index(&mut self, index: isize) {
        let last = self.questions.len().saturating_sub(1) as isize;
        self.q_index = index.clamp(0, last) as usize;
        self.section_index = self.section_index_for(self.q_index);
        self.save();
    }

    /// Next question; a no-op on the last one.
    pub fn next(&mut self) {
        self.go_to_index(self.q_index as isize + 1);
    }

    /// Previous question; a no-op on the first one.
    pub fn prev(&mut self) {
        self.go_to_index(self.q_index as isize - 1);
    }

    /// Navigate to the question with `key`. Returns `false` if there is none.
    pub fn go_to_key(&mut self, key: &str) -> bool {
        match self.questions.iter().position(|q| q.question.key == key) {
            Some(idx) => {
                self.go_to_index(idx as isize);
                true
            }
            None => false,
        }
    }

    /// Navigate to the first question of a section. Returns `false` if the
    /// section has no questions.
    pub fn go_to_section(&mut self, section_id: &str) -> bool {
        match self.questions.iter().position(|q| q.section_id == section_id) {
            Some(idx) => {
                self.go_to_index(idx as isize);
                true
            }
            None => false,
        }
    }

    pub fn set_response(&mut self, key: impl Into<String>, value: impl Into<Response>) {
        self.responses.insert(key.into(), value.into());
        self.save();
    }

    pub fn get_response(&self, key: &str) -> Option<&Response> {
        self.responses.get(key)
    }

    pub fn responses(&self) -> &ResponseMap {
        &self.responses
    }

    /// Responses holding a non-blank answer.
    pub fn answered_count(&self) -> usize {
        self.responses.values().filter(|r| r.is_answered()).count()
    }

    pub fn meta(&self) -> &SessionMeta {
        &self.meta
    }

    pub fn phase(&self) -> SessionPhase {
        if self.meta.submitted_at.is_some() {
            SessionPhase::Submitted
        } else if self.meta.started_at.is_some() {
            SessionPhase::InProgress
        } else {
            SessionPhase::Created
        }
    }

    /// Record the start time. Only the first call has an effect.
    pub fn mark_started(&mut self) {
        if self.meta.started_at.is_none() {
            self.meta.started_at = Some(Utc::now());
            self.save();
        }
    }

    /// Record the submission time. Responses stay editable and a later
    /// submit overwrites the timestamp.
    pub fn submit(&mut self) {
        self.meta.submitted_at = Some(Utc::now());
        self.save();
    }

    /// Clear responses, metadata and flags, and return to the first question.
    pub fn reset_all(&mut self) {
        self.responses.clear();
        self.meta = SessionMeta::default();
        self.flags.clear();
        self.q_index = 0;
        self.section_index = self.section_index_for(0);
        self.save();
        if let Err(e) = self.store.remove(&self.flags_key) {
            tracing::warn!("flag reset skipped ({} store): {e}", self.store.name());
        }
    }

    /// Flip the review flag on `key`, returning the new state.
    pub fn toggle_flag(&mut self, key: &str) -> bool {
        let flagged = if self.flags.remove(key) {
            false
        } else {
            self.flags.insert(key.to_string());
            true
        };
        self.save_flags();
        flagged
    }

    pub fn is_flagged(&self, key: &str) -> bool {
        self.flags.contains(key)
    }

    /// Flagged keys in sorted order.
    pub fn flagged(&self) -> Vec<&str> {
        self.flags.iter().map(String::as_str).collect()
    }

    /// Seconds left at `now`, or `None` for an untimed test. Before the
    /// session starts the full limit remains.
    pub fn remaining_seconds(&self, now: DateTime<Utc>) -> Option<u64> {
        let limit = self.test.time_limit_seconds.filter(|&s| s > 0)?;
        let Some(started_at) = self.meta.started_at else {
            return Some(limit);
        };
        let elapsed = (now - started_at).num_seconds().max(0) as u64;
        Some(limit.saturating_sub(elapsed))
    }

    pub fn is_time_up(&self, now: DateTime<Utc>) -> bool {
        self.remaining_seconds(now) == Some(0)
    }

    /// Submit the session if its time ran out at `now` and it has not been
    /// submitted yet. Returns `true` when this call submitted it.
    pub fn submit_if_expired(&mut self, now: DateTime<Utc>) -> bool {
        if self.meta.submitted_at.is_some() || !self.is_time_up(now) {
            return false;
        }
        tracing::info!("time limit reached, submitting '{}'", self.storage_key);
        self.submit();
        true
    }

    /// Grade the current responses.
    pub fn grade(&self) -> GradedAttempt {
        let score = grade(&self.test, &self.responses);
        GradedAttempt::new(self.test.storage_id(), self.module.as_str(), score)
    }

    fn section_index_for(&self, index: usize) -> usize {
        self.questions
            .get(index)
            .and_then(|q| {
                self.test
                    .sections
                    .iter()
                    .position(|s| s.id == q.section_id)
            })
            .unwrap_or(0)
    }

    fn save(&self) {
        let record = SessionRecord {
            q_index: self.q_index as i64,
            section_index: self.section_index,
            responses: self.responses.clone(),
            meta: self.meta.clone(),
        };
        let json = match serde_json::to_string(&record) {
            Ok(json) => json,
            Err(e) => {
                tracing::warn!("failed to serialize session '{}': {e}", self.storage_key);
                return;
            }
        };
        if let Err(e) = self.store.set(&self.storage_key, &json) {
            tracing::warn!("session save skipped ({} store): {e}", self.store.name());
        }
    }

    fn load(&mut self) {
        let raw = match self.store.get(&self.storage_key) {
            Ok(Some(raw)) => raw,
            Ok(None) => return,
            Err(e) => {
                tracing::warn!("session load failed ({} store): {e}", self.store.name());
                return;
            }
        };
        let record: SessionRecord = match serde_json::from_str(&raw) {
            Ok(record) => record,
            Err(e) => {
                tracing::warn!("ignoring corrupt session '{}': {e}", self.storage_key);
                return;
            }
        };

        let last = self.questions.len().saturating_sub(1) as i64;
        self.q_index = record.q_index.clamp(0, last) as usize;
        self.section_index = self.section_index_for(self.q_index);
        self.responses = record.responses;
        self.meta = record.meta;
    }

    fn save_flags(&self) {
        let json = match serde_json::to_string(&self.flags) {
            Ok(json) => json,
            Err(e) => {
                tracing::warn!("failed to serialize flags '{}': {e}", self.flags_key);
                return;
            }
        };
        if let Err(e) = self.store.set(&self.flags_key, &json) {
            tracing::warn!("flag save skipped ({} store): {e}", self.store.name());
        }
    }

    fn load_flags(&mut self) {
        let raw = match self.store.get(&self.flags_key) {
            Ok(Some(raw)) => raw,
            Ok(None) => return,
            Err(e) => {
                tracing::warn!("flag load failed ({} store): {e}", self.store.name());
                return;
            }
        };
        match serde_json::from_str::<Vec<String>>(&raw) {
            Ok(keys) => self.flags = keys.into_iter().collect(),
            Err(e) => tracing::warn!("ignoring corrupt flags '{}': {e}", self.flags_key),
        }
    }
}

fn flatten_questions(test: &TestDefinition) -> Vec<FlatQuestion> {
    test.sections
        .iter()
        .flat_map(|section| {
            section.questions.iter().map(move |q| FlatQuestion {
                section_id: section.id.clone(),
                section_title: section.title.clone(),
                question: q.clone(),
            })
        })
        .collect()
}
