//! Core data model types for ielts-core.
//!
//! Test definitions are immutable once loaded: sections of questions, an
//! answer key indexed by question key, and optional answer groups that are
//! scored jointly. Responses are the only mutable input and are owned by the
//! exam session.

use std::borrow::Cow;
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize};

/// Map of question key to submitted value.
pub type ResponseMap = BTreeMap<String, Response>;

/// A complete practice test as loaded from its JSON definition.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TestDefinition {
    /// Test identifier, used to scope persisted session state.
    #[serde(default)]
    pub id: Option<String>,
    /// Human-readable title.
    #[serde(default)]
    pub title: Option<String>,
    /// Ordered sections; their questions form the flat navigation list.
    #[serde(default, deserialize_with = "null_as_default")]
    pub sections: Vec<Section>,
    /// Grading rule per question key.
    #[serde(default, deserialize_with = "null_as_default")]
    pub answer_key: BTreeMap<String, AnswerRule>,
    /// Clusters of question keys scored together.
    #[serde(default, deserialize_with = "null_as_default")]
    pub answer_groups: Vec<AnswerGroup>,
    /// Time limit in seconds. `0` or absent means untimed.
    #[serde(default)]
    pub time_limit_seconds: Option<u64>,
}

impl TestDefinition {
    /// Identifier used in storage keys: the id, else the title, else "untitled".
    pub fn storage_id(&self) -> &str {
        self.id
            .as_deref()
            .or(self.title.as_deref())
            .filter(|s| !s.trim().is_empty())
            .unwrap_or("untitled")
    }

    /// Iterate over every question in section order.
    pub fn questions(&self) -> impl Iterator<Item = &Question> {
        self.sections.iter().flat_map(|s| s.questions.iter())
    }

    /// Number of questions across all sections.
    pub fn question_count(&self) -> usize {
        self.sections.iter().map(|s| s.questions.len()).sum()
    }
}

/// A titled run of questions sharing resources (audio, reading passage).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Section {
    #[serde(default, deserialize_with = "key_string")]
    pub id: String,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub questions: Vec<Question>,
    /// Resource references and layout hints owned by the presentation layer.
    #[serde(flatten)]
    pub resources: serde_json::Map<String, serde_json::Value>,
}

/// A single question slot.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Question {
    /// Unique within a test; indexes both responses and the answer key.
    #[serde(deserialize_with = "key_string")]
    pub key: String,
    #[serde(rename = "type", default)]
    pub kind: QuestionType,
    /// Cluster of questions rendered under a shared instruction.
    #[serde(default, deserialize_with = "opt_key_string")]
    pub group_id: Option<String>,
    /// Prompt, options and other display metadata.
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

/// Question and answer-rule types.
///
/// Unrecognized names are kept in `Other` and graded as free text.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum QuestionType {
    #[default]
    Text,
    SingleLetter,
    TrueFalseNotGiven,
    YesNoNotGiven,
    MultiLetter,
    MultipleChoice,
    Matching,
    Headings,
    Dropdown,
    Other(String),
}

impl QuestionType {
    pub fn as_str(&self) -> &str {
        match self {
            QuestionType::Text => "text",
            QuestionType::SingleLetter => "single_letter",
            QuestionType::TrueFalseNotGiven => "tfng",
            QuestionType::YesNoNotGiven => "ynng",
            QuestionType::MultiLetter => "multi_letter",
            QuestionType::MultipleChoice => "multipleChoice",
            QuestionType::Matching => "matching",
            QuestionType::Headings => "headings",
            QuestionType::Dropdown => "dropdown",
            QuestionType::Other(name) => name,
        }
    }

    /// Returns `false` for names this crate does not know how to grade.
    pub fn is_known(&self) -> bool {
        !matches!(self, QuestionType::Other(_))
    }
}

impl fmt::Display for QuestionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for QuestionType {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "text" => QuestionType::Text,
            "single_letter" => QuestionType::SingleLetter,
            "tfng" => QuestionType::TrueFalseNotGiven,
            "ynng" => QuestionType::YesNoNotGiven,
            "multi_letter" => QuestionType::MultiLetter,
            "multipleChoice" => QuestionType::MultipleChoice,
            "matching" => QuestionType::Matching,
            "headings" => QuestionType::Headings,
            "dropdown" => QuestionType::Dropdown,
            other => QuestionType::Other(other.to_string()),
        })
    }
}

impl From<String> for QuestionType {
    fn from(s: String) -> Self {
        match s.parse() {
            Ok(kind) => kind,
            Err(never) => match never {},
        }
    }
}

impl From<QuestionType> for String {
    fn from(kind: QuestionType) -> Self {
        kind.as_str().to_string()
    }
}

/// How one question key is graded.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnswerRule {
    /// Usually mirrors the question type; may diverge for multiple choice.
    #[serde(rename = "type", default)]
    pub kind: Option<QuestionType>,
    /// Acceptable raw values.
    #[serde(default, deserialize_with = "one_or_many")]
    pub accepted: Vec<String>,
    /// Acceptable letters for `multi_letter` rules.
    #[serde(default, deserialize_with = "one_or_many")]
    pub accepted_set: Vec<String>,
    /// Correct selections expected for multi-select types.
    #[serde(default)]
    pub expected_count: Option<u32>,
    /// Score contribution.
    #[serde(default)]
    pub weight: Option<u32>,
}

/// Question keys scored jointly against a shared accepted set.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnswerGroup {
    #[serde(default, deserialize_with = "opt_key_string")]
    pub id: Option<String>,
    #[serde(default, deserialize_with = "one_or_many")]
    pub keys: Vec<String>,
    #[serde(default, deserialize_with = "one_or_many")]
    pub accepted_set: Vec<String>,
    #[serde(default)]
    pub expected_count: Option<u32>,
}

impl AnswerGroup {
    /// Key used for the group's detail entry.
    pub fn detail_key(&self) -> String {
        match &self.id {
            Some(id) => id.clone(),
            None => self.keys.join(","),
        }
    }
}

/// A submitted value: free text or a list of selections.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Response {
    Text(String),
    Many(Vec<String>),
}

impl Response {
    /// Scalar view: lists are comma-joined.
    pub fn as_scalar(&self) -> Cow<'_, str> {
        match self {
            Response::Text(s) => Cow::Borrowed(s),
            Response::Many(values) => Cow::Owned(values.join(",")),
        }
    }

    /// Individual selections. A string counts as one selection.
    pub fn values(&self) -> Vec<&str> {
        match self {
            Response::Text(s) => vec![s.as_str()],
            Response::Many(values) => values.iter().map(String::as_str).collect(),
        }
    }

    /// Non-blank text or a non-empty selection list.
    pub fn is_answered(&self) -> bool {
        match self {
            Response::Text(s) => !s.trim().is_empty(),
            Response::Many(values) => values.iter().any(|v| !v.trim().is_empty()),
        }
    }
}

impl fmt::Display for Response {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Response::Text(s) => f.write_str(s),
            Response::Many(values) => f.write_str(&values.join(", ")),
        }
    }
}

impl From<&str> for Response {
    fn from(s: &str) -> Self {
        Response::Text(s.to_string())
    }
}

impl From<String> for Response {
    fn from(s: String) -> Self {
        Response::Text(s)
    }
}

impl From<Vec<String>> for Response {
    fn from(values: Vec<String>) -> Self {
        Response::Many(values)
    }
}

impl From<Vec<&str>> for Response {
    fn from(values: Vec<&str>) -> Self {
        Response::Many(values.into_iter().map(str::to_string).collect())
    }
}

// ---------------------------------------------------------------------------
// Lenient field decoding
// ---------------------------------------------------------------------------

#[derive(Deserialize)]
#[serde(untagged)]
enum Scalar {
    Str(String),
    Int(i64),
    Float(f64),
    Bool(bool),
}

impl From<Scalar> for String {
    fn from(s: Scalar) -> Self {
        match s {
            Scalar::Str(s) => s,
            Scalar::Int(n) => n.to_string(),
            Scalar::Float(n) => n.to_string(),
            Scalar::Bool(b) => b.to_string(),
        }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum OneOrMany {
    One(Scalar),
    Many(Vec<Scalar>),
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

fn key_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<Scalar>::deserialize(deserializer)?
        .map(String::from)
        .unwrap_or_default())
}

fn opt_key_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<Scalar>::deserialize(deserializer)?.map(String::from))
}

fn one_or_many<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<OneOrMany>::deserialize(deserializer)? {
        None => Vec::new(),
        Some(OneOrMany::One(s)) => vec![s.into()],
        Some(OneOrMany::Many(values)) => values.into_iter().map(String::from).collect(),
    })
}
