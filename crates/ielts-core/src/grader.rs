//! Grading engine.
//!
//! Scores a response map against a test definition in two passes: answer
//! groups first, then every remaining question that has an answer-key rule.
//! Grading never fails; irregular content degrades to zero or is skipped.

use std::collections::{BTreeSet, HashSet};

use crate::model::{
    AnswerGroup, AnswerRule, Question, QuestionType, Response, ResponseMap, TestDefinition,
};
use crate::normalize::{
    choice_letters, letter_set, normalize_choice, normalize_letter, normalize_scalar, Normalized,
};
use crate::report::{DetailEntry, ScoreReport};

/// Detail type reported for answer groups.
pub const GROUP_DETAIL_TYPE: &str = "group";

/// Grade `responses` against `test`.
///
/// Keys referenced by any answer group are scored only by their group, even
/// when they also appear in the answer key. Questions without a rule are
/// excluded from both `raw` and `max`.
pub fn grade(test: &TestDefinition, responses: &ResponseMap) -> ScoreReport {
    let grouped_keys: HashSet<&str> = test
        .answer_groups
        .iter()
        .flat_map(|g| g.keys.iter().map(String::as_str))
        .collect();

    let mut report = ScoreReport::default();

    for group in &test.answer_groups {
        if let Some(detail) = grade_group(group, responses) {
            report.raw += detail.gained;
            report.max += detail.max;
            report.details.push(detail);
        }
    }

    let mut unknown_types = BTreeSet::new();
    for question in test.questions() {
        if grouped_keys.contains(question.key.as_str()) {
            continue;
        }
        let Some(rule) = test.answer_key.get(&question.key) else {
            tracing::debug!("question '{}' has no answer rule, not scored", question.key);
            continue;
        };
        let rule_kind_known = rule.kind.as_ref().is_some_and(QuestionType::is_known);
        if !question.kind.is_known() && !rule_kind_known {
            unknown_types.insert(question.kind.as_str().to_string());
        }

        let detail = grade_question(question, rule, responses);
        report.raw += detail.gained;
        report.max += detail.max;
        report.details.push(detail);
    }

    for kind in unknown_types {
        tracing::warn!("unknown question type '{kind}' graded as free text");
    }

    report
}

/// Score one answer group, or `None` if it has nothing to score against.
fn grade_group(group: &AnswerGroup, responses: &ResponseMap) -> Option<DetailEntry> {
    let accepted: BTreeSet<String> = group
        .accepted_set
        .iter()
        .map(|a| normalize_letter(a))
        .filter(|a| !a.is_empty())
        .collect();
    let expected = group.expected_count.unwrap_or(0);

    if accepted.is_empty() || expected == 0 {
        tracing::debug!(
            "answer group '{}' has no accepted set or expected count, skipped",
            group.detail_key()
        );
        return None;
    }

    let selected: BTreeSet<String> = group
        .keys
        .iter()
        .flat_map(|key| letter_set(responses.get(key)))
        .collect();
    let hits = selected.intersection(&accepted).count() as u32;

    Some(DetailEntry {
        key: group.detail_key(),
        kind: GROUP_DETAIL_TYPE.to_string(),
        gained: hits.min(expected),
        max: expected,
        user: Some(selected.into_iter().collect::<Vec<_>>().into()),
        accepted: group.accepted_set.clone(),
    })
}

fn grade_question(question: &Question, rule: &AnswerRule, responses: &ResponseMap) -> DetailEntry {
    let kind = rule.kind.as_ref().unwrap_or(&question.kind);
    let user = responses.get(&question.key);

    let (weight, gained, accepted) = match kind {
        QuestionType::MultipleChoice => {
            let accepted_response = Response::Many(rule.accepted.clone());
            let mut accepted_letters = choice_letters(Some(&accepted_response));
            let gained = match accepted_letters.len() {
                0 => 0,
                1 => {
                    let single = accepted_letters.remove(0);
                    u32::from(normalize_choice(user, true) == Normalized::Scalar(single))
                }
                _ => u32::from(
                    normalize_choice(user, false) == Normalized::Letters(accepted_letters),
                ),
            };
            (rule.weight.unwrap_or(1), gained, rule.accepted.clone())
        }
        QuestionType::MultiLetter => {
            let accepted: BTreeSet<String> = rule
                .accepted_set
                .iter()
                .map(|a| normalize_letter(a))
                .filter(|a| !a.is_empty())
                .collect();
            let cap = rule.expected_count.unwrap_or(accepted.len() as u32);
            let hits = letter_set(user).intersection(&accepted).count() as u32;
            (rule.weight.unwrap_or(cap), hits.min(cap), rule.accepted_set.clone())
        }
        _ => {
            let normalize_as = if question.kind.is_known() || rule.kind.is_none() {
                &question.kind
            } else {
                kind
            };
            let submitted = user.map(|u| u.as_scalar()).unwrap_or_default();
            let submitted = normalize_scalar(&submitted, normalize_as);
            let matched = rule
                .accepted
                .iter()
                .any(|a| normalize_scalar(a, normalize_as) == submitted);
            (rule.weight.unwrap_or(1), u32::from(matched), rule.accepted.clone())
        }
    };

    DetailEntry {
        key: question.key.clone(),
        kind: question.kind.to_string(),
        gained: gained.min(weight),
        max: weight,
        user: user.cloned(),
        accepted,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Section;

    fn question(key: &str, kind: QuestionType) -> Question {
        Question {
            key: key.into(),
            kind,
            group_id: None,
            extra: serde_json::Map::new(),
        }
    }

    fn rule(kind: QuestionType, accepted: &[&str]) -> AnswerRule {
        AnswerRule {
            kind: Some(kind),
            accepted: accepted.iter().map(|s| s.to_string()).collect(),
            ..Default::default()
        }
    }

    fn make_test(questions: Vec<Question>) -> TestDefinition {
        TestDefinition {
            id: Some("t1".into()),
            sections: vec![Section {
                id: "s1".into(),
                questions,
                ..Default::default()
            }],
            ..Default::default()
        }
    }

    fn responses(entries: &[(&str, Response)]) -> ResponseMap {
        entries
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    #[test]
    fn single_letter_is_case_insensitive() {
        let mut test = make_test(vec![question("1", QuestionType::SingleLetter)]);
        test.answer_key
            .insert("1".into(), rule(QuestionType::SingleLetter, &["B"]));

        let report = grade(&test, &responses(&[("1", "b".into())]));
        assert_eq!((report.raw, report.max), (1, 1));
        assert_eq!(report.details[0].kind, "single_letter");
    }

    #[test]
    fn text_matches_any_accepted_variant() {
        let mut test = make_test(vec![question("1", QuestionType::Text)]);
        test.answer_key
            .insert("1".into(), rule(QuestionType::Text, &["colour", "color"]));

        let report = grade(&test, &responses(&[("1", " \"Color\". ".into())]));
        assert_eq!(report.raw, 1);

        let report = grade(&test, &responses(&[("1", "colours".into())]));
        assert_eq!((report.raw, report.max), (0, 1));
    }

    #[test]
    fn missing_response_scores_zero_but_counts_max() {
        let mut test = make_test(vec![question("1", QuestionType::TrueFalseNotGiven)]);
        test.answer_key
            .insert("1".into(), rule(QuestionType::TrueFalseNotGiven, &["NOT GIVEN"]));

        let report = grade(&test, &ResponseMap::new());
        assert_eq!((report.raw, report.max), (0, 1));
        assert!(report.details[0].user.is_none());
    }

    #[test]
    fn question_without_rule_is_excluded() {
        let mut test = make_test(vec![
            question("1", QuestionType::Text),
            question("2", QuestionType::Text),
        ]);
        test.answer_key
            .insert("1".into(), rule(QuestionType::Text, &["river"]));

        let report = grade(&test, &responses(&[("2", "anything".into())]));
        assert_eq!(report.max, 1);
        assert_eq!(report.details.len(), 1);
        assert!(report.detail("2").is_none());
    }

    #[test]
    fn empty_definition_scores_zero_of_zero() {
        let report = grade(&TestDefinition::default(), &responses(&[("1", "a".into())]));
        assert_eq!((report.raw, report.max), (0, 0));
        assert!(report.details.is_empty());
    }

    #[test]
    fn multi_letter_partial_credit_is_capped() {
        let mut test = make_test(vec![question("21", QuestionType::MultiLetter)]);
        test.answer_key.insert(
            "21".into(),
            AnswerRule {
                kind: Some(QuestionType::MultiLetter),
                accepted_set: vec!["A".into(), "B".into()],
                expected_count: Some(2),
                ..Default::default()
            },
        );

        let all = grade(&test, &responses(&[("21", vec!["a", "b", "c"].into())]));
        assert_eq!((all.raw, all.max), (2, 2));

        let one = grade(&test, &responses(&[("21", vec!["A", "C"].into())]));
        assert_eq!((one.raw, one.max), (1, 2));

        let dupes = grade(&test, &responses(&[("21", vec!["A", "a"].into())]));
        assert_eq!(dupes.raw, 1);
    }

    #[test]
    fn multi_letter_cap_defaults_to_accepted_size() {
        let mut test = make_test(vec![question("21", QuestionType::MultiLetter)]);
        test.answer_key.insert(
            "21".into(),
            AnswerRule {
                kind: Some(QuestionType::MultiLetter),
                accepted_set: vec!["A".into(), "B".into(), "E".into()],
                ..Default::default()
            },
        );

        let report = grade(&test, &responses(&[("21", vec!["E", "B", "A", "D"].into())]));
        assert_eq!((report.raw, report.max), (3, 3));
    }

    #[test]
    fn multiple_choice_multi_answer_needs_exact_set() {
        let mut test = make_test(vec![question("11", QuestionType::MultipleChoice)]);
        test.answer_key
            .insert("11".into(), rule(QuestionType::MultipleChoice, &["B", "D"]));

        let partial = grade(&test, &responses(&[("11", vec!["B"].into())]));
        assert_eq!((partial.raw, partial.max), (0, 1));

        let exact = grade(&test, &responses(&[("11", "d,b".into())]));
        assert_eq!(exact.raw, 1);

        let excess = grade(&test, &responses(&[("11", vec!["B", "D", "A"].into())]));
        assert_eq!(excess.raw, 0);
    }

    #[test]
    fn multiple_choice_single_answer() {
        let mut test = make_test(vec![question("12", QuestionType::MultipleChoice)]);
        test.answer_key
            .insert("12".into(), rule(QuestionType::MultipleChoice, &["C"]));

        assert_eq!(grade(&test, &responses(&[("12", "c".into())])).raw, 1);
        assert_eq!(grade(&test, &responses(&[("12", vec!["C"].into())])).raw, 1);
        assert_eq!(grade(&test, &responses(&[("12", vec!["C", "A"].into())])).raw, 0);
        assert_eq!(grade(&test, &ResponseMap::new()).raw, 0);
    }

    #[test]
    fn rule_type_overrides_question_type() {
        let mut test = make_test(vec![question("3", QuestionType::Dropdown)]);
        test.answer_key
            .insert("3".into(), rule(QuestionType::MultipleChoice, &["A,E"]));

        let report = grade(&test, &responses(&[("3", vec!["e", "a"].into())]));
        assert_eq!(report.raw, 1);
        assert_eq!(report.details[0].kind, "dropdown");
    }

    #[test]
    fn group_scoring_and_no_double_counting() {
        let mut test = make_test(vec![
            question("5", QuestionType::SingleLetter),
            question("6", QuestionType::SingleLetter),
            question("7", QuestionType::Text),
        ]);
        test.answer_key
            .insert("5".into(), rule(QuestionType::SingleLetter, &["A"]));
        test.answer_key
            .insert("6".into(), rule(QuestionType::SingleLetter, &["C"]));
        test.answer_key
            .insert("7".into(), rule(QuestionType::Text, &["bridge"]));
        test.answer_groups.push(AnswerGroup {
            id: Some("g1".into()),
            keys: vec!["5".into(), "6".into()],
            accepted_set: vec!["A".into(), "C".into()],
            expected_count: Some(2),
        });

        let report = grade(
            &test,
            &responses(&[("5", "a".into()), ("6", "x".into()), ("7", "Bridge".into())]),
        );

        assert_eq!(report.details[0].key, "g1");
        assert_eq!(report.details[0].kind, GROUP_DETAIL_TYPE);
        assert_eq!((report.details[0].gained, report.details[0].max), (1, 2));
        assert!(report.detail("5").is_none());
        assert!(report.detail("6").is_none());
        assert_eq!((report.raw, report.max), (2, 3));
    }

    #[test]
    fn group_selections_are_a_set() {
        let mut test = make_test(vec![
            question("5", QuestionType::SingleLetter),
            question("6", QuestionType::SingleLetter),
        ]);
        test.answer_groups.push(AnswerGroup {
            id: None,
            keys: vec!["5".into(), "6".into()],
            accepted_set: vec!["A".into(), "C".into()],
            expected_count: Some(2),
        });

        let report = grade(&test, &responses(&[("5", "A".into()), ("6", "a".into())]));
        assert_eq!(report.details[0].key, "5,6");
        assert_eq!(report.raw, 1);
        assert_eq!(report.details[0].user, Some(Response::from(vec!["A"])));
    }

    #[test]
    fn degenerate_groups_are_skipped_entirely() {
        let mut test = make_test(vec![question("5", QuestionType::SingleLetter)]);
        test.answer_key
            .insert("5".into(), rule(QuestionType::SingleLetter, &["A"]));
        test.answer_groups.push(AnswerGroup {
            id: Some("empty".into()),
            keys: vec!["5".into()],
            accepted_set: vec![],
            expected_count: Some(1),
        });
        test.answer_groups.push(AnswerGroup {
            id: Some("zero".into()),
            keys: vec!["9".into()],
            accepted_set: vec!["B".into()],
            expected_count: Some(0),
        });

        let report = grade(&test, &responses(&[("5", "A".into())]));
        // Key 5 is still grouped, so its own rule is not scored either.
        assert_eq!((report.raw, report.max), (0, 0));
        assert!(report.details.is_empty());
    }

    #[test]
    fn grouped_entries_come_first() {
        let mut test = make_test(vec![
            question("1", QuestionType::Text),
            question("2", QuestionType::SingleLetter),
        ]);
        test.answer_key
            .insert("1".into(), rule(QuestionType::Text, &["x"]));
        test.answer_groups.push(AnswerGroup {
            id: Some("g".into()),
            keys: vec!["2".into()],
            accepted_set: vec!["B".into()],
            expected_count: Some(1),
        });

        let keys: Vec<_> = grade(&test, &ResponseMap::new())
            .details
            .into_iter()
            .map(|d| d.key)
            .collect();
        assert_eq!(keys, vec!["g", "1"]);
    }

    #[test]
    fn explicit_weight_bounds_gain() {
        let mut test = make_test(vec![
            question("1", QuestionType::Text),
            question("2", QuestionType::MultiLetter),
        ]);
        test.answer_key.insert(
            "1".into(),
            AnswerRule {
                weight: Some(2),
                ..rule(QuestionType::Text, &["delta"])
            },
        );
        test.answer_key.insert(
            "2".into(),
            AnswerRule {
                kind: Some(QuestionType::MultiLetter),
                accepted_set: vec!["A".into(), "B".into()],
                expected_count: Some(2),
                weight: Some(1),
                ..Default::default()
            },
        );

        let report = grade(
            &test,
            &responses(&[("1", "Delta".into()), ("2", vec!["A", "B"].into())]),
        );
        assert_eq!(report.detail("1").map(|d| (d.gained, d.max)), Some((1, 2)));
        assert_eq!(report.detail("2").map(|d| (d.gained, d.max)), Some((1, 1)));
        assert!(report.raw <= report.max);
    }

    #[test]
    fn unknown_type_graded_as_text() {
        let mut test = make_test(vec![question("1", QuestionType::Other("cloze".into()))]);
        test.answer_key.insert(
            "1".into(),
            AnswerRule {
                accepted: vec!["Harbour".into()],
                ..Default::default()
            },
        );

        let report = grade(&test, &responses(&[("1", "harbour.".into())]));
        assert_eq!(report.raw, 1);
        assert_eq!(report.details[0].kind, "cloze");
    }

    #[test]
    fn grading_does_not_touch_responses() {
        let mut test = make_test(vec![question("1", QuestionType::SingleLetter)]);
        test.answer_key
            .insert("1".into(), rule(QuestionType::SingleLetter, &["B"]));
        let map = responses(&[("1", " b ".into())]);
        let before = map.clone();

        grade(&test, &map);
        assert_eq!(map, before);
    }
}
