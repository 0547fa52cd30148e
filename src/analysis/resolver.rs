//! Topic/subject/banca attribution for a single answer.
//!
//! Per-answer overrides win over the question's own classification; missing
//! values fall back to sentinels so every answer lands somewhere in the tree.

use super::normalize::normalize_banca;
use crate::models::{AnswerEvent, QuestionRef, NO_BANCA, NO_SUBJECT, NO_TOPIC};

/// Where one answer is counted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attribution {
    pub topic: String,
    pub subject: String,
    /// Normalized banca key.
    pub banca: String,
}

/// Resolve the normalized banca for an answer.
pub fn resolve_banca(answer: &AnswerEvent, question: Option<&QuestionRef>) -> String {
    let raw = [
        answer.banca_override.as_deref(),
        question.and_then(|q| q.institution.as_deref()),
    ]
    .into_iter()
    .flatten()
    .find(|banca| !banca.trim().is_empty())
    .unwrap_or(NO_BANCA);

    normalize_banca(raw)
}

fn resolve_topics(answer: &AnswerEvent, question: Option<&QuestionRef>) -> Vec<String> {
    let candidates = [
        answer.topics_override.as_ref(),
        question.map(|q| &q.topics),
        question.map(|q| &q.topics_fallback),
    ];

    candidates
        .into_iter()
        .flatten()
        .map(|labels| labels.cleaned())
        .find(|labels| !labels.is_empty())
        .unwrap_or_else(|| vec![NO_TOPIC.to_string()])
}

fn resolve_subjects(answer: &AnswerEvent, question: Option<&QuestionRef>) -> Vec<String> {
    let candidates = [answer.subjects_override.as_ref(), question.map(|q| &q.subjects)];

    candidates
        .into_iter()
        .flatten()
        .map(|labels| labels.cleaned())
        .find(|labels| !labels.is_empty())
        .unwrap_or_else(|| vec![NO_SUBJECT.to_string()])
}

/// Resolve the (topic, subject, banca) triples an answer contributes to.
///
/// Equal-length topic and subject lists are paired by index. Otherwise every
/// topic is paired with the first subject.
pub fn resolve_attributions(answer: &AnswerEvent, question: Option<&QuestionRef>) -> Vec<Attribution> {
    let banca = resolve_banca(answer, question);
    let topics = resolve_topics(answer, question);
    let subjects = resolve_subjects(answer, question);

    let attribution = |topic: &str, subject: &str| Attribution {
        topic: topic.to_string(),
        subject: subject.to_string(),
        banca: banca.clone(),
    };

    let mut attributions: Vec<Attribution> = if topics.len() == subjects.len() {
        topics
            .iter()
            .zip(&subjects)
            .map(|(topic, subject)| attribution(topic, subject))
            .collect()
    } else {
        let first_subject = subjects.first().map(String::as_str).unwrap_or(NO_SUBJECT);
        topics
            .iter()
            .map(|topic| attribution(topic, first_subject))
            .collect()
    };

    if attributions.is_empty() {
        attributions.push(attribution(NO_TOPIC, NO_SUBJECT));
    }

    attributions
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Labels;
    use chrono::Utc;

    fn answer() -> AnswerEvent {
        AnswerEvent {
            id: "a1".to_string(),
            question_id: "q1".to_string(),
            student_id: "s1".to_string(),
            is_correct: Some(true),
            selected_option_id: Some("o1".to_string()),
            banca_override: None,
            topics_override: None,
            subjects_override: None,
            occurred_at: Utc::now(),
        }
    }

    fn question() -> QuestionRef {
        QuestionRef {
            id: "q1".to_string(),
            discipline: Some("Matematica".to_string()),
            institution: Some("FGV".to_string()),
            topics: Labels::from(vec!["Probabilidade"]),
            topics_fallback: Labels::default(),
            subjects: Labels::from(vec!["Estatistica"]),
        }
    }

    #[test]
    fn test_question_fallbacks() {
        let triples = resolve_attributions(&answer(), Some(&question()));
        assert_eq!(
            triples,
            vec![Attribution {
                topic: "Probabilidade".to_string(),
                subject: "Estatistica".to_string(),
                banca: "fgv".to_string(),
            }]
        );
    }

    #[test]
    fn test_answer_overrides_win() {
        let mut a = answer();
        a.banca_override = Some(" Cespe ".to_string());
        a.topics_override = Some(Labels::from(vec!["Crase"]));
        a.subjects_override = Some(Labels::from(vec!["Gramatica"]));

        let triples = resolve_attributions(&a, Some(&question()));
        assert_eq!(triples.len(), 1);
        assert_eq!(triples[0].topic, "Crase");
        assert_eq!(triples[0].subject, "Gramatica");
        assert_eq!(triples[0].banca, "cespe");
    }

    #[test]
    fn test_topics_fallback_field() {
        let mut q = question();
        q.topics = Labels::default();
        q.topics_fallback = Labels::from(vec!["Juros"]);

        let triples = resolve_attributions(&answer(), Some(&q));
        assert_eq!(triples[0].topic, "Juros");
    }

    #[test]
    fn test_sentinels_without_question() {
        let triples = resolve_attributions(&answer(), None);
        assert_eq!(
            triples,
            vec![Attribution {
                topic: NO_TOPIC.to_string(),
                subject: NO_SUBJECT.to_string(),
                banca: NO_BANCA.to_string(),
            }]
        );
    }

    #[test]
    fn test_equal_lengths_zip_by_index() {
        let mut q = question();
        q.topics = Labels::from(vec!["t1", "t2"]);
        q.subjects = Labels::from(vec!["s1", "s2"]);

        let triples = resolve_attributions(&answer(), Some(&q));
        assert_eq!(triples.len(), 2);
        assert_eq!((triples[0].topic.as_str(), triples[0].subject.as_str()), ("t1", "s1"));
        assert_eq!((triples[1].topic.as_str(), triples[1].subject.as_str()), ("t2", "s2"));
    }

    #[test]
    fn test_mismatched_lengths_use_first_subject() {
        let mut q = question();
        q.topics = Labels::from(vec!["t1", "t2"]);
        q.subjects = Labels::from(vec!["s1"]);

        let triples = resolve_attributions(&answer(), Some(&q));
        assert_eq!(triples.len(), 2);
        assert!(triples.iter().all(|t| t.subject == "s1"));
        assert_eq!(triples[0].topic, "t1");
        assert_eq!(triples[1].topic, "t2");
    }

    #[test]
    fn test_empty_override_falls_through() {
        let mut a = answer();
        a.topics_override = Some(Labels::default());
        a.banca_override = Some("   ".to_string());

        let triples = resolve_attributions(&a, Some(&question()));
        assert_eq!(triples[0].topic, "Probabilidade");
        assert_eq!(triples[0].banca, "fgv");
    }
}
