//! Answer aggregation and statistics.
//!
//! This module turns the flat list of answers for a period into the
//! discipline → subject → topic tree, the dense daily series and the grand
//! totals, in a single pass.

use super::normalize::{banca_label, normalize_topic};
use super::resolver::resolve_attributions;
use super::rollup::roll_up;
use super::timeline::{DailySeries, ReportWindow};
use crate::models::{
    Aggregate, AnswerEvent, BancaOption, DisciplineStat, Outcome, QuestionRef, SubjectStat, Tally,
    TopicStat, NO_DISCIPLINE,
};
use std::collections::{BTreeSet, HashMap};
use tracing::{debug, warn};

/// Banca attribution of a topic while it is being built.
#[derive(Debug, Clone, PartialEq, Eq)]
enum TopicBanca {
    Single(String),
    Mixed,
}

#[derive(Debug)]
struct TopicNode {
    label: String,
    banca: TopicBanca,
    tally: Tally,
}

#[derive(Debug)]
struct SubjectNode {
    label: String,
    topics: HashMap<String, TopicNode>,
}

#[derive(Debug)]
struct DisciplineNode {
    label: String,
    subjects: HashMap<String, SubjectNode>,
    bancas: BTreeSet<String>,
}

impl DisciplineNode {
    fn new(label: &str) -> Self {
        Self {
            label: label.to_string(),
            subjects: HashMap::new(),
            bancas: BTreeSet::new(),
        }
    }

    /// Count one outcome under `subject → topic`, keyed by normalized text.
    /// The first label seen for a key is kept for display.
    fn record(&mut self, subject: &str, topic: &str, banca: &str, outcome: Outcome) {
        let subject_node = self
            .subjects
            .entry(normalize_topic(subject))
            .or_insert_with(|| SubjectNode {
                label: subject.to_string(),
                topics: HashMap::new(),
            });

        let topic_node = subject_node
            .topics
            .entry(normalize_topic(topic))
            .or_insert_with(|| TopicNode {
                label: topic.to_string(),
                banca: TopicBanca::Single(banca.to_string()),
                tally: Tally::default(),
            });

        if matches!(&topic_node.banca, TopicBanca::Single(existing) if existing != banca) {
            topic_node.banca = TopicBanca::Mixed;
        }
        topic_node.tally.record(outcome);
    }

    fn into_stat(self) -> DisciplineStat {
        let subjects = self
            .subjects
            .into_values()
            .map(|subject| SubjectStat {
                subject: subject.label,
                topics: subject
                    .topics
                    .into_values()
                    .map(|topic| TopicStat {
                        topic: topic.label,
                        attributed_banca: match topic.banca {
                            TopicBanca::Single(banca) => Some(banca),
                            TopicBanca::Mixed => None,
                        },
                        tally: topic.tally,
                    })
                    .collect(),
                tally: Tally::default(),
            })
            .collect();

        DisciplineStat {
            discipline: self.label,
            subjects,
            distinct_bancas: self.bancas,
            tally: Tally::default(),
        }
    }
}

/// Index questions by id. Later duplicates win.
fn index_questions(questions: &[QuestionRef]) -> HashMap<&str, &QuestionRef> {
    questions.iter().map(|q| (q.id.as_str(), q)).collect()
}

/// Build the full aggregate for one window.
///
/// Answers dated outside the window are ignored. Answers whose question
/// cannot be found are excluded from every count and reported through
/// `skipped_answers`.
pub fn aggregate(answers: &[AnswerEvent], questions: &[QuestionRef], window: &ReportWindow) -> Aggregate {
    let by_id = index_questions(questions);

    let mut daily = DailySeries::new(window);
    let mut disciplines: HashMap<String, DisciplineNode> = HashMap::new();
    let mut totals = Tally::default();
    let mut bancas: BTreeSet<String> = BTreeSet::new();
    let mut skipped = 0usize;
    let mut outside = 0usize;

    for answer in answers {
        let day = window.date_of(answer.occurred_at);
        if !window.contains(day) {
            outside += 1;
            continue;
        }

        let Some(question) = by_id.get(answer.question_id.as_str()).copied() else {
            skipped += 1;
            continue;
        };

        let outcome = answer.outcome();
        daily.record(day, outcome);
        totals.record(outcome);

        let discipline_label = question
            .discipline
            .as_deref()
            .map(str::trim)
            .filter(|d| !d.is_empty())
            .unwrap_or(NO_DISCIPLINE);

        let node = disciplines
            .entry(normalize_topic(discipline_label))
            .or_insert_with(|| DisciplineNode::new(discipline_label));

        for attribution in resolve_attributions(answer, Some(question)) {
            node.bancas.insert(attribution.banca.clone());
            bancas.insert(attribution.banca.clone());
            node.record(
                &attribution.subject,
                &attribution.topic,
                &attribution.banca,
                outcome,
            );
        }
    }

    if outside > 0 {
        debug!(
            "{} answers fall outside {}..={} and were ignored",
            outside,
            window.start(),
            window.today
        );
    }
    if skipped > 0 {
        warn!(
            "{} of {} answers reference unknown questions and were skipped",
            skipped,
            answers.len()
        );
    }

    let mut disciplines: Vec<DisciplineStat> =
        disciplines.into_values().map(DisciplineNode::into_stat).collect();
    roll_up(&mut disciplines);

    debug!(
        "Aggregated {} answers into {} disciplines ({} bancas)",
        totals.total,
        disciplines.len(),
        bancas.len()
    );

    Aggregate {
        daily_buckets: daily.into_buckets(),
        disciplines,
        totals: totals.into(),
        bancas: bancas
            .into_iter()
            .map(|key| BancaOption {
                label: banca_label(&key),
                key,
            })
            .collect(),
        skipped_answers: skipped,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Labels;
    use chrono::{FixedOffset, NaiveDate, TimeZone, Utc};

    fn window() -> ReportWindow {
        ReportWindow::new(
            7,
            NaiveDate::from_ymd_opt(2026, 10, 19).unwrap(),
            FixedOffset::east_opt(0).unwrap(),
        )
    }

    fn create_test_answer(id: &str, question_id: &str, is_correct: Option<bool>) -> AnswerEvent {
        AnswerEvent {
            id: id.to_string(),
            question_id: question_id.to_string(),
            student_id: "s1".to_string(),
            is_correct,
            selected_option_id: is_correct.map(|_| "o1".to_string()),
            banca_override: None,
            topics_override: None,
            subjects_override: None,
            occurred_at: Utc.with_ymd_and_hms(2026, 10, 18, 14, 0, 0).unwrap(),
        }
    }

    fn create_test_question(id: &str, discipline: &str, banca: &str, topic: &str, subject: &str) -> QuestionRef {
        QuestionRef {
            id: id.to_string(),
            discipline: Some(discipline.to_string()),
            institution: Some(banca.to_string()),
            topics: Labels::from(vec![topic]),
            topics_fallback: Labels::default(),
            subjects: Labels::from(vec![subject]),
        }
    }

    #[test]
    fn test_single_topic_scenario() {
        let questions = vec![create_test_question(
            "q1",
            "Matematica",
            "FGV",
            "Probabilidade",
            "Estatistica",
        )];
        let answers = vec![
            create_test_answer("a1", "q1", Some(true)),
            create_test_answer("a2", "q1", Some(true)),
            create_test_answer("a3", "q1", Some(false)),
        ];

        let result = aggregate(&answers, &questions, &window());

        assert_eq!(result.disciplines.len(), 1);
        let discipline = &result.disciplines[0];
        assert_eq!(discipline.discipline, "Matematica");
        assert_eq!(discipline.tally.correct, 2);
        assert_eq!(discipline.tally.incorrect, 1);
        assert_eq!(discipline.tally.total, 3);
        assert_eq!(discipline.tally.rate, 67);

        assert_eq!(discipline.subjects.len(), 1);
        let subject = &discipline.subjects[0];
        assert_eq!(subject.subject, "Estatistica");
        assert_eq!(subject.tally, discipline.tally);

        assert_eq!(subject.topics.len(), 1);
        let topic = &subject.topics[0];
        assert_eq!(topic.topic, "Probabilidade");
        assert_eq!(topic.attributed_banca.as_deref(), Some("fgv"));
        assert_eq!(topic.tally, discipline.tally);

        assert_eq!(result.totals.total, 3);
        assert_eq!(result.totals.correct, 2);
        assert_eq!(result.totals.incorrect, 1);
        assert_eq!(result.totals.rate, 67);
    }

    #[test]
    fn test_empty_period() {
        let result = aggregate(&[], &[], &window());

        assert_eq!(result.daily_buckets.len(), 8);
        assert!(result.daily_buckets.iter().all(|b| b.answered == 0));
        assert!(result.disciplines.is_empty());
        assert_eq!(result.totals, Default::default());
        assert!(result.bancas.is_empty());
    }

    #[test]
    fn test_blank_answer_counts_toward_total_only() {
        let questions = vec![create_test_question("q1", "Portugues", "FCC", "Crase", "Gramatica")];
        let answers = vec![
            create_test_answer("a1", "q1", Some(true)),
            create_test_answer("a2", "q1", None),
        ];

        let result = aggregate(&answers, &questions, &window());
        let tally = result.disciplines[0].tally;

        assert_eq!(tally.blank, 1);
        assert_eq!(tally.correct, 1);
        assert_eq!(tally.incorrect, 0);
        assert_eq!(tally.total, 2);
        assert_eq!(tally.rate, 50);

        let day = result
            .daily_buckets
            .iter()
            .find(|b| b.date == NaiveDate::from_ymd_opt(2026, 10, 18).unwrap())
            .unwrap();
        assert_eq!(day.answered, 1);
        assert_eq!(day.correct, 1);
    }

    #[test]
    fn test_unknown_question_is_skipped_everywhere() {
        let questions = vec![create_test_question("q1", "Matematica", "FGV", "Juros", "Financeira")];
        let answers = vec![
            create_test_answer("a1", "q1", Some(true)),
            create_test_answer("a2", "missing", Some(true)),
        ];

        let result = aggregate(&answers, &questions, &window());

        assert_eq!(result.skipped_answers, 1);
        assert_eq!(result.totals.total, 1);
        assert_eq!(result.disciplines[0].tally.total, 1);
        let answered: u64 = result.daily_buckets.iter().map(|b| b.answered).sum();
        assert_eq!(answered, 1);
    }

    #[test]
    fn test_topic_variants_merge_under_first_label() {
        let questions = vec![
            create_test_question("q1", "Matematica", "FGV", "Análise Combinatória", "Contagem"),
            create_test_question("q2", "Matematica", "FGV", "analise combinatoria.", "contagem"),
        ];
        let answers = vec![
            create_test_answer("a1", "q1", Some(true)),
            create_test_answer("a2", "q2", Some(false)),
        ];

        let result = aggregate(&answers, &questions, &window());
        let subjects = &result.disciplines[0].subjects;

        assert_eq!(subjects.len(), 1);
        assert_eq!(subjects[0].subject, "Contagem");
        assert_eq!(subjects[0].topics.len(), 1);
        assert_eq!(subjects[0].topics[0].topic, "Análise Combinatória");
        assert_eq!(subjects[0].topics[0].tally.total, 2);
    }

    #[test]
    fn test_mixed_bancas_unset_topic_attribution() {
        let questions = vec![
            create_test_question("q1", "Direito", "FGV", "Licitacao", "Administrativo"),
            create_test_question("q2", "Direito", "Cespe", "Licitacao", "Administrativo"),
        ];
        let answers = vec![
            create_test_answer("a1", "q1", Some(true)),
            create_test_answer("a2", "q2", Some(true)),
        ];

        let result = aggregate(&answers, &questions, &window());
        let discipline = &result.disciplines[0];

        assert_eq!(discipline.subjects[0].topics[0].attributed_banca, None);
        assert_eq!(
            discipline.distinct_bancas.iter().cloned().collect::<Vec<_>>(),
            vec!["cespe".to_string(), "fgv".to_string()]
        );
        assert_eq!(
            result.bancas,
            vec![
                BancaOption { key: "cespe".to_string(), label: "CESPE".to_string() },
                BancaOption { key: "fgv".to_string(), label: "FGV".to_string() },
            ]
        );
    }

    #[test]
    fn test_mismatched_topic_subject_lengths() {
        let mut question = create_test_question("q1", "Matematica", "FGV", "t1", "s1");
        question.topics = Labels::from(vec!["t1", "t2"]);
        let answers = vec![create_test_answer("a1", "q1", Some(true))];

        let result = aggregate(&answers, &[question], &window());
        let discipline = &result.disciplines[0];

        assert_eq!(discipline.subjects.len(), 1);
        let topics: Vec<_> = discipline.subjects[0].topics.iter().map(|t| t.topic.as_str()).collect();
        assert_eq!(topics, vec!["t1", "t2"]);
        // One answer, two attributions: the tree counts triples, totals count answers.
        assert_eq!(discipline.tally.total, 2);
        assert_eq!(result.totals.total, 1);
    }

    #[test]
    fn test_answers_outside_window_are_ignored() {
        let questions = vec![create_test_question("q1", "Matematica", "FGV", "Juros", "Financeira")];
        let mut after_today = create_test_answer("a1", "q1", Some(true));
        after_today.occurred_at = Utc.with_ymd_and_hms(2026, 10, 25, 9, 0, 0).unwrap();
        let mut before_start = create_test_answer("a2", "q1", Some(false));
        before_start.occurred_at = Utc.with_ymd_and_hms(2026, 10, 11, 23, 59, 59).unwrap();
        let mut unknown_later = create_test_answer("a3", "missing", Some(true));
        unknown_later.occurred_at = Utc.with_ymd_and_hms(2026, 10, 20, 0, 0, 0).unwrap();
        let inside = create_test_answer("a4", "q1", Some(false));

        let result = aggregate(&[after_today, before_start, unknown_later, inside], &questions, &window());

        assert_eq!(result.totals.total, 1);
        assert_eq!(result.totals.correct, 0);
        assert_eq!(result.totals.incorrect, 1);
        assert_eq!(result.disciplines.len(), 1);
        assert_eq!(result.disciplines[0].tally.total, 1);
        assert_eq!(result.skipped_answers, 0);

        let answered: u64 = result.daily_buckets.iter().map(|b| b.answered).sum();
        assert_eq!(answered, result.totals.correct + result.totals.incorrect);
    }

    #[test]
    fn test_missing_discipline_uses_sentinel() {
        let mut question = create_test_question("q1", "", "FGV", "t1", "s1");
        question.discipline = None;
        let answers = vec![create_test_answer("a1", "q1", Some(false))];

        let result = aggregate(&answers, &[question], &window());
        assert_eq!(result.disciplines[0].discipline, NO_DISCIPLINE);
    }
}
