//! Parent sums, rates and deterministic ordering for the statistics tree.

use super::normalize::normalize_topic;
use crate::models::{rate, DisciplineStat, SubjectStat, Tally, TopicStat};
use std::cmp::Ordering;

/// Order labels by merge key, then by the label itself.
fn by_label(a: &str, b: &str) -> Ordering {
    normalize_topic(a)
        .cmp(&normalize_topic(b))
        .then_with(|| a.cmp(b))
}

fn refresh_topic(topic: &mut TopicStat) {
    topic.tally.rate = rate(topic.tally.correct, topic.tally.total);
}

/// Recompute a subject from its topics and sort them.
pub fn roll_up_subject(subject: &mut SubjectStat) {
    subject.topics.iter_mut().for_each(refresh_topic);
    subject.topics.sort_by(|a, b| by_label(&a.topic, &b.topic));
    subject.tally = Tally::sum(subject.topics.iter().map(|t| &t.tally));
}

/// Recompute a discipline from its subjects (and their topics) and sort them.
pub fn roll_up_discipline(discipline: &mut DisciplineStat) {
    discipline.subjects.iter_mut().for_each(roll_up_subject);
    discipline
        .subjects
        .sort_by(|a, b| by_label(&a.subject, &b.subject));
    discipline.tally = Tally::sum(discipline.subjects.iter().map(|s| &s.tally));
}

/// Recompute every level bottom-up and sort disciplines by name.
pub fn roll_up(disciplines: &mut [DisciplineStat]) {
    disciplines.iter_mut().for_each(roll_up_discipline);
    disciplines.sort_by(|a, b| by_label(&a.discipline, &b.discipline));
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;

    fn topic(name: &str, correct: u64, incorrect: u64, blank: u64) -> TopicStat {
        TopicStat {
            topic: name.to_string(),
            attributed_banca: Some("fgv".to_string()),
            tally: Tally {
                correct,
                incorrect,
                blank,
                total: correct + incorrect + blank,
                rate: 0,
            },
        }
    }

    fn subject(name: &str, topics: Vec<TopicStat>) -> SubjectStat {
        SubjectStat {
            subject: name.to_string(),
            topics,
            tally: Tally::default(),
        }
    }

    fn discipline(name: &str, subjects: Vec<SubjectStat>) -> DisciplineStat {
        DisciplineStat {
            discipline: name.to_string(),
            subjects,
            distinct_bancas: BTreeSet::from(["fgv".to_string()]),
            tally: Tally::default(),
        }
    }

    fn assert_consistent(tally: &Tally) {
        assert_eq!(tally.total, tally.correct + tally.incorrect + tally.blank);
        assert_eq!(tally.rate, rate(tally.correct, tally.total));
    }

    #[test]
    fn test_parent_sums_match_children() {
        let mut tree = vec![discipline(
            "Matematica",
            vec![
                subject("Estatistica", vec![topic("Media", 3, 1, 0), topic("Moda", 0, 2, 1)]),
                subject("Algebra", vec![topic("Matrizes", 1, 0, 0)]),
            ],
        )];

        roll_up(&mut tree);

        let discipline = &tree[0];
        assert_eq!(discipline.tally.correct, 4);
        assert_eq!(discipline.tally.incorrect, 3);
        assert_eq!(discipline.tally.blank, 1);
        assert_eq!(discipline.tally.total, 8);
        assert_eq!(discipline.tally.rate, 50);
        assert_consistent(&discipline.tally);

        for subject in &discipline.subjects {
            assert_consistent(&subject.tally);
            assert_eq!(
                subject.tally.total,
                subject.topics.iter().map(|t| t.tally.total).sum::<u64>()
            );
            for topic in &subject.topics {
                assert_consistent(&topic.tally);
            }
        }
    }

    #[test]
    fn test_sorting_ignores_case_and_accents() {
        let mut tree = vec![
            discipline("Portugues", vec![subject("x", vec![topic("a", 1, 0, 0)])]),
            discipline(
                "Matematica",
                vec![
                    subject("geometria", vec![topic("b", 1, 0, 0)]),
                    subject("Álgebra", vec![topic("Zeros", 1, 0, 0), topic("área", 1, 0, 0)]),
                ],
            ),
        ];

        roll_up(&mut tree);

        assert_eq!(tree[0].discipline, "Matematica");
        assert_eq!(tree[1].discipline, "Portugues");
        assert_eq!(tree[0].subjects[0].subject, "Álgebra");
        assert_eq!(tree[0].subjects[1].subject, "geometria");
        assert_eq!(tree[0].subjects[0].topics[0].topic, "área");
        assert_eq!(tree[0].subjects[0].topics[1].topic, "Zeros");
    }

    #[test]
    fn test_empty_nodes_have_zero_rate() {
        let mut tree = vec![discipline("Vazia", vec![subject("Nada", vec![])])];
        roll_up(&mut tree);
        assert_eq!(tree[0].tally, Tally::default());
    }
}
