//! Banca filtering over a cached aggregate.
//!
//! Filtering never touches the raw answers: it reshapes a copy of the
//! discipline tree and recomputes the affected sums from the topics kept.

use super::normalize::normalize_banca;
use super::rollup::roll_up_discipline;
use crate::models::{Aggregate, DisciplineStat, TopicStat};
use std::convert::Infallible;
use std::fmt;
use std::str::FromStr;

/// Banca chosen in the selection control.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub enum BancaSelection {
    #[default]
    All,
    /// Normalized banca key.
    Banca(String),
}

impl BancaSelection {
    pub fn banca(raw: &str) -> Self {
        BancaSelection::Banca(normalize_banca(raw))
    }
}

impl FromStr for BancaSelection {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.trim().eq_ignore_ascii_case("all") {
            Ok(BancaSelection::All)
        } else {
            Ok(BancaSelection::banca(s))
        }
    }
}

impl fmt::Display for BancaSelection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BancaSelection::All => write!(f, "all"),
            BancaSelection::Banca(key) => write!(f, "{}", key),
        }
    }
}

/// Topics without a single attributed banca belong to every banca.
fn topic_matches(topic: &TopicStat, banca: &str) -> bool {
    topic
        .attributed_banca
        .as_deref()
        .map_or(true, |attributed| attributed == banca)
}

fn filter_discipline(discipline: &DisciplineStat, banca: &str) -> Option<DisciplineStat> {
    if !discipline.distinct_bancas.contains(banca) {
        return None;
    }

    let mut filtered = discipline.clone();
    for subject in &mut filtered.subjects {
        subject.topics.retain(|topic| topic_matches(topic, banca));
    }
    filtered.subjects.retain(|subject| !subject.topics.is_empty());

    if filtered.subjects.is_empty() {
        return None;
    }

    roll_up_discipline(&mut filtered);
    Some(filtered)
}

/// The view of `aggregate` restricted to one banca.
///
/// The discipline tree is filtered; the daily series, grand totals and banca
/// options carry over unchanged. `aggregate` itself is never modified.
pub fn filter_by_banca(aggregate: &Aggregate, selection: &BancaSelection) -> Aggregate {
    let banca = match selection {
        BancaSelection::All => return aggregate.clone(),
        BancaSelection::Banca(banca) => banca,
    };

    Aggregate {
        disciplines: aggregate
            .disciplines
            .iter()
            .filter_map(|discipline| filter_discipline(discipline, banca))
            .collect(),
        ..aggregate.clone()
    }
}
