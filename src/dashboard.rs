//! Request-scoped statistics state.
//!
//! A [`Dashboard`] owns the published aggregate for one student. Changing the
//! period issues a new [`RefreshTicket`]; only the result for the most recent
//! ticket is ever published. Changing the banca only re-filters the cached
//! aggregate.

use crate::analysis::{aggregate, filter_by_banca, BancaSelection, ReportWindow};
use crate::models::{Aggregate, BancaOption};
use crate::source::{fetch_snapshot, EventSource, Snapshot, SourceError};
use tracing::{debug, info, warn};

/// Proof that a refresh was requested; required to publish its result.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RefreshTicket {
    generation: u64,
    window: ReportWindow,
}

impl RefreshTicket {
    pub fn window(&self) -> &ReportWindow {
        &self.window
    }
}

/// A published aggregate together with the window it was built for.
#[derive(Debug, Clone)]
struct Published {
    window: ReportWindow,
    full: Aggregate,
    notice: Option<String>,
}

/// Statistics state for one student.
#[derive(Debug)]
pub struct Dashboard {
    student_id: String,
    generation: u64,
    desired: Option<ReportWindow>,
    published: Option<Published>,
    selection: BancaSelection,
}

impl Dashboard {
    pub fn new(student_id: impl Into<String>) -> Self {
        Self {
            student_id: student_id.into(),
            generation: 0,
            desired: None,
            published: None,
            selection: BancaSelection::All,
        }
    }

    pub fn student_id(&self) -> &str {
        &self.student_id
    }

    /// Ask for statistics over `window`. Supersedes every earlier ticket.
    pub fn request(&mut self, window: ReportWindow) -> RefreshTicket {
        self.generation += 1;
        self.desired = Some(window);
        debug!(
            "Refresh #{} requested for {} days ending {}",
            self.generation, window.period_days, window.today
        );
        RefreshTicket {
            generation: self.generation,
            window,
        }
    }

    /// Publish the result of a refresh.
    ///
    /// Stale tickets are discarded silently and `false` is returned. A fetch
    /// failure publishes the all-zero aggregate with a user-visible notice.
    pub fn commit(&mut self, ticket: RefreshTicket, fetched: Result<Snapshot, SourceError>) -> bool {
        if ticket.generation != self.generation || self.desired != Some(ticket.window) {
            debug!(
                "Discarding stale refresh #{} (current #{})",
                ticket.generation, self.generation
            );
            return false;
        }

        let window = ticket.window;
        let published = match fetched {
            Ok(snapshot) => Published {
                window,
                full: aggregate(&snapshot.answers, &snapshot.questions, &window),
                notice: None,
            },
            Err(e) => {
                warn!("Failed to load answers: {}", e);
                Published {
                    window,
                    full: Aggregate::empty(window.empty_buckets()),
                    notice: Some(format!(
                        "Could not load answers ({}); showing empty statistics.",
                        e
                    )),
                }
            }
        };

        info!(
            "Published statistics: {} answers, {} disciplines",
            published.full.totals.total,
            published.full.disciplines.len()
        );
        self.published = Some(published);
        true
    }

    /// Request, fetch and commit in one step.
    pub async fn refresh(&mut self, source: &dyn EventSource, window: ReportWindow) -> bool {
        let ticket = self.request(window);
        let window = *ticket.window();
        let fetched = fetch_snapshot(source, &self.student_id, window.since(), window.until()).await;
        self.commit(ticket, fetched)
    }

    /// Change the banca filter. Never triggers a fetch.
    pub fn select_banca(&mut self, selection: BancaSelection) {
        if let (BancaSelection::Banca(key), Some(published)) = (&selection, &self.published) {
            if !published.full.bancas.iter().any(|b| &b.key == key) {
                warn!("Banca '{}' has no answers in this period", key);
            }
        }
        self.selection = selection;
    }

    pub fn selection(&self) -> &BancaSelection {
        &self.selection
    }

    /// Window of the published aggregate, if any.
    pub fn window(&self) -> Option<&ReportWindow> {
        self.published.as_ref().map(|p| &p.window)
    }

    /// Notice attached to the published aggregate.
    pub fn notice(&self) -> Option<&str> {
        self.published.as_ref().and_then(|p| p.notice.as_deref())
    }

    /// Bancas available for selection in the published aggregate.
    pub fn banca_options(&self) -> &[BancaOption] {
        self.published
            .as_ref()
            .map(|p| p.full.bancas.as_slice())
            .unwrap_or(&[])
    }

    /// The unfiltered published aggregate.
    pub fn full(&self) -> Option<&Aggregate> {
        self.published.as_ref().map(|p| &p.full)
    }

    /// The published aggregate filtered by the current banca selection.
    pub fn view(&self) -> Option<Aggregate> {
        self.full().map(|full| filter_by_banca(full, &self.selection))
    }
}
