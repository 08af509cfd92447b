//! Per-session state: one live result list plus the saved references.
//!
//! Each search kind has its own slot so the three stay mutually exclusive
//! but independently resettable. Every new search bumps the generation;
//! results carrying an older generation are dropped on arrival.

use std::future::Future;

use serde::Serialize;
use tokio::sync::Mutex;

use crate::cite::CiteError;
use crate::references::ReferenceSet;
use crate::search::DisplayedCitation;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SearchKind {
    Books,
    Doi,
    Topic,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(tag = "state", content = "detail", rename_all = "snake_case")]
pub enum ResultsState {
    #[default]
    Idle,
    Loading,
    Populated(Vec<DisplayedCitation>),
    Failed(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Generation(u64);

/// How a submitted search ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Submission {
    /// Blank input. Nothing was sent and the session is unchanged.
    Blank,
    /// A newer search started while this one was in flight.
    Superseded,
    Settled(ResultsState),
}

#[derive(Debug, Default)]
pub struct Session {
    generation: u64,
    books: ResultsState,
    doi: ResultsState,
    topic: ResultsState,
    references: ReferenceSet,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a search: clears every displayed list, marks `kind` loading.
    /// Saved references are untouched.
    pub fn begin(&mut self, kind: SearchKind) -> Generation {
        self.generation += 1;
        self.books = ResultsState::Idle;
        self.doi = ResultsState::Idle;
        self.topic = ResultsState::Idle;
        *self.slot_mut(kind) = ResultsState::Loading;
        Generation(self.generation)
    }

    /// Record a finished search. Returns false, leaving state alone, when a
    /// newer search has started since `generation` was issued.
    pub fn settle(
        &mut self,
        generation: Generation,
        kind: SearchKind,
        result: Result<Vec<DisplayedCitation>, CiteError>,
    ) -> bool {
        if generation.0 != self.generation {
            tracing::debug!(
                "Discarding stale {:?} results (generation {} < {})",
                kind, generation.0, self.generation
            );
            return false;
        }
        *self.slot_mut(kind) = match result {
            Ok(citations) => ResultsState::Populated(citations),
            Err(e) => {
                tracing::warn!("{:?} search failed: {}", kind, e);
                ResultsState::Failed(e.user_message().to_string())
            }
        };
        true
    }

    pub fn generation(&self) -> Generation {
        Generation(self.generation)
    }

    pub fn state(&self, kind: SearchKind) -> &ResultsState {
        match kind {
            SearchKind::Books => &self.books,
            SearchKind::Doi => &self.doi,
            SearchKind::Topic => &self.topic,
        }
    }

    /// The one non-idle result list, if any.
    pub fn current(&self) -> Option<(SearchKind, &ResultsState)> {
        [SearchKind::Books, SearchKind::Doi, SearchKind::Topic]
            .into_iter()
            .map(|kind| (kind, self.state(kind)))
            .find(|(_, state)| **state != ResultsState::Idle)
    }

    pub fn references(&self) -> &ReferenceSet {
        &self.references
    }

    pub fn references_mut(&mut self) -> &mut ReferenceSet {
        &mut self.references
    }

    fn slot_mut(&mut self, kind: SearchKind) -> &mut ResultsState {
        match kind {
            SearchKind::Books => &mut self.books,
            SearchKind::Doi => &mut self.doi,
            SearchKind::Topic => &mut self.topic,
        }
    }
}

/// Run one search for `input` against the shared session. Blank input is
/// refused before the session is touched. The lock is released while the
/// request is in flight.
pub async fn drive<'a, R, F>(
    session: &Mutex<Session>,
    kind: SearchKind,
    input: &'a str,
    request: R,
) -> Submission
where
    R: FnOnce(&'a str) -> F,
    F: Future<Output = Result<Vec<DisplayedCitation>, CiteError>>,
{
    if input.trim().is_empty() {
        return Submission::Blank;
    }
    let generation = session.lock().await.begin(kind);
    let result = request(input).await;
    let mut session = session.lock().await;
    if session.settle(generation, kind, result) {
        Submission::Settled(session.state(kind).clone())
    } else {
        Submission::Superseded
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::format::FormatError;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;
    use tokio::sync::oneshot;

    fn citation(text: &str) -> DisplayedCitation {
        DisplayedCitation::plain(text.to_string())
    }

    #[test]
    fn test_lifecycle() {
        let mut s = Session::new();
        assert!(s.current().is_none());

        let g = s.begin(SearchKind::Books);
        assert_eq!(s.state(SearchKind::Books), &ResultsState::Loading);

        assert!(s.settle(g, SearchKind::Books, Ok(vec![citation("A")])));
        assert_eq!(s.state(SearchKind::Books), &ResultsState::Populated(vec![citation("A")]));
        assert_eq!(s.current().map(|(k, _)| k), Some(SearchKind::Books));
    }

    #[test]
    fn test_failure_keeps_static_message() {
        let mut s = Session::new();
        let g = s.begin(SearchKind::Doi);
        s.settle(g, SearchKind::Doi, Err(CiteError::Format(FormatError::MissingTitle)));
        assert_eq!(
            s.state(SearchKind::Doi),
            &ResultsState::Failed(
                "The citation data returned was incomplete and could not be formatted.".into()
            )
        );
    }

    #[test]
    fn test_new_search_resets_other_kinds_but_not_references() {
        let mut s = Session::new();
        s.references_mut().save("Kept");
        let g = s.begin(SearchKind::Books);
        s.settle(g, SearchKind::Books, Ok(vec![citation("Book")]));

        s.begin(SearchKind::Topic);
        assert_eq!(s.state(SearchKind::Books), &ResultsState::Idle);
        assert_eq!(s.state(SearchKind::Topic), &ResultsState::Loading);
        assert_eq!(s.references().list(), vec!["Kept"]);
    }

    #[test]
    fn test_stale_results_are_discarded() {
        let mut s = Session::new();
        let old = s.begin(SearchKind::Topic);
        let new = s.begin(SearchKind::Topic);

        assert!(!s.settle(old, SearchKind::Topic, Ok(vec![citation("Old")])));
        assert_eq!(s.state(SearchKind::Topic), &ResultsState::Loading);

        assert!(s.settle(new, SearchKind::Topic, Ok(vec![citation("New")])));
        assert_eq!(s.state(SearchKind::Topic), &ResultsState::Populated(vec![citation("New")]));
    }

    #[tokio::test]
    async fn test_drive_drops_superseded_request() {
        let session = Arc::new(Mutex::new(Session::new()));
        let (tx, rx) = oneshot::channel::<()>();

        let slow = {
            let session = Arc::clone(&session);
            tokio::spawn(async move {
                drive(&session, SearchKind::Topic, "sleep", |_| async move {
                    let _ = rx.await;
                    Ok(vec![citation("Stale")])
                })
                .await
            })
        };
        // Let the slow request take its generation first.
        while session.lock().await.state(SearchKind::Topic) != &ResultsState::Loading {
            tokio::task::yield_now().await;
        }

        let fresh = drive(&session, SearchKind::Books, "dune", |_| async { Ok(vec![citation("Fresh")]) }).await;
        assert_eq!(fresh, Submission::Settled(ResultsState::Populated(vec![citation("Fresh")])));

        tx.send(()).unwrap();
        assert_eq!(slow.await.unwrap(), Submission::Superseded);

        let s = session.lock().await;
        assert_eq!(s.current(), Some((SearchKind::Books, &ResultsState::Populated(vec![citation("Fresh")]))));
        assert_eq!(s.state(SearchKind::Topic), &ResultsState::Idle);
    }

    #[tokio::test]
    async fn test_blank_submission_leaves_session_untouched() {
        let session = Mutex::new(Session::new());
        let shown = drive(&session, SearchKind::Books, "dune", |title| async move {
            Ok(vec![citation(title)])
        })
        .await;
        assert_eq!(shown, Submission::Settled(ResultsState::Populated(vec![citation("dune")])));
        let before = session.lock().await.generation();

        let called = AtomicBool::new(false);
        for blank in ["", "   ", "\n\t"] {
            let outcome = drive(&session, SearchKind::Topic, blank, |_| async {
                called.store(true, Ordering::SeqCst);
                Ok(vec![citation("Never")])
            })
            .await;
            assert_eq!(outcome, Submission::Blank);
        }

        assert!(!called.load(Ordering::SeqCst));
        let s = session.lock().await;
        assert_eq!(s.generation(), before);
        assert_eq!(s.current(), Some((SearchKind::Books, &ResultsState::Populated(vec![citation("dune")]))));
        assert_eq!(s.state(SearchKind::Topic), &ResultsState::Idle);
    }
}
