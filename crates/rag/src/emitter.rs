//! Progress events broadcast while a reply is being built.

use crate::query::Query;
use serde::Serialize;
use std::sync::{Arc, Mutex};

/// A sub-question and the answer produced for it.
#[derive(Debug, Clone, PartialEq)]
pub struct SubqueryAnswer {
    pub subquery: Query,
    /// Empty when no supporting documents were found
    pub answer: String,
}

/// Intermediate pipeline artifacts.
#[derive(Debug, Clone)]
pub enum ProgressEvent {
    /// Sub-questions generated by the planner
    Subqueries(Vec<Query>),
    /// Every sub-question with its answer, before merging
    Answers(Vec<SubqueryAnswer>),
    /// Raw label returned by the follow-up classification
    ContextDecision(String),
}

impl ProgressEvent {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Subqueries(_) => "subqueries",
            Self::Answers(_) => "answers",
            Self::ContextDecision(_) => "context_decision",
        }
    }

    /// JSON view of the event for transport to a client.
    pub fn to_json(&self) -> serde_json::Value {
        #[derive(Serialize)]
        struct Pair<'a> {
            subquery: &'a str,
            answer: &'a str,
        }

        let payload = match self {
            Self::Subqueries(queries) => {
                serde_json::json!(queries.iter().map(Query::text).collect::<Vec<_>>())
            }
            Self::Answers(pairs) => serde_json::json!(pairs
                .iter()
                .map(|p| Pair {
                    subquery: p.subquery.text(),
                    answer: &p.answer,
                })
                .collect::<Vec<_>>()),
            Self::ContextDecision(label) => serde_json::json!(label),
        };

        serde_json::json!({ "event": self.kind(), "data": payload })
    }
}

/// Listener callback.
pub type Listener = Arc<dyn Fn(&ProgressEvent) + Send + Sync>;

/// Synchronous one-to-many event sink.
///
/// Listeners run on the emitting task, in registration order. Nothing is
/// buffered: a listener only sees events emitted after it subscribed.
#[derive(Default)]
pub struct ProgressEmitter {
    listeners: Mutex<Vec<Listener>>,
}

impl ProgressEmitter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a listener.
    pub fn subscribe(&self, listener: impl Fn(&ProgressEvent) + Send + Sync + 'static) {
        self.lock().push(Arc::new(listener));
    }

    /// Deliver an event to every current listener.
    pub fn emit(&self, event: ProgressEvent) {
        // Snapshot so listeners may subscribe without deadlocking
        let listeners: Vec<Listener> = self.lock().clone();

        tracing::debug!(
            event = event.kind(),
            listeners = listeners.len(),
            "Progress event"
        );

        for listener in &listeners {
            listener(&event);
        }
    }

    pub fn listener_count(&self) -> usize {
        self.lock().len()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<Listener>> {
        self.listeners
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl std::fmt::Debug for ProgressEmitter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProgressEmitter")
            .field("listeners", &self.listener_count())
            .finish()
    }
}
