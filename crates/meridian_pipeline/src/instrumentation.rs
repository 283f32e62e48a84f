//! Phase instrumentation contributed by plugins.
//!
//! A plugin may carry an [`Instrumentation`] value. When a phase starts, the
//! orchestrator calls [`Instrumentation::enter`] and keeps the returned
//! [`PhaseGuard`] until the phase settles, then finishes it with the
//! [`PhaseOutcome`].
//!
//! Instrumentation from several plugins is merged into one
//! [`InstrumentationChain`]: guards are entered in plugin order and finished
//! in reverse, so an earlier plugin's instrumentation wraps a later one's.
//! Merging chains flattens them, which keeps the merge associative.

use core::fmt;
use std::sync::Arc;

use meridian_core::{PipelineError, RequestContext};

use crate::registry::Phase;

/// How a phase ended.
#[derive(Debug, Clone, Copy)]
pub enum PhaseOutcome<'a> {
    /// The phase returned normally.
    Completed,
    /// The phase returned an error.
    Failed(&'a PipelineError),
}

impl<'a> PhaseOutcome<'a> {
    /// Derives the outcome from a phase result.
    #[must_use]
    pub fn from_result<T>(result: &'a Result<T, PipelineError>) -> Self {
        match result {
            Ok(_) => Self::Completed,
            Err(err) => Self::Failed(err),
        }
    }

    /// Returns true for [`PhaseOutcome::Failed`].
    #[must_use]
    pub fn is_failed(&self) -> bool {
        matches!(self, Self::Failed(_))
    }
}

/// Callback run when an instrumented phase ends.
pub struct PhaseGuard {
    finish: Box<dyn FnOnce(PhaseOutcome<'_>) + Send>,
}

impl PhaseGuard {
    /// Wraps the completion callback.
    #[must_use]
    pub fn new<F>(finish: F) -> Self
    where
        F: FnOnce(PhaseOutcome<'_>) + Send + 'static,
    {
        Self {
            finish: Box::new(finish),
        }
    }

    /// Completes the guard.
    pub fn finish(self, outcome: PhaseOutcome<'_>) {
        (self.finish)(outcome);
    }
}

impl fmt::Debug for PhaseGuard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PhaseGuard").finish_non_exhaustive()
    }
}

/// Observes phase boundaries.
pub trait Instrumentation: Send + Sync + 'static {
    /// Called when `phase` starts. Returning `None` skips the exit callback.
    fn enter(&self, phase: Phase, context: &RequestContext) -> Option<PhaseGuard>;
}

impl<F> Instrumentation for F
where
    F: Fn(Phase, &RequestContext) -> Option<PhaseGuard> + Send + Sync + 'static,
{
    fn enter(&self, phase: Phase, context: &RequestContext) -> Option<PhaseGuard> {
        self(phase, context)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// InstrumentationChain
// ─────────────────────────────────────────────────────────────────────────────

/// Ordered merge of plugin instrumentation.
#[derive(Clone, Default)]
pub struct InstrumentationChain {
    links: Vec<Arc<dyn Instrumentation>>,
}

impl InstrumentationChain {
    /// Creates an empty chain.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends one instrumentation value.
    pub fn push(&mut self, instrumentation: Arc<dyn Instrumentation>) {
        self.links.push(instrumentation);
    }

    /// Appends every link of `other`, after the links already present.
    pub fn merge(&mut self, other: &Self) {
        self.links.extend(other.links.iter().cloned());
    }

    /// Number of merged instrumentation values.
    #[must_use]
    pub fn len(&self) -> usize {
        self.links.len()
    }

    /// Returns true if nothing was merged.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.links.is_empty()
    }

    /// Enters `phase` on every link, in order.
    #[must_use]
    pub fn enter_all(&self, phase: Phase, context: &RequestContext) -> ChainGuard {
        ChainGuard {
            guards: self
                .links
                .iter()
                .filter_map(|link| link.enter(phase, context))
                .collect(),
        }
    }
}

impl Instrumentation for InstrumentationChain {
    fn enter(&self, phase: Phase, context: &RequestContext) -> Option<PhaseGuard> {
        let guard = self.enter_all(phase, context);
        (!guard.is_empty()).then(|| PhaseGuard::new(move |outcome| guard.finish(outcome)))
    }
}

impl fmt::Debug for InstrumentationChain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InstrumentationChain")
            .field("links", &self.links.len())
            .finish()
    }
}

/// Guards collected by [`InstrumentationChain::enter_all`].
#[derive(Debug, Default)]
pub struct ChainGuard {
    guards: Vec<PhaseGuard>,
}

impl ChainGuard {
    /// Returns true if no link returned a guard.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.guards.is_empty()
    }

    /// Finishes every guard, last entered first.
    pub fn finish(self, outcome: PhaseOutcome<'_>) {
        for guard in self.guards.into_iter().rev() {
            guard.finish(outcome);
        }
    }
}

#[cfg(test)]
mod tests {
    use parking_lot::Mutex;

    use super::*;

    fn recorder(tag: &'static str, log: &Arc<Mutex<Vec<String>>>) -> Arc<dyn Instrumentation> {
        let log = Arc::clone(log);
        Arc::new(move |phase: Phase, _ctx: &RequestContext| -> Option<PhaseGuard> {
            log.lock().push(format!("enter {tag} {phase}"));
            let log = Arc::clone(&log);
            Some(PhaseGuard::new(move |outcome| {
                let state = if outcome.is_failed() { "failed" } else { "ok" };
                log.lock().push(format!("exit {tag} {state}"));
            }))
        })
    }

    #[test]
    fn enters_in_order_and_exits_in_reverse() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut chain = InstrumentationChain::new();
        chain.push(recorder("a", &log));
        chain.push(recorder("b", &log));

        let guard = chain.enter_all(Phase::Parse, &RequestContext::new());
        guard.finish(PhaseOutcome::Completed);

        assert_eq!(
            *log.lock(),
            ["enter a parse", "enter b parse", "exit b ok", "exit a ok"]
        );
    }

    #[test]
    fn merge_is_associative() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let (a, b, c) = (recorder("a", &log), recorder("b", &log), recorder("c", &log));

        let mut left = InstrumentationChain::new();
        left.push(Arc::clone(&a));
        left.push(Arc::clone(&b));
        let mut tail = InstrumentationChain::new();
        tail.push(Arc::clone(&c));
        left.merge(&tail);

        let mut right = InstrumentationChain::new();
        right.push(a);
        let mut rest = InstrumentationChain::new();
        rest.push(b);
        rest.push(c);
        right.merge(&rest);

        let error = PipelineError::execution("boom");
        left.enter_all(Phase::Execute, &RequestContext::new())
            .finish(PhaseOutcome::Failed(&error));
        let first: Vec<String> = log.lock().drain(..).collect();
        right
            .enter_all(Phase::Execute, &RequestContext::new())
            .finish(PhaseOutcome::Failed(&error));
        let second: Vec<String> = log.lock().drain(..).collect();

        assert_eq!(first, second);
        assert_eq!(first.last().map(String::as_str), Some("exit a failed"));
    }

    #[test]
    fn links_may_skip_the_exit_callback() {
        let mut chain = InstrumentationChain::new();
        chain.push(Arc::new(|_phase: Phase, _ctx: &RequestContext| -> Option<PhaseGuard> {
            None
        }));
        assert_eq!(chain.len(), 1);
        assert!(chain.enter(Phase::Validate, &RequestContext::new()).is_none());
    }

    #[test]
    fn outcome_from_result() {
        let ok: Result<(), PipelineError> = Ok(());
        let err: Result<(), PipelineError> = Err(PipelineError::NoParseResult);
        assert!(!PhaseOutcome::from_result(&ok).is_failed());
        assert!(PhaseOutcome::from_result(&err).is_failed());
    }
}
