use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::error::AnalysisError;

/// Deadline and cancellation state for one `analyze()` call.
///
/// The pipeline polls [`AnalysisContext::checkpoint`] at coarse phase
/// boundaries (before the look-ahead DFA, before the product automaton,
/// before SCCs, before each pair/triple-graph exploration). Nothing here
/// is shared between calls; the cancellation flag is the only thing a
/// caller can touch concurrently.
#[derive(Debug, Default)]
pub(crate) struct AnalysisContext {
    deadline: Option<Instant>,
    cancel: Option<Arc<AtomicBool>>,
}

impl AnalysisContext {
    pub fn new(timeout: Option<Duration>, cancel: Option<Arc<AtomicBool>>) -> AnalysisContext {
        AnalysisContext {
            deadline: timeout.map(|timeout| Instant::now() + timeout),
            cancel,
        }
    }

    pub fn checkpoint(&self) -> Result<(), AnalysisError> {
        if let Some(cancel) = &self.cancel {
            if cancel.load(Ordering::Relaxed) {
                return Err(AnalysisError::Cancelled);
            }
        }
        if let Some(deadline) = self.deadline {
            if Instant::now() > deadline {
                return Err(AnalysisError::Timeout);
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unlimited_context_never_trips() {
        let ctx = AnalysisContext::default();
        assert!(ctx.checkpoint().is_ok());
    }

    #[test]
    fn cancellation_flag() {
        let flag = Arc::new(AtomicBool::new(false));
        let ctx = AnalysisContext::new(None, Some(flag.clone()));
        assert!(ctx.checkpoint().is_ok());
        flag.store(true, Ordering::Relaxed);
        assert_eq!(ctx.checkpoint(), Err(AnalysisError::Cancelled));
    }

    #[test]
    fn expired_deadline() {
        let ctx = AnalysisContext::new(Some(Duration::ZERO), None);
        std::thread::sleep(Duration::from_millis(2));
        assert_eq!(ctx.checkpoint(), Err(AnalysisError::Timeout));
    }
}
