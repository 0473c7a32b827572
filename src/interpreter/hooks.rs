use super::*;
use tracing::{debug, trace};

/// Lifecycle events reported to installed promise hooks.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PromiseHookEvent {
    /// A pending promise was allocated; `parent` is the promise that caused it.
    Init { promise: u64, parent: Option<u64> },
    /// A promise left the pending state (or was born settled).
    Resolve { promise: u64 },
    /// `promise` is awaited on behalf of `by` (debugger bookkeeping).
    HandledBy { promise: u64, by: u64 },
}

pub trait PromiseHook {
    fn on_event(&mut self, event: &PromiseHookEvent);
}

impl<F> PromiseHook for F
where
    F: FnMut(&PromiseHookEvent),
{
    fn on_event(&mut self, event: &PromiseHookEvent) {
        self(event)
    }
}

/// Sink for rejections that had no handler when they happened.
///
/// A rejection is reported once; attaching a handler later revokes it.
#[derive(Debug, Default)]
pub struct RejectionTracker {
    pending: FxHashMap<u64, JsValue>,
    order: Vec<u64>,
}

impl RejectionTracker {
    pub fn report(&mut self, promise: u64, reason: JsValue) {
        if self.pending.insert(promise, reason).is_none() {
            self.order.push(promise);
        }
    }

    pub fn revoke(&mut self, promise: u64) -> bool {
        if self.pending.remove(&promise).is_some() {
            self.order.retain(|&id| id != promise);
            return true;
        }
        false
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Drains the still-unhandled rejections in the order they were reported.
    pub fn take(&mut self) -> Vec<(u64, JsValue)> {
        let mut pending = std::mem::take(&mut self.pending);
        std::mem::take(&mut self.order)
            .into_iter()
            .filter_map(|id| pending.remove(&id).map(|reason| (id, reason)))
            .collect()
    }
}

impl Interpreter {
    pub fn add_promise_hook(&mut self, hook: impl PromiseHook + 'static) {
        self.hooks.push(Box::new(hook));
    }

    pub(crate) fn has_promise_hooks(&self) -> bool {
        !self.hooks.is_empty()
    }

    pub(crate) fn run_promise_hook(&mut self, event: PromiseHookEvent) {
        if self.hooks.is_empty() {
            return;
        }
        trace!(?event, "promise hook");
        for hook in self.hooks.iter_mut() {
            hook.on_event(&event);
        }
    }

    pub(crate) fn report_unhandled_rejection(&mut self, promise: u64, reason: &JsValue) {
        debug!(promise, reason = %self.format_value(reason), "rejection without handler");
        self.rejection_tracker.report(promise, reason.clone());
    }

    pub(crate) fn revoke_unhandled_rejection(&mut self, promise: u64) {
        if self.rejection_tracker.revoke(promise) {
            debug!(promise, "handler added after reject");
        }
    }

    /// Promises rejected without a handler that still have none, paired with
    /// their rejection reasons.
    pub fn take_unhandled_rejections(&mut self) -> Vec<(JsValue, JsValue)> {
        self.rejection_tracker
            .take()
            .into_iter()
            .map(|(id, reason)| (JsValue::Object(crate::types::JsObject { id }), reason))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tracker_reports_once_and_revokes() {
        let mut tracker = RejectionTracker::default();
        tracker.report(4, JsValue::from("a"));
        tracker.report(9, JsValue::from("b"));
        tracker.report(4, JsValue::from("again"));
        assert_eq!(tracker.len(), 2);
        assert!(tracker.revoke(9));
        assert!(!tracker.revoke(9));
        let drained = tracker.take();
        assert_eq!(drained.len(), 1);
        assert_eq!(drained[0].0, 4);
        assert_eq!(drained[0].1.to_string(), "again");
        assert!(tracker.is_empty());
    }

    #[test]
    fn closures_are_hooks() {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = seen.clone();
        let mut interp = Interpreter::with_options(EngineOptions::isolated());
        interp.add_promise_hook(move |event: &PromiseHookEvent| sink.borrow_mut().push(event.clone()));
        assert!(interp.has_promise_hooks());
        interp.run_promise_hook(PromiseHookEvent::Resolve { promise: 1 });
        assert_eq!(*seen.borrow(), vec![PromiseHookEvent::Resolve { promise: 1 }]);
    }
}
