use super::*;
use tracing::debug;

impl Interpreter {
    /// Moves a pending promise into its terminal state and queues one job per
    /// waiting reaction, in the order they were attached. Returns false (and
    /// does nothing) if the promise was already settled.
    pub fn settle_promise(&mut self, promise_id: u64, reaction_type: PromiseReactionType, result: JsValue) -> bool {
        let Some(obj) = self.get_object(promise_id) else {
            return false;
        };
        let (reactions, is_handled) = {
            let mut o = obj.borrow_mut();
            let Some(pd) = o.promise_data.as_mut() else {
                return false;
            };
            if !pd.state.is_pending() {
                return false;
            }
            pd.state = match reaction_type {
                PromiseReactionType::Fulfill => PromiseState::Fulfilled(result.clone()),
                PromiseReactionType::Reject => PromiseState::Rejected(result.clone()),
            };
            (std::mem::take(&mut pd.reactions), pd.is_handled)
        };
        debug!(promise = promise_id, ?reaction_type, reactions = reactions.len(), "settle");

        self.run_promise_hook(PromiseHookEvent::Resolve { promise: promise_id });
        if reaction_type == PromiseReactionType::Reject && !is_handled {
            self.report_unhandled_rejection(promise_id, &result);
        }

        for reaction in reactions {
            let handler = reaction.handler(reaction_type).clone();
            self.enqueue_job(allocate_reaction_job(
                reaction_type,
                result.clone(),
                handler,
                reaction.target,
            ));
        }
        true
    }

    // §27.2.1.4 FulfillPromise(promise, value)
    pub fn fulfill_promise(&mut self, promise_id: u64, value: JsValue) -> bool {
        self.settle_promise(promise_id, PromiseReactionType::Fulfill, value)
    }

    // §27.2.1.7 RejectPromise(promise, reason)
    pub fn reject_promise(&mut self, promise_id: u64, reason: JsValue) -> bool {
        self.settle_promise(promise_id, PromiseReactionType::Reject, reason)
    }

    // §27.2.5.4.1 PerformPromiseThen, minus the result capability plumbing.
    pub fn attach_reaction(
        &mut self,
        promise_id: u64,
        on_fulfilled: ReactionHandler,
        on_rejected: ReactionHandler,
        target: ReactionTarget,
    ) {
        let Some(obj) = self.get_object(promise_id) else {
            return;
        };
        let settled = {
            let mut o = obj.borrow_mut();
            let Some(pd) = o.promise_data.as_mut() else {
                return;
            };
            let was_handled = std::mem::replace(&mut pd.is_handled, true);
            match &pd.state {
                PromiseState::Pending => None,
                PromiseState::Fulfilled(v) => Some((PromiseReactionType::Fulfill, v.clone(), was_handled)),
                PromiseState::Rejected(r) => Some((PromiseReactionType::Reject, r.clone(), was_handled)),
            }
        };

        let Some((reaction_type, argument, was_handled)) = settled else {
            let reaction = allocate_reaction(target, on_fulfilled, on_rejected);
            if let Some(pd) = obj.borrow_mut().promise_data.as_mut() {
                pd.reactions.push(reaction);
            }
            return;
        };

        if reaction_type == PromiseReactionType::Reject && !was_handled {
            self.revoke_unhandled_rejection(promise_id);
        }
        let handler = match reaction_type {
            PromiseReactionType::Fulfill => on_fulfilled,
            PromiseReactionType::Reject => on_rejected,
        };
        self.enqueue_job(allocate_reaction_job(reaction_type, argument, handler, target));
    }

    /// Sets [[PromiseIsHandled]] without attaching anything.
    pub fn mark_promise_handled(&mut self, promise_id: u64) {
        let Some(obj) = self.get_object(promise_id) else {
            return;
        };
        let newly_handled_rejection = {
            let mut o = obj.borrow_mut();
            let Some(pd) = o.promise_data.as_mut() else {
                return;
            };
            let was_handled = std::mem::replace(&mut pd.is_handled, true);
            !was_handled && matches!(pd.state, PromiseState::Rejected(_))
        };
        if newly_handled_rejection {
            self.revoke_unhandled_rejection(promise_id);
        }
    }

    // §27.2.1.3.2 Promise Resolve Functions, steps 7-16.
    pub fn resolve_promise(&mut self, promise_id: u64, resolution: JsValue) {
        if resolution.object_id() == Some(promise_id) {
            let err = self.create_type_error("A promise cannot be resolved with itself.");
            self.reject_promise(promise_id, err);
            return;
        }
        if !resolution.is_object() {
            self.fulfill_promise(promise_id, resolution);
            return;
        }
        let then = if self.is_promise_then_lookup_chain_intact(&resolution) {
            self.promise_then.clone()
        } else {
            match self.get(&resolution, "then") {
                Completion::Normal(v) => v,
                Completion::Throw(e) => {
                    self.reject_promise(promise_id, e);
                    return;
                }
            }
        };
        if !self.is_callable(&then) {
            self.fulfill_promise(promise_id, resolution);
            return;
        }
        self.enqueue_job(allocate_resolve_thenable_job(promise_id, then, resolution));
    }

    // §27.2.1.3 CreateResolvingFunctions(promise)
    pub fn create_resolving_functions(&mut self, promise_id: u64) -> (JsValue, JsValue) {
        let already_resolved = Rc::new(Cell::new(false));

        let ar1 = already_resolved.clone();
        let resolve_fn = self.create_function(JsFunction::native(
            "".to_string(),
            1,
            move |interp, _this, args| {
                if ar1.replace(true) {
                    return Completion::Normal(JsValue::Undefined);
                }
                let resolution = args.first().cloned().unwrap_or(JsValue::Undefined);
                interp.resolve_promise(promise_id, resolution);
                Completion::Normal(JsValue::Undefined)
            },
        ));

        let ar2 = already_resolved;
        let reject_fn = self.create_function(JsFunction::native(
            "".to_string(),
            1,
            move |interp, _this, args| {
                if ar2.replace(true) {
                    return Completion::Normal(JsValue::Undefined);
                }
                let reason = args.first().cloned().unwrap_or(JsValue::Undefined);
                interp.reject_promise(promise_id, reason);
                Completion::Normal(JsValue::Undefined)
            },
        ));

        (resolve_fn, reject_fn)
    }

    // §27.2.2.1 PromiseReactionJob
    pub(crate) fn run_promise_reaction_job(&mut self, job: PromiseReactionJob) {
        let PromiseReactionJob {
            reaction_type,
            argument,
            handler,
            target,
        } = job;
        let handler_result = match handler {
            ReactionHandler::Default => match reaction_type {
                PromiseReactionType::Fulfill => Ok(argument),
                PromiseReactionType::Reject => Err(argument),
            },
            ReactionHandler::Callable(f) => self
                .call_function(&f, &JsValue::Undefined, &[argument])
                .into_result(),
        };
        match target {
            ReactionTarget::Promise(id) => match handler_result {
                Ok(value) => self.resolve_promise(id, value),
                Err(reason) => {
                    self.reject_promise(id, reason);
                }
            },
            ReactionTarget::Capability(cap) => {
                let (func, arg) = match handler_result {
                    Ok(value) => (cap.resolve, value),
                    Err(reason) => (cap.reject, reason),
                };
                if let Completion::Throw(e) = self.call_function(&func, &JsValue::Undefined, &[arg]) {
                    debug!(error = %self.format_value(&e), "capability function threw");
                }
            }
        }
    }

    // §27.2.2.2 PromiseResolveThenableJob
    pub(crate) fn run_promise_resolve_thenable_job(&mut self, job: PromiseResolveThenableJob) {
        let PromiseResolveThenableJob {
            promise_to_resolve,
            then,
            thenable,
        } = job;

        // A native promise with the untouched intrinsic `then` can forward its
        // result straight into the waiting promise.
        if let Some(thenable_id) = self.promise_id(&thenable)
            && same_value(&then, &self.promise_then)
            && self.is_promise_then_lookup_chain_intact(&thenable)
            && self.is_protector_intact(ProtectorKind::SpeciesLookup)
            && !self.has_promise_hooks()
        {
            self.attach_reaction(
                thenable_id,
                ReactionHandler::Default,
                ReactionHandler::Default,
                ReactionTarget::Promise(promise_to_resolve),
            );
            return;
        }

        let (resolve_fn, reject_fn) = self.create_resolving_functions(promise_to_resolve);
        if let Completion::Throw(e) = self.call_function(&then, &thenable, &[resolve_fn, reject_fn.clone()]) {
            let _ = self.call_function(&reject_fn, &JsValue::Undefined, &[e]);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn interp() -> Interpreter {
        Interpreter::with_options(EngineOptions::isolated())
    }

    fn pending(interp: &mut Interpreter) -> u64 {
        interp.create_pending_promise(None).object_id().unwrap()
    }

    fn recorder(interp: &mut Interpreter, log: &Rc<RefCell<Vec<String>>>, tag: &'static str) -> JsValue {
        let log = log.clone();
        interp.create_function(JsFunction::native("".to_string(), 1, move |interp, _, args| {
            let arg = args.first().cloned().unwrap_or(JsValue::Undefined);
            log.borrow_mut().push(format!("{tag}:{}", interp.format_value(&arg)));
            Completion::Normal(JsValue::Undefined)
        }))
    }

    fn state_of(interp: &Interpreter, id: u64) -> String {
        interp.format_value(&JsValue::Object(JsObject { id }))
    }

    #[test]
    fn settlement_happens_once() {
        let mut interp = interp();
        let id = pending(&mut interp);
        assert!(interp.fulfill_promise(id, JsValue::Number(1.0)));
        assert!(!interp.fulfill_promise(id, JsValue::Number(2.0)));
        assert!(!interp.reject_promise(id, JsValue::from("late")));
        assert_eq!(state_of(&interp, id), "Promise { 1 }");
        assert!(interp.take_unhandled_rejections().is_empty());
    }

    #[test]
    fn reactions_drain_in_attachment_order() {
        let mut interp = interp();
        let log = Rc::new(RefCell::new(Vec::new()));
        let id = pending(&mut interp);
        for tag in ["a", "b", "c"] {
            let f = recorder(&mut interp, &log, tag);
            let derived = pending(&mut interp);
            interp.attach_reaction(
                id,
                ReactionHandler::Callable(f),
                ReactionHandler::Default,
                ReactionTarget::Promise(derived),
            );
        }
        assert_eq!(interp.pending_reaction_count(id), 3);
        interp.fulfill_promise(id, JsValue::from("v"));
        assert_eq!(interp.pending_reaction_count(id), 0);
        assert_eq!(
            interp.pending_job_kinds(),
            vec![JobKind::PromiseFulfillReaction; 3]
        );
        interp.run_jobs().unwrap();
        assert_eq!(*log.borrow(), vec!["a:v", "b:v", "c:v"]);
    }

    #[test]
    fn attaching_to_a_settled_promise_queues_immediately() {
        let mut interp = interp();
        let source = interp.create_settled_promise(PromiseReactionType::Fulfill, JsValue::Number(4.0));
        let derived = pending(&mut interp);
        interp.attach_reaction(
            source.object_id().unwrap(),
            ReactionHandler::Default,
            ReactionHandler::Default,
            ReactionTarget::Promise(derived),
        );
        assert_eq!(interp.pending_job_kinds(), vec![JobKind::PromiseFulfillReaction]);
        interp.run_jobs().unwrap();
        assert_eq!(state_of(&interp, derived), "Promise { 4 }");
    }

    #[test]
    fn late_handler_revokes_the_unhandled_report() {
        let mut interp = interp();
        let id = pending(&mut interp);
        interp.reject_promise(id, JsValue::from("boom"));
        let derived = pending(&mut interp);
        interp.attach_reaction(
            id,
            ReactionHandler::Default,
            ReactionHandler::Default,
            ReactionTarget::Promise(derived),
        );
        assert!(interp.promise_is_handled(&JsValue::Object(JsObject { id })));
        interp.run_jobs().unwrap();
        // The rejection moved on to the derived promise, which nobody handles.
        let unhandled = interp.take_unhandled_rejections();
        assert_eq!(unhandled.len(), 1);
        assert_eq!(unhandled[0].0.object_id(), Some(derived));
    }

    #[test]
    fn mark_handled_revokes_without_a_reaction() {
        let mut interp = interp();
        let id = pending(&mut interp);
        interp.reject_promise(id, JsValue::from("boom"));
        interp.mark_promise_handled(id);
        assert!(interp.take_unhandled_rejections().is_empty());
        assert!(!interp.has_pending_jobs());
    }

    #[test]
    fn thrower_sentinel_propagates_rejections() {
        let mut interp = interp();
        let id = pending(&mut interp);
        let derived = pending(&mut interp);
        interp.attach_reaction(
            id,
            ReactionHandler::Default,
            ReactionHandler::Default,
            ReactionTarget::Promise(derived),
        );
        interp.reject_promise(id, JsValue::from("e"));
        interp.run_jobs().unwrap();
        assert_eq!(state_of(&interp, derived), "Promise { <rejected> \"e\" }");
    }

    #[test]
    fn throwing_handler_rejects_the_target() {
        let mut interp = interp();
        let id = pending(&mut interp);
        let derived = pending(&mut interp);
        let thrower = interp.create_function(JsFunction::native("".to_string(), 1, |_, _, _| {
            Completion::Throw(JsValue::from("handler failed"))
        }));
        interp.attach_reaction(
            id,
            ReactionHandler::Callable(thrower),
            ReactionHandler::Default,
            ReactionTarget::Promise(derived),
        );
        interp.fulfill_promise(id, JsValue::Undefined);
        interp.run_jobs().unwrap();
        assert_eq!(
            state_of(&interp, derived),
            "Promise { <rejected> \"handler failed\" }"
        );
    }

    #[test]
    fn capability_targets_receive_the_outcome() {
        let mut interp = interp();
        let log = Rc::new(RefCell::new(Vec::new()));
        let resolve = recorder(&mut interp, &log, "resolve");
        let reject = recorder(&mut interp, &log, "reject");
        let promise = interp.create_plain_object();
        let cap = PromiseCapability {
            promise,
            resolve,
            reject,
        };
        let id = pending(&mut interp);
        interp.attach_reaction(
            id,
            ReactionHandler::Default,
            ReactionHandler::Default,
            ReactionTarget::Capability(cap),
        );
        interp.reject_promise(id, JsValue::Number(3.0));
        interp.run_jobs().unwrap();
        assert_eq!(*log.borrow(), vec!["reject:3"]);
    }

    #[test]
    fn throwing_capability_functions_do_not_stop_the_queue() {
        let mut interp = interp();
        let log = Rc::new(RefCell::new(Vec::new()));
        let thrower = interp.create_function(JsFunction::native("".to_string(), 1, |_, _, _| {
            Completion::Throw(JsValue::from("capability broke"))
        }));
        let promise = interp.create_plain_object();
        let cap = PromiseCapability {
            promise,
            resolve: thrower.clone(),
            reject: thrower,
        };
        let first = pending(&mut interp);
        interp.attach_reaction(
            first,
            ReactionHandler::Default,
            ReactionHandler::Default,
            ReactionTarget::Capability(cap),
        );
        let second = pending(&mut interp);
        let after = recorder(&mut interp, &log, "after");
        let derived = pending(&mut interp);
        interp.attach_reaction(
            second,
            ReactionHandler::Callable(after),
            ReactionHandler::Default,
            ReactionTarget::Promise(derived),
        );
        interp.fulfill_promise(first, JsValue::Number(1.0));
        interp.fulfill_promise(second, JsValue::Number(2.0));
        assert_eq!(interp.run_jobs().unwrap(), 2);
        assert_eq!(*log.borrow(), vec!["after:2"]);
        assert!(interp.take_unhandled_rejections().is_empty());
    }

    #[test]
    fn resolving_with_itself_is_a_type_error() {
        let mut interp = interp();
        let id = pending(&mut interp);
        interp.resolve_promise(id, JsValue::Object(JsObject { id }));
        assert_eq!(
            state_of(&interp, id),
            "Promise { <rejected> TypeError: A promise cannot be resolved with itself. }"
        );
    }

    #[test]
    fn resolving_functions_share_one_latch() {
        let mut interp = interp();
        let id = pending(&mut interp);
        let (resolve, reject) = interp.create_resolving_functions(id);
        interp
            .call_function(&reject, &JsValue::Undefined, &[JsValue::from("first")])
            .into_result()
            .unwrap();
        interp
            .call_function(&resolve, &JsValue::Undefined, &[JsValue::from("second")])
            .into_result()
            .unwrap();
        assert_eq!(state_of(&interp, id), "Promise { <rejected> \"first\" }");
    }

    #[test]
    fn foreign_thenables_go_through_a_job() {
        let mut interp = interp();
        let then = interp.create_function(JsFunction::native("then".to_string(), 2, |interp, _, args| {
            let resolve = args.first().cloned().unwrap_or(JsValue::Undefined);
            interp.call_function(&resolve, &JsValue::Undefined, &[JsValue::from("from thenable")])
        }));
        let thenable = interp.create_plain_object();
        interp.set(&thenable, "then", then).unwrap();
        let id = pending(&mut interp);
        interp.resolve_promise(id, thenable);
        assert_eq!(interp.pending_job_kinds(), vec![JobKind::PromiseResolveThenable]);
        assert!(interp.promise_state(&JsValue::Object(JsObject { id })).unwrap().is_pending());
        interp.run_jobs().unwrap();
        assert_eq!(state_of(&interp, id), "Promise { \"from thenable\" }");
    }

    #[test]
    fn throwing_then_getter_rejects() {
        let mut interp = interp();
        let getter = interp.create_function(JsFunction::native("get then".to_string(), 0, |_, _, _| {
            Completion::Throw(JsValue::from("no then for you"))
        }));
        let thenable = interp.create_plain_object();
        interp.define_getter(&thenable, "then", getter);
        let id = pending(&mut interp);
        interp.resolve_promise(id, thenable);
        assert!(!interp.has_pending_jobs());
        assert_eq!(state_of(&interp, id), "Promise { <rejected> \"no then for you\" }");
    }

    #[test]
    fn native_thenables_take_the_same_number_of_jobs_on_both_paths() {
        let run = |fast_paths: bool| {
            let mut interp = Interpreter::with_options(EngineOptions::isolated().with_fast_paths(fast_paths));
            let inner = interp.create_settled_promise(PromiseReactionType::Fulfill, JsValue::Number(8.0));
            let outer = pending(&mut interp);
            interp.resolve_promise(outer, inner);
            let ran = interp.run_jobs().unwrap();
            (ran, state_of(&interp, outer))
        };
        assert_eq!(run(true), run(false));
        assert_eq!(run(true), (2, "Promise { 8 }".to_string()));
    }
}
