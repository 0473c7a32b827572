use super::*;

/// How a combinator wraps each element: the built-in PromiseResolve when the
/// constructor's `resolve` is known to be the intrinsic one, or whatever
/// `C.resolve` turned out to be.
#[derive(Clone, Debug)]
pub enum PromiseResolveFunction {
    Builtin,
    Callable(JsValue),
}

impl Interpreter {
    /// Calls `receiver.then(...args)`. When the receiver is a native promise
    /// on the intrinsic prototype and the then-protector holds, the `then`
    /// property read is skipped. Throws propagate to the caller.
    pub fn invoke_then(&mut self, receiver: &JsValue, args: &[JsValue]) -> Completion {
        if self.is_promise_then_lookup_chain_intact(receiver) {
            let on_fulfilled = args.first().cloned().unwrap_or(JsValue::Undefined);
            let on_rejected = args.get(1).cloned().unwrap_or(JsValue::Undefined);
            return self.promise_then(receiver, &on_fulfilled, &on_rejected);
        }
        let then = match self.get(receiver, "then") {
            Completion::Normal(v) => v,
            other => return other,
        };
        self.call_function(&then, receiver, args)
    }

    // §27.2.5.4 Promise.prototype.then(onFulfilled, onRejected)
    pub(crate) fn promise_then(
        &mut self,
        this: &JsValue,
        on_fulfilled: &JsValue,
        on_rejected: &JsValue,
    ) -> Completion {
        let Some(promise_id) = self.promise_id(this) else {
            let msg = format!(
                "Method Promise.prototype.then called on incompatible receiver {}",
                self.format_value(this)
            );
            return Completion::Throw(self.create_type_error(&msg));
        };
        let ctor = match self.species_constructor(this) {
            Ok(c) => c,
            Err(e) => return Completion::Throw(e),
        };
        let (result, target) = if self.is_intrinsic_promise_constructor(&ctor) {
            let derived = self.new_pending_promise(Some(promise_id));
            (
                JsValue::Object(JsObject { id: derived }),
                ReactionTarget::Promise(derived),
            )
        } else {
            match self.new_promise_capability(&ctor) {
                Ok(cap) => (cap.promise.clone(), ReactionTarget::Capability(cap)),
                Err(e) => return Completion::Throw(e),
            }
        };
        let on_fulfilled = ReactionHandler::from_argument(self, on_fulfilled);
        let on_rejected = ReactionHandler::from_argument(self, on_rejected);
        self.attach_reaction(promise_id, on_fulfilled, on_rejected, target);
        Completion::Normal(result)
    }

    // §7.3.22 SpeciesConstructor(O, %Promise%)
    pub fn species_constructor(&mut self, promise: &JsValue) -> Result<JsValue, JsValue> {
        let default = self.promise_constructor.clone();
        if self.is_promise_species_lookup_chain_intact(promise) {
            return Ok(default);
        }
        let ctor = self.get(promise, "constructor").into_result()?;
        if ctor.is_undefined() {
            return Ok(default);
        }
        if !ctor.is_object() {
            return Err(self.create_type_error("The .constructor property is not an object"));
        }
        let species = self.get(&ctor, SYMBOL_SPECIES).into_result()?;
        if species.is_nullish() {
            return Ok(default);
        }
        if self.is_constructor(&species) {
            return Ok(species);
        }
        Err(self.create_type_error("object.constructor[Symbol.species] is not a constructor"))
    }

    // §27.2.1.5 NewPromiseCapability(C)
    pub fn new_promise_capability(&mut self, ctor: &JsValue) -> Result<PromiseCapability, JsValue> {
        if !self.is_constructor(ctor) {
            let msg = format!("{} is not a constructor", self.format_value(ctor));
            return Err(self.create_type_error(&msg));
        }
        if self.is_intrinsic_promise_constructor(ctor) {
            let id = self.new_pending_promise(None);
            let (resolve, reject) = self.create_resolving_functions(id);
            return Ok(PromiseCapability {
                promise: JsValue::Object(JsObject { id }),
                resolve,
                reject,
            });
        }

        let slots = Rc::new(RefCell::new((JsValue::Undefined, JsValue::Undefined)));
        let captured = slots.clone();
        let executor = self.create_function(JsFunction::native(
            "".to_string(),
            2,
            move |interp, _this, args| {
                let already_set = {
                    let slots = captured.borrow();
                    !slots.0.is_undefined() || !slots.1.is_undefined()
                };
                if already_set {
                    let err = interp.create_type_error(
                        "Promise executor has already been invoked with non-undefined arguments",
                    );
                    return Completion::Throw(err);
                }
                let resolve = args.first().cloned().unwrap_or(JsValue::Undefined);
                let reject = args.get(1).cloned().unwrap_or(JsValue::Undefined);
                *captured.borrow_mut() = (resolve, reject);
                Completion::Normal(JsValue::Undefined)
            },
        ));

        let promise = self.construct(ctor, &[executor]).into_result()?;
        let (resolve, reject) = slots.borrow().clone();
        if !self.is_callable(&resolve) {
            return Err(self.create_type_error("Promise resolve function is not callable"));
        }
        if !self.is_callable(&reject) {
            return Err(self.create_type_error("Promise reject function is not callable"));
        }
        Ok(PromiseCapability {
            promise,
            resolve,
            reject,
        })
    }

    // §27.2.4.7.1 PromiseResolve(C, x)
    pub fn promise_resolve(&mut self, ctor: &JsValue, value: &JsValue) -> Result<JsValue, JsValue> {
        if self.is_promise(value) {
            let value_ctor = if self.is_promise_species_lookup_chain_intact(value) {
                self.promise_constructor.clone()
            } else {
                self.get(value, "constructor").into_result()?
            };
            if same_value(&value_ctor, ctor) {
                return Ok(value.clone());
            }
        }
        if self.is_intrinsic_promise_constructor(ctor) && !value.is_object() {
            return Ok(self.create_settled_promise(PromiseReactionType::Fulfill, value.clone()));
        }
        let cap = self.new_promise_capability(ctor)?;
        self.call_function(&cap.resolve, &JsValue::Undefined, &[value.clone()])
            .into_result()?;
        Ok(cap.promise)
    }

    // §27.2.4.1.1 GetPromiseResolve(promiseConstructor)
    pub fn promise_resolve_function(&mut self, ctor: &JsValue) -> Result<PromiseResolveFunction, JsValue> {
        if self.is_promise_resolve_lookup_chain_intact(ctor) {
            return Ok(PromiseResolveFunction::Builtin);
        }
        let resolve = self.get(ctor, "resolve").into_result()?;
        if !self.is_callable(&resolve) {
            return Err(self.create_type_error("Promise resolve or reject function is not callable"));
        }
        Ok(PromiseResolveFunction::Callable(resolve))
    }

    pub fn call_resolve(
        &mut self,
        ctor: &JsValue,
        resolve: &PromiseResolveFunction,
        value: JsValue,
    ) -> Result<JsValue, JsValue> {
        match resolve {
            PromiseResolveFunction::Builtin => self.promise_resolve(ctor, &value),
            PromiseResolveFunction::Callable(f) => self.call_function(f, ctor, &[value]).into_result(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn interp(fast_paths: bool) -> Interpreter {
        Interpreter::with_options(EngineOptions::isolated().with_fast_paths(fast_paths))
    }

    fn noop(interp: &mut Interpreter) -> JsValue {
        interp.create_function(JsFunction::native("".to_string(), 1, |_, _, _| {
            Completion::Normal(JsValue::Undefined)
        }))
    }

    #[test]
    fn invoke_then_matches_on_both_paths() {
        let outcome = |fast_paths: bool| {
            let mut interp = interp(fast_paths);
            let p = interp.create_settled_promise(PromiseReactionType::Fulfill, JsValue::Number(2.0));
            let on_fulfilled = noop(&mut interp);
            let derived = interp.invoke_then(&p, &[on_fulfilled]).into_result().unwrap();
            let queued = interp.pending_job_kinds();
            interp.run_jobs().unwrap();
            (queued, interp.format_value(&derived))
        };
        assert_eq!(outcome(true), outcome(false));
        assert_eq!(
            outcome(true),
            (
                vec![JobKind::PromiseFulfillReaction],
                "Promise { undefined }".to_string()
            )
        );
    }

    #[test]
    fn invoke_then_errors_match_on_both_paths() {
        let message = |fast_paths: bool| {
            let mut interp = interp(fast_paths);
            let err = interp
                .invoke_then(&JsValue::Number(1.0), &[])
                .into_result()
                .unwrap_err();
            interp.format_value(&err)
        };
        assert_eq!(message(true), message(false));
        assert_eq!(message(true), "TypeError: undefined is not a function");
    }

    #[test]
    fn invoke_then_honours_an_own_then() {
        let mut interp = interp(true);
        let p = interp.create_pending_promise(None);
        let custom = interp.create_function(JsFunction::native("then".to_string(), 2, |_, _, _| {
            Completion::Normal(JsValue::from("custom"))
        }));
        interp.set(&p, "then", custom).unwrap();
        assert!(!interp.is_protector_intact(ProtectorKind::ThenLookup));
        let got = interp.invoke_then(&p, &[]).into_result().unwrap();
        assert_eq!(got.to_string(), "custom");
    }

    #[test]
    fn then_rejects_incompatible_receivers() {
        let mut interp = interp(true);
        let then = interp.promise_then_function();
        let plain = interp.create_plain_object();
        let err = interp.call_function(&then, &plain, &[]).into_result().unwrap_err();
        assert_eq!(
            interp.format_value(&err),
            "TypeError: Method Promise.prototype.then called on incompatible receiver {}"
        );
    }

    #[test]
    fn then_marks_the_receiver_handled_and_parents_the_derived_promise() {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = seen.clone();
        let mut interp = interp(true);
        interp.add_promise_hook(move |e: &PromiseHookEvent| sink.borrow_mut().push(e.clone()));
        let p = interp.create_pending_promise(None);
        let derived = interp.invoke_then(&p, &[]).into_result().unwrap();
        assert!(interp.promise_is_handled(&p));
        assert_eq!(
            seen.borrow().last(),
            Some(&PromiseHookEvent::Init {
                promise: derived.object_id().unwrap(),
                parent: p.object_id(),
            })
        );
    }

    #[test]
    fn species_slow_path_validates_constructor() {
        let mut interp = interp(true);
        let p = interp.create_pending_promise(None);
        interp.set(&p, "constructor", JsValue::Number(1.0)).unwrap();
        assert!(!interp.is_protector_intact(ProtectorKind::SpeciesLookup));
        let err = interp.species_constructor(&p).unwrap_err();
        assert_eq!(
            interp.format_value(&err),
            "TypeError: The .constructor property is not an object"
        );

        let q = interp.create_pending_promise(None);
        let ctor = interp.create_plain_object();
        interp.set(&ctor, SYMBOL_SPECIES, JsValue::Null).unwrap();
        interp.set(&q, "constructor", ctor).unwrap();
        let species = interp.species_constructor(&q).unwrap();
        assert!(same_value(&species, &interp.promise_constructor()));
    }

    #[test]
    fn capabilities_from_foreign_constructors() {
        let mut interp = interp(true);
        let ctor = interp.create_function(JsFunction::constructor("Deferred".to_string(), 1, |interp, _, args| {
            let executor = args.first().cloned().unwrap_or(JsValue::Undefined);
            let resolve = interp.create_function(JsFunction::native("res".to_string(), 1, |_, _, _| {
                Completion::Normal(JsValue::Undefined)
            }));
            let reject = interp.create_function(JsFunction::native("rej".to_string(), 1, |_, _, _| {
                Completion::Normal(JsValue::Undefined)
            }));
            if let Completion::Throw(e) = interp.call_function(&executor, &JsValue::Undefined, &[resolve, reject]) {
                return Completion::Throw(e);
            }
            Completion::Normal(interp.create_plain_object())
        }));
        let cap = interp.new_promise_capability(&ctor).unwrap();
        assert!(!interp.is_promise(&cap.promise));
        assert_eq!(interp.format_value(&cap.resolve), "[Function: res]");
        assert_eq!(interp.format_value(&cap.reject), "[Function: rej]");
    }

    #[test]
    fn capability_executor_cannot_be_reinitialised() {
        let mut interp = interp(true);
        let ctor = interp.create_function(JsFunction::constructor("Twice".to_string(), 1, |interp, _, args| {
            let executor = args.first().cloned().unwrap_or(JsValue::Undefined);
            let f = interp.create_function(JsFunction::native("f".to_string(), 1, |_, _, _| {
                Completion::Normal(JsValue::Undefined)
            }));
            for _ in 0..2 {
                if let Completion::Throw(e) = interp.call_function(&executor, &JsValue::Undefined, &[f.clone(), f.clone()]) {
                    return Completion::Throw(e);
                }
            }
            Completion::Normal(interp.create_plain_object())
        }));
        let err = interp.new_promise_capability(&ctor).unwrap_err();
        assert_eq!(
            interp.format_value(&err),
            "TypeError: Promise executor has already been invoked with non-undefined arguments"
        );
    }

    #[test]
    fn promise_resolve_returns_native_promises_unchanged() {
        let mut interp = interp(true);
        let ctor = interp.promise_constructor();
        let p = interp.create_pending_promise(None);
        let same = interp.promise_resolve(&ctor, &p).unwrap();
        assert!(same_value(&same, &p));

        let wrapped = interp.promise_resolve(&ctor, &JsValue::Number(3.0)).unwrap();
        assert_eq!(interp.format_value(&wrapped), "Promise { 3 }");
        assert!(!interp.has_pending_jobs());
    }

    #[test]
    fn resolve_lookup_reads_an_overridden_resolve() {
        let mut interp = interp(true);
        let ctor = interp.promise_constructor();
        assert!(matches!(
            interp.promise_resolve_function(&ctor),
            Ok(PromiseResolveFunction::Builtin)
        ));
        interp.set(&ctor, "resolve", JsValue::Number(0.0)).unwrap();
        assert!(!interp.is_protector_intact(ProtectorKind::ResolveLookup));
        let err = interp.promise_resolve_function(&ctor).unwrap_err();
        assert_eq!(
            interp.format_value(&err),
            "TypeError: Promise resolve or reject function is not callable"
        );
    }
}
