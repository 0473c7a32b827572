use super::*;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CombinatorKind {
    All,
    AllSettled,
}

impl CombinatorKind {
    pub fn name(self) -> &'static str {
        match self {
            CombinatorKind::All => "Promise.all",
            CombinatorKind::AllSettled => "Promise.allSettled",
        }
    }
}

/// State shared by every element function of one combinator call.
struct PromiseAllContext {
    values: Vec<JsValue>,
    /// Starts at 1 and only reaches 0 after iteration has finished.
    remaining: usize,
    capability: PromiseCapability,
}

#[derive(Clone, Copy, Debug)]
enum ElementRole {
    Resolve,
    SettledFulfilled,
    SettledRejected,
}

struct PromiseAllElement {
    index: usize,
    already_called: Rc<Cell<bool>>,
    role: ElementRole,
    context: Rc<RefCell<PromiseAllContext>>,
}

impl PromiseAllElement {
    // §27.2.4.1.3 Promise.all Resolve Element Functions
    // §27.2.4.2.2 / §27.2.4.2.3 Promise.allSettled element functions
    fn call(&self, interp: &mut Interpreter, argument: JsValue) -> Completion {
        if self.already_called.replace(true) {
            return Completion::Normal(JsValue::Undefined);
        }
        let slot_value = match self.role {
            ElementRole::Resolve => argument,
            ElementRole::SettledFulfilled => interp.settled_record("fulfilled", "value", argument),
            ElementRole::SettledRejected => interp.settled_record("rejected", "reason", argument),
        };
        let finished = {
            let mut ctx = self.context.borrow_mut();
            if let Some(slot) = ctx.values.get_mut(self.index) {
                *slot = slot_value;
            }
            ctx.remaining -= 1;
            ctx.remaining == 0
        };
        if finished {
            return interp.resolve_all_context(&self.context);
        }
        Completion::Normal(JsValue::Undefined)
    }
}

impl Interpreter {
    // §27.2.4.1 Promise.all(iterable)
    pub fn promise_all(&mut self, ctor: &JsValue, iterable: &JsValue) -> Completion {
        self.run_promise_combinator(CombinatorKind::All, ctor, iterable)
    }

    // §27.2.4.2 Promise.allSettled(iterable)
    pub fn promise_all_settled(&mut self, ctor: &JsValue, iterable: &JsValue) -> Completion {
        self.run_promise_combinator(CombinatorKind::AllSettled, ctor, iterable)
    }

    fn run_promise_combinator(&mut self, kind: CombinatorKind, ctor: &JsValue, iterable: &JsValue) -> Completion {
        if !ctor.is_object() {
            let msg = format!("{} called on non-object", kind.name());
            return Completion::Throw(self.create_type_error(&msg));
        }
        let cap = match self.new_promise_capability(ctor) {
            Ok(cap) => cap,
            Err(e) => return Completion::Throw(e),
        };
        let resolve = match self.promise_resolve_function(ctor) {
            Ok(r) => r,
            Err(e) => return self.reject_capability(&cap, e),
        };
        let mut record = match self.get_iterator(iterable) {
            Ok(r) => r,
            Err(e) => return self.reject_capability(&cap, e),
        };
        match self.perform_promise_all(kind, ctor, &cap, &mut record, &resolve) {
            Ok(promise) => Completion::Normal(promise),
            Err(e) => {
                if !record.done {
                    self.iterator_close(&record);
                }
                self.reject_capability(&cap, e)
            }
        }
    }

    /// Drives `record` to completion, wiring every element into `cap`.
    ///
    /// An `Err` means the caller must reject `cap`; if `record.done` is still
    /// false the iterator has to be closed first.
    pub fn perform_promise_all(
        &mut self,
        kind: CombinatorKind,
        ctor: &JsValue,
        cap: &PromiseCapability,
        record: &mut IteratorRecord,
        resolve: &PromiseResolveFunction,
    ) -> Result<JsValue, JsValue> {
        let context = Rc::new(RefCell::new(PromiseAllContext {
            values: Vec::new(),
            remaining: 1,
            capability: cap.clone(),
        }));
        let result_id = self.promise_id(&cap.promise);
        let mut index = 0;

        loop {
            let Some(next) = self.iterator_step_value(record)? else {
                let finished = {
                    let mut ctx = context.borrow_mut();
                    ctx.remaining -= 1;
                    ctx.remaining == 0
                };
                if finished {
                    self.resolve_all_context(&context).into_result()?;
                }
                return Ok(cap.promise.clone());
            };

            context.borrow_mut().values.push(JsValue::Undefined);
            context.borrow_mut().remaining += 1;
            let next_promise = self.call_resolve(ctor, resolve, next)?;
            let (on_fulfilled, on_rejected) = self.create_element_functions(kind, index, &context);

            if self.has_promise_hooks()
                && let Some(by) = result_id
                && let Some(promise) = self.promise_id(&next_promise)
            {
                self.run_promise_hook(PromiseHookEvent::HandledBy { promise, by });
            }

            self.invoke_then(&next_promise, &[on_fulfilled, on_rejected])
                .into_result()?;
            index += 1;
        }
    }

    fn create_element_functions(
        &mut self,
        kind: CombinatorKind,
        index: usize,
        context: &Rc<RefCell<PromiseAllContext>>,
    ) -> (JsValue, JsValue) {
        match kind {
            CombinatorKind::All => {
                let on_fulfilled = self.element_function(PromiseAllElement {
                    index,
                    already_called: Rc::new(Cell::new(false)),
                    role: ElementRole::Resolve,
                    context: context.clone(),
                });
                let on_rejected = context.borrow().capability.reject.clone();
                (on_fulfilled, on_rejected)
            }
            CombinatorKind::AllSettled => {
                let already_called = Rc::new(Cell::new(false));
                let on_fulfilled = self.element_function(PromiseAllElement {
                    index,
                    already_called: already_called.clone(),
                    role: ElementRole::SettledFulfilled,
                    context: context.clone(),
                });
                let on_rejected = self.element_function(PromiseAllElement {
                    index,
                    already_called,
                    role: ElementRole::SettledRejected,
                    context: context.clone(),
                });
                (on_fulfilled, on_rejected)
            }
        }
    }

    fn element_function(&mut self, element: PromiseAllElement) -> JsValue {
        self.create_function(JsFunction::native(
            "".to_string(),
            1,
            move |interp, _this, args| {
                let argument = args.first().cloned().unwrap_or(JsValue::Undefined);
                element.call(interp, argument)
            },
        ))
    }

    fn resolve_all_context(&mut self, context: &Rc<RefCell<PromiseAllContext>>) -> Completion {
        let (values, resolve) = {
            let ctx = context.borrow();
            (ctx.values.clone(), ctx.capability.resolve.clone())
        };
        let array = self.create_array(values);
        self.call_function(&resolve, &JsValue::Undefined, &[array])
    }

    fn settled_record(&mut self, status: &str, key: &str, value: JsValue) -> JsValue {
        let obj = self.create_object();
        {
            let mut o = obj.borrow_mut();
            o.insert_value("status".to_string(), JsValue::string(status));
            o.insert_value(key.to_string(), value);
        }
        Self::object_value(&obj)
    }

    // IfAbruptRejectPromise(value, capability)
    fn reject_capability(&mut self, cap: &PromiseCapability, reason: JsValue) -> Completion {
        match self.call_function(&cap.reject, &JsValue::Undefined, &[reason]) {
            Completion::Normal(_) => Completion::Normal(cap.promise.clone()),
            abrupt => abrupt,
        }
    }
}
