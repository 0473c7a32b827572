use super::*;
use crate::types::{JsObject, same_value};
use std::cell::Cell;

mod all;
mod allocator;
mod reaction;
mod settle;
mod then;

pub use all::CombinatorKind;
pub use allocator::{PromiseData, PromiseState};
pub use reaction::{
    PromiseCapability, PromiseReaction, PromiseReactionJob, PromiseReactionType,
    PromiseResolveThenableJob, ReactionHandler, ReactionTarget, allocate_reaction,
    allocate_reaction_job, allocate_resolve_thenable_job,
};
pub use then::PromiseResolveFunction;

impl Interpreter {
    pub(crate) fn setup_promise(&mut self) {
        let proto = self.create_object();
        proto.borrow_mut().class_name = "Promise".to_string();
        self.promise_prototype = Some(proto.clone());

        // Promise.prototype.then
        let then_fn = self.create_function(JsFunction::native(
            "then".to_string(),
            2,
            |interp, this, args| {
                let on_fulfilled = args.first().cloned().unwrap_or(JsValue::Undefined);
                let on_rejected = args.get(1).cloned().unwrap_or(JsValue::Undefined);
                interp.promise_then(this, &on_fulfilled, &on_rejected)
            },
        ));
        proto
            .borrow_mut()
            .insert_builtin("then".to_string(), then_fn.clone());
        self.promise_then = then_fn;

        // Promise.prototype.catch
        let catch_fn = self.create_function(JsFunction::native(
            "catch".to_string(),
            1,
            |interp, this, args| {
                let on_rejected = args.first().cloned().unwrap_or(JsValue::Undefined);
                interp.invoke_then(this, &[JsValue::Undefined, on_rejected])
            },
        ));
        proto
            .borrow_mut()
            .insert_builtin("catch".to_string(), catch_fn);

        // Promise constructor
        let ctor = self.create_function(JsFunction::constructor(
            "Promise".to_string(),
            1,
            |interp, _this, args| {
                if interp.new_target().is_none() {
                    let err = interp.create_type_error("Promise constructor cannot be invoked without 'new'");
                    return Completion::Throw(err);
                }
                let executor = args.first().cloned().unwrap_or(JsValue::Undefined);
                if !interp.is_callable(&executor) {
                    let msg = format!("Promise resolver {} is not a function", interp.format_value(&executor));
                    return Completion::Throw(interp.create_type_error(&msg));
                }
                let id = interp.new_pending_promise(None);
                let (resolve_fn, reject_fn) = interp.create_resolving_functions(id);
                if let Completion::Throw(e) =
                    interp.call_function(&executor, &JsValue::Undefined, &[resolve_fn, reject_fn.clone()])
                {
                    let _ = interp.call_function(&reject_fn, &JsValue::Undefined, &[e]);
                }
                Completion::Normal(JsValue::Object(JsObject { id }))
            },
        ));

        let proto_val = Self::object_value(&proto);
        proto
            .borrow_mut()
            .insert_builtin("constructor".to_string(), ctor.clone());

        // get Promise[@@species]
        let species_getter = self.create_function(JsFunction::native(
            "get [Symbol.species]".to_string(),
            0,
            |_interp, this, _args| Completion::Normal(this.clone()),
        ));

        let resolve_fn = self.create_function(JsFunction::native(
            "resolve".to_string(),
            1,
            |interp, this, args| {
                if !this.is_object() {
                    let err = interp.create_type_error("PromiseResolve called on non-object");
                    return Completion::Throw(err);
                }
                let value = args.first().cloned().unwrap_or(JsValue::Undefined);
                interp.promise_resolve(this, &value).into()
            },
        ));

        let reject_fn = self.create_function(JsFunction::native(
            "reject".to_string(),
            1,
            |interp, this, args| {
                let reason = args.first().cloned().unwrap_or(JsValue::Undefined);
                if interp.is_intrinsic_promise_constructor(this) {
                    return Completion::Normal(
                        interp.create_settled_promise(PromiseReactionType::Reject, reason),
                    );
                }
                let cap = match interp.new_promise_capability(this) {
                    Ok(cap) => cap,
                    Err(e) => return Completion::Throw(e),
                };
                if let Completion::Throw(e) = interp.call_function(&cap.reject, &JsValue::Undefined, &[reason]) {
                    return Completion::Throw(e);
                }
                Completion::Normal(cap.promise)
            },
        ));

        let all_fn = self.create_function(JsFunction::native(
            "all".to_string(),
            1,
            |interp, this, args| {
                let iterable = args.first().cloned().unwrap_or(JsValue::Undefined);
                interp.promise_all(this, &iterable)
            },
        ));

        let all_settled_fn = self.create_function(JsFunction::native(
            "allSettled".to_string(),
            1,
            |interp, this, args| {
                let iterable = args.first().cloned().unwrap_or(JsValue::Undefined);
                interp.promise_all_settled(this, &iterable)
            },
        ));

        if let Some(ctor_obj) = ctor.object_id().and_then(|id| self.get_object(id)) {
            let mut c = ctor_obj.borrow_mut();
            c.insert_property(
                "prototype".to_string(),
                PropertyDescriptor::data(proto_val, false, false, false),
            );
            c.insert_property(
                SYMBOL_SPECIES.to_string(),
                PropertyDescriptor::getter(species_getter),
            );
            c.insert_builtin("resolve".to_string(), resolve_fn);
            c.insert_builtin("reject".to_string(), reject_fn);
            c.insert_builtin("all".to_string(), all_fn);
            c.insert_builtin("allSettled".to_string(), all_settled_fn);
        }

        self.promise_constructor = ctor.clone();
        self.globals.insert("Promise".to_string(), ctor);
    }
}
