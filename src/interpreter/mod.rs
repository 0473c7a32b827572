use crate::types::JsValue;
use rustc_hash::FxHashMap;
use std::cell::RefCell;
use std::rc::Rc;
use std::sync::Arc;

mod types;
pub use types::*;

mod error;
pub use error::EngineError;
mod options;
pub use options::{EngineOptions, ProtectorScope};
mod protector;
pub use protector::{ProtectorKind, ProtectorSet};
mod hooks;
pub use hooks::{PromiseHook, PromiseHookEvent, RejectionTracker};
mod jobs;
pub use jobs::{Job, JobKind, MicrotaskQueue};
mod iterator;
pub use iterator::IteratorRecord;

mod heap;
mod helpers;
pub(crate) mod builtins;
pub use builtins::promise::{
    CombinatorKind, PromiseCapability, PromiseData, PromiseReaction, PromiseReactionJob,
    PromiseReactionType, PromiseResolveFunction, PromiseResolveThenableJob, PromiseState,
    ReactionHandler, ReactionTarget, allocate_reaction, allocate_reaction_job,
    allocate_resolve_thenable_job,
};

pub struct Interpreter {
    objects: Vec<Rc<RefCell<JsObjectData>>>,
    object_prototype: Option<Rc<RefCell<JsObjectData>>>,
    function_prototype: Option<Rc<RefCell<JsObjectData>>>,
    array_prototype: Option<Rc<RefCell<JsObjectData>>>,
    promise_prototype: Option<Rc<RefCell<JsObjectData>>>,
    promise_constructor: JsValue,
    promise_then: JsValue,
    globals: FxHashMap<String, JsValue>,
    new_target: Option<JsValue>,
    protectors: Arc<ProtectorSet>,
    microtask_queue: MicrotaskQueue,
    hooks: Vec<Box<dyn PromiseHook>>,
    rejection_tracker: RejectionTracker,
    options: EngineOptions,
}

impl Interpreter {
    pub fn new() -> Self {
        Self::with_options(EngineOptions::default())
    }

    pub fn with_options(options: EngineOptions) -> Self {
        // A realm that starts on the slow path gets its own set so the
        // shared one is never invalidated on its behalf.
        let protectors = match options.protector_scope {
            ProtectorScope::Global if options.fast_paths => ProtectorSet::global(),
            _ => Arc::new(ProtectorSet::new()),
        };
        let mut interp = Self {
            objects: Vec::new(),
            object_prototype: None,
            function_prototype: None,
            array_prototype: None,
            promise_prototype: None,
            promise_constructor: JsValue::Undefined,
            promise_then: JsValue::Undefined,
            globals: FxHashMap::default(),
            new_target: None,
            protectors,
            microtask_queue: MicrotaskQueue::new(),
            hooks: Vec::new(),
            rejection_tracker: RejectionTracker::default(),
            options,
        };
        interp.setup_globals();
        if !interp.options.fast_paths {
            for kind in ProtectorKind::ALL {
                interp.invalidate_protector(kind);
            }
        }
        interp
    }

    pub fn options(&self) -> &EngineOptions {
        &self.options
    }

    pub fn global(&self, name: &str) -> JsValue {
        self.globals.get(name).cloned().unwrap_or(JsValue::Undefined)
    }

    /// The intrinsic `%Promise%` constructor.
    pub fn promise_constructor(&self) -> JsValue {
        self.promise_constructor.clone()
    }

    /// The intrinsic `%Promise.prototype.then%` function.
    pub fn promise_then_function(&self) -> JsValue {
        self.promise_then.clone()
    }

    pub(crate) fn is_intrinsic_promise_constructor(&self, val: &JsValue) -> bool {
        crate::types::same_value(val, &self.promise_constructor)
    }
}

impl Default for Interpreter {
    fn default() -> Self {
        Self::new()
    }
}
