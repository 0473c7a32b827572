//! Protectors: process-wide flags that guard the promise fast paths.
//!
//! A protector starts out intact and is invalidated, once and for good, the
//! first time user code could observe a change to the lookup it guards.
//! Callers that find a protector intact (and the receiver's prototype to be
//! exactly the intrinsic one) may skip the generic property lookup; the
//! result has to be indistinguishable from taking the generic path.

use super::*;
use std::fmt;
use std::sync::OnceLock;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::debug;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ProtectorKind {
    /// `promise.constructor` and `Promise[@@species]`.
    SpeciesLookup,
    /// `promise.then` on instances of the intrinsic prototype.
    ThenLookup,
    /// `Promise.resolve` on the intrinsic constructor.
    ResolveLookup,
}

impl ProtectorKind {
    pub const ALL: [ProtectorKind; 3] = [
        ProtectorKind::SpeciesLookup,
        ProtectorKind::ThenLookup,
        ProtectorKind::ResolveLookup,
    ];

    fn index(self) -> usize {
        match self {
            ProtectorKind::SpeciesLookup => 0,
            ProtectorKind::ThenLookup => 1,
            ProtectorKind::ResolveLookup => 2,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            ProtectorKind::SpeciesLookup => "promise-species",
            ProtectorKind::ThenLookup => "promise-then",
            ProtectorKind::ResolveLookup => "promise-resolve",
        }
    }
}

impl fmt::Display for ProtectorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug)]
pub struct ProtectorSet {
    flags: [AtomicBool; 3],
}

impl ProtectorSet {
    pub fn new() -> Self {
        Self {
            flags: [
                AtomicBool::new(true),
                AtomicBool::new(true),
                AtomicBool::new(true),
            ],
        }
    }

    /// The set shared by every realm created with [`ProtectorScope::Global`].
    pub fn global() -> Arc<ProtectorSet> {
        static GLOBAL: OnceLock<Arc<ProtectorSet>> = OnceLock::new();
        GLOBAL.get_or_init(|| Arc::new(ProtectorSet::new())).clone()
    }

    pub fn is_intact(&self, kind: ProtectorKind) -> bool {
        self.flags[kind.index()].load(Ordering::Acquire)
    }

    /// Returns true if this call is the one that tripped the protector.
    pub fn invalidate(&self, kind: ProtectorKind) -> bool {
        self.flags[kind.index()].swap(false, Ordering::AcqRel)
    }
}

impl Default for ProtectorSet {
    fn default() -> Self {
        Self::new()
    }
}

impl Interpreter {
    pub fn protectors(&self) -> &Arc<ProtectorSet> {
        &self.protectors
    }

    pub fn is_protector_intact(&self, kind: ProtectorKind) -> bool {
        self.protectors.is_intact(kind)
    }

    pub fn invalidate_protector(&self, kind: ProtectorKind) {
        if self.protectors.invalidate(kind) {
            debug!(protector = %kind, "protector invalidated");
        }
    }

    /// Called by the object system after any own-property write.
    pub(crate) fn notify_property_write(&self, target: &JsValue, key: &str) {
        let Some(id) = target.object_id() else {
            return;
        };
        let is_promise_like = self.is_promise_prototype(id) || self.is_promise_id(id);
        let is_promise_ctor = self.is_intrinsic_promise_constructor(target);
        match key {
            "then" if is_promise_like => self.invalidate_protector(ProtectorKind::ThenLookup),
            "constructor" if is_promise_like => {
                self.invalidate_protector(ProtectorKind::SpeciesLookup)
            }
            SYMBOL_SPECIES if is_promise_ctor => {
                self.invalidate_protector(ProtectorKind::SpeciesLookup)
            }
            "resolve" if is_promise_ctor => {
                self.invalidate_protector(ProtectorKind::ResolveLookup)
            }
            _ => {}
        }
    }

    fn is_promise_prototype(&self, id: u64) -> bool {
        self.promise_prototype
            .as_ref()
            .is_some_and(|p| p.borrow().id == Some(id))
    }

    fn is_promise_id(&self, id: u64) -> bool {
        self.get_object(id)
            .is_some_and(|o| o.borrow().promise_data.is_some())
    }

    /// Identity check: is `val` a native promise whose [[Prototype]] is
    /// exactly the intrinsic `%Promise.prototype%`?
    pub(crate) fn has_initial_promise_prototype(&self, val: &JsValue) -> bool {
        let Some(obj) = val.object_id().and_then(|id| self.get_object(id)) else {
            return false;
        };
        let o = obj.borrow();
        if o.promise_data.is_none() {
            return false;
        }
        match (&o.prototype, &self.promise_prototype) {
            (Some(proto), Some(initial)) => Rc::ptr_eq(proto, initial),
            _ => false,
        }
    }

    pub(crate) fn is_promise_then_lookup_chain_intact(&self, receiver: &JsValue) -> bool {
        receiver.is_object()
            && self.is_protector_intact(ProtectorKind::ThenLookup)
            && self.has_initial_promise_prototype(receiver)
    }

    pub(crate) fn is_promise_species_lookup_chain_intact(&self, promise: &JsValue) -> bool {
        self.is_protector_intact(ProtectorKind::SpeciesLookup)
            && self.has_initial_promise_prototype(promise)
    }

    pub(crate) fn is_promise_resolve_lookup_chain_intact(&self, constructor: &JsValue) -> bool {
        self.is_protector_intact(ProtectorKind::ResolveLookup)
            && self.is_intrinsic_promise_constructor(constructor)
    }
}
