use super::*;

#[derive(Clone, Debug)]
pub enum PromiseState {
    Pending,
    Fulfilled(JsValue),
    Rejected(JsValue),
}

impl PromiseState {
    pub fn is_pending(&self) -> bool {
        matches!(self, PromiseState::Pending)
    }

    /// The fulfillment value or rejection reason; undefined while pending.
    pub fn result(&self) -> JsValue {
        match self {
            PromiseState::Pending => JsValue::Undefined,
            PromiseState::Fulfilled(v) | PromiseState::Rejected(v) => v.clone(),
        }
    }
}

/// Internal slots of a native promise.
#[derive(Clone, Debug)]
pub struct PromiseData {
    pub state: PromiseState,
    /// Pending reactions in attachment order; emptied at settlement.
    pub reactions: Vec<PromiseReaction>,
    pub is_handled: bool,
}

impl PromiseData {
    pub fn new() -> Self {
        Self {
            state: PromiseState::Pending,
            reactions: Vec::new(),
            is_handled: false,
        }
    }
}

impl Default for PromiseData {
    fn default() -> Self {
        Self::new()
    }
}

impl Interpreter {
    fn allocate_promise(&mut self, data: PromiseData) -> u64 {
        let mut obj = JsObjectData::new();
        obj.prototype = self.promise_prototype.clone();
        obj.class_name = "Promise".to_string();
        obj.promise_data = Some(data);
        self.allocate_object_slot(Rc::new(RefCell::new(obj)))
    }

    /// Allocates a pending promise. `parent` is the promise that caused this
    /// one to exist and is only reported to the init hook.
    pub fn create_pending_promise(&mut self, parent: Option<u64>) -> JsValue {
        let id = self.new_pending_promise(parent);
        JsValue::Object(JsObject { id })
    }

    pub(crate) fn new_pending_promise(&mut self, parent: Option<u64>) -> u64 {
        let id = self.allocate_promise(PromiseData::new());
        self.run_promise_hook(PromiseHookEvent::Init {
            promise: id,
            parent,
        });
        id
    }

    /// Allocates a promise that is already settled. No init event is emitted;
    /// the resolve hook still observes it.
    pub fn create_settled_promise(&mut self, reaction_type: PromiseReactionType, result: JsValue) -> JsValue {
        let state = match reaction_type {
            PromiseReactionType::Fulfill => PromiseState::Fulfilled(result.clone()),
            PromiseReactionType::Reject => PromiseState::Rejected(result.clone()),
        };
        let id = self.allocate_promise(PromiseData {
            state,
            reactions: Vec::new(),
            is_handled: false,
        });
        self.run_promise_hook(PromiseHookEvent::Resolve { promise: id });
        if reaction_type == PromiseReactionType::Reject {
            self.report_unhandled_rejection(id, &result);
        }
        JsValue::Object(JsObject { id })
    }

    /// The id of `val` if it is a native promise.
    pub fn promise_id(&self, val: &JsValue) -> Option<u64> {
        let id = val.object_id()?;
        let obj = self.get_object(id)?;
        let is_promise = obj.borrow().promise_data.is_some();
        is_promise.then_some(id)
    }

    pub fn is_promise(&self, val: &JsValue) -> bool {
        self.promise_id(val).is_some()
    }

    pub fn promise_state(&self, val: &JsValue) -> Option<PromiseState> {
        let obj = self.get_object(self.promise_id(val)?)?;
        let state = obj.borrow().promise_data.as_ref().map(|pd| pd.state.clone());
        state
    }

    pub fn promise_is_handled(&self, val: &JsValue) -> bool {
        self.promise_id(val)
            .and_then(|id| self.get_object(id))
            .is_some_and(|obj| obj.borrow().promise_data.as_ref().is_some_and(|pd| pd.is_handled))
    }

    pub(crate) fn pending_reaction_count(&self, promise_id: u64) -> usize {
        self.get_object(promise_id)
            .map(|obj| {
                obj.borrow()
                    .promise_data
                    .as_ref()
                    .map_or(0, |pd| pd.reactions.len())
            })
            .unwrap_or(0)
    }
}
