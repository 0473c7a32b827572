use super::*;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PromiseReactionType {
    Fulfill,
    Reject,
}

/// §27.2.1.1 PromiseCapability Records
#[derive(Clone, Debug)]
pub struct PromiseCapability {
    pub promise: JsValue,
    pub resolve: JsValue,
    pub reject: JsValue,
}

/// Where the outcome of a reaction goes.
#[derive(Clone, Debug)]
pub enum ReactionTarget {
    /// A native promise created by the intrinsic constructor.
    Promise(u64),
    /// Resolving functions of a foreign or combinator-owned capability.
    Capability(PromiseCapability),
}

#[derive(Clone, Debug)]
pub enum ReactionHandler {
    /// Identity for fulfill jobs, thrower for reject jobs.
    Default,
    Callable(JsValue),
}

// §27.2.1.2 PromiseReaction Records, with both roles in one node.
#[derive(Clone, Debug)]
pub struct PromiseReaction {
    pub target: ReactionTarget,
    pub fulfill_handler: ReactionHandler,
    pub reject_handler: ReactionHandler,
}

impl PromiseReaction {
    pub fn handler(&self, reaction_type: PromiseReactionType) -> &ReactionHandler {
        match reaction_type {
            PromiseReactionType::Fulfill => &self.fulfill_handler,
            PromiseReactionType::Reject => &self.reject_handler,
        }
    }
}

#[derive(Clone, Debug)]
pub struct PromiseReactionJob {
    pub reaction_type: PromiseReactionType,
    pub argument: JsValue,
    pub handler: ReactionHandler,
    pub target: ReactionTarget,
}

#[derive(Clone, Debug)]
pub struct PromiseResolveThenableJob {
    pub promise_to_resolve: u64,
    pub then: JsValue,
    pub thenable: JsValue,
}

pub fn allocate_reaction(
    target: ReactionTarget,
    fulfill_handler: ReactionHandler,
    reject_handler: ReactionHandler,
) -> PromiseReaction {
    PromiseReaction {
        target,
        fulfill_handler,
        reject_handler,
    }
}

// §27.2.2.1 NewPromiseReactionJob. The reaction type decides what a
// Default handler means once the job runs.
pub fn allocate_reaction_job(
    reaction_type: PromiseReactionType,
    argument: JsValue,
    handler: ReactionHandler,
    target: ReactionTarget,
) -> Job {
    Job::Reaction(PromiseReactionJob {
        reaction_type,
        argument,
        handler,
        target,
    })
}

// §27.2.2.2 NewPromiseResolveThenableJob
pub fn allocate_resolve_thenable_job(promise_to_resolve: u64, then: JsValue, thenable: JsValue) -> Job {
    Job::ResolveThenable(PromiseResolveThenableJob {
        promise_to_resolve,
        then,
        thenable,
    })
}

impl ReactionHandler {
    /// Non-callable handlers passed to `then` collapse into the sentinel.
    pub(crate) fn from_argument(interp: &Interpreter, val: &JsValue) -> Self {
        if interp.is_callable(val) {
            ReactionHandler::Callable(val.clone())
        } else {
            ReactionHandler::Default
        }
    }
}
