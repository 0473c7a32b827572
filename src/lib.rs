//! A Promise runtime: settlement, reaction jobs, protector-guarded fast
//! paths and the `Promise.all` family of combinators, running on a small
//! single-threaded host realm with a FIFO microtask queue.

pub mod interpreter;
pub mod scenario;
pub mod types;

pub use interpreter::{Completion, EngineError, EngineOptions, Interpreter};
pub use types::JsValue;
