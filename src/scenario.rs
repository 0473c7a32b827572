use crate::interpreter::{Completion, EngineError, Interpreter, JsFunction};
use crate::types::JsValue;
use clap::ValueEnum;
use tracing::info;

/// Canned programs exercising the combinators end to end.
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum Scenario {
    /// `Promise.all([resolve(1), resolve(2), resolve(3)])`
    AllFulfilled,
    /// `Promise.all([resolve(1), reject("e"), resolve(3)])`
    AllRejected,
    /// Two deferred elements settled in reverse order.
    OutOfOrder,
    /// A foreign thenable next to a native promise.
    Thenable,
    /// `Promise.all([])`
    Empty,
    /// `Promise.allSettled([resolve(1), reject("e")])`
    AllSettled,
}

impl Scenario {
    pub const ALL: [Scenario; 6] = [
        Scenario::AllFulfilled,
        Scenario::AllRejected,
        Scenario::OutOfOrder,
        Scenario::Thenable,
        Scenario::Empty,
        Scenario::AllSettled,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Scenario::AllFulfilled => "all-fulfilled",
            Scenario::AllRejected => "all-rejected",
            Scenario::OutOfOrder => "out-of-order",
            Scenario::Thenable => "thenable",
            Scenario::Empty => "empty",
            Scenario::AllSettled => "all-settled",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ScenarioOutcome {
    /// The aggregate promise, formatted after the queue drained.
    pub result: String,
    pub jobs_run: usize,
    /// Reasons of rejections nobody handled.
    pub unhandled: Vec<String>,
}

pub fn run_scenario(interp: &mut Interpreter, scenario: Scenario) -> Result<ScenarioOutcome, EngineError> {
    let promise = build(interp, scenario).map_err(|e| EngineError::Uncaught(interp.format_value(&e)))?;
    let jobs_run = interp.run_jobs()?;
    let result = interp.format_value(&promise);
    let unhandled = interp
        .take_unhandled_rejections()
        .into_iter()
        .map(|(_, reason)| interp.format_value(&reason))
        .collect();
    info!(scenario = scenario.name(), jobs_run, %result, "scenario finished");
    Ok(ScenarioOutcome {
        result,
        jobs_run,
        unhandled,
    })
}

fn build(interp: &mut Interpreter, scenario: Scenario) -> Result<JsValue, JsValue> {
    let ctor = interp.promise_constructor();
    let mut settle_after = Vec::new();
    let elements = match scenario {
        Scenario::AllFulfilled => vec![
            call_static(interp, "resolve", JsValue::Number(1.0))?,
            call_static(interp, "resolve", JsValue::Number(2.0))?,
            call_static(interp, "resolve", JsValue::Number(3.0))?,
        ],
        Scenario::AllRejected => vec![
            call_static(interp, "resolve", JsValue::Number(1.0))?,
            call_static(interp, "reject", JsValue::from("e"))?,
            call_static(interp, "resolve", JsValue::Number(3.0))?,
        ],
        Scenario::OutOfOrder => {
            let first = interp.new_promise_capability(&ctor)?;
            let second = interp.new_promise_capability(&ctor)?;
            settle_after.push((second.resolve, JsValue::from("second")));
            settle_after.push((first.resolve, JsValue::from("first")));
            vec![first.promise, second.promise]
        }
        Scenario::Thenable => {
            let then = interp.create_function(JsFunction::native("then".to_string(), 2, |interp, _this, args| {
                let resolve = args.first().cloned().unwrap_or(JsValue::Undefined);
                interp.call_function(&resolve, &JsValue::Undefined, &[JsValue::Number(42.0)])
            }));
            let thenable = interp.create_plain_object();
            interp.set(&thenable, "then", then)?;
            vec![thenable, call_static(interp, "resolve", JsValue::Number(1.0))?]
        }
        Scenario::Empty => Vec::new(),
        Scenario::AllSettled => vec![
            call_static(interp, "resolve", JsValue::Number(1.0))?,
            call_static(interp, "reject", JsValue::from("e"))?,
        ],
    };

    let combinator = match scenario {
        Scenario::AllSettled => "allSettled",
        _ => "all",
    };
    let iterable = interp.create_array(elements);
    let promise = call_static(interp, combinator, iterable)?;
    for (resolve, value) in settle_after {
        interp
            .call_function(&resolve, &JsValue::Undefined, &[value])
            .into_result()?;
    }
    Ok(promise)
}

fn call_static(interp: &mut Interpreter, name: &str, arg: JsValue) -> Result<JsValue, JsValue> {
    let ctor = interp.promise_constructor();
    let f = interp.get(&ctor, name).into_result()?;
    match interp.call_function(&f, &ctor, &[arg]) {
        Completion::Normal(v) => Ok(v),
        Completion::Throw(e) => Err(e),
    }
}
