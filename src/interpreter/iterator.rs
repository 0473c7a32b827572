use super::*;
use crate::types::to_boolean;
use std::cell::Cell;

/// §7.4.1 Iterator Records
#[derive(Clone, Debug)]
pub struct IteratorRecord {
    pub iterator: JsValue,
    pub next_method: JsValue,
    pub done: bool,
}

impl Interpreter {
    // §7.4.2 GetIterator(obj, sync)
    pub fn get_iterator(&mut self, iterable: &JsValue) -> Result<IteratorRecord, JsValue> {
        let method = if iterable.is_nullish() {
            JsValue::Undefined
        } else {
            self.get(iterable, SYMBOL_ITERATOR).into_result()?
        };
        if !self.is_callable(&method) {
            let msg = format!("{} is not iterable", self.format_value(iterable));
            return Err(self.create_type_error(&msg));
        }
        let iterator = self.call_function(&method, iterable, &[]).into_result()?;
        if !iterator.is_object() {
            return Err(self.create_type_error("Result of the Symbol.iterator method is not an object"));
        }
        let next_method = self.get(&iterator, "next").into_result()?;
        Ok(IteratorRecord {
            iterator,
            next_method,
            done: false,
        })
    }

    // §7.4.8 IteratorStepValue(iteratorRecord)
    //
    // Any abrupt completion marks the record done so that callers do not try
    // to close an iterator that already failed.
    pub fn iterator_step_value(&mut self, record: &mut IteratorRecord) -> Result<Option<JsValue>, JsValue> {
        let result = match self.call_function(&record.next_method, &record.iterator, &[]) {
            Completion::Normal(v) => v,
            Completion::Throw(e) => {
                record.done = true;
                return Err(e);
            }
        };
        if !result.is_object() {
            record.done = true;
            return Err(self.create_type_error("Iterator result is not an object"));
        }
        let done = match self.get(&result, "done") {
            Completion::Normal(v) => to_boolean(&v),
            Completion::Throw(e) => {
                record.done = true;
                return Err(e);
            }
        };
        if done {
            record.done = true;
            return Ok(None);
        }
        match self.get(&result, "value") {
            Completion::Normal(v) => Ok(Some(v)),
            Completion::Throw(e) => {
                record.done = true;
                Err(e)
            }
        }
    }

    // §7.4.10 IteratorClose(iteratorRecord, completion) for a throw completion:
    // the original error wins over anything `return` does.
    pub fn iterator_close(&mut self, record: &IteratorRecord) {
        let return_fn = match self.get(&record.iterator, "return") {
            Completion::Normal(v) => v,
            Completion::Throw(_) => return,
        };
        if return_fn.is_nullish() || !self.is_callable(&return_fn) {
            return;
        }
        let _ = self.call_function(&return_fn, &record.iterator, &[]);
    }

    // §7.4.14 CreateIteratorResultObject(value, done)
    pub fn create_iter_result_object(&mut self, value: JsValue, done: bool) -> JsValue {
        let obj = self.create_object();
        {
            let mut o = obj.borrow_mut();
            o.insert_value("value".to_string(), value);
            o.insert_value("done".to_string(), JsValue::Boolean(done));
        }
        Self::object_value(&obj)
    }

    // §23.1.5.1 CreateArrayIterator(array, value)
    pub(crate) fn create_array_iterator(&mut self, array: &JsValue) -> Completion {
        let Some(array_id) = array.object_id() else {
            let err = self.create_type_error("Array iterator called on non-object");
            return Completion::Throw(err);
        };
        let position = Rc::new(Cell::new(0usize));
        let next_fn = self.create_function(JsFunction::native(
            "next".to_string(),
            0,
            move |interp, _this, _args| {
                let index = position.get();
                let element = interp.get_object(array_id).and_then(|o| {
                    let o = o.borrow();
                    o.array_elements.as_ref()?.get(index).cloned()
                });
                match element {
                    Some(value) => {
                        position.set(index + 1);
                        Completion::Normal(interp.create_iter_result_object(value, false))
                    }
                    None => {
                        position.set(usize::MAX);
                        Completion::Normal(interp.create_iter_result_object(JsValue::Undefined, true))
                    }
                }
            },
        ));
        let iter = self.create_object();
        {
            let mut o = iter.borrow_mut();
            o.class_name = "Array Iterator".to_string();
            o.insert_builtin("next".to_string(), next_fn);
        }
        Completion::Normal(Self::object_value(&iter))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn interp() -> Interpreter {
        Interpreter::with_options(EngineOptions::isolated())
    }

    #[test]
    fn arrays_iterate_in_order_then_stay_done() {
        let mut interp = interp();
        let arr = interp.create_array(vec![JsValue::Number(1.0), JsValue::Number(2.0)]);
        let mut record = interp.get_iterator(&arr).unwrap();
        let mut seen = Vec::new();
        while let Some(v) = interp.iterator_step_value(&mut record).unwrap() {
            seen.push(v.to_string());
        }
        assert_eq!(seen, vec!["1", "2"]);
        assert!(record.done);
        assert!(interp.iterator_step_value(&mut record).unwrap().is_none());
    }

    #[test]
    fn non_iterables_are_rejected() {
        let mut interp = interp();
        let err = interp.get_iterator(&JsValue::Number(5.0)).unwrap_err();
        assert_eq!(interp.format_value(&err), "TypeError: 5 is not iterable");
        let plain = interp.create_plain_object();
        assert!(interp.get_iterator(&plain).is_err());
    }

    #[test]
    fn throwing_next_marks_the_record_done() {
        let mut interp = interp();
        let next = interp.create_function(JsFunction::native("next".to_string(), 0, |_, _, _| {
            Completion::Throw(JsValue::from("boom"))
        }));
        let iterator = interp.create_plain_object();
        let mut record = IteratorRecord {
            iterator,
            next_method: next,
            done: false,
        };
        let err = interp.iterator_step_value(&mut record).unwrap_err();
        assert_eq!(err.to_string(), "boom");
        assert!(record.done);
    }

    #[test]
    fn close_calls_return_and_swallows_its_errors() {
        let mut interp = interp();
        let calls = Rc::new(Cell::new(0));
        let counter = calls.clone();
        let ret = interp.create_function(JsFunction::native("return".to_string(), 0, move |_, _, _| {
            counter.set(counter.get() + 1);
            Completion::Throw(JsValue::from("ignored"))
        }));
        let iterator = interp.create_plain_object();
        interp.set(&iterator, "return", ret).unwrap();
        let record = IteratorRecord {
            iterator,
            next_method: JsValue::Undefined,
            done: false,
        };
        interp.iterator_close(&record);
        assert_eq!(calls.get(), 1);
    }
}
