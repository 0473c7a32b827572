use super::*;

pub(crate) mod promise;

impl Interpreter {
    pub(crate) fn setup_globals(&mut self) {
        let object_proto = Rc::new(RefCell::new(JsObjectData::new()));
        self.allocate_object_slot(object_proto.clone());
        self.object_prototype = Some(object_proto);

        let function_proto = self.create_object();
        function_proto.borrow_mut().class_name = "Function".to_string();
        self.function_prototype = Some(function_proto);

        self.setup_array_prototype();
        self.setup_promise();
    }

    fn setup_array_prototype(&mut self) {
        let proto = self.create_object();
        proto.borrow_mut().class_name = "Array".to_string();

        // Array.prototype[@@iterator]
        let iter_fn = self.create_function(JsFunction::native(
            "[Symbol.iterator]".to_string(),
            0,
            |interp, this, _args| interp.create_array_iterator(this),
        ));
        proto
            .borrow_mut()
            .insert_builtin(SYMBOL_ITERATOR.to_string(), iter_fn);

        self.array_prototype = Some(proto);
    }
}
