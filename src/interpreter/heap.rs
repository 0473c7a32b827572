use super::*;
use crate::types::{JsObject, JsString};

impl Interpreter {
    pub(crate) fn allocate_object_slot(&mut self, obj: Rc<RefCell<JsObjectData>>) -> u64 {
        let id = self.objects.len() as u64;
        obj.borrow_mut().id = Some(id);
        self.objects.push(obj);
        id
    }

    pub(crate) fn get_object(&self, id: u64) -> Option<Rc<RefCell<JsObjectData>>> {
        self.objects.get(id as usize).cloned()
    }

    pub fn object_count(&self) -> usize {
        self.objects.len()
    }

    pub(crate) fn create_object(&mut self) -> Rc<RefCell<JsObjectData>> {
        let mut data = JsObjectData::new();
        data.prototype = self.object_prototype.clone();
        let obj = Rc::new(RefCell::new(data));
        self.allocate_object_slot(obj.clone());
        obj
    }

    /// Allocates an ordinary object inheriting from `Object.prototype`.
    pub fn create_plain_object(&mut self) -> JsValue {
        let obj = self.create_object();
        Self::object_value(&obj)
    }

    pub(crate) fn object_value(obj: &Rc<RefCell<JsObjectData>>) -> JsValue {
        JsValue::Object(JsObject {
            id: obj.borrow().id.unwrap_or_default(),
        })
    }

    pub fn create_function(&mut self, func: JsFunction) -> JsValue {
        let (fn_name, fn_length) = (func.name.clone(), func.arity);
        let mut obj_data = JsObjectData::new();
        obj_data.prototype = self
            .function_prototype
            .clone()
            .or(self.object_prototype.clone());
        obj_data.callable = Some(func);
        obj_data.class_name = "Function".to_string();
        obj_data.insert_property(
            "length".to_string(),
            PropertyDescriptor::data(JsValue::Number(fn_length as f64), false, false, true),
        );
        obj_data.insert_property(
            "name".to_string(),
            PropertyDescriptor::data(
                JsValue::String(JsString::from_str(&fn_name)),
                false,
                false,
                true,
            ),
        );
        let obj = Rc::new(RefCell::new(obj_data));
        let id = self.allocate_object_slot(obj);
        JsValue::Object(JsObject { id })
    }

    pub fn create_array(&mut self, values: Vec<JsValue>) -> JsValue {
        let mut obj_data = JsObjectData::new();
        obj_data.prototype = self
            .array_prototype
            .clone()
            .or(self.object_prototype.clone());
        obj_data.class_name = "Array".to_string();
        obj_data.array_elements = Some(values);
        let obj = Rc::new(RefCell::new(obj_data));
        let id = self.allocate_object_slot(obj);
        JsValue::Object(JsObject { id })
    }

    /// Elements of an array created by [`create_array`](Self::create_array).
    pub fn array_elements(&self, val: &JsValue) -> Option<Vec<JsValue>> {
        let obj = self.get_object(val.object_id()?)?;
        obj.borrow().array_elements.clone()
    }
}
