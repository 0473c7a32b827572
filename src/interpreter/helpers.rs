use super::*;
use crate::types::JsString;

impl Interpreter {
    pub fn is_callable(&self, val: &JsValue) -> bool {
        if let JsValue::Object(o) = val
            && let Some(obj) = self.get_object(o.id)
        {
            return obj.borrow().callable.is_some();
        }
        false
    }

    pub fn is_constructor(&self, val: &JsValue) -> bool {
        if let JsValue::Object(o) = val
            && let Some(obj) = self.get_object(o.id)
            && let Some(ref func) = obj.borrow().callable
        {
            return func.is_constructor;
        }
        false
    }

    fn native_of(&self, val: &JsValue) -> Option<NativeFn> {
        let obj = self.get_object(val.object_id()?)?;
        let func = obj.borrow().callable.as_ref().map(|f| f.func.clone());
        func
    }

    // §7.3.14 Call(F, V, argumentsList)
    pub fn call_function(&mut self, func_val: &JsValue, this_val: &JsValue, args: &[JsValue]) -> Completion {
        let Some(func) = self.native_of(func_val) else {
            let err = self.create_type_error(&format!(
                "{} is not a function",
                self.format_value(func_val)
            ));
            return Completion::Throw(err);
        };
        let saved = self.new_target.take();
        let result = func(self, this_val, args);
        self.new_target = saved;
        result
    }

    // §7.3.15 Construct(F, argumentsList), with newTarget = F
    pub fn construct(&mut self, ctor: &JsValue, args: &[JsValue]) -> Completion {
        if !self.is_constructor(ctor) {
            let err = self.create_type_error(&format!(
                "{} is not a constructor",
                self.format_value(ctor)
            ));
            return Completion::Throw(err);
        }
        let Some(func) = self.native_of(ctor) else {
            return Completion::Throw(self.create_type_error("not a constructor"));
        };
        let saved = self.new_target.replace(ctor.clone());
        let result = func(self, ctor, args);
        self.new_target = saved;
        result
    }

    /// The `new.target` of the native currently running, if it was constructed.
    pub fn new_target(&self) -> Option<JsValue> {
        self.new_target.clone()
    }

    // §7.3.2 Get(O, P). Primitives have no wrapper prototypes in this realm.
    pub fn get(&mut self, target: &JsValue, key: &str) -> Completion {
        let JsValue::Object(o) = target else {
            if target.is_nullish() {
                let err = self.create_type_error(&format!(
                    "Cannot read properties of {target} (reading '{key}')"
                ));
                return Completion::Throw(err);
            }
            return Completion::Normal(JsValue::Undefined);
        };
        let Some(obj) = self.get_object(o.id) else {
            return Completion::Normal(JsValue::Undefined);
        };
        let desc = obj.borrow().lookup_property(key);
        match desc {
            Some(PropertyDescriptor { get: Some(getter), .. }) => {
                self.call_function(&getter, target, &[])
            }
            Some(PropertyDescriptor { value: Some(v), .. }) => Completion::Normal(v),
            _ => Completion::Normal(JsValue::Undefined),
        }
    }

    /// Writes an own data property, notifying protectors about the write.
    pub fn set(&mut self, target: &JsValue, key: &str, value: JsValue) -> Result<(), JsValue> {
        let Some(obj) = target.object_id().and_then(|id| self.get_object(id)) else {
            return Err(self.create_type_error(&format!(
                "Cannot set property '{key}' on {}",
                self.format_value(target)
            )));
        };
        let read_only = {
            let mut o = obj.borrow_mut();
            match o.properties.get_mut(key) {
                Some(desc) if desc.writable == Some(false) => true,
                Some(desc) => {
                    desc.get = None;
                    desc.value = Some(value);
                    desc.writable = Some(true);
                    false
                }
                None => {
                    o.insert_value(key.to_string(), value);
                    false
                }
            }
        };
        if read_only {
            return Err(self.create_type_error(&format!(
                "Cannot assign to read only property '{key}'"
            )));
        }
        self.notify_property_write(target, key);
        Ok(())
    }

    /// Installs an accessor with only a getter.
    pub fn define_getter(&mut self, target: &JsValue, key: &str, getter: JsValue) {
        if let Some(obj) = target.object_id().and_then(|id| self.get_object(id)) {
            obj.borrow_mut()
                .insert_property(key.to_string(), PropertyDescriptor::getter(getter));
            self.notify_property_write(target, key);
        }
    }

    // §10.1.2 [[SetPrototypeOf]]
    pub fn set_prototype_of(&mut self, target: &JsValue, proto: &JsValue) {
        let Some(obj) = target.object_id().and_then(|id| self.get_object(id)) else {
            return;
        };
        let proto = proto.object_id().and_then(|id| self.get_object(id));
        obj.borrow_mut().prototype = proto;
    }

    pub fn create_error(&mut self, name: &str, msg: &str) -> JsValue {
        let obj = self.create_object();
        {
            let mut o = obj.borrow_mut();
            o.class_name = name.to_string();
            o.insert_builtin("name".to_string(), JsValue::String(JsString::from_str(name)));
            o.insert_builtin(
                "message".to_string(),
                JsValue::String(JsString::from_str(msg)),
            );
        }
        Self::object_value(&obj)
    }

    pub fn create_type_error(&mut self, msg: &str) -> JsValue {
        self.create_error("TypeError", msg)
    }

    pub fn format_value(&self, val: &JsValue) -> String {
        self.format_nested(val, 0)
    }

    fn format_nested(&self, val: &JsValue, depth: usize) -> String {
        let JsValue::Object(o) = val else {
            return format!("{val}");
        };
        let Some(obj) = self.get_object(o.id) else {
            return format!("{val}");
        };
        if depth > 4 {
            return "[Object]".to_string();
        }
        let obj = obj.borrow();
        if let Some(ref elems) = obj.array_elements {
            let parts: Vec<String> = elems
                .iter()
                .map(|v| self.format_element(v, depth + 1))
                .collect();
            return format!("[{}]", parts.join(", "));
        }
        if let Some(ref pd) = obj.promise_data {
            return match &pd.state {
                PromiseState::Pending => "Promise { <pending> }".to_string(),
                PromiseState::Fulfilled(v) => {
                    format!("Promise {{ {} }}", self.format_element(v, depth + 1))
                }
                PromiseState::Rejected(r) => {
                    format!("Promise {{ <rejected> {} }}", self.format_element(r, depth + 1))
                }
            };
        }
        if let Some(ref func) = obj.callable {
            return format!("[Function: {}]", func.name);
        }
        if obj.class_name.ends_with("Error") {
            let message = obj.get_property_value("message").unwrap_or(JsValue::Undefined);
            return format!("{}: {message}", obj.class_name);
        }
        let parts: Vec<String> = obj
            .property_order
            .iter()
            .filter_map(|k| {
                let desc = obj.properties.get(k)?;
                let v = desc.value.as_ref()?;
                Some(format!("{k}: {}", self.format_element(v, depth + 1)))
            })
            .collect();
        if parts.is_empty() {
            "{}".to_string()
        } else {
            format!("{{ {} }}", parts.join(", "))
        }
    }

    fn format_element(&self, val: &JsValue, depth: usize) -> String {
        match val {
            JsValue::String(s) => format!("{:?}", s.to_rust_string()),
            _ => self.format_nested(val, depth),
        }
    }
}
