use super::builtins::promise::PromiseData;
use crate::types::JsValue;
use rustc_hash::FxHashMap;
use std::cell::RefCell;
use std::rc::Rc;

pub const SYMBOL_ITERATOR: &str = "Symbol(Symbol.iterator)";
pub const SYMBOL_SPECIES: &str = "Symbol(Symbol.species)";

#[derive(Debug)]
pub enum Completion {
    Normal(JsValue),
    Throw(JsValue),
}

impl Completion {
    pub fn is_abrupt(&self) -> bool {
        !matches!(self, Completion::Normal(_))
    }

    pub fn into_result(self) -> Result<JsValue, JsValue> {
        match self {
            Completion::Normal(v) => Ok(v),
            Completion::Throw(e) => Err(e),
        }
    }
}

impl From<Result<JsValue, JsValue>> for Completion {
    fn from(result: Result<JsValue, JsValue>) -> Self {
        match result {
            Ok(v) => Completion::Normal(v),
            Err(e) => Completion::Throw(e),
        }
    }
}

pub type NativeFn = Rc<dyn Fn(&mut super::Interpreter, &JsValue, &[JsValue]) -> Completion>;

#[derive(Clone)]
pub struct JsFunction {
    pub name: String,
    pub arity: usize,
    pub func: NativeFn,
    pub is_constructor: bool,
}

impl JsFunction {
    pub fn native(
        name: String,
        arity: usize,
        f: impl Fn(&mut super::Interpreter, &JsValue, &[JsValue]) -> Completion + 'static,
    ) -> Self {
        Self {
            name,
            arity,
            func: Rc::new(f),
            is_constructor: false,
        }
    }

    pub fn constructor(
        name: String,
        arity: usize,
        f: impl Fn(&mut super::Interpreter, &JsValue, &[JsValue]) -> Completion + 'static,
    ) -> Self {
        Self {
            name,
            arity,
            func: Rc::new(f),
            is_constructor: true,
        }
    }
}

impl std::fmt::Debug for JsFunction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "JsFunction({:?}, {})", self.name, self.arity)
    }
}

#[derive(Debug, Clone)]
pub struct PropertyDescriptor {
    pub value: Option<JsValue>,
    pub writable: Option<bool>,
    pub get: Option<JsValue>,
    pub enumerable: Option<bool>,
    pub configurable: Option<bool>,
}

impl PropertyDescriptor {
    pub fn data(value: JsValue, writable: bool, enumerable: bool, configurable: bool) -> Self {
        Self {
            value: Some(value),
            writable: Some(writable),
            get: None,
            enumerable: Some(enumerable),
            configurable: Some(configurable),
        }
    }

    pub fn data_default(value: JsValue) -> Self {
        Self::data(value, true, true, true)
    }

    pub fn getter(get: JsValue) -> Self {
        Self {
            value: None,
            writable: None,
            get: Some(get),
            enumerable: Some(false),
            configurable: Some(true),
        }
    }
}

pub struct JsObjectData {
    pub(crate) id: Option<u64>,
    pub(crate) properties: FxHashMap<String, PropertyDescriptor>,
    pub(crate) property_order: Vec<String>,
    pub(crate) prototype: Option<Rc<RefCell<JsObjectData>>>,
    pub(crate) callable: Option<JsFunction>,
    pub(crate) array_elements: Option<Vec<JsValue>>,
    pub(crate) class_name: String,
    pub(crate) promise_data: Option<PromiseData>,
}

impl JsObjectData {
    pub(crate) fn new() -> Self {
        Self {
            id: None,
            properties: FxHashMap::default(),
            property_order: Vec::new(),
            prototype: None,
            callable: None,
            array_elements: None,
            class_name: "Object".to_string(),
            promise_data: None,
        }
    }

    /// Finds `key` on this object or its prototype chain.
    pub fn lookup_property(&self, key: &str) -> Option<PropertyDescriptor> {
        if let Some(desc) = self.properties.get(key) {
            return Some(desc.clone());
        }
        if let Some(ref elems) = self.array_elements {
            if key == "length" {
                return Some(PropertyDescriptor::data(
                    JsValue::Number(elems.len() as f64),
                    true,
                    false,
                    false,
                ));
            }
            if let Ok(idx) = key.parse::<usize>()
                && idx < elems.len()
            {
                return Some(PropertyDescriptor::data_default(elems[idx].clone()));
            }
        }
        if let Some(proto) = &self.prototype {
            return proto.borrow().lookup_property(key);
        }
        None
    }

    pub(crate) fn insert_value(&mut self, key: String, value: JsValue) {
        self.insert_property(key, PropertyDescriptor::data_default(value));
    }

    pub(crate) fn insert_builtin(&mut self, key: String, value: JsValue) {
        self.insert_property(key, PropertyDescriptor::data(value, true, false, true));
    }

    pub(crate) fn insert_property(&mut self, key: String, desc: PropertyDescriptor) {
        if !self.properties.contains_key(&key) {
            self.property_order.push(key.clone());
        }
        self.properties.insert(key, desc);
    }

    pub fn get_property_value(&self, key: &str) -> Option<JsValue> {
        self.properties.get(key).and_then(|d| d.value.clone())
    }
}
