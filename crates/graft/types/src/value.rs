//! Runtime values: what factories consume and produce.
//!
//! Collections and callables are shared handles (`Rc`-backed, interior
//! mutability), so the same object can sit in a cache, inside a
//! collective, and in a factory's captured environment at once. Deep
//! cloning copies collection structure and shares everything else;
//! that asymmetry is what makes collectives clonable templates while
//! functions stay one value.

use crate::{GraftError, GraftResult};
use std::cell::RefCell;
use std::collections::BTreeMap;
use std::fmt;
use std::rc::Rc;

// ── Shared containers ────────────────────────────────────────────────

/// Shared string-keyed object value. Clones share the backing store;
/// `deep_clone` copies it.
#[derive(Clone, Default)]
pub struct ObjectRef(Rc<RefCell<BTreeMap<String, Value>>>);

impl ObjectRef {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_entries<K, I>(entries: I) -> Self
    where
        K: Into<String>,
        I: IntoIterator<Item = (K, Value)>,
    {
        let map = entries
            .into_iter()
            .map(|(k, v)| (k.into(), v))
            .collect::<BTreeMap<_, _>>();
        Self(Rc::new(RefCell::new(map)))
    }

    pub fn get(&self, key: &str) -> Option<Value> {
        self.0.borrow().get(key).cloned()
    }

    pub fn insert(&self, key: impl Into<String>, value: Value) {
        self.0.borrow_mut().insert(key.into(), value);
    }

    pub fn remove(&self, key: &str) -> Option<Value> {
        self.0.borrow_mut().remove(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.0.borrow().contains_key(key)
    }

    pub fn keys(&self) -> Vec<String> {
        self.0.borrow().keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.0.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.borrow().is_empty()
    }

    /// True when both handles point at the same backing store.
    pub fn shares_store(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }

    fn deep_clone(&self) -> Self {
        let copied = self
            .0
            .borrow()
            .iter()
            .map(|(k, v)| (k.clone(), v.deep_clone()))
            .collect::<BTreeMap<_, _>>();
        Self(Rc::new(RefCell::new(copied)))
    }
}

impl fmt::Debug for ObjectRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let map = self.0.borrow();
        f.debug_map().entries(map.iter()).finish()
    }
}

/// Shared list value. Clones share the backing store; `deep_clone`
/// copies it.
#[derive(Clone, Default)]
pub struct ListRef(Rc<RefCell<Vec<Value>>>);

impl ListRef {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_items(items: impl IntoIterator<Item = Value>) -> Self {
        Self(Rc::new(RefCell::new(items.into_iter().collect())))
    }

    pub fn push(&self, value: Value) {
        self.0.borrow_mut().push(value);
    }

    pub fn get(&self, index: usize) -> Option<Value> {
        self.0.borrow().get(index).cloned()
    }

    pub fn len(&self) -> usize {
        self.0.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.borrow().is_empty()
    }

    pub fn items(&self) -> Vec<Value> {
        self.0.borrow().clone()
    }

    pub fn shares_store(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }

    fn deep_clone(&self) -> Self {
        let copied = self.0.borrow().iter().map(Value::deep_clone).collect();
        Self(Rc::new(RefCell::new(copied)))
    }
}

impl fmt::Debug for ListRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let items = self.0.borrow();
        f.debug_list().entries(items.iter()).finish()
    }
}

/// Shared callable value. Mutation happens through state captured by the
/// closure, never through the handle itself.
#[derive(Clone)]
pub struct FunctionRef(Rc<dyn Fn(&[Value]) -> GraftResult<Value>>);

impl FunctionRef {
    pub fn new(f: impl Fn(&[Value]) -> GraftResult<Value> + 'static) -> Self {
        Self(Rc::new(f))
    }

    pub fn call(&self, args: &[Value]) -> GraftResult<Value> {
        (self.0)(args)
    }

    pub fn shares_fn(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

impl fmt::Debug for FunctionRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<function>")
    }
}

// ── Value ────────────────────────────────────────────────────────────

/// A dynamic runtime value.
#[derive(Clone, Debug)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
    List(ListRef),
    Object(ObjectRef),
    Function(FunctionRef),
}

impl Value {
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text(text.into())
    }

    pub fn function(f: impl Fn(&[Value]) -> GraftResult<Value> + 'static) -> Self {
        Self::Function(FunctionRef::new(f))
    }

    /// Kind name used in diagnostics.
    pub fn kind(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "bool",
            Value::Int(_) => "int",
            Value::Float(_) => "float",
            Value::Text(_) => "text",
            Value::List(_) => "list",
            Value::Object(_) => "object",
            Value::Function(_) => "function",
        }
    }

    /// Whether a factory may return this value. Functions, objects,
    /// lists, and text qualify; nothing and bare scalars do not.
    pub fn is_constructible(&self) -> bool {
        matches!(
            self,
            Value::Text(_) | Value::List(_) | Value::Object(_) | Value::Function(_)
        )
    }

    /// Structural copy: collections get fresh backing stores (recursing
    /// into their entries), functions are shared, scalars are plain
    /// copies.
    pub fn deep_clone(&self) -> Value {
        match self {
            Value::List(list) => Value::List(list.deep_clone()),
            Value::Object(object) => Value::Object(object.deep_clone()),
            other => other.clone(),
        }
    }

    /// True when both values are handles onto the same backing store.
    /// Scalars never share state.
    pub fn shares_state(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Object(a), Value::Object(b)) => a.shares_store(b),
            (Value::List(a), Value::List(b)) => a.shares_store(b),
            (Value::Function(a), Value::Function(b)) => a.shares_fn(b),
            _ => false,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_float(&self) -> Option<f64> {
        match self {
            Value::Float(x) => Some(*x),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Value::Text(t) => Some(t),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&ListRef> {
        match self {
            Value::List(list) => Some(list),
            _ => None,
        }
    }

    pub fn as_object(&self) -> Option<&ObjectRef> {
        match self {
            Value::Object(object) => Some(object),
            _ => None,
        }
    }

    pub fn as_function(&self) -> Option<&FunctionRef> {
        match self {
            Value::Function(f) => Some(f),
            _ => None,
        }
    }

    /// Invoke a function value; anything else is `NotCallable`.
    pub fn call(&self, args: &[Value]) -> GraftResult<Value> {
        match self {
            Value::Function(f) => f.call(args),
            other => Err(GraftError::NotCallable { kind: other.kind() }),
        }
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Bool(value)
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Value::Int(value)
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Value::Float(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::Text(value.to_string())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::Text(value)
    }
}

impl From<ObjectRef> for Value {
    fn from(value: ObjectRef) -> Self {
        Value::Object(value)
    }
}

impl From<ListRef> for Value {
    fn from(value: ListRef) -> Self {
        Value::List(value)
    }
}

impl From<FunctionRef> for Value {
    fn from(value: FunctionRef) -> Self {
        Value::Function(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_template() -> ObjectRef {
        ObjectRef::from_entries([
            ("count", Value::Int(0)),
            ("label", Value::from("nests")),
            ("items", Value::List(ListRef::new())),
        ])
    }

    #[test]
    fn test_object_clone_shares_store() {
        let object = make_template();
        let handle = object.clone();
        handle.insert("count", Value::Int(3));
        assert_eq!(object.get("count").unwrap().as_int(), Some(3));
        assert!(object.shares_store(&handle));
    }

    #[test]
    fn test_deep_clone_copies_collections() {
        let object = make_template();
        let copy = Value::Object(object.clone()).deep_clone();
        let copy = copy.as_object().unwrap().clone();
        copy.insert("count", Value::Int(9));
        assert_eq!(object.get("count").unwrap().as_int(), Some(0));
        assert!(!object.shares_store(&copy));

        // nested collections are copied too
        let inner = object.get("items").unwrap();
        let inner_copy = copy.get("items").unwrap();
        assert!(!inner.shares_state(&inner_copy));
    }

    #[test]
    fn test_deep_clone_shares_functions() {
        let f = Value::function(|_| Ok(Value::Int(1)));
        let object = ObjectRef::from_entries([("f", f.clone())]);
        let copy = Value::Object(object).deep_clone();
        let copied_f = copy.as_object().unwrap().get("f").unwrap();
        assert!(f.shares_state(&copied_f));
    }

    #[test]
    fn test_constructible_kinds() {
        assert!(Value::text("petals").is_constructible());
        assert!(Value::Object(ObjectRef::new()).is_constructible());
        assert!(Value::List(ListRef::new()).is_constructible());
        assert!(Value::function(|_| Ok(Value::Null)).is_constructible());
        assert!(!Value::Null.is_constructible());
        assert!(!Value::Bool(true).is_constructible());
        assert!(!Value::Int(7).is_constructible());
        assert!(!Value::Float(1.5).is_constructible());
    }

    #[test]
    fn test_function_call_threads_args() {
        let double = Value::function(|args| {
            let n = args[0].as_int().unwrap_or(0);
            Ok(Value::Int(n * 2))
        });
        let result = double.call(&[Value::Int(21)]).unwrap();
        assert_eq!(result.as_int(), Some(42));
    }

    #[test]
    fn test_calling_a_non_function_fails() {
        let err = Value::Int(5).call(&[]).unwrap_err();
        assert!(matches!(err, GraftError::NotCallable { kind: "int" }));
    }

    #[test]
    fn test_counter_closure_keeps_state() {
        use std::cell::Cell;
        let count = Rc::new(Cell::new(0i64));
        let counter = {
            let count = Rc::clone(&count);
            Value::function(move |_| {
                count.set(count.get() + 1);
                Ok(Value::Int(count.get()))
            })
        };
        assert_eq!(counter.call(&[]).unwrap().as_int(), Some(1));
        assert_eq!(counter.call(&[]).unwrap().as_int(), Some(2));
        assert_eq!(count.get(), 2);
    }
}
