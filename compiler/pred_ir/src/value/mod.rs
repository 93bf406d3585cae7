//! Runtime values produced by expression nodes.
//!
//! A [`Value`] is a named piece of transaction data: a byte string, an
//! integer, a float, a [`ValueList`], or a host-provided [`DynamicList`].
//! Names matter only for list members (`ask` selects members by name);
//! values created by the engine itself are anonymous.
//!
//! Values are cheap to clone: every payload is either `Copy` or behind an
//! `Arc`.

use std::fmt;
use std::sync::Arc;

use parking_lot::{MappedRwLockReadGuard, RwLock, RwLockReadGuard};

/// Errors raised when mutating a [`ValueList`].
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum ValueError {
    /// Finished lists never grow again.
    #[error("cannot append to a finished value list")]
    AppendToFinished,
}

/// Payload of a [`Value`].
#[derive(Clone)]
pub enum ValueData {
    /// Byte string; not necessarily UTF-8.
    String(Arc<[u8]>),
    Number(i64),
    Float(f64),
    /// Ordered list of values shared with whoever produced it.
    List(ValueList),
    /// Host collection computed on demand, looked up by member name.
    Dynamic(Arc<dyn DynamicList>),
}

/// A named value.
#[derive(Clone)]
pub struct Value {
    name: Arc<str>,
    data: ValueData,
}

impl Value {
    /// Create a value with an explicit name.
    pub fn new(name: impl Into<Arc<str>>, data: ValueData) -> Self {
        Value {
            name: name.into(),
            data,
        }
    }

    /// Anonymous byte string value.
    pub fn bytes(bytes: impl AsRef<[u8]>) -> Self {
        Value::new("", ValueData::String(Arc::from(bytes.as_ref())))
    }

    /// Anonymous string value.
    pub fn string(s: &str) -> Self {
        Value::bytes(s.as_bytes())
    }

    /// Anonymous integer value.
    pub fn number(n: i64) -> Self {
        Value::new("", ValueData::Number(n))
    }

    /// Anonymous float value.
    pub fn float(f: f64) -> Self {
        Value::new("", ValueData::Float(f))
    }

    /// Anonymous list value.
    pub fn list(list: ValueList) -> Self {
        Value::new("", ValueData::List(list))
    }

    /// Anonymous dynamic collection.
    pub fn dynamic(collection: Arc<dyn DynamicList>) -> Self {
        Value::new("", ValueData::Dynamic(collection))
    }

    /// The canonical truthy value: an anonymous empty string.
    pub fn truthy() -> Self {
        Value::bytes(b"")
    }

    /// Same payload under a different name.
    #[must_use]
    pub fn with_name(self, name: impl Into<Arc<str>>) -> Self {
        Value {
            name: name.into(),
            data: self.data,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn data(&self) -> &ValueData {
        &self.data
    }

    pub fn as_bytes(&self) -> Option<&[u8]> {
        match &self.data {
            ValueData::String(bytes) => Some(bytes),
            _ => None,
        }
    }

    /// String payload, if it is valid UTF-8.
    pub fn as_str(&self) -> Option<&str> {
        self.as_bytes().and_then(|b| std::str::from_utf8(b).ok())
    }

    pub fn as_number(&self) -> Option<i64> {
        match self.data {
            ValueData::Number(n) => Some(n),
            _ => None,
        }
    }

    pub fn as_float(&self) -> Option<f64> {
        match self.data {
            ValueData::Float(f) => Some(f),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&ValueList> {
        match &self.data {
            ValueData::List(list) => Some(list),
            _ => None,
        }
    }

    pub fn as_dynamic(&self) -> Option<&Arc<dyn DynamicList>> {
        match &self.data {
            ValueData::Dynamic(d) => Some(d),
            _ => None,
        }
    }

    /// Case-insensitive (ASCII) name comparison.
    pub fn name_matches(&self, name: &str) -> bool {
        self.name.eq_ignore_ascii_case(name)
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        if self.name != other.name {
            return false;
        }
        match (&self.data, &other.data) {
            (ValueData::String(a), ValueData::String(b)) => a == b,
            (ValueData::Number(a), ValueData::Number(b)) => a == b,
            // Exact payload, not numeric equality.
            (ValueData::Float(a), ValueData::Float(b)) => a.to_bits() == b.to_bits(),
            (ValueData::List(a), ValueData::List(b)) => a.ptr_eq(b) || a.snapshot() == b.snapshot(),
            (ValueData::Dynamic(a), ValueData::Dynamic(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if !self.name.is_empty() {
            write!(f, "{}=", self.name)?;
        }
        match &self.data {
            ValueData::String(bytes) => write!(f, "{:?}", String::from_utf8_lossy(bytes)),
            ValueData::Number(n) => write!(f, "{n}"),
            ValueData::Float(x) => write!(f, "{x:?}"),
            ValueData::List(list) => write!(f, "{list:?}"),
            ValueData::Dynamic(d) => write!(f, "{d:?}"),
        }
    }
}

/// A host collection whose members are computed on request.
///
/// Implementations must be thread-safe: the same collection may be read by
/// evaluation of many transactions at once.
pub trait DynamicList: fmt::Debug + Send + Sync {
    /// Members named `name`, or `None` when there are none.
    fn lookup(&self, name: &str) -> Option<ValueList>;
}

struct ListInner {
    values: Vec<Value>,
    finished: bool,
}

/// Append-only list of values with a one-way finished flag.
///
/// Clones share storage. The host appends to a list it handed out (e.g. a
/// header collection growing as the request streams in) and every alias of
/// it observes the new members immediately.
#[derive(Clone)]
pub struct ValueList {
    inner: Arc<RwLock<ListInner>>,
}

impl ValueList {
    /// Create an empty, open list.
    pub fn new() -> Self {
        ValueList::open(Vec::new())
    }

    /// Create an open list with initial members.
    pub fn open(values: Vec<Value>) -> Self {
        ValueList {
            inner: Arc::new(RwLock::new(ListInner {
                values,
                finished: false,
            })),
        }
    }

    /// Create a list that will never grow.
    pub fn finished(values: Vec<Value>) -> Self {
        ValueList {
            inner: Arc::new(RwLock::new(ListInner {
                values,
                finished: true,
            })),
        }
    }

    /// Append a member.
    pub fn push(&self, value: Value) -> Result<(), ValueError> {
        let mut inner = self.inner.write();
        if inner.finished {
            return Err(ValueError::AppendToFinished);
        }
        inner.values.push(value);
        Ok(())
    }

    /// Mark the list complete. Returns `false` if it already was.
    pub fn finish(&self) -> bool {
        let mut inner = self.inner.write();
        !std::mem::replace(&mut inner.finished, true)
    }

    pub fn is_finished(&self) -> bool {
        self.inner.read().finished
    }

    pub fn len(&self) -> usize {
        self.inner.read().values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.read().values.is_empty()
    }

    /// Borrow the current members.
    ///
    /// Holds a read lock; drop the guard before pushing to the same list.
    pub fn read(&self) -> MappedRwLockReadGuard<'_, [Value]> {
        RwLockReadGuard::map(self.inner.read(), |inner| inner.values.as_slice())
    }

    /// Copy of the current members.
    pub fn snapshot(&self) -> Vec<Value> {
        self.inner.read().values.clone()
    }

    /// Copy of the members from position `from` on.
    pub fn snapshot_from(&self, from: usize) -> Vec<Value> {
        self.inner
            .read()
            .values
            .get(from..)
            .map(<[Value]>::to_vec)
            .unwrap_or_default()
    }

    /// Do both handles share storage?
    pub fn ptr_eq(&self, other: &ValueList) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl Default for ValueList {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for ValueList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let inner = self.inner.read();
        f.debug_list().entries(inner.values.iter()).finish()?;
        if !inner.finished {
            write!(f, "..")?;
        }
        Ok(())
    }
}
