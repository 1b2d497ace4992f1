use crate::runtime::{
    error::{RuntimeError, RuntimeResult},
    value::{quote, Value},
};
use indexmap::IndexMap;
use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;
use tracing::{debug, trace};

/// A dynamic bag of own properties plus an optional delegate that is
/// consulted when a key is missing. Cloning a `Record` clones the handle, not
/// the properties.
#[derive(Clone, Default)]
pub struct Record {
    inner: Rc<RefCell<RecordData>>,
}

#[derive(Default)]
struct RecordData {
    properties: IndexMap<String, Value>,
    delegate: Option<Record>,
    /// Set on prototype records: the name of the constructor that owns them.
    constructor: Option<String>,
}

impl Record {
    pub fn new() -> Self {
        Self::default()
    }

    /// A fresh record whose delegate is `delegate`.
    pub fn with_delegate(delegate: &Record) -> Self {
        let record = Self::new();
        record.inner.borrow_mut().delegate = Some(delegate.clone());
        record
    }

    pub(crate) fn prototype_for(constructor: &str) -> Self {
        let record = Self::new();
        record.inner.borrow_mut().constructor = Some(constructor.to_string());
        record
    }

    pub fn ptr_eq(&self, other: &Record) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }

    pub fn get_own(&self, key: &str) -> Option<Value> {
        self.inner.borrow().properties.get(key).cloned()
    }

    pub fn has_own(&self, key: &str) -> bool {
        self.inner.borrow().properties.contains_key(key)
    }

    pub fn own_keys(&self) -> Vec<String> {
        self.inner.borrow().properties.keys().cloned().collect()
    }

    /// Creates or overwrites an own property. Delegates are never written.
    pub fn set(&self, key: impl Into<String>, value: impl Into<Value>) {
        self.inner
            .borrow_mut()
            .properties
            .insert(key.into(), value.into());
    }

    pub fn delegate(&self) -> Option<Record> {
        self.inner.borrow().delegate.clone()
    }

    pub fn set_delegate(&self, delegate: Option<Record>) -> RuntimeResult<()> {
        if let Some(candidate) = &delegate {
            if candidate.chain().any(|record| record.ptr_eq(self)) {
                return Err(RuntimeError::DelegateCycle);
            }
        }
        self.inner.borrow_mut().delegate = delegate;
        Ok(())
    }

    /// This record followed by every delegate down to the end of the chain.
    pub fn chain(&self) -> Chain {
        Chain {
            next: Some(self.clone()),
        }
    }

    /// Name of the nearest constructor along the delegate chain.
    pub fn label(&self) -> Option<String> {
        self.chain()
            .skip(1)
            .find_map(|record| record.inner.borrow().constructor.clone())
    }

    pub fn resolve(&self, key: &str) -> Option<Value> {
        self.resolve_with_owner(key).map(|(_, value)| value)
    }

    /// Looks `key` up on this record, then along the delegate chain, and
    /// returns the first match together with the record that owns it.
    pub fn resolve_with_owner(&self, key: &str) -> Option<(Record, Value)> {
        for (hops, record) in self.chain().enumerate() {
            if let Some(value) = record.get_own(key) {
                trace!(key, hops, "property resolved");
                return Some((record, value));
            }
        }
        trace!(key, "property not found on chain");
        None
    }

    /// Resolves `key` and calls it with this record as the receiver.
    pub fn invoke(&self, key: &str, args: &[Value]) -> RuntimeResult<Value> {
        match self.resolve_with_owner(key) {
            Some((owner, Value::Function(function))) => {
                let inherited = !owner.ptr_eq(self);
                debug!(key, inherited, "dispatching method");
                function.call(self, args)
            }
            Some((_, other)) => Err(RuntimeError::NotCallable {
                key: key.to_string(),
                type_name: other.type_name(),
            }),
            None => Err(RuntimeError::MissingMethod {
                key: key.to_string(),
            }),
        }
    }
}

pub struct Chain {
    next: Option<Record>,
}

impl Iterator for Chain {
    type Item = Record;

    fn next(&mut self) -> Option<Record> {
        let current = self.next.take()?;
        self.next = current.delegate();
        Some(current)
    }
}

/// Console lines wider than this are broken into one entry per line.
const BREAK_LENGTH: usize = 80;
const NULL_PROTOTYPE: &str = "[Object: null prototype]";

/// What a record is called in a dump.
enum Prefix {
    /// Created through a constructor, directly or via `Object.create`.
    Constructor(String),
    /// A constructor's own prototype.
    Plain,
    /// No delegate and no constructor.
    NullPrototype,
    /// Delegates somewhere, but no record on the chain belongs to a
    /// constructor. Carries the collapsed form of the delegate.
    Orphan(String),
}

impl Record {
    fn prefix(&self) -> Prefix {
        if let Some(label) = self.label() {
            return Prefix::Constructor(label);
        }
        if self.inner.borrow().constructor.is_some() {
            return Prefix::Plain;
        }
        // Nothing on the chain has a constructor, so every delegate is an
        // orphan itself except the last one.
        let delegates = self.chain().count() - 1;
        if delegates == 0 {
            return Prefix::NullPrototype;
        }
        let mut collapsed = NULL_PROTOTYPE.to_string();
        for _ in 1..delegates {
            collapsed = format!("[Object <{collapsed}>]");
        }
        Prefix::Orphan(format!("Object <{collapsed}>"))
    }

    /// The short form used when the record is nested inside another dump.
    pub fn collapsed(&self) -> String {
        match self.prefix() {
            Prefix::Constructor(name) | Prefix::Orphan(name) => format!("[{name}]"),
            Prefix::Plain => "[Object]".to_string(),
            Prefix::NullPrototype => NULL_PROTOTYPE.to_string(),
        }
    }
}

impl fmt::Display for Record {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let open = match self.prefix() {
            Prefix::Constructor(name) | Prefix::Orphan(name) => format!("{name} {{"),
            Prefix::Plain => "{".to_string(),
            Prefix::NullPrototype => format!("{NULL_PROTOTYPE} {{"),
        };
        let entries: Vec<String> = self
            .inner
            .borrow()
            .properties
            .iter()
            .map(|(key, value)| format!("{}: {}", inspect_key(key), value.inspect()))
            .collect();

        if entries.is_empty() {
            write!(f, "{open}}}")
        } else if fits_on_one_line(&open, &entries) {
            write!(f, "{open} {} }}", entries.join(", "))
        } else {
            write!(f, "{open}\n  {}\n}}", entries.join(",\n  "))
        }
    }
}

/// Same budget Node's `util.inspect` applies at the top level: every entry
/// is charged for its text plus two separator columns, and the opening brace
/// plus ten columns of slack come on top.
fn fits_on_one_line(open: &str, entries: &[String]) -> bool {
    let mut total = 2 * entries.len() + open.chars().count() + 10;
    if total + entries.len() > BREAK_LENGTH {
        return false;
    }
    for entry in entries {
        total += entry.chars().count();
        if total > BREAK_LENGTH {
            return false;
        }
    }
    true
}

fn inspect_key(key: &str) -> String {
    let mut chars = key.chars();
    let plain = chars
        .next()
        .is_some_and(|ch| ch.is_ascii_alphabetic() || ch == '_')
        && chars.all(|ch| ch.is_ascii_alphanumeric() || ch == '_');
    if plain {
        key.to_string()
    } else {
        quote(key)
    }
}

impl fmt::Debug for Record {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Record({self})")
    }
}
