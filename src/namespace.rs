//! Namespaces: the table of lazily produced records an expression filters.
//!
//! Keys of the table are themselves namespaced (`"com.example::cpu"`), so a
//! bare key used in an expression is resolved with a fallback, see
//! [`Namespace::resolve`]. Splitting a table for the branches of an `or`
//! tees every record sequence, merging the branches back de-duplicates.

use std::cell::RefCell;
use std::collections::{BTreeMap, BTreeSet, HashSet, VecDeque};
use std::fmt;
use std::hash::BuildHasherDefault;
use std::rc::Rc;

// we will use a fast hashing algo for the record hashsets
use seahash::SeaHasher;

use crate::error::{ResourceError, Result};
use crate::value::{Record, Resources};

/// Built-in fallback qualifier, e.g. for the universally available manifest.
pub const DEFAULT_NAMESPACE: &str = "com.canonical.plainbox";

pub type RecordHasher = BuildHasherDefault<SeaHasher>;

/// The materialised outcome of an evaluation.
pub type Evaluation = BTreeMap<String, Vec<Record>>;

// ------------- Records -------------
/// A lazy, single pass sequence of records. Runtime failures (a cast that
/// cannot convert, an ordering between unrelated types) travel inside the
/// sequence as `Err` items.
pub struct Records<'a>(Box<dyn Iterator<Item = Result<Record>> + 'a>);

impl<'a> Records<'a> {
    pub fn new<I>(items: I) -> Self
    where
        I: IntoIterator<Item = Result<Record>>,
        I::IntoIter: 'a,
    {
        Records(Box::new(items.into_iter()))
    }

    pub fn from_records<I>(records: I) -> Self
    where
        I: IntoIterator<Item = Record>,
        I::IntoIter: 'a,
    {
        Records(Box::new(records.into_iter().map(Ok)))
    }

    pub fn empty() -> Self {
        Records(Box::new(std::iter::empty()))
    }
}

impl Iterator for Records<'_> {
    type Item = Result<Record>;
    fn next(&mut self) -> Option<Self::Item> {
        self.0.next()
    }
}

impl fmt::Debug for Records<'_> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "Records(..)")
    }
}

// ------------- Tee -------------
// Shared state of the consumers of one source. Every item is pulled from the
// source once and queued for each live consumer that has not seen it yet.
struct TeeBuffer<'a> {
    source: Records<'a>,
    queues: Vec<Option<VecDeque<Result<Record>>>>,
}

struct Tee<'a> {
    buffer: Rc<RefCell<TeeBuffer<'a>>>,
    index: usize,
}

impl Iterator for Tee<'_> {
    type Item = Result<Record>;
    fn next(&mut self) -> Option<Self::Item> {
        let mut buffer = self.buffer.borrow_mut();
        if let Some(item) = buffer.queues[self.index].as_mut().and_then(VecDeque::pop_front) {
            return Some(item);
        }
        let item = buffer.source.next()?;
        for (index, queue) in buffer.queues.iter_mut().enumerate() {
            if index == self.index {
                continue;
            }
            if let Some(queue) = queue {
                queue.push_back(item.clone());
            }
        }
        Some(item)
    }
}

// a dropped consumer no longer holds back the buffer
impl Drop for Tee<'_> {
    fn drop(&mut self) {
        if let Ok(mut buffer) = self.buffer.try_borrow_mut() {
            buffer.queues[self.index] = None;
        }
    }
}

/// Splits one sequence into `count` independent cursors over the same data.
pub fn tee<'a>(records: Records<'a>, count: usize) -> Vec<Records<'a>> {
    match count {
        0 => Vec::new(),
        1 => vec![records],
        _ => {
            let buffer = Rc::new(RefCell::new(TeeBuffer {
                source: records,
                queues: (0..count).map(|_| Some(VecDeque::new())).collect(),
            }));
            (0..count).map(|index| Records::new(Tee { buffer: Rc::clone(&buffer), index })).collect()
        }
    }
}

/// Concatenates sequences, yielding each structurally distinct record once.
pub fn chain_unique<'a>(sequences: Vec<Records<'a>>) -> Records<'a> {
    let mut seen: HashSet<Record, RecordHasher> = HashSet::default();
    Records::new(sequences.into_iter().flatten().filter(move |item| match item {
        Ok(record) => seen.insert(record.clone()),
        Err(_) => true,
    }))
}

// ------------- Namespace -------------
#[derive(Debug)]
pub struct Namespace<'a> {
    implicit_namespace: String,
    table: BTreeMap<String, Records<'a>>,
}

impl<'a> Namespace<'a> {
    pub fn new(implicit_namespace: impl Into<String>) -> Self {
        Self {
            implicit_namespace: implicit_namespace.into(),
            table: BTreeMap::new(),
        }
    }

    /// Lazily clones the records of a re-iterable table; `resources` itself is
    /// never touched.
    pub fn from_resources(implicit_namespace: impl Into<String>, resources: &'a Resources) -> Self {
        let mut namespace = Self::new(implicit_namespace);
        for (name, records) in resources {
            namespace.table.insert(name.clone(), Records::from_records(records.iter().cloned()));
        }
        namespace
    }

    /// Adds `records` under exactly `name`, replacing anything stored there.
    pub fn with(mut self, name: impl Into<String>, records: Records<'a>) -> Self {
        self.table.insert(name.into(), records);
        self
    }

    pub fn implicit_namespace(&self) -> &str {
        &self.implicit_namespace
    }

    /// Finds the stored key a name refers to. In order of priority:
    /// 1. the name itself
    /// 2. `implicit_namespace::name`
    /// 3. `DEFAULT_NAMESPACE::name`
    pub fn resolve(&self, name: &str) -> Result<&str> {
        if let Some((key, _)) = self.table.get_key_value(name) {
            return Ok(key);
        }
        for qualifier in [self.implicit_namespace.as_str(), DEFAULT_NAMESPACE] {
            if let Some((key, _)) = self.table.get_key_value(&format!("{}::{}", qualifier, name)) {
                return Ok(key);
            }
        }
        Err(ResourceError::UnknownNamespace(name.to_string()))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.resolve(name).is_ok()
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut Records<'a>> {
        let key = self.resolve(name).ok()?.to_string();
        self.table.get_mut(&key)
    }

    /// Stores `records` under the key `name` already resolves to, or under
    /// `name` unqualified when it resolves to nothing.
    pub fn set(&mut self, name: &str, records: Records<'a>) {
        let key = self.resolve(name).map(str::to_string).unwrap_or_else(|_| name.to_string());
        self.table.insert(key, records);
    }

    /// Replaces the records `name` resolves to with `f` of them. Returns false,
    /// leaving the table untouched, when `name` resolves to nothing.
    pub fn update<F>(&mut self, name: &str, f: F) -> bool
    where
        F: FnOnce(Records<'a>) -> Records<'a>,
    {
        match self.get_mut(name) {
            Some(records) => {
                let taken = std::mem::replace(records, Records::empty());
                *records = f(taken);
                true
            }
            None => false,
        }
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.table.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.table.len()
    }

    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }

    /// Splits the table into `count` tables whose sequences are tees of this
    /// one's, so each can be filtered independently.
    pub fn duplicate(self, count: usize) -> Vec<Namespace<'a>> {
        let mut namespaces: Vec<Namespace<'a>> = (0..count).map(|_| Namespace::new(self.implicit_namespace.clone())).collect();
        for (name, records) in self.table {
            for (namespace, copy) in namespaces.iter_mut().zip(tee(records, count)) {
                namespace.table.insert(name.clone(), copy);
            }
        }
        namespaces
    }

    /// Key union of both tables, sequences present in both are concatenated
    /// without repeating a record.
    pub fn union(mut self, mut other: Namespace<'a>) -> Namespace<'a> {
        let names: BTreeSet<String> = self.table.keys().chain(other.table.keys()).cloned().collect();
        let mut merged = Namespace::new(self.implicit_namespace.clone());
        for name in names {
            let sequences: Vec<Records<'a>> = [self.table.remove(&name), other.table.remove(&name)].into_iter().flatten().collect();
            merged.table.insert(name, chain_unique(sequences));
        }
        merged
    }

    /// Drains every sequence into a list.
    pub fn materialize(self) -> Result<Evaluation> {
        self.table
            .into_iter()
            .map(|(name, records)| Ok((name, records.collect::<Result<Vec<_>>>()?)))
            .collect()
    }

    /// Advances every sequence once: does it hold at least one record?
    pub fn probe(self) -> Result<BTreeMap<String, bool>> {
        self.table
            .into_iter()
            .map(|(name, mut records)| Ok((name, records.next().transpose()?.is_some())))
            .collect()
    }
}

impl<'a> IntoIterator for Namespace<'a> {
    type Item = (String, Records<'a>);
    type IntoIter = std::collections::btree_map::IntoIter<String, Records<'a>>;
    fn into_iter(self) -> Self::IntoIter {
        self.table.into_iter()
    }
}
