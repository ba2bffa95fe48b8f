// File: crates/chart-data/src/ordinal.rs
// Summary: Ordinal registry; interns category labels to stable integer codes.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::parse::number_to_key;
use crate::types::{ParsedValue, RawValue, NULL_VALUE};

static NEXT_UID: AtomicU64 = AtomicU64::new(1);

/// Category list of an ordinal axis.
///
/// In collect mode unknown labels are appended on first sight; in fixed mode they
/// parse to NaN. A code, once handed out, never changes.
#[derive(Debug)]
pub struct OrdinalRegistry {
    uid: u64,
    categories: RefCell<Vec<Rc<str>>>,
    map: RefCell<Option<HashMap<Rc<str>, usize>>>,
    need_collect: bool,
    deduplication: bool,
}

impl OrdinalRegistry {
    pub fn new<I, S>(categories: I, need_collect: bool, deduplication: bool) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            uid: NEXT_UID.fetch_add(1, Ordering::Relaxed),
            categories: RefCell::new(categories.into_iter().map(|c| Rc::from(c.as_ref())).collect()),
            map: RefCell::new(None),
            need_collect,
            deduplication,
        }
    }

    /// Empty registry collecting labels as they are seen, deduplicated.
    pub fn collecting() -> Self {
        Self::new(Vec::<String>::new(), true, true)
    }

    /// Registry over a known category list; unknown labels parse to NaN.
    pub fn fixed<I, S>(categories: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self::new(categories, false, true)
    }

    /// Build from an axis `data` option: declared categories make a fixed registry,
    /// no declaration collects. `{ "value": .. }` entries contribute their value.
    pub fn from_axis_data(data: Option<&[RawValue]>, deduplication: Option<bool>) -> Self {
        let dedup = deduplication != Some(false);
        match data {
            Some(items) => {
                let names: Vec<String> = items.iter().map(category_name).collect();
                Self::new(names, false, dedup)
            }
            None => Self::new(Vec::<String>::new(), true, dedup),
        }
    }

    /// Identity used in store sharing hashes.
    pub fn uid(&self) -> u64 {
        self.uid
    }

    pub fn need_collect(&self) -> bool {
        self.need_collect
    }

    pub fn len(&self) -> usize {
        self.categories.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.categories.borrow().is_empty()
    }

    pub fn category(&self, ordinal: usize) -> Option<Rc<str>> {
        self.categories.borrow().get(ordinal).cloned()
    }

    pub fn categories(&self) -> Vec<Rc<str>> {
        self.categories.borrow().clone()
    }

    /// Pure lookup; never appends.
    pub fn get_ordinal(&self, category: &str) -> Option<usize> {
        self.with_map(|map| map.get(category).copied())
    }

    /// Code for a raw category value. Non-string input to a fixed registry is taken as
    /// an ordinal code already; `null` is missing.
    pub fn parse_and_collect(&self, category: &RawValue) -> f64 {
        match category {
            RawValue::String(s) => self.collect_str(s),
            RawValue::Number(n) => self.collect_number(n.as_f64().unwrap_or(f64::NAN)),
            RawValue::Bool(b) if self.need_collect => self.collect_str(if *b { "true" } else { "false" }),
            _ => f64::NAN,
        }
    }

    /// Same as [`parse_and_collect`](Self::parse_and_collect) for an already parsed cell.
    pub fn parse_and_collect_parsed(&self, value: &ParsedValue) -> f64 {
        match value {
            ParsedValue::Text(s) => self.collect_str(s),
            ParsedValue::Number(n) => self.collect_number(*n),
        }
    }

    fn collect_number(&self, n: f64) -> f64 {
        if n.is_nan() {
            return f64::NAN;
        }
        if !self.need_collect {
            return n;
        }
        self.collect_str(&number_to_key(n))
    }

    fn collect_str(&self, key: &str) -> f64 {
        if matches!(key, "" | "-") {
            return f64::NAN;
        }
        if self.need_collect && !self.deduplication {
            let mut categories = self.categories.borrow_mut();
            categories.push(Rc::from(key));
            return (categories.len() - 1) as f64;
        }
        if let Some(idx) = self.get_ordinal(key) {
            return idx as f64;
        }
        if !self.need_collect {
            return f64::NAN;
        }
        let label: Rc<str> = Rc::from(key);
        let idx = {
            let mut categories = self.categories.borrow_mut();
            categories.push(label.clone());
            categories.len() - 1
        };
        self.with_map(|map| {
            map.insert(label, idx);
        });
        idx as f64
    }

    fn with_map<R>(&self, f: impl FnOnce(&mut HashMap<Rc<str>, usize>) -> R) -> R {
        let mut slot = self.map.borrow_mut();
        let map = slot.get_or_insert_with(|| {
            let categories = self.categories.borrow();
            let mut map = HashMap::with_capacity(categories.len());
            // Duplicated labels resolve to their last position.
            for (i, c) in categories.iter().enumerate() {
                map.insert(c.clone(), i);
            }
            map
        });
        f(map)
    }
}

fn category_name(item: &RawValue) -> String {
    let value = match item {
        RawValue::Object(obj) => obj.get("value").unwrap_or(&NULL_VALUE),
        other => other,
    };
    match value {
        RawValue::String(s) => s.clone(),
        RawValue::Number(n) => number_to_key(n.as_f64().unwrap_or(f64::NAN)),
        RawValue::Null => String::new(),
        other => other.to_string(),
    }
}
