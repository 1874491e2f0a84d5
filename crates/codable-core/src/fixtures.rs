//! Types shared by the unit tests of this crate.

use std::collections::HashMap;
use std::sync::Arc;

use codable_macros::{Codable, CodableEnum};
use serde_json::{Value, json};

use crate::error::{ConstructError, DecodeResult, HookError};
use crate::foundation::node::ObjectView;
use crate::hydrate::{CustomDecode, Hydrator, PostDecode};

pub trait Filter {
    fn describe(&self) -> String;
}

crate::plugin_base!(dyn Filter, category = "filter");

#[derive(Debug, Default, Codable)]
#[codable(base = dyn Filter)]
pub struct Upper {
    pub pattern: String,
}

impl Filter for Upper {
    fn describe(&self) -> String {
        format!("upper({})", self.pattern)
    }
}

#[derive(Default, Codable)]
#[codable(base = dyn Filter)]
pub struct Chain {
    pub filters: Vec<Box<dyn Filter>>,
    pub any: bool,
}

impl Filter for Chain {
    fn describe(&self) -> String {
        let inner: Vec<String> = self.filters.iter().map(|filter| filter.describe()).collect();
        format!("chain[{}]", inner.join(", "))
    }
}

#[derive(Default, Codable)]
#[codable(base = dyn Filter)]
pub struct Not {
    pub filter: Option<Box<dyn Filter>>,
}

impl Filter for Not {
    fn describe(&self) -> String {
        match &self.filter {
            Some(filter) => format!("not({})", filter.describe()),
            None => String::from("not()"),
        }
    }
}

#[derive(Debug, Default, Codable)]
pub struct Limits {
    pub soft: u32,
    pub hard: u32,
}

#[derive(Debug, Default, Codable)]
#[codable(base = dyn Filter)]
pub struct Length {
    pub min: usize,
    pub max: usize,
    pub limits: Limits,
}

impl Filter for Length {
    fn describe(&self) -> String {
        format!(
            "length({}..{} soft={} hard={})",
            self.min, self.max, self.limits.soft, self.limits.hard
        )
    }
}

#[derive(Debug, Default, Codable)]
#[codable(base = dyn Filter, custom_decode)]
pub struct Exact {
    pub value: String,
    pub seen: Vec<String>,
}

impl CustomDecode for Exact {
    fn decode_from(&mut self, node: ObjectView<'_>, cx: &mut Hydrator<'_>) -> DecodeResult<()> {
        self.seen = node.keys().map(str::to_owned).collect();
        self.value = cx.decode_field::<String>(node, "is")?.unwrap_or_default();
        Ok(())
    }
}

impl Filter for Exact {
    fn describe(&self) -> String {
        format!("exact({}) keys={:?}", self.value, self.seen)
    }
}

#[derive(Debug, Default, Codable)]
#[codable(base = dyn Filter, post_decode)]
pub struct Between {
    pub low: i32,
    pub high: i32,
}

impl PostDecode for Between {
    fn post_decode(&mut self) -> Result<(), HookError> {
        if self.low > self.high {
            return Err(HookError::new("low exceeds high"));
        }
        Ok(())
    }
}

impl Filter for Between {
    fn describe(&self) -> String {
        format!("between({}, {})", self.low, self.high)
    }
}

/// Decodable, but not a filter.
#[derive(Debug, Default, Codable)]
pub struct Stranger {
    pub x: i32,
}

pub trait Sink {
    fn id(&self) -> u32;
}

crate::plugin_base!(dyn Sink, category = "sink");

#[derive(Debug, Default, Codable)]
#[codable(base = dyn Sink)]
pub struct Drain {
    pub id: u32,
}

impl Sink for Drain {
    fn id(&self) -> u32 {
        self.id
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, CodableEnum)]
pub enum Mode {
    Fast,
    SlowAndSteady,
    #[codable(rename = "lazy")]
    Idle,
}

#[derive(Debug, Default, Codable)]
pub struct Common {
    pub id: String,
    pub tags: Vec<String>,
}

#[derive(Default, Codable)]
pub struct Pipeline {
    pub mode: Option<Mode>,
    pub filter: Option<Box<dyn Filter>>,
    pub shared: Option<Arc<dyn Filter>>,
    #[codable(intern)]
    pub weights: HashMap<Arc<str>, f64>,
    pub plain: HashMap<Arc<str>, f64>,
    #[codable(write_only)]
    pub secret: String,
    #[codable(rename = "max-depth")]
    pub max_depth: u16,
    #[codable(skip)]
    pub runs: u32,
    #[codable(flatten)]
    pub common: Common,
}

#[derive(Debug, Codable)]
#[codable(constructor = Guarded::create)]
pub struct Guarded {
    pub level: u8,
}

impl Guarded {
    fn create() -> Result<Self, ConstructError> {
        Ok(Self { level: 3 })
    }
}

#[derive(Debug, Codable)]
#[codable(constructor = Broken::create)]
pub struct Broken {
    pub level: u8,
}

impl Broken {
    fn create() -> Result<Self, ConstructError> {
        Err(ConstructError::new("no default available"))
    }
}

/// Dotted name of a type declared in this module.
pub fn qualified(ident: &str) -> String {
    format!("{}.{ident}", module_path!().replace("::", "."))
}

/// A fully featured `filter` category section.
pub fn filter_section() -> Value {
    json!({
        "_field": "type",
        "_strict": true,
        "_class": qualified("Filter"),
        "_array": "chain",
        "_default": "upper",
        "upper": "Upper",
        "chain": "Chain",
        "not": "Not",
        "exact": "Exact",
        "between": "Between",
        "length": "Length",
        "short": {"_class": "length", "max": 5, "min": 0},
        "tiny": {"_class": "short", "_inline": true, "max": 2},
        "boxed": {"_class": "length", "_inline": true, "limits": {"soft": 1, "hard": 10}},
        "flat": {"_class": "length", "limits": {"soft": 1, "hard": 10}},
    })
}
