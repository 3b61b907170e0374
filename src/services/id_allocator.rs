//! Sequential item codes (`PREFIX-NNNN`).
//!
//! Each category owns a numeric range under the shared item prefix; plasmids
//! have their own prefix. Allocation is first-fit: the lowest free number in
//! the range wins, so numbers released by deleted items are handed out again.

use std::collections::BTreeSet;
use std::fmt;
use std::ops::RangeInclusive;
use std::sync::Arc;

use log::debug;

use crate::error::{InventoryError, InventoryResult};
use crate::models::{Category, INVENTORY_ITEM};
use crate::store::{DocumentStore, Filter};

pub const PLASMID: &str = "plasmid";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IdNamespace {
    Category(Category),
    Plasmid,
}

impl IdNamespace {
    pub fn range(&self) -> RangeInclusive<u32> {
        match self {
            IdNamespace::Category(Category::Equipment) => 1..=999,
            IdNamespace::Category(Category::General) => 1000..=5999,
            IdNamespace::Category(Category::Biological) => 6000..=9999,
            IdNamespace::Plasmid => 1..=9999,
        }
    }

    fn doc_type(&self) -> &'static str {
        match self {
            IdNamespace::Category(_) => INVENTORY_ITEM,
            IdNamespace::Plasmid => PLASMID,
        }
    }

    fn id_field(&self) -> &'static str {
        match self {
            IdNamespace::Category(_) => "itemId",
            IdNamespace::Plasmid => "plasmidId",
        }
    }
}

impl From<Category> for IdNamespace {
    fn from(category: Category) -> Self {
        IdNamespace::Category(category)
    }
}

impl std::str::FromStr for IdNamespace {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.trim().eq_ignore_ascii_case("plasmid") {
            return Ok(IdNamespace::Plasmid);
        }
        s.parse::<Category>().map(IdNamespace::Category)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemCode {
    pub prefix: String,
    pub number: u32,
}

impl fmt::Display for ItemCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{:04}", self.prefix, self.number)
    }
}

/// Returns the numeric suffix when `code` is exactly `PREFIX-<digits>`.
pub fn parse_suffix(prefix: &str, code: &str) -> Option<u32> {
    let digits = code.strip_prefix(prefix)?.strip_prefix('-')?;
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    digits.parse().ok()
}

/// Lowest number in `range` not present in `used`.
pub fn first_free(range: RangeInclusive<u32>, used: &BTreeSet<u32>) -> Option<u32> {
    range.into_iter().find(|n| !used.contains(n))
}

/// Pure allocation step over an already-fetched set of codes.
pub fn next_code<'a, I>(namespace: IdNamespace, prefix: &str, existing: I) -> Option<ItemCode>
where
    I: IntoIterator<Item = &'a str>,
{
    let used: BTreeSet<u32> = existing
        .into_iter()
        .filter_map(|code| parse_suffix(prefix, code))
        .collect();
    first_free(namespace.range(), &used).map(|number| ItemCode {
        prefix: prefix.to_string(),
        number,
    })
}

#[derive(Debug, Clone)]
pub struct IdPrefixes {
    pub item: String,
    pub plasmid: String,
}

impl Default for IdPrefixes {
    fn default() -> Self {
        Self {
            item: "LAB".to_string(),
            plasmid: "PLS".to_string(),
        }
    }
}

#[derive(Clone)]
pub struct IdAllocator {
    store: Arc<dyn DocumentStore>,
    prefixes: IdPrefixes,
}

impl IdAllocator {
    pub fn new(store: Arc<dyn DocumentStore>, prefixes: IdPrefixes) -> Self {
        Self { store, prefixes }
    }

    pub fn prefix_for(&self, namespace: IdNamespace) -> &str {
        match namespace {
            IdNamespace::Category(_) => &self.prefixes.item,
            IdNamespace::Plasmid => &self.prefixes.plasmid,
        }
    }

    /// Scans the codes currently in use and returns the first free one.
    /// Nothing is reserved: two callers can get the same answer, so the write
    /// that follows must be guarded by a unique constraint.
    pub async fn next_free(&self, namespace: IdNamespace) -> InventoryResult<ItemCode> {
        let prefix = self.prefix_for(namespace).to_string();
        let field = namespace.id_field();
        let filter = Filter::by_type(namespace.doc_type()).prefix(field, format!("{}-", prefix));

        let docs = self.store.query(&filter).await?;
        let existing: Vec<&str> = docs
            .iter()
            .filter_map(|d| d.field(field).and_then(|v| v.as_str()))
            .collect();

        let code = next_code(namespace, &prefix, existing.iter().copied()).ok_or_else(|| {
            let range = namespace.range();
            InventoryError::precondition(format!(
                "no free {} ids left between {} and {}",
                prefix,
                range.start(),
                range.end()
            ))
        })?;

        debug!("next free id for {:?}: {} ({} in use)", namespace, code, existing.len());
        Ok(code)
    }
}
