//! Operating category membership and the reconciler that keeps it honest.
//!
//! A vendor advertises subcategories (with an optional custom price); the
//! category set is a pure projection of those subcategories' parents and is
//! recomputed from the *final* subcategory list after every mutation. There is
//! no way to edit the category set directly.

use std::{
  collections::{BTreeSet, HashMap},
  fmt,
};

use futures::future::join_all;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::{Error, Result, store::SubcategoryCatalog};

// ─── Identifiers ─────────────────────────────────────────────────────────────

#[derive(
  Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct SubcategoryId(pub i64);

#[derive(
  Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct CategoryId(pub i64);

impl fmt::Display for SubcategoryId {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { self.0.fmt(f) }
}

impl fmt::Display for CategoryId {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { self.0.fmt(f) }
}

// ─── Entries ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PriceUnit {
  Kg,
  Gram,
  Tonne,
  Piece,
  Litre,
}

/// One advertised subcategory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OperatingSubcategory {
  pub subcategory_id: SubcategoryId,
  pub custom_price:   Option<Decimal>,
  pub price_unit:     Option<PriceUnit>,
  /// Cached parent category. Absent on entries written before the cache
  /// existed, or while the catalog cannot resolve the id.
  #[serde(default)]
  pub category_id:    Option<CategoryId>,
}

/// Caller input to a merge.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubcategoryAddition {
  pub subcategory_id: SubcategoryId,
  pub custom_price:   Option<Decimal>,
  pub price_unit:     Option<PriceUnit>,
}

impl SubcategoryAddition {
  pub fn validate(&self) -> Result<()> {
    if self.subcategory_id.0 <= 0 {
      return Err(Error::Validation(format!(
        "invalid subcategory id {}",
        self.subcategory_id
      )));
    }
    if self.custom_price.is_some_and(|p| p.is_sign_negative()) {
      return Err(Error::Validation(format!(
        "negative price for subcategory {}",
        self.subcategory_id
      )));
    }
    Ok(())
  }
}

/// The advertised subcategories of a participant and their derived category
/// set.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryMembership {
  pub operating_categories:    BTreeSet<CategoryId>,
  pub operating_subcategories: Vec<OperatingSubcategory>,
}

impl CategoryMembership {
  /// Distinct resolved parents of the subcategory list.
  pub fn projected_categories(&self) -> BTreeSet<CategoryId> {
    self
      .operating_subcategories
      .iter()
      .filter_map(|s| s.category_id)
      .collect()
  }

  pub fn is_consistent(&self) -> bool {
    self.operating_categories == self.projected_categories()
  }
}

// ─── Index ───────────────────────────────────────────────────────────────────

/// Subcategories keyed by id. Writes to an existing id replace the entry in
/// place, so list order is the order ids were first seen.
#[derive(Debug, Default)]
pub struct SubcategoryIndex {
  entries:   Vec<OperatingSubcategory>,
  positions: HashMap<SubcategoryId, usize>,
}

impl SubcategoryIndex {
  pub fn new(list: Vec<OperatingSubcategory>) -> Self {
    let mut index = Self::default();
    for entry in list {
      index.upsert(entry);
    }
    index
  }

  pub fn get(&self, id: SubcategoryId) -> Option<&OperatingSubcategory> {
    self.positions.get(&id).map(|&i| &self.entries[i])
  }

  pub fn upsert(&mut self, entry: OperatingSubcategory) {
    match self.positions.get(&entry.subcategory_id) {
      Some(&i) => self.entries[i] = entry,
      None => {
        self.positions.insert(entry.subcategory_id, self.entries.len());
        self.entries.push(entry);
      }
    }
  }

  pub fn retain(&mut self, keep: impl FnMut(&OperatingSubcategory) -> bool) {
    self.entries.retain(keep);
    self.positions = self
      .entries
      .iter()
      .enumerate()
      .map(|(i, e)| (e.subcategory_id, i))
      .collect();
  }

  /// Ids whose parent category is not cached yet.
  pub fn unresolved(&self) -> Vec<SubcategoryId> {
    self
      .entries
      .iter()
      .filter(|e| e.category_id.is_none())
      .map(|e| e.subcategory_id)
      .collect()
  }

  pub fn set_parent(&mut self, id: SubcategoryId, parent: CategoryId) {
    if let Some(&i) = self.positions.get(&id) {
      self.entries[i].category_id = Some(parent);
    }
  }

  /// Finish a mutation: the category set is rebuilt from the final list,
  /// which yields the empty set when no subcategories remain.
  pub fn into_membership(self) -> CategoryMembership {
    let mut membership = CategoryMembership {
      operating_categories:    BTreeSet::new(),
      operating_subcategories: self.entries,
    };
    membership.operating_categories = membership.projected_categories();
    membership
  }
}

// ─── Catalog resolution ──────────────────────────────────────────────────────

/// Resolve the parent category of every id concurrently.
///
/// Results line up with `ids`. A failed lookup is logged and reported as
/// `None`; it never aborts the others.
pub async fn resolve_parents<C>(
  catalog: &C,
  ids: &[SubcategoryId],
) -> Vec<Option<CategoryId>>
where
  C: SubcategoryCatalog,
{
  let lookups = ids.iter().map(|&id| async move {
    match catalog.resolve_parent_category(id).await {
      Ok(parent) => {
        if parent.is_none() {
          tracing::debug!(subcategory_id = %id, "subcategory unknown to catalog");
        }
        parent
      }
      Err(e) => {
        tracing::warn!(
          subcategory_id = %id,
          error = %e,
          "catalog lookup failed; category omitted until resolvable"
        );
        None
      }
    }
  });
  join_all(lookups).await
}

/// Fill in every missing parent the catalog can currently resolve.
pub async fn resolve_missing<C>(catalog: &C, index: &mut SubcategoryIndex)
where
  C: SubcategoryCatalog,
{
  let unresolved = index.unresolved();
  if unresolved.is_empty() {
    return;
  }
  let parents = resolve_parents(catalog, &unresolved).await;
  for (id, parent) in unresolved.into_iter().zip(parents) {
    if let Some(parent) = parent {
      index.set_parent(id, parent);
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn entry(id: i64, cat: Option<i64>) -> OperatingSubcategory {
    OperatingSubcategory {
      subcategory_id: SubcategoryId(id),
      custom_price:   None,
      price_unit:     Some(PriceUnit::Kg),
      category_id:    cat.map(CategoryId),
    }
  }

  #[test]
  fn last_write_wins_in_first_seen_order() {
    let mut a = entry(101, Some(1));
    a.custom_price = Some(Decimal::new(1200, 2));
    let mut b = entry(101, Some(1));
    b.custom_price = Some(Decimal::new(1500, 2));

    let index = SubcategoryIndex::new(vec![a, entry(102, Some(1)), b]);
    let m = index.into_membership();

    let ids: Vec<_> = m.operating_subcategories.iter().map(|s| s.subcategory_id.0).collect();
    assert_eq!(ids, vec![101, 102]);
    assert_eq!(m.operating_subcategories[0].custom_price, Some(Decimal::new(1500, 2)));
  }

  #[test]
  fn removing_everything_empties_categories() {
    let mut index = SubcategoryIndex::new(vec![entry(101, Some(1)), entry(103, Some(2))]);
    index.retain(|_| false);
    let m = index.into_membership();
    assert!(m.operating_subcategories.is_empty());
    assert!(m.operating_categories.is_empty());
    assert!(m.is_consistent());
  }

  #[test]
  fn unresolved_entries_contribute_no_category() {
    let index = SubcategoryIndex::new(vec![entry(101, Some(1)), entry(104, None)]);
    assert_eq!(index.unresolved(), vec![SubcategoryId(104)]);
    let m = index.into_membership();
    assert_eq!(m.operating_categories, BTreeSet::from([CategoryId(1)]));
    assert_eq!(m.operating_subcategories.len(), 2);
  }

  #[test]
  fn positions_survive_retain() {
    let mut index = SubcategoryIndex::new(vec![
      entry(101, Some(1)),
      entry(102, Some(1)),
      entry(103, Some(2)),
    ]);
    index.retain(|e| e.subcategory_id != SubcategoryId(101));
    index.set_parent(SubcategoryId(103), CategoryId(3));
    assert_eq!(index.get(SubcategoryId(103)).unwrap().category_id, Some(CategoryId(3)));
    assert!(index.get(SubcategoryId(101)).is_none());
  }

  #[test]
  fn addition_validation() {
    let ok = SubcategoryAddition {
      subcategory_id: SubcategoryId(7),
      custom_price:   Some(Decimal::new(250, 1)),
      price_unit:     Some(PriceUnit::Kg),
    };
    assert!(ok.validate().is_ok());

    let bad_id = SubcategoryAddition { subcategory_id: SubcategoryId(0), ..ok.clone() };
    assert!(matches!(bad_id.validate(), Err(Error::Validation(_))));

    let bad_price = SubcategoryAddition {
      custom_price: Some(Decimal::new(-1, 0)),
      ..ok
    };
    assert!(matches!(bad_price.validate(), Err(Error::Validation(_))));
  }

  #[test]
  fn membership_serialises_categories_as_sorted_list() {
    let m = SubcategoryIndex::new(vec![entry(5, Some(9)), entry(6, Some(2))]).into_membership();
    let json = serde_json::to_value(&m).unwrap();
    assert_eq!(json["operating_categories"], serde_json::json!([2, 9]));
  }
}
