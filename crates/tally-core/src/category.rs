//! Categories — thin labels that commitments reference by id.
//!
//! The relation is weak: a commitment holds only a `category_id`, and a
//! dangling or absent reference resolves to the designated fallback
//! category. Reassignment on deletion is the storage layer's job.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Name of the designated fallback category. It is a system category:
/// built in, undeletable, and the target of reassignment when another
/// category is deleted.
pub const FALLBACK_CATEGORY_NAME: &str = "Other";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
  pub id:        Uuid,
  pub name:      String,
  /// Display color, e.g. a hex string. Opaque to the engine.
  pub color:     String,
  pub is_system: bool,
  pub is_hidden: bool,
}

impl Category {
  pub fn is_fallback(&self) -> bool {
    self.is_system && self.name == FALLBACK_CATEGORY_NAME
  }
}

/// Resolve a commitment's category reference against `categories`.
/// Dangling and absent references fall back to the fallback category;
/// `None` only when the collection has no fallback either.
pub fn resolve_category(
  categories: &[Category],
  category_id: Option<Uuid>,
) -> Option<&Category> {
  category_id
    .and_then(|id| categories.iter().find(|c| c.id == id))
    .or_else(|| categories.iter().find(|c| c.is_fallback()))
}

#[cfg(test)]
mod tests {
  use super::*;

  fn fallback() -> Category {
    Category {
      id:        Uuid::new_v4(),
      name:      FALLBACK_CATEGORY_NAME.into(),
      color:     "#888888".into(),
      is_system: true,
      is_hidden: false,
    }
  }

  fn named(name: &str) -> Category {
    Category {
      id:        Uuid::new_v4(),
      name:      name.into(),
      color:     "#ff0000".into(),
      is_system: false,
      is_hidden: false,
    }
  }

  #[test]
  fn resolves_existing_reference() {
    let cats = vec![fallback(), named("Bills")];
    let found = resolve_category(&cats, Some(cats[1].id)).unwrap();
    assert_eq!(found.name, "Bills");
  }

  #[test]
  fn dangling_reference_resolves_to_fallback() {
    let cats = vec![fallback(), named("Bills")];
    let found = resolve_category(&cats, Some(Uuid::new_v4())).unwrap();
    assert!(found.is_fallback());

    let found = resolve_category(&cats, None).unwrap();
    assert!(found.is_fallback());
  }

  #[test]
  fn user_category_named_other_is_not_fallback() {
    let cats = vec![named("Other")];
    assert!(resolve_category(&cats, None).is_none());
  }
}
