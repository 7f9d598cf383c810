use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::yen::Yen;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ItemError {
    #[error("Item name is empty")]
    EmptyName,
    #[error("Item price must be positive, got {0}")]
    NonPositivePrice(Yen),
}

/// One purchased line of a receipt.
///
/// Fields are private so that every `Item` in existence has a non-blank
/// name and a strictly positive price, including ones read back from
/// storage or JSON.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "UncheckedItem")]
pub struct Item {
    name: String,
    price: Yen,
}

#[derive(Deserialize)]
struct UncheckedItem {
    name: String,
    price: Yen,
}

impl TryFrom<UncheckedItem> for Item {
    type Error = ItemError;

    fn try_from(raw: UncheckedItem) -> Result<Self, Self::Error> {
        Item::new(raw.name, raw.price)
    }
}

impl Item {
    pub fn new(name: impl Into<String>, price: impl Into<Yen>) -> Result<Self, ItemError> {
        let name = name.into();
        let price = price.into();
        if name.trim().is_empty() {
            return Err(ItemError::EmptyName);
        }
        if !price.is_positive() {
            return Err(ItemError::NonPositivePrice(price));
        }
        Ok(Item { name, price })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn price(&self) -> Yen {
        self.price
    }
}

/// Structured outcome of parsing one receipt's OCR lines.
///
/// Items keep receipt order and may repeat. A missing total is a normal
/// state ("not detected"), not an error.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParseResult {
    pub items: Vec<Item>,
    pub total: Option<Yen>,
}

impl ParseResult {
    pub fn new(items: Vec<Item>, total: Option<Yen>) -> Self {
        Self { items, total }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty() && self.total.is_none()
    }

    /// Sum of item prices; useful to compare against the detected total.
    pub fn items_sum(&self) -> Yen {
        self.items.iter().map(Item::price).sum()
    }
}
