use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// The classic 5×5 street-view card.
pub const DEFAULT_ITEMS: [&str; 25] = [
    "Lawnmower",
    "Trampoline",
    "Hose Reel",
    "Dog or Cat",
    "BBQ",
    "Motorbike or Quadbike",
    "Flag",
    "Looking at Camera",
    "Satellite Dish",
    "Air Con Unit",
    "Graffiti",
    "Wheely Bin",
    "Wheelbarrow",
    "Bicycle",
    "Caravan",
    "Hi-Vis",
    "Roof Rack",
    "Chair or Bench",
    "Playground Equipment",
    "Plant Pot",
    "Work Van with Signage",
    "Trailer",
    "Letterbox",
    "Speed Limit Sign",
    "Ladder",
];

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CatalogError {
    #[error("catalog must contain at least one item")]
    Empty,
    #[error("catalog item #{0} has a blank label")]
    BlankLabel(usize),
    #[error("catalog item {0:?} appears more than once")]
    DuplicateLabel(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BingoItem {
    label: String,
}

impl BingoItem {
    pub fn label(&self) -> &str {
        &self.label
    }
}

/// Ordered, duplicate-free list of items for one card.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Catalog {
    items: Vec<BingoItem>,
}

impl Catalog {
    pub fn new<I, S>(labels: I) -> Result<Self, CatalogError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut seen = HashSet::new();
        let mut items = Vec::new();

        for (index, label) in labels.into_iter().enumerate() {
            let label = label.into().trim().to_string();
            if label.is_empty() {
                return Err(CatalogError::BlankLabel(index + 1));
            }
            if !seen.insert(label.clone()) {
                return Err(CatalogError::DuplicateLabel(label));
            }
            items.push(BingoItem { label });
        }

        if items.is_empty() {
            return Err(CatalogError::Empty);
        }

        Ok(Self { items })
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn items(&self) -> &[BingoItem] {
        &self.items
    }

    pub fn labels(&self) -> impl Iterator<Item = &str> {
        self.items.iter().map(BingoItem::label)
    }

    pub fn contains(&self, label: &str) -> bool {
        self.items.iter().any(|item| item.label == label)
    }

    /// 1-based lookup, matching the numbers shown on the grid.
    pub fn by_position(&self, position: usize) -> Option<&BingoItem> {
        position
            .checked_sub(1)
            .and_then(|index| self.items.get(index))
    }

    /// Case-insensitive label lookup.
    pub fn find(&self, query: &str) -> Option<&BingoItem> {
        let query = query.trim();
        self.items
            .iter()
            .find(|item| item.label.eq_ignore_ascii_case(query))
    }
}

impl Default for Catalog {
    fn default() -> Self {
        Self {
            items: DEFAULT_ITEMS
                .iter()
                .map(|label| BingoItem {
                    label: (*label).to_string(),
                })
                .collect(),
        }
    }
}
