use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::shared::constants::{CART_CONFIDENCE, HUMAN_CONFIDENCE, ITEM_CONFIDENCE};

/// The three object classes the alert logic reasons about.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ObjectClass {
    Human,
    Cart,
    Item,
}

impl ObjectClass {
    pub const ALL: &[ObjectClass] = &[ObjectClass::Human, ObjectClass::Cart, ObjectClass::Item];

    /// Lowercase name, also used as the fallback threshold key.
    pub fn canonical_name(&self) -> &'static str {
        match self {
            ObjectClass::Human => "human",
            ObjectClass::Cart => "cart",
            ObjectClass::Item => "item",
        }
    }

    /// Threshold used when no per-label value is configured.
    pub fn default_confidence(&self) -> f64 {
        match self {
            ObjectClass::Human => HUMAN_CONFIDENCE,
            ObjectClass::Cart => CART_CONFIDENCE,
            ObjectClass::Item => ITEM_CONFIDENCE,
        }
    }
}

impl fmt::Display for ObjectClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.canonical_name())
    }
}

/// Maps detector labels (case-insensitive) onto [`ObjectClass`].
///
/// Labels without an entry are still drawn when confident enough, but
/// never tracked.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(
    from = "HashMap<String, ObjectClass>",
    into = "HashMap<String, ObjectClass>"
)]
pub struct LabelMap {
    entries: HashMap<String, ObjectClass>,
}

impl LabelMap {
    pub fn empty() -> Self {
        Self {
            entries: HashMap::new(),
        }
    }

    pub fn with(mut self, label: &str, class: ObjectClass) -> Self {
        self.insert(label, class);
        self
    }

    pub fn insert(&mut self, label: &str, class: ObjectClass) {
        self.entries.insert(normalize_label(label), class);
    }

    pub fn classify(&self, label: &str) -> Option<ObjectClass> {
        self.entries.get(&normalize_label(label)).copied()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Default for LabelMap {
    /// Canonical names, plus the COCO classes a stock YOLOv8 model emits
    /// for shoppers and small hand-held goods.
    fn default() -> Self {
        Self::empty()
            .with("human", ObjectClass::Human)
            .with("person", ObjectClass::Human)
            .with("cart", ObjectClass::Cart)
            .with("shopping cart", ObjectClass::Cart)
            .with("shopping_cart", ObjectClass::Cart)
            .with("trolley", ObjectClass::Cart)
            .with("item", ObjectClass::Item)
            .with("bottle", ObjectClass::Item)
            .with("cup", ObjectClass::Item)
            .with("cell phone", ObjectClass::Item)
            .with("book", ObjectClass::Item)
            .with("handbag", ObjectClass::Item)
            .with("backpack", ObjectClass::Item)
            .with("remote", ObjectClass::Item)
    }
}

impl From<HashMap<String, ObjectClass>> for LabelMap {
    fn from(entries: HashMap<String, ObjectClass>) -> Self {
        let mut map = Self::empty();
        for (label, class) in entries {
            map.insert(&label, class);
        }
        map
    }
}

impl From<LabelMap> for HashMap<String, ObjectClass> {
    fn from(map: LabelMap) -> Self {
        map.entries
    }
}

pub(crate) fn normalize_label(label: &str) -> String {
    label.trim().to_lowercase()
}
