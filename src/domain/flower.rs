use once_cell::sync::Lazy;
use std::collections::HashMap;

/// Sentinel used when a poem has no associated flower.
pub const NO_FLOWER: &str = "none";

const SYNONYMS: &[(&str, &str)] = &[
    // 梅花
    ("梅", "梅花"),
    ("寒梅", "梅花"),
    ("红梅", "梅花"),
    ("白梅", "梅花"),
    // 菊花
    ("菊", "菊花"),
    ("秋菊", "菊花"),
    ("黄菊", "菊花"),
    ("残菊", "菊花"),
    // 莲花
    ("莲", "莲花"),
    ("荷", "莲花"),
    ("芙蓉", "莲花"),
    ("芙蕖", "莲花"),
    ("桃", "桃花"),
    ("杏", "杏花"),
    ("牡丹", "牡丹"),
    ("桂", "桂花"),
    ("梨", "梨花"),
    ("海棠", "海棠"),
    ("兰", "兰花"),
    ("茉莉", "茉莉"),
    ("芍药", "芍药"),
    ("水仙", "水仙"),
    ("无", NO_FLOWER),
];

static DEFAULT_TABLE: Lazy<FlowerSynonymTable> =
    Lazy::new(|| FlowerSynonymTable::from_pairs(SYNONYMS.iter().copied()));

/// Many-to-one mapping from short or alternate flower names to a canonical
/// name. Lookups are exact and case-sensitive; unknown names are returned
/// unchanged.
#[derive(Debug, Clone, Default)]
pub struct FlowerSynonymTable {
    entries: HashMap<String, String>,
}

impl FlowerSynonymTable {
    pub fn standard() -> &'static FlowerSynonymTable {
        &DEFAULT_TABLE
    }

    pub fn from_pairs<'a>(pairs: impl IntoIterator<Item = (&'a str, &'a str)>) -> Self {
        let entries = pairs
            .into_iter()
            .map(|(alias, canonical)| (alias.to_string(), canonical.to_string()))
            .collect();
        Self { entries }
    }

    pub fn canonical<'a>(&'a self, name: &'a str) -> &'a str {
        self.entries.get(name).map(String::as_str).unwrap_or(name)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
