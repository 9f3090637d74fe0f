// src/eras.rs
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use unicode_normalization::UnicodeNormalization;

use crate::models::EraNames;

/// Bucket key for events carrying no recognisable era.
pub const UNKNOWN_ERA: &str = "Unknown Era";

/// Named historical periods with a fixed English/Persian spelling table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum KnownEra {
    Sasanian,
    IslamicEra,
    Safavid,
    Afsharian,
    Zandian,
    Qajar,
    Pahlavi,
    IslamicRepublic,
}

impl KnownEra {
    pub const ALL: [KnownEra; 8] = [
        KnownEra::Sasanian,
        KnownEra::IslamicEra,
        KnownEra::Safavid,
        KnownEra::Afsharian,
        KnownEra::Zandian,
        KnownEra::Qajar,
        KnownEra::Pahlavi,
        KnownEra::IslamicRepublic,
    ];

    pub fn english(self) -> &'static str {
        match self {
            KnownEra::Sasanian => "Sasanian",
            KnownEra::IslamicEra => "Islamic Era",
            KnownEra::Safavid => "Safavid",
            KnownEra::Afsharian => "Afsharian",
            KnownEra::Zandian => "Zandian",
            KnownEra::Qajar => "Qajar",
            KnownEra::Pahlavi => "Pahlavi",
            KnownEra::IslamicRepublic => "Islamic Republic",
        }
    }

    /// Canonical Persian spelling first, then variants seen in the data.
    pub fn persian(self) -> &'static [&'static str] {
        match self {
            KnownEra::Sasanian => &["ساسانیان", "ساسانی", "ساسانییان"],
            KnownEra::IslamicEra => &["دوران اسلامی"],
            KnownEra::Safavid => &["صفویان", "صفوی"],
            KnownEra::Afsharian => &["افشاریان", "افشاری"],
            KnownEra::Zandian => &["زندیان", "زندی"],
            KnownEra::Qajar => &["قاجار", "قاجاریان"],
            KnownEra::Pahlavi => &["پهلوی"],
            KnownEra::IslamicRepublic => &["جمهوری اسلامی"],
        }
    }

    pub fn css_class(self) -> &'static str {
        match self {
            KnownEra::Sasanian => "era-sasanian",
            KnownEra::IslamicEra => "era-islamic-era",
            KnownEra::Safavid => "era-safavid",
            KnownEra::Afsharian => "era-afsharian",
            KnownEra::Zandian => "era-zandian",
            KnownEra::Qajar => "era-qajar",
            KnownEra::Pahlavi => "era-pahlavi",
            KnownEra::IslamicRepublic => "era-islamic-republic",
        }
    }

    pub fn color(self) -> &'static str {
        match self {
            KnownEra::Sasanian => "#FF4500",
            KnownEra::IslamicEra => "#228B22",
            KnownEra::Safavid => "#1E90FF",
            KnownEra::Afsharian => "#FF6347",
            KnownEra::Zandian => "#9932CC",
            KnownEra::Qajar => "#DC143C",
            KnownEra::Pahlavi => "#FFD700",
            KnownEra::IslamicRepublic => "#006400",
        }
    }

    /// Known start/end years, where the era table records them.
    pub fn year_span(self) -> Option<(i32, i32)> {
        match self {
            KnownEra::Qajar => Some((1796, 1925)),
            KnownEra::Pahlavi => Some((1926, 1979)),
            KnownEra::IslamicRepublic => Some((1979, 2025)),
            _ => None,
        }
    }

    /// Short, event-heavy eras that get a wider canvas and finer ticks.
    pub fn is_dense(self) -> bool {
        matches!(self, KnownEra::Pahlavi | KnownEra::IslamicRepublic)
    }

    /// Exact lookup by any English or Persian spelling.
    pub fn lookup(name: &str) -> Option<KnownEra> {
        ERA_TABLE.get(&normalize_name(name)).copied()
    }
}

static ERA_TABLE: Lazy<HashMap<String, KnownEra>> = Lazy::new(|| {
    let mut table = HashMap::new();
    for era in KnownEra::ALL {
        table.insert(normalize_name(era.english()), era);
        for p in era.persian() {
            table.insert(normalize_name(p), era);
        }
    }
    table
});

fn normalize_name(s: &str) -> String {
    s.trim().nfc().collect()
}

/// Where an event's era names land in the hierarchy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EraResolution {
    pub key: String,
    pub era: Option<KnownEra>,
}

/// English name wins when present; a Persian-only era resolves through the
/// table; anything else falls into [`UNKNOWN_ERA`].
pub fn resolve_era(names: &EraNames) -> EraResolution {
    let english = names.english.as_deref().map(str::trim).filter(|s| !s.is_empty());
    let persian = names.persian.as_deref().map(str::trim).filter(|s| !s.is_empty());

    if let Some(era) = english.and_then(KnownEra::lookup) {
        return known(era);
    }
    if let Some(name) = english {
        return EraResolution {
            key: name.to_string(),
            era: None,
        };
    }
    match persian.and_then(KnownEra::lookup) {
        Some(era) => known(era),
        None => EraResolution {
            key: UNKNOWN_ERA.to_string(),
            era: None,
        },
    }
}

fn known(era: KnownEra) -> EraResolution {
    EraResolution {
        key: era.english().to_string(),
        era: Some(era),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn names(english: Option<&str>, persian: Option<&str>) -> EraNames {
        EraNames {
            english: english.map(String::from),
            persian: persian.map(String::from),
        }
    }

    #[rstest]
    #[case::english(names(Some("Qajar"), None), "Qajar", Some(KnownEra::Qajar))]
    #[case::persian_only(names(None, Some("قاجار")), "Qajar", Some(KnownEra::Qajar))]
    #[case::persian_variant(names(None, Some("ساسانییان")), "Sasanian", Some(KnownEra::Sasanian))]
    #[case::padded(names(Some(" Pahlavi "), None), "Pahlavi", Some(KnownEra::Pahlavi))]
    #[case::unlisted_english(names(Some("Timurid"), Some("تیموری")), "Timurid", None)]
    #[case::unlisted_persian(names(None, Some("تیموری")), UNKNOWN_ERA, None)]
    #[case::nothing(names(None, None), UNKNOWN_ERA, None)]
    fn resolves_era_keys(#[case] input: EraNames, #[case] key: &str, #[case] era: Option<KnownEra>) {
        let r = resolve_era(&input);
        assert_eq!(r.key, key);
        assert_eq!(r.era, era);
    }

    #[test]
    fn decomposed_persian_matches_after_nfc() {
        // same visible text, decomposed form
        let decomposed: String = "جمهوری اسلامی".nfd().collect();
        assert_eq!(KnownEra::lookup(&decomposed), Some(KnownEra::IslamicRepublic));
    }

    #[test]
    fn lookup_is_exact_not_fuzzy() {
        assert_eq!(KnownEra::lookup("qajar"), None);
        assert_eq!(KnownEra::lookup("Qajar dynasty"), None);
    }
}
