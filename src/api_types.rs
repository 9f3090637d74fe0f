// src/api_types.rs
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::models::Category;

/// Logical fields of a dataset record. Each one resolves through an ordered
/// list of spellings seen across the upstream exports; the first present,
/// non-sentinel value wins.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    Id,
    Title,
    TitleEnglish,
    DateGregorian,
    DateJalali,
    Year,
    Month,
    Day,
    EraEnglish,
    EraPersian,
    Details,
    PersianWikiLink,
    EnglishWikiLink,
    Image,
    Caption,
    Kind,
    CategoryText,
}

impl Field {
    pub const fn candidates(self) -> &'static [&'static str] {
        match self {
            Field::Id => &["id", "ID", "event_id"],
            Field::Title => &["title", "title_persian", "Title"],
            Field::TitleEnglish => &["title_english", "Title_English", "english_title"],
            Field::DateGregorian => &["date_gregorian", "date", "Gregorian_Date"],
            Field::DateJalali => &["date_jalali", "Jalali_Date"],
            Field::Year => &["year_gregorian", "year", "Year"],
            Field::Month => &["month_gregorian", "month", "Month"],
            Field::Day => &["day_gregorian", "day", "Day"],
            Field::EraEnglish => &["era_english", "Era_English"],
            Field::EraPersian => &["era_persian", "Era_Persian"],
            Field::Details => &["details", "description", "Details"],
            Field::PersianWikiLink => &["persian_wiki_links", "persian_wiki_link"],
            Field::EnglishWikiLink => &["english_wiki_links", "english_wiki_link"],
            Field::Image => &["image", "image_url"],
            Field::Caption => &["caption", "image_caption"],
            Field::Kind => &["type"],
            Field::CategoryText => &["category"],
        }
    }
}

/// One loosely typed record as it arrives from a category dataset.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RawEventRecord(Map<String, Value>);

/// A raw record stamped with the category of the source it came from.
#[derive(Debug, Clone, PartialEq)]
pub struct TaggedRecord {
    pub record: RawEventRecord,
    pub category: Category,
}

impl From<Map<String, Value>> for RawEventRecord {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}

impl RawEventRecord {
    /// First present, non-sentinel value among the field's spellings.
    pub fn get(&self, field: Field) -> Option<&Value> {
        field
            .candidates()
            .iter()
            .filter_map(|name| self.0.get(*name))
            .find(|v| !is_sentinel(v))
    }

    pub fn text(&self, field: Field) -> Option<String> {
        self.get(field).and_then(value_text)
    }

    pub fn integer(&self, field: Field) -> Option<i64> {
        self.get(field).and_then(value_integer)
    }

    /// Zero-or-one style flag (`Politics=1`). Missing or sentinel means unset.
    pub fn flag(&self, name: &str) -> bool {
        match self.0.get(name) {
            Some(Value::Bool(b)) => *b,
            Some(Value::Number(n)) => n.as_f64().is_some_and(|f| f != 0.0),
            Some(Value::String(s)) => {
                let s = s.trim();
                s == "1" || s == "1.0" || s.eq_ignore_ascii_case("true")
            }
            _ => false,
        }
    }

    /// Categories whose binary flag is set on this record, in canonical order.
    pub fn flagged_categories(&self) -> Vec<Category> {
        Category::ALL
            .into_iter()
            .filter(|c| c.flag_fields().iter().any(|f| self.flag(f)))
            .collect()
    }
}

/// `NaN`, `null` and friends are absent values, never literal text.
pub fn is_sentinel(v: &Value) -> bool {
    match v {
        Value::Null => true,
        Value::String(s) => {
            let s = s.trim();
            s.is_empty()
                || s.eq_ignore_ascii_case("nan")
                || s.eq_ignore_ascii_case("null")
                || s == "None"
                || s.eq_ignore_ascii_case("undefined")
        }
        _ => false,
    }
}

fn value_text(v: &Value) -> Option<String> {
    match v {
        Value::String(s) => Some(s.trim().to_string()),
        Value::Number(n) => match n.as_i64() {
            Some(i) => Some(i.to_string()),
            None => n.as_f64().map(|f| {
                if f.fract() == 0.0 && f.abs() < 1e15 {
                    format!("{}", f as i64)
                } else {
                    f.to_string()
                }
            }),
        },
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

fn value_integer(v: &Value) -> Option<i64> {
    match v {
        Value::Number(n) => n.as_i64().or_else(|| {
            n.as_f64()
                .filter(|f| f.is_finite() && f.fract() == 0.0 && f.abs() < 1e15)
                .map(|f| f as i64)
        }),
        Value::String(s) => {
            let s = s.trim();
            s.parse::<i64>().ok().or_else(|| {
                s.parse::<f64>()
                    .ok()
                    .filter(|f| f.is_finite() && f.fract() == 0.0 && f.abs() < 1e15)
                    .map(|f| f as i64)
            })
        }
        _ => None,
    }
}

/// Parse a dataset body into records. Accepts a top-level array or an object
/// whose values are arrays (the merged export layout); non-object entries are skipped.
pub fn parse_records(text: &str) -> Result<Vec<RawEventRecord>, serde_json::Error> {
    let value: Value = serde_json::from_str(text)?;
    match value {
        Value::Array(items) => Ok(objects_of(items)),
        Value::Object(map) if map.values().all(Value::is_array) => Ok(map
            .into_iter()
            .flat_map(|(_, v)| match v {
                Value::Array(items) => objects_of(items),
                _ => Vec::new(),
            })
            .collect()),
        other => serde_json::from_value(other),
    }
}

fn objects_of(items: Vec<Value>) -> Vec<RawEventRecord> {
    items
        .into_iter()
        .filter_map(|v| match v {
            Value::Object(map) => Some(RawEventRecord(map)),
            _ => None,
        })
        .collect()
}
