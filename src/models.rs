use serde::{Deserialize, Serialize};
use std::fmt;
use url::Url;
use xxhash_rust::xxh3::xxh3_64;

use crate::api_types::{Field, TaggedRecord};
use crate::dates::{normalize_date, CanonicalDate};

/// The fixed set of dataset categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Category {
    Politics,
    Economy,
    Social,
    #[serde(rename = "Technology_Science")]
    TechnologyScience,
    Health,
    #[serde(rename = "Crime_Safety")]
    CrimeSafety,
    #[serde(rename = "Sports_Entertainment")]
    SportsEntertainment,
    Death,
    #[serde(rename = "Natural_Disaster")]
    NaturalDisaster,
}

impl Category {
    pub const ALL: [Category; 9] = [
        Category::Politics,
        Category::Economy,
        Category::Social,
        Category::TechnologyScience,
        Category::Health,
        Category::CrimeSafety,
        Category::SportsEntertainment,
        Category::Death,
        Category::NaturalDisaster,
    ];

    pub fn tag(self) -> &'static str {
        match self {
            Category::Politics => "Politics",
            Category::Economy => "Economy",
            Category::Social => "Social",
            Category::TechnologyScience => "Technology_Science",
            Category::Health => "Health",
            Category::CrimeSafety => "Crime_Safety",
            Category::SportsEntertainment => "Sports_Entertainment",
            Category::Death => "Death",
            Category::NaturalDisaster => "Natural_Disaster",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Category::Politics => "Political Events",
            Category::Economy => "Economic Events",
            Category::Social => "Social Events",
            Category::TechnologyScience => "Technology & Science",
            Category::Health => "Health Events",
            Category::CrimeSafety => "Crime & Safety",
            Category::SportsEntertainment => "Sports & Entertainment",
            Category::Death => "Notable Deaths",
            Category::NaturalDisaster => "Natural Disasters",
        }
    }

    /// Record keys that carry this category as a binary flag.
    pub fn flag_fields(self) -> &'static [&'static str] {
        match self {
            Category::Politics => &["Politics"],
            Category::Economy => &["Economy"],
            Category::Social => &["Social"],
            Category::TechnologyScience => &["Technology/Science", "Technology_Science"],
            Category::Health => &["Health"],
            Category::CrimeSafety => &["Crime/Safety", "Crime_Safety"],
            Category::SportsEntertainment => &["Sports/Entertainment", "Sports_Entertainment"],
            Category::Death => &["Death"],
            Category::NaturalDisaster => &["Natural Disaster", "Natural_Disaster"],
        }
    }

    /// Cross-axis offset (px) that clusters categories apart in the overview.
    pub fn cluster_offset(self) -> f64 {
        match self {
            Category::Politics => -20.0,
            Category::Economy => 30.0,
            Category::Social => -40.0,
            Category::TechnologyScience => 50.0,
            Category::Health => -30.0,
            Category::CrimeSafety => 40.0,
            Category::SportsEntertainment => -50.0,
            Category::Death => 20.0,
            Category::NaturalDisaster => 0.0,
        }
    }

    pub fn color(self) -> &'static str {
        match self {
            Category::Politics => "#ef4444",
            Category::Economy => "#10b981",
            Category::Social => "#f59e0b",
            Category::TechnologyScience => "#06b6d4",
            Category::Health => "#8b5cf6",
            Category::CrimeSafety => "#f97316",
            Category::SportsEntertainment => "#ec4899",
            Category::Death => "#6b7280",
            Category::NaturalDisaster => "#14b8a6",
        }
    }

    pub fn from_tag(tag: &str) -> Option<Self> {
        let tag = tag.trim();
        Self::ALL
            .into_iter()
            .find(|c| c.tag() == tag || c.flag_fields().contains(&tag))
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventKind {
    Regular,
    Death,
}

/// Composite key recognising the same event across category files.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EventIdentity {
    pub source_id: Option<String>,
    pub date_key: String,
    pub primary_title: String,
}

impl EventIdentity {
    /// Stable numeric identity for layout jitter: the source id when it is an
    /// integer, otherwise a hash of the whole key.
    pub fn seed(&self) -> u64 {
        if let Some(n) = self.source_id.as_deref().and_then(|s| s.parse::<u64>().ok()) {
            return n;
        }
        xxh3_64(self.to_string().as_bytes())
    }
}

impl fmt::Display for EventIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}_{}_{}",
            self.source_id.as_deref().unwrap_or(""),
            self.date_key,
            self.primary_title
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Titles {
    /// Persian title when present, else the English one.
    pub primary: String,
    pub english: Option<String>,
}

impl Titles {
    pub fn display(&self) -> &str {
        self.english.as_deref().unwrap_or(&self.primary)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct EraNames {
    pub english: Option<String>,
    pub persian: Option<String>,
}

impl EraNames {
    pub fn english_or_unknown(&self) -> &str {
        self.english.as_deref().unwrap_or("Unknown")
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Links {
    pub persian_wiki: Option<String>,
    pub english_wiki: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageRef {
    pub src: String,
    pub caption: Option<String>,
}

/// Canonical event. Scalar fields are fixed at creation; only the dedup stage
/// grows `categories`.
/// Only built through [`NormalizedEvent::from_tagged`], never deserialized.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NormalizedEvent {
    pub identity: EventIdentity,
    /// `None` when no year could be extracted: listed, never positioned.
    pub date: Option<CanonicalDate>,
    pub date_jalali: Option<String>,
    pub titles: Titles,
    pub era: EraNames,
    categories: Vec<Category>,
    /// Binary category flags present on the first-seen record.
    pub flags: Vec<Category>,
    pub kind: EventKind,
    pub details: Option<String>,
    pub links: Links,
    pub image: Option<ImageRef>,
}

impl NormalizedEvent {
    /// `None` for records without any title; such records cannot be identified.
    pub fn from_tagged(tagged: &TaggedRecord) -> Option<Self> {
        let r = &tagged.record;
        let persian = r.text(Field::Title);
        let english = r.text(Field::TitleEnglish);
        let primary = persian.or_else(|| english.clone())?;

        let date_raw = r.text(Field::DateGregorian);
        let date = normalize_date(r).ok();
        let date_key = match (&date, &date_raw) {
            (Some(d), _) => d.iso(),
            (None, Some(raw)) => raw.clone(),
            (None, None) => String::new(),
        };

        let is_death = tagged.category == Category::Death
            || r.text(Field::Kind).is_some_and(|t| t.eq_ignore_ascii_case("death"))
            || r
                .text(Field::CategoryText)
                .is_some_and(|t| t.to_lowercase().contains("death"));

        let image = r.text(Field::Image).map(|src| ImageRef {
            src,
            caption: r.text(Field::Caption),
        });

        Some(Self {
            identity: EventIdentity {
                source_id: r.text(Field::Id),
                date_key,
                primary_title: primary.clone(),
            },
            date,
            date_jalali: r.text(Field::DateJalali),
            titles: Titles { primary, english },
            era: EraNames {
                english: r.text(Field::EraEnglish),
                persian: r.text(Field::EraPersian),
            },
            categories: vec![tagged.category],
            flags: r.flagged_categories(),
            kind: if is_death { EventKind::Death } else { EventKind::Regular },
            details: r.text(Field::Details),
            links: Links {
                persian_wiki: r.text(Field::PersianWikiLink).filter(|l| is_absolute_url(l)),
                english_wiki: r.text(Field::EnglishWikiLink).filter(|l| is_absolute_url(l)),
            },
            image,
        })
    }

    /// Ordered, duplicate-free, never empty.
    pub fn categories(&self) -> &[Category] {
        &self.categories
    }

    pub fn primary_category(&self) -> Category {
        self.categories[0]
    }

    pub fn has_category(&self, c: Category) -> bool {
        self.categories.contains(&c)
    }

    /// Append a tag unless already present. Returns whether it was added.
    /// A `Death` tag from any source makes the event death-kind.
    pub(crate) fn absorb_category(&mut self, c: Category) -> bool {
        if self.categories.contains(&c) {
            return false;
        }
        if c == Category::Death {
            self.kind = EventKind::Death;
        }
        self.categories.push(c);
        true
    }
}

fn is_absolute_url(s: &str) -> bool {
    Url::parse(s).is_ok_and(|u| u.has_host())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn tagged(v: serde_json::Value, category: Category) -> TaggedRecord {
        TaggedRecord {
            record: serde_json::from_value(v).unwrap(),
            category,
        }
    }

    #[test]
    fn builds_identity_from_id_date_and_title() {
        let ev = NormalizedEvent::from_tagged(&tagged(
            json!({ "id": 42, "date_gregorian": "1979-02-11", "title": "انقلاب", "title_english": "Revolution" }),
            Category::Politics,
        ))
        .unwrap();
        assert_eq!(ev.identity.to_string(), "42_1979-02-11_انقلاب");
        assert_eq!(ev.identity.seed(), 42);
        assert_eq!(ev.titles.display(), "Revolution");
        assert_eq!(ev.categories(), &[Category::Politics]);
    }

    #[test]
    fn sentinel_fields_are_absent() {
        let ev = NormalizedEvent::from_tagged(&tagged(
            json!({
                "title_english": "Treaty",
                "date_gregorian": "1828-02-21",
                "era_english": "NaN",
                "details": "null",
                "english_wiki_links": "NaN",
                "persian_wiki_links": "not a url",
                "image": null
            }),
            Category::Politics,
        ))
        .unwrap();
        assert_eq!(ev.titles.primary, "Treaty");
        assert_eq!(ev.era.english, None);
        assert_eq!(ev.era.english_or_unknown(), "Unknown");
        assert_eq!(ev.details, None);
        assert_eq!(ev.links, Links::default());
        assert_eq!(ev.image, None);
    }

    #[test]
    fn malformed_date_keeps_event_without_position() {
        let ev = NormalizedEvent::from_tagged(&tagged(
            json!({ "title": "x", "date_gregorian": "sometime" }),
            Category::Social,
        ))
        .unwrap();
        assert_eq!(ev.date, None);
        assert_eq!(ev.identity.date_key, "sometime");
    }

    #[test]
    fn untitled_records_are_rejected() {
        assert!(NormalizedEvent::from_tagged(&tagged(json!({ "id": 1 }), Category::Social)).is_none());
    }

    #[test]
    fn death_kind_detection() {
        let from_source = NormalizedEvent::from_tagged(&tagged(json!({ "title": "a" }), Category::Death)).unwrap();
        let from_type = NormalizedEvent::from_tagged(&tagged(json!({ "title": "b", "type": "death" }), Category::Social)).unwrap();
        let regular = NormalizedEvent::from_tagged(&tagged(json!({ "title": "c" }), Category::Social)).unwrap();
        assert_eq!(from_source.kind, EventKind::Death);
        assert_eq!(from_type.kind, EventKind::Death);
        assert_eq!(regular.kind, EventKind::Regular);
    }

    #[test]
    fn serialized_event_carries_tags_and_kind() {
        let mut ev = NormalizedEvent::from_tagged(&tagged(
            json!({ "id": 3, "title": "Coup", "date_gregorian": "-550-01-01" }),
            Category::Politics,
        ))
        .unwrap();
        assert!(ev.absorb_category(Category::Death));
        assert!(!ev.absorb_category(Category::Politics));

        let v = serde_json::to_value(&ev).unwrap();
        assert_eq!(v["categories"], json!(["Politics", "Death"]));
        assert_eq!(v["kind"], "death");
        assert_eq!(v["date"]["is_bce"], true);
        assert_eq!(v["date"]["year"], -550);
    }

    #[test]
    fn hashed_seed_is_stable() {
        let id = EventIdentity {
            source_id: Some("abc".into()),
            date_key: "1906-08-05".into(),
            primary_title: "t".into(),
        };
        assert_eq!(id.seed(), id.clone().seed());
        assert_ne!(id.seed(), 0);
    }
}
