use serde::{Deserialize, Serialize};

/// A resolved target location. Immutable once built by the input normaliser.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub name: String,
    pub normalized_name: String,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub region: Option<String>,
    pub prefecture: Option<String>,
}

impl Location {
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        let normalized_name = normalize_name(&name);
        Self {
            name,
            normalized_name,
            latitude: None,
            longitude: None,
            region: None,
            prefecture: None,
        }
    }

    #[must_use]
    pub fn with_coords(mut self, latitude: f64, longitude: f64) -> Self {
        self.latitude = Some(latitude);
        self.longitude = Some(longitude);
        self
    }

    #[must_use]
    pub fn with_region(mut self, region: impl Into<String>) -> Self {
        self.region = Some(region.into());
        self
    }

    #[must_use]
    pub fn with_prefecture(mut self, prefecture: impl Into<String>) -> Self {
        self.prefecture = Some(prefecture.into());
        self
    }

    /// True for the Okinawa family of locations, which the validator treats
    /// as a region where snow vocabulary and strong-cold advisories never apply.
    #[must_use]
    pub fn is_okinawa_family(&self) -> bool {
        const NAMES: &[&str] = &["沖縄", "那覇", "石垣", "宮古島"];
        NAMES.iter().any(|n| self.name.contains(n))
    }

    /// True for the Hokkaido family, where strong-heat vocabulary never applies.
    #[must_use]
    pub fn is_hokkaido_family(&self) -> bool {
        const NAMES: &[&str] = &["北海道", "札幌", "旭川", "釧路"];
        NAMES.iter().any(|n| self.name.contains(n))
    }
}

fn normalize_name(name: &str) -> String {
    name.trim()
        .chars()
        .filter(|c| !c.is_whitespace())
        .collect()
}

/// A lookup table of known location names to coordinates, mirroring a small
/// gazetteer. Unknown names fall back to the configured default.
#[derive(Debug, Clone, Default)]
pub struct LocationTable {
    entries: std::collections::HashMap<String, (f64, f64, &'static str)>,
}

impl LocationTable {
    #[must_use]
    pub fn with_defaults() -> Self {
        let mut entries = std::collections::HashMap::new();
        entries.insert("東京".to_string(), (35.6895, 139.6917, "関東"));
        entries.insert("大阪".to_string(), (34.6937, 135.5023, "近畿"));
        entries.insert("那覇".to_string(), (26.2124, 127.6809, "沖縄"));
        entries.insert("札幌".to_string(), (43.0618, 141.3545, "北海道"));
        entries.insert("福岡".to_string(), (33.5904, 130.4017, "九州"));
        entries.insert("仙台".to_string(), (38.2682, 140.8694, "東北"));
        Self { entries }
    }

    #[must_use]
    pub fn resolve(&self, name: &str) -> Option<Location> {
        self.entries.get(name).map(|&(lat, lon, region)| {
            Location::new(name)
                .with_coords(lat, lon)
                .with_region(region)
        })
    }
}
