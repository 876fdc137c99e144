//! Name → coordinate lookup table
//!
//! The built-in table covers the 32 London boroughs, the City, and a set of
//! well-known areas, stations and landmarks. A JSON or TOML file can replace
//! it (see [`Gazetteer::from_file`]).

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::path::Path;
use std::sync::LazyLock;

use regex::Regex;

use crate::models::Coordinates;
use crate::utils::error::LocationError;

/// What a gazetteer name refers to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum PlaceKind {
    Borough,
    #[default]
    Area,
    Landmark,
}

#[derive(Debug, Clone, PartialEq)]
pub struct GazetteerEntry {
    /// Lowercase canonical name
    pub name: String,
    pub coordinates: Coordinates,
    pub kind: PlaceKind,
}

/// On-disk shape of one entry: `{ lat, lon, kind? }`
#[derive(Debug, Deserialize)]
struct RawEntry {
    lat: f64,
    lon: f64,
    #[serde(default)]
    kind: PlaceKind,
}

#[derive(Debug, Clone, Default)]
pub struct Gazetteer {
    entries: Vec<GazetteerEntry>,
    by_name: HashMap<String, usize>,
    by_normalized: HashMap<String, usize>,
}

static APOSTROPHES: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"['’`]").expect("Invalid regex pattern"));
static SEPARATORS: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[-_/,]+").expect("Invalid regex pattern"));
static SAINT_ABBREV: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\bst\.").expect("Invalid regex pattern"));
static SPACES: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").expect("Invalid regex pattern"));

/// Fold spelling variants of a place name onto one key.
///
/// `"King’s Cross"`, `"kings cross"` and `"Kings-Cross"` all become
/// `"kings cross"`; `&` becomes `and`; `st.` becomes `st`.
pub fn normalize_place(name: &str) -> String {
    let lower = name.trim().to_lowercase();
    let no_apostrophes = APOSTROPHES.replace_all(&lower, "");
    let saint = SAINT_ABBREV.replace_all(&no_apostrophes, "st");
    let ampersand = saint.replace('&', " and ");
    let separated = SEPARATORS.replace_all(&ampersand, " ");
    SPACES
        .replace_all(separated.trim(), " ")
        .trim_matches(|c: char| !c.is_alphanumeric())
        .to_string()
}

impl Gazetteer {
    /// Build from `(name, coordinates, kind)` triples; later duplicates replace earlier ones
    pub fn from_entries<I, S>(entries: I) -> Self
    where
        I: IntoIterator<Item = (S, Coordinates, PlaceKind)>,
        S: AsRef<str>,
    {
        let mut gazetteer = Self::default();
        for (name, coordinates, kind) in entries {
            gazetteer.insert(name.as_ref(), coordinates, kind);
        }
        gazetteer
    }

    pub fn insert(&mut self, name: &str, coordinates: Coordinates, kind: PlaceKind) {
        let name = name.trim().to_lowercase();
        if name.is_empty() {
            return;
        }
        let entry = GazetteerEntry {
            name: name.clone(),
            coordinates,
            kind,
        };
        let idx = match self.by_name.get(&name) {
            Some(&idx) => {
                self.entries[idx] = entry;
                idx
            }
            None => {
                self.entries.push(entry);
                self.entries.len() - 1
            }
        };
        self.by_name.insert(name.clone(), idx);
        self.by_normalized.insert(normalize_place(&name), idx);
    }

    /// Load a `name -> {lat, lon, kind?}` table from `.json` or `.toml`
    pub fn from_file(path: &Path) -> Result<Self, LocationError> {
        let invalid = |reason: String| LocationError::InvalidGazetteer {
            path: path.to_path_buf(),
            reason,
        };

        let content = std::fs::read_to_string(path).map_err(|e| invalid(e.to_string()))?;
        let is_toml = path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("toml"));

        let raw: BTreeMap<String, RawEntry> = if is_toml {
            toml::from_str(&content).map_err(|e| invalid(e.to_string()))?
        } else {
            serde_json::from_str(&content).map_err(|e| invalid(e.to_string()))?
        };

        for (name, entry) in &raw {
            if !(-90.0..=90.0).contains(&entry.lat) || !(-180.0..=180.0).contains(&entry.lon) {
                return Err(invalid(format!("coordinates out of range for '{name}'")));
            }
        }

        Ok(Self::from_entries(raw.into_iter().map(|(name, e)| {
            (name, Coordinates::new(e.lat, e.lon), e.kind)
        })))
    }

    /// Built-in London table
    pub fn london() -> Self {
        let boroughs = LONDON_BOROUGHS
            .iter()
            .map(|&(name, lat, lon)| (name, Coordinates::new(lat, lon), PlaceKind::Borough));
        let areas = LONDON_AREAS
            .iter()
            .map(|&(name, lat, lon)| (name, Coordinates::new(lat, lon), PlaceKind::Area));
        let landmarks = LONDON_LANDMARKS
            .iter()
            .map(|&(name, lat, lon)| (name, Coordinates::new(lat, lon), PlaceKind::Landmark));
        Self::from_entries(boroughs.chain(areas).chain(landmarks))
    }

    /// Exact (case-insensitive) lookup
    pub fn lookup(&self, name: &str) -> Option<&GazetteerEntry> {
        self.by_name
            .get(&name.trim().to_lowercase())
            .map(|&idx| &self.entries[idx])
    }

    /// Lookup after folding spelling variants
    pub fn lookup_normalized(&self, phrase: &str) -> Option<&GazetteerEntry> {
        self.lookup(phrase).or_else(|| {
            self.by_normalized
                .get(&normalize_place(phrase))
                .map(|&idx| &self.entries[idx])
        })
    }

    pub fn contains(&self, name: &str) -> bool {
        self.lookup(name).is_some()
    }

    pub fn entries(&self) -> impl Iterator<Item = &GazetteerEntry> {
        self.entries.iter()
    }

    pub fn boroughs(&self) -> impl Iterator<Item = &GazetteerEntry> {
        self.entries.iter().filter(|e| e.kind == PlaceKind::Borough)
    }

    /// Short forms of compound borough names that are not entries themselves,
    /// e.g. `dagenham -> barking and dagenham`, `kingston -> kingston upon thames`.
    pub fn borough_aliases(&self) -> Vec<(String, String)> {
        let mut aliases = Vec::new();
        for borough in self.boroughs() {
            let parts: Vec<&str> = if let Some((head, _)) = borough.name.split_once(" upon ") {
                vec![head]
            } else {
                borough.name.split(" and ").collect()
            };
            if parts.len() == 1 && parts[0] == borough.name {
                continue;
            }
            for part in parts {
                let part = part.trim();
                if !part.is_empty() && !self.contains(part) {
                    aliases.push((part.to_string(), borough.name.clone()));
                }
            }
        }
        aliases
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

const LONDON_BOROUGHS: &[(&str, f64, f64)] = &[
    ("barking and dagenham", 51.5400, 0.0800),
    ("barnet", 51.6500, -0.2000),
    ("bexley", 51.4500, 0.1500),
    ("brent", 51.5500, -0.3000),
    ("bromley", 51.4000, 0.0500),
    ("camden", 51.5455, -0.1627),
    ("croydon", 51.3700, -0.1000),
    ("ealing", 51.5100, -0.3000),
    ("enfield", 51.6520, -0.0800),
    ("greenwich", 51.4767, 0.0000),
    ("hackney", 51.5450, -0.0550),
    ("hammersmith and fulham", 51.4925, -0.2225),
    ("haringey", 51.5900, -0.1100),
    ("harrow", 51.5800, -0.3300),
    ("havering", 51.5750, 0.1833),
    ("hillingdon", 51.5400, -0.4700),
    ("hounslow", 51.4700, -0.3600),
    ("islington", 51.5362, -0.1033),
    ("kensington and chelsea", 51.5000, -0.1900),
    ("kingston upon thames", 51.4100, -0.3000),
    ("lambeth", 51.4613, -0.1156),
    ("lewisham", 51.4567, -0.0167),
    ("merton", 51.4100, -0.2000),
    ("newham", 51.5250, 0.0036),
    ("redbridge", 51.5600, 0.0700),
    ("richmond upon thames", 51.4500, -0.3000),
    ("southwark", 51.4880, -0.0910),
    ("sutton", 51.3600, -0.2000),
    ("tower hamlets", 51.5200, -0.0500),
    ("waltham forest", 51.5900, -0.0100),
    ("wandsworth", 51.4567, -0.1920),
    ("westminster", 51.4995, -0.1245),
    ("city of london", 51.5155, -0.0922),
];

const LONDON_AREAS: &[(&str, f64, f64)] = &[
    ("soho", 51.5136, -0.1365),
    ("chelsea", 51.4875, -0.1687),
    ("mayfair", 51.5100, -0.1480),
    ("covent garden", 51.5117, -0.1240),
    ("holborn", 51.5174, -0.1200),
    ("camden town", 51.5390, -0.1426),
    ("hampstead", 51.5560, -0.1780),
    ("notting hill", 51.5090, -0.1960),
    ("shoreditch", 51.5265, -0.0798),
    ("whitechapel", 51.5194, -0.0612),
    ("stratford", 51.5430, -0.0020),
    ("canary wharf", 51.5054, -0.0235),
    ("brixton", 51.4613, -0.1156),
    ("peckham", 51.4740, -0.0690),
    ("clapham", 51.4620, -0.1380),
    ("tottenham", 51.5975, -0.0681),
    ("walthamstow", 51.5830, -0.0200),
    ("ilford", 51.5590, 0.0741),
    ("romford", 51.5768, 0.1801),
    ("woolwich", 51.4906, 0.0634),
    ("wimbledon", 51.4214, -0.2064),
    ("wembley", 51.5560, -0.2796),
    ("hammersmith", 51.4927, -0.2240),
    ("fulham", 51.4800, -0.1950),
    ("elephant and castle", 51.4946, -0.1003),
];

const LONDON_LANDMARKS: &[(&str, f64, f64)] = &[
    ("oxford circus", 51.5152, -0.1419),
    ("oxford street", 51.5154, -0.1410),
    ("piccadilly circus", 51.5100, -0.1347),
    ("leicester square", 51.5103, -0.1301),
    ("trafalgar square", 51.5080, -0.1281),
    ("parliament square", 51.5005, -0.1268),
    ("downing street", 51.5034, -0.1276),
    ("hyde park", 51.5073, -0.1657),
    ("london bridge", 51.5055, -0.0864),
    ("king's cross", 51.5308, -0.1238),
    ("waterloo", 51.5033, -0.1145),
    ("victoria station", 51.4952, -0.1441),
    ("paddington", 51.5154, -0.1755),
    ("euston", 51.5282, -0.1337),
    ("liverpool street", 51.5178, -0.0823),
    ("heathrow", 51.4700, -0.4543),
];
