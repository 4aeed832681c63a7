use crate::core::location::{GeoPoint, round_km};
use serde::{Deserialize, Serialize};
use std::fmt;

pub const DEFAULT_MATCH_RADIUS_KM: f64 = 1.5;

/// OSM `place` classification of a settlement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum SettlementKind {
    Hamlet,
    Village,
    Town,
    City,
    #[default]
    Unspecified,
}

impl SettlementKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            SettlementKind::Hamlet => "hamlet",
            SettlementKind::Village => "village",
            SettlementKind::Town => "town",
            SettlementKind::City => "city",
            SettlementKind::Unspecified => "",
        }
    }
}

impl From<&str> for SettlementKind {
    fn from(place: &str) -> Self {
        match place.trim().to_ascii_lowercase().as_str() {
            "hamlet" => SettlementKind::Hamlet,
            "village" => SettlementKind::Village,
            "town" => SettlementKind::Town,
            "city" => SettlementKind::City,
            _ => SettlementKind::Unspecified,
        }
    }
}

impl From<String> for SettlementKind {
    fn from(place: String) -> Self {
        SettlementKind::from(place.as_str())
    }
}

impl From<SettlementKind> for String {
    fn from(kind: SettlementKind) -> Self {
        kind.as_str().to_string()
    }
}

impl fmt::Display for SettlementKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A named place from the gazetteer. Serialized as `{name, lat, lon, place}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Settlement {
    pub name: String,
    #[serde(flatten)]
    pub coords: GeoPoint,
    #[serde(rename = "place", default)]
    pub kind: SettlementKind,
}

impl Settlement {
    pub fn new(name: impl Into<String>, coords: GeoPoint, kind: SettlementKind) -> Self {
        Self {
            name: name.into(),
            coords,
            kind,
        }
    }
}

/// The settlement a point was matched to.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SettlementMatch<'a> {
    /// Position in the gazetteer slice; the settlement's identity for this run.
    pub index: usize,
    pub settlement: &'a Settlement,
    pub distance_km: f64,
}

/// Nearest settlement to `point`, if it lies within `radius_km`.
///
/// Linear scan; among equidistant settlements the first in gazetteer order wins.
pub fn nearest_settlement<'a>(
    point: &GeoPoint,
    gazetteer: &'a [Settlement],
    radius_km: f64,
) -> Option<SettlementMatch<'a>> {
    let mut best: Option<SettlementMatch<'a>> = None;

    for (index, settlement) in gazetteer.iter().enumerate() {
        let distance_km = point.distance_km(&settlement.coords);
        if best.is_none_or(|b| distance_km < b.distance_km) {
            best = Some(SettlementMatch {
                index,
                settlement,
                distance_km,
            });
        }
    }

    best.filter(|m| m.distance_km <= radius_km)
}

/// Distance from home to a settlement, rounded to one decimal place.
pub fn distance_from_home(home: &GeoPoint, settlement: &Settlement) -> f64 {
    round_km(home.distance_km(&settlement.coords))
}

/// Read-only view of the gazetteer used for matching during one build.
pub struct SettlementMatcher<'a> {
    settlements: &'a [Settlement],
    radius_km: f64,
}

impl<'a> SettlementMatcher<'a> {
    pub fn new(settlements: &'a [Settlement], radius_km: f64) -> Self {
        Self {
            settlements,
            radius_km,
        }
    }

    pub fn settlements(&self) -> &'a [Settlement] {
        self.settlements
    }

    pub fn nearest(&self, point: &GeoPoint) -> Option<SettlementMatch<'a>> {
        nearest_settlement(point, self.settlements, self.radius_km)
    }
}
