//! Points and point sets in the multi-axis dimension space (e.g. language ×
//! region). The variation graph itself lives upstream; events arrive with
//! coverage sets already computed, so only the value types are needed here.
use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Stable hash of a [`DimensionSpacePoint`], used as the dimension key of
/// hierarchy and restriction hyperrelations.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DimensionSpacePointHash(String);

impl DimensionSpacePointHash {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DimensionSpacePointHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// One coordinate in dimension space, e.g. `{language: "en", region: "US"}`.
/// The empty point is the only point of a dimensionless content repository.
#[derive(Clone, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DimensionSpacePoint {
    coordinates: BTreeMap<String, String>,
}

impl DimensionSpacePoint {
    pub fn new(coordinates: BTreeMap<String, String>) -> Self {
        Self { coordinates }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            coordinates: pairs
                .into_iter()
                .map(|(dimension, value)| (dimension.into(), value.into()))
                .collect(),
        }
    }

    pub fn coordinates(&self) -> &BTreeMap<String, String> {
        &self.coordinates
    }

    pub fn is_empty(&self) -> bool {
        self.coordinates.is_empty()
    }

    /// Hashes the coordinates in dimension-name order, so two points with the
    /// same coordinates always share a hash.
    pub fn hash(&self) -> DimensionSpacePointHash {
        let mut hasher = blake3::Hasher::new();
        for (dimension, value) in &self.coordinates {
            hasher.update(&(dimension.len() as u64).to_le_bytes());
            hasher.update(dimension.as_bytes());
            hasher.update(&(value.len() as u64).to_le_bytes());
            hasher.update(value.as_bytes());
        }
        DimensionSpacePointHash(hasher.finalize().to_hex().to_string())
    }
}

impl fmt::Display for DimensionSpacePoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("{")?;
        for (index, (dimension, value)) in self.coordinates.iter().enumerate() {
            if index > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{dimension}: {value}")?;
        }
        f.write_str("}")
    }
}

/// The dimension space point a node variant was authored in.
#[derive(Clone, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OriginDimensionSpacePoint(DimensionSpacePoint);

impl OriginDimensionSpacePoint {
    pub fn new(point: DimensionSpacePoint) -> Self {
        Self(point)
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self(DimensionSpacePoint::from_pairs(pairs))
    }

    pub fn as_dimension_space_point(&self) -> &DimensionSpacePoint {
        &self.0
    }

    pub fn hash(&self) -> DimensionSpacePointHash {
        self.0.hash()
    }
}

impl From<DimensionSpacePoint> for OriginDimensionSpacePoint {
    fn from(point: DimensionSpacePoint) -> Self {
        Self(point)
    }
}

impl fmt::Display for OriginDimensionSpacePoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// A set of dimension space points, keyed and ordered by hash.
///
/// Serialized as a plain list of points.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Vec<DimensionSpacePoint>", into = "Vec<DimensionSpacePoint>")]
pub struct DimensionSpacePointSet {
    points: BTreeMap<DimensionSpacePointHash, DimensionSpacePoint>,
}

impl DimensionSpacePointSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, point: DimensionSpacePoint) -> bool {
        self.points.insert(point.hash(), point).is_none()
    }

    pub fn contains(&self, point: &DimensionSpacePoint) -> bool {
        self.points.contains_key(&point.hash())
    }

    pub fn contains_hash(&self, hash: &DimensionSpacePointHash) -> bool {
        self.points.contains_key(hash)
    }

    pub fn iter(&self) -> impl Iterator<Item = &DimensionSpacePoint> {
        self.points.values()
    }

    pub fn hashes(&self) -> impl Iterator<Item = &DimensionSpacePointHash> {
        self.points.keys()
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}

impl FromIterator<DimensionSpacePoint> for DimensionSpacePointSet {
    fn from_iter<I: IntoIterator<Item = DimensionSpacePoint>>(iter: I) -> Self {
        Self {
            points: iter.into_iter().map(|point| (point.hash(), point)).collect(),
        }
    }
}

impl From<Vec<DimensionSpacePoint>> for DimensionSpacePointSet {
    fn from(points: Vec<DimensionSpacePoint>) -> Self {
        points.into_iter().collect()
    }
}

impl From<DimensionSpacePointSet> for Vec<DimensionSpacePoint> {
    fn from(set: DimensionSpacePointSet) -> Self {
        set.points.into_values().collect()
    }
}

impl<'a> IntoIterator for &'a DimensionSpacePointSet {
    type Item = &'a DimensionSpacePoint;
    type IntoIter = std::collections::btree_map::Values<'a, DimensionSpacePointHash, DimensionSpacePoint>;

    fn into_iter(self) -> Self::IntoIter {
        self.points.values()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn point(language: &str) -> DimensionSpacePoint {
        DimensionSpacePoint::from_pairs([("language", language)])
    }

    #[test]
    fn test_hash_ignores_insertion_order() {
        let a = DimensionSpacePoint::from_pairs([("language", "en"), ("region", "US")]);
        let b = DimensionSpacePoint::from_pairs([("region", "US"), ("language", "en")]);
        assert_eq!(a.hash(), b.hash());
    }

    #[test]
    fn test_hash_distinguishes_coordinates() {
        assert_ne!(point("en").hash(), point("de").hash());
        assert_ne!(point("en").hash(), DimensionSpacePoint::empty().hash());
        // Concatenation must not collide: {"ab": "c"} vs {"a": "bc"}
        assert_ne!(
            DimensionSpacePoint::from_pairs([("ab", "c")]).hash(),
            DimensionSpacePoint::from_pairs([("a", "bc")]).hash()
        );
    }

    #[test]
    fn test_set_deduplicates_points() {
        let mut set = DimensionSpacePointSet::new();
        assert!(set.insert(point("en")));
        assert!(!set.insert(point("en")));
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn test_set_serializes_as_list_of_points() {
        let set: DimensionSpacePointSet = vec![point("en")].into();
        let json = serde_json::to_value(&set).unwrap();
        assert_eq!(json, serde_json::json!([{"language": "en"}]));

        let decoded: DimensionSpacePointSet = serde_json::from_value(json).unwrap();
        assert_eq!(decoded, set);
    }

    #[test]
    fn test_display() {
        let point = DimensionSpacePoint::from_pairs([("language", "en"), ("region", "US")]);
        assert_eq!(point.to_string(), "{language: en, region: US}");
        assert_eq!(DimensionSpacePoint::empty().to_string(), "{}");
    }
}
