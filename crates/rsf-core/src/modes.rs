//! Mode-keyed containers.
//!
//! Coefficients, energies, and amplitude ratios are all keyed by harmonic
//! index `l`. Keys serialize as strings so the same map round-trips through
//! TOML tables and JSON objects.

use std::collections::BTreeMap;
use std::fmt;
use std::marker::PhantomData;

use serde::de::{MapAccess, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Ordered map from harmonic index to a per-mode value.
#[derive(Clone, Debug, PartialEq, Default)]
pub struct ModeMap<T>(BTreeMap<u32, T>);

impl<T> ModeMap<T> {
    pub fn new() -> Self {
        Self(BTreeMap::new())
    }

    pub fn insert(&mut self, l: u32, value: T) -> Option<T> {
        self.0.insert(l, value)
    }

    pub fn get(&self, l: u32) -> Option<&T> {
        self.0.get(&l)
    }

    pub fn contains(&self, l: u32) -> bool {
        self.0.contains_key(&l)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterate in ascending mode order.
    pub fn iter(&self) -> impl Iterator<Item = (u32, &T)> {
        self.0.iter().map(|(l, v)| (*l, v))
    }

    pub fn modes(&self) -> impl Iterator<Item = u32> + '_ {
        self.0.keys().copied()
    }

    pub fn values(&self) -> impl Iterator<Item = &T> {
        self.0.values()
    }
}

impl<T> FromIterator<(u32, T)> for ModeMap<T> {
    fn from_iter<I: IntoIterator<Item = (u32, T)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl<T: Serialize> Serialize for ModeMap<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_map(self.0.iter().map(|(l, v)| (l.to_string(), v)))
    }
}

impl<'de, T: Deserialize<'de>> Deserialize<'de> for ModeMap<T> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_map(ModeMapVisitor(PhantomData))
    }
}

struct ModeMapVisitor<T>(PhantomData<T>);

impl<'de, T: Deserialize<'de>> Visitor<'de> for ModeMapVisitor<T> {
    type Value = ModeMap<T>;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a map keyed by harmonic index")
    }

    fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Self::Value, A::Error> {
        let mut map = BTreeMap::new();
        while let Some((key, value)) = access.next_entry::<String, T>()? {
            let l = key.trim().parse::<u32>().map_err(|_| {
                serde::de::Error::custom(format!("mode key '{key}' is not a non-negative integer"))
            })?;
            if map.insert(l, value).is_some() {
                return Err(serde::de::Error::custom(format!("duplicate mode key {l}")));
            }
        }
        Ok(ModeMap(map))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::de::value::{Error as ValueError, MapDeserializer};

    fn parse(entries: &[(&str, f64)]) -> Result<ModeMap<f64>, String> {
        let owned = entries.iter().map(|(k, v)| (k.to_string(), *v));
        let de = MapDeserializer::<_, ValueError>::new(owned);
        ModeMap::<f64>::deserialize(de).map_err(|e| e.to_string())
    }

    #[test]
    fn test_iterates_in_mode_order() {
        let map: ModeMap<f64> = [(9, 0.3), (3, 1.0), (6, 0.6)].into_iter().collect();
        let modes: Vec<u32> = map.modes().collect();
        assert_eq!(modes, vec![3, 6, 9]);
        assert_eq!(map.get(6), Some(&0.6));
        assert!(map.get(4).is_none());
    }

    #[test]
    fn test_parses_string_keys() {
        let map = parse(&[("6", 0.5), (" 3 ", 1.0)]).unwrap();
        assert_eq!(map.get(3), Some(&1.0));
        assert_eq!(map.get(6), Some(&0.5));
    }

    #[test]
    fn test_rejects_non_integer_keys() {
        let err = parse(&[("three", 1.0)]).unwrap_err();
        assert!(err.contains("not a non-negative integer"), "{err}");
    }

    #[test]
    fn test_rejects_duplicate_keys() {
        let err = parse(&[("3", 1.0), ("03", 2.0)]).unwrap_err();
        assert!(err.contains("duplicate mode key 3"), "{err}");
    }
}
