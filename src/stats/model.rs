use std::fs;
use std::path::Path;

use anyhow::{bail, Context, Result};
use serde_json::Value;

/// The simulator's statistics dump: a tree of named groups whose leaves are
/// scalar stats (`{"value": n}`) or vector stats
/// (`{"type": "Distribution", "num_bins", "bin_size", "value": {"0": ...}}`).
/// Component arrays sit under a `value` list (e.g. `core_clusters`).
pub struct StatsFile {
    root: Value,
}

impl StatsFile {
    pub fn load(path: &Path) -> Result<StatsFile> {
        let text = fs::read_to_string(path)
            .with_context(|| format!("reading stats file {}", path.display()))?;
        let root: Value = serde_json::from_str(&text)
            .with_context(|| format!("parsing stats file {}", path.display()))?;
        Ok(StatsFile { root })
    }

    pub fn from_value(root: Value) -> StatsFile {
        StatsFile { root }
    }

    pub fn root(&self) -> Node<'_> {
        Node {
            value: &self.root,
            path: String::new(),
        }
    }
}

/// A cursor into the stats tree. Carries the dotted path walked so far so
/// that every lookup failure names the exact stat that was missing.
#[derive(Clone, Debug)]
pub struct Node<'a> {
    value: &'a Value,
    path: String,
}

impl<'a> Node<'a> {
    fn extend_path(&self, key: &str) -> String {
        if self.path.is_empty() {
            key.to_string()
        } else {
            format!("{}.{}", self.path, key)
        }
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn has(&self, key: &str) -> bool {
        self.value.get(key).is_some()
    }

    pub fn child(&self, key: &str) -> Result<Node<'a>> {
        match self.value.get(key) {
            Some(value) => Ok(Node {
                value,
                path: self.extend_path(key),
            }),
            None => bail!("stat {:?} not found in stats file", self.extend_path(key)),
        }
    }

    /// The node's own `value` field as a number.
    pub fn value(&self) -> Result<f64> {
        let value = self
            .child("value")?
            .value
            .as_f64();
        match value {
            Some(v) => Ok(v),
            None => bail!("stat {:?} has a non-scalar value", self.extend_path("value")),
        }
    }

    /// Shorthand for `child(key)?.value()`.
    pub fn scalar(&self, key: &str) -> Result<f64> {
        self.child(key)?.value()
    }

    /// The component's reported name (groups carry a `name` field).
    pub fn name(&self) -> Result<String> {
        match self.child("name")?.value.as_str() {
            Some(name) => Ok(name.to_string()),
            None => bail!("stat {:?} is not a string", self.extend_path("name")),
        }
    }

    /// Elements of a component array (`value` holds a list of groups).
    pub fn elements(&self) -> Result<Vec<Node<'a>>> {
        let list = self.child("value")?;
        match list.value.as_array() {
            Some(items) => Ok(items
                .iter()
                .enumerate()
                .map(|(i, value)| Node {
                    value,
                    path: format!("{}[{}]", list.path, i),
                })
                .collect()),
            None => bail!("stat {:?} is not a component array", list.path),
        }
    }

    fn is_distribution(value: &Value) -> bool {
        value.get("type").and_then(Value::as_str) == Some("Distribution")
    }

    /// Names of every vector stat directly under this component.
    pub fn distribution_names(&self) -> Vec<String> {
        match self.value.as_object() {
            Some(map) => {
                let mut names: Vec<String> = map
                    .iter()
                    .filter(|(_, v)| Self::is_distribution(v))
                    .map(|(k, _)| k.clone())
                    .collect();
                names.sort();
                names
            }
            None => Vec::new(),
        }
    }

    /// Decode a vector stat. `Ok(None)` when the stat is absent or not a
    /// distribution, mirroring the reporting facility's optional histograms.
    pub fn distribution(&self, key: &str) -> Result<Option<Distribution>> {
        let node = match self.value.get(key) {
            Some(value) => Node {
                value,
                path: self.extend_path(key),
            },
            None => return Ok(None),
        };
        if !Self::is_distribution(node.value) {
            return Ok(None);
        }
        let num_bins = node.scalar_field("num_bins")? as usize;
        let bin_size = node.scalar_field("bin_size")?;
        let buckets = node.child("value")?;
        let mut counts = Vec::with_capacity(num_bins);
        for i in 0..num_bins {
            counts.push(buckets.scalar(&i.to_string())?);
        }
        Ok(Some(Distribution {
            name: key.to_string(),
            bin_size,
            counts,
        }))
    }

    /// A bare numeric field (distribution headers are not `{"value": n}`
    /// wrapped).
    fn scalar_field(&self, key: &str) -> Result<f64> {
        let node = self.child(key)?;
        match node.value.as_f64() {
            Some(v) => Ok(v),
            None => bail!("stat {:?} is not numeric", node.path),
        }
    }
}

/// A decoded vector stat: per-bucket counts at a fixed bucket width.
#[derive(Debug, Clone, PartialEq)]
pub struct Distribution {
    pub name: String,
    pub bin_size: f64,
    pub counts: Vec<f64>,
}

impl Distribution {
    /// Left edge of each bucket.
    pub fn edges(&self) -> Vec<f64> {
        (0..self.counts.len())
            .map(|i| i as f64 * self.bin_size)
            .collect()
    }

    pub fn total(&self) -> f64 {
        self.counts.iter().sum()
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use serde_json::json;

    /// A stats document shaped like a 1-cluster CHI run.
    pub(crate) fn fixture() -> StatsFile {
        StatsFile::from_value(json!({
            "simTicks": {"value": 2_000_000_000.0},
            "simFreq": {"value": 1_000_000_000_000.0},
            "simInsts": {"value": 5_000_000.0},
            "board": {
                "cache_hierarchy": {
                    "l3cache": {
                        "name": "l3cache",
                        "cache": {
                            "m_demand_hits": {"value": 600.0},
                            "m_demand_misses": {"value": 400.0}
                        },
                        "outTransLatHist.SendReadNoSnp": {
                            "type": "Distribution",
                            "num_bins": 4,
                            "bin_size": 10.0,
                            "value": {
                                "0": {"value": 5.0},
                                "1": {"value": 9.0},
                                "2": {"value": 3.0},
                                "3": {"value": 1.0}
                            }
                        }
                    },
                    "core_clusters": {
                        "value": [
                            {
                                "icache": {
                                    "name": "icache",
                                    "cache": {
                                        "m_demand_hits": {"value": 90.0},
                                        "m_demand_misses": {"value": 10.0}
                                    }
                                },
                                "dcache": {
                                    "name": "dcache",
                                    "cache": {
                                        "m_demand_hits": {"value": 75.0},
                                        "m_demand_misses": {"value": 25.0}
                                    },
                                    "downstream_destinations": {
                                        "value": [
                                            {
                                                "name": "downstream_destinations",
                                                "cache": {
                                                    "m_demand_hits": {"value": 30.0},
                                                    "m_demand_misses": {"value": 10.0}
                                                },
                                                "outTransLatHist.SendReadNoSnp": {
                                                    "type": "Distribution",
                                                    "num_bins": 2,
                                                    "bin_size": 20.0,
                                                    "value": {
                                                        "0": {"value": 7.0},
                                                        "1": {"value": 2.0}
                                                    }
                                                }
                                            }
                                        ]
                                    }
                                }
                            }
                        ]
                    }
                }
            }
        }))
    }

    #[test]
    fn test_scalar_lookup() {
        let stats = fixture();
        let root = stats.root();
        assert_eq!(root.scalar("simInsts").unwrap(), 5_000_000.0);
        let l3 = root
            .child("board")
            .unwrap()
            .child("cache_hierarchy")
            .unwrap()
            .child("l3cache")
            .unwrap();
        assert_eq!(l3.name().unwrap(), "l3cache");
        assert_eq!(l3.child("cache").unwrap().scalar("m_demand_hits").unwrap(), 600.0);
    }

    #[test]
    fn test_missing_stat_names_the_path() {
        let stats = fixture();
        let err = stats.root().scalar("simSeconds").unwrap_err();
        assert!(err.to_string().contains("simSeconds"));

        let hierarchy = stats
            .root()
            .child("board")
            .unwrap()
            .child("cache_hierarchy")
            .unwrap();
        let err = hierarchy.child("l4cache").unwrap_err();
        assert!(err.to_string().contains("board.cache_hierarchy.l4cache"));
    }

    #[test]
    fn test_component_array() {
        let stats = fixture();
        let clusters = stats
            .root()
            .child("board")
            .unwrap()
            .child("cache_hierarchy")
            .unwrap()
            .child("core_clusters")
            .unwrap()
            .elements()
            .unwrap();
        assert_eq!(clusters.len(), 1);
        assert!(clusters[0].has("icache"));
        assert!(clusters[0].path().ends_with("core_clusters.value[0]"));
    }

    #[test]
    fn test_distribution_decoding() {
        let stats = fixture();
        let l3 = stats
            .root()
            .child("board")
            .unwrap()
            .child("cache_hierarchy")
            .unwrap()
            .child("l3cache")
            .unwrap();
        let dist = l3
            .distribution("outTransLatHist.SendReadNoSnp")
            .unwrap()
            .unwrap();
        assert_eq!(dist.counts, vec![5.0, 9.0, 3.0, 1.0]);
        assert_eq!(dist.bin_size, 10.0);
        assert_eq!(dist.edges(), vec![0.0, 10.0, 20.0, 30.0]);
        assert_eq!(dist.total(), 18.0);

        assert!(l3.distribution("outTransLatHist.SendUnique").unwrap().is_none());
        // A scalar is not silently reinterpreted as a histogram.
        assert!(l3.distribution("cache").unwrap().is_none());
        assert_eq!(
            l3.distribution_names(),
            vec!["outTransLatHist.SendReadNoSnp".to_string()]
        );
    }

    #[test]
    fn test_truncated_distribution_is_an_error() {
        let stats = StatsFile::from_value(json!({
            "c": {
                "hist": {
                    "type": "Distribution",
                    "num_bins": 3,
                    "bin_size": 1.0,
                    "value": {"0": {"value": 1.0}, "1": {"value": 2.0}}
                }
            }
        }));
        let err = stats
            .root()
            .child("c")
            .unwrap()
            .distribution("hist")
            .unwrap_err();
        assert!(err.to_string().contains("c.hist.value.2"));
    }
}
