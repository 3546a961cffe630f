//! Squeezer: deterministic identifier minification
//!
//! Maps readable names to short `N$<base62>` tokens. A squeezer built on
//! top of parent squeezers inherits every pair they hold, so that separately
//! compiled instances agree on the tokens of shared names. Index ranges are
//! partitioned between instances by the caller through the start and end
//! indices.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::RwLock;
use rustc_hash::{FxHashMap, FxHashSet};

use crate::error::SqueezeError;

/// Digits ordered by letter frequency, so that short tokens read like words.
const BASE62_DIGITS: &[u8; 62] = b"etnrisouaflchpdvmgybwESxTNCkLAOMDPHBjFIqRUzWXVJKQGYZ0516372984";

pub const SQUEEZE_PREFIX: &str = "N$";

static NEXT_SQUEEZER_ID: AtomicU64 = AtomicU64::new(1);

/// Little-endian base-62: the least significant digit comes first.
pub fn to_base62(mut index: u64) -> String {
    let mut result = String::new();
    loop {
        result.push(BASE62_DIGITS[(index % 62) as usize] as char);
        index /= 62;
        if index == 0 {
            break;
        }
    }
    result
}

#[derive(Debug, Clone, Default)]
struct SqueezeTables {
    next_index: u64,
    to_token: FxHashMap<String, String>,
    from_token: FxHashMap<String, String>,
    /// Ids of every squeezer whose pairs are already merged in
    ancestors: FxHashSet<u64>,
}

impl SqueezeTables {
    fn add_pair(&mut self, name: &str, token: &str) -> Result<(), SqueezeError> {
        if let Some(existing) = self.to_token.get(name) {
            if existing != token {
                return Err(SqueezeError::NameConflict {
                    name: name.to_string(),
                    existing: existing.clone(),
                    incoming: token.to_string(),
                });
            }
            return Ok(());
        }

        if let Some(existing) = self.from_token.get(token) {
            if existing != name {
                return Err(SqueezeError::TokenConflict {
                    token: token.to_string(),
                    existing: existing.clone(),
                    incoming: name.to_string(),
                });
            }
        }

        self.to_token.insert(name.to_string(), token.to_string());
        self.from_token.insert(token.to_string(), name.to_string());
        Ok(())
    }
}

#[derive(Debug)]
pub struct Squeezer {
    id: u64,
    tables: RwLock<SqueezeTables>,
    builtins: FxHashSet<String>,
    start_index: u64,
    /// Exclusive; 0 means unbounded
    max_index: u64,
}

impl Squeezer {
    /// Tokens are allocated from `start_index` up to, but not including,
    /// `max_index`; a `max_index` of 0 leaves the range unbounded.
    pub fn new(
        parents: &[Arc<Squeezer>],
        start_index: u64,
        max_index: u64,
        builtins: &BTreeSet<String>,
    ) -> Result<Self, SqueezeError> {
        let mut all_builtins: FxHashSet<String> = builtins.iter().cloned().collect();
        // Called by name from the runtime's init dispatch
        all_builtins.insert("init".to_string());

        let mut squeezer = Self {
            id: NEXT_SQUEEZER_ID.fetch_add(1, Ordering::Relaxed),
            tables: RwLock::new(SqueezeTables {
                next_index: start_index,
                ..SqueezeTables::default()
            }),
            builtins: all_builtins,
            start_index,
            max_index,
        };

        for parent in parents {
            squeezer.merge(parent)?;
            squeezer.builtins.extend(parent.builtins.iter().cloned());
        }

        Ok(squeezer)
    }

    /// Adds every pair held by `parent`. Pairs are visited in token order so
    /// that conflicts are reported deterministically. A squeezer that is
    /// already an ancestor (reached again through a diamond, or merged by an
    /// earlier call) is skipped.
    pub fn merge(&self, parent: &Squeezer) -> Result<(), SqueezeError> {
        if parent.id == self.id || self.has_ancestor(parent.id) {
            return Ok(());
        }

        let (pairs, inherited) = {
            let parent_tables = parent.tables.read();
            let mut pairs: Vec<(String, String)> = parent_tables
                .from_token
                .iter()
                .map(|(token, name)| (token.clone(), name.clone()))
                .collect();
            pairs.sort();
            (pairs, parent_tables.ancestors.clone())
        };

        let mut tables = self.tables.write();
        for (token, name) in &pairs {
            tables.add_pair(name, token)?;
        }
        tables.ancestors.insert(parent.id);
        tables.ancestors.extend(inherited);
        Ok(())
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    /// Whether the pairs of squeezer `id` were merged into this one.
    pub fn has_ancestor(&self, id: u64) -> bool {
        self.tables.read().ancestors.contains(&id)
    }

    /// Frozen copy of the current tables under a new id. Committed state
    /// holds snapshots so that later calls on the live squeezer stay
    /// invisible to readers until they are committed in turn.
    pub fn snapshot(&self) -> Self {
        Self {
            id: NEXT_SQUEEZER_ID.fetch_add(1, Ordering::Relaxed),
            tables: RwLock::new(self.tables.read().clone()),
            builtins: self.builtins.clone(),
            start_index: self.start_index,
            max_index: self.max_index,
        }
    }

    pub fn is_builtin(&self, name: &str) -> bool {
        self.builtins.contains(name)
    }

    /// Returns the token for `name`, allocating one if needed.
    pub fn squeeze(&self, name: &str) -> Result<String, SqueezeError> {
        if self.is_builtin(name) {
            return Ok(name.to_string());
        }

        if let Some(token) = self.tables.read().to_token.get(name) {
            return Ok(token.clone());
        }

        let mut tables = self.tables.write();
        if let Some(token) = tables.to_token.get(name) {
            return Ok(token.clone());
        }

        loop {
            let index = tables.next_index;
            if self.max_index != 0 && index >= self.max_index {
                return Err(SqueezeError::RangeExceeded {
                    max: self.max_index,
                });
            }
            tables.next_index += 1;

            // An inherited pair may already own this token
            let token = format!("{}{}", SQUEEZE_PREFIX, to_base62(index));
            if tables.from_token.contains_key(&token) {
                continue;
            }

            tables.add_pair(name, &token)?;
            return Ok(token);
        }
    }

    /// Returns the token for `name` without allocating.
    pub fn lookup(&self, name: &str) -> Option<String> {
        if self.is_builtin(name) {
            return Some(name.to_string());
        }
        self.tables.read().to_token.get(name).cloned()
    }

    /// Returns the readable name for `token`, or `token` itself when unknown.
    pub fn unsqueeze(&self, token: &str) -> String {
        self.tables
            .read()
            .from_token
            .get(token)
            .cloned()
            .unwrap_or_else(|| token.to_string())
    }

    /// The full token to name table.
    pub fn squeeze_map(&self) -> BTreeMap<String, String> {
        self.tables
            .read()
            .from_token
            .iter()
            .map(|(token, name)| (token.clone(), name.clone()))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.tables.read().to_token.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Whether this squeezer was configured with the given index range.
    pub fn matches_config(&self, start_index: u64, max_index: u64) -> bool {
        self.start_index == start_index && self.max_index == max_index
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn squeezer(start: u64, max: u64) -> Squeezer {
        Squeezer::new(&[], start, max, &BTreeSet::new()).unwrap()
    }

    #[test]
    fn test_base62() {
        assert_eq!(to_base62(0), "e");
        assert_eq!(to_base62(1), "t");
        assert_eq!(to_base62(61), "4");
        assert_eq!(to_base62(62), "et");
        assert_eq!(to_base62(63), "tt");
    }

    #[test]
    fn test_squeeze_roundtrip() {
        let squeezer = squeezer(0, 0);
        assert_eq!(squeezer.squeeze("init").unwrap(), "init");

        let foo = squeezer.squeeze("foo").unwrap();
        let bar = squeezer.squeeze("bar").unwrap();
        assert_eq!(foo, "N$e");
        assert_eq!(bar, "N$t");
        assert_eq!(squeezer.squeeze("foo").unwrap(), foo);
        assert_eq!(squeezer.unsqueeze(&foo), "foo");
        assert_eq!(squeezer.unsqueeze("N$zzz"), "N$zzz");

        let map = squeezer.squeeze_map();
        assert_eq!(map.len(), 2);
        assert_eq!(map.get("N$t").map(String::as_str), Some("bar"));
    }

    #[test]
    fn test_builtins() {
        let builtins: BTreeSet<String> = ["length".to_string()].into_iter().collect();
        let squeezer = Squeezer::new(&[], 0, 0, &builtins).unwrap();
        assert_eq!(squeezer.squeeze("length").unwrap(), "length");

        let child = Squeezer::new(&[Arc::new(squeezer)], 100, 0, &BTreeSet::new()).unwrap();
        assert_eq!(child.squeeze("length").unwrap(), "length");
    }

    #[test]
    fn test_range_exceeded() {
        let squeezer = squeezer(10, 12);
        squeezer.squeeze("a").unwrap();
        squeezer.squeeze("b").unwrap();
        assert_eq!(
            squeezer.squeeze("c").unwrap_err(),
            SqueezeError::RangeExceeded { max: 12 }
        );
    }

    #[test]
    fn test_end_index_is_exclusive() {
        let squeezer = squeezer(0, 2);
        assert_eq!(squeezer.squeeze("a").unwrap(), "N$e");
        assert_eq!(squeezer.squeeze("b").unwrap(), "N$t");
        assert_eq!(squeezer.squeeze("c").unwrap_err(), SqueezeError::RangeExceeded { max: 2 });
        assert_eq!(squeezer.len(), 2);
    }

    #[test]
    fn test_snapshot_is_frozen() {
        let live = squeezer(0, 0);
        live.squeeze("foo").unwrap();

        let frozen = live.snapshot();
        live.squeeze("bar").unwrap();

        assert_ne!(frozen.id(), live.id());
        assert_eq!(frozen.len(), 1);
        assert!(frozen.lookup("bar").is_none());
        assert_eq!(frozen.lookup("foo"), live.lookup("foo"));
    }

    #[test]
    fn test_child_inherits_parent_tokens() {
        let parent = Arc::new(squeezer(0, 100));
        let foo = parent.squeeze("foo").unwrap();

        let child = Squeezer::new(&[parent.clone()], 100, 0, &BTreeSet::new()).unwrap();
        assert_eq!(child.squeeze("foo").unwrap(), foo);
        assert_eq!(child.unsqueeze(&foo), "foo");

        let bar = child.squeeze("bar").unwrap();
        assert_eq!(bar, format!("N${}", to_base62(100)));
        assert!(parent.lookup("bar").is_none());
    }

    #[test]
    fn test_allocation_skips_inherited_tokens() {
        let parent = Arc::new(squeezer(0, 0));
        parent.squeeze("foo").unwrap();

        // Overlapping range: index 0 is already owned by the parent
        let child = Squeezer::new(&[parent], 0, 0, &BTreeSet::new()).unwrap();
        assert_eq!(child.squeeze("bar").unwrap(), "N$t");
    }

    #[test]
    fn test_merge_conflicts() {
        let a = Arc::new(squeezer(0, 0));
        let b = Arc::new(squeezer(0, 0));
        a.squeeze("foo").unwrap();
        b.squeeze("bar").unwrap();

        let err = Squeezer::new(&[a.clone(), b.clone()], 100, 0, &BTreeSet::new()).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Squeezer conflict for token 'N$e': 'foo' vs 'bar'"
        );

        let c = Arc::new(squeezer(5, 0));
        c.squeeze("foo").unwrap();
        let err = Squeezer::new(&[a, c], 100, 0, &BTreeSet::new()).unwrap_err();
        assert_eq!(
            err,
            SqueezeError::NameConflict {
                name: "foo".to_string(),
                existing: "N$e".to_string(),
                incoming: format!("N${}", to_base62(5)),
            }
        );
    }

    #[test]
    fn test_diamond_merge() {
        let root = Arc::new(squeezer(0, 10));
        root.squeeze("shared").unwrap();
        let root_id = root.id();

        let left = Arc::new(Squeezer::new(&[root.clone()], 10, 20, &BTreeSet::new()).unwrap());
        let right = Arc::new(Squeezer::new(&[root], 20, 30, &BTreeSet::new()).unwrap());
        left.squeeze("l").unwrap();
        right.squeeze("r").unwrap();

        let child = Squeezer::new(&[left.clone(), right.clone()], 30, 0, &BTreeSet::new()).unwrap();
        assert_eq!(child.len(), 3);
        assert!(child.has_ancestor(root_id));
        assert!(child.has_ancestor(left.id()));
        assert!(child.has_ancestor(right.id()));
    }

    #[test]
    fn test_ancestor_is_merged_once() {
        let root = Arc::new(squeezer(0, 10));
        root.squeeze("shared").unwrap();
        let left = Arc::new(Squeezer::new(&[root.clone()], 10, 20, &BTreeSet::new()).unwrap());

        let child = Squeezer::new(&[left], 20, 0, &BTreeSet::new()).unwrap();
        assert!(child.has_ancestor(root.id()));

        // Pairs the root gains afterwards belong to a squeezer that was
        // already merged, so merging it again through the diamond adds nothing
        root.squeeze("late").unwrap();
        child.merge(&root).unwrap();
        assert!(child.lookup("late").is_none());

        // A fresh snapshot of the root is a new version and is merged
        child.merge(&root.snapshot()).unwrap();
        assert_eq!(child.lookup("late"), root.lookup("late"));
    }

    proptest! {
        #[test]
        fn prop_squeeze_is_bijective(names in proptest::collection::vec("[a-zA-Z_][a-zA-Z0-9_]{0,8}", 1..64)) {
            let squeezer = squeezer(0, 0);
            let mut seen: FxHashMap<String, String> = FxHashMap::default();

            for name in &names {
                let token = squeezer.squeeze(name).unwrap();
                if name == "init" {
                    prop_assert_eq!(&token, name);
                    continue;
                }
                prop_assert_eq!(squeezer.unsqueeze(&token), name.clone());
                if let Some(previous) = seen.insert(token.clone(), name.clone()) {
                    prop_assert_eq!(previous, name.clone());
                }
            }
        }

        #[test]
        fn prop_base62_is_injective(a in 0u64..1_000_000, b in 0u64..1_000_000) {
            prop_assume!(a != b);
            prop_assert_ne!(to_base62(a), to_base62(b));
        }
    }
}
