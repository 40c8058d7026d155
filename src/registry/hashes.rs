//! Hash algorithms.
//!
//! A [`Hash`] is a configurable algorithm. It creates [`HashFunction`]s, named
//! instances that compute a digest of a provider region once and keep it until
//! [`HashFunction::reset`] is called.

use super::provider::{DataProvider, Region};
use super::settings::SettingsUi;
use super::UnlocalizedString;
use serde_json::Value;
use std::fmt;
use std::sync::Arc;

pub type HashCallback = Arc<dyn Fn(Region, &dyn DataProvider) -> Vec<u8> + Send + Sync>;

/// A named hash instance with a memoized result
pub struct HashFunction {
    hash_name: UnlocalizedString,
    name: String,
    callback: HashCallback,
    cache: Option<Vec<u8>>,
}

impl HashFunction {
    pub fn new(
        hash_name: impl Into<UnlocalizedString>,
        name: impl Into<String>,
        callback: impl Fn(Region, &dyn DataProvider) -> Vec<u8> + Send + Sync + 'static,
    ) -> Self {
        Self {
            hash_name: hash_name.into(),
            name: name.into(),
            callback: Arc::new(callback),
            cache: None,
        }
    }

    /// Digest of `region`. Computed on the first call; later calls return the
    /// cached bytes regardless of their arguments until [`reset`](Self::reset).
    pub fn get(&mut self, region: Region, provider: &dyn DataProvider) -> &[u8] {
        let callback = &self.callback;
        self.cache.get_or_insert_with(|| callback(region, provider))
    }

    pub fn reset(&mut self) {
        self.cache = None;
    }

    #[must_use]
    pub fn is_cached(&self) -> bool {
        self.cache.is_some()
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn hash_name(&self) -> &UnlocalizedString {
        &self.hash_name
    }
}

impl fmt::Debug for HashFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HashFunction")
            .field("hash_name", &self.hash_name)
            .field("name", &self.name)
            .field("cached", &self.cache.is_some())
            .finish_non_exhaustive()
    }
}

/// A hash algorithm, possibly with settings of its own
pub trait Hash: Send + Sync {
    fn unlocalized_name(&self) -> &UnlocalizedString;

    /// Create an instance using the current settings
    fn create(&self, name: &str) -> HashFunction;

    fn store(&self) -> Value {
        Value::Null
    }

    fn load(&mut self, _data: &Value) {}

    /// Draw the algorithm's settings; true if they changed
    fn draw(&mut self, _ui: &mut dyn SettingsUi) -> bool {
        false
    }
}

#[derive(Default)]
pub struct Hashes {
    hashes: Vec<Box<dyn Hash>>,
}

impl Hashes {
    pub fn add(&mut self, hash: impl Hash + 'static) {
        self.hashes.push(Box::new(hash));
    }

    pub fn iter(&self) -> impl Iterator<Item = &dyn Hash> {
        self.hashes.iter().map(|hash| hash.as_ref())
    }

    #[must_use]
    pub fn by_name(&self, unlocalized_name: &str) -> Option<&dyn Hash> {
        self.iter().find(|hash| *hash.unlocalized_name() == unlocalized_name)
    }

    pub fn by_name_mut(&mut self, unlocalized_name: &str) -> Option<&mut (dyn Hash + 'static)> {
        self.hashes
            .iter_mut()
            .find(|hash| *hash.unlocalized_name() == unlocalized_name)
            .map(|hash| hash.as_mut())
    }

    /// Create a named instance of the algorithm registered as `unlocalized_name`
    #[must_use]
    pub fn create(&self, unlocalized_name: &str, name: &str) -> Option<HashFunction> {
        self.by_name(unlocalized_name).map(|hash| hash.create(name))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.hashes.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.hashes.is_empty()
    }

    pub fn clear(&mut self) {
        self.hashes.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::provider::MemoryProvider;
    use proptest::prelude::*;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Sums the region's bytes, offset by a configurable seed
    struct Checksum {
        name: UnlocalizedString,
        seed: u8,
        calls: Arc<AtomicUsize>,
    }

    impl Hash for Checksum {
        fn unlocalized_name(&self) -> &UnlocalizedString {
            &self.name
        }

        fn create(&self, name: &str) -> HashFunction {
            let seed = self.seed;
            let calls = self.calls.clone();
            HashFunction::new(self.name.clone(), name, move |region, provider| {
                calls.fetch_add(1, Ordering::SeqCst);
                let sum = provider
                    .read_region(region)
                    .iter()
                    .fold(seed, |acc, byte| acc.wrapping_add(*byte));
                vec![sum]
            })
        }

        fn store(&self) -> Value {
            json!({ "seed": self.seed })
        }

        fn load(&mut self, data: &Value) {
            if let Some(seed) = data["seed"].as_u64() {
                self.seed = seed as u8;
            }
        }
    }

    fn checksum(calls: Arc<AtomicUsize>) -> Checksum {
        Checksum {
            name: "test.checksum".into(),
            seed: 0,
            calls,
        }
    }

    #[test]
    fn test_hash_function_is_memoized_until_reset() {
        let calls = Arc::new(AtomicUsize::new(0));
        let mut provider = MemoryProvider::new(vec![1, 2, 3]);
        let mut function = checksum(calls.clone()).create("mine");

        let region = Region::new(0, 3);
        assert_eq!(function.get(region, &provider), &[6]);

        provider.write(0, &[10]);
        assert_eq!(function.get(region, &provider), &[6]);
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        function.reset();
        assert!(!function.is_cached());
        assert_eq!(function.get(region, &provider), &[15]);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_hash_settings_apply_to_new_instances() {
        let mut hashes = Hashes::default();
        hashes.add(checksum(Arc::new(AtomicUsize::new(0))));

        hashes.by_name_mut("test.checksum").unwrap().load(&json!({ "seed": 1 }));
        assert_eq!(hashes.by_name("test.checksum").unwrap().store(), json!({ "seed": 1 }));

        let provider = MemoryProvider::new(vec![1]);
        let mut function = hashes.create("test.checksum", "seeded").unwrap();
        assert_eq!(function.get(Region::new(0, 1), &provider), &[2]);
        assert_eq!(function.name(), "seeded");
        assert!(hashes.create("missing", "x").is_none());
    }

    proptest! {
        #[test]
        fn prop_repeated_get_returns_cached_bytes(
            data in proptest::collection::vec(any::<u8>(), 1..64),
            repeats in 1usize..8,
        ) {
            let calls = Arc::new(AtomicUsize::new(0));
            let provider = MemoryProvider::new(data.clone());
            let region = Region::new(0, data.len());
            let mut function = checksum(calls.clone()).create("prop");

            let first = function.get(region, &provider).to_vec();
            for _ in 0..repeats {
                prop_assert_eq!(function.get(region, &provider), first.as_slice());
            }
            prop_assert_eq!(calls.load(Ordering::SeqCst), 1);

            function.reset();
            prop_assert_eq!(function.get(region, &provider), first.as_slice());
            prop_assert_eq!(calls.load(Ordering::SeqCst), 2);
        }
    }
}
