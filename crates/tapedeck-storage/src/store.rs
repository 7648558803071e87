//! Read-only in-memory cassette index

use crate::error::{StorageError, StorageResult};
use crate::source::CassetteSource;
use std::collections::BTreeMap;
use tapedeck_core::{Cassette, Interaction};
use tracing::info;

/// Cassettes loaded once at start-up and shared read-only afterwards
#[derive(Debug, Clone, Default)]
pub struct CassetteStore {
    cassettes: BTreeMap<String, Cassette>,
}

impl CassetteStore {
    /// Load every cassette from `source`
    ///
    /// Any file that fails to parse fails the whole load.
    pub fn load(source: &dyn CassetteSource) -> StorageResult<Self> {
        let mut cassettes = BTreeMap::new();
        for (name, text) in source.read_all()? {
            let cassette = Cassette::from_yaml(name.clone(), &text).map_err(|e| {
                StorageError::MalformedCassetteAsset {
                    file: format!("{}.yaml", name),
                    reason: e.to_string(),
                }
            })?;
            cassettes.insert(name, cassette);
        }

        let store = Self { cassettes };
        info!(
            "Loaded {} cassettes ({} interactions) from {}",
            store.len(),
            store.interaction_count(),
            source.describe()
        );
        Ok(store)
    }

    pub fn from_cassettes(cassettes: impl IntoIterator<Item = Cassette>) -> Self {
        Self {
            cassettes: cassettes
                .into_iter()
                .map(|c| (c.name.clone(), c))
                .collect(),
        }
    }

    pub fn get(&self, name: &str) -> Option<&Cassette> {
        self.cassettes.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.cassettes.contains_key(name)
    }

    /// Cassettes in name order
    pub fn cassettes(&self) -> impl Iterator<Item = &Cassette> {
        self.cassettes.values()
    }

    /// Every interaction of every cassette: cassettes in name order,
    /// interactions in file order
    pub fn interactions(&self) -> impl Iterator<Item = (&str, &Interaction)> {
        self.cassettes.values().flat_map(|c| {
            c.interactions
                .iter()
                .map(move |interaction| (c.name.as_str(), interaction))
        })
    }

    pub fn len(&self) -> usize {
        self.cassettes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cassettes.is_empty()
    }

    pub fn interaction_count(&self) -> usize {
        self.cassettes.values().map(|c| c.interactions.len()).sum()
    }
}
