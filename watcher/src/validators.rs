use crate::beacon::BeaconApi;
use crate::labels::{LabelRegistry, LabelSet};
use eth2::types::PublicKeyHex;
use std::collections::{HashMap, HashSet};

/// The validators we watch over.
///
/// A validator is ours if it is listed in the public keys file or in the label registry. Only
/// ours are indexed, the rest of the validator registry is never held in memory.
#[derive(Debug, Default)]
pub struct OurValidators {
    pubkeys: HashSet<PublicKeyHex>,
    labels: LabelRegistry,
    index_to_pubkey: HashMap<u64, PublicKeyHex>,
}

impl OurValidators {
    pub fn new(pubkeys: impl IntoIterator<Item = PublicKeyHex>, labels: LabelRegistry) -> Self {
        let pubkeys = pubkeys
            .into_iter()
            .chain(labels.pubkeys().cloned())
            .collect();

        Self {
            pubkeys,
            labels,
            index_to_pubkey: HashMap::new(),
        }
    }

    pub fn is_ours(&self, pubkey: &PublicKeyHex) -> bool {
        self.pubkeys.contains(pubkey)
    }

    pub fn len(&self) -> usize {
        self.pubkeys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pubkeys.is_empty()
    }

    pub fn labels(&self) -> &LabelRegistry {
        &self.labels
    }

    pub fn labels_of(&self, pubkey: &PublicKeyHex) -> Option<&LabelSet> {
        self.labels.get(pubkey)
    }

    pub fn pubkey_of(&self, index: u64) -> Option<&PublicKeyHex> {
        self.index_to_pubkey.get(&index)
    }

    /// The label-set of the validator at `index`, if it is one of ours and is labelled.
    pub fn labels_of_index(&self, index: u64) -> Option<&LabelSet> {
        self.pubkey_of(index)
            .and_then(|pubkey| self.labels_of(pubkey))
    }

    pub fn has_indices(&self) -> bool {
        !self.index_to_pubkey.is_empty()
    }

    /// Rebuilds the index to public key map from the head state.
    ///
    /// Returns the number of our validators known to the chain.
    pub async fn refresh_indices<B: BeaconApi + ?Sized>(
        &mut self,
        beacon: &B,
    ) -> Result<usize, eth2::Error> {
        let mut pubkeys = self.pubkeys.iter().cloned().collect::<Vec<_>>();
        pubkeys.sort_unstable();

        let index_to_pubkey = beacon
            .validators(&pubkeys)
            .await?
            .into_iter()
            .filter(|data| self.pubkeys.contains(&data.validator.pubkey))
            .map(|data| (data.index, data.validator.pubkey))
            .collect::<HashMap<_, _>>();

        self.index_to_pubkey = index_to_pubkey;
        Ok(self.index_to_pubkey.len())
    }
}
