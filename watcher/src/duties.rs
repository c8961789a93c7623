//! Resolution of the validator expected to propose at a given slot.

use crate::beacon::BeaconApi;
use crate::Error;
use eth2::types::{Epoch, ProposerData, PublicKeyHex, Slot};
use lru::LruCache;
use std::collections::HashMap;
use std::num::NonZeroUsize;
use std::sync::Arc;

/// Finalized slots are processed an epoch at a time, a handful of epochs is plenty.
pub const DEFAULT_CACHE_SIZE: usize = 4;

/// Returns the public key of the proposer of `slot`.
///
/// The beacon node makes no promise about the order of `duties`, so the whole listing is
/// searched.
pub fn resolve_proposer(duties: &[ProposerData], slot: Slot) -> Result<&PublicKeyHex, Error> {
    duties
        .iter()
        .find(|duty| duty.slot == slot)
        .map(|duty| &duty.pubkey)
        .ok_or(Error::NoProposerDuty { slot })
}

/// The proposer duties of a single epoch, indexed by slot.
#[derive(Debug)]
pub struct EpochDuties {
    duties: Vec<ProposerData>,
    by_slot: HashMap<Slot, usize>,
}

impl EpochDuties {
    pub fn new(duties: Vec<ProposerData>) -> Self {
        let by_slot = duties
            .iter()
            .enumerate()
            .map(|(i, duty)| (duty.slot, i))
            .collect();

        Self { duties, by_slot }
    }

    pub fn duties(&self) -> &[ProposerData] {
        &self.duties
    }

    pub fn proposer(&self, slot: Slot) -> Result<&PublicKeyHex, Error> {
        self.by_slot
            .get(&slot)
            .and_then(|i| self.duties.get(*i))
            .map(|duty| &duty.pubkey)
            .ok_or(Error::NoProposerDuty { slot })
    }
}

/// Remembers the proposer duties of the most recently requested epochs.
///
/// Only suitable for epochs which can no longer be re-organised, since a cached listing is never
/// refreshed.
pub struct ProposerDutiesCache {
    cache: LruCache<Epoch, Arc<EpochDuties>>,
}

impl ProposerDutiesCache {
    pub fn new(capacity: NonZeroUsize) -> Self {
        Self {
            cache: LruCache::new(capacity),
        }
    }

    /// Returns the duties of `epoch`, fetching them from `beacon` on a cache miss.
    pub async fn get_or_fetch<B: BeaconApi + ?Sized>(
        &mut self,
        beacon: &B,
        epoch: Epoch,
    ) -> Result<Arc<EpochDuties>, Error> {
        if let Some(duties) = self.cache.get(&epoch) {
            return Ok(duties.clone());
        }

        let duties = Arc::new(EpochDuties::new(beacon.proposer_duties(epoch).await?));
        self.cache.put(epoch, duties.clone());
        Ok(duties)
    }

    pub fn len(&self) -> usize {
        self.cache.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cache.is_empty()
    }
}

impl Default for ProposerDutiesCache {
    fn default() -> Self {
        Self::new(NonZeroUsize::new(DEFAULT_CACHE_SIZE).unwrap_or(NonZeroUsize::MIN))
    }
}
