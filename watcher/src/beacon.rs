//! The narrow view of the beacon node API the watcher relies upon.
//!
//! Everything the engine reads from the chain goes through [`BeaconApi`], so the engine can be
//! driven by an in-memory node in tests.

use async_trait::async_trait;
use eth2::types::{
    BeaconBlockHeader, BlockId, Epoch, GenesisData, ProposerData, PublicKeyHex, Slot,
    StandardBlockReward, StateId, SyncCommitteeReward, ValidatorData, ValidatorId,
};
use eth2::{BeaconNodeHttpClient, Error};

#[async_trait]
pub trait BeaconApi: Send + Sync {
    async fn genesis(&self) -> Result<GenesisData, Error>;

    /// The proposer duties of every slot of `epoch`, in no particular order.
    async fn proposer_duties(&self, epoch: Epoch) -> Result<Vec<ProposerData>, Error>;

    /// Returns `Ok(None)` if there is no block at `block_id`.
    async fn block_header(&self, block_id: BlockId) -> Result<Option<BeaconBlockHeader>, Error>;

    /// Returns `Ok(None)` if there is no block at `slot`.
    async fn block_reward(&self, slot: Slot) -> Result<Option<StandardBlockReward>, Error>;

    /// The validator indices of the sync committee in charge during `epoch`.
    async fn sync_committee(&self, epoch: Epoch) -> Result<Vec<u64>, Error>;

    /// Returns `Ok(None)` if there is no block at `slot`.
    async fn sync_committee_rewards(
        &self,
        slot: Slot,
    ) -> Result<Option<Vec<SyncCommitteeReward>>, Error>;

    /// The validators known to the head state amongst `pubkeys`.
    async fn validators(&self, pubkeys: &[PublicKeyHex]) -> Result<Vec<ValidatorData>, Error>;
}

#[async_trait]
impl BeaconApi for BeaconNodeHttpClient {
    async fn genesis(&self) -> Result<GenesisData, Error> {
        self.get_beacon_genesis().await.map(|response| response.data)
    }

    async fn proposer_duties(&self, epoch: Epoch) -> Result<Vec<ProposerData>, Error> {
        self.get_validator_duties_proposer(epoch)
            .await
            .map(|response| response.data)
    }

    async fn block_header(&self, block_id: BlockId) -> Result<Option<BeaconBlockHeader>, Error> {
        Ok(self
            .get_beacon_headers_block_id(block_id)
            .await?
            .map(|response| response.data.header.message))
    }

    async fn block_reward(&self, slot: Slot) -> Result<Option<StandardBlockReward>, Error> {
        Ok(self
            .get_beacon_rewards_blocks(BlockId::Slot(slot))
            .await?
            .map(|response| response.data))
    }

    async fn sync_committee(&self, epoch: Epoch) -> Result<Vec<u64>, Error> {
        self.get_beacon_states_sync_committees(StateId::Head, Some(epoch))
            .await
            .map(|response| response.data.validators)
    }

    async fn sync_committee_rewards(
        &self,
        slot: Slot,
    ) -> Result<Option<Vec<SyncCommitteeReward>>, Error> {
        Ok(self
            .post_beacon_rewards_sync_committee(BlockId::Slot(slot), &[])
            .await?
            .map(|response| response.data))
    }

    async fn validators(&self, pubkeys: &[PublicKeyHex]) -> Result<Vec<ValidatorData>, Error> {
        // An empty filter would return the whole registry.
        if pubkeys.is_empty() {
            return Ok(vec![]);
        }

        let ids = pubkeys
            .iter()
            .cloned()
            .map(ValidatorId::PublicKey)
            .collect::<Vec<_>>();

        Ok(self
            .post_beacon_states_validators(StateId::Head, &ids)
            .await?
            .map(|response| response.data)
            .unwrap_or_default())
    }
}
