//! An in-memory beacon node and alert sink for driving the watcher in tests.

use crate::alert::{Alert, AlertError};
use crate::beacon::BeaconApi;
use async_trait::async_trait;
use eth2::types::{
    BeaconBlockHeader, BlockId, Epoch, GenesisData, ProposerData, PublicKeyHex, Slot,
    StandardBlockReward, SyncCommitteeReward, Validator, ValidatorData, SLOTS_PER_EPOCH,
};
use eth2::{Error, StatusCode};
use parking_lot::Mutex;
use std::collections::HashMap;

pub fn duty(slot: u64, pubkey: &str) -> ProposerData {
    ProposerData {
        pubkey: pubkey.into(),
        validator_index: 0,
        slot: Slot::new(slot),
    }
}

pub fn header(slot: Slot, proposer_index: u64) -> BeaconBlockHeader {
    BeaconBlockHeader {
        slot,
        proposer_index,
        parent_root: format!("0x{:064x}", slot.as_u64().saturating_sub(1)),
        state_root: format!("0x{:064x}", 0),
        body_root: format!("0x{:064x}", slot.as_u64()),
    }
}

#[derive(Default)]
struct State {
    duties: HashMap<Epoch, Vec<ProposerData>>,
    blocks: HashMap<Slot, BeaconBlockHeader>,
    finalized_slot: Option<Slot>,
    block_rewards: HashMap<Slot, StandardBlockReward>,
    sync_committees: HashMap<Epoch, Vec<u64>>,
    sync_committee_rewards: HashMap<Slot, Vec<SyncCommitteeReward>>,
    validators: Vec<(u64, PublicKeyHex)>,
    proposer_duties_requests: usize,
    fail_proposer_duties: bool,
}

/// A beacon node whose chain is whatever the test says it is.
///
/// Epochs without duties yield an empty listing, epochs without a sync committee an empty
/// committee. Nothing is finalized until `set_finalized_slot` is called.
#[derive(Default)]
pub struct MockBeaconNode {
    state: Mutex<State>,
}

impl MockBeaconNode {
    pub fn add_validator(&self, index: u64, pubkey: &str) {
        self.state.lock().validators.push((index, pubkey.into()));
    }

    pub fn set_duties(&self, epoch: Epoch, duties: Vec<ProposerData>) {
        self.state.lock().duties.insert(epoch, duties);
    }

    pub fn add_block(&self, slot: Slot, proposer_index: u64) {
        self.state
            .lock()
            .blocks
            .insert(slot, header(slot, proposer_index));
    }

    pub fn set_finalized_slot(&self, slot: Slot) {
        self.state.lock().finalized_slot = Some(slot);
    }

    pub fn set_block_reward(&self, slot: Slot, proposer_index: u64, total: u64) {
        self.state.lock().block_rewards.insert(
            slot,
            StandardBlockReward {
                proposer_index,
                total,
                attestations: total,
                sync_aggregate: 0,
                proposer_slashings: 0,
                attester_slashings: 0,
            },
        );
    }

    pub fn set_sync_committee(&self, epoch: Epoch, indices: Vec<u64>) {
        self.state.lock().sync_committees.insert(epoch, indices);
    }

    pub fn set_sync_committee_rewards(&self, slot: Slot, rewards: &[(u64, i64)]) {
        self.state.lock().sync_committee_rewards.insert(
            slot,
            rewards
                .iter()
                .map(|(validator_index, reward)| SyncCommitteeReward {
                    validator_index: *validator_index,
                    reward: *reward,
                })
                .collect(),
        );
    }

    /// Makes every subsequent proposer duties request fail with a server error.
    pub fn fail_proposer_duties(&self) {
        self.state.lock().fail_proposer_duties = true;
    }

    pub fn proposer_duties_requests(&self) -> usize {
        self.state.lock().proposer_duties_requests
    }
}

#[async_trait]
impl BeaconApi for MockBeaconNode {
    async fn genesis(&self) -> Result<GenesisData, Error> {
        Ok(GenesisData {
            genesis_time: 1_606_824_023,
            genesis_validators_root: format!("0x{:064x}", 0),
            genesis_fork_version: "0x00000000".into(),
        })
    }

    async fn proposer_duties(&self, epoch: Epoch) -> Result<Vec<ProposerData>, Error> {
        let mut state = self.state.lock();
        state.proposer_duties_requests += 1;

        if state.fail_proposer_duties {
            return Err(Error::StatusCode(StatusCode::INTERNAL_SERVER_ERROR));
        }

        Ok(state.duties.get(&epoch).cloned().unwrap_or_default())
    }

    async fn block_header(&self, block_id: BlockId) -> Result<Option<BeaconBlockHeader>, Error> {
        let state = self.state.lock();

        let header = match block_id {
            BlockId::Slot(slot) => state.blocks.get(&slot).cloned(),
            BlockId::Finalized => state.finalized_slot.map(|finalized_slot| {
                state
                    .blocks
                    .get(&finalized_slot)
                    .cloned()
                    .unwrap_or_else(|| header(finalized_slot, 0))
            }),
            BlockId::Head => state
                .blocks
                .iter()
                .max_by_key(|(slot, _)| **slot)
                .map(|(_, header)| header.clone()),
            BlockId::Genesis | BlockId::Justified => Some(header(Slot::new(0), 0)),
        };

        Ok(header)
    }

    async fn block_reward(&self, slot: Slot) -> Result<Option<StandardBlockReward>, Error> {
        Ok(self.state.lock().block_rewards.get(&slot).cloned())
    }

    async fn sync_committee(&self, epoch: Epoch) -> Result<Vec<u64>, Error> {
        Ok(self
            .state
            .lock()
            .sync_committees
            .get(&epoch)
            .cloned()
            .unwrap_or_default())
    }

    async fn sync_committee_rewards(
        &self,
        slot: Slot,
    ) -> Result<Option<Vec<SyncCommitteeReward>>, Error> {
        let state = self.state.lock();

        if let Some(rewards) = state.sync_committee_rewards.get(&slot) {
            Ok(Some(rewards.clone()))
        } else if state.blocks.contains_key(&slot) {
            Ok(Some(vec![]))
        } else {
            Ok(None)
        }
    }

    async fn validators(&self, pubkeys: &[PublicKeyHex]) -> Result<Vec<ValidatorData>, Error> {
        Ok(self
            .state
            .lock()
            .validators
            .iter()
            .filter(|(_, pubkey)| pubkeys.contains(pubkey))
            .map(|(index, pubkey)| ValidatorData {
                index: *index,
                balance: 32_000_000_000,
                status: "active_ongoing".into(),
                validator: Validator {
                    pubkey: pubkey.clone(),
                    effective_balance: 32_000_000_000,
                    slashed: false,
                },
            })
            .collect())
    }
}

/// Collects alerts rather than sending them.
#[derive(Default)]
pub struct RecordingAlert {
    messages: Mutex<Vec<String>>,
}

impl RecordingAlert {
    pub fn messages(&self) -> Vec<String> {
        self.messages.lock().clone()
    }
}

#[async_trait]
impl Alert for RecordingAlert {
    async fn send_message(&self, message: &str) -> Result<(), AlertError> {
        self.messages.lock().push(message.to_string());
        Ok(())
    }
}

pub fn epoch(slot: u64) -> Epoch {
    Slot::new(slot).epoch(SLOTS_PER_EPOCH)
}
