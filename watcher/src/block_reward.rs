use crate::beacon::BeaconApi;
use crate::{Error, Watcher};
use eth2::types::Slot;
use slog::debug;

impl<B: BeaconApi> Watcher<B> {
    /// Credits the proposer of the block at `slot` with its block reward, in Gwei.
    pub async fn process_block_reward(&self, slot: Slot) -> Result<(), Error> {
        if !self.validators.has_indices() || self.validators.labels().is_empty() {
            return Ok(());
        }

        let reward = match self.beacon.block_reward(slot).await? {
            Some(reward) => reward,
            None => return Ok(()),
        };

        match self.validators.labels_of_index(reward.proposer_index) {
            Some(labels) => {
                if let Some(counter) = self.metrics.per_validator.block_reward.series(labels)? {
                    counter.inc_by(reward.total);
                }
            }
            None => debug!(
                self.log,
                "Block reward of a validator without labels";
                "slot" => slot,
                "proposer_index" => reward.proposer_index,
                "reward" => reward.total,
            ),
        }

        Ok(())
    }
}
