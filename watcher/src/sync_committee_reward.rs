use crate::beacon::BeaconApi;
use crate::{Error, Watcher};
use eth2::types::Slot;

impl<B: BeaconApi> Watcher<B> {
    /// Credits the sync committee members of ours with their reward for the block at `slot`.
    ///
    /// Rewards and penalties are accumulated apart, in two counters, since a counter never
    /// decreases.
    pub async fn process_sync_committee_reward(&self, slot: Slot) -> Result<(), Error> {
        if !self.validators.has_indices() || self.validators.labels().is_empty() {
            return Ok(());
        }

        let rewards = match self.beacon.sync_committee_rewards(slot).await? {
            Some(rewards) => rewards,
            None => return Ok(()),
        };

        let per_validator = &self.metrics.per_validator;

        for reward in rewards {
            let labels = match self.validators.labels_of_index(reward.validator_index) {
                Some(labels) => labels,
                None => continue,
            };

            let (family, amount) = if reward.reward >= 0 {
                (&per_validator.pos_sync_committee_reward, reward.reward.unsigned_abs())
            } else {
                (&per_validator.neg_sync_committee_reward, reward.reward.unsigned_abs())
            };

            if let Some(counter) = family.series(labels)? {
                counter.inc_by(amount);
            }
        }

        Ok(())
    }
}
