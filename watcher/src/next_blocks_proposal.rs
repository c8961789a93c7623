use crate::beacon::BeaconApi;
use crate::{Error, Watcher};
use eth2::types::{ProposerData, Slot};
use slog::{info, warn};

impl<B: BeaconApi> Watcher<B> {
    /// Counts the proposals of ours scheduled at or after `slot`, over the duties of the current
    /// and next epochs.
    ///
    /// On a new epoch each upcoming proposal is logged, and our proposers of the current epoch
    /// registered with no MEV relay are reported.
    ///
    /// Returns the number of upcoming proposals.
    pub async fn process_future_block_proposals(
        &self,
        slot: Slot,
        is_new_epoch: bool,
        current_epoch_duties: &[ProposerData],
        next_epoch_duties: &[ProposerData],
    ) -> Result<usize, Error> {
        let mut upcoming = current_epoch_duties
            .iter()
            .chain(next_epoch_duties)
            .filter(|duty| duty.slot >= slot && self.validators.is_ours(&duty.pubkey))
            .collect::<Vec<_>>();
        upcoming.sort_by_key(|duty| duty.slot);

        self.metrics
            .global
            .future_block_proposals
            .set(upcoming.len() as i64);

        if !is_new_epoch {
            return Ok(upcoming.len());
        }

        for duty in &upcoming {
            info!(
                self.log,
                "Our validator is going to propose a block";
                "slot" => duty.slot,
                "in_slots" => duty.slot - slot,
                "proposer" => duty.pubkey.short(),
            );
        }

        if !upcoming.is_empty() && !self.validators.labels().is_empty() {
            self.process_relay_registrations(slot, current_epoch_duties)
                .await?;
        }

        Ok(upcoming.len())
    }

    /// Warns about, and counts, the proposals of ours in `current_epoch_duties` whose proposer
    /// registered with none of the relays.
    async fn process_relay_registrations(
        &self,
        slot: Slot,
        current_epoch_duties: &[ProposerData],
    ) -> Result<(), Error> {
        let ours = current_epoch_duties
            .iter()
            .filter(|duty| self.validators.is_ours(&duty.pubkey))
            .collect::<Vec<_>>();

        if ours.is_empty() {
            return Ok(());
        }

        let family = &self.metrics.per_validator.future_block_proposals_without_mev_relay;

        for duty in self.relays.duties_without_registration(&ours).await? {
            warn!(
                self.log,
                "Our validator is going to propose a block without MEV relay registration";
                "slot" => duty.slot,
                "in_slots" => duty.slot.as_u64() as i64 - slot.as_u64() as i64,
                "proposer" => duty.pubkey.short(),
            );

            if let Some(labels) = self.validators.labels_of(&duty.pubkey) {
                if let Some(counter) = family.series(labels)? {
                    counter.inc();
                }
            }
        }

        Ok(())
    }
}
