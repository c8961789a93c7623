//! Detection of missed block proposals, at the head of the chain and once finalized.
//!
//! The head check is immediate but may be overturned by a re-org, the finalized check is
//! definitive but lags by a couple of epochs.

use crate::beacon::BeaconApi;
use crate::duties::resolve_proposer;
use crate::{Error, Watcher};
use eth2::types::{BeaconBlockHeader, BlockId, ProposerData, Slot};
use slog::{info, warn};

impl<B: BeaconApi> Watcher<B> {
    /// Checks whether the block of `slot` was proposed, given `potential_block`, the block at
    /// `slot` as seen at the head (`None` if there is none).
    ///
    /// Returns `true` if the proposer of `slot` is one of ours.
    pub async fn process_missed_blocks_head(
        &self,
        slot: Slot,
        potential_block: Option<&BeaconBlockHeader>,
        duties: &[ProposerData],
    ) -> Result<bool, Error> {
        let proposer = resolve_proposer(duties, slot)?;
        let missed = potential_block.is_none();
        let is_ours = self.validators.is_ours(proposer);
        let epoch = slot.epoch(self.slots_per_epoch);

        match (missed, is_ours) {
            (true, true) => warn!(
                self.log,
                "Our validator missed a block at head";
                "slot" => slot,
                "epoch" => epoch,
                "proposer" => proposer.short(),
                "watched_keys" => self.validators.len(),
            ),
            (true, false) => info!(
                self.log,
                "Block missed at head";
                "slot" => slot,
                "epoch" => epoch,
                "proposer" => proposer.short(),
                "watched_keys" => self.validators.len(),
            ),
            (false, _) => info!(
                self.log,
                "Block proposed at head";
                "slot" => slot,
                "epoch" => epoch,
                "proposer" => proposer.short(),
                "ours" => is_ours,
                "watched_keys" => self.validators.len(),
            ),
        }

        if !is_ours {
            return Ok(false);
        }

        if missed {
            self.alert(&format!(
                "🔺 Our validator `{}` missed block at head at epoch `{}` - slot `{}` 🔺",
                proposer.short(),
                epoch,
                slot
            ))
            .await;

            let global = &self.metrics.global;
            global.missed_block_proposals_head.inc();
            global
                .missed_block_proposals_head_details
                .get_metric_with_label_values(&[&slot.to_string(), &epoch.to_string()])?
                .inc();
        }

        if let Some(labels) = self.validators.labels_of(proposer) {
            let per_validator = &self.metrics.per_validator;
            let family = if missed {
                &per_validator.missed_block_proposals_head
            } else {
                &per_validator.block_processed_head
            };

            if let Some(counter) = family.series(labels)? {
                counter.inc();
            }
        }

        Ok(true)
    }

    /// Checks every slot finalized since `last_processed_finalized_slot` for a proposal of ours
    /// that did not make it.
    ///
    /// Returns the finalized slot, the next value of the watermark.
    pub async fn process_missed_blocks_finalized(
        &mut self,
        last_processed_finalized_slot: Slot,
        slot: Slot,
    ) -> Result<Slot, Error> {
        if last_processed_finalized_slot > slot {
            return Err(Error::WatermarkAheadOfSlot {
                watermark: last_processed_finalized_slot,
                slot,
            });
        }

        let finalized_slot = match self.beacon.block_header(BlockId::Finalized).await? {
            Some(header) => header.slot,
            None => return Ok(last_processed_finalized_slot),
        };

        if finalized_slot < last_processed_finalized_slot {
            return Err(Error::FinalizedSlotRegressed {
                watermark: last_processed_finalized_slot,
                finalized: finalized_slot,
            });
        }

        for slot in (last_processed_finalized_slot.as_u64() + 1..=finalized_slot.as_u64())
            .map(Slot::new)
        {
            let epoch = slot.epoch(self.slots_per_epoch);
            let duties = self.duties_cache.get_or_fetch(&self.beacon, epoch).await?;
            let proposer = duties.proposer(slot)?;

            if !self.validators.is_ours(proposer) {
                continue;
            }

            let proposed = self
                .beacon
                .block_header(BlockId::Slot(slot))
                .await?
                .is_some();
            let labels = self.validators.labels_of(proposer);
            let per_validator = &self.metrics.per_validator;

            if proposed {
                if let Some(counter) = labels
                    .map(|labels| per_validator.block_processed_finalized.series(labels))
                    .transpose()?
                    .flatten()
                {
                    counter.inc();
                }
                continue;
            }

            warn!(
                self.log,
                "Our validator missed a block at finalized";
                "slot" => slot,
                "epoch" => epoch,
                "proposer" => proposer.short(),
            );

            self.alert(&format!(
                "❌ Our validator `{}` missed block at finalized at epoch `{}` - slot `{}` ❌",
                proposer.short(),
                epoch,
                slot
            ))
            .await;

            let global = &self.metrics.global;
            global.missed_block_proposals_finalized.inc();
            global
                .missed_block_proposals_finalized_details
                .get_metric_with_label_values(&[&slot.to_string(), &epoch.to_string()])?
                .inc();

            if let Some(counter) = labels
                .map(|labels| per_validator.missed_block_proposals_finalized.series(labels))
                .transpose()?
                .flatten()
            {
                counter.inc();
            }
        }

        Ok(finalized_slot)
    }
}
