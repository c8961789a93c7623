use crate::alert::Alert;
use crate::beacon::BeaconApi;
use crate::duties::ProposerDutiesCache;
use crate::metrics::Metrics;
use crate::relays::Relays;
use crate::validators::OurValidators;
use crate::Error;
use eth2::types::{BlockId, Epoch, Slot};
use prometheus::Registry;
use slog::{debug, info, warn, Logger};

/// Everything the watcher knows and tracks.
///
/// The processing steps are implemented on this struct across several modules, each taking the
/// state it needs from here. A single task drives it, one slot at a time.
pub struct Watcher<B> {
    pub(crate) beacon: B,
    pub(crate) slots_per_epoch: u64,
    pub(crate) validators: OurValidators,
    pub(crate) metrics: Metrics,
    pub(crate) relays: Relays,
    pub(crate) alert: Option<Box<dyn Alert>>,
    pub(crate) duties_cache: ProposerDutiesCache,
    /// The highest finalized slot whose proposal has been checked. Never decreases.
    ///
    /// `None` until the beacon node first reports a finalized block: the slots finalized before
    /// that are never checked.
    pub(crate) last_processed_finalized_slot: Option<Slot>,
    last_processed_epoch: Option<Epoch>,
    pub(crate) log: Logger,
}

impl<B: BeaconApi> Watcher<B> {
    pub fn new(
        beacon: B,
        validators: OurValidators,
        relays: Relays,
        alert: Option<Box<dyn Alert>>,
        registry: Registry,
        slots_per_epoch: u64,
        log: Logger,
    ) -> Result<Self, Error> {
        let metrics = Metrics::new(registry, relays.names())?;

        Ok(Self {
            beacon,
            slots_per_epoch,
            validators,
            metrics,
            relays,
            alert,
            duties_cache: ProposerDutiesCache::default(),
            last_processed_finalized_slot: None,
            last_processed_epoch: None,
            log,
        })
    }

    pub fn last_processed_finalized_slot(&self) -> Option<Slot> {
        self.last_processed_finalized_slot
    }

    pub fn metrics(&self) -> &Metrics {
        &self.metrics
    }

    /// Resumes from the current finalized slot: nothing finalized before start-up is checked.
    pub async fn initialize(&mut self) -> Result<(), Error> {
        self.last_processed_finalized_slot = self.finalized_slot().await?;

        info!(
            self.log,
            "Watcher initialized";
            "finalized_slot" => self.last_processed_finalized_slot,
            "watched_keys" => self.validators.len(),
            "labelled_keys" => self.validators.labels().len(),
            "relays" => self.relays.names().len(),
        );

        Ok(())
    }

    /// Runs every check of `slot`, starting with the once-per-epoch ones when `slot` is the
    /// first slot of an epoch not processed yet.
    pub async fn process_slot(&mut self, slot: Slot) -> Result<(), Error> {
        let epoch = slot.epoch(self.slots_per_epoch);

        let is_new_epoch = self.last_processed_epoch != Some(epoch);

        if is_new_epoch {
            self.process_epoch(epoch).await?;
            self.last_processed_epoch = Some(epoch);
        }

        let current_duties = self.beacon.proposer_duties(epoch).await?;
        let next_duties = self.beacon.proposer_duties(epoch + 1).await?;

        let potential_block = self.beacon.block_header(BlockId::Slot(slot)).await?;
        let is_ours = self
            .process_missed_blocks_head(slot, potential_block.as_ref(), &current_duties)
            .await?;

        if is_ours && potential_block.is_some() {
            self.process_block_reward(slot).await?;
            self.relays
                .process(slot, &self.validators, &self.metrics, &self.log)
                .await?;
        }

        self.process_sync_committee_reward(slot).await?;
        self.process_future_block_proposals(slot, is_new_epoch, &current_duties, &next_duties)
            .await?;

        let watermark = self.last_processed_finalized_slot;
        self.last_processed_finalized_slot = match watermark {
            Some(watermark) => Some(self.process_missed_blocks_finalized(watermark, slot).await?),
            None => {
                let finalized_slot = self.finalized_slot().await?;
                if let Some(finalized_slot) = finalized_slot {
                    info!(
                        self.log,
                        "Finalized slot known";
                        "finalized_slot" => finalized_slot,
                    );
                }
                finalized_slot
            }
        };

        Ok(())
    }

    async fn finalized_slot(&self) -> Result<Option<Slot>, Error> {
        Ok(self
            .beacon
            .block_header(BlockId::Finalized)
            .await?
            .map(|header| header.slot))
    }

    /// Refreshes what only changes once per epoch: validator indices, the metric schema and the
    /// sync committee membership.
    pub async fn process_epoch(&mut self, epoch: Epoch) -> Result<(), Error> {
        let known = self.validators.refresh_indices(&self.beacon).await?;

        debug!(
            self.log,
            "Refreshed validator indices";
            "epoch" => epoch,
            "known_to_chain" => known,
            "watched_keys" => self.validators.len(),
        );

        self.metrics.init_per_validator(self.validators.labels())?;
        self.process_sync_committee(epoch).await
    }

    /// Sends `message` to the alert sink, if any. Delivery failures are logged only.
    pub(crate) async fn alert(&self, message: &str) {
        if let Some(alert) = &self.alert {
            if let Err(e) = alert.send_message(message).await {
                warn!(
                    self.log,
                    "Unable to send alert";
                    "error" => %e,
                    "message" => message,
                );
            }
        }
    }
}
