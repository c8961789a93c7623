use crate::beacon::BeaconApi;
use crate::labels::LabelSet;
use crate::{Error, Watcher};
use eth2::types::{Epoch, EPOCHS_PER_SYNC_COMMITTEE_PERIOD};
use prometheus::IntGaugeVec;
use std::collections::HashMap;

impl<B: BeaconApi> Watcher<B> {
    /// Sets, for each label-set, the number of seats our validators hold in the sync committee
    /// of `epoch` and in the one of the following period.
    pub async fn process_sync_committee(&self, epoch: Epoch) -> Result<(), Error> {
        let per_validator = &self.metrics.per_validator;

        let (current_gauge, next_gauge) = match (
            per_validator.current_round_sync_committee.get(),
            per_validator.next_round_sync_committee.get(),
        ) {
            (Some(current), Some(next)) if !self.validators.labels().is_empty() => (current, next),
            _ => return Ok(()),
        };

        let current_members = self.beacon.sync_committee(epoch).await?;
        let next_members = self
            .beacon
            .sync_committee(epoch + EPOCHS_PER_SYNC_COMMITTEE_PERIOD)
            .await?;

        self.set_sync_committee_gauge(current_gauge, &current_members)?;
        self.set_sync_committee_gauge(next_gauge, &next_members)
    }

    /// Replaces the previous snapshot of `gauge`, label-sets without members are set to zero.
    fn set_sync_committee_gauge(&self, gauge: &IntGaugeVec, members: &[u64]) -> Result<(), Error> {
        let labels = self.validators.labels();

        let mut counts = labels
            .distinct_label_sets()
            .into_iter()
            .map(|label_set| (label_set, 0))
            .collect::<HashMap<&LabelSet, i64>>();

        // A validator holding several seats of a committee counts once per seat.
        for index in members {
            if let Some(label_set) = self.validators.labels_of_index(*index) {
                *counts.entry(label_set).or_default() += 1;
            }
        }

        for (label_set, count) in counts {
            gauge.get_metric_with(&label_set.as_map())?.set(count);
        }

        Ok(())
    }
}
