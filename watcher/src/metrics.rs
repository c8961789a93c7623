//! Metrics exposed by the watcher.
//!
//! Global metrics have a fixed schema and are registered up front. Per-validator metrics are
//! labelled with the operator's label-sets, whose keys are only known once a label registry has
//! been loaded: they live in a [`PerValidatorFamily`] until then.

use crate::labels::{LabelRegistry, LabelSet};
use prometheus::core::Collector;
use prometheus::{
    Counter, CounterVec, Encoder, IntCounter, IntCounterVec, IntGauge, IntGaugeVec, Opts,
    Registry, Result, TextEncoder,
};
use std::collections::HashMap;

/// The label carrying the name of the relay a MEV reward was paid through.
pub const RELAY_KEY: &str = "mev_relay";

pub const SLOT_KEY: &str = "slot";
pub const EPOCH_KEY: &str = "epoch";

/// Attempts to create an `IntCounter` and register it with `registry`.
pub fn try_create_int_counter(registry: &Registry, name: &str, help: &str) -> Result<IntCounter> {
    let counter = IntCounter::new(name, help)?;
    registry.register(Box::new(counter.clone()))?;
    Ok(counter)
}

/// Attempts to create an `IntCounterVec` and register it with `registry`.
pub fn try_create_int_counter_vec(
    registry: &Registry,
    name: &str,
    help: &str,
    label_names: &[&str],
) -> Result<IntCounterVec> {
    let counter_vec = IntCounterVec::new(Opts::new(name, help), label_names)?;
    registry.register(Box::new(counter_vec.clone()))?;
    Ok(counter_vec)
}

/// Attempts to create an `IntGauge` and register it with `registry`.
pub fn try_create_int_gauge(registry: &Registry, name: &str, help: &str) -> Result<IntGauge> {
    let gauge = IntGauge::new(name, help)?;
    registry.register(Box::new(gauge.clone()))?;
    Ok(gauge)
}

/// Encodes every metric of `registry` in the Prometheus text format.
pub fn gather(registry: &Registry) -> std::result::Result<String, String> {
    let mut buffer = vec![];
    let encoder = TextEncoder::new();

    encoder
        .encode(&registry.gather(), &mut buffer)
        .map_err(|e| format!("Unable to encode metrics: {:?}", e))?;

    String::from_utf8(buffer).map_err(|e| format!("Metrics are not valid UTF-8: {:?}", e))
}

/// A labelled Prometheus metric family, such as an `IntCounterVec`.
pub trait LabelledFamily: Collector + Clone + Sized + 'static {
    type Metric;

    fn create(name: &str, help: &str, label_names: &[&str]) -> Result<Self>;

    /// Returns the series identified by `labels`, creating it if need be.
    fn series(&self, labels: &HashMap<&str, &str>) -> Result<Self::Metric>;
}

macro_rules! impl_labelled_family {
    ($family: ty, $metric: ty) => {
        impl LabelledFamily for $family {
            type Metric = $metric;

            fn create(name: &str, help: &str, label_names: &[&str]) -> Result<Self> {
                <$family>::new(Opts::new(name, help), label_names)
            }

            fn series(&self, labels: &HashMap<&str, &str>) -> Result<Self::Metric> {
                self.get_metric_with(labels)
            }
        }
    };
}

impl_labelled_family!(IntCounterVec, IntCounter);
impl_labelled_family!(CounterVec, Counter);
impl_labelled_family!(IntGaugeVec, IntGauge);

/// An additional label appended to the operator's labels, along with every value it may take.
#[derive(Debug, Clone)]
pub struct ExtraDimension {
    pub key: &'static str,
    pub values: Vec<String>,
}

/// A per-validator metric family whose label schema is derived from the label registry.
///
/// The family is neither created nor registered until [`Self::init`] is called with a non-empty
/// registry. At that point one series per label-set (times each extra value) is created, so that
/// every series is exported, at zero, before it is first incremented.
pub struct PerValidatorFamily<T> {
    name: &'static str,
    help: &'static str,
    extra: Option<ExtraDimension>,
    inner: Option<T>,
}

impl<T: LabelledFamily> PerValidatorFamily<T> {
    pub fn new(name: &'static str, help: &'static str) -> Self {
        Self {
            name,
            help,
            extra: None,
            inner: None,
        }
    }

    pub fn with_extra_dimension(mut self, key: &'static str, values: Vec<String>) -> Self {
        self.extra = Some(ExtraDimension { key, values });
        self
    }

    pub fn is_initialized(&self) -> bool {
        self.inner.is_some()
    }

    pub fn get(&self) -> Option<&T> {
        self.inner.as_ref()
    }

    /// Creates and registers the family. A no-op if already initialized or if `labels` is empty.
    pub fn init(&mut self, registry: &Registry, labels: &LabelRegistry) -> Result<()> {
        if self.inner.is_some() {
            return Ok(());
        }

        let mut label_names = match labels.label_names() {
            Some(label_names) => label_names,
            None => return Ok(()),
        };

        if let Some(extra) = &self.extra {
            label_names.push(extra.key);
        }

        let family = T::create(self.name, self.help, &label_names)?;
        registry.register(Box::new(family.clone()))?;

        for label_set in labels.distinct_label_sets() {
            let mut series_labels = label_set.as_map();

            match &self.extra {
                Some(extra) => {
                    for value in &extra.values {
                        series_labels.insert(extra.key, value.as_str());
                        family.series(&series_labels)?;
                    }
                }
                None => {
                    family.series(&series_labels)?;
                }
            }
        }

        self.inner = Some(family);
        Ok(())
    }

    /// The series of `labels`, or `None` if the family is not initialized yet.
    pub fn series(&self, labels: &LabelSet) -> Result<Option<T::Metric>> {
        self.inner
            .as_ref()
            .map(|family| family.series(&labels.as_map()))
            .transpose()
    }

    /// The series of `labels` with the extra dimension set to `extra_value`.
    pub fn series_with_extra(
        &self,
        labels: &LabelSet,
        extra_value: &str,
    ) -> Result<Option<T::Metric>> {
        let (family, extra) = match (&self.inner, &self.extra) {
            (Some(family), Some(extra)) => (family, extra),
            (Some(family), None) => return family.series(&labels.as_map()).map(Some),
            (None, _) => return Ok(None),
        };

        let mut series_labels = labels.as_map();
        series_labels.insert(extra.key, extra_value);
        family.series(&series_labels).map(Some)
    }
}

/// Metrics whose schema does not depend on the label registry.
pub struct GlobalMetrics {
    pub missed_block_proposals_head: IntCounter,
    pub missed_block_proposals_head_details: IntCounterVec,
    pub missed_block_proposals_finalized: IntCounter,
    pub missed_block_proposals_finalized_details: IntCounterVec,
    pub bad_relay: IntCounter,
    pub future_block_proposals: IntGauge,
}

impl GlobalMetrics {
    pub fn new(registry: &Registry) -> Result<Self> {
        Ok(Self {
            missed_block_proposals_head: try_create_int_counter(
                registry,
                "missed_block_proposals_head_count",
                "Missed block proposals head count",
            )?,
            missed_block_proposals_head_details: try_create_int_counter_vec(
                registry,
                "missed_block_proposals_head_count_details",
                "Missed block proposals head count details",
                &[SLOT_KEY, EPOCH_KEY],
            )?,
            missed_block_proposals_finalized: try_create_int_counter(
                registry,
                "missed_block_proposals_finalized_count",
                "Missed block proposals finalized count",
            )?,
            missed_block_proposals_finalized_details: try_create_int_counter_vec(
                registry,
                "missed_block_proposals_finalized_count_details",
                "Missed block proposals finalized count details",
                &[SLOT_KEY, EPOCH_KEY],
            )?,
            bad_relay: try_create_int_counter(registry, "bad_relay_count", "Bad relay count")?,
            future_block_proposals: try_create_int_gauge(
                registry,
                "future_block_proposals_count",
                "Future block proposals count",
            )?,
        })
    }
}

/// Metrics labelled with the label-set of the validator they relate to.
pub struct PerValidatorMetrics {
    pub block_processed_head: PerValidatorFamily<IntCounterVec>,
    pub block_processed_finalized: PerValidatorFamily<IntCounterVec>,
    pub missed_block_proposals_head: PerValidatorFamily<IntCounterVec>,
    pub missed_block_proposals_finalized: PerValidatorFamily<IntCounterVec>,
    pub block_reward: PerValidatorFamily<IntCounterVec>,
    pub pos_sync_committee_reward: PerValidatorFamily<IntCounterVec>,
    pub neg_sync_committee_reward: PerValidatorFamily<IntCounterVec>,
    pub mev_boost_reward: PerValidatorFamily<CounterVec>,
    pub current_round_sync_committee: PerValidatorFamily<IntGaugeVec>,
    pub next_round_sync_committee: PerValidatorFamily<IntGaugeVec>,
    pub future_block_proposals_without_mev_relay: PerValidatorFamily<IntCounterVec>,
}

impl PerValidatorMetrics {
    /// `relay_names` are the values the `mev_relay` label of MEV rewards may take.
    pub fn new(relay_names: Vec<String>) -> Self {
        Self {
            block_processed_head: PerValidatorFamily::new(
                "our_block_processed_head_per_validator_count",
                "Our processed block proposals per validator (head)",
            ),
            block_processed_finalized: PerValidatorFamily::new(
                "our_block_processed_finalized_per_validator_count",
                "Our processed block proposals per validator (finalized)",
            ),
            missed_block_proposals_head: PerValidatorFamily::new(
                "our_missed_block_proposals_head_per_validator_count",
                "Our missed block proposals per validator (head)",
            ),
            missed_block_proposals_finalized: PerValidatorFamily::new(
                "our_missed_block_proposals_finalized_per_validator_count",
                "Our missed block proposals per validator (finalized)",
            ),
            block_reward: PerValidatorFamily::new(
                "our_block_reward_per_validator_count",
                "Our block reward per validator counter",
            ),
            pos_sync_committee_reward: PerValidatorFamily::new(
                "our_pos_sync_committee_reward_per_validator_count",
                "Our positive sync committee reward per validator counter",
            ),
            neg_sync_committee_reward: PerValidatorFamily::new(
                "our_neg_sync_committee_reward_per_validator_count",
                "Our negative sync committee reward per validator counter",
            ),
            mev_boost_reward: PerValidatorFamily::new(
                "our_mev_boost_reward_per_validator_count",
                "Our MEV boost reward per validator counter",
            )
            .with_extra_dimension(RELAY_KEY, relay_names),
            current_round_sync_committee: PerValidatorFamily::new(
                "current_round_sync_committee_per_validator_count",
                "Validators in sync committee in current round",
            ),
            next_round_sync_committee: PerValidatorFamily::new(
                "next_round_sync_committee_per_validator_count",
                "Validators in sync committee in next round",
            ),
            future_block_proposals_without_mev_relay: PerValidatorFamily::new(
                "future_block_proposals_without_mev_relay_per_validator_count",
                "Future block proposals without MEV relay registration per validator counter",
            ),
        }
    }

    /// Initializes every family that is not initialized yet.
    pub fn init(&mut self, registry: &Registry, labels: &LabelRegistry) -> Result<()> {
        self.block_processed_head.init(registry, labels)?;
        self.block_processed_finalized.init(registry, labels)?;
        self.missed_block_proposals_head.init(registry, labels)?;
        self.missed_block_proposals_finalized.init(registry, labels)?;
        self.block_reward.init(registry, labels)?;
        self.pos_sync_committee_reward.init(registry, labels)?;
        self.neg_sync_committee_reward.init(registry, labels)?;
        self.mev_boost_reward.init(registry, labels)?;
        self.current_round_sync_committee.init(registry, labels)?;
        self.next_round_sync_committee.init(registry, labels)?;
        self.future_block_proposals_without_mev_relay
            .init(registry, labels)?;
        Ok(())
    }
}

/// Every metric of the watcher, along with the registry they are exposed through.
pub struct Metrics {
    pub registry: Registry,
    pub global: GlobalMetrics,
    pub per_validator: PerValidatorMetrics,
}

impl Metrics {
    pub fn new(registry: Registry, relay_names: Vec<String>) -> Result<Self> {
        Ok(Self {
            global: GlobalMetrics::new(&registry)?,
            per_validator: PerValidatorMetrics::new(relay_names),
            registry,
        })
    }

    pub fn init_per_validator(&mut self, labels: &LabelRegistry) -> Result<()> {
        self.per_validator.init(&self.registry, labels)
    }
}

#[cfg(test)]
pub mod tests {
    use super::*;

    /// Returns the value of the sample of `name` whose labels include every pair of `labels`.
    pub fn sample_value(registry: &Registry, name: &str, labels: &[(&str, &str)]) -> Option<f64> {
        let family = registry
            .gather()
            .into_iter()
            .find(|family| family.get_name() == name)?;

        family
            .get_metric()
            .iter()
            .find(|metric| {
                labels.iter().all(|(key, value)| {
                    metric
                        .get_label()
                        .iter()
                        .any(|pair| pair.get_name() == *key && pair.get_value() == *value)
                })
            })
            .map(|metric| {
                if metric.has_counter() {
                    metric.get_counter().get_value()
                } else {
                    metric.get_gauge().get_value()
                }
            })
    }

    /// The number of series exported for `name`.
    pub fn series_count(registry: &Registry, name: &str) -> usize {
        registry
            .gather()
            .into_iter()
            .find(|family| family.get_name() == name)
            .map_or(0, |family| family.get_metric().len())
    }

    fn registry_of(rows: &[(&str, &str)]) -> LabelRegistry {
        let mut labels = LabelRegistry::default();
        for (pubkey, machine) in rows {
            labels
                .insert((*pubkey).into(), LabelSet::from_iter([("machine", *machine)]))
                .unwrap();
        }
        labels
    }

    #[test]
    fn uninitialized_family_is_not_exported() {
        let registry = Registry::new();
        let mut family =
            PerValidatorFamily::<IntCounterVec>::new("some_per_validator_count", "Some help");

        family
            .init(&registry, &LabelRegistry::default())
            .unwrap();

        assert!(!family.is_initialized());
        assert_eq!(series_count(&registry, "some_per_validator_count"), 0);
        assert!(family
            .series(&LabelSet::from_iter([("machine", "ma")]))
            .unwrap()
            .is_none());
    }

    #[test]
    fn init_preregisters_every_label_set() {
        let registry = Registry::new();
        let labels = registry_of(&[("0xaaaa", "ma"), ("0xbbbb", "mb"), ("0xcccc", "mb")]);
        let mut family =
            PerValidatorFamily::<IntCounterVec>::new("some_per_validator_count", "Some help");

        family.init(&registry, &labels).unwrap();

        assert!(family.is_initialized());
        assert_eq!(series_count(&registry, "some_per_validator_count"), 2);
        assert_eq!(
            sample_value(&registry, "some_per_validator_count", &[("machine", "mb")]),
            Some(0.0)
        );
    }

    #[test]
    fn init_is_idempotent() {
        let registry = Registry::new();
        let labels = registry_of(&[("0xaaaa", "ma")]);
        let mut family =
            PerValidatorFamily::<IntCounterVec>::new("some_per_validator_count", "Some help");

        family.init(&registry, &labels).unwrap();
        family
            .series(&LabelSet::from_iter([("machine", "ma")]))
            .unwrap()
            .unwrap()
            .inc_by(3);

        // Registering the family a second time would fail with `AlreadyReg`.
        family
            .init(&registry, &registry_of(&[("0xbbbb", "mb")]))
            .unwrap();

        assert_eq!(series_count(&registry, "some_per_validator_count"), 1);
        assert_eq!(
            sample_value(&registry, "some_per_validator_count", &[("machine", "ma")]),
            Some(3.0)
        );
    }

    #[test]
    fn init_crosses_extra_dimension() {
        let registry = Registry::new();
        let labels = registry_of(&[("0xaaaa", "ma"), ("0xbbbb", "mb")]);
        let mut family = PerValidatorFamily::<CounterVec>::new("some_reward_count", "Some help")
            .with_extra_dimension(RELAY_KEY, vec!["relay-1".into(), "relay-2".into()]);

        family.init(&registry, &labels).unwrap();
        assert_eq!(series_count(&registry, "some_reward_count"), 4);

        family
            .series_with_extra(&LabelSet::from_iter([("machine", "mb")]), "relay-2")
            .unwrap()
            .unwrap()
            .inc_by(0.5);

        assert_eq!(
            sample_value(
                &registry,
                "some_reward_count",
                &[("machine", "mb"), (RELAY_KEY, "relay-2")]
            ),
            Some(0.5)
        );
        assert_eq!(
            sample_value(
                &registry,
                "some_reward_count",
                &[("machine", "mb"), (RELAY_KEY, "relay-1")]
            ),
            Some(0.0)
        );
    }

    #[test]
    fn gather_global_metrics() {
        let registry = Registry::new();
        let metrics = Metrics::new(registry.clone(), vec![]).unwrap();
        metrics.global.bad_relay.inc();

        let text = gather(&registry).unwrap();
        assert!(text.contains("bad_relay_count 1"));
        assert!(text.contains("future_block_proposals_count 0"));
    }
}
