//! Arbitrary, operator-defined labels attached to each of our validators.
//!
//! Labels are loaded from a CSV file whose header row names the label keys. The
//! `validator_pubkey` column is mandatory and identifies the validator a row belongs to. Every
//! row shares the same key schema, which becomes the label schema of every per-validator metric.

use eth2::types::PublicKeyHex;
use std::collections::{BTreeSet, HashMap};
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

/// The column holding the public key of the validator a row belongs to.
pub const PUBKEY_COLUMN: &str = "validator_pubkey";

#[derive(Debug)]
pub enum LabelError {
    Io(std::io::Error),
    Csv(csv::Error),
    MissingPubkeyColumn,
    DuplicatePubkey(PublicKeyHex),
    /// A label-set does not share the key schema of the registry.
    InconsistentSchema {
        pubkey: PublicKeyHex,
        expected: Vec<String>,
        found: Vec<String>,
    },
}

impl From<std::io::Error> for LabelError {
    fn from(e: std::io::Error) -> Self {
        LabelError::Io(e)
    }
}

impl From<csv::Error> for LabelError {
    fn from(e: csv::Error) -> Self {
        LabelError::Csv(e)
    }
}

/// An ordered list of `key => value` labels.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LabelSet(Vec<(String, String)>);

impl LabelSet {
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(|(key, _)| key.as_str())
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, value)| value.as_str())
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// The labels in the form expected by `prometheus::MetricVec::get_metric_with`.
    pub fn as_map(&self) -> HashMap<&str, &str> {
        self.0
            .iter()
            .map(|(key, value)| (key.as_str(), value.as_str()))
            .collect()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for LabelSet {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .map(|(key, value)| (key.into(), value.into()))
                .collect(),
        )
    }
}

/// Maps each labelled validator to its label-set.
///
/// All label-sets share one key schema, this is checked on insertion.
#[derive(Debug, Clone, Default)]
pub struct LabelRegistry {
    labels: HashMap<PublicKeyHex, LabelSet>,
    schema: Option<Vec<String>>,
}

impl LabelRegistry {
    pub fn insert(&mut self, pubkey: PublicKeyHex, labels: LabelSet) -> Result<(), LabelError> {
        let mut found = labels.keys().map(String::from).collect::<Vec<_>>();
        found.sort_unstable();

        let expected = self.schema.get_or_insert_with(|| found.clone());
        if *expected != found {
            return Err(LabelError::InconsistentSchema {
                pubkey,
                expected: expected.clone(),
                found,
            });
        }

        if self.labels.contains_key(&pubkey) {
            return Err(LabelError::DuplicatePubkey(pubkey));
        }

        self.labels.insert(pubkey, labels);
        Ok(())
    }

    pub fn get(&self, pubkey: &PublicKeyHex) -> Option<&LabelSet> {
        self.labels.get(pubkey)
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    pub fn pubkeys(&self) -> impl Iterator<Item = &PublicKeyHex> {
        self.labels.keys()
    }

    /// The ordered label keys of one label-set, or `None` if the registry is empty.
    ///
    /// Since every label-set shares the same keys, any one of them is representative.
    pub fn label_names(&self) -> Option<Vec<&str>> {
        self.labels
            .values()
            .next()
            .map(|labels| labels.keys().collect())
    }

    /// Every label-set in use, without repetition, in a stable order.
    pub fn distinct_label_sets(&self) -> Vec<&LabelSet> {
        self.labels
            .values()
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }
}

/// Loads the label registry from the CSV file at `path`.
///
/// When `drop_pubkey_label` is `true` the `validator_pubkey` column identifies the row but is not
/// kept amongst its labels.
pub fn load_labels_from_file<P: AsRef<Path>>(
    path: P,
    drop_pubkey_label: bool,
) -> Result<LabelRegistry, LabelError> {
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_path(path)?;

    let headers = reader.headers()?.clone();
    let pubkey_position = headers
        .iter()
        .position(|header| header == PUBKEY_COLUMN)
        .ok_or(LabelError::MissingPubkeyColumn)?;

    let mut registry = LabelRegistry::default();

    for record in reader.records() {
        let record = record?;
        let pubkey = PublicKeyHex::from(&record[pubkey_position]);

        let labels = headers
            .iter()
            .zip(record.iter())
            .filter(|(key, _)| !(drop_pubkey_label && *key == PUBKEY_COLUMN))
            .collect::<LabelSet>();

        registry.insert(pubkey, labels)?;
    }

    Ok(registry)
}

/// Loads one public key per line from `path`, skipping blank lines and `#` comments.
pub fn load_pubkeys_from_file<P: AsRef<Path>>(path: P) -> Result<Vec<PublicKeyHex>, LabelError> {
    let reader = BufReader::new(File::open(path)?);
    let mut pubkeys = vec![];

    for line in reader.lines() {
        let line = line?;
        let line = line.trim();

        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        pubkeys.push(PublicKeyHex::from(line));
    }

    Ok(pubkeys)
}
