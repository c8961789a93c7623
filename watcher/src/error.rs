use crate::labels::LabelError;
use crate::relays::RelayError;
use eth2::types::Slot;

#[derive(Debug)]
pub enum Error {
    /// The beacon node could not be reached or answered with an error.
    BeaconNode(eth2::Error),
    /// A relay could not be reached or answered with an error.
    Relay(RelayError),
    /// The proposer duties of an epoch do not list the given slot.
    NoProposerDuty { slot: Slot },
    /// A relay claims to have delivered more than one payload for a single slot.
    MultiplePayloads {
        relay: String,
        slot: Slot,
        count: usize,
    },
    /// The beacon node reports a finalized slot below one we already processed.
    FinalizedSlotRegressed { watermark: Slot, finalized: Slot },
    WatermarkAheadOfSlot { watermark: Slot, slot: Slot },
    Metrics(prometheus::Error),
    Labels(LabelError),
    Alert(String),
    Config(String),
    SlotClock(String),
    Server(warp::Error),
}

impl From<eth2::Error> for Error {
    fn from(e: eth2::Error) -> Self {
        Error::BeaconNode(e)
    }
}

impl From<RelayError> for Error {
    fn from(e: RelayError) -> Self {
        Error::Relay(e)
    }
}

impl From<prometheus::Error> for Error {
    fn from(e: prometheus::Error) -> Self {
        Error::Metrics(e)
    }
}

impl From<LabelError> for Error {
    fn from(e: LabelError) -> Self {
        Error::Labels(e)
    }
}

impl From<warp::Error> for Error {
    fn from(e: warp::Error) -> Self {
        Error::Server(e)
    }
}
