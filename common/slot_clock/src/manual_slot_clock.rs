use super::{Slot, SlotClock};
use parking_lot::RwLock;
use std::sync::Arc;
use std::time::Duration;

/// Determines the present slot based upon a manually-incremented UNIX timestamp.
#[derive(Clone)]
pub struct ManualSlotClock {
    genesis_slot: Slot,
    /// Duration from UNIX epoch to genesis.
    genesis_duration: Duration,
    /// Duration from UNIX epoch to right now.
    current_time: Arc<RwLock<Duration>>,
    /// The length of each slot.
    slot_duration: Duration,
}

impl ManualSlotClock {
    pub fn set_slot(&self, slot: u64) {
        let slots_since_genesis: u32 = slot
            .checked_sub(self.genesis_slot.as_u64())
            .expect("slot must be post-genesis")
            .try_into()
            .expect("slot must fit within a u32");
        *self.current_time.write() = self.genesis_duration + self.slot_duration * slots_since_genesis;
    }

    pub fn set_current_time(&self, duration: Duration) {
        *self.current_time.write() = duration;
    }

    pub fn advance_time(&self, duration: Duration) {
        let current_time = *self.current_time.read();
        *self.current_time.write() = current_time + duration;
    }

    pub fn advance_slot(&self) {
        self.set_slot(self.now().expect("should be post-genesis").as_u64() + 1)
    }
}

impl SlotClock for ManualSlotClock {
    fn new(genesis_slot: Slot, genesis_duration: Duration, slot_duration: Duration) -> Self {
        if slot_duration.as_millis() == 0 {
            panic!("ManualSlotClock cannot have a < 1ms slot duration");
        }

        Self {
            genesis_slot,
            current_time: Arc::new(RwLock::new(genesis_duration)),
            genesis_duration,
            slot_duration,
        }
    }

    fn now_duration(&self) -> Option<Duration> {
        Some(*self.current_time.read())
    }

    fn slot_duration(&self) -> Duration {
        self.slot_duration
    }

    fn genesis_slot(&self) -> Slot {
        self.genesis_slot
    }

    fn genesis_duration(&self) -> Duration {
        self.genesis_duration
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slot_now() {
        let clock = ManualSlotClock::new(
            Slot::new(10),
            Duration::from_secs(0),
            Duration::from_secs(1),
        );
        assert_eq!(clock.now(), Some(Slot::new(10)));
        clock.set_slot(123);
        assert_eq!(clock.now(), Some(Slot::new(123)));
        clock.advance_slot();
        assert_eq!(clock.now(), Some(Slot::new(124)));
    }

    #[test]
    fn test_is_prior_to_genesis() {
        let clock = ManualSlotClock::new(
            Slot::new(0),
            Duration::from_secs(10),
            Duration::from_secs(1),
        );

        assert_eq!(clock.is_prior_to_genesis(), Some(false), "at genesis");
        clock.set_current_time(Duration::from_secs(9));
        assert_eq!(clock.is_prior_to_genesis(), Some(true), "prior to genesis");
        assert_eq!(clock.now(), None);
        assert_eq!(clock.now_or_genesis(), Some(Slot::new(0)));
        assert_eq!(clock.duration_to_next_slot(), Some(Duration::from_secs(1)));
    }

    #[test]
    fn start_of() {
        let clock = ManualSlotClock::new(
            Slot::new(0),
            Duration::from_secs(100),
            Duration::from_secs(12),
        );

        assert_eq!(clock.start_of(Slot::new(0)), Some(Duration::from_secs(100)));
        assert_eq!(clock.start_of(Slot::new(2)), Some(Duration::from_secs(124)));
        assert_eq!(clock.slot_of(Duration::from_secs(135)), Some(Slot::new(2)));
        assert_eq!(clock.slot_of(Duration::from_secs(99)), None);
    }

    #[test]
    fn durations_to_next_slot_and_epoch() {
        let clock = ManualSlotClock::new(
            Slot::new(0),
            Duration::from_secs(0),
            Duration::from_secs(12),
        );

        clock.set_current_time(Duration::from_secs(5));
        assert_eq!(clock.duration_to_next_slot(), Some(Duration::from_secs(7)));
        assert_eq!(
            clock.duration_to_next_epoch(32),
            Some(Duration::from_secs(32 * 12 - 5))
        );

        clock.set_slot(31);
        assert_eq!(clock.duration_to_next_epoch(32), Some(Duration::from_secs(12)));
        assert_eq!(clock.duration_to_slot(Slot::new(33)), Some(Duration::from_secs(24)));
        assert_eq!(clock.duration_to_slot(Slot::new(30)), None);
    }
}
