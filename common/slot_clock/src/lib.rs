mod manual_slot_clock;
mod system_time_slot_clock;

use std::time::Duration;

pub use crate::manual_slot_clock::ManualSlotClock;
pub use crate::manual_slot_clock::ManualSlotClock as TestingSlotClock;
pub use crate::system_time_slot_clock::SystemTimeSlotClock;
pub use eth2::types::Slot;

/// A clock that reports the current slot.
///
/// The clock is not required to be monotonically increasing and may go backwards.
pub trait SlotClock: Send + Sync + Sized + Clone {
    /// Creates a new slot clock where the first slot is `genesis_slot`, genesis occurred
    /// `genesis_duration` after the `UNIX_EPOCH` and each slot is `slot_duration` apart.
    fn new(genesis_slot: Slot, genesis_duration: Duration, slot_duration: Duration) -> Self;

    /// Returns the present time as a duration since the UNIX epoch.
    ///
    /// Returns `None` if the present time is before the UNIX epoch (unlikely).
    fn now_duration(&self) -> Option<Duration>;

    /// Returns the duration between slots
    fn slot_duration(&self) -> Duration;

    /// Returns the first slot to be returned at the genesis time.
    fn genesis_slot(&self) -> Slot;

    /// Returns the genesis time as a duration since the UNIX epoch.
    fn genesis_duration(&self) -> Duration;

    /// Returns the slot at this present time.
    fn now(&self) -> Option<Slot> {
        self.slot_of(self.now_duration()?)
    }

    /// Indicates if the current time is prior to genesis time.
    ///
    /// Returns `None` if the system clock cannot be read.
    fn is_prior_to_genesis(&self) -> Option<bool> {
        Some(self.now_duration()? < self.genesis_duration())
    }

    /// Returns the slot at this present time if genesis has happened. Otherwise, returns the
    /// genesis slot. Returns `None` if there is an error reading the clock.
    fn now_or_genesis(&self) -> Option<Slot> {
        if self.is_prior_to_genesis()? {
            Some(self.genesis_slot())
        } else {
            self.now()
        }
    }

    /// Returns the slot of the given duration since the UNIX epoch.
    fn slot_of(&self, now: Duration) -> Option<Slot> {
        let genesis = self.genesis_duration();

        if now >= genesis {
            let since_genesis = now.checked_sub(genesis)?;
            let slot = since_genesis
                .as_millis()
                .checked_div(self.slot_duration().as_millis())?;
            let slot = u64::try_from(slot).ok()?;
            Some(self.genesis_slot() + slot)
        } else {
            None
        }
    }

    /// Returns the start time of the slot, as a duration since `UNIX_EPOCH`.
    fn start_of(&self, slot: Slot) -> Option<Duration> {
        let slots_since_genesis = slot.as_u64().checked_sub(self.genesis_slot().as_u64())?;
        let slots_since_genesis = u32::try_from(slots_since_genesis).ok()?;
        self.genesis_duration()
            .checked_add(self.slot_duration().checked_mul(slots_since_genesis)?)
    }

    /// Returns the duration from now until `slot`.
    ///
    /// Returns `None` if `slot` has already started.
    fn duration_to_slot(&self, slot: Slot) -> Option<Duration> {
        self.start_of(slot)?.checked_sub(self.now_duration()?)
    }

    /// Returns the duration until the next slot.
    fn duration_to_next_slot(&self) -> Option<Duration> {
        let now = self.now_duration()?;
        let genesis = self.genesis_duration();

        if now < genesis {
            genesis.checked_sub(now)
        } else {
            let next_slot = self.slot_of(now)? + 1;
            self.start_of(next_slot)?.checked_sub(now)
        }
    }

    /// Returns the duration until the first slot of the next epoch.
    fn duration_to_next_epoch(&self, slots_per_epoch: u64) -> Option<Duration> {
        let now = self.now_duration()?;
        let genesis = self.genesis_duration();

        if now < genesis {
            return genesis.checked_sub(now);
        }

        let next_epoch_start = (self.slot_of(now)?.epoch(slots_per_epoch) + 1)
            .start_slot(slots_per_epoch);
        self.start_of(next_epoch_start)?.checked_sub(now)
    }
}
