use crate::error::SessionError;
use crate::models::{CityInput, Slot, SlotPatch};

/// Ordered, append-only list of intermediate city slots
#[derive(Debug, Default)]
pub struct SlotRegistry {
    slots: Vec<Slot>,
}

impl SlotRegistry {
    /// Creates an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a slot with an empty name, temperature, and a one day horizon
    pub fn add_slot(&mut self) -> &Slot {
        let index = self.slots.len();
        self.slots.push(Slot {
            index,
            input: CityInput::default(),
        });
        tracing::debug!("Added intermediate slot {}", index);
        &self.slots[index]
    }

    /// Patches the slot at `index`, rejecting unknown indices
    pub fn update_slot(&mut self, index: usize, patch: SlotPatch) -> Result<&Slot, SessionError> {
        let slot = self
            .slots
            .get_mut(index)
            .ok_or(SessionError::UnknownSlot(index))?;

        slot.input.apply(patch);
        Ok(slot)
    }

    /// Slot at `index`, if it exists
    pub fn get(&self, index: usize) -> Option<&Slot> {
        self.slots.get(index)
    }

    /// Every slot in index order
    pub fn slots(&self) -> &[Slot] {
        &self.slots
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn clear(&mut self) {
        self.slots.clear();
    }
}
