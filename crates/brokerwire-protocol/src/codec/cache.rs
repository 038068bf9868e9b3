//! Per-connection cached-object dictionary.
//!
//! Structures that repeat across many frames on one connection (connection,
//! session, consumer identifiers, destinations) are transmitted in full once
//! and referenced by a small integer slot afterwards, symmetrically on the
//! encoder and the decoder. Slots are assigned sequentially from 0, never
//! reused, and never valid across connections.

use std::collections::HashMap;

use brokerwire_core::error::{ErrorKind, Result};

use crate::command::Structure;

/// Bidirectional slot table scoped to one wire-format context.
///
/// The two directions of a connection grow independently: the encode side
/// assigns slots for outgoing structures, the decode side registers slots as
/// fresh entries arrive. The sequence of fresh-vs-cached decisions made by
/// the encoder, in encode order, exactly matches the allocate-vs-lookup
/// sequence on the decoder, which is what keeps both peers' slot numbering
/// convergent without ever transmitting slot numbers for fresh entries.
#[derive(Debug)]
pub struct ObjectCacheTable {
    /// Encode side: structure -> assigned slot, by value equality.
    marshal_slots: HashMap<Structure, u16>,
    /// Decode side: slot -> structure, indexed arena.
    unmarshal_slots: Vec<Structure>,
    /// Ceiling on encode-side assignments.
    capacity: usize,
}

impl ObjectCacheTable {
    /// Creates an empty table with the given encode-side slot ceiling.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            marshal_slots: HashMap::new(),
            unmarshal_slots: Vec::new(),
            capacity: capacity.min(u16::MAX as usize + 1),
        }
    }

    /// Encode side: returns the structure's slot, assigning the next
    /// sequential slot if it was not cached yet.
    ///
    /// Once the ceiling is reached, new structures are reported fresh on
    /// every occurrence without being stored; the decoder stays in sync
    /// because it registers exactly once per fresh flag.
    pub fn assign_if_absent(&mut self, structure: &Structure) -> (u16, bool) {
        if let Some(&slot) = self.marshal_slots.get(structure) {
            return (slot, false);
        }
        let next = self.marshal_slots.len();
        if next >= self.capacity {
            return (0, true);
        }
        let slot = next as u16;
        self.marshal_slots.insert(structure.clone(), slot);
        (slot, true)
    }

    /// Encode side: the slot previously assigned to the structure, if any.
    pub fn slot_of(&self, structure: &Structure) -> Option<u16> {
        self.marshal_slots.get(structure).copied()
    }

    /// Decode side: resolves a transmitted slot reference.
    ///
    /// A slot that was never assigned means the peers' cache state has
    /// diverged; the connection must be torn down.
    pub fn lookup(&self, slot: u16) -> Result<&Structure> {
        self.unmarshal_slots
            .get(slot as usize)
            .ok_or(ErrorKind::UnknownCacheSlot(slot))
    }

    /// Decode side: stores a freshly decoded structure at the next
    /// sequential slot, mirroring the encoder's assignment order.
    pub fn register_at_next_slot(&mut self, structure: Structure) -> u16 {
        let slot = self.unmarshal_slots.len().min(u16::MAX as usize) as u16;
        self.unmarshal_slots.push(structure);
        slot
    }

    /// Number of encode-side slots assigned so far.
    pub fn marshal_len(&self) -> usize {
        self.marshal_slots.len()
    }

    /// Number of decode-side slots registered so far.
    pub fn unmarshal_len(&self) -> usize {
        self.unmarshal_slots.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::ConnectionId;

    fn id(value: &str) -> Structure {
        Structure::ConnectionId(ConnectionId { value: value.into() })
    }

    #[test]
    fn test_slots_are_sequential_and_stable() {
        let mut table = ObjectCacheTable::with_capacity(16);
        assert_eq!(table.assign_if_absent(&id("a")), (0, true));
        assert_eq!(table.assign_if_absent(&id("b")), (1, true));
        // Value equality, not instance identity.
        assert_eq!(table.assign_if_absent(&id("a")), (0, false));
        assert_eq!(table.slot_of(&id("b")), Some(1));
        assert_eq!(table.marshal_len(), 2);
    }

    #[test]
    fn test_decode_side_mirrors_order() {
        let mut table = ObjectCacheTable::with_capacity(16);
        assert_eq!(table.register_at_next_slot(id("a")), 0);
        assert_eq!(table.register_at_next_slot(id("b")), 1);
        assert_eq!(table.lookup(0).unwrap(), &id("a"));
        assert_eq!(table.lookup(1).unwrap(), &id("b"));
        assert!(matches!(table.lookup(2), Err(ErrorKind::UnknownCacheSlot(2))));
    }

    #[test]
    fn test_ceiling_keeps_fresh_reporting() {
        let mut table = ObjectCacheTable::with_capacity(1);
        assert_eq!(table.assign_if_absent(&id("a")), (0, true));
        // Past the ceiling: fresh on every occurrence, never stored.
        assert_eq!(table.assign_if_absent(&id("b")), (0, true));
        assert_eq!(table.assign_if_absent(&id("b")), (0, true));
        assert_eq!(table.slot_of(&id("b")), None);
        // The cached entry keeps resolving.
        assert_eq!(table.assign_if_absent(&id("a")), (0, false));
    }
}
