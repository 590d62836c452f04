//! Small recyclable numeric ids for languages.
//!
//! Every live [`Language`](crate::Language) owns one slot. Dropping the last
//! handle of a language returns its slot to a free list so the numbers stay
//! small and dense for tables indexed by language id.

use parking_lot::{const_mutex, Mutex};

struct SlotRegistry {
    next: u32,
    free: Vec<u32>,
}

impl SlotRegistry {
    const fn new() -> Self {
        SlotRegistry {
            next: 0,
            free: Vec::new(),
        }
    }

    fn take(&mut self) -> u32 {
        if let Some(id) = self.free.pop() {
            return id;
        }
        let id = self.next;
        self.next += 1;
        id
    }

    fn give(&mut self, id: u32) {
        self.free.push(id);
    }
}

static REGISTRY: Mutex<SlotRegistry> = const_mutex(SlotRegistry::new());

/// An owned language slot, released on drop.
#[derive(Debug)]
pub(crate) struct LanguageSlot(u32);

impl LanguageSlot {
    pub(crate) fn acquire() -> Self {
        LanguageSlot(REGISTRY.lock().take())
    }

    #[inline]
    pub(crate) fn get(&self) -> u32 {
        self.0
    }
}

impl Drop for LanguageSlot {
    fn drop(&mut self) {
        REGISTRY.lock().give(self.0);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registry_reuses_released_ids() {
        let mut registry = SlotRegistry::new();
        assert_eq!(registry.take(), 0);
        assert_eq!(registry.take(), 1);
        registry.give(0);
        assert_eq!(registry.take(), 0);
        assert_eq!(registry.take(), 2);
    }

    #[test]
    fn live_slots_are_distinct() {
        let a = LanguageSlot::acquire();
        let b = LanguageSlot::acquire();
        assert_ne!(a.get(), b.get());
    }
}
