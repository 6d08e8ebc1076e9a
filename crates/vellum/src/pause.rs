//! # Pause — The Modal Gate
//!
//! One integer level decides which entities update: an entity updates while
//! its `update_when_paused` is at least the current level, so level 0 runs
//! everything. A modal raises the level on open and exempts its own entity at
//! the new level; on close it puts the previous level back.
//!
//! ```text
//!   level 0 ─ raise(menu) ─► 1 ─ raise(confirm) ─► 2 ─ restore(confirm) ─► 1 ─ restore(menu) ─► 0
//! ```
//!
//! A restore only applies while the level is still the one its record set.
//! When modals close out of order, the restore of the outer one is skipped
//! (and logged) and the inner one's restore then puts back the outer's raised
//! level: the level stays raised until something lowers it. This is a known
//! limitation of last-opened-first-closed by convention; it is reported,
//! not repaired.

use std::cell::RefCell;
use std::rc::Rc;

use crate::entity::EntityId;

/// Who changed the level, from what, to what.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PauseRecord {
    pub owner: EntityId,
    pub previous: u32,
    pub set_to: u32,
}

#[derive(Debug, Default)]
struct PauseState {
    level: u32,
    records: Vec<PauseRecord>,
}

/// Shared handle to the pause level. Clones see the same level.
#[derive(Debug, Clone, Default)]
pub struct PauseLevel {
    state: Rc<RefCell<PauseState>>,
}

impl PauseLevel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn level(&self) -> u32 {
        self.state.borrow().level
    }

    /// Open records, oldest first.
    pub fn records(&self) -> Vec<PauseRecord> {
        self.state.borrow().records.clone()
    }

    /// Raise to `target`, or one above the current level. A target that does
    /// not exceed the current level is logged and applied anyway.
    pub fn raise(&self, owner: EntityId, target: Option<u32>) -> PauseRecord {
        let mut state = self.state.borrow_mut();
        let previous = state.level;
        let set_to = match target {
            Some(target) => {
                if target <= previous {
                    log::warn!(
                        "Pause: {owner} requested level {target}, not above current level {previous}"
                    );
                }
                target
            }
            None => previous + 1,
        };
        let record = PauseRecord {
            owner,
            previous,
            set_to,
        };
        state.level = set_to;
        state.records.push(record);
        log::debug!("Pause: {owner} raised level {previous} -> {set_to}");
        record
    }

    /// Put back `record.previous` if the level is still `record.set_to`.
    /// Returns whether the level changed hands.
    pub fn restore(&self, record: PauseRecord) -> bool {
        let mut state = self.state.borrow_mut();
        if let Some(index) = state.records.iter().rposition(|r| *r == record) {
            state.records.remove(index);
        }
        if state.level != record.set_to {
            log::warn!(
                "Pause: {} skipped restoring level {}: level is {}, not the {} it set",
                record.owner,
                record.previous,
                state.level,
                record.set_to
            );
            return false;
        }
        state.level = record.previous;
        log::debug!(
            "Pause: {} restored level {} -> {}",
            record.owner,
            record.set_to,
            record.previous
        );
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_log;

    #[test]
    fn raise_and_restore_in_order() {
        let pause = PauseLevel::new();
        let a = pause.raise(EntityId(1), None);
        let b = pause.raise(EntityId(2), None);
        assert_eq!(pause.level(), 2);
        assert_eq!(pause.records(), vec![a, b]);
        assert!(pause.restore(b));
        assert!(pause.restore(a));
        assert_eq!(pause.level(), 0);
        assert!(pause.records().is_empty());
    }

    #[test]
    fn low_target_is_logged_and_applied() {
        test_log::capture();
        let pause = PauseLevel::new();
        pause.raise(EntityId(1), Some(3));
        let record = pause.raise(EntityId(2), Some(2));
        assert_eq!(pause.level(), 2);
        assert_eq!(record.previous, 3);
        assert!(test_log::logged(log::Level::Warn, "not above current level 3"));
    }

    #[test]
    fn out_of_order_close_skips_and_leaves_level_raised() {
        test_log::capture();
        let pause = PauseLevel::new();
        let outer = pause.raise(EntityId(1), None);
        let inner = pause.raise(EntityId(2), None);

        assert!(!pause.restore(outer));
        assert_eq!(pause.level(), 2);
        assert!(test_log::logged(log::Level::Warn, "skipped restoring level 0"));

        assert!(pause.restore(inner));
        assert_eq!(pause.level(), 1);
    }

    #[test]
    fn clones_share_the_level() {
        let pause = PauseLevel::new();
        let other = pause.clone();
        other.raise(EntityId(7), None);
        assert_eq!(pause.level(), 1);
    }
}
