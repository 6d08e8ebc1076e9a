//! # Modal — Pausing Everything Else
//!
//! Ties a [`PauseLevel`] raise to its owner's lifetime.

use crate::component::Component;
use crate::entity::Node;
use crate::pause::{PauseLevel, PauseRecord};

/// Pauses everything below it while its owner lives.
///
/// On `start` it raises the pause level (to `target`, or one above the level
/// in effect) and makes its owner exempt at the new level. On `destroy` it
/// restores the previous level, unless another modal has moved the level
/// since, and gives the owner back its own exemption.
#[derive(Debug)]
pub struct Modal {
    pause: PauseLevel,
    target: Option<u32>,
    open: Option<(PauseRecord, u32)>,
}

impl Modal {
    pub fn new(pause: PauseLevel) -> Self {
        Self {
            pause,
            target: None,
            open: None,
        }
    }

    /// Raise to exactly `level` instead of one above the current level.
    pub fn with_target(mut self, level: u32) -> Self {
        self.target = Some(level);
        self
    }

    pub fn record(&self) -> Option<PauseRecord> {
        self.open.map(|(record, _)| record)
    }
}

impl Component for Modal {
    fn name(&self) -> Option<&str> {
        Some("modal")
    }

    fn start(&mut self, owner: &mut Node) {
        let record = self.pause.raise(owner.id(), self.target);
        self.open = Some((record, owner.update_when_paused));
        owner.update_when_paused = record.set_to;
    }

    fn destroy(&mut self, owner: &mut Node) {
        if let Some((record, exemption)) = self.open.take() {
            self.pause.restore(record);
            owner.update_when_paused = exemption;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::Entity;
    use crate::test_log;

    fn modal_entity(pause: &PauseLevel) -> Entity {
        let mut e = Entity::default();
        e.attach(Modal::new(pause.clone()), false).unwrap();
        e
    }

    #[test]
    fn nested_modals_and_out_of_order_close() {
        test_log::capture();
        let pause = PauseLevel::new();

        let mut first = modal_entity(&pause);
        first.start();
        assert_eq!(pause.level(), 1);
        assert_eq!(first.update_when_paused, 1);
        assert!(first.should_update(pause.level()));

        let mut second = modal_entity(&pause);
        second.start();
        assert_eq!(pause.level(), 2);
        assert!(!first.should_update(pause.level()));
        assert!(second.should_update(pause.level()));

        first.destroy();
        assert_eq!(pause.level(), 2);
        assert!(test_log::logged(log::Level::Warn, "skipped restoring"));
    }

    #[test]
    fn destroy_restores_level_and_exemption() {
        let pause = PauseLevel::new();
        let mut e = modal_entity(&pause);
        e.start();
        assert_eq!(pause.level(), 1);
        e.destroy();
        assert_eq!(pause.level(), 0);
        assert_eq!(e.update_when_paused, 0);
    }

    #[test]
    fn explicit_target_is_used() {
        let pause = PauseLevel::new();
        let mut e = Entity::default();
        let key = e.attach(Modal::new(pause.clone()).with_target(5), false).unwrap();
        e.start();
        assert_eq!(pause.level(), 5);
        assert_eq!(e.update_when_paused, 5);
        e.remove(key);
        assert_eq!(pause.level(), 0);
    }
}
