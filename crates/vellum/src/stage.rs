//! # Stage — A Minimal Scheduler
//!
//! Holds the root entities, steps them once per frame and answers registry
//! lookups for collision queries.
//!
//! ```text
//!   step(speed, renderer)
//!     ├─ update(speed)
//!     │    ├─ snapshot roots → RegistrySnapshot (names, families, bounds)
//!     │    └─ for each root: skip if update_when_paused < pause level,
//!     │                      else root.update(data{ registry: snapshot })
//!     └─ draw(renderer)
//!          └─ for each root: root.draw(renderer, data)
//! ```
//!
//! Only roots are registered and only roots are gated by the pause level: a
//! child entity updates whenever its root does. The snapshot is taken at the
//! start of each update, so queries during a frame see every root where it was
//! when the frame began.

use crate::collision::{Hitbox, Registry};
use crate::component::{FrameData, Rejected};
use crate::entity::{Entity, EntityId};
use crate::pause::PauseLevel;
use crate::render::Renderer;

/// Names, families and bounds of the roots as of one instant.
#[derive(Debug, Clone, Default)]
pub struct RegistrySnapshot {
    hitboxes: Vec<Hitbox>,
}

impl RegistrySnapshot {
    pub fn capture<'a>(entities: impl IntoIterator<Item = &'a Entity>) -> Self {
        Self {
            hitboxes: entities.into_iter().map(|e| Hitbox::of(e.node())).collect(),
        }
    }
}

impl Registry for RegistrySnapshot {
    fn by_name(&self, name: &str) -> Vec<Hitbox> {
        self.hitboxes
            .iter()
            .filter(|h| h.name.as_deref() == Some(name))
            .cloned()
            .collect()
    }

    fn by_family(&self, family: &str) -> Vec<Hitbox> {
        self.hitboxes
            .iter()
            .filter(|h| h.families.iter().any(|f| f == family))
            .cloned()
            .collect()
    }
}

#[derive(Debug, Default)]
pub struct Stage {
    roots: Vec<Entity>,
    pause: PauseLevel,
    snapshot: RegistrySnapshot,
    frame: u64,
    speed: f32,
}

impl Stage {
    pub fn new() -> Self {
        Self::default()
    }

    /// The pause level gating this stage. Clone it into [`Modal`](crate::components::Modal)s.
    pub fn pause(&self) -> &PauseLevel {
        &self.pause
    }

    pub fn frame(&self) -> u64 {
        self.frame
    }

    pub fn roots(&self) -> &[Entity] {
        &self.roots
    }

    pub fn get(&self, id: EntityId) -> Option<&Entity> {
        self.roots.iter().find(|e| e.id() == id)
    }

    pub fn get_mut(&mut self, id: EntityId) -> Option<&mut Entity> {
        self.roots.iter_mut().find(|e| e.id() == id)
    }

    /// Make `entity` a live root and start it. An entity that has a parent or
    /// is already added is refused and handed back.
    pub fn add(&mut self, mut entity: Entity) -> Result<EntityId, Rejected<Entity>> {
        if entity.parent().is_some() || entity.is_added() {
            log::warn!("Stage: entity {} already has a parent or is added, ignored", entity.id());
            return Err(Rejected(entity));
        }
        let id = entity.id();
        entity.set_added(true);
        entity.propagate_transforms();
        entity.start();
        self.roots.push(entity);
        log::debug!("Stage: added {id}");
        Ok(id)
    }

    /// Destroy the root `id` and hand it back.
    pub fn remove(&mut self, id: EntityId) -> Option<Entity> {
        let index = self.roots.iter().position(|e| e.id() == id)?;
        let mut entity = self.roots.remove(index);
        entity.destroy();
        entity.set_added(false);
        log::debug!("Stage: removed {id}");
        Some(entity)
    }

    pub fn update(&mut self, speed: f32) {
        self.frame += 1;
        self.speed = speed;
        self.snapshot = RegistrySnapshot::capture(&self.roots);
        let registry: &dyn Registry = &self.snapshot;

        for root in &mut self.roots {
            if !root.should_update(self.pause.level()) {
                continue;
            }
            let mut data = FrameData {
                speed,
                frame: self.frame,
                entity: None,
                registry: Some(registry),
            };
            root.update(&mut data);
        }
    }

    pub fn draw(&mut self, renderer: &mut dyn Renderer) {
        let registry: &dyn Registry = &self.snapshot;
        for root in &mut self.roots {
            let mut data = FrameData {
                speed: self.speed,
                frame: self.frame,
                entity: None,
                registry: Some(registry),
            };
            root.draw(renderer, &mut data);
        }
    }

    /// One frame: update, then draw.
    pub fn step(&mut self, speed: f32, renderer: &mut dyn Renderer) {
        self.update(speed);
        self.draw(renderer);
    }
}

impl Registry for Stage {
    fn by_name(&self, name: &str) -> Vec<Hitbox> {
        self.snapshot.by_name(name)
    }

    fn by_family(&self, family: &str) -> Vec<Hitbox> {
        self.snapshot.by_family(family)
    }
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;
    use std::rc::Rc;

    use super::*;
    use crate::collision::{Collision, CollisionEvent, CollisionQuery};
    use crate::component::Component;
    use crate::components::{Fill, Modal};
    use crate::entity::{EntityConfig, Node};
    use crate::math::{Color, Size, Vec2};
    use crate::render::SoftwareRenderer;
    use crate::test_log;

    #[derive(Default)]
    struct Counter(Rc<Cell<u32>>);

    impl Component for Counter {
        fn update(&mut self, _: &mut Node, _: &mut FrameData<'_>) {
            self.0.set(self.0.get() + 1);
        }
    }

    fn counted() -> (Entity, Rc<Cell<u32>>) {
        let count = Rc::new(Cell::new(0));
        let e = Entity::default().with(Counter(count.clone()));
        (e, count)
    }

    #[test]
    fn modal_pauses_other_roots_but_not_itself() {
        let mut stage = Stage::new();
        let (world, world_count) = counted();
        stage.add(world).unwrap();

        let (dialog, dialog_count) = counted();
        let dialog = dialog.with(Modal::new(stage.pause().clone()));
        let dialog_id = stage.add(dialog).unwrap();
        assert_eq!(stage.pause().level(), 1);

        stage.update(1.0);
        assert_eq!(world_count.get(), 0);
        assert_eq!(dialog_count.get(), 1);

        stage.remove(dialog_id).unwrap();
        assert_eq!(stage.pause().level(), 0);
        stage.update(1.0);
        assert_eq!(world_count.get(), 1);
    }

    #[test]
    fn add_refuses_entities_already_added() {
        test_log::capture();
        let mut stage = Stage::new();
        let mut entity = Entity::default();
        entity.set_added(true);
        let Rejected(entity) = stage.add(entity).unwrap_err();
        assert!(entity.is_added());
        assert!(stage.roots().is_empty());
        assert!(test_log::logged(log::Level::Warn, "already has a parent"));
    }

    /// Reports the first root named "wall" it overlaps to its owner.
    struct Bump(Rc<Cell<Option<EntityId>>>);

    impl Component for Bump {
        fn update(&mut self, owner: &mut Node, data: &mut FrameData<'_>) {
            if let Some(Collision::First(hit)) =
                owner.collides_with(CollisionQuery::name("wall"), data.registry)
            {
                self.0.set(Some(CollisionEvent::from(hit).other));
            }
        }
    }

    #[test]
    fn components_query_the_stage_registry() {
        let mut stage = Stage::new();
        let wall = Entity::new(EntityConfig {
            name: Some("wall".into()),
            position: Vec2::new(5.0, 0.0),
            dimension: Size::new(10.0, 10.0),
            ..Default::default()
        });
        let wall_id = stage.add(wall).unwrap();

        let seen = Rc::new(Cell::new(None));
        let ball = Entity::new(EntityConfig {
            dimension: Size::new(8.0, 8.0),
            ..Default::default()
        })
        .with(Bump(seen.clone()));
        stage.add(ball).unwrap();

        stage.update(1.0);
        assert_eq!(seen.get(), Some(wall_id));
        assert_eq!(stage.by_name("wall").len(), 1);
        assert_eq!(stage.by_family("none").len(), 0);
    }

    #[test]
    fn step_draws_every_root() {
        let mut stage = Stage::new();
        for x in [0.0, 2.0] {
            let e = Entity::new(EntityConfig {
                position: Vec2::new(x, 0.0),
                dimension: Size::new(1.0, 1.0),
                ..Default::default()
            })
            .with(Fill::solid(Color::WHITE));
            stage.add(e).unwrap();
        }
        let mut renderer = SoftwareRenderer::new(4, 1, false);
        stage.step(1.0, &mut renderer);
        assert_eq!(stage.frame(), 1);
        let px = renderer.frame();
        assert_eq!(px.get_pixel(0, 0).0[3], 255);
        assert_eq!(px.get_pixel(1, 0).0[3], 0);
        assert_eq!(px.get_pixel(2, 0).0[3], 255);
    }

    #[test]
    fn added_entities_are_live_and_removed_ones_are_not() {
        let mut stage = Stage::new();
        let id = stage.add(Entity::default()).unwrap();
        assert!(stage.get(id).unwrap().is_live());
        let e = stage.remove(id).unwrap();
        assert!(!e.is_added());
        assert!(!e.is_live());
        assert!(stage.get(id).is_none());
        assert!(stage.remove(id).is_none());
    }
}
