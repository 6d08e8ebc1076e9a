//! Common imports for building scenes.

pub use crate::collision::{Collidable, Collision, CollisionEvent, CollisionQuery, Hit, Registry};
pub use crate::component::{Component, ComponentKey, FrameData, Rejected};
pub use crate::components::{Anchor, Fill, FillStyle, Layer, Modal, Sprite};
pub use crate::config::{BackendPreference, EngineConfig, RendererConfig};
pub use crate::entity::{Entity, EntityConfig, EntityId, Node};
pub use crate::error::{ConfigError, RenderError};
pub use crate::math::{Affine2, BoundingBox, Color, Rect, Size, Vec2};
pub use crate::pause::{PauseLevel, PauseRecord};
pub use crate::render::{BackendKind, ImageRegion, Renderer, SoftwareRenderer, TextureHandle};
pub use crate::stage::Stage;
