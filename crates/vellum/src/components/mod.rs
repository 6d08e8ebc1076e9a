//! Ready-made components: drawables, a layout helper and the pause modal.
//!
//! - [`Fill`] paints the owner's rectangle.
//! - [`Sprite`] stretches an image region over it.
//! - [`Layer`] renders the components attached after it off-screen and
//!   composites the result.
//! - [`Anchor`] keeps the origin at a fraction of the dimension.
//! - [`Modal`] raises the pause level while its owner lives.

mod anchor;
mod fill;
mod layer;
mod modal;
mod sprite;

pub use anchor::Anchor;
pub use fill::{Fill, FillStyle};
pub use layer::Layer;
pub use modal::Modal;
pub use sprite::Sprite;
