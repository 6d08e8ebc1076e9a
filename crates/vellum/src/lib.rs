//! # Vellum — Retained-Mode 2D Scene Runtime
//!
//! A tree of [`Entity`](entity::Entity) values, each composed of pluggable
//! [`Component`](component::Component)s, driven by a per-frame update/draw
//! cycle and rendered through a [`Renderer`](render::Renderer) that can be a
//! GPU back end or a software rasterizer without the scene noticing.
//!
//! Start with `use vellum::prelude::*`, build entities, hand them to a
//! [`Stage`](stage::Stage) and call [`Stage::step`](stage::Stage::step) once
//! per frame.

pub mod collision;
pub mod component;
pub mod components;
pub mod config;
pub mod entity;
pub mod error;
pub mod math;
pub mod pause;
pub mod prelude;
pub mod render;
pub mod stage;
pub mod transform;

#[cfg(test)]
pub(crate) mod test_log;
