//! Typed entities and their JSON representation.
//!
//! Entities are stored as the JSON encoding of the whole value under the key
//! returned by [`Entity::id`].

mod entity;
mod json;

pub use entity::Entity;
pub use json::{JsonCodec, JsonCursor, Skipped};
