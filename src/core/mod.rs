//! Core math primitives.
//!
//! Plain f32 vector/quaternion types shared by the simulation, the collision
//! world and the wire codec.

pub mod quat;
pub mod vec3;

// Re-export core types
pub use quat::Quat;
pub use vec3::Vec3;
