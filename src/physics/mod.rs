//! Collision detection collaborator.

pub mod world;

pub use world::{
    BodyId, CollisionWorld, ContactManifold, ContactPoint, ProxyHandle, RayHit, Shape,
};
