//! Collision World
//!
//! Proxy-based collision detection collaborator for the simulation. The
//! world owns proxy lifetime; each proxy carries a `BodyId` tag the resolver
//! uses to classify contacts. Detection is a broad AABB overlap pass over
//! proxy pairs followed by analytic narrow-phase tests (all dynamic bodies
//! are spheres; statics are axis-aligned boxes and boundary half-spaces).
//!
//! Manifolds report per-point world positions on both bodies and a signed
//! distance (negative = penetrating), which is all the resolver needs for
//! positional push-out and harpoon landing checks.

use crate::core::quat::Quat;
use crate::core::vec3::Vec3;
use crate::game::state::{PlayerId, Team};

/// Contacts are generated for pairs closer than this margin.
pub const CONTACT_MARGIN: f32 = 0.05;

// =============================================================================
// BODIES AND SHAPES
// =============================================================================

/// Identity tag carried by every proxy, used only for classification.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BodyId {
    Player(PlayerId),
    Harpoon(PlayerId),
    Treasure(Team),
    Static,
}

impl BodyId {
    /// Is this a piece of level geometry?
    #[inline]
    pub fn is_static(self) -> bool {
        matches!(self, BodyId::Static)
    }
}

/// Collision shape. Boxes and boundaries are axis-aligned / world-fixed;
/// only spheres move, so proxy rotation never affects detection.
#[derive(Clone, Copy, Debug)]
pub enum Shape {
    Sphere { radius: f32 },
    Aabb { half_extents: Vec3 },
    /// Half-space: inside is where `dot(normal, p) >= offset`.
    Boundary { normal: Vec3, offset: f32 },
}

/// Stable handle to a registered proxy.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ProxyHandle(usize);

#[derive(Clone, Debug)]
struct Proxy {
    body: BodyId,
    shape: Shape,
    position: Vec3,
}

// =============================================================================
// CONTACTS
// =============================================================================

/// One contact point of a manifold.
#[derive(Clone, Copy, Debug)]
pub struct ContactPoint {
    /// World-space point on body A's surface
    pub on_a: Vec3,
    /// World-space point on body B's surface
    pub on_b: Vec3,
    /// Signed separation; negative means penetrating
    pub distance: f32,
}

/// A contact manifold between two proxies.
#[derive(Clone, Debug)]
pub struct ContactManifold {
    pub a: BodyId,
    pub b: BodyId,
    pub points: Vec<ContactPoint>,
}

impl ContactManifold {
    /// Does any point actually penetrate?
    pub fn has_penetration(&self) -> bool {
        self.points.iter().any(|p| p.distance < 0.0)
    }
}

/// Result of a raycast.
#[derive(Clone, Copy, Debug)]
pub struct RayHit {
    pub body: BodyId,
    pub distance: f32,
}

// =============================================================================
// COLLISION WORLD
// =============================================================================

/// Proxy registry plus detection queries. Slots are reused after removal;
/// pair iteration follows slot order, so manifold order is stable.
#[derive(Default)]
pub struct CollisionWorld {
    proxies: Vec<Option<Proxy>>,
    free: Vec<usize>,
}

impl CollisionWorld {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a proxy; returns its handle.
    pub fn add_proxy(&mut self, body: BodyId, shape: Shape, position: Vec3) -> ProxyHandle {
        let proxy = Proxy { body, shape, position };
        match self.free.pop() {
            Some(slot) => {
                self.proxies[slot] = Some(proxy);
                ProxyHandle(slot)
            }
            None => {
                self.proxies.push(Some(proxy));
                ProxyHandle(self.proxies.len() - 1)
            }
        }
    }

    /// Move a proxy. Rotation is accepted for interface symmetry but does
    /// not affect detection (only spheres move).
    pub fn set_transform(&mut self, handle: ProxyHandle, position: Vec3, _rotation: Quat) {
        if let Some(Some(proxy)) = self.proxies.get_mut(handle.0) {
            proxy.position = position;
        }
    }

    /// Unregister a proxy; its slot is recycled.
    pub fn remove_proxy(&mut self, handle: ProxyHandle) {
        if let Some(slot) = self.proxies.get_mut(handle.0) {
            if slot.take().is_some() {
                self.free.push(handle.0);
            }
        }
    }

    /// Number of live proxies.
    pub fn proxy_count(&self) -> usize {
        self.proxies.iter().filter(|p| p.is_some()).count()
    }

    /// Run one detection pass over all proxy pairs.
    pub fn detect(&self) -> Vec<ContactManifold> {
        let mut manifolds = Vec::new();
        for i in 0..self.proxies.len() {
            let Some(a) = self.proxies[i].as_ref() else { continue };
            for j in (i + 1)..self.proxies.len() {
                let Some(b) = self.proxies[j].as_ref() else { continue };
                if a.body.is_static() && b.body.is_static() {
                    continue;
                }
                if !aabbs_overlap(a, b) {
                    continue;
                }
                if let Some(point) = narrow_phase(a, b) {
                    manifolds.push(ContactManifold {
                        a: a.body,
                        b: b.body,
                        points: vec![point],
                    });
                }
            }
        }
        manifolds
    }

    /// Nearest ray hit within `max_dist`, among proxies accepted by `filter`.
    /// Boundary half-spaces are not ray targets.
    pub fn raycast(
        &self,
        origin: Vec3,
        direction: Vec3,
        max_dist: f32,
        mut filter: impl FnMut(BodyId) -> bool,
    ) -> Option<RayHit> {
        let dir = direction.normalize();
        if dir == Vec3::ZERO {
            return None;
        }
        let mut best: Option<RayHit> = None;
        for proxy in self.proxies.iter().flatten() {
            if !filter(proxy.body) {
                continue;
            }
            let t = match proxy.shape {
                Shape::Sphere { radius } => ray_sphere(origin, dir, proxy.position, radius),
                Shape::Aabb { half_extents } => ray_aabb(origin, dir, proxy.position, half_extents),
                Shape::Boundary { .. } => None,
            };
            if let Some(t) = t {
                if t <= max_dist && best.map_or(true, |h| t < h.distance) {
                    best = Some(RayHit { body: proxy.body, distance: t });
                }
            }
        }
        best
    }
}

// =============================================================================
// BROAD PHASE
// =============================================================================

fn proxy_aabb(p: &Proxy) -> (Vec3, Vec3) {
    match p.shape {
        Shape::Sphere { radius } => {
            let r = Vec3::new(radius, radius, radius);
            (p.position - r, p.position + r)
        }
        Shape::Aabb { half_extents } => (p.position - half_extents, p.position + half_extents),
        // Half-spaces are unbounded; let the narrow phase decide.
        Shape::Boundary { .. } => (
            Vec3::new(f32::MIN, f32::MIN, f32::MIN),
            Vec3::new(f32::MAX, f32::MAX, f32::MAX),
        ),
    }
}

fn aabbs_overlap(a: &Proxy, b: &Proxy) -> bool {
    let (amin, amax) = proxy_aabb(a);
    let (bmin, bmax) = proxy_aabb(b);
    let m = CONTACT_MARGIN;
    amin.x <= bmax.x + m
        && bmin.x <= amax.x + m
        && amin.y <= bmax.y + m
        && bmin.y <= amax.y + m
        && amin.z <= bmax.z + m
        && bmin.z <= amax.z + m
}

// =============================================================================
// NARROW PHASE
// =============================================================================

/// Contact between two proxies, if within the margin. Every dynamic body is
/// a sphere; pairs with no sphere are not tested.
fn narrow_phase(a: &Proxy, b: &Proxy) -> Option<ContactPoint> {
    match (a.shape, b.shape) {
        (Shape::Sphere { radius: ra }, Shape::Sphere { radius: rb }) => {
            sphere_sphere(a.position, ra, b.position, rb)
        }
        (Shape::Sphere { radius }, Shape::Aabb { half_extents }) => {
            sphere_aabb(a.position, radius, b.position, half_extents)
        }
        (Shape::Aabb { half_extents }, Shape::Sphere { radius }) => {
            sphere_aabb(b.position, radius, a.position, half_extents).map(flip)
        }
        (Shape::Sphere { radius }, Shape::Boundary { normal, offset }) => {
            sphere_boundary(a.position, radius, normal, offset)
        }
        (Shape::Boundary { normal, offset }, Shape::Sphere { radius }) => {
            sphere_boundary(b.position, radius, normal, offset).map(flip)
        }
        _ => None,
    }
}

fn flip(p: ContactPoint) -> ContactPoint {
    ContactPoint { on_a: p.on_b, on_b: p.on_a, distance: p.distance }
}

fn within_margin(distance: f32) -> bool {
    distance < CONTACT_MARGIN
}

fn sphere_sphere(pa: Vec3, ra: f32, pb: Vec3, rb: f32) -> Option<ContactPoint> {
    let delta = pb - pa;
    let center_dist = delta.length();
    let distance = center_dist - ra - rb;
    if !within_margin(distance) {
        return None;
    }
    // Coincident centers: pick an arbitrary separation axis.
    let normal = if center_dist > f32::EPSILON {
        delta.scale(1.0 / center_dist)
    } else {
        Vec3::new(1.0, 0.0, 0.0)
    };
    Some(ContactPoint {
        on_a: pa + normal.scale(ra),
        on_b: pb - normal.scale(rb),
        distance,
    })
}

fn sphere_aabb(center: Vec3, radius: f32, box_center: Vec3, half: Vec3) -> Option<ContactPoint> {
    let local = center - box_center;
    let clamped = local.clamp_to_bounds(half);
    let delta = local - clamped;
    let dist_to_surface = delta.length();

    if dist_to_surface > f32::EPSILON {
        // Sphere center outside the box
        let distance = dist_to_surface - radius;
        if !within_margin(distance) {
            return None;
        }
        let normal = delta.scale(1.0 / dist_to_surface);
        Some(ContactPoint {
            on_a: center - normal.scale(radius),
            on_b: box_center + clamped,
            distance,
        })
    } else {
        // Center inside the box: push out through the nearest face.
        let depths = [
            (half.x - local.x.abs(), Vec3::new(local.x.signum(), 0.0, 0.0)),
            (half.y - local.y.abs(), Vec3::new(0.0, local.y.signum(), 0.0)),
            (half.z - local.z.abs(), Vec3::new(0.0, 0.0, local.z.signum())),
        ];
        let (depth, normal) = depths
            .into_iter()
            .min_by(|x, y| x.0.partial_cmp(&y.0).unwrap_or(std::cmp::Ordering::Equal))?;
        let distance = -(depth + radius);
        let face_point = center + normal.scale(depth);
        Some(ContactPoint {
            on_a: center - normal.scale(radius),
            on_b: face_point,
            distance,
        })
    }
}

fn sphere_boundary(center: Vec3, radius: f32, normal: Vec3, offset: f32) -> Option<ContactPoint> {
    let plane_dist = normal.dot(center) - offset;
    let distance = plane_dist - radius;
    if !within_margin(distance) {
        return None;
    }
    Some(ContactPoint {
        on_a: center - normal.scale(radius),
        on_b: center - normal.scale(plane_dist),
        distance,
    })
}

// =============================================================================
// RAYCASTS
// =============================================================================

fn ray_sphere(origin: Vec3, dir: Vec3, center: Vec3, radius: f32) -> Option<f32> {
    let oc = origin - center;
    let b = oc.dot(dir);
    let c = oc.length_squared() - radius * radius;
    if c <= 0.0 {
        // Ray starts inside
        return Some(0.0);
    }
    let disc = b * b - c;
    if disc < 0.0 {
        return None;
    }
    let t = -b - disc.sqrt();
    (t >= 0.0).then_some(t)
}

fn ray_aabb(origin: Vec3, dir: Vec3, center: Vec3, half: Vec3) -> Option<f32> {
    // Slab test
    let min = center - half;
    let max = center + half;
    let mut t_near = f32::NEG_INFINITY;
    let mut t_far = f32::INFINITY;

    for (o, d, lo, hi) in [
        (origin.x, dir.x, min.x, max.x),
        (origin.y, dir.y, min.y, max.y),
        (origin.z, dir.z, min.z, max.z),
    ] {
        if d.abs() < f32::EPSILON {
            if o < lo || o > hi {
                return None;
            }
            continue;
        }
        let inv = 1.0 / d;
        let (t0, t1) = {
            let a = (lo - o) * inv;
            let b = (hi - o) * inv;
            if a < b { (a, b) } else { (b, a) }
        };
        t_near = t_near.max(t0);
        t_far = t_far.min(t1);
        if t_near > t_far {
            return None;
        }
    }

    if t_far < 0.0 {
        return None;
    }
    Some(t_near.max(0.0))
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn sphere(world: &mut CollisionWorld, body: BodyId, pos: Vec3, r: f32) -> ProxyHandle {
        world.add_proxy(body, Shape::Sphere { radius: r }, pos)
    }

    #[test]
    fn test_sphere_sphere_penetration() {
        let mut world = CollisionWorld::new();
        sphere(&mut world, BodyId::Player(PlayerId::new(0)), Vec3::ZERO, 1.0);
        sphere(&mut world, BodyId::Player(PlayerId::new(1)), Vec3::new(1.5, 0.0, 0.0), 1.0);

        let manifolds = world.detect();
        assert_eq!(manifolds.len(), 1);
        let point = manifolds[0].points[0];
        assert!((point.distance - (-0.5)).abs() < 1e-5);
        // Points lie on each surface along the center line
        assert!((point.on_a.x - 1.0).abs() < 1e-5);
        assert!((point.on_b.x - 0.5).abs() < 1e-5);
    }

    #[test]
    fn test_separated_spheres_no_contact() {
        let mut world = CollisionWorld::new();
        sphere(&mut world, BodyId::Player(PlayerId::new(0)), Vec3::ZERO, 1.0);
        sphere(&mut world, BodyId::Player(PlayerId::new(1)), Vec3::new(5.0, 0.0, 0.0), 1.0);
        assert!(world.detect().is_empty());
    }

    #[test]
    fn test_static_pair_skipped() {
        let mut world = CollisionWorld::new();
        world.add_proxy(BodyId::Static, Shape::Aabb { half_extents: Vec3::new(1.0, 1.0, 1.0) }, Vec3::ZERO);
        world.add_proxy(BodyId::Static, Shape::Aabb { half_extents: Vec3::new(1.0, 1.0, 1.0) }, Vec3::new(0.5, 0.0, 0.0));
        assert!(world.detect().is_empty());
    }

    #[test]
    fn test_sphere_aabb_outside() {
        let mut world = CollisionWorld::new();
        world.add_proxy(BodyId::Static, Shape::Aabb { half_extents: Vec3::new(1.0, 1.0, 1.0) }, Vec3::ZERO);
        sphere(&mut world, BodyId::Player(PlayerId::new(0)), Vec3::new(1.8, 0.0, 0.0), 1.0);

        let manifolds = world.detect();
        assert_eq!(manifolds.len(), 1);
        let point = manifolds[0].points[0];
        // Sphere surface reaches 0.8, box face is at 1.0: 0.2 deep
        assert!((point.distance - (-0.2)).abs() < 1e-5);
        assert!(manifolds[0].has_penetration());
    }

    #[test]
    fn test_sphere_inside_aabb() {
        let mut world = CollisionWorld::new();
        world.add_proxy(BodyId::Static, Shape::Aabb { half_extents: Vec3::new(2.0, 2.0, 2.0) }, Vec3::ZERO);
        sphere(&mut world, BodyId::Player(PlayerId::new(0)), Vec3::new(1.5, 0.0, 0.0), 0.5);

        let manifolds = world.detect();
        assert_eq!(manifolds.len(), 1);
        assert!(manifolds[0].points[0].distance < 0.0);
    }

    #[test]
    fn test_sphere_boundary() {
        let mut world = CollisionWorld::new();
        // Floor at z = 0, inside is above
        world.add_proxy(
            BodyId::Static,
            Shape::Boundary { normal: Vec3::UP, offset: 0.0 },
            Vec3::ZERO,
        );
        sphere(&mut world, BodyId::Player(PlayerId::new(0)), Vec3::new(0.0, 0.0, 0.5), 1.0);

        let manifolds = world.detect();
        assert_eq!(manifolds.len(), 1);
        assert!((manifolds[0].points[0].distance - (-0.5)).abs() < 1e-5);
    }

    #[test]
    fn test_set_transform_moves_proxy() {
        let mut world = CollisionWorld::new();
        let a = sphere(&mut world, BodyId::Player(PlayerId::new(0)), Vec3::ZERO, 1.0);
        sphere(&mut world, BodyId::Player(PlayerId::new(1)), Vec3::new(10.0, 0.0, 0.0), 1.0);
        assert!(world.detect().is_empty());

        world.set_transform(a, Vec3::new(9.0, 0.0, 0.0), Quat::IDENTITY);
        assert_eq!(world.detect().len(), 1);
    }

    #[test]
    fn test_remove_proxy_recycles_slot() {
        let mut world = CollisionWorld::new();
        let a = sphere(&mut world, BodyId::Player(PlayerId::new(0)), Vec3::ZERO, 1.0);
        world.remove_proxy(a);
        assert_eq!(world.proxy_count(), 0);

        sphere(&mut world, BodyId::Player(PlayerId::new(1)), Vec3::ZERO, 1.0);
        assert_eq!(world.proxy_count(), 1);
        assert_eq!(world.proxies.len(), 1);
    }

    #[test]
    fn test_raycast_hits_nearest() {
        let mut world = CollisionWorld::new();
        sphere(&mut world, BodyId::Treasure(Team::Red), Vec3::new(5.0, 0.0, 0.0), 0.5);
        world.add_proxy(
            BodyId::Static,
            Shape::Aabb { half_extents: Vec3::new(0.5, 2.0, 2.0) },
            Vec3::new(3.0, 0.0, 0.0),
        );

        // The box sits in front of the treasure and is hit first
        let hit = world
            .raycast(Vec3::ZERO, Vec3::new(1.0, 0.0, 0.0), 100.0, |_| true)
            .unwrap();
        assert_eq!(hit.body, BodyId::Static);
        assert!((hit.distance - 2.5).abs() < 1e-5);
    }

    #[test]
    fn test_raycast_filter_and_reach() {
        let mut world = CollisionWorld::new();
        sphere(&mut world, BodyId::Player(PlayerId::new(0)), Vec3::new(1.0, 0.0, 0.0), 1.0);
        sphere(&mut world, BodyId::Treasure(Team::Blue), Vec3::new(4.0, 0.0, 0.0), 0.5);

        // Filtering out the player exposes the treasure behind it
        let hit = world
            .raycast(Vec3::ZERO, Vec3::new(1.0, 0.0, 0.0), 100.0, |b| {
                !matches!(b, BodyId::Player(_))
            })
            .unwrap();
        assert_eq!(hit.body, BodyId::Treasure(Team::Blue));

        // Out of reach
        assert!(world
            .raycast(Vec3::ZERO, Vec3::new(1.0, 0.0, 0.0), 2.0, |b| {
                !matches!(b, BodyId::Player(_))
            })
            .is_none());
    }
}
