//! Convex planar polygons and the half space clipping that rebuilds brush
//! faces from their planes.

use crate::geom::{Plane, Vector};
use itertools::Itertools;

/// World half extent for standard Source maps.
pub const MAX_COORD: f32 = 32768.0;
/// Strata based branches raised the world bounds.
pub const MAX_COORD_STRATA: f32 = 131072.0;
/// Distance tolerance for classifying a point as on plane while clipping.
pub const ON_EPSILON: f32 = 0.01;

const DEGEN_EPSILON: f32 = 0.1;
const COLLINEAR_EPSILON: f32 = 1e-4;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Side {
    Front,
    Back,
    On,
}

/// Ordered, convex, planar polygon described by its vertices.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Winding {
    points: Vec<Vector>,
}

impl Winding {
    pub fn from_points(points: Vec<Vector>) -> Self {
        Winding { points }
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn points(&self) -> &[Vector] {
        &self.points
    }

    pub fn iter(&self) -> impl Iterator<Item = &Vector> {
        self.points.iter()
    }

    /// A huge square lying on the plane, centered on the plane's closest
    /// point to the origin, large enough to cover the whole world.
    pub fn base_for_plane(plane: &Plane, max_coord: f32) -> Winding {
        let normal = plane.normal;
        let org = normal * plane.dist;

        // reference up vector, perpendicular to the dominant axis
        let (ax, ay, az) = (normal.x.abs(), normal.y.abs(), normal.z.abs());
        let up = if az > ax && az > ay {
            Vector::X
        } else {
            Vector::Z
        };

        let max_len = (3.0f32.sqrt() * max_coord).ceil();
        let up = (up - normal * up.dot(normal)).normalized() * max_len;
        let right = up.cross(normal).normalized() * max_len;

        Winding {
            points: vec![org - right + up, org + right + up, org + right - up, org - right - up],
        }
    }

    /// Keep the part of the polygon in front of the plane, inserting
    /// intersection points on straddling edges. With `keep_on` false a
    /// polygon lying entirely on the plane is dropped.
    pub fn clip(&self, plane: &Plane, keep_on: bool) -> Winding {
        let classified: Vec<(Vector, f32, Side)> = self
            .points
            .iter()
            .map(|&p| {
                let dist = plane.distance_to(p);
                let side = if dist > ON_EPSILON {
                    Side::Front
                } else if dist < -ON_EPSILON {
                    Side::Back
                } else {
                    Side::On
                };
                (p, dist, side)
            })
            .collect();

        let front = classified.iter().filter(|c| c.2 == Side::Front).count();
        let back = classified.iter().filter(|c| c.2 == Side::Back).count();
        if front == 0 {
            return if keep_on && back == 0 {
                self.clone()
            } else {
                Winding::default()
            };
        }
        if back == 0 {
            return self.clone();
        }

        let mut points = Vec::with_capacity(self.len() + 4);
        for ((p1, d1, s1), (p2, d2, s2)) in classified.iter().copied().circular_tuple_windows() {
            match s1 {
                Side::On => {
                    points.push(p1);
                    continue;
                }
                Side::Front => points.push(p1),
                Side::Back => {}
            }
            if s2 == Side::On || s2 == s1 {
                continue;
            }

            let t = d1 / (d1 - d2);
            let mut mid = p1 + (p2 - p1) * t;
            // exactly axial planes pin the intersection onto the plane
            for axis in 0..3 {
                let (n, m) = match axis {
                    0 => (plane.normal.x, &mut mid.x),
                    1 => (plane.normal.y, &mut mid.y),
                    _ => (plane.normal.z, &mut mid.z),
                };
                if n == 1.0 {
                    *m = plane.dist;
                } else if n == -1.0 {
                    *m = -plane.dist;
                }
            }
            points.push(mid);
        }

        Winding { points }
    }

    /// True when any vertex escaped the world bounds, which means clipping
    /// never closed the base polygon.
    pub fn is_huge(&self, max_coord: f32) -> bool {
        self.points
            .iter()
            .any(|p| p.x.abs() > max_coord || p.y.abs() > max_coord || p.z.abs() > max_coord)
    }

    /// Drop vertices sitting on top of their predecessor.
    pub fn remove_degenerate(&self) -> Winding {
        let len = self.points.len();
        let points = (0..len)
            .filter(|&i| {
                let prev = self.points[(i + len - 1) % len];
                (self.points[i] - prev).length() > DEGEN_EPSILON
            })
            .map(|i| self.points[i])
            .collect();
        Winding { points }
    }

    /// The first three non collinear vertices, which pin down the plane of
    /// the polygon for the editor.
    pub fn build_plane(&self) -> Option<[Vector; 3]> {
        self.points
            .iter()
            .copied()
            .tuple_combinations()
            .find(|&(a, b, c)| (b - a).cross(c - a).length() > COLLINEAR_EPSILON)
            .map(|(a, b, c)| [a, b, c])
    }

    pub fn rotated(&self, angles: Vector) -> Winding {
        Winding {
            points: self.points.iter().map(|p| p.rotated(angles)).collect(),
        }
    }

    pub fn translated(&self, offset: Vector) -> Winding {
        Winding {
            points: self.points.iter().map(|&p| p + offset).collect(),
        }
    }
}

impl<'a> IntoIterator for &'a Winding {
    type Item = &'a Vector;
    type IntoIter = std::slice::Iter<'a, Vector>;

    fn into_iter(self) -> Self::IntoIter {
        self.points.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn plane(x: f32, y: f32, z: f32, dist: f32) -> Plane {
        Plane::new(Vector::new(x, y, z), dist)
    }

    #[test]
    fn base_winding_for_axial_plane() {
        let w = Winding::base_for_plane(&plane(1.0, 0.0, 0.0, 100.0), MAX_COORD);
        let max_len = (3.0f32.sqrt() * MAX_COORD).ceil();
        assert_eq!(w.len(), 4);
        for p in &w {
            assert_eq!(p.x, 100.0);
            assert_eq!(p.y.abs(), max_len);
            assert_eq!(p.z.abs(), max_len);
        }
    }

    #[test]
    fn base_winding_lies_on_plane() {
        let normals = [
            Vector::new(1.0, 0.0, 0.0),
            Vector::new(0.6, 0.8, 0.0),
            Vector::new(1.0, 2.0, 3.0).normalized(),
            Vector::new(0.0, 0.0, -1.0),
        ];
        for normal in normals {
            let plane = Plane::new(normal, 100.0);
            let w = Winding::base_for_plane(&plane, MAX_COORD);
            assert_eq!(w.len(), 4);
            for p in &w {
                assert!(
                    plane.distance_to(*p).abs() < 1e-3,
                    "vertex {p:?} off plane {plane:?} by {}",
                    plane.distance_to(*p)
                );
            }
        }
    }

    #[test]
    fn clip_is_idempotent() {
        let clip_plane = plane(0.0, 0.0, 1.0, 10.0);
        let base = Winding::base_for_plane(&plane(1.0, 0.0, 0.0, 0.0), MAX_COORD);
        let once = base.clip(&clip_plane.flipped(), false);
        let twice = once.clip(&clip_plane.flipped(), false);
        assert!(!once.is_empty());
        assert_eq!(once, twice);
    }

    #[test]
    fn clip_keeps_front_half() {
        let square = Winding::from_points(vec![
            Vector::new(-1.0, -1.0, 0.0),
            Vector::new(-1.0, 1.0, 0.0),
            Vector::new(1.0, 1.0, 0.0),
            Vector::new(1.0, -1.0, 0.0),
        ]);
        let clipped = square.clip(&plane(1.0, 0.0, 0.0, 0.0), false);
        assert_eq!(clipped.len(), 4);
        for p in &clipped {
            assert!(p.x >= -ON_EPSILON);
        }
    }

    #[test]
    fn clip_drops_windings_fully_behind() {
        let square = Winding::from_points(vec![
            Vector::new(-2.0, -1.0, 0.0),
            Vector::new(-2.0, 1.0, 0.0),
            Vector::new(-1.0, 1.0, 0.0),
            Vector::new(-1.0, -1.0, 0.0),
        ]);
        assert!(square.clip(&plane(1.0, 0.0, 0.0, 0.0), false).is_empty());
    }

    #[test]
    fn keep_on_controls_coplanar_windings() {
        let square = Winding::from_points(vec![
            Vector::new(0.0, -1.0, -1.0),
            Vector::new(0.0, 1.0, -1.0),
            Vector::new(0.0, 1.0, 1.0),
            Vector::new(0.0, -1.0, 1.0),
        ]);
        let on_plane = plane(1.0, 0.0, 0.0, 0.0);
        assert!(square.clip(&on_plane, false).is_empty());
        assert_eq!(square.clip(&on_plane, true), square);
    }

    #[test]
    fn degenerate_points_collapse() {
        let w = Winding::from_points(vec![
            Vector::new(0.0, 0.0, 0.0),
            Vector::new(0.0, 0.0, 0.01),
            Vector::new(1.0, 0.0, 0.0),
            Vector::new(1.0, 1.0, 0.0),
        ]);
        let cleaned = w.remove_degenerate();
        assert_eq!(cleaned.len(), 3);
    }

    #[test]
    fn build_plane_skips_collinear_vertices() {
        let w = Winding::from_points(vec![
            Vector::new(0.0, 0.0, 0.0),
            Vector::new(1.0, 0.0, 0.0),
            Vector::new(2.0, 0.0, 0.0),
            Vector::new(2.0, 1.0, 0.0),
        ]);
        let [a, b, c] = w.build_plane().unwrap();
        assert_eq!(a, Vector::new(0.0, 0.0, 0.0));
        assert_eq!(b, Vector::new(1.0, 0.0, 0.0));
        assert_eq!(c, Vector::new(2.0, 1.0, 0.0));

        let line = Winding::from_points(vec![
            Vector::new(0.0, 0.0, 0.0),
            Vector::new(1.0, 0.0, 0.0),
            Vector::new(2.0, 0.0, 0.0),
        ]);
        assert!(line.build_plane().is_none());
    }

    #[test]
    fn is_huge_detects_unbounded_windings() {
        let base = Winding::base_for_plane(&plane(0.0, 0.0, 1.0, 0.0), MAX_COORD);
        assert!(base.is_huge(MAX_COORD));

        let small = Winding::from_points(vec![
            Vector::new(0.0, 0.0, 0.0),
            Vector::new(64.0, 0.0, 0.0),
            Vector::new(64.0, 64.0, 0.0),
        ]);
        assert!(!small.is_huge(MAX_COORD));
    }

    #[test]
    fn rotate_then_translate() {
        let w = Winding::from_points(vec![Vector::X, Vector::Y]);
        let moved = w
            .rotated(Vector::new(0.0, 90.0, 0.0))
            .translated(Vector::new(0.0, 0.0, 5.0));
        assert!((moved.points()[0] - Vector::new(0.0, 1.0, 5.0)).length() < 1e-4);
        assert!((moved.points()[1] - Vector::new(-1.0, 0.0, 5.0)).length() < 1e-4);
    }
}
