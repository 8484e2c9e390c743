//! BSP tree node
//!
//! ```text
//!           [Plane]
//!          /       \
//!      Front       Back
//!     (+ side)   (- side)
//! ```
//!
//! A solid is represented by the tree built from its boundary polygons:
//! space behind every leaf's path of planes is inside.

use super::polygon::{Plane, Polygon, SplitBuckets, split_polygon};

#[derive(Debug, Default)]
pub struct BspNode {
    /// Splitting plane (None for an empty node)
    plane: Option<Plane>,
    /// Polygons coplanar with this node's plane
    polygons: Vec<Polygon>,
    front: Option<Box<BspNode>>,
    back: Option<Box<BspNode>>,
}

impl BspNode {
    pub fn new(polygons: Vec<Polygon>) -> Self {
        let mut node = Self::default();
        node.build(polygons);
        node
    }

    /// Insert polygons, splitting them by existing planes
    ///
    /// The first polygon's plane becomes the splitting plane of an empty node.
    /// Convex inputs degenerate the tree into a chain as deep as the polygon
    /// count, so every traversal here runs on an explicit work stack.
    pub fn build(&mut self, polygons: Vec<Polygon>) {
        let mut stack = vec![(self, polygons)];
        while let Some((node, polygons)) = stack.pop() {
            let Some(first) = polygons.first() else {
                continue;
            };
            let BspNode {
                plane,
                polygons: kept,
                front,
                back,
            } = node;
            let plane = *plane.get_or_insert(first.plane);

            let mut out = SplitBuckets::default();
            for polygon in polygons {
                split_polygon(&plane, polygon, &mut out);
            }
            kept.append(&mut out.coplanar_front);
            kept.append(&mut out.coplanar_back);

            if !out.front.is_empty() {
                stack.push((&mut **front.get_or_insert_with(Default::default), out.front));
            }
            if !out.back.is_empty() {
                stack.push((&mut **back.get_or_insert_with(Default::default), out.back));
            }
        }
    }

    /// Swap solid space and empty space
    pub fn invert(&mut self) {
        let mut stack = vec![self];
        while let Some(node) = stack.pop() {
            for polygon in &mut node.polygons {
                polygon.flip();
            }
            if let Some(plane) = node.plane.as_mut() {
                plane.flip();
            }
            std::mem::swap(&mut node.front, &mut node.back);
            stack.extend(node.front.as_deref_mut());
            stack.extend(node.back.as_deref_mut());
        }
    }

    /// Remove the parts of `polygons` that lie inside this tree's solid
    pub fn clip_polygons(&self, polygons: Vec<Polygon>) -> Vec<Polygon> {
        let mut kept = Vec::new();
        let mut stack = vec![(self, polygons)];
        while let Some((node, polygons)) = stack.pop() {
            let Some(plane) = node.plane else {
                kept.extend(polygons);
                continue;
            };

            let mut out = SplitBuckets::default();
            for polygon in polygons {
                split_polygon(&plane, polygon, &mut out);
            }
            let mut front = out.front;
            front.append(&mut out.coplanar_front);
            let mut back = out.back;
            back.append(&mut out.coplanar_back);

            match node.front.as_deref() {
                Some(child) => stack.push((child, front)),
                None => kept.extend(front),
            }
            // Behind a leaf plane is solid, so unreached back fragments drop
            if let Some(child) = node.back.as_deref() {
                stack.push((child, back));
            }
        }
        kept
    }

    /// Remove every polygon of this tree that lies inside `other`
    pub fn clip_to(&mut self, other: &BspNode) {
        let mut stack = vec![self];
        while let Some(node) = stack.pop() {
            node.polygons = other.clip_polygons(std::mem::take(&mut node.polygons));
            stack.extend(node.front.as_deref_mut());
            stack.extend(node.back.as_deref_mut());
        }
    }

    /// Collect all polygons from the tree
    pub fn all_polygons(&self) -> Vec<Polygon> {
        let mut result = Vec::new();
        let mut stack = vec![self];
        while let Some(node) = stack.pop() {
            result.extend(node.polygons.iter().cloned());
            stack.extend(node.front.as_deref());
            stack.extend(node.back.as_deref());
        }
        result
    }

    /// Longest path from this node to a leaf
    pub fn depth(&self) -> usize {
        let mut deepest = 0;
        let mut stack = vec![(self, 1)];
        while let Some((node, depth)) = stack.pop() {
            deepest = deepest.max(depth);
            stack.extend(node.front.as_deref().map(|n| (n, depth + 1)));
            stack.extend(node.back.as_deref().map(|n| (n, depth + 1)));
        }
        deepest
    }
}

impl Drop for BspNode {
    fn drop(&mut self) {
        // Unlink children first so dropping a deep chain does not recurse
        let mut stack: Vec<Box<BspNode>> = Vec::new();
        stack.extend(self.front.take());
        stack.extend(self.back.take());
        while let Some(mut node) = stack.pop() {
            stack.extend(node.front.take());
            stack.extend(node.back.take());
        }
    }
}

#[cfg(test)]
mod tests {
    use glam::DVec3;

    use super::*;

    fn triangle() -> Polygon {
        Polygon::new(vec![DVec3::ZERO, DVec3::X, DVec3::Y]).unwrap()
    }

    #[test]
    fn test_build_empty() {
        let node = BspNode::new(vec![]);
        assert!(node.plane.is_none());
        assert!(node.all_polygons().is_empty());
    }

    #[test]
    fn test_build_single_polygon() {
        let node = BspNode::new(vec![triangle()]);
        assert!(node.plane.is_some());
        assert_eq!(node.polygons.len(), 1);
        assert!(node.front.is_none() && node.back.is_none());
    }

    #[test]
    fn test_invert_flips_polygons() {
        let mut node = BspNode::new(vec![triangle()]);
        node.invert();
        let polygons = node.all_polygons();
        assert!(polygons[0].plane.normal.abs_diff_eq(DVec3::NEG_Z, 1e-12));
    }

    #[test]
    fn test_clip_removes_polygons_behind_plane() {
        // Single plane z = 0 facing +Z: everything below is solid
        let node = BspNode::new(vec![triangle()]);
        let below = Polygon::new(vec![
            DVec3::new(0.0, 0.0, -1.0),
            DVec3::new(1.0, 0.0, -1.0),
            DVec3::new(0.0, 1.0, -1.0),
        ])
        .unwrap();
        let above = Polygon::new(vec![
            DVec3::new(0.0, 0.0, 1.0),
            DVec3::new(1.0, 0.0, 1.0),
            DVec3::new(0.0, 1.0, 1.0),
        ])
        .unwrap();
        let kept = node.clip_polygons(vec![below, above]);
        assert_eq!(kept.len(), 1);
        assert!(kept[0].vertices[0].z > 0.0);
    }

    #[test]
    fn test_deep_chain_on_small_stack() {
        // Stacked parallel faces each lie in front of the last, so the tree is a chain
        let polygons: Vec<Polygon> = (0..5000)
            .map(|i| {
                let z = DVec3::Z * (i as f64 * 0.01);
                Polygon::new(vec![z, z + DVec3::X, z + DVec3::Y]).unwrap()
            })
            .collect();
        let count = polygons.len();
        let handle = std::thread::Builder::new()
            .stack_size(128 * 1024)
            .spawn(move || {
                let mut node = BspNode::new(polygons);
                let depth = node.depth();
                node.invert();
                node.clip_to(&BspNode::new(Vec::new()));
                (depth, node.all_polygons().len())
            })
            .unwrap();
        let (depth, total) = handle.join().unwrap();
        assert_eq!(depth, count);
        assert_eq!(total, count);
    }
}
