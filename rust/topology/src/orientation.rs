// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Orientation propagation over the neighbour graph.
//!
//! Starting from the entry element, every neighbour is compared with the
//! element it was reached from and inverted when the two disagree. Elements
//! not reachable from the entry seed further passes, so a disconnected
//! component is oriented piecewise. Meeting an already visited element that
//! disagrees means no consistent orientation exists; all flips of the pass are
//! then undone.

use rustc_hash::FxHashSet;
use smallvec::SmallVec;

use crate::component::Component;
use crate::contact::NetSimplex;
use crate::error::{Error, Result};
use crate::keys::ElementKey;
use crate::spatial::SpatialAccess;

impl<S: NetSimplex, I: SpatialAccess> Component<S, I> {
    /// Whether the elements glued through `slot` of `current` agree.
    fn agrees_across(&self, current: ElementKey, slot: usize, neighbour: ElementKey) -> Result<bool> {
        let a = self.element_ref(current)?;
        let b = self.element_ref(neighbour)?;
        let back = b
            .slot_of(current)
            .ok_or_else(|| Error::Update(format!("element {} lacks a back-link to {}", b.id(), a.id())))?;
        Ok(S::orientation_agrees(a.shape(), slot, b.shape(), back, &self.eps))
    }

    fn flip(&mut self, key: ElementKey) -> Result<()> {
        self.element_mut(key)?.invert_orientation();
        Ok(())
    }

    /// Makes neighbouring elements agree in orientation.
    ///
    /// Idempotent: a second call flips nothing. Fails with `NonOrientable`,
    /// leaving every element as it was, when the surface admits no consistent
    /// orientation.
    pub fn make_orientation_consistent(&mut self) -> Result<()> {
        let mut visited: FxHashSet<ElementKey> = FxHashSet::default();
        let mut flipped: Vec<ElementKey> = Vec::new();

        let mut seeds: Vec<ElementKey> = self.entry().into_iter().collect();
        seeds.extend(self.keys_by_id());

        for seed in seeds {
            if !visited.insert(seed) {
                continue;
            }
            if let Err(e) = self.propagate_from(seed, &mut visited, &mut flipped) {
                for key in flipped.iter().rev() {
                    self.flip(*key)?;
                }
                tracing::debug!(kind = S::NAME, undone = flipped.len(), "Orientation pass rolled back");
                return Err(e);
            }
        }

        self.oriented = true;
        if !flipped.is_empty() {
            self.snapshot = None;
        }
        tracing::debug!(kind = S::NAME, elements = self.len(), flipped = flipped.len(), "Orientation consistent");
        Ok(())
    }

    fn propagate_from(
        &mut self,
        seed: ElementKey,
        visited: &mut FxHashSet<ElementKey>,
        flipped: &mut Vec<ElementKey>,
    ) -> Result<()> {
        if self.element_ref(seed)?.shape().seed_needs_inversion() {
            self.flip(seed)?;
            flipped.push(seed);
        }

        // (slot of current, neighbour, current)
        let mut stack: Vec<(usize, ElementKey, ElementKey)> =
            self.element_ref(seed)?.linked().map(|(slot, n)| (slot, n, seed)).collect();

        while let Some((slot, neighbour, current)) = stack.pop() {
            let agrees = self.agrees_across(current, slot, neighbour)?;
            if visited.contains(&neighbour) {
                if !agrees {
                    return Err(Error::NonOrientable);
                }
                continue;
            }
            if !agrees {
                self.flip(neighbour)?;
                flipped.push(neighbour);
            }
            visited.insert(neighbour);
            stack.extend(
                self.element_ref(neighbour)?
                    .linked()
                    .filter(|(_, next)| *next != current)
                    .map(|(s, next)| (s, next, neighbour)),
            );
        }
        Ok(())
    }

    /// Inverts every element. Consistency between neighbours is preserved.
    pub fn invert_orientation(&mut self) -> Result<()> {
        for key in self.keys_by_id() {
            self.flip(key)?;
        }
        self.snapshot = None;
        tracing::debug!(kind = S::NAME, elements = self.len(), "Inverted component orientation");
        Ok(())
    }

    /// Orients a freshly linked element against its neighbours in an
    /// oriented component. Clears the oriented flag if that is impossible.
    pub(crate) fn orient_new_element(&mut self, key: ElementKey) -> Result<()> {
        let links: SmallVec<[(usize, ElementKey); 4]> = self.element_ref(key)?.linked().collect();
        let Some(&(_, first)) = links.first() else {
            if self.len() == 1 {
                if self.element_ref(key)?.shape().seed_needs_inversion() {
                    self.flip(key)?;
                }
            } else {
                self.oriented = false;
            }
            return Ok(());
        };

        let back_slot = |c: &Self, neighbour: ElementKey| -> Result<usize> {
            c.element_ref(neighbour)?
                .slot_of(key)
                .ok_or_else(|| Error::Update("new element lacks a back-link".into()))
        };

        if !self.agrees_across(first, back_slot(self, first)?, key)? {
            self.flip(key)?;
        }
        for (_, neighbour) in links {
            if !self.agrees_across(neighbour, back_slot(self, neighbour)?, key)? {
                self.oriented = false;
                break;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::NetConfig;
    use geonet_geometry::{Point3, Segment3D, Simplex, Tetrahedron3D, Triangle3D};

    fn config() -> NetConfig {
        NetConfig::with_epsilon(1e-9)
    }

    fn p(x: f64, y: f64, z: f64) -> Point3<f64> {
        Point3::new(x, y, z)
    }

    fn tri(a: Point3<f64>, b: Point3<f64>, c: Point3<f64>) -> Triangle3D {
        Triangle3D::new(a, b, c, &config().geo_epsilon().unwrap()).unwrap()
    }

    fn normals<I: SpatialAccess>(c: &Component<Triangle3D, I>) -> Vec<f64> {
        let mut zs: Vec<f64> = c.elements().map(|(_, e)| e.shape().normal().z).collect();
        zs.sort_by(f64::total_cmp);
        zs
    }

    #[test]
    fn flipped_neighbour_is_corrected() {
        let shapes = vec![
            tri(p(0.0, 0.0, 0.0), p(1.0, 0.0, 0.0), p(1.0, 1.0, 0.0)),
            // Wound clockwise seen from +z.
            tri(p(0.0, 0.0, 0.0), p(0.0, 1.0, 0.0), p(1.0, 1.0, 0.0)),
            tri(p(0.0, 1.0, 0.0), p(1.0, 1.0, 0.0), p(0.5, 2.0, 0.0)).inverted(),
        ];
        let mut c: Component<Triangle3D> = Component::from_elements(&config(), shapes).unwrap();
        c.make_orientation_consistent().unwrap();
        assert!(c.is_oriented());
        let zs = normals(&c);
        assert!(zs.iter().all(|z| *z > 0.0) || zs.iter().all(|z| *z < 0.0));
        c.validate().unwrap();
    }

    #[test]
    fn second_pass_is_a_no_op() {
        let shapes = vec![
            tri(p(0.0, 0.0, 0.0), p(1.0, 0.0, 0.0), p(1.0, 1.0, 0.0)),
            tri(p(0.0, 0.0, 0.0), p(0.0, 1.0, 0.0), p(1.0, 1.0, 0.0)),
        ];
        let mut c: Component<Triangle3D> = Component::from_elements(&config(), shapes).unwrap();
        c.make_orientation_consistent().unwrap();
        let snapshot: Vec<_> = c.elements().map(|(_, e)| *e.shape()).collect();
        c.make_orientation_consistent().unwrap();
        let again: Vec<_> = c.elements().map(|(_, e)| *e.shape()).collect();
        assert_eq!(snapshot, again);
    }

    #[test]
    fn mobius_strip_is_not_orientable() {
        // Six quads around a circle; the rulings turn by half a revolution,
        // so the last quad closes onto the first with its sides swapped.
        let eps = config().geo_epsilon().unwrap();
        let n = 6;
        let (mut a, mut b) = (Vec::new(), Vec::new());
        for i in 0..n {
            let theta = std::f64::consts::TAU * i as f64 / n as f64;
            let centre = p(3.0 * theta.cos(), 3.0 * theta.sin(), 0.0);
            let ruling = nalgebra::Vector3::new(
                (theta / 2.0).cos() * theta.cos(),
                (theta / 2.0).cos() * theta.sin(),
                (theta / 2.0).sin(),
            );
            a.push(centre + ruling);
            b.push(centre - ruling);
        }
        a.push(b[0]);
        b.push(a[0]);

        let mut shapes = Vec::new();
        for i in 0..n {
            shapes.push(Triangle3D::new(a[i], a[i + 1], b[i + 1], &eps).unwrap());
            shapes.push(Triangle3D::new(a[i], b[i + 1], b[i], &eps).unwrap());
        }

        let mut c: Component<Triangle3D> = Component::from_elements(&config(), shapes).unwrap();
        assert!(c.is_connected());
        let before: Vec<_> = c.elements().map(|(_, e)| *e.shape()).collect();
        assert!(matches!(c.make_orientation_consistent(), Err(Error::NonOrientable)));
        let after: Vec<_> = c.elements().map(|(_, e)| *e.shape()).collect();
        assert_eq!(before, after);
        assert!(!c.is_oriented());
        c.validate().unwrap();
    }

    #[test]
    fn segment_chain_runs_end_to_start() {
        let eps = config().geo_epsilon().unwrap();
        let shapes = vec![
            Segment3D::new(p(0.0, 0.0, 0.0), p(1.0, 0.0, 0.0), &eps).unwrap(),
            Segment3D::new(p(2.0, 0.0, 0.0), p(1.0, 0.0, 0.0), &eps).unwrap(),
            Segment3D::new(p(2.0, 0.0, 0.0), p(3.0, 0.0, 0.0), &eps).unwrap(),
        ];
        let mut c: Component<Segment3D> = Component::from_elements(&config(), shapes).unwrap();
        c.make_orientation_consistent().unwrap();
        let dirs: Vec<f64> = c.elements().map(|(_, e)| e.shape().vector().x).collect();
        assert!(dirs.iter().all(|x| *x > 0.0) || dirs.iter().all(|x| *x < 0.0));
    }

    #[test]
    fn tetrahedra_become_positive() {
        let eps = config().geo_epsilon().unwrap();
        let a = Tetrahedron3D::new(p(0.0, 0.0, 0.0), p(1.0, 0.0, 0.0), p(0.0, 1.0, 0.0), p(0.0, 0.0, 1.0), &eps)
            .unwrap();
        let b = Tetrahedron3D::new(p(1.0, 0.0, 0.0), p(0.0, 1.0, 0.0), p(0.0, 0.0, 1.0), p(1.0, 1.0, 1.0), &eps)
            .unwrap();
        let mut c: Component<Tetrahedron3D> = Component::from_elements(&config(), vec![a.inverted(), b]).unwrap();
        c.make_orientation_consistent().unwrap();
        assert!(c.elements().all(|(_, e)| e.shape().signed_volume() > 0.0));
        c.validate().unwrap();
    }

    #[test]
    fn insertion_into_oriented_component_aligns_newcomer() {
        let mut c: Component<Triangle3D> = Component::from_elements(
            &config(),
            vec![tri(p(0.0, 0.0, 0.0), p(1.0, 0.0, 0.0), p(1.0, 1.0, 0.0))],
        )
        .unwrap();
        c.make_orientation_consistent().unwrap();
        c.add_element(tri(p(0.0, 0.0, 0.0), p(0.0, 1.0, 0.0), p(1.0, 1.0, 0.0))).unwrap();
        assert!(c.is_oriented());
        let zs = normals(&c);
        assert!(zs.iter().all(|z| *z > 0.0));
    }
}
