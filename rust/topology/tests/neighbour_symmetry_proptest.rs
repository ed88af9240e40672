// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Random insert/remove sequences keep neighbour links reciprocal, the
//! spatial index in step, and every component connected.

use geonet_geometry::{Point3, Segment3D, Triangle3D};
use geonet_topology::{Component, NetSimplex, NetConfig, SegmentNet, SpatialAccess, TriangleNet};
use proptest::prelude::*;

const GRID: usize = 3;

fn config() -> NetConfig {
    NetConfig::with_epsilon(1e-9)
}

/// Both triangles of every cell of a GRID x GRID square grid, plus a few
/// shapes that overlap the grid.
fn triangle_pool() -> Vec<Triangle3D> {
    let eps = config().geo_epsilon().unwrap();
    let p = |x: usize, y: usize| Point3::new(x as f64, y as f64, 0.0);
    let mut pool = Vec::new();
    for y in 0..GRID {
        for x in 0..GRID {
            pool.push(Triangle3D::new(p(x, y), p(x + 1, y), p(x + 1, y + 1), &eps).unwrap());
            pool.push(Triangle3D::new(p(x, y), p(x + 1, y + 1), p(x, y + 1), &eps).unwrap());
        }
    }
    pool.push(
        Triangle3D::new(Point3::new(0.5, 0.5, 0.0), Point3::new(1.5, 0.5, 0.0), Point3::new(0.5, 1.5, 0.0), &eps)
            .unwrap(),
    );
    pool.push(
        Triangle3D::new(Point3::new(1.5, 1.5, -1.0), Point3::new(1.5, 1.5, 1.0), Point3::new(2.5, 0.5, 0.0), &eps)
            .unwrap(),
    );
    pool
}

fn segment_pool() -> Vec<Segment3D> {
    let eps = config().geo_epsilon().unwrap();
    let p = |x: usize, y: usize| Point3::new(x as f64, y as f64, 0.0);
    let mut pool = Vec::new();
    for y in 0..=GRID {
        for x in 0..GRID {
            pool.push(Segment3D::new(p(x, y), p(x + 1, y), &eps).unwrap());
            pool.push(Segment3D::new(p(y, x), p(y, x + 1), &eps).unwrap());
        }
    }
    pool
}

fn assert_reciprocal<S: NetSimplex, I: SpatialAccess>(component: &Component<S, I>) -> Result<(), TestCaseError> {
    for (key, element) in component.elements() {
        for (slot, neighbour) in element.linked() {
            let other = component.element(neighbour);
            prop_assert!(other.is_some(), "dangling link from slot {}", slot);
            prop_assert!(other.and_then(|o| o.slot_of(key)).is_some(), "missing back-link");
        }
    }
    Ok(())
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn triangle_nets_stay_consistent(ops in prop::collection::vec((any::<bool>(), 0usize..(2 * GRID * GRID + 2)), 1..60)) {
        let pool = triangle_pool();
        let mut net: TriangleNet = TriangleNet::new(&config()).unwrap();
        for (insert, index) in ops {
            let shape = pool[index];
            let before = net.count_elements();
            let outcome = if insert {
                net.add_element(shape).map(|_| ())
            } else {
                net.remove_element(&shape).map(|_| ())
            };
            match outcome {
                Ok(()) if insert => prop_assert_eq!(net.count_elements(), before + 1),
                Ok(()) => prop_assert_eq!(net.count_elements(), before - 1),
                Err(_) => prop_assert_eq!(net.count_elements(), before),
            }
            prop_assert!(net.validate().is_ok());
            for component in net.components() {
                assert_reciprocal(component)?;
                prop_assert!(component.is_connected());
                prop_assert!(!component.is_empty());
            }
        }
    }

    #[test]
    fn segment_nets_stay_consistent(ops in prop::collection::vec((any::<bool>(), 0usize..(2 * GRID * (GRID + 1))), 1..80)) {
        let pool = segment_pool();
        let mut net: SegmentNet = SegmentNet::new(&config()).unwrap();
        for (insert, index) in ops {
            let shape = pool[index];
            if insert {
                let _ = net.add_element(shape);
            } else {
                let _ = net.remove_element(&shape);
            }
            prop_assert!(net.validate().is_ok());
            for component in net.components() {
                assert_reciprocal(component)?;
                prop_assert!(component.check_connectivity());
            }
        }
    }
}
