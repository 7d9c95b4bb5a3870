use geotree::{
    Boundary, CoordinateSystem, ElementMapper, Envelope, HashElementMapper, IndexResult, RTree,
    SpatialIndex, SpatialPredicate, SpatialTree,
};
use geotree_int_test::test_util::{all_configs, assert_tree_invariants};
use std::sync::Arc;
use std::thread;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct Building {
    name: String,
    /// Footprint corners in whole meters
    footprint: [(i64, i64); 2],
}

impl Building {
    fn new(name: &str, x: i64, y: i64, w: i64, h: i64) -> Self {
        Building {
            name: name.to_string(),
            footprint: [(x, x + w), (y, y + h)],
        }
    }
}

type BuildingIndex = SpatialIndex<Building, HashElementMapper<Building>>;

fn building_index(config: geotree::RTreeConfig) -> IndexResult<BuildingIndex> {
    let crs = CoordinateSystem::cartesian(2).shared();
    let tree = RTree::new(crs.clone(), config)?;
    let mapper = HashElementMapper::new(move |b: &Building| {
        Boundary::new(
            crs.clone(),
            b.footprint.iter().map(|&(min, max)| (min as f64, max as f64)),
        )
    });
    Ok(SpatialIndex::new(tree, mapper))
}

fn city_block() -> Vec<Building> {
    (0..200)
        .map(|i| {
            let (x, y) = ((i % 20) * 50, (i / 20) * 50);
            Building::new(&format!("b{}", i), x, y, 20 + i % 7, 15 + i % 5)
        })
        .collect()
}

fn extent() -> Envelope {
    Envelope::from_ranges([(0.0, 1000.0), (0.0, 500.0)])
}

fn window(index: &BuildingIndex, ranges: [(f64, f64); 2]) -> Boundary {
    Boundary::new(index.tree().coordinate_system().clone(), ranges).unwrap()
}

fn names(mut buildings: Vec<Building>) -> Vec<String> {
    buildings.sort_by(|a, b| a.name.cmp(&b.name));
    buildings.into_iter().map(|b| b.name).collect()
}

#[test]
fn test_index_objects_across_variants() {
    for config in all_configs(&extent()) {
        let index = building_index(config).unwrap();
        let buildings = city_block();
        for building in &buildings {
            assert!(index.insert(building).unwrap());
        }
        assert_eq!(index.len(), 200);
        assert_eq!(index.mapper().len(), 200);
        assert_tree_invariants(index.tree());

        // The first row of buildings, up to x = 120.
        let row = window(&index, [(0.0, 120.0), (0.0, 10.0)]);
        assert_eq!(names(index.search(&row).unwrap()), vec!["b0", "b1", "b2"]);

        // Every identifier resolves back to the object it was issued for.
        for building in &buildings {
            let id = index.mapper().tree_identifier(building).unwrap();
            assert_eq!(index.mapper().object_from_tree_identifier(id).as_ref(), Some(building));
        }
    }
}

#[test]
fn test_remove_objects() {
    for config in all_configs(&extent()) {
        let index = building_index(config).unwrap();
        let buildings = city_block();
        for building in &buildings {
            index.insert(building).unwrap();
        }
        for building in buildings.iter().step_by(2) {
            assert!(index.remove(building).unwrap());
        }
        assert!(!index.remove(&buildings[0]).unwrap());
        assert_eq!(index.len(), 100);
        assert_eq!(index.mapper().len(), 100);
        assert_tree_invariants(index.tree());

        let everything = window(&index, [(-1.0, 1001.0), (-1.0, 501.0)]);
        let remaining = index.search(&everything).unwrap();
        assert_eq!(remaining.len(), 100);
        assert!(remaining.iter().all(|b| b.name[1..].parse::<i64>().unwrap() % 2 == 1));

        // Removed objects can be indexed again under a fresh identifier.
        assert!(index.insert(&buildings[0]).unwrap());
        assert!(index.contains(&buildings[0]));
    }
}

#[test]
fn test_predicates_resolve_objects() {
    let index = building_index(geotree::RTreeConfig::default()).unwrap();
    let park = Building::new("park", 0, 0, 100, 100);
    let kiosk = Building::new("kiosk", 10, 10, 5, 5);
    let gate = Building::new("gate", 100, 40, 10, 20);
    let tower = Building::new("tower", 400, 400, 10, 10);
    for b in [&park, &kiosk, &gate, &tower] {
        index.insert(b).unwrap();
    }

    let query = window(&index, [(0.0, 100.0), (0.0, 100.0)]);
    assert_eq!(names(index.find(SpatialPredicate::Equals, &query).unwrap()), vec!["park"]);
    assert_eq!(names(index.find(SpatialPredicate::Within, &query).unwrap()), vec!["kiosk"]);
    assert_eq!(names(index.find(SpatialPredicate::Touches, &query).unwrap()), vec!["gate"]);
    assert_eq!(names(index.find(SpatialPredicate::Disjoint, &query).unwrap()), vec!["tower"]);

    let nearest = index.find_nearest(&[404.0, 390.0], 1, None).unwrap();
    assert_eq!(nearest[0].0, tower);
    assert!((nearest[0].1 - 10.0).abs() < 1e-9);
}

#[test]
fn test_shared_index_concurrent_access() {
    let index = Arc::new(building_index(geotree::RTreeConfig::default()).unwrap());
    let buildings = Arc::new(city_block());

    let writers: Vec<_> = (0..4)
        .map(|t| {
            let index = Arc::clone(&index);
            let buildings = Arc::clone(&buildings);
            thread::spawn(move || {
                for building in buildings.iter().skip(t).step_by(4) {
                    index.insert(building).unwrap();
                }
            })
        })
        .collect();
    let reader = {
        let index = Arc::clone(&index);
        thread::spawn(move || {
            let everything = window(&index, [(-1.0, 1001.0), (-1.0, 501.0)]);
            for _ in 0..50 {
                let found = index.search(&everything).unwrap();
                assert!(found.len() <= 200);
            }
        })
    };

    for writer in writers {
        writer.join().unwrap();
    }
    reader.join().unwrap();

    assert_eq!(index.len(), 200);
    assert_tree_invariants(index.tree());
    index.clear().unwrap();
    assert!(index.is_empty());
    assert!(index.mapper().is_empty());
}
