use geotree::{CoordinateSystem, Envelope, RTree, RTreeConfig, SpatialTree, TreeVariant};
use geotree_int_test::test_util::{assert_tree_invariants, random_boxes};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;

#[test]
fn test_concurrent_readers_with_single_writer() {
    let crs = CoordinateSystem::cartesian(2).shared();
    for config in [
        RTreeConfig::new(TreeVariant::Star),
        RTreeConfig::new(TreeVariant::Hilbert)
            .with_hilbert_extent(Envelope::from_ranges([(0.0, 1000.0), (0.0, 1000.0)])),
    ] {
        let tree = RTree::new(crs.clone(), config.with_capacity(4, 10)).unwrap();
        let boxes = random_boxes(&crs, 99, 2000, 1000.0, 15.0);
        let done = Arc::new(AtomicBool::new(false));

        let writer = {
            let tree = tree.clone();
            let boxes = boxes.clone();
            let done = Arc::clone(&done);
            thread::spawn(move || {
                for (id, boundary) in boxes.iter().enumerate() {
                    tree.insert(boundary, id as u64).unwrap();
                }
                for (id, boundary) in boxes.iter().enumerate().step_by(3) {
                    assert!(tree.remove(boundary, id as u64).unwrap());
                }
                done.store(true, Ordering::SeqCst);
            })
        };

        let readers: Vec<_> = (0..4)
            .map(|r| {
                let tree = tree.clone();
                let crs = crs.clone();
                let done = Arc::clone(&done);
                thread::spawn(move || {
                    let queries = random_boxes(&crs, 1000 + r, 50, 1000.0, 200.0);
                    let mut rounds = 0;
                    while !done.load(Ordering::SeqCst) || rounds == 0 {
                        for query in &queries {
                            for id in tree.find_intersecting_keys(query).unwrap() {
                                assert!(id < 2000);
                            }
                        }
                        // Every snapshot a reader sees is a valid tree.
                        assert_tree_invariants(&tree);
                        rounds += 1;
                    }
                })
            })
            .collect();

        writer.join().unwrap();
        for reader in readers {
            reader.join().unwrap();
        }

        let expected = 2000 - (0..2000).step_by(3).count() as u64;
        assert_eq!(tree.size(), expected);
        assert_tree_invariants(&tree);
    }
}
