use geotree::{CoordinateSystem, Envelope, SpatialTree};
use geotree_int_test::test_util::{
    all_configs, assert_tree_invariants, cleanup, create_test_context, random_boxes, run_test,
    sorted,
};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

fn extent_2d() -> Envelope {
    Envelope::from_ranges([(0.0, 500.0), (0.0, 500.0)])
}

#[test]
fn test_random_insert_remove_sequence() {
    let crs = CoordinateSystem::cartesian(2).shared();
    for config in all_configs(&extent_2d()) {
        run_test(
            || create_test_context(crs.clone(), config.clone()),
            |ctx| {
                let tree = ctx.tree();
                let boxes = random_boxes(&ctx.crs(), 42, 400, 500.0, 25.0);
                let mut rng = StdRng::seed_from_u64(43);
                let mut present: Vec<usize> = Vec::new();
                let mut absent: Vec<usize> = (0..boxes.len()).collect();

                for step in 0..2000 {
                    let insert = present.is_empty() || (!absent.is_empty() && rng.gen_bool(0.55));
                    if insert {
                        let i = absent.swap_remove(rng.gen_range(0..absent.len()));
                        tree.insert(&boxes[i], i as u64)?;
                        present.push(i);
                    } else {
                        let i = present.swap_remove(rng.gen_range(0..present.len()));
                        assert!(tree.remove(&boxes[i], i as u64)?);
                        absent.push(i);
                    }
                    if step % 50 == 0 {
                        assert_tree_invariants(&tree);
                    }
                }

                assert_eq!(tree.size(), present.len() as u64);
                let everything = ctx.boundary(&[(0.0, 500.0), (0.0, 500.0)])?;
                let expected = sorted(present.iter().map(|&i| i as u64).collect());
                assert_eq!(sorted(tree.find_intersecting_keys(&everything)?), expected);
                Ok(())
            },
            |ctx| cleanup(ctx),
        )
    }
}

#[test]
fn test_remove_then_reinsert_restores_results() {
    let crs = CoordinateSystem::cartesian(2).shared();
    for config in all_configs(&extent_2d()) {
        run_test(
            || create_test_context(crs.clone(), config.clone()),
            |ctx| {
                let tree = ctx.tree();
                let boxes = random_boxes(&ctx.crs(), 5, 300, 500.0, 40.0);
                for (id, boundary) in boxes.iter().enumerate() {
                    tree.insert(boundary, id as u64)?;
                }
                let queries = random_boxes(&ctx.crs(), 6, 20, 500.0, 150.0);
                let before: Vec<Vec<u64>> = queries
                    .iter()
                    .map(|q| tree.find_intersecting_keys(q).map(sorted))
                    .collect::<Result<_, _>>()?;

                for id in (0..300).step_by(7) {
                    assert!(tree.remove(&boxes[id], id as u64)?);
                    tree.insert(&boxes[id], id as u64)?;
                }
                assert_tree_invariants(&tree);

                for (query, expected) in queries.iter().zip(&before) {
                    assert_eq!(&sorted(tree.find_intersecting_keys(query)?), expected);
                }
                Ok(())
            },
            |ctx| cleanup(ctx),
        )
    }
}

#[test]
fn test_remove_missing_pair() {
    let crs = CoordinateSystem::cartesian(2).shared();
    for config in all_configs(&extent_2d()) {
        run_test(
            || create_test_context(crs.clone(), config.clone()),
            |ctx| {
                let tree = ctx.tree();
                let a = ctx.boundary(&[(1.0, 2.0), (1.0, 2.0)])?;
                let b = ctx.boundary(&[(1.0, 2.0), (1.0, 3.0)])?;
                tree.insert(&a, 1)?;

                // Wrong id, then wrong boundary: both are reported as not found.
                assert!(!tree.remove(&a, 2)?);
                assert!(!tree.remove(&b, 1)?);
                assert_eq!(tree.size(), 1);
                assert!(tree.remove(&a, 1)?);
                assert!(!tree.remove(&a, 1)?);
                Ok(())
            },
            |ctx| cleanup(ctx),
        )
    }
}

#[test]
fn test_remove_everything_collapses_root() {
    let crs = CoordinateSystem::cartesian(2).shared();
    for config in all_configs(&extent_2d()) {
        run_test(
            || create_test_context(crs.clone(), config.clone()),
            |ctx| {
                let tree = ctx.tree();
                let boxes = random_boxes(&ctx.crs(), 77, 250, 500.0, 10.0);
                for (id, boundary) in boxes.iter().enumerate() {
                    tree.insert(boundary, id as u64)?;
                }
                assert!(tree.height() > 1);

                // Remove in reverse so condensation hits every level.
                for (id, boundary) in boxes.iter().enumerate().rev() {
                    assert!(tree.remove(boundary, id as u64)?);
                    if id % 25 == 0 {
                        assert_tree_invariants(&tree);
                    }
                }

                assert!(tree.is_empty());
                assert_eq!(tree.height(), 1);
                let guard = tree.read();
                assert!(guard.root().is_leaf());
                assert!(guard.root().is_empty());
                assert!(guard.root().envelope().is_empty());
                Ok(())
            },
            |ctx| cleanup(ctx),
        )
    }
}
