use geotree::{
    Boundary, CoordinateSystem, Envelope, RTree, RTreeConfig, SpatialTree, TreeVariant,
};
use geotree_int_test::test_util::{
    all_configs, assert_tree_invariants, cleanup, collect_ids, create_test_context, random_boxes,
    run_test, sorted,
};
use std::collections::HashSet;

fn extent_2d() -> Envelope {
    Envelope::from_ranges([(0.0, 1000.0), (0.0, 1000.0)])
}

#[test]
fn test_insert_random_boxes() {
    let crs = CoordinateSystem::cartesian(2).shared();
    for config in all_configs(&extent_2d()) {
        run_test(
            || create_test_context(crs.clone(), config.clone()),
            |ctx| {
                let tree = ctx.tree();
                for (id, boundary) in random_boxes(&ctx.crs(), 7, 600, 1000.0, 30.0)
                    .iter()
                    .enumerate()
                {
                    tree.insert(boundary, id as u64)?;
                    if id % 100 == 0 {
                        assert_tree_invariants(&tree);
                    }
                }
                assert_eq!(tree.size(), 600);
                assert!(tree.height() >= 3);
                Ok(())
            },
            |ctx| cleanup(ctx),
        )
    }
}

#[test]
fn test_root_boundary_query_returns_every_entry() {
    let crs = CoordinateSystem::cartesian(2).shared();
    for config in all_configs(&extent_2d()) {
        run_test(
            || create_test_context(crs.clone(), config.clone()),
            |ctx| {
                let tree = ctx.tree();
                let n = 333u64;
                for (id, boundary) in random_boxes(&ctx.crs(), 11, n as usize, 1000.0, 50.0)
                    .iter()
                    .enumerate()
                {
                    tree.insert(boundary, id as u64)?;
                }

                let ids = tree.find_intersecting_keys(&tree.root_boundary())?;
                assert_eq!(ids.len() as u64, n);
                let distinct: HashSet<u64> = ids.iter().copied().collect();
                assert_eq!(distinct.len() as u64, n);
                assert_eq!(sorted(ids), (0..n).collect::<Vec<_>>());

                // The node view reaches the same entries.
                let guard = tree.read();
                assert_eq!(sorted(collect_ids(guard.root())), (0..n).collect::<Vec<_>>());
                Ok(())
            },
            |ctx| cleanup(ctx),
        )
    }
}

#[test]
fn test_variants_agree_on_range_queries() {
    let crs = CoordinateSystem::cartesian(2).shared();
    let data = random_boxes(&crs, 23, 800, 1000.0, 40.0);
    let queries = random_boxes(&crs, 24, 40, 1000.0, 250.0);

    let trees: Vec<RTree> = all_configs(&extent_2d())
        .into_iter()
        .map(|config| {
            let tree = RTree::new(crs.clone(), config).unwrap();
            for (id, boundary) in data.iter().enumerate() {
                tree.insert(boundary, id as u64).unwrap();
            }
            tree
        })
        .collect();

    for query in &queries {
        let expected: Vec<u64> = sorted(
            data.iter()
                .enumerate()
                .filter(|(_, b)| b.envelope().intersects(query.envelope()))
                .map(|(id, _)| id as u64)
                .collect(),
        );
        for tree in &trees {
            assert_eq!(
                sorted(tree.find_intersecting_keys(query).unwrap()),
                expected,
                "{} tree disagrees",
                tree.variant().name()
            );
        }
    }
}

#[test]
fn test_coincident_boxes() {
    let crs = CoordinateSystem::cartesian(2).shared();
    for config in all_configs(&extent_2d()) {
        run_test(
            || create_test_context(crs.clone(), config.clone()),
            |ctx| {
                let tree = ctx.tree();
                let same = ctx.boundary(&[(5.0, 6.0), (5.0, 6.0)])?;
                for id in 0..100 {
                    tree.insert(&same, id)?;
                }
                let point = ctx.boundary(&[(500.0, 500.0), (500.0, 500.0)])?;
                for id in 100..150 {
                    tree.insert(&point, id)?;
                }
                assert_tree_invariants(&tree);
                assert_eq!(tree.find_intersecting_keys(&same)?.len(), 100);
                assert_eq!(tree.find_intersecting_keys(&point)?.len(), 50);
                Ok(())
            },
            |ctx| cleanup(ctx),
        )
    }
}

#[test]
fn test_spatio_temporal_compound_system() {
    let crs = CoordinateSystem::compound(&[
        &CoordinateSystem::cartesian(2),
        &CoordinateSystem::temporal(),
    ])
    .shared();
    assert_eq!(crs.dimension(), 3);
    assert!(crs.is_spatio_temporal());

    let extent = Envelope::from_ranges([(0.0, 100.0), (0.0, 100.0), (0.0, 1000.0)]);
    for config in all_configs(&extent) {
        run_test(
            || create_test_context(crs.clone(), config.clone()),
            |ctx| {
                let tree = ctx.tree();
                // The same place observed once per time step.
                for t in 0..100u64 {
                    let time = t as f64 * 10.0;
                    tree.insert(
                        &ctx.boundary(&[(10.0, 12.0), (10.0, 12.0), (time, time + 5.0)])?,
                        t,
                    )?;
                }
                let window = ctx.boundary(&[(0.0, 50.0), (0.0, 50.0), (100.0, 149.0)])?;
                assert_eq!(
                    sorted(tree.find_intersecting_keys(&window)?),
                    vec![10, 11, 12, 13, 14]
                );

                let elsewhere = ctx.boundary(&[(60.0, 70.0), (0.0, 50.0), (0.0, 1000.0)])?;
                assert!(tree.find_intersecting_keys(&elsewhere)?.is_empty());
                Ok(())
            },
            |ctx| cleanup(ctx),
        )
    }
}

#[test]
fn test_bulk_load_matches_incremental() {
    let crs = CoordinateSystem::cartesian(2).shared();
    let data: Vec<(Boundary, u64)> = random_boxes(&crs, 31, 1000, 1000.0, 20.0)
        .into_iter()
        .zip(0u64..)
        .collect();
    let query = Boundary::new(crs.clone(), [(200.0, 600.0), (100.0, 450.0)]).unwrap();

    let incremental = RTree::new(crs.clone(), RTreeConfig::default()).unwrap();
    for (boundary, id) in &data {
        incremental.insert(boundary, *id).unwrap();
    }
    let expected = sorted(incremental.find_intersecting_keys(&query).unwrap());

    for variant in [TreeVariant::Star, TreeVariant::Hilbert] {
        let bulk = RTree::bulk_load(crs.clone(), RTreeConfig::new(variant), data.clone()).unwrap();
        assert_tree_invariants(&bulk);
        assert_eq!(sorted(bulk.find_intersecting_keys(&query).unwrap()), expected);
    }
}

#[test]
fn test_dimension_mismatch_is_rejected() {
    let crs = CoordinateSystem::cartesian(2).shared();
    run_test(
        || create_test_context(crs.clone(), RTreeConfig::default()),
        |ctx| {
            let tree = ctx.tree();
            let crs3 = CoordinateSystem::cartesian(3).shared();
            let wrong = Boundary::new(crs3, [(0.0, 1.0); 3])?;
            assert!(tree.insert(&wrong, 1).is_err());
            assert!(tree.find_intersecting_keys(&wrong).is_err());
            assert_eq!(tree.size(), 0);
            Ok(())
        },
        |ctx| cleanup(ctx),
    )
}
