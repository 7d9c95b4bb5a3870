use geotree::{CoordinateSystem, Envelope, SpatialPredicate, SpatialTree};
use geotree_int_test::test_util::{
    all_configs, cleanup, create_test_context, random_boxes, run_test, sorted,
};
use std::collections::HashSet;

const PREDICATES: [SpatialPredicate; 7] = [
    SpatialPredicate::Intersects,
    SpatialPredicate::Contains,
    SpatialPredicate::Within,
    SpatialPredicate::Disjoint,
    SpatialPredicate::Touches,
    SpatialPredicate::Equals,
    SpatialPredicate::Overlaps,
];

fn extent_2d() -> Envelope {
    Envelope::from_ranges([(0.0, 200.0), (0.0, 200.0)])
}

#[test]
fn test_predicates_match_brute_force() {
    let crs = CoordinateSystem::cartesian(2).shared();
    for config in all_configs(&extent_2d()) {
        let tolerance = config.equals_tolerance;
        run_test(
            || create_test_context(crs.clone(), config.clone()),
            |ctx| {
                let tree = ctx.tree();
                let data = random_boxes(&ctx.crs(), 3, 300, 200.0, 30.0);
                for (id, boundary) in data.iter().enumerate() {
                    tree.insert(boundary, id as u64)?;
                }
                let mut queries = random_boxes(&ctx.crs(), 4, 15, 200.0, 80.0);
                // Exact copies exercise EQUALS, and snapped edges exercise TOUCHES.
                queries.push(data[17].clone());
                queries.push(ctx.boundary(&[
                    (data[40].envelope().max(0), data[40].envelope().max(0) + 10.0),
                    (data[40].envelope().min(1), data[40].envelope().max(1)),
                ])?);

                for query in &queries {
                    for predicate in PREDICATES {
                        let expected: Vec<u64> = data
                            .iter()
                            .enumerate()
                            .filter(|(_, b)| {
                                predicate.matches(b.envelope(), query.envelope(), tolerance)
                            })
                            .map(|(id, _)| id as u64)
                            .collect();
                        assert_eq!(
                            sorted(tree.find(predicate, query)?),
                            sorted(expected),
                            "{} on {}",
                            predicate,
                            query.envelope()
                        );
                    }
                }
                Ok(())
            },
            |ctx| cleanup(ctx),
        )
    }
}

#[test]
fn test_overlaps_disjoint_touches_partition_dataset() {
    let crs = CoordinateSystem::cartesian(2).shared();
    for config in all_configs(&extent_2d()) {
        run_test(
            || create_test_context(crs.clone(), config.clone()),
            |ctx| {
                let tree = ctx.tree();
                // Integer grid coordinates make touching boxes common.
                for id in 0..400u64 {
                    let x = (id % 20) as f64 * 10.0;
                    let y = (id / 20) as f64 * 10.0;
                    let side = 5.0 + (id % 3) as f64 * 5.0;
                    tree.insert(&ctx.boundary(&[(x, x + side), (y, y + side)])?, id)?;
                }
                let all: HashSet<u64> = (0..400).collect();

                for query in [
                    ctx.boundary(&[(20.0, 60.0), (30.0, 90.0)])?,
                    ctx.boundary(&[(0.0, 10.0), (0.0, 10.0)])?,
                    ctx.boundary(&[(95.0, 95.0), (0.0, 200.0)])?,
                    ctx.boundary(&[(500.0, 600.0), (500.0, 600.0)])?,
                ] {
                    let overlaps: HashSet<u64> =
                        tree.find(SpatialPredicate::Overlaps, &query)?.into_iter().collect();
                    let disjoint: HashSet<u64> =
                        tree.find(SpatialPredicate::Disjoint, &query)?.into_iter().collect();
                    let touches: HashSet<u64> =
                        tree.find(SpatialPredicate::Touches, &query)?.into_iter().collect();
                    let intersects: HashSet<u64> = tree
                        .find(SpatialPredicate::Intersects, &query)?
                        .into_iter()
                        .collect();

                    assert!(overlaps.is_disjoint(&disjoint));
                    assert!(touches.is_disjoint(&disjoint));
                    assert!(touches.is_disjoint(&overlaps));

                    let union: HashSet<u64> =
                        overlaps.iter().chain(&disjoint).chain(&touches).copied().collect();
                    assert_eq!(union, all);

                    let intersecting: HashSet<u64> =
                        overlaps.union(&touches).copied().collect();
                    assert_eq!(intersecting, intersects);
                    let complement: HashSet<u64> = all.difference(&intersects).copied().collect();
                    assert_eq!(disjoint, complement);
                }
                Ok(())
            },
            |ctx| cleanup(ctx),
        )
    }
}

#[test]
fn test_contains_and_within_are_converse() {
    let crs = CoordinateSystem::cartesian(2).shared();
    for config in all_configs(&extent_2d()) {
        run_test(
            || create_test_context(crs.clone(), config.clone()),
            |ctx| {
                let tree = ctx.tree();
                tree.insert(&ctx.boundary(&[(0.0, 100.0), (0.0, 100.0)])?, 1)?;
                tree.insert(&ctx.boundary(&[(10.0, 20.0), (10.0, 20.0)])?, 2)?;
                tree.insert(&ctx.boundary(&[(12.0, 14.0), (12.0, 14.0)])?, 3)?;
                tree.insert(&ctx.boundary(&[(10.0, 20.0), (10.0, 20.0)])?, 4)?;

                let query = ctx.boundary(&[(10.0, 20.0), (10.0, 20.0)])?;
                assert_eq!(tree.find(SpatialPredicate::Contains, &query)?, vec![1]);
                assert_eq!(tree.find(SpatialPredicate::Within, &query)?, vec![3]);
                assert_eq!(sorted(tree.find(SpatialPredicate::Equals, &query)?), vec![2, 4]);
                assert_eq!(sorted(tree.find_contained_keys(&query)?), vec![2, 3, 4]);
                Ok(())
            },
            |ctx| cleanup(ctx),
        )
    }
}
