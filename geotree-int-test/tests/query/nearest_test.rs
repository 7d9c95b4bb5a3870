use geotree::{CoordinateSystem, Envelope, SpatialTree};
use geotree_int_test::test_util::{
    all_configs, cleanup, create_test_context, random_boxes, run_test,
};

fn extent_2d() -> Envelope {
    Envelope::from_ranges([(0.0, 300.0), (0.0, 300.0)])
}

#[test]
fn test_nearest_matches_brute_force() {
    let crs = CoordinateSystem::cartesian(2).shared();
    for config in all_configs(&extent_2d()) {
        run_test(
            || create_test_context(crs.clone(), config.clone()),
            |ctx| {
                let tree = ctx.tree();
                let data = random_boxes(&ctx.crs(), 8, 500, 300.0, 10.0);
                for (id, boundary) in data.iter().enumerate() {
                    tree.insert(boundary, id as u64)?;
                }

                for point in [[0.0, 0.0], [150.0, 150.0], [299.0, 12.5], [-50.0, 400.0]] {
                    let mut expected: Vec<f64> = data
                        .iter()
                        .map(|b| b.envelope().min_distance(&point))
                        .collect();
                    expected.sort_by(|a, b| a.total_cmp(b));

                    let found = tree.find_nearest(&point, 10, None)?;
                    assert_eq!(found.len(), 10);
                    for ((id, distance), want) in found.iter().zip(&expected) {
                        assert!((distance - want).abs() < 1e-9);
                        let actual = data[*id as usize].envelope().min_distance(&point);
                        assert!((actual - distance).abs() < 1e-9);
                    }
                    assert!(found.windows(2).all(|w| w[0].1 <= w[1].1));
                }
                Ok(())
            },
            |ctx| cleanup(ctx),
        )
    }
}

#[test]
fn test_find_within_distance() {
    let crs = CoordinateSystem::cartesian(2).shared();
    for config in all_configs(&extent_2d()) {
        run_test(
            || create_test_context(crs.clone(), config.clone()),
            |ctx| {
                let tree = ctx.tree();
                // Points on a circle of radius 10 and a ring of radius 50.
                for i in 0..36u64 {
                    let angle = (i as f64 * 10.0).to_radians();
                    let radius = if i % 2 == 0 { 10.0 } else { 50.0 };
                    let (x, y) = (150.0 + radius * angle.cos(), 150.0 + radius * angle.sin());
                    tree.insert(&ctx.boundary(&[(x, x), (y, y)])?, i)?;
                }

                let close = tree.find_within_distance(&[150.0, 150.0], 20.0)?;
                assert_eq!(close.len(), 18);
                assert!(close.iter().all(|(id, d)| id % 2 == 0 && (d - 10.0).abs() < 1e-9));

                let bounded = tree.find_nearest(&[150.0, 150.0], 5, Some(20.0))?;
                assert_eq!(bounded.len(), 5);

                assert!(tree.find_within_distance(&[150.0, 150.0], 5.0)?.is_empty());
                assert!(tree.find_nearest(&[150.0, 150.0], 0, None)?.is_empty());
                Ok(())
            },
            |ctx| cleanup(ctx),
        )
    }
}
