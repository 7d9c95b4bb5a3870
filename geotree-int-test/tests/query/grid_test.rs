use geotree::{CoordinateSystem, Envelope, SpatialPredicate, SpatialTree};
use geotree_int_test::test_util::{
    all_configs, cleanup, create_test_context, run_test, sorted, TestContext,
};

const SPACING: f64 = 20.0;

/// Id of the grid cell at integer position `(i, j, k)`.
fn cell_id(i: usize, j: usize, k: usize) -> u64 {
    (i * 9 + j * 3 + k) as u64
}

/// Inserts a 3x3x3 grid of unit boxes spaced 20 units apart.
fn insert_grid(ctx: &TestContext) -> geotree::IndexResult<()> {
    let tree = ctx.tree();
    for i in 0..3 {
        for j in 0..3 {
            for k in 0..3 {
                let (x, y, z) = (i as f64 * SPACING, j as f64 * SPACING, k as f64 * SPACING);
                let boundary = ctx.boundary(&[(x, x + 1.0), (y, y + 1.0), (z, z + 1.0)])?;
                tree.insert(&boundary, cell_id(i, j, k))?;
            }
        }
    }
    Ok(())
}

fn grid_extent() -> Envelope {
    Envelope::from_ranges([(0.0, 41.0), (0.0, 41.0), (0.0, 41.0)])
}

#[test]
fn test_middle_band_along_each_axis() {
    let crs = CoordinateSystem::cartesian(3).shared();
    for config in all_configs(&grid_extent()) {
        run_test(
            || create_test_context(crs.clone(), config.clone()),
            |ctx| {
                insert_grid(&ctx)?;
                let tree = ctx.tree();
                assert_eq!(tree.size(), 27);

                for axis in 0..3 {
                    // The middle third of the grid along `axis`, everything on the others.
                    let mut ranges = [(-10.0, 60.0); 3];
                    ranges[axis] = (10.0, 30.0);
                    let band = ctx.boundary(&ranges)?;

                    let mut expected = Vec::new();
                    for i in 0..3 {
                        for j in 0..3 {
                            for k in 0..3 {
                                if [i, j, k][axis] == 1 {
                                    expected.push(cell_id(i, j, k));
                                }
                            }
                        }
                    }
                    let hits = sorted(tree.find_intersecting_keys(&band)?);
                    assert_eq!(hits.len(), 9);
                    assert_eq!(hits, sorted(expected.clone()));
                    // The band fully covers those boxes.
                    assert_eq!(sorted(tree.find(SpatialPredicate::Within, &band)?), sorted(expected));
                }
                Ok(())
            },
            |ctx| cleanup(ctx),
        )
    }
}

#[test]
fn test_single_cell_queries() {
    let crs = CoordinateSystem::cartesian(3).shared();
    for config in all_configs(&grid_extent()) {
        run_test(
            || create_test_context(crs.clone(), config.clone()),
            |ctx| {
                insert_grid(&ctx)?;
                let tree = ctx.tree();

                let center = ctx.boundary(&[(20.0, 21.0), (20.0, 21.0), (20.0, 21.0)])?;
                assert_eq!(tree.find(SpatialPredicate::Equals, &center)?, vec![cell_id(1, 1, 1)]);
                assert_eq!(tree.find_contained_keys(&center)?, vec![cell_id(1, 1, 1)]);

                // Empty space between cells.
                let gap = ctx.boundary(&[(5.0, 15.0), (5.0, 15.0), (5.0, 15.0)])?;
                assert!(tree.find_intersecting_keys(&gap)?.is_empty());
                assert_eq!(tree.find(SpatialPredicate::Disjoint, &gap)?.len(), 27);

                // A face shared with the corner cell touches it.
                let face = ctx.boundary(&[(1.0, 5.0), (0.0, 1.0), (0.0, 1.0)])?;
                assert_eq!(tree.find(SpatialPredicate::Touches, &face)?, vec![cell_id(0, 0, 0)]);
                assert!(tree.find(SpatialPredicate::Overlaps, &face)?.is_empty());
                Ok(())
            },
            |ctx| cleanup(ctx),
        )
    }
}
