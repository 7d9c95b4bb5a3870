use geotree::{
    Boundary, CoordinateSystem, Envelope, IndexResult, NodeRef, RTree, RTreeConfig, SpatialTree,
    SplitAlgorithm, TreeVariant,
};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::backtrace::Backtrace;
use std::collections::HashSet;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Instant;

/// Runs a test between a setup and a teardown step.
///
/// The teardown also runs when the test body returns an error. Failures are
/// reported with the elapsed time and a backtrace before panicking.
pub fn run_test<T, B, A>(before: B, test: T, after: A)
where
    T: Fn(TestContext) -> IndexResult<()>,
    B: Fn() -> IndexResult<TestContext>,
    A: Fn(TestContext) -> IndexResult<()>,
{
    let start_time = Instant::now();

    let result = std::panic::catch_unwind(AssertUnwindSafe(|| {
        let backtrace = Backtrace::capture();
        match before() {
            Ok(ctx) => match test(ctx.clone()) {
                Ok(_) => after(ctx)
                    .map_err(|e| (format!("After run failed: {:?}", e), backtrace.to_string())),
                Err(e) => {
                    let _ = after(ctx);
                    Err((format!("Test failed: {:?}", e), backtrace.to_string()))
                }
            },
            Err(e) => Err((format!("Before run failed: {:?}", e), backtrace.to_string())),
        }
    }));

    let elapsed = start_time.elapsed();
    let (error, backtrace) = match result {
        Ok(Ok(_)) => return,
        Ok(Err((e, bt))) => (e, bt),
        Err(panic_err) => {
            let message = if let Some(s) = panic_err.downcast_ref::<&str>() {
                s.to_string()
            } else if let Some(s) = panic_err.downcast_ref::<String>() {
                s.clone()
            } else {
                "Unknown panic".to_string()
            };
            (format!("Panic: {}", message), String::new())
        }
    };

    eprintln!("\n==================== TEST FAILED ====================");
    eprintln!("Failed after {:?}", elapsed);
    eprintln!("Error: {}", error);
    if !backtrace.is_empty() && !backtrace.contains("disabled") {
        eprintln!("\nBacktrace:\n{}", backtrace);
    }
    eprintln!("=====================================================\n");

    panic!("Test failed: {}", error);
}

/// A tree under test together with its coordinate system.
#[derive(Clone)]
pub struct TestContext {
    crs: Arc<CoordinateSystem>,
    tree: RTree,
}

impl TestContext {
    pub fn new(crs: Arc<CoordinateSystem>, tree: RTree) -> Self {
        Self { crs, tree }
    }

    pub fn crs(&self) -> Arc<CoordinateSystem> {
        self.crs.clone()
    }

    pub fn tree(&self) -> RTree {
        self.tree.clone()
    }

    /// Boundary in this context's coordinate system.
    pub fn boundary(&self, ranges: &[(f64, f64)]) -> IndexResult<Boundary> {
        Boundary::new(self.crs.clone(), ranges.iter().copied())
    }
}

/// Every variant, with small nodes so that modest datasets build deep trees.
///
/// `extent` is the Hilbert working extent.
pub fn all_configs(extent: &Envelope) -> Vec<RTreeConfig> {
    vec![
        RTreeConfig::new(TreeVariant::Basic(SplitAlgorithm::Linear)),
        RTreeConfig::new(TreeVariant::Basic(SplitAlgorithm::Quadratic)),
        RTreeConfig::new(TreeVariant::Star),
        RTreeConfig::new(TreeVariant::Hilbert).with_hilbert_extent(extent.clone()),
    ]
    .into_iter()
    .map(|config| config.with_capacity(3, 8))
    .collect()
}

pub fn create_test_context(
    crs: Arc<CoordinateSystem>,
    config: RTreeConfig,
) -> IndexResult<TestContext> {
    let tree = RTree::new(crs.clone(), config)?;
    Ok(TestContext::new(crs, tree))
}

/// Verifies the tree through integrity check and through the public node view.
pub fn cleanup(ctx: TestContext) -> IndexResult<()> {
    assert_tree_invariants(&ctx.tree);
    ctx.tree.clear()
}

/// Asserts the structural invariants using only [`NodeRef`]:
/// exact unions, fill bounds, equal leaf depth, no empty non-root node and
/// consistent parent links. Also runs the built-in integrity check.
pub fn assert_tree_invariants(tree: &RTree) {
    let report = tree.check_integrity();
    assert!(report.is_valid, "integrity errors: {:?}", report.errors);

    let config = tree.config();
    let guard = tree.read();
    let root = guard.root();
    assert!(root.parent().is_none());
    if !root.is_leaf() {
        assert!(root.len() >= 2, "branch root with {} children", root.len());
    }

    let mut leaf_depths = HashSet::new();
    let mut entries = 0u64;
    let mut stack = vec![(root, 0u32)];
    while let Some((node, depth)) = stack.pop() {
        let is_root = node.id() == root.id();
        if !is_root {
            assert!(
                node.len() >= config.min_entries && node.len() <= config.max_entries,
                "node {} holds {} items",
                node.id(),
                node.len()
            );
        }

        if node.is_leaf() {
            leaf_depths.insert(depth);
            let mut union = Envelope::empty(tree.dimension());
            for (_, envelope) in node.entries() {
                union.expand(envelope);
                entries += 1;
            }
            assert_eq!(&union, node.envelope(), "leaf {} union", node.id());
        } else {
            let mut union = Envelope::empty(tree.dimension());
            for child in node.children() {
                assert_eq!(child.parent().map(|p| p.id()), Some(node.id()));
                assert_eq!(child.level() + 1, node.level());
                union.expand(child.envelope());
                stack.push((child, depth + 1));
            }
            assert_eq!(&union, node.envelope(), "branch {} union", node.id());
        }
    }

    assert_eq!(leaf_depths.len(), 1, "leaves at depths {:?}", leaf_depths);
    assert_eq!(entries, guard.len());
}

/// Ids of every entry reachable from `node`.
pub fn collect_ids(node: NodeRef<'_>) -> Vec<u64> {
    let mut ids: Vec<u64> = node.entries().map(|(id, _)| id).collect();
    for child in node.children() {
        ids.extend(collect_ids(child));
    }
    ids
}

/// Random boxes inside `[0, span]` on every axis with sides up to `max_side`.
pub fn random_boxes(
    crs: &Arc<CoordinateSystem>,
    seed: u64,
    count: usize,
    span: f64,
    max_side: f64,
) -> Vec<Boundary> {
    let mut rng = StdRng::seed_from_u64(seed);
    (0..count)
        .map(|_| {
            let ranges: Vec<(f64, f64)> = (0..crs.dimension())
                .map(|_| {
                    let side = rng.gen_range(0.0..max_side);
                    let min = rng.gen_range(0.0..(span - side));
                    (min, min + side)
                })
                .collect();
            Boundary::new(crs.clone(), ranges).unwrap()
        })
        .collect()
}

pub fn sorted(mut ids: Vec<u64>) -> Vec<u64> {
    ids.sort_unstable();
    ids
}
