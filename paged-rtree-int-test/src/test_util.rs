use paged_rtree::{NodeStore, RTree, RTreeResult, Rect, RecordId, TreeConfig};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::path::PathBuf;
use tempfile::TempDir;

/// Runs a test between a setup and a teardown step. The teardown runs even
/// when the test fails or panics; the failure is reported afterwards.
pub fn run_test<T, B, A>(before: B, test: T, after: A)
where
    T: FnOnce(&TestContext) -> RTreeResult<()>,
    B: FnOnce() -> RTreeResult<TestContext>,
    A: FnOnce(TestContext) -> RTreeResult<()>,
{
    let ctx = match before() {
        Ok(ctx) => ctx,
        Err(e) => panic!("Before run failed: {:?}", e),
    };

    let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| test(&ctx)));

    let after_result = after(ctx);
    match result {
        Ok(Ok(())) => {}
        Ok(Err(e)) => panic!("Test failed: {:?}", e),
        Err(panic) => std::panic::resume_unwind(panic),
    }
    if let Err(e) = after_result {
        panic!("After run failed: {:?}", e);
    }
}

/// Scratch directory and tree configuration for one test.
pub struct TestContext {
    dir: TempDir,
    config: TreeConfig,
}

impl TestContext {
    pub fn new(dir: TempDir, config: TreeConfig) -> Self {
        Self { dir, config }
    }

    /// Path of a file inside the test's scratch directory.
    pub fn path(&self, name: &str) -> PathBuf {
        self.dir.path().join(name)
    }

    pub fn config(&self) -> TreeConfig {
        self.config.clone()
    }
}

/// Two-dimensional context with node and leaf capacity 4, small enough for
/// a few dozen entries to build a multi-level tree.
pub fn create_test_context() -> RTreeResult<TestContext> {
    create_test_context_with(small_config())
}

pub fn create_test_context_with(config: TreeConfig) -> RTreeResult<TestContext> {
    let dir = tempfile::tempdir()?;
    Ok(TestContext::new(dir, config))
}

pub fn cleanup(ctx: TestContext) -> RTreeResult<()> {
    ctx.dir.close()?;
    Ok(())
}

pub fn small_config() -> TreeConfig {
    TreeConfig::new(2).with_node_capacity(4).with_leaf_capacity(4)
}

pub fn rect2(min_x: f64, min_y: f64, max_x: f64, max_y: f64) -> Rect {
    Rect::new(vec![min_x, min_y], vec![max_x, max_y]).unwrap()
}

pub fn unit_square(x: f64, y: f64) -> Rect {
    rect2(x, y, x + 1.0, y + 1.0)
}

/// `count` disjoint unit squares laid out row by row, `columns` per row,
/// one unit apart.
pub fn grid_squares(count: u64, columns: u64) -> Vec<(Rect, RecordId)> {
    (0..count)
        .map(|i| {
            let x = (i % columns) as f64 * 2.0;
            let y = (i / columns) as f64 * 2.0;
            (unit_square(x, y), i)
        })
        .collect()
}

/// Reproducible random rectangles inside `[0, extent]^2` with sides up to
/// `max_side`.
pub fn random_rects(
    seed: u64,
    count: u64,
    extent: f64,
    max_side: f64,
) -> Vec<(Rect, RecordId)> {
    let mut rng = StdRng::seed_from_u64(seed);
    (0..count)
        .map(|i| {
            let x = rng.random_range(0.0..extent);
            let y = rng.random_range(0.0..extent);
            let w = rng.random_range(0.0..max_side);
            let h = rng.random_range(0.0..max_side);
            (rect2(x, y, x + w, y + h), i)
        })
        .collect()
}

pub fn insert_all<S: NodeStore>(
    tree: &mut RTree<S>,
    entries: &[(Rect, RecordId)],
) -> RTreeResult<()> {
    for (rect, id) in entries {
        tree.insert_record(rect.clone(), *id)?;
    }
    Ok(())
}

/// Ids overlapping `query`, sorted.
pub fn search_sorted<S: NodeStore>(
    tree: &RTree<S>,
    query: &Rect,
) -> RTreeResult<Vec<RecordId>> {
    let mut ids = tree.search_collect(query)?;
    ids.sort_unstable();
    Ok(ids)
}

/// Asserts that a tree passes its integrity check, printing every
/// violation otherwise.
pub fn assert_sound<S: NodeStore>(tree: &RTree<S>) {
    let report = tree.check_integrity().unwrap();
    assert!(
        report.is_valid(),
        "integrity violations: {:#?}\n{}",
        report.errors,
        tree.dump().unwrap_or_default()
    );
}
