use paged_rtree::{NodeStore, RTree, RTreeResult, Rect, RecordId, SplitMethod, TreeConfig};
use paged_rtree_int_test::test_util::{
    assert_sound, cleanup, create_test_context_with, run_test, search_sorted,
};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

fn random_rect(rng: &mut StdRng, dimensions: usize) -> Rect {
    let min: Vec<f64> = (0..dimensions).map(|_| rng.random_range(0.0..50.0)).collect();
    let max = min.iter().map(|lo| lo + rng.random_range(0.0..4.0)).collect();
    Rect::new(min, max).unwrap()
}

/// Inserts and deletes at random, checking every structural invariant
/// after each step.
fn churn<S: NodeStore>(tree: &mut RTree<S>, seed: u64, steps: usize) -> RTreeResult<()> {
    let dimensions = tree.config().dimensions();
    let mut rng = StdRng::seed_from_u64(seed);
    let mut live: Vec<(Rect, RecordId)> = Vec::new();

    for step in 0..steps as u64 {
        if live.len() < 8 || rng.random_bool(0.6) {
            let rect = random_rect(&mut rng, dimensions);
            tree.insert_record(rect.clone(), step)?;
            live.push((rect, step));
        } else {
            let (rect, id) = live.swap_remove(rng.random_range(0..live.len()));
            tree.delete_record(&rect, id)?;
            assert!(!tree.remove(&rect, id)?);
        }
        assert_eq!(tree.len(), live.len() as u64);
        assert_sound(tree);
    }

    let everything = tree.cover()?;
    let mut expected: Vec<_> = live.iter().map(|(_, id)| *id).collect();
    expected.sort_unstable();
    assert_eq!(search_sorted(tree, &everything)?, expected);
    Ok(())
}

fn churn_in_memory(config: TreeConfig, seed: u64) {
    run_test(
        || create_test_context_with(config),
        |ctx| {
            let mut tree = RTree::in_memory(ctx.config())?;
            churn(&mut tree, seed, 400)
        },
        cleanup,
    )
}

#[test]
fn test_minimum_capacity() {
    churn_in_memory(TreeConfig::new(2).with_node_capacity(3).with_leaf_capacity(3), 10);
}

#[test]
fn test_uneven_capacities() {
    churn_in_memory(TreeConfig::new(2).with_node_capacity(5).with_leaf_capacity(9), 11);
    churn_in_memory(TreeConfig::new(2).with_node_capacity(8).with_leaf_capacity(3), 12);
}

#[test]
fn test_quadratic_split() {
    churn_in_memory(
        TreeConfig::new(2)
            .with_node_capacity(6)
            .with_leaf_capacity(6)
            .with_split_method(SplitMethod::Quadratic),
        13,
    );
}

#[test]
fn test_one_dimension() {
    churn_in_memory(TreeConfig::new(1).with_node_capacity(4).with_leaf_capacity(4), 14);
}

#[test]
fn test_three_dimensions() {
    churn_in_memory(TreeConfig::new(3).with_node_capacity(6).with_leaf_capacity(5), 15);
}

#[test]
fn test_disk_churn() {
    let config = TreeConfig::new(3).with_node_capacity(4).with_leaf_capacity(4);
    run_test(
        || create_test_context_with(config),
        |ctx| {
            let mut tree = RTree::create(ctx.path("churn.rtree"), ctx.config())?;
            churn(&mut tree, 16, 300)?;
            let live = tree.store().node_count() as u64;
            let free = tree.store().free_pages().len() as u64;
            let slots = (tree.store().next_position() - 128) / tree.store().page_bytes();
            assert_eq!(slots, live + free);
            Ok(())
        },
        cleanup,
    )
}
