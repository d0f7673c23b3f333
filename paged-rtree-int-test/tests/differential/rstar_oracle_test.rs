//! Compares query answers against `rstar` over the same random workload.

use std::ops::ControlFlow;

use paged_rtree::{NodeStore, RTree, RTreeResult, Rect, RecordId, SplitMethod};
use paged_rtree_int_test::test_util::{
    assert_sound, cleanup, create_test_context, create_test_context_with, rect2, run_test,
    small_config,
};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rstar::primitives::{GeomWithData, Rectangle};
use rstar::AABB;

type OracleEntry = GeomWithData<Rectangle<[f64; 2]>, RecordId>;

/// The reference index, kept in lockstep with the tree under test.
struct Oracle {
    tree: rstar::RTree<OracleEntry>,
}

impl Oracle {
    fn new() -> Self {
        Self {
            tree: rstar::RTree::new(),
        }
    }

    fn entry(rect: &Rect, id: RecordId) -> OracleEntry {
        GeomWithData::new(
            Rectangle::from_corners(
                [rect.min()[0], rect.min()[1]],
                [rect.max()[0], rect.max()[1]],
            ),
            id,
        )
    }

    fn envelope(query: &Rect) -> AABB<[f64; 2]> {
        AABB::from_corners(
            [query.min()[0], query.min()[1]],
            [query.max()[0], query.max()[1]],
        )
    }

    fn insert(&mut self, rect: &Rect, id: RecordId) {
        self.tree.insert(Self::entry(rect, id));
    }

    fn remove(&mut self, rect: &Rect, id: RecordId) -> bool {
        self.tree.remove(&Self::entry(rect, id)).is_some()
    }

    fn overlapping(&self, query: &Rect) -> Vec<RecordId> {
        let mut ids: Vec<_> = self
            .tree
            .locate_in_envelope_intersecting(&Self::envelope(query))
            .map(|entry| entry.data)
            .collect();
        ids.sort_unstable();
        ids
    }

    fn contained(&self, query: &Rect) -> Vec<RecordId> {
        let mut ids: Vec<_> = self
            .tree
            .locate_in_envelope(&Self::envelope(query))
            .map(|entry| entry.data)
            .collect();
        ids.sort_unstable();
        ids
    }
}

fn random_rect(rng: &mut StdRng) -> Rect {
    let x = rng.random_range(0.0..100.0);
    let y = rng.random_range(0.0..100.0);
    let w = rng.random_range(0.0..8.0);
    let h = rng.random_range(0.0..8.0);
    rect2(x, y, x + w, y + h)
}

fn contained_sorted<S: NodeStore>(tree: &RTree<S>, query: &Rect) -> RTreeResult<Vec<RecordId>> {
    let mut ids = Vec::new();
    tree.search_contained(query, |id, _| {
        ids.push(id);
        ControlFlow::Continue(())
    })?;
    ids.sort_unstable();
    Ok(ids)
}

fn compare_queries<S: NodeStore>(
    tree: &RTree<S>,
    oracle: &Oracle,
    rng: &mut StdRng,
    rounds: usize,
) -> RTreeResult<()> {
    for _ in 0..rounds {
        let x = rng.random_range(-5.0..100.0);
        let y = rng.random_range(-5.0..100.0);
        let side = rng.random_range(0.0..30.0);
        let query = rect2(x, y, x + side, y + side);

        let mut found = tree.search_collect(&query)?;
        found.sort_unstable();
        assert_eq!(found, oracle.overlapping(&query), "overlap query {}", query);
        assert_eq!(
            contained_sorted(tree, &query)?,
            oracle.contained(&query),
            "containment query {}",
            query
        );
    }
    Ok(())
}

/// Random interleaving of inserts and deletes, checked against the oracle
/// after every batch.
fn random_workload<S: NodeStore>(tree: &mut RTree<S>, seed: u64) -> RTreeResult<()> {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut oracle = Oracle::new();
    let mut live: Vec<(Rect, RecordId)> = Vec::new();
    let mut next_id = 0;

    for batch in 0..12 {
        for _ in 0..60 {
            if live.is_empty() || rng.random_bool(0.65) {
                let rect = random_rect(&mut rng);
                tree.insert_record(rect.clone(), next_id)?;
                oracle.insert(&rect, next_id);
                live.push((rect, next_id));
                next_id += 1;
            } else {
                let (rect, id) = live.swap_remove(rng.random_range(0..live.len()));
                tree.delete_record(&rect, id)?;
                assert!(oracle.remove(&rect, id));
            }
        }
        assert_eq!(tree.len(), oracle.tree.size() as u64, "batch {}", batch);
        compare_queries(tree, &oracle, &mut rng, 20)?;
        assert_sound(tree);
    }

    while let Some((rect, id)) = live.pop() {
        tree.delete_record(&rect, id)?;
        oracle.remove(&rect, id);
    }
    assert!(tree.is_empty());
    assert_eq!(tree.height(), 1);
    assert_eq!(tree.store().node_count(), 1);
    Ok(())
}

#[test]
fn test_memory_tree_matches_rstar() {
    run_test(
        create_test_context,
        |ctx| {
            let mut tree = RTree::in_memory(ctx.config())?;
            random_workload(&mut tree, 1)
        },
        cleanup,
    )
}

#[test]
fn test_quadratic_tree_matches_rstar() {
    run_test(
        || create_test_context_with(small_config().with_split_method(SplitMethod::Quadratic)),
        |ctx| {
            let mut tree = RTree::in_memory(ctx.config())?;
            random_workload(&mut tree, 2)
        },
        cleanup,
    )
}

#[test]
fn test_disk_tree_matches_rstar() {
    run_test(
        || create_test_context_with(small_config().with_leaf_capacity(7)),
        |ctx| {
            let mut tree = RTree::create(ctx.path("oracle.rtree"), ctx.config())?;
            random_workload(&mut tree, 3)
        },
        cleanup,
    )
}

#[test]
fn test_default_capacity_matches_rstar() {
    run_test(
        || create_test_context_with(paged_rtree::TreeConfig::new(2)),
        |ctx| {
            let mut tree = RTree::create(ctx.path("default.rtree"), ctx.config())?;
            random_workload(&mut tree, 4)
        },
        cleanup,
    )
}
