use paged_rtree::{Branch, ChildRef, Node, NodeStore, RTree, SplitMethod, TreeConfig};
use paged_rtree_int_test::test_util::{
    assert_sound, cleanup, create_test_context_with, insert_all, random_rects, rect2, run_test,
    search_sorted, unit_square,
};

fn config(method: SplitMethod) -> TreeConfig {
    TreeConfig::new(2)
        .with_node_capacity(4)
        .with_leaf_capacity(4)
        .with_split_method(method)
}

/// Fills the root leaf to capacity, then adds one more entry so it must
/// split, and checks the two halves.
fn check_root_split(method: SplitMethod) {
    run_test(
        || create_test_context_with(config(method)),
        |ctx| {
            let mut tree = RTree::in_memory(ctx.config())?;
            let squares: Vec<_> = (0..5u64)
                .map(|i| (unit_square((i * 3 % 5) as f64 * 2.0, (i % 2) as f64 * 4.0), i))
                .collect();
            insert_all(&mut tree, &squares[..4])?;
            assert_eq!(tree.height(), 1);

            let (rect, id) = &squares[4];
            assert!(tree.insert_record(rect.clone(), *id)?);

            let root: Node = tree.store().get(tree.root())?;
            assert_eq!(root.len(), 2);
            let mut members = Vec::new();
            for branch in &root.branches {
                let child = branch.child.as_node().unwrap();
                let leaf = tree.store().get(child)?;
                assert!(leaf.len() >= ctx.config().min_split_fill(0));
                assert_eq!(leaf.cover(2), branch.rect);
                members.extend(leaf.branches.iter().filter_map(|b: &Branch| b.child.as_record()));
            }
            members.sort();
            assert_eq!(members, vec![0, 1, 2, 3, 4]);
            assert_sound(&tree);
            Ok(())
        },
        cleanup,
    )
}

#[test]
fn test_rstar_root_split() {
    check_root_split(SplitMethod::RStar);
}

#[test]
fn test_quadratic_root_split() {
    check_root_split(SplitMethod::Quadratic);
}

#[test]
fn test_split_methods_answer_alike() {
    run_test(
        || create_test_context_with(config(SplitMethod::RStar)),
        |ctx| {
            let entries = random_rects(11, 300, 100.0, 5.0);
            let mut rstar = RTree::in_memory(ctx.config())?;
            let mut quadratic =
                RTree::in_memory(ctx.config().with_split_method(SplitMethod::Quadratic))?;
            insert_all(&mut rstar, &entries)?;
            insert_all(&mut quadratic, &entries)?;
            assert_sound(&rstar);
            assert_sound(&quadratic);

            for query in [
                rect2(0.0, 0.0, 10.0, 10.0),
                rect2(40.0, 40.0, 60.0, 45.0),
                rect2(99.0, 0.0, 120.0, 120.0),
            ] {
                assert_eq!(search_sorted(&rstar, &query)?, search_sorted(&quadratic, &query)?);
            }
            Ok(())
        },
        cleanup,
    )
}

#[test]
fn test_internal_level_subtree_attach() {
    run_test(
        || create_test_context_with(config(SplitMethod::RStar)),
        |ctx| {
            let mut tree = RTree::in_memory(ctx.config())?;
            insert_all(&mut tree, &random_rects(5, 40, 50.0, 2.0))?;
            let leaf = Node::with_branches(
                0,
                vec![
                    Branch::new(unit_square(200.0, 200.0), ChildRef::Record(1000)),
                    Branch::new(unit_square(202.0, 200.0), ChildRef::Record(1001)),
                ],
            );
            let cover = leaf.cover(2);
            let node = tree.store_mut().allocate(&leaf)?;

            tree.insert(cover.clone(), ChildRef::Node(node), 1)?;
            assert_eq!(tree.len(), 42);
            assert_eq!(search_sorted(&tree, &cover)?, vec![1000, 1001]);
            assert_sound(&tree);
            Ok(())
        },
        cleanup,
    )
}
