use paged_rtree::{ErrorKind, RTree, StorageMode};
use paged_rtree_int_test::test_util::{
    assert_sound, cleanup, create_test_context, grid_squares, insert_all, rect2, run_test,
    search_sorted, unit_square,
};
use std::ops::ControlFlow;

#[test]
fn test_grid_insert_then_delete_half() {
    run_test(
        create_test_context,
        |ctx| {
            let mut tree = RTree::in_memory(ctx.config())?;
            let squares = grid_squares(20, 5);
            insert_all(&mut tree, &squares)?;
            assert_sound(&tree);

            let region = rect2(0.0, 0.0, 9.0, 7.0);
            assert_eq!(search_sorted(&tree, &region)?, (0..20).collect::<Vec<u64>>());

            for (rect, id) in squares.iter().filter(|(_, id)| id % 2 == 0) {
                tree.delete_record(rect, *id)?;
                assert_sound(&tree);
            }
            let remaining: Vec<u64> = (0..20).filter(|id| id % 2 == 1).collect();
            assert_eq!(search_sorted(&tree, &region)?, remaining);
            assert_eq!(tree.len(), 10);
            Ok(())
        },
        cleanup,
    )
}

#[test]
fn test_grid_on_disk_matches_memory() {
    run_test(
        create_test_context,
        |ctx| {
            let squares = grid_squares(20, 5);
            let mut memory = paged_rtree::create_tree(ctx.config(), StorageMode::Memory)?;
            let mut disk =
                paged_rtree::create_tree(ctx.config(), StorageMode::Disk(ctx.path("grid.rtree")))?;
            insert_all(&mut memory, &squares)?;
            insert_all(&mut disk, &squares)?;

            for (rect, id) in squares.iter().take(10) {
                memory.delete_record(rect, *id)?;
                disk.delete_record(rect, *id)?;
            }
            assert_eq!(memory.dump()?.lines().count(), disk.dump()?.lines().count());
            for query in [rect2(0.0, 0.0, 9.0, 7.0), rect2(3.5, 3.5, 6.0, 6.0)] {
                assert_eq!(search_sorted(&memory, &query)?, search_sorted(&disk, &query)?);
            }
            Ok(())
        },
        cleanup,
    )
}

#[test]
fn test_insert_delete_retry() {
    run_test(
        create_test_context,
        |ctx| {
            let mut tree = RTree::in_memory(ctx.config())?;
            let rect = unit_square(4.0, 4.0);
            tree.insert_record(rect.clone(), 42)?;
            tree.delete_record(&rect, 42)?;

            let err = tree.delete_record(&rect, 42).unwrap_err();
            assert_eq!(err.kind(), ErrorKind::NotFound);
            let count = tree.search(&rect, |_, _| ControlFlow::Continue(()))?;
            assert_eq!(count, 0);
            assert!(tree.is_empty());
            Ok(())
        },
        cleanup,
    )
}

#[test]
fn test_search_stops_at_first_match() {
    run_test(
        create_test_context,
        |ctx| {
            let mut tree = RTree::in_memory(ctx.config())?;
            insert_all(&mut tree, &grid_squares(40, 8))?;

            let mut visited = 0;
            let count = tree.search(&rect2(0.0, 0.0, 100.0, 100.0), |_, _| {
                visited += 1;
                ControlFlow::Break(())
            })?;
            assert_eq!(count, 1);
            assert_eq!(visited, 1);
            Ok(())
        },
        cleanup,
    )
}

#[test]
fn test_round_trip_every_entry() {
    run_test(
        create_test_context,
        |ctx| {
            let mut tree = RTree::create(ctx.path("round_trip.rtree"), ctx.config())?;
            let squares = grid_squares(64, 8);
            insert_all(&mut tree, &squares)?;

            for (rect, id) in &squares {
                let mut found = Vec::new();
                tree.search(rect, |hit, hit_rect| {
                    if hit_rect == rect {
                        found.push(hit);
                    }
                    ControlFlow::Continue(())
                })?;
                assert_eq!(found, vec![*id]);

                tree.delete_record(rect, *id)?;
                assert!(!tree.search_collect(rect)?.contains(id));
            }
            assert!(tree.is_empty());
            assert_eq!(tree.height(), 1);
            assert_sound(&tree);
            Ok(())
        },
        cleanup,
    )
}
