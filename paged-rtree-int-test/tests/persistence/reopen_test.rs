use paged_rtree::{ErrorKind, NodeStore, RTree};
use paged_rtree_int_test::test_util::{
    assert_sound, cleanup, create_test_context, insert_all, random_rects, rect2, run_test,
    search_sorted,
};

#[test]
fn test_reopen_restores_tree() {
    run_test(
        create_test_context,
        |ctx| {
            let path = ctx.path("reopen.rtree");
            let entries = random_rects(3, 250, 100.0, 4.0);
            let queries = [
                rect2(0.0, 0.0, 25.0, 25.0),
                rect2(50.0, 10.0, 52.0, 90.0),
                rect2(-10.0, -10.0, 200.0, 200.0),
            ];

            let mut tree = RTree::create(&path, ctx.config())?;
            insert_all(&mut tree, &entries)?;
            let height = tree.height();
            let dump = tree.dump()?;
            let mut expected = Vec::new();
            for query in &queries {
                expected.push(search_sorted(&tree, query)?);
            }
            tree.close()?;

            let tree = RTree::open(&path)?;
            assert_eq!(tree.len(), 250);
            assert_eq!(tree.height(), height);
            assert_eq!(tree.config(), &ctx.config());
            assert_eq!(tree.dump()?, dump);
            for (query, expected) in queries.iter().zip(&expected) {
                assert_eq!(&search_sorted(&tree, query)?, expected);
            }
            assert_sound(&tree);
            Ok(())
        },
        cleanup,
    )
}

#[test]
fn test_disk_and_memory_agree() {
    run_test(
        create_test_context,
        |ctx| {
            let entries = random_rects(8, 200, 60.0, 6.0);
            let mut memory = RTree::in_memory(ctx.config())?;
            let mut disk = RTree::create(ctx.path("agree.rtree"), ctx.config())?;
            insert_all(&mut memory, &entries)?;
            insert_all(&mut disk, &entries)?;

            for (rect, id) in entries.iter().filter(|(_, id)| id % 3 == 0) {
                memory.delete_record(rect, *id)?;
                disk.delete_record(rect, *id)?;
            }
            assert_eq!(memory.len(), disk.len());
            assert_eq!(memory.height(), disk.height());
            assert_eq!(memory.stats()?, disk.stats()?);

            for x in (0..60).step_by(10) {
                let query = rect2(x as f64, 0.0, x as f64 + 10.0, 60.0);
                assert_eq!(search_sorted(&memory, &query)?, search_sorted(&disk, &query)?);
            }
            assert_sound(&memory);
            assert_sound(&disk);
            Ok(())
        },
        cleanup,
    )
}

#[test]
fn test_freed_pages_reused_after_reopen() {
    run_test(
        create_test_context,
        |ctx| {
            let path = ctx.path("reuse.rtree");
            let entries = random_rects(21, 120, 50.0, 3.0);

            let mut tree = RTree::create(&path, ctx.config())?;
            insert_all(&mut tree, &entries)?;
            for (rect, id) in &entries[..80] {
                tree.delete_record(rect, *id)?;
            }
            let live = tree.store().node_count();
            let end = tree.store().next_position();
            tree.close()?;

            let mut tree = RTree::open(&path)?;
            assert_eq!(tree.store().node_count(), live);
            assert_eq!(tree.store().next_position(), end);
            let free = tree.store().free_pages().len() as u64;
            assert!(free > 0);
            assert_eq!(
                (end - 128) / tree.store().page_bytes(),
                live as u64 + free
            );

            for (rect, id) in &entries[..80] {
                tree.insert_record(rect.clone(), *id)?;
            }
            assert_eq!(tree.len(), 120);
            assert!(tree.store().free_pages().len() as u64 <= free);
            assert_sound(&tree);
            Ok(())
        },
        cleanup,
    )
}

#[test]
fn test_mutations_after_reopen_persist() {
    run_test(
        create_test_context,
        |ctx| {
            let path = ctx.path("twice.rtree");
            let entries = random_rects(4, 60, 30.0, 2.0);

            let mut tree = RTree::create(&path, ctx.config())?;
            insert_all(&mut tree, &entries[..30])?;
            tree.close()?;

            let mut tree = RTree::open(&path)?;
            insert_all(&mut tree, &entries[30..])?;
            tree.delete_record(&entries[0].0, entries[0].1)?;
            tree.sync()?;
            drop(tree);

            let tree = RTree::open(&path)?;
            assert_eq!(tree.len(), 59);
            let all = search_sorted(&tree, &rect2(0.0, 0.0, 40.0, 40.0))?;
            assert_eq!(all, (1..60).collect::<Vec<_>>());
            assert_sound(&tree);
            Ok(())
        },
        cleanup,
    )
}

#[test]
fn test_open_rejects_foreign_files() {
    run_test(
        create_test_context,
        |ctx| {
            let missing = RTree::open(ctx.path("missing.rtree")).unwrap_err();
            assert_eq!(missing.kind(), ErrorKind::StorageIo);

            let short = ctx.path("short.rtree");
            std::fs::write(&short, b"not a tree")?;
            assert_eq!(RTree::open(&short).unwrap_err().kind(), ErrorKind::StorageIo);

            let zeroed = ctx.path("zeroed.rtree");
            std::fs::write(&zeroed, vec![0u8; 1024])?;
            assert_eq!(RTree::open(&zeroed).unwrap_err().kind(), ErrorKind::StorageIo);
            Ok(())
        },
        cleanup,
    )
}
