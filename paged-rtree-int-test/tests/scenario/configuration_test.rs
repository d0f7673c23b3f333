use paged_rtree::{ErrorKind, NodeRef, NodeStore, RTree, TreeConfig};
use paged_rtree_int_test::test_util::{cleanup, create_test_context, run_test, unit_square};

#[test]
fn test_capacity_derived_from_page_size() {
    // (512 - 16) / (8 + 16 * 3 + 8) = 7
    let config = TreeConfig::new(3);
    assert_eq!(config.node_capacity(), 7);
    assert_eq!(config.leaf_capacity(), 7);

    let config = TreeConfig::new(2).with_page_size(4096);
    assert_eq!(config.node_capacity(), 85);
    assert!(config.validate().is_ok());

    let err = TreeConfig::new(2).with_page_size(64).validate().unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Configuration);

    let err = TreeConfig::new(21).validate().unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Configuration);
}

#[test]
fn test_capacity_change_rejected_once_populated() {
    run_test(
        create_test_context,
        |ctx| {
            let mut tree = RTree::create(ctx.path("capacity.rtree"), ctx.config())?;
            tree.set_leaf_capacity(8)?;
            assert_eq!(tree.config().leaf_capacity(), 8);

            tree.insert_record(unit_square(0.0, 0.0), 1)?;
            let err = tree.set_leaf_capacity(5).unwrap_err();
            assert_eq!(err.kind(), ErrorKind::Configuration);
            let err = tree.set_node_capacity(5).unwrap_err();
            assert_eq!(err.kind(), ErrorKind::Configuration);
            assert_eq!(tree.len(), 1);

            tree.clear()?;
            tree.set_node_capacity(5)?;
            tree.close()?;

            let tree = RTree::open(ctx.path("capacity.rtree"))?;
            assert_eq!(tree.config().node_capacity(), 5);
            assert_eq!(tree.config().leaf_capacity(), 8);
            Ok(())
        },
        cleanup,
    )
}

#[test]
fn test_child_reference_validity() {
    run_test(
        create_test_context,
        |ctx| {
            let mut memory = RTree::in_memory(ctx.config())?;
            let disk = RTree::create(ctx.path("refs.rtree"), ctx.config())?;

            assert!(memory.is_valid_child_reference(memory.root()));
            assert!(disk.is_valid_child_reference(disk.root()));
            assert!(!memory.is_valid_child_reference(disk.root()));
            assert!(!disk.is_valid_child_reference(memory.root()));
            assert!(!memory.is_valid_child_reference(NodeRef::Memory(99)));
            assert!(!disk.is_valid_child_reference(NodeRef::Disk(129)));

            for i in 0..30 {
                memory.insert_record(unit_square(i as f64, 0.0), i)?;
            }
            let old_root = memory.root();
            for i in 0..30 {
                memory.delete_record(&unit_square(i as f64, 0.0), i)?;
            }
            assert_eq!(memory.store().node_count(), 1);
            if old_root != memory.root() {
                assert!(!memory.is_valid_child_reference(old_root));
            }
            Ok(())
        },
        cleanup,
    )
}
