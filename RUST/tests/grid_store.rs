use peekgrid::*;
use std::sync::Arc;

fn root(label: &str) -> Access {
    let value: Root = Arc::new(vec![1u8, 2, 3]);
    Access::new_root(label, value, true)
}

fn child_of(parent: &Access, key: &str) -> Access {
    parent.descendant(
        parent.path.child(key),
        format!("{}.{}", parent.label, key),
        "u8".to_string(),
        true,
    )
}

fn grid_with_roots(labels: &[&str]) -> Grid {
    let mut grid = Grid::default();
    for label in labels {
        let at = Placement::Column(0).next(&grid);
        grid.put(at.0, at.1, root(label), Placement::Column(0)).unwrap();
    }
    grid
}

#[test]
fn roots_fill_column_zero_in_order() {
    let grid = grid_with_roots(&["a", "b", "c"]);
    assert_eq!(grid.coordinates(), vec![(0, 0), (1, 0), (2, 0)]);
    assert_eq!(grid.root_labels(), vec!["a", "b", "c"]);
    assert_eq!(grid.max_row(0), Some(2));
    assert_eq!(grid.next_free_row(0), 3);
}

#[test]
fn probing_never_overwrites_a_root() {
    let mut grid = grid_with_roots(&["a"]);
    let parent = root("a");

    let at = grid.put(0, 0, child_of(&parent, "0"), Placement::Row(0)).unwrap();
    assert_eq!(at, (0, 1));
    let at = grid.put(0, 0, child_of(&parent, "1"), Placement::Row(0)).unwrap();
    assert_eq!(at, (0, 2));

    let kept = grid.get(0, 0).unwrap();
    assert!(kept.is_root);
    assert_eq!(kept.label, "a");
    assert_eq!(grid.max_column(0), Some(2));
}

#[test]
fn explicit_placement_probes_its_own_slot() {
    let mut grid = grid_with_roots(&["a"]);
    let parent = root("a");
    let placement = Placement::At { row: 4, column: 2 };

    let at = grid.put(0, 0, child_of(&parent, "0"), placement).unwrap();
    assert_eq!(at, (4, 2));

    // A taken fixed slot can never be left.
    let err = grid.put(0, 0, child_of(&parent, "1"), placement).unwrap_err();
    assert!(matches!(err, ExploreError::PlacementExhausted { row: 0, column: 0, .. }));
}

#[test]
fn probe_bound_is_enforced() {
    let mut grid = Grid::new(2);
    for row in 0..5 {
        grid.insert_at(row, 0, root(&format!("r{row}")));
    }
    // Scanning from row 0 finds row 5 free, but a fixed slot that is taken exhausts the bound.
    let at = grid.put(0, 0, root("next"), Placement::Column(0)).unwrap();
    assert_eq!(at, (5, 0));

    let err = grid
        .put(0, 0, root("stuck"), Placement::At { row: 1, column: 0 })
        .unwrap_err();
    match err {
        ExploreError::PlacementExhausted { probes, .. } => assert_eq!(probes, 2),
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn remove_is_a_no_op_on_roots() {
    let mut grid = grid_with_roots(&["a"]);
    let parent = root("a");
    grid.put(0, 1, child_of(&parent, "0"), Placement::Row(0)).unwrap();

    assert!(!grid.can_remove_at(0, 0));
    assert!(!grid.remove_at(0, 0));
    assert!(grid.get(0, 0).is_some());

    assert!(grid.can_remove_at(0, 1));
    assert!(grid.remove_at(0, 1));
    assert!(grid.get(0, 1).is_none());
    assert!(!grid.remove_at(0, 1));
    assert!(!grid.remove_at(7, 7));
}

#[test]
fn clear_keeps_exactly_the_roots() {
    let mut grid = grid_with_roots(&["a", "b"]);
    let parent = root("a");
    grid.put(0, 1, child_of(&parent, "0"), Placement::Row(0)).unwrap();
    grid.put(2, 0, child_of(&parent, "1"), Placement::Row(2)).unwrap();
    grid.put(1, 3, child_of(&parent, "2"), Placement::Row(1)).unwrap();
    assert_eq!(grid.len(), 5);

    grid.clear_non_roots();

    assert_eq!(grid.coordinates(), vec![(0, 0), (1, 0)]);
    assert!(grid.iter().all(|(_, _, access)| access.is_root));
    assert_eq!(grid.max_row(0), Some(1));
}

#[test]
fn update_keeps_coordinates() {
    let mut grid = grid_with_roots(&["a"]);
    assert!(grid.get(0, 0).unwrap().hide_zeros);

    assert!(grid.update_at(0, 0, |access| access.hide_zeros = false));
    let access = grid.get(0, 0).unwrap();
    assert!(!access.hide_zeros);
    assert!(access.is_root);

    assert!(!grid.update_at(3, 3, |access| access.hide_zeros = false));
}

#[test]
fn replace_by_label_overwrites_in_place() {
    let mut grid = grid_with_roots(&["a", "b"]);
    let replacement = Access::new_root("b", Arc::new(vec!["x".to_string()]), false);

    let at = grid.replace_root_by_label("b", replacement).unwrap();
    assert_eq!(at, (1, 0));
    assert_eq!(grid.len(), 2);
    assert_eq!(grid.get(1, 0).unwrap().type_name, "Vec<String>");

    let missing = root("zzz");
    assert!(grid.replace_root_by_label("zzz", missing).is_err());
}

#[test]
fn free_slot_scans_start_at_zero() {
    let mut grid = Grid::default();
    grid.insert_at(1, 0, root("b"));
    grid.insert_at(0, 2, root("c"));

    assert_eq!(grid.next_free_row(0), 0);
    assert_eq!(grid.next_free_column(0), 0);
    assert_eq!(grid.next_free_row(2), 1);
    assert_eq!(grid.next_free_column(1), 1);
    assert_eq!(grid.max_row(5), None);
    assert_eq!(grid.max_column(9), None);

    let (row, column, access) = grid.root_with_label("c").unwrap();
    assert_eq!((row, column), (0, 2));
    assert_eq!(access.label, "c");
}

#[test]
fn descendant_carries_interval_of_last_segment() {
    let parent = root("a");
    let chunk = child_of(&parent, "50:100");
    assert_eq!(chunk.range, Some(Interval::new(50, 100)));
    assert!(!chunk.is_root);
    assert_eq!(chunk.path.dotted(), "50:100");

    let element = child_of(&parent, "2");
    assert_eq!(element.range, None);
}
