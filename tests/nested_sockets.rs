// tests/nested_sockets.rs
use glam::{Quat, Vec2, Vec3};
use robot_sockets::{
    GridDescriptor, GridHierarchy, GridId, GridTransform, PartDefinition, Rotation, SocketMount,
    TierTable,
};
use std::f32::consts::FRAC_PI_2;
use std::sync::Arc;

fn desc(text: &str) -> Arc<GridDescriptor> {
    Arc::new(GridDescriptor::try_parse(text).unwrap())
}

/// A chassis socket plus a hub part that exposes two ports once placed.
fn setup() -> (GridHierarchy, GridId, PartDefinition, PartDefinition) {
    let mut hierarchy: GridHierarchy = GridHierarchy::default();
    let chassis = hierarchy
        .add_grid(desc("Head_4x4_S2_LRTB_chassis"), GridTransform::default())
        .unwrap();

    let hub = PartDefinition::new(desc("Tail_2x2_S1_hub"))
        .with_socket(SocketMount::new(desc("Head_2x1_S1_port"), Vec2::new(0.0, 0.0)))
        .with_socket(SocketMount::new(desc("Head_2x1_S1_port"), Vec2::new(0.0, 1.0)));
    let pin = PartDefinition::parse("Tail_1x1_SN_pin").unwrap();

    (hierarchy, chassis, hub, pin)
}

#[test]
fn test_removing_host_tears_down_nested_grids() {
    let (mut hierarchy, chassis, hub, pin) = setup();

    let host = hierarchy
        .place(chassis, &hub, Rotation::R0, 1, 1)
        .expect("hub fits the chassis");
    let ports = hierarchy.hosted_grids(host).to_vec();
    assert_eq!(ports.len(), 2, "one grid per hosted socket");
    assert_eq!(hierarchy.len(), 3);
    for port in &ports {
        assert_eq!(hierarchy.parent_of(*port), Some(host));
    }

    let a = hierarchy.place(ports[0], &pin, Rotation::R0, 0, 0).unwrap();
    let b = hierarchy.place(ports[1], &pin, Rotation::R0, 1, 0).unwrap();
    assert_eq!(hierarchy.grid_of(a), Some(ports[0]));
    assert_eq!(hierarchy.grid_of(b), Some(ports[1]));
    assert_eq!(hierarchy.grid(chassis).unwrap().occupied_cells(), 4);

    hierarchy.remove(host);

    for port in &ports {
        assert!(hierarchy.grid(*port).is_none(), "{port} should be gone");
        assert!(!hierarchy.can_place(*port, &pin, Rotation::R0, 0, 0));
        assert!(hierarchy.valid_rotations(*port, &pin).is_empty());
    }
    assert_eq!(hierarchy.grid_of(a), None);
    assert_eq!(hierarchy.grid_of(b), None);
    assert_eq!(hierarchy.grid_of(host), None);
    assert_eq!(hierarchy.grid(chassis).unwrap().occupied_cells(), 0);
    assert!(hierarchy.grid(chassis).unwrap().is_empty());
    assert_eq!(hierarchy.grid_ids(), vec![chassis]);

    // Removal is idempotent.
    hierarchy.remove(host);
    hierarchy.remove(a);
    assert_eq!(hierarchy.len(), 1);
}

#[test]
fn test_removing_nested_part_keeps_its_grid() {
    let (mut hierarchy, chassis, hub, pin) = setup();
    let host = hierarchy.place(chassis, &hub, Rotation::R0, 0, 0).unwrap();
    let ports = hierarchy.hosted_grids(host).to_vec();
    let nested = hierarchy.place(ports[0], &pin, Rotation::R0, 1, 0).unwrap();
    assert_eq!(hierarchy.grid(ports[0]).unwrap().occupied_cells(), 1);

    hierarchy.remove(nested);

    assert_eq!(hierarchy.grid_of(nested), None);
    assert_eq!(hierarchy.hosted_grids(host), ports.as_slice());
    assert_eq!(hierarchy.grid_of(host), Some(chassis));
    assert_eq!(hierarchy.len(), 3);
    for port in &ports {
        assert_eq!(hierarchy.parent_of(*port), Some(host));
    }
    let port = hierarchy.grid(ports[0]).expect("port outlives its occupant");
    assert!(port.is_empty());
    assert_eq!(hierarchy.grid(chassis).unwrap().occupied_cells(), 4);

    assert!(hierarchy.place(ports[0], &pin, Rotation::R0, 1, 0).is_some());
}

#[test]
fn test_deep_nesting_is_removed_bottom_up() {
    let (mut hierarchy, chassis, hub, _) = setup();
    let tower = PartDefinition::new(desc("Tail_2x1_S1_tower"))
        .with_socket(SocketMount::new(desc("Head_2x2_S1_deck"), Vec2::ZERO));

    let base = hierarchy.place(chassis, &tower, Rotation::R0, 0, 0).unwrap();
    let deck = hierarchy.hosted_grids(base)[0];
    let upper = hierarchy.place(deck, &hub, Rotation::R0, 0, 0).unwrap();
    let ports = hierarchy.hosted_grids(upper).to_vec();
    assert_eq!(hierarchy.len(), 4);

    hierarchy.remove(base);

    assert_eq!(hierarchy.len(), 1);
    assert!(hierarchy.grid(deck).is_none());
    assert!(ports.iter().all(|p| !hierarchy.contains(*p)));
    assert_eq!(hierarchy.grid_of(upper), None);
}

#[test]
fn test_disposing_root_grid_clears_everything() {
    let (mut hierarchy, chassis, hub, pin) = setup();
    let host = hierarchy.place(chassis, &hub, Rotation::R0, 0, 0).unwrap();
    let port = hierarchy.hosted_grids(host)[0];
    let nested = hierarchy.place(port, &pin, Rotation::R0, 0, 0).unwrap();
    let loose = hierarchy.place(chassis, &pin, Rotation::R0, 3, 3).unwrap();

    hierarchy.dispose_grid(chassis);

    assert!(hierarchy.is_empty());
    for occupant in [host, nested, loose] {
        assert_eq!(hierarchy.grid_of(occupant), None);
    }
}

#[test]
fn test_disposing_nested_grid_unlinks_it_from_host() {
    let (mut hierarchy, chassis, hub, pin) = setup();
    let host = hierarchy.place(chassis, &hub, Rotation::R0, 0, 0).unwrap();
    let ports = hierarchy.hosted_grids(host).to_vec();
    let nested = hierarchy.place(ports[0], &pin, Rotation::R0, 0, 0).unwrap();

    hierarchy.dispose_grid(ports[0]);

    assert_eq!(hierarchy.hosted_grids(host), &ports[1..]);
    assert_eq!(hierarchy.grid_of(host), Some(chassis));
    assert_eq!(hierarchy.grid_of(nested), None);

    hierarchy.remove(host);
    assert_eq!(hierarchy.len(), 1);
}

#[test]
fn test_nested_grid_follows_part_rotation() {
    let mut hierarchy: GridHierarchy = GridHierarchy::default();
    let chassis = hierarchy
        .add_grid(desc("Head_4x4_S1_chassis"), GridTransform::default())
        .unwrap();
    // A socket whose corner sits at the far end of a 2x1 arm.
    let arm = PartDefinition::new(desc("Tail_2x1_S1_arm"))
        .with_socket(SocketMount::new(desc("Head_1x1_S1_wrist"), Vec2::new(2.0, 0.0)));

    let placed = hierarchy.place(chassis, &arm, Rotation::R90, 1, 1).unwrap();
    let wrist = hierarchy.grid(hierarchy.hosted_grids(placed)[0]).unwrap();

    // Turned a quarter, the arm covers 1x2 cells and its far end points down:
    // the anchor moves from (2, 0) to (1, 2) inside the footprint.
    let expected = Vec3::new(2.0 * 0.05, 3.0 * 0.05, 0.0);
    assert!(wrist.transform().origin.abs_diff_eq(expected, 1e-6));
    assert!(
        wrist
            .transform()
            .orientation
            .abs_diff_eq(Quat::from_rotation_z(FRAC_PI_2), 1e-6)
    );
}

#[test]
fn test_unbuildable_socket_refuses_whole_placement() {
    let mut hierarchy = GridHierarchy::new(TierTable::new(vec![0.05]));
    let chassis = hierarchy
        .add_grid(desc("Head_4x4_S2_chassis"), GridTransform::default())
        .unwrap();
    let bad = PartDefinition::new(desc("Tail_1x1_S1_adapter"))
        .with_socket(SocketMount::new(desc("Head_T2_1x1_S1_mount"), Vec2::ZERO));

    assert!(!hierarchy.can_place(chassis, &bad, Rotation::R0, 0, 0));
    assert!(hierarchy.candidates(&bad).is_empty());
    assert_eq!(hierarchy.place(chassis, &bad, Rotation::R0, 0, 0), None);
    assert_eq!(hierarchy.grid(chassis).unwrap().occupied_cells(), 0);
    assert_eq!(hierarchy.len(), 1);
}

#[test]
fn test_candidates_track_free_space() {
    let mut hierarchy: GridHierarchy = GridHierarchy::default();
    let rail = hierarchy
        .add_grid(desc("Head_2x1_S1_LR_rail"), GridTransform::default())
        .unwrap();
    let peg = PartDefinition::parse("Tail_1x1_S1_L_peg").unwrap();

    let all = hierarchy.candidates(&peg);
    assert_eq!(all.len(), 4, "two cells, left- and right-facing");
    assert!(all.iter().all(|c| c.grid == rail));
    assert!(
        all.iter()
            .all(|c| matches!(c.rotation, Rotation::R0 | Rotation::R180))
    );

    let first = all[0];
    hierarchy
        .place(
            first.grid,
            &peg,
            first.rotation,
            first.origin.x as i32,
            first.origin.y as i32,
        )
        .unwrap();
    assert_eq!(hierarchy.candidates(&peg).len(), 2);
}

#[test]
fn test_occupant_ids_never_repeat() {
    let (mut hierarchy, chassis, _, pin) = setup();
    let first = hierarchy.place(chassis, &pin, Rotation::R0, 0, 0).unwrap();
    hierarchy.remove(first);
    let second = hierarchy.place(chassis, &pin, Rotation::R0, 0, 0).unwrap();
    assert!(second > first);
}

#[test]
#[should_panic(expected = "dangling")]
fn test_placing_on_discarded_grid_panics() {
    let (mut hierarchy, chassis, _, pin) = setup();
    hierarchy.dispose_grid(chassis);
    hierarchy.place(chassis, &pin, Rotation::R0, 0, 0);
}
