use lazylife_core::{ActionNode, ActionTree, TreeError, Visibility};
use uuid::Uuid;

fn id(n: u128) -> Uuid {
    Uuid::from_u128(n)
}

/// Errands(1) [Milk(2), Bread(3) [Rye(4)]], Work(5), Gym(6)
fn sample() -> ActionTree {
    ActionTree::from_forest(vec![
        ActionNode::new(id(1), "Errands").with_children(vec![
            ActionNode::new(id(2), "Milk").completed_at(1_000),
            ActionNode::new(id(3), "Bread").with_children(vec![ActionNode::new(id(4), "Rye")]),
        ]),
        ActionNode::new(id(5), "Work"),
        ActionNode::new(id(6), "Gym"),
    ])
    .unwrap()
}

#[test]
fn every_edit_on_missing_id_reports_not_found_and_leaves_tree_alone() {
    let tree = sample();
    let before = tree.clone();
    let missing = id(999);

    assert_eq!(tree.toggle(missing, 5).unwrap_err(), TreeError::NodeNotFound(missing));
    assert_eq!(tree.update_text(missing, "x").unwrap_err(), TreeError::NodeNotFound(missing));
    assert_eq!(tree.move_up(missing).unwrap_err(), TreeError::NodeNotFound(missing));
    assert_eq!(tree.move_down(missing).unwrap_err(), TreeError::NodeNotFound(missing));
    assert_eq!(tree.indent(missing).unwrap_err(), TreeError::NodeNotFound(missing));
    assert_eq!(tree.outdent(missing).unwrap_err(), TreeError::NodeNotFound(missing));
    assert_eq!(tree.toggle_privacy(missing).unwrap_err(), TreeError::NodeNotFound(missing));
    assert_eq!(tree.delete(missing).unwrap_err(), TreeError::NodeNotFound(missing));
    assert!(matches!(
        tree.add("child", Some(missing), Visibility::Public),
        Err(TreeError::NodeNotFound(found)) if found == missing
    ));
    assert!(matches!(
        tree.add_after(missing, "sibling", Visibility::Public),
        Err(TreeError::NodeNotFound(found)) if found == missing
    ));
    assert_eq!(tree, before);
}

#[test]
fn toggle_twice_restores_open_state() {
    let tree = sample();
    let done = tree.toggle(id(5), 42).unwrap();
    assert_eq!(done.get(id(5)).unwrap().completed_at, Some(42));

    let reopened = done.toggle(id(5), 99).unwrap();
    assert_eq!(reopened.get(id(5)).unwrap().completed_at, None);
    assert_eq!(reopened, tree);
}

#[test]
fn toggle_rejects_parent_with_open_child() {
    let tree = sample();
    assert_eq!(
        tree.toggle(id(1), 5).unwrap_err(),
        TreeError::IncompleteDescendants(id(1))
    );
    assert_eq!(
        tree.toggle(id(3), 5).unwrap_err(),
        TreeError::IncompleteDescendants(id(3))
    );
}

#[test]
fn indent_then_outdent_round_trips() {
    let tree = sample();

    let indented = tree.indent(id(6)).unwrap();
    assert_eq!(indented.tree.roots(), &[id(1), id(5)]);
    assert_eq!(indented.tree.children(id(5)).unwrap(), &[id(6)]);

    let outdented = indented.tree.outdent(id(6)).unwrap();
    assert_eq!(outdented.tree, tree);
}

#[test]
fn indent_first_sibling_and_outdent_root_are_noops() {
    let tree = sample();
    assert_eq!(tree.indent(id(1)).unwrap().tree, tree);
    assert_eq!(tree.indent(id(2)).unwrap().tree, tree);
    assert_eq!(tree.outdent(id(5)).unwrap().tree, tree);
}

#[test]
fn outdent_places_item_right_after_former_parent() {
    let tree = sample();
    let outdented = tree.outdent(id(4)).unwrap();
    assert_eq!(outdented.tree.children(id(1)).unwrap(), &[id(2), id(3), id(4)]);
    assert_eq!(outdented.tree.children(id(3)).unwrap(), &[] as &[Uuid]);
}

#[test]
fn move_up_and_down_swap_siblings_and_stop_at_bounds() {
    let tree = sample();
    let moved = tree.move_down(id(5)).unwrap();
    assert_eq!(moved.roots(), &[id(1), id(6), id(5)]);
    assert_eq!(moved.move_up(id(5)).unwrap(), tree);

    assert_eq!(tree.move_up(id(1)).unwrap(), tree);
    assert_eq!(tree.move_down(id(6)).unwrap(), tree);
}

#[test]
fn delete_then_restore_reproduces_tree() {
    let tree = sample();
    let deleted = tree.delete(id(3)).unwrap();
    assert!(!deleted.tree.contains(id(3)));
    assert!(!deleted.tree.contains(id(4)));
    assert_eq!(deleted.context.parent_id, Some(id(1)));
    assert_eq!(deleted.context.index, 1);

    let restored = deleted.tree.restore(&deleted.context).unwrap();
    assert_eq!(restored.tree, tree);
    assert!(restored.uncompleted.is_empty());
    assert!(restored.visibility_changes.is_empty());
}

#[test]
fn restore_without_parent_fails_explicitly() {
    let tree = sample();
    let deleted_child = tree.delete(id(4)).unwrap();
    let parent_gone = deleted_child.tree.delete(id(3)).unwrap();

    let err = parent_gone.tree.restore(&deleted_child.context).unwrap_err();
    assert_eq!(
        err,
        TreeError::RestoreParentMissing {
            node_id: id(4),
            parent_id: id(3),
        }
    );
}

#[test]
fn going_private_cascades_down_and_public_cascades_up() {
    let tree = sample();

    let private = tree.toggle_privacy(id(1)).unwrap();
    for item in [id(1), id(2), id(3), id(4)] {
        assert_eq!(private.tree.get(item).unwrap().visibility, Visibility::Private);
    }
    assert_eq!(private.tree.get(id(5)).unwrap().visibility, Visibility::Public);
    assert_eq!(private.before.visibility, Visibility::Public);
    assert_eq!(private.after.visibility, Visibility::Private);
    assert_eq!(private.changes.len(), 4);

    let public = private.tree.toggle_privacy(id(4)).unwrap();
    for item in [id(4), id(3), id(1)] {
        assert_eq!(public.tree.get(item).unwrap().visibility, Visibility::Public);
    }
    assert_eq!(public.tree.get(id(2)).unwrap().visibility, Visibility::Private);
}

#[test]
fn privacy_change_reports_completion_of_target() {
    let tree = sample();
    let change = tree.toggle_privacy(id(2)).unwrap();
    assert_eq!(change.before.completed_at, Some(1_000));
    let milk = change.changes.iter().find(|c| c.id == id(2)).unwrap();
    assert_eq!(milk.completed_at, Some(1_000));
    assert_eq!(milk.from, Visibility::Public);
    assert_eq!(milk.to, Visibility::Private);
}

#[test]
fn add_after_inserts_directly_after_sibling() {
    let tree = ActionTree::from_forest(vec![
        ActionNode::new(id(1), "n1"),
        ActionNode::new(id(2), "n2"),
        ActionNode::new(id(3), "n3"),
    ])
    .unwrap();

    let inserted = tree
        .add_after_with_id(id(10), id(2), "new", Visibility::Public)
        .unwrap();
    assert_eq!(inserted.tree.roots(), &[id(1), id(2), id(10), id(3)]);
    assert_eq!(inserted.tree.get(id(10)).unwrap().description, "new");
}

#[test]
fn add_under_private_parent_is_forced_private() {
    let tree = sample().toggle_privacy(id(5)).unwrap().tree;
    let inserted = tree.add("Report", Some(id(5)), Visibility::Public).unwrap();
    assert_eq!(
        inserted.tree.get(inserted.id).unwrap().visibility,
        Visibility::Private
    );
}

#[test]
fn blank_descriptions_are_rejected() {
    let tree = sample();
    assert_eq!(
        tree.add("   ", None, Visibility::Public).unwrap_err(),
        TreeError::EmptyDescription
    );
    assert_eq!(tree.update_text(id(5), "\t").unwrap_err(), TreeError::EmptyDescription);
    assert_eq!(
        tree.update_text(id(5), "  Deep work ").unwrap().get(id(5)).unwrap().description,
        "Deep work"
    );
}

#[test]
fn adding_open_child_reopens_completed_ancestors() {
    let tree = ActionTree::from_forest(vec![ActionNode::new(id(1), "Move")
        .completed_at(500)
        .with_children(vec![ActionNode::new(id(2), "Boxes").completed_at(400)])])
    .unwrap();

    let inserted = tree.add_with_id(id(3), "Keys", Some(id(2)), Visibility::Public).unwrap();
    let reopened: Vec<Uuid> = inserted.uncompleted.iter().map(|item| item.id).collect();
    assert_eq!(reopened, vec![id(2), id(1)]);
    assert_eq!(inserted.uncompleted[1].old_completed_at, 500);
    assert!(!inserted.tree.get(id(1)).unwrap().is_completed());
}

#[test]
fn recalculation_never_completes_open_items() {
    let tree = ActionTree::from_forest(vec![ActionNode::new(id(1), "Open parent")
        .with_children(vec![
            ActionNode::new(id(2), "a").completed_at(10),
            ActionNode::new(id(3), "b").completed_at(20),
        ])])
    .unwrap();

    let reshaped = tree.recalculate_completion();
    assert!(reshaped.uncompleted.is_empty());
    assert_eq!(reshaped.tree, tree);
    assert!(!reshaped.tree.get(id(1)).unwrap().is_completed());
}

#[test]
fn indent_under_private_sibling_reports_visibility_changes() {
    let tree = sample().toggle_privacy(id(5)).unwrap().tree;
    let reshaped = tree.indent(id(6)).unwrap();
    assert_eq!(reshaped.tree.get(id(6)).unwrap().visibility, Visibility::Private);
    assert_eq!(reshaped.visibility_changes.len(), 1);
    assert_eq!(reshaped.visibility_changes[0].id, id(6));
}

#[test]
fn forest_round_trips_through_json() {
    let tree = sample();
    let json = serde_json::to_string(&tree.to_forest()).unwrap();
    let decoded: Vec<ActionNode> = serde_json::from_str(&json).unwrap();
    assert_eq!(ActionTree::from_forest(decoded).unwrap(), tree);
    assert!(json.contains("\"isPublic\":true"));
    assert!(json.contains("\"completedAt\":1000"));
}
