use std::rc::Rc;
use twig_dom::{
	diff,
	keyed::DUPLICATE_KEY_SUFFIX,
	patch::{EntryState, Reorder},
	LiveNode, Patch, PatchKind,
};

use memory_::{el, keyed, mount, render_html, text, Msg};

fn reorder(patch: &Patch<Msg>) -> &Reorder<Msg> {
	match patch.kind() {
		PatchKind::KeyedReorder(reorder) => reorder,
		other => panic!("Expected KeyedReorder, found {:?}", other),
	}
}

fn item(label: &str) -> twig_dom::Node<Msg> {
	el("li", vec![text(label)])
}

#[test]
fn neighbour_swap_is_one_move() {
	let old = keyed("ul", vec![("1", text("x")), ("2", text("y")), ("3", text("z"))]);
	let new = keyed("ul", vec![("2", text("y")), ("1", text("x")), ("3", text("z"))]);

	let patches = diff(&old, &new);
	assert_eq!(patches.len(), 1);
	assert_eq!(patches[0].index(), 0);
	let reorder = reorder(&patches[0]);

	assert_eq!(reorder.inserts().len(), 1);
	assert!(reorder.end_inserts().is_empty());
	let insert = &reorder.inserts()[0];
	assert_eq!(insert.index(), 0);
	{
		let entry = insert.entry().borrow();
		assert_eq!(entry.key(), "2");
		assert_eq!(entry.state(), EntryState::Moved);
		assert!(entry.patches().is_empty());
	}

	assert_eq!(reorder.local_patches().len(), 1);
	let removal = &reorder.local_patches()[0];
	assert_eq!(removal.index(), 2);
	match removal.kind() {
		PatchKind::RemoveKeyedNode(entry) => assert!(Rc::ptr_eq(entry, insert.entry())),
		other => panic!("Expected RemoveKeyedNode, found {:?}", other),
	}
}

#[test]
fn swap_reuses_live_nodes() {
	let mut mounted = mount(keyed("ul", vec![("a", item("A")), ("b", item("B"))]));
	let a = mounted.live_at(&[0]);
	let b = mounted.live_at(&[1]);
	let created = mounted.dom.created();

	mounted.cycle(keyed("ul", vec![("b", item("B")), ("a", item("A"))]));
	assert!(LiveNode::ptr_eq(&mounted.live_at(&[0]), &b));
	assert!(LiveNode::ptr_eq(&mounted.live_at(&[1]), &a));
	assert_eq!(mounted.dom.created(), created);
	assert_eq!(mounted.html(), "<ul><li>B</li><li>A</li></ul>");
}

#[test]
fn moved_node_is_patched() {
	let mut mounted = mount(keyed("ul", vec![("a", item("A")), ("b", item("B"))]));
	let b = mounted.live_at(&[1]);
	let b_text = mounted.live_at(&[1, 0]).id();

	mounted.cycle(keyed("ul", vec![("b", item("B2")), ("a", item("A"))]));
	assert!(LiveNode::ptr_eq(&mounted.live_at(&[0]), &b));
	assert_eq!(mounted.live_at(&[0, 0]).id(), b_text);
	assert_eq!(mounted.html(), "<ul><li>B2</li><li>A</li></ul>");
}

#[test]
fn insertion_and_removal() {
	let mut mounted = mount(keyed("ul", vec![("b", item("B")), ("c", item("C"))]));
	let b = mounted.live_at(&[0]);
	let c = mounted.live_at(&[1]);

	mounted.cycle(keyed("ul", vec![("a", item("A")), ("b", item("B")), ("c", item("C"))]));
	assert_eq!(mounted.html(), "<ul><li>A</li><li>B</li><li>C</li></ul>");
	assert!(LiveNode::ptr_eq(&mounted.live_at(&[1]), &b));
	assert!(LiveNode::ptr_eq(&mounted.live_at(&[2]), &c));

	mounted.cycle(keyed("ul", vec![("a", item("A")), ("c", item("C"))]));
	assert_eq!(mounted.html(), "<ul><li>A</li><li>C</li></ul>");
	assert!(LiveNode::ptr_eq(&mounted.live_at(&[1]), &c));
	assert!(!mounted.dom.contains(b.id()));
}

#[test]
fn reversal_moves_everything() {
	let keys = ["a", "b", "c", "d"];
	let mut mounted = mount(keyed("ol", keys.iter().map(|&key| (key, item(key))).collect()));
	let live: Vec<_> = (0..4).map(|i| mounted.live_at(&[i])).collect();
	let created = mounted.dom.created();

	mounted.cycle(keyed("ol", keys.iter().rev().map(|&key| (key, item(key))).collect()));
	assert_eq!(mounted.html(), "<ol><li>d</li><li>c</li><li>b</li><li>a</li></ol>");
	for (i, live) in live.iter().rev().enumerate() {
		assert!(LiveNode::ptr_eq(&mounted.live_at(&[i]), live));
	}
	assert_eq!(mounted.dom.created(), created);
}

#[test]
fn duplicate_keys_get_suffixed() {
	let old = keyed("ul", vec![]);
	let new = keyed("ul", vec![("x", text("first")), ("x", text("second"))]);

	let patches = diff(&old, &new);
	assert_eq!(patches.len(), 1);
	let reorder = reorder(&patches[0]);
	let keys: Vec<String> = reorder.end_inserts().iter().map(|entry| entry.borrow().key().to_owned()).collect();
	assert_eq!(keys, vec!["x".to_owned(), format!("x{}", DUPLICATE_KEY_SUFFIX)]);
	assert_eq!(keys[1], "x\u{27C2}dup");

	let mut mounted = mount(old);
	mounted.cycle(new);
	assert_eq!(mounted.html(), "<ul>firstsecond</ul>");
}

#[test]
fn duplicate_keys_on_both_sides() {
	let old = keyed("ul", vec![("x", item("1")), ("y", item("2")), ("x", item("3"))]);
	let new = keyed("ul", vec![("x", item("3")), ("x", item("1")), ("z", item("4")), ("y", item("2"))]);

	let mut mounted = mount(old);
	mounted.cycle(new.clone());
	assert_eq!(mounted.html(), render_html(&new));
}

#[test]
fn unchanged_keyed_list_emits_nothing() {
	let make = || keyed("ul", vec![("a", item("A")), ("b", item("B"))]);
	assert!(diff(&make(), &make()).is_empty());
}
