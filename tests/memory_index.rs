use twig_dom::{diff, resolve, EventNode, MemoryDom, Node};

use memory_::{el, mount, text, Msg};

fn page(first: &str, last: &str) -> Node<Msg> {
	let paragraphs = (0..20).map(|i| el("p", vec![text(if i == 0 { first } else { "p" })])).collect();
	el("main", vec![el("section", paragraphs), el("div", vec![el("span", vec![text(last)])]), el("section", vec![])])
}

#[test]
fn far_leaf_index() {
	let patches = diff(&page("p", "a"), &page("p", "b"));
	assert_eq!(patches.len(), 1);
	assert_eq!(patches[0].index(), 44);
}

#[test]
fn only_the_path_to_a_patch_is_visited() {
	let mut mounted = mount(page("p", "a"));
	let stats = mounted.cycle(page("p", "b"));
	assert_eq!(stats.patches, 1);
	assert_eq!(stats.visited, 4);
	assert_eq!(mounted.dom.text(mounted.live_at(&[1, 0, 0]).id()), Some("b"));
}

#[test]
fn both_ends() {
	let mut mounted = mount(page("p", "a"));
	let stats = mounted.cycle(page("first", "b"));
	assert_eq!(stats.patches, 2);
	assert_eq!(stats.visited, 7);
	assert_eq!(mounted.dom.text(mounted.live_at(&[0, 0, 0]).id()), Some("first"));
	assert_eq!(mounted.dom.text(mounted.live_at(&[1, 0, 0]).id()), Some("b"));
}

#[test]
fn no_patches_no_walk() {
	let old = page("p", "a");
	let mut dom = MemoryDom::new();
	let event_node = EventNode::root(|_: Msg, _| ());
	let live = twig_dom::render(&mut dom, &old, &event_node);

	let mut patches = diff(&old, &page("p", "a"));
	assert!(patches.is_empty());
	assert_eq!(resolve(&live, &old, &mut patches, &event_node).visited, 0);
}

#[test]
fn every_patch_gets_its_target() {
	let old = page("p", "a");
	let new = page("x", "b");
	let mut dom = MemoryDom::new();
	let event_node = EventNode::root(|_: Msg, _| ());
	let live = twig_dom::render(&mut dom, &old, &event_node);

	let mut patches = diff(&old, &new);
	resolve(&live, &old, &mut patches, &event_node);
	let targets: Vec<_> = patches.iter().map(|patch| patch.target().unwrap().id()).collect();
	let first = live.child(0).unwrap().child(0).unwrap().child(0).unwrap().id();
	let last = live.child(1).unwrap().child(0).unwrap().child(0).unwrap().id();
	assert_eq!(targets, vec![first, last]);
}
