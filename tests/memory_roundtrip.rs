use proptest::prelude::*;
use serde_json::json;
use std::{any::Any, cell::RefCell, collections::HashMap, rc::Rc};
use twig_dom::{Decoder, Fact, Handler, MemoryDom, Node, NodeId, Tagger};

use memory_::{mount, render_html, Mounted, Msg};

#[derive(Debug, Clone)]
enum Tree {
	Text(&'static str),
	Element {
		tag: &'static str,
		class: Option<&'static str>,
		color: Option<&'static str>,
		/// `(message, stop_propagation)`
		on_click: Option<(&'static str, bool)>,
		children: Vec<Tree>,
	},
	/// Keys may repeat.
	Keyed {
		children: Vec<(u8, Tree)>,
	},
	Tagged {
		tagger: usize,
		inner: Box<Tree>,
	},
	Thunk(Box<Tree>),
}

fn tree() -> impl Strategy<Value = Tree> {
	let leaf = prop::sample::select(vec!["a", "b", ""]).prop_map(Tree::Text);
	leaf.prop_recursive(4, 48, 6, |inner| {
		prop_oneof![
			(
				prop::sample::select(vec!["div", "span", "ul"]),
				prop::option::of(prop::sample::select(vec!["x", "y"])),
				prop::option::of(prop::sample::select(vec!["red", "blue"])),
				prop::option::of((prop::sample::select(vec!["a", "b"]), any::<bool>())),
				prop::collection::vec(inner.clone(), 0..5),
			)
				.prop_map(|(tag, class, color, on_click, children)| Tree::Element { tag, class, color, on_click, children }),
			prop::collection::vec((0_u8..4, inner.clone()), 0..6).prop_map(|children| Tree::Keyed { children }),
			(0..TAGGERS, inner.clone()).prop_map(|(tagger, inner)| Tree::Tagged { tagger, inner: Box::new(inner) }),
			inner.prop_map(|inner| Tree::Thunk(Box::new(inner))),
		]
	})
}

const TAGGERS: usize = 3;

/// Shared across all views of one case, so taggers and thunk refs keep their identity between cycles.
struct Pool {
	taggers: Vec<Tagger<Msg>>,
	/// Thunk refs, one per distinct subtree.
	refs: RefCell<HashMap<String, Rc<dyn Any>>>,
}

impl Pool {
	fn new() -> Rc<Self> {
		let taggers = (0..TAGGERS)
			.map(|i| -> Tagger<Msg> { Rc::new(move |message: Msg| format!("t{}/{}", i, message)) })
			.collect();
		Rc::new(Self {
			taggers,
			refs: RefCell::default(),
		})
	}
}

fn build(pool: &Rc<Pool>, tree: &Tree) -> Node<Msg> {
	match tree {
		Tree::Text(text) => Node::text(*text),
		Tree::Element {
			tag,
			class,
			color,
			on_click,
			children,
		} => {
			let mut facts = Vec::new();
			if let Some(class) = class {
				facts.push(Fact::attribute("class", class));
			}
			if let Some(color) = color {
				facts.push(Fact::style("color", *color));
			}
			match *on_click {
				Some((message, false)) => facts.push(Fact::on("click", Handler::Normal(Decoder::succeed(message.to_owned())))),
				Some((message, true)) => facts.push(Fact::on("click", Handler::MayStopPropagation(Decoder::new(move |_| Ok((message.to_owned(), true)))))),
				None => (),
			}
			Node::element(tag, facts, children.iter().map(|child| build(pool, child)))
		}
		Tree::Keyed { children } => Node::keyed("ul", Vec::<Fact<Msg>>::new(), children.iter().map(|(key, child)| (key.to_string(), build(pool, child)))),
		Tree::Tagged { tagger, inner } => build(pool, inner).map(&pool.taggers[*tagger]),
		Tree::Thunk(inner) => {
			let model = Rc::clone(pool.refs.borrow_mut().entry(format!("{:?}", inner)).or_insert_with(|| Rc::new(()) as Rc<dyn Any>));
			let (pool, inner) = (Rc::clone(pool), inner.clone());
			Node::thunk(vec![model], move || build(&pool, &inner))
		}
	}
}

fn count_nodes(dom: &MemoryDom, node: NodeId) -> usize {
	1 + dom.children(node).into_iter().map(|child| count_nodes(dom, child)).sum::<usize>()
}

fn pre_order(dom: &MemoryDom, node: NodeId, ids: &mut Vec<NodeId>) {
	ids.push(node);
	for child in dom.children(node) {
		pre_order(dom, child, ids);
	}
}

/// Clicks every node once, in document order, and returns what was delivered.
fn click_everything(mounted: &Mounted) -> Vec<(Msg, bool)> {
	let mut ids = Vec::new();
	pre_order(&mounted.dom, mounted.root_id(), &mut ids);
	for id in ids {
		mounted.dom.dispatch(id, "click", &json!({ "type": "click" }));
	}
	mounted.messages()
}

proptest! {
	#[test]
	fn cycle_matches_fresh_render(old in tree(), new in tree()) {
		let pool = Pool::new();
		let new = build(&pool, &new);
		let mut mounted = mount(build(&pool, &old));

		mounted.cycle(new.clone());
		prop_assert_eq!(mounted.html(), render_html(&new));
		// Everything that was removed has been released.
		prop_assert_eq!(mounted.dom.len(), count_nodes(&mounted.dom, mounted.container));

		let fresh = mount(new);
		prop_assert_eq!(click_everything(&mounted), click_everything(&fresh));
	}

	#[test]
	fn cycle_sequences(views in prop::collection::vec(tree(), 2..5)) {
		let pool = Pool::new();
		let mut views = views.iter().map(|view| build(&pool, view));
		let mut mounted = mount(views.next().unwrap());
		let mut last = None;
		for view in views {
			mounted.cycle(view.clone());
			prop_assert_eq!(mounted.html(), render_html(&view));
			last = Some(view);
		}

		let fresh = mount(last.unwrap());
		prop_assert_eq!(click_everything(&mounted), click_everything(&fresh));
	}
}
