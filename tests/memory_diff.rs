use std::rc::Rc;
use twig_dom::{
	diff,
	dom::Dom,
	node::{CustomPatch, NodeKind, Widget},
	Fact, Node, NodeId, PatchKind,
};

use memory_::{el, el_with, keyed, mount, render_html, text, Msg};

#[test]
fn set_text_at_index_2() {
	let old = el("div", vec![text("a"), text("b")]);
	let new = el("div", vec![text("a"), text("c")]);

	let patches = diff(&old, &new);
	assert_eq!(patches.len(), 1);
	assert_eq!(patches[0].index(), 2);
	assert!(matches!(patches[0].kind(), PatchKind::SetText(text) if text == "c"));
}

#[test]
fn tag_mismatch_replaces() {
	let old = el_with("span", vec![Fact::attribute("title", "old")], vec![]);
	let new = el_with("div", vec![Fact::attribute("title", "new")], vec![]);

	let patches = diff(&old, &new);
	assert_eq!(patches.len(), 1);
	assert_eq!(patches[0].index(), 0);
	match patches[0].kind() {
		PatchKind::Replace(node) => assert_eq!(node.tag(), Some("div")),
		other => panic!("Expected Replace, found {:?}", other),
	}
}

#[test]
fn identical_reference_is_free() {
	let tree = el("main", vec![el("p", vec![text("a")]), keyed("ul", vec![("1", text("x")), ("2", text("y"))])]);
	assert!(diff(&tree, &tree.clone()).is_empty());
}

#[test]
fn structurally_equal_trees_produce_nothing() {
	let make = || el_with("p", vec![Fact::attribute("id", "a"), Fact::style("color", "red")], vec![text("a"), el("b", vec![text("b")])]);
	assert!(diff(&make(), &make()).is_empty());
}

#[test]
fn set_text_keeps_node() {
	let mut mounted = mount(el("div", vec![text("a"), text("b")]));
	let b = mounted.live_at(&[1]).id();

	let stats = mounted.cycle(el("div", vec![text("a"), text("c")]));
	assert_eq!(stats.patches, 1);
	assert_eq!(mounted.live_at(&[1]).id(), b);
	assert_eq!(mounted.html(), "<div>ac</div>");
}

#[test]
fn replace_root() {
	let mut mounted = mount(el("span", vec![text("a")]));
	let old_root = mounted.root_id();

	mounted.cycle(el("div", vec![text("a")]));
	assert_ne!(mounted.root_id(), old_root);
	assert!(!mounted.dom.contains(old_root));
	assert_eq!(mounted.html(), "<div>a</div>");
}

#[test]
fn replace_child_under_tagger() {
	let tagger: twig_dom::Tagger<Msg> = Rc::new(|message: Msg| format!("outer/{}", message));
	let on_click = twig_dom::Decoder::succeed("clicked".to_owned());
	let view = |tag: &str| {
		el("div", vec![text("a"), el_with(tag, vec![Fact::on("click", twig_dom::Handler::Normal(on_click.clone()))], vec![]), text("c")]).map(&tagger)
	};
	let mut mounted = mount(view("span"));
	let old_child = mounted.live_at(&[1]).id();
	let a = mounted.live_at(&[0]).id();

	let stats = mounted.cycle(view("b"));
	assert_eq!(stats.patches, 1);
	let new_child = mounted.live_at(&[1]).id();
	assert_ne!(new_child, old_child);
	assert!(!mounted.dom.contains(old_child));
	assert_eq!(mounted.live_at(&[0]).id(), a);
	assert_eq!(mounted.html(), "<div>a<b></b>c</div>");

	mounted.dom.dispatch(new_child, "click", &serde_json::json!({ "type": "click" }));
	assert_eq!(mounted.messages(), vec![("outer/clicked".to_owned(), false)]);
}

#[test]
fn trim_and_append() {
	let mut mounted = mount(el("ol", vec![text("a"), text("b"), text("c")]));
	let a = mounted.live_at(&[0]).id();
	let c = mounted.live_at(&[2]).id();

	mounted.cycle(el("ol", vec![text("a")]));
	assert_eq!(mounted.html(), "<ol>a</ol>");
	assert_eq!(mounted.live_at(&[0]).id(), a);
	assert!(!mounted.dom.contains(c));

	mounted.cycle(el("ol", vec![text("a"), text("d"), text("e")]));
	assert_eq!(mounted.html(), "<ol>ade</ol>");
	assert_eq!(mounted.live_at(&[0]).id(), a);
}

#[test]
fn keyed_and_unkeyed_are_compared_without_keys() {
	let old = el("div", vec![text("a"), text("b")]);
	let new = keyed("div", vec![("x", text("a")), ("y", text("c"))]);

	let patches = diff(&old, &new);
	assert_eq!(patches.len(), 1);
	assert_eq!(patches[0].index(), 2);
	assert!(matches!(patches[0].kind(), PatchKind::SetText(_)));

	let mut mounted = mount(new);
	mounted.cycle(old);
	assert_eq!(mounted.html(), "<div>ab</div>");
}

#[test]
fn facts_updates() {
	let mut mounted = mount(el_with(
		"input",
		vec![
			Fact::attribute("class", "a"),
			Fact::attribute("class", "b"),
			Fact::attribute("title", "t"),
			Fact::style("color", "red"),
			Fact::property("value", "x"),
			Fact::property("tabIndex", 3),
		],
		vec![],
	));
	let root = mounted.root_id();
	assert_eq!(mounted.html(), r#"<input class="a b" title="t" style="color: red;"></input>"#);

	mounted.cycle(el_with("input", vec![Fact::attribute("class", "c"), Fact::style("margin", "0"), Fact::property("value", "y")], vec![]));
	assert_eq!(mounted.root_id(), root);
	assert_eq!(mounted.html(), r#"<input class="c" style="margin: 0;"></input>"#);
	assert_eq!(mounted.dom.property(root, "value"), Some(&serde_json::json!("y")));
	assert_eq!(mounted.dom.property(root, "tabIndex"), Some(&serde_json::Value::Null));
}

#[test]
fn form_properties_are_always_reapplied() {
	let old = el_with("input", vec![Fact::property("value", "same"), Fact::property("title", "same")], vec![]);
	let new = el_with("input", vec![Fact::property("value", "same"), Fact::property("title", "same")], vec![]);

	let patches = diff(&old, &new);
	assert_eq!(patches.len(), 1);
	match patches[0].kind() {
		PatchKind::UpdateFacts(facts) => {
			assert_eq!(facts.property("value"), Some(&serde_json::json!("same")));
			assert_eq!(facts.property("title"), None);
		}
		other => panic!("Expected UpdateFacts, found {:?}", other),
	}
}

#[test]
fn namespaced_attributes() {
	const XLINK: &str = "http://www.w3.org/1999/xlink";
	let svg = |href: &str| Node::<Msg>::element_ns("http://www.w3.org/2000/svg", "use", vec![Fact::attribute_ns(XLINK, "href", href)], vec![]);

	let mut mounted = mount(svg("#a"));
	let root = mounted.root_id();
	assert_eq!(mounted.dom.attribute_ns(root, Some(XLINK), "href"), Some("#a"));

	mounted.cycle(svg("#b"));
	assert_eq!(mounted.root_id(), root);
	assert_eq!(mounted.dom.attribute_ns(root, Some(XLINK), "href"), Some("#b"));
}

#[test]
fn sanitizing_constructors() {
	let view = el_with(
		"script",
		vec![Fact::attribute("onclick", "steal()"), Fact::attribute("href", " JavaScript:steal()"), Fact::property("innerHTML", "<b>")],
		vec![],
	);
	assert_eq!(view.tag(), Some("p"));

	let mounted = mount(view);
	let root = mounted.root_id();
	assert_eq!(mounted.dom.attribute(root, "onclick"), None);
	assert_eq!(mounted.dom.attribute(root, "data-onclick"), Some("steal()"));
	assert_eq!(mounted.dom.attribute(root, "href"), Some(""));
	assert_eq!(mounted.dom.property(root, "innerHTML"), None);
	assert_eq!(mounted.dom.property(root, "data-innerHTML"), Some(&serde_json::json!("<b>")));
}

#[test]
fn tagger_chain_length_mismatch_replaces() {
	let tagger: twig_dom::Tagger<Msg> = Rc::new(|message: Msg| message);
	let old = text("a").map(&tagger);
	let new = text("a").map(&tagger).map(&tagger);

	let patches = diff(&old, &new);
	assert_eq!(patches.len(), 1);
	assert!(matches!(patches[0].kind(), PatchKind::Replace(node) if matches!(node.kind(), NodeKind::Tagged(_))));
}

struct Canvas;
impl Widget for Canvas {
	type State = String;

	fn render(&self, state: &String, dom: &mut dyn Dom) -> NodeId {
		let node = dom.create_element(None, "canvas").unwrap();
		dom.set_attribute(node, None, "data-label", Some(state)).unwrap();
		node
	}

	fn diff(&self, old: &String, new: &String) -> Option<CustomPatch> {
		if old == new {
			return None;
		}
		let label = new.clone();
		let patch: CustomPatch = Rc::new(move |dom: &mut dyn Dom, node: NodeId| {
			dom.set_attribute(node, None, "data-label", Some(&label)).unwrap();
			node
		});
		Some(patch)
	}
}

#[test]
fn custom_widget() {
	let canvas = Rc::new(Canvas);
	let other_canvas = Rc::new(Canvas);
	let view = |widget: &Rc<Canvas>, label: &str| el("div", vec![Node::custom(vec![Fact::attribute("id", "c")], widget, label.to_owned())]);

	let mut mounted = mount(view(&canvas, "one"));
	let custom = mounted.live_at(&[0]).id();
	assert_eq!(mounted.html(), r#"<div><canvas data-label="one" id="c"></canvas></div>"#);

	let stats = mounted.cycle(view(&canvas, "two"));
	assert_eq!(stats.patches, 1);
	assert_eq!(mounted.live_at(&[0]).id(), custom);
	assert_eq!(mounted.html(), r#"<div><canvas data-label="two" id="c"></canvas></div>"#);

	mounted.cycle(view(&other_canvas, "two"));
	assert_ne!(mounted.live_at(&[0]).id(), custom);
	assert_eq!(mounted.html(), render_html(&view(&other_canvas, "two")));
}
