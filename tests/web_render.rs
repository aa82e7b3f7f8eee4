#![cfg(target_arch = "wasm32")]

use twig_dom::{Fact, Node, RenderSession};
use wasm_bindgen_test::{wasm_bindgen_test, wasm_bindgen_test_configure};

wasm_bindgen_test_configure!(run_in_browser);

use web_::container;

type Msg = ();

#[wasm_bindgen_test]
fn text() {
	let (mut dom, element, id) = container();
	let session = RenderSession::<Msg>::attach(&mut dom, id, Node::text("Hello twig-dom!"), |_, _| ());
	assert_eq!(element.inner_html(), "Hello twig-dom!");

	session.detach(&mut dom);
	assert_eq!(element.inner_html(), "");
	assert_eq!(dom.len(), 1);
}

#[wasm_bindgen_test]
fn element_with_facts() {
	let (mut dom, element, id) = container();
	let view = Node::<Msg>::element("p", vec![Fact::attribute("class", "greeting"), Fact::style("color", "red")], vec![Node::text("Hi")]);
	let _session = RenderSession::attach(&mut dom, id, view, |_, _| ());
	let paragraph = element.first_element_child().unwrap();
	assert_eq!(paragraph.tag_name(), "P");
	assert_eq!(paragraph.get_attribute("class").as_deref(), Some("greeting"));
	assert_eq!(paragraph.text_content().as_deref(), Some("Hi"));
	assert!(paragraph.get_attribute("style").unwrap().contains("red"));
}

#[wasm_bindgen_test]
fn svg() {
	let (mut dom, element, id) = container();
	let view = Node::<Msg>::element_ns("http://www.w3.org/2000/svg", "svg", vec![], vec![]);
	let _session = RenderSession::attach(&mut dom, id, view, |_, _| ());
	let svg = element.first_element_child().unwrap();
	assert_eq!(svg.namespace_uri().as_deref(), Some("http://www.w3.org/2000/svg"));
}

#[wasm_bindgen_test]
fn identical_cycle_is_free() {
	let (mut dom, element, id) = container();
	let view = || Node::<Msg>::element("ul", vec![], vec![Node::element("li", vec![], vec![Node::text("a")]), Node::element("li", vec![], vec![Node::text("b")])]);
	let mut session = RenderSession::attach(&mut dom, id, view(), |_, _| ());
	let registered = dom.len();

	let stats = session.cycle(&mut dom, view());
	assert_eq!(stats.patches, 0);
	assert_eq!(dom.len(), registered);
	assert_eq!(element.inner_html(), "<ul><li>a</li><li>b</li></ul>");

	session.detach(&mut dom);
	assert_eq!(dom.len(), 1);
}

#[wasm_bindgen_test]
fn keyed_move() {
	let (mut dom, element, id) = container();
	let view = |keys: &[&str]| Node::<Msg>::keyed("ol", vec![], keys.iter().map(|&key| (key, Node::element("li", vec![], vec![Node::text(key)]))));
	let mut session = RenderSession::attach(&mut dom, id, view(&["a", "b", "c"]), |_, _| ());
	let first = element.first_element_child().unwrap().first_child().unwrap();

	session.cycle(&mut dom, view(&["b", "c", "a"]));
	assert_eq!(element.inner_html(), "<ol><li>b</li><li>c</li><li>a</li></ol>");
	let last = element.first_element_child().unwrap().last_child().unwrap();
	assert!(first.is_same_node(Some(&last)));
}

#[wasm_bindgen_test]
fn hydrate() {
	let (mut dom, element, id) = container();
	element.set_inner_html(r#"<p class="greeting">Hi</p>"#);
	let paragraph = element.first_child().unwrap();

	let mut session = RenderSession::<Msg>::hydrate(&mut dom, id, |_, _| ()).unwrap();
	let stats = session.cycle(&mut dom, Node::element("p", vec![Fact::attribute("class", "greeting")], vec![Node::text("Hello")]));
	assert_eq!(stats.patches, 1);
	assert!(paragraph.is_same_node(element.first_child().as_ref()));
	assert_eq!(element.inner_html(), r#"<p class="greeting">Hello</p>"#);
}
