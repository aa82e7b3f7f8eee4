//! Rebuilds abstract trees from display content that is already in place, like server-rendered HTML.

use crate::{
	dom::{Dom, Inspected, LiveNode, NodeId},
	error::Result,
	facts::{Fact, Facts},
	node::Node,
};
use tracing::{instrument, trace};

/// Turns the display subtree at `node` into an abstract tree and the matching live mirror.
///
/// Text stays text and elements become unkeyed elements with their attributes as facts.
/// Anything else (comments, for example) becomes empty text.
/// Names and values are taken as they are, without the sanitizing the public constructors apply.
#[instrument(skip(dom))]
pub fn virtualize<Msg: 'static>(dom: &mut dyn Dom, node: NodeId) -> Result<(Node<Msg>, LiveNode<Msg>)> {
	let live = LiveNode::new(node);
	let virtual_node = match dom.inspect(node)? {
		Inspected::Text(text) => Node::text(text),
		Inspected::Other => {
			trace!("Virtualizing {:?} as empty text.", node);
			Node::text("")
		}
		Inspected::Element { namespace, tag, attributes } => {
			let (children, live_children) = load_child_nodes(dom, node)?;
			live.adopt_children(live_children);
			load_element(namespace, &tag, attributes, children)
		}
	};
	Ok((virtual_node, live))
}

pub fn load_child_nodes<Msg: 'static>(dom: &mut dyn Dom, node: NodeId) -> Result<(Vec<Node<Msg>>, Vec<LiveNode<Msg>>)> {
	let child_nodes = dom.child_nodes(node)?;
	let mut children = Vec::with_capacity(child_nodes.len());
	let mut live_children = Vec::with_capacity(child_nodes.len());
	for child in child_nodes {
		let (child, live_child) = virtualize(dom, child)?;
		children.push(child);
		live_children.push(live_child);
	}
	Ok((children, live_children))
}

/// HTML tag names are lower-cased, since browsers report them in upper case.
fn load_element<Msg: 'static>(namespace: Option<String>, tag: &str, attributes: Vec<(String, String)>, children: Vec<Node<Msg>>) -> Node<Msg> {
	let tag = match namespace {
		None => tag.to_ascii_lowercase(),
		Some(_) => tag.to_owned(),
	};
	Node::raw_element(namespace, &tag, load_attributes(attributes), children)
}

fn load_attributes<Msg: 'static>(attributes: Vec<(String, String)>) -> Facts<Msg> {
	Facts::organize(attributes.into_iter().map(|(name, value)| Fact::raw_attribute(name, value)))
}
