//! A headless display surface, for tests, server-side rendering and snapshots.

use crate::{
	dom::{Dom, EventFlags, Inspected, Listener, ListenerOptions, NodeId},
	error::{Error, Result},
};
use core::fmt::{self, Debug, Formatter, Write as _};
use hashbrown::HashMap;
use serde_json::Value;
use std::collections::BTreeMap;
use tracing::{instrument, trace};

enum Data {
	Text(String),
	Element {
		namespace: Option<String>,
		tag: String,
		/// (namespace, name) -> value
		attributes: BTreeMap<(Option<String>, String), String>,
		styles: BTreeMap<String, String>,
		properties: BTreeMap<String, Value>,
		listeners: HashMap<String, (Listener, ListenerOptions)>,
	},
}

struct MemoryNode {
	parent: Option<NodeId>,
	children: Vec<NodeId>,
	data: Data,
}

/// An in-memory display tree.
///
/// Node ids are never reused, so tests can compare them to check whether a node survived a render cycle.
#[derive(Default)]
pub struct MemoryDom {
	nodes: HashMap<NodeId, MemoryNode>,
	next_id: u32,
	created: usize,
	listeners_added: usize,
}
impl Debug for MemoryDom {
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		f.debug_struct("MemoryDom").field("nodes.len()", &self.nodes.len()).field("created", &self.created).finish()
	}
}

impl MemoryDom {
	#[must_use]
	pub fn new() -> Self {
		Self::default()
	}

	/// Number of nodes that exist and haven't been released.
	#[must_use]
	pub fn len(&self) -> usize {
		self.nodes.len()
	}

	#[must_use]
	pub fn is_empty(&self) -> bool {
		self.nodes.is_empty()
	}

	/// Number of nodes ever created.
	#[must_use]
	pub fn created(&self) -> usize {
		self.created
	}

	/// Number of event listeners ever registered.
	#[must_use]
	pub fn listeners_added(&self) -> usize {
		self.listeners_added
	}

	#[must_use]
	pub fn contains(&self, node: NodeId) -> bool {
		self.nodes.contains_key(&node)
	}

	fn insert(&mut self, data: Data) -> NodeId {
		self.next_id += 1;
		self.created += 1;
		let id = NodeId(self.next_id);
		self.nodes.insert(id, MemoryNode { parent: None, children: Vec::new(), data });
		id
	}

	fn node(&self, node: NodeId) -> Result<&MemoryNode> {
		self.nodes.get(&node).ok_or(Error::UnknownNode(node))
	}

	fn node_mut(&mut self, node: NodeId) -> Result<&mut MemoryNode> {
		self.nodes.get_mut(&node).ok_or(Error::UnknownNode(node))
	}

	fn element_mut(&mut self, node: NodeId) -> Result<&mut Data> {
		let data = &mut self.node_mut(node)?.data;
		if let Data::Text(_) = data {
			return Err(Error::NotAnElement(node));
		}
		Ok(data)
	}

	#[must_use]
	pub fn parent(&self, node: NodeId) -> Option<NodeId> {
		self.nodes.get(&node).and_then(|node| node.parent)
	}

	#[must_use]
	pub fn children(&self, node: NodeId) -> Vec<NodeId> {
		self.nodes.get(&node).map(|node| node.children.clone()).unwrap_or_default()
	}

	#[must_use]
	pub fn text(&self, node: NodeId) -> Option<&str> {
		match &self.nodes.get(&node)?.data {
			Data::Text(text) => Some(text),
			Data::Element { .. } => None,
		}
	}

	#[must_use]
	pub fn tag(&self, node: NodeId) -> Option<&str> {
		match &self.nodes.get(&node)?.data {
			Data::Element { tag, .. } => Some(tag),
			Data::Text(_) => None,
		}
	}

	#[must_use]
	pub fn attribute(&self, node: NodeId, name: &str) -> Option<&str> {
		self.attribute_ns(node, None, name)
	}

	#[must_use]
	pub fn attribute_ns(&self, node: NodeId, namespace: Option<&str>, name: &str) -> Option<&str> {
		match &self.nodes.get(&node)?.data {
			Data::Element { attributes, .. } => attributes.get(&(namespace.map(str::to_owned), name.to_owned())).map(String::as_str),
			Data::Text(_) => None,
		}
	}

	#[must_use]
	pub fn style(&self, node: NodeId, name: &str) -> Option<&str> {
		match &self.nodes.get(&node)?.data {
			Data::Element { styles, .. } => styles.get(name).map(String::as_str),
			Data::Text(_) => None,
		}
	}

	#[must_use]
	pub fn property(&self, node: NodeId, name: &str) -> Option<&Value> {
		match &self.nodes.get(&node)?.data {
			Data::Element { properties, .. } => properties.get(name),
			Data::Text(_) => None,
		}
	}

	/// Returns the options of the listener for `name`, if one is registered.
	#[must_use]
	pub fn listener(&self, node: NodeId, name: &str) -> Option<ListenerOptions> {
		match &self.nodes.get(&node)?.data {
			Data::Element { listeners, .. } => listeners.get(name).map(|(_, options)| *options),
			Data::Text(_) => None,
		}
	}

	/// Fires `name` at `target` and bubbles it up through the ancestors until a listener stops propagation.
	#[instrument(skip(self, event))]
	pub fn dispatch(&self, target: NodeId, name: &str, event: &Value) -> EventFlags {
		let mut flags = EventFlags::default();
		let mut current = Some(target);
		while let Some(id) = current {
			let node = match self.nodes.get(&id) {
				Some(node) => node,
				None => break,
			};
			if let Data::Element { listeners, .. } = &node.data {
				if let Some((listener, _)) = listeners.get(name) {
					let listener = listener.clone();
					let result = listener(event);
					flags.prevent_default |= result.prevent_default;
					if result.stop_propagation {
						trace!("Propagation stopped at {:?}.", id);
						flags.stop_propagation = true;
						break;
					}
				}
			}
			current = node.parent;
		}
		flags
	}

	/// Serializes the subtree at `node` as HTML, for structural comparisons.
	///
	/// Attributes and styles are sorted by name. Properties and listeners are not included.
	#[must_use]
	pub fn to_html(&self, node: NodeId) -> String {
		let mut html = String::new();
		self.write_html(node, &mut html);
		html
	}

	fn write_html(&self, node: NodeId, html: &mut String) {
		let node = match self.nodes.get(&node) {
			Some(node) => node,
			None => return html.push_str("<!--released-->"),
		};
		match &node.data {
			Data::Text(text) => html.push_str(text),
			Data::Element { namespace, tag, attributes, styles, .. } => {
				html.push('<');
				html.push_str(tag);
				if let Some(namespace) = namespace {
					let _ = write!(html, " xmlns=\"{}\"", namespace);
				}
				for ((namespace, name), value) in attributes {
					match namespace {
						Some(namespace) => {
							let _ = write!(html, " {{{}}}{}=\"{}\"", namespace, name, value);
						}
						None => {
							let _ = write!(html, " {}=\"{}\"", name, value);
						}
					}
				}
				if !styles.is_empty() {
					html.push_str(" style=\"");
					for (name, value) in styles {
						let _ = write!(html, "{}: {};", name, value);
					}
					html.push('"');
				}
				html.push('>');
				for &child in &node.children {
					self.write_html(child, html);
				}
				let _ = write!(html, "</{}>", tag);
			}
		}
	}
}

impl Dom for MemoryDom {
	fn create_text_node(&mut self, text: &str) -> NodeId {
		self.insert(Data::Text(text.to_owned()))
	}

	fn create_element(&mut self, namespace: Option<&str>, tag: &str) -> Result<NodeId> {
		if tag.is_empty() || tag.contains(|c: char| c.is_whitespace() || c == '<' || c == '>') {
			return Err(Error::Surface(format!("Invalid tag name {:?}", tag)));
		}
		Ok(self.insert(Data::Element {
			namespace: namespace.map(str::to_owned),
			tag: tag.to_owned(),
			attributes: BTreeMap::new(),
			styles: BTreeMap::new(),
			properties: BTreeMap::new(),
			listeners: HashMap::new(),
		}))
	}

	fn set_text(&mut self, node: NodeId, text: &str) -> Result<()> {
		match &mut self.node_mut(node)?.data {
			Data::Text(data) => {
				data.clear();
				data.push_str(text);
				Ok(())
			}
			Data::Element { .. } => Err(Error::Unsupported("Setting text data of an element")),
		}
	}

	fn set_attribute(&mut self, node: NodeId, namespace: Option<&str>, name: &str, value: Option<&str>) -> Result<()> {
		if let Data::Element { attributes, .. } = self.element_mut(node)? {
			let key = (namespace.map(str::to_owned), name.to_owned());
			match value {
				Some(value) => {
					attributes.insert(key, value.to_owned());
				}
				None => {
					attributes.remove(&key);
				}
			}
		}
		Ok(())
	}

	fn set_style(&mut self, node: NodeId, name: &str, value: &str) -> Result<()> {
		if let Data::Element { styles, .. } = self.element_mut(node)? {
			if value.is_empty() {
				styles.remove(name);
			} else {
				styles.insert(name.to_owned(), value.to_owned());
			}
		}
		Ok(())
	}

	fn set_property(&mut self, node: NodeId, name: &str, value: &Value) -> Result<()> {
		if let Data::Element { properties, .. } = self.element_mut(node)? {
			properties.insert(name.to_owned(), value.clone());
		}
		Ok(())
	}

	fn insert_before(&mut self, parent: NodeId, child: NodeId, reference: Option<NodeId>) -> Result<()> {
		self.element_mut(parent)?;
		let previous_parent = self.node(child)?.parent;
		if let Some(previous_parent) = previous_parent {
			self.remove_child(previous_parent, child)?;
		}
		let children = &mut self.node_mut(parent)?.children;
		let position = match reference {
			Some(reference) => children.iter().position(|&c| c == reference).ok_or(Error::NotAChild { parent, child: reference })?,
			None => children.len(),
		};
		children.insert(position, child);
		self.node_mut(child)?.parent = Some(parent);
		Ok(())
	}

	fn remove_child(&mut self, parent: NodeId, child: NodeId) -> Result<()> {
		let children = &mut self.node_mut(parent)?.children;
		let position = children.iter().position(|&c| c == child).ok_or(Error::NotAChild { parent, child })?;
		children.remove(position);
		self.node_mut(child)?.parent = None;
		Ok(())
	}

	fn add_event_listener(&mut self, node: NodeId, name: &str, listener: Listener, options: ListenerOptions) -> Result<()> {
		if let Data::Element { listeners, .. } = self.element_mut(node)? {
			listeners.insert(name.to_owned(), (listener, options));
		}
		self.listeners_added += 1;
		Ok(())
	}

	fn remove_event_listener(&mut self, node: NodeId, name: &str) -> Result<()> {
		if let Data::Element { listeners, .. } = self.element_mut(node)? {
			listeners.remove(name);
		}
		Ok(())
	}

	fn release(&mut self, node: NodeId) {
		let mut stack = vec![node];
		while let Some(id) = stack.pop() {
			if let Some(removed) = self.nodes.remove(&id) {
				if let Some(parent) = removed.parent.and_then(|parent| self.nodes.get_mut(&parent)) {
					parent.children.retain(|&c| c != id);
				}
				for &child in &removed.children {
					if let Some(child) = self.nodes.get_mut(&child) {
						child.parent = None;
					}
				}
				stack.extend(removed.children);
			}
		}
	}

	fn inspect(&self, node: NodeId) -> Result<Inspected> {
		Ok(match &self.node(node)?.data {
			Data::Text(text) => Inspected::Text(text.clone()),
			Data::Element { namespace, tag, attributes, .. } => Inspected::Element {
				namespace: namespace.clone(),
				tag: tag.clone(),
				attributes: attributes.iter().filter(|((namespace, _), _)| namespace.is_none()).map(|((_, name), value)| (name.clone(), value.clone())).collect(),
			},
		})
	}

	fn child_nodes(&mut self, node: NodeId) -> Result<Vec<NodeId>> {
		Ok(self.node(node)?.children.clone())
	}
}
