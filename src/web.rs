//! A display surface over a browser [`web_sys::Document`].

use crate::{
	dom::{Dom, EventFlags, Inspected, Listener, ListenerOptions, NodeId},
	error::{Error, Result},
};
use core::fmt::{self, Debug, Formatter};
use hashbrown::HashMap;
use js_sys::{Reflect, JSON};
use serde_json::{Map, Number, Value};
use tracing::{error, instrument, trace};
use wasm_bindgen::{closure::Closure, JsCast, JsValue};

/// Expando under which each registered DOM node remembers its [`NodeId`].
const ID_PROPERTY: &str = "__twig_dom_id";
const XHTML_NAMESPACE: &str = "http://www.w3.org/1999/xhtml";

const EVENT_FIELDS: &[&str] = &["key", "code", "keyCode", "button", "buttons", "clientX", "clientY", "pageX", "pageY", "altKey", "ctrlKey", "metaKey", "shiftKey", "detail", "deltaX", "deltaY"];
const TARGET_FIELDS: &[&str] = &["value", "checked", "id", "tagName"];

struct Registered {
	node: web_sys::Node,
	listeners: HashMap<String, Closure<dyn Fn(web_sys::Event)>>,
}

/// Renders into a browser document.
///
/// Every node created or [adopted](`WebDom::adopt`) through this surface is kept alive in a table until it is [released](`Dom::release`),
/// as are its event listener closures.
pub struct WebDom {
	document: web_sys::Document,
	nodes: HashMap<NodeId, Registered>,
	next_id: u32,
	listener_options_cache: [Option<web_sys::AddEventListenerOptions>; 2],
}
impl Debug for WebDom {
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		f.debug_struct("WebDom").field("document", &self.document).field("nodes.len()", &self.nodes.len()).finish_non_exhaustive()
	}
}

fn surface_error(error: JsValue) -> Error {
	Error::Surface(format!("{:?}", error))
}

impl WebDom {
	#[must_use]
	pub fn new(document: web_sys::Document) -> Self {
		Self {
			document,
			nodes: HashMap::new(),
			next_id: 0,
			listener_options_cache: [None, None],
		}
	}

	#[must_use]
	pub fn document(&self) -> &web_sys::Document {
		&self.document
	}

	/// Number of registered nodes.
	#[must_use]
	pub fn len(&self) -> usize {
		self.nodes.len()
	}

	#[must_use]
	pub fn is_empty(&self) -> bool {
		self.nodes.is_empty()
	}

	/// The DOM node behind `id`, if it is still registered.
	#[must_use]
	pub fn node(&self, id: NodeId) -> Option<&web_sys::Node> {
		self.nodes.get(&id).map(|registered| &registered.node)
	}

	/// Registers an existing DOM node (like a mount container), or returns its id if it is already registered.
	pub fn adopt(&mut self, node: web_sys::Node) -> NodeId {
		match id_of(&node) {
			Some(id) if self.nodes.get(&id).map_or(false, |registered| registered.node == node) => id,
			_ => self.register(node),
		}
	}

	fn register(&mut self, node: web_sys::Node) -> NodeId {
		self.next_id += 1;
		let id = NodeId(self.next_id);
		if let Err(error) = Reflect::set(&node, &JsValue::from_str(ID_PROPERTY), &JsValue::from_f64(f64::from(id.0))) {
			error!("Failed to tag DOM node with its id: {:?}", error);
		}
		self.nodes.insert(id, Registered { node, listeners: HashMap::new() });
		id
	}

	fn web_node(&self, id: NodeId) -> Result<web_sys::Node> {
		self.nodes.get(&id).map(|registered| registered.node.clone()).ok_or(Error::UnknownNode(id))
	}

	fn element(&self, id: NodeId) -> Result<web_sys::Element> {
		self.web_node(id)?.dyn_into::<web_sys::Element>().map_err(|_| Error::NotAnElement(id))
	}

	fn listener_options(&mut self, options: ListenerOptions) -> &web_sys::AddEventListenerOptions {
		self.listener_options_cache[usize::from(options.passive)].get_or_insert_with(|| {
			let mut web_options = web_sys::AddEventListenerOptions::new();
			web_options.passive(options.passive);
			web_options
		})
	}
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn id_of(node: &web_sys::Node) -> Option<NodeId> {
	Reflect::get(node, &JsValue::from_str(ID_PROPERTY)).ok()?.as_f64().map(|id| NodeId(id as u32))
}

fn primitive_to_json(value: &JsValue) -> Option<Value> {
	if let Some(string) = value.as_string() {
		Some(Value::String(string))
	} else if let Some(boolean) = value.as_bool() {
		Some(Value::Bool(boolean))
	} else if let Some(number) = value.as_f64() {
		Number::from_f64(number).map(Value::Number)
	} else if value.is_null() {
		Some(Value::Null)
	} else {
		None
	}
}

fn read_fields(object: &JsValue, fields: &[&str]) -> Map<String, Value> {
	let mut json = Map::new();
	for &field in fields {
		if let Some(value) = Reflect::get(object, &JsValue::from_str(field)).ok().as_ref().and_then(primitive_to_json) {
			json.insert(field.to_owned(), value);
		}
	}
	json
}

/// A JSON snapshot of the commonly decoded parts of a native event.
fn event_to_json(event: &web_sys::Event) -> Value {
	let mut json = read_fields(event.as_ref(), EVENT_FIELDS);
	json.insert("type".to_owned(), Value::String(event.type_()));
	if let Some(target) = event.target() {
		json.insert("target".to_owned(), Value::Object(read_fields(target.as_ref(), TARGET_FIELDS)));
	}
	Value::Object(json)
}

fn json_to_js(value: &Value) -> Result<JsValue> {
	Ok(match value {
		Value::Null => JsValue::NULL,
		Value::Bool(boolean) => JsValue::from_bool(*boolean),
		Value::Number(number) => number.as_f64().map_or(JsValue::NULL, JsValue::from_f64),
		Value::String(string) => JsValue::from_str(string),
		Value::Array(_) | Value::Object(_) => JSON::parse(&value.to_string()).map_err(surface_error)?,
	})
}

impl Dom for WebDom {
	fn create_text_node(&mut self, text: &str) -> NodeId {
		let text = self.document.create_text_node(text);
		self.register(text.into())
	}

	fn create_element(&mut self, namespace: Option<&str>, tag: &str) -> Result<NodeId> {
		let element = match namespace {
			Some(namespace) => self.document.create_element_ns(Some(namespace), tag),
			None => self.document.create_element(tag),
		}
		.map_err(surface_error)?;
		Ok(self.register(element.into()))
	}

	fn set_text(&mut self, node: NodeId, text: &str) -> Result<()> {
		match self.web_node(node)?.dyn_ref::<web_sys::CharacterData>() {
			Some(character_data) => {
				character_data.set_data(text);
				Ok(())
			}
			None => Err(Error::Unsupported("Setting text data of an element")),
		}
	}

	fn set_attribute(&mut self, node: NodeId, namespace: Option<&str>, name: &str, value: Option<&str>) -> Result<()> {
		let element = self.element(node)?;
		match (namespace, value) {
			(None, Some(value)) => element.set_attribute(name, value),
			(Some(namespace), Some(value)) => element.set_attribute_ns(Some(namespace), name, value),
			(None, None) => element.remove_attribute(name),
			(Some(namespace), None) => element.remove_attribute_ns(Some(namespace), name),
		}
		.map_err(surface_error)
	}

	fn set_style(&mut self, node: NodeId, name: &str, value: &str) -> Result<()> {
		let element = self.element(node)?;
		let style = Reflect::get(&element, &JsValue::from_str("style")).map_err(surface_error)?;
		Reflect::set(&style, &JsValue::from_str(name), &JsValue::from_str(value)).map_err(surface_error)?;
		Ok(())
	}

	fn set_property(&mut self, node: NodeId, name: &str, value: &Value) -> Result<()> {
		let target = self.web_node(node)?;
		Reflect::set(&target, &JsValue::from_str(name), &json_to_js(value)?).map_err(surface_error)?;
		Ok(())
	}

	fn insert_before(&mut self, parent: NodeId, child: NodeId, reference: Option<NodeId>) -> Result<()> {
		let parent = self.web_node(parent)?;
		let child = self.web_node(child)?;
		let reference = reference.map(|reference| self.web_node(reference)).transpose()?;
		parent.insert_before(&child, reference.as_ref()).map_err(surface_error)?;
		Ok(())
	}

	fn remove_child(&mut self, parent: NodeId, child: NodeId) -> Result<()> {
		let parent_node = self.web_node(parent)?;
		let child_node = self.web_node(child)?;
		if child_node.parent_node().as_ref() != Some(&parent_node) {
			return Err(Error::NotAChild { parent, child });
		}
		parent_node.remove_child(&child_node).map_err(surface_error)?;
		Ok(())
	}

	/// Batches the insertion through a [`web_sys::DocumentFragment`].
	fn append_children(&mut self, parent: NodeId, children: &[NodeId]) -> Result<()> {
		let parent = self.web_node(parent)?;
		let fragment = self.document.create_document_fragment();
		for &child in children {
			fragment.append_child(&self.web_node(child)?).map_err(surface_error)?;
		}
		parent.append_child(&fragment).map_err(surface_error)?;
		Ok(())
	}

	#[instrument(skip(self, listener))]
	fn add_event_listener(&mut self, node: NodeId, name: &str, listener: Listener, options: ListenerOptions) -> Result<()> {
		self.remove_event_listener(node, name)?;
		let element = self.element(node)?;
		let closure = Closure::wrap(Box::new(move |event: web_sys::Event| {
			let EventFlags { stop_propagation, prevent_default } = listener(&event_to_json(&event));
			if stop_propagation {
				event.stop_propagation();
			}
			if prevent_default {
				event.prevent_default();
			}
		}) as Box<dyn Fn(web_sys::Event)>);
		let web_options = self.listener_options(options).clone();
		element
			.add_event_listener_with_callback_and_add_event_listener_options(name, closure.as_ref().unchecked_ref(), &web_options)
			.map_err(surface_error)?;
		if let Some(registered) = self.nodes.get_mut(&node) {
			registered.listeners.insert(name.to_owned(), closure);
		}
		Ok(())
	}

	fn remove_event_listener(&mut self, node: NodeId, name: &str) -> Result<()> {
		let registered = self.nodes.get_mut(&node).ok_or(Error::UnknownNode(node))?;
		if let Some(closure) = registered.listeners.remove(name) {
			registered.node.remove_event_listener_with_callback(name, closure.as_ref().unchecked_ref()).map_err(surface_error)?;
		}
		Ok(())
	}

	#[instrument(skip(self))]
	fn release(&mut self, node: NodeId) {
		let root = match self.nodes.get(&node) {
			Some(registered) => registered.node.clone(),
			None => return,
		};
		if let Some(parent) = root.parent_node() {
			if let Err(error) = parent.remove_child(&root) {
				error!("Failed to detach released node: {:?}", error);
			}
		}

		let mut released = 0_usize;
		let mut stack = vec![root];
		while let Some(current) = stack.pop() {
			let child_nodes = current.child_nodes();
			stack.extend((0..child_nodes.length()).filter_map(|i| child_nodes.get(i)));

			let registered = match id_of(&current).and_then(|id| self.nodes.remove(&id)) {
				Some(registered) => registered,
				None => continue,
			};
			for (name, closure) in registered.listeners {
				if let Err(error) = current.remove_event_listener_with_callback(&name, closure.as_ref().unchecked_ref()) {
					error!("Failed to remove event listener {:?} of released node: {:?}", name, error);
				}
			}
			released += 1;
		}
		trace!("Released {} node(s).", released);
	}

	fn inspect(&self, node: NodeId) -> Result<Inspected> {
		let node = self.web_node(node)?;
		Ok(match node.node_type() {
			web_sys::Node::TEXT_NODE => Inspected::Text(node.text_content().unwrap_or_default()),
			web_sys::Node::ELEMENT_NODE => {
				let element = node.unchecked_into::<web_sys::Element>();
				let attribute_map = element.attributes();
				let attributes = (0..attribute_map.length())
					.filter_map(|i| attribute_map.item(i))
					.filter(|attribute| attribute.namespace_uri().is_none())
					.map(|attribute| (attribute.name(), attribute.value()))
					.collect();
				Inspected::Element {
					namespace: element.namespace_uri().filter(|namespace| namespace != XHTML_NAMESPACE),
					tag: element.tag_name(),
					attributes,
				}
			}
			_ => Inspected::Other,
		})
	}

	fn child_nodes(&mut self, node: NodeId) -> Result<Vec<NodeId>> {
		let child_nodes = self.web_node(node)?.child_nodes();
		Ok((0..child_nodes.length()).filter_map(|i| child_nodes.get(i)).map(|child| self.adopt(child)).collect())
	}
}
