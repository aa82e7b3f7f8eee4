//! The display surface seam and the engine's mirror of the live display tree.

use crate::{
	error::Result,
	event::{Callback, EventNode},
};
use core::{
	cell::RefCell,
	fmt::{self, Debug, Formatter},
};
use hashbrown::HashMap;
use serde_json::Value;
use std::rc::{Rc, Weak};
use tracing::error;

/// Opaque handle of a display node owned by a [`Dom`] implementation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub u32);

/// What a listener asks the surface to do with the native event after handling it.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct EventFlags {
	pub stop_propagation: bool,
	pub prevent_default: bool,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ListenerOptions {
	/// The listener never prevents the default action.
	pub passive: bool,
}

/// Receives the JSON representation of a native event.
pub type Listener = Rc<dyn Fn(&Value) -> EventFlags>;

/// A read-back of a display node, used to [virtualize](`crate::load::virtualize`) existing content.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Inspected {
	Text(String),
	Element {
		/// `None` for HTML elements.
		namespace: Option<String>,
		tag: String,
		attributes: Vec<(String, String)>,
	},
	/// Comments, processing instructions and the like.
	Other,
}

/// The minimal set of display tree operations the reconciler needs.
///
/// This trait is object safe so that [`Widget`](`crate::node::Widget`)s can render through `&mut dyn Dom`.
pub trait Dom {
	fn create_text_node(&mut self, text: &str) -> NodeId;

	fn create_element(&mut self, namespace: Option<&str>, tag: &str) -> Result<NodeId>;

	fn set_text(&mut self, node: NodeId, text: &str) -> Result<()>;

	/// `None` removes the attribute.
	fn set_attribute(&mut self, node: NodeId, namespace: Option<&str>, name: &str, value: Option<&str>) -> Result<()>;

	/// An empty `value` removes the style.
	fn set_style(&mut self, node: NodeId, name: &str, value: &str) -> Result<()>;

	fn set_property(&mut self, node: NodeId, name: &str, value: &Value) -> Result<()>;

	/// Inserts (or moves) `child` into `parent` before `reference`, or at the end if `reference` is `None`.
	fn insert_before(&mut self, parent: NodeId, child: NodeId, reference: Option<NodeId>) -> Result<()>;

	fn remove_child(&mut self, parent: NodeId, child: NodeId) -> Result<()>;

	/// Appends all `children` at once. Override this if the surface can batch insertions.
	fn append_children(&mut self, parent: NodeId, children: &[NodeId]) -> Result<()> {
		for &child in children {
			self.insert_before(parent, child, None)?;
		}
		Ok(())
	}

	/// Registers `listener` as the only listener for `name` on `node`.
	fn add_event_listener(&mut self, node: NodeId, name: &str, listener: Listener, options: ListenerOptions) -> Result<()>;

	fn remove_event_listener(&mut self, node: NodeId, name: &str) -> Result<()>;

	/// `node` and its subtree are detached and will never be used again.
	fn release(&mut self, node: NodeId);

	fn inspect(&self, node: NodeId) -> Result<Inspected>;

	fn child_nodes(&mut self, node: NodeId) -> Result<Vec<NodeId>>;
}

/// The engine's side of a live display node.
///
/// Mirrors the surface's child list so that patches can be resolved without reading the surface,
/// and carries the node's event dispatch root and listener cells.
pub struct LiveNode<Msg>(Rc<LiveData<Msg>>);

struct LiveData<Msg> {
	id: NodeId,
	parent: RefCell<Weak<LiveData<Msg>>>,
	children: RefCell<Vec<LiveNode<Msg>>>,
	event_node: RefCell<Option<Rc<EventNode<Msg>>>>,
	callbacks: RefCell<HashMap<String, Rc<Callback<Msg>>>>,
}

impl<Msg> Clone for LiveNode<Msg> {
	fn clone(&self) -> Self {
		Self(Rc::clone(&self.0))
	}
}
impl<Msg> Debug for LiveNode<Msg> {
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		f.debug_struct("LiveNode").field("id", &self.0.id).field("children", &self.0.children.borrow()).finish_non_exhaustive()
	}
}

impl<Msg> LiveNode<Msg> {
	#[must_use]
	pub fn new(id: NodeId) -> Self {
		Self(Rc::new(LiveData {
			id,
			parent: RefCell::new(Weak::new()),
			children: RefCell::new(Vec::new()),
			event_node: RefCell::new(None),
			callbacks: RefCell::new(HashMap::new()),
		}))
	}

	#[must_use]
	pub fn id(&self) -> NodeId {
		self.0.id
	}

	#[must_use]
	pub fn ptr_eq(a: &Self, b: &Self) -> bool {
		Rc::ptr_eq(&a.0, &b.0)
	}

	#[must_use]
	pub fn parent(&self) -> Option<Self> {
		self.0.parent.borrow().upgrade().map(Self)
	}

	#[must_use]
	pub fn children(&self) -> Vec<Self> {
		self.0.children.borrow().clone()
	}

	#[must_use]
	pub fn child(&self, index: usize) -> Option<Self> {
		self.0.children.borrow().get(index).cloned()
	}

	#[must_use]
	pub fn child_count(&self) -> usize {
		self.0.children.borrow().len()
	}

	#[must_use]
	pub fn event_node(&self) -> Option<Rc<EventNode<Msg>>> {
		self.0.event_node.borrow().clone()
	}

	pub fn set_event_node(&self, event_node: Option<Rc<EventNode<Msg>>>) {
		*self.0.event_node.borrow_mut() = event_node;
	}

	pub(crate) fn callback(&self, name: &str) -> Option<Rc<Callback<Msg>>> {
		self.0.callbacks.borrow().get(name).cloned()
	}

	pub(crate) fn set_callback(&self, name: &str, callback: Option<Rc<Callback<Msg>>>) {
		let mut callbacks = self.0.callbacks.borrow_mut();
		match callback {
			Some(callback) => {
				callbacks.insert(name.to_owned(), callback);
			}
			None => {
				callbacks.remove(name);
			}
		}
	}

	#[must_use]
	pub fn listener_names(&self) -> Vec<String> {
		self.0.callbacks.borrow().keys().cloned().collect()
	}

	fn position_in_parent(&self, parent: &Self) -> Option<usize> {
		parent.0.children.borrow().iter().position(|child| Self::ptr_eq(child, self))
	}

	/// Inserts `child` before the child currently at `index`, or appends it if `index` is `None` or out of range.
	///
	/// A `child` that is still attached elsewhere is moved.
	pub fn insert_child(&self, dom: &mut dyn Dom, child: &Self, index: Option<usize>) {
		child.detach(dom);
		let reference = index.and_then(|index| self.child(index));
		if let Err(error) = dom.insert_before(self.id(), child.id(), reference.as_ref().map(Self::id)) {
			error!("Failed to insert display node {:?} into {:?}: {}", child.id(), self.id(), error);
		}
		let mut children = self.0.children.borrow_mut();
		match index {
			Some(index) if index < children.len() => children.insert(index, child.clone()),
			_ => children.push(child.clone()),
		}
		*child.0.parent.borrow_mut() = Rc::downgrade(&self.0);
	}

	/// Appends `children` in one batch. They must not be attached anywhere.
	pub fn append_children(&self, dom: &mut dyn Dom, children: Vec<Self>) {
		if children.is_empty() {
			return;
		}
		let ids = children.iter().map(Self::id).collect::<Vec<_>>();
		if let Err(error) = dom.append_children(self.id(), &ids) {
			error!("Failed to append {} display node(s) to {:?}: {}", ids.len(), self.id(), error);
		}
		for child in &children {
			debug_assert!(child.parent().is_none(), "Batch-appended node is still attached");
			*child.0.parent.borrow_mut() = Rc::downgrade(&self.0);
		}
		self.0.children.borrow_mut().extend(children);
	}

	/// Records `children` as this node's children without touching the surface, for content that is already in place.
	pub(crate) fn adopt_children(&self, children: Vec<Self>) {
		for child in &children {
			*child.0.parent.borrow_mut() = Rc::downgrade(&self.0);
		}
		self.0.children.borrow_mut().extend(children);
	}

	/// Removes this node from its parent, if it has one. The node stays usable.
	pub fn detach(&self, dom: &mut dyn Dom) {
		let parent = match self.parent() {
			Some(parent) => parent,
			None => return,
		};
		if let Err(error) = dom.remove_child(parent.id(), self.id()) {
			error!("Failed to detach display node {:?} from {:?}: {}", self.id(), parent.id(), error);
		}
		if let Some(position) = self.position_in_parent(&parent) {
			parent.0.children.borrow_mut().remove(position);
		}
		*self.0.parent.borrow_mut() = Weak::new();
	}

	/// Detaches this node and releases it and its subtree on the surface.
	pub fn destroy(&self, dom: &mut dyn Dom) {
		self.detach(dom);
		self.0.callbacks.borrow_mut().clear();
		dom.release(self.id());
	}

	/// Puts `replacement` where `self` is and destroys `self`.
	pub fn replace_with(&self, dom: &mut dyn Dom, replacement: &Self) {
		if let Some(parent) = self.parent() {
			let position = self.position_in_parent(&parent);
			parent.insert_child(dom, replacement, position);
		}
		self.destroy(dom);
	}
}
