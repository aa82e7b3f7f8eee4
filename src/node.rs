//! The abstract tree: immutable node descriptions produced fresh every render cycle.

use crate::{
	dom::{Dom, NodeId},
	facts::{Fact, Facts},
};
use core::{
	any::{Any, TypeId},
	cell::RefCell,
	fmt::{self, Debug, Formatter},
};
use std::rc::Rc;
use tracing::error;

/// Rewrites a message bubbling up out of a [`Tagged`] subtree.
pub type Tagger<Msg> = Rc<dyn Fn(Msg) -> Msg>;

/// An opaque update produced by a [`Widget`], applied to the widget's display node.
///
/// Returns the node that now represents the widget, which may be a replacement.
pub type CustomPatch = Rc<dyn Fn(&mut dyn Dom, NodeId) -> NodeId>;

/// A cheaply clonable handle to an abstract node.
///
/// Identity matters: diffing a node against itself (as determined by [`Node::ptr_eq`]) is free,
/// which is what makes [`Thunk`] caching effective.
pub struct Node<Msg>(Rc<NodeKind<Msg>>);
impl<Msg> Clone for Node<Msg> {
	fn clone(&self) -> Self {
		Self(Rc::clone(&self.0))
	}
}

pub enum NodeKind<Msg> {
	Text(String),
	Element(Element<Msg, Node<Msg>>),
	KeyedElement(Element<Msg, (String, Node<Msg>)>),
	Custom(Custom<Msg>),
	Tagged(Tagged<Msg>),
	Thunk(Thunk<Msg>),
}

pub struct Element<Msg, C> {
	tag: String,
	namespace: Option<String>,
	facts: Facts<Msg>,
	children: Vec<C>,
	descendants: usize,
}
impl<Msg, C> Element<Msg, C> {
	#[must_use]
	pub fn tag(&self) -> &str {
		&self.tag
	}

	#[must_use]
	pub fn namespace(&self) -> Option<&str> {
		self.namespace.as_deref()
	}

	#[must_use]
	pub fn facts(&self) -> &Facts<Msg> {
		&self.facts
	}

	#[must_use]
	pub fn children(&self) -> &[C] {
		&self.children
	}

	/// The number of abstract nodes below this one, computed once at construction.
	#[must_use]
	pub fn descendants(&self) -> usize {
		self.descendants
	}

	pub(crate) fn same_identity<D>(&self, other: &Element<Msg, D>) -> bool {
		self.tag == other.tag && self.namespace == other.namespace
	}
}
impl<Msg> Element<Msg, (String, Node<Msg>)> {
	/// The children without their keys.
	#[must_use]
	pub fn nodes(&self) -> Vec<Node<Msg>> {
		self.children.iter().map(|(_, node)| node.clone()).collect()
	}
}

pub struct Tagged<Msg> {
	tagger: Tagger<Msg>,
	inner: Node<Msg>,
	descendants: usize,
}
impl<Msg> Tagged<Msg> {
	#[must_use]
	pub fn tagger(&self) -> &Tagger<Msg> {
		&self.tagger
	}

	#[must_use]
	pub fn inner(&self) -> &Node<Msg> {
		&self.inner
	}

	/// Collects the taggers of directly nested [`Tagged`] nodes, outermost first, and returns the first non-[`Tagged`] node below them.
	#[must_use]
	pub fn unwrap_chain(&self) -> (Vec<Tagger<Msg>>, &Node<Msg>) {
		let mut taggers = vec![Rc::clone(&self.tagger)];
		let mut inner = &self.inner;
		while let NodeKind::Tagged(tagged) = inner.kind() {
			taggers.push(Rc::clone(&tagged.tagger));
			inner = &tagged.inner;
		}
		(taggers, inner)
	}
}

pub(crate) fn same_tagger<Msg>(a: &Tagger<Msg>, b: &Tagger<Msg>) -> bool {
	Rc::as_ptr(a).cast::<()>() == Rc::as_ptr(b).cast::<()>()
}

/// A memoized subtree, recomputed only when one of its reference inputs changes identity.
///
/// Structurally equal but freshly allocated inputs count as changed.
pub struct Thunk<Msg> {
	refs: Vec<Rc<dyn Any>>,
	compute: Box<dyn Fn() -> Node<Msg>>,
	cached: RefCell<Option<Node<Msg>>>,
}
impl<Msg> Thunk<Msg> {
	/// Returns the cached subtree, computing it first if necessary.
	pub fn force(&self) -> Node<Msg> {
		if let Some(cached) = &*self.cached.borrow() {
			return cached.clone();
		}
		let computed = (self.compute)();
		*self.cached.borrow_mut() = Some(computed.clone());
		computed
	}

	#[must_use]
	pub fn is_forced(&self) -> bool {
		self.cached.borrow().is_some()
	}

	/// Positional identity comparison of the reference inputs.
	#[must_use]
	pub fn same_refs(&self, other: &Self) -> bool {
		self.refs.len() == other.refs.len() && self.refs.iter().zip(&other.refs).all(|(a, b)| Rc::as_ptr(a).cast::<()>() == Rc::as_ptr(b).cast::<()>())
	}

	/// Takes over `previous`'s cached subtree without computing anything.
	pub(crate) fn reuse(&self, previous: &Self) {
		*self.cached.borrow_mut() = previous.cached.borrow().clone();
	}
}

/// An externally managed display node, like a third-party editor or a canvas.
///
/// The widget instance's identity (the `Rc` passed to [`Node::custom`]) decides whether an old custom node can be updated or must be replaced.
pub trait Widget: 'static {
	type State: 'static;

	fn render(&self, state: &Self::State, dom: &mut dyn Dom) -> NodeId;

	fn diff(&self, old: &Self::State, new: &Self::State) -> Option<CustomPatch>;
}

trait ErasedInstance {
	fn widget_ptr(&self) -> *const ();
	fn widget_type(&self) -> TypeId;
	fn state(&self) -> &dyn Any;
	fn render(&self, dom: &mut dyn Dom) -> NodeId;
	fn diff(&self, new: &dyn ErasedInstance) -> Option<CustomPatch>;
}

struct Instance<W: Widget> {
	widget: Rc<W>,
	state: W::State,
}
impl<W: Widget> ErasedInstance for Instance<W> {
	fn widget_ptr(&self) -> *const () {
		Rc::as_ptr(&self.widget).cast()
	}

	fn widget_type(&self) -> TypeId {
		TypeId::of::<W>()
	}

	fn state(&self) -> &dyn Any {
		&self.state
	}

	fn render(&self, dom: &mut dyn Dom) -> NodeId {
		self.widget.render(&self.state, dom)
	}

	fn diff(&self, new: &dyn ErasedInstance) -> Option<CustomPatch> {
		match new.state().downcast_ref::<W::State>() {
			Some(new_state) => self.widget.diff(&self.state, new_state),
			None => {
				error!("twig-dom bug: Custom node state type mismatch for the same widget. Skipping update.");
				None
			}
		}
	}
}

pub struct Custom<Msg> {
	facts: Facts<Msg>,
	instance: Box<dyn ErasedInstance>,
}
impl<Msg> Custom<Msg> {
	#[must_use]
	pub fn facts(&self) -> &Facts<Msg> {
		&self.facts
	}

	#[must_use]
	pub fn state<S: 'static>(&self) -> Option<&S> {
		self.instance.state().downcast_ref()
	}

	#[must_use]
	pub fn same_widget(&self, other: &Self) -> bool {
		self.instance.widget_ptr() == other.instance.widget_ptr() && self.instance.widget_type() == other.instance.widget_type()
	}

	pub(crate) fn render(&self, dom: &mut dyn Dom) -> NodeId {
		self.instance.render(dom)
	}

	pub(crate) fn diff(&self, new: &Self) -> Option<CustomPatch> {
		self.instance.diff(&*new.instance)
	}
}

/// Rewrites `script` tags to `p` so that views can't inject scripts.
#[must_use]
pub fn no_script(tag: &str) -> &str {
	if tag == "script" {
		"p"
	} else {
		tag
	}
}

impl<Msg: 'static> Node<Msg> {
	fn new(kind: NodeKind<Msg>) -> Self {
		Self(Rc::new(kind))
	}

	pub fn text(text: impl Into<String>) -> Self {
		Self::new(NodeKind::Text(text.into()))
	}

	pub fn element(tag: &str, facts: impl IntoIterator<Item = Fact<Msg>>, children: impl IntoIterator<Item = Node<Msg>>) -> Self {
		Self::raw_element(None, no_script(tag), Facts::organize(facts), children.into_iter().collect())
	}

	pub fn element_ns(namespace: &str, tag: &str, facts: impl IntoIterator<Item = Fact<Msg>>, children: impl IntoIterator<Item = Node<Msg>>) -> Self {
		Self::raw_element(Some(namespace.to_owned()), no_script(tag), Facts::organize(facts), children.into_iter().collect())
	}

	pub(crate) fn raw_element(namespace: Option<String>, tag: &str, facts: Facts<Msg>, children: Vec<Node<Msg>>) -> Self {
		let descendants = children.len() + children.iter().map(Node::subtree_size).sum::<usize>();
		Self::new(NodeKind::Element(Element {
			tag: tag.to_owned(),
			namespace,
			facts,
			children,
			descendants,
		}))
	}

	pub fn keyed<K: Into<String>>(tag: &str, facts: impl IntoIterator<Item = Fact<Msg>>, children: impl IntoIterator<Item = (K, Node<Msg>)>) -> Self {
		Self::raw_keyed(None, no_script(tag), Facts::organize(facts), children.into_iter().map(|(key, node)| (key.into(), node)).collect())
	}

	pub fn keyed_ns<K: Into<String>>(namespace: &str, tag: &str, facts: impl IntoIterator<Item = Fact<Msg>>, children: impl IntoIterator<Item = (K, Node<Msg>)>) -> Self {
		Self::raw_keyed(Some(namespace.to_owned()), no_script(tag), Facts::organize(facts), children.into_iter().map(|(key, node)| (key.into(), node)).collect())
	}

	fn raw_keyed(namespace: Option<String>, tag: &str, facts: Facts<Msg>, children: Vec<(String, Node<Msg>)>) -> Self {
		let descendants = children.len() + children.iter().map(|(_, node)| node.subtree_size()).sum::<usize>();
		Self::new(NodeKind::KeyedElement(Element {
			tag: tag.to_owned(),
			namespace,
			facts,
			children,
			descendants,
		}))
	}

	pub fn custom<W: Widget>(facts: impl IntoIterator<Item = Fact<Msg>>, widget: &Rc<W>, state: W::State) -> Self {
		Self::new(NodeKind::Custom(Custom {
			facts: Facts::organize(facts),
			instance: Box::new(Instance { widget: Rc::clone(widget), state }),
		}))
	}

	/// Wraps `self` so that messages raised inside it pass through `tagger` on their way out.
	#[must_use]
	pub fn map(self, tagger: &Tagger<Msg>) -> Self {
		let descendants = 1 + self.subtree_size();
		Self::new(NodeKind::Tagged(Tagged {
			tagger: Rc::clone(tagger),
			inner: self,
			descendants,
		}))
	}

	/// A memoized subtree that is only recomputed if `refs` differ by identity from the previous cycle's.
	pub fn thunk(refs: Vec<Rc<dyn Any>>, compute: impl Fn() -> Node<Msg> + 'static) -> Self {
		Self::new(NodeKind::Thunk(Thunk {
			refs,
			compute: Box::new(compute),
			cached: RefCell::new(None),
		}))
	}

	pub fn lazy<A: 'static, F: Fn(&A) -> Node<Msg> + 'static>(view: &Rc<F>, a: &Rc<A>) -> Self {
		let (view_, a_) = (Rc::clone(view), Rc::clone(a));
		Self::thunk(vec![Rc::clone(view) as Rc<dyn Any>, Rc::clone(a) as Rc<dyn Any>], move || view_(&a_))
	}

	pub fn lazy2<A: 'static, B: 'static, F: Fn(&A, &B) -> Node<Msg> + 'static>(view: &Rc<F>, a: &Rc<A>, b: &Rc<B>) -> Self {
		let (view_, a_, b_) = (Rc::clone(view), Rc::clone(a), Rc::clone(b));
		Self::thunk(vec![Rc::clone(view) as Rc<dyn Any>, Rc::clone(a) as Rc<dyn Any>, Rc::clone(b) as Rc<dyn Any>], move || view_(&a_, &b_))
	}

	pub fn lazy3<A: 'static, B: 'static, C: 'static, F: Fn(&A, &B, &C) -> Node<Msg> + 'static>(view: &Rc<F>, a: &Rc<A>, b: &Rc<B>, c: &Rc<C>) -> Self {
		let (view_, a_, b_, c_) = (Rc::clone(view), Rc::clone(a), Rc::clone(b), Rc::clone(c));
		Self::thunk(
			vec![Rc::clone(view) as Rc<dyn Any>, Rc::clone(a) as Rc<dyn Any>, Rc::clone(b) as Rc<dyn Any>, Rc::clone(c) as Rc<dyn Any>],
			move || view_(&a_, &b_, &c_),
		)
	}
}

impl<Msg> Node<Msg> {
	#[must_use]
	pub fn kind(&self) -> &NodeKind<Msg> {
		&self.0
	}

	#[must_use]
	pub fn ptr_eq(a: &Self, b: &Self) -> bool {
		Rc::ptr_eq(&a.0, &b.0)
	}

	/// The number of abstract nodes below this one that take part in patch indexing.
	///
	/// [`Text`](`NodeKind::Text`), [`Custom`](`NodeKind::Custom`) and [`Thunk`](`NodeKind::Thunk`) nodes count as leaves.
	#[must_use]
	pub fn subtree_size(&self) -> usize {
		match self.kind() {
			NodeKind::Element(element) => element.descendants,
			NodeKind::KeyedElement(element) => element.descendants,
			NodeKind::Tagged(tagged) => tagged.descendants,
			NodeKind::Text(_) | NodeKind::Custom(_) | NodeKind::Thunk(_) => 0,
		}
	}

	#[must_use]
	pub fn tag(&self) -> Option<&str> {
		match self.kind() {
			NodeKind::Element(element) => Some(element.tag()),
			NodeKind::KeyedElement(element) => Some(element.tag()),
			_ => None,
		}
	}

	#[must_use]
	pub fn as_text(&self) -> Option<&str> {
		match self.kind() {
			NodeKind::Text(text) => Some(text),
			_ => None,
		}
	}
}

impl<Msg> Debug for Node<Msg> {
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		match self.kind() {
			NodeKind::Text(text) => {
				if cfg!(feature = "dangerous-logging") {
					f.debug_tuple("Text").field(text).finish()
				} else {
					f.debug_tuple("Text").field(&text.len()).finish()
				}
			}
			NodeKind::Element(element) => f
				.debug_struct("Element")
				.field("tag", &element.tag)
				.field("namespace", &element.namespace)
				.field("children", &element.children)
				.finish(),
			NodeKind::KeyedElement(element) => f
				.debug_struct("KeyedElement")
				.field("tag", &element.tag)
				.field("namespace", &element.namespace)
				.field("children", &element.children)
				.finish(),
			NodeKind::Custom(_) => f.debug_struct("Custom").finish_non_exhaustive(),
			NodeKind::Tagged(tagged) => f.debug_tuple("Tagged").field(&tagged.inner).finish(),
			NodeKind::Thunk(thunk) => f.debug_struct("Thunk").field("refs.len()", &thunk.refs.len()).field("cached", &thunk.cached.borrow()).finish(),
		}
	}
}
