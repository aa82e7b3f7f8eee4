//! Renderer: turns an abstract tree into live display nodes.

use crate::{
	dom::{Dom, Listener, ListenerOptions, LiveNode},
	event::{Callback, EventNode, Handler},
	facts::FactsDiff,
	node::{Node, NodeKind},
};
use std::rc::Rc;
use tracing::{error, instrument, trace_span};

/// Renders `node` from scratch, with listeners dispatching into `event_node`.
///
/// The result is not attached anywhere.
#[instrument(skip_all)]
pub fn render<Msg: 'static>(dom: &mut dyn Dom, node: &Node<Msg>, event_node: &Rc<EventNode<Msg>>) -> LiveNode<Msg> {
	render_help(dom, node, event_node)
}

fn render_help<Msg: 'static>(dom: &mut dyn Dom, node: &Node<Msg>, event_node: &Rc<EventNode<Msg>>) -> LiveNode<Msg> {
	match node.kind() {
		NodeKind::Text(text) => {
			let span = if cfg!(feature = "dangerous-logging") {
				trace_span!("Rendering text", text = text.as_str())
			} else {
				trace_span!("Rendering text", text.len = text.len())
			};
			let _enter = span.enter();
			LiveNode::new(dom.create_text_node(text))
		}

		NodeKind::Element(element) => {
			let span = trace_span!("Rendering element", tag = element.tag(), namespace = element.namespace());
			let _enter = span.enter();
			let live = match create_element(dom, element.namespace(), element.tag()) {
				Some(live) => live,
				None => return LiveNode::new(dom.create_text_node("")),
			};
			apply_facts(dom, &live, event_node, &FactsDiff::additions(element.facts()));
			let children = element.children().iter().map(|child| render_help(dom, child, event_node)).collect();
			live.append_children(dom, children);
			live
		}

		NodeKind::KeyedElement(element) => {
			let span = trace_span!("Rendering keyed element", tag = element.tag(), namespace = element.namespace());
			let _enter = span.enter();
			let live = match create_element(dom, element.namespace(), element.tag()) {
				Some(live) => live,
				None => return LiveNode::new(dom.create_text_node("")),
			};
			apply_facts(dom, &live, event_node, &FactsDiff::additions(element.facts()));
			let children = element.children().iter().map(|(_, child)| render_help(dom, child, event_node)).collect();
			live.append_children(dom, children);
			live
		}

		NodeKind::Custom(custom) => {
			let span = trace_span!("Rendering custom node");
			let _enter = span.enter();
			let live = LiveNode::new(custom.render(dom));
			apply_facts(dom, &live, event_node, &FactsDiff::additions(custom.facts()));
			live
		}

		NodeKind::Tagged(tagged) => {
			let (taggers, inner) = tagged.unwrap_chain();
			let span = trace_span!("Rendering tagged node", taggers = taggers.len());
			let _enter = span.enter();
			let sub_event_node = EventNode::tagged(taggers, Rc::clone(event_node));
			let live = render_help(dom, inner, &sub_event_node);
			live.set_event_node(Some(sub_event_node));
			live
		}

		NodeKind::Thunk(thunk) => {
			let span = trace_span!("Rendering thunk", cached = thunk.is_forced());
			let _enter = span.enter();
			render_help(dom, &thunk.force(), event_node)
		}
	}
}

fn create_element<Msg>(dom: &mut dyn Dom, namespace: Option<&str>, tag: &str) -> Option<LiveNode<Msg>> {
	match dom.create_element(namespace, tag) {
		Ok(id) => Some(LiveNode::new(id)),
		Err(error) => {
			error!("Failed to create element <{}>: {}. Rendering an empty text node instead.", tag, error);
			None
		}
	}
}

/// Applies a facts diff (or all facts of a new node, see [`FactsDiff::additions`]) to `live`.
pub(crate) fn apply_facts<Msg: 'static>(dom: &mut dyn Dom, live: &LiveNode<Msg>, event_node: &Rc<EventNode<Msg>>, diff: &FactsDiff<Msg>) {
	let id = live.id();
	for (name, value) in &diff.styles {
		if let Err(error) = dom.set_style(id, name, value) {
			error!("Failed to set style {:?}: {}", name, error);
		}
	}
	for (name, value) in &diff.properties {
		if let Err(error) = dom.set_property(id, name, value) {
			error!("Failed to set property {:?}: {}", name, error);
		}
	}
	for (name, value) in &diff.attributes {
		if let Err(error) = dom.set_attribute(id, None, name, value.as_deref()) {
			error!("Failed to update attribute {:?}: {}", name, error);
		}
	}
	for (name, namespace, value) in &diff.attributes_ns {
		if let Err(error) = dom.set_attribute(id, Some(namespace), name, value.as_deref()) {
			error!("Failed to update attribute {:?} in namespace {:?}: {}", name, namespace, error);
		}
	}
	for (name, handler) in &diff.events {
		apply_event(dom, live, event_node, name, handler.as_ref());
	}
}

fn apply_event<Msg: 'static>(dom: &mut dyn Dom, live: &LiveNode<Msg>, event_node: &Rc<EventNode<Msg>>, name: &str, handler: Option<&Handler<Msg>>) {
	let id = live.id();
	let existing = live.callback(name);

	let handler = match handler {
		Some(handler) => handler,
		None => {
			if existing.is_some() {
				if let Err(error) = dom.remove_event_listener(id, name) {
					error!("Failed to remove event listener {:?}: {}", name, error);
				}
				live.set_callback(name, None);
			}
			return;
		}
	};

	if let Some(callback) = existing {
		if callback.handler().same_shape(handler) {
			callback.set_handler(handler.clone());
			return;
		}
		if let Err(error) = dom.remove_event_listener(id, name) {
			error!("Failed to remove event listener {:?}: {}", name, error);
		}
		live.set_callback(name, None);
	}

	let callback = Callback::new(handler.clone(), Rc::clone(event_node));
	let listener: Listener = {
		let callback = Rc::clone(&callback);
		Rc::new(move |event| callback.handle(event))
	};
	match dom.add_event_listener(id, name, listener, ListenerOptions { passive: handler.is_passive() }) {
		Ok(()) => live.set_callback(name, Some(callback)),
		Err(error) => error!("Failed to add event listener {:?}: {}", name, error),
	}
}
