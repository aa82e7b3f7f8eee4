//! Event Dispatch: decoding native events into application messages and funnelling them through taggers.

use crate::{dom::EventFlags, node::Tagger};
use core::{
	cell::RefCell,
	fmt::{self, Debug, Formatter},
	mem::discriminant,
};
use serde_json::Value;
use std::rc::Rc;
use thiserror::Error;
use tracing::{trace, trace_span};

/// The native event did not have the shape a [`Decoder`] expected.
///
/// Such events are dropped without delivering anything.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Could not decode event: {0}")]
pub struct DecodeError(pub String);

/// Reads a value out of a native event's JSON representation.
///
/// Decoders are compared by identity, so reuse the same instance across render cycles to avoid listener updates.
pub struct Decoder<T>(Rc<dyn Fn(&Value) -> Result<T, DecodeError>>);
impl<T> Clone for Decoder<T> {
	fn clone(&self) -> Self {
		Self(Rc::clone(&self.0))
	}
}
impl<T> Debug for Decoder<T> {
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		f.debug_tuple("Decoder").field(&Rc::as_ptr(&self.0).cast::<()>()).finish()
	}
}
impl<T: 'static> Decoder<T> {
	pub fn new(decode: impl Fn(&Value) -> Result<T, DecodeError> + 'static) -> Self {
		Self(Rc::new(decode))
	}

	/// Ignores the event and always produces a clone of `value`.
	pub fn succeed(value: T) -> Self
	where
		T: Clone,
	{
		Self::new(move |_| Ok(value.clone()))
	}

	/// Decodes the string at the given (nested) field path, like `["target", "value"]`.
	pub fn string_at(path: &'static [&'static str], to_value: impl Fn(String) -> T + 'static) -> Self {
		Self::new(move |event| {
			let mut current = event;
			for &field in path {
				current = current.get(field).ok_or_else(|| DecodeError(format!("Missing field {:?}", field)))?;
			}
			current
				.as_str()
				.map(|string| to_value(string.to_owned()))
				.ok_or_else(|| DecodeError(format!("Expected a string at {:?}", path)))
		})
	}

	/// Decodes the boolean at the given (nested) field path, like `["target", "checked"]`.
	pub fn bool_at(path: &'static [&'static str], to_value: impl Fn(bool) -> T + 'static) -> Self {
		Self::new(move |event| {
			let mut current = event;
			for &field in path {
				current = current.get(field).ok_or_else(|| DecodeError(format!("Missing field {:?}", field)))?;
			}
			current.as_bool().map(&to_value).ok_or_else(|| DecodeError(format!("Expected a boolean at {:?}", path)))
		})
	}

	pub fn map<U: 'static>(&self, f: impl Fn(T) -> U + 'static) -> Decoder<U> {
		let inner = Rc::clone(&self.0);
		Decoder::new(move |event| inner(event).map(&f))
	}

	pub fn decode(&self, event: &Value) -> Result<T, DecodeError> {
		(self.0)(event)
	}

	#[must_use]
	pub fn ptr_eq(&self, other: &Self) -> bool {
		Rc::as_ptr(&self.0).cast::<()>() == Rc::as_ptr(&other.0).cast::<()>()
	}
}

/// Result of a [`Handler::Custom`] decoder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CustomEvent<Msg> {
	pub message: Msg,
	pub stop_propagation: bool,
	pub prevent_default: bool,
}

/// An event handler, in one of the four decoding modes.
///
/// Changing only the decoder keeps the listener registered and swaps the handler in place.
/// Changing the mode re-registers the listener, since the mode decides whether it is passive.
pub enum Handler<Msg> {
	Normal(Decoder<Msg>),
	MayStopPropagation(Decoder<(Msg, bool)>),
	MayPreventDefault(Decoder<(Msg, bool)>),
	Custom(Decoder<CustomEvent<Msg>>),
}
impl<Msg> Clone for Handler<Msg> {
	fn clone(&self) -> Self {
		match self {
			Self::Normal(decoder) => Self::Normal(decoder.clone()),
			Self::MayStopPropagation(decoder) => Self::MayStopPropagation(decoder.clone()),
			Self::MayPreventDefault(decoder) => Self::MayPreventDefault(decoder.clone()),
			Self::Custom(decoder) => Self::Custom(decoder.clone()),
		}
	}
}
impl<Msg> Debug for Handler<Msg> {
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		match self {
			Self::Normal(decoder) => f.debug_tuple("Normal").field(decoder).finish(),
			Self::MayStopPropagation(decoder) => f.debug_tuple("MayStopPropagation").field(decoder).finish(),
			Self::MayPreventDefault(decoder) => f.debug_tuple("MayPreventDefault").field(decoder).finish(),
			Self::Custom(decoder) => f.debug_tuple("Custom").field(decoder).finish(),
		}
	}
}
impl<Msg: 'static> Handler<Msg> {
	/// Whether both handlers use the same decoding mode, so that one can replace the other without re-registering.
	#[must_use]
	pub fn same_shape(&self, other: &Self) -> bool {
		discriminant(self) == discriminant(other)
	}

	/// Same mode and the same decoder instance.
	#[must_use]
	pub fn equals(&self, other: &Self) -> bool {
		match (self, other) {
			(Self::Normal(a), Self::Normal(b)) => a.ptr_eq(b),
			(Self::MayStopPropagation(a), Self::MayStopPropagation(b)) | (Self::MayPreventDefault(a), Self::MayPreventDefault(b)) => a.ptr_eq(b),
			(Self::Custom(a), Self::Custom(b)) => a.ptr_eq(b),
			_ => false,
		}
	}

	/// Handlers that can never prevent the default action are registered as passive listeners.
	#[must_use]
	pub fn is_passive(&self) -> bool {
		matches!(self, Self::Normal(_) | Self::MayStopPropagation(_))
	}

	fn decode(&self, event: &Value) -> Result<(Msg, EventFlags), DecodeError> {
		Ok(match self {
			Self::Normal(decoder) => (decoder.decode(event)?, EventFlags::default()),
			Self::MayStopPropagation(decoder) => {
				let (message, stop_propagation) = decoder.decode(event)?;
				(message, EventFlags { stop_propagation, prevent_default: false })
			}
			Self::MayPreventDefault(decoder) => {
				let (message, prevent_default) = decoder.decode(event)?;
				(message, EventFlags { stop_propagation: false, prevent_default })
			}
			Self::Custom(decoder) => {
				let CustomEvent { message, stop_propagation, prevent_default } = decoder.decode(event)?;
				(message, EventFlags { stop_propagation, prevent_default })
			}
		})
	}
}

/// A link in the event dispatch chain.
///
/// Every [`Tagged`](`crate::node::NodeKind::Tagged`) subtree gets its own [`EventNode::Tagged`] pointing at the enclosing one.
/// The chain ends in an [`EventNode::Root`] that delivers messages to the application.
pub enum EventNode<Msg> {
	/// `deliver(message, is_synchronous)`
	Root(Rc<dyn Fn(Msg, bool)>),
	Tagged {
		/// Outermost first. Rewritten in place when only the taggers change.
		taggers: RefCell<Vec<Tagger<Msg>>>,
		parent: Rc<EventNode<Msg>>,
	},
}
impl<Msg> Debug for EventNode<Msg> {
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		match self {
			Self::Root(_) => f.debug_tuple("Root").finish(),
			Self::Tagged { taggers, parent } => f.debug_struct("Tagged").field("taggers.len()", &taggers.borrow().len()).field("parent", parent).finish(),
		}
	}
}
impl<Msg: 'static> EventNode<Msg> {
	pub fn root(deliver: impl Fn(Msg, bool) + 'static) -> Rc<Self> {
		Rc::new(Self::Root(Rc::new(deliver)))
	}

	#[must_use]
	pub fn tagged(taggers: Vec<Tagger<Msg>>, parent: Rc<Self>) -> Rc<Self> {
		Rc::new(Self::Tagged { taggers: RefCell::new(taggers), parent })
	}

	/// Replaces the taggers of a [`EventNode::Tagged`] link in place, so existing listeners pick them up.
	///
	/// Returns `false` (and does nothing) for a root.
	pub fn retag(&self, new_taggers: Vec<Tagger<Msg>>) -> bool {
		match self {
			Self::Tagged { taggers, .. } => {
				*taggers.borrow_mut() = new_taggers;
				true
			}
			Self::Root(_) => false,
		}
	}

	/// Runs `message` through every tagger up the chain and hands it to the application.
	pub fn send(self: &Rc<Self>, mut message: Msg, is_synchronous: bool) {
		let mut current = Rc::clone(self);
		loop {
			let next = match &*current {
				Self::Root(deliver) => return deliver(message, is_synchronous),
				Self::Tagged { taggers, parent } => {
					// Innermost tagger first.
					let taggers = taggers.borrow().clone();
					for tagger in taggers.iter().rev() {
						message = tagger(message);
					}
					Rc::clone(parent)
				}
			};
			current = next;
		}
	}
}

/// The per-element, per-event-name cell a registered listener reads its handler from at call time.
pub struct Callback<Msg> {
	handler: RefCell<Handler<Msg>>,
	event_node: Rc<EventNode<Msg>>,
}
impl<Msg> Debug for Callback<Msg> {
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		f.debug_struct("Callback").field("handler", &self.handler.borrow()).finish_non_exhaustive()
	}
}
impl<Msg: 'static> Callback<Msg> {
	#[must_use]
	pub fn new(handler: Handler<Msg>, event_node: Rc<EventNode<Msg>>) -> Rc<Self> {
		Rc::new(Self { handler: RefCell::new(handler), event_node })
	}

	#[must_use]
	pub fn handler(&self) -> Handler<Msg> {
		self.handler.borrow().clone()
	}

	/// Swaps the handler without touching the registered listener.
	pub fn set_handler(&self, handler: Handler<Msg>) {
		*self.handler.borrow_mut() = handler;
	}

	/// Decodes `event` and delivers the resulting message.
	///
	/// Decode failures drop the event.
	pub fn handle(&self, event: &Value) -> EventFlags {
		let span = trace_span!("Handling event");
		let _enter = span.enter();

		// Cloned so that synchronous re-renders triggered by delivery can swap the handler.
		let handler = self.handler();
		match handler.decode(event) {
			Ok((message, flags)) => {
				// Stopping propagation implies synchronous delivery.
				self.event_node.send(message, flags.stop_propagation);
				flags
			}
			Err(error) => {
				trace!("Dropping event: {}", error);
				EventFlags::default()
			}
		}
	}
}
