use std::{
    any::{Any, TypeId, type_name},
    fmt::{Debug, Display, Formatter},
    hash::{Hash, Hasher},
};

/// Runtime identity of a message type, used as the routing key by the buses.
///
/// Two `MessageType`s are equal only when they describe exactly the same Rust type: there is
/// no subtype or trait-object matching.
#[derive(Clone, Copy)]
pub struct MessageType {
    id: TypeId,
    name: &'static str,
}

impl MessageType {
    pub fn of<T: ?Sized + 'static>() -> Self {
        Self {
            id: TypeId::of::<T>(),
            name: type_name::<T>(),
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }
}

impl PartialEq for MessageType {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for MessageType {}

impl Hash for MessageType {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl Debug for MessageType {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "MessageType({})", self.name)
    }
}

impl Display for MessageType {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name)
    }
}

/// The `Message` trait is the type-erased view of anything that travels through a bus.
///
/// It is implemented automatically for every `'static` value that is `Send + Sync + Debug`;
/// you never implement it by hand. Commands and queries are messages, and middlewares receive
/// them as `&dyn Message`, from which the concrete value can be recovered with `downcast_ref`.
pub trait Message: Any + Send + Sync + Debug {
    /// Returns the runtime type of the concrete message.
    fn message_type(&self) -> MessageType;

    fn as_any(&self) -> &dyn Any;
}

impl<T: Any + Send + Sync + Debug> Message for T {
    fn message_type(&self) -> MessageType {
        MessageType::of::<T>()
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl dyn Message {
    pub fn is<T: Message>(&self) -> bool {
        self.as_any().is::<T>()
    }

    pub fn downcast_ref<T: Message>(&self) -> Option<&T> {
        self.as_any().downcast_ref::<T>()
    }
}
