//! Wire protocol for doorlink hubs and door modules.
//!
//! Lines are parsed by [`MessageParser`] into [`Message`] values and framed
//! over UDP datagrams by [`DoorCodec`].

pub mod codec;
pub mod message;
pub mod parser;

pub use codec::DoorCodec;
pub use message::{ChannelReport, DoorAction, Message, MessageKind};
pub use parser::MessageParser;
