//! Network transport for doorlink.
//!
//! Hubs and door modules exchange protocol lines as UDP datagrams. There is
//! no connection state: every datagram is self-contained and the sender's
//! address is all the hub needs to reach a module again.
//!
//! # Example
//!
//! ```no_run
//! use doorlink_core::ModuleId;
//! use doorlink_network::UdpTransport;
//! use doorlink_protocol::Message;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let transport = UdpTransport::bind("0.0.0.0:12345".parse()?).await?;
//!
//! let hello = Message::hello(ModuleId::new("D1")?);
//! transport.send_to(&hello, "192.168.0.10:12345".parse()?).await?;
//!
//! let datagram = transport.recv().await?;
//! println!("{} sent {} line(s)", datagram.from, datagram.messages.len());
//! # Ok(())
//! # }
//! ```

mod transport;

pub use transport::{Datagram, TransportError, UdpTransport};
