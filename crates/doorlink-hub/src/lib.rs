//! # doorlink-hub
//!
//! Central aggregator for doorlink door modules. The hub listens for module
//! traffic over UDP, tracks the last known state and liveness of every
//! module, keeps a bounded history of everything it received, raises alerts
//! on door events and liveness changes, and sends acknowledged COMMANDs.
//!
//! ## Modules
//!
//! - [`registry`] - module table, history and pending commands
//! - [`dispatcher`] - COMMAND delivery with retries and ack matching
//! - [`alerts`] - fire-and-forget alert queue
//! - [`hub`] - sockets, receive loop and the query surface

pub mod alerts;
pub mod config;
pub mod dispatcher;
pub mod error;
pub mod history;
pub mod hub;
pub mod registry;

pub use alerts::{AlertDelivery, AlertQueue, AlertSink, AlertWorker, DeliveryError, TracingDelivery};
pub use config::{CommandConfig, HubConfig};
pub use dispatcher::{CommandAck, CommandDispatcher};
pub use error::{DispatchError, HubError, Result};
pub use history::{HistoryEvent, HistoryRing};
pub use hub::Hub;
pub use registry::{CommandTicket, FeedbackRecord, ModuleStatus, Registry};
