//! # nimbus-client
//!
//! Event lifecycle and client facade for the Nimbus pub/sub service.
//!
//! The lifecycle is fire → dispatch → correlate → parse → callbacks: an
//! [`Event`] builds its request URI, hands it to a shared
//! [`nimbus_transport::Dispatcher`] together with a reply channel unique to
//! the call, suspends until exactly one reply arrives, and turns the
//! response into an ordered envelope batch with callbacks delivered on the
//! caller's task. [`Client`] is the entry point that wires configuration,
//! dispatcher, and the concrete events together.
//!
//! ```no_run
//! use nimbus_client::{Client, Callbacks, HistoryOptions};
//! use nimbus_core::config::ClientConfig;
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let config = ClientConfig::new("ps.nimbus.cloud", "my-sub-key")?;
//! let client = Client::new(config)?;
//! let outcome = client
//!     .history(HistoryOptions::channel("room").with_count(10))
//!     .await?;
//! for item in outcome.envelopes() {
//!     println!("{item:?}");
//! }
//! # Ok(())
//! # }
//! ```

#![deny(unsafe_code)]

pub mod client;
pub mod event;
pub mod history;
pub mod logging;
pub mod publish;
pub mod time;

pub use client::{client_config_from_settings, Client, ClientError};
pub use event::{Callbacks, Event, EventConfig, FireOutcome, SDK_IDENT};
pub use history::{History, HistoryOptions};
pub use publish::{Publish, PublishOptions};
pub use time::Time;
