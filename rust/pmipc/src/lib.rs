//! pmipc: telemetry metadata and frame queries over shared memory.
//!
//! A producer creates a [`Service`], which maps a named segment and
//! publishes the introspection tree in it. Consumers open a [`Session`] on
//! the same name, clone the tree into their own memory with
//! [`Session::introspection_root`], and compile frame queries with
//! [`Session::register_frame_query`].
//!
//! ```no_run
//! use pmipc::{Metric, QueryElement, Service, ServiceConfig, Session};
//!
//! # fn main() -> Result<(), pmipc::SessionError> {
//! let config = ServiceConfig::default();
//! let _service = Service::create(&config)?;
//!
//! let session = Session::open(&config)?;
//! let root = session.introspection_root()?;
//! println!("{} metrics", root.metrics().len());
//!
//! let mut elements = [
//!     QueryElement::new(Metric::PresentMode, 0, 0),
//!     QueryElement::new(Metric::GpuPower, 1, 0),
//! ];
//! let query = session.register_frame_query(&mut elements)?;
//! let mut blob = query.new_blob();
//! query.consume(&Default::default(), &mut blob)?;
//! # Ok(())
//! # }
//! ```

pub mod config;
#[cfg(unix)]
pub mod error;
#[cfg(unix)]
pub mod service;
#[cfg(unix)]
pub mod session;

pub use config::{ConfigError, DEFAULT_SEGMENT_NAME, DEFAULT_SEGMENT_SIZE, ServiceConfig};
#[cfg(unix)]
pub use error::SessionError;
#[cfg(unix)]
pub use service::Service;
#[cfg(unix)]
pub use session::{FrameQuery, Session};

pub use pmipc_intro::{ApiRoot, EnumId, FlatClone, Metric, Stat};
pub use pmipc_query::{FrameRecord, QueryElement};
