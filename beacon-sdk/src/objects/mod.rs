//! Objects that travel to the collector.

pub mod event;
pub mod payload;
pub mod value;

pub use event::{Event, ExceptionDetails, PageView, session_id_for};
pub use payload::{MAX_PAYLOAD_BYTES, MAX_USER_PROPERTIES, Payload};
pub use value::Value;
