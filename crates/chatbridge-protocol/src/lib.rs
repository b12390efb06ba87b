// Chat-UI protocol wire schema
// This crate defines the request union, thread/item data model, and the
// stream-event union that clients consume over SSE.
//
// Serialization contract: every wire field uses its camelCase alias and
// null fields are omitted. Clients parse strictly; both rules are load-bearing.

pub mod events;
pub mod items;
pub mod requests;
pub mod sse;
pub mod thread;

pub use events::*;
pub use items::*;
pub use requests::*;
pub use thread::*;
