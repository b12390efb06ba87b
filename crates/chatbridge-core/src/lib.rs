// Bridge core: session/turn-event model -> thread/stream-event model
//
// The adapter between an agent runtime and a chat UI protocol. Four
// pieces: the event translator (one agent turn -> one outbound event
// sequence with a single assistant-item identity), the request processor
// (parse, classify, dispatch, frame), the thread store (sessions as
// threads, append-only saves, items materialized from the runtime log),
// and the per-turn queue bridge (tool code pushing events into the live
// stream through an explicit handle).

pub mod context;
pub mod error;
pub mod ids;
pub mod processor;
pub mod store;
pub mod translate;

pub use context::{interleave, BridgeContext, TurnContext, TurnEvents};
pub use error::{BridgeError, Result};
pub use ids::{generate_id, MESSAGE_PREFIX, THREAD_PREFIX, TOOL_CALL_PREFIX};
pub use processor::{sse_frames, ProcessorOutput, RequestProcessor, Respond, SseStream};
pub use store::{ThreadStore, DEFAULT_PAGE_SIZE, THREAD_STATE_KEY};
pub use translate::{
    stream_agent_response, stream_agent_response_with_policy, EventStream, FinalPolicy,
    ResponseTranslator,
};
