// Short prefixed identifiers for wire-visible objects

use uuid::Uuid;

pub const THREAD_PREFIX: &str = "thr";
pub const MESSAGE_PREFIX: &str = "msg";
pub const TOOL_CALL_PREFIX: &str = "tc";

/// A short readable id: `{prefix}_{8 hex chars}` from a fresh v4 uuid.
pub fn generate_id(prefix: &str) -> String {
    let hex = Uuid::new_v4().simple().to_string();
    format!("{prefix}_{}", &hex[..8])
}
