//! Head-first history trimming.
//!
//! The oldest turns go first: the conversation loop appends at the tail, so
//! the messages most relevant to the next question are the last ones. The
//! pass is deterministic and touches nothing but the history itself.

use tracing::debug;

use crate::Message;
use crate::tokens::{history_tokens, message_tokens};

/// Remove messages from the head of `history` until its estimated token
/// count is at most `limit`, or the history is empty.
///
/// Returns the number of messages removed.
pub fn trim_history(history: &mut Vec<Message>, limit: usize) -> usize {
    let mut total = history_tokens(history);
    if total <= limit {
        return 0;
    }

    let mut cut = 0;
    for msg in history.iter() {
        if total <= limit {
            break;
        }
        total -= message_tokens(msg);
        cut += 1;
    }

    history.drain(..cut);
    debug!("Trimmed {cut} message(s) from history, ~{total} tokens remain (limit {limit})");
    cut
}
