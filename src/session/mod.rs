// Session synthesis from temporal gaps
//
// Walks time-ordered rows per correlation key (usually the actor id) and
// assigns each row a session id. A key keeps its session while consecutive
// rows are closer than the inactivity window; a larger gap, an explicit
// reset trigger, or the key's first row starts a new session whose id is a
// digest of the starting row's timestamp. Rows without a parseable
// timestamp get a blank id and do not affect their key's session.
//
// State is owned by one `SessionAssigner` for the duration of one pass and
// dropped afterwards. Input order is trusted: out-of-order rows produce
// wrong boundaries rather than an error.

mod assigner;
mod digest;

pub use assigner::{assign_sessions, SessionAssigner, SessionStats, StartReason, Transition};
pub use digest::session_digest;
