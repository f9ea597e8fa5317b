//! Command execution engine.
//!
//! - **[`command`]**: tagged [`Command`]s, validation, the [`DenyList`] and
//!   per-command [`CommandResult`]s.
//! - **[`confirm`]**: safe-mode [`Confirmer`] and checklist helpers.
//! - **[`progress`]**: [`ProgressCounts`] and [`ProgressObserver`]s.
//! - **[`engine`]**: [`execute_batch`] and its [`ExecOptions`].
//!
//! Processes are spawned by a private runner that puts each command in its
//! own process group and kills the group when the deadline passes.

pub mod command;
pub mod confirm;
pub mod engine;
pub mod progress;

mod process;

pub use command::{
    BLOCKED_COMMANDS_ENV, Command, CommandKind, CommandResult, DEFAULT_BLOCKED_COMMANDS,
    DEFAULT_DIAGNOSTIC_VERB, DEFAULT_SHELL_PREFIX, DenyList,
};
pub use confirm::{
    AutoConfirm, Confirmation, Confirmer, parse_confirmation, render_checklist, toggle_selection,
};
pub use engine::{
    BatchOutcome, DEFAULT_MAX_OUTPUT_BYTES, DEFAULT_TIMEOUT, ExecMode, ExecOptions,
    TIMED_OUT_MARKER, execute_batch, format_output, truncate_output,
};
pub use progress::{
    ExecStatus, FnObserver, LoggingObserver, NoopObserver, ProgressCounts, ProgressObserver,
};
