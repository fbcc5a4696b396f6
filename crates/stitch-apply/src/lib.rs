pub mod apply;
pub mod error;
pub mod file_ops;
pub mod history;
pub mod workspace;

pub use apply::{apply_turn, AppliedTurn, FileOutcome, FileStatus, TurnReport};
pub use error::ApplyError;
pub use history::{EditHistory, FileChange, HistoryEntry, TurnRecord, UndoReport};
pub use workspace::Workspace;
