#![forbid(unsafe_code)]
//! Test authoring, advisory expectation checks and result capture on top of
//! the layout engine and a persistence backend.

pub mod assemble;
pub mod evaluate;
pub mod session;

pub use assemble::{
    assemble, create_test, validate_draft, AssembleError, AuthoringContext, DraftErrors,
    DraftField, InputDraft, TestDraft,
};
pub use evaluate::{evaluate, Outcome, Verdict};
pub use session::{
    collect_fields, latest_result, selectable_assets, AssetSelection, EngineError, Field,
    OpenOptions, ResultSession, SessionState, MSG_ENTER_VALUE, MSG_INVALID_NUMBER,
    MSG_SELECT_ASSET,
};

pub const CRATE_NAME: &str = "commtest-forms";
