//! Label file module
//!
//! Each region keeps a newline-delimited `<label>.txt` listing its country
//! label keys. Files only ever grow: new keys are appended in first-seen
//! order and existing lines are left untouched.

mod store;

pub use store::{LabelError, LabelFileStore, MergeOutcome};
