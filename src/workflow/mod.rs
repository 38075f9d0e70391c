pub mod composer;
pub mod part_ctx;

pub use composer::{PendingSave, ReadingTestComposer, SaveOutcome};
pub use part_ctx::PartCtx;
