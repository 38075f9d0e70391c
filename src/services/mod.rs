pub mod batch_generator;
pub mod coverage_validator;
pub mod instruction_manager;
pub mod question_editor;
pub mod question_layout;

pub use batch_generator::BatchRequest;
pub use coverage_validator::{build_part_payload, check_coverage};
pub use instruction_manager::{InstructionDraft, InstructionEditor, DEFAULT_INSTRUCTION_TEXT};
pub use question_editor::{matching_owner, QuestionEdit, QuestionEditor};
pub use question_layout::{interleave, LayoutRow};
