pub mod draft;
pub mod exam;
pub mod instruction;
pub mod loaders;
pub mod payload;
pub mod question;

pub use draft::{DraftBatch, DraftEdit, DraftMatching, DraftPart, ImportedMatching, ReadingDraft};
pub use exam::{Exam, Part, PartNumber, Passage, PassageField};
pub use instruction::{parse_range, InstructionRange};
pub use loaders::{load_all_drafts, load_draft};
pub use payload::PartPayload;
pub use question::{
    parse_label, ChoiceSet, MatchingOption, MatchingSet, MatchingStyle, Question, QuestionBody,
    QuestionKind,
};
