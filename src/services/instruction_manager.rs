/// 说明区间管理
///
/// 两态编辑器：关闭 / 编辑中。编辑中持有一份待保存的区间草稿，
/// 保存成功才写回部分并关闭
use tracing::info;

use crate::error::ValidationError;
use crate::models::InstructionRange;

/// 新建说明时的默认文字
pub const DEFAULT_INSTRUCTION_TEXT: &str = "Look at the following ideas and the list of researchers below.\n\nMatch each idea with the correct researcher, A, B, C or D.\n\nWrite the correct letter, A, B C or D, in the boxes on your answer sheet.";

/// 编辑中的说明区间
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstructionDraft {
    pub start: u32,
    pub end: u32,
    pub text: String,
    /// 编辑已有区间时为其下标，新建时为 None
    pub edit_index: Option<usize>,
}

impl Default for InstructionDraft {
    fn default() -> Self {
        Self {
            start: 1,
            end: 4,
            text: DEFAULT_INSTRUCTION_TEXT.to_string(),
            edit_index: None,
        }
    }
}

impl InstructionDraft {
    fn validate(&self) -> Result<(), ValidationError> {
        if self.text.trim().is_empty() {
            return Err(ValidationError::EmptyInstruction);
        }
        if self.start > self.end {
            return Err(ValidationError::InvertedRange {
                start: self.start,
                end: self.end,
            });
        }
        Ok(())
    }
}

/// 说明编辑器状态
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum InstructionEditor {
    #[default]
    Closed,
    Editing(InstructionDraft),
}

impl InstructionEditor {
    pub fn is_open(&self) -> bool {
        matches!(self, InstructionEditor::Editing(_))
    }

    /// 以默认模板打开
    pub fn open_default(&mut self) {
        *self = InstructionEditor::Editing(InstructionDraft::default());
    }

    /// 打开一个新区间
    pub fn open_new(&mut self, start: u32, end: u32, text: impl Into<String>) {
        *self = InstructionEditor::Editing(InstructionDraft {
            start,
            end,
            text: text.into(),
            edit_index: None,
        });
    }

    /// 载入已有区间，保存时原位替换
    pub fn open_existing(
        &mut self,
        instructions: &[InstructionRange],
        index: usize,
    ) -> Result<(), ValidationError> {
        let range = instructions
            .get(index)
            .ok_or(ValidationError::InstructionIndexOutOfRange {
                index,
                len: instructions.len(),
            })?;
        *self = InstructionEditor::Editing(InstructionDraft {
            start: range.start,
            end: range.end,
            text: range.text.clone(),
            edit_index: Some(index),
        });
        Ok(())
    }

    pub fn draft(&self) -> Option<&InstructionDraft> {
        match self {
            InstructionEditor::Editing(draft) => Some(draft),
            InstructionEditor::Closed => None,
        }
    }

    pub fn draft_mut(&mut self) -> Option<&mut InstructionDraft> {
        match self {
            InstructionEditor::Editing(draft) => Some(draft),
            InstructionEditor::Closed => None,
        }
    }

    /// 校验并写回，成功后关闭编辑器
    ///
    /// 校验失败时保持编辑状态，`instructions` 不变
    pub fn save(&mut self, instructions: &mut Vec<InstructionRange>) -> Result<usize, ValidationError> {
        let draft = self.draft().ok_or(ValidationError::EditorClosed)?;
        draft.validate()?;

        let range = InstructionRange::new(draft.start, draft.end, draft.text.clone());
        let index = match draft.edit_index {
            Some(index) => {
                let len = instructions.len();
                let slot = instructions
                    .get_mut(index)
                    .ok_or(ValidationError::InstructionIndexOutOfRange { index, len })?;
                *slot = range;
                index
            }
            None => {
                instructions.push(range);
                instructions.len() - 1
            }
        };

        info!("✓ 说明已保存: {}", instructions[index]);
        *self = InstructionEditor::Closed;
        Ok(index)
    }

    pub fn cancel(&mut self) {
        *self = InstructionEditor::Closed;
    }
}

/// 删除说明区间
pub fn remove_instruction(
    instructions: &mut Vec<InstructionRange>,
    index: usize,
) -> Result<InstructionRange, ValidationError> {
    if index >= instructions.len() {
        return Err(ValidationError::InstructionIndexOutOfRange {
            index,
            len: instructions.len(),
        });
    }
    Ok(instructions.remove(index))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn editing_existing_range_replaces_in_place() {
        let mut instructions = vec![
            InstructionRange::new(1, 6, "Do the following statements agree?"),
            InstructionRange::new(7, 13, "Complete the notes below."),
        ];
        let mut editor = InstructionEditor::default();
        editor.open_existing(&instructions, 0).unwrap();
        editor.draft_mut().unwrap().end = 5;

        assert_eq!(editor.save(&mut instructions).unwrap(), 0);
        assert_eq!(instructions.len(), 2);
        assert_eq!(instructions[0].end, 5);
        assert!(!editor.is_open());
    }

    #[test]
    fn failed_save_keeps_editor_open() {
        let mut instructions = Vec::new();
        let mut editor = InstructionEditor::default();
        editor.open_new(5, 3, "Choose the correct letter");
        assert!(matches!(
            editor.save(&mut instructions),
            Err(ValidationError::InvertedRange { start: 5, end: 3 })
        ));
        assert!(editor.is_open());

        editor.draft_mut().unwrap().text = "   ".into();
        assert_eq!(
            editor.save(&mut instructions).unwrap_err(),
            ValidationError::EmptyInstruction
        );
        assert!(instructions.is_empty());
    }

    #[test]
    fn new_range_appends_and_template_resets() {
        let mut instructions = Vec::new();
        let mut editor = InstructionEditor::default();
        editor.open_new(1, 13, "Complete the summary.");
        editor.save(&mut instructions).unwrap();
        assert_eq!(instructions.len(), 1);

        editor.open_default();
        let draft = editor.draft().unwrap();
        assert_eq!((draft.start, draft.end), (1, 4));
        assert_eq!(draft.text, DEFAULT_INSTRUCTION_TEXT);

        editor.cancel();
        assert_eq!(editor.save(&mut instructions).unwrap_err(), ValidationError::EditorClosed);
    }

    #[test]
    fn open_existing_out_of_bounds() {
        let mut editor = InstructionEditor::default();
        assert!(editor.open_existing(&[], 0).is_err());
        assert!(!editor.is_open());
        assert!(remove_instruction(&mut Vec::new(), 0).is_err());
    }
}
