/// 题目编辑服务
///
/// 对单个部分内的题目做逐字段修改。每次编辑先在副本上完成并校验，
/// 成功后整体替换原题目
use tracing::{debug, warn};

use crate::error::ValidationError;
use crate::models::{
    MatchingSet, MatchingStyle, Part, PassageField, Question, QuestionBody, QuestionKind,
};

/// 单道题目上的一次编辑
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QuestionEdit {
    Renumber(u32),
    SetMarks(u32),
    /// 切换题型，旧题型的数据全部丢弃
    SetKind(QuestionKind),
    /// 填空 / 简答的答案
    SetAnswer(String),
    SetChoiceText { option: usize, text: String },
    MarkCorrectChoice(usize),
    SetMatchingKey { option: usize, key: String },
    SetMatchingDescription { option: usize, description: String },
    /// 在本题持有的选项集合中，把 `question` 的答案设为 `key`
    AssignMatchingAnswer { question: u32, key: String },
    ClearMatchingAnswer { question: u32 },
    /// 整体替换本题持有的选项集合（导入草稿时使用）
    ReplaceMatchingSet(MatchingSet),
    SetParagraphNumber(u32),
}

impl QuestionEdit {
    pub fn name(&self) -> &'static str {
        match self {
            QuestionEdit::Renumber(_) => "renumber",
            QuestionEdit::SetMarks(_) => "set_marks",
            QuestionEdit::SetKind(_) => "set_kind",
            QuestionEdit::SetAnswer(_) => "set_answer",
            QuestionEdit::SetChoiceText { .. } => "set_choice_text",
            QuestionEdit::MarkCorrectChoice(_) => "mark_correct_choice",
            QuestionEdit::SetMatchingKey { .. } => "set_matching_key",
            QuestionEdit::SetMatchingDescription { .. } => "set_matching_description",
            QuestionEdit::AssignMatchingAnswer { .. } => "assign_matching_answer",
            QuestionEdit::ClearMatchingAnswer { .. } => "clear_matching_answer",
            QuestionEdit::ReplaceMatchingSet(_) => "replace_matching_set",
            QuestionEdit::SetParagraphNumber(_) => "set_paragraph_number",
        }
    }
}

/// 题目编辑器，借用一个部分
pub struct QuestionEditor<'a> {
    part: &'a mut Part,
}

impl<'a> QuestionEditor<'a> {
    pub fn new(part: &'a mut Part) -> Self {
        Self { part }
    }

    fn question(&self, index: usize) -> Result<&Question, ValidationError> {
        let len = self.part.questions.len();
        self.part
            .questions
            .get(index)
            .ok_or(ValidationError::QuestionIndexOutOfRange { index, len })
    }

    /// 应用一次编辑
    pub fn apply(&mut self, index: usize, edit: QuestionEdit) -> Result<(), ValidationError> {
        let mut updated = self.question(index)?.clone();
        let kind = updated.kind();
        let incompatible = |edit: &QuestionEdit| ValidationError::IncompatibleEdit {
            edit: edit.name(),
            kind,
        };

        match &edit {
            QuestionEdit::Renumber(number) => {
                let number = *number;
                self.check_number(number, index)?;
                let old = updated.number;
                updated.number = number;
                self.migrate_answers(old, number);
                if let Some(set) = owned_set(&mut updated.body) {
                    if let Some(key) = set.answers.remove(&old) {
                        set.answers.insert(number, key);
                    }
                }
            }
            QuestionEdit::SetMarks(marks) => {
                if *marks == 0 {
                    return Err(ValidationError::InvalidBatch { count: 1, marks: 0 });
                }
                updated.marks = *marks;
            }
            QuestionEdit::SetKind(new_kind) => {
                if *new_kind != kind {
                    updated.body = QuestionBody::skeleton(*new_kind, true);
                }
            }
            QuestionEdit::SetAnswer(value) => match &mut updated.body {
                QuestionBody::FillBlank { answer } | QuestionBody::ShortAnswer { answer } => {
                    *answer = value.clone();
                }
                _ => return Err(incompatible(&edit)),
            },
            QuestionEdit::SetChoiceText { option, text } => match &mut updated.body {
                QuestionBody::MultipleChoice(set) => set.set_text(*option, text.clone())?,
                _ => return Err(incompatible(&edit)),
            },
            QuestionEdit::MarkCorrectChoice(option) => match &mut updated.body {
                QuestionBody::MultipleChoice(set) | QuestionBody::TrueFalse(set) => {
                    set.mark_correct(*option)?
                }
                _ => return Err(incompatible(&edit)),
            },
            QuestionEdit::SetMatchingKey { option, key } => {
                let set = owned_set(&mut updated.body).ok_or_else(|| incompatible(&edit))?;
                set.rekey(*option, key.clone())?;
            }
            QuestionEdit::SetMatchingDescription {
                option,
                description,
            } => {
                let set = owned_set(&mut updated.body).ok_or_else(|| incompatible(&edit))?;
                set.set_description(*option, description.clone())?;
            }
            QuestionEdit::AssignMatchingAnswer { question, key } => {
                let set = owned_set(&mut updated.body).ok_or_else(|| incompatible(&edit))?;
                if !self.part.has_number(*question) {
                    return Err(ValidationError::QuestionNotFound { number: *question });
                }
                if matching_owner(self.part, *question) != Some(index) {
                    return Err(ValidationError::OutsideMatchingBlock {
                        question: *question,
                        owner: updated.number,
                    });
                }
                if let Some(previous) = set.assign(*question, key)? {
                    if previous != *key {
                        debug!("题目 {} 的匹配答案由 {} 改为 {}", question, previous, key);
                    }
                }
            }
            QuestionEdit::ClearMatchingAnswer { question } => {
                let set = owned_set(&mut updated.body).ok_or_else(|| incompatible(&edit))?;
                set.clear(*question);
            }
            QuestionEdit::ReplaceMatchingSet(new_set) => match &mut updated.body {
                QuestionBody::Matching { set, .. } => *set = Some(new_set.clone()),
                _ => return Err(incompatible(&edit)),
            },
            QuestionEdit::SetParagraphNumber(value) => match &mut updated.body {
                QuestionBody::Matching {
                    style: MatchingStyle::Headings,
                    paragraph_number,
                    ..
                } => *paragraph_number = Some(*value),
                _ => return Err(incompatible(&edit)),
            },
        }

        self.part.questions[index] = updated;
        Ok(())
    }

    /// 题号必须属于本部分且不与其他题目重复
    fn check_number(&self, number: u32, index: usize) -> Result<(), ValidationError> {
        let part = self.part.number;
        if !part.contains(number) {
            return Err(ValidationError::NumberOutOfPart {
                part,
                number,
                min: part.base_number(),
                max: part.ceiling(),
            });
        }
        let collides = self
            .part
            .questions
            .iter()
            .enumerate()
            .any(|(i, q)| i != index && q.number == number);
        if collides {
            return Err(ValidationError::NumberCollision {
                part,
                numbers: vec![number],
            });
        }
        Ok(())
    }

    /// 题号变化后，把各选项集合中的答案迁到新题号
    fn migrate_answers(&mut self, old: u32, new: u32) {
        if old == new {
            return;
        }
        for question in &mut self.part.questions {
            if let QuestionBody::Matching { set: Some(set), .. } = &mut question.body {
                if let Some(key) = set.answers.remove(&old) {
                    set.answers.insert(new, key);
                }
            }
        }
    }

    /// 手动追加一道空白单选题，返回其题号
    pub fn add_question(&mut self, marks: u32) -> Result<u32, ValidationError> {
        let part = self.part.number;
        let remaining = self.part.remaining_slots() as u32;
        if remaining == 0 {
            return Err(ValidationError::TooManyQuestions {
                part,
                requested: 1,
                remaining,
            });
        }
        let number = self
            .part
            .next_free_number()
            .ok_or(ValidationError::ExceedsPartCeiling {
                part,
                start: part.ceiling(),
                count: 1,
            })?;
        self.part.questions.push(Question::blank(number, marks.max(1)));
        Ok(number)
    }

    /// 删除题目，并清除指向该题号的匹配答案
    pub fn remove_question(&mut self, index: usize) -> Result<Question, ValidationError> {
        self.question(index)?;
        let removed = self.part.questions.remove(index);
        if removed.body.matching_set().is_some() {
            warn!(
                "⚠️ 删除的 {} 持有匹配选项，同组其他题目将失去选项",
                removed.label()
            );
        }
        for question in &mut self.part.questions {
            if let QuestionBody::Matching { set: Some(set), .. } = &mut question.body {
                set.clear(removed.number);
            }
        }
        Ok(removed)
    }

    /// 在题目的选项集合末尾追加一个选项，返回新选项的 key
    pub fn add_matching_option(&mut self, index: usize) -> Result<String, ValidationError> {
        let mut updated = self.question(index)?.clone();
        let kind = updated.kind();
        let key = match &mut updated.body {
            QuestionBody::Matching { style, set, .. } => {
                let style = *style;
                set.get_or_insert_with(MatchingSet::default)
                    .push_next(style)
                    .key
                    .clone()
            }
            _ => {
                return Err(ValidationError::IncompatibleEdit {
                    edit: "add_matching_option",
                    kind,
                })
            }
        };
        self.part.questions[index] = updated;
        Ok(key)
    }

    pub fn remove_matching_option(
        &mut self,
        index: usize,
        option: usize,
    ) -> Result<(), ValidationError> {
        let mut updated = self.question(index)?.clone();
        let kind = updated.kind();
        owned_set(&mut updated.body)
            .ok_or(ValidationError::IncompatibleEdit {
                edit: "remove_matching_option",
                kind,
            })?
            .remove(option)?;
        self.part.questions[index] = updated;
        Ok(())
    }

    pub fn update_passage(&mut self, field: PassageField, value: impl Into<String>) {
        match field {
            PassageField::Title => self.part.passage.title = value.into(),
            PassageField::Content => self.part.passage.content = value.into(),
        }
    }
}

fn owned_set(body: &mut QuestionBody) -> Option<&mut MatchingSet> {
    match body {
        QuestionBody::Matching { set: Some(set), .. } => Some(set),
        _ => None,
    }
}

/// 找到为 `number` 提供匹配选项的题目下标：
/// 题号不大于 `number` 的同风格题目中最近的一个持有选项者
pub fn matching_owner(part: &Part, number: u32) -> Option<usize> {
    let style = part
        .questions
        .iter()
        .find(|q| q.number == number)
        .and_then(|q| q.kind().matching_style())?;

    part.questions
        .iter()
        .enumerate()
        .filter(|(_, q)| q.kind().matching_style() == Some(style) && q.number <= number)
        .filter(|(_, q)| q.body.matching_set().is_some())
        .max_by_key(|(_, q)| q.number)
        .map(|(i, _)| i)
}
