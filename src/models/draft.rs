//! 阅读试卷草稿（TOML）
//!
//! 一个草稿描述一整套阅读试卷：标题、三部分文章、批量题目、逐题编辑和说明区间，
//! 由编排层逐步回放到组卷器中

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::error::ValidationError;
use crate::models::exam::{Passage, DEFAULT_DURATION, DEFAULT_TOTAL_MARKS};
use crate::models::question::{MatchingOption, MatchingSet, MatchingStyle, QuestionKind};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReadingDraft {
    pub title: String,
    #[serde(default = "default_duration")]
    pub duration: u32,
    #[serde(default = "default_total_marks")]
    pub total_marks: u32,
    /// 已存在的试卷 ID；有值时跳过初始化，直接续编
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exam_id: Option<u64>,
    #[serde(default)]
    pub parts: Vec<DraftPart>,
    #[serde(skip_serializing, skip_deserializing)]
    pub file_path: Option<String>,
}

fn default_duration() -> u32 {
    DEFAULT_DURATION
}

fn default_total_marks() -> u32 {
    DEFAULT_TOTAL_MARKS
}

impl ReadingDraft {
    pub fn with_file_path(mut self, file_path: String) -> Self {
        self.file_path = Some(file_path);
        self
    }

    pub fn question_total(&self) -> u32 {
        self.parts
            .iter()
            .flat_map(|p| p.batches.iter())
            .map(|b| b.count)
            .sum()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DraftPart {
    pub number: u32,
    #[serde(default)]
    pub passage: Passage,
    #[serde(default)]
    pub batches: Vec<DraftBatch>,
    #[serde(default)]
    pub matching: Vec<DraftMatching>,
    #[serde(default)]
    pub edits: Vec<DraftEdit>,
    /// 额外的说明区间（批量自带的说明之外）
    #[serde(default)]
    pub instructions: Vec<DraftInstruction>,
}

/// 一次批量生成，附带该批题目的说明文字
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DraftBatch {
    pub kind: QuestionKind,
    pub count: u32,
    #[serde(default = "default_marks")]
    pub marks: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_number: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub instruction: Option<String>,
}

fn default_marks() -> u32 {
    1
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DraftInstruction {
    pub start: u32,
    pub end: u32,
    pub text: String,
}

/// 替换某道匹配题（通常是一组的第一题）携带的选项集合
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DraftMatching {
    pub question: u32,
    pub options: Vec<DraftMatchingOption>,
    /// 题号 → 选项 key
    #[serde(default)]
    pub answers: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DraftMatchingOption {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,
    #[serde(default)]
    pub description: String,
    /// 旧格式：逗号分隔的题号列表
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub correct_for: Option<String>,
}

/// 逐题编辑
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum DraftEdit {
    /// 答案：填空/简答为文本，选择题为选项文本，匹配题为选项 key
    Answer { question: u32, value: String },
    ChoiceText {
        question: u32,
        option: usize,
        text: String,
    },
    CorrectChoice { question: u32, option: usize },
    Marks { question: u32, marks: u32 },
    Kind { question: u32, kind: QuestionKind },
    Paragraph { question: u32, paragraph_number: u32 },
}

impl DraftEdit {
    pub fn question(&self) -> u32 {
        match self {
            DraftEdit::Answer { question, .. }
            | DraftEdit::ChoiceText { question, .. }
            | DraftEdit::CorrectChoice { question, .. }
            | DraftEdit::Marks { question, .. }
            | DraftEdit::Kind { question, .. }
            | DraftEdit::Paragraph { question, .. } => *question,
        }
    }
}

/// 解析旧格式 correct_for（"1, 3,5"），忽略无法解析的片段
pub fn parse_correct_for(raw: &str) -> Vec<u32> {
    raw.split(',')
        .filter_map(|part| part.trim().parse().ok())
        .collect()
}

/// 草稿中匹配选项转换后的结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportedMatching {
    pub set: MatchingSet,
    /// 被多个选项声明的题号（以后出现的为准）
    pub conflicts: Vec<u32>,
}

impl DraftMatching {
    /// 转换为选项集合；缺省 key 按风格自动分配，重复的 key 直接拒绝
    pub fn to_matching_set(
        &self,
        style: MatchingStyle,
    ) -> Result<ImportedMatching, ValidationError> {
        let mut set = MatchingSet::default();
        let mut conflicts = Vec::new();

        for option in &self.options {
            let key = option
                .key
                .clone()
                .filter(|k| !k.trim().is_empty())
                .unwrap_or_else(|| set.next_key(style));
            if set.option(&key).is_some() {
                return Err(ValidationError::DuplicateMatchingKey { key });
            }
            set.options
                .push(MatchingOption::new(key.clone(), option.description.clone()));

            if let Some(raw) = option.correct_for.as_deref() {
                for number in parse_correct_for(raw) {
                    if let Some(previous) = set.answers.insert(number, key.clone()) {
                        if previous != key && !conflicts.contains(&number) {
                            conflicts.push(number);
                        }
                    }
                }
            }
        }

        for (number, key) in &self.answers {
            if let Ok(number) = number.trim().parse::<u32>() {
                if set.option(key).is_some() {
                    set.answers.insert(number, key.clone());
                }
            }
        }

        Ok(ImportedMatching { set, conflicts })
    }
}
