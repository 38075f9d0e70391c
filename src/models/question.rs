use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::OnceLock;

use crate::error::ValidationError;

/// 判断题的固定选项
pub const TRUE_FALSE_OPTIONS: [&str; 3] = ["TRUE", "FALSE", "NOT GIVEN"];

/// 单选题默认选项数
pub const CHOICE_OPTION_COUNT: usize = 4;

/// 题型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuestionKind {
    MultipleChoice,
    TrueFalse,
    MatchingHeadings,
    MatchingNames,
    Matching,
    FillBlank,
    ShortAnswer,
}

/// 线上题型代码 → 题型
static KIND_CODES: phf::Map<&'static str, QuestionKind> = phf::phf_map! {
    "multiple_choice" => QuestionKind::MultipleChoice,
    "true_false" => QuestionKind::TrueFalse,
    "matching_headings" => QuestionKind::MatchingHeadings,
    "matching_names" => QuestionKind::MatchingNames,
    "matching" => QuestionKind::Matching,
    "fill_blank" => QuestionKind::FillBlank,
    "short_answer" => QuestionKind::ShortAnswer,
};

impl QuestionKind {
    pub const ALL: [QuestionKind; 7] = [
        QuestionKind::MultipleChoice,
        QuestionKind::TrueFalse,
        QuestionKind::MatchingHeadings,
        QuestionKind::MatchingNames,
        QuestionKind::Matching,
        QuestionKind::FillBlank,
        QuestionKind::ShortAnswer,
    ];

    /// 线上题型代码
    pub fn code(self) -> &'static str {
        match self {
            QuestionKind::MultipleChoice => "multiple_choice",
            QuestionKind::TrueFalse => "true_false",
            QuestionKind::MatchingHeadings => "matching_headings",
            QuestionKind::MatchingNames => "matching_names",
            QuestionKind::Matching => "matching",
            QuestionKind::FillBlank => "fill_blank",
            QuestionKind::ShortAnswer => "short_answer",
        }
    }

    /// 展示名称
    pub fn label(self) -> &'static str {
        match self {
            QuestionKind::MultipleChoice => "Multiple Choice",
            QuestionKind::TrueFalse => "True/False/Not Given",
            QuestionKind::MatchingHeadings => "Matching Headings",
            QuestionKind::MatchingNames => "Matching Names",
            QuestionKind::Matching => "Matching (Other)",
            QuestionKind::FillBlank => "Fill in the Blank",
            QuestionKind::ShortAnswer => "Short Answer",
        }
    }

    /// 从线上代码解析
    pub fn from_code(code: &str) -> Result<Self, ValidationError> {
        KIND_CODES
            .get(code.trim())
            .copied()
            .ok_or_else(|| ValidationError::UnknownQuestionType(code.to_string()))
    }

    pub fn matching_style(self) -> Option<MatchingStyle> {
        match self {
            QuestionKind::MatchingHeadings => Some(MatchingStyle::Headings),
            QuestionKind::MatchingNames => Some(MatchingStyle::Names),
            QuestionKind::Matching => Some(MatchingStyle::Other),
            _ => None,
        }
    }

}

impl fmt::Display for QuestionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// 选择题选项集合
///
/// 正确答案只存一个下标，"只能有一个正确选项"由结构保证
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChoiceSet {
    pub options: Vec<String>,
    pub correct: Option<usize>,
}

impl ChoiceSet {
    pub fn blank(count: usize) -> Self {
        Self {
            options: vec![String::new(); count],
            correct: None,
        }
    }

    pub fn true_false() -> Self {
        Self {
            options: TRUE_FALSE_OPTIONS.iter().map(|s| s.to_string()).collect(),
            correct: None,
        }
    }

    pub fn set_text(&mut self, index: usize, text: impl Into<String>) -> Result<(), ValidationError> {
        let len = self.options.len();
        let slot = self
            .options
            .get_mut(index)
            .ok_or(ValidationError::OptionIndexOutOfRange { index, len })?;
        *slot = text.into();
        Ok(())
    }

    pub fn mark_correct(&mut self, index: usize) -> Result<(), ValidationError> {
        if index >= self.options.len() {
            return Err(ValidationError::OptionIndexOutOfRange {
                index,
                len: self.options.len(),
            });
        }
        self.correct = Some(index);
        Ok(())
    }

    /// 按选项文本（忽略大小写）查找下标
    pub fn position_of(&self, text: &str) -> Option<usize> {
        let text = text.trim();
        self.options
            .iter()
            .position(|o| o.trim().eq_ignore_ascii_case(text))
    }

    pub fn correct_text(&self) -> Option<&str> {
        self.correct
            .and_then(|i| self.options.get(i))
            .map(String::as_str)
    }
}

/// 匹配题风格
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MatchingStyle {
    /// 段落标题匹配（无字母标签，答案为标题内容）
    Headings,
    /// 人名匹配
    Names,
    /// 其他匹配
    Other,
}

impl MatchingStyle {
    pub fn kind(self) -> QuestionKind {
        match self {
            MatchingStyle::Headings => QuestionKind::MatchingHeadings,
            MatchingStyle::Names => QuestionKind::MatchingNames,
            MatchingStyle::Other => QuestionKind::Matching,
        }
    }
}

/// 匹配选项
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchingOption {
    /// 选项标识：字母标签（A、B…），标题匹配时为内部序号
    pub key: String,
    pub description: String,
}

impl MatchingOption {
    pub fn new(key: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            description: description.into(),
        }
    }
}

/// 一组匹配选项及其答案映射
///
/// `answers` 为 题号 → 选项 key，每题至多一个答案
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct MatchingSet {
    pub options: Vec<MatchingOption>,
    pub answers: BTreeMap<u32, String>,
}

impl MatchingSet {
    /// 批量生成时第一题携带的初始选项
    pub fn starter(style: MatchingStyle) -> Self {
        let options = match style {
            MatchingStyle::Headings => (1..=7)
                .map(|i| MatchingOption::new(i.to_string(), format!("Heading {}", i)))
                .collect(),
            MatchingStyle::Names | MatchingStyle::Other => ["A", "B", "C", "D"]
                .iter()
                .map(|k| MatchingOption::new(*k, ""))
                .collect(),
        };
        Self {
            options,
            answers: BTreeMap::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.options.is_empty()
    }

    pub fn option(&self, key: &str) -> Option<&MatchingOption> {
        self.options.iter().find(|o| o.key == key)
    }

    /// 下一个选项 key：字母取最后一个选项的下一个字符（默认 A），标题取最大序号 + 1
    pub fn next_key(&self, style: MatchingStyle) -> String {
        match style {
            MatchingStyle::Headings => {
                let max = self
                    .options
                    .iter()
                    .filter_map(|o| o.key.parse::<u32>().ok())
                    .max()
                    .unwrap_or(0);
                (max + 1).to_string()
            }
            MatchingStyle::Names | MatchingStyle::Other => self
                .options
                .last()
                .and_then(|o| o.key.chars().next())
                .and_then(|c| char::from_u32(c as u32 + 1))
                .unwrap_or('A')
                .to_string(),
        }
    }

    pub fn push_next(&mut self, style: MatchingStyle) -> &MatchingOption {
        let key = self.next_key(style);
        let description = match style {
            MatchingStyle::Headings => format!("Heading {}", key),
            MatchingStyle::Names | MatchingStyle::Other => String::new(),
        };
        self.options.push(MatchingOption::new(key, description));
        &self.options[self.options.len() - 1]
    }

    /// 按下标删除选项，同时清除指向它的答案
    pub fn remove(&mut self, index: usize) -> Result<MatchingOption, ValidationError> {
        if index >= self.options.len() {
            return Err(ValidationError::OptionIndexOutOfRange {
                index,
                len: self.options.len(),
            });
        }
        let removed = self.options.remove(index);
        self.answers.retain(|_, key| *key != removed.key);
        Ok(removed)
    }

    /// 修改选项 key，答案随之迁移
    pub fn rekey(&mut self, index: usize, key: impl Into<String>) -> Result<(), ValidationError> {
        let key = key.into();
        let len = self.options.len();
        if self
            .options
            .iter()
            .enumerate()
            .any(|(i, o)| i != index && o.key == key)
        {
            return Err(ValidationError::DuplicateMatchingKey { key });
        }
        let option = self
            .options
            .get_mut(index)
            .ok_or(ValidationError::OptionIndexOutOfRange { index, len })?;
        let old = std::mem::replace(&mut option.key, key.clone());
        for answer in self.answers.values_mut() {
            if *answer == old {
                *answer = key.clone();
            }
        }
        Ok(())
    }

    pub fn set_description(
        &mut self,
        index: usize,
        description: impl Into<String>,
    ) -> Result<(), ValidationError> {
        let len = self.options.len();
        let option = self
            .options
            .get_mut(index)
            .ok_or(ValidationError::OptionIndexOutOfRange { index, len })?;
        option.description = description.into();
        Ok(())
    }

    /// 指定某题的答案，覆盖旧值并返回旧 key
    pub fn assign(&mut self, question: u32, key: &str) -> Result<Option<String>, ValidationError> {
        if self.option(key).is_none() {
            return Err(ValidationError::UnknownMatchingKey {
                key: key.to_string(),
            });
        }
        Ok(self.answers.insert(question, key.to_string()))
    }

    pub fn clear(&mut self, question: u32) -> Option<String> {
        self.answers.remove(&question)
    }

    pub fn answer_for(&self, question: u32) -> Option<&MatchingOption> {
        self.answers.get(&question).and_then(|key| self.option(key))
    }
}

/// 题目主体，按题型区分
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QuestionBody {
    MultipleChoice(ChoiceSet),
    TrueFalse(ChoiceSet),
    Matching {
        style: MatchingStyle,
        set: Option<MatchingSet>,
        paragraph_number: Option<u32>,
    },
    FillBlank {
        answer: String,
    },
    ShortAnswer {
        answer: String,
    },
}

impl QuestionBody {
    /// 为题型构造空白主体；`anchor` 为真时匹配题带上初始选项
    pub fn skeleton(kind: QuestionKind, anchor: bool) -> Self {
        match kind.matching_style() {
            Some(style) => QuestionBody::Matching {
                style,
                set: anchor.then(|| MatchingSet::starter(style)),
                paragraph_number: None,
            },
            None => match kind {
                QuestionKind::TrueFalse => QuestionBody::TrueFalse(ChoiceSet::true_false()),
                QuestionKind::FillBlank => QuestionBody::FillBlank {
                    answer: String::new(),
                },
                QuestionKind::ShortAnswer => QuestionBody::ShortAnswer {
                    answer: String::new(),
                },
                _ => QuestionBody::MultipleChoice(ChoiceSet::blank(CHOICE_OPTION_COUNT)),
            },
        }
    }

    pub fn kind(&self) -> QuestionKind {
        match self {
            QuestionBody::MultipleChoice(_) => QuestionKind::MultipleChoice,
            QuestionBody::TrueFalse(_) => QuestionKind::TrueFalse,
            QuestionBody::Matching { style, .. } => style.kind(),
            QuestionBody::FillBlank { .. } => QuestionKind::FillBlank,
            QuestionBody::ShortAnswer { .. } => QuestionKind::ShortAnswer,
        }
    }

    pub fn choices(&self) -> Option<&ChoiceSet> {
        match self {
            QuestionBody::MultipleChoice(set) | QuestionBody::TrueFalse(set) => Some(set),
            _ => None,
        }
    }

    /// 非空的匹配选项集合
    pub fn matching_set(&self) -> Option<&MatchingSet> {
        match self {
            QuestionBody::Matching { set: Some(set), .. } if !set.is_empty() => Some(set),
            _ => None,
        }
    }
}

/// 单道题目
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Question {
    /// 题号，创建时确定，不从展示文本中推导
    pub number: u32,
    pub marks: u32,
    pub body: QuestionBody,
}

impl Question {
    pub fn new(number: u32, marks: u32, body: QuestionBody) -> Self {
        Self {
            number,
            marks,
            body,
        }
    }

    /// 空白单选题
    pub fn blank(number: u32, marks: u32) -> Self {
        Self::new(
            number,
            marks,
            QuestionBody::skeleton(QuestionKind::MultipleChoice, false),
        )
    }

    pub fn kind(&self) -> QuestionKind {
        self.body.kind()
    }

    /// 展示标签，如 "Question 7"
    pub fn label(&self) -> String {
        format!("Question {}", self.number)
    }
}

fn label_regex() -> Option<&'static Regex> {
    static LABEL: OnceLock<Option<Regex>> = OnceLock::new();
    LABEL
        .get_or_init(|| Regex::new(r"^\s*Question\s+(\d+)\s*$").ok())
        .as_ref()
}

/// 解析旧格式的 "Question <N>" 标签
pub fn parse_label(label: &str) -> Result<u32, ValidationError> {
    label_regex()
        .and_then(|re| re.captures(label))
        .and_then(|caps| caps.get(1))
        .and_then(|m| m.as_str().parse().ok())
        .ok_or_else(|| ValidationError::InvalidLabel(label.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_codes_resolve_through_table() {
        for kind in QuestionKind::ALL {
            assert_eq!(QuestionKind::from_code(kind.code()).unwrap(), kind);
        }
        assert!(QuestionKind::from_code("essay").is_err());
    }

    #[test]
    fn label_is_projection_of_number() {
        let q = Question::blank(27, 1);
        assert_eq!(q.label(), "Question 27");
        assert_eq!(parse_label(&q.label()).unwrap(), 27);
        assert!(parse_label("Q 27").is_err());
    }

    #[test]
    fn choice_set_keeps_single_correct_option() {
        let mut set = ChoiceSet::blank(4);
        set.mark_correct(1).unwrap();
        set.mark_correct(3).unwrap();
        assert_eq!(set.correct, Some(3));
        assert!(set.mark_correct(4).is_err());
        assert_eq!(ChoiceSet::true_false().position_of("not given"), Some(2));
    }

    #[test]
    fn next_key_follows_last_letter() {
        let mut set = MatchingSet::starter(MatchingStyle::Names);
        assert_eq!(set.next_key(MatchingStyle::Names), "E");
        set.remove(3).unwrap();
        assert_eq!(set.next_key(MatchingStyle::Names), "D");
        assert_eq!(MatchingSet::default().next_key(MatchingStyle::Other), "A");
    }

    #[test]
    fn removing_option_drops_its_answers() {
        let mut set = MatchingSet::starter(MatchingStyle::Other);
        set.assign(1, "B").unwrap();
        set.assign(2, "C").unwrap();
        set.remove(1).unwrap();
        assert!(set.answer_for(1).is_none());
        assert_eq!(set.answer_for(2).map(|o| o.key.as_str()), Some("C"));
    }

    #[test]
    fn rekey_moves_answers() {
        let mut set = MatchingSet::starter(MatchingStyle::Names);
        set.assign(5, "A").unwrap();
        set.rekey(0, "Z").unwrap();
        assert_eq!(set.answers.get(&5).map(String::as_str), Some("Z"));
        assert!(set.rekey(1, "Z").is_err());
    }

    #[test]
    fn heading_starter_has_seven_entries() {
        let set = MatchingSet::starter(MatchingStyle::Headings);
        assert_eq!(set.options.len(), 7);
        assert_eq!(set.options[6].description, "Heading 7");
        assert_eq!(set.next_key(MatchingStyle::Headings), "8");
    }

    #[test]
    fn skeleton_matches_kind() {
        for kind in QuestionKind::ALL {
            assert_eq!(QuestionBody::skeleton(kind, true).kind(), kind);
        }
        assert!(QuestionBody::skeleton(QuestionKind::Matching, false)
            .matching_set()
            .is_none());
    }
}
