use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::ValidationError;
use crate::models::instruction::InstructionRange;
use crate::models::question::Question;

/// 默认考试时长（分钟）
pub const DEFAULT_DURATION: u32 = 60;
/// 默认总分
pub const DEFAULT_TOTAL_MARKS: u32 = 40;

/// 阅读部分编号（1..=3）
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u32", into = "u32")]
pub struct PartNumber(u32);

impl PartNumber {
    pub const ONE: PartNumber = PartNumber(1);
    pub const TWO: PartNumber = PartNumber(2);
    pub const THREE: PartNumber = PartNumber(3);
    pub const ALL: [PartNumber; 3] = [Self::ONE, Self::TWO, Self::THREE];

    pub fn new(number: u32) -> Result<Self, ValidationError> {
        match number {
            1..=3 => Ok(Self(number)),
            other => Err(ValidationError::PartOutOfRange(other)),
        }
    }

    pub fn get(self) -> u32 {
        self.0
    }

    /// 在 `parts` 数组中的下标
    pub fn index(self) -> usize {
        (self.0 - 1) as usize
    }

    /// 该部分应有的题目数
    pub fn expected_count(self) -> usize {
        if self.0 < 3 {
            13
        } else {
            14
        }
    }

    /// 该部分的起始题号
    pub fn base_number(self) -> u32 {
        match self.0 {
            1 => 1,
            2 => 14,
            _ => 27,
        }
    }

    /// 该部分的最大题号（跨部分累计）
    pub fn ceiling(self) -> u32 {
        match self.0 {
            1 => 13,
            2 => 26,
            _ => 40,
        }
    }

    pub fn contains(self, number: u32) -> bool {
        (self.base_number()..=self.ceiling()).contains(&number)
    }
}

impl TryFrom<u32> for PartNumber {
    type Error = ValidationError;

    fn try_from(value: u32) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<PartNumber> for u32 {
    fn from(value: PartNumber) -> Self {
        value.0
    }
}

impl fmt::Display for PartNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// 阅读文章
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Passage {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub content: String,
}

/// 文章字段，用于逐字段更新
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PassageField {
    Title,
    Content,
}

/// 阅读部分
#[derive(Debug, Clone, PartialEq)]
pub struct Part {
    pub number: PartNumber,
    pub passage: Passage,
    pub questions: Vec<Question>,
    pub instructions: Vec<InstructionRange>,
}

impl Part {
    pub fn new(number: PartNumber) -> Self {
        Self {
            number,
            passage: Passage::default(),
            questions: Vec::new(),
            instructions: Vec::new(),
        }
    }

    /// 还能添加的题目数量
    pub fn remaining_slots(&self) -> usize {
        self.number
            .expected_count()
            .saturating_sub(self.questions.len())
    }

    pub fn has_number(&self, number: u32) -> bool {
        self.questions.iter().any(|q| q.number == number)
    }

    /// 按题号查找题目下标
    pub fn index_of(&self, number: u32) -> Option<usize> {
        self.questions.iter().position(|q| q.number == number)
    }

    /// 下一个未被占用的题号
    pub fn next_free_number(&self) -> Option<u32> {
        (self.number.base_number()..=self.number.ceiling()).find(|n| !self.has_number(*n))
    }

    pub fn is_complete(&self) -> bool {
        !self.passage.content.trim().is_empty()
            && self.questions.len() == self.number.expected_count()
    }
}

/// 阅读试卷
#[derive(Debug, Clone, PartialEq)]
pub struct Exam {
    pub id: u64,
    pub title: String,
    pub duration: u32,
    pub total_marks: u32,
    pub parts: [Part; 3],
}

impl Exam {
    pub fn new(id: u64, title: impl Into<String>, duration: u32, total_marks: u32) -> Self {
        Self {
            id,
            title: title.into(),
            duration,
            total_marks,
            parts: PartNumber::ALL.map(Part::new),
        }
    }

    pub fn part(&self, number: PartNumber) -> &Part {
        &self.parts[number.index()]
    }

    pub fn part_mut(&mut self, number: PartNumber) -> &mut Part {
        &mut self.parts[number.index()]
    }
}
