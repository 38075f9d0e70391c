/// 批量出题服务
///
/// 按题型一次生成一段连续题号的空白题目
use std::ops::RangeInclusive;
use tracing::debug;

use crate::error::ValidationError;
use crate::models::{MatchingStyle, Part, Question, QuestionBody, QuestionKind};

/// 批量出题参数
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchRequest {
    pub kind: QuestionKind,
    pub count: u32,
    pub marks: u32,
    pub start_number: u32,
}

impl Default for BatchRequest {
    fn default() -> Self {
        Self {
            kind: QuestionKind::MultipleChoice,
            count: 1,
            marks: 1,
            start_number: 1,
        }
    }
}

impl BatchRequest {
    pub fn new(kind: QuestionKind, count: u32, marks: u32, start_number: u32) -> Self {
        Self {
            kind,
            count,
            marks,
            start_number,
        }
    }

    /// 校验并向部分追加题目
    ///
    /// 成功后起始题号前移到 `start + count`，返回新题号区间
    pub fn generate(&mut self, part: &mut Part) -> Result<RangeInclusive<u32>, ValidationError> {
        if self.count == 0 || self.marks == 0 {
            return Err(ValidationError::InvalidBatch {
                count: self.count,
                marks: self.marks,
            });
        }

        let number = part.number;
        // 起始题号不在本部分范围内时回到本部分起点
        if !number.contains(self.start_number) {
            debug!(
                "起始题号 {} 不属于 Part {}，重置为 {}",
                self.start_number,
                number,
                number.base_number()
            );
            self.start_number = number.base_number();
        }

        let remaining = part.remaining_slots() as u32;
        if self.count > remaining {
            return Err(ValidationError::TooManyQuestions {
                part: number,
                requested: self.count,
                remaining,
            });
        }

        let start = self.start_number;
        let end = start + self.count - 1;
        if end > number.ceiling() {
            return Err(ValidationError::ExceedsPartCeiling {
                part: number,
                start,
                count: self.count,
            });
        }

        let taken: Vec<u32> = (start..=end).filter(|n| part.has_number(*n)).collect();
        if !taken.is_empty() {
            return Err(ValidationError::NumberCollision {
                part: number,
                numbers: taken,
            });
        }

        for (i, question_number) in (start..=end).enumerate() {
            let mut body = QuestionBody::skeleton(self.kind, i == 0);
            if let QuestionBody::Matching {
                style: MatchingStyle::Headings,
                paragraph_number,
                ..
            } = &mut body
            {
                *paragraph_number = Some(i as u32 + 1);
            }
            part.questions
                .push(Question::new(question_number, self.marks, body));
        }

        self.start_number = end + 1;
        Ok(start..=end)
    }
}
