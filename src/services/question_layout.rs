//! 题目与说明的展示顺序

use crate::models::{InstructionRange, Part, Question};

/// 展示行
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LayoutRow<'a> {
    /// `index` 为说明在部分中的原始下标，用于打开编辑
    Instruction {
        index: usize,
        range: &'a InstructionRange,
    },
    Question(&'a Question),
}

/// 题目按题号排序，说明按起始题号排序；
/// 说明出现在题号等于其起点的题目之前
pub fn interleave(part: &Part) -> Vec<LayoutRow<'_>> {
    let mut questions: Vec<&Question> = part.questions.iter().collect();
    questions.sort_by_key(|q| q.number);

    let mut ranges: Vec<(usize, &InstructionRange)> = part.instructions.iter().enumerate().collect();
    ranges.sort_by_key(|(_, r)| r.start);

    let mut rows = Vec::with_capacity(questions.len() + ranges.len());
    let mut next = 0;
    for question in questions {
        while let Some((index, range)) = ranges.get(next) {
            if range.start != question.number {
                break;
            }
            rows.push(LayoutRow::Instruction {
                index: *index,
                range,
            });
            next += 1;
        }
        rows.push(LayoutRow::Question(question));
    }
    rows
}
