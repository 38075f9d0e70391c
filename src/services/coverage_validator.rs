/// 部分保存前的校验与分组
///
/// 把扁平的题目列表按说明区间切分成题组，并检查每道题恰好被一个区间覆盖。
/// 任何校验失败都不会产生请求体
use std::collections::BTreeMap;

use crate::error::ValidationError;
use crate::models::payload::{
    ChoiceOptionPayload, MatchingOptionPayload, PartPayload, QuestionGroupPayload,
    QuestionPayload,
};
use crate::models::{InstructionRange, MatchingSet, MatchingStyle, Part, Question, QuestionBody};

/// 构建部分保存请求体
pub fn build_part_payload(part: &Part) -> Result<PartPayload, ValidationError> {
    if part.passage.content.trim().is_empty() {
        return Err(ValidationError::EmptyPassage);
    }
    if part.questions.is_empty() {
        return Err(ValidationError::NoQuestions);
    }
    let expected = part.number.expected_count();
    if part.questions.len() != expected {
        return Err(ValidationError::WrongQuestionCount {
            part: part.number,
            expected,
            actual: part.questions.len(),
        });
    }
    if part.instructions.is_empty() {
        return Err(ValidationError::NoInstructions);
    }

    check_coverage(&part.questions, &part.instructions)?;

    let mut ranges: Vec<&InstructionRange> = part.instructions.iter().collect();
    ranges.sort_by_key(|r| r.start);

    // 题组序号按排序后的区间位置编号，空区间同样占位
    let mut groups = Vec::new();
    for (i, range) in ranges.into_iter().enumerate() {
        let mut members: Vec<&Question> = part
            .questions
            .iter()
            .filter(|q| range.covers(q.number))
            .collect();
        if members.is_empty() {
            continue;
        }
        members.sort_by_key(|q| q.number);
        groups.push(build_group(range, &members, i as u32 + 1));
    }

    Ok(PartPayload {
        passage: part.passage.clone(),
        question_groups: groups,
    })
}

/// 未覆盖的题号优先报告，其次是重复覆盖的题号
pub fn check_coverage(
    questions: &[Question],
    instructions: &[InstructionRange],
) -> Result<(), ValidationError> {
    let mut claims: BTreeMap<u32, usize> = questions.iter().map(|q| (q.number, 0)).collect();
    for range in instructions {
        for (_, count) in claims.iter_mut().filter(|(n, _)| range.covers(**n)) {
            *count += 1;
        }
    }

    let uncovered: Vec<u32> = claims
        .iter()
        .filter(|(_, c)| **c == 0)
        .map(|(n, _)| *n)
        .collect();
    if !uncovered.is_empty() {
        return Err(ValidationError::UncoveredQuestions { numbers: uncovered });
    }

    let overlapping: Vec<u32> = claims
        .iter()
        .filter(|(_, c)| **c > 1)
        .map(|(n, _)| *n)
        .collect();
    if !overlapping.is_empty() {
        return Err(ValidationError::OverlappingInstructions {
            numbers: overlapping,
        });
    }
    Ok(())
}

fn build_group(
    range: &InstructionRange,
    members: &[&Question],
    order_number: u32,
) -> QuestionGroupPayload {
    let group_type = members[0].kind();

    // 组内第一个持有选项的题目提供该组的选项
    let canonical: Option<&MatchingSet> = match group_type.matching_style() {
        Some(_) => members.iter().find_map(|q| q.body.matching_set()),
        None => None,
    };

    let matching_options = match (group_type.matching_style(), canonical) {
        (Some(style), Some(set)) => set
            .options
            .iter()
            .map(|o| MatchingOptionPayload {
                option_text: (style != MatchingStyle::Headings).then(|| o.key.clone()),
                description: o.description.clone(),
            })
            .collect(),
        _ => Vec::new(),
    };

    QuestionGroupPayload {
        instruction: range.text.clone(),
        question_range: range.range_string(),
        group_type,
        order_number,
        questions: members
            .iter()
            .map(|q| question_payload(q, canonical))
            .collect(),
        matching_options,
    }
}

fn question_payload(question: &Question, canonical: Option<&MatchingSet>) -> QuestionPayload {
    let mut payload = QuestionPayload {
        question_text: question.label(),
        question_type: question.kind(),
        correct_answer: String::new(),
        marks: question.marks,
        question_number: question.number,
        options: Vec::new(),
        matching_answer: None,
        paragraph_number: None,
    };

    match &question.body {
        QuestionBody::MultipleChoice(set) | QuestionBody::TrueFalse(set) => {
            payload.options = set
                .options
                .iter()
                .enumerate()
                .map(|(i, text)| ChoiceOptionPayload {
                    option_text: text.clone(),
                    is_correct: set.correct == Some(i),
                })
                .collect();
            payload.correct_answer = set.correct_text().unwrap_or_default().to_string();
        }
        QuestionBody::FillBlank { answer } | QuestionBody::ShortAnswer { answer } => {
            payload.correct_answer = answer.clone();
        }
        QuestionBody::Matching {
            style,
            paragraph_number,
            ..
        } => {
            if let Some(option) = canonical.and_then(|set| set.answer_for(question.number)) {
                let answer = match style {
                    MatchingStyle::Headings => option.description.clone(),
                    MatchingStyle::Names | MatchingStyle::Other => option.key.clone(),
                };
                payload.correct_answer = answer.clone();
                payload.matching_answer = Some(answer);
            }
            if *style == MatchingStyle::Headings {
                payload.paragraph_number = Some(paragraph_number.unwrap_or(1));
            }
        }
    }

    payload
}
