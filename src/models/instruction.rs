use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::RangeInclusive;
use std::sync::OnceLock;

use crate::error::ValidationError;

/// 说明区间：一段说明文字及其覆盖的连续题号
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstructionRange {
    pub start: u32,
    pub end: u32,
    pub text: String,
}

impl InstructionRange {
    pub fn new(start: u32, end: u32, text: impl Into<String>) -> Self {
        Self {
            start,
            end,
            text: text.into(),
        }
    }

    pub fn numbers(&self) -> RangeInclusive<u32> {
        self.start..=self.end
    }

    pub fn covers(&self, number: u32) -> bool {
        self.numbers().contains(&number)
    }

    /// 线上区间字符串，如 "1-6"
    pub fn range_string(&self) -> String {
        format!("{}-{}", self.start, self.end)
    }

    /// 从后端保存的分组还原
    pub fn from_stored(range: &str, text: impl Into<String>) -> Result<Self, ValidationError> {
        let (start, end) = parse_range(range)?;
        Ok(Self::new(start, end, text))
    }
}

impl fmt::Display for InstructionRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Questions {}–{}", self.start, self.end)
    }
}

fn range_regex() -> Option<&'static Regex> {
    static RANGE: OnceLock<Option<Regex>> = OnceLock::new();
    RANGE
        .get_or_init(|| Regex::new(r"^\s*(\d+)\s*(?:[-–—]\s*(\d+))?\s*$").ok())
        .as_ref()
}

/// 解析 "1-6"、"1–6" 或单个题号 "7"
pub fn parse_range(range: &str) -> Result<(u32, u32), ValidationError> {
    let invalid = || ValidationError::InvalidRange(range.to_string());
    let caps = range_regex()
        .and_then(|re| re.captures(range))
        .ok_or_else(invalid)?;
    let start: u32 = caps
        .get(1)
        .and_then(|m| m.as_str().parse().ok())
        .ok_or_else(invalid)?;
    let end: u32 = match caps.get(2) {
        Some(m) => m.as_str().parse().map_err(|_| invalid())?,
        None => start,
    };
    if start > end {
        return Err(ValidationError::InvertedRange { start, end });
    }
    Ok((start, end))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_stored_range_strings() {
        assert_eq!(parse_range("1-6").unwrap(), (1, 6));
        assert_eq!(parse_range(" 14 – 20 ").unwrap(), (14, 20));
        assert_eq!(parse_range("7").unwrap(), (7, 7));
        assert!(matches!(
            parse_range("9-3"),
            Err(ValidationError::InvertedRange { start: 9, end: 3 })
        ));
        assert!(parse_range("a-b").is_err());
    }

    #[test]
    fn range_string_matches_wire_format() {
        let range = InstructionRange::new(27, 33, "Choose the correct letter");
        assert_eq!(range.range_string(), "27-33");
        assert!(range.covers(33));
        assert!(!range.covers(34));
    }
}
