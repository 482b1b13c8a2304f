//! レポートから総合評価（S/A/B/C/D）を抽出

use lazy_static::lazy_static;
use regex::Regex;

use crate::types::Rating;

lazy_static! {
    // 中国語/ASCII コロン、括弧・太字・絵文字の装飾を許容
    static ref RATING_RE: Regex =
        Regex::new(r"(?i)综合评分.*[:：]\s*[\[【*]*\s*([SABCD])\s*[\]】*]*").unwrap();
}

/// 総合評価を抽出（見つからなければ `Rating::Unrated`）
pub fn extract_rating(report: &str) -> Rating {
    RATING_RE
        .captures(report)
        .and_then(|caps| caps.get(1))
        .and_then(|m| m.as_str().chars().next())
        .map(Rating::from_letter)
        .unwrap_or(Rating::Unrated)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chinese_colon_with_brackets() {
        assert_eq!(extract_rating("综合评分: 【A】"), Rating::A);
        assert_eq!(extract_rating("综合评分：[B]"), Rating::B);
    }

    #[test]
    fn test_template_line_with_bold_and_emoji() {
        let report = "### [图片 1] 评审报告\n\n**🏷️ 综合评分**: **S** (S为极佳)";
        assert_eq!(extract_rating(report), Rating::S);
    }

    #[test]
    fn test_lowercase_letter() {
        assert_eq!(extract_rating("综合评分: c"), Rating::C);
    }

    #[test]
    fn test_first_occurrence_wins() {
        let report = "综合评分: D\n...\n综合评分: A";
        assert_eq!(extract_rating(report), Rating::D);
    }

    #[test]
    fn test_missing_rating() {
        assert_eq!(extract_rating("这是一张截图，非摄影作品，无法进行专业摄影点评。"), Rating::Unrated);
        assert_eq!(extract_rating("综合评分: 优秀"), Rating::Unrated);
        assert_eq!(extract_rating(""), Rating::Unrated);
    }
}
