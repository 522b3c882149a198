//! 分析结果解析 - 业务能力层
//!
//! LLM 的输出格式不可靠，这里用一组按序尝试的解析策略兜底恢复：
//! 1. 提取第一个围栏代码块的内容，直接按 JSON 解析
//! 2. 失败则做宽松清洗（还原过度转义的引号、去除控制字符）后重试
//! 3. 再失败则截取最外层的 `[...]` 片段按数组解析
//! 4. 最后逐行扫描原始文本做确定性兜底
//!
//! `parse` 绝不失败——策略 4 总能产出结果

use serde_json::Value;
use tracing::{debug, warn};

use crate::error::{AppError, AppResult, PipelineError};
use crate::models::{AnalysisRecord, AnalysisResult, FeatureSet, Sentiment};

/// 解析产出
///
/// `used_fallback` 标记是否走到了兜底策略，
/// 编排器据此决定是否把原始输出持久化以便事后排查
#[derive(Debug)]
pub struct ParseOutcome {
    pub records: AnalysisResult,
    pub used_fallback: bool,
}

/// 从原始文本恢复结构化分析结果，绝不失败
pub fn parse(raw_text: &str, requested: &FeatureSet) -> ParseOutcome {
    let json_str = extract_json_from_markdown(raw_text);

    if let Some(records) = strategy_direct(&json_str) {
        debug!("✅ 第一次尝试即解析成功");
        return ParseOutcome {
            records,
            used_fallback: false,
        };
    }
    if let Some(records) = strategy_cleaned(&json_str) {
        debug!("✅ 清洗后解析成功");
        return ParseOutcome {
            records,
            used_fallback: false,
        };
    }
    if let Some(records) = strategy_array_span(&json_str) {
        debug!("✅ 截取数组片段后解析成功");
        return ParseOutcome {
            records,
            used_fallback: false,
        };
    }

    warn!("⚠️ 结构化解析全部失败，从原始文本构建兜底结果");
    ParseOutcome {
        records: fallback_from_text(raw_text, requested),
        used_fallback: true,
    }
}

/// 提取第一个围栏代码块的内容；没有围栏时返回整段文本
pub fn extract_json_from_markdown(raw: &str) -> String {
    let re = match regex::Regex::new(r"```(?:json)?\s*([\s\S]*?)```") {
        Ok(re) => re,
        Err(_) => return raw.trim().to_string(),
    };
    match re.captures(raw).and_then(|c| c.get(1)) {
        Some(block) => block.as_str().trim().to_string(),
        None => raw.trim().to_string(),
    }
}

/// 策略 1：直接解析
fn strategy_direct(json_str: &str) -> Option<AnalysisResult> {
    let value: Value = serde_json::from_str(json_str).ok()?;
    coerce_records(value).ok()
}

/// 策略 2：宽松清洗后解析
fn strategy_cleaned(json_str: &str) -> Option<AnalysisResult> {
    // 还原过度转义的引号
    let cleaned = json_str.replace("\\\"", "\"");
    // 去除控制字符
    let cleaned: String = cleaned
        .chars()
        .filter(|c| {
            let code = *c as u32;
            !(code <= 0x1f || (0x7f..=0x9f).contains(&code))
        })
        .collect();
    let value: Value = serde_json::from_str(&cleaned).ok()?;
    coerce_records(value).ok()
}

/// 策略 3：截取最外层的 `[...]` 片段
fn strategy_array_span(json_str: &str) -> Option<AnalysisResult> {
    let start = json_str.find('[')?;
    let end = json_str.rfind(']')?;
    if end <= start {
        return None;
    }
    let value: Value = serde_json::from_str(&json_str[start..=end]).ok()?;
    coerce_records(value).ok()
}

/// 策略 4：确定性兜底，逐行扫描原始文本
///
/// 每一行只要提到某个请求特征（大小写不敏感）就产出一条 Mixed 记录；
/// 同一特征被多行提到会产出多条记录（已知边界情况，不做去重）。
/// 一个特征都没提到时，为每个请求特征产出一条 Unknown 记录。
pub fn fallback_from_text(raw: &str, requested: &FeatureSet) -> AnalysisResult {
    let mut records = Vec::new();

    for line in raw.lines() {
        let lower = line.to_lowercase();
        for feature in requested.iter() {
            if feature.is_empty() {
                continue;
            }
            if lower.contains(&feature.to_lowercase()) {
                records.push(AnalysisRecord {
                    feature: feature.clone(),
                    sentiment: Sentiment::Mixed,
                    verdict: "Analysis could not be fully parsed due to formatting issues."
                        .to_string(),
                    key_points: vec!["Raw analysis data available in logs".to_string()],
                });
                break;
            }
        }
    }

    if records.is_empty() {
        for feature in requested.iter() {
            records.push(AnalysisRecord {
                feature: feature.clone(),
                sentiment: Sentiment::Unknown,
                verdict: "Analysis could not be completed due to data formatting issues."
                    .to_string(),
                key_points: vec!["Please try again or check the raw output logs".to_string()],
            });
        }
    }

    records
}

/// 把 JSON 值绑定到强类型记录列表
///
/// 单个对象会被包装成单元素列表；非列表结构、空列表、
/// 以及缺少特征名的元素都视为该策略失败
fn coerce_records(value: Value) -> AppResult<AnalysisResult> {
    let items = match value {
        Value::Array(items) => items,
        obj @ Value::Object(_) => vec![obj],
        _ => return Err(AppError::Pipeline(PipelineError::NotListShaped)),
    };
    if items.is_empty() {
        return Err(AppError::Pipeline(PipelineError::NotListShaped));
    }

    let mut records = Vec::with_capacity(items.len());
    for item in items {
        let record: AnalysisRecord = serde_json::from_value(item)
            .map_err(|_| AppError::Pipeline(PipelineError::NotListShaped))?;
        if record.feature.is_empty() {
            return Err(AppError::Pipeline(PipelineError::NotListShaped));
        }
        records.push(record);
    }
    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn features(names: &[&str]) -> FeatureSet {
        FeatureSet::new(names.iter().map(|s| s.to_string()).collect())
    }

    #[test]
    fn test_parse_fenced_json_array() {
        let raw = r#"Here is the analysis:
```json
[
  {"feature": "battery", "sentiment": "Positive", "verdict": "续航好", "key_points": ["持久"]},
  {"feature": "grip", "sentiment": "Negative", "verdict": "打滑", "key_points": []}
]
```
Done."#;
        let outcome = parse(raw, &features(&["battery", "grip"]));
        assert!(!outcome.used_fallback);
        assert_eq!(outcome.records.len(), 2);
        assert_eq!(outcome.records[0].feature, "battery");
        assert_eq!(outcome.records[0].sentiment, Sentiment::Positive);
        assert_eq!(outcome.records[1].feature, "grip");
    }

    #[test]
    fn test_parse_single_object_wraps_into_list() {
        let raw = r#"```json
{"feature": "battery", "sentiment": "Mixed", "verdict": "一般"}
```"#;
        let outcome = parse(raw, &features(&["battery"]));
        assert!(!outcome.used_fallback);
        assert_eq!(outcome.records.len(), 1);
        assert_eq!(outcome.records[0].sentiment, Sentiment::Mixed);
    }

    #[test]
    fn test_parse_over_escaped_quotes_recovered_by_cleanup() {
        let raw = r#"[{\"feature\": \"battery\", \"sentiment\": \"Positive\", \"verdict\": \"好\"}]"#;
        let outcome = parse(raw, &features(&["battery"]));
        assert!(!outcome.used_fallback);
        assert_eq!(outcome.records[0].feature, "battery");
    }

    #[test]
    fn test_parse_array_span_inside_prose() {
        let raw = r#"Sure! The result is: [{"feature": "grip", "sentiment": "Negative", "verdict": "滑"}] hope it helps"#;
        let outcome = parse(raw, &features(&["grip"]));
        assert!(!outcome.used_fallback);
        assert_eq!(outcome.records.len(), 1);
        assert_eq!(outcome.records[0].feature, "grip");
    }

    #[test]
    fn test_fallback_one_record_per_mentioning_line() {
        // 两行分别提到 battery 和 comfort，
        // 产出恰好两条 Mixed 记录，顺序按首次提及
        let raw = "battery issues noted\ncomfort is great";
        let outcome = parse(raw, &features(&["battery", "comfort"]));
        assert!(outcome.used_fallback);
        assert_eq!(outcome.records.len(), 2);
        assert_eq!(outcome.records[0].feature, "battery");
        assert_eq!(outcome.records[0].sentiment, Sentiment::Mixed);
        assert_eq!(outcome.records[1].feature, "comfort");
        assert_eq!(outcome.records[1].sentiment, Sentiment::Mixed);
    }

    #[test]
    fn test_fallback_repeated_mentions_yield_repeated_records() {
        let raw = "battery drains fast\nthe battery is also heavy";
        let outcome = parse(raw, &features(&["battery"]));
        assert!(outcome.used_fallback);
        // 已知边界情况：不去重
        assert_eq!(outcome.records.len(), 2);
    }

    #[test]
    fn test_fallback_unknown_when_no_feature_mentioned() {
        let raw = "这段输出和任何特征都无关";
        let outcome = parse(raw, &features(&["battery", "comfort"]));
        assert!(outcome.used_fallback);
        assert_eq!(outcome.records.len(), 2);
        assert!(outcome
            .records
            .iter()
            .all(|r| r.sentiment == Sentiment::Unknown));
        assert_eq!(outcome.records[0].feature, "battery");
        assert_eq!(outcome.records[1].feature, "comfort");
    }

    #[test]
    fn test_fallback_empty_text_yields_unknown_records() {
        let outcome = parse("", &features(&["battery", "comfort"]));
        assert!(outcome.used_fallback);
        assert_eq!(outcome.records.len(), 2);
        assert!(outcome
            .records
            .iter()
            .all(|r| r.sentiment == Sentiment::Unknown));
    }

    #[test]
    fn test_scalar_json_falls_through_to_fallback() {
        // 合法 JSON 但不是列表/对象结构，结构化策略应全部失败
        let raw = "```json\n42\n```\nbattery mentioned here";
        let outcome = parse(raw, &features(&["battery"]));
        assert!(outcome.used_fallback);
        assert_eq!(outcome.records[0].sentiment, Sentiment::Mixed);
    }

    #[test]
    fn test_extract_json_from_markdown_without_fence() {
        assert_eq!(extract_json_from_markdown("  [1, 2]  "), "[1, 2]");
    }
}
