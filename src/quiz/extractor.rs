//! 回复解析：从自由文本中取出 ```json 代码块并按目标 schema 校验
//!
//! 两个入口共用同一套定位与 JSON 解析逻辑，只在最后一步使用不同的类型。
//! 若以后改用原生结构化输出，只需换一个 ResponseExtractor 实现，状态机不用动。

use std::sync::OnceLock;

use regex::Regex;
use serde::de::DeserializeOwned;

use crate::core::ExtractionError;
use crate::quiz::{QuizBatch, ValidationReport};

static JSON_BLOCK_RE: OnceLock<Regex> = OnceLock::new();

/// 回复解析器：纯函数，无 IO、无状态
pub trait ResponseExtractor: Send + Sync {
    fn extract_batch(&self, text: &str) -> Result<QuizBatch, ExtractionError>;

    fn extract_report(&self, text: &str) -> Result<ValidationReport, ExtractionError>;
}

/// 默认实现：取第一个 ```json ... ``` 代码块
#[derive(Debug, Default, Clone, Copy)]
pub struct FencedJsonExtractor;

impl FencedJsonExtractor {
    /// 解析不带代码块包裹的题组 JSON（如已保存的结果文件），校验规则与 extract_batch 相同
    pub fn parse_batch(json: &str) -> Result<QuizBatch, ExtractionError> {
        let (batch, value) = parse_typed::<QuizBatch>(json)?;
        batch
            .into_iter()
            .enumerate()
            .map(|(i, item)| {
                let item = item.trimmed();
                item.validate()
                    .map(|_| item)
                    .map_err(|reason| ExtractionError::SchemaViolation {
                        value: value.clone(),
                        reason: format!("item {}: {}", i + 1, reason),
                    })
            })
            .collect()
    }
}

impl ResponseExtractor for FencedJsonExtractor {
    fn extract_batch(&self, text: &str) -> Result<QuizBatch, ExtractionError> {
        Self::parse_batch(locate(text)?)
    }

    fn extract_report(&self, text: &str) -> Result<ValidationReport, ExtractionError> {
        parse_typed::<ValidationReport>(locate(text)?).map(|(report, _)| report)
    }
}

/// 定位代码块（跨行、非贪婪），返回块内文本
pub fn find_json_block(text: &str) -> Option<&str> {
    let re = JSON_BLOCK_RE
        .get_or_init(|| Regex::new(r"(?s)```json[ \t]*\r?\n(.*?)\r?\n?```").unwrap());
    re.captures(text)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str())
}

fn locate(text: &str) -> Result<&str, ExtractionError> {
    find_json_block(text).ok_or_else(|| ExtractionError::NoStructuredBlock {
        raw: text.to_string(),
    })
}

/// 解析 JSON -> 反序列化为目标类型；同时返回原始 Value 供诊断
fn parse_typed<T: DeserializeOwned>(
    captured: &str,
) -> Result<(T, serde_json::Value), ExtractionError> {
    let value: serde_json::Value =
        serde_json::from_str(captured).map_err(|source| ExtractionError::MalformedJson {
            captured: captured.to_string(),
            source,
        })?;

    let typed = serde_json::from_value::<T>(value.clone()).map_err(|e| {
        ExtractionError::SchemaViolation {
            value: value.clone(),
            reason: e.to_string(),
        }
    })?;

    Ok((typed, value))
}

/// 将题组包装成 LLM 应当输出的格式（```json 代码块）
pub fn fence_json<T: serde::Serialize>(value: &T) -> String {
    let body = serde_json::to_string(value).unwrap_or_default();
    format!("```json\n{}\n```", body)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::quiz::{Evaluation, QuizItem};

    fn sample_batch() -> QuizBatch {
        vec![
            QuizItem {
                question: "물의 화학식은?".into(),
                choices: vec!["H2O".into(), "CO2".into(), "O2".into(), "NaCl".into()],
                answer: 1,
                explanation: Some("수소 2개와 산소 1개".into()),
            },
            QuizItem {
                question: "태양계에서 가장 큰 행성은?".into(),
                choices: vec!["지구".into(), "화성".into(), "목성".into(), "금성".into()],
                answer: 3,
                explanation: None,
            },
        ]
    }

    #[test]
    fn test_round_trip_batch() {
        let batch = sample_batch();
        let text = format!("문제를 만들었습니다.\n{}\n확인해 주세요.", fence_json(&batch));
        let extracted = FencedJsonExtractor.extract_batch(&text).unwrap();
        assert_eq!(extracted, batch);
    }

    #[test]
    fn test_multiline_block_and_first_match() {
        let text = "```json\n[\n  {\"question\": \" Q \", \"choices\": [\"a\",\"b\",\"c\",\"d\"], \"answer\": 2}\n]\n```\n\n```json\n[]\n```";
        let batch = FencedJsonExtractor.extract_batch(text).unwrap();
        assert_eq!(batch.len(), 1);
        assert_eq!(batch[0].question, "Q");
    }

    #[test]
    fn test_no_block() {
        let err = FencedJsonExtractor.extract_batch("just prose").unwrap_err();
        match err {
            ExtractionError::NoStructuredBlock { raw } => assert_eq!(raw, "just prose"),
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn test_malformed_json_keeps_captured_text() {
        let err = FencedJsonExtractor
            .extract_batch("```json\n[{\"question\": \n```")
            .unwrap_err();
        match err {
            ExtractionError::MalformedJson { captured, .. } => {
                assert_eq!(captured, "[{\"question\": ")
            }
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn test_schema_violation_wrong_choice_count() {
        let text = "```json\n[{\"question\":\"Q\",\"choices\":[\"a\",\"b\"],\"answer\":1}]\n```";
        let err = FencedJsonExtractor.extract_batch(text).unwrap_err();
        match err {
            ExtractionError::SchemaViolation { value, reason } => {
                assert!(value.is_array());
                assert!(reason.contains("item 1"));
            }
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn test_schema_violation_wrong_shape() {
        let text = "```json\n{\"question\":\"Q\"}\n```";
        assert!(matches!(
            FencedJsonExtractor.extract_batch(text),
            Err(ExtractionError::SchemaViolation { .. })
        ));
    }

    #[test]
    fn test_extract_report() {
        let text = r#"검토 결과입니다.
```json
{"issues":[{"question":"Q","choices":["a","b","c","d"],"answer":1,
"details":{"topic_match":"ok","difficulty":"ok","duplication":"none","similar_questions":"none","naturalness":"ok","rule_compliance":"ok"},
"evaluation":"Adequate"}],
"overall_evaluation":"Adequate","invalid_indices":[]}
```"#;
        let report = FencedJsonExtractor.extract_report(text).unwrap();
        assert!(report.is_adequate());
        assert_eq!(report.issues[0].evaluation, Evaluation::Adequate);
        assert!(report.invalid_indices.is_empty());
    }

    #[test]
    fn test_report_rejects_unknown_verdict() {
        let text = "```json\n{\"issues\":[],\"overall_evaluation\":\"Maybe\",\"invalid_indices\":[]}\n```";
        assert!(matches!(
            FencedJsonExtractor.extract_report(text),
            Err(ExtractionError::SchemaViolation { .. })
        ));
    }
}
