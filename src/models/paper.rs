//! 内容单元（Paper）
//!
//! 一次分析请求的不可变输入：正文、目标关键词、同义词、语言区域和附加属性。

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::error::{AnalysisError, Result};

/// 默认语言区域
pub const DEFAULT_LOCALE: &str = "en_US";

/// 内容单元
///
/// 构造后不可修改；相等性只取决于字段。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Paper {
    text: String,
    #[serde(default)]
    keyphrase: String,
    #[serde(default, deserialize_with = "deserialize_synonyms")]
    synonyms: Vec<String>,
    #[serde(default = "default_locale")]
    locale: String,
    #[serde(default)]
    attributes: BTreeMap<String, String>,
}

impl Paper {
    /// 只有正文的内容单元
    pub fn new(text: impl Into<String>) -> Self {
        PaperBuilder::new(text).build()
    }

    /// 开始构建内容单元
    pub fn builder(text: impl Into<String>) -> PaperBuilder {
        PaperBuilder::new(text)
    }

    /// 从未经类型检查的 JSON 构造
    ///
    /// `text` 缺失或不是字符串时返回 [`AnalysisError::InvalidContent`]，空字符串是合法的。
    pub fn from_json(value: serde_json::Value) -> Result<Self> {
        match value.get("text") {
            Some(serde_json::Value::String(_)) => {}
            Some(other) => {
                return Err(AnalysisError::invalid_content(format!(
                    "text 必须是字符串，实际为: {}",
                    other
                )))
            }
            None => return Err(AnalysisError::invalid_content("缺少 text 字段")),
        }

        serde_json::from_value(value).map_err(|e| AnalysisError::invalid_content(e.to_string()))
    }

    /// 从 TOML 文本构造，校验规则与 [`Paper::from_json`] 相同
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let table: toml::Table =
            toml::from_str(content).map_err(|e| AnalysisError::invalid_content(e.to_string()))?;

        match table.get("text") {
            Some(toml::Value::String(_)) => {}
            Some(other) => {
                return Err(AnalysisError::invalid_content(format!(
                    "text 必须是字符串，实际类型: {}",
                    other.type_str()
                )))
            }
            None => return Err(AnalysisError::invalid_content("缺少 text 字段")),
        }

        toml::from_str(content).map_err(|e| AnalysisError::invalid_content(e.to_string()))
    }

    /// 换一个语言区域的副本（原内容单元不变）
    pub fn with_locale(&self, locale: impl Into<String>) -> Self {
        Self {
            locale: locale.into(),
            ..self.clone()
        }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn keyphrase(&self) -> &str {
        &self.keyphrase
    }

    pub fn synonyms(&self) -> &[String] {
        &self.synonyms
    }

    pub fn locale(&self) -> &str {
        &self.locale
    }

    pub fn attributes(&self) -> &BTreeMap<String, String> {
        &self.attributes
    }

    /// 获取单个属性
    pub fn attribute(&self, key: &str) -> Option<&str> {
        self.attributes.get(key).map(String::as_str)
    }

    /// 语言代码（`en_US` → `en`）
    pub fn language(&self) -> &str {
        self.locale
            .split(|c| c == '_' || c == '-')
            .next()
            .filter(|s| !s.is_empty())
            .unwrap_or("en")
    }

    pub fn title(&self) -> Option<&str> {
        self.attribute("title")
    }

    /// SEO 描述（meta description）
    pub fn description(&self) -> Option<&str> {
        self.attribute("description")
    }

    pub fn slug(&self) -> Option<&str> {
        self.attribute("slug")
    }

    pub fn permalink(&self) -> Option<&str> {
        self.attribute("permalink")
    }

    // ========== 派生谓词 ==========

    pub fn has_text(&self) -> bool {
        !self.text.trim().is_empty()
    }

    pub fn has_keyphrase(&self) -> bool {
        !self.keyphrase.trim().is_empty()
    }

    pub fn has_synonyms(&self) -> bool {
        self.synonyms.iter().any(|s| !s.trim().is_empty())
    }

    pub fn has_title(&self) -> bool {
        self.title().map_or(false, |t| !t.trim().is_empty())
    }

    pub fn has_description(&self) -> bool {
        self.description().map_or(false, |d| !d.trim().is_empty())
    }
}

/// 内容单元构建器
#[derive(Debug, Clone)]
pub struct PaperBuilder {
    paper: Paper,
}

impl PaperBuilder {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            paper: Paper {
                text: text.into(),
                keyphrase: String::new(),
                synonyms: Vec::new(),
                locale: default_locale(),
                attributes: BTreeMap::new(),
            },
        }
    }

    pub fn keyphrase(mut self, keyphrase: impl Into<String>) -> Self {
        self.paper.keyphrase = keyphrase.into();
        self
    }

    pub fn synonyms<I, S>(mut self, synonyms: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.paper.synonyms = synonyms.into_iter().map(Into::into).collect();
        self
    }

    /// 用逗号分隔的字符串设置同义词
    pub fn synonyms_csv(mut self, synonyms: &str) -> Self {
        self.paper.synonyms = split_synonyms(synonyms);
        self
    }

    pub fn locale(mut self, locale: impl Into<String>) -> Self {
        self.paper.locale = locale.into();
        self
    }

    pub fn attribute(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.paper.attributes.insert(key.into(), value.into());
        self
    }

    pub fn build(self) -> Paper {
        self.paper
    }
}

fn default_locale() -> String {
    DEFAULT_LOCALE.to_string()
}

fn split_synonyms(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

// 同义词既可以是字符串数组，也可以是逗号分隔的字符串
fn deserialize_synonyms<'de, D>(deserializer: D) -> std::result::Result<Vec<String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    use serde::de::{SeqAccess, Visitor};
    use std::fmt;

    struct SynonymsVisitor;

    impl<'de> Visitor<'de> for SynonymsVisitor {
        type Value = Vec<String>;

        fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
            formatter.write_str("a comma separated string or a list of strings")
        }

        fn visit_str<E>(self, value: &str) -> std::result::Result<Self::Value, E>
        where
            E: serde::de::Error,
        {
            Ok(split_synonyms(value))
        }

        fn visit_seq<A>(self, mut seq: A) -> std::result::Result<Self::Value, A::Error>
        where
            A: SeqAccess<'de>,
        {
            let mut synonyms = Vec::new();
            while let Some(item) = seq.next_element::<String>()? {
                synonyms.push(item);
            }
            Ok(synonyms)
        }
    }

    deserializer.deserialize_any(SynonymsVisitor)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_empty_text_is_valid() {
        let paper = Paper::from_json(json!({ "text": "", "keyphrase": "cats" })).unwrap();
        assert!(!paper.has_text());
        assert!(paper.has_keyphrase());
        assert_eq!(paper.locale(), DEFAULT_LOCALE);
    }

    #[test]
    fn test_non_string_text_is_invalid() {
        let err = Paper::from_json(json!({ "text": 42 })).unwrap_err();
        assert!(matches!(err, AnalysisError::InvalidContent { .. }));

        let err = Paper::from_json(json!({ "keyphrase": "cats" })).unwrap_err();
        assert!(matches!(err, AnalysisError::InvalidContent { .. }));

        let err = Paper::from_toml_str("text = 3\n").unwrap_err();
        assert!(matches!(err, AnalysisError::InvalidContent { .. }));
    }

    #[test]
    fn test_synonyms_from_string_or_list() {
        let a = Paper::from_json(json!({ "text": "x", "synonyms": "kitten, feline ,," })).unwrap();
        let b = Paper::from_json(json!({ "text": "x", "synonyms": ["kitten", "feline"] })).unwrap();
        assert_eq!(a.synonyms(), b.synonyms());
        assert!(a.has_synonyms());
    }

    #[test]
    fn test_from_toml_with_attributes() {
        let content = r#"
text = "<p>Cats are great.</p>"
keyphrase = "cats"
locale = "nl_NL"

[attributes]
title = "All about cats"
slug = "all-about-cats"
"#;
        let paper = Paper::from_toml_str(content).unwrap();
        assert_eq!(paper.language(), "nl");
        assert_eq!(paper.title(), Some("All about cats"));
        assert_eq!(paper.slug(), Some("all-about-cats"));
        assert!(!paper.has_description());
    }

    #[test]
    fn test_builder_equality() {
        let a = Paper::builder("text").keyphrase("k").synonyms_csv("a, b").build();
        let b = Paper::builder("text").keyphrase("k").synonyms(["a", "b"]).build();
        assert_eq!(a, b);
    }
}
