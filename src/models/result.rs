//! 检查结果与结果集

use serde::{Deserialize, Serialize};

use crate::error::ErrorKind;
use crate::models::score::{Rating, ScoreScale};

/// 文本标记：原文片段及其高亮形式
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Mark {
    pub original: String,
    pub marked: String,
}

impl Mark {
    /// 用 `<mark>` 包裹整个片段
    pub fn highlight(original: impl Into<String>) -> Self {
        let original = original.into();
        let marked = format!("<mark>{}</mark>", original);
        Self { original, marked }
    }
}

/// 单个检查单元的结果
///
/// `score` 为 `None` 的结果不参与评分，也不出现在反馈列表中。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssessmentResult {
    pub identifier: String,
    pub score: Option<f64>,
    pub text: String,
    pub has_marks: bool,
}

impl AssessmentResult {
    pub fn new(identifier: impl Into<String>) -> Self {
        Self {
            identifier: identifier.into(),
            score: None,
            text: String::new(),
            has_marks: false,
        }
    }

    pub fn with_score(mut self, score: f64) -> Self {
        self.score = Some(score);
        self
    }

    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = text.into();
        self
    }

    pub fn with_marks(mut self, has_marks: bool) -> Self {
        self.has_marks = has_marks;
        self
    }

    pub fn has_score(&self) -> bool {
        self.score.is_some()
    }

    pub fn rating(&self, scale: &ScoreScale) -> Rating {
        scale.rate(self.score)
    }
}

/// 总分
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum OverallScore {
    /// 没有任何有效分数（"无内容"哨兵值）
    NoContent,
    /// 内部分数（已四舍五入）与 0–100 展示分数
    Scored { score: f64, percent: u8 },
}

impl OverallScore {
    pub fn is_no_content(&self) -> bool {
        matches!(self, OverallScore::NoContent)
    }

    pub fn score(&self) -> Option<f64> {
        match self {
            OverallScore::NoContent => None,
            OverallScore::Scored { score, .. } => Some(*score),
        }
    }

    pub fn percent(&self) -> Option<u8> {
        match self {
            OverallScore::NoContent => None,
            OverallScore::Scored { percent, .. } => Some(*percent),
        }
    }
}

/// 执行失败的检查单元（诊断信息）
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostic {
    pub identifier: String,
    pub kind: ErrorKind,
    pub message: String,
}

/// 一次分析的结果集
///
/// `results` 只包含有分数的结果，按分数升序（最需要处理的在前），同分按注册顺序。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultSet {
    pub results: Vec<AssessmentResult>,
    pub overall: OverallScore,
    pub scale: ScoreScale,
    #[serde(default)]
    pub diagnostics: Vec<Diagnostic>,
}

impl ResultSet {
    /// 空结果集
    pub fn empty(scale: ScoreScale) -> Self {
        Self {
            results: Vec::new(),
            overall: OverallScore::NoContent,
            scale,
            diagnostics: Vec::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    pub fn len(&self) -> usize {
        self.results.len()
    }

    /// 按标识查找结果
    pub fn get(&self, identifier: &str) -> Option<&AssessmentResult> {
        self.results.iter().find(|r| r.identifier == identifier)
    }

    /// 总体等级
    pub fn rating(&self) -> Rating {
        self.scale.rate(self.overall.score())
    }

    pub fn has_diagnostics(&self) -> bool {
        !self.diagnostics.is_empty()
    }
}
