//! 评分尺度与等级
//!
//! 内部分数范围为 `0..=max`（默认 0–9），展示分数为 0–100，两者线性映射：
//! `percent = round(score / max * 100)`。
//! 等级按三等分划分，默认尺度下即 0–3 差、4–6 中、7–9 好。

use serde::{Deserialize, Serialize};

/// 默认内部满分
pub const DEFAULT_SCALE_MAX: f64 = 9.0;

/// 评分尺度
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScoreScale {
    pub max: f64,
}

impl Default for ScoreScale {
    fn default() -> Self {
        Self {
            max: DEFAULT_SCALE_MAX,
        }
    }
}

impl ScoreScale {
    pub fn new(max: f64) -> Self {
        Self { max }
    }

    /// 把分数限制在 `[0, max]`
    pub fn clamp(&self, score: f64) -> f64 {
        score.max(0.0).min(self.max)
    }

    /// 四舍五入到尺度单位
    pub fn round(&self, score: f64) -> f64 {
        self.clamp(score).round()
    }

    /// 换算为 0–100 的展示分数
    pub fn to_percent(&self, score: f64) -> u8 {
        if self.max <= 0.0 {
            return 0;
        }
        (self.clamp(score) / self.max * 100.0).round() as u8
    }

    /// 分数对应的等级
    pub fn rate(&self, score: Option<f64>) -> Rating {
        let Some(score) = score else {
            return Rating::Feedback;
        };
        let score = self.clamp(score);
        if score <= self.max / 3.0 {
            Rating::Bad
        } else if score <= self.max * 2.0 / 3.0 {
            Rating::Ok
        } else {
            Rating::Good
        }
    }
}

/// 等级
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Rating {
    /// 没有分数（无内容或仅提示）
    Feedback,
    /// 差
    Bad,
    /// 中
    Ok,
    /// 好
    Good,
}

impl Rating {
    pub fn name(self) -> &'static str {
        match self {
            Rating::Feedback => "feedback",
            Rating::Bad => "bad",
            Rating::Ok => "ok",
            Rating::Good => "good",
        }
    }

    /// 日志中使用的符号
    pub fn glyph(self) -> &'static str {
        match self {
            Rating::Feedback => "💬",
            Rating::Bad => "❌",
            Rating::Ok => "⚠️",
            Rating::Good => "✅",
        }
    }
}

impl std::fmt::Display for Rating {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}
