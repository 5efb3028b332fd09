use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::sync::Arc;

use crate::checks::{merge_options, Check};
use crate::error::Result;
use crate::i18n::{format_template, Translator};
use crate::models::{AssessmentResult, Mark, Paper};
use crate::research::builtins::{KEYPHRASE_COUNT, WORD_COUNT};
use crate::research::Researcher;

pub const IDENTIFIER: &str = "seo/keyphrase-density";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KeyphraseDensityOptions {
    /// 最小密度（每 100 词）
    pub min_density: f64,
    /// 最大密度（每 100 词）
    pub max_density: f64,
    pub good_score: f64,
    pub low_score: f64,
    pub high_score: f64,
    pub weight: f64,
}

impl Default for KeyphraseDensityOptions {
    fn default() -> Self {
        Self {
            min_density: 0.5,
            max_density: 3.0,
            good_score: 9.0,
            low_score: 4.0,
            high_score: 3.0,
            weight: 1.0,
        }
    }
}

/// 关键词密度检查
pub struct KeyphraseDensity {
    options: KeyphraseDensityOptions,
    translator: Arc<dyn Translator>,
}

impl KeyphraseDensity {
    pub fn new(options: KeyphraseDensityOptions, translator: Arc<dyn Translator>) -> Self {
        Self {
            options,
            translator,
        }
    }

    pub fn from_config(overrides: Option<&JsonValue>, translator: Arc<dyn Translator>) -> Result<Self> {
        let options = merge_options(KeyphraseDensityOptions::default(), overrides)?;
        Ok(Self::new(options, translator))
    }

    /// 该长度的正文推荐的出现次数范围
    fn recommended_range(&self, word_count: usize) -> (usize, usize) {
        let min = (self.options.min_density / 100.0 * word_count as f64).ceil().max(1.0) as usize;
        let max = (self.options.max_density / 100.0 * word_count as f64).floor() as usize;
        (min, max.max(min))
    }
}

impl Check for KeyphraseDensity {
    fn identifier(&self) -> &str {
        IDENTIFIER
    }

    fn is_applicable(&self, paper: &Paper) -> bool {
        paper.has_text() && paper.has_keyphrase()
    }

    fn execute(&self, paper: &Paper, researcher: &Researcher) -> Result<AssessmentResult> {
        let word_count: usize = researcher.get_as(WORD_COUNT)?;
        let counts = researcher.get(KEYPHRASE_COUNT)?;
        let count = counts["count"].as_u64().unwrap_or(0) as usize;
        let (min, max) = self.recommended_range(word_count);
        let locale = paper.locale();

        let (score, key) = if count < min {
            (self.options.low_score, "keyphrase-density.low")
        } else if count > max {
            (self.options.high_score, "keyphrase-density.high")
        } else {
            (self.options.good_score, "keyphrase-density.good")
        };

        let text = format_template(
            &self.translator.translate(key, locale),
            &[
                ("count", count.to_string()),
                ("times", self.translator.plural("time", "times", count, locale)),
                ("min", min.to_string()),
                ("max", max.to_string()),
            ],
        );

        Ok(AssessmentResult::new(IDENTIFIER)
            .with_score(score)
            .with_text(text)
            .with_marks(count > 0))
    }

    fn weight(&self) -> f64 {
        self.options.weight
    }

    fn marks(&self, paper: &Paper, researcher: &Researcher) -> Result<Vec<Mark>> {
        let counts = researcher.get(KEYPHRASE_COUNT)?;
        if counts["count"].as_u64().unwrap_or(0) == 0 {
            return Ok(Vec::new());
        }
        Ok(vec![Mark::highlight(paper.keyphrase())])
    }
}
