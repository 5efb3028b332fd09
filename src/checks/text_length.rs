use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::sync::Arc;

use crate::checks::{merge_options, Check};
use crate::error::Result;
use crate::i18n::{format_template, Translator};
use crate::models::{AssessmentResult, Paper};
use crate::research::builtins::WORD_COUNT;
use crate::research::Researcher;

pub const IDENTIFIER: &str = "seo/text-length";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextLengthOptions {
    pub recommended_minimum: usize,
    pub slightly_below_minimum: usize,
    pub far_below_minimum: usize,
    pub good_score: f64,
    pub ok_score: f64,
    pub bad_score: f64,
    pub far_below_score: f64,
    pub weight: f64,
}

impl Default for TextLengthOptions {
    fn default() -> Self {
        Self {
            recommended_minimum: 300,
            slightly_below_minimum: 250,
            far_below_minimum: 100,
            good_score: 9.0,
            ok_score: 6.0,
            bad_score: 3.0,
            far_below_score: 1.0,
            weight: 1.0,
        }
    }
}

impl TextLengthOptions {
    /// 基石内容的严格配置
    pub fn cornerstone() -> Self {
        Self {
            recommended_minimum: 900,
            slightly_below_minimum: 400,
            far_below_minimum: 300,
            ..Self::default()
        }
    }
}

/// 正文长度检查：词数不少于推荐最小值
pub struct TextLength {
    options: TextLengthOptions,
    translator: Arc<dyn Translator>,
}

impl TextLength {
    pub fn new(options: TextLengthOptions, translator: Arc<dyn Translator>) -> Self {
        Self {
            options,
            translator,
        }
    }

    pub fn from_config(
        overrides: Option<&JsonValue>,
        cornerstone: bool,
        translator: Arc<dyn Translator>,
    ) -> Result<Self> {
        let defaults = if cornerstone {
            TextLengthOptions::cornerstone()
        } else {
            TextLengthOptions::default()
        };
        Ok(Self::new(merge_options(defaults, overrides)?, translator))
    }

    fn score_for(&self, word_count: usize) -> (f64, &'static str) {
        let opts = &self.options;
        if word_count >= opts.recommended_minimum {
            (opts.good_score, "text-length.good")
        } else if word_count >= opts.slightly_below_minimum {
            (opts.ok_score, "text-length.ok")
        } else if word_count >= opts.far_below_minimum {
            (opts.bad_score, "text-length.bad")
        } else {
            (opts.far_below_score, "text-length.bad")
        }
    }
}

impl Check for TextLength {
    fn identifier(&self) -> &str {
        IDENTIFIER
    }

    fn is_applicable(&self, paper: &Paper) -> bool {
        paper.has_text()
    }

    fn execute(&self, paper: &Paper, researcher: &Researcher) -> Result<AssessmentResult> {
        let word_count: usize = researcher.get_as(WORD_COUNT)?;
        let (score, key) = self.score_for(word_count);
        let locale = paper.locale();

        let text = format_template(
            &self.translator.translate(key, locale),
            &[
                ("count", word_count.to_string()),
                ("words", self.translator.plural("word", "words", word_count, locale)),
                ("min", self.options.recommended_minimum.to_string()),
            ],
        );

        Ok(AssessmentResult::new(IDENTIFIER).with_score(score).with_text(text))
    }

    fn weight(&self) -> f64 {
        self.options.weight
    }
}
