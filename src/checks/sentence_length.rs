use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::sync::Arc;

use crate::checks::{merge_options, Check};
use crate::error::Result;
use crate::i18n::{format_template, Translator};
use crate::models::{AssessmentResult, Mark, Paper};
use crate::research::builtins::{SENTENCES, SENTENCE_WORD_COUNTS};
use crate::research::Researcher;

pub const IDENTIFIER: &str = "readability/sentence-length";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SentenceLengthOptions {
    /// 超过该词数的句子算作长句
    pub recommended_word_count: usize,
    /// 长句占比上限（百分比）
    pub recommended_max_percentage: f64,
    /// 超过上限但不超过该余量时给中等分
    pub slightly_too_many_margin: f64,
    pub good_score: f64,
    pub ok_score: f64,
    pub bad_score: f64,
    pub weight: f64,
}

impl Default for SentenceLengthOptions {
    fn default() -> Self {
        Self {
            recommended_word_count: 20,
            recommended_max_percentage: 25.0,
            slightly_too_many_margin: 5.0,
            good_score: 9.0,
            ok_score: 6.0,
            bad_score: 3.0,
            weight: 1.0,
        }
    }
}

impl SentenceLengthOptions {
    /// 基石内容的严格配置
    pub fn cornerstone() -> Self {
        Self {
            recommended_max_percentage: 20.0,
            ..Self::default()
        }
    }
}

/// 句子长度检查：长句占比不超过推荐值
pub struct SentenceLength {
    options: SentenceLengthOptions,
    translator: Arc<dyn Translator>,
}

impl SentenceLength {
    pub fn new(options: SentenceLengthOptions, translator: Arc<dyn Translator>) -> Self {
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
            SentenceLengthOptions::cornerstone()
        } else {
            SentenceLengthOptions::default()
        };
        Ok(Self::new(merge_options(defaults, overrides)?, translator))
    }

    fn long_sentence_count(&self, counts: &[usize]) -> usize {
        counts
            .iter()
            .filter(|&&c| c > self.options.recommended_word_count)
            .count()
    }
}

impl Check for SentenceLength {
    fn identifier(&self) -> &str {
        IDENTIFIER
    }

    fn is_applicable(&self, paper: &Paper) -> bool {
        paper.has_text()
    }

    fn execute(&self, paper: &Paper, researcher: &Researcher) -> Result<AssessmentResult> {
        let counts: Vec<usize> = researcher.get_as(SENTENCE_WORD_COUNTS)?;
        let long = self.long_sentence_count(&counts);
        let percentage = if counts.is_empty() {
            0.0
        } else {
            long as f64 / counts.len() as f64 * 100.0
        };

        let opts = &self.options;
        let locale = paper.locale();
        let result = AssessmentResult::new(IDENTIFIER).with_marks(long > 0);

        if percentage <= opts.recommended_max_percentage {
            return Ok(result
                .with_score(opts.good_score)
                .with_text(self.translator.translate("sentence-length.good", locale)));
        }

        let score = if percentage <= opts.recommended_max_percentage + opts.slightly_too_many_margin {
            opts.ok_score
        } else {
            opts.bad_score
        };
        let text = format_template(
            &self.translator.translate("sentence-length.bad", locale),
            &[
                ("percent", format!("{:.1}", percentage)),
                ("max", opts.recommended_word_count.to_string()),
                ("recommended", opts.recommended_max_percentage.to_string()),
            ],
        );
        Ok(result.with_score(score).with_text(text))
    }

    fn weight(&self) -> f64 {
        self.options.weight
    }

    fn marks(&self, _paper: &Paper, researcher: &Researcher) -> Result<Vec<Mark>> {
        let sentences: Vec<String> = researcher.get_as(SENTENCES)?;
        let counts: Vec<usize> = researcher.get_as(SENTENCE_WORD_COUNTS)?;
        Ok(sentences
            .into_iter()
            .zip(counts)
            .filter(|(_, c)| *c > self.options.recommended_word_count)
            .map(|(s, _)| Mark::highlight(s))
            .collect())
    }
}
