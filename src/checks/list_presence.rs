use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::sync::Arc;

use crate::checks::{merge_options, Check};
use crate::error::Result;
use crate::i18n::Translator;
use crate::models::{AssessmentResult, Paper};
use crate::research::builtins::LISTS;
use crate::research::Researcher;

pub const IDENTIFIER: &str = "readability/list-presence";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ListPresenceOptions {
    pub good_score: f64,
    pub bad_score: f64,
    pub weight: f64,
}

impl Default for ListPresenceOptions {
    fn default() -> Self {
        Self {
            good_score: 9.0,
            bad_score: 3.0,
            weight: 1.0,
        }
    }
}

/// 列表检查：正文中至少有一个有序或无序列表
pub struct ListPresence {
    options: ListPresenceOptions,
    translator: Arc<dyn Translator>,
}

impl ListPresence {
    pub fn new(options: ListPresenceOptions, translator: Arc<dyn Translator>) -> Self {
        Self {
            options,
            translator,
        }
    }

    pub fn from_config(overrides: Option<&JsonValue>, translator: Arc<dyn Translator>) -> Result<Self> {
        let options = merge_options(ListPresenceOptions::default(), overrides)?;
        Ok(Self::new(options, translator))
    }
}

impl Check for ListPresence {
    fn identifier(&self) -> &str {
        IDENTIFIER
    }

    fn is_applicable(&self, paper: &Paper) -> bool {
        paper.has_text()
    }

    fn execute(&self, paper: &Paper, researcher: &Researcher) -> Result<AssessmentResult> {
        let lists: usize = researcher.get_as(LISTS)?;

        let (score, key) = if lists > 0 {
            (self.options.good_score, "list-presence.good")
        } else {
            (self.options.bad_score, "list-presence.bad")
        };

        Ok(AssessmentResult::new(IDENTIFIER)
            .with_score(score)
            .with_text(self.translator.translate(key, paper.locale())))
    }

    fn weight(&self) -> f64 {
        self.options.weight
    }
}
