//! 通道配置：为每个分析通道装配编排器
//!
//! - readability：列表检查、句长检查
//! - seo：正文长度检查、关键词密度检查
//!
//! 装配顺序：内置检查（可被插件替换、可被禁用）→ 就绪插件的检查 → 就绪插件的钩子。

use std::sync::Arc;
use tracing::{debug, info};

use crate::checks::{
    keyphrase_density, list_presence, sentence_length, text_length, Check, KeyphraseDensity, ListPresence,
    SentenceLength, TextLength,
};
use crate::config::AnalysisConfig;
use crate::error::Result;
use crate::i18n::Translator;
use crate::models::{Lane, ScoreScale};
use crate::orchestrator::assessor::Assessor;
use crate::orchestrator::pluggable::Pluggable;

/// 通道的内置检查标识（注册顺序）
pub fn builtin_identifiers(lane: Lane) -> &'static [&'static str] {
    match lane {
        Lane::Readability => &[list_presence::IDENTIFIER, sentence_length::IDENTIFIER],
        Lane::Seo => &[text_length::IDENTIFIER, keyphrase_density::IDENTIFIER],
    }
}

fn builtin_check(
    identifier: &str,
    config: &AnalysisConfig,
    translator: Arc<dyn Translator>,
) -> Result<Option<Arc<dyn Check>>> {
    let options = config.check_options(identifier);
    let cornerstone = config.use_cornerstone;

    let check: Arc<dyn Check> = match identifier {
        list_presence::IDENTIFIER => Arc::new(ListPresence::from_config(options, translator)?),
        sentence_length::IDENTIFIER => Arc::new(SentenceLength::from_config(options, cornerstone, translator)?),
        text_length::IDENTIFIER => Arc::new(TextLength::from_config(options, cornerstone, translator)?),
        keyphrase_density::IDENTIFIER => Arc::new(KeyphraseDensity::from_config(options, translator)?),
        _ => return Ok(None),
    };
    Ok(Some(check))
}

impl Assessor {
    /// 按配置装配某个通道的编排器
    pub fn for_lane(
        lane: Lane,
        config: &AnalysisConfig,
        pluggable: &Pluggable,
        translator: Arc<dyn Translator>,
    ) -> Result<Assessor> {
        config.validate()?;

        let mut assessor = Assessor::new()
            .with_scale(ScoreScale::new(config.score_scale_max))
            .with_aggregator(config.aggregation.aggregator());

        let disabled = |id: &str| config.is_disabled(id) || pluggable.is_disabled(id);

        for &identifier in builtin_identifiers(lane) {
            if disabled(identifier) {
                debug!("内置检查 {} 已禁用", identifier);
                continue;
            }
            // 被替换的内置检查不实例化
            let check = match pluggable.replacement(identifier) {
                Some(replacement) => Some(replacement),
                None => builtin_check(identifier, config, translator.clone())?,
            };
            if let Some(check) = check {
                assessor.register_check(check);
            }
        }

        for check in pluggable.checks_for(lane) {
            if config.is_disabled(check.identifier()) {
                continue;
            }
            assessor.register_check(check);
        }

        for modification in pluggable.modifications() {
            assessor.add_modification(modification);
        }

        info!(
            "✓ 通道 {} 装配完成: {} 个检查 (cornerstone: {})",
            lane,
            assessor.check_identifiers().len(),
            config.use_cornerstone
        );
        Ok(assessor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AnalysisError;
    use crate::i18n::DefaultTranslator;
    use crate::models::{AssessmentResult, Paper};
    use crate::research::Researcher;
    use serde_json::json;

    fn translator() -> Arc<dyn Translator> {
        Arc::new(DefaultTranslator::new())
    }

    struct AlwaysBad;

    impl Check for AlwaysBad {
        fn identifier(&self) -> &str {
            "acme/always-bad"
        }
        fn is_applicable(&self, _: &Paper) -> bool {
            true
        }
        fn execute(&self, _: &Paper, _: &Researcher) -> Result<AssessmentResult> {
            Ok(AssessmentResult::new("acme/always-bad").with_score(0.0))
        }
    }

    #[test]
    fn test_default_profiles() {
        let config = AnalysisConfig::default();
        let pluggable = Pluggable::new();
        let readability = Assessor::for_lane(Lane::Readability, &config, &pluggable, translator()).unwrap();
        assert_eq!(
            readability.check_identifiers(),
            vec!["readability/list-presence", "readability/sentence-length"]
        );
        let seo = Assessor::for_lane(Lane::Seo, &config, &pluggable, translator()).unwrap();
        assert_eq!(seo.check_identifiers(), vec!["seo/text-length", "seo/keyphrase-density"]);
    }

    #[test]
    fn test_disable_and_plugin_checks() {
        let config = AnalysisConfig {
            disabled_checks: vec!["seo/text-length".to_string()],
            ..Default::default()
        };
        let mut pluggable = Pluggable::new();
        pluggable.register_plugin("acme").unwrap();
        pluggable.register_check("acme", Lane::Seo, Arc::new(AlwaysBad)).unwrap();
        pluggable.plugin_ready("acme").unwrap();

        let mut seo = Assessor::for_lane(Lane::Seo, &config, &pluggable, translator()).unwrap();
        assert_eq!(seo.check_identifiers(), vec!["seo/keyphrase-density", "acme/always-bad"]);

        let paper = Paper::builder("Cats are nice. Cats sleep a lot.").keyphrase("cats").build();
        let result_set = seo.run(&paper, &mut Researcher::with_default_researches());
        assert_eq!(result_set.results[0].identifier, "acme/always-bad");
    }

    #[test]
    fn test_replacement_keeps_position() {
        let mut pluggable = Pluggable::new();
        pluggable.register_plugin("acme").unwrap();

        struct Replacement;
        impl Check for Replacement {
            fn identifier(&self) -> &str {
                "readability/list-presence"
            }
            fn is_applicable(&self, _: &Paper) -> bool {
                true
            }
            fn execute(&self, _: &Paper, _: &Researcher) -> Result<AssessmentResult> {
                Ok(AssessmentResult::new("readability/list-presence").with_score(1.0))
            }
        }

        pluggable.replace_check("acme", Arc::new(Replacement)).unwrap();
        pluggable.plugin_ready("acme").unwrap();

        let mut assessor =
            Assessor::for_lane(Lane::Readability, &AnalysisConfig::default(), &pluggable, translator()).unwrap();
        let result_set = assessor.run(&Paper::new("No lists here."), &mut Researcher::with_default_researches());
        assert_eq!(result_set.get("readability/list-presence").and_then(|r| r.score), Some(1.0));
    }

    #[test]
    fn test_bad_check_options_rejected() {
        let mut config = AnalysisConfig::default();
        config
            .checks
            .insert("seo/text-length".to_string(), json!({ "recommended_minimum": "many" }));
        let err = Assessor::for_lane(Lane::Seo, &config, &Pluggable::new(), translator()).unwrap_err();
        assert!(matches!(err, AnalysisError::Config { .. }));
    }
}
