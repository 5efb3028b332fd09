//! 反馈文本的本地化接口
//!
//! 引擎只依赖 [`Translator`]；具体的翻译表由嵌入方提供。

use std::collections::HashMap;

/// 翻译接口（纯函数，无副作用）
pub trait Translator: Send + Sync {
    /// 按 key 取得模板，`{name}` 形式的占位符由调用方替换
    fn translate(&self, key: &str, locale: &str) -> String;

    /// 复数形式选择
    fn plural(&self, singular: &str, plural: &str, n: usize, locale: &str) -> String {
        let _ = locale;
        if n == 1 {
            singular.to_string()
        } else {
            plural.to_string()
        }
    }
}

/// 默认翻译：内置英文模板，未知 key 原样返回
#[derive(Debug, Clone)]
pub struct DefaultTranslator {
    templates: HashMap<&'static str, &'static str>,
}

impl DefaultTranslator {
    pub fn new() -> Self {
        let templates = HashMap::from([
            ("list-presence.good", "Lists: There is at least one list on this page. Great!"),
            ("list-presence.bad", "Lists: No lists appear on this page. Add at least one ordered or unordered list!"),
            ("sentence-length.good", "Sentence length: Great!"),
            ("sentence-length.bad", "Sentence length: {percent}% of the sentences contain more than {max} words, which is more than the recommended maximum of {recommended}%. Try to shorten the sentences."),
            ("text-length.good", "Text length: The text contains {count} {words}. Good job!"),
            ("text-length.ok", "Text length: The text contains {count} {words}. This is slightly below the recommended minimum of {min} words. Add a bit more copy."),
            ("text-length.bad", "Text length: The text contains {count} {words}. This is far below the recommended minimum of {min} words. Add more content."),
            ("keyphrase-density.good", "Keyphrase density: The keyphrase was found {count} {times}. This is great!"),
            ("keyphrase-density.low", "Keyphrase density: The keyphrase was found {count} {times}. That's less than the recommended minimum of {min} times for a text of this length. Focus on your keyphrase!"),
            ("keyphrase-density.high", "Keyphrase density: The keyphrase was found {count} {times}. That's more than the recommended maximum of {max} times for a text of this length. Don't overoptimize!"),
        ]);
        Self { templates }
    }
}

impl Default for DefaultTranslator {
    fn default() -> Self {
        Self::new()
    }
}

impl Translator for DefaultTranslator {
    fn translate(&self, key: &str, _locale: &str) -> String {
        self.templates
            .get(key)
            .map(|t| t.to_string())
            .unwrap_or_else(|| key.to_string())
    }
}

/// 替换模板中的 `{name}` 占位符
pub fn format_template(template: &str, args: &[(&str, String)]) -> String {
    args.iter().fold(template.to_string(), |acc, (name, value)| {
        acc.replace(&format!("{{{}}}", name), value)
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_translate_and_format() {
        let t = DefaultTranslator::new();
        let text = format_template(
            &t.translate("text-length.good", "en_US"),
            &[("count", "1".into()), ("words", t.plural("word", "words", 1, "en_US"))],
        );
        assert_eq!(text, "Text length: The text contains 1 word. Good job!");
        assert_eq!(t.translate("unknown.key", "en_US"), "unknown.key");
    }
}
