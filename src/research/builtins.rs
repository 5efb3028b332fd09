//! 内置计算
//!
//! 这些计算是文本分析的共享基础，检查单元通过名称读取。
//! 嵌入方可以用同名重新注册来替换（例如换一个分词器）。

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::json;

use crate::error::Result;
use crate::models::Paper;
use crate::research::researcher::{ResearchValue, Researcher};

pub const TEXT_WITHOUT_HTML: &str = "text_without_html";
pub const WORDS: &str = "words";
pub const WORD_COUNT: &str = "word_count";
pub const SENTENCES: &str = "sentences";
pub const SENTENCE_WORD_COUNTS: &str = "sentence_word_counts";
pub const KEYPHRASE_COUNT: &str = "keyphrase_count";
pub const KEYPHRASE_DENSITY: &str = "keyphrase_density";
pub const LISTS: &str = "lists";

/// 按字符而不是空白切词的语言
const CHARACTER_LANGUAGES: [&str; 2] = ["zh", "ja"];

// ========== 预编译的正则 ==========

static HTML_TAG: Lazy<Regex> = Lazy::new(|| Regex::new(r"<[^>]*>").expect("HTML 标签正则无效"));

static WORD: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[\p{L}\p{N}][\p{L}\p{N}'’\-]*").expect("单词正则无效"));

static SENTENCE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[^.!?。！？]+[.!?。！？]*").expect("句子正则无效"));

static LIST_OPEN: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)<(ul|ol)(\s[^>]*)?>").expect("列表正则无效"));

impl Researcher {
    /// 预装所有内置计算的 Researcher
    pub fn with_default_researches() -> Self {
        let mut researcher = Researcher::new();
        register_defaults(&mut researcher);
        researcher
    }
}

/// 注册所有内置计算
pub fn register_defaults(researcher: &mut Researcher) {
    researcher.register(TEXT_WITHOUT_HTML, text_without_html);
    researcher.register(WORDS, words);
    researcher.register(WORD_COUNT, word_count);
    researcher.register(SENTENCES, sentences);
    researcher.register(SENTENCE_WORD_COUNTS, sentence_word_counts);
    researcher.register(KEYPHRASE_COUNT, keyphrase_count);
    researcher.register(KEYPHRASE_DENSITY, keyphrase_density);
    researcher.register(LISTS, lists);
}

fn text_without_html(paper: &Paper, _: &Researcher) -> Result<ResearchValue> {
    let stripped = HTML_TAG.replace_all(paper.text(), " ");
    let collapsed = stripped.split_whitespace().collect::<Vec<_>>().join(" ");
    Ok(json!(collapsed))
}

fn tokenize(text: &str, language: &str) -> Vec<String> {
    let split_chars = CHARACTER_LANGUAGES.contains(&language);

    let mut tokens = Vec::new();
    for m in WORD.find_iter(text) {
        if split_chars {
            tokens.extend(m.as_str().chars().map(|c| c.to_string()));
        } else {
            tokens.push(m.as_str().to_string());
        }
    }
    tokens
}

fn words(paper: &Paper, researcher: &Researcher) -> Result<ResearchValue> {
    let text: String = researcher.get_as(TEXT_WITHOUT_HTML)?;
    Ok(json!(tokenize(&text, paper.language())))
}

fn word_count(_: &Paper, researcher: &Researcher) -> Result<ResearchValue> {
    let words: Vec<String> = researcher.get_as(WORDS)?;
    Ok(json!(words.len()))
}

fn sentences(_: &Paper, researcher: &Researcher) -> Result<ResearchValue> {
    let text: String = researcher.get_as(TEXT_WITHOUT_HTML)?;
    let sentences: Vec<String> = SENTENCE
        .find_iter(&text)
        .map(|m| m.as_str().trim().to_string())
        .filter(|s| !s.is_empty())
        .collect();
    Ok(json!(sentences))
}

fn sentence_word_counts(paper: &Paper, researcher: &Researcher) -> Result<ResearchValue> {
    let sentences: Vec<String> = researcher.get_as(SENTENCES)?;
    let counts: Vec<usize> = sentences
        .iter()
        .map(|s| tokenize(s, paper.language()).len())
        .collect();
    Ok(json!(counts))
}

/// 统计词序列 `phrase` 在 `words` 中连续出现的次数（忽略大小写）
fn count_phrase(words: &[String], phrase: &[String]) -> usize {
    if phrase.is_empty() || phrase.len() > words.len() {
        return 0;
    }
    words
        .windows(phrase.len())
        .filter(|window| {
            window
                .iter()
                .zip(phrase)
                .all(|(w, p)| w.to_lowercase() == p.to_lowercase())
        })
        .count()
}

fn keyphrase_count(paper: &Paper, researcher: &Researcher) -> Result<ResearchValue> {
    let words: Vec<String> = researcher.get_as(WORDS)?;
    let language = paper.language();

    let keyphrase = tokenize(paper.keyphrase(), language);
    let count = count_phrase(&words, &keyphrase);

    let mut synonym_count = 0;
    for synonym in paper.synonyms() {
        synonym_count += count_phrase(&words, &tokenize(synonym, language));
    }

    Ok(json!({ "count": count, "synonym_count": synonym_count }))
}

fn keyphrase_density(_: &Paper, researcher: &Researcher) -> Result<ResearchValue> {
    let word_count: usize = researcher.get_as(WORD_COUNT)?;
    let counts = researcher.get(KEYPHRASE_COUNT)?;
    let count = counts["count"].as_u64().unwrap_or(0) as f64;

    let density = if word_count == 0 {
        0.0
    } else {
        count / word_count as f64 * 100.0
    };
    Ok(json!(density))
}

fn lists(paper: &Paper, _: &Researcher) -> Result<ResearchValue> {
    Ok(json!(LIST_OPEN.find_iter(paper.text()).count()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn researcher_for(paper: Paper) -> Researcher {
        Researcher::with_default_researches().for_paper(paper)
    }

    #[test]
    fn test_text_and_words() {
        let r = researcher_for(Paper::new("<p>Hello   <b>world</b>, it's me.</p>"));
        assert_eq!(r.get_as::<String>(TEXT_WITHOUT_HTML).unwrap(), "Hello world , it's me.");
        assert_eq!(r.get_as::<usize>(WORD_COUNT).unwrap(), 4);
    }

    #[test]
    fn test_sentences() {
        let r = researcher_for(Paper::new("One two three. Four five! Six?"));
        let counts: Vec<usize> = r.get_as(SENTENCE_WORD_COUNTS).unwrap();
        assert_eq!(counts, vec![3, 2, 1]);
    }

    #[test]
    fn test_tokenize_many_sentences() {
        let text = "Short one. ".repeat(200);
        let r = researcher_for(Paper::new(&text));
        let counts: Vec<usize> = r.get_as(SENTENCE_WORD_COUNTS).unwrap();
        assert_eq!(counts.len(), 200);
        assert!(counts.iter().all(|&c| c == 2));
        assert_eq!(tokenize("it's a well-known fact", "en"), vec!["it's", "a", "well-known", "fact"]);
    }

    #[test]
    fn test_character_languages_split_per_char() {
        let paper = Paper::builder("我喜欢猫。").locale("zh_CN").build();
        let r = researcher_for(paper);
        assert_eq!(r.get_as::<usize>(WORD_COUNT).unwrap(), 4);
    }

    #[test]
    fn test_keyphrase_count_and_density() {
        let paper = Paper::builder("Black cats and white cats. Black Cats rule, kittens too.")
            .keyphrase("black cats")
            .synonyms(["kittens"])
            .build();
        let r = researcher_for(paper);
        let counts = r.get(KEYPHRASE_COUNT).unwrap();
        assert_eq!(counts["count"], 2);
        assert_eq!(counts["synonym_count"], 1);
        let density: f64 = r.get_as(KEYPHRASE_DENSITY).unwrap();
        assert!((density - 20.0).abs() < 1e-9);
    }

    #[test]
    fn test_lists() {
        let r = researcher_for(Paper::new("<ul><li>a</li></ul> <OL class=\"x\"><li>b</li></OL> <ulx>"));
        assert_eq!(r.get_as::<usize>(LISTS).unwrap(), 2);
    }
}
