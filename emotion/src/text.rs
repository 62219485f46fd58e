use once_cell::sync::Lazy;
use regex::Regex;

static TAG_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"<\|[^|]+\|>").unwrap());
static LABEL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(情绪识别结果|情绪分析结果|主要情绪|各情绪类别概率):\s*").unwrap());

/// Strips `<|tag|>` tokens and redundant result labels from model text.
pub fn clean_multimodal_text(text: &str) -> String {
    let text = TAG_RE.replace_all(text, "");
    let text = LABEL_RE.replace_all(&text, "");
    text.trim().to_string()
}
