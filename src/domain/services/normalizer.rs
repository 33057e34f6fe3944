// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

//! 注册号与公司名称的规范化，以及名称相似度计算

/// 注册号数字长度下限（规范长度为10，前后各放宽2位）
pub const REGISTRY_ID_MIN_DIGITS: usize = 8;
/// 注册号数字长度上限
pub const REGISTRY_ID_MAX_DIGITS: usize = 12;

/// 名称开头的法律形式词
const LEGAL_FORM_PREFIXES: &[&str] = &[
    "aktiebolaget",
    "handelsbolaget",
    "kommanditbolaget",
    "stiftelsen",
];

/// 名称结尾的法律形式词
const LEGAL_FORM_SUFFIXES: &[&str] = &[
    "aktiebolag",
    "ab",
    "publ",
    "handelsbolag",
    "hb",
    "kommanditbolag",
    "kb",
    "inc",
    "ltd",
    "llc",
    "gmbh",
    "corp",
];

/// 注册号规范化：只保留数字
pub fn normalize_registry_id(raw: &str) -> String {
    raw.chars().filter(|c| c.is_ascii_digit()).collect()
}

/// 用于精确匹配的注册号键
///
/// 只有数字位数在 8-12 之间时才返回。
pub fn registry_key(raw: &str) -> Option<String> {
    let digits = normalize_registry_id(raw);
    (REGISTRY_ID_MIN_DIGITS..=REGISTRY_ID_MAX_DIGITS)
        .contains(&digits.len())
        .then_some(digits)
}

/// 将10位数字格式化为 `NNNNNN-NNNN`
pub fn format_registry_id(raw: &str) -> Option<String> {
    let digits = normalize_registry_id(raw);
    if digits.len() != 10 {
        return None;
    }
    Some(format!("{}-{}", &digits[..6], &digits[6..]))
}

/// 公司名称规范化
///
/// 转小写，去掉标点，去掉开头和结尾的法律形式词，合并空白。
/// 如果名称只剩法律形式词本身，则保留该词。
pub fn normalize_company_name(raw: &str) -> String {
    let cleaned: String = raw
        .to_lowercase()
        .chars()
        .filter(|c| *c != '.')
        .map(|c| match c {
            ',' | '(' | ')' | '"' | ';' | ':' => ' ',
            other => other,
        })
        .collect();

    let mut tokens: Vec<&str> = cleaned.split_whitespace().collect();

    while tokens.len() > 1 && LEGAL_FORM_PREFIXES.contains(&tokens[0]) {
        tokens.remove(0);
    }
    while tokens.len() > 1 && tokens.last().is_some_and(|t| LEGAL_FORM_SUFFIXES.contains(t)) {
        tokens.pop();
    }

    tokens.join(" ")
}

/// 字符串相似度：1 - 编辑距离 / 较长字符串长度
///
/// 长度按Unicode字符计。两个字符串都为空时返回0。
pub fn similarity(a: &str, b: &str) -> f64 {
    let max_len = a.chars().count().max(b.chars().count());
    if max_len == 0 {
        return 0.0;
    }
    let distance = strsim::levenshtein(a, b);
    1.0 - distance as f64 / max_len as f64
}

/// 先规范化名称再计算相似度
pub fn name_similarity(a: &str, b: &str) -> f64 {
    similarity(&normalize_company_name(a), &normalize_company_name(b))
}
