//! Redis 风格 glob 模式匹配
//!
//! 支持 `*`、`?`、`[abc]`、`[^a]`、`[a-z]` 以及 `\` 转义，
//! 与服务端 `SCAN MATCH` 的语义保持一致。

use regex::Regex;

use crate::errors::CacheError;

/// 编译后的 glob 模式
#[derive(Debug, Clone)]
pub struct GlobPattern {
    regex: Regex,
}

impl GlobPattern {
    pub fn new(pattern: &str) -> Result<Self, CacheError> {
        let regex = Regex::new(&glob_to_regex(pattern))
            .map_err(|e| CacheError::Internal(format!("Invalid key pattern {}: {}", pattern, e)))?;
        Ok(Self { regex })
    }

    pub fn matches(&self, key: &str) -> bool {
        self.regex.is_match(key)
    }
}

/// 转义 glob 元字符，使其按字面量匹配
pub fn escape(literal: &str) -> String {
    let mut out = String::with_capacity(literal.len());
    for c in literal.chars() {
        if matches!(c, '*' | '?' | '[' | ']' | '\\') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

fn glob_to_regex(pattern: &str) -> String {
    let chars: Vec<char> = pattern.chars().collect();
    let mut out = String::from("(?s)^");
    let mut i = 0;

    while i < chars.len() {
        match chars[i] {
            '*' => out.push_str(".*"),
            '?' => out.push('.'),
            '\\' if i + 1 < chars.len() => {
                i += 1;
                push_literal(&mut out, chars[i]);
            }
            '[' => match class_end(&chars, i) {
                Some(end) => {
                    push_class(&mut out, &chars[i + 1..end]);
                    i = end;
                }
                // 未闭合的 '[' 按字面量处理
                None => push_literal(&mut out, '['),
            },
            c => push_literal(&mut out, c),
        }
        i += 1;
    }

    out.push('$');
    out
}

/// 查找与 `start` 处 '[' 配对的 ']'
fn class_end(chars: &[char], start: usize) -> Option<usize> {
    let mut i = start + 1;
    while i < chars.len() {
        match chars[i] {
            '\\' => i += 2,
            ']' => return Some(i),
            _ => i += 1,
        }
    }
    None
}

fn push_class(out: &mut String, body: &[char]) {
    let (negated, body) = match body.split_first() {
        Some(('^', rest)) => (true, rest),
        _ => (false, body),
    };

    // 先展开转义，记录每个字符是否来自转义
    let mut items = Vec::with_capacity(body.len());
    let mut i = 0;
    while i < body.len() {
        if body[i] == '\\' && i + 1 < body.len() {
            i += 1;
            items.push((body[i], true));
        } else {
            items.push((body[i], false));
        }
        i += 1;
    }

    // 空字符类（`[]`、`[^]`）不匹配任何字符
    if items.is_empty() {
        out.push_str(r"[^\s\S]");
        return;
    }

    out.push('[');
    if negated {
        out.push('^');
    }
    let mut i = 0;
    while i < items.len() {
        let (start, _) = items[i];
        if i + 2 < items.len() && items[i + 1] == ('-', false) {
            // 反向区间 `[z-a]` 等价于 `[a-z]`
            let end = items[i + 2].0;
            let (low, high) = if start <= end { (start, end) } else { (end, start) };
            push_class_literal(out, low);
            out.push('-');
            push_class_literal(out, high);
            i += 3;
        } else {
            push_class_literal(out, start);
            i += 1;
        }
    }
    out.push(']');
}

fn push_literal(out: &mut String, c: char) {
    let mut buf = [0u8; 4];
    out.push_str(&regex::escape(c.encode_utf8(&mut buf)));
}

fn push_class_literal(out: &mut String, c: char) {
    if matches!(c, '\\' | ']' | '[' | '^' | '-' | '&' | '~') {
        out.push('\\');
    }
    out.push(c);
}
