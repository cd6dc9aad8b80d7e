//! 把表达式树渲染回栈存储使用的查询文本
//!
//! 括号由优先级决定而不是照搬输入：`AND` 或 `NOT` 下的 `OR`，以及 `NOT` 下的
//! `AND`，总是加括号。显式分组按原样输出。

use crate::ast::{Inclusivity, Node};
use crate::config::FilterConfig;

/// 裸词中必须转义的字符
const SPECIAL: &[char] = &['\\', '(', ')', '[', ']', '{', '}', ':', '"'];
/// 出现在裸词开头时有特殊含义的字符
const LEADING_SPECIAL: &[char] = &['-', '+', '!', '<', '>'];
const KEYWORDS: &[&str] = &["AND", "OR", "NOT", "TO", "&&", "||"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Renderer {
    match_all: String,
    match_none: String,
}

impl Default for Renderer {
    fn default() -> Self {
        Self::from_config(&FilterConfig::default())
    }
}

/// 使用默认哨兵文本渲染
pub fn render(node: &Node) -> String {
    Renderer::default().render(node)
}

impl Renderer {
    pub fn new(match_all: impl Into<String>, match_none: impl Into<String>) -> Self {
        Self {
            match_all: match_all.into(),
            match_none: match_none.into(),
        }
    }

    pub fn from_config(config: &FilterConfig) -> Self {
        Self::new(&config.match_all_token, &config.match_none_token)
    }

    pub fn render(&self, node: &Node) -> String {
        let mut out = String::new();
        self.write_node(node, &mut out);
        out
    }

    fn write_node(&self, node: &Node, out: &mut String) {
        match node {
            Node::Term(term) => {
                write_field(term.field.as_deref(), out);
                write_word(&term.value, out);
            }
            Node::Phrase(phrase) => {
                write_field(phrase.field.as_deref(), out);
                write_phrase(&phrase.phrase, out);
            }
            Node::Range(range) => {
                write_field(Some(&range.field), out);
                let Inclusivity { low, high } = range.inclusivity;
                out.push(if low { '[' } else { '{' });
                write_word(&range.low, out);
                out.push_str(" TO ");
                write_word(&range.high, out);
                out.push(if high { ']' } else { '}' });
            }
            Node::Not(child) => {
                out.push_str("NOT ");
                let wrap = matches!(child.as_ref(), Node::And(_) | Node::Or(_));
                self.write_child(child, wrap, out);
            }
            Node::And(children) if children.is_empty() => out.push_str(&self.match_all),
            Node::And(children) => {
                for (i, child) in children.iter().enumerate() {
                    if i > 0 {
                        out.push_str(" AND ");
                    }
                    self.write_child(child, matches!(child, Node::Or(_)), out);
                }
            }
            Node::Or(children) if children.is_empty() => out.push_str(&self.match_none),
            Node::Or(children) => {
                for (i, child) in children.iter().enumerate() {
                    if i > 0 {
                        out.push_str(" OR ");
                    }
                    self.write_node(child, out);
                }
            }
            Node::Group(child) => self.write_child(child, true, out),
            Node::MatchAll => out.push_str(&self.match_all),
            Node::MatchNone => out.push_str(&self.match_none),
        }
    }

    fn write_child(&self, child: &Node, wrap: bool, out: &mut String) {
        if wrap {
            out.push('(');
            self.write_node(child, out);
            out.push(')');
        } else {
            self.write_node(child, out);
        }
    }
}

fn write_field(field: Option<&str>, out: &mut String) {
    if let Some(field) = field {
        write_word(field, out);
        out.push(':');
    }
}

/// 写出 `word`，保证重新分词后仍是值相同的单个词
fn write_word(word: &str, out: &mut String) {
    if word.is_empty() {
        out.push_str("\"\"");
        return;
    }
    if KEYWORDS.contains(&word) {
        out.push('\\');
    }
    for (i, c) in word.chars().enumerate() {
        if c.is_whitespace() || SPECIAL.contains(&c) || (i == 0 && LEADING_SPECIAL.contains(&c)) {
            out.push('\\');
        }
        out.push(c);
    }
}

fn write_phrase(phrase: &str, out: &mut String) {
    out.push('"');
    for c in phrase.chars() {
        if c == '"' || c == '\\' {
            out.push('\\');
        }
        out.push(c);
    }
    out.push('"');
}
