//! 过滤查询语言的表达式树
//!
//! 树从不原地修改。每一遍处理（`reduce`、`invert`、`render`）都只读取输入树并
//! 构造新树，因此解析一次得到的树可以分别交给栈重写和取反分析使用。

/// 解析后的过滤表达式节点
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Node {
    /// `field:value`，或针对默认字段的裸 `value`
    Term(Term),
    /// `field:"some phrase"`
    Phrase(PhraseTerm),
    /// `field:[low TO high]` 及其开区间形式
    Range(RangeTerm),
    Not(Box<Node>),
    And(Vec<Node>),
    Or(Vec<Node>),
    /// 输入中显式书写的括号
    Group(Box<Node>),
    MatchAll,
    MatchNone,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Term {
    pub field: Option<String>,
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PhraseTerm {
    pub field: Option<String>,
    pub phrase: String,
}

/// 无界的范围端点
pub const UNBOUNDED: &str = "*";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RangeTerm {
    pub field: String,
    pub low: String,
    pub high: String,
    pub inclusivity: Inclusivity,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Inclusivity {
    pub low: bool,
    pub high: bool,
}

impl Inclusivity {
    pub const INCLUSIVE: Inclusivity = Inclusivity { low: true, high: true };
    pub const EXCLUSIVE: Inclusivity = Inclusivity { low: false, high: false };
}

impl Node {
    pub fn term(field: &str, value: &str) -> Node {
        Node::Term(Term {
            field: Some(field.to_string()),
            value: value.to_string(),
        })
    }

    pub fn phrase(field: &str, phrase: &str) -> Node {
        Node::Phrase(PhraseTerm {
            field: Some(field.to_string()),
            phrase: phrase.to_string(),
        })
    }

    pub fn range(field: &str, low: &str, high: &str, inclusivity: Inclusivity) -> Node {
        Node::Range(RangeTerm {
            field: field.to_string(),
            low: low.to_string(),
            high: high.to_string(),
            inclusivity,
        })
    }

    pub fn group(child: Node) -> Node {
        Node::Group(Box::new(child))
    }

    /// 应用恒等式的合取：`MatchAll` 成员被丢弃，`MatchNone` 吸收全部，
    /// 只剩一个成员时返回该成员本身
    pub fn and(children: Vec<Node>) -> Node {
        let mut kept = Vec::with_capacity(children.len());
        for child in children {
            match child {
                Node::MatchAll => {}
                Node::MatchNone => return Node::MatchNone,
                other => kept.push(other),
            }
        }
        match kept.len() {
            0 => Node::MatchAll,
            1 => kept.remove(0),
            _ => Node::And(kept),
        }
    }

    /// 析取，[`Node::and`] 的对偶
    pub fn or(children: Vec<Node>) -> Node {
        let mut kept = Vec::with_capacity(children.len());
        for child in children {
            match child {
                Node::MatchNone => {}
                Node::MatchAll => return Node::MatchAll,
                other => kept.push(other),
            }
        }
        match kept.len() {
            0 => Node::MatchNone,
            1 => kept.remove(0),
            _ => Node::Or(kept),
        }
    }

    /// 取反：哨兵互换，消除双重否定
    pub fn negate(child: Node) -> Node {
        match child {
            Node::MatchAll => Node::MatchNone,
            Node::MatchNone => Node::MatchAll,
            Node::Not(inner) => *inner,
            other => Node::Not(Box::new(other)),
        }
    }

    /// 叶子节点的字段名。组合节点、哨兵和默认字段的词项返回 `None`
    pub fn field(&self) -> Option<&str> {
        match self {
            Node::Term(t) => t.field.as_deref(),
            Node::Phrase(p) => p.field.as_deref(),
            Node::Range(r) => Some(&r.field),
            _ => None,
        }
    }

    /// 返回指向另一个字段的叶子副本，非叶子节点原样返回
    pub fn with_field(&self, field: &str) -> Node {
        match self {
            Node::Term(t) => Node::Term(Term {
                field: Some(field.to_string()),
                value: t.value.clone(),
            }),
            Node::Phrase(p) => Node::Phrase(PhraseTerm {
                field: Some(field.to_string()),
                phrase: p.phrase.clone(),
            }),
            Node::Range(r) => Node::Range(RangeTerm {
                field: field.to_string(),
                ..r.clone()
            }),
            other => other.clone(),
        }
    }

    /// 树中至少有一个叶子满足 `predicate` 时返回 true
    pub fn any_leaf(&self, predicate: &mut dyn FnMut(&Node) -> bool) -> bool {
        match self {
            Node::Term(_) | Node::Phrase(_) | Node::Range(_) => predicate(self),
            Node::Not(child) | Node::Group(child) => child.any_leaf(predicate),
            Node::And(children) | Node::Or(children) => {
                children.iter().any(|c| c.any_leaf(predicate))
            }
            Node::MatchAll | Node::MatchNone => false,
        }
    }
}
