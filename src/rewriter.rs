//! 三值重写：把过滤条件改写为栈存储能够独立求值的形式
//!
//! 事件级叶子无法由栈文档判定，归约为 [`Reduction::Uncertain`]。不确定值是 `AND`
//! 的单位元、`OR` 的吸收元，取反后仍然不确定。重写结果永远不会排除可能包含
//! 匹配事件的栈。

use crate::ast::Node;
use crate::context::QueryContext;
use tracing::trace;

/// 子树的归约结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reduction {
    /// 只用租户字段和栈字段即可表达（包括哨兵）
    Decided(Node),
    /// 真值取决于事件级数据
    Uncertain,
}

impl Reduction {
    /// 解析顶层归约结果：不确定的过滤条件放行所有栈
    pub fn resolve(self) -> Node {
        match self {
            Reduction::Decided(node) => node,
            Reduction::Uncertain => Node::MatchAll,
        }
    }

    pub fn is_uncertain(&self) -> bool {
        matches!(self, Reduction::Uncertain)
    }
}

pub struct Rewriter<'c> {
    ctx: &'c QueryContext,
}

impl<'c> Rewriter<'c> {
    pub fn new(ctx: &'c QueryContext) -> Self {
        Self { ctx }
    }

    /// 把 `node` 改写为栈级别的上近似
    pub fn rewrite(&self, node: &Node) -> Node {
        self.reduce(node).resolve()
    }

    pub fn reduce(&self, node: &Node) -> Reduction {
        match node {
            Node::Term(_) | Node::Phrase(_) | Node::Range(_) => {
                if self.ctx.scope_of(node.field()).is_decidable() {
                    Reduction::Decided(node.clone())
                } else {
                    trace!(
                        target: "event_stack_filter::rewrite",
                        field = node.field().unwrap_or("<default>"),
                        "忽略事件级叶子"
                    );
                    Reduction::Uncertain
                }
            }
            Node::Not(child) => match self.reduce(child) {
                Reduction::Decided(inner) => Reduction::Decided(Node::negate(inner)),
                Reduction::Uncertain => Reduction::Uncertain,
            },
            Node::And(children) => {
                let decided = children
                    .iter()
                    .filter_map(|child| match self.reduce(child) {
                        Reduction::Decided(inner) => Some(inner),
                        Reduction::Uncertain => None,
                    })
                    .collect();
                Reduction::Decided(Node::and(decided))
            }
            Node::Or(children) => {
                let mut decided = Vec::with_capacity(children.len());
                for child in children {
                    match self.reduce(child) {
                        Reduction::Decided(inner) => decided.push(inner),
                        Reduction::Uncertain => return Reduction::Uncertain,
                    }
                }
                Reduction::Decided(Node::or(decided))
            }
            Node::Group(child) => match self.reduce(child) {
                Reduction::Decided(inner @ (Node::And(_) | Node::Or(_))) => {
                    Reduction::Decided(Node::group(inner))
                }
                other => other,
            },
            Node::MatchAll | Node::MatchNone => Reduction::Decided(node.clone()),
        }
    }

    /// 把每个已知叶子的字段名换成栈存储中的索引字段名
    pub fn to_store_fields(&self, node: &Node) -> Node {
        match node {
            Node::Term(_) | Node::Phrase(_) | Node::Range(_) => {
                match node.field().and_then(|field| self.ctx.lookup(field)) {
                    Some(entry) => node.with_field(&entry.store_field),
                    None => node.clone(),
                }
            }
            Node::Not(child) => Node::Not(Box::new(self.to_store_fields(child))),
            Node::Group(child) => Node::Group(Box::new(self.to_store_fields(child))),
            Node::And(children) => {
                Node::And(children.iter().map(|c| self.to_store_fields(c)).collect())
            }
            Node::Or(children) => {
                Node::Or(children.iter().map(|c| self.to_store_fields(c)).collect())
            }
            Node::MatchAll | Node::MatchNone => node.clone(),
        }
    }
}
