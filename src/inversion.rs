//! 过滤条件的结构化取反：“哪些栈一定不匹配”
//!
//! 过滤条件可以拆成开头连续的纯租户合取项（前缀）和完全不涉及租户字段的剩余
//! 部分时，才可以取反。取反结果保留前缀，并对剩余部分的栈级重写取反：
//! `prefix AND NOT rewrite(remainder)`。根部的括号不影响拆分。

use crate::ast::Node;
use crate::classifier::Scope;
use crate::context::QueryContext;
use crate::rewriter::Rewriter;
use tracing::debug;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Inversion {
    Invertible(Node),
    NotInvertible,
}

impl Inversion {
    pub fn is_invertible(&self) -> bool {
        matches!(self, Inversion::Invertible(_))
    }

    pub fn into_node(self) -> Option<Node> {
        match self {
            Inversion::Invertible(node) => Some(node),
            Inversion::NotInvertible => None,
        }
    }
}

pub struct InversionAnalyzer<'c> {
    ctx: &'c QueryContext,
}

impl<'c> InversionAnalyzer<'c> {
    pub fn new(ctx: &'c QueryContext) -> Self {
        Self { ctx }
    }

    pub fn invert(&self, node: &Node) -> Inversion {
        let mut root = node;
        while let Node::Group(inner) = root {
            root = inner.as_ref();
        }

        let clauses = match root {
            Node::And(children) => children.as_slice(),
            other => std::slice::from_ref(other),
        };

        let split = clauses
            .iter()
            .position(|clause| !self.is_tenant_clause(clause))
            .unwrap_or(clauses.len());
        let (prefix, remainder) = clauses.split_at(split);

        if remainder.iter().any(|clause| self.mentions_tenant(clause)) {
            debug!(
                target: "event_stack_filter::invert",
                prefix_len = prefix.len(),
                "租户字段出现在前缀之外，过滤条件不可取反"
            );
            return Inversion::NotInvertible;
        }

        let rewriter = Rewriter::new(self.ctx);
        let reduced = match remainder {
            [] => Node::MatchAll,
            [single] => rewriter.rewrite(single),
            many => rewriter.rewrite(&Node::And(many.to_vec())),
        };

        let mut members = prefix.to_vec();
        members.push(Node::negate(reduced));
        Inversion::Invertible(Node::and(members))
    }

    /// 只由 `AND` 和括号连接的租户叶子
    fn is_tenant_clause(&self, node: &Node) -> bool {
        match node {
            Node::Term(_) | Node::Phrase(_) | Node::Range(_) => self.is_tenant_leaf(node),
            Node::Group(child) => self.is_tenant_clause(child),
            Node::And(children) => children.iter().all(|c| self.is_tenant_clause(c)),
            Node::Not(_) | Node::Or(_) | Node::MatchAll | Node::MatchNone => false,
        }
    }

    fn mentions_tenant(&self, node: &Node) -> bool {
        node.any_leaf(&mut |leaf| self.is_tenant_leaf(leaf))
    }

    fn is_tenant_leaf(&self, leaf: &Node) -> bool {
        self.ctx.scope_of(leaf.field()) == Scope::Tenant
    }
}
