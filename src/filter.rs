//! 事件感知的栈过滤入口，串联解析、重写、取反和渲染

use crate::classifier::FieldClassifier;
use crate::config::FilterConfig;
use crate::context::QueryContext;
use crate::error::{ConfigError, FilterError};
use crate::inversion::{Inversion, InversionAnalyzer};
use crate::parser;
use crate::render::Renderer;
use crate::rewriter::Rewriter;
use std::sync::Arc;
use tracing::{debug, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterQueryMode {
    /// 可能包含匹配事件的栈
    Stacks,
    /// 一定不包含匹配事件的栈
    InvertedStacks,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterResult {
    /// 交给栈存储的过滤文本，请求取反但无法取反时为空
    pub query: String,
    /// 原始过滤条件能否可靠地取反
    pub is_invertable: bool,
    pub mode: FilterQueryMode,
}

impl FilterResult {
    /// 可执行的查询，不可执行时返回 `None`
    pub fn executable_query(&self) -> Option<&str> {
        match self.mode {
            FilterQueryMode::InvertedStacks if !self.is_invertable => None,
            _ => Some(self.query.as_str()),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct EventStackFilter {
    ctx: QueryContext,
    renderer: Renderer,
}

impl EventStackFilter {
    pub fn new(ctx: QueryContext) -> Self {
        Self {
            ctx,
            renderer: Renderer::default(),
        }
    }

    pub fn from_config(config: &FilterConfig) -> Result<Self, ConfigError> {
        let classifier = FieldClassifier::from_config(config)?;
        Ok(Self {
            ctx: QueryContext::new(Arc::new(classifier)),
            renderer: Renderer::from_config(config),
        })
    }

    /// 按请求的模式为栈存储改写 `filter`
    pub fn run(&self, filter: &str, mode: FilterQueryMode) -> Result<FilterResult, FilterError> {
        self.ctx.prepare()?;

        let tree = parser::parse(filter).inspect_err(|err| {
            warn!(target: "event_stack_filter::parse", filter, %err, "过滤条件语法错误");
        })?;

        let rewriter = Rewriter::new(&self.ctx);
        let inversion = InversionAnalyzer::new(&self.ctx).invert(&tree);
        let is_invertable = inversion.is_invertible();

        let query = match (mode, inversion) {
            (FilterQueryMode::Stacks, _) => {
                let rewritten = rewriter.rewrite(&tree);
                self.renderer.render(&rewriter.to_store_fields(&rewritten))
            }
            (FilterQueryMode::InvertedStacks, Inversion::Invertible(inverted)) => {
                self.renderer.render(&rewriter.to_store_fields(&inverted))
            }
            (FilterQueryMode::InvertedStacks, Inversion::NotInvertible) => String::new(),
        };

        debug!(
            target: "event_stack_filter::rewrite",
            filter,
            ?mode,
            query = query.as_str(),
            is_invertable,
            "事件过滤条件已改写"
        );

        Ok(FilterResult {
            query,
            is_invertable,
            mode,
        })
    }
}
