//! 查询上下文：使用哪张分类表，以及面向用户的字段别名（租户自定义字段映射）
//! 如何解析。
//!
//! 别名解析可能需要I/O，因此在重写开始之前由 [`QueryContext::prepare`] 完成。
//! 加载的快照只发布一次，之后只读，上下文的克隆共享同一份快照。

use crate::classifier::{FieldClassifier, FieldEntry, Scope};
use crate::error::FilterError;
use once_cell::sync::OnceCell;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use tracing::debug;

pub type AliasMap = HashMap<String, String>;

/// 提供租户的别名映射，例如来自项目保存的自定义字段定义
pub trait FieldAliasSource: Send + Sync {
    fn load_aliases(&self) -> Result<AliasMap, FilterError>;
}

#[derive(Clone)]
pub struct QueryContext {
    classifier: Arc<FieldClassifier>,
    alias_source: Option<Arc<dyn FieldAliasSource>>,
    aliases: Arc<OnceCell<Arc<AliasMap>>>,
}

impl fmt::Debug for QueryContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QueryContext")
            .field("fields", &self.classifier.len())
            .field("has_alias_source", &self.alias_source.is_some())
            .field("aliases", &self.aliases.get().map(|a| a.len()))
            .finish()
    }
}

impl Default for QueryContext {
    fn default() -> Self {
        Self::new(FieldClassifier::shared())
    }
}

impl QueryContext {
    pub fn new(classifier: Arc<FieldClassifier>) -> Self {
        Self {
            classifier,
            alias_source: None,
            aliases: Arc::new(OnceCell::new()),
        }
    }

    /// 使用固定的别名表，不做任何加载
    pub fn with_aliases(mut self, aliases: AliasMap) -> Self {
        self.alias_source = None;
        self.aliases = Arc::new(OnceCell::with_value(Arc::new(aliases)));
        self
    }

    /// 在第一次 [`QueryContext::prepare`] 时从 `source` 加载别名
    pub fn with_alias_source(mut self, source: Arc<dyn FieldAliasSource>) -> Self {
        self.alias_source = Some(source);
        self.aliases = Arc::new(OnceCell::new());
        self
    }

    pub fn classifier(&self) -> &FieldClassifier {
        &self.classifier
    }

    /// 确保别名快照已加载。并发调用者等待同一次加载，加载失败时保持为空，
    /// 下次调用重试
    pub fn prepare(&self) -> Result<Arc<AliasMap>, FilterError> {
        self.aliases
            .get_or_try_init(|| {
                let aliases = match &self.alias_source {
                    Some(source) => source.load_aliases()?,
                    None => AliasMap::new(),
                };
                debug!(
                    target: "event_stack_filter::context",
                    count = aliases.len(),
                    "Loaded field aliases"
                );
                Ok::<_, FilterError>(Arc::new(aliases))
            })
            .cloned()
    }

    /// 通过已加载的别名快照解析面向用户的字段名
    pub fn resolve<'f>(&'f self, field: &'f str) -> &'f str {
        self.aliases
            .get()
            .and_then(|aliases| aliases.get(field))
            .map(String::as_str)
            .unwrap_or(field)
    }

    pub fn lookup(&self, field: &str) -> Option<&FieldEntry> {
        self.classifier.lookup(self.resolve(field))
    }

    /// 叶子字段的作用域，默认字段的词项属于事件属性
    pub fn scope_of(&self, field: Option<&str>) -> Scope {
        match field {
            Some(field) => self.classifier.classify(self.resolve(field)),
            None => Scope::EventAttribute,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::thread;

    struct CountingSource {
        calls: AtomicUsize,
    }

    impl FieldAliasSource for CountingSource {
        fn load_aliases(&self) -> Result<AliasMap, FilterError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(AliasMap::from([("state".to_string(), "status".to_string())]))
        }
    }

    struct FailingSource;

    impl FieldAliasSource for FailingSource {
        fn load_aliases(&self) -> Result<AliasMap, FilterError> {
            Err(FilterError::AliasSource("tenant store unavailable".to_string()))
        }
    }

    #[test]
    fn test_default_context_has_no_aliases() {
        let ctx = QueryContext::default();
        assert!(ctx.prepare().unwrap().is_empty());
        assert_eq!(ctx.resolve("status"), "status");
        assert_eq!(ctx.scope_of(Some("status")), Scope::StackAttribute);
        assert_eq!(ctx.scope_of(None), Scope::EventAttribute);
    }

    #[test]
    fn test_alias_resolves_to_known_field() {
        let ctx = QueryContext::default()
            .with_aliases(AliasMap::from([("state".to_string(), "status".to_string())]));
        assert_eq!(ctx.resolve("state"), "status");
        assert_eq!(ctx.scope_of(Some("state")), Scope::StackAttribute);
        assert_eq!(ctx.lookup("state").unwrap().store_field, "status");
    }

    #[test]
    fn test_aliases_unresolved_before_prepare() {
        let source = Arc::new(CountingSource {
            calls: AtomicUsize::new(0),
        });
        let ctx = QueryContext::default().with_alias_source(source);
        assert_eq!(ctx.scope_of(Some("state")), Scope::EventAttribute);
        ctx.prepare().unwrap();
        assert_eq!(ctx.scope_of(Some("state")), Scope::StackAttribute);
    }

    #[test]
    fn test_concurrent_prepare_publishes_one_snapshot() {
        let source = Arc::new(CountingSource {
            calls: AtomicUsize::new(0),
        });
        let ctx = QueryContext::default().with_alias_source(source.clone());

        let snapshots: Vec<Arc<AliasMap>> = thread::scope(|scope| {
            let handles: Vec<_> = (0..8)
                .map(|_| {
                    let ctx = ctx.clone();
                    scope.spawn(move || ctx.prepare().unwrap())
                })
                .collect();
            handles.into_iter().map(|h| h.join().unwrap()).collect()
        });

        for snapshot in &snapshots {
            assert!(Arc::ptr_eq(snapshot, &snapshots[0]));
        }
        ctx.prepare().unwrap();
        assert_eq!(source.calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_failed_load_is_reported_and_retried_next_time() {
        let ctx = QueryContext::default().with_alias_source(Arc::new(FailingSource));
        assert!(matches!(ctx.prepare(), Err(FilterError::AliasSource(_))));
        assert!(matches!(ctx.prepare(), Err(FilterError::AliasSource(_))));
    }
}
