//! 字段作用域分类
//!
//! 按字段名判断栈存储能否对该字段上的谓词求值。分类表中不存在的字段一律视为
//! 事件属性，未知字段永远不可判定。

use crate::config::{FieldSpec, FilterConfig};
use crate::error::ConfigError;
use std::collections::HashMap;
use std::sync::{Arc, LazyLock};

static DEFAULT_CLASSIFIER: LazyLock<Arc<FieldClassifier>> = LazyLock::new(|| {
    Arc::new(
        FieldClassifier::from_config(&FilterConfig::default())
            .expect("内置字段表不含重复字段"),
    )
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Scope {
    /// 身份与分区字段（organization、project、stack）
    Tenant,
    /// 直接存储在栈文档上的字段
    StackAttribute,
    /// 只在单个事件上存在，栈存储无法求值
    EventAttribute,
}

impl Scope {
    pub fn is_decidable(self) -> bool {
        !matches!(self, Scope::EventAttribute)
    }
}

/// 已知字段的分类结果，同一字段的所有别名指向同一个条目
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldEntry {
    pub scope: Scope,
    pub canonical: String,
    pub store_field: String,
}

/// 字段名（规范名或别名）到条目的只读查找表
#[derive(Debug, Clone, Default)]
pub struct FieldClassifier {
    entries: HashMap<String, Arc<FieldEntry>>,
}

impl FieldClassifier {
    pub fn from_config(config: &FilterConfig) -> Result<Self, ConfigError> {
        let mut classifier = FieldClassifier::default();
        for spec in &config.tenant_fields {
            classifier.insert(spec, Scope::Tenant)?;
        }
        for spec in &config.stack_fields {
            classifier.insert(spec, Scope::StackAttribute)?;
        }
        Ok(classifier)
    }

    /// 由 [`FilterConfig::default`] 构建的进程级共享表
    pub fn shared() -> Arc<FieldClassifier> {
        Arc::clone(&DEFAULT_CLASSIFIER)
    }

    fn insert(&mut self, spec: &FieldSpec, scope: Scope) -> Result<(), ConfigError> {
        let entry = Arc::new(FieldEntry {
            scope,
            canonical: spec.name.clone(),
            store_field: spec.store_field().to_string(),
        });
        for name in std::iter::once(&spec.name).chain(&spec.aliases) {
            if self.entries.insert(name.clone(), Arc::clone(&entry)).is_some() {
                return Err(ConfigError::DuplicateField(name.clone()));
            }
        }
        Ok(())
    }

    pub fn classify(&self, field: &str) -> Scope {
        self.lookup(field)
            .map(|entry| entry.scope)
            .unwrap_or(Scope::EventAttribute)
    }

    pub fn lookup(&self, field: &str) -> Option<&FieldEntry> {
        self.entries.get(field).map(Arc::as_ref)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_scopes() {
        let classifier = FieldClassifier::shared();
        assert_eq!(classifier.classify("organization"), Scope::Tenant);
        assert_eq!(classifier.classify("project_id"), Scope::Tenant);
        assert_eq!(classifier.classify("stack"), Scope::Tenant);
        assert_eq!(classifier.classify("status"), Scope::StackAttribute);
        assert_eq!(classifier.classify("type"), Scope::EventAttribute);
        assert_eq!(classifier.classify("ref.session"), Scope::EventAttribute);
    }

    #[test]
    fn test_unknown_and_differently_cased_fields_are_event_attributes() {
        let classifier = FieldClassifier::shared();
        assert_eq!(classifier.classify("no_such_field"), Scope::EventAttribute);
        assert_eq!(classifier.classify("Status"), Scope::EventAttribute);
        assert_eq!(classifier.classify(""), Scope::EventAttribute);
        assert!(!Scope::EventAttribute.is_decidable());
    }

    #[test]
    fn test_aliases_share_identity() {
        let classifier = FieldClassifier::shared();
        let stack = classifier.lookup("stack").unwrap();
        let stack_id = classifier.lookup("stack_id").unwrap();
        assert_eq!(stack, stack_id);
        assert_eq!(stack_id.canonical, "stack");
        assert_eq!(stack_id.store_field, "id");

        assert_eq!(classifier.lookup("first").unwrap().canonical, "first_occurrence");
    }

    #[test]
    fn test_duplicate_field_is_rejected() {
        let config = FilterConfig {
            tenant_fields: vec![FieldSpec {
                name: "project".to_string(),
                aliases: vec![],
                store_field: None,
            }],
            stack_fields: vec![FieldSpec {
                name: "status".to_string(),
                aliases: vec!["project".to_string()],
                store_field: None,
            }],
            ..FilterConfig::default()
        };
        let err = FieldClassifier::from_config(&config).unwrap_err();
        assert!(matches!(err, ConfigError::DuplicateField(name) if name == "project"));
    }

    #[test]
    fn test_shared_table_is_one_instance() {
        assert!(Arc::ptr_eq(&FieldClassifier::shared(), &FieldClassifier::shared()));
    }
}
