//! 配置模块，负责从JSON加载字段分类表
//!
//! ```json
//! {
//!   "tenant_fields": [
//!     { "name": "stack", "aliases": ["stack_id"], "store_field": "id" }
//!   ],
//!   "stack_fields": [
//!     { "name": "status" }
//!   ],
//!   "match_all_token": "*:*",
//!   "match_none_token": "-*:*"
//! }
//! ```

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// 一个已分类的字段及其别名
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldSpec {
    /// 规范名称
    pub name: String,
    #[serde(default)]
    pub aliases: Vec<String>,
    /// 栈存储中的字段名，缺省时使用规范名称
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub store_field: Option<String>,
}

impl FieldSpec {
    fn new(name: &str, aliases: &[&str], store_field: Option<&str>) -> Self {
        Self {
            name: name.to_string(),
            aliases: aliases.iter().map(|a| a.to_string()).collect(),
            store_field: store_field.map(str::to_string),
        }
    }

    pub fn store_field(&self) -> &str {
        self.store_field.as_deref().unwrap_or(&self.name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterConfig {
    /// 身份与分区字段
    #[serde(default)]
    pub tenant_fields: Vec<FieldSpec>,
    /// 直接存储在栈文档上的字段
    #[serde(default)]
    pub stack_fields: Vec<FieldSpec>,
    #[serde(default = "default_match_all_token")]
    pub match_all_token: String,
    #[serde(default = "default_match_none_token")]
    pub match_none_token: String,
}

fn default_match_all_token() -> String {
    "*:*".to_string()
}

fn default_match_none_token() -> String {
    "-*:*".to_string()
}

impl FilterConfig {
    /// 从JSON文件加载字段分类配置
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path_ref = path.as_ref();

        // 检查文件是否存在
        if !path_ref.exists() {
            return Err(ConfigError::Missing(path_ref.to_path_buf()));
        }

        // 读取文件内容
        let content = fs::read_to_string(path_ref).map_err(|source| ConfigError::Io {
            path: path_ref.to_path_buf(),
            source,
        })?;

        Self::from_json_str(&content)
    }

    pub fn from_json_str(content: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(content)?)
    }
}

/// 内置的字段分类表
impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            tenant_fields: vec![
                FieldSpec::new("organization", &["organization_id"], Some("organization_id")),
                FieldSpec::new("project", &["project_id"], Some("project_id")),
                FieldSpec::new("stack", &["stack_id"], Some("id")),
            ],
            stack_fields: vec![
                FieldSpec::new("status", &[], None),
                FieldSpec::new("first_occurrence", &["first"], None),
                FieldSpec::new("last_occurrence", &["last"], None),
                FieldSpec::new("total_occurrences", &["occurrences"], None),
                FieldSpec::new("fixed_in_version", &["fixedin"], None),
                FieldSpec::new("date_fixed", &["fixed"], None),
                FieldSpec::new("title", &[], None),
                FieldSpec::new("signature_hash", &["signature"], None),
            ],
            match_all_token: default_match_all_token(),
            match_none_token: default_match_none_token(),
        }
    }
}
