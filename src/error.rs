use std::path::PathBuf;
use thiserror::Error;

/// 过滤文本格式错误，查询无法执行
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}（位置 {offset}）")]
pub struct SyntaxError {
    /// 出错Token的字节偏移，输入结束时为输入长度
    pub offset: usize,
    /// 语法分析器在 `offset` 处可以接受的内容
    pub expected: Vec<&'static str>,
    pub message: String,
}

impl SyntaxError {
    pub(crate) fn new(offset: usize, expected: &[&'static str], found: &str) -> Self {
        Self {
            offset,
            expected: expected.to_vec(),
            message: format!("期望 {}，实际遇到 {}", expected.join(" 或 "), found),
        }
    }
}

/// 加载字段分类配置时的错误
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("配置文件不存在: {0}")]
    Missing(PathBuf),

    #[error("读取配置文件 {path} 失败: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("解析配置失败: {0}")]
    Json(#[from] serde_json::Error),

    #[error("字段 '{0}' 重复声明")]
    DuplicateField(String),
}

/// [`crate::EventStackFilter::run`] 返回的错误
#[derive(Debug, Error)]
pub enum FilterError {
    #[error("无效的过滤条件: {0}")]
    Syntax(#[from] SyntaxError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("字段别名加载失败: {0}")]
    AliasSource(String),
}
