//! 把事件过滤条件改写为栈存储可以独立执行的过滤条件
//!
//! 像 `stack:abc (status:open OR type:error)` 这样的过滤条件可能引用只存在于单个
//! 事件上的字段，栈存储无法对其求值。因此过滤条件被改写为只涉及栈字段的超集查询；
//! 在结构允许时，还会得到精确的取反查询，用于找出一定不匹配的栈。
//!
//! ```
//! use event_stack_filter::{EventStackFilter, FilterQueryMode};
//!
//! let filter = EventStackFilter::default();
//! let result = filter
//!     .run("status:open OR status:regressed", FilterQueryMode::InvertedStacks)
//!     .unwrap();
//! assert!(result.is_invertable);
//! assert_eq!(result.query, "NOT (status:open OR status:regressed)");
//! ```

pub mod ast;
pub mod classifier;
pub mod config;
pub mod context;
pub mod error;
pub mod filter;
pub mod inversion;
pub mod lexer;
pub mod parser;
pub mod render;
pub mod rewriter;
pub mod token;

pub use ast::{Inclusivity, Node};
pub use classifier::{FieldClassifier, Scope};
pub use config::FilterConfig;
pub use context::{FieldAliasSource, QueryContext};
pub use error::{ConfigError, FilterError, SyntaxError};
pub use filter::{EventStackFilter, FilterQueryMode, FilterResult};
pub use inversion::{Inversion, InversionAnalyzer};
pub use parser::parse;
pub use render::{render, Renderer};
pub use rewriter::{Reduction, Rewriter};
