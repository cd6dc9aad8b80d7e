//! 过滤查询语言的Token定义

/// Token是语言的最小单元，包含类型和在输入中的位置
#[derive(Debug, Clone, PartialEq)]
pub struct Token<'a> {
    pub kind: TokenKind<'a>,
    pub span: Span,
}

/// Token的类型
#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind<'a> {
    // 关键字（仅大写）
    And, // "AND" 或 "&&"
    Or,  // "OR" 或 "||"
    Not, // "NOT"
    To,  // "TO"，只在范围内有意义

    // 字面值
    /// 裸词，保留反斜杠转义
    Word(&'a str),
    /// 引号短语的内容，不含引号，转义原样保留
    Phrase(&'a str),

    // 标点
    LParen,   // (
    RParen,   // )
    LBracket, // [
    RBracket, // ]
    LBrace,   // {
    RBrace,   // }
    Colon,    // :

    // 前缀运算符
    Minus, // -
    Plus,  // +
    Bang,  // !

    // 特殊
    /// 缺少结束引号的短语
    Unterminated,
}

impl TokenKind<'_> {
    /// 语法错误信息中使用的简短描述
    pub fn describe(&self) -> String {
        match self {
            TokenKind::And => "'AND'".to_string(),
            TokenKind::Or => "'OR'".to_string(),
            TokenKind::Not => "'NOT'".to_string(),
            TokenKind::To => "'TO'".to_string(),
            TokenKind::Word(w) => format!("'{}'", w),
            TokenKind::Phrase(p) => format!("\"{}\"", p),
            TokenKind::LParen => "'('".to_string(),
            TokenKind::RParen => "')'".to_string(),
            TokenKind::LBracket => "'['".to_string(),
            TokenKind::RBracket => "']'".to_string(),
            TokenKind::LBrace => "'{'".to_string(),
            TokenKind::RBrace => "'}'".to_string(),
            TokenKind::Colon => "':'".to_string(),
            TokenKind::Minus => "'-'".to_string(),
            TokenKind::Plus => "'+'".to_string(),
            TokenKind::Bang => "'!'".to_string(),
            TokenKind::Unterminated => "未结束的短语".to_string(),
        }
    }
}

/// 源文本中的一段区间
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Span {
    /// 起始字节偏移
    pub start: usize,
    /// 结束字节偏移
    pub end: usize,
}

impl Span {
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }
}
