//! 过滤查询语言的语法分析器
//!
//! ## 解析流程图
//!
//! ```text
//! parse()
//!   └─ parse_or_expression()
//!        ├─ parse_and_expression()
//!        │    ├─ parse_unary_expression()   (嵌套深度检查)
//!        │    │    └─ parse_prefixed_expression()
//!        │    │         ├─ NOT / ! / - → Not(parse_unary_expression())
//!        │    │         ├─ +           → parse_unary_expression()
//!        │    │         └─ parse_primary_expression()
//!        │    │              ├─ "("           → Group(parse_or_expression())
//!        │    │              ├─ field ":"     → parse_field_value()
//!        │    │              │                   ├─ 词 / 短语 / >v / <=v
//!        │    │              │                   ├─ [a TO b] / {a TO b}
//!        │    │              │                   └─ "(" → 以 `field` 为默认字段的分组
//!        │    │              └─ 词 / 短语 → 默认字段上的词项
//!        │    │
//!        │    └─ 遇到AND，或下一个Token能开始新子句时（隐式AND），继续解析
//!        │
//!        └─ 遇到OR时，继续解析右侧AND表达式
//! ```
//!
//! ## 语法优先级（从高到低）
//!
//! 1. **括号分组** `(expression)`
//! 2. **一元操作** `NOT`、`!`、前导 `-`（以及无作用的 `+`）
//! 3. **AND操作** 显式 `AND` / `&&`，或以空白相邻
//! 4. **OR操作** `OR` / `||`
//!
//! 括号和一元操作的嵌套深度不超过 [`MAX_NESTING_DEPTH`]。
//!
//! ## 示例
//!
//! ```text
//! status:open OR status:regressed
//! -type:heartbeat (reference:sessionId OR ref.session:sessionId)
//! stack:1ecd0826e447ad1e78877555 status:(open OR regressed)
//! total_occurrences:[10 TO *] first:>2024-01-01 value:{-5 TO 5]
//! ```

use crate::ast::{Inclusivity, Node, PhraseTerm, RangeTerm, Term, UNBOUNDED};
use crate::error::SyntaxError;
use crate::lexer::Lexer;
use crate::token::{Token, TokenKind};

/// 括号与一元运算符允许的最大嵌套层数
pub const MAX_NESTING_DEPTH: usize = 128;

const TERM: &str = "term";
const FIELD_VALUE: &str = "field value";
const RANGE_BOUND: &str = "range bound";
const SHALLOWER_NESTING: &str = "shallower nesting";

/// 一次完成词法和语法分析
pub fn parse(input: &str) -> Result<Node, SyntaxError> {
    let tokens: Vec<_> = Lexer::new(input).collect();
    Parser::new(&tokens).parse()
}

pub struct Parser<'a> {
    tokens: &'a [Token<'a>],
    position: usize,
    /// 当前的一元表达式嵌套层数
    depth: usize,
}

impl<'a> Parser<'a> {
    pub fn new(tokens: &'a [Token<'a>]) -> Self {
        Self {
            tokens,
            position: 0,
            depth: 0,
        }
    }

    fn peek(&self) -> Option<&Token<'a>> {
        self.tokens.get(self.position)
    }

    fn peek_kind(&self) -> Option<&TokenKind<'a>> {
        self.peek().map(|t| &t.kind)
    }

    fn peek_next_kind(&self) -> Option<&TokenKind<'a>> {
        self.tokens.get(self.position + 1).map(|t| &t.kind)
    }

    fn advance(&mut self) -> Option<&Token<'a>> {
        let token = self.tokens.get(self.position)?;
        self.position += 1;
        Some(token)
    }

    fn match_token(&self, kind: &TokenKind) -> bool {
        self.peek_kind()
            .is_some_and(|k| std::mem::discriminant(k) == std::mem::discriminant(kind))
    }

    fn expect(&mut self, kind: TokenKind, label: &'static str) -> Result<(), SyntaxError> {
        if self.match_token(&kind) {
            self.advance();
            Ok(())
        } else {
            Err(self.error(&[label]))
        }
    }

    fn end_offset(&self) -> usize {
        self.tokens.last().map(|t| t.span.end).unwrap_or(0)
    }

    /// 在当前Token（或输入结尾）处构造错误
    fn error(&self, expected: &[&'static str]) -> SyntaxError {
        match self.peek() {
            Some(token) => SyntaxError::new(token.span.start, expected, &token.kind.describe()),
            None => SyntaxError::new(self.end_offset(), expected, "输入结束"),
        }
    }

    /// 当前Token能否开始一个子句，能则与前一个子句构成隐式AND
    fn at_clause_start(&self) -> bool {
        matches!(
            self.peek_kind(),
            Some(
                TokenKind::Word(_)
                    | TokenKind::Phrase(_)
                    | TokenKind::To
                    | TokenKind::LParen
                    | TokenKind::Not
                    | TokenKind::Minus
                    | TokenKind::Plus
                    | TokenKind::Bang
                    | TokenKind::Unterminated
            )
        )
    }

    pub fn parse(&mut self) -> Result<Node, SyntaxError> {
        let node = self.parse_or_expression(None)?;
        if self.peek().is_some() {
            return Err(self.error(&["end of input"]));
        }
        Ok(node)
    }

    /// 解析OR表达式 (最低优先级)
    ///
    /// 语法: `and_expr (OR and_expr)*`
    fn parse_or_expression(&mut self, default_field: Option<&str>) -> Result<Node, SyntaxError> {
        let mut children = vec![self.parse_and_expression(default_field)?];

        while self.match_token(&TokenKind::Or) {
            self.advance(); // 消费 OR
            children.push(self.parse_and_expression(default_field)?);
        }

        Ok(if children.len() == 1 {
            children.remove(0)
        } else {
            Node::Or(children)
        })
    }

    /// 解析AND表达式
    ///
    /// 语法: `unary ([AND] unary)*`
    fn parse_and_expression(&mut self, default_field: Option<&str>) -> Result<Node, SyntaxError> {
        let mut children = vec![self.parse_unary_expression(default_field)?];

        loop {
            if self.match_token(&TokenKind::And) {
                self.advance(); // 消费 AND
            } else if !self.at_clause_start() {
                break;
            }
            children.push(self.parse_unary_expression(default_field)?);
        }

        Ok(if children.len() == 1 {
            children.remove(0)
        } else {
            Node::And(children)
        })
    }

    /// 所有括号和一元运算符的递归都经过这里，嵌套过深时报错而不是耗尽栈
    fn parse_unary_expression(&mut self, default_field: Option<&str>) -> Result<Node, SyntaxError> {
        if self.depth >= MAX_NESTING_DEPTH {
            return Err(self.error(&[SHALLOWER_NESTING]));
        }
        self.depth += 1;
        let node = self.parse_prefixed_expression(default_field);
        self.depth -= 1;
        node
    }

    /// 语法: `(NOT | ! | - | +)* primary_expr`
    fn parse_prefixed_expression(
        &mut self,
        default_field: Option<&str>,
    ) -> Result<Node, SyntaxError> {
        match self.peek_kind() {
            Some(TokenKind::Not | TokenKind::Minus | TokenKind::Bang) => {
                self.advance();
                let operand = self.parse_unary_expression(default_field)?;
                Ok(Node::Not(Box::new(operand)))
            }
            Some(TokenKind::Plus) => {
                self.advance();
                self.parse_unary_expression(default_field)
            }
            _ => self.parse_primary_expression(default_field),
        }
    }

    /// 解析基础表达式 (最高优先级)
    fn parse_primary_expression(
        &mut self,
        default_field: Option<&str>,
    ) -> Result<Node, SyntaxError> {
        let Some(kind) = self.peek_kind().cloned() else {
            return Err(self.error(&[TERM]));
        };

        match kind {
            TokenKind::LParen => {
                self.advance(); // 消费 (
                let inner = self.parse_or_expression(default_field)?;
                self.expect(TokenKind::RParen, "')'")?;
                Ok(Node::Group(Box::new(inner)))
            }
            TokenKind::Word(word) if matches!(self.peek_next_kind(), Some(TokenKind::Colon)) => {
                self.advance(); // 消费字段名
                self.advance(); // 消费 :
                self.parse_field_value(&unescape(word))
            }
            TokenKind::Word(word) => {
                self.advance();
                Ok(Node::Term(Term {
                    field: default_field.map(str::to_string),
                    value: unescape(word),
                }))
            }
            TokenKind::To => {
                self.advance();
                Ok(Node::Term(Term {
                    field: default_field.map(str::to_string),
                    value: "TO".to_string(),
                }))
            }
            TokenKind::Phrase(phrase) => {
                self.advance();
                Ok(Node::Phrase(PhraseTerm {
                    field: default_field.map(str::to_string),
                    phrase: unescape(phrase),
                }))
            }
            TokenKind::LBracket | TokenKind::LBrace => match default_field {
                Some(field) => self.parse_range(field),
                None => Err(self.error(&[TERM])),
            },
            TokenKind::Unterminated => Err(self.error(&["closing '\"'"])),
            _ => Err(self.error(&[TERM])),
        }
    }

    /// 解析 `field:` 之后的内容
    fn parse_field_value(&mut self, field: &str) -> Result<Node, SyntaxError> {
        let Some(kind) = self.peek_kind().cloned() else {
            return Err(self.error(&[FIELD_VALUE]));
        };

        match kind {
            TokenKind::Word(word) => {
                self.advance();
                if field == "*" && word == "*" {
                    return Ok(Node::MatchAll);
                }
                if let Some(range) = comparison_range(field, word) {
                    return Ok(range);
                }
                Ok(Node::Term(Term {
                    field: Some(field.to_string()),
                    value: unescape(word),
                }))
            }
            TokenKind::To => {
                self.advance();
                Ok(Node::term(field, "TO"))
            }
            TokenKind::Phrase(phrase) => {
                self.advance();
                Ok(Node::Phrase(PhraseTerm {
                    field: Some(field.to_string()),
                    phrase: unescape(phrase),
                }))
            }
            TokenKind::LParen => {
                self.advance(); // 消费 (
                let inner = self.parse_or_expression(Some(field))?;
                self.expect(TokenKind::RParen, "')'")?;
                Ok(Node::Group(Box::new(inner)))
            }
            TokenKind::LBracket | TokenKind::LBrace => self.parse_range(field),
            TokenKind::Unterminated => Err(self.error(&["closing '\"'"])),
            _ => Err(self.error(&[FIELD_VALUE])),
        }
    }

    /// 语法: `('[' | '{') bound TO bound (']' | '}')`
    fn parse_range(&mut self, field: &str) -> Result<Node, SyntaxError> {
        let low_inclusive = matches!(self.peek_kind(), Some(TokenKind::LBracket));
        self.advance();

        let low = self.parse_bound()?;
        self.expect(TokenKind::To, "'TO'")?;
        let high = self.parse_bound()?;

        let high_inclusive = match self.peek_kind() {
            Some(TokenKind::RBracket) => true,
            Some(TokenKind::RBrace) => false,
            _ => return Err(self.error(&["']'", "'}'"])),
        };
        self.advance();

        Ok(Node::Range(RangeTerm {
            field: field.to_string(),
            low,
            high,
            inclusivity: Inclusivity {
                low: low_inclusive,
                high: high_inclusive,
            },
        }))
    }

    /// 范围端点。词法分析器把 `[-5` 中的 `-` 切成前缀运算符，这里重新拼回端点值
    fn parse_bound(&mut self) -> Result<String, SyntaxError> {
        let sign = match self.peek_kind() {
            Some(TokenKind::Minus) => Some('-'),
            Some(TokenKind::Plus) => Some('+'),
            _ => None,
        };
        if sign.is_some() {
            self.advance();
        }

        let bound = match (sign, self.peek_kind()) {
            (_, Some(TokenKind::Word(word))) => {
                let mut bound = sign.map(String::from).unwrap_or_default();
                bound.push_str(&unescape(word));
                bound
            }
            (None, Some(TokenKind::Phrase(phrase))) => unescape(phrase),
            _ => return Err(self.error(&[RANGE_BOUND])),
        };
        self.advance();
        Ok(bound)
    }
}

/// `>v`、`>=v`、`<v`、`<=v` 是半开范围的简写
fn comparison_range(field: &str, word: &str) -> Option<Node> {
    let (low, high, inclusivity, rest) = if let Some(rest) = word.strip_prefix(">=") {
        (true, false, Inclusivity::INCLUSIVE, rest)
    } else if let Some(rest) = word.strip_prefix("<=") {
        (false, true, Inclusivity::INCLUSIVE, rest)
    } else if let Some(rest) = word.strip_prefix('>') {
        (true, false, Inclusivity { low: false, high: true }, rest)
    } else if let Some(rest) = word.strip_prefix('<') {
        (false, true, Inclusivity { low: true, high: false }, rest)
    } else {
        return None;
    };

    if rest.is_empty() {
        return None;
    }

    let bound = unescape(rest);
    Some(Node::Range(RangeTerm {
        field: field.to_string(),
        low: if low { bound.clone() } else { UNBOUNDED.to_string() },
        high: if high { bound } else { UNBOUNDED.to_string() },
        inclusivity,
    }))
}

/// 去掉反斜杠转义：`\x` 变为 `x`
fn unescape(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut chars = raw.chars();
    while let Some(c) = chars.next() {
        if c == '\\' {
            if let Some(escaped) = chars.next() {
                out.push(escaped);
            }
        } else {
            out.push(c);
        }
    }
    out
}
