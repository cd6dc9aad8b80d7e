//! 过滤查询语言的词法分析器

use crate::token::{Span, Token, TokenKind};

/// 总是结束裸词的字符
const WORD_TERMINATORS: &[char] = &['(', ')', '[', ']', '{', '}', ':', '"'];

pub struct Lexer<'a> {
    input: &'a str,
    /// 输入字符串中的当前位置（字节索引）
    position: usize,
}

impl<'a> Lexer<'a> {
    pub fn new(input: &'a str) -> Self {
        Lexer { input, position: 0 }
    }

    /// 返回当前位置的字符，不推进位置
    fn peek(&self) -> Option<char> {
        self.input[self.position..].chars().next()
    }

    /// 推进位置一个字符并返回该字符
    fn bump(&mut self) -> Option<char> {
        let c = self.peek();
        if let Some(c) = c {
            self.position += c.len_utf8();
        }
        c
    }

    /// 跳过空白字符
    fn skip_whitespace(&mut self) {
        while let Some(c) = self.peek() {
            if c.is_whitespace() {
                self.bump();
            } else {
                break;
            }
        }
    }

    /// `offset` 之前紧挨着的字符
    fn char_before(&self, offset: usize) -> Option<char> {
        self.input[..offset].chars().next_back()
    }

    /// 前缀运算符必须后面紧跟内容，且不能直接出现在冒号之后（值的位置）
    fn is_prefix_operator(&self, start: usize) -> bool {
        let follows_colon = self.char_before(start) == Some(':');
        let has_operand = matches!(self.peek(), Some(c) if !c.is_whitespace());
        !follows_colon && has_operand
    }

    /// 读取引号短语，开头的引号已被消费
    fn read_phrase(&mut self, start: usize) -> Token<'a> {
        let content_start = self.position;
        loop {
            match self.peek() {
                None => {
                    return Token {
                        kind: TokenKind::Unterminated,
                        span: Span::new(start, self.position),
                    };
                }
                Some('\\') => {
                    self.bump();
                    self.bump();
                }
                Some('"') => break,
                Some(_) => {
                    self.bump();
                }
            }
        }
        let content_end = self.position;
        self.bump(); // 结束引号

        Token {
            kind: TokenKind::Phrase(&self.input[content_start..content_end]),
            span: Span::new(start, self.position),
        }
    }

    /// 读取裸词或关键字，第一个字符已被消费
    fn read_word(&mut self, start: usize, first: char) -> Token<'a> {
        if first == '\\' {
            self.bump();
        }
        while let Some(c) = self.peek() {
            if c.is_whitespace() || WORD_TERMINATORS.contains(&c) {
                break;
            }
            self.bump();
            if c == '\\' {
                self.bump();
            }
        }
        let literal = &self.input[start..self.position];
        Token {
            kind: match_keyword(literal),
            span: Span::new(start, self.position),
        }
    }
}

fn match_keyword(s: &str) -> TokenKind {
    match s {
        "AND" | "&&" => TokenKind::And,
        "OR" | "||" => TokenKind::Or,
        "NOT" => TokenKind::Not,
        "TO" => TokenKind::To,
        _ => TokenKind::Word(s),
    }
}

impl<'a> Iterator for Lexer<'a> {
    type Item = Token<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        self.skip_whitespace();
        let start = self.position;

        let c = self.bump()?;
        let single = |kind| Token {
            kind,
            span: Span::new(start, start + 1),
        };

        let token = match c {
            '(' => single(TokenKind::LParen),
            ')' => single(TokenKind::RParen),
            '[' => single(TokenKind::LBracket),
            ']' => single(TokenKind::RBracket),
            '{' => single(TokenKind::LBrace),
            '}' => single(TokenKind::RBrace),
            ':' => single(TokenKind::Colon),
            '"' => self.read_phrase(start),
            '-' if self.is_prefix_operator(start) => single(TokenKind::Minus),
            '+' if self.is_prefix_operator(start) => single(TokenKind::Plus),
            '!' if self.is_prefix_operator(start) => single(TokenKind::Bang),
            c => self.read_word(start, c),
        };
        Some(token)
    }
}
