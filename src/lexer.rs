//! 存储查询文本的词法分析器

use std::borrow::Cow;

use crate::token::{Span, Token, TokenKind, Unterminated};

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

    /// 返回下一个位置的字符，不推进位置
    fn peek_next(&self) -> Option<char> {
        self.input[self.position..].chars().nth(1)
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

    fn token(&self, kind: TokenKind<'a>, start: usize) -> Token<'a> {
        Token { kind, span: Span::new(start, self.position) }
    }

    /// 读取方括号包围的字段引用，例如 `[System.Id]`
    /// 注意：开始的 '[' 已经被调用者消费；遇到新的 '[' 视为未闭合，不吞掉后面的文本
    fn read_field(&mut self, start: usize) -> Token<'a> {
        let content_start = self.position;
        while let Some(c) = self.peek() {
            if c == '[' {
                break;
            }
            if c == ']' {
                let content = self.input[content_start..self.position].trim();
                self.bump(); // 消费 ']'
                return self.token(TokenKind::Field(content), start);
            }
            self.bump();
        }
        self.token(TokenKind::Unterminated(Unterminated::Bracket), start)
    }

    /// 读取单引号包围的字符串字面量，`''` 表示一个字面单引号
    /// 注意：开始的引号已经被调用者消费
    fn read_string(&mut self, start: usize) -> Token<'a> {
        let content_start = self.position;
        let mut escaped = false;
        while let Some(c) = self.bump() {
            if c != '\'' {
                continue;
            }
            if self.peek() == Some('\'') {
                self.bump();
                escaped = true;
                continue;
            }
            let raw = &self.input[content_start..self.position - 1];
            let text = if escaped {
                Cow::Owned(raw.replace("''", "'"))
            } else {
                Cow::Borrowed(raw)
            };
            return self.token(TokenKind::String(text), start);
        }
        self.token(TokenKind::Unterminated(Unterminated::Quote), start)
    }

    /// 读取 `@` 之后的参数名
    fn read_parameter(&mut self, start: usize) -> Token<'a> {
        let name_start = self.position;
        while let Some(c) = self.peek() {
            if c.is_alphanumeric() || c == '_' || c == '.' {
                self.bump();
            } else {
                break;
            }
        }
        if self.position == name_start {
            return self.token(TokenKind::Unterminated(Unterminated::Parameter), start);
        }
        let name = &self.input[name_start..self.position];
        self.token(TokenKind::Parameter(name), start)
    }

    /// 读取数字字面量，允许一个小数部分
    fn read_number(&mut self, start: usize) -> Token<'a> {
        self.eat_digits();
        if self.peek() == Some('.') && self.peek_next().is_some_and(|c| c.is_ascii_digit()) {
            self.bump(); // 消费 '.'
            self.eat_digits();
        }
        let literal = &self.input[start..self.position];
        self.token(TokenKind::Number(literal), start)
    }

    fn eat_digits(&mut self) {
        while let Some(c) = self.peek() {
            if c.is_ascii_digit() {
                self.bump();
            } else {
                break;
            }
        }
    }

    /// 读取标识符或关键字
    fn read_identifier(&mut self, start: usize) -> Token<'a> {
        while let Some(c) = self.peek() {
            if c.is_alphanumeric() || c == '_' {
                self.bump();
            } else {
                break;
            }
        }
        let literal = &self.input[start..self.position];
        self.token(match_keyword(literal), start)
    }
}

fn match_keyword(s: &str) -> TokenKind {
    match s.to_ascii_lowercase().as_str() {
        "where" => TokenKind::Where,
        "order" => TokenKind::Order,
        "by" => TokenKind::By,
        "and" => TokenKind::And,
        "or" => TokenKind::Or,
        "not" => TokenKind::Not,
        "contains" => TokenKind::Contains,
        "under" => TokenKind::Under,
        "ever" => TokenKind::Ever,
        _ => TokenKind::Identifier(s),
    }
}

impl<'a> Iterator for Lexer<'a> {
    type Item = Token<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        self.skip_whitespace();
        let start = self.position;

        let c = self.bump()?; // 到达输入末尾

        let token = match c {
            '=' => self.token(TokenKind::Eq, start),
            '(' => self.token(TokenKind::LParen, start),
            ')' => self.token(TokenKind::RParen, start),
            ',' => self.token(TokenKind::Comma, start),
            '<' => match self.peek() {
                Some('=') => {
                    self.bump();
                    self.token(TokenKind::Lte, start)
                }
                Some('>') => {
                    self.bump();
                    self.token(TokenKind::NotEq, start)
                }
                _ => self.token(TokenKind::Lt, start),
            },
            '>' => {
                if self.peek() == Some('=') {
                    self.bump();
                    self.token(TokenKind::Gte, start)
                } else {
                    self.token(TokenKind::Gt, start)
                }
            }
            '!' => {
                if self.peek() == Some('=') {
                    self.bump();
                    self.token(TokenKind::NotEq, start)
                } else {
                    self.token(TokenKind::Illegal, start)
                }
            }
            '[' => self.read_field(start),
            '\'' => self.read_string(start),
            '@' => self.read_parameter(start),
            c if c.is_ascii_digit() => self.read_number(start),
            c if c.is_alphabetic() => self.read_identifier(start),
            _ => self.token(TokenKind::Illegal, start),
        };
        Some(token)
    }
}
