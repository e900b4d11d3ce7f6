//! 存储查询的谓词解析器
//!
//! ## 解析流程
//!
//! ```text
//! parse()
//!   ├─ predicate_range(): 找到第一个 WHERE 与其后的 ORDER BY（或输入结束）
//!   │    ├─ SELECT 列表、表名和 ORDER BY 列表全部丢弃
//!   │    ├─ 没有 SELECT 的文本按裸谓词处理
//!   │    └─ WHERE 之前（或找不到 WHERE 时整个输入）的词法错误直接报告，
//!   │       未闭合的引号或方括号可能吞掉了 WHERE
//!   │
//!   └─ 按状态机逐个读取谓词中的 token
//!        ├─ Operand    : [field] → Condition,  ( → Operand
//!        ├─ Condition  : = <> != < > <= >= CONTAINS UNDER EVER NOT CONTAINS NOT UNDER → Value
//!        ├─ Value      : 'text' | 123 | @param → Connective
//!        └─ Connective : AND | OR → Operand,  ) → Connective
//! ```
//!
//! 输出是平铺的、按源码顺序排列的节点序列；括号以带源码偏移的
//! `StartGroup` / `EndGroup` 标记保留，不构建嵌套树。括号是否配对由 RPN 阶段检查，这里只限制嵌套深度。
//!
//! ## 解析示例
//!
//! ```text
//! SELECT [System.Id] FROM WorkItems
//! WHERE [System.TeamProject] = @project AND [System.State] <> 'Closed'
//! ORDER BY [System.Id]
//!
//! => Field, Condition(=), Parameter, Operator(And), Field, Condition(<>), Constant
//! ```

use crate::config::Limits;
use crate::error::{CompileError, Limit, Result};
use crate::node::{CompOp, LogicalOp, Node};
use crate::token::{Token, TokenKind};

/// 状态机当前期望的 token 类别
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Expect {
    Operand,
    Condition,
    Value,
    Connective,
}

impl Expect {
    fn describe(self) -> &'static str {
        match self {
            Expect::Operand => "a field reference or `(`",
            Expect::Condition => "a comparison operator",
            Expect::Value => "a literal or parameter",
            Expect::Connective => "AND, OR or `)`",
        }
    }
}

pub struct Parser<'a> {
    tokens: &'a [Token<'a>],
    position: usize,
    /// 谓词区域结束处的 token 下标（不包含）
    end: usize,
    max_group_depth: usize,
}

impl<'a> Parser<'a> {
    pub fn new(tokens: &'a [Token<'a>]) -> Self {
        Self {
            tokens,
            position: 0,
            end: tokens.len(),
            max_group_depth: Limits::default().max_group_depth,
        }
    }

    pub fn with_limits(mut self, limits: &Limits) -> Self {
        self.max_group_depth = limits.max_group_depth;
        self
    }

    /// 返回当前 token，不推进位置
    fn peek(&self) -> Option<&'a Token<'a>> {
        if self.position < self.end {
            self.tokens.get(self.position)
        } else {
            None
        }
    }

    /// 返回当前 token 并推进位置
    fn advance(&mut self) -> Option<&'a Token<'a>> {
        let token = self.peek()?;
        self.position += 1;
        Some(token)
    }

    /// 谓词结束处的源码偏移，用于报告“意外结束”
    fn end_offset(&self) -> usize {
        match self.tokens.get(self.end) {
            Some(token) => token.span.start,
            None => self.tokens.last().map_or(0, |token| token.span.end),
        }
    }

    /// 定位 WHERE 与 ORDER BY 之间的 token 区间
    ///
    /// 不以 SELECT 开头且没有 WHERE 的文本视为裸谓词，整体参与解析
    fn predicate_range(&self) -> Option<(usize, usize)> {
        let start = match self.tokens.iter().position(|token| token.kind == TokenKind::Where) {
            Some(index) => index + 1,
            None => match self.tokens.first().map(|token| &token.kind) {
                Some(TokenKind::Identifier(word)) if word.eq_ignore_ascii_case("select") => return None,
                _ => 0,
            },
        };
        let end = (start..self.tokens.len())
            .find(|&i| {
                self.tokens[i].kind == TokenKind::Order
                    && self.tokens.get(i + 1).is_some_and(|next| next.kind == TokenKind::By)
            })
            .unwrap_or(self.tokens.len());
        Some((start, end))
    }

    /// 检查 `tokens[..limit]` 中的第一个词法错误
    fn check_faults(&self, limit: usize) -> Result<()> {
        for token in &self.tokens[..limit] {
            match &token.kind {
                TokenKind::Unterminated(what) => {
                    return Err(CompileError::syntax(token.span.start, what.describe()));
                }
                TokenKind::Illegal => {
                    return Err(CompileError::syntax(token.span.start, "unrecognized character"));
                }
                _ => {}
            }
        }
        Ok(())
    }

    /// 解析谓词，返回平铺的节点序列；以 SELECT 开头但没有 WHERE 的查询返回空序列
    pub fn parse(&mut self) -> Result<Vec<Node>> {
        let Some((start, end)) = self.predicate_range() else {
            self.check_faults(self.tokens.len())?;
            return Ok(Vec::new());
        };
        self.check_faults(start)?;
        self.position = start;
        self.end = end;

        let mut nodes = Vec::new();
        let mut expect = Expect::Operand;
        let mut depth = 0usize;

        while let Some(token) = self.advance() {
            let offset = token.span.start;
            match (&token.kind, expect) {
                (TokenKind::Unterminated(what), _) => {
                    return Err(CompileError::syntax(offset, what.describe()));
                }
                (TokenKind::Illegal, _) => {
                    return Err(CompileError::syntax(offset, "unrecognized character"));
                }
                (TokenKind::Field(path), Expect::Operand) => {
                    if path.is_empty() {
                        return Err(CompileError::syntax(offset, "empty field reference"));
                    }
                    nodes.push(Node::field(*path));
                    expect = Expect::Condition;
                }
                (TokenKind::LParen, Expect::Operand) => {
                    depth += 1;
                    if depth > self.max_group_depth {
                        return Err(CompileError::LimitExceeded {
                            limit: Limit::GroupDepth,
                            max: self.max_group_depth,
                        });
                    }
                    nodes.push(Node::StartGroup { offset });
                }
                (_, Expect::Condition) => {
                    let op = self.parse_comparison_operator(token)?;
                    nodes.push(Node::Condition { op });
                    expect = Expect::Value;
                }
                (TokenKind::String(text), Expect::Value) => {
                    nodes.push(Node::constant(text.to_string()));
                    expect = Expect::Connective;
                }
                (TokenKind::Number(text), Expect::Value) => {
                    nodes.push(Node::constant(*text));
                    expect = Expect::Connective;
                }
                (TokenKind::Parameter(name), Expect::Value) => {
                    nodes.push(Node::parameter(*name));
                    expect = Expect::Connective;
                }
                (TokenKind::And, Expect::Connective) => {
                    nodes.push(Node::Operator { kind: LogicalOp::And });
                    expect = Expect::Operand;
                }
                (TokenKind::Or, Expect::Connective) => {
                    nodes.push(Node::Operator { kind: LogicalOp::Or });
                    expect = Expect::Operand;
                }
                (TokenKind::RParen, Expect::Connective) => {
                    // 多余的 ')' 留给 RPN 阶段报告
                    depth = depth.saturating_sub(1);
                    nodes.push(Node::EndGroup { offset });
                }
                (kind, _) => {
                    return Err(CompileError::syntax(
                        offset,
                        format!("Expected {}, found {:?}", expect.describe(), kind),
                    ));
                }
            }
        }

        match expect {
            Expect::Connective => Ok(nodes),
            Expect::Operand if nodes.is_empty() => Ok(nodes),
            _ => Err(CompileError::syntax(
                self.end_offset(),
                format!("Expected {}, but reached end of predicate", expect.describe()),
            )),
        }
    }

    /// 解析比较运算符；`NOT` 只能与 `CONTAINS` / `UNDER` 组合
    fn parse_comparison_operator(&mut self, token: &Token<'a>) -> Result<CompOp> {
        let op = match &token.kind {
            TokenKind::Eq => CompOp::Equals,
            TokenKind::NotEq => CompOp::NotEquals,
            TokenKind::Lt => CompOp::Less,
            TokenKind::Gt => CompOp::Greater,
            TokenKind::Lte => CompOp::LessOrEquals,
            TokenKind::Gte => CompOp::GreaterOrEquals,
            TokenKind::Contains => CompOp::Contains,
            TokenKind::Under => CompOp::Under,
            TokenKind::Ever => CompOp::Ever,
            TokenKind::Not => match self.advance().map(|next| &next.kind) {
                Some(TokenKind::Contains) => CompOp::NotContains,
                Some(TokenKind::Under) => CompOp::NotUnder,
                _ => {
                    return Err(CompileError::syntax(
                        token.span.start,
                        "NOT must be followed by CONTAINS or UNDER",
                    ));
                }
            },
            kind => {
                return Err(CompileError::syntax(
                    token.span.start,
                    format!("Expected {}, found {:?}", Expect::Condition.describe(), kind),
                ));
            }
        };
        Ok(op)
    }
}
