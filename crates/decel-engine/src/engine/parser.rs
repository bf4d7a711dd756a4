//! Recursive descent parser for formula expressions.
//!
//! ```text
//! expr       := comparison
//! comparison := additive (("==" | "!=" | "<" | "<=" | ">" | ">=") additive)*
//! additive   := term (("+" | "-") term)*
//! term       := unary (("*" | "/" | "%") unary)*
//! unary      := ("-" | "+") unary | power
//! power      := primary (("^" | "**") unary)?
//! primary    := NUMBER | STRING | IDENT | IDENT "(" args? ")"
//!             | "(" expr ")" | "[" args? "]"
//! args       := expr ("," expr)*
//! ```

use super::eval::EvalError;
use super::lexer::{Token, tokenize};

/// Deepest expression tree the parser will build. Nested brackets, prefix
/// operators and chained binary operators all count.
const MAX_DEPTH: usize = 256;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Rem,
    Pow,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum UnaryOp {
    Neg,
    Plus,
}

#[derive(Clone, Debug, PartialEq)]
pub enum Expr {
    Number(f64),
    Text(String),
    Name(String),
    Call(String, Vec<Expr>),
    List(Vec<Expr>),
    Unary(UnaryOp, Box<Expr>),
    Binary(BinaryOp, Box<Expr>, Box<Expr>),
}

pub fn parse(input: &str) -> Result<Expr, EvalError> {
    let tokens = tokenize(input)?;
    if tokens.is_empty() {
        return Err(EvalError::Parse("empty expression".to_string()));
    }
    let mut parser = Parser {
        tokens,
        pos: 0,
        depth: 0,
    };
    let expr = parser.expr()?;
    if let Some(tok) = parser.peek() {
        return Err(EvalError::Parse(format!("unexpected token {:?}", tok)));
    }
    Ok(expr)
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
    depth: usize,
}

impl Parser {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn next(&mut self) -> Option<Token> {
        let tok = self.tokens.get(self.pos).cloned();
        self.pos += 1;
        tok
    }

    fn eat(&mut self, expected: &Token) -> bool {
        if self.peek() == Some(expected) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn expect(&mut self, expected: Token) -> Result<(), EvalError> {
        if self.eat(&expected) {
            Ok(())
        } else {
            Err(EvalError::Parse(format!(
                "expected {:?}, found {:?}",
                expected,
                self.peek()
            )))
        }
    }

    fn enter(&mut self) -> Result<(), EvalError> {
        self.depth += 1;
        if self.depth > MAX_DEPTH {
            return Err(EvalError::Parse("expression nested too deeply".to_string()));
        }
        Ok(())
    }

    fn leave(&mut self, levels: usize) {
        self.depth -= levels;
    }

    fn expr(&mut self) -> Result<Expr, EvalError> {
        self.comparison()
    }

    fn comparison(&mut self) -> Result<Expr, EvalError> {
        let mut lhs = self.additive()?;
        let mut chained = 0;
        loop {
            let op = match self.peek() {
                Some(Token::Eq) => BinaryOp::Eq,
                Some(Token::Ne) => BinaryOp::Ne,
                Some(Token::Lt) => BinaryOp::Lt,
                Some(Token::Le) => BinaryOp::Le,
                Some(Token::Gt) => BinaryOp::Gt,
                Some(Token::Ge) => BinaryOp::Ge,
                _ => {
                    self.leave(chained);
                    return Ok(lhs);
                }
            };
            self.pos += 1;
            self.enter()?;
            chained += 1;
            let rhs = self.additive()?;
            lhs = Expr::Binary(op, Box::new(lhs), Box::new(rhs));
        }
    }

    fn additive(&mut self) -> Result<Expr, EvalError> {
        let mut lhs = self.term()?;
        let mut chained = 0;
        loop {
            let op = match self.peek() {
                Some(Token::Plus) => BinaryOp::Add,
                Some(Token::Minus) => BinaryOp::Sub,
                _ => {
                    self.leave(chained);
                    return Ok(lhs);
                }
            };
            self.pos += 1;
            self.enter()?;
            chained += 1;
            let rhs = self.term()?;
            lhs = Expr::Binary(op, Box::new(lhs), Box::new(rhs));
        }
    }

    fn term(&mut self) -> Result<Expr, EvalError> {
        let mut lhs = self.unary()?;
        let mut chained = 0;
        loop {
            let op = match self.peek() {
                Some(Token::Star) => BinaryOp::Mul,
                Some(Token::Slash) => BinaryOp::Div,
                Some(Token::Percent) => BinaryOp::Rem,
                _ => {
                    self.leave(chained);
                    return Ok(lhs);
                }
            };
            self.pos += 1;
            self.enter()?;
            chained += 1;
            let rhs = self.unary()?;
            lhs = Expr::Binary(op, Box::new(lhs), Box::new(rhs));
        }
    }

    fn unary(&mut self) -> Result<Expr, EvalError> {
        let op = if self.eat(&Token::Minus) {
            UnaryOp::Neg
        } else if self.eat(&Token::Plus) {
            UnaryOp::Plus
        } else {
            return self.power();
        };
        self.enter()?;
        let operand = self.unary()?;
        self.leave(1);
        Ok(Expr::Unary(op, Box::new(operand)))
    }

    fn power(&mut self) -> Result<Expr, EvalError> {
        let base = self.primary()?;
        if self.eat(&Token::Caret) {
            self.enter()?;
            let exp = self.unary()?;
            self.leave(1);
            return Ok(Expr::Binary(BinaryOp::Pow, Box::new(base), Box::new(exp)));
        }
        Ok(base)
    }

    fn primary(&mut self) -> Result<Expr, EvalError> {
        match self.next() {
            Some(Token::Number(n)) => Ok(Expr::Number(n)),
            Some(Token::Str(s)) => Ok(Expr::Text(s)),
            Some(Token::Ident(name)) => {
                if self.eat(&Token::LParen) {
                    self.enter()?;
                    let args = self.args(Token::RParen)?;
                    self.leave(1);
                    Ok(Expr::Call(name, args))
                } else {
                    Ok(Expr::Name(name))
                }
            }
            Some(Token::LParen) => {
                self.enter()?;
                let inner = self.expr()?;
                self.expect(Token::RParen)?;
                self.leave(1);
                Ok(inner)
            }
            Some(Token::LBracket) => {
                self.enter()?;
                let items = self.args(Token::RBracket)?;
                self.leave(1);
                Ok(Expr::List(items))
            }
            Some(tok) => Err(EvalError::Parse(format!("unexpected token {:?}", tok))),
            None => Err(EvalError::Parse("unexpected end of expression".to_string())),
        }
    }

    /// Comma-separated expressions up to and including `close`.
    fn args(&mut self, close: Token) -> Result<Vec<Expr>, EvalError> {
        let mut args = Vec::new();
        if self.eat(&close) {
            return Ok(args);
        }
        loop {
            args.push(self.expr()?);
            if self.eat(&close) {
                return Ok(args);
            }
            self.expect(Token::Comma)?;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn num(n: f64) -> Box<Expr> {
        Box::new(Expr::Number(n))
    }

    #[test]
    fn test_precedence() {
        assert_eq!(
            parse("1 + 2 * 3").unwrap(),
            Expr::Binary(
                BinaryOp::Add,
                num(1.0),
                Box::new(Expr::Binary(BinaryOp::Mul, num(2.0), num(3.0)))
            )
        );
    }

    #[test]
    fn test_power_binds_tighter_than_negation() {
        assert_eq!(
            parse("-2 ^ 2").unwrap(),
            Expr::Unary(
                UnaryOp::Neg,
                Box::new(Expr::Binary(BinaryOp::Pow, num(2.0), num(2.0)))
            )
        );
    }

    #[test]
    fn test_calls_and_lists() {
        assert_eq!(
            parse("max([1, 2], x)").unwrap(),
            Expr::Call(
                "max".into(),
                vec![
                    Expr::List(vec![Expr::Number(1.0), Expr::Number(2.0)]),
                    Expr::Name("x".into())
                ]
            )
        );
        assert_eq!(parse("rand()").unwrap(), Expr::Call("rand".into(), vec![]));
    }

    #[test]
    fn test_parse_errors() {
        assert!(parse("").is_err());
        assert!(parse("1 +").is_err());
        assert!(parse("(1").is_err());
        assert!(parse("1 2").is_err());
        assert!(parse("f(1,)").is_err());
    }

    #[test]
    fn test_nesting_limit() {
        let deep = format!("{}1{}", "(".repeat(200_000), ")".repeat(200_000));
        assert!(matches!(parse(&deep), Err(EvalError::Parse(_))));
        assert!(parse(&"-".repeat(100_000)).is_err());
        let chain = vec!["1"; 100_000].join(" + ");
        assert!(parse(&chain).is_err());

        let shallow = format!("{}1{}", "(".repeat(50), ")".repeat(50));
        assert_eq!(parse(&shallow).unwrap(), Expr::Number(1.0));
        assert!(parse(&vec!["1"; 100].join(" * ")).is_ok());
    }
}
