//! Recursive-descent / precedence-climbing parser mapping vSQL source text
//! directly onto the crate's own `Ast` (`spec.md` §4.3, `SPEC_FULL.md` §4.3's
//! grounded substitution for "run the host template parser, then map its
//! tree" -- there is no separate host tree here, so parsing and mapping
//! happen in the same pass, through the same `make_*` constructors the
//! synthetic builders use).

use std::collections::HashMap;
use std::rc::Rc;

use crate::ast::{Ast, NodeKind};
use crate::error::{Error, Result};
use crate::frontend::lexer::{Lexer, Token, TokenKind};
use crate::op::BinaryOp;
use crate::registry::Registry;
use crate::schema::{Field, Group};

/// Parse a vSQL expression against a variable environment, producing a
/// validated `Ast` (`spec.md` §4.3 / §6.1). The only `Err` cases are the
/// fatal ones `spec.md` §7 names: a lexical error, an unsupported
/// construct, or a keyword argument. Everything else -- an unknown field,
/// a type mismatch, an unresolved name -- is a `CompileError` attached to
/// the returned node, per `spec.md` §4.6.
pub fn parse(source: &str, registry: &Registry, vars: &HashMap<String, Field>) -> Result<Rc<Ast>> {
    let tokens = Lexer::new(source).tokenize()?;
    let root = Group::virtual_group();
    for field in vars.values() {
        root.insert(field.clone());
    }
    let mut parser = Parser {
        tokens,
        pos: 0,
        registry,
        root,
    };
    let ast = parser.parse_ternary()?;
    parser.expect_eof()?;
    Ok(ast)
}

struct Parser<'r> {
    tokens: Vec<Token>,
    pos: usize,
    registry: &'r Registry,
    root: Rc<Group>,
}

impl<'r> Parser<'r> {
    fn peek(&self) -> &TokenKind {
        &self.tokens[self.pos].kind
    }

    fn peek_at(&self, offset: usize) -> &TokenKind {
        let idx = (self.pos + offset).min(self.tokens.len() - 1);
        &self.tokens[idx].kind
    }

    fn bump(&mut self) -> TokenKind {
        let kind = self.tokens[self.pos].kind.clone();
        if self.pos + 1 < self.tokens.len() {
            self.pos += 1;
        }
        kind
    }

    fn span(&self) -> crate::error::Span {
        self.tokens[self.pos].span
    }

    fn expect_eof(&self) -> Result<()> {
        match self.peek() {
            TokenKind::Eof => Ok(()),
            other => Err(Error::unexpected_token("end of input", other.describe(), self.span())),
        }
    }

    fn expect(&mut self, kind: &TokenKind, label: &str) -> Result<()> {
        if self.peek() == kind {
            self.bump();
            Ok(())
        } else {
            let found = self.peek().describe();
            Err(Error::unexpected_token(label, found, self.span()))
        }
    }

    fn expect_ident(&mut self) -> Result<String> {
        match self.peek().clone() {
            TokenKind::Ident(name) => {
                self.bump();
                Ok(name)
            }
            other => Err(Error::unexpected_token("identifier", other.describe(), self.span())),
        }
    }

    // -----------------------------------------------------------------
    // Ternary: `A if C else B`, lowest precedence, right-associative.
    // -----------------------------------------------------------------

    fn parse_ternary(&mut self) -> Result<Rc<Ast>> {
        let objif = self.parse_binary(0)?;
        if matches!(self.peek(), TokenKind::If) {
            self.bump();
            let objcond = self.parse_binary(0)?;
            self.expect(&TokenKind::Else, "'else'")?;
            let objelse = self.parse_ternary()?;
            return Ok(Ast::make_if(objif, objcond, objelse, self.registry));
        }
        Ok(objif)
    }

    // -----------------------------------------------------------------
    // Binary operators, precedence-climbing over `BinaryOp::precedence()`
    // so the parser and the AST's own parenthesisation logic (`op.rs`)
    // never drift apart. Prefix `not`/`-`/`~` are threaded in here too,
    // since `not`'s precedence (30) sits between `and` (20) and the
    // comparison family (40) and so cannot be parsed as an ordinary
    // tight-binding primary prefix.
    // -----------------------------------------------------------------

    fn parse_binary(&mut self, min_prec: u8) -> Result<Rc<Ast>> {
        let mut lhs = self.parse_unary()?;
        loop {
            let (op, tokens_consumed) = match self.peek_binary_op() {
                Some(pair) => pair,
                None => break,
            };
            if op.precedence() < min_prec {
                break;
            }
            for _ in 0..tokens_consumed {
                self.bump();
            }
            let rhs = self.parse_binary(op.precedence() + 1)?;
            lhs = Ast::make_binary(op, lhs, rhs, self.registry);
        }
        Ok(lhs)
    }

    fn peek_binary_op(&self) -> Option<(BinaryOp, usize)> {
        match self.peek() {
            TokenKind::Or => Some((BinaryOp::Or, 1)),
            TokenKind::And => Some((BinaryOp::And, 1)),
            TokenKind::In => Some((BinaryOp::In, 1)),
            TokenKind::Not if matches!(self.peek_at(1), TokenKind::In) => Some((BinaryOp::NotIn, 2)),
            TokenKind::Is if matches!(self.peek_at(1), TokenKind::Not) => Some((BinaryOp::IsNot, 2)),
            TokenKind::Is => Some((BinaryOp::Is, 1)),
            TokenKind::EqEq => Some((BinaryOp::Eq, 1)),
            TokenKind::NotEq => Some((BinaryOp::Ne, 1)),
            TokenKind::Lt => Some((BinaryOp::Lt, 1)),
            TokenKind::Le => Some((BinaryOp::Le, 1)),
            TokenKind::Gt => Some((BinaryOp::Gt, 1)),
            TokenKind::Ge => Some((BinaryOp::Ge, 1)),
            TokenKind::Pipe => Some((BinaryOp::BitOr, 1)),
            TokenKind::Caret => Some((BinaryOp::BitXor, 1)),
            TokenKind::Amp => Some((BinaryOp::BitAnd, 1)),
            TokenKind::Shl => Some((BinaryOp::Shl, 1)),
            TokenKind::Shr => Some((BinaryOp::Shr, 1)),
            TokenKind::Plus => Some((BinaryOp::Add, 1)),
            TokenKind::Minus => Some((BinaryOp::Sub, 1)),
            TokenKind::Star => Some((BinaryOp::Mul, 1)),
            TokenKind::Slash => Some((BinaryOp::Div, 1)),
            TokenKind::SlashSlash => Some((BinaryOp::FloorDiv, 1)),
            TokenKind::Percent => Some((BinaryOp::Mod, 1)),
            _ => None,
        }
    }

    fn parse_unary(&mut self) -> Result<Rc<Ast>> {
        match self.peek() {
            TokenKind::Not => {
                self.bump();
                let operand = self.parse_binary(crate::op::UnaryOp::Not.precedence())?;
                Ok(Ast::make_unary(crate::op::UnaryOp::Not, operand, self.registry))
            }
            TokenKind::Minus => {
                self.bump();
                let operand = self.parse_binary(crate::op::UnaryOp::Neg.precedence())?;
                Ok(Ast::make_unary(crate::op::UnaryOp::Neg, operand, self.registry))
            }
            TokenKind::Tilde => {
                self.bump();
                let operand = self.parse_binary(crate::op::UnaryOp::BitNot.precedence())?;
                Ok(Ast::make_unary(crate::op::UnaryOp::BitNot, operand, self.registry))
            }
            _ => {
                let atom = self.parse_primary()?;
                self.parse_postfix(atom)
            }
        }
    }

    // -----------------------------------------------------------------
    // Postfix chain: `.name`, `(args)`, `[index]`, `[i1:i2]`.
    // -----------------------------------------------------------------

    fn parse_postfix(&mut self, mut value: Rc<Ast>) -> Result<Rc<Ast>> {
        loop {
            match self.peek() {
                TokenKind::Dot => {
                    self.bump();
                    let name = self.expect_ident()?;
                    value = self.build_attr_access(value, name);
                }
                TokenKind::LParen => {
                    self.bump();
                    let args = self.parse_call_args()?;
                    value = self.build_call(value, args)?;
                }
                TokenKind::LBracket => {
                    self.bump();
                    value = self.parse_item_or_slice(value)?;
                }
                _ => break,
            }
        }
        Ok(value)
    }

    /// `spec.md` §4.3: attribute access on a `FieldRef` whose field exposes
    /// a `refgroup` becomes a nested `FieldRef` when the name resolves
    /// there, otherwise (and for every other receiver) a generic `Attr`.
    fn build_attr_access(&self, obj: Rc<Ast>, name: String) -> Rc<Ast> {
        if let NodeKind::FieldRef { field: Some(field), .. } = &obj.kind {
            if let Some(refgroup) = &field.refgroup {
                if refgroup.get(&name).is_some() {
                    let refgroup = Rc::clone(refgroup);
                    return Ast::make_field_ref(Some(obj), name, &refgroup);
                }
            }
        }
        Ast::make_attr(obj, name, self.registry)
    }

    /// `spec.md` §4.3: call on a parentless `FieldRef` is a function call;
    /// call on a nested `FieldRef` or an `Attr` is a method call on the
    /// receiver. Any other callee shape is outside the accepted grammar.
    fn build_call(&mut self, callee: Rc<Ast>, args: Vec<Rc<Ast>>) -> Result<Rc<Ast>> {
        match &callee.kind {
            NodeKind::FieldRef { identifier, .. } => match callee.children().first() {
                Some(parent) => Ok(Ast::make_meth(Rc::clone(parent), identifier.clone(), args, self.registry)),
                None => Ok(Ast::make_func(identifier.clone(), args, self.registry)),
            },
            NodeKind::Attr { name } => {
                let obj = Rc::clone(&callee.children()[0]);
                Ok(Ast::make_meth(obj, name.clone(), args, self.registry))
            }
            _ => Err(Error::unsupported_construct("call on an expression that is neither a field nor an attribute access", self.span())),
        }
    }

    fn parse_call_args(&mut self) -> Result<Vec<Rc<Ast>>> {
        let mut args = Vec::new();
        if matches!(self.peek(), TokenKind::RParen) {
            self.bump();
            return Ok(args);
        }
        loop {
            if matches!(self.peek(), TokenKind::Ident(_)) && matches!(self.peek_at(1), TokenKind::Assign) {
                return Err(Error::keyword_argument(self.span()));
            }
            args.push(self.parse_ternary()?);
            match self.peek() {
                TokenKind::Comma => {
                    self.bump();
                }
                TokenKind::RParen => {
                    self.bump();
                    break;
                }
                other => return Err(Error::unexpected_token("',' or ')'", other.describe(), self.span())),
            }
        }
        Ok(args)
    }

    fn parse_item_or_slice(&mut self, obj: Rc<Ast>) -> Result<Rc<Ast>> {
        if matches!(self.peek(), TokenKind::Colon) {
            self.bump();
            let index2 = self.parse_optional_slice_bound()?;
            self.expect(&TokenKind::RBracket, "']'")?;
            return Ok(Ast::make_slice(obj, None, index2, self.registry));
        }
        let index1 = self.parse_ternary()?;
        if matches!(self.peek(), TokenKind::Colon) {
            self.bump();
            let index2 = self.parse_optional_slice_bound()?;
            self.expect(&TokenKind::RBracket, "']'")?;
            return Ok(Ast::make_slice(obj, Some(index1), index2, self.registry));
        }
        self.expect(&TokenKind::RBracket, "']'")?;
        Ok(Ast::make_binary(BinaryOp::Item, obj, index1, self.registry))
    }

    fn parse_optional_slice_bound(&mut self) -> Result<Option<Rc<Ast>>> {
        if matches!(self.peek(), TokenKind::RBracket) {
            Ok(None)
        } else {
            Ok(Some(self.parse_ternary()?))
        }
    }

    // -----------------------------------------------------------------
    // Primary: literals, variable references, parenthesised expressions,
    // list/set literals.
    // -----------------------------------------------------------------

    fn parse_primary(&mut self) -> Result<Rc<Ast>> {
        let span = self.span();
        match self.bump() {
            TokenKind::None => Ok(Ast::const_none()),
            TokenKind::True => Ok(Ast::const_bool(true)),
            TokenKind::False => Ok(Ast::const_bool(false)),
            TokenKind::Int(v) => Ok(Ast::const_int(v)),
            TokenKind::Number(v) => Ok(Ast::const_number(v)),
            TokenKind::Str(s) => Ok(Ast::const_str(s)),
            TokenKind::Color(r, g, b, a) => Ok(Ast::const_color(r, g, b, a)),
            TokenKind::Date(y, m, d) => Ok(Ast::const_date(y, m, d)),
            TokenKind::DateTime(y, mo, d, h, mi, s) => Ok(Ast::const_datetime(y, mo, d, h, mi, s)),
            TokenKind::Ident(name) => Ok(Ast::make_field_ref(None, name, &self.root)),
            TokenKind::LParen => {
                let inner = self.parse_ternary()?;
                self.expect(&TokenKind::RParen, "')'")?;
                Ok(inner)
            }
            TokenKind::LBracket => {
                let mut items = Vec::new();
                if !matches!(self.peek(), TokenKind::RBracket) {
                    loop {
                        items.push(self.parse_ternary()?);
                        match self.peek() {
                            TokenKind::Comma => {
                                self.bump();
                            }
                            _ => break,
                        }
                    }
                }
                self.expect(&TokenKind::RBracket, "']'")?;
                Ok(Ast::make_list(items))
            }
            TokenKind::LBrace => {
                if matches!(self.peek(), TokenKind::Slash) {
                    self.bump();
                    self.expect(&TokenKind::RBrace, "'}'")?;
                    return Ok(Ast::make_set(vec![]));
                }
                if matches!(self.peek(), TokenKind::RBrace) {
                    return Err(Error::unsupported_construct("'{}' is not a valid vSQL literal; use '{/}' for the empty set", span));
                }
                let mut items = Vec::new();
                loop {
                    items.push(self.parse_ternary()?);
                    match self.peek() {
                        TokenKind::Comma => {
                            self.bump();
                        }
                        _ => break,
                    }
                }
                self.expect(&TokenKind::RBrace, "'}'")?;
                Ok(Ast::make_set(items))
            }
            other => Err(Error::unsupported_construct(other.describe(), span)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::datatype::DataType;
    use crate::registry::default_backend;

    fn env() -> HashMap<String, Field> {
        let records = Group::table("dat_record t");
        records.insert(
            Field::new("v_parent", DataType::Int, "dat_parent_id")
                .with_joinsql("{m}.dat_parent_id = {d}.dat_id(+)")
                .with_refgroup(Rc::clone(&records)),
        );
        records.insert(Field::new("v_name", DataType::Str, "dat_name"));
        let mut vars = HashMap::new();
        vars.insert("r".to_string(), Field::new("r", DataType::Int, "dat_id").with_refgroup(records));
        vars
    }

    #[test]
    fn test_parse_field_chain() {
        let registry = default_backend().unwrap();
        let vars = env();
        let ast = parse("r.v_parent.v_name", &registry, &vars).unwrap();
        assert_eq!(ast.datatype, Some(DataType::Str));
        assert_eq!(ast.error, None);
    }

    #[test]
    fn test_parse_binary_precedence() {
        let registry = default_backend().unwrap();
        let vars = HashMap::new();
        let ast = parse("1 + 2 * 3", &registry, &vars).unwrap();
        assert_eq!(ast.source(), "1 + 2 * 3");
    }

    #[test]
    fn test_parse_ternary() {
        let registry = default_backend().unwrap();
        let vars = HashMap::new();
        let ast = parse("1 if True else 2", &registry, &vars).unwrap();
        assert_eq!(ast.datatype, Some(DataType::Int));
    }

    #[test]
    fn test_unknown_field_is_compile_error_not_fatal() {
        let registry = default_backend().unwrap();
        let vars = HashMap::new();
        let ast = parse("does_not_exist", &registry, &vars).unwrap();
        assert!(ast.error.is_some());
    }

    #[test]
    fn test_keyword_argument_is_fatal() {
        let registry = default_backend().unwrap();
        let vars = HashMap::new();
        let err = parse("bool(x=1)", &registry, &vars);
        assert!(err.is_err());
    }

    #[test]
    fn test_empty_braces_rejected() {
        let registry = default_backend().unwrap();
        let vars = HashMap::new();
        assert!(parse("{}", &registry, &vars).is_err());
    }

    #[test]
    fn test_empty_set_literal() {
        let registry = default_backend().unwrap();
        let vars = HashMap::new();
        let ast = parse("{/}", &registry, &vars).unwrap();
        assert_eq!(ast.datatype, Some(DataType::NullSet));
    }

    #[test]
    fn test_function_vs_method_call() {
        let registry = default_backend().unwrap();
        let vars = env();
        let func = parse("bool(1)", &registry, &vars).unwrap();
        assert!(matches!(func.kind, NodeKind::Func { .. }));
        let meth = parse("r.v_name.lower()", &registry, &vars).unwrap();
        assert!(matches!(meth.kind, NodeKind::Meth { .. }));
    }
}
