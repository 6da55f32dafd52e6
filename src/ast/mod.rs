//! The typed vSQL AST (`spec.md` §4, §6.2).
//!
//! Every node is built through one of the `make_*` constructors, which
//! validate the node against a [`Registry`] at construction time and store
//! the result as `datatype`/`error` — an `Ast` is immutable once built
//! (`spec.md` §4.6, "validated at construction"). `content` holds the exact
//! vSQL surface syntax as literal fragments interleaved with indices into
//! `children`, so [`Ast::source`] can always reconstruct the expression that
//! produced a node, whether it came from the frontend's verbatim span
//! slicing or from a synthetic `make_*` call that had to invent
//! parenthesisation.
//!
//! `sqlsource` is the other rendering path: it walks the same tree but
//! produces parameterized Oracle SQL, consulting the `Registry`'s rule
//! tables for operator/function/method/attribute nodes (`examples/original_
//! source/src/ll/la/vsql.py`'s per-class `_sqlsource()` methods, lines
//! 1298-2612) and a [`crate::query::Query`] for `FieldRef` join bookkeeping.

use std::rc::Rc;

use crate::datatype::{CompileError, DataType};
use crate::op::{BinaryOp, UnaryOp, SLICE_PRECEDENCE, TERNARY_PRECEDENCE};
use crate::query::Query;
use crate::registry::Registry;
use crate::rule::render_template;
use crate::schema::{Field, Group};

/// One literal vSQL source fragment, or a reference into `Ast::children`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContentToken {
    Source(String),
    Child(usize),
}

/// The tag plus kind-specific scalar payload of a node. Child nodes
/// themselves always live in `Ast::children`, in the order each variant's
/// doc comment states.
#[derive(Debug, Clone)]
pub enum NodeKind {
    ConstNone,
    ConstBool(bool),
    ConstInt(i64),
    ConstNumber(f64),
    ConstStr(String),
    ConstClob(String),
    /// Packed `(r<<24)+(g<<16)+(b<<8)+a`.
    ConstColor(u32),
    ConstDate {
        year: i32,
        month: u32,
        day: u32,
    },
    ConstDateTime {
        year: i32,
        month: u32,
        day: u32,
        hour: u32,
        minute: u32,
        second: u32,
    },
    /// children: items.
    List,
    /// children: items.
    Set,
    /// children: `[parent]` or `[]` for a root reference.
    FieldRef {
        identifier: String,
        field: Option<Field>,
    },
    /// children: `[obj]`.
    Attr {
        name: String,
    },
    /// children: args.
    Func {
        name: String,
    },
    /// children: `[obj, ..args]`.
    Meth {
        name: String,
    },
    /// children: `[obj]`.
    Unary(UnaryOp),
    /// children: `[obj1, obj2]`.
    Binary(BinaryOp),
    /// children: `[objif, objcond, objelse]`.
    If,
    /// children: `[obj, index1, index2]`; bounds are always present, a
    /// missing bound is a `ConstNone` leaf (`spec.md` §4.2.4, "Slice").
    Slice,
}

/// A validated vSQL expression node (`spec.md` §4).
#[derive(Debug, Clone)]
pub struct Ast {
    pub kind: NodeKind,
    pub content: Vec<ContentToken>,
    pub children: Vec<Rc<Ast>>,
    pub datatype: Option<DataType>,
    pub error: Option<CompileError>,
}

/// Precedence used to decide whether a child needs parenthesising when this
/// crate invents surface syntax (`make_*`, as opposed to the frontend's
/// verbatim span slicing). Atomic node kinds never need wrapping.
fn node_precedence(kind: &NodeKind) -> u8 {
    match kind {
        NodeKind::Binary(op) => op.precedence(),
        NodeKind::Unary(op) => op.precedence(),
        NodeKind::If => TERNARY_PRECEDENCE,
        NodeKind::Slice => SLICE_PRECEDENCE,
        _ => u8::MAX,
    }
}

fn child_content(idx: usize, wrap: bool) -> Vec<ContentToken> {
    if wrap {
        vec![
            ContentToken::Source("(".to_string()),
            ContentToken::Child(idx),
            ContentToken::Source(")".to_string()),
        ]
    } else {
        vec![ContentToken::Child(idx)]
    }
}

fn sql_string_literal(s: &str) -> String {
    format!("'{}'", s.replace('\'', "''"))
}

impl Ast {
    /// Reconstruct the exact vSQL surface syntax this node was built from.
    pub fn source(&self) -> String {
        let mut out = String::new();
        for tok in &self.content {
            match tok {
                ContentToken::Source(s) => out.push_str(s),
                ContentToken::Child(i) => out.push_str(&self.children[*i].source()),
            }
        }
        out
    }

    pub fn children(&self) -> &[Rc<Ast>] {
        &self.children
    }

    /// Collect every `FieldRef` node reachable from this one, for `Query`
    /// registration (`examples/original_source/src/ll/la/vsql.py`'s
    /// `fieldrefs()` generator, lines ~1820-1840).
    pub fn fieldrefs(self: &Rc<Ast>) -> Vec<Rc<Ast>> {
        let mut out = Vec::new();
        Self::collect_fieldrefs(self, &mut out);
        out
    }

    fn collect_fieldrefs(node: &Rc<Ast>, out: &mut Vec<Rc<Ast>>) {
        if matches!(node.kind, NodeKind::FieldRef { .. }) {
            out.push(Rc::clone(node));
        }
        for child in &node.children {
            Self::collect_fieldrefs(child, out);
        }
    }

    fn has_error(children: &[Rc<Ast>]) -> bool {
        children.iter().any(|c| c.error.is_some())
    }

    fn operand_types(children: &[Rc<Ast>]) -> Vec<DataType> {
        children.iter().map(|c| c.datatype.expect("validated child has no error")).collect()
    }
}

// ---------------------------------------------------------------------
// Constants (`examples/original_source/src/ll/la/vsql.py` lines 1298-1530)
// ---------------------------------------------------------------------

impl Ast {
    pub fn const_none() -> Rc<Ast> {
        Rc::new(Ast {
            kind: NodeKind::ConstNone,
            content: vec![ContentToken::Source("null".to_string())],
            children: vec![],
            datatype: Some(DataType::Null),
            error: None,
        })
    }

    pub fn const_bool(value: bool) -> Rc<Ast> {
        Rc::new(Ast {
            kind: NodeKind::ConstBool(value),
            content: vec![ContentToken::Source(if value { "True".to_string() } else { "False".to_string() })],
            children: vec![],
            datatype: Some(DataType::Bool),
            error: None,
        })
    }

    pub fn const_int(value: i64) -> Rc<Ast> {
        Rc::new(Ast {
            kind: NodeKind::ConstInt(value),
            content: vec![ContentToken::Source(value.to_string())],
            children: vec![],
            datatype: Some(DataType::Int),
            error: None,
        })
    }

    pub fn const_number(value: f64) -> Rc<Ast> {
        Rc::new(Ast {
            kind: NodeKind::ConstNumber(value),
            content: vec![ContentToken::Source(value.to_string())],
            children: vec![],
            datatype: Some(DataType::Number),
            error: None,
        })
    }

    pub fn const_str(value: impl Into<String>) -> Rc<Ast> {
        let value = value.into();
        let source = format!("'{}'", value.replace('\\', "\\\\").replace('\'', "\\'"));
        Rc::new(Ast {
            kind: NodeKind::ConstStr(value),
            content: vec![ContentToken::Source(source)],
            children: vec![],
            datatype: Some(DataType::Str),
            error: None,
        })
    }

    pub fn const_clob(value: impl Into<String>) -> Rc<Ast> {
        let value = value.into();
        let source = format!("'{}'", value.replace('\\', "\\\\").replace('\'', "\\'"));
        Rc::new(Ast {
            kind: NodeKind::ConstClob(value),
            content: vec![ContentToken::Source(source)],
            children: vec![],
            datatype: Some(DataType::Clob),
            error: None,
        })
    }

    pub fn const_color(r: u8, g: u8, b: u8, a: u8) -> Rc<Ast> {
        let packed = ((r as u32) << 24) | ((g as u32) << 16) | ((b as u32) << 8) | (a as u32);
        Rc::new(Ast {
            kind: NodeKind::ConstColor(packed),
            content: vec![ContentToken::Source(format!("#{:02x}{:02x}{:02x}{:02x}", r, g, b, a))],
            children: vec![],
            datatype: Some(DataType::Color),
            error: None,
        })
    }

    pub fn const_date(year: i32, month: u32, day: u32) -> Rc<Ast> {
        Rc::new(Ast {
            kind: NodeKind::ConstDate { year, month, day },
            content: vec![ContentToken::Source(format!("@({:04}-{:02}-{:02})", year, month, day))],
            children: vec![],
            datatype: Some(DataType::Date),
            error: None,
        })
    }

    pub fn const_datetime(year: i32, month: u32, day: u32, hour: u32, minute: u32, second: u32) -> Rc<Ast> {
        Rc::new(Ast {
            kind: NodeKind::ConstDateTime {
                year,
                month,
                day,
                hour,
                minute,
                second,
            },
            content: vec![ContentToken::Source(format!(
                "@({:04}-{:02}-{:02} {:02}:{:02}:{:02})",
                year, month, day, hour, minute, second
            ))],
            children: vec![],
            datatype: Some(DataType::DateTime),
            error: None,
        })
    }
}

// ---------------------------------------------------------------------
// List / Set literals (`examples/original_source/src/ll/la/vsql.py`
// lines 1530-1739). Deviation: an empty items vector is `ListTypeUnknown`/
// `SetTypeUnknown`, distinct from a non-empty all-null items vector, which
// is `NullList`/`NullSet` with no error — see `DESIGN.md`.
// ---------------------------------------------------------------------

fn unify_seq_type(types: &[DataType], is_set: bool) -> std::result::Result<DataType, CompileError> {
    use DataType::*;
    let normalize = |t: DataType| if t == Bool { Int } else { t };
    let mut uniq: Vec<DataType> = Vec::new();
    for &t in types {
        let t = normalize(t);
        if !uniq.contains(&t) {
            uniq.push(t);
        }
    }
    if uniq.len() == 1 {
        let base = uniq[0];
        return if is_set {
            match base {
                Int => Ok(IntSet),
                Number => Ok(NumberSet),
                Str => Ok(StrSet),
                Date => Ok(DateSet),
                DateTime => Ok(DateTimeSet),
                _ => Err(CompileError::SetUnsupportedTypes),
            }
        } else {
            match base {
                Int => Ok(IntList),
                Number => Ok(NumberList),
                Str => Ok(StrList),
                Clob => Ok(ClobList),
                Date => Ok(DateList),
                DateTime => Ok(DateTimeList),
                _ => Err(CompileError::ListUnsupportedTypes),
            }
        };
    }
    if uniq.len() == 2 {
        if uniq.contains(&Int) && uniq.contains(&Number) {
            return Ok(if is_set { NumberSet } else { NumberList });
        }
        if !is_set && uniq.contains(&Str) && uniq.contains(&Clob) {
            return Ok(ClobList);
        }
    }
    Err(if is_set { CompileError::SetMixedTypes } else { CompileError::ListMixedTypes })
}

impl Ast {
    pub fn make_list(items: Vec<Rc<Ast>>) -> Rc<Ast> {
        Self::make_seq(items, false)
    }

    pub fn make_set(items: Vec<Rc<Ast>>) -> Rc<Ast> {
        Self::make_seq(items, true)
    }

    fn make_seq(items: Vec<Rc<Ast>>, is_set: bool) -> Rc<Ast> {
        let mut content = vec![ContentToken::Source(if is_set { "{".to_string() } else { "[".to_string() })];
        for (i, _) in items.iter().enumerate() {
            if i > 0 {
                content.push(ContentToken::Source(", ".to_string()));
            }
            content.push(ContentToken::Child(i));
        }
        content.push(ContentToken::Source(if is_set { "}".to_string() } else { "]".to_string() }));

        let (datatype, error) = if Self::has_error(&items) {
            (None, Some(CompileError::SubNodeError))
        } else if items.is_empty() {
            (None, Some(if is_set { CompileError::SetTypeUnknown } else { CompileError::ListTypeUnknown }))
        } else {
            let types = Self::operand_types(&items);
            if types.iter().all(|&t| t == DataType::Null) {
                (Some(if is_set { DataType::NullSet } else { DataType::NullList }), None)
            } else {
                let nonnull: Vec<DataType> = types.into_iter().filter(|&t| t != DataType::Null).collect();
                match unify_seq_type(&nonnull, is_set) {
                    Ok(dt) => (Some(dt), None),
                    Err(e) => (None, Some(e)),
                }
            }
        };

        Rc::new(Ast {
            kind: if is_set { NodeKind::Set } else { NodeKind::List },
            content,
            children: items,
            datatype,
            error,
        })
    }
}

// ---------------------------------------------------------------------
// FieldRef (`examples/original_source/src/ll/la/vsql.py`'s `FieldRefAST`,
// lines 1739-1871). Schema field-chain walking only — rule-table computed
// attributes (`.year`, `.r`, ...) are a disjoint node kind, `Attr`.
// ---------------------------------------------------------------------

impl Ast {
    pub fn make_field_ref(parent: Option<Rc<Ast>>, identifier: impl Into<String>, group: &Group) -> Rc<Ast> {
        let identifier = identifier.into();
        let field = group.get(&identifier);
        let source = match &parent {
            Some(_) => format!(".{}", identifier),
            None => identifier.clone(),
        };
        let (content, children) = match &parent {
            Some(p) => (
                vec![ContentToken::Child(0), ContentToken::Source(source)],
                vec![Rc::clone(p)],
            ),
            None => (vec![ContentToken::Source(source)], vec![]),
        };
        let parent_error = parent.as_ref().and_then(|p| p.error);
        let (datatype, error) = if let Some(e) = parent_error {
            (None, Some(e))
        } else {
            match &field {
                Some(f) => (Some(f.datatype), None),
                None => (None, Some(CompileError::Field)),
            }
        };
        Rc::new(Ast {
            kind: NodeKind::FieldRef { identifier, field },
            content,
            children,
            datatype,
            error,
        })
    }
}

// ---------------------------------------------------------------------
// Attr / Func / Meth (`examples/original_source/src/ll/la/vsql.py`'s
// `AttrAST`/`FuncAST`/`MethAST`, lines 2534-2852)
// ---------------------------------------------------------------------

impl Ast {
    pub fn make_attr(obj: Rc<Ast>, name: impl Into<String>, registry: &Registry) -> Rc<Ast> {
        let name = name.into();
        let wrap_obj = node_precedence(&obj.kind) < SLICE_PRECEDENCE;
        let mut content = child_content(0, wrap_obj);
        content.push(ContentToken::Source(format!(".{}", name)));

        let (datatype, error) = if Self::has_error(std::slice::from_ref(&obj)) {
            (None, Some(CompileError::SubNodeError))
        } else {
            match registry.validate_attr(obj.datatype.unwrap(), &name) {
                Ok((dt, _)) => (Some(dt), None),
                Err(e) => (None, Some(e)),
            }
        };

        Rc::new(Ast {
            kind: NodeKind::Attr { name },
            content,
            children: vec![obj],
            datatype,
            error,
        })
    }

    pub fn make_func(name: impl Into<String>, args: Vec<Rc<Ast>>, registry: &Registry) -> Rc<Ast> {
        let name = name.into();
        let mut content = vec![ContentToken::Source(format!("{}(", name))];
        for (i, _) in args.iter().enumerate() {
            if i > 0 {
                content.push(ContentToken::Source(", ".to_string()));
            }
            content.push(ContentToken::Child(i));
        }
        content.push(ContentToken::Source(")".to_string()));

        let (datatype, error) = if Self::has_error(&args) {
            (None, Some(CompileError::SubNodeError))
        } else {
            let types = Self::operand_types(&args);
            match registry.validate_function(&name, &types) {
                Ok((dt, _)) => (Some(dt), None),
                Err(e) => (None, Some(e)),
            }
        };

        Rc::new(Ast {
            kind: NodeKind::Func { name },
            content,
            children: args,
            datatype,
            error,
        })
    }

    pub fn make_meth(obj: Rc<Ast>, name: impl Into<String>, args: Vec<Rc<Ast>>, registry: &Registry) -> Rc<Ast> {
        let name = name.into();
        let wrap_obj = node_precedence(&obj.kind) < SLICE_PRECEDENCE;
        let mut content = child_content(0, wrap_obj);
        content.push(ContentToken::Source(format!(".{}(", name)));
        for (i, _) in args.iter().enumerate() {
            if i > 0 {
                content.push(ContentToken::Source(", ".to_string()));
            }
            content.push(ContentToken::Child(i + 1));
        }
        content.push(ContentToken::Source(")".to_string()));

        let mut all = vec![Rc::clone(&obj)];
        all.extend(args.iter().cloned());

        let (datatype, error) = if Self::has_error(&all) {
            (None, Some(CompileError::SubNodeError))
        } else {
            let arg_types = Self::operand_types(&args);
            match registry.validate_method(obj.datatype.unwrap(), &name, &arg_types) {
                Ok((dt, _)) => (Some(dt), None),
                Err(e) => (None, Some(e)),
            }
        };

        Rc::new(Ast {
            kind: NodeKind::Meth { name },
            content,
            children: all,
            datatype,
            error,
        })
    }
}

// ---------------------------------------------------------------------
// Operators (`examples/original_source/src/ll/la/vsql.py`'s `BinaryAST`/
// `UnaryAST` subclasses, lines 1871-2328)
// ---------------------------------------------------------------------

impl Ast {
    pub fn make_unary(op: UnaryOp, obj: Rc<Ast>, registry: &Registry) -> Rc<Ast> {
        let p = op.precedence();
        let wrap_obj = node_precedence(&obj.kind) <= p;
        let mut content = vec![ContentToken::Source(op.source_symbol().to_string())];
        content.extend(child_content(0, wrap_obj));

        let (datatype, error) = if Self::has_error(std::slice::from_ref(&obj)) {
            (None, Some(CompileError::SubNodeError))
        } else {
            match registry.validate_unary(op, obj.datatype.unwrap()) {
                Ok((dt, _)) => (Some(dt), None),
                Err(e) => (None, Some(e)),
            }
        };

        Rc::new(Ast {
            kind: NodeKind::Unary(op),
            content,
            children: vec![obj],
            datatype,
            error,
        })
    }

    pub fn make_binary(op: BinaryOp, obj1: Rc<Ast>, obj2: Rc<Ast>, registry: &Registry) -> Rc<Ast> {
        if op == BinaryOp::Item {
            return Self::make_item(obj1, obj2, registry);
        }
        let p = op.precedence();
        let wrap1 = node_precedence(&obj1.kind) < p;
        let wrap2 = node_precedence(&obj2.kind) <= p;
        let mut content = child_content(0, wrap1);
        content.push(ContentToken::Source(format!(" {} ", op.source_symbol())));
        content.extend(child_content(1, wrap2));

        let both = [Rc::clone(&obj1), Rc::clone(&obj2)];
        let (datatype, error) = if Self::has_error(&both) {
            (None, Some(CompileError::SubNodeError))
        } else {
            match registry.validate_binary(op, obj1.datatype.unwrap(), obj2.datatype.unwrap()) {
                Ok((dt, _)) => (Some(dt), None),
                Err(e) => (None, Some(e)),
            }
        };

        Rc::new(Ast {
            kind: NodeKind::Binary(op),
            content,
            children: vec![obj1, obj2],
            datatype,
            error,
        })
    }

    fn make_item(obj: Rc<Ast>, index: Rc<Ast>, registry: &Registry) -> Rc<Ast> {
        let wrap_obj = node_precedence(&obj.kind) < BinaryOp::Item.precedence();
        let mut content = child_content(0, wrap_obj);
        content.push(ContentToken::Source("[".to_string()));
        content.push(ContentToken::Child(1));
        content.push(ContentToken::Source("]".to_string()));

        let both = [Rc::clone(&obj), Rc::clone(&index)];
        let (datatype, error) = if Self::has_error(&both) {
            (None, Some(CompileError::SubNodeError))
        } else {
            match registry.validate_binary(BinaryOp::Item, obj.datatype.unwrap(), index.datatype.unwrap()) {
                Ok((dt, _)) => (Some(dt), None),
                Err(e) => (None, Some(e)),
            }
        };

        Rc::new(Ast {
            kind: NodeKind::Binary(BinaryOp::Item),
            content,
            children: vec![obj, index],
            datatype,
            error,
        })
    }

    /// `spec.md` §4.2.4's documented fix for a copy-paste bug in
    /// `IfAST.make` (`examples/original_source/src/ll/la/vsql.py` ~line
    /// 2354): `objelse` must be wrapped based on *its own* precedence, not
    /// `objcond`'s.
    pub fn make_if(objif: Rc<Ast>, objcond: Rc<Ast>, objelse: Rc<Ast>, registry: &Registry) -> Rc<Ast> {
        let p = TERNARY_PRECEDENCE;
        let wrap_if = node_precedence(&objif.kind) < p;
        let wrap_cond = node_precedence(&objcond.kind) < p;
        let wrap_else = node_precedence(&objelse.kind) <= p;
        let mut content = child_content(0, wrap_if);
        content.push(ContentToken::Source(" if ".to_string()));
        content.extend(child_content(1, wrap_cond));
        content.push(ContentToken::Source(" else ".to_string()));
        content.extend(child_content(2, wrap_else));

        let all = [Rc::clone(&objif), Rc::clone(&objcond), Rc::clone(&objelse)];
        let (datatype, error) = if Self::has_error(&all) {
            (None, Some(CompileError::SubNodeError))
        } else {
            match registry.validate_if(objif.datatype.unwrap(), objcond.datatype.unwrap(), objelse.datatype.unwrap()) {
                Ok((dt, _)) => (Some(dt), None),
                Err(e) => (None, Some(e)),
            }
        };

        Rc::new(Ast {
            kind: NodeKind::If,
            content,
            children: vec![objif, objcond, objelse],
            datatype,
            error,
        })
    }

    /// `spec.md` §4.2.4's documented fixes: `Slice` gets its own
    /// serialization tag (not `If`'s) and a straightforward
    /// `obj, index1, index2` children order (not the original's backwards
    /// conditional in `SliceAST.children()`). Missing bounds are `ConstNone`
    /// leaves, matching the original's `NoneAST("")` substitution.
    pub fn make_slice(obj: Rc<Ast>, index1: Option<Rc<Ast>>, index2: Option<Rc<Ast>>, registry: &Registry) -> Rc<Ast> {
        let index1 = index1.unwrap_or_else(Ast::const_none);
        let index2 = index2.unwrap_or_else(Ast::const_none);
        let wrap_obj = node_precedence(&obj.kind) < SLICE_PRECEDENCE;
        let mut content = child_content(0, wrap_obj);
        content.push(ContentToken::Source("[".to_string()));
        content.push(ContentToken::Child(1));
        content.push(ContentToken::Source(":".to_string()));
        content.push(ContentToken::Child(2));
        content.push(ContentToken::Source("]".to_string()));

        let all = [Rc::clone(&obj), Rc::clone(&index1), Rc::clone(&index2)];
        let (datatype, error) = if Self::has_error(&all) {
            (None, Some(CompileError::SubNodeError))
        } else {
            match registry.validate_slice(obj.datatype.unwrap(), index1.datatype.unwrap(), index2.datatype.unwrap()) {
                Ok((dt, _)) => (Some(dt), None),
                Err(e) => (None, Some(e)),
            }
        };

        Rc::new(Ast {
            kind: NodeKind::Slice,
            content,
            children: vec![obj, index1, index2],
            datatype,
            error,
        })
    }
}

// ---------------------------------------------------------------------
// SQL emission
// ---------------------------------------------------------------------

/// Per-datatype `(prefix, suffix)` wrapper for list/set literal emission
/// (`examples/original_source/src/ll/la/vsql.py`'s `_SeqAST.sqltypes`,
/// lines ~1560-1600).
fn seq_wrapper(dt: DataType) -> (&'static str, &'static str) {
    use DataType::*;
    match dt {
        IntList => ("integers(", ")"),
        NumberList => ("numbers(", ")"),
        StrList => ("varchars(", ")"),
        ClobList => ("clobs(", ")"),
        DateList => ("dates(", ")"),
        DateTimeList => ("datetimes(", ")"),
        IntSet => ("vsqlimpl_pkg.set_intlist(integers(", "))"),
        NumberSet => ("vsqlimpl_pkg.set_numberlist(numbers(", "))"),
        StrSet => ("vsqlimpl_pkg.set_strlist(varchars(", "))"),
        DateSet => ("vsqlimpl_pkg.set_datetimelist(dates(", "))"),
        DateTimeSet => ("vsqlimpl_pkg.set_datetimelist(datetimes(", "))"),
        _ => ("(", ")"),
    }
}

impl Ast {
    /// Render this node's SQL fragment. A node carrying an `error` (`spec.md`
    /// §4.6: "the compiler is intentionally total") never reaches a rule
    /// lookup or unwraps a child's `datatype` -- it renders as its bare
    /// source comment instead, same as the comment every valid node also
    /// carries (`spec.md` §8 property 2, and scenario 3/6's documented
    /// "still produces textual output bearing the `/* <source> */` comment").
    /// Since every error propagates upward as `SUBNODEERROR` (`spec.md`
    /// §4.2's validation step 1), a node with `error == None` is guaranteed
    /// to have only error-free children, so nothing past this guard needs to
    /// re-check for errors before unwrapping a child's `datatype`.
    pub fn sqlsource(&self, query: &mut Query) -> String {
        if self.error.is_some() {
            return format!("/* {} */", self.source());
        }
        match &self.kind {
            NodeKind::ConstNone => "null".to_string(),
            NodeKind::ConstBool(b) => if *b { "1" } else { "0" }.to_string(),
            NodeKind::ConstInt(i) => i.to_string(),
            NodeKind::ConstNumber(n) => n.to_string(),
            NodeKind::ConstStr(s) => sql_string_literal(s),
            NodeKind::ConstClob(s) => sql_string_literal(s),
            NodeKind::ConstColor(packed) => packed.to_string(),
            NodeKind::ConstDate { year, month, day } => {
                format!("to_date('{:04}-{:02}-{:02}', 'YYYY-MM-DD')", year, month, day)
            }
            NodeKind::ConstDateTime {
                year,
                month,
                day,
                hour,
                minute,
                second,
            } => format!(
                "to_date('{:04}-{:02}-{:02} {:02}:{:02}:{:02}', 'YYYY-MM-DD HH24:MI:SS')",
                year, month, day, hour, minute, second
            ),
            NodeKind::List | NodeKind::Set => {
                let dt = self.datatype.expect("error-free node always carries a datatype");
                if dt == DataType::NullList || dt == DataType::NullSet {
                    self.children.len().to_string()
                } else {
                    let (prefix, suffix) = seq_wrapper(dt);
                    let items: Vec<String> = self.children.iter().map(|c| c.sqlsource(query)).collect();
                    format!("{}{}{}", prefix, items.join(", "), suffix)
                }
            }
            NodeKind::FieldRef { .. } => query.register_field_ref(self),
            NodeKind::Attr { name } => {
                let obj = &self.children[0];
                let obj_sql = obj.sqlsource(query);
                let obj_type = obj.datatype.unwrap();
                Self::render_rule(query.registry(), query.registry().validate_attr(obj_type, name), &[obj_sql], &[obj_type])
            }
            NodeKind::Func { name } => {
                let arg_sql: Vec<String> = self.children.iter().map(|c| c.sqlsource(query)).collect();
                let arg_types: Vec<DataType> = self.children.iter().map(|c| c.datatype.unwrap()).collect();
                let lookup = query.registry().validate_function(name, &arg_types);
                Self::render_rule(query.registry(), lookup, &arg_sql, &arg_types)
            }
            NodeKind::Meth { name } => {
                let obj = &self.children[0];
                let obj_sql = obj.sqlsource(query);
                let arg_sql: Vec<String> = self.children[1..].iter().map(|c| c.sqlsource(query)).collect();
                let arg_types: Vec<DataType> = self.children[1..].iter().map(|c| c.datatype.unwrap()).collect();
                let mut sql = vec![obj_sql];
                sql.extend(arg_sql);
                let mut types = vec![obj.datatype.unwrap()];
                types.extend(arg_types.iter().copied());
                let lookup = query.registry().validate_method(obj.datatype.unwrap(), name, &arg_types);
                Self::render_rule(query.registry(), lookup, &sql, &types)
            }
            NodeKind::Unary(op) => {
                let obj = &self.children[0];
                let obj_sql = obj.sqlsource(query);
                let obj_type = obj.datatype.unwrap();
                let lookup = query.registry().validate_unary(*op, obj_type);
                Self::render_rule(query.registry(), lookup, &[obj_sql], &[obj_type])
            }
            NodeKind::Binary(op) => {
                let obj1_sql = self.children[0].sqlsource(query);
                let obj2_sql = self.children[1].sqlsource(query);
                let t1 = self.children[0].datatype.unwrap();
                let t2 = self.children[1].datatype.unwrap();
                let lookup = query.registry().validate_binary(*op, t1, t2);
                Self::render_rule(query.registry(), lookup, &[obj1_sql, obj2_sql], &[t1, t2])
            }
            NodeKind::If => {
                let objif_sql = self.children[0].sqlsource(query);
                let objcond_sql = self.children[1].sqlsource(query);
                let objelse_sql = self.children[2].sqlsource(query);
                let t1 = self.children[0].datatype.unwrap();
                let t2 = self.children[1].datatype.unwrap();
                let t3 = self.children[2].datatype.unwrap();
                let lookup = query.registry().validate_if(t1, t2, t3);
                Self::render_rule(query.registry(), lookup, &[objif_sql, objcond_sql, objelse_sql], &[t1, t2, t3])
            }
            NodeKind::Slice => {
                let obj_sql = self.children[0].sqlsource(query);
                let idx1_sql = self.children[1].sqlsource(query);
                let idx2_sql = self.children[2].sqlsource(query);
                let t1 = self.children[0].datatype.unwrap();
                let t2 = self.children[1].datatype.unwrap();
                let t3 = self.children[2].datatype.unwrap();
                let lookup = query.registry().validate_slice(t1, t2, t3);
                Self::render_rule(query.registry(), lookup, &[obj_sql, idx1_sql, idx2_sql], &[t1, t2, t3])
            }
        }
    }

    /// Re-run the rule lookup at emission time (construction already proved
    /// it succeeds whenever `error` is `None`) and render its template.
    fn render_rule(
        _registry: &Registry,
        lookup: std::result::Result<(DataType, &[crate::rule::TemplateToken]), CompileError>,
        operand_sql: &[String],
        operand_types: &[DataType],
    ) -> String {
        let (_, template) = lookup.expect("sqlsource called on a node with a compile error");
        render_template(template, operand_sql, operand_types)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::default_backend;

    #[test]
    fn test_const_int_roundtrip() {
        let ast = Ast::const_int(42);
        assert_eq!(ast.datatype, Some(DataType::Int));
        assert_eq!(ast.source(), "42");
    }

    #[test]
    fn test_binary_eq_infers_bool() {
        let registry = default_backend().unwrap();
        let ast = Ast::make_binary(BinaryOp::Eq, Ast::const_int(1), Ast::const_int(2), &registry);
        assert_eq!(ast.datatype, Some(DataType::Bool));
        assert_eq!(ast.source(), "1 == 2");
    }

    #[test]
    fn test_binary_parenthesizes_lower_precedence_child() {
        let registry = default_backend().unwrap();
        let inner = Ast::make_binary(BinaryOp::Add, Ast::const_int(1), Ast::const_int(2), &registry);
        let outer = Ast::make_binary(BinaryOp::Mul, inner, Ast::const_int(3), &registry);
        assert_eq!(outer.source(), "(1 + 2) * 3");
    }

    #[test]
    fn test_empty_list_is_type_unknown_error() {
        let ast = Ast::make_list(vec![]);
        assert_eq!(ast.error, Some(CompileError::ListTypeUnknown));
    }

    #[test]
    fn test_nonempty_all_null_list_has_no_error() {
        let ast = Ast::make_list(vec![Ast::const_none(), Ast::const_none()]);
        assert_eq!(ast.datatype, Some(DataType::NullList));
        assert_eq!(ast.error, None);
    }

    #[test]
    fn test_int_list_unifies() {
        let ast = Ast::make_list(vec![Ast::const_int(1), Ast::const_int(2)]);
        assert_eq!(ast.datatype, Some(DataType::IntList));
    }

    #[test]
    fn test_mixed_int_number_list_widens() {
        let ast = Ast::make_list(vec![Ast::const_int(1), Ast::const_number(2.5)]);
        assert_eq!(ast.datatype, Some(DataType::NumberList));
    }

    #[test]
    fn test_field_ref_unknown_identifier_is_field_error() {
        let group = Group::virtual_group();
        let ast = Ast::make_field_ref(None, "missing", &group);
        assert_eq!(ast.error, Some(CompileError::Field));
    }

    #[test]
    fn test_field_ref_resolves_known_identifier() {
        let group = Group::table("dat_record");
        group.insert(Field::new("v_title", DataType::Str, "dat_title"));
        let ast = Ast::make_field_ref(None, "v_title", &group);
        assert_eq!(ast.datatype, Some(DataType::Str));
        assert_eq!(ast.error, None);
    }

    #[test]
    fn test_sub_node_error_propagates() {
        let registry = default_backend().unwrap();
        let bad = Ast::make_field_ref(None, "missing", &Group::virtual_group());
        let ast = Ast::make_binary(BinaryOp::Add, bad, Ast::const_int(1), &registry);
        assert_eq!(ast.error, Some(CompileError::SubNodeError));
    }

    #[test]
    fn test_ternary_else_wraps_by_its_own_precedence() {
        let registry = default_backend().unwrap();
        let nested_else = Ast::make_if(Ast::const_int(1), Ast::const_bool(true), Ast::const_int(2), &registry);
        let outer = Ast::make_if(Ast::const_int(3), Ast::const_bool(false), nested_else, &registry);
        assert!(outer.source().ends_with("(1 if True else 2)"));
    }
}
