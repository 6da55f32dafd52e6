//! The query builder (`spec.md` §4.5, `examples/original_source/src/ll/la/
//! vsql.py`'s `Query` class, lines 492-697).
//!
//! A `Query` accumulates `SELECT`/`FROM`/`WHERE`/`ORDER BY` fragments as
//! vSQL expressions are added to it, auto-joining tables along the way:
//! every `FieldRef` registers its owning table (and the join predicate back
//! to its parent) the first time it is emitted, and is a no-op on every
//! later visit of the same dotted path (`_vsql_register`, §4.5).

use std::collections::HashMap;
use std::rc::Rc;

use crate::ast::{Ast, NodeKind};
use crate::error::Result;
use crate::frontend;
use crate::registry::Registry;
use crate::schema::Field;

/// `ORDER BY` direction suffix (`spec.md` §4.5 / the Python docstring
/// example at `vsql.py` lines 598-616).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
    Asc,
    Desc,
}

impl SortDirection {
    fn as_sql(self) -> &'static str {
        match self {
            SortDirection::Asc => "asc",
            SortDirection::Desc => "desc",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortNulls {
    First,
    Last,
}

impl SortNulls {
    fn as_sql(self) -> &'static str {
        match self {
            SortNulls::First => "first",
            SortNulls::Last => "last",
        }
    }
}

/// The backend function vSQL calls to look up a typed request parameter
/// (`spec.md` §4.4's `params.` special case). Named after
/// `livingapi_pkg.reqparam_<type>` in `original_source`, generalised to a
/// prefix since this crate isn't tied to one backend package name.
const PARAMS_FN_PREFIX: &str = "vsql_reqparam";

/// An insertion-ordered, dedup-by-key map, in lieu of pulling in an
/// `indexmap` dependency for the handful of entries a typical query has
/// (`spec.md` §4.5's "ordered dict ... for deduplication by textual
/// identity").
#[derive(Debug, Default)]
struct OrderedMap {
    entries: Vec<(String, Rc<Ast>)>,
}

impl OrderedMap {
    fn contains(&self, key: &str) -> bool {
        self.entries.iter().any(|(k, _)| k == key)
    }

    fn insert_if_absent(&mut self, key: String, origin: Rc<Ast>) {
        if !self.contains(&key) {
            self.entries.push((key, origin));
        }
    }

    fn len(&self) -> usize {
        self.entries.len()
    }

    fn iter(&self) -> impl Iterator<Item = &(String, Rc<Ast>)> {
        self.entries.iter()
    }

    fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Builds one SQL query out of vSQL expressions (`spec.md` §4.5).
pub struct Query<'r> {
    registry: &'r Registry,
    vars: HashMap<String, Field>,
    comment: Option<String>,
    select: OrderedMap,
    from: OrderedMap,
    where_: OrderedMap,
    orderby: Vec<(String, Rc<Ast>, Option<SortDirection>, Option<SortNulls>)>,
    identifier_aliases: HashMap<String, String>,
}

impl<'r> Query<'r> {
    pub fn new(registry: &'r Registry, vars: HashMap<String, Field>) -> Self {
        Self::with_comment(registry, vars, None::<String>)
    }

    pub fn with_comment(registry: &'r Registry, vars: HashMap<String, Field>, comment: Option<impl Into<String>>) -> Self {
        Self {
            registry,
            vars,
            comment: comment.map(Into::into),
            select: OrderedMap::default(),
            from: OrderedMap::default(),
            where_: OrderedMap::default(),
            orderby: Vec::new(),
            identifier_aliases: HashMap::new(),
        }
    }

    pub fn registry(&self) -> &Registry {
        self.registry
    }

    fn parse(&self, source: &str) -> Result<Rc<Ast>> {
        frontend::parse(source, self.registry, &self.vars)
    }

    /// Add one or more `SELECT` expressions. Parses each, walking its field
    /// references to populate `FROM`/`WHERE` as a side effect of emitting
    /// its SQL, then records the fragment (deduplicated by text).
    pub fn select(&mut self, exprs: &[&str]) -> Result<&mut Self> {
        for expr in exprs {
            let ast = self.parse(expr)?;
            let sql = ast.sqlsource(self);
            self.select.insert_if_absent(sql, ast);
        }
        Ok(self)
    }

    /// Add one or more `WHERE` predicates. Non-`bool` expressions are
    /// wrapped in `bool(...)` and `= 1` is appended, since Oracle has no
    /// native boolean (`spec.md` §4.5).
    pub fn where_expr(&mut self, exprs: &[&str]) -> Result<&mut Self> {
        for expr in exprs {
            let mut ast = self.parse(expr)?;
            if ast.datatype != Some(crate::datatype::DataType::Bool) {
                ast = Ast::make_func("bool", vec![ast], self.registry);
            }
            let mut sql = ast.sqlsource(self);
            sql.push_str(" = 1");
            self.where_.insert_if_absent(sql, ast);
        }
        Ok(self)
    }

    /// Add an `ORDER BY` entry. `spec.md` §4.5: entries render in call order.
    pub fn orderby(&mut self, expr: &str, direction: Option<SortDirection>, nulls: Option<SortNulls>) -> Result<&mut Self> {
        let ast = self.parse(expr)?;
        let sql = ast.sqlsource(self);
        self.orderby.push((sql, ast, direction, nulls));
        Ok(self)
    }

    /// The join-registration algorithm (`_vsql_register`, `spec.md` §4.5
    /// steps 1-7). Registers `fieldref`'s *parent* table and returns the
    /// alias `fieldref` itself should be accessed through (`None` for a
    /// root reference or a reference into a table-less group).
    fn vsql_register(&mut self, fieldref: &Ast) -> Option<String> {
        if fieldref.error.is_some() {
            return None;
        }
        let parent = fieldref.children().first()?.clone();
        let identifier = Self::full_identifier(&parent);
        if let Some(alias) = self.identifier_aliases.get(&identifier) {
            return Some(alias.clone());
        }
        let grandparent_alias = self.vsql_register(&parent);

        let newalias = format!("t{}", self.from.len() + 1);
        let parent_field = match &parent.kind {
            NodeKind::FieldRef { field, .. } => field.clone().expect("a FieldRef used as a parent always resolved"),
            _ => unreachable!("FieldRef parent is always a FieldRef"),
        };

        if let Some(joincond) = &parent_field.joinsql {
            let mut cond = joincond.clone();
            if let Some(a) = &grandparent_alias {
                cond = cond.replace("{m}", a);
            }
            cond = cond.replace("{d}", &newalias);
            self.where_.insert_if_absent(cond, Rc::clone(&parent));
        }

        let refgroup = parent_field.refgroup.as_ref()?;
        if !refgroup.has_tablesql() {
            return None;
        }

        self.identifier_aliases.insert(identifier, newalias.clone());
        self.from.insert_if_absent(format!("{} {}", refgroup.tablesql.as_ref().unwrap(), newalias), Rc::clone(&parent));
        Some(newalias)
    }

    fn full_identifier(node: &Ast) -> String {
        match &node.kind {
            NodeKind::FieldRef { identifier, .. } => match node.children().first() {
                Some(parent) => format!("{}.{}", Self::full_identifier(parent), identifier),
                None => identifier.clone(),
            },
            _ => unreachable!("full_identifier called on a non-FieldRef"),
        }
    }

    /// Renders a `FieldRef` node's SQL fragment, including its join
    /// registration as a side effect (`spec.md` §4.4). Called from
    /// [`Ast::sqlsource`], which never reaches this for a node carrying an
    /// error -- so `node.kind`'s `field` is always `Some` here (`make_field_ref`,
    /// `ast/mod.rs`, only leaves it `None` together with `error = Some(Field)`).
    pub fn register_field_ref(&mut self, node: &Ast) -> String {
        let (identifier, field) = match &node.kind {
            NodeKind::FieldRef { identifier, field } => (identifier.clone(), field.clone()),
            _ => unreachable!("register_field_ref called on a non-FieldRef"),
        };
        let alias = self.vsql_register(node);
        let comment = format!(" /* {} */", node.source());

        let full_identifier = Self::full_identifier(node);
        if full_identifier.starts_with("params.") {
            let parent_identifier = match &node.children()[0].kind {
                NodeKind::FieldRef { identifier, .. } => identifier.clone(),
                _ => unreachable!(),
            };
            return format!("{}_{}('{}'){}", PARAMS_FN_PREFIX, parent_identifier, identifier, comment);
        }

        let field = field.expect("Ast::sqlsource never reaches a broken FieldRef");
        // Wildcard fields (`spec.md` §4.2.2 / testable property 4) may carry
        // a `{leaf}` placeholder for the user-supplied identifier; ordinary
        // fields leave it absent and the substitution is a no-op.
        let rendered = field.fieldsql.replace("{leaf}", &identifier);
        let rendered = match &alias {
            Some(a) => format!("{}.{}", a, rendered),
            None => rendered,
        };
        format!("{}{}", rendered, comment)
    }

    /// Render the accumulated query as SQL text (`spec.md` §4.5,
    /// `vsql.py`'s `Query.sqlsource`, lines 623-697).
    pub fn sqlsource(&self, indent: &str) -> String {
        enum Tok {
            Text(String),
            NewLine,
            Indent(i32),
        }
        let mut toks = Vec::new();
        let a = |toks: &mut Vec<Tok>, s: &str| toks.push(Tok::Text(s.to_string()));
        let nl = |toks: &mut Vec<Tok>| toks.push(Tok::NewLine);
        let lvl = |toks: &mut Vec<Tok>, d: i32| toks.push(Tok::Indent(d));

        // Emits `fragment`, followed by the `/* <expr.source()> */` comment
        // unless `fragment` already ends with it (`vsql.py`'s `s()` helper).
        let emit = |toks: &mut Vec<Tok>, fragment: &str, expr: &Rc<Ast>| {
            toks.push(Tok::Text(fragment.to_string()));
            let comment = format!(" /* {} */", expr.source());
            if !fragment.ends_with(&comment) {
                toks.push(Tok::Text(comment));
            }
        };

        if let Some(comment) = &self.comment {
            a(&mut toks, "/* ");
            a(&mut toks, comment);
            a(&mut toks, " */");
            nl(&mut toks);
        }

        a(&mut toks, "select");
        nl(&mut toks);
        lvl(&mut toks, 1);
        if self.select.is_empty() {
            a(&mut toks, "42");
        } else {
            for (i, (field, expr)) in self.select.iter().enumerate() {
                if i > 0 {
                    a(&mut toks, ",");
                    nl(&mut toks);
                }
                emit(&mut toks, field, expr);
            }
        }
        lvl(&mut toks, -1);
        nl(&mut toks);

        a(&mut toks, "from");
        nl(&mut toks);
        lvl(&mut toks, 1);
        if self.from.is_empty() {
            a(&mut toks, "dual");
            lvl(&mut toks, -1);
        } else {
            for (i, (table, expr)) in self.from.iter().enumerate() {
                if i > 0 {
                    a(&mut toks, ",");
                    nl(&mut toks);
                }
                emit(&mut toks, table, expr);
            }
            lvl(&mut toks, -1);
        }

        if !self.where_.is_empty() {
            nl(&mut toks);
            a(&mut toks, "where");
            nl(&mut toks);
            lvl(&mut toks, 1);
            for (i, (cond, expr)) in self.where_.iter().enumerate() {
                if i > 0 {
                    a(&mut toks, " and");
                    nl(&mut toks);
                }
                emit(&mut toks, cond, expr);
            }
            lvl(&mut toks, -1);
        }

        if !self.orderby.is_empty() {
            nl(&mut toks);
            a(&mut toks, "order by");
            nl(&mut toks);
            lvl(&mut toks, 1);
            for (i, (sql, expr, direction, nulls)) in self.orderby.iter().enumerate() {
                if i > 0 {
                    a(&mut toks, ",");
                    nl(&mut toks);
                }
                emit(&mut toks, sql, expr);
                if let Some(d) = direction {
                    a(&mut toks, " ");
                    a(&mut toks, d.as_sql());
                }
                if let Some(n) = nulls {
                    a(&mut toks, " nulls ");
                    a(&mut toks, n.as_sql());
                }
            }
            lvl(&mut toks, -1);
        }

        let mut out = String::new();
        let mut level: i32 = 0;
        let mut first = true;
        for tok in &toks {
            match tok {
                Tok::NewLine => {
                    if !indent.is_empty() {
                        out.push('\n');
                        first = true;
                    }
                }
                Tok::Indent(d) => level += d,
                Tok::Text(s) => {
                    if first {
                        if !indent.is_empty() {
                            out.push_str(&indent.repeat(level.max(0) as usize));
                        } else {
                            out.push(' ');
                        }
                    }
                    out.push_str(s);
                    first = false;
                }
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::datatype::DataType;
    use crate::registry::default_backend;
    use crate::schema::Group;

    fn identity_vars() -> HashMap<String, Field> {
        let identity = Group::table("identity");
        identity.insert(Field::new("v_email", DataType::Str, "ide_account"));
        identity.insert(Field::new("v_firstname", DataType::Str, "ide_firstname"));
        identity.insert(Field::new("v_surname", DataType::Str, "ide_surname"));
        let mut vars = HashMap::new();
        vars.insert(
            "user".to_string(),
            Field::new("user", DataType::Int, "ide_id")
                .with_joinsql("vsql_global_user = {d}.ide_id(+)")
                .with_refgroup(identity),
        );
        vars
    }

    #[test]
    fn test_trivial_select_joins_and_orders() {
        let registry = default_backend().unwrap();
        let vars = identity_vars();
        let mut q = Query::with_comment(&registry, vars, Some("Example query"));
        q.select(&["user.v_email"]).unwrap();
        q.orderby("user.v_firstname", Some(SortDirection::Asc), None).unwrap();
        q.orderby("user.v_surname", Some(SortDirection::Desc), None).unwrap();
        let sql = q.sqlsource("\t");
        assert!(sql.contains("t1.ide_account /* user.v_email */"));
        assert!(sql.contains("identity t1 /* user */"));
        assert!(sql.contains("vsql_global_user = t1.ide_id(+) /* user */"));
        assert!(sql.contains("t1.ide_firstname /* user.v_firstname */ asc"));
        assert!(sql.contains("t1.ide_surname /* user.v_surname */ desc"));
    }

    #[test]
    fn test_single_table_is_registered_once() {
        let registry = default_backend().unwrap();
        let vars = identity_vars();
        let mut q = Query::new(&registry, vars);
        q.select(&["user.v_email", "user.v_firstname"]).unwrap();
        let sql = q.sqlsource("\t");
        assert_eq!(sql.matches("identity t1").count(), 1);
    }

    #[test]
    fn test_empty_query_uses_dual_and_placeholder() {
        let registry = default_backend().unwrap();
        let q = Query::new(&registry, HashMap::new());
        let sql = q.sqlsource("\t");
        assert!(sql.contains("42"));
        assert!(sql.contains("dual"));
    }

    #[test]
    fn test_where_coerces_non_bool_to_oracle_integer_boolean() {
        let registry = default_backend().unwrap();
        let mut q = Query::new(&registry, HashMap::new());
        q.where_expr(&["1"]).unwrap();
        let sql = q.sqlsource("\t");
        assert!(sql.contains("= 1"));
    }
}
