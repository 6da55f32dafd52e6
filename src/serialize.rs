//! AST serialisation and rule-table DDL regeneration (`spec.md` §6.2, §9).
//!
//! Two independent pure functions live here, both over already-built,
//! frozen state (no I/O, per `spec.md` §1):
//!
//! - [`serialize`] turns a validated [`crate::ast::Ast`] into the tagged-
//!   tuple shape `spec.md` §6.2 specifies (`nodetype, nodevalue,
//!   result_datatype, error_kind, source_range` per node, children in
//!   visit order), derived via `serde::Serialize` so it round-trips through
//!   `serde_json` without a hand-rolled writer. `source_range` is rendered
//!   as the node's own reconstructed source text (`Ast::source`) rather
//!   than an absolute byte offset pair: this crate's `Ast` doesn't carry
//!   input-buffer spans (see `DESIGN.md`), so the node's own source slice
//!   is the faithful analogue of "the range of source text this node
//!   covers" available from the data the AST already holds.
//! - [`rule_table_ddl`] walks a frozen [`crate::registry::Registry`] and
//!   renders (a) a `CREATE TABLE`-shaped description of the rule schema and
//!   (b) one `INSERT`-shaped row per registered rule, mirroring
//!   `examples/original_source/src/ll/la/vsql.py`'s `VSQLRULE` table this
//!   crate's rule registry is the in-memory analogue of.

use serde::Serialize;
use std::rc::Rc;

use crate::ast::{Ast, NodeKind};
use crate::datatype::DataType;
use crate::registry::Registry;
use crate::rule::template_string;

/// One node of a serialised [`Ast`] tree (`spec.md` §6.2).
#[derive(Debug, Clone, Serialize)]
pub struct SerializedNode {
    pub nodetype: &'static str,
    pub nodevalue: String,
    pub datatype: Option<&'static str>,
    pub error: Option<String>,
    pub source_range: String,
    pub children: Vec<SerializedNode>,
}

fn nodetype_tag(kind: &NodeKind) -> &'static str {
    match kind {
        NodeKind::ConstNone => "const_none",
        NodeKind::ConstBool(_) => "const_bool",
        NodeKind::ConstInt(_) => "const_int",
        NodeKind::ConstNumber(_) => "const_number",
        NodeKind::ConstStr(_) => "const_str",
        NodeKind::ConstClob(_) => "const_clob",
        NodeKind::ConstColor(_) => "const_color",
        NodeKind::ConstDate { .. } => "const_date",
        NodeKind::ConstDateTime { .. } => "const_datetime",
        NodeKind::List => "list",
        NodeKind::Set => "set",
        NodeKind::FieldRef { .. } => "fieldref",
        NodeKind::Attr { .. } => "attr",
        NodeKind::Func { .. } => "func",
        NodeKind::Meth { .. } => "meth",
        NodeKind::Unary(_) => "unary",
        NodeKind::Binary(_) => "binary",
        NodeKind::If => "if",
        // Distinct from `If`'s tag, per `spec.md` §9's documented fix for
        // `original_source`'s shared-tag bug.
        NodeKind::Slice => "slice",
    }
}

/// The short textual specifier `spec.md` §3 calls `nodevalue`: an attribute
/// name, function/method name, operator symbol, field identifier, or
/// literal value, depending on node kind.
fn nodevalue(kind: &NodeKind) -> String {
    match kind {
        NodeKind::ConstNone => String::new(),
        NodeKind::ConstBool(b) => b.to_string(),
        NodeKind::ConstInt(i) => i.to_string(),
        NodeKind::ConstNumber(n) => n.to_string(),
        NodeKind::ConstStr(s) => s.clone(),
        NodeKind::ConstClob(s) => s.clone(),
        NodeKind::ConstColor(packed) => format!("{:08x}", packed),
        NodeKind::ConstDate { year, month, day } => format!("{:04}-{:02}-{:02}", year, month, day),
        NodeKind::ConstDateTime {
            year,
            month,
            day,
            hour,
            minute,
            second,
        } => format!("{:04}-{:02}-{:02} {:02}:{:02}:{:02}", year, month, day, hour, minute, second),
        NodeKind::List | NodeKind::Set | NodeKind::If | NodeKind::Slice => String::new(),
        NodeKind::FieldRef { identifier, .. } => identifier.clone(),
        NodeKind::Attr { name } => name.clone(),
        NodeKind::Func { name } => name.clone(),
        NodeKind::Meth { name } => name.clone(),
        NodeKind::Unary(op) => op.source_symbol().to_string(),
        NodeKind::Binary(op) => op.source_symbol().to_string(),
    }
}

/// Serialise one `Ast` node and its subtree (`spec.md` §6.2).
pub fn serialize(node: &Rc<Ast>) -> SerializedNode {
    SerializedNode {
        nodetype: nodetype_tag(&node.kind),
        nodevalue: nodevalue(&node.kind),
        datatype: node.datatype.map(|d| d.name()),
        error: node.error.map(|e| e.to_string()),
        source_range: node.source(),
        children: node.children().iter().map(serialize).collect(),
    }
}

/// Serialise an `Ast` tree to the JSON form of [`serialize`]'s tagged-tuple
/// shape (`spec.md` §6.2).
pub fn serialize_json(node: &Rc<Ast>) -> serde_json::Result<String> {
    serde_json::to_string(&serialize(node))
}

/// The rule schema `spec.md` §6.2's companion DDL routine writes: one row
/// shape covering every node-kind family, since operators/functions/
/// methods/attributes differ only in which key columns they populate.
pub fn rule_table_create_ddl() -> String {
    "create table vsqlrule (\n\
     \tnodekind varchar2(20) not null,\n\
     \tname varchar2(100),\n\
     \treceiver varchar2(20),\n\
     \toperands varchar2(200),\n\
     \tresult varchar2(20) not null,\n\
     \ttemplate clob not null\n\
     )"
    .to_string()
}

fn operand_list(types: &[DataType]) -> String {
    types.iter().map(DataType::name).collect::<Vec<_>>().join(",")
}

fn insert_row(nodekind: &str, name: Option<&str>, receiver: Option<DataType>, operands: &[DataType], result: DataType, template: &str) -> String {
    format!(
        "insert into vsqlrule (nodekind, name, receiver, operands, result, template) values ({}, {}, {}, '{}', '{}', '{}');",
        sql_quote_opt(Some(nodekind)),
        sql_quote_opt(name),
        sql_quote_opt(receiver.map(|r| r.name())),
        operand_list(operands),
        result.name(),
        template.replace('\'', "''"),
    )
}

fn sql_quote_opt(value: Option<&str>) -> String {
    match value {
        Some(v) => format!("'{}'", v.replace('\'', "''")),
        None => "null".to_string(),
    }
}

/// Render every registered rule as an `INSERT`-shaped row, in the order the
/// registry's hash tables happen to yield them. Order is not meaningful
/// (rule rows have no inherent sequence, unlike `Query`'s `SELECT`/`FROM`/
/// `WHERE` state), so this routine makes no ordering guarantee across calls
/// with a different `Registry` value, only that every registered rule
/// appears exactly once.
pub fn rule_table_insert_ddl(registry: &Registry) -> Vec<String> {
    let mut rows = Vec::new();
    for (op, operands, rule) in registry.binary_rules() {
        rows.push(insert_row("binary", Some(&op.to_string()), None, operands, rule.result, &template_string(&rule.template)));
    }
    for (op, operands, rule) in registry.unary_rules() {
        rows.push(insert_row("unary", Some(&op.to_string()), None, operands, rule.result, &template_string(&rule.template)));
    }
    for (operands, rule) in registry.if_rules() {
        rows.push(insert_row("if", None, None, operands, rule.result, &template_string(&rule.template)));
    }
    for (operands, rule) in registry.slice_rules() {
        rows.push(insert_row("slice", None, None, operands, rule.result, &template_string(&rule.template)));
    }
    for (name, args, rule) in registry.function_rules() {
        rows.push(insert_row("func", Some(name), None, args, rule.result, &template_string(&rule.template)));
    }
    for (receiver, name, args, rule) in registry.method_rules() {
        rows.push(insert_row("meth", Some(name), Some(receiver), args, rule.result, &template_string(&rule.template)));
    }
    for (receiver, name, rule) in registry.attr_rules() {
        rows.push(insert_row("attr", Some(name), Some(receiver), &[], rule.result, &template_string(&rule.template)));
    }
    rows
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::default_backend;
    use std::collections::HashMap;

    #[test]
    fn test_serialize_const_int() {
        let node = Ast::const_int(42);
        let s = serialize(&node);
        assert_eq!(s.nodetype, "const_int");
        assert_eq!(s.nodevalue, "42");
        assert_eq!(s.datatype, Some("INT"));
        assert!(s.error.is_none());
        assert_eq!(s.source_range, "42");
        assert!(s.children.is_empty());
    }

    #[test]
    fn test_serialize_round_trips_through_json() {
        let node = Ast::const_bool(true);
        let json = serialize_json(&node).unwrap();
        assert!(json.contains("\"nodetype\":\"const_bool\""));
        assert!(json.contains("\"nodevalue\":\"true\""));
    }

    #[test]
    fn test_serialize_propagates_subnode_error() {
        let registry = default_backend().unwrap();
        let vars = HashMap::new();
        let ast = crate::frontend::parse("does_not_exist + 1", &registry, &vars).unwrap();
        let s = serialize(&ast);
        assert_eq!(s.error.as_deref(), Some("SUBNODEERROR"));
        assert!(s.children.iter().any(|c| c.error.as_deref() == Some("FIELD")));
    }

    #[test]
    fn test_ddl_emitter_covers_registered_rules() {
        let registry = default_backend().unwrap();
        let rows = rule_table_insert_ddl(&registry);
        assert!(!rows.is_empty());
        // the `BOOL <- INT == INT` rule registered by `register_comparisons`
        assert!(rows
            .iter()
            .any(|r| r.contains("vsqlimpl_pkg.eq_int_int") && r.contains("'INT,INT'") && r.contains("'BOOL'")));
        let create = rule_table_create_ddl();
        assert!(create.contains("create table vsqlrule"));
    }
}
