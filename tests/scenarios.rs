//! End-to-end scenarios from `spec.md` §8's "End-to-end scenarios" table,
//! run against the public crate surface. SQL-bearing scenarios are checked
//! with `insta` inline snapshots (the pack's convention for "render text,
//! compare to golden" assertions); the others assert directly on the
//! `CompileError`/`DataType` the scenario names.

use std::collections::HashMap;
use std::rc::Rc;

use vsql::datatype::CompileError;
use vsql::datatype::DataType;
use vsql::frontend::parse;
use vsql::query::{Query, SortDirection};
use vsql::registry::default_backend;
use vsql::schema::{Field, Group, GroupBuilder};

fn identity_vars() -> HashMap<String, Field> {
    let identity = GroupBuilder::new()
        .table("identity")
        .field(Field::new("v_email", DataType::Str, "ide_account"))
        .field(Field::new("v_firstname", DataType::Str, "ide_firstname"))
        .field(Field::new("v_surname", DataType::Str, "ide_surname"))
        .build();
    let mut vars = HashMap::new();
    vars.insert(
        "user".to_string(),
        Field::new("user", DataType::Int, "ide_id")
            .with_joinsql("vsql_global_user = {d}.ide_id(+)")
            .with_refgroup(identity),
    );
    vars
}

/// Scenario 1: trivial select, joined once through a `vsqlfield()`-style
/// root field, ordered ascending then descending.
#[test]
fn scenario_1_trivial_select() {
    let registry = default_backend().unwrap();
    let mut q = Query::with_comment(&registry, identity_vars(), Some("Ex"));
    q.select(&["user.v_email"]).unwrap();
    q.orderby("user.v_firstname", Some(SortDirection::Asc), None).unwrap();
    q.orderby("user.v_surname", Some(SortDirection::Desc), None).unwrap();
    let sql = q.sqlsource("\t");
    insta::assert_snapshot!(sql, @r###"
    /* Ex */
    select
    	t1.ide_account /* user.v_email */
    from
    	identity t1 /* user */
    where
    	vsql_global_user = t1.ide_id(+) /* user */
    order by
    	t1.ide_firstname /* user.v_firstname */ asc,
    	t1.ide_surname /* user.v_surname */ desc
    "###);
}

fn bool_field_vars() -> HashMap<String, Field> {
    let app = GroupBuilder::new()
        .field(Field::new("p_bool_none", DataType::Bool, "val_bool_none"))
        .build();
    let mut vars = HashMap::new();
    vars.insert("app".to_string(), Field::new("app", DataType::Int, "app_id").with_refgroup(app));
    vars
}

/// Scenario 2: equality with `None` type-checks to `bool` and lowers to an
/// Oracle `case when ... is null then 1 else 0 end` form.
#[test]
fn scenario_2_equality_with_null() {
    let registry = default_backend().unwrap();
    let vars = bool_field_vars();
    let ast = parse("app.p_bool_none == None", &registry, &vars).unwrap();
    assert_eq!(ast.datatype, Some(DataType::Bool));
    assert!(ast.error.is_none());

    let mut q = Query::new(&registry, vars);
    let sql = ast.sqlsource(&mut q);
    assert!(sql.contains("case when"));
    assert!(sql.contains("is null"));
}

/// Scenario 3: a mixed-type list is a non-fatal, AST-attached error, and
/// still renders a source comment even though it never resolves to a SQL
/// value.
#[test]
fn scenario_3_mixed_type_list_rejected() {
    let registry = default_backend().unwrap();
    let vars = HashMap::new();
    let ast = parse("[1, 'x']", &registry, &vars).unwrap();
    assert_eq!(ast.error, Some(CompileError::ListMixedTypes));
    assert_eq!(ast.datatype, None);
    assert_eq!(ast.source(), "[1, 'x']");

    let mut q = Query::new(&registry, HashMap::new());
    assert_eq!(ast.sqlsource(&mut q), "/* [1, 'x'] */");
}

/// Scenario 4: a known rule-table function (`int`) coerces a string
/// argument and the comparison type-checks to `bool`.
#[test]
fn scenario_4_string_to_int_coercion() {
    let registry = default_backend().unwrap();
    let vars = HashMap::new();
    let ast = parse("int('42') == 42", &registry, &vars).unwrap();
    assert_eq!(ast.datatype, Some(DataType::Bool));
    assert!(ast.error.is_none());

    let mut q = Query::new(&registry, HashMap::new());
    let sql = ast.sqlsource(&mut q);
    assert!(sql.contains("int"));
    assert!(sql.contains("'42'"));
}

/// Scenario 5: a self-referential group auto-joins twice, assigning
/// sequential `t1`/`t2` aliases and a parent-join predicate between them.
#[test]
fn scenario_5_auto_join_through_applookup() {
    let registry = default_backend().unwrap();
    let records = Group::table("dat_record");
    records.insert(
        Field::new("v_parent", DataType::Int, "dat_parent_id")
            .with_joinsql("{m}.dat_parent_id = {d}.dat_id(+)")
            .with_refgroup(Rc::clone(&records)),
    );
    records.insert(Field::new("v_name", DataType::Str, "dat_name"));

    let mut vars = HashMap::new();
    vars.insert(
        "r".to_string(),
        Field::new("r", DataType::Int, "dat_id").with_refgroup(records),
    );

    let mut q = Query::new(&registry, vars);
    q.where_expr(&["r.v_parent.v_name == 'Science'"]).unwrap();
    let sql = q.sqlsource("\t");
    assert!(sql.contains("dat_record t1"));
    assert!(sql.contains("dat_record t2"));
    assert!(sql.contains("t1.dat_parent_id = t2.dat_id(+)"));
    assert!(sql.contains("t2.dat_name"));
}

/// Scenario 6: an unknown field produces `SUBNODEERROR` on the outer `+`
/// node and `FIELD` on the inner `FieldRef`, and never registers a table.
#[test]
fn scenario_6_unknown_field_diagnostic() {
    let registry = default_backend().unwrap();
    let records = GroupBuilder::new().table("dat_record").build();
    let mut vars = HashMap::new();
    vars.insert("r".to_string(), Field::new("r", DataType::Int, "dat_id").with_refgroup(records));

    let ast = parse("r.v_does_not_exist + 1", &registry, &vars).unwrap();
    assert_eq!(ast.error, Some(CompileError::SubNodeError));
    assert_eq!(ast.datatype, None);

    let fieldref = &ast.children()[0];
    assert_eq!(fieldref.error, Some(CompileError::Field));

    let mut q = Query::new(&registry, vars);
    assert_eq!(ast.sqlsource(&mut q), "/* r.v_does_not_exist + 1 */");
    assert!(!q.sqlsource("\t").contains("dat_record"));
}
