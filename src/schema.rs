//! The `Field`/`Group` schema model (`spec.md` §3 "Fields and Groups").
//!
//! A `Group` describes a table (or a virtual, table-less collection) and a
//! mapping from identifier to `Field`. A `Field` describes one named
//! variable and, when it is itself a group reference (`refgroup`), lets
//! attribute access keep walking. Groups can be mutually or
//! self-referential (e.g. a "parent record" field whose `refgroup` is the
//! very group it is declared on), so `Group` uses interior mutability to
//! let callers build the field map after the `Rc<Group>` the fields need to
//! close over already exists.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use crate::datatype::DataType;

/// The identifier that marks a wildcard field (`spec.md` §3 / §9,
/// `FieldKind::Wildcard`).
pub const WILDCARD: &str = "*";

/// A named vSQL variable backed by a column, or a virtual source.
#[derive(Debug, Clone)]
pub struct Field {
    /// Name as seen in vSQL source; `"*"` marks a wildcard entry.
    pub identifier: String,
    pub datatype: DataType,
    /// Bare column/expression fragment emitted for leaf access; the query
    /// builder prefixes it with `"<alias>."` itself (`spec.md` §4.4). A
    /// wildcard entry's `fieldsql` may contain a `{leaf}` placeholder,
    /// substituted with the caller's identifier at emission time.
    pub fieldsql: String,
    /// Fragment emitted into `WHERE` to join this field's owning table to
    /// its parent. `{m}` = master alias, `{d}` = detail alias.
    pub joinsql: Option<String>,
    /// The Group reached by walking attribute access from this field, or
    /// `None` if the field is a scalar leaf.
    pub refgroup: Option<Rc<Group>>,
}

impl Field {
    pub fn new(identifier: impl Into<String>, datatype: DataType, fieldsql: impl Into<String>) -> Self {
        Self {
            identifier: identifier.into(),
            datatype,
            fieldsql: fieldsql.into(),
            joinsql: None,
            refgroup: None,
        }
    }

    /// Mark this field as the wildcard entry of its owning group.
    pub fn wildcard(datatype: DataType, fieldsql: impl Into<String>) -> Self {
        Self::new(WILDCARD, datatype, fieldsql)
    }

    pub fn with_joinsql(mut self, joinsql: impl Into<String>) -> Self {
        self.joinsql = Some(joinsql.into());
        self
    }

    pub fn with_refgroup(mut self, group: Rc<Group>) -> Self {
        self.refgroup = Some(group);
        self
    }

    pub fn is_wildcard(&self) -> bool {
        self.identifier == WILDCARD
    }
}

/// A table (or a virtual group) reachable via attribute access.
#[derive(Debug)]
pub struct Group {
    /// Table expression, or `None` if the group is virtual (its fields are
    /// accessed as inline function calls and never produce a `FROM` entry).
    pub tablesql: Option<String>,
    fields: RefCell<HashMap<String, Field>>,
}

impl Group {
    /// A table-backed group.
    pub fn table(tablesql: impl Into<String>) -> Rc<Self> {
        Rc::new(Self {
            tablesql: Some(tablesql.into()),
            fields: RefCell::new(HashMap::new()),
        })
    }

    /// A virtual group with no backing table.
    pub fn virtual_group() -> Rc<Self> {
        Rc::new(Self {
            tablesql: None,
            fields: RefCell::new(HashMap::new()),
        })
    }

    /// Insert or replace a field. Takes `&self` (not `&mut self`) so a group
    /// can be wrapped in `Rc` first and then have fields added that close
    /// over that same `Rc` (self-referential groups).
    pub fn insert(&self, field: Field) {
        self.fields.borrow_mut().insert(field.identifier.clone(), field);
    }

    /// Resolve an identifier: exact match first, then the `"*"` wildcard
    /// entry (`spec.md` §4.2.2).
    pub fn get(&self, identifier: &str) -> Option<Field> {
        let fields = self.fields.borrow();
        fields
            .get(identifier)
            .or_else(|| fields.get(WILDCARD))
            .cloned()
    }

    pub fn has_tablesql(&self) -> bool {
        self.tablesql.is_some()
    }
}

/// Fluent builder for groups with no self/forward references, in the idiom
/// of the teacher's `TableSchemaBuilder`.
#[derive(Default)]
pub struct GroupBuilder {
    tablesql: Option<String>,
    fields: Vec<Field>,
}

impl GroupBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn table(mut self, tablesql: impl Into<String>) -> Self {
        self.tablesql = Some(tablesql.into());
        self
    }

    pub fn field(mut self, field: Field) -> Self {
        self.fields.push(field);
        self
    }

    pub fn build(self) -> Rc<Group> {
        let group = Rc::new(Group {
            tablesql: self.tablesql,
            fields: RefCell::new(HashMap::new()),
        });
        for field in self.fields {
            group.insert(field);
        }
        group
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wildcard_fallback() {
        let group = Group::table("params");
        group.insert(Field::wildcard(DataType::Str, "val_{leaf}"));
        let resolved = group.get("anything").unwrap();
        assert!(resolved.is_wildcard());
        assert_eq!(resolved.identifier, WILDCARD);
    }

    #[test]
    fn test_exact_match_preferred_over_wildcard() {
        let group = Group::table("params");
        group.insert(Field::wildcard(DataType::Str, "val_{leaf}"));
        group.insert(Field::new("known", DataType::Int, "known_int"));
        let resolved = group.get("known").unwrap();
        assert!(!resolved.is_wildcard());
    }

    #[test]
    fn test_self_referential_group() {
        let records = Group::table("dat_record");
        records.insert(
            Field::new("v_parent", DataType::Int, "dat_parent_id")
                .with_joinsql("{m}.dat_parent_id = {d}.dat_id(+)")
                .with_refgroup(Rc::clone(&records)),
        );
        let parent_field = records.get("v_parent").unwrap();
        assert!(parent_field.refgroup.is_some());
        assert!(Rc::ptr_eq(&parent_field.refgroup.unwrap(), &records));
    }

    #[test]
    fn test_virtual_group_has_no_tablesql() {
        let params = Group::virtual_group();
        assert!(!params.has_tablesql());
    }

    #[test]
    fn test_builder() {
        let group = GroupBuilder::new()
            .table("identity")
            .field(Field::new("email", DataType::Str, "ide_account"))
            .build();
        assert!(group.get("email").is_some());
        assert!(group.get("missing").is_none());
    }
}
