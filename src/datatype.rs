//! The vSQL value-type lattice and the non-throwing compile-error codes
//! attached to AST nodes.
//!
//! `DataType` is a closed enumeration (`spec.md` §3); rule lookups, field
//! schemas and AST validation all key off it. `CompileError` is the other
//! half of §3 ("Error kinds") — these never propagate as a Rust `Err`, they
//! are stored directly on the offending AST node (`spec.md` §4.6 / §7).

use std::fmt;

/// One of the datatypes a vSQL value can carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DataType {
    Null,
    Bool,
    Int,
    Number,
    Str,
    Clob,
    Color,
    Geo,
    Date,
    DateTime,
    DateDelta,
    DateTimeDelta,
    MonthDelta,

    NullList,
    IntList,
    NumberList,
    StrList,
    ClobList,
    DateList,
    DateTimeList,

    NullSet,
    IntSet,
    NumberSet,
    StrSet,
    DateSet,
    DateTimeSet,
}

impl DataType {
    /// All datatypes, in declaration order. Used by the rule-spec parser to
    /// resolve `_`-separated unions and by the DDL emitter.
    pub const ALL: &'static [DataType] = &[
        DataType::Null,
        DataType::Bool,
        DataType::Int,
        DataType::Number,
        DataType::Str,
        DataType::Clob,
        DataType::Color,
        DataType::Geo,
        DataType::Date,
        DataType::DateTime,
        DataType::DateDelta,
        DataType::DateTimeDelta,
        DataType::MonthDelta,
        DataType::NullList,
        DataType::IntList,
        DataType::NumberList,
        DataType::StrList,
        DataType::ClobList,
        DataType::DateList,
        DataType::DateTimeList,
        DataType::NullSet,
        DataType::IntSet,
        DataType::NumberSet,
        DataType::StrSet,
        DataType::DateSet,
        DataType::DateTimeSet,
    ];

    /// The upper-case name used in rule specs and serialisation
    /// (`"INT"`, `"NUMBERLIST"`, ...).
    pub fn name(&self) -> &'static str {
        match self {
            DataType::Null => "NULL",
            DataType::Bool => "BOOL",
            DataType::Int => "INT",
            DataType::Number => "NUMBER",
            DataType::Str => "STR",
            DataType::Clob => "CLOB",
            DataType::Color => "COLOR",
            DataType::Geo => "GEO",
            DataType::Date => "DATE",
            DataType::DateTime => "DATETIME",
            DataType::DateDelta => "DATEDELTA",
            DataType::DateTimeDelta => "DATETIMEDELTA",
            DataType::MonthDelta => "MONTHDELTA",
            DataType::NullList => "NULLLIST",
            DataType::IntList => "INTLIST",
            DataType::NumberList => "NUMBERLIST",
            DataType::StrList => "STRLIST",
            DataType::ClobList => "CLOBLIST",
            DataType::DateList => "DATELIST",
            DataType::DateTimeList => "DATETIMELIST",
            DataType::NullSet => "NULLSET",
            DataType::IntSet => "INTSET",
            DataType::NumberSet => "NUMBERSET",
            DataType::StrSet => "STRSET",
            DataType::DateSet => "DATESET",
            DataType::DateTimeSet => "DATETIMESET",
        }
    }

    /// Parse a rule-spec type token (`"INT"`, `"NUMBERLIST"`, ...).
    pub fn parse(s: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|dt| dt.name() == s)
    }

    pub fn is_list(&self) -> bool {
        matches!(
            self,
            DataType::NullList
                | DataType::IntList
                | DataType::NumberList
                | DataType::StrList
                | DataType::ClobList
                | DataType::DateList
                | DataType::DateTimeList
        )
    }

    pub fn is_set(&self) -> bool {
        matches!(
            self,
            DataType::NullSet
                | DataType::IntSet
                | DataType::NumberSet
                | DataType::StrSet
                | DataType::DateSet
                | DataType::DateTimeSet
        )
    }

    /// Type-name aliasing for `{t<n>}` template substitution (`spec.md`
    /// §4.1): several datatypes share a single SQL-emission identity so rule
    /// authors can write one template across the equivalence class.
    pub fn template_alias(&self) -> &'static str {
        match self {
            DataType::Bool => "int",
            DataType::Date => "datetime",
            DataType::DateList => "datetimelist",
            DataType::DateTimeList => "datetimelist",
            DataType::IntSet => "intlist",
            DataType::NumberSet => "numberlist",
            DataType::StrSet => "strlist",
            DataType::DateSet => "datetimelist",
            DataType::DateTimeSet => "datetimelist",
            other => {
                // Leak-free: these are 'static str literals produced from a
                // fixed, closed set; name() already returns lowercase-free
                // upper names, so lower-case them through a static table
                // instead of allocating.
                match other {
                    DataType::Null => "null",
                    DataType::Int => "int",
                    DataType::Number => "number",
                    DataType::Str => "str",
                    DataType::Clob => "clob",
                    DataType::Color => "color",
                    DataType::Geo => "geo",
                    DataType::DateTime => "datetime",
                    DataType::DateDelta => "datedelta",
                    DataType::DateTimeDelta => "datetimedelta",
                    DataType::MonthDelta => "monthdelta",
                    DataType::NullList => "nulllist",
                    DataType::IntList => "intlist",
                    DataType::NumberList => "numberlist",
                    DataType::StrList => "strlist",
                    DataType::ClobList => "cloblist",
                    DataType::NullSet => "nullset",
                    _ => unreachable!("aliased variants handled above"),
                }
            }
        }
    }

    /// Is `given` acceptable wherever `required` is asked for?
    /// (`spec.md` §3, "Compatibility relation"; the clean prose version,
    /// not `original_source`'s apparently-typo'd `compatible_to` — see
    /// `DESIGN.md`.)
    pub fn compatible_to(&self, required: DataType) -> bool {
        let given = *self;
        if given == DataType::Null || given == required {
            return true;
        }
        use DataType::*;
        match (required, given) {
            (Str, Clob) | (Clob, Str) => true,
            (Int, Bool) => true,
            (Number, Bool) | (Number, Int) => true,
            (NumberList, IntList) => true,
            (DateTimeList, DateList) => true,
            (NumberSet, IntSet) => true,
            (DateTimeSet, DateSet) => true,
            (required, given) if required.is_list() && given == NullList => true,
            (required, given) if required.is_set() && given == NullSet => true,
            _ => false,
        }
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Non-throwing compile-error codes attached to AST nodes (`spec.md` §3 /
/// §4.6). A node with an error always has `datatype = None`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CompileError {
    /// A child node carries an error; propagated upward unconditionally.
    SubNodeError,
    /// A host/source construct mapped to an AST node kind we don't support.
    NodeType,
    /// Name is known, but not for this number of arguments.
    Arity,
    /// Name is known, but not for this combination of operand types.
    SubNodeTypes,
    /// `FieldRef` identifier did not resolve against its parent group.
    Field,
    /// A literal's surface form does not denote a valid value of its type
    /// (e.g. a malformed color or geo literal).
    Const(DataType),
    /// Function/method/attribute name is not registered at all.
    Name,
    ListTypeUnknown,
    ListMixedTypes,
    ListUnsupportedTypes,
    SetTypeUnknown,
    SetMixedTypes,
    SetUnsupportedTypes,
    /// Operand/field did not satisfy a specific required datatype.
    Datatype(DataType),
}

impl fmt::Display for CompileError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CompileError::SubNodeError => write!(f, "SUBNODEERROR"),
            CompileError::NodeType => write!(f, "NODETYPE"),
            CompileError::Arity => write!(f, "ARITY"),
            CompileError::SubNodeTypes => write!(f, "SUBNODETYPES"),
            CompileError::Field => write!(f, "FIELD"),
            CompileError::Const(dt) => write!(f, "CONST_{}", dt.name()),
            CompileError::Name => write!(f, "NAME"),
            CompileError::ListTypeUnknown => write!(f, "LISTTYPEUNKNOWN"),
            CompileError::ListMixedTypes => write!(f, "LISTMIXEDTYPES"),
            CompileError::ListUnsupportedTypes => write!(f, "LISTUNSUPPORTEDTYPES"),
            CompileError::SetTypeUnknown => write!(f, "SETTYPEUNKNOWN"),
            CompileError::SetMixedTypes => write!(f, "SETMIXEDTYPES"),
            CompileError::SetUnsupportedTypes => write!(f, "SETUNSUPPORTEDTYPES"),
            CompileError::Datatype(dt) => write!(f, "DATATYPE_{}", dt.name()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_roundtrip() {
        for dt in DataType::ALL {
            assert_eq!(DataType::parse(dt.name()), Some(*dt));
        }
    }

    #[test]
    fn test_widening_compatibility() {
        assert!(DataType::Bool.compatible_to(DataType::Int));
        assert!(DataType::Int.compatible_to(DataType::Number));
        assert!(!DataType::Number.compatible_to(DataType::Int));
        assert!(DataType::Str.compatible_to(DataType::Clob));
        assert!(DataType::Clob.compatible_to(DataType::Str));
    }

    #[test]
    fn test_null_always_compatible() {
        assert!(DataType::Null.compatible_to(DataType::Int));
        assert!(DataType::Null.compatible_to(DataType::StrList));
    }

    #[test]
    fn test_nulllist_nullset_wildcards() {
        assert!(DataType::NullList.compatible_to(DataType::IntList));
        assert!(DataType::NullSet.compatible_to(DataType::DateTimeSet));
        assert!(!DataType::NullList.compatible_to(DataType::IntSet));
    }

    #[test]
    fn test_incompatible_pairs() {
        assert!(!DataType::Str.compatible_to(DataType::Int));
        assert!(!DataType::Color.compatible_to(DataType::Geo));
    }

    #[test]
    fn test_error_display_matches_source_tags() {
        assert_eq!(CompileError::SubNodeError.to_string(), "SUBNODEERROR");
        assert_eq!(
            CompileError::Datatype(DataType::Int).to_string(),
            "DATATYPE_INT"
        );
    }
}
