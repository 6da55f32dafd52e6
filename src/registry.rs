//! The frozen, user-extensible rule table (`spec.md` §4.1 / §9).
//!
//! `examples/original_source/src/ll/la/vsql.py` gives each AST subclass its
//! own `rules` dict; in Rust there is one `OperatorRules`/`FunctionRules`/
//! `MethodRules`/`AttrRules` table per node-kind family instead of per-class,
//! but the rule *rows* themselves (signature spec + source template) port
//! across verbatim, since the rule-spec mini-language (`rule.rs`) is the same
//! one the original's `add_rules` classmethod parses.
//!
//! [`Registry::default_backend`] builds the table this crate ships with,
//! targeting the `vsqlimpl_pkg`/`livingapi_pkg` Oracle packages the original
//! templates call out to. A caller free to target a different package
//! namespace can start from [`Registry::empty`] and register their own rows.

use std::collections::HashMap;

use crate::ast::NodeKind;
use crate::datatype::{CompileError, DataType};
use crate::error::Result;
use crate::op::{BinaryOp, UnaryOp};
use crate::rule::{AttrRules, FunctionRules, MethodRules, OperatorRules, TemplateToken};

/// All rule tables a compiled query needs, keyed one table per node-kind
/// family (`spec.md` §4.1, "one rule table per AST family").
#[derive(Debug, Default)]
pub struct Registry {
    binary: HashMap<BinaryOp, OperatorRules>,
    unary: HashMap<UnaryOp, OperatorRules>,
    ternary_if: OperatorRules,
    slice: OperatorRules,
    functions: FunctionRules,
    methods: MethodRules,
    attrs: AttrRules,
}

impl Registry {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn add_binary_rules(&mut self, op: BinaryOp, spec: &str, template: &str) -> Result<()> {
        self.binary.entry(op).or_default().add_rules(spec, template)
    }

    pub fn add_unary_rules(&mut self, op: UnaryOp, spec: &str, template: &str) -> Result<()> {
        self.unary.entry(op).or_default().add_rules(spec, template)
    }

    pub fn add_if_rules(&mut self, spec: &str, template: &str) -> Result<()> {
        self.ternary_if.add_rules(spec, template)
    }

    pub fn add_slice_rules(&mut self, spec: &str, template: &str) -> Result<()> {
        self.slice.add_rules(spec, template)
    }

    pub fn add_function_rules(&mut self, spec: &str, template: &str) -> Result<()> {
        self.functions.add_rules(spec, template)
    }

    pub fn add_method_rules(&mut self, spec: &str, template: &str) -> Result<()> {
        self.methods.add_rules(spec, template)
    }

    pub fn add_attr_rules(&mut self, spec: &str, template: &str) -> Result<()> {
        self.attrs.add_rules(spec, template)
    }

    pub fn validate_binary(
        &self,
        op: BinaryOp,
        obj1: DataType,
        obj2: DataType,
    ) -> std::result::Result<(DataType, &[TemplateToken]), CompileError> {
        self.binary
            .get(&op)
            .ok_or(CompileError::SubNodeTypes)
            .and_then(|rules| rules.validate(&[obj1, obj2]))
    }

    pub fn validate_unary(
        &self,
        op: UnaryOp,
        obj: DataType,
    ) -> std::result::Result<(DataType, &[TemplateToken]), CompileError> {
        self.unary
            .get(&op)
            .ok_or(CompileError::SubNodeTypes)
            .and_then(|rules| rules.validate(&[obj]))
    }

    pub fn validate_if(
        &self,
        objif: DataType,
        objcond: DataType,
        objelse: DataType,
    ) -> std::result::Result<(DataType, &[TemplateToken]), CompileError> {
        self.ternary_if.validate(&[objif, objcond, objelse])
    }

    pub fn validate_slice(
        &self,
        obj: DataType,
        index1: DataType,
        index2: DataType,
    ) -> std::result::Result<(DataType, &[TemplateToken]), CompileError> {
        self.slice.validate(&[obj, index1, index2])
    }

    pub fn validate_function(
        &self,
        name: &str,
        args: &[DataType],
    ) -> std::result::Result<(DataType, &[TemplateToken]), CompileError> {
        self.functions.validate(name, args)
    }

    pub fn validate_method(
        &self,
        receiver: DataType,
        name: &str,
        args: &[DataType],
    ) -> std::result::Result<(DataType, &[TemplateToken]), CompileError> {
        self.methods.validate(receiver, name, args)
    }

    pub fn validate_attr(
        &self,
        receiver: DataType,
        name: &str,
    ) -> std::result::Result<(DataType, &[TemplateToken]), CompileError> {
        self.attrs.validate(receiver, name)
    }

    /// Dispatch validation by node kind; used by `ast::Ast::new` so
    /// construction doesn't need to know which sub-table to query.
    pub fn validate_kind(
        &self,
        kind: &NodeKind,
        operands: &[DataType],
    ) -> std::result::Result<(DataType, &[TemplateToken]), CompileError> {
        match kind {
            NodeKind::Binary(op) => self.validate_binary(*op, operands[0], operands[1]),
            NodeKind::Unary(op) => self.validate_unary(*op, operands[0]),
            NodeKind::If => self.validate_if(operands[0], operands[1], operands[2]),
            NodeKind::Slice => self.validate_slice(operands[0], operands[1], operands[2]),
            _ => unreachable!("validate_kind only called for operator-family node kinds"),
        }
    }

    /// Read-only access to every registered rule family, for the `serialize`
    /// module's DDL emitter (`spec.md` §6.2 / §9, "a pure function over the
    /// in-memory rule table").
    pub fn binary_rules(&self) -> impl Iterator<Item = (BinaryOp, &[DataType], &crate::rule::Rule)> {
        self.binary.iter().flat_map(|(op, rules)| rules.iter().map(move |(k, v)| (*op, k, v)))
    }

    pub fn unary_rules(&self) -> impl Iterator<Item = (UnaryOp, &[DataType], &crate::rule::Rule)> {
        self.unary.iter().flat_map(|(op, rules)| rules.iter().map(move |(k, v)| (*op, k, v)))
    }

    pub fn if_rules(&self) -> impl Iterator<Item = (&[DataType], &crate::rule::Rule)> {
        self.ternary_if.iter()
    }

    pub fn slice_rules(&self) -> impl Iterator<Item = (&[DataType], &crate::rule::Rule)> {
        self.slice.iter()
    }

    pub fn function_rules(&self) -> impl Iterator<Item = (&str, &[DataType], &crate::rule::Rule)> {
        self.functions.iter()
    }

    pub fn method_rules(&self) -> impl Iterator<Item = (DataType, &str, &[DataType], &crate::rule::Rule)> {
        self.methods.iter()
    }

    pub fn attr_rules(&self) -> impl Iterator<Item = (DataType, &str, &crate::rule::Rule)> {
        self.attrs.iter()
    }
}

/// Subsets of datatypes used throughout the default rule table
/// (`examples/original_source/src/ll/la/vsql.py`'s module-level `INTLIKE`,
/// `NUMBERLIKE`, ... constants).
const INTLIKE: &str = "BOOL_INT";
const NUMBERLIKE: &str = "BOOL_INT_NUMBER";
const NUMBERSTORED: &str = "BOOL_INT_NUMBER_COLOR_DATEDELTA_DATETIMEDELTA_MONTHDELTA";
const TEXT: &str = "STR_CLOB";
const LIST: &str = "INTLIST_NUMBERLIST_STRLIST_CLOBLIST_DATELIST_DATETIMELIST";
const SET: &str = "INTSET_NUMBERSET_STRSET_DATESET_DATETIMESET";
const ANY: &str = "NULL_BOOL_INT_NUMBER_STR_CLOB_COLOR_GEO_DATE_DATETIME_DATEDELTA_DATETIMEDELTA_MONTHDELTA_NULLLIST_INTLIST_NUMBERLIST_STRLIST_CLOBLIST_DATELIST_DATETIMELIST_NULLSET_INTSET_NUMBERSET_STRSET_DATESET_DATETIMESET";

/// The Oracle backend this crate ships with, targeting the `vsqlimpl_pkg`
/// and `livingapi_pkg` packages the original templates call out to
/// (`spec.md` §4.9, "Backend configuration").
pub fn default_backend() -> Result<Registry> {
    let mut r = Registry::empty();
    register_const_rules(&mut r)?;
    register_functions(&mut r)?;
    register_methods(&mut r)?;
    register_attrs(&mut r)?;
    register_comparisons(&mut r)?;
    register_arithmetic(&mut r)?;
    register_logic(&mut r)?;
    register_bitwise(&mut r)?;
    register_unary(&mut r)?;
    register_if_and_slice(&mut r)?;
    Ok(r)
}

/// Leaf node kinds (`FieldRef`, `Const*`) don't consult a rule table at all
/// — their datatype comes straight from the resolved `Field` or the literal
/// itself — so nothing is registered here. Kept as a named stage (rather
/// than omitted) so the `default_backend` call list visibly accounts for
/// every node-kind family named in `spec.md` §6.2.
fn register_const_rules(_r: &mut Registry) -> Result<()> {
    Ok(())
}

fn register_functions(r: &mut Registry) -> Result<()> {
    let f = format!("BOOL <- bool(INT_NUMBER_DATEDELTA_DATETIMEDELTA_MONTHDELTA_NULLLIST_NULLSET)");
    r.add_function_rules("DATE <- today()", "trunc(sysdate)")?;
    r.add_function_rules("DATETIME <- now()", "sysdate")?;
    r.add_function_rules("BOOL <- bool()", "0")?;
    r.add_function_rules("BOOL <- bool(NULL)", "0")?;
    r.add_function_rules("BOOL <- bool(BOOL)", "{s1}")?;
    r.add_function_rules(&f, "(case when nvl({s1}, 0) = 0 then 0 else 1 end)")?;
    r.add_function_rules("BOOL <- bool(DATE_DATETIME_STR_COLOR_GEO)", "(case when {s1} is null then 0 else 1 end)")?;
    r.add_function_rules(&format!("BOOL <- bool({ANY})"), "vsqlimpl_pkg.bool_{t1}({s1})")?;

    r.add_function_rules("INT <- int()", "0")?;
    r.add_function_rules(&format!("INT <- int({INTLIKE})"), "{s1}")?;
    r.add_function_rules("INT <- int(NUMBER_STR_CLOB)", "vsqlimpl_pkg.int_{t1}({s1})")?;

    r.add_function_rules("NUMBER <- float()", "0.0")?;
    r.add_function_rules(&format!("NUMBER <- float({NUMBERLIKE})"), "{s1}")?;
    r.add_function_rules(&format!("NUMBER <- float({TEXT})"), "vsqlimpl_pkg.float_{t1}({s1})")?;

    r.add_function_rules(
        &format!("GEO <- geo({NUMBERLIKE}, {NUMBERLIKE})"),
        "vsqlimpl_pkg.geo_number_number_str({s1}, {s2}, null)",
    )?;
    r.add_function_rules(
        &format!("GEO <- geo({NUMBERLIKE}, {NUMBERLIKE}, STR)"),
        "vsqlimpl_pkg.geo_number_number_str({s1}, {s2}, {s3})",
    )?;

    r.add_function_rules("STR <- str()", "null")?;
    r.add_function_rules("STR <- str(NULL)", "null")?;
    r.add_function_rules("STR <- str(STR)", "{s1}")?;
    r.add_function_rules("CLOB <- str(CLOB)", "{s1}")?;
    r.add_function_rules("STR <- str(BOOL)", "(case {s1} when 0 then 'False' when null then 'None' else 'True' end)")?;
    r.add_function_rules("STR <- str(INT)", "to_char({s1})")?;
    r.add_function_rules("STR <- str(NUMBER)", "vsqlimpl_pkg.str_number({s1})")?;
    r.add_function_rules("STR <- str(GEO)", "vsqlimpl_pkg.repr_geo({s1})")?;
    r.add_function_rules("STR <- str(DATE)", "to_char({s1}, 'YYYY-MM-DD')")?;
    r.add_function_rules("STR <- str(DATETIME)", "to_char({s1}, 'YYYY-MM-DD HH24:MI:SS')")?;
    r.add_function_rules("STR <- str(NULLLIST)", "vsqlimpl_pkg.repr_nulllist({s1})")?;
    r.add_function_rules("STR <- str(DATELIST)", "vsqlimpl_pkg.repr_datelist({s1})")?;
    r.add_function_rules(&format!("STR <- str({LIST})"), "vsqlimpl_pkg.repr_{t1}({s1})")?;
    r.add_function_rules("STR <- str(NULLSET)", "vsqlimpl_pkg.repr_nullset({s1})")?;
    r.add_function_rules("STR <- str(INTSET)", "vsqlimpl_pkg.repr_intset({s1})")?;
    r.add_function_rules("STR <- str(NUMBERSET)", "vsqlimpl_pkg.repr_numberset({s1})")?;
    r.add_function_rules("STR <- str(STRSET)", "vsqlimpl_pkg.repr_strset({s1})")?;
    r.add_function_rules("STR <- str(DATESET)", "vsqlimpl_pkg.repr_dateset({s1})")?;
    r.add_function_rules("STR <- str(DATETIMESET)", "vsqlimpl_pkg.repr_datetimeset({s1})")?;
    r.add_function_rules(&format!("STR <- str({ANY})"), "vsqlimpl_pkg.str_{t1}({s1})")?;

    r.add_function_rules("STR <- repr(NULL)", "'None'")?;
    r.add_function_rules("STR <- repr(BOOL)", "(case {s1} when 0 then 'False' when null then 'None' else 'True' end)")?;
    r.add_function_rules("CLOB <- repr(CLOB_CLOBLIST)", "vsqlimpl_pkg.repr_{t1}({s1})")?;
    r.add_function_rules("STR <- repr(DATE)", "vsqlimpl_pkg.repr_date({s1})")?;
    r.add_function_rules("STR <- repr(DATELIST)", "vsqlimpl_pkg.repr_datelist({s1})")?;
    r.add_function_rules("STR <- repr(NULLSET)", "vsqlimpl_pkg.repr_nullset({s1})")?;
    r.add_function_rules("STR <- repr(INTSET)", "vsqlimpl_pkg.repr_intset({s1})")?;
    r.add_function_rules("STR <- repr(NUMBERSET)", "vsqlimpl_pkg.repr_numberset({s1})")?;
    r.add_function_rules("STR <- repr(STRSET)", "vsqlimpl_pkg.repr_strset({s1})")?;
    r.add_function_rules("STR <- repr(DATESET)", "vsqlimpl_pkg.repr_dateset({s1})")?;
    r.add_function_rules("STR <- repr(DATETIMESET)", "vsqlimpl_pkg.repr_datetimeset({s1})")?;
    r.add_function_rules(&format!("STR <- repr({ANY})"), "vsqlimpl_pkg.repr_{t1}({s1})")?;

    r.add_function_rules("DATE <- date(INT, INT, INT)", "vsqlimpl_pkg.date_int({s1}, {s2}, {s3})")?;
    r.add_function_rules("DATE <- date(DATETIME)", "trunc({s1})")?;

    r.add_function_rules("DATETIME <- datetime(INT, INT, INT)", "vsqlimpl_pkg.datetime_int({s1}, {s2}, {s3})")?;
    r.add_function_rules(
        "DATETIME <- datetime(INT, INT, INT, INT)",
        "vsqlimpl_pkg.datetime_int({s1}, {s2}, {s3}, {s4})",
    )?;
    r.add_function_rules(
        "DATETIME <- datetime(INT, INT, INT, INT, INT)",
        "vsqlimpl_pkg.datetime_int({s1}, {s2}, {s3}, {s4}, {s5})",
    )?;
    r.add_function_rules(
        "DATETIME <- datetime(INT, INT, INT, INT, INT, INT)",
        "vsqlimpl_pkg.datetime_int({s1}, {s2}, {s3}, {s4}, {s5}, {s6})",
    )?;
    r.add_function_rules("DATETIME <- datetime(DATE)", "{s1}")?;
    r.add_function_rules("DATETIME <- datetime(DATE, INT)", "({s1} + {s2}/24)")?;
    r.add_function_rules("DATETIME <- datetime(DATE, INT, INT)", "({s1} + {s2}/24 + {s3}/24/60)")?;
    r.add_function_rules(
        "DATETIME <- datetime(DATE, INT, INT, INT)",
        "({s1} + {s2}/24 + {s3}/24/60 + {s4}/24/60/60)",
    )?;

    r.add_function_rules(&format!("INT <- len({TEXT})"), "nvl(length({s1}), 0)")?;
    r.add_function_rules("INT <- len(NULLLIST)", "{s1}")?;
    r.add_function_rules(&format!("INT <- len({LIST})"), "vsqlimpl_pkg.len_{t1}({s1})")?;
    r.add_function_rules("INT <- len(NULLSET)", "case when {s1} > 0 then 1 else {s1} end")?;
    r.add_function_rules(&format!("INT <- len({SET})"), "vsqlimpl_pkg.len_{t1}({s1})")?;

    r.add_function_rules("DATEDELTA <- timedelta()", "0")?;
    r.add_function_rules("DATEDELTA <- timedelta(INT)", "{s1}")?;
    r.add_function_rules("DATETIMEDELTA <- timedelta(INT, INT)", "({s1} + {s2}/86400)")?;
    r.add_function_rules("MONTHDELTA <- monthdelta()", "0")?;
    r.add_function_rules("MONTHDELTA <- monthdelta(INT)", "{s1}")?;
    r.add_function_rules("MONTHDELTA <- years(INT)", "(12 * {s1})")?;
    r.add_function_rules("MONTHDELTA <- months(INT)", "{s1}")?;
    r.add_function_rules("DATEDELTA <- weeks(INT)", "(7 * {s1})")?;
    r.add_function_rules("DATEDELTA <- days(INT)", "{s1}")?;
    r.add_function_rules("DATETIMEDELTA <- hours(INT)", "({s1} / 24)")?;
    r.add_function_rules("DATETIMEDELTA <- minutes(INT)", "({s1} / 1440)")?;
    r.add_function_rules("DATETIMEDELTA <- seconds(INT)", "({s1} / 86400)")?;

    r.add_function_rules("STR <- md5(STR)", "lower(rawtohex(dbms_crypto.hash(utl_raw.cast_to_raw({s1}), 2)))")?;
    r.add_function_rules("NUMBER <- random()", "dbms_random.value")?;
    r.add_function_rules("INT <- randrange(INT, INT)", "floor(dbms_random.value({s1}, {s2}))")?;
    r.add_function_rules("INT <- seq()", "livingapi_pkg.seq()")?;

    r.add_function_rules(
        &format!("COLOR <- rgb({NUMBERLIKE}, {NUMBERLIKE}, {NUMBERLIKE})"),
        "vsqlimpl_pkg.rgb({s1}, {s2}, {s3})",
    )?;
    r.add_function_rules(
        &format!("COLOR <- rgb({NUMBERLIKE}, {NUMBERLIKE}, {NUMBERLIKE}, {NUMBERLIKE})"),
        "vsqlimpl_pkg.rgb({s1}, {s2}, {s3}, {s4})",
    )?;

    r.add_function_rules(&format!("STRLIST <- list({TEXT})"), "vsqlimpl_pkg.list_{t1}({s1})")?;
    r.add_function_rules(&format!("T1 <- list(NULLLIST_{LIST})"), "{s1}")?;
    r.add_function_rules("NULLLIST <- list(NULLSET)", "{s1}")?;
    r.add_function_rules("INTLIST <- list(INTSET)", "{s1}")?;
    r.add_function_rules("NUMBERLIST <- list(NUMBERSET)", "{s1}")?;
    r.add_function_rules("STRLIST <- list(STRSET)", "{s1}")?;
    r.add_function_rules("DATELIST <- list(DATESET)", "{s1}")?;
    r.add_function_rules("DATETIMELIST <- list(DATETIMESET)", "{s1}")?;

    r.add_function_rules(&format!("STRSET <- set({TEXT})"), "vsqlimpl_pkg.set_{t1}({s1})")?;
    r.add_function_rules(&format!("T1 <- set({SET})"), "{s1}")?;
    r.add_function_rules("NULLSET <- set(NULLLIST)", "case when {s1} > 0 then 1 else {s1} end")?;
    r.add_function_rules("INTSET <- set(INTLIST)", "vsqlimpl_pkg.set_{t1}({s1})")?;
    r.add_function_rules("NUMBERSET <- set(NUMBERLIST)", "vsqlimpl_pkg.set_{t1}({s1})")?;
    r.add_function_rules("STRSET <- set(STRLIST)", "vsqlimpl_pkg.set_{t1}({s1})")?;
    r.add_function_rules("DATESET <- set(DATELIST)", "vsqlimpl_pkg.set_{t1}({s1})")?;
    r.add_function_rules("DATETIMESET <- set(DATETIMELIST)", "vsqlimpl_pkg.set_{t1}({s1})")?;

    r.add_function_rules("NUMBER <- dist(GEO, GEO)", "vsqlimpl_pkg.dist_geo_geo({s1}, {s2})")?;

    r.add_function_rules("INT <- abs(BOOL)", "{s1}")?;
    r.add_function_rules("INT <- abs(INT)", "abs({s1})")?;
    r.add_function_rules("NUMBER <- abs(NUMBER)", "abs({s1})")?;
    r.add_function_rules(&format!("NUMBER <- cos({NUMBERLIKE})"), "cos({s1})")?;
    r.add_function_rules(&format!("NUMBER <- sin({NUMBERLIKE})"), "sin({s1})")?;
    r.add_function_rules(&format!("NUMBER <- tan({NUMBERLIKE})"), "tan({s1})")?;
    r.add_function_rules(
        &format!("NUMBER <- sqrt({NUMBERLIKE})"),
        "sqrt(case when {s1} >= 0 then {s1} else null end)",
    )?;
    Ok(())
}

fn register_methods(r: &mut Registry) -> Result<()> {
    r.add_method_rules(&format!("T1 <- {TEXT}.lower()"), "lower({s1})")?;
    r.add_method_rules(&format!("T1 <- {TEXT}.upper()"), "upper({s1})")?;
    r.add_method_rules(
        &format!("BOOL <- {TEXT}.startswith(STR_STRLIST)"),
        "vsqlimpl_pkg.startswith_{t1}_{t2}({s1}, {s2})",
    )?;
    r.add_method_rules(
        &format!("BOOL <- {TEXT}.endswith(STR_STRLIST)"),
        "vsqlimpl_pkg.endswith_{t1}_{t2}({s1}, {s2})",
    )?;
    r.add_method_rules(&format!("T1 <- {TEXT}.strip()"), "vsqlimpl_pkg.strip_{t1}({s1}, null, 1, 1)")?;
    r.add_method_rules(&format!("T1 <- {TEXT}.strip(STR)"), "vsqlimpl_pkg.strip_{t1}({s1}, {s2}, 1, 1)")?;
    r.add_method_rules(&format!("T1 <- {TEXT}.lstrip()"), "vsqlimpl_pkg.strip_{t1}({s1}, null, 1, 0)")?;
    r.add_method_rules(&format!("T1 <- {TEXT}.lstrip(STR)"), "vsqlimpl_pkg.strip_{t1}({s1}, {s2}, 1, 0)")?;
    r.add_method_rules(&format!("T1 <- {TEXT}.rstrip()"), "vsqlimpl_pkg.strip_{t1}({s1}, null, 0, 1)")?;
    r.add_method_rules(&format!("T1 <- {TEXT}.rstrip(STR)"), "vsqlimpl_pkg.strip_{t1}({s1}, {s2}, 0, 1)")?;

    r.add_method_rules(&format!("INT <- {TEXT}.find({TEXT})"), "(instr({s1}, {s2}) - 1)")?;
    r.add_method_rules(&format!("INT <- {TEXT}.find({TEXT}, NULL)"), "(instr({s1}, {s2}) - 1)")?;
    r.add_method_rules(&format!("INT <- {TEXT}.find({TEXT}, NULL, NULL)"), "(instr({s1}, {s2}) - 1)")?;
    r.add_method_rules(
        &format!("INT <- {TEXT}.find({TEXT}, NULL_INT)"),
        "vsqlimpl_pkg.find_{t1}_{t2}({s1}, {s2}, {s3}, null)",
    )?;
    r.add_method_rules(
        &format!("INT <- {TEXT}.find({TEXT}, NULL_INT, NULL_INT)"),
        "vsqlimpl_pkg.find_{t1}_{t2}({s1}, {s2}, {s3}, {s4})",
    )?;
    r.add_method_rules(&format!("T1 <- {TEXT}.replace(STR, STR)"), "replace({s1}, {s2}, {s3})")?;

    r.add_method_rules("STRLIST <- STR.split()", "vsqlimpl_pkg.split_{t1}_str({s1}, null)")?;
    r.add_method_rules("CLOBLIST <- CLOB.split()", "vsqlimpl_pkg.split_{t1}_str({s1}, null)")?;
    r.add_method_rules("STRLIST <- STR.split(NULL)", "vsqlimpl_pkg.split_{t1}_str(null, null)")?;
    r.add_method_rules("CLOBLIST <- CLOB.split(NULL)", "vsqlimpl_pkg.split_{t1}_str(null, null)")?;
    r.add_method_rules("STRLIST <- STR.split(STR)", "vsqlimpl_pkg.split_{t1}_str({s1}, {s2})")?;
    r.add_method_rules("CLOBLIST <- CLOB.split(STR)", "vsqlimpl_pkg.split_{t1}_str({s1}, {s2})")?;
    r.add_method_rules("STRLIST <- STR.split(STR, NULL)", "vsqlimpl_pkg.split_{t1}_str({s1}, {s2})")?;
    r.add_method_rules("CLOBLIST <- CLOB.split(STR, NULL)", "vsqlimpl_pkg.split_{t1}_str({s1}, {s2})")?;
    r.add_method_rules(
        "STRLIST <- STR.split(NULL, BOOL_INT)",
        "vsqlimpl_pkg.split_{t1}_str({s1}, null, {s3})",
    )?;
    r.add_method_rules(
        "CLOBLIST <- CLOB.split(NULL, BOOL_INT)",
        "vsqlimpl_pkg.split_{t1}_str({s1}, null, {s3})",
    )?;
    r.add_method_rules(
        "STRLIST <- STR.split(STR, BOOL_INT)",
        "vsqlimpl_pkg.split_{t1}_str({s1}, {s2}, {s3})",
    )?;
    r.add_method_rules(
        "CLOBLIST <- CLOB.split(STR, BOOL_INT)",
        "vsqlimpl_pkg.split_{t1}_str({s1}, {s2}, {s3})",
    )?;

    r.add_method_rules("STR <- STR.join(STR_STRLIST)", "vsqlimpl_pkg.join_str_{t2}({s1}, {s2})")?;
    r.add_method_rules("CLOB <- STR.join(CLOB_CLOBLIST)", "vsqlimpl_pkg.join_str_{t2}({s1}, {s2})")?;
    r.add_method_rules("NUMBER <- COLOR.lum()", "vsqlimpl_pkg.lum({s1})")?;
    r.add_method_rules("INT <- DATE_DATETIME.week()", "to_number(to_char({s1}, 'IW'))")?;
    Ok(())
}

fn register_attrs(r: &mut Registry) -> Result<()> {
    r.add_attr_rules("INT <- DATE_DATETIME.year", "extract(year from {s1})")?;
    r.add_attr_rules("INT <- DATE_DATETIME.month", "extract(month from {s1})")?;
    r.add_attr_rules("INT <- DATE_DATETIME.day", "extract(day from {s1})")?;
    r.add_attr_rules("INT <- DATETIME.hour", "to_number(to_char({s1}, 'HH24'))")?;
    r.add_attr_rules("INT <- DATETIME.minute", "to_number(to_char({s1}, 'MI'))")?;
    r.add_attr_rules("INT <- DATETIME.second", "to_number(to_char({s1}, 'SS'))")?;
    r.add_attr_rules("INT <- DATE_DATETIME.weekday", "(to_char({s1}, 'D')-1)")?;
    r.add_attr_rules("INT <- DATE_DATETIME.yearday", "to_number(to_char({s1}, 'DDD'))")?;
    r.add_attr_rules("INT <- DATEDELTA_DATETIMEDELTA.days", "trunc({s1})")?;
    r.add_attr_rules("INT <- DATETIMEDELTA.seconds", "trunc(mod({s1}, 1) * 86400 + 0.5)")?;
    r.add_attr_rules("NUMBER <- DATETIMEDELTA.total_days", "{s1}")?;
    r.add_attr_rules("NUMBER <- DATETIMEDELTA.total_hours", "({s1} * 24)")?;
    r.add_attr_rules("NUMBER <- DATETIMEDELTA.total_minutes", "({s1} * 1440)")?;
    r.add_attr_rules("NUMBER <- DATETIMEDELTA.total_seconds", "({s1} * 86400)")?;
    r.add_attr_rules("INT <- COLOR.r", "vsqlimpl_pkg.attr_color_r({s1})")?;
    r.add_attr_rules("INT <- COLOR.g", "vsqlimpl_pkg.attr_color_g({s1})")?;
    r.add_attr_rules("INT <- COLOR.b", "vsqlimpl_pkg.attr_color_b({s1})")?;
    r.add_attr_rules("INT <- COLOR.a", "vsqlimpl_pkg.attr_color_a({s1})")?;
    r.add_attr_rules("NUMBER <- GEO.lat", "vsqlimpl_pkg.attr_geo_lat({s1})")?;
    r.add_attr_rules("NUMBER <- GEO.long", "vsqlimpl_pkg.attr_geo_long({s1})")?;
    r.add_attr_rules("STR <- GEO.info", "vsqlimpl_pkg.attr_geo_info({s1})")?;
    Ok(())
}

/// Comparisons always sort `None` as the smallest value (`spec.md` §4.1,
/// "Comparison family").
fn register_comparisons(r: &mut Registry) -> Result<()> {
    use BinaryOp::*;

    r.add_binary_rules(Eq, &format!("BOOL <- {ANY} == NULL"), "(case when {s1} is null then 1 else 0 end)")?;
    r.add_binary_rules(Eq, &format!("BOOL <- NULL == {ANY}"), "(case when {s2} is null then 1 else 0 end)")?;
    r.add_binary_rules(Eq, &format!("BOOL <- {INTLIKE} == {INTLIKE}"), "vsqlimpl_pkg.eq_int_int({s1}, {s2})")?;
    r.add_binary_rules(
        Eq,
        &format!("BOOL <- {NUMBERLIKE} == {NUMBERLIKE}"),
        "vsqlimpl_pkg.eq_{t1}_{t2}({s1}, {s2})",
    )?;
    r.add_binary_rules(Eq, "BOOL <- GEO == GEO", "vsqlimpl_pkg.eq_str_str({s1}, {s2})")?;
    r.add_binary_rules(Eq, "BOOL <- COLOR == COLOR", "vsqlimpl_pkg.eq_int_int({s1}, {s2})")?;
    r.add_binary_rules(Eq, &format!("BOOL <- {TEXT} == {TEXT}"), "vsqlimpl_pkg.eq_{t1}_{t2}({s1}, {s2})")?;
    r.add_binary_rules(Eq, "BOOL <- DATE_DATETIME == T1", "vsqlimpl_pkg.eq_{t1}_{t2}({s1}, {s2})")?;
    r.add_binary_rules(Eq, "BOOL <- DATEDELTA_MONTHDELTA_COLOR == T1", "vsqlimpl_pkg.eq_int_int({s1}, {s2})")?;
    r.add_binary_rules(
        Eq,
        "BOOL <- DATETIMEDELTA == DATETIMEDELTA",
        "vsqlimpl_pkg.eq_datetimedelta_datetimedelta({s1}, {s2})",
    )?;
    r.add_binary_rules(
        Eq,
        &format!("BOOL <- NULLLIST == NULLLIST_{LIST}"),
        "vsqlimpl_pkg.eq_{t1}_{t2}({s1}, {s2})",
    )?;
    r.add_binary_rules(
        Eq,
        &format!("BOOL <- NULLLIST_{LIST} == NULLLIST"),
        "vsqlimpl_pkg.eq_{t1}_{t2}({s1}, {s2})",
    )?;
    r.add_binary_rules(
        Eq,
        "BOOL <- INTLIST_NUMBERLIST == INTLIST_NUMBERLIST",
        "vsqlimpl_pkg.eq_{t1}_{t2}({s1}, {s2})",
    )?;
    r.add_binary_rules(
        Eq,
        "BOOL <- STRLIST_CLOBLIST == STRLIST_CLOBLIST",
        "vsqlimpl_pkg.eq_{t1}_{t2}({s1}, {s2})",
    )?;
    r.add_binary_rules(
        Eq,
        "BOOL <- DATELIST_DATETIMELIST == DATELIST_DATETIMELIST",
        "vsqlimpl_pkg.eq_{t1}_{t2}({s1}, {s2})",
    )?;
    r.add_binary_rules(Eq, "BOOL <- NULLSET == NULLSET", "vsqlimpl_pkg.eq_nullset_nullset({s1}, {s2})")?;
    r.add_binary_rules(Eq, "BOOL <- NULLSET == INTSET", "vsqlimpl_pkg.eq_nullset_intset({s1}, {s2})")?;
    r.add_binary_rules(Eq, "BOOL <- NULLSET == NUMBERSET", "vsqlimpl_pkg.eq_nullset_numberset({s1}, {s2})")?;
    r.add_binary_rules(Eq, "BOOL <- NULLSET == STRSET", "vsqlimpl_pkg.eq_nullset_strset({s1}, {s2})")?;
    r.add_binary_rules(Eq, "BOOL <- NULLSET == DATESET", "vsqlimpl_pkg.eq_nullset_datetimeset({s1}, {s2})")?;
    r.add_binary_rules(Eq, "BOOL <- NULLSET == DATETIMESET", "vsqlimpl_pkg.eq_nullset_datetimeset({s1}, {s2})")?;
    r.add_binary_rules(Eq, "BOOL <- INTSET == NULLSET", "vsqlimpl_pkg.eq_intset_nullset({s1}, {s2})")?;
    r.add_binary_rules(Eq, "BOOL <- NUMBERSET == NULLSET", "vsqlimpl_pkg.eq_numberset_nullset({s1}, {s2})")?;
    r.add_binary_rules(Eq, "BOOL <- STRSET == NULLSET", "vsqlimpl_pkg.eq_strset_nullset({s1}, {s2})")?;
    r.add_binary_rules(Eq, "BOOL <- DATESET == NULLSET", "vsqlimpl_pkg.eq_datetimeset_nullset({s1}, {s2})")?;
    r.add_binary_rules(Eq, "BOOL <- DATETIMESET == NULLSET", "vsqlimpl_pkg.eq_datetimeset_nullset({s1}, {s2})")?;
    r.add_binary_rules(Eq, "BOOL <- INTSET == INTSET", "vsqlimpl_pkg.eq_intset_intset({s1}, {s2})")?;
    r.add_binary_rules(Eq, "BOOL <- NUMBERSET == NUMBERSET", "vsqlimpl_pkg.eq_numberset_numberset({s1}, {s2})")?;
    r.add_binary_rules(Eq, "BOOL <- STRSET == STRSET", "vsqlimpl_pkg.eq_strset_strset({s1}, {s2})")?;
    r.add_binary_rules(
        Eq,
        "BOOL <- DATESET_DATETIMESET == DATESET_DATETIMESET",
        "vsqlimpl_pkg.eq_datetimeset_datetimeset({s1}, {s2})",
    )?;
    r.add_binary_rules(
        Eq,
        &format!("BOOL <- {ANY} == {ANY}"),
        "(case when {s1} is null and {s2} is null then 1 else 0 end)",
    )?;

    r.add_binary_rules(Ne, "BOOL <- NULL != NULL", "0")?;
    r.add_binary_rules(Ne, &format!("BOOL <- {ANY} != NULL"), "(case when {s1} is null then 0 else 1 end)")?;
    r.add_binary_rules(Ne, &format!("BOOL <- NULL != {ANY}"), "(case when {s2} is null then 0 else 1 end)")?;
    r.add_binary_rules(Ne, &format!("BOOL <- {INTLIKE} != {INTLIKE}"), "(1 - vsqlimpl_pkg.eq_int_int({s1}, {s2}))")?;
    r.add_binary_rules(
        Ne,
        &format!("BOOL <- {NUMBERLIKE} != {NUMBERLIKE}"),
        "(1 - vsqlimpl_pkg.eq_{t1}_{t2}({s1}, {s2}))",
    )?;
    r.add_binary_rules(Ne, "BOOL <- GEO != GEO", "(1 - vsqlimpl_pkg.eq_str_str({s1}, {s2}))")?;
    r.add_binary_rules(Ne, "BOOL <- COLOR != COLOR", "(1 - vsqlimpl_pkg.eq_int_int({s1}, {s2}))")?;
    r.add_binary_rules(Ne, &format!("BOOL <- {TEXT} != {TEXT}"), "(1 - vsqlimpl_pkg.eq_{t1}_{t2}({s1}, {s2}))")?;
    r.add_binary_rules(Ne, "BOOL <- DATE_DATETIME != T1", "(1 - vsqlimpl_pkg.eq_{t1}_{t2}({s1}, {s2}))")?;
    r.add_binary_rules(Ne, "BOOL <- DATEDELTA_MONTHDELTA_COLOR != T1", "(1 - vsqlimpl_pkg.eq_int_int({s1}, {s2}))")?;
    r.add_binary_rules(
        Ne,
        "BOOL <- DATETIMEDELTA != DATETIMEDELTA",
        "(1 - vsqlimpl_pkg.eq_datetimedelta_datetimedelta({s1}, {s2}))",
    )?;
    r.add_binary_rules(
        Ne,
        &format!("BOOL <- NULLLIST != NULLLIST_{LIST}"),
        "(1 - vsqlimpl_pkg.eq_{t1}_{t2}({s1}, {s2}))",
    )?;
    r.add_binary_rules(
        Ne,
        &format!("BOOL <- NULLLIST_{LIST} != NULLLIST"),
        "(1 - vsqlimpl_pkg.eq_{t1}_{t2}({s1}, {s2}))",
    )?;
    r.add_binary_rules(
        Ne,
        "BOOL <- INTLIST_NUMBERLIST != INTLIST_NUMBERLIST",
        "(1 - vsqlimpl_pkg.eq_{t1}_{t2}({s1}, {s2}))",
    )?;
    r.add_binary_rules(
        Ne,
        "BOOL <- STRLIST_CLOBLIST != STRLIST_CLOBLIST",
        "(1 - vsqlimpl_pkg.eq_{t1}_{t2}({s1}, {s2}))",
    )?;
    r.add_binary_rules(
        Ne,
        "BOOL <- DATELIST_DATETIMELIST != DATELIST_DATETIMELIST",
        "(1 - vsqlimpl_pkg.eq_{t1}_{t2}({s1}, {s2}))",
    )?;
    r.add_binary_rules(Ne, "BOOL <- NULLSET != NULLSET", "(1 - vsqlimpl_pkg.eq_nullset_nullset({s1}, {s2}))")?;
    r.add_binary_rules(Ne, "BOOL <- NULLSET != INTSET", "(1 - vsqlimpl_pkg.eq_nullset_intset({s1}, {s2}))")?;
    r.add_binary_rules(Ne, "BOOL <- NULLSET != NUMBERSET", "(1 - vsqlimpl_pkg.eq_nullset_numberset({s1}, {s2}))")?;
    r.add_binary_rules(Ne, "BOOL <- NULLSET != STRSET", "(1 - vsqlimpl_pkg.eq_nullset_strset({s1}, {s2}))")?;
    r.add_binary_rules(Ne, "BOOL <- NULLSET != DATESET", "(1 - vsqlimpl_pkg.eq_nullset_datetimeset({s1}, {s2}))")?;
    r.add_binary_rules(Ne, "BOOL <- NULLSET != DATETIMESET", "(1 - vsqlimpl_pkg.eq_nullset_datetimeset({s1}, {s2}))")?;
    r.add_binary_rules(Ne, "BOOL <- INTSET != NULLSET", "(1 - vsqlimpl_pkg.eq_intset_nullset({s1}, {s2}))")?;
    r.add_binary_rules(Ne, "BOOL <- NUMBERSET != NULLSET", "(1 - vsqlimpl_pkg.eq_numberset_nullset({s1}, {s2}))")?;
    r.add_binary_rules(Ne, "BOOL <- STRSET != NULLSET", "(1 - vsqlimpl_pkg.eq_strset_nullset({s1}, {s2}))")?;
    r.add_binary_rules(Ne, "BOOL <- DATESET != NULLSET", "(1 - vsqlimpl_pkg.eq_datetimeset_nullset({s1}, {s2}))")?;
    r.add_binary_rules(Ne, "BOOL <- DATETIMESET != NULLSET", "(1 - vsqlimpl_pkg.eq_datetimeset_nullset({s1}, {s2}))")?;
    r.add_binary_rules(Ne, "BOOL <- INTSET != INTSET", "(1 - vsqlimpl_pkg.eq_intset_intset({s1}, {s2}))")?;
    r.add_binary_rules(Ne, "BOOL <- NUMBERSET != NUMBERSET", "(1 - vsqlimpl_pkg.eq_numberset_numberset({s1}, {s2}))")?;
    r.add_binary_rules(Ne, "BOOL <- STRSET != STRSET", "(1 - vsqlimpl_pkg.eq_strset_strset({s1}, {s2}))")?;
    r.add_binary_rules(
        Ne,
        "BOOL <- DATESET_DATETIMESET != DATESET_DATETIMESET",
        "(1 - vsqlimpl_pkg.eq_datetimeset_datetimeset({s1}, {s2}))",
    )?;
    r.add_binary_rules(
        Ne,
        &format!("BOOL <- {ANY} != {ANY}"),
        "(case when {s1} is null and {s2} is null then 0 else 1 end)",
    )?;

    for (op, symbol, ord) in [(Gt, ">", ">"), (Ge, ">=", ">="), (Lt, "<", "<"), (Le, "<=", "<=")] {
        let _ = symbol;
        register_ordered_comparison(r, op, ord)?;
    }
    Ok(())
}

fn register_ordered_comparison(r: &mut Registry, op: BinaryOp, cmp: &str) -> Result<()> {
    use BinaryOp::*;
    let cmpfn = |s: &str| format!("(case when vsqlimpl_pkg.cmp_{{t1}}_{{t2}}({{s1}}, {{s2}}) {} 0 then 1 else 0 end)", s);

    match op {
        Gt => {
            r.add_binary_rules(op, "BOOL <- NULL > NULL", "0")?;
            r.add_binary_rules(op, &format!("BOOL <- {ANY} > NULL"), "(case when {s1} is null then 0 else 1 end)")?;
            r.add_binary_rules(op, &format!("BOOL <- NULL > {ANY}"), "0")?;
        }
        Ge => {
            r.add_binary_rules(op, &format!("BOOL <- {ANY} >= NULL"), "1")?;
            r.add_binary_rules(op, &format!("BOOL <- NULL >= {ANY}"), "(case when {s2} is null then 1 else 0 end)")?;
        }
        Lt => {
            r.add_binary_rules(op, &format!("BOOL <- {ANY} < NULL"), "0")?;
            r.add_binary_rules(op, &format!("BOOL <- NULL < {ANY}"), "(case when {s2} is null then 0 else 1 end)")?;
        }
        Le => {
            r.add_binary_rules(op, "BOOL <- NULL <= NULL", "1")?;
            r.add_binary_rules(op, &format!("BOOL <- {ANY} <= NULL"), "(case when {s1} is null then 1 else 0 end)")?;
            r.add_binary_rules(op, &format!("BOOL <- NULL <= {ANY}"), "1")?;
        }
        _ => unreachable!(),
    }

    let int_tmpl = format!(
        "(case when vsqlimpl_pkg.cmp_int_int({{s1}}, {{s2}}) {} 0 then 1 else 0 end)",
        cmp
    );
    r.add_binary_rules(op, &format!("BOOL <- {INTLIKE} {} {INTLIKE}", op.source_symbol()), &int_tmpl)?;
    let tt = cmpfn(cmp);
    r.add_binary_rules(op, &format!("BOOL <- {NUMBERLIKE} {} {NUMBERLIKE}", op.source_symbol()), &tt)?;
    r.add_binary_rules(op, &format!("BOOL <- {TEXT} {} {TEXT}", op.source_symbol()), &tt)?;
    r.add_binary_rules(op, &format!("BOOL <- DATE_DATETIME {} T1", op.source_symbol()), &tt)?;
    r.add_binary_rules(op, &format!("BOOL <- DATEDELTA {} DATEDELTA", op.source_symbol()), &int_tmpl)?;
    let num_tmpl = format!(
        "(case when vsqlimpl_pkg.cmp_number_number({{s1}}, {{s2}}) {} 0 then 1 else 0 end)",
        cmp
    );
    r.add_binary_rules(op, &format!("BOOL <- DATETIMEDELTA {} DATETIMEDELTA", op.source_symbol()), &num_tmpl)?;
    r.add_binary_rules(op, &format!("BOOL <- INTLIST_NUMBERLIST {} INTLIST_NUMBERLIST", op.source_symbol()), &tt)?;
    r.add_binary_rules(op, &format!("BOOL <- STRLIST_CLOBLIST {} STRLIST_CLOBLIST", op.source_symbol()), &tt)?;
    r.add_binary_rules(op, &format!("BOOL <- DATELIST_DATETIMELIST {} T1", op.source_symbol()), &tt)?;
    r.add_binary_rules(op, &format!("BOOL <- NULLLIST {} NULLLIST_{LIST}", op.source_symbol()), &tt)?;
    r.add_binary_rules(op, &format!("BOOL <- NULLLIST_{LIST} {} NULLLIST", op.source_symbol()), &tt)?;
    Ok(())
}

fn register_arithmetic(r: &mut Registry) -> Result<()> {
    use BinaryOp::*;

    r.add_binary_rules(Add, &format!("INT <- {INTLIKE} + {INTLIKE}"), "({s1} + {s2})")?;
    r.add_binary_rules(Add, &format!("NUMBER <- {NUMBERLIKE} + {NUMBERLIKE}"), "({s1} + {s2})")?;
    r.add_binary_rules(Add, "STR <- STR + STR", "({s1} || {s2})")?;
    r.add_binary_rules(Add, &format!("CLOB <- {TEXT} + {TEXT}"), "({s1} || {s2})")?;
    r.add_binary_rules(Add, "INTLIST <- INTLIST + INTLIST", "vsqlimpl_pkg.add_intlist_intlist({s1}, {s2})")?;
    r.add_binary_rules(
        Add,
        "NUMBERLIST <- INTLIST_NUMBERLIST + INTLIST_NUMBERLIST",
        "vsqlimpl_pkg.add_{t1}_{t2}({s1}, {s2})",
    )?;
    r.add_binary_rules(Add, "STRLIST <- STRLIST + STRLIST", "vsqlimpl_pkg.add_strlist_strlist({s1}, {s2})")?;
    r.add_binary_rules(
        Add,
        "CLOBLIST <- STRLIST_CLOBLIST + STRLIST_CLOBLIST",
        "vsqlimpl_pkg.add_{t1}_{t2}({s1}, {s2})",
    )?;
    r.add_binary_rules(Add, "T1 <- DATELIST_DATETIMELIST + T1", "vsqlimpl_pkg.add_{t1}_{t2}({s1}, {s2})")?;
    r.add_binary_rules(Add, "NULLLIST <- NULLLIST + NULLLIST", "({s1} + {s2})")?;
    r.add_binary_rules(Add, &format!("T2 <- NULLLIST + NULLLIST_{LIST}"), "vsqlimpl_pkg.add_{t1}_{t2}({s1}, {s2})")?;
    r.add_binary_rules(Add, &format!("T1 <- NULLLIST_{LIST} + NULLLIST"), "vsqlimpl_pkg.add_{t1}_{t2}({s1}, {s2})")?;
    r.add_binary_rules(Add, "DATE <- DATE + DATEDELTA", "({s1} + {s2})")?;
    r.add_binary_rules(Add, "DATETIME <- DATETIME + DATEDELTA_DATETIMEDELTA", "({s1} + {s2})")?;
    r.add_binary_rules(Add, "T1 <- DATE_DATETIME + MONTHDELTA", "vsqlimpl_pkg.add_{t1}_months({s1}, {s2})")?;
    r.add_binary_rules(Add, "T2 <- MONTHDELTA + DATE_DATETIME", "vsqlimpl_pkg.add_months_{t2}({s1}, {s2})")?;
    r.add_binary_rules(Add, "DATEDELTA <- DATEDELTA + DATEDELTA", "({s1} + {s2})")?;
    r.add_binary_rules(
        Add,
        "DATETIMEDELTA <- DATEDELTA_DATETIMEDELTA + DATEDELTA_DATETIMEDELTA",
        "({s1} + {s2})",
    )?;
    r.add_binary_rules(Add, "MONTHDELTA <- MONTHDELTA + MONTHDELTA", "({s1} + {s2})")?;

    r.add_binary_rules(Sub, &format!("INT <- {INTLIKE} - {INTLIKE}"), "({s1} - {s2})")?;
    r.add_binary_rules(Sub, &format!("NUMBER <- {NUMBERLIKE} - {NUMBERLIKE}"), "({s1} - {s2})")?;
    r.add_binary_rules(Sub, "DATE <- DATE - DATEDELTA", "({s1} - {s2})")?;
    r.add_binary_rules(Sub, "DATEDELTA <- DATE - DATE", "({s1} - {s2})")?;
    r.add_binary_rules(Sub, "DATETIMEDELTA <- DATETIME - DATETIME", "({s1} - {s2})")?;
    r.add_binary_rules(Sub, "T1 <- DATE_DATETIME - MONTHDELTA", "vsqlimpl_pkg.add_{t1}_months({s1}, -{s2})")?;
    r.add_binary_rules(Sub, "DATETIME <- DATETIME - DATEDELTA_DATETIMEDELTA", "({s1} - {s2})")?;
    r.add_binary_rules(Sub, "T1 <- DATEDELTA_MONTHDELTA - T1", "({s1} - {s2})")?;
    r.add_binary_rules(
        Sub,
        "DATETIMEDELTA <- DATEDELTA_DATETIMEDELTA - DATEDELTA_DATETIMEDELTA",
        "({s1} - {s2})",
    )?;

    r.add_binary_rules(Mul, &format!("INT <- {INTLIKE} * {INTLIKE}"), "({s1} * {s2})")?;
    r.add_binary_rules(Mul, &format!("NUMBER <- {NUMBERLIKE} * {NUMBERLIKE}"), "({s1} * {s2})")?;
    r.add_binary_rules(
        Mul,
        &format!("T2 <- {INTLIKE} * DATEDELTA_DATETIMEDELTA_MONTHDELTA"),
        "({s1} * {s2})",
    )?;
    r.add_binary_rules(Mul, "DATETIMEDELTA <- NUMBER * DATETIMEDELTA", "({s1} * {s2})")?;
    r.add_binary_rules(Mul, &format!("T2 <- {INTLIKE} * {TEXT}"), "vsqlimpl_pkg.mul_int_{t2}({s1}, {s2})")?;
    r.add_binary_rules(Mul, &format!("T1 <- {TEXT} * {INTLIKE}"), "vsqlimpl_pkg.mul_{t1}_int({s1}, {s2})")?;
    r.add_binary_rules(Mul, &format!("T2 <- {INTLIKE} * {LIST}"), "vsqlimpl_pkg.mul_int_{t2}({s1}, {s2})")?;
    r.add_binary_rules(Mul, &format!("T1 <- {LIST} * {INTLIKE}"), "vsqlimpl_pkg.mul_{t1}_int({s1}, {s2})")?;
    r.add_binary_rules(Mul, &format!("NULLLIST <- {INTLIKE} * NULLLIST"), "({s1} * {s2})")?;
    r.add_binary_rules(Mul, &format!("NULLLIST <- NULLLIST * {INTLIKE}"), "({s1} * {s2})")?;

    r.add_binary_rules(Div, "INT <- BOOL / BOOL", "({s1} / {s2})")?;
    r.add_binary_rules(Div, &format!("NUMBER <- {NUMBERLIKE} / {NUMBERLIKE}"), "({s1} / {s2})")?;
    r.add_binary_rules(Div, &format!("DATETIMEDELTA <- DATETIMEDELTA / {NUMBERLIKE}"), "({s1} / {s2})")?;

    r.add_binary_rules(
        FloorDiv,
        &format!("INT <- {NUMBERLIKE} // {NUMBERLIKE}"),
        "vsqlimpl_pkg.floordiv_{t1}_{t2}({s1}, {s2})",
    )?;
    r.add_binary_rules(
        FloorDiv,
        &format!("T1 <- DATEDELTA_MONTHDELTA // {INTLIKE}"),
        "vsqlimpl_pkg.floordiv_int_int({s1}, {s2})",
    )?;
    r.add_binary_rules(
        FloorDiv,
        &format!("DATEDELTA <- DATETIMEDELTA // {NUMBERLIKE}"),
        "vsqlimpl_pkg.floordiv_number_int({s1}, {s2})",
    )?;

    r.add_binary_rules(Mod, &format!("INT <- {INTLIKE} % {INTLIKE}"), "vsqlimpl_pkg.mod_int_int({s1}, {s2})")?;
    r.add_binary_rules(Mod, &format!("NUMBER <- {NUMBERLIKE} % {NUMBERLIKE}"), "vsqlimpl_pkg.mod_{t1}_{t2}({s1}, {s2})")?;
    r.add_binary_rules(Mod, "COLOR <- COLOR % COLOR", "vsqlimpl_pkg.mod_color_color({s1}, {s2})")?;

    r.add_binary_rules(
        Shl,
        &format!("INT <- {INTLIKE} << {INTLIKE}"),
        "trunc({s1} * power(2, {s2}))",
    )?;
    r.add_binary_rules(
        Shr,
        &format!("INT <- {INTLIKE} >> {INTLIKE}"),
        "trunc({s1} / power(2, {s2}))",
    )?;
    Ok(())
}

/// `and`/`or`/`in`/`not in`/`is`/`is not` can't spell their keyword in a rule
/// spec without it being parsed as an operand word, so these specs use the
/// `"?"` placeholder `spec.md` §9 documents (see `rule.rs`'s `SigSlot` doc
/// comment for why this is safe).
fn register_logic(r: &mut Registry) -> Result<()> {
    use BinaryOp::*;

    r.add_binary_rules(And, &format!("T1 <- {ANY} ? NULL"), "null")?;
    r.add_binary_rules(And, &format!("T2 <- NULL ? {ANY}"), "null")?;
    r.add_binary_rules(And, "BOOL <- BOOL ? BOOL", "(case when {s1} = 1 then {s2} else 0 end)")?;
    r.add_binary_rules(
        And,
        &format!("INT <- {INTLIKE} ? {INTLIKE}"),
        "(case when nvl({s1}, 0) != 0 then {s2} else {s1} end)",
    )?;
    r.add_binary_rules(
        And,
        &format!("NUMBER <- {NUMBERLIKE} ? {NUMBERLIKE}"),
        "(case when nvl({s1}, 0) != 0 then {s2} else {s1} end)",
    )?;
    r.add_binary_rules(And, "STR <- STR ? STR", "nvl2({s1}, {s2}, {s1})")?;
    r.add_binary_rules(
        And,
        "CLOB <- CLOB ? CLOB",
        "(case when {s1} is not null and length({s1}) != 0 then {s2} else {s1} end)",
    )?;
    r.add_binary_rules(And, "T1 <- DATE_DATETIME ? T1", "nvl2({s1}, {s2}, {s1})")?;
    r.add_binary_rules(
        And,
        "T1 <- DATEDELTA_DATETIMEDELTA_MONTHDELTA ? T1",
        "(case when nvl({s1}, 0) != 0 then {s2} else {s1} end)",
    )?;
    r.add_binary_rules(
        And,
        &format!("T1 <- {LIST} ? T1"),
        "(case when nvl(vsqlimpl_pkg.len_{t1}({s1}), 0) != 0 then {s2} else {s1} end)",
    )?;
    r.add_binary_rules(
        And,
        "DATETIMELIST <- DATELIST_DATETIMELIST ? DATELIST_DATETIMELIST",
        "(case when nvl(vsqlimpl_pkg.len_{t1}({s1}), 0) != 0 then {s2} else {s1} end)",
    )?;
    r.add_binary_rules(
        And,
        "NULLLIST <- NULLLIST ? NULLLIST",
        "(case when nvl({s1}, 0) != 0 then {s2} else {s1} end)",
    )?;
    r.add_binary_rules(
        And,
        &format!("T2 <- NULLLIST ? {LIST}"),
        "(case when nvl({s1}, 0) != 0 then {s2} else vsqlimpl_pkg.{t2}_fromlen({s1}) end)",
    )?;
    r.add_binary_rules(
        And,
        &format!("T1 <- {LIST} ? NULLLIST"),
        "(case when nvl(vsqlimpl_pkg.len_{t1}({s1}), 0) != 0 then vsqlimpl_pkg.{t1}_fromlen({s2}) else {s1} end)",
    )?;

    r.add_binary_rules(Or, &format!("T1 <- {ANY} ? NULL"), "{s1}")?;
    r.add_binary_rules(Or, &format!("T2 <- NULL ? {ANY}"), "{s2}")?;
    r.add_binary_rules(Or, "BOOL <- BOOL ? BOOL", "(case when {s1} = 1 then 1 else {s2} end)")?;
    r.add_binary_rules(
        Or,
        &format!("INT <- {INTLIKE} ? {INTLIKE}"),
        "(case when nvl({s1}, 0) != 0 then {s1} else {s2} end)",
    )?;
    r.add_binary_rules(
        Or,
        &format!("NUMBER <- {NUMBERLIKE} ? {NUMBERLIKE}"),
        "(case when nvl({s1}, 0) != 0 then {s1} else {s2} end)",
    )?;
    r.add_binary_rules(Or, "STR <- STR ? STR", "nvl({s1}, {s2})")?;
    r.add_binary_rules(
        Or,
        "CLOB <- CLOB ? CLOB",
        "(case when {s1} is not null and length({s1}) != 0 then {s1} else {s2} end)",
    )?;
    r.add_binary_rules(Or, "T1 <- DATE_DATETIME ? T1", "nvl({s1}, {s2})")?;
    r.add_binary_rules(
        Or,
        "T1 <- DATEDELTA_DATETIMEDELTA_MONTHDELTA ? T1",
        "(case when nvl({s1}, 0) != 0 then {s1} else {s2} end)",
    )?;
    r.add_binary_rules(
        Or,
        &format!("T1 <- {LIST} ? T1"),
        "(case when nvl(vsqlimpl_pkg.len_{t1}({s1}), 0) != 0 then {s1} else {s2} end)",
    )?;
    r.add_binary_rules(
        Or,
        "DATETIMELIST <- DATELIST_DATETIMELIST ? DATELIST_DATETIMELIST",
        "(case when nvl(vsqlimpl_pkg.len_{t1}({s1}), 0) != 0 then {s1} else {s2} end)",
    )?;
    r.add_binary_rules(
        Or,
        "NULLLIST <- NULLLIST ? NULLLIST",
        "(case when nvl({s1}, 0) != 0 then {s1} else {s2} end)",
    )?;
    r.add_binary_rules(
        Or,
        &format!("T2 <- NULLLIST ? {LIST}"),
        "(case when nvl({s1}, 0) != 0 then vsqlimpl_pkg.{t2}_fromlen({s1}) else {s2} end)",
    )?;
    r.add_binary_rules(
        Or,
        &format!("T1 <- {LIST} ? NULLLIST"),
        "(case when nvl(vsqlimpl_pkg.len_{t1}({s1}), 0) != 0 then {s1} else vsqlimpl_pkg.{t1}_fromlen({s2}) end)",
    )?;

    r.add_binary_rules(
        In,
        &format!("BOOL <- NULL ? {LIST}_NULLLIST"),
        "vsqlimpl_pkg.contains_null_{t2}({s2})",
    )?;
    r.add_binary_rules(
        In,
        "BOOL <- STR ? STR_CLOB_STRLIST_CLOBLIST_STRSET",
        "vsqlimpl_pkg.contains_str_{t2}({s1}, {s2})",
    )?;
    r.add_binary_rules(
        In,
        "BOOL <- INT_NUMBER ? INTLIST_NUMBERLIST_INTSET_NUMBERSET",
        "vsqlimpl_pkg.contains_{t1}_{t2}({s1}, {s2})",
    )?;
    r.add_binary_rules(In, "BOOL <- DATE ? DATELIST_DATESET", "vsqlimpl_pkg.contains_{t1}_{t2}({s1}, {s2})")?;
    r.add_binary_rules(
        In,
        "BOOL <- DATETIME ? DATETIMELIST_DATETIMESET",
        "vsqlimpl_pkg.contains_{t1}_{t2}({s1}, {s2})",
    )?;
    r.add_binary_rules(
        In,
        &format!("BOOL <- {ANY} ? NULLLIST"),
        "case when {s1} is null then vsqlimpl_pkg.contains_null_nulllist({s2}) else 0 end",
    )?;

    r.add_binary_rules(
        NotIn,
        &format!("BOOL <- NULL ? {LIST}_NULLLIST"),
        "(1 - vsqlimpl_pkg.contains_null_{t2}({s2}))",
    )?;
    r.add_binary_rules(
        NotIn,
        "BOOL <- STR ? STR_CLOB_STRLIST_CLOBLIST_STRSET",
        "(1 - vsqlimpl_pkg.contains_str_{t2}({s1}, {s2}))",
    )?;
    r.add_binary_rules(
        NotIn,
        "BOOL <- INT_NUMBER ? INTLIST_NUMBERLIST_INTSET_NUMBERSET",
        "(1 - vsqlimpl_pkg.contains_{t1}_{t2}({s1}, {s2}))",
    )?;
    r.add_binary_rules(NotIn, "BOOL <- DATE ? DATELIST_DATESET", "(1 - vsqlimpl_pkg.contains_{t1}_{t2}({s1}, {s2}))")?;
    r.add_binary_rules(
        NotIn,
        "BOOL <- DATETIME ? DATETIMELIST_DATETIMESET",
        "(1 - vsqlimpl_pkg.contains_{t1}_{t2}({s1}, {s2}))",
    )?;
    r.add_binary_rules(
        NotIn,
        &format!("BOOL <- {ANY} ? NULLLIST"),
        "case when {s1} is null then 1 - vsqlimpl_pkg.contains_null_nulllist({s2}) else 1 end",
    )?;

    r.add_binary_rules(Is, "BOOL <- NULL ? NULL", "1")?;
    r.add_binary_rules(Is, &format!("BOOL <- {ANY} ? NULL"), "(case when {s1} is null then 1 else 0 end)")?;
    r.add_binary_rules(Is, &format!("BOOL <- NULL ? {ANY}"), "(case when {s2} is null then 1 else 0 end)")?;

    r.add_binary_rules(IsNot, "BOOL <- NULL ? NULL", "0")?;
    r.add_binary_rules(IsNot, &format!("BOOL <- {ANY} ? NULL"), "(case when {s1} is not null then 1 else 0 end)")?;
    r.add_binary_rules(IsNot, &format!("BOOL <- NULL ? {ANY}"), "(case when {s2} is not null then 1 else 0 end)")?;

    r.add_binary_rules(Item, &format!("NULL <- NULLLIST[{INTLIKE}]"), "null")?;
    r.add_binary_rules(
        Item,
        &format!("STR <- STR_CLOB_STRLIST[{INTLIKE}]"),
        "vsqlimpl_pkg.item_{t1}({s1}, {s2})",
    )?;
    r.add_binary_rules(Item, &format!("CLOB <- CLOBLIST[{INTLIKE}]"), "vsqlimpl_pkg.item_{t1}({s1}, {s2})")?;
    r.add_binary_rules(Item, &format!("INT <- INTLIST[{INTLIKE}]"), "vsqlimpl_pkg.item_{t1}({s1}, {s2})")?;
    r.add_binary_rules(Item, &format!("NUMBER <- NUMBERLIST[{INTLIKE}]"), "vsqlimpl_pkg.item_{t1}({s1}, {s2})")?;
    r.add_binary_rules(Item, &format!("DATE <- DATELIST[{INTLIKE}]"), "vsqlimpl_pkg.item_{t1}({s1}, {s2})")?;
    r.add_binary_rules(Item, &format!("DATETIME <- DATETIMELIST[{INTLIKE}]"), "vsqlimpl_pkg.item_{t1}({s1}, {s2})")?;
    Ok(())
}

fn register_bitwise(r: &mut Registry) -> Result<()> {
    use BinaryOp::*;

    r.add_binary_rules(BitAnd, &format!("INT <- {INTLIKE} & {INTLIKE}"), "bitand({s1}, {s2})")?;
    r.add_binary_rules(BitAnd, "T1 <- INTSET & INTSET", "vsqlimpl_pkg.bitand_intset({s1}, {s2})")?;
    r.add_binary_rules(BitAnd, "T1 <- NUMBERSET & NUMBERSET", "vsqlimpl_pkg.bitand_numberset({s1}, {s2})")?;
    r.add_binary_rules(BitAnd, "T1 <- STRSET & STRSET", "vsqlimpl_pkg.bitand_strset({s1}, {s2})")?;
    r.add_binary_rules(BitAnd, "T1 <- DATESET_DATETIMESET & T1", "vsqlimpl_pkg.bitand_datetimeset({s1}, {s2})")?;

    r.add_binary_rules(BitOr, &format!("INT <- {INTLIKE} | {INTLIKE}"), "vsqlimpl_pkg.bitor_int({s1}, {s2})")?;
    r.add_binary_rules(BitOr, "T1 <- INTSET | INTSET", "vsqlimpl_pkg.bitor_intset({s1}, {s2})")?;
    r.add_binary_rules(BitOr, "T1 <- NUMBERSET | NUMBERSET", "vsqlimpl_pkg.bitor_numberset({s1}, {s2})")?;
    r.add_binary_rules(BitOr, "T1 <- STRSET | STRSET", "vsqlimpl_pkg.bitor_strset({s1}, {s2})")?;
    r.add_binary_rules(BitOr, "T1 <- DATESET_DATETIMESET | T1", "vsqlimpl_pkg.bitor_datetimeset({s1}, {s2})")?;

    r.add_binary_rules(BitXor, &format!("INT <- {INTLIKE} ^ {INTLIKE}"), "vsqlimpl_pkg.bitxor_int({s1}, {s2})")?;
    Ok(())
}

fn register_unary(r: &mut Registry) -> Result<()> {
    use UnaryOp::*;

    r.add_unary_rules(Not, "BOOL <- ? NULL", "1")?;
    r.add_unary_rules(Not, "BOOL <- ? BOOL", "(case {s1} when 1 then 0 else 1 end)")?;
    r.add_unary_rules(
        Not,
        "BOOL <- ? INT_NUMBER_DATEDELTA_DATETIMEDELTA_MONTHDELTA",
        "(case nvl({s1}, 0) when 0 then 1 else 0 end)",
    )?;
    r.add_unary_rules(Not, "BOOL <- ? DATE_DATETIME_STR_COLOR_GEO", "(case when {s1} is null then 1 else 0 end)")?;
    r.add_unary_rules(Not, &format!("BOOL <- ? {ANY}"), "(1 - vsqlimpl_pkg.bool_{t1}({s1}))")?;

    r.add_unary_rules(Neg, "INT <- BOOL", "(-{s1})")?;
    r.add_unary_rules(Neg, "T1 <- INT_NUMBER_DATEDELTA_DATETIMEDELTA_MONTHDELTA", "(-{s1})")?;

    r.add_unary_rules(BitNot, &format!("INT <- {INTLIKE}"), "(-{s1} - 1)")?;
    Ok(())
}

fn register_if_and_slice(r: &mut Registry) -> Result<()> {
    r.add_if_rules(&format!("T1 <- {ANY} ? NULL ? T1"), "{s3}")?;
    r.add_if_rules(&format!("INT <- {INTLIKE} ? NULL ? {INTLIKE}"), "{s3}")?;
    r.add_if_rules(&format!("NUMBER <- {NUMBERLIKE} ? NULL ? {NUMBERLIKE}"), "{s3}")?;
    r.add_if_rules(&format!("T1 <- {ANY} ? NULL ? NULL"), "{s3}")?;
    r.add_if_rules(&format!("T3 <- NULL ? NULL ? {ANY}"), "{s3}")?;
    r.add_if_rules(
        &format!("T1 <- {ANY} ? {NUMBERSTORED} ? T1"),
        "(case when nvl({s2}, 0) != 0 then {s1} else {s3} end)",
    )?;
    r.add_if_rules(
        &format!("INT <- {INTLIKE} ? {NUMBERSTORED} ? {INTLIKE}"),
        "(case when nvl({s2}, 0) != 0 then {s1} else {s3} end)",
    )?;
    r.add_if_rules(
        &format!("NUMBER <- {NUMBERLIKE} ? {NUMBERSTORED} ? {NUMBERLIKE}"),
        "(case when nvl({s2}, 0) != 0 then {s1} else {s3} end)",
    )?;
    r.add_if_rules(
        &format!("T1 <- {ANY} ? {NUMBERSTORED} ? NULL"),
        "(case when nvl({s2}, 0) != 0 then {s1} else {s3} end)",
    )?;
    r.add_if_rules(
        &format!("T3 <- NULL ? {NUMBERSTORED} ? {ANY}"),
        "(case when nvl({s2}, 0) != 0 then {s1} else {s3} end)",
    )?;
    r.add_if_rules(
        &format!("T1 <- {ANY} ? DATE_DATETIME_STR_GEO ? T1"),
        "(case when {s2} is not null then {s1} else {s3} end)",
    )?;
    r.add_if_rules(
        &format!("INT <- {INTLIKE} ? DATE_DATETIME_STR_GEO ? {INTLIKE}"),
        "(case when {s2} is not null then {s1} else {s3} end)",
    )?;
    r.add_if_rules(
        &format!("NUMBER <- {NUMBERLIKE} ? DATE_DATETIME_STR_GEO ? {NUMBERLIKE}"),
        "(case when {s2} is not null then {s1} else {s3} end)",
    )?;
    r.add_if_rules(
        &format!("T1 <- {ANY} ? DATE_DATETIME_STR_GEO ? NULL"),
        "(case when {s2} is not null then {s1} else {s3} end)",
    )?;
    r.add_if_rules(
        &format!("T3 <- NULL ? DATE_DATETIME_STR_GEO ? {ANY}"),
        "(case when {s2} is not null then {s1} else {s3} end)",
    )?;
    r.add_if_rules(
        &format!("T1 <- {ANY} ? {ANY} ? T1"),
        "(case when vsqlimpl_pkg.bool_{t2}({s2}) = 1 then {s1} else {s3} end)",
    )?;
    r.add_if_rules(
        &format!("INT <- {INTLIKE} ? {ANY} ? {INTLIKE}"),
        "(case when vsqlimpl_pkg.bool_{t2}({s2}) = 1 then {s1} else {s3} end)",
    )?;
    r.add_if_rules(
        &format!("NUMBER <- {NUMBERLIKE} ? {ANY} ? {NUMBERLIKE}"),
        "(case when vsqlimpl_pkg.bool_{t2}({s2}) = 1 then {s1} else {s3} end)",
    )?;
    r.add_if_rules(
        &format!("T1 <- {ANY} ? {ANY} ? NULL"),
        "(case when vsqlimpl_pkg.bool_{t2}({s2}) = 1 then {s1} else {s3} end)",
    )?;
    r.add_if_rules(
        &format!("T3 <- NULL ? {ANY} ? {ANY}"),
        "(case when vsqlimpl_pkg.bool_{t2}({s2}) = 1 then {s1} else {s3} end)",
    )?;

    r.add_slice_rules(
        &format!("T1 <- {TEXT}_{LIST}[NULL_{INTLIKE}:NULL_{INTLIKE}]"),
        "vsqlimpl_pkg.slice_{t1}({s1}, {s2}, {s3})",
    )?;
    r.add_slice_rules(
        &format!("NULLLIST <- NULLLIST[NULL_{INTLIKE}:NULL_{INTLIKE}]"),
        "vsqlimpl_pkg.slice_{t1}({s1}, {s2}, {s3})",
    )?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_backend_builds() {
        default_backend().expect("default rule table should register cleanly");
    }

    #[test]
    fn test_eq_null_rule() {
        let r = default_backend().unwrap();
        let (dt, _) = r.validate_binary(BinaryOp::Eq, DataType::Int, DataType::Null).unwrap();
        assert_eq!(dt, DataType::Bool);
    }

    #[test]
    fn test_bool_function_known_name_wrong_arity() {
        let r = default_backend().unwrap();
        let err = r.validate_function("bool", &[DataType::Int, DataType::Int]).unwrap_err();
        assert_eq!(err, CompileError::Arity);
    }

    #[test]
    fn test_unknown_function_name() {
        let r = default_backend().unwrap();
        let err = r.validate_function("frobnicate", &[]).unwrap_err();
        assert_eq!(err, CompileError::Name);
    }

    #[test]
    fn test_attr_year_on_date() {
        let r = default_backend().unwrap();
        let (dt, _) = r.validate_attr(DataType::Date, "year").unwrap();
        assert_eq!(dt, DataType::Int);
    }

    #[test]
    fn test_method_lower_on_str() {
        let r = default_backend().unwrap();
        let (dt, _) = r.validate_method(DataType::Str, "lower", &[]).unwrap();
        assert_eq!(dt, DataType::Str);
    }

    #[test]
    fn test_if_with_bool_condition() {
        let r = default_backend().unwrap();
        let (dt, _) = r.validate_if(DataType::Int, DataType::Bool, DataType::Int).unwrap();
        assert_eq!(dt, DataType::Int);
    }

    #[test]
    fn test_slice_on_str() {
        let r = default_backend().unwrap();
        let (dt, _) = r.validate_slice(DataType::Str, DataType::Null, DataType::Int).unwrap();
        assert_eq!(dt, DataType::Str);
    }
}
