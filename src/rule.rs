//! The rule registry and rule-spec parser (`spec.md` §4.1).
//!
//! A rule ties an operand-type signature to an inferred result type and an
//! SQL-emission template. Rules are authored as two plain strings — a
//! signature spec (`"BOOL <- STR_CLOB == STR_CLOB"`) and a source template
//! (`"vsqlimpl_pkg.eq_{t1}_{t2}({s1}, {s2})"`) — so the grammar table in
//! `examples/original_source/src/ll/la/vsql.py`'s `add_rules` calls ports
//! across verbatim (`spec.md` §9).
//!
//! Four concrete registries share this parsing machinery, one per node-kind
//! family, because each family builds a different shape of lookup key:
//! operators key purely on operand types, functions key on `(name, args)`,
//! methods on `(receiver, name, args)`, attributes on `(receiver, name)`.

use std::collections::{HashMap, HashSet};

use crate::datatype::{CompileError, DataType};
use crate::error::{Error, Result};

/// One placeholder-tokenised fragment of a source template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TemplateToken {
    Literal(String),
    /// `{s<n>}`: emit operand `n`'s SQL source (1-based).
    Source(usize),
    /// `{t<n>}`: emit operand `n`'s aliased type name (1-based).
    TypeName(usize),
}

/// Parse a source template into tokens.
pub fn parse_template(template: &str) -> Vec<TemplateToken> {
    let mut tokens = Vec::new();
    let mut literal = String::new();
    let chars: Vec<char> = template.chars().collect();
    let mut i = 0;
    while i < chars.len() {
        if chars[i] == '{' {
            if let Some(close) = chars[i..].iter().position(|&c| c == '}') {
                let inner: String = chars[i + 1..i + close].iter().collect();
                if let Some(rest) = inner.strip_prefix('s') {
                    if let Ok(n) = rest.parse::<usize>() {
                        if !literal.is_empty() {
                            tokens.push(TemplateToken::Literal(std::mem::take(&mut literal)));
                        }
                        tokens.push(TemplateToken::Source(n));
                        i += close + 1;
                        continue;
                    }
                } else if let Some(rest) = inner.strip_prefix('t') {
                    if let Ok(n) = rest.parse::<usize>() {
                        if !literal.is_empty() {
                            tokens.push(TemplateToken::Literal(std::mem::take(&mut literal)));
                        }
                        tokens.push(TemplateToken::TypeName(n));
                        i += close + 1;
                        continue;
                    }
                }
            }
        }
        literal.push(chars[i]);
        i += 1;
    }
    if !literal.is_empty() {
        tokens.push(TemplateToken::Literal(literal));
    }
    tokens
}

/// Render a rule's template given already-emitted operand SQL fragments and
/// their (concrete) datatypes.
pub fn render_template(template: &[TemplateToken], operand_sql: &[String], operand_types: &[DataType]) -> String {
    let mut out = String::new();
    for tok in template {
        match tok {
            TemplateToken::Literal(s) => out.push_str(s),
            TemplateToken::Source(n) => out.push_str(&operand_sql[n - 1]),
            TemplateToken::TypeName(n) => out.push_str(operand_types[n - 1].template_alias()),
        }
    }
    out
}

/// One operand position in a parsed signature spec: either a concrete union
/// of acceptable datatypes, or a forward reference `T<n>` to another
/// operand position.
///
/// A handful of historical rule specs write `"?"` in place of a word
/// operator keyword (`not`/`and`/`or`/`in`/`is` — `spec.md` §9 open
/// question). Word-splitting the spec string on non-word characters already
/// discards `"?"` exactly like it discards symbolic operators (`==`, `+`,
/// ...), so no special case is needed here: preserving the placeholder
/// convention falls out of not trying to parse an operator keyword from the
/// spec string at all.
#[derive(Debug, Clone, PartialEq, Eq)]
enum SigSlot {
    Union(Vec<DataType>),
    Ref(usize),
}

struct ParsedSignature {
    result: SigSlot,
    name: Option<String>,
    operands: Vec<SigSlot>,
}

fn split_words(spec: &str) -> Vec<&str> {
    spec.split(|c: char| !(c.is_ascii_alphanumeric() || c == '_'))
        .filter(|s| !s.is_empty())
        .collect()
}

fn parse_slot(tok: &str) -> Result<SigSlot> {
    if let Some(rest) = tok.strip_prefix('T') {
        if !rest.is_empty() && rest.chars().all(|c| c.is_ascii_digit()) {
            let n: usize = rest.parse().unwrap();
            return Ok(SigSlot::Ref(n));
        }
    }
    let types: Result<Vec<DataType>> = tok
        .split('_')
        .map(|t| {
            DataType::parse(t).ok_or_else(|| Error::malformed_rule_spec(format!("unknown datatype token '{}'", t)))
        })
        .collect();
    Ok(SigSlot::Union(types?))
}

fn parse_signature(spec: &str) -> Result<ParsedSignature> {
    let tokens = split_words(spec);
    let (result_tok, rest) = tokens
        .split_first()
        .ok_or_else(|| Error::malformed_rule_spec("empty rule spec"))?;
    let result = parse_slot(result_tok)?;
    let mut name = None;
    let mut operands = Vec::new();
    for tok in rest {
        let is_name = tok.chars().next().map(|c| c.is_ascii_lowercase()).unwrap_or(false);
        if is_name {
            if name.is_some() {
                return Err(Error::malformed_rule_spec(format!(
                    "more than one name token in rule spec ('{}')",
                    spec
                )));
            }
            name = Some((*tok).to_string());
        } else {
            operands.push(parse_slot(tok)?);
        }
    }
    Ok(ParsedSignature { result, name, operands })
}

/// A fully-expanded rule: one concrete operand-type tuple plus its result.
#[derive(Debug, Clone)]
struct Expansion {
    operands: Vec<DataType>,
    result: DataType,
}

fn cartesian_product(sets: &[&Vec<DataType>]) -> Vec<Vec<DataType>> {
    let mut combos: Vec<Vec<DataType>> = vec![Vec::new()];
    for set in sets {
        let mut next = Vec::with_capacity(combos.len() * set.len());
        for combo in &combos {
            for ty in set.iter() {
                let mut extended = combo.clone();
                extended.push(*ty);
                next.push(extended);
            }
        }
        combos = next;
    }
    combos
}

fn resolve_ref_target(slots: &[SigSlot], n: usize, spec: &str) -> Result<()> {
    if n == 0 || n > slots.len() {
        return Err(Error::malformed_rule_spec(format!(
            "forward reference T{} out of range in '{}'",
            n, spec
        )));
    }
    if matches!(slots[n - 1], SigSlot::Ref(_)) {
        return Err(Error::chained_forward_reference(n));
    }
    Ok(())
}

fn expand(sig: &ParsedSignature, spec: &str) -> Result<Vec<Expansion>> {
    for slot in &sig.operands {
        if let SigSlot::Ref(n) = slot {
            resolve_ref_target(&sig.operands, *n, spec)?;
        }
    }
    if let SigSlot::Ref(n) = &sig.result {
        resolve_ref_target(&sig.operands, *n, spec)?;
    }

    let free_positions: Vec<usize> = sig
        .operands
        .iter()
        .enumerate()
        .filter(|(_, s)| matches!(s, SigSlot::Union(_)))
        .map(|(i, _)| i)
        .collect();
    let free_unions: Vec<&Vec<DataType>> = free_positions
        .iter()
        .map(|&i| match &sig.operands[i] {
            SigSlot::Union(v) => v,
            _ => unreachable!("filtered to Union above"),
        })
        .collect();

    let combos = if free_positions.is_empty() {
        vec![Vec::new()]
    } else {
        cartesian_product(&free_unions)
    };

    let mut expansions = Vec::with_capacity(combos.len());
    for combo in combos {
        let mut operands: Vec<Option<DataType>> = vec![None; sig.operands.len()];
        for (k, &pos) in free_positions.iter().enumerate() {
            operands[pos] = Some(combo[k]);
        }
        for (i, slot) in sig.operands.iter().enumerate() {
            if let SigSlot::Ref(n) = slot {
                operands[i] = operands[n - 1];
            }
        }
        let operands: Vec<DataType> = operands
            .into_iter()
            .collect::<Option<Vec<_>>>()
            .ok_or_else(|| Error::malformed_rule_spec(format!("unresolved operand in '{}'", spec)))?;
        let result = match &sig.result {
            SigSlot::Ref(n) => operands[*n - 1],
            SigSlot::Union(v) if v.len() == 1 => v[0],
            SigSlot::Union(_) => {
                return Err(Error::malformed_rule_spec(format!(
                    "ambiguous multi-type result in '{}'",
                    spec
                )))
            }
        };
        expansions.push(Expansion { operands, result });
    }
    Ok(expansions)
}

/// A single registered rule row, after the owning registry has resolved its
/// key. Stored by value in each registry's map.
#[derive(Debug, Clone)]
pub struct Rule {
    pub result: DataType,
    pub template: Vec<TemplateToken>,
}

/// Rule table for pure operators (binary, unary, slice, ternary): the key
/// is just the operand-type tuple, there is no name concept, so a lookup
/// miss is always `SUBNODETYPES`.
#[derive(Debug, Default)]
pub struct OperatorRules {
    rules: HashMap<Vec<DataType>, Rule>,
}

impl OperatorRules {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_rules(&mut self, spec: &str, template: &str) -> Result<()> {
        let sig = parse_signature(spec)?;
        let tokens = parse_template(template);
        for expansion in expand(&sig, spec)? {
            let key = expansion.operands.clone();
            if self.rules.contains_key(&key) {
                log::warn!("duplicate operator rule for key {:?} ignored", key);
                continue;
            }
            log::debug!("registered operator rule {:?} -> {}", key, expansion.result);
            self.rules.insert(
                key,
                Rule {
                    result: expansion.result,
                    template: tokens.clone(),
                },
            );
        }
        Ok(())
    }

    pub fn validate(&self, operands: &[DataType]) -> std::result::Result<(DataType, &[TemplateToken]), CompileError> {
        self.rules
            .get(operands)
            .map(|r| (r.result, r.template.as_slice()))
            .ok_or(CompileError::SubNodeTypes)
    }

    /// Every registered `(operand types) -> Rule` row, for the DDL emitter
    /// (`spec.md` §6.2's "companion DDL routine ... generated from the
    /// in-process rule table").
    pub fn iter(&self) -> impl Iterator<Item = (&[DataType], &Rule)> {
        self.rules.iter().map(|(k, v)| (k.as_slice(), v))
    }
}

/// Rule table for free function calls: key is `(name, arg types)`.
#[derive(Debug, Default)]
pub struct FunctionRules {
    rules: HashMap<(String, Vec<DataType>), Rule>,
    arities: HashMap<String, HashSet<usize>>,
}

impl FunctionRules {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_rules(&mut self, spec: &str, template: &str) -> Result<()> {
        let sig = parse_signature(spec)?;
        let name = sig
            .name
            .clone()
            .ok_or_else(|| Error::malformed_rule_spec(format!("function rule spec missing a name: '{}'", spec)))?;
        let tokens = parse_template(template);
        let arity = sig.operands.len();
        for expansion in expand(&sig, spec)? {
            let key = (name.clone(), expansion.operands.clone());
            if self.rules.contains_key(&key) {
                log::warn!("duplicate function rule for {:?} ignored", key);
                continue;
            }
            log::debug!("registered function rule {}({:?}) -> {}", name, expansion.operands, expansion.result);
            self.rules.insert(
                key,
                Rule {
                    result: expansion.result,
                    template: tokens.clone(),
                },
            );
        }
        self.arities.entry(name).or_default().insert(arity);
        Ok(())
    }

    pub fn validate(&self, name: &str, args: &[DataType]) -> std::result::Result<(DataType, &[TemplateToken]), CompileError> {
        if let Some(rule) = self.rules.get(&(name.to_string(), args.to_vec())) {
            return Ok((rule.result, rule.template.as_slice()));
        }
        match self.arities.get(name) {
            None => Err(CompileError::Name),
            Some(arities) if !arities.contains(&args.len()) => Err(CompileError::Arity),
            Some(_) => Err(CompileError::SubNodeTypes),
        }
    }

    /// Every registered `(name, arg types) -> Rule` row, for the DDL emitter.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &[DataType], &Rule)> {
        self.rules.iter().map(|((name, args), v)| (name.as_str(), args.as_slice(), v))
    }
}

/// Rule table for method calls: key is `(receiver type, name, arg types)`.
#[derive(Debug, Default)]
pub struct MethodRules {
    rules: HashMap<(DataType, String, Vec<DataType>), Rule>,
    arities: HashMap<(DataType, String), HashSet<usize>>,
    known_names: HashSet<String>,
}

impl MethodRules {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_rules(&mut self, spec: &str, template: &str) -> Result<()> {
        let sig = parse_signature(spec)?;
        let name = sig
            .name
            .clone()
            .ok_or_else(|| Error::malformed_rule_spec(format!("method rule spec missing a name: '{}'", spec)))?;
        let tokens = parse_template(template);
        // First operand position is always the receiver (spec.md §4.1: "For
        // methods, `1` is the receiver, `2..N+1` are arguments").
        let arity = sig.operands.len().saturating_sub(1);
        for expansion in expand(&sig, spec)? {
            let (receiver, args) = expansion
                .operands
                .split_first()
                .ok_or_else(|| Error::malformed_rule_spec(format!("method rule spec has no receiver: '{}'", spec)))?;
            let key = (*receiver, name.clone(), args.to_vec());
            if self.rules.contains_key(&key) {
                log::warn!("duplicate method rule for {:?} ignored", key);
                continue;
            }
            log::debug!(
                "registered method rule {}.{}({:?}) -> {}",
                receiver,
                name,
                args,
                expansion.result
            );
            self.rules.insert(
                key,
                Rule {
                    result: expansion.result,
                    template: tokens.clone(),
                },
            );
            self.arities.entry((*receiver, name.clone())).or_default().insert(arity);
        }
        self.known_names.insert(name);
        Ok(())
    }

    pub fn validate(
        &self,
        receiver: DataType,
        name: &str,
        args: &[DataType],
    ) -> std::result::Result<(DataType, &[TemplateToken]), CompileError> {
        if let Some(rule) = self.rules.get(&(receiver, name.to_string(), args.to_vec())) {
            return Ok((rule.result, rule.template.as_slice()));
        }
        if !self.known_names.contains(name) {
            return Err(CompileError::Name);
        }
        match self.arities.get(&(receiver, name.to_string())) {
            None => Err(CompileError::SubNodeTypes),
            Some(arities) if !arities.contains(&args.len()) => Err(CompileError::Arity),
            Some(_) => Err(CompileError::SubNodeTypes),
        }
    }

    /// Every registered `(receiver, name, arg types) -> Rule` row, for the
    /// DDL emitter.
    pub fn iter(&self) -> impl Iterator<Item = (DataType, &str, &[DataType], &Rule)> {
        self.rules
            .iter()
            .map(|((receiver, name, args), v)| (*receiver, name.as_str(), args.as_slice(), v))
    }
}

/// Rule table for attribute access: key is `(receiver type, name)`.
///
/// `examples/original_source/src/ll/la/vsql.py`'s `AttrAST` has no `names`
/// index at all and always reports `SUBNODETYPES` on a miss. `spec.md`
/// §4.2.5 explicitly documents a NAME/SUBNODETYPES split for attributes the
/// same way functions/methods get a NAME/ARITY split, so this registry
/// tracks known attribute names the same way `MethodRules` does (see
/// `DESIGN.md` for the rationale).
#[derive(Debug, Default)]
pub struct AttrRules {
    rules: HashMap<(DataType, String), Rule>,
    known_names: HashSet<String>,
}

impl AttrRules {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_rules(&mut self, spec: &str, template: &str) -> Result<()> {
        let sig = parse_signature(spec)?;
        let name = sig
            .name
            .clone()
            .ok_or_else(|| Error::malformed_rule_spec(format!("attribute rule spec missing a name: '{}'", spec)))?;
        let tokens = parse_template(template);
        for expansion in expand(&sig, spec)? {
            let (receiver, rest) = expansion
                .operands
                .split_first()
                .ok_or_else(|| Error::malformed_rule_spec(format!("attribute rule spec has no receiver: '{}'", spec)))?;
            if !rest.is_empty() {
                return Err(Error::malformed_rule_spec(format!(
                    "attribute rule spec has extra operands: '{}'",
                    spec
                )));
            }
            let key = (*receiver, name.clone());
            if self.rules.contains_key(&key) {
                log::warn!("duplicate attribute rule for {:?} ignored", key);
                continue;
            }
            log::debug!("registered attribute rule {}.{} -> {}", receiver, name, expansion.result);
            self.rules.insert(
                key,
                Rule {
                    result: expansion.result,
                    template: tokens.clone(),
                },
            );
        }
        self.known_names.insert(name);
        Ok(())
    }

    pub fn validate(&self, receiver: DataType, name: &str) -> std::result::Result<(DataType, &[TemplateToken]), CompileError> {
        if let Some(rule) = self.rules.get(&(receiver, name.to_string())) {
            return Ok((rule.result, rule.template.as_slice()));
        }
        if !self.known_names.contains(name) {
            return Err(CompileError::Name);
        }
        Err(CompileError::SubNodeTypes)
    }

    /// Every registered `(receiver, name) -> Rule` row, for the DDL emitter.
    pub fn iter(&self) -> impl Iterator<Item = (DataType, &str, &Rule)> {
        self.rules.iter().map(|((receiver, name), v)| (*receiver, name.as_str(), v))
    }
}

/// Reconstructs a template spec string (`"{s1} + {t2}"`-shaped) from its
/// parsed tokens, for the DDL emitter's INSERT-shaped rows (`spec.md` §6.2).
pub fn template_string(tokens: &[TemplateToken]) -> String {
    let mut out = String::new();
    for tok in tokens {
        match tok {
            TemplateToken::Literal(s) => out.push_str(s),
            TemplateToken::Source(n) => out.push_str(&format!("{{s{}}}", n)),
            TemplateToken::TypeName(n) => out.push_str(&format!("{{t{}}}", n)),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_template_parsing() {
        let tokens = parse_template("vsqlimpl_pkg.eq_{t1}_{t2}({s1}, {s2})");
        assert_eq!(
            tokens,
            vec![
                TemplateToken::Literal("vsqlimpl_pkg.eq_".into()),
                TemplateToken::TypeName(1),
                TemplateToken::Literal("_".into()),
                TemplateToken::TypeName(2),
                TemplateToken::Literal("(".into()),
                TemplateToken::Source(1),
                TemplateToken::Literal(", ".into()),
                TemplateToken::Source(2),
                TemplateToken::Literal(")".into()),
            ]
        );
    }

    #[test]
    fn test_operator_rule_simple() {
        let mut rules = OperatorRules::new();
        rules.add_rules("BOOL <- STR == STR", "vsqlimpl_pkg.eq_str_str({s1}, {s2})").unwrap();
        let (result, _) = rules.validate(&[DataType::Str, DataType::Str]).unwrap();
        assert_eq!(result, DataType::Bool);
        assert_eq!(rules.validate(&[DataType::Int, DataType::Str]), Err(CompileError::SubNodeTypes));
    }

    #[test]
    fn test_union_expansion() {
        let mut rules = OperatorRules::new();
        rules
            .add_rules("BOOL <- STR_CLOB == STR_CLOB", "vsqlimpl_pkg.eq_{t1}_{t2}({s1}, {s2})")
            .unwrap();
        assert!(rules.validate(&[DataType::Str, DataType::Clob]).is_ok());
        assert!(rules.validate(&[DataType::Clob, DataType::Str]).is_ok());
        assert!(rules.validate(&[DataType::Clob, DataType::Clob]).is_ok());
    }

    #[test]
    fn test_registration_idempotence() {
        let mut rules = OperatorRules::new();
        rules.add_rules("BOOL <- INT == INT", "a").unwrap();
        rules.add_rules("BOOL <- INT == INT", "b").unwrap();
        let (_, template) = rules.validate(&[DataType::Int, DataType::Int]).unwrap();
        assert_eq!(template, &[TemplateToken::Literal("a".into())]);
    }

    #[test]
    fn test_forward_reference_result() {
        let mut rules = FunctionRules::new();
        rules.add_rules("T1 <- list(NULLLIST_INTLIST)", "{s1}").unwrap();
        let (result, _) = rules.validate("list", &[DataType::IntList]).unwrap();
        assert_eq!(result, DataType::IntList);
    }

    #[test]
    fn test_chained_forward_reference_is_fatal() {
        let mut rules = FunctionRules::new();
        let err = rules.add_rules("T2 <- f(INT, T1)", "{s1}").unwrap_err();
        assert!(matches!(err.kind(), crate::error::ErrorKind::ChainedForwardReference(_)));
    }

    #[test]
    fn test_function_name_arity_subnodetypes() {
        let mut rules = FunctionRules::new();
        rules.add_rules("INT <- int(STR)", "vsqlimpl_pkg.int_str({s1})").unwrap();
        assert_eq!(rules.validate("missing", &[DataType::Str]), Err(CompileError::Name));
        assert_eq!(
            rules.validate("int", &[DataType::Str, DataType::Str]),
            Err(CompileError::Arity)
        );
        assert_eq!(rules.validate("int", &[DataType::Color]), Err(CompileError::SubNodeTypes));
    }

    #[test]
    fn test_method_receiver_keyed() {
        let mut rules = MethodRules::new();
        rules.add_rules("T1 <- STR_CLOB.lower()", "lower({s1})").unwrap();
        assert!(rules.validate(DataType::Str, "lower", &[]).is_ok());
        assert_eq!(rules.validate(DataType::Int, "lower", &[]), Err(CompileError::SubNodeTypes));
        assert_eq!(rules.validate(DataType::Str, "upper", &[]), Err(CompileError::Name));
    }

    #[test]
    fn test_attribute_name_vs_subnodetypes() {
        let mut rules = AttrRules::new();
        rules.add_rules("INT <- DATE_DATETIME.year", "extract(year from {s1})").unwrap();
        assert!(rules.validate(DataType::Date, "year").is_ok());
        assert_eq!(rules.validate(DataType::Int, "year"), Err(CompileError::SubNodeTypes));
        assert_eq!(rules.validate(DataType::Date, "nonexistent"), Err(CompileError::Name));
    }

    #[test]
    fn test_placeholder_token_preserved_not_resolved() {
        // "?" stands in for a word-operator keyword (not/and/or/in/is) in a
        // handful of historical rule specs; it must parse without requiring
        // us to guess which keyword it represents.
        let mut rules = OperatorRules::new();
        rules.add_rules("BOOL <- ? NULL", "0").unwrap();
        assert!(rules.validate(&[DataType::Null]).is_ok());
    }
}
