use crate::error::{Result, SchemaError};
use crate::model::{AttributeType, ObjectClass, ObjectClassKind, SchemaObject, Usage};
use pest::iterators::Pair;
use pest::Parser;
use pest_derive::Parser;

#[derive(Parser)]
#[grammar = "grammar.pest"]
pub struct SchemaGrammar;

/// Parses an RFC 4512 schema description file (a sequence of
/// `attributetype (...)` and `objectclass (...)` statements) into the
/// registry's object model.
pub fn parse_schema_file(input: &str) -> Result<Vec<SchemaObject>> {
    let root = SchemaGrammar::parse(Rule::root, input)
        .map_err(Box::new)
        .map_err(SchemaError::Grammar)?;
    let mut objects = Vec::new();
    for pair in root {
        for stmt in pair.into_inner() {
            match stmt.as_rule() {
                Rule::attribute_type => objects.push(SchemaObject::AttributeType(attribute_type(stmt))),
                Rule::object_class => objects.push(SchemaObject::ObjectClass(object_class(stmt))),
                Rule::EOI => {}
                _ => {}
            }
        }
    }
    Ok(objects)
}

fn unquote(s: &str) -> String {
    s.trim_matches('\'').to_string()
}

fn qdescrs(pair: Pair<Rule>) -> Vec<String> {
    pair.into_inner().map(|d| unquote(d.as_str())).collect()
}

fn oids(pair: Pair<Rule>) -> Vec<String> {
    pair.into_inner().map(|o| o.as_str().to_string()).collect()
}

fn first_oid(pair: Pair<Rule>) -> String {
    pair.into_inner()
        .next()
        .map(|o| o.as_str().to_string())
        .unwrap_or_default()
}

fn attribute_type(pair: Pair<Rule>) -> AttributeType {
    let mut at = AttributeType {
        oid: String::new(),
        names: Vec::new(),
        desc: None,
        obsolete: false,
        sup: None,
        equality: None,
        ordering: None,
        substr: None,
        syntax: None,
        single_value: false,
        collective: false,
        no_user_modification: false,
        usage: Usage::UserApplications,
    };
    let mut first = true;
    for p in pair.into_inner() {
        match p.as_rule() {
            Rule::numericoid if first => {
                at.oid = p.as_str().to_string();
                first = false;
            }
            Rule::names_clause => at.names = qdescrs(inner_single(p)),
            Rule::desc_clause => at.desc = Some(unquote(inner_single(p).as_str())),
            Rule::sup_clause => at.sup = Some(first_oid(p)),
            Rule::eq_clause => at.equality = Some(first_oid(p)),
            Rule::ord_clause => at.ordering = Some(first_oid(p)),
            Rule::substr_clause => at.substr = Some(first_oid(p)),
            Rule::syntax_clause => at.syntax = Some(inner_single(p).as_str().to_string()),
            Rule::usage_clause => at.usage = parse_usage(inner_single(p).as_str()),
            _ => {}
        }
    }
    at
}

/// Unwraps a `foo_clause = { "KEYWORD" ~ value }` pair to its single
/// captured `value` child (the literal keyword itself is not captured).
fn inner_single(pair: Pair<Rule>) -> Pair<Rule> {
    pair.into_inner().next().expect("clause always carries a value")
}

fn parse_usage(s: &str) -> Usage {
    match s {
        "directoryOperation" => Usage::DirectoryOperation,
        "distributedOperation" => Usage::DistributedOperation,
        "dSAOperation" => Usage::DsaOperation,
        _ => Usage::UserApplications,
    }
}

fn object_class(pair: Pair<Rule>) -> ObjectClass {
    let mut oc = ObjectClass {
        oid: String::new(),
        names: Vec::new(),
        desc: None,
        obsolete: false,
        sup: Vec::new(),
        kind: ObjectClassKind::Structural,
        must: Vec::new(),
        may: Vec::new(),
    };
    let mut first = true;
    for p in pair.into_inner() {
        match p.as_rule() {
            Rule::numericoid if first => {
                oc.oid = p.as_str().to_string();
                first = false;
            }
            Rule::names_clause => oc.names = qdescrs(inner_single(p)),
            Rule::desc_clause => oc.desc = Some(unquote(inner_single(p).as_str())),
            Rule::sup_classes_clause => oc.sup = oids(inner_single(p)),
            Rule::must_clause => oc.must = oids(inner_single(p)),
            Rule::may_clause => oc.may = oids(inner_single(p)),
            Rule::object_class_kind => {
                oc.kind = match p.as_str() {
                    "AUXILIARY" => ObjectClassKind::Auxiliary,
                    "ABSTRACT" => ObjectClassKind::Abstract,
                    _ => ObjectClassKind::Structural,
                };
            }
            _ => {}
        }
    }
    oc
}
