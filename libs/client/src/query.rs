//! Structured filter expressions and the collection query engine.
//!
//! Filters are built as expression trees and rendered to the server's
//! `filter[]` parameter language only at request time; there is no string
//! assembly of query source anywhere. A [`FilterExpr`] is well-formed by
//! construction (leading condition, single connective between conditions),
//! and [`FilterExpr::from_clauses`] validates caller-assembled clause lists
//! before any network call.

use tracing::warn;

use crate::error::{ClientError, Result};
use crate::resource::Resource;
use crate::rest::RestClient;

/// Comparison operator in a filter condition.
///
/// The server decides which operators a given attribute supports; a rejected
/// operator is reported by the engine as a warning and an empty result.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterOp {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

impl FilterOp {
    pub fn as_str(&self) -> &'static str {
        match self {
            FilterOp::Eq => "=",
            FilterOp::Ne => "!=",
            FilterOp::Lt => "<",
            FilterOp::Le => "<=",
            FilterOp::Gt => ">",
            FilterOp::Ge => ">=",
        }
    }
}

/// Logical connective between conditions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Connective {
    And,
    Or,
}

/// A single (field, operator, value) condition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Condition {
    pub field: String,
    pub op: FilterOp,
    pub value: String,
}

impl Condition {
    pub fn new(field: impl Into<String>, op: FilterOp, value: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            op,
            value: value.into(),
        }
    }

    fn render(&self) -> String {
        // Only integer values go unquoted; float syntax like "inf" or "5e3"
        // is a legitimate resource name and must stay a quoted string.
        if self.value.parse::<i128>().is_ok() {
            format!("{}{}{}", self.field, self.op.as_str(), self.value)
        } else {
            let escaped = self.value.replace('\\', "\\\\").replace('\'', "\\'");
            format!("{}{}'{}'", self.field, self.op.as_str(), escaped)
        }
    }
}

/// One element of a caller-assembled clause list.
#[derive(Debug, Clone)]
pub enum Clause {
    Cond(Condition),
    Join(Connective),
}

/// A validated filter expression: a leading condition followed by
/// connective/condition pairs.
#[derive(Debug, Clone)]
pub struct FilterExpr {
    first: Condition,
    rest: Vec<(Connective, Condition)>,
}

impl FilterExpr {
    pub fn new(first: Condition) -> Self {
        Self {
            first,
            rest: Vec::new(),
        }
    }

    pub fn and(mut self, condition: Condition) -> Self {
        self.rest.push((Connective::And, condition));
        self
    }

    pub fn or(mut self, condition: Condition) -> Self {
        self.rest.push((Connective::Or, condition));
        self
    }

    /// Build an expression from an alternating clause list.
    ///
    /// A list of even length is missing a trailing operand and is rejected
    /// whole; the last clause is never silently dropped.
    pub fn from_clauses(clauses: Vec<Clause>) -> Result<Self> {
        if clauses.is_empty() || clauses.len() % 2 == 0 {
            return Err(ClientError::MalformedQuery(format!(
                "expected an odd number of clauses (conditions joined by connectives), got {}",
                clauses.len()
            )));
        }

        let mut iter = clauses.into_iter();
        let first = match iter.next() {
            Some(Clause::Cond(cond)) => cond,
            _ => {
                return Err(ClientError::MalformedQuery(
                    "expression must start with a condition".to_string(),
                ))
            }
        };

        let mut rest = Vec::new();
        while let Some(clause) = iter.next() {
            let join = match clause {
                Clause::Join(join) => join,
                Clause::Cond(_) => {
                    return Err(ClientError::MalformedQuery(
                        "conditions must be separated by a connective".to_string(),
                    ))
                }
            };
            let cond = match iter.next() {
                Some(Clause::Cond(cond)) => cond,
                _ => {
                    return Err(ClientError::MalformedQuery(
                        "connective must be followed by a condition".to_string(),
                    ))
                }
            };
            rest.push((join, cond));
        }

        Ok(Self { first, rest })
    }

    /// Render to `filter[]` query parameters. AND is the server's default
    /// between repeated parameters; OR conditions carry an `or ` prefix.
    pub fn to_params(&self) -> Vec<(String, String)> {
        let mut params = vec![("filter[]".to_string(), self.first.render())];
        for (join, cond) in &self.rest {
            let rendered = match join {
                Connective::And => cond.render(),
                Connective::Or => format!("or {}", cond.render()),
            };
            params.push(("filter[]".to_string(), rendered));
        }
        params
    }
}

/// Execute a single-condition query against a collection.
///
/// Returns zero, one, or many resources; the caller decides whether either
/// of those is an error. An operator the server rejects yields a warning and
/// an empty result, not an error.
pub async fn basic_query(
    client: &RestClient,
    collection: &str,
    condition: Condition,
    attrs: &[&str],
) -> Result<Vec<Resource>> {
    run_query(client, collection, &FilterExpr::new(condition), attrs).await
}

/// Execute a validated multi-clause expression against a collection.
pub async fn advanced_query(
    client: &RestClient,
    collection: &str,
    expr: &FilterExpr,
    attrs: &[&str],
) -> Result<Vec<Resource>> {
    run_query(client, collection, expr, attrs).await
}

/// Execute a caller-assembled clause list against a collection.
///
/// Malformed lists are rejected with a single warning and an empty result,
/// without touching the network.
pub async fn advanced_query_clauses(
    client: &RestClient,
    collection: &str,
    clauses: Vec<Clause>,
    attrs: &[&str],
) -> Result<Vec<Resource>> {
    match FilterExpr::from_clauses(clauses) {
        Ok(expr) => run_query(client, collection, &expr, attrs).await,
        Err(err) => {
            warn!(collection, "query rejected: {err}");
            Ok(Vec::new())
        }
    }
}

async fn run_query(
    client: &RestClient,
    collection: &str,
    expr: &FilterExpr,
    attrs: &[&str],
) -> Result<Vec<Resource>> {
    let resources = match client.filter_collection(collection, &expr.to_params()).await {
        Ok(resources) => resources,
        Err(ClientError::Api { status, message }) => {
            warn!(collection, status, "query rejected by server: {message}");
            return Ok(Vec::new());
        }
        Err(other) => return Err(other),
    };

    if attrs.is_empty() {
        return Ok(resources);
    }

    // The base listing omits declared attributes for performance; expand
    // each match individually.
    let mut expanded = Vec::with_capacity(resources.len());
    for resource in resources {
        match resource.id() {
            Some(id) => expanded.push(client.fetch(collection, &id, attrs).await?),
            None => expanded.push(resource),
        }
    }
    Ok(expanded)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_quoted_and_numeric_values() {
        let cond = Condition::new("name", FilterOp::Eq, "vm_foo");
        assert_eq!(cond.render(), "name='vm_foo'");

        let cond = Condition::new("id", FilterOp::Gt, "9999934");
        assert_eq!(cond.render(), "id>9999934");
    }

    #[test]
    fn embedded_quotes_cannot_break_out_of_the_value() {
        let cond = Condition::new("name", FilterOp::Eq, "it's or id>0");
        assert_eq!(cond.render(), r"name='it\'s or id>0'");

        let cond = Condition::new("name", FilterOp::Eq, r"a\'b");
        assert_eq!(cond.render(), r"name='a\\\'b'");
    }

    #[test]
    fn float_syntax_names_stay_quoted_strings() {
        assert_eq!(
            Condition::new("name", FilterOp::Eq, "inf").render(),
            "name='inf'"
        );
        assert_eq!(
            Condition::new("name", FilterOp::Eq, "nan").render(),
            "name='nan'"
        );
        assert_eq!(
            Condition::new("name", FilterOp::Eq, "5e3").render(),
            "name='5e3'"
        );
    }

    #[test]
    fn renders_connectives() {
        let expr = FilterExpr::new(Condition::new("name", FilterOp::Eq, "vm_foo"))
            .and(Condition::new("type", FilterOp::Eq, "X::Flavor"))
            .or(Condition::new("id", FilterOp::Ge, "5"));

        let params = expr.to_params();
        assert_eq!(
            params,
            vec![
                ("filter[]".to_string(), "name='vm_foo'".to_string()),
                ("filter[]".to_string(), "type='X::Flavor'".to_string()),
                ("filter[]".to_string(), "or id>=5".to_string()),
            ]
        );
    }

    #[test]
    fn even_length_clause_list_is_rejected() {
        let clauses = vec![
            Clause::Cond(Condition::new("name", FilterOp::Eq, "vm_foo")),
            Clause::Join(Connective::And),
        ];
        let err = FilterExpr::from_clauses(clauses).unwrap_err();
        assert!(matches!(err, ClientError::MalformedQuery(_)));
    }

    #[test]
    fn adjacent_conditions_are_rejected() {
        let clauses = vec![
            Clause::Cond(Condition::new("a", FilterOp::Eq, "1")),
            Clause::Cond(Condition::new("b", FilterOp::Eq, "2")),
            Clause::Join(Connective::And),
        ];
        assert!(FilterExpr::from_clauses(clauses).is_err());
    }

    #[test]
    fn alternating_clause_list_is_accepted() {
        let clauses = vec![
            Clause::Cond(Condition::new("name", FilterOp::Eq, "vm_foo")),
            Clause::Join(Connective::And),
            Clause::Cond(Condition::new("id", FilterOp::Gt, "9999934")),
        ];
        let expr = FilterExpr::from_clauses(clauses).unwrap();
        assert_eq!(expr.to_params().len(), 2);
    }
}
