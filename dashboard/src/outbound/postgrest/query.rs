//! Translation of request descriptors into PostgREST query parameters.

use crate::domain::request::{Filter, FilterOp, FilterValue, TableRequest};

/// Query-string pairs for `request`, in a stable order: projection, filters
/// in declaration order, ordering, limit.
pub(super) fn query_pairs(request: &TableRequest) -> Vec<(String, String)> {
    let mut pairs = Vec::with_capacity(request.filters.len() + 3);
    pairs.push(("select".to_owned(), request.columns_clause()));
    pairs.extend(request.filters.iter().map(filter_pair));
    if let Some(order) = &request.order {
        let direction = if order.ascending { "asc" } else { "desc" };
        pairs.push(("order".to_owned(), format!("{}.{direction}", order.column)));
    }
    if let Some(limit) = request.limit {
        pairs.push(("limit".to_owned(), limit.to_string()));
    }
    pairs
}

fn filter_pair(filter: &Filter) -> (String, String) {
    if let (FilterOp::Ilike, FilterValue::Text(pattern)) = (&filter.op, &filter.value)
        && pattern.contains('*')
    {
        return (
            filter.column.clone(),
            format!("imatch.{}", like_to_regex(pattern)),
        );
    }
    let operator = match filter.op {
        FilterOp::Eq => "eq",
        FilterOp::Ilike => "ilike",
        FilterOp::Contains => "cs",
        FilterOp::Gte => "gte",
    };
    let operand = match (&filter.op, &filter.value) {
        (FilterOp::Contains, FilterValue::List(items)) => array_literal(items),
        (FilterOp::Contains, FilterValue::Text(item)) => array_literal(std::slice::from_ref(item)),
        (_, value) => value.to_text(),
    };
    (filter.column.clone(), format!("{operator}.{operand}"))
}

/// Anchored POSIX regex equivalent to the `LIKE` pattern `pattern`.
///
/// PostgREST rewrites every `*` in a `like`/`ilike` operand to `%`, so a
/// pattern holding a literal `*` is sent as `imatch` instead.
fn like_to_regex(pattern: &str) -> String {
    let mut regex = String::with_capacity(pattern.len() + 2);
    regex.push('^');
    let mut chars = pattern.chars();
    while let Some(ch) = chars.next() {
        match ch {
            '%' => regex.push_str(".*"),
            '_' => regex.push('.'),
            '\\' => {
                if let Some(escaped) = chars.next() {
                    push_regex_literal(&mut regex, escaped);
                }
            }
            other => push_regex_literal(&mut regex, other),
        }
    }
    regex.push('$');
    regex
}

fn push_regex_literal(regex: &mut String, ch: char) {
    if "\\.^$|?*+()[]{}".contains(ch) {
        regex.push('\\');
    }
    regex.push(ch);
}

/// Postgres array literal with every element quoted.
fn array_literal(items: &[String]) -> String {
    let quoted = items
        .iter()
        .map(|item| format!("\"{}\"", item.replace('\\', r"\\").replace('"', "\\\"")))
        .collect::<Vec<_>>()
        .join(",");
    format!("{{{quoted}}}")
}
