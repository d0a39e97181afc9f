//! Rendering of [`QueryTree`]s into tantivy queries.

use cms_search_core::{Error, Result};
use tantivy::Term;
use tantivy::query::{AllQuery, BooleanQuery, Occur, Query, TermQuery};
use tantivy::schema::IndexRecordOption;

use crate::local::schema::IndexSchema;
use crate::query::QueryTree;

/// Render a query tree against an index schema.
///
/// Terms are matched verbatim; the query builder has already lowercased them
/// the way the text analyzer lowercases indexed words.
///
/// # Errors
///
/// [`Error::UnknownField`] when a term names a field the index does not have.
pub fn to_tantivy(tree: &QueryTree, schema: &IndexSchema) -> Result<Box<dyn Query>> {
    match tree {
        QueryTree::MatchAll => Ok(Box::new(AllQuery)),
        QueryTree::Term { field, value } => {
            let f = schema
                .queryable(field)
                .ok_or_else(|| Error::UnknownField {
                    field: field.clone(),
                })?;
            let option = if schema.language(field).is_some() {
                IndexRecordOption::WithFreqs
            } else {
                IndexRecordOption::Basic
            };
            Ok(Box::new(TermQuery::new(
                Term::from_field_text(f, value),
                option,
            )))
        }
        QueryTree::All(clauses) => boolean(clauses, Occur::Must, schema),
        QueryTree::Any(clauses) => boolean(clauses, Occur::Should, schema),
    }
}

fn boolean(clauses: &[QueryTree], occur: Occur, schema: &IndexSchema) -> Result<Box<dyn Query>> {
    let subqueries = clauses
        .iter()
        .map(|clause| Ok((occur, to_tantivy(clause, schema)?)))
        .collect::<Result<Vec<_>>>()?;
    Ok(Box::new(BooleanQuery::new(subqueries)))
}

// ============================================================================
// Tests
// ============================================================================
