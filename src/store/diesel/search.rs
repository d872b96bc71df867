use crate::catalog::GrandhamId;
use crate::search::{tokenize, SearchDocument, SearchIndex};
use crate::store::diesel::{entity, execute_error, schema, sql_debugging, PgStore};
use crate::store::Error;
use diesel::{BoolExpressionMethods, ExpressionMethods, NullableExpressionMethods, PgTextExpressionMethods, QueryDsl, RunQueryDsl};

/// LIKE 패턴의 특수 문자를 이스케이프 한다.
fn like_pattern(token: &str) -> String {
    let escaped = token.replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    format!("%{}%", escaped)
}

impl SearchIndex for PgStore {
    fn index(&self, document: &SearchDocument) -> Result<(), Error> {
        let entity = entity::SearchDocumentEntity::new(document);

        sql_debugging(diesel::insert_into(schema::book_search_documents::table)
            .values(&entity)
            .on_conflict(schema::book_search_documents::grandham_id)
            .do_update()
            .set(&entity))
            .execute(&mut self.connection()?)
            .map_err(execute_error)?;
        Ok(())
    }

    fn search(&self, query: &str, approved_only: bool) -> Result<Vec<GrandhamId>, Error> {
        use schema::book_search_documents::dsl::*;

        let tokens = tokenize(query);
        if tokens.is_empty() {
            return Ok(vec![]);
        }

        let mut statement = book_search_documents
            .select(grandham_id)
            .into_boxed();
        if approved_only {
            statement = statement.filter(approved.eq(true));
        }
        for token in &tokens {
            let pattern = like_pattern(token);
            statement = statement.filter(
                title.ilike(pattern.clone())
                    .or(description.assume_not_null().ilike(pattern.clone()))
                    .or(title_original.assume_not_null().ilike(pattern))
            );
        }

        let ids: Vec<String> = sql_debugging(statement.order_by(grandham_id.asc()))
            .load(&mut self.connection()?)
            .map_err(execute_error)?;

        ids.iter()
            .map(|id| GrandhamId::try_from(id.as_str()).map_err(|e| Error::ConvertError(e.to_string())))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn like_pattern_escapes_wildcards() {
        assert_eq!(like_pattern("war"), "%war%");
        assert_eq!(like_pattern("snake_case"), "%snake\\_case%");
    }
}
