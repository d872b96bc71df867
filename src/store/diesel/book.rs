use crate::catalog::{
    Book, BookRepository, Cover, CoverRepository, GrandhamId, Language, LanguageRepository, OwnerKey, Scope,
};
use crate::store::diesel::{entity, execute_error, schema, sql_debugging, PgStore};
use crate::store::Error;
use diesel::pg::Pg;
use diesel::{ExpressionMethods, OptionalExtension, QueryDsl, RunQueryDsl, SelectableHelper};

impl LanguageRepository for PgStore {
    fn find_language(&self, id: u64) -> Result<Option<Language>, Error> {
        let entity = sql_debugging(schema::languages::table
            .filter(schema::languages::id.eq(id as i64))
            .select(entity::LanguageEntity::as_select()))
            .first(&mut self.connection()?)
            .optional()
            .map_err(execute_error)?;

        Ok(entity.map(|e| e.to_domain()))
    }

    fn create_language(&self, name: &str) -> Result<Language, Error> {
        let entity: entity::LanguageEntity = sql_debugging(diesel::insert_into(schema::languages::table)
            .values(entity::NewLanguageEntity { name })
            .returning(entity::LanguageEntity::as_returning()))
            .get_result(&mut self.connection()?)
            .map_err(execute_error)?;

        Ok(entity.to_domain())
    }
}

/// 조회 범위에 해당하는 도서만 선택하는 쿼리
fn scoped<'a>(scope: Scope) -> schema::books::BoxedQuery<'a, Pg> {
    use schema::books::dsl::*;

    let query = books.into_boxed();
    match scope {
        Scope::Visible => query.filter(approved.eq(true)).filter(published.eq(true)),
        Scope::Approved => query.filter(approved.eq(true)),
        Scope::NotReviewed => query.filter(reviewed.eq(false)),
        Scope::Unfiltered => query,
    }
}

fn to_books(entities: Vec<entity::BookEntity>) -> Result<Vec<Book>, Error> {
    entities.iter()
        .map(|e| e.to_domain())
        .collect()
}

impl BookRepository for PgStore {
    fn create_book(&self, book: &Book) -> Result<Book, Error> {
        let entity: entity::BookEntity = sql_debugging(diesel::insert_into(schema::books::table)
            .values(entity::NewBookEntity::new(book))
            .returning(entity::BookEntity::as_returning()))
            .get_result(&mut self.connection()?)
            .map_err(execute_error)?;

        entity.to_domain()
    }

    fn find_by_grandham_id(&self, grandham_id: &GrandhamId, scope: Scope) -> Result<Option<Book>, Error> {
        let entity = sql_debugging(scoped(scope)
            .filter(schema::books::grandham_id.eq(grandham_id.as_str().to_owned()))
            .select(entity::BookEntity::as_select()))
            .first(&mut self.connection()?)
            .optional()
            .map_err(execute_error)?;

        entity.map(|e| e.to_domain()).transpose()
    }

    fn find_by_grandham_ids(&self, grandham_ids: &[GrandhamId], scope: Scope) -> Result<Vec<Book>, Error> {
        let ids: Vec<String> = grandham_ids.iter()
            .map(|id| id.as_str().to_owned())
            .collect();

        let entities = sql_debugging(scoped(scope)
            .filter(schema::books::grandham_id.eq_any(ids))
            .order_by(schema::books::id.asc())
            .select(entity::BookEntity::as_select()))
            .load(&mut self.connection()?)
            .map_err(execute_error)?;

        to_books(entities)
    }

    fn find_all(&self, scope: Scope) -> Result<Vec<Book>, Error> {
        let entities = sql_debugging(scoped(scope)
            .order_by(schema::books::id.asc())
            .select(entity::BookEntity::as_select()))
            .load(&mut self.connection()?)
            .map_err(execute_error)?;

        to_books(entities)
    }

    fn update_book(&self, book: &Book) -> Result<usize, Error> {
        sql_debugging(diesel::update(schema::books::table)
            .filter(schema::books::id.eq(book.id() as i64))
            .set(entity::BookForm::new(book)))
            .execute(&mut self.connection()?)
            .map_err(execute_error)
    }

    fn update_published(&self, id: u64, published: bool) -> Result<usize, Error> {
        sql_debugging(diesel::update(schema::books::table)
            .filter(schema::books::id.eq(id as i64))
            .set((
                schema::books::published.eq(published),
                schema::books::updated_at.eq(chrono::Local::now().naive_local()),
            )))
            .execute(&mut self.connection()?)
            .map_err(execute_error)
    }
}

impl CoverRepository for PgStore {
    fn count_covers(&self, owner: OwnerKey) -> Result<usize, Error> {
        let count: i64 = sql_debugging(schema::covers::table
            .filter(schema::covers::owner_type.eq(owner.kind.to_code_str()))
            .filter(schema::covers::owner_id.eq(owner.id as i64))
            .count())
            .get_result(&mut self.connection()?)
            .map_err(execute_error)?;

        Ok(count as usize)
    }

    fn find_covers(&self, owner: OwnerKey) -> Result<Vec<Cover>, Error> {
        let entities: Vec<entity::CoverEntity> = sql_debugging(schema::covers::table
            .filter(schema::covers::owner_type.eq(owner.kind.to_code_str()))
            .filter(schema::covers::owner_id.eq(owner.id as i64))
            .order_by(schema::covers::id.asc())
            .select(entity::CoverEntity::as_select()))
            .load(&mut self.connection()?)
            .map_err(execute_error)?;

        entities.iter()
            .map(|e| e.to_domain())
            .collect()
    }

    fn create_cover(&self, owner: OwnerKey, image: Option<&str>) -> Result<Cover, Error> {
        let new_cover = entity::NewCoverEntity {
            owner_type: owner.kind.to_code_str(),
            owner_id: owner.id as i64,
            image,
            created_at: chrono::Local::now().naive_local(),
        };
        let entity: entity::CoverEntity = sql_debugging(diesel::insert_into(schema::covers::table)
            .values(new_cover)
            .returning(entity::CoverEntity::as_returning()))
            .get_result(&mut self.connection()?)
            .map_err(execute_error)?;

        entity.to_domain()
    }
}
