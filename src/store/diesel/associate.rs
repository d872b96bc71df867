use crate::catalog::{Associate, AssociateKind, AssociateRepository};
use crate::store::diesel::{execute_error, PgStore};
use crate::store::Error;

/// (아이디, 이름, 언어 아이디)
type AssociateRow = (i64, String, Option<i64>);

/// 저자, 출판사, 도서관 테이블은 모양이 같고 각자의 도서 연결 테이블을 가진다.
macro_rules! associate_queries {
    ($module:ident, $table:ident, $join:ident, $column:ident) => {
        mod $module {
            use super::AssociateRow;
            use crate::store::diesel::{schema, sql_debugging};
            use diesel::prelude::*;

            pub fn insert(conn: &mut PgConnection, name: &str, language_id: Option<i64>) -> QueryResult<AssociateRow> {
                sql_debugging(diesel::insert_into(schema::$table::table)
                    .values((schema::$table::name.eq(name), schema::$table::language_id.eq(language_id)))
                    .returning((schema::$table::id, schema::$table::name, schema::$table::language_id)))
                    .get_result(conn)
            }

            pub fn link(conn: &mut PgConnection, book_id: i64, associate_id: i64) -> QueryResult<usize> {
                sql_debugging(diesel::insert_into(schema::$join::table)
                    .values((schema::$join::book_id.eq(book_id), schema::$join::$column.eq(associate_id)))
                    .on_conflict_do_nothing())
                    .execute(conn)
            }

            pub fn linked(conn: &mut PgConnection, book_id: i64) -> QueryResult<Vec<AssociateRow>> {
                let linked_ids = schema::$join::table
                    .filter(schema::$join::book_id.eq(book_id))
                    .select(schema::$join::$column);

                sql_debugging(schema::$table::table
                    .filter(schema::$table::id.eq_any(linked_ids))
                    .order_by(schema::$table::id.asc())
                    .select((schema::$table::id, schema::$table::name, schema::$table::language_id)))
                    .load(conn)
            }

            pub fn update_language(conn: &mut PgConnection, book_id: i64, language_id: i64) -> QueryResult<usize> {
                let linked_ids = schema::$join::table
                    .filter(schema::$join::book_id.eq(book_id))
                    .select(schema::$join::$column);

                sql_debugging(diesel::update(schema::$table::table)
                    .filter(schema::$table::id.eq_any(linked_ids))
                    .set(schema::$table::language_id.eq(Some(language_id))))
                    .execute(conn)
            }

            pub fn namesake(conn: &mut PgConnection, name: &str, exclude_id: i64) -> QueryResult<Option<AssociateRow>> {
                sql_debugging(schema::$table::table
                    .filter(schema::$table::name.eq(name))
                    .filter(schema::$table::id.ne(exclude_id))
                    .order_by(schema::$table::id.asc())
                    .select((schema::$table::id, schema::$table::name, schema::$table::language_id)))
                    .first(conn)
                    .optional()
            }

            /// `from`을 가리키는 연결을 `to`로 옮긴다. 이미 `to`와 연결된 도서의 연결은 삭제한다.
            pub fn relink(conn: &mut PgConnection, from: i64, to: i64) -> QueryResult<usize> {
                conn.transaction(|conn| {
                    let already_linked: Vec<i64> = sql_debugging(schema::$join::table
                        .filter(schema::$join::$column.eq(to))
                        .select(schema::$join::book_id))
                        .load(conn)?;

                    sql_debugging(diesel::delete(schema::$join::table)
                        .filter(schema::$join::$column.eq(from))
                        .filter(schema::$join::book_id.eq_any(already_linked)))
                        .execute(conn)?;

                    sql_debugging(diesel::update(schema::$join::table)
                        .filter(schema::$join::$column.eq(from))
                        .set(schema::$join::$column.eq(to)))
                        .execute(conn)
                })
            }

            pub fn delete(conn: &mut PgConnection, id: i64) -> QueryResult<usize> {
                conn.transaction(|conn| {
                    sql_debugging(diesel::delete(schema::$join::table)
                        .filter(schema::$join::$column.eq(id)))
                        .execute(conn)?;

                    sql_debugging(diesel::delete(schema::$table::table)
                        .filter(schema::$table::id.eq(id)))
                        .execute(conn)
                })
            }
        }
    };
}

associate_queries!(authors, authors, authorships, author_id);
associate_queries!(publishers, publishers, publications, publisher_id);
associate_queries!(libraries, libraries, availabilities, library_id);

macro_rules! by_kind {
    ($kind:expr, $function:ident($($arg:expr),*)) => {
        match $kind {
            AssociateKind::Author => authors::$function($($arg),*),
            AssociateKind::Publisher => publishers::$function($($arg),*),
            AssociateKind::Library => libraries::$function($($arg),*),
        }
    };
}

fn to_associate(kind: AssociateKind, (id, name, language_id): AssociateRow) -> Associate {
    Associate::new(id as u64, kind, name, language_id.map(|id| id as u64))
}

impl AssociateRepository for PgStore {
    fn create_associate(&self, kind: AssociateKind, name: &str, language_id: Option<u64>) -> Result<Associate, Error> {
        let conn = &mut self.connection()?;
        let row = by_kind!(kind, insert(conn, name, language_id.map(|id| id as i64)))
            .map_err(execute_error)?;

        Ok(to_associate(kind, row))
    }

    fn link(&self, kind: AssociateKind, book_id: u64, associate_id: u64) -> Result<(), Error> {
        let conn = &mut self.connection()?;
        by_kind!(kind, link(conn, book_id as i64, associate_id as i64))
            .map_err(execute_error)?;
        Ok(())
    }

    fn find_linked(&self, kind: AssociateKind, book_id: u64) -> Result<Vec<Associate>, Error> {
        let conn = &mut self.connection()?;
        let rows = by_kind!(kind, linked(conn, book_id as i64))
            .map_err(execute_error)?;

        Ok(rows.into_iter().map(|row| to_associate(kind, row)).collect())
    }

    fn update_language_of_linked(&self, kind: AssociateKind, book_id: u64, language_id: u64) -> Result<usize, Error> {
        let conn = &mut self.connection()?;
        by_kind!(kind, update_language(conn, book_id as i64, language_id as i64))
            .map_err(execute_error)
    }

    fn find_namesake(&self, kind: AssociateKind, name: &str, exclude_id: u64) -> Result<Option<Associate>, Error> {
        let conn = &mut self.connection()?;
        let row = by_kind!(kind, namesake(conn, name, exclude_id as i64))
            .map_err(execute_error)?;

        Ok(row.map(|row| to_associate(kind, row)))
    }

    fn relink(&self, kind: AssociateKind, from: u64, to: u64) -> Result<usize, Error> {
        let conn = &mut self.connection()?;
        by_kind!(kind, relink(conn, from as i64, to as i64))
            .map_err(execute_error)
    }

    fn delete_associate(&self, kind: AssociateKind, id: u64) -> Result<usize, Error> {
        let conn = &mut self.connection()?;
        by_kind!(kind, delete(conn, id as i64))
            .map_err(execute_error)
    }
}
