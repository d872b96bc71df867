use crate::catalog::service::Repositories;
use crate::store::Error;
use diesel::pg::Pg;
use diesel::r2d2::ConnectionManager;
use diesel::{debug_query, PgConnection};
use std::rc::Rc;
use tracing::{debug, enabled};

mod associate;
mod audit;
mod book;
mod entity;
mod schema;
mod search;
mod user;

pub type DbPool = r2d2::Pool<ConnectionManager<PgConnection>>;
type DbConnection = r2d2::PooledConnection<ConnectionManager<PgConnection>>;

pub fn sql_debugging<T>(sql: T) -> T
where T: diesel::query_builder::QueryFragment<Pg>,
{
    if enabled!(tracing::Level::DEBUG) {
        let debug_str = debug_query::<Pg, _>(&sql).to_string();
        debug!("SQL: {}", debug_str);
    }
    sql
}

fn execute_error(err: diesel::result::Error) -> Error {
    Error::SqlExecuteError(err.to_string())
}

/// PostgreSQL 저장소
///
/// 카탈로그, 작업 이력, 검색 색인, 사용자 저장소를 모두 구현하며 복제본들은 같은 커넥션 풀을 공유한다.
#[derive(Clone)]
pub struct PgStore {
    pool: DbPool
}

impl PgStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    pub fn repositories(&self) -> Repositories {
        Repositories {
            books: Rc::new(Box::new(self.clone())),
            languages: Rc::new(Box::new(self.clone())),
            associates: Rc::new(Box::new(self.clone())),
            covers: Rc::new(Box::new(self.clone())),
            audits: Rc::new(Box::new(self.clone())),
            index: Rc::new(Box::new(self.clone())),
        }
    }

    fn connection(&self) -> Result<DbConnection, Error> {
        self.pool.get().map_err(|e| Error::ConnectError(e.to_string()))
    }
}
