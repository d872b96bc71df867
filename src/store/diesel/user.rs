use crate::store::diesel::{entity, execute_error, schema, sql_debugging, PgStore};
use crate::store::Error;
use crate::user::{NewUser, Role, User, UserRepository};
use diesel::{ExpressionMethods, OptionalExtension, QueryDsl, RunQueryDsl, SelectableHelper};

impl UserRepository for PgStore {
    fn create_user(&self, user: &NewUser) -> Result<User, Error> {
        let entity: entity::UserEntity = sql_debugging(diesel::insert_into(schema::users::table)
            .values(entity::NewUserEntity::new(user))
            .returning(entity::UserEntity::as_returning()))
            .get_result(&mut self.connection()?)
            .map_err(execute_error)?;

        entity.to_domain()
    }

    fn find_user(&self, id: u64) -> Result<Option<User>, Error> {
        let entity = sql_debugging(schema::users::table
            .filter(schema::users::id.eq(id as i64))
            .select(entity::UserEntity::as_select()))
            .first(&mut self.connection()?)
            .optional()
            .map_err(execute_error)?;

        entity.map(|e| e.to_domain()).transpose()
    }

    fn find_by_login(&self, login: &str) -> Result<Option<User>, Error> {
        let entity = sql_debugging(schema::users::table
            .filter(schema::users::login.eq(login))
            .select(entity::UserEntity::as_select()))
            .first(&mut self.connection()?)
            .optional()
            .map_err(execute_error)?;

        entity.map(|e| e.to_domain()).transpose()
    }

    fn update_role(&self, id: u64, role: Role) -> Result<usize, Error> {
        sql_debugging(diesel::update(schema::users::table)
            .filter(schema::users::id.eq(id as i64))
            .set(schema::users::role.eq(Some(role.to_code_str()))))
            .execute(&mut self.connection()?)
            .map_err(execute_error)
    }

    fn update_role_and_language(&self, id: u64, role: Role, language_id: u64) -> Result<usize, Error> {
        sql_debugging(diesel::update(schema::users::table)
            .filter(schema::users::id.eq(id as i64))
            .set((
                schema::users::role.eq(Some(role.to_code_str())),
                schema::users::language_id.eq(Some(language_id as i64)),
            )))
            .execute(&mut self.connection()?)
            .map_err(execute_error)
    }
}
