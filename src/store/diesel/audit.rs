use crate::audit::{AuditKind, AuditRecord, AuditRepository};
use crate::catalog::OwnerKey;
use crate::store::diesel::{entity, execute_error, schema, sql_debugging, PgStore};
use crate::store::Error;
use diesel::{ExpressionMethods, QueryDsl, RunQueryDsl, SelectableHelper};

impl AuditRepository for PgStore {
    fn record(&self, kind: AuditKind, user_id: u64, target: OwnerKey) -> Result<AuditRecord, Error> {
        let new_record = entity::NewAuditRecordEntity {
            kind: kind.to_string(),
            user_id: user_id as i64,
            target_type: target.kind.to_code_str(),
            target_id: target.id as i64,
            created_at: chrono::Local::now().naive_local(),
        };
        let entity: entity::AuditRecordEntity = sql_debugging(diesel::insert_into(schema::audit_records::table)
            .values(new_record)
            .returning(entity::AuditRecordEntity::as_returning()))
            .get_result(&mut self.connection()?)
            .map_err(execute_error)?;

        entity.to_domain()
    }

    fn find_by_target(&self, kind: AuditKind, target: OwnerKey) -> Result<Vec<AuditRecord>, Error> {
        let entities: Vec<entity::AuditRecordEntity> = sql_debugging(schema::audit_records::table
            .filter(schema::audit_records::kind.eq(kind.to_string()))
            .filter(schema::audit_records::target_type.eq(target.kind.to_code_str()))
            .filter(schema::audit_records::target_id.eq(target.id as i64))
            .order_by(schema::audit_records::id.asc())
            .select(entity::AuditRecordEntity::as_select()))
            .load(&mut self.connection()?)
            .map_err(execute_error)?;

        entities.iter()
            .map(|e| e.to_domain())
            .collect()
    }
}
