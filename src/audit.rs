use crate::catalog::pipeline::{AfterCreate, Created};
use crate::catalog::{CatalogError, OwnerKey};
use crate::store;
use std::fmt;
use std::fmt::{Display, Formatter};
use std::rc::Rc;
use tracing::debug;

/// 사용자 작업 이력의 종류
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash)]
pub enum AuditKind {
    /// 새 레코드 등록
    NewItem,

    /// 기존 레코드 수정
    Edit,
}

impl Display for AuditKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            AuditKind::NewItem => write!(f, "NewItem"),
            AuditKind::Edit => write!(f, "Edit"),
        }
    }
}

/// 사용자 작업 이력
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuditRecord {
    id: u64,
    kind: AuditKind,
    user_id: u64,
    target: OwnerKey,
    created_at: Option<chrono::NaiveDateTime>,
}

impl AuditRecord {
    pub fn new(id: u64, kind: AuditKind, user_id: u64, target: OwnerKey, created_at: Option<chrono::NaiveDateTime>) -> Self {
        Self { id, kind, user_id, target, created_at }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn kind(&self) -> AuditKind {
        self.kind
    }

    pub fn user_id(&self) -> u64 {
        self.user_id
    }

    pub fn target(&self) -> OwnerKey {
        self.target
    }

    pub fn created_at(&self) -> Option<chrono::NaiveDateTime> {
        self.created_at
    }
}

pub type SharedAuditRepository = Rc<Box<dyn AuditRepository>>;

/// 작업 이력 저장소
pub trait AuditRepository {

    fn record(&self, kind: AuditKind, user_id: u64, target: OwnerKey) -> Result<AuditRecord, store::Error>;

    /// 대상 레코드의 작업 이력을 아이디 순으로 가져온다.
    fn find_by_target(&self, kind: AuditKind, target: OwnerKey) -> Result<Vec<AuditRecord>, store::Error>;
}

/// 등록한 사용자가 있는 경우 새 도서 등록 이력을 남긴다.
pub struct RecordNewItem {
    audits: SharedAuditRepository,
}

impl RecordNewItem {
    pub fn new(audits: SharedAuditRepository) -> Self {
        Self { audits }
    }
}

impl AfterCreate for RecordNewItem {
    fn name(&self) -> &'static str {
        "record_new_item"
    }

    fn after_create(&self, created: &Created) -> Result<(), CatalogError> {
        if let Some(user_id) = created.acting_user {
            let record = self.audits.record(AuditKind::NewItem, user_id, created.book.owner_key())?;
            debug!("새 도서 등록 이력 {} (user: {}, grandham_id: {})", record.id(), user_id, created.book.grandham_id());
        }
        Ok(())
    }
}
