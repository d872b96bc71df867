use crate::audit::{AuditKind, RecordNewItem, SharedAuditRepository};
use crate::catalog::draft::BookDraft;
use crate::catalog::pipeline::{Created, Pipeline};
use crate::catalog::reconcile::Reconciler;
use crate::catalog::validate::validate_book;
use crate::catalog::{
    Associate, AssociateKind, Book, BookPatch, CatalogError, Cover, GrandhamId, Scope, SharedAssociateRepository,
    SharedBookRepository, SharedCoverRepository, SharedLanguageRepository, ValidationError,
};
use crate::search::{IndexBook, SearchDocument, SharedSearchIndex};
use tracing::info;

/// 도서 서비스가 사용하는 저장소 묶음
#[derive(Clone)]
pub struct Repositories {
    pub books: SharedBookRepository,
    pub languages: SharedLanguageRepository,
    pub associates: SharedAssociateRepository,
    pub covers: SharedCoverRepository,
    pub audits: SharedAuditRepository,
    pub index: SharedSearchIndex,
}

/// 도서 등록, 조회, 승인, 공개 등 도서 관련 유스케이스
pub struct BookService {
    books: SharedBookRepository,
    languages: SharedLanguageRepository,
    associates: SharedAssociateRepository,
    covers: SharedCoverRepository,
    audits: SharedAuditRepository,
    index: SharedSearchIndex,

    pipeline: Pipeline,
}

impl BookService {

    /// 기본 생성 후처리 파이프라인(연관 레코드 정리 -> 검색 색인 -> 등록 이력)으로 서비스를 만든다.
    pub fn new(repositories: Repositories) -> Self {
        let mut pipeline = Pipeline::new();
        pipeline.add_step(Box::new(Reconciler::new(repositories.associates.clone(), repositories.covers.clone())));
        pipeline.add_step(Box::new(IndexBook::new(repositories.index.clone())));
        pipeline.add_step(Box::new(RecordNewItem::new(repositories.audits.clone())));

        Self::with_pipeline(repositories, pipeline)
    }

    pub fn with_pipeline(repositories: Repositories, pipeline: Pipeline) -> Self {
        Self {
            books: repositories.books,
            languages: repositories.languages,
            associates: repositories.associates,
            covers: repositories.covers,
            audits: repositories.audits,
            index: repositories.index,
            pipeline,
        }
    }

    /// 도서를 등록한다.
    ///
    /// # Flow
    /// 1. 요청 값의 유효성과 언어의 존재 여부를 확인한다.
    /// 2. 외부 식별자를 발급하고 도서를 저장한다.
    /// 3. 요청에 포함된 저자, 출판사, 도서관, 커버를 만들어 도서에 연결한다.
    /// 4. 생성 후처리 파이프라인을 실행한다.
    ///
    /// # Errors
    /// - [`CatalogError::Invalid`]: 유효성 검증 실패로 도서가 저장되지 않음
    /// - [`CatalogError::PostCreateFailed`]: 도서는 저장 되었지만 3, 4단계 중 실패함
    pub fn create_book(&self, draft: &BookDraft, acting_user: Option<u64>) -> Result<Book, CatalogError> {
        let mut errors = Vec::new();
        let book = match draft.to_book(GrandhamId::generate()) {
            Ok(book) => Some(book),
            Err(CatalogError::Invalid(invalid)) => {
                errors.extend(invalid);
                None
            }
            Err(e) => return Err(e),
        };

        if self.languages.find_language(draft.language_id)?.is_none() {
            errors.push(ValidationError::new("language", "must exist"));
        }

        let book = match book {
            Some(book) if errors.is_empty() => book,
            _ => return Err(CatalogError::Invalid(errors)),
        };

        let book = self.books.create_book(&book)?;
        info!("도서 등록 (grandham_id: {}, title: {})", book.grandham_id(), book.title());

        self.save_nested_records(&book, draft)
            .map_err(|cause| CatalogError::PostCreateFailed {
                grandham_id: book.grandham_id().to_string(),
                step: "save_nested_records",
                cause: Box::new(cause),
            })?;

        self.pipeline.run(&Created { book: &book, acting_user })?;
        Ok(book)
    }

    fn save_nested_records(&self, book: &Book, draft: &BookDraft) -> Result<(), CatalogError> {
        let nested = [
            (AssociateKind::Author, &draft.authors),
            (AssociateKind::Publisher, &draft.publishers),
            (AssociateKind::Library, &draft.libraries),
        ];
        for (kind, drafts) in nested {
            for associate in drafts {
                let created = self.associates.create_associate(kind, &associate.name, None)?;
                self.associates.link(kind, book.id(), created.id())?;
            }
        }

        for cover in &draft.covers {
            self.covers.create_cover(book.owner_key(), cover.image.as_deref())?;
        }
        Ok(())
    }

    /// 공개된 도서를 외부 식별자로 찾는다.
    pub fn find(&self, grandham_id: &str) -> Result<Book, CatalogError> {
        self.find_in(grandham_id, Scope::Visible)
    }

    /// 승인, 공개 여부와 관계 없이 도서를 찾는다. 관리 기능에서만 사용한다.
    pub fn find_unfiltered(&self, grandham_id: &str) -> Result<Book, CatalogError> {
        self.find_in(grandham_id, Scope::Unfiltered)
    }

    fn find_in(&self, grandham_id: &str, scope: Scope) -> Result<Book, CatalogError> {
        let id = GrandhamId::try_from(grandham_id)?;
        self.books.find_by_grandham_id(&id, scope)?
            .ok_or_else(|| CatalogError::NotFound(format!("book {}", grandham_id)))
    }

    pub fn list(&self, scope: Scope) -> Result<Vec<Book>, CatalogError> {
        Ok(self.books.find_all(scope)?)
    }

    pub fn associates(&self, book: &Book, kind: AssociateKind) -> Result<Vec<Associate>, CatalogError> {
        Ok(self.associates.find_linked(kind, book.id())?)
    }

    pub fn covers(&self, book: &Book) -> Result<Vec<Cover>, CatalogError> {
        Ok(self.covers.find_covers(book.owner_key())?)
    }

    /// 도서를 승인하고 저장한다. 저장 시 유효성 검증을 한다.
    pub fn approve(&self, grandham_id: &str) -> Result<Book, CatalogError> {
        let mut book = self.find_unfiltered(grandham_id)?;
        book.approve();
        validate_book(&book)?;

        self.books.update_book(&book)?;
        self.index.index(&SearchDocument::from(&book))?;
        info!("도서 승인 (grandham_id: {})", book.grandham_id());
        Ok(book)
    }

    /// 유효성 검증 없이 공개 여부만 변경한다.
    pub fn publish(&self, grandham_id: &str) -> Result<Book, CatalogError> {
        self.set_published(grandham_id, true)
    }

    pub fn unpublish(&self, grandham_id: &str) -> Result<Book, CatalogError> {
        self.set_published(grandham_id, false)
    }

    fn set_published(&self, grandham_id: &str, published: bool) -> Result<Book, CatalogError> {
        let mut book = self.find_unfiltered(grandham_id)?;
        self.books.update_published(book.id(), published)?;
        book.set_published(published);

        info!("도서 공개 여부 변경 {} (grandham_id: {})", published, book.grandham_id());
        Ok(book)
    }

    /// 도서를 수정하고 수정 이력을 남긴다. 연관 레코드 정리는 다시 하지 않는다.
    pub fn edit(&self, grandham_id: &str, patch: &BookPatch, user_id: u64) -> Result<Book, CatalogError> {
        let mut book = self.find_unfiltered(grandham_id)?;
        book.apply(patch);
        validate_book(&book)?;

        self.books.update_book(&book)?;
        self.audits.record(AuditKind::Edit, user_id, book.owner_key())?;
        self.index.index(&SearchDocument::from(&book))?;
        Ok(book)
    }

    /// 공개된 도서의 관리용 속성을 제외한 속성들
    pub fn details(&self, grandham_id: &str) -> Result<serde_json::Map<String, serde_json::Value>, CatalogError> {
        self.find(grandham_id)?.details()
    }

    /// 검색어와 일치하는 공개된 도서를 찾는다.
    pub fn search(&self, query: &str) -> Result<Vec<Book>, CatalogError> {
        let ids = self.index.search(query, true)?;
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        Ok(self.books.find_by_grandham_ids(&ids, Scope::Visible)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audit::AuditRepository;
    use crate::catalog::draft::{AssociateDraft, CoverDraft, FormNumber};
    use crate::catalog::{BookRepository, LanguageRepository, RESTRICTED_DETAIL_KEYS};
    use crate::store;
    use crate::store::memory::MemoryStore;

    struct Fixture {
        store: MemoryStore,
        service: BookService,
        language_id: u64,
    }

    fn fixture() -> Fixture {
        let store = MemoryStore::new();
        let language_id = store.create_language("Kannada").unwrap().id();
        let service = BookService::new(store.repositories());
        Fixture { store, service, language_id }
    }

    fn draft(language_id: u64) -> BookDraft {
        let mut draft = BookDraft::new(language_id);
        draft.title = Some("Parva".to_owned());
        draft.isbn = Some("9788126016142".to_owned());
        draft.year = Some(FormNumber::Integer(1979));
        draft.description = Some("The Mahabharata as lived experience".to_owned());
        draft
    }

    fn names(associates: &[Associate]) -> Vec<&str> {
        associates.iter().map(|a| a.name()).collect()
    }

    #[test]
    fn default_pipeline_reconciles_then_indexes_then_records() {
        let Fixture { service, .. } = fixture();

        assert_eq!(service.pipeline.step_names(), vec!["reconcile_associated_records", "index_book", "record_new_item"]);
    }

    #[test]
    fn created_book_gets_an_external_id_and_stays_hidden() {
        let Fixture { service, language_id, .. } = fixture();

        let book = service.create_book(&draft(language_id), None).unwrap();

        assert_eq!(book.to_param().len(), 16);
        assert!(book.to_param().chars().all(|c| c.is_ascii_hexdigit()));
        assert!(!book.approved() && !book.published() && !book.reviewed());
        assert!(matches!(service.find(book.to_param()), Err(CatalogError::NotFound(_))));
        assert_eq!(service.find_unfiltered(book.to_param()).unwrap().id(), book.id());
    }

    #[test]
    fn creation_reconciles_nested_records() {
        let Fixture { store, service, language_id } = fixture();
        let mut draft = draft(language_id);
        draft.authors = vec![
            AssociateDraft { name: "S. L. Bhyrappa".to_owned() },
            AssociateDraft { name: "S. L. Bhyrappa".to_owned() },
        ];
        draft.publishers = vec![AssociateDraft { name: "Sahitya Bhandara".to_owned() }];
        draft.libraries = vec![AssociateDraft { name: "Mysore City Library".to_owned() }];

        let book = service.create_book(&draft, None).unwrap();

        let authors = service.associates(&book, AssociateKind::Author).unwrap();
        assert_eq!(names(&authors), vec!["S. L. Bhyrappa"]);
        for kind in AssociateKind::ALL {
            let linked = service.associates(&book, kind).unwrap();
            assert_eq!(linked.len(), 1);
            assert!(linked.iter().all(|a| a.language_id() == Some(language_id)));
        }
        assert_eq!(store.count_associates(AssociateKind::Author), 1);
    }

    #[test]
    fn book_without_covers_gets_exactly_one() {
        let Fixture { service, language_id, .. } = fixture();

        let book = service.create_book(&draft(language_id), None).unwrap();

        let covers = service.covers(&book).unwrap();
        assert_eq!(covers.len(), 1);
        assert_eq!(covers[0].image(), None);
    }

    #[test]
    fn given_covers_are_kept_unchanged() {
        let Fixture { service, language_id, .. } = fixture();
        let mut draft = draft(language_id);
        draft.covers = vec![
            CoverDraft { image: Some("covers/parva-front.jpg".to_owned()) },
            CoverDraft { image: Some("covers/parva-back.jpg".to_owned()) },
        ];

        let book = service.create_book(&draft, None).unwrap();

        let images = service.covers(&book).unwrap().iter()
            .map(|c| c.image().map(str::to_owned))
            .collect::<Vec<_>>();
        assert_eq!(images, vec![Some("covers/parva-front.jpg".to_owned()), Some("covers/parva-back.jpg".to_owned())]);
    }

    #[test]
    fn invalid_draft_is_not_persisted() {
        let Fixture { store, service, language_id } = fixture();
        let mut draft = draft(language_id);
        draft.year = Some(FormNumber::Integer(2200));

        let result = service.create_book(&draft, None);

        assert!(matches!(result, Err(CatalogError::Invalid(_))));
        assert!(store.find_all(Scope::Unfiltered).unwrap().is_empty());
    }

    #[test]
    fn unknown_language_is_a_validation_error() {
        let Fixture { service, .. } = fixture();

        match service.create_book(&draft(404), None) {
            Err(CatalogError::Invalid(errors)) => {
                assert_eq!(errors.iter().map(|e| e.field()).collect::<Vec<_>>(), vec!["language"]);
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn failed_reconciliation_leaves_book_persisted() {
        let Fixture { store, service, language_id } = fixture();
        store.fail_on("create_cover");

        let result = service.create_book(&draft(language_id), Some(3));

        let grandham_id = match result {
            Err(CatalogError::PostCreateFailed { grandham_id, step, .. }) => {
                assert_eq!(step, "reconcile_associated_records");
                grandham_id
            }
            other => panic!("unexpected {:?}", other),
        };
        let book = service.find_unfiltered(&grandham_id).unwrap();
        assert!(service.covers(&book).unwrap().is_empty());
        assert!(service.search("parva").unwrap().is_empty());
        assert!(store.find_by_target(AuditKind::NewItem, book.owner_key()).unwrap().is_empty());
    }

    #[test]
    fn acting_user_is_recorded_as_new_item() {
        let Fixture { store, service, language_id } = fixture();

        let book = service.create_book(&draft(language_id), Some(3)).unwrap();

        let records = store.find_by_target(AuditKind::NewItem, book.owner_key()).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].user_id(), 3);
    }

    #[test]
    fn approve_and_publish_make_the_book_visible() {
        let Fixture { service, language_id, .. } = fixture();
        let book = service.create_book(&draft(language_id), None).unwrap();

        service.approve(book.to_param()).unwrap();
        assert!(service.find(book.to_param()).is_err());
        assert_eq!(service.list(Scope::Approved).unwrap().len(), 1);

        service.publish(book.to_param()).unwrap();
        let visible = service.find(book.to_param()).unwrap();
        assert!(visible.approved() && visible.published());
        assert_eq!(service.search("parva").unwrap().len(), 1);

        service.unpublish(book.to_param()).unwrap();
        assert!(service.find(book.to_param()).is_err());
        assert!(service.search("parva").unwrap().is_empty());
    }

    #[test]
    fn publish_skips_validation() {
        let Fixture { store, service, language_id } = fixture();
        let book = service.create_book(&draft(language_id), None).unwrap();
        let broken = book.to_builder().year(1200).build().unwrap();
        store.update_book(&broken).unwrap();

        assert!(matches!(service.approve(book.to_param()), Err(CatalogError::Invalid(_))));
        assert!(service.publish(book.to_param()).unwrap().published());
    }

    #[test]
    fn details_hide_administrative_fields() {
        let Fixture { service, language_id, .. } = fixture();
        let book = service.create_book(&draft(language_id), None).unwrap();
        service.approve(book.to_param()).unwrap();
        service.publish(book.to_param()).unwrap();

        let details = service.details(book.to_param()).unwrap();

        for key in RESTRICTED_DETAIL_KEYS {
            assert!(!details.contains_key(key));
        }
        assert_eq!(details.get("title"), Some(&serde_json::Value::from("Parva")));
    }

    #[test]
    fn edit_records_audit_and_reindexes() {
        let Fixture { store, service, language_id } = fixture();
        let book = service.create_book(&draft(language_id), None).unwrap();
        service.approve(book.to_param()).unwrap();
        service.publish(book.to_param()).unwrap();

        let patch = BookPatch { title_original: Some("Parva: A Tale of War".to_owned()), ..Default::default() };
        let edited = service.edit(book.to_param(), &patch, 9).unwrap();

        assert_eq!(edited.title_original(), Some("Parva: A Tale of War"));
        assert_eq!(store.find_by_target(AuditKind::Edit, book.owner_key()).unwrap().len(), 1);
        assert_eq!(service.search("tale war").unwrap().len(), 1);
    }

    #[test]
    fn malformed_external_id_is_rejected() {
        let Fixture { service, .. } = fixture();

        assert!(matches!(service.find("1"), Err(CatalogError::InvalidArgument(_))));
    }

    #[test]
    fn store_failure_before_insert_is_reported_as_is() {
        let Fixture { store, service, language_id } = fixture();
        store.fail_on("create_book");

        let result = service.create_book(&draft(language_id), None);

        assert_eq!(result, Err(CatalogError::Store(store::Error::SqlExecuteError("create_book".to_owned()))));
    }
}
