use crate::catalog::pipeline::{AfterCreate, Created};
use crate::catalog::{AssociateKind, Book, CatalogError, SharedAssociateRepository, SharedCoverRepository};
use tracing::{debug, info};

/// 연관 레코드 정리 결과
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReconcileReport {
    /// 언어가 변경된 레코드 수
    pub propagated: usize,

    /// 중복으로 판단 되어 삭제된 레코드 수
    pub folded: usize,

    /// 빈 커버를 새로 만들었는지 여부
    pub cover_created: bool,
}

/// 도서 연관 레코드 정리기
///
/// # Description
/// 도서가 처음 저장된 직후 도서에 연결된 저자, 출판사, 도서관을 정리하고 커버가 있도록 보장한다.
///
/// # Flow
/// 1. 저자, 출판사, 도서관 순으로 도서에 연결된 레코드의 언어를 도서의 언어로 일괄 변경한다.
/// 2. 저자, 출판사, 도서관 순으로 도서에 연결된 레코드마다 같은 종류, 같은 이름의 다른 레코드를 찾는다.
/// 찾은 경우 중복 레코드를 가리키던 도서 연결을 찾은 레코드로 옮기고 중복 레코드를 삭제한다.
/// 3. 도서에 커버가 하나도 없으면 빈 커버를 만든다.
///
/// # Note
/// - 각 단계는 트랜잭션으로 묶이지 않는다. 중간에 실패하면 그 전까지의 변경은 그대로 남는다.
/// - 중복 정리는 한번만 수행하며 정리 결과로 새로 생긴 중복은 다시 확인하지 않는다.
/// - 남는 레코드는 이름이 같은 다른 레코드 중 아이디가 가장 작은 레코드다.
pub struct Reconciler {
    associates: SharedAssociateRepository,
    covers: SharedCoverRepository,
}

impl Reconciler {
    pub fn new(associates: SharedAssociateRepository, covers: SharedCoverRepository) -> Self {
        Self { associates, covers }
    }

    pub fn reconcile(&self, book: &Book) -> Result<ReconcileReport, CatalogError> {
        let propagated = self.propagate_language(book)?;
        let folded = self.fold_duplicates(book)?;
        let cover_created = self.ensure_cover(book)?;

        Ok(ReconcileReport { propagated, folded, cover_created })
    }

    pub fn propagate_language(&self, book: &Book) -> Result<usize, CatalogError> {
        let mut updated = 0;
        for kind in AssociateKind::ALL {
            let count = self.associates.update_language_of_linked(kind, book.id(), book.language_id())?;
            debug!("{} {}건의 언어를 {}로 변경 (grandham_id: {})", kind, count, book.language_id(), book.grandham_id());
            updated += count;
        }
        Ok(updated)
    }

    pub fn fold_duplicates(&self, book: &Book) -> Result<usize, CatalogError> {
        let mut folded = 0;
        for kind in AssociateKind::ALL {
            folded += self.fold_kind(kind, book)?;
        }
        Ok(folded)
    }

    fn fold_kind(&self, kind: AssociateKind, book: &Book) -> Result<usize, CatalogError> {
        let linked = self.associates.find_linked(kind, book.id())?;

        let mut folded = 0;
        for duplicate in linked {
            let existing = self.associates.find_namesake(kind, duplicate.name(), duplicate.id())?;
            if let Some(existing) = existing {
                self.associates.relink(kind, duplicate.id(), existing.id())?;
                self.associates.delete_associate(kind, duplicate.id())?;

                info!("중복된 {} \"{}\"({})를 {}로 합쳤습니다. (grandham_id: {})",
                    kind, duplicate.name(), duplicate.id(), existing.id(), book.grandham_id());
                folded += 1;
            }
        }
        Ok(folded)
    }

    pub fn ensure_cover(&self, book: &Book) -> Result<bool, CatalogError> {
        let owner = book.owner_key();
        if self.covers.count_covers(owner)? > 0 {
            return Ok(false);
        }

        let cover = self.covers.create_cover(owner, None)?;
        debug!("커버가 없어 빈 커버({})를 생성 했습니다. (grandham_id: {})", cover.id(), book.grandham_id());
        Ok(true)
    }
}

impl AfterCreate for Reconciler {
    fn name(&self) -> &'static str {
        "reconcile_associated_records"
    }

    fn after_create(&self, created: &Created) -> Result<(), CatalogError> {
        let report = self.reconcile(created.book)?;
        info!("연관 레코드 정리 완료 {:?} (grandham_id: {})", report, created.book.grandham_id());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{AssociateRepository, BookRepository, CoverRepository, GrandhamId, LanguageRepository};
    use crate::store;
    use crate::store::memory::MemoryStore;
    use std::rc::Rc;

    struct Fixture {
        store: MemoryStore,
        reconciler: Reconciler,
        book: Book,
    }

    fn fixture() -> Fixture {
        let store = MemoryStore::new();
        let language = store.create_language("Malayalam").unwrap();
        let draft = Book::builder()
            .grandham_id(GrandhamId::generate())
            .title("Aadujeevitham".to_owned())
            .isbn("9788122608938".to_owned())
            .year(2008)
            .language_id(language.id())
            .build()
            .unwrap();
        let book = store.create_book(&draft).unwrap();
        let reconciler = Reconciler::new(
            Rc::new(Box::new(store.clone())),
            Rc::new(Box::new(store.clone())),
        );
        Fixture { store, reconciler, book }
    }

    fn linked(store: &MemoryStore, kind: AssociateKind, book: &Book, name: &str, language_id: Option<u64>) -> u64 {
        let associate = store.create_associate(kind, name, language_id).unwrap();
        store.link(kind, book.id(), associate.id()).unwrap();
        associate.id()
    }

    #[test]
    fn language_is_propagated_to_every_kind() {
        let Fixture { store, reconciler, book } = fixture();
        linked(&store, AssociateKind::Author, &book, "Benyamin", None);
        linked(&store, AssociateKind::Publisher, &book, "Green Books", Some(99));
        linked(&store, AssociateKind::Library, &book, "Kerala State Library", None);
        let unrelated = store.create_associate(AssociateKind::Author, "M. T. Vasudevan Nair", Some(99)).unwrap();

        let propagated = reconciler.propagate_language(&book).unwrap();

        assert_eq!(propagated, 3);
        for kind in AssociateKind::ALL {
            for associate in store.find_linked(kind, book.id()).unwrap() {
                assert_eq!(associate.language_id(), Some(book.language_id()));
            }
        }
        assert_eq!(store.find_associate(AssociateKind::Author, unrelated.id()).unwrap().language_id(), Some(99));
    }

    #[test]
    fn same_named_authors_fold_into_one_survivor() {
        let Fixture { store, reconciler, book } = fixture();
        let first = linked(&store, AssociateKind::Author, &book, "Benyamin", None);
        let second = linked(&store, AssociateKind::Author, &book, "Benyamin", None);

        let folded = reconciler.fold_duplicates(&book).unwrap();

        assert_eq!(folded, 1);
        let survivors = store.find_linked(AssociateKind::Author, book.id()).unwrap();
        assert_eq!(survivors.len(), 1);
        assert_eq!(survivors[0].id(), second);
        assert!(store.find_associate(AssociateKind::Author, first).is_none());
    }

    #[test]
    fn chain_of_namesakes_folds_in_a_single_pass() {
        let Fixture { store, reconciler, book } = fixture();
        let first = linked(&store, AssociateKind::Author, &book, "Lalithambika Antharjanam", None);
        let second = linked(&store, AssociateKind::Author, &book, "Lalithambika Antharjanam", None);
        let third = linked(&store, AssociateKind::Author, &book, "Lalithambika Antharjanam", None);

        let folded = reconciler.fold_duplicates(&book).unwrap();

        assert_eq!(folded, 2);
        let survivors = store.find_linked(AssociateKind::Author, book.id()).unwrap();
        assert_eq!(survivors.iter().map(|a| a.id()).collect::<Vec<_>>(), vec![third]);
        assert!(store.find_associate(AssociateKind::Author, first).is_none());
        assert!(store.find_associate(AssociateKind::Author, second).is_none());
        assert_eq!(store.count_associates(AssociateKind::Author), 1);
    }

    #[test]
    fn duplicate_is_folded_into_an_existing_unlinked_record() {
        let Fixture { store, reconciler, book } = fixture();
        let existing = store.create_associate(AssociateKind::Publisher, "DC Books", None).unwrap();
        let entered = linked(&store, AssociateKind::Publisher, &book, "DC Books", None);

        reconciler.fold_duplicates(&book).unwrap();

        let publishers = store.find_linked(AssociateKind::Publisher, book.id()).unwrap();
        assert_eq!(publishers.iter().map(|p| p.id()).collect::<Vec<_>>(), vec![existing.id()]);
        assert!(store.find_associate(AssociateKind::Publisher, entered).is_none());
    }

    #[test]
    fn lowest_id_namesake_is_chosen_as_survivor() {
        let Fixture { store, reconciler, book } = fixture();
        let oldest = store.create_associate(AssociateKind::Author, "Basheer", None).unwrap();
        let _newer = store.create_associate(AssociateKind::Author, "Basheer", None).unwrap();
        linked(&store, AssociateKind::Author, &book, "Basheer", None);

        reconciler.fold_duplicates(&book).unwrap();

        let authors = store.find_linked(AssociateKind::Author, book.id()).unwrap();
        assert_eq!(authors.iter().map(|a| a.id()).collect::<Vec<_>>(), vec![oldest.id()]);
    }

    #[test]
    fn folding_does_not_cross_kinds() {
        let Fixture { store, reconciler, book } = fixture();
        linked(&store, AssociateKind::Author, &book, "Mathrubhumi", None);
        linked(&store, AssociateKind::Publisher, &book, "Mathrubhumi", None);

        let folded = reconciler.fold_duplicates(&book).unwrap();

        assert_eq!(folded, 0);
        assert_eq!(store.find_linked(AssociateKind::Author, book.id()).unwrap().len(), 1);
        assert_eq!(store.find_linked(AssociateKind::Publisher, book.id()).unwrap().len(), 1);
    }

    #[test]
    fn other_books_follow_the_survivor() {
        let Fixture { store, reconciler, book } = fixture();
        let other_draft = Book::builder()
            .grandham_id(GrandhamId::generate())
            .title("Manjaveyil Maranangal".to_owned())
            .isbn("9788126437084".to_owned())
            .year(2011)
            .language_id(book.language_id())
            .build()
            .unwrap();
        let other = store.create_book(&other_draft).unwrap();
        let existing = store.create_associate(AssociateKind::Library, "Public Library", None).unwrap();
        let duplicate = linked(&store, AssociateKind::Library, &book, "Public Library", None);
        store.link(AssociateKind::Library, other.id(), duplicate).unwrap();

        reconciler.fold_duplicates(&book).unwrap();

        let ids = |b: &Book| store.find_linked(AssociateKind::Library, b.id()).unwrap()
            .iter().map(|l| l.id()).collect::<Vec<_>>();
        assert_eq!(ids(&book), vec![existing.id()]);
        assert_eq!(ids(&other), vec![existing.id()]);
    }

    #[test]
    fn empty_cover_is_created_only_when_missing() {
        let Fixture { store, reconciler, book } = fixture();

        assert!(reconciler.ensure_cover(&book).unwrap());
        assert!(!reconciler.ensure_cover(&book).unwrap());

        let covers = store.find_covers(book.owner_key()).unwrap();
        assert_eq!(covers.len(), 1);
        assert_eq!(covers[0].image(), None);
    }

    #[test]
    fn failure_keeps_earlier_phases_and_skips_later_ones() {
        let Fixture { store, reconciler, book } = fixture();
        linked(&store, AssociateKind::Author, &book, "Benyamin", Some(42));
        linked(&store, AssociateKind::Author, &book, "Benyamin", Some(42));
        store.fail_on("find_namesake");

        let result = reconciler.reconcile(&book);

        assert_eq!(result, Err(CatalogError::Store(store::Error::SqlExecuteError("find_namesake".to_owned()))));
        let authors = store.find_linked(AssociateKind::Author, book.id()).unwrap();
        assert_eq!(authors.len(), 2);
        assert!(authors.iter().all(|a| a.language_id() == Some(book.language_id())));
        assert_eq!(store.count_covers(book.owner_key()).unwrap(), 0);
    }
}
