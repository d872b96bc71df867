use crate::audit::{AuditKind, AuditRecord, AuditRepository};
use crate::catalog::service::Repositories;
use crate::catalog::{
    Associate, AssociateKind, AssociateRepository, Book, BookRepository, Cover, CoverRepository, GrandhamId, Language,
    LanguageRepository, OwnerKey, Scope,
};
use crate::search::{tokenize, SearchDocument, SearchIndex};
use crate::store::Error;
use crate::user::{NewUser, Role, User, UserRepository};
use std::cell::RefCell;
use std::collections::{BTreeMap, HashSet};
use std::rc::Rc;

#[derive(Default)]
struct State {
    sequence: u64,
    failing: HashSet<&'static str>,

    languages: BTreeMap<u64, Language>,
    books: BTreeMap<u64, Book>,
    associates: BTreeMap<(AssociateKind, u64), Associate>,
    // (종류, 도서 아이디, 레코드 아이디)
    links: Vec<(AssociateKind, u64, u64)>,
    covers: BTreeMap<u64, Cover>,
    audits: BTreeMap<u64, AuditRecord>,
    users: BTreeMap<u64, User>,
    documents: BTreeMap<String, SearchDocument>,
}

impl State {
    fn next_id(&mut self) -> u64 {
        self.sequence += 1;
        self.sequence
    }
}

/// 프로세스 메모리에 데이터를 저장하는 저장소
///
/// 복제본들은 같은 데이터를 공유하며 아이디는 1부터 순서대로 발급된다.
/// 데이터베이스 없이 서비스를 실행하거나 테스트할 때 사용한다.
#[derive(Clone, Default)]
pub struct MemoryStore {
    state: Rc<RefCell<State>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// 이후 `operation` 이름의 저장소 연산이 [`Error::SqlExecuteError`]로 실패하도록 한다.
    pub fn fail_on(&self, operation: &'static str) {
        self.state.borrow_mut().failing.insert(operation);
    }

    pub fn recover(&self, operation: &'static str) {
        self.state.borrow_mut().failing.remove(operation);
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

    pub fn find_associate(&self, kind: AssociateKind, id: u64) -> Option<Associate> {
        self.state.borrow().associates.get(&(kind, id)).cloned()
    }

    pub fn count_associates(&self, kind: AssociateKind) -> usize {
        self.state.borrow().associates.keys().filter(|(k, _)| *k == kind).count()
    }

    fn check(&self, operation: &'static str) -> Result<(), Error> {
        if self.state.borrow().failing.contains(operation) {
            Err(Error::SqlExecuteError(operation.to_owned()))
        } else {
            Ok(())
        }
    }
}

fn now() -> chrono::NaiveDateTime {
    chrono::Local::now().naive_local()
}

impl LanguageRepository for MemoryStore {
    fn find_language(&self, id: u64) -> Result<Option<Language>, Error> {
        self.check("find_language")?;
        Ok(self.state.borrow().languages.get(&id).cloned())
    }

    fn create_language(&self, name: &str) -> Result<Language, Error> {
        self.check("create_language")?;
        let mut state = self.state.borrow_mut();
        let language = Language::new(state.next_id(), name.to_owned());
        state.languages.insert(language.id(), language.clone());
        Ok(language)
    }
}

impl BookRepository for MemoryStore {
    fn create_book(&self, book: &Book) -> Result<Book, Error> {
        self.check("create_book")?;
        let mut state = self.state.borrow_mut();
        let created_at = now();
        let created = book.to_builder()
            .id(state.next_id())
            .created_at(created_at)
            .updated_at(created_at)
            .build()
            .map_err(|e| Error::ConvertError(e.to_string()))?;

        state.books.insert(created.id(), created.clone());
        Ok(created)
    }

    fn find_by_grandham_id(&self, grandham_id: &GrandhamId, scope: Scope) -> Result<Option<Book>, Error> {
        self.check("find_by_grandham_id")?;
        Ok(self.state.borrow().books.values()
            .find(|b| b.grandham_id() == grandham_id && scope.admits(b))
            .cloned())
    }

    fn find_by_grandham_ids(&self, grandham_ids: &[GrandhamId], scope: Scope) -> Result<Vec<Book>, Error> {
        self.check("find_by_grandham_ids")?;
        Ok(self.state.borrow().books.values()
            .filter(|b| grandham_ids.contains(b.grandham_id()) && scope.admits(b))
            .cloned()
            .collect())
    }

    fn find_all(&self, scope: Scope) -> Result<Vec<Book>, Error> {
        self.check("find_all")?;
        Ok(self.state.borrow().books.values()
            .filter(|b| scope.admits(b))
            .cloned()
            .collect())
    }

    fn update_book(&self, book: &Book) -> Result<usize, Error> {
        self.check("update_book")?;
        let mut state = self.state.borrow_mut();
        let Some(stored) = state.books.get_mut(&book.id()) else {
            return Ok(0);
        };

        let mut builder = book.to_builder().updated_at(now());
        if let Some(created_at) = stored.created_at() {
            builder = builder.created_at(created_at);
        }
        *stored = builder.build().map_err(|e| Error::ConvertError(e.to_string()))?;
        Ok(1)
    }

    fn update_published(&self, id: u64, published: bool) -> Result<usize, Error> {
        self.check("update_published")?;
        let mut state = self.state.borrow_mut();
        match state.books.get_mut(&id) {
            Some(book) => {
                book.set_published(published);
                Ok(1)
            }
            None => Ok(0),
        }
    }
}

impl AssociateRepository for MemoryStore {
    fn create_associate(&self, kind: AssociateKind, name: &str, language_id: Option<u64>) -> Result<Associate, Error> {
        self.check("create_associate")?;
        let mut state = self.state.borrow_mut();
        let associate = Associate::new(state.next_id(), kind, name.to_owned(), language_id);
        state.associates.insert((kind, associate.id()), associate.clone());
        Ok(associate)
    }

    fn link(&self, kind: AssociateKind, book_id: u64, associate_id: u64) -> Result<(), Error> {
        self.check("link")?;
        let mut state = self.state.borrow_mut();
        let link = (kind, book_id, associate_id);
        if !state.links.contains(&link) {
            state.links.push(link);
        }
        Ok(())
    }

    fn find_linked(&self, kind: AssociateKind, book_id: u64) -> Result<Vec<Associate>, Error> {
        self.check("find_linked")?;
        let state = self.state.borrow();
        let ids: HashSet<u64> = state.links.iter()
            .filter(|(k, b, _)| *k == kind && *b == book_id)
            .map(|(_, _, a)| *a)
            .collect();

        Ok(state.associates.values()
            .filter(|a| a.kind() == kind && ids.contains(&a.id()))
            .cloned()
            .collect())
    }

    fn update_language_of_linked(&self, kind: AssociateKind, book_id: u64, language_id: u64) -> Result<usize, Error> {
        self.check("update_language_of_linked")?;
        let linked = self.find_linked(kind, book_id)?;

        let mut state = self.state.borrow_mut();
        for associate in &linked {
            let updated = Associate::new(associate.id(), kind, associate.name().to_owned(), Some(language_id));
            state.associates.insert((kind, associate.id()), updated);
        }
        Ok(linked.len())
    }

    fn find_namesake(&self, kind: AssociateKind, name: &str, exclude_id: u64) -> Result<Option<Associate>, Error> {
        self.check("find_namesake")?;
        Ok(self.state.borrow().associates.values()
            .find(|a| a.kind() == kind && a.name() == name && a.id() != exclude_id)
            .cloned())
    }

    fn relink(&self, kind: AssociateKind, from: u64, to: u64) -> Result<usize, Error> {
        self.check("relink")?;
        let mut state = self.state.borrow_mut();
        let already_linked: HashSet<u64> = state.links.iter()
            .filter(|(k, _, a)| *k == kind && *a == to)
            .map(|(_, b, _)| *b)
            .collect();

        state.links.retain(|(k, b, a)| !(*k == kind && *a == from && already_linked.contains(b)));

        let mut moved = 0;
        for link in state.links.iter_mut().filter(|(k, _, a)| *k == kind && *a == from) {
            link.2 = to;
            moved += 1;
        }
        Ok(moved)
    }

    fn delete_associate(&self, kind: AssociateKind, id: u64) -> Result<usize, Error> {
        self.check("delete_associate")?;
        let mut state = self.state.borrow_mut();
        state.links.retain(|(k, _, a)| !(*k == kind && *a == id));
        Ok(state.associates.remove(&(kind, id)).map_or(0, |_| 1))
    }
}

impl CoverRepository for MemoryStore {
    fn count_covers(&self, owner: OwnerKey) -> Result<usize, Error> {
        self.check("count_covers")?;
        Ok(self.state.borrow().covers.values().filter(|c| c.owner() == owner).count())
    }

    fn find_covers(&self, owner: OwnerKey) -> Result<Vec<Cover>, Error> {
        self.check("find_covers")?;
        Ok(self.state.borrow().covers.values()
            .filter(|c| c.owner() == owner)
            .cloned()
            .collect())
    }

    fn create_cover(&self, owner: OwnerKey, image: Option<&str>) -> Result<Cover, Error> {
        self.check("create_cover")?;
        let mut state = self.state.borrow_mut();
        let cover = Cover::new(state.next_id(), owner, image.map(str::to_owned), Some(now()));
        state.covers.insert(cover.id(), cover.clone());
        Ok(cover)
    }
}

impl AuditRepository for MemoryStore {
    fn record(&self, kind: AuditKind, user_id: u64, target: OwnerKey) -> Result<AuditRecord, Error> {
        self.check("record")?;
        let mut state = self.state.borrow_mut();
        let record = AuditRecord::new(state.next_id(), kind, user_id, target, Some(now()));
        state.audits.insert(record.id(), record.clone());
        Ok(record)
    }

    fn find_by_target(&self, kind: AuditKind, target: OwnerKey) -> Result<Vec<AuditRecord>, Error> {
        self.check("find_by_target")?;
        Ok(self.state.borrow().audits.values()
            .filter(|r| r.kind() == kind && r.target() == target)
            .cloned()
            .collect())
    }
}

impl SearchIndex for MemoryStore {
    fn index(&self, document: &SearchDocument) -> Result<(), Error> {
        self.check("index")?;
        self.state.borrow_mut().documents.insert(document.grandham_id().to_string(), document.clone());
        Ok(())
    }

    fn search(&self, query: &str, approved_only: bool) -> Result<Vec<GrandhamId>, Error> {
        self.check("search")?;
        let tokens = tokenize(query);
        Ok(self.state.borrow().documents.values()
            .filter(|d| !approved_only || d.approved())
            .filter(|d| d.matches(&tokens))
            .map(|d| d.grandham_id().clone())
            .collect())
    }
}

impl UserRepository for MemoryStore {
    fn create_user(&self, user: &NewUser) -> Result<User, Error> {
        self.check("create_user")?;
        let mut state = self.state.borrow_mut();
        let created = User::new(state.next_id(), user.login.clone(), user.email.clone(), user.role)
            .with_references(user.language_id, user.publisher_id, user.library_id)
            .with_created_at(now());
        state.users.insert(created.id(), created.clone());
        Ok(created)
    }

    fn find_user(&self, id: u64) -> Result<Option<User>, Error> {
        self.check("find_user")?;
        Ok(self.state.borrow().users.get(&id).cloned())
    }

    fn find_by_login(&self, login: &str) -> Result<Option<User>, Error> {
        self.check("find_by_login")?;
        Ok(self.state.borrow().users.values().find(|u| u.login() == login).cloned())
    }

    fn update_role(&self, id: u64, role: Role) -> Result<usize, Error> {
        self.check("update_role")?;
        let mut state = self.state.borrow_mut();
        let Some(user) = state.users.get(&id).cloned() else {
            return Ok(0);
        };
        let updated = rebuild_user(&user, role, user.language_id());
        state.users.insert(id, updated);
        Ok(1)
    }

    fn update_role_and_language(&self, id: u64, role: Role, language_id: u64) -> Result<usize, Error> {
        self.check("update_role_and_language")?;
        let mut state = self.state.borrow_mut();
        let Some(user) = state.users.get(&id).cloned() else {
            return Ok(0);
        };
        let updated = rebuild_user(&user, role, Some(language_id));
        state.users.insert(id, updated);
        Ok(1)
    }
}

fn rebuild_user(user: &User, role: Role, language_id: Option<u64>) -> User {
    let rebuilt = User::new(user.id(), user.login().to_owned(), user.email().map(str::to_owned), Some(role))
        .with_references(language_id, user.publisher_id(), user.library_id());
    match user.created_at() {
        Some(created_at) => rebuilt.with_created_at(created_at),
        None => rebuilt,
    }
}
