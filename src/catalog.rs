pub mod draft;
pub mod pipeline;
pub mod reconcile;
pub mod service;
pub mod validate;

use crate::store;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fmt::{Display, Formatter};
use std::rc::Rc;
use std::sync::LazyLock;

/// 카탈로그 모듈에서 사용할 에러 열거
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CatalogError {
    /// 필수 데이터가 입력 되지 않음
    RequireArgumentMissing(String),

    /// 알 수 없는 열거형 코드
    UnknownCode(String),

    /// 형식이 잘못된 입력
    InvalidArgument(String),

    /// 유효성 검증 실패, 실패한 항목을 모두 가지고 있다.
    Invalid(Vec<ValidationError>),

    /// 찾는 데이터가 없음
    NotFound(String),

    /// 저장소 에러
    Store(store::Error),

    /// 도서는 저장 되었지만 생성 후처리 단계가 실패함
    ///
    /// 도서는 이미 저장된 상태로 남으며 실패한 단계 이후의 후처리는 실행 되지 않는다.
    PostCreateFailed {
        grandham_id: String,
        step: &'static str,
        cause: Box<CatalogError>,
    },
}

impl Display for CatalogError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            CatalogError::Invalid(errors) => {
                let messages = errors.iter()
                    .map(|e| e.to_string())
                    .collect::<Vec<_>>();
                write!(f, "Validation failed: {}", messages.join(", "))
            }
            CatalogError::Store(e) => write!(f, "{}", e),
            CatalogError::PostCreateFailed { grandham_id, step, cause } => {
                write!(f, "Book {} was saved but {} failed: {}", grandham_id, step, cause)
            }
            _ => write!(f, "{:?}", self),
        }
    }
}

impl std::error::Error for CatalogError {}

impl From<store::Error> for CatalogError {
    fn from(value: store::Error) -> Self {
        CatalogError::Store(value)
    }
}

/// 유효성 검증 실패 항목
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    field: &'static str,
    message: String,
}

impl ValidationError {
    pub fn new(field: &'static str, message: &str) -> Self {
        Self { field, message: message.to_owned() }
    }

    pub fn field(&self) -> &'static str {
        self.field
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl Display for ValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.field, self.message)
    }
}

static GRANDHAM_ID_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new("^[0-9a-f]{16}$").expect("grandham id pattern must compile")
});

/// 외부에 노출되는 도서 식별자
///
/// 16자리 소문자 16진수 문자열로 도서 생성 직전에 한번만 발급 되며 이후에는 바뀌지 않는다.
/// 내부 아이디([`Book::id`]) 대신 URL 등 외부 참조에 사용한다.
///
/// # Example
/// ```
/// use grandham_catalog::catalog::GrandhamId;
///
/// let id = GrandhamId::generate();
/// assert_eq!(id.as_str().len(), 16);
/// assert!(GrandhamId::try_from(id.as_str()).is_ok());
/// assert!(GrandhamId::try_from("not-a-grandham-id").is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct GrandhamId(String);

impl GrandhamId {
    pub fn generate() -> Self {
        let bytes: [u8; 8] = rand::random();
        Self(hex::encode(bytes))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<&str> for GrandhamId {
    type Error = CatalogError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        if GRANDHAM_ID_PATTERN.is_match(value) {
            Ok(Self(value.to_owned()))
        } else {
            Err(CatalogError::InvalidArgument(format!("Invalid grandham id: {}", value)))
        }
    }
}

impl Display for GrandhamId {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// 언어
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Language {
    id: u64,
    name: String,
}

impl Language {
    pub fn new(id: u64, name: String) -> Self {
        Self { id, name }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

/// 도서와 다대다로 연결 되는 레코드의 종류
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash, Ord, PartialOrd)]
pub enum AssociateKind {
    Author,
    Publisher,
    Library,
}

impl AssociateKind {
    /// 후처리 시 레코드를 처리하는 순서
    pub const ALL: [AssociateKind; 3] = [AssociateKind::Author, AssociateKind::Publisher, AssociateKind::Library];
}

impl Display for AssociateKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            AssociateKind::Author => write!(f, "Author"),
            AssociateKind::Publisher => write!(f, "Publisher"),
            AssociateKind::Library => write!(f, "Library"),
        }
    }
}

/// 저자, 출판사, 도서관
///
/// 세 종류 모두 이름과 언어만 가지고 있으며 [`AssociateKind`]로 구분한다.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Associate {
    id: u64,
    kind: AssociateKind,
    name: String,
    language_id: Option<u64>,
}

impl Associate {
    pub fn new(id: u64, kind: AssociateKind, name: String, language_id: Option<u64>) -> Self {
        Self { id, kind, name, language_id }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn kind(&self) -> AssociateKind {
        self.kind
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn language_id(&self) -> Option<u64> {
        self.language_id
    }
}

/// 커버, 수정 이력 등이 붙을 수 있는 레코드의 종류
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash, Ord, PartialOrd)]
pub enum OwnerKind {
    Book,
    Author,
    Publisher,
    Library,
}

impl OwnerKind {
    pub fn to_code_str(&self) -> &'static str {
        match self {
            OwnerKind::Book => "Book",
            OwnerKind::Author => "Author",
            OwnerKind::Publisher => "Publisher",
            OwnerKind::Library => "Library",
        }
    }
}

impl TryFrom<&str> for OwnerKind {
    type Error = CatalogError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "Book" => Ok(OwnerKind::Book),
            "Author" => Ok(OwnerKind::Author),
            "Publisher" => Ok(OwnerKind::Publisher),
            "Library" => Ok(OwnerKind::Library),
            _ => Err(CatalogError::UnknownCode(value.to_owned())),
        }
    }
}

/// 다형성 연관의 소유자 키 (소유자 종류 + 소유자 아이디)
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash, Ord, PartialOrd)]
pub struct OwnerKey {
    pub kind: OwnerKind,
    pub id: u64,
}

impl OwnerKey {
    pub fn new(kind: OwnerKind, id: u64) -> Self {
        Self { kind, id }
    }
}

impl Display for OwnerKey {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.kind.to_code_str(), self.id)
    }
}

/// 커버 이미지
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cover {
    id: u64,
    owner: OwnerKey,
    image: Option<String>,
    created_at: Option<chrono::NaiveDateTime>,
}

impl Cover {
    pub fn new(id: u64, owner: OwnerKey, image: Option<String>, created_at: Option<chrono::NaiveDateTime>) -> Self {
        Self { id, owner, image, created_at }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn owner(&self) -> OwnerKey {
        self.owner
    }

    pub fn image(&self) -> Option<&str> {
        self.image.as_deref()
    }

    pub fn created_at(&self) -> Option<chrono::NaiveDateTime> {
        self.created_at
    }
}

/// 도서 조회 범위
///
/// 일반적인 조회는 [`Scope::Visible`]을 사용하며 관리 기능에서만 나머지 범위를 명시적으로 사용한다.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Default)]
pub enum Scope {
    /// 승인 되고 공개된 도서
    #[default]
    Visible,

    /// 승인된 도서 (공개 여부 무관)
    Approved,

    /// 검토 되지 않은 도서
    NotReviewed,

    /// 조건 없음
    Unfiltered,
}

impl Scope {
    pub fn admits(&self, book: &Book) -> bool {
        match self {
            Scope::Visible => book.approved && book.published,
            Scope::Approved => book.approved,
            Scope::NotReviewed => !book.reviewed,
            Scope::Unfiltered => true,
        }
    }
}

/// 도서
#[derive(Debug, Clone, Eq, PartialEq, Serialize)]
pub struct Book {
    id: u64,
    grandham_id: GrandhamId,
    title: String,
    title_original: Option<String>,
    description: Option<String>,
    isbn: String,
    pages: Option<i32>,
    year: Option<i32>,
    approved: bool,
    published: bool,
    reviewed: bool,
    language_id: u64,
    created_at: Option<chrono::NaiveDateTime>,
    updated_at: Option<chrono::NaiveDateTime>,
}

/// [`Book::details`]에서 제외되는 내부/관리용 속성
pub const RESTRICTED_DETAIL_KEYS: [&str; 8] = [
    "id", "created_at", "updated_at", "approved", "reviewed", "grandham_id", "language_id", "published",
];

impl Book {
    pub fn builder() -> BookBuilder {
        BookBuilder::new()
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn grandham_id(&self) -> &GrandhamId {
        &self.grandham_id
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn title_original(&self) -> Option<&str> {
        self.title_original.as_deref()
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    pub fn isbn(&self) -> &str {
        &self.isbn
    }

    pub fn pages(&self) -> Option<i32> {
        self.pages
    }

    pub fn year(&self) -> Option<i32> {
        self.year
    }

    pub fn approved(&self) -> bool {
        self.approved
    }

    pub fn published(&self) -> bool {
        self.published
    }

    pub fn reviewed(&self) -> bool {
        self.reviewed
    }

    pub fn language_id(&self) -> u64 {
        self.language_id
    }

    pub fn created_at(&self) -> Option<chrono::NaiveDateTime> {
        self.created_at
    }

    pub fn updated_at(&self) -> Option<chrono::NaiveDateTime> {
        self.updated_at
    }

    pub fn name(&self) -> &str {
        &self.title
    }

    /// 외부 참조에 사용할 값
    pub fn to_param(&self) -> &str {
        self.grandham_id.as_str()
    }

    pub fn owner_key(&self) -> OwnerKey {
        OwnerKey::new(OwnerKind::Book, self.id)
    }

    pub fn approve(&mut self) {
        self.approved = true;
    }

    pub fn set_published(&mut self, published: bool) {
        self.published = published;
    }

    pub fn apply(&mut self, patch: &BookPatch) {
        if let Some(title) = &patch.title {
            self.title = title.clone();
        }
        if let Some(title_original) = &patch.title_original {
            self.title_original = Some(title_original.clone());
        }
        if let Some(description) = &patch.description {
            self.description = Some(description.clone());
        }
        if let Some(isbn) = &patch.isbn {
            self.isbn = isbn.clone();
        }
        if let Some(pages) = patch.pages {
            self.pages = Some(pages);
        }
        if let Some(year) = patch.year {
            self.year = Some(year);
        }
    }

    /// 관리용 속성을 제외한 도서의 속성들을 반환한다.
    ///
    /// 제외되는 속성은 [`RESTRICTED_DETAIL_KEYS`]를 확인
    pub fn details(&self) -> Result<serde_json::Map<String, serde_json::Value>, CatalogError> {
        let value = serde_json::to_value(self)
            .map_err(|e| CatalogError::Store(store::Error::ConvertError(e.to_string())))?;

        match value {
            serde_json::Value::Object(mut attrs) => {
                for key in RESTRICTED_DETAIL_KEYS {
                    attrs.remove(key);
                }
                Ok(attrs)
            }
            _ => Err(CatalogError::Store(store::Error::ConvertError("book is not an object".to_owned()))),
        }
    }

    pub fn to_builder(&self) -> BookBuilder {
        BookBuilder {
            id: Some(self.id),
            grandham_id: Some(self.grandham_id.clone()),
            title: Some(self.title.clone()),
            title_original: self.title_original.clone(),
            description: self.description.clone(),
            isbn: Some(self.isbn.clone()),
            pages: self.pages,
            year: self.year,
            approved: self.approved,
            published: self.published,
            reviewed: self.reviewed,
            language_id: Some(self.language_id),
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

/// Book 빌더
#[derive(Debug, Clone, Eq, PartialEq, Default)]
pub struct BookBuilder {
    id: Option<u64>,
    grandham_id: Option<GrandhamId>,
    title: Option<String>,
    title_original: Option<String>,
    description: Option<String>,
    isbn: Option<String>,
    pages: Option<i32>,
    year: Option<i32>,
    approved: bool,
    published: bool,
    reviewed: bool,
    language_id: Option<u64>,
    created_at: Option<chrono::NaiveDateTime>,
    updated_at: Option<chrono::NaiveDateTime>,
}

impl BookBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn id(mut self, id: u64) -> Self {
        self.id = Some(id);
        self
    }

    pub fn grandham_id(mut self, grandham_id: GrandhamId) -> Self {
        self.grandham_id = Some(grandham_id);
        self
    }

    pub fn title(mut self, title: String) -> Self {
        self.title = Some(title);
        self
    }

    pub fn title_original(mut self, title_original: String) -> Self {
        self.title_original = Some(title_original);
        self
    }

    pub fn description(mut self, description: String) -> Self {
        self.description = Some(description);
        self
    }

    pub fn isbn(mut self, isbn: String) -> Self {
        self.isbn = Some(isbn);
        self
    }

    pub fn pages(mut self, pages: i32) -> Self {
        self.pages = Some(pages);
        self
    }

    pub fn year(mut self, year: i32) -> Self {
        self.year = Some(year);
        self
    }

    pub fn approved(mut self, approved: bool) -> Self {
        self.approved = approved;
        self
    }

    pub fn published(mut self, published: bool) -> Self {
        self.published = published;
        self
    }

    pub fn reviewed(mut self, reviewed: bool) -> Self {
        self.reviewed = reviewed;
        self
    }

    pub fn language_id(mut self, language_id: u64) -> Self {
        self.language_id = Some(language_id);
        self
    }

    pub fn created_at(mut self, created_at: chrono::NaiveDateTime) -> Self {
        self.created_at = Some(created_at);
        self
    }

    pub fn updated_at(mut self, updated_at: chrono::NaiveDateTime) -> Self {
        self.updated_at = Some(updated_at);
        self
    }

    /// 도서를 생성한다.
    ///
    /// 제목과 ISBN이 비어 있어도 생성은 되며 저장 전 [`validate::validate_book`]에서 걸러진다.
    pub fn build(self) -> Result<Book, CatalogError> {
        let grandham_id = self.grandham_id.ok_or(CatalogError::RequireArgumentMissing("grandham_id".to_owned()))?;
        let language_id = self.language_id.ok_or(CatalogError::RequireArgumentMissing("language_id".to_owned()))?;

        Ok(Book {
            id: self.id.unwrap_or(0),
            grandham_id,
            title: self.title.unwrap_or_default(),
            title_original: self.title_original,
            description: self.description,
            isbn: self.isbn.unwrap_or_default(),
            pages: self.pages,
            year: self.year,
            approved: self.approved,
            published: self.published,
            reviewed: self.reviewed,
            language_id,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

/// 도서 수정 요청, 값이 있는 항목만 변경 된다.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct BookPatch {
    pub title: Option<String>,
    pub title_original: Option<String>,
    pub description: Option<String>,
    pub isbn: Option<String>,
    pub pages: Option<i32>,
    pub year: Option<i32>,
}

pub type SharedLanguageRepository = Rc<Box<dyn LanguageRepository>>;

/// 언어 저장소
pub trait LanguageRepository {

    fn find_language(&self, id: u64) -> Result<Option<Language>, store::Error>;

    fn create_language(&self, name: &str) -> Result<Language, store::Error>;
}

pub type SharedBookRepository = Rc<Box<dyn BookRepository>>;

/// 도서 저장소
pub trait BookRepository {

    /// 도서를 저장하고 아이디와 생성 시각이 설정된 도서를 반환한다.
    fn create_book(&self, book: &Book) -> Result<Book, store::Error>;

    /// 외부 식별자로 조회 범위 안의 도서를 찾는다.
    fn find_by_grandham_id(&self, grandham_id: &GrandhamId, scope: Scope) -> Result<Option<Book>, store::Error>;

    /// 외부 식별자 목록으로 조회 범위 안의 도서들을 찾는다.
    fn find_by_grandham_ids(&self, grandham_ids: &[GrandhamId], scope: Scope) -> Result<Vec<Book>, store::Error>;

    /// 조회 범위 안의 모든 도서를 아이디 순으로 가져온다.
    fn find_all(&self, scope: Scope) -> Result<Vec<Book>, store::Error>;

    /// 도서의 모든 속성을 저장한다.
    fn update_book(&self, book: &Book) -> Result<usize, store::Error>;

    /// 공개 여부만 바로 변경한다.
    fn update_published(&self, id: u64, published: bool) -> Result<usize, store::Error>;
}

pub type SharedAssociateRepository = Rc<Box<dyn AssociateRepository>>;

/// 저자, 출판사, 도서관 저장소
pub trait AssociateRepository {

    fn create_associate(&self, kind: AssociateKind, name: &str, language_id: Option<u64>) -> Result<Associate, store::Error>;

    /// 도서와 레코드를 연결한다.
    fn link(&self, kind: AssociateKind, book_id: u64, associate_id: u64) -> Result<(), store::Error>;

    /// 도서에 연결된 레코드를 아이디 순으로 가져온다.
    fn find_linked(&self, kind: AssociateKind, book_id: u64) -> Result<Vec<Associate>, store::Error>;

    /// 도서에 연결된 레코드들의 언어를 한번에 변경한다. 레코드 단위의 검증은 하지 않는다.
    fn update_language_of_linked(&self, kind: AssociateKind, book_id: u64, language_id: u64) -> Result<usize, store::Error>;

    /// 같은 종류에서 이름이 같고 아이디가 다른 레코드를 아이디 오름차순으로 하나 찾는다.
    fn find_namesake(&self, kind: AssociateKind, name: &str, exclude_id: u64) -> Result<Option<Associate>, store::Error>;

    /// `from`을 가리키는 도서 연결을 모두 `to`로 옮긴다.
    ///
    /// 이미 `to`와 연결된 도서의 연결은 중복 되지 않도록 제거 된다.
    fn relink(&self, kind: AssociateKind, from: u64, to: u64) -> Result<usize, store::Error>;

    fn delete_associate(&self, kind: AssociateKind, id: u64) -> Result<usize, store::Error>;
}

pub type SharedCoverRepository = Rc<Box<dyn CoverRepository>>;

/// 커버 저장소
pub trait CoverRepository {

    fn count_covers(&self, owner: OwnerKey) -> Result<usize, store::Error>;

    fn find_covers(&self, owner: OwnerKey) -> Result<Vec<Cover>, store::Error>;

    fn create_cover(&self, owner: OwnerKey, image: Option<&str>) -> Result<Cover, store::Error>;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn book() -> Book {
        Book::builder()
            .id(7)
            .grandham_id(GrandhamId::generate())
            .title("The Hobbit".to_owned())
            .isbn("9780261102217".to_owned())
            .year(1937)
            .language_id(1)
            .build()
            .unwrap()
    }

    #[test]
    fn generated_grandham_id_is_sixteen_lowercase_hex() {
        for _ in 0..32 {
            let id = GrandhamId::generate();
            assert_eq!(id.as_str().len(), 16);
            assert!(id.as_str().chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
        }
    }

    #[test]
    fn grandham_id_rejects_wrong_shape() {
        assert!(GrandhamId::try_from("0123456789abcdef").is_ok());
        assert!(GrandhamId::try_from("0123456789ABCDEF").is_err());
        assert!(GrandhamId::try_from("0123456789abcde").is_err());
        assert!(GrandhamId::try_from("0123456789abcdefg").is_err());
    }

    #[test]
    fn build_requires_grandham_id_and_language() {
        let missing_id = Book::builder().language_id(1).build();
        assert_eq!(missing_id, Err(CatalogError::RequireArgumentMissing("grandham_id".to_owned())));

        let missing_language = Book::builder().grandham_id(GrandhamId::generate()).build();
        assert_eq!(missing_language, Err(CatalogError::RequireArgumentMissing("language_id".to_owned())));
    }

    #[test]
    fn details_strips_administrative_keys() {
        let details = book().details().unwrap();

        for key in RESTRICTED_DETAIL_KEYS {
            assert!(!details.contains_key(key), "{} must not be exposed", key);
        }
        assert_eq!(details.get("title"), Some(&serde_json::Value::from("The Hobbit")));
        assert_eq!(details.get("isbn"), Some(&serde_json::Value::from("9780261102217")));
        assert_eq!(details.get("year"), Some(&serde_json::Value::from(1937)));
        assert!(details.contains_key("pages"));
        assert!(details.contains_key("description"));
    }

    #[test]
    fn visible_scope_requires_approved_and_published() {
        let mut book = book();
        assert!(!Scope::Visible.admits(&book));

        book.approve();
        assert!(!Scope::Visible.admits(&book));
        assert!(Scope::Approved.admits(&book));

        book.set_published(true);
        assert!(Scope::Visible.admits(&book));
        assert!(Scope::NotReviewed.admits(&book));
        assert!(Scope::Unfiltered.admits(&book));
    }

    #[test]
    fn apply_changes_only_given_fields() {
        let mut book = book();
        book.apply(&BookPatch { title: Some("There and Back Again".to_owned()), pages: Some(310), ..Default::default() });

        assert_eq!(book.title(), "There and Back Again");
        assert_eq!(book.pages(), Some(310));
        assert_eq!(book.isbn(), "9780261102217");
        assert_eq!(book.year(), Some(1937));
    }

    #[test]
    fn owner_kind_round_trips_through_code() {
        for kind in [OwnerKind::Book, OwnerKind::Author, OwnerKind::Publisher, OwnerKind::Library] {
            assert_eq!(OwnerKind::try_from(kind.to_code_str()), Ok(kind));
        }
        assert_eq!(OwnerKind::try_from("User"), Err(CatalogError::UnknownCode("User".to_owned())));
    }
}
