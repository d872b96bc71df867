use crate::catalog::pipeline::{AfterCreate, Created};
use crate::catalog::{Book, CatalogError, GrandhamId};
use crate::store;
use regex::Regex;
use std::collections::HashSet;
use std::rc::Rc;
use std::sync::LazyLock;
use tracing::debug;

static WORD: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\w+").expect("word pattern must compile"));

/// 문자열을 소문자 단어 목록으로 나눈다.
///
/// # Example
/// ```
/// use grandham_catalog::search::tokenize;
///
/// assert_eq!(tokenize("The Lord of the Rings: Two Towers"), vec!["the", "lord", "of", "the", "rings", "two", "towers"]);
/// assert!(tokenize(" -- ").is_empty());
/// ```
pub fn tokenize(text: &str) -> Vec<String> {
    WORD.find_iter(text)
        .map(|m| m.as_str().to_lowercase())
        .collect()
}

/// 검색 색인에 저장되는 도서 문서
///
/// 제목, 설명, 원제는 텍스트로, 승인 여부는 필터로 색인 된다.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchDocument {
    grandham_id: GrandhamId,
    title: String,
    description: Option<String>,
    title_original: Option<String>,
    approved: bool,
}

impl SearchDocument {
    pub fn new(
        grandham_id: GrandhamId,
        title: String,
        description: Option<String>,
        title_original: Option<String>,
        approved: bool,
    ) -> Self {
        Self { grandham_id, title, description, title_original, approved }
    }

    pub fn grandham_id(&self) -> &GrandhamId {
        &self.grandham_id
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    pub fn title_original(&self) -> Option<&str> {
        self.title_original.as_deref()
    }

    pub fn approved(&self) -> bool {
        self.approved
    }

    /// 질의어의 모든 단어가 문서의 텍스트 항목 중 어딘가에 있으면 `true`
    pub fn matches(&self, query_tokens: &[String]) -> bool {
        if query_tokens.is_empty() {
            return false;
        }

        let mut tokens: HashSet<String> = tokenize(&self.title).into_iter().collect();
        for text in [&self.description, &self.title_original].into_iter().flatten() {
            tokens.extend(tokenize(text));
        }
        query_tokens.iter().all(|t| tokens.contains(t))
    }
}

impl From<&Book> for SearchDocument {
    fn from(book: &Book) -> Self {
        Self {
            grandham_id: book.grandham_id().clone(),
            title: book.title().to_owned(),
            description: book.description().map(str::to_owned),
            title_original: book.title_original().map(str::to_owned),
            approved: book.approved(),
        }
    }
}

pub type SharedSearchIndex = Rc<Box<dyn SearchIndex>>;

/// 도서 검색 색인
pub trait SearchIndex {

    /// 문서를 색인에 추가하거나 같은 외부 식별자의 문서를 교체한다.
    fn index(&self, document: &SearchDocument) -> Result<(), store::Error>;

    /// 질의어와 일치하는 문서의 외부 식별자를 찾는다.
    fn search(&self, query: &str, approved_only: bool) -> Result<Vec<GrandhamId>, store::Error>;
}

/// 새로 생성된 도서를 검색 색인에 추가한다.
pub struct IndexBook {
    index: SharedSearchIndex,
}

impl IndexBook {
    pub fn new(index: SharedSearchIndex) -> Self {
        Self { index }
    }
}

impl AfterCreate for IndexBook {
    fn name(&self) -> &'static str {
        "index_book"
    }

    fn after_create(&self, created: &Created) -> Result<(), CatalogError> {
        self.index.index(&SearchDocument::from(created.book))?;
        debug!("검색 색인 추가 (grandham_id: {})", created.book.grandham_id());
        Ok(())
    }
}
