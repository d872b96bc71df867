use crate::catalog::validate::validate_book;
use crate::catalog::{Book, CatalogError, GrandhamId, ValidationError};
use serde::{Deserialize, Deserializer};
use serde_json::Value;

/// 입력 폼에서 받은 숫자 값
///
/// 숫자가 아닌 값도 역직렬화 단계에서는 받아 두고 유효성 검증 단계에서 에러로 보고한다.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FormNumber {
    Integer(i32),
    Blank,
    Malformed(String),
}

impl<'de> Deserialize<'de> for FormNumber {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>
    {
        let value = Value::deserialize(deserializer)?;
        let number = match &value {
            Value::Number(n) => n.as_i64()
                .and_then(|n| i32::try_from(n).ok())
                .map(FormNumber::Integer)
                .unwrap_or_else(|| FormNumber::Malformed(n.to_string())),
            Value::String(s) if s.trim().is_empty() => FormNumber::Blank,
            Value::String(s) => s.trim().parse::<i32>()
                .map(FormNumber::Integer)
                .unwrap_or_else(|_| FormNumber::Malformed(s.clone())),
            _ => FormNumber::Malformed(value.to_string()),
        };
        Ok(number)
    }
}

/// 도서와 함께 생성할 저자, 출판사, 도서관
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct AssociateDraft {
    pub name: String,
}

/// 도서와 함께 생성할 커버
#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize)]
pub struct CoverDraft {
    pub image: Option<String>,
}

/// 도서 생성 요청
///
/// # Example
/// ```
/// use grandham_catalog::catalog::draft::BookDraft;
///
/// let draft = BookDraft::from_json(r#"{
///     "title": "Dune",
///     "isbn": "9780441013593",
///     "year": "1965",
///     "language_id": 1,
///     "authors": [{ "name": "Frank Herbert" }]
/// }"#).unwrap();
///
/// assert_eq!(draft.authors.len(), 1);
/// assert!(draft.covers.is_empty());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct BookDraft {
    pub title: Option<String>,
    pub title_original: Option<String>,
    pub description: Option<String>,
    pub isbn: Option<String>,
    pub pages: Option<FormNumber>,
    pub year: Option<FormNumber>,
    pub language_id: u64,

    #[serde(default)]
    pub authors: Vec<AssociateDraft>,
    #[serde(default)]
    pub publishers: Vec<AssociateDraft>,
    #[serde(default)]
    pub libraries: Vec<AssociateDraft>,
    #[serde(default)]
    pub covers: Vec<CoverDraft>,
}

impl BookDraft {
    pub fn new(language_id: u64) -> Self {
        Self {
            title: None,
            title_original: None,
            description: None,
            isbn: None,
            pages: None,
            year: None,
            language_id,
            authors: Vec::new(),
            publishers: Vec::new(),
            libraries: Vec::new(),
            covers: Vec::new(),
        }
    }

    pub fn from_json(json: &str) -> Result<Self, CatalogError> {
        serde_json::from_str(json)
            .map_err(|e| CatalogError::InvalidArgument(format!("Invalid book draft: {}", e)))
    }

    /// 요청 값으로 저장 전의 도서를 만들고 유효성 검증을 한다.
    pub fn to_book(&self, grandham_id: GrandhamId) -> Result<Book, CatalogError> {
        let mut errors = Vec::new();
        let mut builder = Book::builder()
            .grandham_id(grandham_id)
            .language_id(self.language_id)
            .title(self.title.clone().unwrap_or_default())
            .isbn(self.isbn.clone().unwrap_or_default());

        if let Some(title_original) = &self.title_original {
            builder = builder.title_original(title_original.clone());
        }
        if let Some(description) = &self.description {
            builder = builder.description(description.clone());
        }

        match &self.pages {
            Some(FormNumber::Integer(pages)) => builder = builder.pages(*pages),
            Some(FormNumber::Malformed(_)) => errors.push(ValidationError::new("pages", "is not a number")),
            Some(FormNumber::Blank) | None => {}
        }

        // 숫자가 아닌 연도는 값이 없는 것과 같이 validate_book에서 보고 된다.
        if let Some(FormNumber::Integer(year)) = &self.year {
            builder = builder.year(*year);
        }

        let book = builder.build()?;
        match validate_book(&book) {
            Ok(()) => {}
            Err(CatalogError::Invalid(mut rest)) => errors.append(&mut rest),
            Err(e) => return Err(e),
        }

        if errors.is_empty() {
            Ok(book)
        } else {
            Err(CatalogError::Invalid(errors))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn invalid_fields(result: Result<Book, CatalogError>) -> Vec<&'static str> {
        match result {
            Err(CatalogError::Invalid(errors)) => errors.iter().map(|e| e.field()).collect(),
            other => panic!("expected validation error, got {:?}", other),
        }
    }

    #[test]
    fn form_numbers_accept_integers_and_integer_strings() {
        let draft = BookDraft::from_json(r#"{"pages": 320, "year": " 1965 ", "language_id": 1}"#).unwrap();

        assert_eq!(draft.pages, Some(FormNumber::Integer(320)));
        assert_eq!(draft.year, Some(FormNumber::Integer(1965)));
    }

    #[test]
    fn non_integer_pages_are_rejected() {
        let draft = BookDraft::from_json(
            r#"{"title": "Dune", "isbn": "9780441013593", "year": 1965, "pages": 12.5, "language_id": 1}"#
        ).unwrap();
        assert_eq!(invalid_fields(draft.to_book(GrandhamId::generate())), vec!["pages"]);

        let draft = BookDraft::from_json(
            r#"{"title": "Dune", "isbn": "9780441013593", "year": 1965, "pages": "many", "language_id": 1}"#
        ).unwrap();
        assert_eq!(invalid_fields(draft.to_book(GrandhamId::generate())), vec!["pages"]);
    }

    #[test]
    fn blank_pages_are_allowed() {
        let draft = BookDraft::from_json(
            r#"{"title": "Dune", "isbn": "9780441013593", "year": 1965, "pages": "", "language_id": 1}"#
        ).unwrap();

        let book = draft.to_book(GrandhamId::generate()).unwrap();
        assert_eq!(book.pages(), None);
    }

    #[test]
    fn missing_required_fields_are_reported_together() {
        let draft = BookDraft::from_json(r#"{"year": "soon", "language_id": 1}"#).unwrap();

        assert_eq!(invalid_fields(draft.to_book(GrandhamId::generate())), vec!["title", "isbn", "year"]);
    }

    #[test]
    fn language_is_required_in_json() {
        let result = BookDraft::from_json(r#"{"title": "Dune"}"#);

        assert!(matches!(result, Err(CatalogError::InvalidArgument(_))));
    }
}
