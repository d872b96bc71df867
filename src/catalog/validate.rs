use crate::catalog::{Book, CatalogError, ValidationError};
use std::ops::RangeInclusive;

/// 도서 출판 연도로 허용되는 범위
pub const YEAR_RANGE: RangeInclusive<i32> = 1500..=2199;

/// 도서를 저장하기 전에 유효성을 검사한다.
///
/// 실패한 항목을 모두 모아 [`CatalogError::Invalid`]로 반환한다.
///
/// # Example
/// ```
/// use grandham_catalog::catalog::{Book, GrandhamId};
/// use grandham_catalog::catalog::validate::validate_book;
///
/// let book = Book::builder()
///     .grandham_id(GrandhamId::generate())
///     .title("Dune".to_owned())
///     .isbn("9780441013593".to_owned())
///     .year(2199)
///     .language_id(1)
///     .build()
///     .unwrap();
/// assert!(validate_book(&book).is_ok());
/// ```
pub fn validate_book(book: &Book) -> Result<(), CatalogError> {
    let mut errors = Vec::new();

    if book.title().trim().is_empty() {
        errors.push(ValidationError::new("title", "can't be blank"));
    }

    if book.isbn().trim().is_empty() {
        errors.push(ValidationError::new("isbn", "can't be blank"));
    }

    match book.year() {
        None => errors.push(ValidationError::new("year", "is not a number")),
        Some(year) if !YEAR_RANGE.contains(&year) => {
            errors.push(ValidationError::new("year", "must be between 1500 and 2199"))
        }
        Some(_) => {}
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(CatalogError::Invalid(errors))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::GrandhamId;

    fn book_with_year(year: Option<i32>) -> Book {
        let mut builder = Book::builder()
            .grandham_id(GrandhamId::generate())
            .title("Dune".to_owned())
            .isbn("9780441013593".to_owned())
            .language_id(1);
        if let Some(year) = year {
            builder = builder.year(year);
        }
        builder.build().unwrap()
    }

    fn fields(result: Result<(), CatalogError>) -> Vec<&'static str> {
        match result {
            Err(CatalogError::Invalid(errors)) => errors.iter().map(|e| e.field()).collect(),
            Err(other) => panic!("unexpected error {:?}", other),
            Ok(()) => vec![],
        }
    }

    #[test]
    fn year_bounds_are_inclusive() {
        assert!(validate_book(&book_with_year(Some(1500))).is_ok());
        assert!(validate_book(&book_with_year(Some(2199))).is_ok());
        assert_eq!(fields(validate_book(&book_with_year(Some(1499)))), vec!["year"]);
        assert_eq!(fields(validate_book(&book_with_year(Some(2200)))), vec!["year"]);
    }

    #[test]
    fn year_is_required() {
        assert_eq!(fields(validate_book(&book_with_year(None))), vec!["year"]);
    }

    #[test]
    fn blank_title_and_isbn_are_collected_together() {
        let book = Book::builder()
            .grandham_id(GrandhamId::generate())
            .title("   ".to_owned())
            .year(2001)
            .language_id(1)
            .build()
            .unwrap();

        assert_eq!(fields(validate_book(&book)), vec!["title", "isbn"]);
    }
}
