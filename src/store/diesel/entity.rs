use crate::audit::{AuditKind, AuditRecord};
use crate::catalog::{Book, Cover, GrandhamId, Language, OwnerKey, OwnerKind};
use crate::search::SearchDocument;
use crate::store::diesel::schema;
use crate::store::Error;
use crate::user::{NewUser, Role, User};
use chrono::NaiveDateTime;
use diesel::{AsChangeset, Identifiable, Insertable, Queryable, Selectable};

#[derive(Queryable, Selectable, Identifiable, Debug, PartialEq)]
#[diesel(table_name = schema::languages)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct LanguageEntity {
    pub id: i64,
    pub name: String,
}

impl LanguageEntity {
    pub fn to_domain(&self) -> Language {
        Language::new(self.id as u64, self.name.clone())
    }
}

#[derive(Insertable)]
#[diesel(table_name = schema::languages)]
pub struct NewLanguageEntity<'a> {
    pub name: &'a str,
}

/// 도서 모델
#[derive(Queryable, Selectable, Identifiable, Debug, PartialEq)]
#[diesel(table_name = schema::books)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct BookEntity {
    pub id: i64,
    pub grandham_id: String,
    pub title: String,
    pub title_original: Option<String>,
    pub description: Option<String>,
    pub isbn: String,
    pub pages: Option<i32>,
    pub year: Option<i32>,
    pub approved: bool,
    pub published: bool,
    pub reviewed: bool,
    pub language_id: i64,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

impl BookEntity {
    pub fn to_domain(&self) -> Result<Book, Error> {
        let grandham_id = GrandhamId::try_from(self.grandham_id.as_str())
            .map_err(|e| Error::ConvertError(e.to_string()))?;

        let mut builder = Book::builder()
            .id(self.id as u64)
            .grandham_id(grandham_id)
            .title(self.title.clone())
            .isbn(self.isbn.clone())
            .approved(self.approved)
            .published(self.published)
            .reviewed(self.reviewed)
            .language_id(self.language_id as u64)
            .created_at(self.created_at)
            .updated_at(self.updated_at);

        if let Some(title_original) = &self.title_original {
            builder = builder.title_original(title_original.clone());
        }
        if let Some(description) = &self.description {
            builder = builder.description(description.clone());
        }
        if let Some(pages) = self.pages {
            builder = builder.pages(pages);
        }
        if let Some(year) = self.year {
            builder = builder.year(year);
        }
        builder.build().map_err(|e| Error::ConvertError(e.to_string()))
    }
}

#[derive(Insertable, Debug, PartialEq)]
#[diesel(table_name = schema::books)]
pub struct NewBookEntity<'a> {
    pub grandham_id: &'a str,
    pub title: &'a str,
    pub title_original: Option<&'a str>,
    pub description: Option<&'a str>,
    pub isbn: &'a str,
    pub pages: Option<i32>,
    pub year: Option<i32>,
    pub approved: bool,
    pub published: bool,
    pub reviewed: bool,
    pub language_id: i64,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

impl <'a> NewBookEntity<'a> {

    pub fn new(book: &'a Book) -> Self {
        let now = chrono::Local::now().naive_local();
        Self {
            grandham_id: book.grandham_id().as_str(),
            title: book.title(),
            title_original: book.title_original(),
            description: book.description(),
            isbn: book.isbn(),
            pages: book.pages(),
            year: book.year(),
            approved: book.approved(),
            published: book.published(),
            reviewed: book.reviewed(),
            language_id: book.language_id() as i64,
            created_at: now,
            updated_at: now,
        }
    }
}

/// 도서 전체 저장시 사용하는 변경 셋
///
/// 외부 식별자와 생성 시각은 변경 되지 않는다.
#[derive(AsChangeset)]
#[diesel(table_name = schema::books)]
#[diesel(treat_none_as_null = true)]
pub struct BookForm<'a> {
    pub title: &'a str,
    pub title_original: Option<&'a str>,
    pub description: Option<&'a str>,
    pub isbn: &'a str,
    pub pages: Option<i32>,
    pub year: Option<i32>,
    pub approved: bool,
    pub published: bool,
    pub reviewed: bool,
    pub language_id: i64,
    pub updated_at: NaiveDateTime,
}

impl <'a> BookForm<'a> {

    pub fn new(book: &'a Book) -> Self {
        Self {
            title: book.title(),
            title_original: book.title_original(),
            description: book.description(),
            isbn: book.isbn(),
            pages: book.pages(),
            year: book.year(),
            approved: book.approved(),
            published: book.published(),
            reviewed: book.reviewed(),
            language_id: book.language_id() as i64,
            updated_at: chrono::Local::now().naive_local(),
        }
    }
}

#[derive(Queryable, Selectable, Identifiable, Debug, PartialEq)]
#[diesel(table_name = schema::covers)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct CoverEntity {
    pub id: i64,
    pub owner_type: String,
    pub owner_id: i64,
    pub image: Option<String>,
    pub created_at: NaiveDateTime,
}

impl CoverEntity {
    pub fn to_domain(&self) -> Result<Cover, Error> {
        let owner = owner_key(&self.owner_type, self.owner_id)?;
        Ok(Cover::new(self.id as u64, owner, self.image.clone(), Some(self.created_at)))
    }
}

#[derive(Insertable)]
#[diesel(table_name = schema::covers)]
pub struct NewCoverEntity<'a> {
    pub owner_type: &'static str,
    pub owner_id: i64,
    pub image: Option<&'a str>,
    pub created_at: NaiveDateTime,
}

#[derive(Queryable, Selectable, Identifiable, Debug, PartialEq)]
#[diesel(table_name = schema::audit_records)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct AuditRecordEntity {
    pub id: i64,
    pub kind: String,
    pub user_id: i64,
    pub target_type: String,
    pub target_id: i64,
    pub created_at: NaiveDateTime,
}

impl AuditRecordEntity {
    pub fn to_domain(&self) -> Result<AuditRecord, Error> {
        let kind = match self.kind.as_str() {
            "NewItem" => AuditKind::NewItem,
            "Edit" => AuditKind::Edit,
            other => return Err(Error::ConvertError(format!("unknown audit kind {}", other))),
        };
        let target = owner_key(&self.target_type, self.target_id)?;
        Ok(AuditRecord::new(self.id as u64, kind, self.user_id as u64, target, Some(self.created_at)))
    }
}

#[derive(Insertable)]
#[diesel(table_name = schema::audit_records)]
pub struct NewAuditRecordEntity {
    pub kind: String,
    pub user_id: i64,
    pub target_type: &'static str,
    pub target_id: i64,
    pub created_at: NaiveDateTime,
}

#[derive(Queryable, Selectable, Identifiable, Debug, PartialEq)]
#[diesel(table_name = schema::users)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct UserEntity {
    pub id: i64,
    pub login: String,
    pub email: Option<String>,
    pub role: Option<String>,
    pub language_id: Option<i64>,
    pub publisher_id: Option<i64>,
    pub library_id: Option<i64>,
    pub created_at: NaiveDateTime,
}

impl UserEntity {
    pub fn to_domain(&self) -> Result<User, Error> {
        let role = self.role.as_deref()
            .map(|r| r.parse::<Role>())
            .transpose()
            .map_err(|e| Error::ConvertError(e.to_string()))?;

        Ok(User::new(self.id as u64, self.login.clone(), self.email.clone(), role)
            .with_references(
                self.language_id.map(|id| id as u64),
                self.publisher_id.map(|id| id as u64),
                self.library_id.map(|id| id as u64),
            )
            .with_created_at(self.created_at))
    }
}

#[derive(Insertable)]
#[diesel(table_name = schema::users)]
pub struct NewUserEntity<'a> {
    pub login: &'a str,
    pub email: Option<&'a str>,
    pub role: Option<&'static str>,
    pub language_id: Option<i64>,
    pub publisher_id: Option<i64>,
    pub library_id: Option<i64>,
    pub created_at: NaiveDateTime,
}

impl <'a> NewUserEntity<'a> {

    pub fn new(user: &'a NewUser) -> Self {
        Self {
            login: &user.login,
            email: user.email.as_deref(),
            role: user.role.map(|r| r.to_code_str()),
            language_id: user.language_id.map(|id| id as i64),
            publisher_id: user.publisher_id.map(|id| id as i64),
            library_id: user.library_id.map(|id| id as i64),
            created_at: chrono::Local::now().naive_local(),
        }
    }
}

#[derive(Insertable, AsChangeset)]
#[diesel(table_name = schema::book_search_documents)]
#[diesel(treat_none_as_null = true)]
pub struct SearchDocumentEntity<'a> {
    pub grandham_id: &'a str,
    pub title: &'a str,
    pub description: Option<&'a str>,
    pub title_original: Option<&'a str>,
    pub approved: bool,
}

impl <'a> SearchDocumentEntity<'a> {

    pub fn new(document: &'a SearchDocument) -> Self {
        Self {
            grandham_id: document.grandham_id().as_str(),
            title: document.title(),
            description: document.description(),
            title_original: document.title_original(),
            approved: document.approved(),
        }
    }
}

fn owner_key(owner_type: &str, owner_id: i64) -> Result<OwnerKey, Error> {
    let kind = OwnerKind::try_from(owner_type)
        .map_err(|e| Error::ConvertError(e.to_string()))?;
    Ok(OwnerKey::new(kind, owner_id as u64))
}
