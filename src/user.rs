use crate::catalog::Language;
use crate::store;
use serde::Deserialize;
use serde_with::{serde_as, DisplayFromStr};
use std::fmt;
use std::fmt::{Display, Formatter};
use std::rc::Rc;
use std::str::FromStr;
use tracing::info;

/// 사용자 모듈에서 사용할 에러 열거
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UserError {
    /// 필수 데이터가 입력 되지 않음
    RequireArgumentMissing(String),

    /// 이미 사용중인 값
    AlreadyTaken(String),

    /// 형식이 잘못된 입력
    InvalidArgument(String),

    /// 알 수 없는 열거형 코드
    UnknownCode(String),

    NotFound(String),

    Store(store::Error),
}

impl Display for UserError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

impl std::error::Error for UserError {}

impl From<store::Error> for UserError {
    fn from(value: store::Error) -> Self {
        UserError::Store(value)
    }
}

/// 사용자 역할
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash)]
pub enum Role {
    SuperAdmin,
    Admin,
    Contributor,
    Publisher,
    Librarian,
}

impl Role {
    pub const ALL: [Role; 5] = [Role::SuperAdmin, Role::Admin, Role::Contributor, Role::Publisher, Role::Librarian];

    /// 역할 없이 가입한 사용자에게 부여되는 역할
    pub const DEFAULT: Role = Role::Contributor;

    pub fn to_code_str(&self) -> &'static str {
        match self {
            Role::SuperAdmin => "super_admin",
            Role::Admin => "admin",
            Role::Contributor => "contributor",
            Role::Publisher => "publisher",
            Role::Librarian => "librarian",
        }
    }

    pub fn is_admin(&self) -> bool {
        match self {
            Role::SuperAdmin | Role::Admin => true,
            Role::Contributor | Role::Publisher | Role::Librarian => false,
        }
    }
}

impl FromStr for Role {
    type Err = UserError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "super_admin" => Ok(Role::SuperAdmin),
            "admin" => Ok(Role::Admin),
            "contributor" => Ok(Role::Contributor),
            "publisher" => Ok(Role::Publisher),
            "librarian" => Ok(Role::Librarian),
            _ => Err(UserError::UnknownCode(s.to_owned())),
        }
    }
}

impl Display for Role {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_code_str())
    }
}

/// 사용자
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    id: u64,
    login: String,
    email: Option<String>,
    role: Option<Role>,
    language_id: Option<u64>,
    publisher_id: Option<u64>,
    library_id: Option<u64>,
    created_at: Option<chrono::NaiveDateTime>,
}

impl User {
    pub fn new(id: u64, login: String, email: Option<String>, role: Option<Role>) -> Self {
        Self {
            id,
            login,
            email,
            role,
            language_id: None,
            publisher_id: None,
            library_id: None,
            created_at: None,
        }
    }

    pub fn with_references(mut self, language_id: Option<u64>, publisher_id: Option<u64>, library_id: Option<u64>) -> Self {
        self.language_id = language_id;
        self.publisher_id = publisher_id;
        self.library_id = library_id;
        self
    }

    pub fn with_created_at(mut self, created_at: chrono::NaiveDateTime) -> Self {
        self.created_at = Some(created_at);
        self
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn login(&self) -> &str {
        &self.login
    }

    pub fn email(&self) -> Option<&str> {
        self.email.as_deref()
    }

    pub fn role(&self) -> Option<Role> {
        self.role
    }

    pub fn language_id(&self) -> Option<u64> {
        self.language_id
    }

    pub fn publisher_id(&self) -> Option<u64> {
        self.publisher_id
    }

    pub fn library_id(&self) -> Option<u64> {
        self.library_id
    }

    pub fn created_at(&self) -> Option<chrono::NaiveDateTime> {
        self.created_at
    }

    pub fn has_role(&self, role: Role) -> bool {
        self.role == Some(role)
    }

    /// 최고 관리자 또는 관리자이면 `true`
    pub fn is_an_admin(&self) -> bool {
        self.role.is_some_and(|r| r.is_admin())
    }
}

/// 가입 요청
#[serde_as]
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct NewUser {
    pub login: String,
    pub email: Option<String>,

    #[serde_as(as = "Option<DisplayFromStr>")]
    pub role: Option<Role>,

    pub language_id: Option<u64>,
    pub publisher_id: Option<u64>,
    pub library_id: Option<u64>,
}

impl NewUser {
    pub fn new(login: &str) -> Self {
        Self {
            login: login.to_owned(),
            email: None,
            role: None,
            language_id: None,
            publisher_id: None,
            library_id: None,
        }
    }

    pub fn from_json(json: &str) -> Result<Self, UserError> {
        serde_json::from_str(json).map_err(|e| UserError::InvalidArgument(e.to_string()))
    }
}

pub type SharedUserRepository = Rc<Box<dyn UserRepository>>;

/// 사용자 저장소
pub trait UserRepository {

    fn create_user(&self, user: &NewUser) -> Result<User, store::Error>;

    fn find_user(&self, id: u64) -> Result<Option<User>, store::Error>;

    fn find_by_login(&self, login: &str) -> Result<Option<User>, store::Error>;

    fn update_role(&self, id: u64, role: Role) -> Result<usize, store::Error>;

    /// 역할과 언어를 함께 저장한다.
    fn update_role_and_language(&self, id: u64, role: Role, language_id: u64) -> Result<usize, store::Error>;
}

/// 사용자 가입, 역할 관리
pub struct UserService {
    users: SharedUserRepository,
}

impl UserService {
    pub fn new(users: SharedUserRepository) -> Self {
        Self { users }
    }

    /// 사용자를 가입 시킨다.
    ///
    /// 로그인은 필수이며 중복 될 수 없다. 역할 없이 가입한 경우 저장 이후 [`Role::DEFAULT`]로 설정된다.
    pub fn register(&self, new_user: &NewUser) -> Result<User, UserError> {
        if new_user.login.trim().is_empty() {
            return Err(UserError::RequireArgumentMissing("login".to_owned()));
        }
        if self.users.find_by_login(&new_user.login)?.is_some() {
            return Err(UserError::AlreadyTaken(format!("login {}", new_user.login)));
        }

        let mut user = self.users.create_user(new_user)?;
        if user.role.is_none() {
            self.users.update_role(user.id, Role::DEFAULT)?;
            user.role = Some(Role::DEFAULT);
        }

        info!("사용자 가입 완료 (login: {}, role: {:?})", user.login, user.role);
        Ok(user)
    }

    pub fn find(&self, id: u64) -> Result<User, UserError> {
        self.users.find_user(id)?
            .ok_or_else(|| UserError::NotFound(format!("user {}", id)))
    }

    /// 사용자를 최고 관리자로 지정하고 언어를 설정한다.
    pub fn set_as_super_admin(&self, id: u64, language: &Language) -> Result<User, UserError> {
        let mut user = self.find(id)?;
        self.users.update_role_and_language(id, Role::SuperAdmin, language.id())?;

        user.role = Some(Role::SuperAdmin);
        user.language_id = Some(language.id());
        Ok(user)
    }
}
