use diesel::r2d2::ConnectionManager;
use diesel::PgConnection;
use r2d2::Pool;
use serde::Deserialize;
use std::env;
use std::fmt;
use std::fmt::{Display, Formatter};

pub mod logging;

/// 설정 로드 중 발생하는 에러
#[derive(Debug)]
pub enum ConfigError {
    /// 설정 파일 혹은 환경 변수를 읽지 못함
    Load(config::ConfigError),

    /// 로깅 설정이 잘못 됨
    Logging(String),

    /// 커넥션 풀 생성 실패
    Pool(String),
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Load(err) => write!(f, "Cannot load config, {}", err),
            ConfigError::Logging(message) => write!(f, "Invalid logger config, {}", message),
            ConfigError::Pool(message) => write!(f, "Cannot build connection pool, {}", message),
        }
    }
}

impl std::error::Error for ConfigError {}

impl From<config::ConfigError> for ConfigError {
    fn from(value: config::ConfigError) -> Self {
        ConfigError::Load(value)
    }
}

#[derive(Debug, Deserialize)]
pub struct DatabaseConfig {
    url: String,

    /// 커넥션 풀의 최대 커넥션 수로 설정하지 않을시 r2d2 기본값(10)을 사용한다.
    max_size: Option<u32>,
}

impl DatabaseConfig {
    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn max_size(&self) -> Option<u32> {
        self.max_size
    }
}

#[derive(Debug, Deserialize)]
pub struct AppConfig {
    database: DatabaseConfig,
    logger: Option<logging::Config>,
}

impl AppConfig {
    pub fn database(&self) -> &DatabaseConfig {
        &self.database
    }

    pub fn logger(&self) -> Option<&logging::Config> {
        self.logger.as_ref()
    }
}

/// 실행 환경에 따라 .env 파일을 로드한다.
pub fn load_dotenv() {
    let env_filename = env::var("RUN_MODE")
        .map(|env| format!(".env.{}", env))
        .unwrap_or_else(|_| ".env".into());

    dotenvy::from_filename(env_filename).ok();
}

/// 설정을 로드한다.
///
/// `config/{RUN_MODE}.json` 파일(없어도 됨), `GRANDHAM__` 로 시작하는 환경 변수 순으로 적용 되며
/// `database.url`이 설정 되지 않은 경우 `DATABASE_URL` 환경 변수를 사용한다.
pub fn load_config() -> Result<AppConfig, ConfigError> {
    let run_mode = env::var("RUN_MODE").unwrap_or_else(|_| "development".into());

    let mut builder = config::Config::builder();
    if let Ok(database_url) = env::var("DATABASE_URL") {
        builder = builder.set_default("database.url", database_url)?;
    }

    let config = builder
        .add_source(config::File::with_name(&format!("config/{}.json", run_mode)).required(false))
        .add_source(
            config::Environment::with_prefix("GRANDHAM")
                .prefix_separator("__")
                .separator("__")
                .try_parsing(true)
        )
        .build()?;

    Ok(config.try_deserialize()?)
}

/// 데이터베이스 연결 풀을 생성한다.
pub fn connect_to_postgres(database: &DatabaseConfig) -> Result<Pool<ConnectionManager<PgConnection>>, ConfigError> {
    let manager = ConnectionManager::<PgConnection>::new(database.url());

    let mut builder = Pool::builder().test_on_check_out(true);
    if let Some(max_size) = database.max_size() {
        builder = builder.max_size(max_size);
    }
    builder.build(manager).map_err(|e| ConfigError::Pool(e.to_string()))
}
