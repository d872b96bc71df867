pub mod diesel;
pub mod memory;

use std::fmt;
use std::fmt::{Display, Formatter};

/// 저장소 계층에서 발생하는 에러
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// 커넥션 풀에서 연결을 얻지 못함
    ConnectError(String),

    /// 쿼리 실행 실패
    SqlExecuteError(String),

    /// 저장된 값을 도메인 타입으로 변환하지 못함
    ConvertError(String),
}

impl Display for Error {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Error::ConnectError(message) => write!(f, "Connect failed, {}", message),
            Error::SqlExecuteError(message) => write!(f, "SQL execute failed, {}", message),
            Error::ConvertError(message) => write!(f, "Convert failed, {}", message),
        }
    }
}

impl std::error::Error for Error {}
