use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
/// Локальные ошибки `scheduler-client`.
///
/// Ответы сервера и сетевые сбои сюда не попадают: они нормализуются в
/// [`Outcome`](crate::Outcome) и оседают в состоянии хранилищ.
pub enum SchedulerClientError {
    /// Не удалось собрать HTTP-клиент (`reqwest`).
    #[error("failed to build http client: {0}")]
    ClientBuild(#[from] reqwest::Error),

    /// Ошибка чтения/записи токена в постоянном хранилище.
    #[error("token storage error at {path}: {source}")]
    Storage {
        /// Путь к файлу хранилища.
        path: PathBuf,
        /// Исходная ошибка ввода-вывода.
        #[source]
        source: std::io::Error,
    },

    /// Не удалось прочитать файл для загрузки.
    #[error("failed to read upload {path}: {source}")]
    Upload {
        /// Путь к файлу.
        path: PathBuf,
        /// Исходная ошибка ввода-вывода.
        #[source]
        source: std::io::Error,
    },

    /// Полезная нагрузка не сериализуется в JSON-объект.
    #[error("invalid payload: {0}")]
    InvalidPayload(String),
}

/// Результат локальных операций `scheduler-client`.
pub type SchedulerClientResult<T> = Result<T, SchedulerClientError>;

impl From<serde_json::Error> for SchedulerClientError {
    fn from(err: serde_json::Error) -> Self {
        Self::InvalidPayload(err.to_string())
    }
}
