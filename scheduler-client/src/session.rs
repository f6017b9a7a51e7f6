//! Сессия пользователя: bearer-токен, его постоянное хранилище и текущий
//! пользователь.

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};

use crate::error::{SchedulerClientError, SchedulerClientResult};
use crate::models::User;

fn parse_token(raw: &str) -> Option<String> {
    let token = raw.trim().to_string();
    if token.is_empty() {
        return None;
    }
    Some(token)
}

/// Постоянное хранилище токена между запусками.
pub trait TokenStorage: Send + Sync {
    /// Читает сохранённый токен. Пустое содержимое читается как `None`.
    fn load(&self) -> SchedulerClientResult<Option<String>>;
    /// Сохраняет токен.
    fn save(&self, token: &str) -> SchedulerClientResult<()>;
    /// Удаляет токен. Отсутствие токена не ошибка.
    fn clear(&self) -> SchedulerClientResult<()>;
}

#[derive(Debug, Default)]
/// Хранилище в памяти процесса.
pub struct MemoryTokenStorage {
    token: Mutex<Option<String>>,
}

impl MemoryTokenStorage {
    /// Пустое хранилище.
    pub fn new() -> Self {
        Self::default()
    }

    /// Хранилище с заранее записанным токеном.
    pub fn with_token(token: impl Into<String>) -> Self {
        Self {
            token: Mutex::new(Some(token.into())),
        }
    }

    fn slot(&self) -> MutexGuard<'_, Option<String>> {
        self.token.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl TokenStorage for MemoryTokenStorage {
    fn load(&self) -> SchedulerClientResult<Option<String>> {
        Ok(self.slot().as_deref().and_then(parse_token))
    }

    fn save(&self, token: &str) -> SchedulerClientResult<()> {
        *self.slot() = Some(token.to_string());
        Ok(())
    }

    fn clear(&self) -> SchedulerClientResult<()> {
        *self.slot() = None;
        Ok(())
    }
}

#[derive(Debug, Clone)]
/// Хранилище в файле (по одному токену на файл).
pub struct FileTokenStorage {
    path: PathBuf,
}

impl FileTokenStorage {
    /// Хранилище по указанному пути. Файл создаётся при первом сохранении.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Путь к файлу.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn storage_error(&self, source: std::io::Error) -> SchedulerClientError {
        SchedulerClientError::Storage {
            path: self.path.clone(),
            source,
        }
    }
}

impl TokenStorage for FileTokenStorage {
    fn load(&self) -> SchedulerClientResult<Option<String>> {
        match std::fs::read_to_string(&self.path) {
            Ok(raw) => Ok(parse_token(&raw)),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(err) => Err(self.storage_error(err)),
        }
    }

    fn save(&self, token: &str) -> SchedulerClientResult<()> {
        std::fs::write(&self.path, token).map_err(|err| self.storage_error(err))
    }

    fn clear(&self) -> SchedulerClientResult<()> {
        match std::fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(self.storage_error(err)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
/// Состояние сессии.
pub enum SessionState {
    /// Нет подтверждённого пользователя.
    Anonymous,
    /// Идёт вход или регистрация.
    Authenticating,
    /// Есть токен и пользователь.
    Authenticated,
}

struct SessionInner {
    token: Option<String>,
    user: Option<User>,
    state: SessionState,
}

#[derive(Clone)]
/// Явный контекст сессии, общий для клиента и всех хранилищ.
///
/// Клонирование дешёвое: все клоны смотрят на одно состояние.
pub struct Session {
    inner: Arc<Mutex<SessionInner>>,
    storage: Arc<dyn TokenStorage>,
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let inner = self.lock();
        f.debug_struct("Session")
            .field("has_token", &inner.token.is_some())
            .field("user_id", &inner.user.as_ref().map(|user| user.id))
            .field("state", &inner.state)
            .finish()
    }
}

impl Session {
    /// Поднимает сессию из хранилища. Пользователь ещё не известен, поэтому
    /// состояние `Anonymous` даже при наличии токена.
    pub fn restore(storage: impl TokenStorage + 'static) -> SchedulerClientResult<Self> {
        let token = storage.load()?;
        Ok(Self {
            inner: Arc::new(Mutex::new(SessionInner {
                token,
                user: None,
                state: SessionState::Anonymous,
            })),
            storage: Arc::new(storage),
        })
    }

    /// Сессия без постоянного хранилища.
    pub fn in_memory() -> Self {
        Self {
            inner: Arc::new(Mutex::new(SessionInner {
                token: None,
                user: None,
                state: SessionState::Anonymous,
            })),
            storage: Arc::new(MemoryTokenStorage::new()),
        }
    }

    fn lock(&self) -> MutexGuard<'_, SessionInner> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Текущий токен.
    pub fn token(&self) -> Option<String> {
        self.lock().token.clone()
    }

    /// Текущий пользователь.
    pub fn user(&self) -> Option<User> {
        self.lock().user.clone()
    }

    /// Текущее состояние.
    pub fn state(&self) -> SessionState {
        self.lock().state
    }

    /// Есть ли и токен, и пользователь.
    pub fn is_authenticated(&self) -> bool {
        self.lock().state == SessionState::Authenticated
    }

    /// Начало входа/регистрации.
    pub fn begin_authentication(&self) {
        self.lock().state = SessionState::Authenticating;
    }

    /// Вход не удался: сессия возвращается в `Anonymous`.
    pub fn abort_authentication(&self) {
        let mut inner = self.lock();
        inner.user = None;
        inner.state = SessionState::Anonymous;
    }

    /// Успешный вход: токен сохраняется, пользователь запоминается.
    ///
    /// Состояние в памяти обновляется даже если запись в хранилище не удалась.
    pub fn establish(&self, token: impl Into<String>, user: User) -> SchedulerClientResult<()> {
        let token = token.into();
        {
            let mut inner = self.lock();
            inner.token = Some(token.clone());
            inner.user = Some(user);
            inner.state = SessionState::Authenticated;
        }
        self.storage.save(&token).inspect_err(|err| {
            tracing::warn!(error = %err, "failed to persist session token");
        })
    }

    /// Сохраняет токен без пользователя (пользователь будет запрошен позже).
    pub fn set_token(&self, token: impl Into<String>) -> SchedulerClientResult<()> {
        let token = token.into();
        self.lock().token = Some(token.clone());
        self.storage.save(&token).inspect_err(|err| {
            tracing::warn!(error = %err, "failed to persist session token");
        })
    }

    /// Заменяет пользователя целиком. При наличии токена сессия становится
    /// `Authenticated`.
    pub fn set_user(&self, user: User) {
        let mut inner = self.lock();
        inner.user = Some(user);
        if inner.token.is_some() {
            inner.state = SessionState::Authenticated;
        }
    }

    /// Завершение сессии: токен и пользователь удаляются.
    pub fn end(&self) -> SchedulerClientResult<()> {
        {
            let mut inner = self.lock();
            inner.token = None;
            inner.user = None;
            inner.state = SessionState::Anonymous;
        }
        self.storage.clear().inspect_err(|err| {
            tracing::warn!(error = %err, "failed to clear persisted session token");
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Map;

    fn user(id: i64) -> User {
        User {
            id,
            name: Some("Ann".to_string()),
            email: None,
            profile: Map::new(),
        }
    }

    #[test]
    fn parse_token_trims_and_rejects_blank() {
        assert_eq!(parse_token("  abc.def  ").as_deref(), Some("abc.def"));
        assert!(parse_token(" \n ").is_none());
    }

    #[test]
    fn restored_token_is_not_authenticated_yet() {
        let session = Session::restore(MemoryTokenStorage::with_token("t1")).expect("restore");
        assert_eq!(session.token().as_deref(), Some("t1"));
        assert_eq!(session.state(), SessionState::Anonymous);
        assert!(!session.is_authenticated());

        session.set_user(user(1));
        assert!(session.is_authenticated());
    }

    #[test]
    fn user_without_token_stays_anonymous() {
        let session = Session::in_memory();
        session.set_user(user(1));
        assert_eq!(session.state(), SessionState::Anonymous);
    }

    #[test]
    fn lifecycle_transitions() {
        let session = Session::in_memory();
        session.begin_authentication();
        assert_eq!(session.state(), SessionState::Authenticating);

        session.abort_authentication();
        assert_eq!(session.state(), SessionState::Anonymous);

        session.begin_authentication();
        session.establish("tok", user(2)).expect("establish");
        assert_eq!(session.state(), SessionState::Authenticated);
        assert_eq!(session.user().map(|u| u.id), Some(2));

        session.end().expect("end");
        assert_eq!(session.state(), SessionState::Anonymous);
        assert!(session.token().is_none());
        assert!(session.user().is_none());
    }

    #[test]
    fn clones_share_state() {
        let session = Session::in_memory();
        let other = session.clone();
        session.establish("shared", user(3)).expect("establish");
        assert_eq!(other.token().as_deref(), Some("shared"));
    }

    #[test]
    fn debug_output_hides_token() {
        let session = Session::restore(MemoryTokenStorage::with_token("secret")).expect("restore");
        let debug = format!("{session:?}");
        assert!(!debug.contains("secret"));
        assert!(debug.contains("has_token: true"));
    }

    #[test]
    fn file_storage_round_trip() {
        let dir = tempfile::tempdir().expect("tempdir");
        let storage = FileTokenStorage::new(dir.path().join("token"));

        assert!(storage.load().expect("load missing").is_none());
        storage.clear().expect("clear missing file is fine");

        storage.save("abc").expect("save");
        assert_eq!(storage.load().expect("load").as_deref(), Some("abc"));

        storage.clear().expect("clear");
        assert!(!storage.path().exists());
    }

    #[test]
    fn file_storage_treats_blank_file_as_empty() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("token");
        std::fs::write(&path, "   \n").expect("write");

        let storage = FileTokenStorage::new(path);
        assert!(storage.load().expect("load").is_none());
    }

    #[test]
    fn session_end_clears_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("token");

        let session = Session::restore(FileTokenStorage::new(&path)).expect("restore");
        session.establish("persisted", user(4)).expect("establish");
        assert_eq!(std::fs::read_to_string(&path).expect("read"), "persisted");

        let restored = Session::restore(FileTokenStorage::new(&path)).expect("restore again");
        assert_eq!(restored.token().as_deref(), Some("persisted"));

        session.end().expect("end");
        assert!(!path.exists());
    }
}
