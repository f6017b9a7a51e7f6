//! Клиентская библиотека для API планировщика публикаций в соцсетях.
//!
//! Слои, снизу вверх:
//! - [`Session`]: bearer-токен с постоянным хранилищем и текущий пользователь;
//! - [`ApiClient`]: общий контракт запросов. Ставит заголовки, выбирает
//!   JSON или multipart для тела и нормализует ответ в [`Outcome`];
//! - хранилища ([`AuthStore`], [`PostsStore`], [`PlatformsStore`],
//!   [`AnalyticsStore`], [`LogsStore`]), по одному на группу ресурсов;
//! - [`Navigator`]: гард переходов между маршрутами `auth`/`guest`.
//!
//! [`SchedulerClient`] собирает всё это вокруг одной сессии.
#![warn(missing_docs)]

mod client;
mod error;
mod models;
mod outcome;
mod request;
mod router;
mod session;
mod stores;

pub use client::{ApiClient, ClientConfig, DEFAULT_BASE_URL, normalize_base_url};
pub use error::{SchedulerClientError, SchedulerClientResult};
pub use models::{
    Credentials, Platform, PlatformRef, Post, PostForm, PostUpdate, ProfileForm, RegisterForm,
    SCHEDULED_TIME_FORMAT, ToggleAction, User,
};
pub use outcome::{FieldErrors, GENERAL_ERROR_KEY, Outcome, general_errors};
pub use request::{ApiRequest, FilePart, FormField, FormValue, Payload, PayloadValue, RequestBody};
pub use router::{
    Navigation, NavigationError, Navigator, RouteMatch, RouteMeta, RouteName, UserResolver,
    before_each, resolve_path,
};
pub use session::{FileTokenStorage, MemoryTokenStorage, Session, SessionState, TokenStorage};
pub use stores::{AnalyticsStore, AuthStore, LogsStore, PlatformsStore, PostsStore, StoreStatus};

#[derive(Debug, Clone)]
/// Все хранилища приложения поверх одной сессии.
pub struct SchedulerClient {
    /// Вход, регистрация, профиль.
    pub auth: AuthStore,
    /// Посты.
    pub posts: PostsStore,
    /// Платформы.
    pub platforms: PlatformsStore,
    /// Аналитика.
    pub analytics: AnalyticsStore,
    /// Журнал.
    pub logs: LogsStore,
    /// Навигатор с гардом.
    pub navigator: Navigator,
    session: Session,
}

impl SchedulerClient {
    /// Поднимает сессию из `storage` и создаёт хранилища.
    pub fn connect(
        config: ClientConfig,
        storage: impl TokenStorage + 'static,
    ) -> SchedulerClientResult<Self> {
        let session = Session::restore(storage)?;
        Self::with_session(config, session)
    }

    /// Создаёт хранилища поверх готовой сессии.
    pub fn with_session(config: ClientConfig, session: Session) -> SchedulerClientResult<Self> {
        let api = ApiClient::new(config, session.clone())?;
        Ok(Self {
            auth: AuthStore::new(api.clone()),
            posts: PostsStore::new(api.clone()),
            platforms: PlatformsStore::new(api.clone()),
            analytics: AnalyticsStore::new(api.clone()),
            logs: LogsStore::new(api),
            navigator: Navigator::new(),
            session,
        })
    }

    /// Общая сессия.
    pub fn session(&self) -> &Session {
        &self.session
    }

    /// Переход по пути через гард (использует [`AuthStore`] для проверки
    /// пользователя).
    pub async fn navigate(&mut self, path: &str) -> Result<RouteMatch, NavigationError> {
        self.navigator.navigate(&mut self.auth, path).await
    }

    /// Переход на именованный маршрут через гард.
    pub async fn navigate_to(&mut self, name: RouteName) -> Result<RouteMatch, NavigationError> {
        self.navigator
            .navigate_to(&mut self.auth, RouteMatch::of(name))
            .await
    }
}
