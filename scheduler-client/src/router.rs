//! Таблица маршрутов и навигационный гард.
//!
//! Перед каждым переходом гард выясняет текущего пользователя (это может
//! потребовать запроса к API) и перенаправляет:
//! - пользователя с гостевого маршрута на главную;
//! - анонима с защищённого маршрута на вход.

use std::collections::BTreeMap;

use async_trait::async_trait;
use thiserror::Error;

/// Сколько перенаправлений подряд допускается за один переход.
const MAX_REDIRECTS: usize = 4;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
/// Флаги доступа маршрута.
pub struct RouteMeta {
    /// Только для вошедших пользователей.
    pub auth: bool,
    /// Только для гостей.
    pub guest: bool,
}

impl RouteMeta {
    const PUBLIC: Self = Self {
        auth: false,
        guest: false,
    };
    const AUTH: Self = Self {
        auth: true,
        guest: false,
    };
    const GUEST: Self = Self {
        auth: false,
        guest: true,
    };
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
/// Именованный маршрут приложения.
pub enum RouteName {
    /// `/`
    Home,
    /// `/dashboard`
    Dashboard,
    /// `/register`
    Register,
    /// `/login`
    Login,
    /// `/profile`
    Profile,
    /// `/posts/create`
    PostCreate,
    /// `/posts/edit/:id`
    PostEdit,
    /// `/posts/delete/:id`
    PostDelete,
    /// `/posts/:id`
    Show,
    /// `/posts/update/:id`
    Update,
    /// `/settings`
    Settings,
    /// `/logs`
    Logs,
    /// `/analytics/posts`
    PostAnalytics,
}

impl RouteName {
    /// Все маршруты в порядке объявления.
    pub const ALL: [RouteName; 13] = [
        Self::Home,
        Self::Dashboard,
        Self::Register,
        Self::Login,
        Self::Profile,
        Self::PostCreate,
        Self::PostEdit,
        Self::PostDelete,
        Self::Show,
        Self::Update,
        Self::Settings,
        Self::Logs,
        Self::PostAnalytics,
    ];

    /// Имя маршрута.
    pub fn name(self) -> &'static str {
        match self {
            Self::Home => "home",
            Self::Dashboard => "dashboard",
            Self::Register => "register",
            Self::Login => "login",
            Self::Profile => "profile",
            Self::PostCreate => "post_create",
            Self::PostEdit => "post_edit",
            Self::PostDelete => "post_delete",
            Self::Show => "show",
            Self::Update => "update",
            Self::Settings => "settings",
            Self::Logs => "logs",
            Self::PostAnalytics => "post_analytics",
        }
    }

    /// Шаблон пути, сегмент `:id` означает параметр.
    pub fn path(self) -> &'static str {
        match self {
            Self::Home => "/",
            Self::Dashboard => "/dashboard",
            Self::Register => "/register",
            Self::Login => "/login",
            Self::Profile => "/profile",
            Self::PostCreate => "/posts/create",
            Self::PostEdit => "/posts/edit/:id",
            Self::PostDelete => "/posts/delete/:id",
            Self::Show => "/posts/:id",
            Self::Update => "/posts/update/:id",
            Self::Settings => "/settings",
            Self::Logs => "/logs",
            Self::PostAnalytics => "/analytics/posts",
        }
    }

    /// Флаги доступа.
    pub fn meta(self) -> RouteMeta {
        match self {
            Self::Home | Self::Show => RouteMeta::PUBLIC,
            Self::Register | Self::Login => RouteMeta::GUEST,
            Self::Dashboard
            | Self::Profile
            | Self::PostCreate
            | Self::PostEdit
            | Self::PostDelete
            | Self::Update
            | Self::Settings
            | Self::Logs
            | Self::PostAnalytics => RouteMeta::AUTH,
        }
    }

    fn param_count(self) -> usize {
        self.path().split('/').filter(|s| s.starts_with(':')).count()
    }

    fn match_path(self, path: &str) -> Option<BTreeMap<String, String>> {
        let pattern = segments(self.path());
        let actual = segments(path);
        if pattern.len() != actual.len() {
            return None;
        }

        let mut params = BTreeMap::new();
        for (expected, got) in pattern.into_iter().zip(actual) {
            match expected.strip_prefix(':') {
                Some(param) => {
                    params.insert(param.to_string(), got.to_string());
                }
                None if expected == got => {}
                None => return None,
            }
        }
        Some(params)
    }
}

fn segments(path: &str) -> Vec<&str> {
    path.split('?')
        .next()
        .unwrap_or_default()
        .split('/')
        .filter(|segment| !segment.is_empty())
        .collect()
}

#[derive(Debug, Clone, PartialEq, Eq)]
/// Маршрут вместе с разобранными параметрами.
pub struct RouteMatch {
    /// Маршрут.
    pub name: RouteName,
    /// Параметры пути (`id` → `42`).
    pub params: BTreeMap<String, String>,
}

impl RouteMatch {
    /// Маршрут без параметров.
    pub fn of(name: RouteName) -> Self {
        Self {
            name,
            params: BTreeMap::new(),
        }
    }

    /// Значение параметра пути.
    pub fn param(&self, key: &str) -> Option<&str> {
        self.params.get(key).map(String::as_str)
    }
}

/// Находит маршрут по пути. Статические сегменты важнее параметров, так что
/// `/posts/create` не попадает в `/posts/:id`.
pub fn resolve_path(path: &str) -> Option<RouteMatch> {
    let mut candidates = RouteName::ALL;
    candidates.sort_by_key(|name| name.param_count());

    candidates.into_iter().find_map(|name| {
        name.match_path(path)
            .map(|params| RouteMatch { name, params })
    })
}

/// Источник ответа на вопрос «есть ли сейчас пользователь».
#[async_trait]
pub trait UserResolver: Send {
    /// Выясняет текущего пользователя; `true`, если он есть.
    async fn resolve_user(&mut self) -> bool;
}

#[async_trait]
impl UserResolver for crate::stores::AuthStore {
    async fn resolve_user(&mut self) -> bool {
        self.get_user().await.is_some()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
/// Решение гарда.
pub enum Navigation {
    /// Переход разрешён.
    Proceed,
    /// Нужно перейти на другой маршрут.
    Redirect(RouteName),
}

/// Проверка перед переходом на `target`.
pub async fn before_each<R>(resolver: &mut R, target: RouteName) -> Navigation
where
    R: UserResolver + ?Sized,
{
    let has_user = resolver.resolve_user().await;
    let meta = target.meta();

    if has_user && meta.guest {
        return Navigation::Redirect(RouteName::Home);
    }
    if !has_user && meta.auth {
        return Navigation::Redirect(RouteName::Login);
    }
    Navigation::Proceed
}

#[derive(Debug, Error, PartialEq, Eq)]
/// Ошибки навигации.
pub enum NavigationError {
    /// Путь не соответствует ни одному маршруту.
    #[error("no route matches {0}")]
    NotFound(String),
    /// Гард перенаправляет по кругу.
    #[error("too many redirects while navigating to {0}")]
    RedirectLoop(String),
}

#[derive(Debug, Clone, Default)]
/// Навигатор: применяет гард и помнит текущий маршрут.
pub struct Navigator {
    current: Option<RouteMatch>,
}

impl Navigator {
    /// Навигатор без текущего маршрута.
    pub fn new() -> Self {
        Self::default()
    }

    /// Текущий маршрут.
    pub fn current(&self) -> Option<&RouteMatch> {
        self.current.as_ref()
    }

    /// Переход по пути. Гард выполняется и для каждого перенаправления.
    pub async fn navigate<R>(
        &mut self,
        resolver: &mut R,
        path: &str,
    ) -> Result<RouteMatch, NavigationError>
    where
        R: UserResolver + ?Sized,
    {
        let target = resolve_path(path).ok_or_else(|| NavigationError::NotFound(path.to_string()))?;
        self.navigate_to(resolver, target).await
    }

    /// Переход на уже разобранный маршрут.
    pub async fn navigate_to<R>(
        &mut self,
        resolver: &mut R,
        target: RouteMatch,
    ) -> Result<RouteMatch, NavigationError>
    where
        R: UserResolver + ?Sized,
    {
        let requested = target.name.path();
        let mut target = target;

        for _ in 0..=MAX_REDIRECTS {
            match before_each(resolver, target.name).await {
                Navigation::Proceed => {
                    tracing::debug!(route = target.name.name(), "navigation allowed");
                    self.current = Some(target.clone());
                    return Ok(target);
                }
                Navigation::Redirect(name) => {
                    tracing::debug!(
                        from = target.name.name(),
                        to = name.name(),
                        "navigation redirected"
                    );
                    target = RouteMatch::of(name);
                }
            }
        }

        Err(NavigationError::RedirectLoop(requested.to_string()))
    }
}
