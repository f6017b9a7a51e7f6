use chrono::{DateTime, NaiveDateTime};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

use crate::request::FilePart;

/// Формат `scheduled_time`, который принимает API.
pub const SCHEDULED_TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
/// Публичная модель пользователя.
///
/// Кроме идентификатора сервер отдаёт произвольный набор полей профиля; всё,
/// что не разобрано явно, лежит в `profile`.
pub struct User {
    /// Идентификатор пользователя.
    pub id: i64,
    /// Отображаемое имя.
    #[serde(default)]
    pub name: Option<String>,
    /// Email.
    #[serde(default)]
    pub email: Option<String>,
    /// Остальные поля профиля как есть.
    #[serde(flatten)]
    pub profile: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
/// Платформа публикации.
pub struct Platform {
    /// Идентификатор платформы.
    pub id: i64,
    /// Название (`twitter`, `facebook`, ...).
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
/// Ссылка на платформу внутри поста: сервер отдаёт либо id, либо объект.
pub enum PlatformRef {
    /// Только идентификатор.
    Id(i64),
    /// Полный объект платформы.
    Platform(Platform),
}

impl PlatformRef {
    /// Идентификатор платформы.
    pub fn id(&self) -> i64 {
        match self {
            Self::Id(id) => *id,
            Self::Platform(platform) => platform.id,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
/// Публичная модель поста.
pub struct Post {
    /// Идентификатор поста.
    pub id: i64,
    /// Заголовок.
    pub title: String,
    /// Текст поста.
    #[serde(default)]
    pub content: Option<String>,
    /// Время запланированной публикации в том виде, в каком его вернул сервер.
    #[serde(default)]
    pub scheduled_time: Option<String>,
    /// Статус (`draft`, `scheduled`, `published`, ...).
    #[serde(default = "default_status", deserialize_with = "status_or_draft")]
    pub status: String,
    /// Ссылка на изображение.
    #[serde(default)]
    pub image_url: Option<String>,
    /// Платформы, на которые публикуется пост.
    #[serde(default, deserialize_with = "null_as_empty")]
    pub platforms: Vec<PlatformRef>,
}

fn default_status() -> String {
    "draft".to_string()
}

fn status_or_draft<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_else(default_status))
}

fn null_as_empty<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Ok(Option::<Vec<T>>::deserialize(deserializer)?.unwrap_or_default())
}

impl Post {
    /// Идентификаторы платформ поста.
    pub fn platform_ids(&self) -> Vec<i64> {
        self.platforms.iter().map(PlatformRef::id).collect()
    }

    /// Разбирает `scheduled_time` в локальное время без зоны.
    ///
    /// Принимает формат API, ISO 8601 без зоны и RFC 3339.
    pub fn scheduled_at(&self) -> Option<NaiveDateTime> {
        let raw = self.scheduled_time.as_deref()?.trim();
        NaiveDateTime::parse_from_str(raw, SCHEDULED_TIME_FORMAT)
            .or_else(|_| NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f"))
            .ok()
            .or_else(|| {
                DateTime::parse_from_rfc3339(raw)
                    .ok()
                    .map(|dt| dt.naive_utc())
            })
    }
}

#[derive(Debug, Clone, Serialize)]
/// Данные для входа.
pub struct Credentials {
    /// Email.
    pub email: String,
    /// Пароль.
    pub password: String,
}

#[derive(Debug, Clone, Serialize)]
/// Данные для регистрации.
pub struct RegisterForm {
    /// Имя.
    pub name: String,
    /// Email.
    pub email: String,
    /// Пароль.
    pub password: String,
    /// Подтверждение пароля.
    pub password_confirmation: String,
}

#[derive(Debug, Clone, Default, Serialize)]
/// Изменения профиля; незаданные поля не отправляются.
pub struct ProfileForm {
    /// Новое имя.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Новый email.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    /// Новый пароль.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    /// Подтверждение нового пароля.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password_confirmation: Option<String>,
}

#[derive(Debug, Clone, Default)]
/// Форма создания поста.
pub struct PostForm {
    /// Заголовок.
    pub title: String,
    /// Текст.
    pub content: String,
    /// Время публикации.
    pub scheduled_time: Option<NaiveDateTime>,
    /// Статус; по умолчанию `draft`.
    pub status: Option<String>,
    /// Идентификаторы платформ.
    pub platforms: Vec<i64>,
    /// Изображение. Если задано, запрос уходит как multipart.
    pub image: Option<FilePart>,
}

#[derive(Debug, Clone, Default)]
/// Частичное изменение поста: уходят только заданные поля.
pub struct PostUpdate {
    /// Новый заголовок.
    pub title: Option<String>,
    /// Новый текст.
    pub content: Option<String>,
    /// Новое время публикации.
    pub scheduled_time: Option<NaiveDateTime>,
    /// Новый статус.
    pub status: Option<String>,
    /// Новый набор платформ; `Some(vec![])` снимает все.
    pub platforms: Option<Vec<i64>>,
    /// Новое изображение. Если задано, запрос уходит как multipart.
    pub image: Option<FilePart>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
/// Действие переключения платформы.
pub enum ToggleAction {
    /// Включить платформу для пользователя.
    Activate,
    /// Выключить платформу.
    Deactivate,
}

#[derive(Debug, Clone, Serialize)]
pub(crate) struct TogglePlatformRequest {
    pub(crate) platform_id: i64,
    pub(crate) action: ToggleAction,
}
