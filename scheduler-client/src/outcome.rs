//! Нормализация ответов API в единую форму `{data, message, errors}`.

use std::collections::BTreeMap;

use serde::de::DeserializeOwned;
use serde_json::Value;

/// Ошибки валидации: поле → список сообщений.
pub type FieldErrors = BTreeMap<String, Vec<String>>;

/// Ключ, под которым лежат ошибки, не привязанные к полю.
pub const GENERAL_ERROR_KEY: &str = "general";

#[derive(Debug, Clone, PartialEq)]
/// Нормализованный результат запроса.
///
/// Ровно один из трёх случаев: данные, ошибки валидации или общая ошибка.
pub enum Outcome<T> {
    /// `2xx`.
    Success {
        /// Данные из поля `data`.
        data: T,
        /// Сообщение сервера.
        message: Option<String>,
    },
    /// `422`.
    Invalid {
        /// Ошибки по полям.
        errors: FieldErrors,
        /// Сообщение сервера.
        message: Option<String>,
    },
    /// Любой другой статус или сетевой сбой (`status == None`).
    Failed {
        /// HTTP-статус, если ответ был получен.
        status: Option<u16>,
        /// Сообщение сервера или текст по умолчанию.
        message: String,
    },
}

impl<T> Outcome<T> {
    /// Общая ошибка без HTTP-статуса.
    pub fn failed(message: impl Into<String>) -> Self {
        Self::Failed {
            status: None,
            message: message.into(),
        }
    }

    /// Успешен ли запрос.
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }

    /// Отклонил ли сервер токен (`401`, `419`).
    pub fn is_unauthorized(&self) -> bool {
        matches!(
            self,
            Self::Failed {
                status: Some(401 | 419),
                ..
            }
        )
    }

    /// Данные успешного ответа.
    pub fn data(&self) -> Option<&T> {
        match self {
            Self::Success { data, .. } => Some(data),
            _ => None,
        }
    }

    /// Забирает данные успешного ответа.
    pub fn into_data(self) -> Option<T> {
        match self {
            Self::Success { data, .. } => Some(data),
            _ => None,
        }
    }

    /// Сообщение сервера (для общей ошибки всегда есть).
    pub fn message(&self) -> Option<&str> {
        match self {
            Self::Success { message, .. } | Self::Invalid { message, .. } => message.as_deref(),
            Self::Failed { message, .. } => Some(message),
        }
    }

    /// Ошибки в нормализованном виде. Общая ошибка выглядит как `{general: [message]}`.
    pub fn errors(&self) -> FieldErrors {
        match self {
            Self::Success { .. } => FieldErrors::new(),
            Self::Invalid { errors, .. } => errors.clone(),
            Self::Failed { message, .. } => general_errors(message.clone()),
        }
    }

    /// Преобразует данные успешного ответа.
    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Outcome<U> {
        match self {
            Self::Success { data, message } => Outcome::Success {
                data: f(data),
                message,
            },
            Self::Invalid { errors, message } => Outcome::Invalid { errors, message },
            Self::Failed { status, message } => Outcome::Failed { status, message },
        }
    }
}

/// `{general: [message]}`.
pub fn general_errors(message: impl Into<String>) -> FieldErrors {
    FieldErrors::from([(GENERAL_ERROR_KEY.to_string(), vec![message.into()])])
}

#[derive(Debug, Default)]
struct Envelope {
    data: Option<Value>,
    message: Option<String>,
    errors: Option<FieldErrors>,
}

impl Envelope {
    fn parse(body: &Value) -> Self {
        let Value::Object(map) = body else {
            return Self::default();
        };

        let message = map
            .get("message")
            .and_then(Value::as_str)
            .filter(|message| !message.trim().is_empty())
            .map(str::to_string);

        let errors = match map.get("errors") {
            Some(Value::Object(fields)) => Some(
                fields
                    .iter()
                    .map(|(field, messages)| (field.clone(), messages_of(messages)))
                    .collect(),
            ),
            _ => None,
        };

        Self {
            data: map.get("data").cloned(),
            message,
            errors,
        }
    }
}

fn messages_of(value: &Value) -> Vec<String> {
    match value {
        Value::Array(items) => items.iter().map(text_of).collect(),
        other => vec![text_of(other)],
    }
}

fn text_of(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}

/// Тело ответа как JSON. Пустое или нечитаемое тело даёт `null`.
pub(crate) fn parse_body(bytes: &[u8]) -> Value {
    if bytes.iter().all(u8::is_ascii_whitespace) {
        return Value::Null;
    }
    serde_json::from_slice(bytes).unwrap_or(Value::Null)
}

/// Откуда брать данные успешного ответа.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum DataShape {
    /// Поле `data` конверта.
    Enveloped,
    /// Всё тело целиком.
    Raw,
}

/// Классифицирует завершённый обмен по статусу.
pub(crate) fn normalize<T: DeserializeOwned>(
    status: u16,
    body: Value,
    shape: DataShape,
    fallback: &str,
) -> Outcome<T> {
    let envelope = Envelope::parse(&body);

    match status {
        422 => {
            let message = envelope.message;
            let errors = match envelope.errors {
                Some(errors) => errors,
                None => general_errors(message.clone().unwrap_or_else(|| fallback.to_string())),
            };
            Outcome::Invalid { errors, message }
        }
        200..=299 => {
            let data = match shape {
                DataShape::Enveloped => envelope.data.unwrap_or(Value::Null),
                DataShape::Raw => body,
            };
            match serde_json::from_value::<T>(data) {
                Ok(data) => Outcome::Success {
                    data,
                    message: envelope.message,
                },
                Err(err) => {
                    tracing::warn!(error = %err, "unexpected response payload");
                    Outcome::Failed {
                        status: Some(status),
                        message: fallback.to_string(),
                    }
                }
            }
        }
        _ => Outcome::Failed {
            status: Some(status),
            message: envelope.message.unwrap_or_else(|| fallback.to_string()),
        },
    }
}
