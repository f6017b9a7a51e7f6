//! Хранилища состояния по группам ресурсов API.
//!
//! Каждое хранилище владеет клоном [`ApiClient`](crate::ApiClient), сбрасывает
//! своё состояние перед запросом и целиком перезаписывает его по результату.
//! Ошибки сервера и сети не всплывают как `Err`: они оседают в
//! [`StoreStatus`].

mod analytics;
mod auth;
mod logs;
mod platforms;
mod posts;

pub use analytics::AnalyticsStore;
pub use auth::AuthStore;
pub use logs::LogsStore;
pub use platforms::PlatformsStore;
pub use posts::PostsStore;

use crate::outcome::{FieldErrors, Outcome, general_errors};

#[derive(Debug, Clone, Default, PartialEq)]
/// Ошибки и сообщение последнего действия хранилища.
pub struct StoreStatus {
    errors: FieldErrors,
    message: Option<String>,
}

impl StoreStatus {
    /// Ошибки по полям.
    pub fn errors(&self) -> &FieldErrors {
        &self.errors
    }

    /// Сообщение для пользователя.
    pub fn message(&self) -> Option<&str> {
        self.message.as_deref()
    }

    /// Есть ли ошибки.
    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    pub(crate) fn reset(&mut self) {
        self.errors.clear();
        self.message = None;
    }

    pub(crate) fn fail(&mut self, message: impl Into<String>) {
        self.errors = general_errors(message);
        self.message = None;
    }

    pub(crate) fn set_message(&mut self, message: impl Into<String>) {
        self.message = Some(message.into());
    }

    pub(crate) fn set_errors(&mut self, errors: FieldErrors) {
        self.errors = errors;
    }

    /// Применяет результат запроса. Успех очищает ошибки и выставляет
    /// сообщение сервера или `success_message`.
    pub(crate) fn apply<T>(&mut self, outcome: &Outcome<T>, success_message: Option<&str>) {
        match outcome {
            Outcome::Success { message, .. } => {
                self.errors.clear();
                self.message = message.clone().or_else(|| success_message.map(str::to_string));
            }
            Outcome::Invalid { errors, .. } => {
                self.errors = errors.clone();
                self.message = None;
            }
            Outcome::Failed { .. } => {
                self.errors = outcome.errors();
                self.message = None;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Value;

    #[test]
    fn success_clears_previous_errors() {
        let mut status = StoreStatus::default();
        status.fail("boom");
        assert!(status.has_errors());

        let outcome: Outcome<Value> = Outcome::Success {
            data: Value::Null,
            message: None,
        };
        status.apply(&outcome, Some("Done."));

        assert!(!status.has_errors());
        assert_eq!(status.message(), Some("Done."));
    }

    #[test]
    fn server_message_wins_over_default() {
        let mut status = StoreStatus::default();
        let outcome: Outcome<()> = Outcome::Success {
            data: (),
            message: Some("Saved!".to_string()),
        };
        status.apply(&outcome, Some("Done."));
        assert_eq!(status.message(), Some("Saved!"));
    }

    #[test]
    fn failure_sets_general_error() {
        let mut status = StoreStatus::default();
        status.set_message("stale");
        let outcome: Outcome<()> = Outcome::Failed {
            status: Some(500),
            message: "Server Error".to_string(),
        };
        status.apply(&outcome, Some("Done."));

        assert_eq!(status.errors(), &general_errors("Server Error"));
        assert!(status.message().is_none());
    }
}
