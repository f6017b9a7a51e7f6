use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::client::ApiClient;
use crate::models::{Credentials, ProfileForm, RegisterForm, User};
use crate::outcome::{Outcome, general_errors};
use crate::request::ApiRequest;
use crate::router::RouteName;
use crate::session::{Session, SessionState};
use crate::stores::StoreStatus;

const AUTH_FAILED: &str = "An error occurred. Please try again.";

#[derive(Debug, Deserialize)]
struct AuthData {
    #[serde(default)]
    token: Option<String>,
    #[serde(default)]
    user: Option<User>,
}

/// Достаёт пользователя из ответа профиля.
///
/// Сервер отдаёт его в `data`, в `user` или прямо в корне тела.
fn extract_user(body: Value) -> Option<User> {
    fn with_id(value: Option<&Value>) -> Option<User> {
        let value = value?;
        value.get("id")?;
        serde_json::from_value(value.clone()).ok()
    }

    with_id(body.get("data"))
        .or_else(|| with_id(body.get("user")))
        .or_else(|| serde_json::from_value(body).ok())
}

#[derive(Debug, Clone)]
/// Вход, регистрация, профиль и выход.
pub struct AuthStore {
    api: ApiClient,
    status: StoreStatus,
}

impl AuthStore {
    /// Хранилище поверх клиента.
    pub fn new(api: ApiClient) -> Self {
        Self {
            api,
            status: StoreStatus::default(),
        }
    }

    fn session(&self) -> &Session {
        self.api.session()
    }

    /// Текущий пользователь.
    pub fn user(&self) -> Option<User> {
        self.session().user()
    }

    /// Ошибки и сообщение последнего действия.
    pub fn status(&self) -> &StoreStatus {
        &self.status
    }

    /// Запрашивает текущего пользователя по сохранённому токену.
    ///
    /// Без токена запрос не отправляется. Если сервер ответил, но пользователя
    /// не отдал, токен удаляется и сессия становится анонимной. Если сервер
    /// недоступен, пользователь считается отсутствующим, а токен остаётся.
    pub async fn get_user(&mut self) -> Option<User> {
        self.session().token()?;

        let outcome = self
            .api
            .send_raw(ApiRequest::get("/api/profile"), "Failed to fetch profile.")
            .await;

        let user = match outcome {
            Outcome::Success { data, .. } => extract_user(data),
            Outcome::Failed { status: None, .. } => {
                tracing::warn!("profile request did not reach the server, keeping token");
                self.session().abort_authentication();
                return None;
            }
            Outcome::Failed { status, .. } => {
                tracing::warn!(?status, "profile request rejected, dropping session");
                None
            }
            Outcome::Invalid { .. } => None,
        };

        match user {
            Some(user) => {
                self.session().set_user(user.clone());
                Some(user)
            }
            None => {
                self.session().end().ok();
                None
            }
        }
    }

    /// Обновляет профиль; при успехе пользователь заменяется целиком.
    pub async fn update_profile(&mut self, form: &ProfileForm) -> Option<User> {
        self.status.reset();

        let outcome: Outcome<Option<User>> = self
            .api
            .send_json(ApiRequest::put("/api/profile"), form, "Update failed.")
            .await;
        self.status
            .apply(&outcome, Some("Profile updated successfully."));

        let user = outcome.into_data().flatten()?;
        self.session().set_user(user.clone());
        Some(user)
    }

    /// Вход. При успехе возвращает маршрут, на который нужно перейти.
    pub async fn login(&mut self, credentials: &Credentials) -> Option<RouteName> {
        self.authenticate("/api/login", credentials).await
    }

    /// Регистрация. При успехе возвращает маршрут, на который нужно перейти.
    pub async fn register(&mut self, form: &RegisterForm) -> Option<RouteName> {
        self.authenticate("/api/register", form).await
    }

    async fn authenticate<B: Serialize>(&mut self, path: &str, body: &B) -> Option<RouteName> {
        self.status.reset();
        self.session().begin_authentication();

        let outcome: Outcome<Option<AuthData>> = self
            .api
            .send_json(ApiRequest::post(path), body, AUTH_FAILED)
            .await;

        match outcome {
            Outcome::Success {
                data: Some(AuthData {
                    token: Some(token),
                    user,
                }),
                message,
            } => {
                match user {
                    Some(user) => {
                        self.session().establish(token, user).ok();
                    }
                    None => {
                        self.session().set_token(token).ok();
                        self.get_user().await;
                    }
                }

                if self.session().state() != SessionState::Authenticated {
                    self.reject(None);
                    return None;
                }

                tracing::info!(path, "user authenticated");
                self.status
                    .set_message(message.unwrap_or_else(|| "Login successful.".to_string()));
                Some(RouteName::Dashboard)
            }
            Outcome::Invalid { errors, message } => {
                self.session().abort_authentication();
                self.status.set_errors(errors);
                self.status
                    .set_message(message.unwrap_or_else(|| "Validation error.".to_string()));
                None
            }
            other => {
                self.reject(other.message().map(str::to_string));
                None
            }
        }
    }

    fn reject(&mut self, message: Option<String>) {
        self.session().abort_authentication();
        self.status.set_errors(general_errors(AUTH_FAILED));
        self.status
            .set_message(message.unwrap_or_else(|| AUTH_FAILED.to_string()));
    }

    /// Выход. Сессия очищается независимо от ответа сервера.
    pub async fn logout(&mut self) -> RouteName {
        if self.session().token().is_some() {
            let outcome = self
                .api
                .send_raw(ApiRequest::post("/api/logout"), "Logout failed.")
                .await;
            if !outcome.is_success() {
                tracing::warn!(
                    reason = outcome.message().unwrap_or_default(),
                    "logout request failed, clearing session anyway"
                );
            }
        }

        self.session().end().ok();
        self.status.reset();
        tracing::info!("user logged out");
        RouteName::Home
    }
}
