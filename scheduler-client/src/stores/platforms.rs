use serde_json::Value;

use crate::client::ApiClient;
use crate::models::{Platform, ToggleAction, TogglePlatformRequest};
use crate::outcome::Outcome;
use crate::request::ApiRequest;
use crate::stores::StoreStatus;

/// Ответ переключения: `имя платформы → id` для всех активных платформ.
///
/// Пустой набор сервер кодирует как `[]`, поэтому массив тоже принимается:
/// пустой или из объектов `{id, name}`. Порядок по имени.
fn active_from_toggle(data: Value) -> Vec<Platform> {
    let mut active: Vec<Platform> = match data {
        Value::Object(map) => map
            .into_iter()
            .filter_map(|(name, id)| id.as_i64().map(|id| Platform { id, name }))
            .collect(),
        Value::Array(items) => items
            .into_iter()
            .filter_map(|item| serde_json::from_value(item).ok())
            .collect(),
        _ => Vec::new(),
    };
    active.sort_by(|a, b| a.name.cmp(&b.name));
    active
}

#[derive(Debug, Clone)]
/// Платформы публикации и их включение для пользователя.
pub struct PlatformsStore {
    api: ApiClient,
    platforms: Vec<Platform>,
    active_platforms: Vec<Platform>,
    status: StoreStatus,
}

impl PlatformsStore {
    /// Хранилище поверх клиента.
    pub fn new(api: ApiClient) -> Self {
        Self {
            api,
            platforms: Vec::new(),
            active_platforms: Vec::new(),
            status: StoreStatus::default(),
        }
    }

    /// Все известные платформы.
    pub fn platforms(&self) -> &[Platform] {
        &self.platforms
    }

    /// Платформы, включённые у пользователя.
    pub fn active_platforms(&self) -> &[Platform] {
        &self.active_platforms
    }

    /// Ошибки и сообщение последнего действия.
    pub fn status(&self) -> &StoreStatus {
        &self.status
    }

    /// Загружает список всех платформ.
    pub async fn fetch_all(&mut self) -> &[Platform] {
        self.status.reset();
        let outcome: Outcome<Option<Vec<Platform>>> = self
            .api
            .send(ApiRequest::get("/api/platforms"), "Failed to fetch platforms.")
            .await;
        self.status.apply(&outcome, None);
        if let Outcome::Success { data, .. } = outcome {
            self.platforms = data.unwrap_or_default();
        }
        &self.platforms
    }

    /// Загружает активные платформы пользователя.
    pub async fn fetch_active(&mut self) -> &[Platform] {
        self.status.reset();
        let outcome: Outcome<Option<Vec<Platform>>> = self
            .api
            .send(
                ApiRequest::get("/api/user/active-platforms"),
                "Failed to fetch active platforms.",
            )
            .await;
        self.status.apply(&outcome, None);
        if let Outcome::Success { data, .. } = outcome {
            self.active_platforms = data.unwrap_or_default();
        }
        &self.active_platforms
    }

    /// Включает или выключает платформу; список активных заменяется ответом.
    pub async fn toggle(&mut self, platform_id: i64, action: ToggleAction) -> bool {
        self.status.reset();
        let body = TogglePlatformRequest {
            platform_id,
            action,
        };
        let outcome: Outcome<Value> = self
            .api
            .send_json(
                ApiRequest::post("/api/user/platform/toggle"),
                &body,
                "Failed to update platform status.",
            )
            .await;
        self.status
            .apply(&outcome, Some("Platform status updated successfully."));

        match outcome {
            Outcome::Success { data, .. } => {
                self.active_platforms = active_from_toggle(data);
                true
            }
            _ => false,
        }
    }
}
