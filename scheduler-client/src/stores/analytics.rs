use serde_json::Value;

use crate::client::ApiClient;
use crate::outcome::Outcome;
use crate::request::ApiRequest;
use crate::stores::StoreStatus;

#[derive(Debug, Clone)]
/// Аналитика по постам. Формат отчёта определяет сервер.
pub struct AnalyticsStore {
    api: ApiClient,
    data: Option<Value>,
    status: StoreStatus,
}

impl AnalyticsStore {
    /// Хранилище поверх клиента.
    pub fn new(api: ApiClient) -> Self {
        Self {
            api,
            data: None,
            status: StoreStatus::default(),
        }
    }

    /// Последний загруженный отчёт.
    pub fn data(&self) -> Option<&Value> {
        self.data.as_ref()
    }

    /// Ошибки и сообщение последнего действия.
    pub fn status(&self) -> &StoreStatus {
        &self.status
    }

    /// Загружает аналитику по постам. При ошибке предыдущий отчёт сохраняется.
    pub async fn fetch_post_analytics(&mut self) -> Option<&Value> {
        self.status.reset();
        let outcome: Outcome<Value> = self
            .api
            .send(
                ApiRequest::get("/api/analytics/posts"),
                "Failed to fetch analytics.",
            )
            .await;
        self.status.apply(&outcome, None);
        if let Outcome::Success { data, .. } = outcome {
            self.data = Some(data);
        }
        self.data.as_ref()
    }
}
