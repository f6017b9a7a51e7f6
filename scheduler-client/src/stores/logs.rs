use serde_json::Value;

use crate::client::ApiClient;
use crate::outcome::Outcome;
use crate::request::ApiRequest;
use crate::stores::StoreStatus;

/// Записи журнала: массив в `data` или всё тело, если это массив.
fn log_entries(body: Value) -> Vec<Value> {
    match body {
        Value::Array(entries) => entries,
        Value::Object(mut map) => match map.remove("data") {
            Some(Value::Array(entries)) => entries,
            _ => Vec::new(),
        },
        _ => Vec::new(),
    }
}

#[derive(Debug, Clone)]
/// Журнал публикаций пользователя.
pub struct LogsStore {
    api: ApiClient,
    logs: Vec<Value>,
    status: StoreStatus,
}

impl LogsStore {
    /// Хранилище поверх клиента.
    pub fn new(api: ApiClient) -> Self {
        Self {
            api,
            logs: Vec::new(),
            status: StoreStatus::default(),
        }
    }

    /// Загруженные записи.
    pub fn logs(&self) -> &[Value] {
        &self.logs
    }

    /// Ошибки и сообщение последнего действия.
    pub fn status(&self) -> &StoreStatus {
        &self.status
    }

    /// Загружает журнал.
    pub async fn fetch_logs(&mut self) -> &[Value] {
        self.status.reset();
        let outcome = self
            .api
            .send_raw(ApiRequest::get("/api/logs"), "Failed to fetch logs.")
            .await;
        self.status.apply(&outcome, None);
        if let Outcome::Success { data, .. } = outcome {
            self.logs = log_entries(data);
        }
        &self.logs
    }
}
