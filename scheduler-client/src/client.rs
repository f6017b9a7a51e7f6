use std::time::Duration;

use reqwest::header::{ACCEPT, HeaderValue};
use reqwest::multipart::{Form, Part};
use reqwest::Client;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::error::SchedulerClientResult;
use crate::outcome::{DataShape, Outcome, normalize, parse_body};
use crate::request::{ApiRequest, FormField, FormValue, Payload, RequestBody};
use crate::session::Session;

/// Адрес API по умолчанию.
pub const DEFAULT_BASE_URL: &str = "http://127.0.0.1:8000";

#[derive(Debug, Clone)]
/// Настройки HTTP-клиента.
pub struct ClientConfig {
    /// Базовый URL API, например `http://127.0.0.1:8000`.
    pub base_url: String,
    /// Таймаут установки соединения.
    pub connect_timeout: Duration,
    /// Общий таймаут запроса.
    pub request_timeout: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            connect_timeout: Duration::from_secs(5),
            request_timeout: Duration::from_secs(15),
        }
    }
}

impl ClientConfig {
    /// Настройки по умолчанию с другим базовым URL.
    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            ..Self::default()
        }
    }
}

/// Добавляет схему `http://`, если её нет, и убирает завершающий `/`.
pub fn normalize_base_url(raw: &str) -> String {
    let raw = raw.trim();
    let with_scheme = if raw.starts_with("http://") || raw.starts_with("https://") {
        raw.to_string()
    } else {
        format!("http://{raw}")
    };
    with_scheme.trim_end_matches('/').to_string()
}

#[derive(Debug, Clone)]
/// HTTP-клиент API планировщика.
///
/// Собирает запросы по общему контракту (заголовки, кодирование тела,
/// bearer-токен из сессии) и нормализует ответы в [`Outcome`].
pub struct ApiClient {
    base_url: String,
    client: Client,
    session: Session,
}

impl ApiClient {
    /// Создаёт клиент поверх переданной сессии.
    pub fn new(config: ClientConfig, session: Session) -> SchedulerClientResult<Self> {
        let client = Client::builder()
            .connect_timeout(config.connect_timeout)
            .timeout(config.request_timeout)
            .build()?;

        Ok(Self {
            base_url: normalize_base_url(&config.base_url),
            client,
            session,
        })
    }

    /// Сессия, которую использует клиент.
    pub fn session(&self) -> &Session {
        &self.session
    }

    /// Базовый URL.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    /// Отправляет запрос и берёт данные из поля `data` ответа.
    pub async fn send<T: DeserializeOwned>(&self, request: ApiRequest, fallback: &str) -> Outcome<T> {
        self.dispatch(request, DataShape::Enveloped, fallback).await
    }

    /// универсальный helper для запросов с сериализуемой нагрузкой
    ///
    /// Кодирование тела выбирается по содержимому: объект без файлов уходит
    /// как JSON.
    pub async fn send_json<TReq, TRes>(
        &self,
        request: ApiRequest,
        body: &TReq,
        fallback: &str,
    ) -> Outcome<TRes>
    where
        TReq: Serialize,
        TRes: DeserializeOwned,
    {
        match Payload::from_serialize(body) {
            Ok(payload) => self.send(request.with_payload(payload), fallback).await,
            Err(err) => {
                tracing::warn!(error = %err, path = %request.path, "failed to encode request payload");
                Outcome::failed(fallback)
            }
        }
    }

    /// Отправляет запрос и берёт в качестве данных всё тело ответа.
    pub async fn send_raw(&self, request: ApiRequest, fallback: &str) -> Outcome<Value> {
        self.dispatch(request, DataShape::Raw, fallback).await
    }

    async fn dispatch<T: DeserializeOwned>(
        &self,
        request: ApiRequest,
        shape: DataShape,
        fallback: &str,
    ) -> Outcome<T> {
        let (method, path, query, body) = request.into_wire();
        let token = self.session.token();

        tracing::debug!(
            %method,
            path = %path,
            encoding = body.encoding(),
            authorized = token.is_some(),
            "sending api request"
        );

        let mut builder = self
            .client
            .request(method.clone(), self.endpoint(&path))
            .header(ACCEPT, HeaderValue::from_static("application/json"));
        if !query.is_empty() {
            builder = builder.query(&query);
        }
        if let Some(token) = token.as_deref() {
            builder = builder.bearer_auth(token);
        }
        builder = match body {
            RequestBody::Empty => builder,
            RequestBody::Json(json) => builder.json(&json),
            RequestBody::Multipart(fields) => match build_form(fields) {
                Ok(form) => builder.multipart(form),
                Err(err) => {
                    tracing::warn!(error = %err, "failed to build multipart body");
                    return Outcome::failed(fallback);
                }
            },
        };

        let response = match builder.send().await {
            Ok(response) => response,
            Err(err) => {
                tracing::warn!(%method, path = %path, error = %err, "api request failed");
                return Outcome::failed(fallback);
            }
        };

        let status = response.status().as_u16();
        let bytes = match response.bytes().await {
            Ok(bytes) => bytes,
            Err(err) => {
                tracing::warn!(%method, path = %path, error = %err, "failed to read api response");
                return Outcome::failed(fallback);
            }
        };

        tracing::debug!(%method, path = %path, status, "api response received");
        normalize(status, parse_body(&bytes), shape, fallback)
    }
}

fn build_form(fields: Vec<FormField>) -> Result<Form, reqwest::Error> {
    let mut form = Form::new();
    for field in fields {
        form = match field.value {
            FormValue::Text(text) => form.text(field.name, text),
            FormValue::File(file) => {
                let part = Part::bytes(file.bytes)
                    .file_name(file.file_name)
                    .mime_str(&file.content_type)?;
                form.part(field.name, part)
            }
        };
    }
    Ok(form)
}
