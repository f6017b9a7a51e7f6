//! Построение запросов: полезная нагрузка, выбор кодирования тела
//! (JSON или multipart) и подмена метода для multipart-обновлений.

use std::path::Path;

use reqwest::Method;
use serde::Serialize;
use serde_json::{Map, Number, Value};

use crate::error::{SchedulerClientError, SchedulerClientResult};

#[derive(Debug, Clone, PartialEq, Eq)]
/// Файл, прикладываемый к запросу.
pub struct FilePart {
    /// Имя файла, под которым он уходит на сервер.
    pub file_name: String,
    /// MIME-тип.
    pub content_type: String,
    /// Содержимое.
    pub bytes: Vec<u8>,
}

impl FilePart {
    /// Создаёт файл из памяти; MIME-тип определяется по расширению имени.
    pub fn new(file_name: impl Into<String>, bytes: Vec<u8>) -> Self {
        let file_name = file_name.into();
        let content_type = content_type_for(&file_name).to_string();
        Self {
            file_name,
            content_type,
            bytes,
        }
    }

    /// Читает файл с диска.
    pub async fn from_path(path: impl AsRef<Path>) -> SchedulerClientResult<Self> {
        let path = path.as_ref();
        let bytes = tokio::fs::read(path)
            .await
            .map_err(|source| SchedulerClientError::Upload {
                path: path.to_path_buf(),
                source,
            })?;
        let file_name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| "upload".to_string());
        Ok(Self::new(file_name, bytes))
    }
}

fn content_type_for(file_name: &str) -> &'static str {
    let ext = file_name
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .unwrap_or_default();
    match ext.as_str() {
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "svg" => "image/svg+xml",
        "mp4" => "video/mp4",
        _ => "application/octet-stream",
    }
}

#[derive(Debug, Clone, PartialEq)]
/// Значение поля полезной нагрузки.
pub enum PayloadValue {
    /// Пустое значение.
    Null,
    /// Логическое значение.
    Bool(bool),
    /// Число.
    Number(Number),
    /// Строка.
    Text(String),
    /// Массив; в multipart уходит повторяющимися полями `key[]`.
    List(Vec<PayloadValue>),
    /// Вложенный JSON-объект.
    Json(Value),
    /// Бинарный файл.
    File(FilePart),
}

impl PayloadValue {
    fn contains_file(&self) -> bool {
        match self {
            Self::File(_) => true,
            Self::List(items) => items.iter().any(Self::contains_file),
            _ => false,
        }
    }

    fn into_json(self) -> Value {
        match self {
            Self::Null | Self::File(_) => Value::Null,
            Self::Bool(value) => Value::Bool(value),
            Self::Number(value) => Value::Number(value),
            Self::Text(value) => Value::String(value),
            Self::List(items) => Value::Array(items.into_iter().map(Self::into_json).collect()),
            Self::Json(value) => value,
        }
    }

    fn into_form_value(self) -> FormValue {
        match self {
            Self::Null => FormValue::Text(String::new()),
            Self::Bool(value) => FormValue::Text(if value { "1" } else { "0" }.to_string()),
            Self::Number(value) => FormValue::Text(value.to_string()),
            Self::Text(value) => FormValue::Text(value),
            Self::List(items) => FormValue::Text(
                items
                    .into_iter()
                    .map(|item| match item.into_form_value() {
                        FormValue::Text(text) => text,
                        FormValue::File(file) => file.file_name,
                    })
                    .collect::<Vec<_>>()
                    .join(","),
            ),
            Self::Json(value) => FormValue::Text(value.to_string()),
            Self::File(file) => FormValue::File(file),
        }
    }
}

impl From<Value> for PayloadValue {
    fn from(value: Value) -> Self {
        match value {
            Value::Null => Self::Null,
            Value::Bool(value) => Self::Bool(value),
            Value::Number(value) => Self::Number(value),
            Value::String(value) => Self::Text(value),
            Value::Array(items) => Self::List(items.into_iter().map(Self::from).collect()),
            object @ Value::Object(_) => Self::Json(object),
        }
    }
}

impl From<FilePart> for PayloadValue {
    fn from(file: FilePart) -> Self {
        Self::File(file)
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
/// Упорядоченный набор полей запроса.
pub struct Payload {
    fields: Vec<(String, PayloadValue)>,
}

impl Payload {
    /// Пустая нагрузка.
    pub fn new() -> Self {
        Self::default()
    }

    /// Собирает нагрузку из сериализуемого объекта (поля верхнего уровня).
    pub fn from_serialize<T: Serialize>(value: &T) -> SchedulerClientResult<Self> {
        match serde_json::to_value(value)? {
            Value::Object(map) => Ok(map.into_iter().collect()),
            other => Err(SchedulerClientError::InvalidPayload(format!(
                "expected an object, got {other}"
            ))),
        }
    }

    /// Добавляет произвольное поле.
    pub fn field(mut self, key: impl Into<String>, value: impl Into<PayloadValue>) -> Self {
        self.fields.push((key.into(), value.into()));
        self
    }

    /// Добавляет строковое поле.
    pub fn text(self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.field(key, PayloadValue::Text(value.into()))
    }

    /// Добавляет файл.
    pub fn file(self, key: impl Into<String>, file: FilePart) -> Self {
        self.field(key, PayloadValue::File(file))
    }

    /// Есть ли среди полей бинарный файл.
    pub fn has_file(&self) -> bool {
        self.fields.iter().any(|(_, value)| value.contains_file())
    }

    /// Имена полей в порядке добавления.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|(key, _)| key.as_str())
    }

    /// Выбирает кодирование тела: multipart, если есть файл, иначе JSON.
    pub fn into_body(self) -> RequestBody {
        if self.has_file() {
            RequestBody::Multipart(self.into_form_fields())
        } else {
            let object: Map<String, Value> = self
                .fields
                .into_iter()
                .map(|(key, value)| (key, value.into_json()))
                .collect();
            RequestBody::Json(Value::Object(object))
        }
    }

    fn into_form_fields(self) -> Vec<FormField> {
        let mut form = Vec::with_capacity(self.fields.len());
        for (key, value) in self.fields {
            match value {
                PayloadValue::List(items) => {
                    let name = format!("{key}[]");
                    form.extend(items.into_iter().map(|item| FormField {
                        name: name.clone(),
                        value: item.into_form_value(),
                    }));
                }
                other => form.push(FormField {
                    name: key,
                    value: other.into_form_value(),
                }),
            }
        }
        form
    }
}

impl FromIterator<(String, Value)> for Payload {
    fn from_iter<I: IntoIterator<Item = (String, Value)>>(iter: I) -> Self {
        Self {
            fields: iter
                .into_iter()
                .map(|(key, value)| (key, PayloadValue::from(value)))
                .collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
/// Значение поля multipart-формы.
pub enum FormValue {
    /// Текстовое поле.
    Text(String),
    /// Файловое поле.
    File(FilePart),
}

#[derive(Debug, Clone, PartialEq)]
/// Поле multipart-формы.
pub struct FormField {
    /// Имя поля (`platforms[]` для элементов массива).
    pub name: String,
    /// Значение.
    pub value: FormValue,
}

#[derive(Debug, Clone, Default, PartialEq)]
/// Тело запроса, выбранное один раз на стороне вызова.
pub enum RequestBody {
    /// Без тела.
    #[default]
    Empty,
    /// JSON с `Content-Type: application/json`.
    Json(Value),
    /// `multipart/form-data`.
    Multipart(Vec<FormField>),
}

impl RequestBody {
    /// Короткое имя кодирования для логов.
    pub fn encoding(&self) -> &'static str {
        match self {
            Self::Empty => "empty",
            Self::Json(_) => "json",
            Self::Multipart(_) => "multipart",
        }
    }
}

#[derive(Debug, Clone)]
/// Логическая операция над API.
pub struct ApiRequest {
    /// HTTP-метод.
    pub method: Method,
    /// Путь относительно базового URL, например `/api/posts`.
    pub path: String,
    /// Параметры строки запроса.
    pub query: Vec<(String, String)>,
    /// Тело.
    pub body: RequestBody,
}

impl ApiRequest {
    /// Запрос с произвольным методом и без тела.
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            query: Vec::new(),
            body: RequestBody::Empty,
        }
    }

    /// `GET`.
    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::GET, path)
    }

    /// `POST`.
    pub fn post(path: impl Into<String>) -> Self {
        Self::new(Method::POST, path)
    }

    /// `PUT`.
    pub fn put(path: impl Into<String>) -> Self {
        Self::new(Method::PUT, path)
    }

    /// `DELETE`.
    pub fn delete(path: impl Into<String>) -> Self {
        Self::new(Method::DELETE, path)
    }

    /// Добавляет параметры строки запроса.
    pub fn with_query<I, K, V>(mut self, pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.query
            .extend(pairs.into_iter().map(|(k, v)| (k.into(), v.into())));
        self
    }

    /// Устанавливает тело, выбирая кодирование по содержимому нагрузки.
    pub fn with_payload(mut self, payload: Payload) -> Self {
        self.body = payload.into_body();
        self
    }

    /// Метод и тело в том виде, в каком они уйдут по сети.
    ///
    /// Multipart на `PUT`/`PATCH` отправляется как `POST` с полем `_method`.
    pub(crate) fn into_wire(self) -> (Method, String, Vec<(String, String)>, RequestBody) {
        let Self {
            method,
            path,
            query,
            body,
        } = self;

        match body {
            RequestBody::Multipart(fields) if method == Method::PUT || method == Method::PATCH => {
                let mut spoofed = Vec::with_capacity(fields.len() + 1);
                spoofed.push(FormField {
                    name: "_method".to_string(),
                    value: FormValue::Text(method.as_str().to_string()),
                });
                spoofed.extend(fields);
                (Method::POST, path, query, RequestBody::Multipart(spoofed))
            }
            body => (method, path, query, body),
        }
    }
}
