use chrono::NaiveDateTime;
use serde_json::{Number, Value};

use crate::client::ApiClient;
use crate::models::{Post, PostForm, PostUpdate, SCHEDULED_TIME_FORMAT};
use crate::outcome::Outcome;
use crate::request::{ApiRequest, Payload, PayloadValue};
use crate::stores::StoreStatus;

const NOT_LOGGED_IN: &str = "You must be logged in.";

fn scheduled_value(time: NaiveDateTime) -> PayloadValue {
    PayloadValue::Text(time.format(SCHEDULED_TIME_FORMAT).to_string())
}

fn platforms_value(ids: Vec<i64>) -> PayloadValue {
    PayloadValue::List(
        ids.into_iter()
            .map(|id| PayloadValue::Number(Number::from(id)))
            .collect(),
    )
}

/// Поля нового поста в порядке, в котором их ждёт API.
///
/// С изображением нагрузка уйдёт как multipart, без него как JSON.
fn post_payload(form: PostForm) -> Payload {
    let payload = Payload::new()
        .text("title", form.title)
        .text("content", form.content)
        .field(
            "scheduled_time",
            form.scheduled_time.map_or(PayloadValue::Null, scheduled_value),
        )
        .text("status", form.status.unwrap_or_else(|| "draft".to_string()))
        .field("platforms", platforms_value(form.platforms));

    match form.image {
        Some(image) => payload.file("image_url", image),
        None => payload,
    }
}

/// Только заданные поля изменения; остальное на сервере не трогается.
fn update_payload(update: PostUpdate) -> Payload {
    let mut payload = Payload::new();
    if let Some(title) = update.title {
        payload = payload.text("title", title);
    }
    if let Some(content) = update.content {
        payload = payload.text("content", content);
    }
    if let Some(time) = update.scheduled_time {
        payload = payload.field("scheduled_time", scheduled_value(time));
    }
    if let Some(status) = update.status {
        payload = payload.text("status", status);
    }
    if let Some(platforms) = update.platforms {
        payload = payload.field("platforms", platforms_value(platforms));
    }
    if let Some(image) = update.image {
        payload = payload.file("image_url", image);
    }
    payload
}

#[derive(Debug, Clone)]
/// Посты: список, просмотр, создание, изменение, удаление.
pub struct PostsStore {
    api: ApiClient,
    status: StoreStatus,
}

impl PostsStore {
    /// Хранилище поверх клиента.
    pub fn new(api: ApiClient) -> Self {
        Self {
            api,
            status: StoreStatus::default(),
        }
    }

    /// Ошибки и сообщение последнего действия.
    pub fn status(&self) -> &StoreStatus {
        &self.status
    }

    /// Список постов с фильтрами строки запроса (`status=draft`, `page=2`, ...).
    ///
    /// При любой ошибке возвращается пустой список.
    pub async fn list_posts(&mut self, filters: &[(String, String)]) -> Vec<Post> {
        self.status.reset();
        let request = ApiRequest::get("/api/posts").with_query(filters.iter().cloned());
        let outcome: Outcome<Option<Vec<Post>>> =
            self.api.send(request, "Failed to fetch posts.").await;
        self.status.apply(&outcome, None);
        outcome.into_data().flatten().unwrap_or_default()
    }

    /// Пост по идентификатору вместе с его платформами.
    pub async fn get_post(&mut self, id: i64) -> Option<Post> {
        self.status.reset();
        let outcome: Outcome<Option<Post>> = self
            .api
            .send(ApiRequest::get(format!("/api/posts/{id}")), "Failed to fetch post.")
            .await;
        self.status.apply(&outcome, None);
        outcome.into_data().flatten()
    }

    /// Создаёт пост.
    pub async fn create_post(&mut self, form: PostForm) -> Option<Post> {
        self.status.reset();
        let request = ApiRequest::post("/api/posts").with_payload(post_payload(form));
        let outcome: Outcome<Option<Post>> =
            self.api.send(request, "Failed to create post.").await;
        self.status
            .apply(&outcome, Some("Post created successfully."));
        outcome.into_data().flatten()
    }

    /// Обновляет заданные поля поста. Требует пользователя в сессии.
    pub async fn update_post(&mut self, id: i64, update: PostUpdate) -> Option<Post> {
        self.status.reset();
        if !self.api.session().is_authenticated() {
            self.status.fail(NOT_LOGGED_IN);
            return None;
        }

        let request = ApiRequest::put(format!("/api/posts/{id}")).with_payload(update_payload(update));
        let outcome: Outcome<Option<Post>> =
            self.api.send(request, "Failed to update post.").await;
        self.status
            .apply(&outcome, Some("Post updated successfully."));
        outcome.into_data().flatten()
    }

    /// Удаляет пост. Требует пользователя в сессии.
    pub async fn delete_post(&mut self, id: i64) -> bool {
        self.status.reset();
        if !self.api.session().is_authenticated() {
            self.status.fail(NOT_LOGGED_IN);
            return false;
        }

        let outcome: Outcome<Value> = self
            .api
            .send(ApiRequest::delete(format!("/api/posts/{id}")), "Failed to delete post.")
            .await;
        self.status
            .apply(&outcome, Some("Post deleted successfully."));
        outcome.is_success()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::request::{FilePart, FormValue, RequestBody};
    use chrono::NaiveDate;
    use serde_json::json;

    fn form() -> PostForm {
        PostForm {
            title: "T".to_string(),
            content: "C".to_string(),
            scheduled_time: NaiveDate::from_ymd_opt(2026, 5, 1)
                .and_then(|date| date.and_hms_opt(9, 15, 0)),
            status: None,
            platforms: vec![1, 3],
            image: None,
        }
    }

    #[test]
    fn payload_without_image_is_json() {
        match post_payload(form()).into_body() {
            RequestBody::Json(body) => assert_eq!(
                body,
                json!({
                    "title": "T",
                    "content": "C",
                    "scheduled_time": "2026-05-01 09:15:00",
                    "status": "draft",
                    "platforms": [1, 3]
                })
            ),
            other => panic!("expected json body, got {other:?}"),
        }
    }

    #[test]
    fn payload_with_image_is_multipart() {
        let mut form = form();
        form.image = Some(FilePart::new("cover.jpg", vec![0xff, 0xd8]));

        let RequestBody::Multipart(fields) = post_payload(form).into_body() else {
            panic!("expected multipart body");
        };
        let names: Vec<_> = fields.iter().map(|field| field.name.as_str()).collect();
        assert_eq!(
            names,
            vec![
                "title",
                "content",
                "scheduled_time",
                "status",
                "platforms[]",
                "platforms[]",
                "image_url"
            ]
        );
        assert!(matches!(fields[6].value, FormValue::File(_)));
    }

    #[test]
    fn update_payload_sends_only_given_fields() {
        let update = PostUpdate {
            title: Some("New".to_string()),
            ..PostUpdate::default()
        };
        assert_eq!(
            update_payload(update).into_body(),
            RequestBody::Json(json!({"title": "New"}))
        );
    }

    #[test]
    fn update_payload_can_clear_platforms() {
        let update = PostUpdate {
            status: Some("scheduled".to_string()),
            platforms: Some(Vec::new()),
            ..PostUpdate::default()
        };
        assert_eq!(
            update_payload(update).into_body(),
            RequestBody::Json(json!({"status": "scheduled", "platforms": []}))
        );
    }
}
