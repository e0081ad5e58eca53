use super::{
    types::{PageMeta, Post, PostCollection, PostInput, PostsQuery},
    validation::validate_post_input,
};
use crate::{AppState, auth::AuthUser, error::ApiError};
use axum::{
    Json,
    body::Bytes,
    extract::{
        FromRequest, Path, Query, Request, State,
        rejection::{JsonRejection, QueryRejection},
    },
    http::{
        HeaderMap, HeaderValue, StatusCode,
        header::{CONTENT_TYPE, LOCATION},
    },
    response::IntoResponse,
};
use tracing::info;

const MAX_PER_PAGE: usize = 100;

pub async fn list_posts(
    user: AuthUser,
    State(app_state): State<AppState>,
    query: Result<Query<PostsQuery>, QueryRejection>,
) -> Result<Json<PostCollection>, ApiError> {
    let Query(query) = query.map_err(|rejection| ApiError::InvalidQuery(rejection.body_text()))?;

    let Some(page) = query.page else {
        let data = app_state.store.list().await;
        return Ok(Json(PostCollection { data, meta: None }));
    };

    let page = page.max(1);
    let per_page = query
        .per_page
        .unwrap_or(app_state.config.posts.per_page)
        .clamp(1, MAX_PER_PAGE);

    let (data, total) = app_state.store.page(page, per_page).await;
    tracing::debug!(
        "{} listed page {} ({} of {} posts)",
        user.username,
        page,
        data.len(),
        total
    );

    Ok(Json(PostCollection {
        data,
        meta: Some(PageMeta {
            current_page: page,
            per_page,
            total,
            last_page: total.div_ceil(per_page).max(1),
        }),
    }))
}

pub async fn create_post(
    user: AuthUser,
    State(app_state): State<AppState>,
    PostPayload(input): PostPayload,
) -> Result<impl IntoResponse, ApiError> {
    let title = validate_post_input(&input).map_err(ApiError::ValidationFailed)?;

    let post = app_state.store.create(title).await?;
    info!("{} created post {}", user.username, post.id);

    let location = format!(
        "{}/posts/{}",
        app_state.config.server.normalized_api_prefix(),
        post.id
    );
    let mut headers = HeaderMap::new();
    if let Ok(value) = HeaderValue::from_str(&location) {
        headers.insert(LOCATION, value);
    }

    Ok((StatusCode::CREATED, headers, Json(post)))
}

pub async fn show_post(
    _user: AuthUser,
    State(app_state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Post>, ApiError> {
    let id = parse_id(&id)?;
    let post = app_state
        .store
        .get(id)
        .await
        .ok_or(ApiError::NotFound("Post"))?;

    Ok(Json(post))
}

pub async fn update_post(
    user: AuthUser,
    State(app_state): State<AppState>,
    Path(id): Path<String>,
    PostPayload(input): PostPayload,
) -> Result<Json<Post>, ApiError> {
    let id = parse_id(&id)?;
    if app_state.store.get(id).await.is_none() {
        return Err(ApiError::NotFound("Post"));
    }

    let title = validate_post_input(&input).map_err(ApiError::ValidationFailed)?;

    // The row can disappear between the lookup and the write
    let post = app_state
        .store
        .update(id, title)
        .await?
        .ok_or(ApiError::NotFound("Post"))?;
    info!("{} updated post {}", user.username, post.id);

    Ok(Json(post))
}

pub async fn delete_post(
    user: AuthUser,
    State(app_state): State<AppState>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    let id = parse_id(&id)?;
    if !app_state.store.delete(id).await? {
        return Err(ApiError::NotFound("Post"));
    }

    info!("{} deleted post {}", user.username, id);
    Ok(StatusCode::NO_CONTENT)
}

/// Ids are plain decimal digits without a sign or leading zeros; any other
/// spelling cannot name a stored row.
fn parse_id(raw: &str) -> Result<u64, ApiError> {
    let canonical = !raw.is_empty()
        && raw.bytes().all(|b| b.is_ascii_digit())
        && (raw == "0" || !raw.starts_with('0'));
    if !canonical {
        return Err(ApiError::NotFound("Post"));
    }
    raw.parse().map_err(|_| ApiError::NotFound("Post"))
}

/// Create/update body.
///
/// An empty body, a body without a JSON content type, or JSON that is not an
/// object all count as empty input and fail validation like any other missing
/// field. Only syntactically broken JSON is rejected outright.
#[derive(Debug)]
pub struct PostPayload(pub PostInput);

impl<S> FromRequest<S> for PostPayload
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let is_json = req
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .is_some_and(is_json_content_type);

        let bytes = Bytes::from_request(req, state)
            .await
            .map_err(|rejection| ApiError::MalformedBody(rejection.body_text()))?;

        if !is_json || bytes.iter().all(u8::is_ascii_whitespace) {
            return Ok(PostPayload(PostInput::default()));
        }

        match Json::<PostInput>::from_bytes(&bytes) {
            Ok(Json(input)) => Ok(PostPayload(input)),
            Err(JsonRejection::JsonDataError(_)) => Ok(PostPayload(PostInput::default())),
            Err(rejection) => Err(ApiError::MalformedBody(rejection.body_text())),
        }
    }
}

fn is_json_content_type(content_type: &str) -> bool {
    let essence = content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase();
    essence == "application/json" || essence.ends_with("+json")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_id_accepts_plain_digits_only() {
        assert_eq!(parse_id("42").unwrap(), 42);
        assert_eq!(parse_id("10").unwrap(), 10);
        for raw in ["", "+1", "-1", "01", "007", " 1", "1.0", "abc", "99999999999999999999999"] {
            assert!(matches!(parse_id(raw), Err(ApiError::NotFound(_))), "{raw}");
        }
    }

    #[test]
    fn test_json_content_type_detection() {
        assert!(is_json_content_type("application/json"));
        assert!(is_json_content_type("Application/JSON; charset=utf-8"));
        assert!(is_json_content_type("application/vnd.api+json"));
        assert!(!is_json_content_type("text/plain"));
        assert!(!is_json_content_type("application/x-www-form-urlencoded"));
    }
}
