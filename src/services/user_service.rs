use std::collections::HashMap;

use uuid::Uuid;

use crate::{
    db::DbPool,
    dto::users::UserList,
    error::{AppError, AppResult},
    middleware::auth::AuthUser,
    models::User,
    response::{ApiResponse, Meta},
    routes::params::Pagination,
    state::AppState,
};

/// Public user columns; `$1` is the viewer id (NULL for anonymous callers).
pub(crate) const USER_COLUMNS: &str = r#"
    u.id, u.email, u.username, u.first_name, u.last_name,
    EXISTS (
        SELECT 1 FROM follows f WHERE f.user_id = $1 AND f.author_id = u.id
    ) AS is_subscribed
"#;

pub async fn list_users(
    state: &AppState,
    viewer: Option<&AuthUser>,
    pagination: Pagination,
) -> AppResult<ApiResponse<UserList>> {
    let window = pagination.normalize(state.config.page_size);
    let items = sqlx::query_as::<_, User>(&format!(
        "SELECT {USER_COLUMNS} FROM users u ORDER BY u.username LIMIT $2 OFFSET $3"
    ))
    .bind(viewer.map(|v| v.user_id))
    .bind(window.limit)
    .bind(window.offset)
    .fetch_all(&state.pool)
    .await?;

    let total: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM users")
        .fetch_one(&state.pool)
        .await?;

    let meta = Meta::for_window(&window, total.0);
    Ok(ApiResponse::success("OK", UserList { items }, Some(meta)))
}

pub async fn get_user(
    state: &AppState,
    viewer: Option<&AuthUser>,
    id: Uuid,
) -> AppResult<ApiResponse<User>> {
    let user = find_user(&state.pool, viewer.map(|v| v.user_id), id)
        .await?
        .ok_or(AppError::NotFound)?;
    Ok(ApiResponse::success("User", user, None))
}

pub async fn me(state: &AppState, user: &AuthUser) -> AppResult<ApiResponse<User>> {
    let me = find_user(&state.pool, Some(user.user_id), user.user_id)
        .await?
        .ok_or(AppError::NotFound)?;
    Ok(ApiResponse::success("User", me, None))
}

pub(crate) async fn find_user(
    pool: &DbPool,
    viewer: Option<Uuid>,
    id: Uuid,
) -> AppResult<Option<User>> {
    let user = sqlx::query_as::<_, User>(&format!(
        "SELECT {USER_COLUMNS} FROM users u WHERE u.id = $2"
    ))
    .bind(viewer)
    .bind(id)
    .fetch_optional(pool)
    .await?;
    Ok(user)
}

/// Batch lookup keyed by user id, used when hydrating recipe authors.
pub(crate) async fn users_by_ids(
    pool: &DbPool,
    viewer: Option<Uuid>,
    ids: &[Uuid],
) -> AppResult<HashMap<Uuid, User>> {
    if ids.is_empty() {
        return Ok(HashMap::new());
    }
    let users = sqlx::query_as::<_, User>(&format!(
        "SELECT {USER_COLUMNS} FROM users u WHERE u.id = ANY($2)"
    ))
    .bind(viewer)
    .bind(ids)
    .fetch_all(pool)
    .await?;
    Ok(users.into_iter().map(|u| (u.id, u)).collect())
}
