use std::collections::HashMap;

use sea_orm::{ColumnTrait, EntityTrait, QueryFilter, Set};
use sea_orm::ActiveValue::NotSet;
use sea_orm::sea_query::OnConflict;
use sqlx::FromRow;
use uuid::Uuid;

use crate::{
    audit,
    db::DbPool,
    dto::users::SubscriptionList,
    entity::follows::{ActiveModel as FollowActive, Column as FollowCol, Entity as Follows},
    error::{AppError, AppResult},
    middleware::auth::AuthUser,
    models::{RecipeShort, Subscription, User},
    response::{ApiResponse, Meta},
    routes::params::SubscriptionQuery,
    services::user_service::{USER_COLUMNS, find_user},
    state::AppState,
};

#[derive(FromRow)]
struct AuthorRecipeRow {
    author_id: Uuid,
    #[sqlx(flatten)]
    recipe: RecipeShort,
}

pub async fn subscribe(
    state: &AppState,
    user: &AuthUser,
    author_id: Uuid,
    recipes_limit: Option<i64>,
) -> AppResult<ApiResponse<Subscription>> {
    if author_id == user.user_id {
        return Err(AppError::BadRequest("You cannot subscribe to yourself".into()));
    }
    if find_user(&state.pool, Some(user.user_id), author_id)
        .await?
        .is_none()
    {
        return Err(AppError::NotFound);
    }

    let inserted = Follows::insert(FollowActive {
        id: Set(Uuid::new_v4()),
        user_id: Set(user.user_id),
        author_id: Set(author_id),
        created_at: NotSet,
    })
    .on_conflict(
        OnConflict::columns([FollowCol::UserId, FollowCol::AuthorId])
            .do_nothing()
            .to_owned(),
    )
    .exec_without_returning(&state.orm)
    .await?;

    if inserted == 0 {
        return Err(AppError::BadRequest("Already subscribed to this author".into()));
    }

    tracing::info!(user_id = %user.user_id, %author_id, "subscribed");
    audit::record(
        &state.pool,
        user.user_id,
        "follow_add",
        "follows",
        serde_json::json!({ "author_id": author_id }),
    )
    .await;

    let author = find_user(&state.pool, Some(user.user_id), author_id)
        .await?
        .ok_or(AppError::NotFound)?;
    let mut subscriptions = attach_recipes(&state.pool, vec![author], recipes_limit).await?;
    let subscription = subscriptions
        .pop()
        .ok_or_else(|| AppError::Internal(anyhow::anyhow!("subscription vanished")))?;

    Ok(ApiResponse::success("Subscribed", subscription, Some(Meta::empty())))
}

pub async fn unsubscribe(
    state: &AppState,
    user: &AuthUser,
    author_id: Uuid,
) -> AppResult<ApiResponse<serde_json::Value>> {
    let result = Follows::delete_many()
        .filter(FollowCol::UserId.eq(user.user_id))
        .filter(FollowCol::AuthorId.eq(author_id))
        .exec(&state.orm)
        .await?;

    if result.rows_affected == 0 {
        return Err(AppError::NotFound);
    }

    tracing::info!(user_id = %user.user_id, %author_id, "unsubscribed");
    audit::record(
        &state.pool,
        user.user_id,
        "follow_remove",
        "follows",
        serde_json::json!({ "author_id": author_id }),
    )
    .await;

    Ok(ApiResponse::success(
        "Unsubscribed",
        serde_json::json!({}),
        Some(Meta::empty()),
    ))
}

pub async fn list_subscriptions(
    state: &AppState,
    user: &AuthUser,
    query: SubscriptionQuery,
) -> AppResult<ApiResponse<SubscriptionList>> {
    let window = query.pagination().normalize(state.config.page_size);
    let authors = sqlx::query_as::<_, User>(&format!(
        r#"
        SELECT {USER_COLUMNS}
        FROM follows s
        JOIN users u ON u.id = s.author_id
        WHERE s.user_id = $1
        ORDER BY s.created_at DESC
        LIMIT $2 OFFSET $3
        "#
    ))
    .bind(user.user_id)
    .bind(window.limit)
    .bind(window.offset)
    .fetch_all(&state.pool)
    .await?;

    let total: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM follows WHERE user_id = $1")
        .bind(user.user_id)
        .fetch_one(&state.pool)
        .await?;

    let items = attach_recipes(&state.pool, authors, query.recipes_limit).await?;
    let meta = Meta::for_window(&window, total.0);
    Ok(ApiResponse::success("OK", SubscriptionList { items }, Some(meta)))
}

/// Pairs each author with their recipes, newest first, truncated to `recipes_limit`.
async fn attach_recipes(
    pool: &DbPool,
    authors: Vec<User>,
    recipes_limit: Option<i64>,
) -> AppResult<Vec<Subscription>> {
    let author_ids: Vec<Uuid> = authors.iter().map(|a| a.id).collect();
    let rows = if author_ids.is_empty() {
        Vec::new()
    } else {
        sqlx::query_as::<_, AuthorRecipeRow>(
            r#"
            SELECT r.author_id, r.id, r.name, r.image, r.cooking_time
            FROM recipes r
            WHERE r.author_id = ANY($1)
            ORDER BY r.created_at DESC
            "#,
        )
        .bind(&author_ids)
        .fetch_all(pool)
        .await?
    };

    let mut by_author: HashMap<Uuid, Vec<RecipeShort>> = HashMap::new();
    for row in rows {
        by_author.entry(row.author_id).or_default().push(row.recipe);
    }

    let limit = recipes_limit.filter(|l| *l >= 0).map(|l| l as usize);
    Ok(authors
        .into_iter()
        .map(|author| {
            let mut recipes = by_author.remove(&author.id).unwrap_or_default();
            let recipes_count = recipes.len() as i64;
            if let Some(limit) = limit {
                recipes.truncate(limit);
            }
            Subscription {
                author,
                recipes,
                recipes_count,
            }
        })
        .collect())
}
