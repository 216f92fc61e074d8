use sea_orm::{ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder};
use uuid::Uuid;

use crate::{
    dto::tags::TagList,
    entity::tags::{Column as TagCol, Entity as Tags, Model as TagModel},
    error::{AppError, AppResult},
    models::Tag,
    response::ApiResponse,
    state::AppState,
};

pub async fn list_tags(state: &AppState) -> AppResult<ApiResponse<TagList>> {
    let items = Tags::find()
        .order_by_asc(TagCol::Name)
        .all(&state.orm)
        .await?
        .into_iter()
        .map(tag_from_entity)
        .collect();
    Ok(ApiResponse::success("Tags", TagList { items }, None))
}

pub async fn get_tag(state: &AppState, id: Uuid) -> AppResult<ApiResponse<Tag>> {
    let tag = Tags::find_by_id(id)
        .one(&state.orm)
        .await?
        .map(tag_from_entity)
        .ok_or(AppError::NotFound)?;
    Ok(ApiResponse::success("Tag", tag, None))
}

/// Fails with 400 unless every id names an existing tag.
pub(crate) async fn ensure_tags_exist<C>(conn: &C, ids: &[Uuid]) -> AppResult<()>
where
    C: sea_orm::ConnectionTrait,
{
    let found = Tags::find()
        .filter(TagCol::Id.is_in(ids.iter().copied()))
        .count(conn)
        .await?;
    if found as usize != ids.len() {
        return Err(AppError::BadRequest("Unknown tag id".into()));
    }
    Ok(())
}

fn tag_from_entity(model: TagModel) -> Tag {
    Tag {
        id: model.id,
        name: model.name,
        color: model.color,
        slug: model.slug,
    }
}
