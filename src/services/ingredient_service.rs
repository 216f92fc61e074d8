use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder,
    Set,
};
use sea_orm::sea_query::Expr;
use sea_orm::sea_query::extension::postgres::PgExpr;
use uuid::Uuid;
use validator::Validate;

use crate::{
    audit,
    dto::ingredients::{CreateIngredientRequest, IngredientList},
    entity::ingredients::{
        ActiveModel as IngredientActive, Column as IngredientCol, Entity as Ingredients,
        Model as IngredientModel,
    },
    error::{AppError, AppResult},
    middleware::auth::{AuthUser, ensure_admin},
    models::Ingredient,
    response::{ApiResponse, Meta},
    routes::params::IngredientQuery,
    state::AppState,
};

pub async fn list_ingredients(
    state: &AppState,
    query: IngredientQuery,
) -> AppResult<ApiResponse<IngredientList>> {
    let mut condition = Condition::all();
    if let Some(name) = query.name.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
        let pattern = format!("{}%", escape_like(name));
        condition = condition.add(Expr::col(IngredientCol::Name).ilike(pattern));
    }

    let items: Vec<Ingredient> = Ingredients::find()
        .filter(condition)
        .order_by_asc(IngredientCol::Name)
        .order_by_asc(IngredientCol::MeasurementUnit)
        .all(&state.orm)
        .await?
        .into_iter()
        .map(ingredient_from_entity)
        .collect();

    Ok(ApiResponse::success("Ingredients", IngredientList { items }, None))
}

pub async fn get_ingredient(state: &AppState, id: Uuid) -> AppResult<ApiResponse<Ingredient>> {
    let ingredient = Ingredients::find_by_id(id)
        .one(&state.orm)
        .await?
        .map(ingredient_from_entity)
        .ok_or(AppError::NotFound)?;
    Ok(ApiResponse::success("Ingredient", ingredient, None))
}

pub async fn create_ingredient(
    state: &AppState,
    user: &AuthUser,
    payload: CreateIngredientRequest,
) -> AppResult<ApiResponse<Ingredient>> {
    ensure_admin(user)?;
    payload.validate()?;

    let exists = Ingredients::find()
        .filter(IngredientCol::Name.eq(payload.name.as_str()))
        .filter(IngredientCol::MeasurementUnit.eq(payload.measurement_unit.as_str()))
        .one(&state.orm)
        .await?;
    if exists.is_some() {
        return Err(AppError::BadRequest(
            "Ingredient with this unit already exists".into(),
        ));
    }

    let ingredient = IngredientActive {
        id: Set(Uuid::new_v4()),
        name: Set(payload.name),
        measurement_unit: Set(payload.measurement_unit),
    }
    .insert(&state.orm)
    .await?;

    audit::record(
        &state.pool,
        user.user_id,
        "ingredient_create",
        "ingredients",
        serde_json::json!({ "ingredient_id": ingredient.id }),
    )
    .await;

    Ok(ApiResponse::success(
        "Ingredient created",
        ingredient_from_entity(ingredient),
        Some(Meta::empty()),
    ))
}

pub async fn delete_ingredient(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
) -> AppResult<ApiResponse<serde_json::Value>> {
    ensure_admin(user)?;
    let result = Ingredients::delete_by_id(id).exec(&state.orm).await?;

    if result.rows_affected == 0 {
        return Err(AppError::NotFound);
    }

    audit::record(
        &state.pool,
        user.user_id,
        "ingredient_delete",
        "ingredients",
        serde_json::json!({ "ingredient_id": id }),
    )
    .await;

    Ok(ApiResponse::success(
        "Deleted",
        serde_json::json!({}),
        Some(Meta::empty()),
    ))
}

/// Fails with 400 unless every id names an existing ingredient.
pub(crate) async fn ensure_ingredients_exist<C>(conn: &C, ids: &[Uuid]) -> AppResult<()>
where
    C: sea_orm::ConnectionTrait,
{
    let found = Ingredients::find()
        .filter(IngredientCol::Id.is_in(ids.iter().copied()))
        .count(conn)
        .await?;
    if found as usize != ids.len() {
        return Err(AppError::BadRequest("Unknown ingredient id".into()));
    }
    Ok(())
}

/// Escapes LIKE wildcards so user input only ever matches literally.
pub fn escape_like(input: &str) -> String {
    let mut escaped = String::with_capacity(input.len());
    for c in input.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

fn ingredient_from_entity(model: IngredientModel) -> Ingredient {
    Ingredient {
        id: model.id,
        name: model.name,
        measurement_unit: model.measurement_unit,
    }
}
