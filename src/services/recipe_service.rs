use std::collections::{HashMap, HashSet};

use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, ConnectionTrait, EntityTrait, PaginatorTrait,
    QueryFilter, QueryOrder, QuerySelect, Set, TransactionTrait,
};
use sea_orm::ActiveValue::NotSet;
use sea_orm::sea_query::{Expr, OnConflict, Query};
use sqlx::FromRow;
use uuid::Uuid;
use validator::Validate;

use crate::{
    audit,
    db::DbPool,
    dto::recipes::{
        CreateRecipeRequest, IngredientAmountInput, RecipeList, UpdateRecipeRequest,
    },
    entity::{
        cart_entries::{ActiveModel as CartActive, Column as CartCol, Entity as CartEntries},
        favorites::{ActiveModel as FavoriteActive, Column as FavoriteCol, Entity as Favorites},
        recipe_ingredients::{
            ActiveModel as RecipeIngredientActive, Column as RecipeIngredientCol,
            Entity as RecipeIngredients,
        },
        recipe_tags::{
            ActiveModel as RecipeTagActive, Column as RecipeTagCol, Entity as RecipeTags,
        },
        recipes::{
            ActiveModel as RecipeActive, Column as RecipeCol, Entity as Recipes,
            Model as RecipeModel,
        },
        tags::{Column as TagCol, Entity as Tags},
    },
    error::{AppError, AppResult},
    middleware::auth::{AuthUser, ensure_owner_or_admin},
    models::{Recipe, RecipeIngredient, RecipeShort, Tag},
    response::{ApiResponse, Meta},
    routes::params::RecipeListQuery,
    services::{
        ingredient_service::ensure_ingredients_exist, tag_service::ensure_tags_exist,
        user_service::users_by_ids,
    },
    state::AppState,
};

#[derive(FromRow)]
struct RecipeTagRow {
    recipe_id: Uuid,
    #[sqlx(flatten)]
    tag: Tag,
}

#[derive(FromRow)]
struct RecipeIngredientRow {
    recipe_id: Uuid,
    #[sqlx(flatten)]
    ingredient: RecipeIngredient,
}

pub async fn list_recipes(
    state: &AppState,
    viewer: Option<&AuthUser>,
    query: RecipeListQuery,
) -> AppResult<ApiResponse<RecipeList>> {
    let window = query.pagination().normalize(state.config.page_size);
    let viewer_id = viewer.map(|v| v.user_id);

    let wants_favorites = query.is_favorited == Some(true);
    let wants_cart = query.is_in_shopping_cart == Some(true);
    if viewer_id.is_none() && (wants_favorites || wants_cart) {
        let meta = Meta::for_window(&window, 0);
        return Ok(ApiResponse::success("Recipes", RecipeList { items: Vec::new() }, Some(meta)));
    }

    let mut condition = Condition::all();
    if let Some(author) = query.author {
        condition = condition.add(RecipeCol::AuthorId.eq(author));
    }

    let slugs = query.tag_slugs();
    if !slugs.is_empty() {
        condition = condition.add(
            RecipeCol::Id.in_subquery(
                Query::select()
                    .column((RecipeTags, RecipeTagCol::RecipeId))
                    .from(RecipeTags)
                    .inner_join(
                        Tags,
                        Expr::col((Tags, TagCol::Id)).equals((RecipeTags, RecipeTagCol::TagId)),
                    )
                    .and_where(Expr::col((Tags, TagCol::Slug)).is_in(slugs))
                    .to_owned(),
            ),
        );
    }

    if let Some(viewer_id) = viewer_id {
        if let Some(flag) = query.is_favorited {
            let subquery = Query::select()
                .column(FavoriteCol::RecipeId)
                .from(Favorites)
                .and_where(FavoriteCol::UserId.eq(viewer_id))
                .to_owned();
            condition = condition.add(if flag {
                RecipeCol::Id.in_subquery(subquery)
            } else {
                RecipeCol::Id.not_in_subquery(subquery)
            });
        }
        if let Some(flag) = query.is_in_shopping_cart {
            let subquery = Query::select()
                .column(CartCol::RecipeId)
                .from(CartEntries)
                .and_where(CartCol::UserId.eq(viewer_id))
                .to_owned();
            condition = condition.add(if flag {
                RecipeCol::Id.in_subquery(subquery)
            } else {
                RecipeCol::Id.not_in_subquery(subquery)
            });
        }
    }

    let finder = Recipes::find()
        .filter(condition)
        .order_by_desc(RecipeCol::CreatedAt)
        .order_by_asc(RecipeCol::Id);

    let total = finder.clone().count(&state.orm).await? as i64;

    let models = finder
        .limit(window.limit as u64)
        .offset(window.offset as u64)
        .all(&state.orm)
        .await?;

    let items = hydrate(&state.pool, viewer_id, models).await?;
    let meta = Meta::for_window(&window, total);
    Ok(ApiResponse::success("Recipes", RecipeList { items }, Some(meta)))
}

pub async fn get_recipe(
    state: &AppState,
    viewer: Option<&AuthUser>,
    id: Uuid,
) -> AppResult<ApiResponse<Recipe>> {
    let model = Recipes::find_by_id(id)
        .one(&state.orm)
        .await?
        .ok_or(AppError::NotFound)?;
    let recipe = hydrate_one(&state.pool, viewer.map(|v| v.user_id), model).await?;
    Ok(ApiResponse::success("Recipe", recipe, None))
}

pub async fn create_recipe(
    state: &AppState,
    user: &AuthUser,
    payload: CreateRecipeRequest,
) -> AppResult<ApiResponse<Recipe>> {
    payload.validate()?;
    validate_tag_ids(&payload.tags)?;
    validate_ingredient_inputs(&payload.ingredients)?;
    ensure_tags_exist(&state.orm, &payload.tags).await?;
    let ingredient_ids: Vec<Uuid> = payload.ingredients.iter().map(|i| i.id).collect();
    ensure_ingredients_exist(&state.orm, &ingredient_ids).await?;
    ensure_name_free(&state.orm, user.user_id, &payload.name, None).await?;

    let txn = state.orm.begin().await?;
    let recipe = RecipeActive {
        id: Set(Uuid::new_v4()),
        author_id: Set(user.user_id),
        name: Set(payload.name),
        text: Set(payload.text),
        image: Set(payload.image),
        cooking_time: Set(payload.cooking_time),
        created_at: NotSet,
    }
    .insert(&txn)
    .await?;
    replace_tags(&txn, recipe.id, &payload.tags).await?;
    replace_ingredients(&txn, recipe.id, &payload.ingredients).await?;
    txn.commit().await?;

    tracing::info!(recipe_id = %recipe.id, author_id = %user.user_id, "recipe created");
    audit::record(
        &state.pool,
        user.user_id,
        "recipe_create",
        "recipes",
        serde_json::json!({ "recipe_id": recipe.id }),
    )
    .await;

    let recipe = hydrate_one(&state.pool, Some(user.user_id), recipe).await?;
    Ok(ApiResponse::success("Recipe created", recipe, Some(Meta::empty())))
}

pub async fn update_recipe(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
    payload: UpdateRecipeRequest,
) -> AppResult<ApiResponse<Recipe>> {
    let existing = Recipes::find_by_id(id)
        .one(&state.orm)
        .await?
        .ok_or(AppError::NotFound)?;
    ensure_owner_or_admin(user, existing.author_id)?;

    payload.validate()?;
    if let Some(tags) = payload.tags.as_ref() {
        validate_tag_ids(tags)?;
        ensure_tags_exist(&state.orm, tags).await?;
    }
    if let Some(ingredients) = payload.ingredients.as_ref() {
        validate_ingredient_inputs(ingredients)?;
        let ids: Vec<Uuid> = ingredients.iter().map(|i| i.id).collect();
        ensure_ingredients_exist(&state.orm, &ids).await?;
    }
    if let Some(name) = payload.name.as_ref().filter(|n| **n != existing.name) {
        ensure_name_free(&state.orm, existing.author_id, name, Some(existing.id)).await?;
    }

    let UpdateRecipeRequest {
        name,
        text,
        image,
        cooking_time,
        tags,
        ingredients,
    } = payload;

    let txn = state.orm.begin().await?;
    let original = existing.clone();
    let mut active: RecipeActive = existing.into();
    if let Some(name) = name {
        active.name = Set(name);
    }
    if let Some(text) = text {
        active.text = Set(text);
    }
    if let Some(image) = image {
        active.image = Set(Some(image));
    }
    if let Some(cooking_time) = cooking_time {
        active.cooking_time = Set(cooking_time);
    }
    let recipe = if active.is_changed() {
        active.update(&txn).await?
    } else {
        original
    };
    if let Some(tags) = tags.as_deref() {
        replace_tags(&txn, recipe.id, tags).await?;
    }
    if let Some(ingredients) = ingredients.as_deref() {
        replace_ingredients(&txn, recipe.id, ingredients).await?;
    }
    txn.commit().await?;

    tracing::info!(recipe_id = %recipe.id, user_id = %user.user_id, "recipe updated");
    audit::record(
        &state.pool,
        user.user_id,
        "recipe_update",
        "recipes",
        serde_json::json!({ "recipe_id": recipe.id }),
    )
    .await;

    let recipe = hydrate_one(&state.pool, Some(user.user_id), recipe).await?;
    Ok(ApiResponse::success("Updated", recipe, Some(Meta::empty())))
}

pub async fn delete_recipe(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
) -> AppResult<ApiResponse<serde_json::Value>> {
    let existing = Recipes::find_by_id(id)
        .one(&state.orm)
        .await?
        .ok_or(AppError::NotFound)?;
    ensure_owner_or_admin(user, existing.author_id)?;

    Recipes::delete_by_id(id).exec(&state.orm).await?;

    tracing::info!(recipe_id = %id, user_id = %user.user_id, "recipe deleted");
    audit::record(
        &state.pool,
        user.user_id,
        "recipe_delete",
        "recipes",
        serde_json::json!({ "recipe_id": id }),
    )
    .await;

    Ok(ApiResponse::success(
        "Deleted",
        serde_json::json!({}),
        Some(Meta::empty()),
    ))
}

pub async fn add_favorite(
    state: &AppState,
    user: &AuthUser,
    recipe_id: Uuid,
) -> AppResult<ApiResponse<RecipeShort>> {
    let recipe = find_short(&state.pool, recipe_id)
        .await?
        .ok_or(AppError::NotFound)?;

    let inserted = Favorites::insert(FavoriteActive {
        id: Set(Uuid::new_v4()),
        user_id: Set(user.user_id),
        recipe_id: Set(recipe_id),
        created_at: NotSet,
    })
    .on_conflict(
        OnConflict::columns([FavoriteCol::UserId, FavoriteCol::RecipeId])
            .do_nothing()
            .to_owned(),
    )
    .exec_without_returning(&state.orm)
    .await?;

    if inserted == 0 {
        return Err(AppError::BadRequest("Recipe is already in favorites".into()));
    }

    audit::record(
        &state.pool,
        user.user_id,
        "favorite_add",
        "favorites",
        serde_json::json!({ "recipe_id": recipe_id }),
    )
    .await;

    Ok(ApiResponse::success("Added to favorites", recipe, Some(Meta::empty())))
}

pub async fn remove_favorite(
    state: &AppState,
    user: &AuthUser,
    recipe_id: Uuid,
) -> AppResult<ApiResponse<serde_json::Value>> {
    if find_short(&state.pool, recipe_id).await?.is_none() {
        return Err(AppError::NotFound);
    }
    let result = Favorites::delete_many()
        .filter(FavoriteCol::UserId.eq(user.user_id))
        .filter(FavoriteCol::RecipeId.eq(recipe_id))
        .exec(&state.orm)
        .await?;

    if result.rows_affected == 0 {
        return Err(AppError::NotFound);
    }

    audit::record(
        &state.pool,
        user.user_id,
        "favorite_remove",
        "favorites",
        serde_json::json!({ "recipe_id": recipe_id }),
    )
    .await;

    Ok(ApiResponse::success(
        "Removed from favorites",
        serde_json::json!({}),
        Some(Meta::empty()),
    ))
}

pub async fn add_to_cart(
    state: &AppState,
    user: &AuthUser,
    recipe_id: Uuid,
) -> AppResult<ApiResponse<RecipeShort>> {
    let recipe = find_short(&state.pool, recipe_id)
        .await?
        .ok_or(AppError::NotFound)?;

    let inserted = CartEntries::insert(CartActive {
        id: Set(Uuid::new_v4()),
        user_id: Set(user.user_id),
        recipe_id: Set(recipe_id),
        created_at: NotSet,
    })
    .on_conflict(
        OnConflict::columns([CartCol::UserId, CartCol::RecipeId])
            .do_nothing()
            .to_owned(),
    )
    .exec_without_returning(&state.orm)
    .await?;

    if inserted == 0 {
        return Err(AppError::BadRequest("Recipe is already in the shopping cart".into()));
    }

    audit::record(
        &state.pool,
        user.user_id,
        "cart_add",
        "cart_entries",
        serde_json::json!({ "recipe_id": recipe_id }),
    )
    .await;

    Ok(ApiResponse::success("Added to shopping cart", recipe, Some(Meta::empty())))
}

pub async fn remove_from_cart(
    state: &AppState,
    user: &AuthUser,
    recipe_id: Uuid,
) -> AppResult<ApiResponse<serde_json::Value>> {
    if find_short(&state.pool, recipe_id).await?.is_none() {
        return Err(AppError::NotFound);
    }
    let result = CartEntries::delete_many()
        .filter(CartCol::UserId.eq(user.user_id))
        .filter(CartCol::RecipeId.eq(recipe_id))
        .exec(&state.orm)
        .await?;

    if result.rows_affected == 0 {
        return Err(AppError::NotFound);
    }

    audit::record(
        &state.pool,
        user.user_id,
        "cart_remove",
        "cart_entries",
        serde_json::json!({ "recipe_id": recipe_id }),
    )
    .await;

    Ok(ApiResponse::success(
        "Removed from shopping cart",
        serde_json::json!({}),
        Some(Meta::empty()),
    ))
}

/// A recipe needs at least one tag and may list each tag once.
pub fn validate_tag_ids(tags: &[Uuid]) -> AppResult<()> {
    if tags.is_empty() {
        return Err(AppError::BadRequest("At least one tag is required".into()));
    }
    let mut seen = HashSet::with_capacity(tags.len());
    if !tags.iter().all(|id| seen.insert(*id)) {
        return Err(AppError::BadRequest("Tags must not repeat".into()));
    }
    Ok(())
}

/// A recipe needs at least one ingredient, each listed once with amount >= 1.
pub fn validate_ingredient_inputs(ingredients: &[IngredientAmountInput]) -> AppResult<()> {
    if ingredients.is_empty() {
        return Err(AppError::BadRequest("At least one ingredient is required".into()));
    }
    let mut seen = HashSet::with_capacity(ingredients.len());
    for item in ingredients {
        item.validate()?;
        if !seen.insert(item.id) {
            return Err(AppError::BadRequest("Ingredients must not repeat".into()));
        }
    }
    Ok(())
}

async fn ensure_name_free<C>(
    conn: &C,
    author_id: Uuid,
    name: &str,
    except: Option<Uuid>,
) -> AppResult<()>
where
    C: ConnectionTrait,
{
    let mut finder = Recipes::find()
        .filter(RecipeCol::AuthorId.eq(author_id))
        .filter(RecipeCol::Name.eq(name));
    if let Some(except) = except {
        finder = finder.filter(RecipeCol::Id.ne(except));
    }
    if finder.one(conn).await?.is_some() {
        return Err(AppError::BadRequest(
            "You already have a recipe with this name".into(),
        ));
    }
    Ok(())
}

async fn replace_tags<C>(conn: &C, recipe_id: Uuid, tags: &[Uuid]) -> AppResult<()>
where
    C: ConnectionTrait,
{
    RecipeTags::delete_many()
        .filter(RecipeTagCol::RecipeId.eq(recipe_id))
        .exec(conn)
        .await?;
    if tags.is_empty() {
        return Ok(());
    }
    RecipeTags::insert_many(tags.iter().map(|tag_id| RecipeTagActive {
        id: Set(Uuid::new_v4()),
        recipe_id: Set(recipe_id),
        tag_id: Set(*tag_id),
    }))
    .exec_without_returning(conn)
    .await?;
    Ok(())
}

async fn replace_ingredients<C>(
    conn: &C,
    recipe_id: Uuid,
    ingredients: &[IngredientAmountInput],
) -> AppResult<()>
where
    C: ConnectionTrait,
{
    RecipeIngredients::delete_many()
        .filter(RecipeIngredientCol::RecipeId.eq(recipe_id))
        .exec(conn)
        .await?;
    if ingredients.is_empty() {
        return Ok(());
    }
    RecipeIngredients::insert_many(ingredients.iter().map(|item| RecipeIngredientActive {
        id: Set(Uuid::new_v4()),
        recipe_id: Set(recipe_id),
        ingredient_id: Set(item.id),
        amount: Set(item.amount),
    }))
    .exec_without_returning(conn)
    .await?;
    Ok(())
}

async fn find_short(pool: &DbPool, recipe_id: Uuid) -> AppResult<Option<RecipeShort>> {
    let recipe = sqlx::query_as::<_, RecipeShort>(
        "SELECT id, name, image, cooking_time FROM recipes WHERE id = $1",
    )
    .bind(recipe_id)
    .fetch_optional(pool)
    .await?;
    Ok(recipe)
}

async fn hydrate_one(
    pool: &DbPool,
    viewer: Option<Uuid>,
    model: RecipeModel,
) -> AppResult<Recipe> {
    hydrate(pool, viewer, vec![model])
        .await?
        .pop()
        .ok_or_else(|| AppError::Internal(anyhow::anyhow!("recipe vanished while loading")))
}

/// Loads authors, tags, ingredients and the caller's favorite/cart flags for
/// a page of recipes, keeping the input order.
async fn hydrate(
    pool: &DbPool,
    viewer: Option<Uuid>,
    models: Vec<RecipeModel>,
) -> AppResult<Vec<Recipe>> {
    if models.is_empty() {
        return Ok(Vec::new());
    }
    let ids: Vec<Uuid> = models.iter().map(|m| m.id).collect();
    let author_ids: Vec<Uuid> = models
        .iter()
        .map(|m| m.author_id)
        .collect::<HashSet<_>>()
        .into_iter()
        .collect();

    let authors = users_by_ids(pool, viewer, &author_ids).await?;

    let tag_rows = sqlx::query_as::<_, RecipeTagRow>(
        r#"
        SELECT rt.recipe_id, t.id, t.name, t.color, t.slug
        FROM recipe_tags rt
        JOIN tags t ON t.id = rt.tag_id
        WHERE rt.recipe_id = ANY($1)
        ORDER BY t.name
        "#,
    )
    .bind(&ids)
    .fetch_all(pool)
    .await?;

    let ingredient_rows = sqlx::query_as::<_, RecipeIngredientRow>(
        r#"
        SELECT ri.recipe_id, i.id, i.name, i.measurement_unit, ri.amount
        FROM recipe_ingredients ri
        JOIN ingredients i ON i.id = ri.ingredient_id
        WHERE ri.recipe_id = ANY($1)
        ORDER BY i.name, i.measurement_unit
        "#,
    )
    .bind(&ids)
    .fetch_all(pool)
    .await?;

    let (favorited, in_cart) = match viewer {
        Some(viewer) => (
            viewer_recipe_ids(pool, "favorites", viewer, &ids).await?,
            viewer_recipe_ids(pool, "cart_entries", viewer, &ids).await?,
        ),
        None => (HashSet::new(), HashSet::new()),
    };

    let mut tags: HashMap<Uuid, Vec<Tag>> = HashMap::new();
    for row in tag_rows {
        tags.entry(row.recipe_id).or_default().push(row.tag);
    }
    let mut ingredients: HashMap<Uuid, Vec<RecipeIngredient>> = HashMap::new();
    for row in ingredient_rows {
        ingredients
            .entry(row.recipe_id)
            .or_default()
            .push(row.ingredient);
    }

    let mut recipes = Vec::with_capacity(models.len());
    for model in models {
        // Several recipes may share an author, so clone rather than remove.
        let author = authors
            .get(&model.author_id)
            .cloned()
            .ok_or_else(|| AppError::Internal(anyhow::anyhow!("recipe author missing")))?;
        recipes.push(Recipe {
            id: model.id,
            author,
            name: model.name,
            text: model.text,
            image: model.image,
            cooking_time: model.cooking_time,
            tags: tags.remove(&model.id).unwrap_or_default(),
            ingredients: ingredients.remove(&model.id).unwrap_or_default(),
            is_favorited: favorited.contains(&model.id),
            is_in_shopping_cart: in_cart.contains(&model.id),
            created_at: model.created_at.with_timezone(&Utc),
        });
    }
    Ok(recipes)
}

/// Recipe ids among `ids` that `viewer` holds in `table` (`favorites` or `cart_entries`).
async fn viewer_recipe_ids(
    pool: &DbPool,
    table: &'static str,
    viewer: Uuid,
    ids: &[Uuid],
) -> AppResult<HashSet<Uuid>> {
    let rows: Vec<(Uuid,)> = sqlx::query_as(&format!(
        "SELECT recipe_id FROM {table} WHERE user_id = $1 AND recipe_id = ANY($2)"
    ))
    .bind(viewer)
    .bind(ids)
    .fetch_all(pool)
    .await?;
    Ok(rows.into_iter().map(|(id,)| id).collect())
}
