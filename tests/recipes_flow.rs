use foodgram_api::{
    config::AppConfig,
    db::{create_pool, run_migrations},
    dto::{
        auth::{LoginRequest, RegisterRequest},
        recipes::{CreateRecipeRequest, IngredientAmountInput, UpdateRecipeRequest},
    },
    error::AppError,
    middleware::auth::{AuthUser, ROLE_USER, decode_token},
    routes::params::{RecipeListQuery, SubscriptionQuery},
    services::{auth_service, follow_service, recipe_service, shopping_list_service, user_service},
    state::AppState,
};
use uuid::Uuid;

// Each test registers its own users, so the flows can share one database
// and run in parallel. Tags and ingredients are shared reference data.

#[tokio::test]
async fn shopping_list_sums_cart_recipes() -> anyhow::Result<()> {
    let Some(state) = setup_state().await? else {
        return Ok(());
    };

    let author = create_user(&state, "author").await?;
    let buyer = create_user(&state, "buyer").await?;
    let idle = create_user(&state, "idle").await?;

    let tag = tag_id(&state).await?;
    let flour = ingredient_id(&state, "Flour", "g").await?;
    let sugar = ingredient_id(&state, "Sugar", "g").await?;
    let egg = ingredient_id(&state, "Egg", "pcs").await?;

    let cake = create_recipe(&state, &author, "Cake", tag, &[(flour, 200), (sugar, 50)]).await?;
    let bread = create_recipe(&state, &author, "Bread", tag, &[(flour, 300), (egg, 2)]).await?;

    recipe_service::add_to_cart(&state, &buyer, cake).await?;
    recipe_service::add_to_cart(&state, &buyer, bread).await?;

    let duplicate = recipe_service::add_to_cart(&state, &buyer, cake)
        .await
        .unwrap_err();
    assert!(matches!(duplicate, AppError::BadRequest(_)));

    let list = shopping_list_service::generate(&state.pool, &buyer, "shopping_list.txt").await?;
    assert_eq!(
        list.body,
        "Список продуктов к покупке:\n- Egg - 2 pcs\n- Flour - 500 g\n- Sugar - 50 g\n"
    );
    assert_eq!(list.filename, "shopping_list.txt");

    // Another user's cart never leaks into this one.
    let empty = shopping_list_service::generate(&state.pool, &idle, "list.txt").await?;
    assert_eq!(empty.body, "Список продуктов к покупке:\n");
    assert!(empty.items.is_empty());

    recipe_service::remove_from_cart(&state, &buyer, bread).await?;
    let missing = recipe_service::remove_from_cart(&state, &buyer, bread)
        .await
        .unwrap_err();
    assert!(matches!(missing, AppError::NotFound));

    let list = shopping_list_service::generate(&state.pool, &buyer, "shopping_list.txt").await?;
    assert_eq!(
        list.body,
        "Список продуктов к покупке:\n- Flour - 200 g\n- Sugar - 50 g\n"
    );

    // Deleting a recipe drops it from every cart.
    recipe_service::delete_recipe(&state, &author, cake).await?;
    let list = shopping_list_service::generate(&state.pool, &buyer, "shopping_list.txt").await?;
    assert!(list.items.is_empty());

    Ok(())
}

#[tokio::test]
async fn recipes_are_filtered_and_owned() -> anyhow::Result<()> {
    let Some(state) = setup_state().await? else {
        return Ok(());
    };

    let author = create_user(&state, "owner").await?;
    let reader = create_user(&state, "reader").await?;
    let tag = tag_id(&state).await?;
    let flour = ingredient_id(&state, "Flour", "g").await?;

    let pancakes = create_recipe(&state, &author, "Pancakes", tag, &[(flour, 150)]).await?;
    let waffles = create_recipe(&state, &author, "Waffles", tag, &[(flour, 250)]).await?;

    let duplicate_name = create_recipe(&state, &author, "Pancakes", tag, &[(flour, 1)])
        .await
        .unwrap_err();
    assert!(matches!(
        duplicate_name.downcast_ref::<AppError>(),
        Some(AppError::BadRequest(_))
    ));

    let forbidden = recipe_service::update_recipe(
        &state,
        &reader,
        pancakes,
        UpdateRecipeRequest {
            name: Some("Stolen".into()),
            ..Default::default()
        },
    )
    .await
    .unwrap_err();
    assert!(matches!(forbidden, AppError::Forbidden));

    let updated = recipe_service::update_recipe(
        &state,
        &author,
        pancakes,
        UpdateRecipeRequest {
            cooking_time: Some(25),
            ..Default::default()
        },
    )
    .await?
    .data
    .expect("updated recipe");
    assert_eq!(updated.cooking_time, 25);
    assert_eq!(updated.name, "Pancakes");
    assert_eq!(updated.ingredients.len(), 1);

    recipe_service::add_favorite(&state, &reader, waffles).await?;
    let again = recipe_service::add_favorite(&state, &reader, waffles)
        .await
        .unwrap_err();
    assert!(matches!(again, AppError::BadRequest(_)));

    let favorites = recipe_service::list_recipes(
        &state,
        Some(&reader),
        RecipeListQuery {
            is_favorited: Some(true),
            ..Default::default()
        },
    )
    .await?;
    let items = favorites.data.expect("favorites").items;
    assert_eq!(items.len(), 1);
    assert_eq!(items[0].id, waffles);
    assert!(items[0].is_favorited);
    assert!(!items[0].is_in_shopping_cart);

    let by_author = recipe_service::list_recipes(
        &state,
        None,
        RecipeListQuery {
            author: Some(author.user_id),
            ..Default::default()
        },
    )
    .await?;
    assert_eq!(by_author.meta.and_then(|m| m.total), Some(2));
    let items = by_author.data.expect("recipes").items;
    assert!(items.iter().all(|r| !r.is_favorited));
    assert_eq!(items[0].author.id, author.user_id);

    let viewed = recipe_service::get_recipe(&state, Some(&reader), waffles)
        .await?
        .data
        .expect("recipe");
    assert!(viewed.is_favorited);
    assert_eq!(viewed.tags.len(), 1);

    recipe_service::remove_favorite(&state, &reader, waffles).await?;
    recipe_service::delete_recipe(&state, &author, waffles).await?;
    let gone = recipe_service::get_recipe(&state, None, waffles)
        .await
        .unwrap_err();
    assert!(matches!(gone, AppError::NotFound));

    Ok(())
}

#[tokio::test]
async fn follows_and_login_flow() -> anyhow::Result<()> {
    let Some(state) = setup_state().await? else {
        return Ok(());
    };

    let author = create_user(&state, "writer").await?;
    let (follower, email) = register(&state, "follower").await?;

    let token = auth_service::login_user(
        &state,
        LoginRequest {
            email: email.clone(),
            password: "s3cret-pass".into(),
        },
    )
    .await?
    .data
    .expect("token")
    .token;
    let decoded = decode_token(&state.config, &token)?;
    assert_eq!(decoded.user_id, follower.user_id);

    let bad_login = auth_service::login_user(
        &state,
        LoginRequest {
            email,
            password: "wrong-pass".into(),
        },
    )
    .await
    .unwrap_err();
    assert!(matches!(bad_login, AppError::BadRequest(_)));

    let tag = tag_id(&state).await?;
    let sugar = ingredient_id(&state, "Sugar", "g").await?;
    create_recipe(&state, &author, "Jam", tag, &[(sugar, 500)]).await?;
    create_recipe(&state, &author, "Syrup", tag, &[(sugar, 300)]).await?;

    let own = follow_service::subscribe(&state, &follower, follower.user_id, None)
        .await
        .unwrap_err();
    assert!(matches!(own, AppError::BadRequest(_)));

    let subscription = follow_service::subscribe(&state, &follower, author.user_id, Some(1))
        .await?
        .data
        .expect("subscription");
    assert!(subscription.author.is_subscribed);
    assert_eq!(subscription.recipes_count, 2);
    assert_eq!(subscription.recipes.len(), 1);

    let twice = follow_service::subscribe(&state, &follower, author.user_id, None)
        .await
        .unwrap_err();
    assert!(matches!(twice, AppError::BadRequest(_)));

    let listed = follow_service::list_subscriptions(
        &state,
        &follower,
        SubscriptionQuery {
            recipes_limit: Some(0),
            ..Default::default()
        },
    )
    .await?;
    let items = listed.data.expect("subscriptions").items;
    assert_eq!(items.len(), 1);
    assert!(items[0].recipes.is_empty());
    assert_eq!(items[0].recipes_count, 2);

    let profile = user_service::get_user(&state, Some(&follower), author.user_id)
        .await?
        .data
        .expect("profile");
    assert!(profile.is_subscribed);

    follow_service::unsubscribe(&state, &follower, author.user_id).await?;
    let missing = follow_service::unsubscribe(&state, &follower, author.user_id)
        .await
        .unwrap_err();
    assert!(matches!(missing, AppError::NotFound));

    Ok(())
}

#[tokio::test]
async fn concurrent_duplicates_are_bad_requests() -> anyhow::Result<()> {
    let Some(state) = setup_state().await? else {
        return Ok(());
    };

    let author = create_user(&state, "racer").await?;
    let tag = tag_id(&state).await?;
    let flour = ingredient_id(&state, "Flour", "g").await?;

    let ingredients = [(flour, 500)];
    let (first, second) = tokio::join!(
        create_recipe(&state, &author, "Focaccia", tag, &ingredients),
        create_recipe(&state, &author, "Focaccia", tag, &ingredients),
    );
    let failure = match (first, second) {
        (Ok(_), Err(err)) | (Err(err), Ok(_)) => err,
        other => panic!("expected exactly one recipe to be created, got {other:?}"),
    };
    assert!(matches!(
        failure.downcast_ref::<AppError>(),
        Some(AppError::BadRequest(_))
    ));

    let suffix = Uuid::new_v4().simple().to_string();
    let request = || RegisterRequest {
        email: format!("twin-{suffix}@example.com"),
        username: format!("twin_{}", &suffix[..12]),
        first_name: "Twin".into(),
        last_name: "User".into(),
        password: "s3cret-pass".into(),
    };
    let (first, second) = tokio::join!(
        auth_service::register_user(&state, request()),
        auth_service::register_user(&state, request()),
    );
    let failure = match (first, second) {
        (Ok(_), Err(err)) | (Err(err), Ok(_)) => err,
        other => panic!("expected exactly one registration to succeed, got {other:?}"),
    };
    assert!(matches!(failure, AppError::BadRequest(_)));

    Ok(())
}

async fn setup_state() -> anyhow::Result<Option<AppState>> {
    // Allow skipping when no DB is configured in the environment.
    let database_url = match std::env::var("TEST_DATABASE_URL")
        .or_else(|_| std::env::var("DATABASE_URL"))
    {
        Ok(url) => url,
        Err(_) => {
            eprintln!(
                "Skipping test: set TEST_DATABASE_URL or DATABASE_URL to run integration flow tests."
            );
            return Ok(None);
        }
    };

    let pool = create_pool(&database_url).await?;
    run_migrations(&pool).await?;

    let config = AppConfig {
        database_url,
        host: "127.0.0.1".into(),
        port: 0,
        jwt_secret: "flow-test-secret".into(),
        jwt_ttl_hours: 1,
        page_size: 6,
        shopping_list_filename: "shopping_list.txt".into(),
    };
    Ok(Some(AppState::new(pool, config)))
}

async fn register(state: &AppState, prefix: &str) -> anyhow::Result<(AuthUser, String)> {
    let suffix = Uuid::new_v4().simple().to_string();
    let email = format!("{prefix}-{suffix}@example.com");
    let user = auth_service::register_user(
        state,
        RegisterRequest {
            email: email.clone(),
            username: format!("{prefix}_{}", &suffix[..12]),
            first_name: "Test".into(),
            last_name: "User".into(),
            password: "s3cret-pass".into(),
        },
    )
    .await?
    .data
    .expect("registered user");

    Ok((
        AuthUser {
            user_id: user.id,
            role: ROLE_USER.into(),
        },
        email,
    ))
}

async fn create_user(state: &AppState, prefix: &str) -> anyhow::Result<AuthUser> {
    Ok(register(state, prefix).await?.0)
}

async fn tag_id(state: &AppState) -> anyhow::Result<Uuid> {
    let (id,): (Uuid,) = sqlx::query_as(
        r#"
        INSERT INTO tags (name, color, slug)
        VALUES ('Flow test', '#0A0B0C', 'flow-test')
        ON CONFLICT (slug) DO UPDATE SET name = EXCLUDED.name
        RETURNING id
        "#,
    )
    .fetch_one(&state.pool)
    .await?;
    Ok(id)
}

async fn ingredient_id(state: &AppState, name: &str, unit: &str) -> anyhow::Result<Uuid> {
    let (id,): (Uuid,) = sqlx::query_as(
        r#"
        INSERT INTO ingredients (name, measurement_unit)
        VALUES ($1, $2)
        ON CONFLICT (name, measurement_unit) DO UPDATE SET name = EXCLUDED.name
        RETURNING id
        "#,
    )
    .bind(name)
    .bind(unit)
    .fetch_one(&state.pool)
    .await?;
    Ok(id)
}

async fn create_recipe(
    state: &AppState,
    author: &AuthUser,
    name: &str,
    tag: Uuid,
    ingredients: &[(Uuid, i32)],
) -> anyhow::Result<Uuid> {
    let recipe = recipe_service::create_recipe(
        state,
        author,
        CreateRecipeRequest {
            name: name.into(),
            text: format!("How to make {name}."),
            image: None,
            cooking_time: 10,
            tags: vec![tag],
            ingredients: ingredients
                .iter()
                .map(|&(id, amount)| IngredientAmountInput { id, amount })
                .collect(),
        },
    )
    .await?
    .data
    .expect("created recipe");
    Ok(recipe.id)
}
