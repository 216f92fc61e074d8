//! Provisions an admin account, the default tags and the ingredient catalogue.
//!
//! Usage: `seed [ingredients.json] [tags.json]` (defaults: `data/ingredients.json`, `data/tags.json`).

use std::path::Path;

use foodgram_api::{
    db::{DbPool, create_pool, run_migrations},
    middleware::auth::ROLE_ADMIN,
    services::auth_service::hash_password,
};
use serde::Deserialize;
use uuid::Uuid;

#[derive(Debug, Deserialize)]
struct IngredientSeed {
    name: String,
    measurement_unit: String,
}

#[derive(Debug, Deserialize)]
struct TagSeed {
    name: String,
    color: String,
    slug: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let database_url = std::env::var("DATABASE_URL")?;
    let pool = create_pool(&database_url).await?;
    // Ensure migrations are applied.
    run_migrations(&pool).await?;

    let mut args = std::env::args().skip(1);
    let ingredients_path = args
        .next()
        .unwrap_or_else(|| "data/ingredients.json".to_string());
    let tags_path = args.next().unwrap_or_else(|| "data/tags.json".to_string());

    let admin_email =
        std::env::var("ADMIN_EMAIL").unwrap_or_else(|_| "admin@example.com".to_string());
    let admin_password =
        std::env::var("ADMIN_PASSWORD").unwrap_or_else(|_| "admin12345".to_string());
    let admin_id = ensure_admin(&pool, &admin_email, &admin_password).await?;

    let tags: Vec<TagSeed> = read_json(&tags_path).await?;
    let tag_count = seed_tags(&pool, &tags).await?;

    let ingredients: Vec<IngredientSeed> = read_json(&ingredients_path).await?;
    let ingredient_count = seed_ingredients(&pool, &ingredients).await?;

    tracing::info!(
        %admin_id,
        tags = tag_count,
        ingredients = ingredient_count,
        "seed completed"
    );
    Ok(())
}

async fn read_json<T: serde::de::DeserializeOwned>(path: impl AsRef<Path>) -> anyhow::Result<T> {
    let path = path.as_ref();
    let raw = tokio::fs::read_to_string(path)
        .await
        .map_err(|e| anyhow::anyhow!("cannot read {}: {e}", path.display()))?;
    Ok(serde_json::from_str(&raw)?)
}

async fn ensure_admin(pool: &DbPool, email: &str, password: &str) -> anyhow::Result<Uuid> {
    let password_hash = hash_password(password).map_err(|e| anyhow::anyhow!(e.to_string()))?;
    let username = email.split('@').next().unwrap_or("admin");

    let (id,): (Uuid,) = sqlx::query_as(
        r#"
        INSERT INTO users (id, email, username, first_name, last_name, password_hash, role)
        VALUES ($1, $2, $3, 'Admin', 'Admin', $4, $5)
        ON CONFLICT (email) DO UPDATE SET role = EXCLUDED.role
        RETURNING id
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(email)
    .bind(username)
    .bind(password_hash)
    .bind(ROLE_ADMIN)
    .fetch_one(pool)
    .await?;

    tracing::info!(email, "ensured admin user");
    Ok(id)
}

async fn seed_tags(pool: &DbPool, tags: &[TagSeed]) -> anyhow::Result<u64> {
    let mut inserted = 0;
    for tag in tags {
        inserted += sqlx::query(
            r#"
            INSERT INTO tags (id, name, color, slug)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT DO NOTHING
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(&tag.name)
        .bind(&tag.color)
        .bind(&tag.slug)
        .execute(pool)
        .await?
        .rows_affected();
    }
    Ok(inserted)
}

async fn seed_ingredients(pool: &DbPool, ingredients: &[IngredientSeed]) -> anyhow::Result<u64> {
    let mut inserted = 0;
    for ingredient in ingredients {
        inserted += sqlx::query(
            r#"
            INSERT INTO ingredients (id, name, measurement_unit)
            VALUES ($1, $2, $3)
            ON CONFLICT (name, measurement_unit) DO NOTHING
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(&ingredient.name)
        .bind(&ingredient.measurement_unit)
        .execute(pool)
        .await?
        .rows_affected();
    }
    Ok(inserted)
}
