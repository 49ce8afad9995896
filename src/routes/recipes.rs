use crate::{
    auth::{normalize_username, AuthenticatedUser},
    error::AppError,
    images::{discard_image, read_image_upload, store_image},
    models::{
        FavoriteStatus, Ingredient, Instruction, Recipe, RecipeDetail, RecipeInput, RecipeQuery,
        RECIPE_SELECT,
    },
    routes::auth::find_user,
    storage::BlobStore,
};
use actix_multipart::Multipart;
use actix_web::{delete, get, post, put, web, HttpResponse, Responder};
use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

async fn find_recipe(conn: &mut PgConnection, id: Uuid) -> Result<Option<Recipe>, AppError> {
    let recipe = sqlx::query_as::<_, Recipe>(&format!("{} WHERE r.id = $1", RECIPE_SELECT))
        .bind(id)
        .fetch_optional(conn)
        .await?;
    Ok(recipe)
}

async fn load_detail(conn: &mut PgConnection, id: Uuid) -> Result<RecipeDetail, AppError> {
    let recipe = find_recipe(&mut *conn, id)
        .await?
        .ok_or_else(|| AppError::NotFound("Recipe not found".into()))?;

    let ingredients = sqlx::query_as::<_, Ingredient>(
        "SELECT id, recipe_id, name, amount, unit FROM ingredients \
         WHERE recipe_id = $1 ORDER BY id",
    )
    .bind(id)
    .fetch_all(&mut *conn)
    .await?;

    let instructions = sqlx::query_as::<_, Instruction>(
        "SELECT id, recipe_id, step, instruction FROM instructions \
         WHERE recipe_id = $1 ORDER BY step ASC",
    )
    .bind(id)
    .fetch_all(&mut *conn)
    .await?;

    Ok(RecipeDetail {
        recipe,
        ingredients,
        instructions,
    })
}

/// Loads a recipe the caller is about to modify.
/// `404` if it does not exist, `403` if someone else owns it.
async fn find_owned_recipe(
    conn: &mut PgConnection,
    id: Uuid,
    user: &AuthenticatedUser,
) -> Result<Recipe, AppError> {
    let recipe = find_recipe(conn, id)
        .await?
        .ok_or_else(|| AppError::NotFound("Recipe not found".into()))?;
    user.ensure_owns(recipe.user_id)?;
    Ok(recipe)
}

/// Deletes every ingredient and instruction of `recipe_id`, then inserts the ones in `input`.
async fn replace_children(
    conn: &mut PgConnection,
    recipe_id: Uuid,
    input: &RecipeInput,
) -> Result<(), AppError> {
    sqlx::query("DELETE FROM ingredients WHERE recipe_id = $1")
        .bind(recipe_id)
        .execute(&mut *conn)
        .await?;
    sqlx::query("DELETE FROM instructions WHERE recipe_id = $1")
        .bind(recipe_id)
        .execute(&mut *conn)
        .await?;

    for ingredient in &input.ingredients {
        sqlx::query(
            "INSERT INTO ingredients (recipe_id, name, amount, unit) VALUES ($1, $2, $3, $4)",
        )
        .bind(recipe_id)
        .bind(&ingredient.name)
        .bind(ingredient.amount)
        .bind(ingredient.unit)
        .execute(&mut *conn)
        .await?;
    }

    for instruction in &input.instructions {
        sqlx::query("INSERT INTO instructions (recipe_id, step, instruction) VALUES ($1, $2, $3)")
            .bind(recipe_id)
            .bind(instruction.step)
            .bind(&instruction.instruction)
            .execute(&mut *conn)
            .await?;
    }

    Ok(())
}

/// Writes the scalar fields of `recipe_id`. `404` if the row is gone,
/// e.g. deleted by a concurrent request after the ownership check.
async fn update_recipe_row(
    conn: &mut PgConnection,
    recipe_id: Uuid,
    input: &RecipeInput,
) -> Result<(), AppError> {
    let updated =
        sqlx::query("UPDATE recipes SET name = $1, duration = $2, servings = $3 WHERE id = $4")
            .bind(&input.name)
            .bind(input.duration)
            .bind(input.servings)
            .bind(recipe_id)
            .execute(conn)
            .await?
            .rows_affected();

    if updated == 0 {
        return Err(AppError::NotFound("Recipe not found".into()));
    }
    Ok(())
}

/// Lists all recipes, newest first.
///
/// ## Query Parameters:
/// - `search` (optional): case-insensitive substring of the recipe name.
#[get("")]
pub async fn get_recipes(
    pool: web::Data<PgPool>,
    query_params: web::Query<RecipeQuery>,
) -> Result<impl Responder, AppError> {
    let recipes = match query_params.like_pattern() {
        Some(pattern) => {
            sqlx::query_as::<_, Recipe>(&format!(
                "{} WHERE r.name ILIKE $1 ORDER BY r.created_at DESC",
                RECIPE_SELECT
            ))
            .bind(pattern)
            .fetch_all(&**pool)
            .await?
        }
        None => {
            sqlx::query_as::<_, Recipe>(&format!("{} ORDER BY r.created_at DESC", RECIPE_SELECT))
                .fetch_all(&**pool)
                .await?
        }
    };

    Ok(HttpResponse::Ok().json(recipes))
}

/// Creates a recipe owned by the caller, with its ingredients and instructions.
///
/// The parent row and all child rows are written in one transaction.
///
/// ## Responses:
/// - `201 Created`: The new `RecipeDetail`.
/// - `400 Bad Request`: Validation failure (including duplicate instruction steps).
#[post("")]
pub async fn create_recipe(
    pool: web::Data<PgPool>,
    recipe_data: web::Json<RecipeInput>,
    user: AuthenticatedUser,
) -> Result<impl Responder, AppError> {
    let recipe_data = recipe_data.into_inner().normalize();
    recipe_data.validate_all()?;

    let recipe_id = Uuid::new_v4();
    let mut tx = pool.begin().await?;

    sqlx::query(
        "INSERT INTO recipes (id, user_id, name, duration, servings) VALUES ($1, $2, $3, $4, $5)",
    )
    .bind(recipe_id)
    .bind(user.id)
    .bind(&recipe_data.name)
    .bind(recipe_data.duration)
    .bind(recipe_data.servings)
    .execute(&mut *tx)
    .await?;

    replace_children(&mut tx, recipe_id, &recipe_data).await?;
    let detail = load_detail(&mut tx, recipe_id).await?;
    tx.commit().await?;

    log::info!("User {} created recipe {}", user.id, recipe_id);
    Ok(HttpResponse::Created().json(detail))
}

/// Lists the caller's favorited recipes, most recently favorited first.
#[get("/favorites")]
pub async fn get_favorites(
    pool: web::Data<PgPool>,
    user: AuthenticatedUser,
) -> Result<impl Responder, AppError> {
    let recipes = sqlx::query_as::<_, Recipe>(&format!(
        "{} JOIN user_favorites f ON f.recipe_id = r.id \
         WHERE f.user_id = $1 ORDER BY f.created_at DESC",
        RECIPE_SELECT
    ))
    .bind(user.id)
    .fetch_all(&**pool)
    .await?;

    Ok(HttpResponse::Ok().json(recipes))
}

/// Lists the recipes owned by `{username}`, newest first.
///
/// ## Responses:
/// - `404 Not Found`: No such user.
#[get("/user/{username}")]
pub async fn get_recipes_by_user(
    pool: web::Data<PgPool>,
    username: web::Path<String>,
) -> Result<impl Responder, AppError> {
    let username = normalize_username(&username);
    let owner = find_user(&pool, &username)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".into()))?;

    let recipes = sqlx::query_as::<_, Recipe>(&format!(
        "{} WHERE r.user_id = $1 ORDER BY r.created_at DESC",
        RECIPE_SELECT
    ))
    .bind(owner.id)
    .fetch_all(&**pool)
    .await?;

    Ok(HttpResponse::Ok().json(recipes))
}

/// Retrieves a recipe with its ingredients and ordered instructions.
#[get("/{id}")]
pub async fn get_recipe(
    pool: web::Data<PgPool>,
    recipe_id: web::Path<Uuid>,
) -> Result<impl Responder, AppError> {
    let mut conn = pool.acquire().await?;
    let detail = load_detail(&mut conn, recipe_id.into_inner()).await?;
    Ok(HttpResponse::Ok().json(detail))
}

/// Replaces a recipe the caller owns.
///
/// Scalar fields are updated in place; ingredients and instructions are replaced
/// wholesale, so afterwards they match the payload exactly. One transaction.
///
/// ## Responses:
/// - `200 OK`: The updated `RecipeDetail`.
/// - `403 Forbidden`: Someone else owns the recipe.
/// - `404 Not Found`: No such recipe.
#[put("/{id}")]
pub async fn update_recipe(
    pool: web::Data<PgPool>,
    recipe_id: web::Path<Uuid>,
    recipe_data: web::Json<RecipeInput>,
    user: AuthenticatedUser,
) -> Result<impl Responder, AppError> {
    let recipe_data = recipe_data.into_inner().normalize();
    recipe_data.validate_all()?;
    let recipe_id = recipe_id.into_inner();

    let mut tx = pool.begin().await?;
    find_owned_recipe(&mut tx, recipe_id, &user).await?;

    update_recipe_row(&mut tx, recipe_id, &recipe_data).await?;
    replace_children(&mut tx, recipe_id, &recipe_data).await?;
    let detail = load_detail(&mut tx, recipe_id).await?;
    tx.commit().await?;

    Ok(HttpResponse::Ok().json(detail))
}

/// Deletes a recipe the caller owns.
///
/// Ingredients, instructions and favorites go with it (`ON DELETE CASCADE`).
/// The recipe image is removed from the blob store on a best-effort basis.
///
/// ## Responses:
/// - `204 No Content`: Deleted.
/// - `403 Forbidden`: Someone else owns the recipe.
/// - `404 Not Found`: No such recipe.
#[delete("/{id}")]
pub async fn delete_recipe(
    pool: web::Data<PgPool>,
    store: web::Data<dyn BlobStore>,
    recipe_id: web::Path<Uuid>,
    user: AuthenticatedUser,
) -> Result<impl Responder, AppError> {
    let recipe_id = recipe_id.into_inner();
    let mut conn = pool.acquire().await?;
    let recipe = find_owned_recipe(&mut conn, recipe_id, &user).await?;

    let result = sqlx::query("DELETE FROM recipes WHERE id = $1 AND user_id = $2")
        .bind(recipe_id)
        .bind(user.id)
        .execute(&mut *conn)
        .await?;

    if result.rows_affected() == 0 {
        return Err(AppError::NotFound("Recipe not found".into()));
    }

    discard_image(store.get_ref(), recipe.image_url.as_deref()).await;

    log::info!("User {} deleted recipe {}", user.id, recipe_id);
    Ok(HttpResponse::NoContent().finish())
}

/// Flips whether the caller has favorited the recipe.
///
/// ## Responses:
/// - `200 OK`: `{recipeId, favorited}` describing the new state.
/// - `404 Not Found`: No such recipe.
#[post("/{id}/favorite")]
pub async fn toggle_favorite(
    pool: web::Data<PgPool>,
    recipe_id: web::Path<Uuid>,
    user: AuthenticatedUser,
) -> Result<impl Responder, AppError> {
    let recipe_id = recipe_id.into_inner();
    let mut tx = pool.begin().await?;

    if find_recipe(&mut tx, recipe_id).await?.is_none() {
        return Err(AppError::NotFound("Recipe not found".into()));
    }

    let removed = sqlx::query("DELETE FROM user_favorites WHERE user_id = $1 AND recipe_id = $2")
        .bind(user.id)
        .bind(recipe_id)
        .execute(&mut *tx)
        .await?
        .rows_affected();

    if removed == 0 {
        sqlx::query(
            "INSERT INTO user_favorites (user_id, recipe_id) VALUES ($1, $2) \
             ON CONFLICT (user_id, recipe_id) DO NOTHING",
        )
        .bind(user.id)
        .bind(recipe_id)
        .execute(&mut *tx)
        .await?;
    }

    tx.commit().await?;

    Ok(HttpResponse::Ok().json(FavoriteStatus {
        recipe_id,
        favorited: removed == 0,
    }))
}

/// Uploads a new image for a recipe the caller owns.
///
/// Same rules as profile images: one file field, JPEG/PNG/GIF, at most 5 MiB.
///
/// ## Responses:
/// - `200 OK`: The updated `RecipeDetail`.
/// - `400 Bad Request`: Missing file, unsupported type, or too large.
/// - `403 Forbidden`: Someone else owns the recipe.
/// - `404 Not Found`: No such recipe.
#[post("/{id}/image")]
pub async fn upload_recipe_image(
    pool: web::Data<PgPool>,
    store: web::Data<dyn BlobStore>,
    recipe_id: web::Path<Uuid>,
    payload: Multipart,
    user: AuthenticatedUser,
) -> Result<impl Responder, AppError> {
    let recipe_id = recipe_id.into_inner();
    let mut conn = pool.acquire().await?;
    let recipe = find_owned_recipe(&mut conn, recipe_id, &user).await?;

    let upload = read_image_upload(payload).await?;
    let url = store_image(store.get_ref(), "recipe", upload).await?;

    let updated = sqlx::query("UPDATE recipes SET image_url = $1 WHERE id = $2")
        .bind(&url)
        .bind(recipe_id)
        .execute(&mut *conn)
        .await;

    if let Err(e) = updated {
        discard_image(store.get_ref(), Some(&url)).await;
        return Err(e.into());
    }

    discard_image(store.get_ref(), recipe.image_url.as_deref()).await;

    let detail = load_detail(&mut conn, recipe_id).await?;
    Ok(HttpResponse::Ok().json(detail))
}
