use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::collections::HashSet;
use uuid::Uuid;
use validator::{Validate, ValidationError, ValidationErrors};

/// Select list and join producing [`Recipe`] rows, owner username included.
pub const RECIPE_SELECT: &str = "SELECT r.id, r.user_id, u.username, r.name, r.image_url, \
     r.duration, r.servings, r.created_at \
     FROM recipes r JOIN users u ON u.id = r.user_id";

/// Units an ingredient amount can be expressed in.
/// Corresponds to the `measurement_unit` SQL enum.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, sqlx::Type)]
#[sqlx(type_name = "measurement_unit", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum MeasurementUnit {
    Gram,
    Kilogram,
    Milliliter,
    Liter,
    Teaspoon,
    Tablespoon,
    Cup,
    Ounce,
    Pound,
    Piece,
    Pinch,
}

/// A recipe row joined with its owner's username.
#[derive(Debug, Serialize, Deserialize, FromRow, Clone)]
#[serde(rename_all = "camelCase")]
pub struct Recipe {
    pub id: Uuid,
    pub user_id: i32,
    pub username: String,
    pub name: String,
    pub image_url: Option<String>,
    /// Total time in minutes.
    pub duration: i32,
    pub servings: i32,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize, FromRow, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Ingredient {
    pub id: i32,
    pub recipe_id: Uuid,
    pub name: String,
    pub amount: f64,
    pub unit: MeasurementUnit,
}

#[derive(Debug, Serialize, Deserialize, FromRow, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Instruction {
    pub id: i32,
    pub recipe_id: Uuid,
    pub step: i32,
    pub instruction: String,
}

/// A recipe together with its child records, as returned by the detail endpoints.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecipeDetail {
    #[serde(flatten)]
    pub recipe: Recipe,
    pub ingredients: Vec<Ingredient>,
    /// Ordered by `step` ascending.
    pub instructions: Vec<Instruction>,
}

#[derive(Debug, Serialize, Deserialize, Validate, Clone)]
#[serde(rename_all = "camelCase")]
pub struct IngredientInput {
    #[validate(length(min = 1, max = 100))]
    pub name: String,
    #[validate(range(min = 0.0))]
    pub amount: f64,
    pub unit: MeasurementUnit,
}

#[derive(Debug, Serialize, Deserialize, Validate, Clone)]
#[serde(rename_all = "camelCase")]
pub struct InstructionInput {
    #[validate(range(min = 1))]
    pub step: i32,
    #[validate(length(min = 1, max = 2000))]
    pub instruction: String,
}

/// Input structure for creating or replacing a recipe.
///
/// On update the ingredient and instruction lists replace the stored ones wholesale.
#[derive(Debug, Serialize, Deserialize, Validate, Clone)]
#[serde(rename_all = "camelCase")]
pub struct RecipeInput {
    #[validate(length(min = 1, max = 200))]
    pub name: String,
    #[validate(range(min = 0, max = 10080))]
    pub duration: i32,
    #[validate(range(min = 1, max = 100))]
    pub servings: i32,
    #[serde(default)]
    #[validate(length(max = 100))]
    pub ingredients: Vec<IngredientInput>,
    #[serde(default)]
    #[validate(length(max = 100))]
    pub instructions: Vec<InstructionInput>,
}

impl RecipeInput {
    /// Trims every name and instruction text. Validate the result, not the raw payload.
    pub fn normalize(mut self) -> Self {
        self.name = self.name.trim().to_string();
        for ingredient in &mut self.ingredients {
            ingredient.name = ingredient.name.trim().to_string();
        }
        for instruction in &mut self.instructions {
            instruction.instruction = instruction.instruction.trim().to_string();
        }
        self
    }

    /// Validates the recipe, each child record, and that instruction steps are unique.
    pub fn validate_all(&self) -> Result<(), ValidationErrors> {
        self.validate()?;
        for ingredient in &self.ingredients {
            ingredient.validate()?;
        }
        for instruction in &self.instructions {
            instruction.validate()?;
        }

        let mut seen = HashSet::new();
        if !self.instructions.iter().all(|i| seen.insert(i.step)) {
            let mut errors = ValidationErrors::new();
            let mut error = ValidationError::new("unique_steps");
            error.message = Some("Instruction steps must be unique".into());
            errors.add("instructions", error);
            return Err(errors);
        }
        Ok(())
    }
}

/// Query parameters for `GET /api/recipes`.
#[derive(Debug, Serialize, Deserialize, Default)]
pub struct RecipeQuery {
    /// Case-insensitive substring of the recipe name.
    pub search: Option<String>,
}

impl RecipeQuery {
    /// The search term as an `ILIKE` pattern, with `%`, `_` and `\` escaped.
    /// Blank searches are ignored.
    pub fn like_pattern(&self) -> Option<String> {
        let term = self.search.as_deref()?.trim();
        if term.is_empty() {
            return None;
        }
        let mut escaped = String::with_capacity(term.len() + 2);
        for c in term.chars() {
            if matches!(c, '%' | '_' | '\\') {
                escaped.push('\\');
            }
            escaped.push(c);
        }
        Some(format!("%{}%", escaped))
    }
}

/// Result of `POST /api/recipes/{id}/favorite`.
#[derive(Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct FavoriteStatus {
    pub recipe_id: Uuid,
    pub favorited: bool,
}
