pub mod recipe;
pub mod user;

pub use recipe::{
    FavoriteStatus, Ingredient, IngredientInput, Instruction, InstructionInput, MeasurementUnit,
    Recipe, RecipeDetail, RecipeInput, RecipeQuery, RECIPE_SELECT,
};
pub use user::{UpdateProfileRequest, User, USER_COLUMNS};
