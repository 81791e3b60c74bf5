use std::collections::HashMap;

use serde::Deserialize;
use serde_json::Value;

use crate::models::Recipe;

/// TheMealDB exposes ingredients as `strIngredient1..20` / `strMeasure1..20`.
pub const INGREDIENT_SLOTS: usize = 20;

/// `GET /search.php?s=...` response. `meals` is `null` when nothing matched.
#[derive(Debug, Deserialize)]
pub struct MealDbSearchResponse {
    pub meals: Option<Vec<MealDbMeal>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MealDbMeal {
    pub str_meal: String,
    pub str_instructions: String,
    #[serde(default)]
    pub str_meal_thumb: Option<String>,
    #[serde(default)]
    pub str_source: Option<String>,
    // ingredient/measure slots and everything else we do not model
    #[serde(flatten)]
    pub slots: HashMap<String, Value>,
}

impl MealDbMeal {
    /// Validates the slot values and converts into our recipe shape.
    pub fn into_recipe(self) -> Result<Recipe, String> {
        let ingredients = self.ingredients()?;
        Ok(Recipe {
            name: self.str_meal,
            ingredients,
            instructions: self.str_instructions,
            image_url: non_blank(self.str_meal_thumb),
            source_url: non_blank(self.str_source),
        })
    }

    /// One "measure ingredient" string per populated slot, in slot order.
    fn ingredients(&self) -> Result<Vec<String>, String> {
        let mut out = Vec::new();
        for i in 1..=INGREDIENT_SLOTS {
            let ingredient = self.slot(&format!("strIngredient{i}"))?;
            let measure = self.slot(&format!("strMeasure{i}"))?;
            let Some(ingredient) = ingredient else {
                continue;
            };
            match measure {
                Some(measure) => out.push(format!("{measure} {ingredient}")),
                None => out.push(ingredient.to_string()),
            }
        }
        Ok(out)
    }

    // Absent, null and blank all mean "empty slot"; any non-string is a schema violation.
    fn slot(&self, key: &str) -> Result<Option<&str>, String> {
        match self.slots.get(key) {
            None | Some(Value::Null) => Ok(None),
            Some(Value::String(s)) => {
                let s = s.trim();
                Ok((!s.is_empty()).then_some(s))
            }
            Some(other) => Err(format!("{key} must be a string or null, got {other}")),
        }
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
