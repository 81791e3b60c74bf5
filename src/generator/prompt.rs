use crate::models::MealPlanRequest;

use super::tools::SEARCH_RECIPES;

pub fn system_instruction() -> String {
    format!(
        "You are a personal meal planning assistant. You only recommend real recipes \
that you have retrieved with the `{SEARCH_RECIPES}` tool; never invent a recipe.

When you are done searching, reply with JSON only, no prose, in exactly this shape:
{{\"mealPlan\": [{{\"name\": string, \"ingredients\": [string], \"instructions\": string, \
\"calories\": number, \"macros\": string, \"imageUrl\": string, \"sourceUrl\": string}}]}}
`calories`, `macros`, `imageUrl` and `sourceUrl` may be omitted when unknown. \
Copy `imageUrl` and `sourceUrl` verbatim from the search results."
    )
}

pub fn render(request: &MealPlanRequest) -> String {
    let n = request.number_of_meals();
    format!(
        "Generate a meal plan with {n} unique meals based on my preferences.

User Preferences:
- Dietary Restrictions: {diet}
- Cuisine Preferences: {cuisine}

Instructions:
1. Based on the cuisine preferences and dietary restrictions, come up with search queries to \
find suitable recipes. For example, for \"Italian\" and \"Vegetarian\" you could search for \
\"Vegetarian Lasagna\". Short queries such as a dish name or main ingredient work best.
2. Use the `{SEARCH_RECIPES}` tool to find real recipes for each meal. If a search returns \
nothing or an error, try a different query.
3. From the search results, select a variety of meals that best fit the request. DO NOT use \
the same meal twice.
4. For each selected meal, fill in its details (name, ingredients, instructions, imageUrl, \
sourceUrl) from the search result.
5. Also provide an estimated calorie count and a short macros summary for each meal.
6. Return the final plan as the JSON object described above, with exactly {n} meals.",
        diet = request.dietary_restrictions(),
        cuisine = request.cuisine_preferences(),
    )
}
