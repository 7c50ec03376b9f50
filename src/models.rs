use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::schema::{food_categories, foods};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Queryable)]
pub(crate) struct Food {
    pub id: i32,
    pub name: String,
    pub source: String,
    pub category_id: i32,
    pub water: f64,
    pub energy: f64,
    pub protein: f64,
    pub fat: f64,
    pub carbohydrate: f64,
    pub fiber: f64,
    pub ash: f64,
    pub calcium: f64,
    pub phosphorus: f64,
    pub iron: f64,
    pub sodium: f64,
    pub potassium: f64,
    pub copper: f64,
    pub zinc: f64,
    pub retinol: f64,
    pub beta_carotene: f64,
    pub total_carotene: f64,
    pub thiamine: f64,
    pub riboflavin: f64,
    pub niacin: f64,
    pub vitamin_c: f64,
    pub edible_portion: f64,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

impl Food {
    pub(crate) fn list_from_u8(bytes: &[u8]) -> Result<Vec<Self>, bincode::Error> {
        bincode::deserialize(bytes)
    }

    pub(crate) fn list_to_u8(foods: &[Self]) -> Result<Vec<u8>, bincode::Error> {
        bincode::serialize(foods)
    }

    // value * serving_size / 100, no intermediate rounding
    pub(crate) fn scaled(&self, serving_size: f64) -> Food {
        let scale = |value: f64| value * serving_size / 100.0;
        Food {
            id: self.id,
            name: self.name.clone(),
            source: self.source.clone(),
            category_id: self.category_id,
            water: scale(self.water),
            energy: scale(self.energy),
            protein: scale(self.protein),
            fat: scale(self.fat),
            carbohydrate: scale(self.carbohydrate),
            fiber: scale(self.fiber),
            ash: scale(self.ash),
            calcium: scale(self.calcium),
            phosphorus: scale(self.phosphorus),
            iron: scale(self.iron),
            sodium: scale(self.sodium),
            potassium: scale(self.potassium),
            copper: scale(self.copper),
            zinc: scale(self.zinc),
            retinol: scale(self.retinol),
            beta_carotene: scale(self.beta_carotene),
            total_carotene: scale(self.total_carotene),
            thiamine: scale(self.thiamine),
            riboflavin: scale(self.riboflavin),
            niacin: scale(self.niacin),
            vitamin_c: scale(self.vitamin_c),
            edible_portion: scale(self.edible_portion),
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }

    pub(crate) fn nutrients_are_finite(&self) -> bool {
        [
            self.water,
            self.energy,
            self.protein,
            self.fat,
            self.carbohydrate,
            self.fiber,
            self.ash,
            self.calcium,
            self.phosphorus,
            self.iron,
            self.sodium,
            self.potassium,
            self.copper,
            self.zinc,
            self.retinol,
            self.beta_carotene,
            self.total_carotene,
            self.thiamine,
            self.riboflavin,
            self.niacin,
            self.vitamin_c,
            self.edible_portion,
        ]
        .iter()
        .all(|value| value.is_finite())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Queryable)]
pub(crate) struct FoodCategory {
    pub id: i32,
    pub name: String,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub(crate) struct CreateFoodInput {
    #[validate(length(min = 1, max = 255))]
    pub name: String,
    #[serde(default)]
    #[validate(length(max = 255))]
    pub source: String,
    pub category_id: i32,
    #[validate(range(min = 0.0))]
    pub water: f64,
    #[validate(range(min = 0.0))]
    pub energy: f64,
    #[validate(range(min = 0.0))]
    pub protein: f64,
    #[validate(range(min = 0.0))]
    pub fat: f64,
    #[validate(range(min = 0.0))]
    pub carbohydrate: f64,
    #[validate(range(min = 0.0))]
    pub fiber: f64,
    #[validate(range(min = 0.0))]
    pub ash: f64,
    #[validate(range(min = 0.0))]
    pub calcium: f64,
    #[validate(range(min = 0.0))]
    pub phosphorus: f64,
    #[validate(range(min = 0.0))]
    pub iron: f64,
    #[validate(range(min = 0.0))]
    pub sodium: f64,
    #[validate(range(min = 0.0))]
    pub potassium: f64,
    #[validate(range(min = 0.0))]
    pub copper: f64,
    #[validate(range(min = 0.0))]
    pub zinc: f64,
    #[validate(range(min = 0.0))]
    pub retinol: f64,
    #[validate(range(min = 0.0))]
    pub beta_carotene: f64,
    #[validate(range(min = 0.0))]
    pub total_carotene: f64,
    #[validate(range(min = 0.0))]
    pub thiamine: f64,
    #[validate(range(min = 0.0))]
    pub riboflavin: f64,
    #[validate(range(min = 0.0))]
    pub niacin: f64,
    #[validate(range(min = 0.0))]
    pub vitamin_c: f64,
    #[validate(range(min = 0.0))]
    pub edible_portion: f64,
}

#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub(crate) struct UpdateFoodInput {
    #[validate(length(min = 1, max = 255))]
    pub name: Option<String>,
    #[validate(length(max = 255))]
    pub source: Option<String>,
    pub category_id: Option<i32>,
    #[validate(range(min = 0.0))]
    pub water: Option<f64>,
    #[validate(range(min = 0.0))]
    pub energy: Option<f64>,
    #[validate(range(min = 0.0))]
    pub protein: Option<f64>,
    #[validate(range(min = 0.0))]
    pub fat: Option<f64>,
    #[validate(range(min = 0.0))]
    pub carbohydrate: Option<f64>,
    #[validate(range(min = 0.0))]
    pub fiber: Option<f64>,
    #[validate(range(min = 0.0))]
    pub ash: Option<f64>,
    #[validate(range(min = 0.0))]
    pub calcium: Option<f64>,
    #[validate(range(min = 0.0))]
    pub phosphorus: Option<f64>,
    #[validate(range(min = 0.0))]
    pub iron: Option<f64>,
    #[validate(range(min = 0.0))]
    pub sodium: Option<f64>,
    #[validate(range(min = 0.0))]
    pub potassium: Option<f64>,
    #[validate(range(min = 0.0))]
    pub copper: Option<f64>,
    #[validate(range(min = 0.0))]
    pub zinc: Option<f64>,
    #[validate(range(min = 0.0))]
    pub retinol: Option<f64>,
    #[validate(range(min = 0.0))]
    pub beta_carotene: Option<f64>,
    #[validate(range(min = 0.0))]
    pub total_carotene: Option<f64>,
    #[validate(range(min = 0.0))]
    pub thiamine: Option<f64>,
    #[validate(range(min = 0.0))]
    pub riboflavin: Option<f64>,
    #[validate(range(min = 0.0))]
    pub niacin: Option<f64>,
    #[validate(range(min = 0.0))]
    pub vitamin_c: Option<f64>,
    #[validate(range(min = 0.0))]
    pub edible_portion: Option<f64>,
}

impl UpdateFoodInput {
    pub(crate) fn is_empty(&self) -> bool {
        self.changeset(NaiveDateTime::MIN).is_noop()
    }

    pub(crate) fn changeset(&self, now: NaiveDateTime) -> FoodChangeset {
        FoodChangeset {
            name: self.name.clone(),
            source: self.source.clone(),
            category_id: self.category_id,
            water: self.water,
            energy: self.energy,
            protein: self.protein,
            fat: self.fat,
            carbohydrate: self.carbohydrate,
            fiber: self.fiber,
            ash: self.ash,
            calcium: self.calcium,
            phosphorus: self.phosphorus,
            iron: self.iron,
            sodium: self.sodium,
            potassium: self.potassium,
            copper: self.copper,
            zinc: self.zinc,
            retinol: self.retinol,
            beta_carotene: self.beta_carotene,
            total_carotene: self.total_carotene,
            thiamine: self.thiamine,
            riboflavin: self.riboflavin,
            niacin: self.niacin,
            vitamin_c: self.vitamin_c,
            edible_portion: self.edible_portion,
            updated_at: now,
        }
    }
}

#[derive(Debug, Clone, Insertable)]
#[table_name = "foods"]
pub(crate) struct NewFood {
    pub name: String,
    pub source: String,
    pub category_id: i32,
    pub water: f64,
    pub energy: f64,
    pub protein: f64,
    pub fat: f64,
    pub carbohydrate: f64,
    pub fiber: f64,
    pub ash: f64,
    pub calcium: f64,
    pub phosphorus: f64,
    pub iron: f64,
    pub sodium: f64,
    pub potassium: f64,
    pub copper: f64,
    pub zinc: f64,
    pub retinol: f64,
    pub beta_carotene: f64,
    pub total_carotene: f64,
    pub thiamine: f64,
    pub riboflavin: f64,
    pub niacin: f64,
    pub vitamin_c: f64,
    pub edible_portion: f64,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

impl NewFood {
    pub(crate) fn from_input(input: CreateFoodInput, now: NaiveDateTime) -> Self {
        NewFood {
            name: input.name,
            source: input.source,
            category_id: input.category_id,
            water: input.water,
            energy: input.energy,
            protein: input.protein,
            fat: input.fat,
            carbohydrate: input.carbohydrate,
            fiber: input.fiber,
            ash: input.ash,
            calcium: input.calcium,
            phosphorus: input.phosphorus,
            iron: input.iron,
            sodium: input.sodium,
            potassium: input.potassium,
            copper: input.copper,
            zinc: input.zinc,
            retinol: input.retinol,
            beta_carotene: input.beta_carotene,
            total_carotene: input.total_carotene,
            thiamine: input.thiamine,
            riboflavin: input.riboflavin,
            niacin: input.niacin,
            vitamin_c: input.vitamin_c,
            edible_portion: input.edible_portion,
            created_at: now,
            updated_at: now,
        }
    }

    #[cfg(test)]
    pub(crate) fn into_food(self, id: i32) -> Food {
        Food {
            id,
            name: self.name,
            source: self.source,
            category_id: self.category_id,
            water: self.water,
            energy: self.energy,
            protein: self.protein,
            fat: self.fat,
            carbohydrate: self.carbohydrate,
            fiber: self.fiber,
            ash: self.ash,
            calcium: self.calcium,
            phosphorus: self.phosphorus,
            iron: self.iron,
            sodium: self.sodium,
            potassium: self.potassium,
            copper: self.copper,
            zinc: self.zinc,
            retinol: self.retinol,
            beta_carotene: self.beta_carotene,
            total_carotene: self.total_carotene,
            thiamine: self.thiamine,
            riboflavin: self.riboflavin,
            niacin: self.niacin,
            vitamin_c: self.vitamin_c,
            edible_portion: self.edible_portion,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

#[derive(Debug, Clone, AsChangeset)]
#[table_name = "foods"]
pub(crate) struct FoodChangeset {
    pub name: Option<String>,
    pub source: Option<String>,
    pub category_id: Option<i32>,
    pub water: Option<f64>,
    pub energy: Option<f64>,
    pub protein: Option<f64>,
    pub fat: Option<f64>,
    pub carbohydrate: Option<f64>,
    pub fiber: Option<f64>,
    pub ash: Option<f64>,
    pub calcium: Option<f64>,
    pub phosphorus: Option<f64>,
    pub iron: Option<f64>,
    pub sodium: Option<f64>,
    pub potassium: Option<f64>,
    pub copper: Option<f64>,
    pub zinc: Option<f64>,
    pub retinol: Option<f64>,
    pub beta_carotene: Option<f64>,
    pub total_carotene: Option<f64>,
    pub thiamine: Option<f64>,
    pub riboflavin: Option<f64>,
    pub niacin: Option<f64>,
    pub vitamin_c: Option<f64>,
    pub edible_portion: Option<f64>,
    pub updated_at: NaiveDateTime,
}

impl FoodChangeset {
    // updated_at alone does not count as a change
    pub(crate) fn is_noop(&self) -> bool {
        self.name.is_none()
            && self.source.is_none()
            && self.category_id.is_none()
            && [
                self.water,
                self.energy,
                self.protein,
                self.fat,
                self.carbohydrate,
                self.fiber,
                self.ash,
                self.calcium,
                self.phosphorus,
                self.iron,
                self.sodium,
                self.potassium,
                self.copper,
                self.zinc,
                self.retinol,
                self.beta_carotene,
                self.total_carotene,
                self.thiamine,
                self.riboflavin,
                self.niacin,
                self.vitamin_c,
                self.edible_portion,
            ]
            .iter()
            .all(Option::is_none)
    }

    #[cfg(test)]
    pub(crate) fn apply_to(&self, food: &mut Food) {
        fn set<T: Clone>(target: &mut T, value: &Option<T>) {
            if let Some(value) = value {
                *target = value.clone();
            }
        }
        set(&mut food.name, &self.name);
        set(&mut food.source, &self.source);
        set(&mut food.category_id, &self.category_id);
        set(&mut food.water, &self.water);
        set(&mut food.energy, &self.energy);
        set(&mut food.protein, &self.protein);
        set(&mut food.fat, &self.fat);
        set(&mut food.carbohydrate, &self.carbohydrate);
        set(&mut food.fiber, &self.fiber);
        set(&mut food.ash, &self.ash);
        set(&mut food.calcium, &self.calcium);
        set(&mut food.phosphorus, &self.phosphorus);
        set(&mut food.iron, &self.iron);
        set(&mut food.sodium, &self.sodium);
        set(&mut food.potassium, &self.potassium);
        set(&mut food.copper, &self.copper);
        set(&mut food.zinc, &self.zinc);
        set(&mut food.retinol, &self.retinol);
        set(&mut food.beta_carotene, &self.beta_carotene);
        set(&mut food.total_carotene, &self.total_carotene);
        set(&mut food.thiamine, &self.thiamine);
        set(&mut food.riboflavin, &self.riboflavin);
        set(&mut food.niacin, &self.niacin);
        set(&mut food.vitamin_c, &self.vitamin_c);
        set(&mut food.edible_portion, &self.edible_portion);
        food.updated_at = self.updated_at;
    }
}

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub(crate) struct CreateCategoryInput {
    #[validate(length(min = 1, max = 255))]
    pub name: String,
}

#[derive(Debug, Clone, Insertable)]
#[table_name = "food_categories"]
pub(crate) struct NewFoodCategory {
    pub name: String,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

#[cfg(test)]
pub(crate) mod fixtures {
    use chrono::NaiveDate;

    use super::*;

    pub(crate) fn timestamp() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2023, 3, 1)
            .and_then(|date| date.and_hms_opt(8, 30, 0))
            .expect("valid timestamp")
    }

    pub(crate) fn rice_input(category_id: i32) -> CreateFoodInput {
        CreateFoodInput {
            name: "Rice".to_string(),
            source: "TKPI 2017".to_string(),
            category_id,
            water: 12.0,
            energy: 130.0,
            protein: 2.7,
            fat: 0.3,
            carbohydrate: 28.2,
            fiber: 0.4,
            ash: 0.5,
            calcium: 10.0,
            phosphorus: 43.0,
            iron: 0.2,
            sodium: 1.0,
            potassium: 35.0,
            copper: 0.07,
            zinc: 0.49,
            retinol: 0.0,
            beta_carotene: 0.0,
            total_carotene: 0.0,
            thiamine: 0.02,
            riboflavin: 0.01,
            niacin: 0.4,
            vitamin_c: 0.0,
            edible_portion: 100.0,
        }
    }

    pub(crate) fn rice(id: i32, category_id: i32) -> Food {
        NewFood::from_input(rice_input(category_id), timestamp()).into_food(id)
    }
}

#[cfg(test)]
mod tests {
    use super::fixtures::*;
    use super::*;

    #[test]
    fn scaling_follows_the_100_gram_basis() {
        let food = rice(1, 1);
        let scaled = food.scaled(200.0);

        assert_eq!(scaled.water, 24.0);
        assert_eq!(scaled.energy, 260.0);
        assert_eq!(scaled.edible_portion, 200.0);
    }

    #[test]
    fn scaling_matches_plain_arithmetic_for_every_nutrient() {
        let food = rice(7, 3);
        for serving_size in [1.0, 33.3, 75.0, 150.5, 1000.0] {
            let scaled = food.scaled(serving_size);
            assert_eq!(scaled.protein, food.protein * serving_size / 100.0);
            assert_eq!(scaled.fat, food.fat * serving_size / 100.0);
            assert_eq!(scaled.copper, food.copper * serving_size / 100.0);
            assert_eq!(scaled.zinc, food.zinc * serving_size / 100.0);
            assert_eq!(scaled.thiamine, food.thiamine * serving_size / 100.0);
            assert_eq!(scaled.niacin, food.niacin * serving_size / 100.0);
        }
    }

    #[test]
    fn overflowing_scale_is_not_finite() {
        let food = rice(1, 1);
        assert!(food.scaled(500.0).nutrients_are_finite());
        assert!(!food.scaled(1e307).nutrients_are_finite());
    }

    #[test]
    fn scaling_keeps_descriptive_fields() {
        let food = rice(7, 3);
        let scaled = food.scaled(42.0);

        assert_eq!(scaled.id, 7);
        assert_eq!(scaled.name, "Rice");
        assert_eq!(scaled.source, "TKPI 2017");
        assert_eq!(scaled.category_id, 3);
        assert_eq!(scaled.created_at, food.created_at);
    }

    #[test]
    fn cached_list_decodes_back() {
        let foods = vec![rice(1, 1), rice(2, 1)];
        let bytes = Food::list_to_u8(&foods).unwrap();
        assert_eq!(Food::list_from_u8(&bytes).unwrap(), foods);
    }

    #[test]
    fn changeset_only_touches_supplied_fields() {
        let mut food = rice(1, 1);
        let patch = UpdateFoodInput {
            name: Some("Brown rice".to_string()),
            fiber: Some(1.8),
            ..Default::default()
        };
        let later = timestamp() + chrono::Duration::hours(1);
        patch.changeset(later).apply_to(&mut food);

        let mut expected = rice(1, 1);
        expected.name = "Brown rice".to_string();
        expected.fiber = 1.8;
        expected.updated_at = later;
        assert_eq!(food, expected);
    }

    #[test]
    fn empty_patch_is_detected() {
        assert!(UpdateFoodInput::default().is_empty());
        let patch = UpdateFoodInput {
            vitamin_c: Some(0.0),
            ..Default::default()
        };
        assert!(!patch.is_empty());
    }

    #[test]
    fn unknown_fields_are_rejected() {
        let result: Result<UpdateFoodInput, _> =
            serde_json::from_str(r#"{"name": "Rice", "price": 3}"#);
        assert!(result.is_err());
    }

    #[test]
    fn negative_nutrients_fail_validation() {
        let mut input = rice_input(1);
        input.iron = -0.1;
        let errors = input.validate().unwrap_err();
        assert!(errors.field_errors().contains_key("iron"));
    }
}
