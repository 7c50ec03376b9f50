use std::collections::{BTreeMap, HashMap};
use std::sync::Mutex;

use chrono::NaiveDateTime;
use diesel::result::{DatabaseErrorKind, Error as DieselError};

use super::{Store, StoreError};
use crate::auth::{hash_token, RequestContext};
use crate::models::{fixtures, Food, FoodCategory, FoodChangeset, NewFood, NewFoodCategory};

#[derive(Default)]
struct Tables {
    foods: BTreeMap<i32, Food>,
    categories: BTreeMap<i32, FoodCategory>,
    sessions: HashMap<String, RequestContext>,
    next_food_id: i32,
    next_category_id: i32,
    offline: bool,
}

type Hook = Box<dyn FnOnce() + Send>;

#[derive(Default)]
pub(crate) struct MemoryStore {
    tables: Mutex<Tables>,
    after_list: Mutex<Option<Hook>>,
}

impl MemoryStore {
    pub(crate) fn add_session(&self, token: &str, user_id: i32, roles: &[&str]) {
        let context = RequestContext {
            user_id,
            roles: roles.iter().map(|role| role.to_string()).collect(),
        };
        self.lock().sessions.insert(hash_token(token), context);
    }

    pub(crate) fn add_category(&self, name: &str) -> i32 {
        let category = NewFoodCategory {
            name: name.to_string(),
            created_at: fixtures::timestamp(),
            updated_at: fixtures::timestamp(),
        };
        match self.insert_category(category) {
            Ok(category) => category.id,
            Err(e) => panic!("seeding category failed: {}", e),
        }
    }

    pub(crate) fn food_count(&self) -> usize {
        self.lock().foods.len()
    }

    pub(crate) fn go_offline(&self) {
        self.lock().offline = true;
    }

    // runs once, right after the next list_foods snapshot is taken
    pub(crate) fn on_next_list(&self, hook: impl FnOnce() + Send + 'static) {
        let mut after_list = self
            .after_list
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        *after_list = Some(Box::new(hook));
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Tables> {
        self.tables.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn online(&self) -> Result<std::sync::MutexGuard<'_, Tables>, StoreError> {
        let tables = self.lock();
        if tables.offline {
            return Err(StoreError::Query(DieselError::DatabaseError(
                DatabaseErrorKind::UnableToSendCommand,
                Box::new("MySQL server has gone away".to_string()),
            )));
        }
        Ok(tables)
    }
}

fn foreign_key_violation() -> StoreError {
    StoreError::Query(DieselError::DatabaseError(
        DatabaseErrorKind::ForeignKeyViolation,
        Box::new("foods_category_id_foreign".to_string()),
    ))
}

impl Store for MemoryStore {
    fn find_session(
        &self,
        token_hash: &str,
        _now: NaiveDateTime,
    ) -> Result<Option<RequestContext>, StoreError> {
        Ok(self.online()?.sessions.get(token_hash).cloned())
    }

    fn list_foods(&self) -> Result<Vec<Food>, StoreError> {
        let foods: Vec<Food> = self.online()?.foods.values().cloned().collect();
        let hook = self
            .after_list
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .take();
        if let Some(hook) = hook {
            hook();
        }
        Ok(foods)
    }

    fn find_by_id(&self, id: i32) -> Result<Option<Food>, StoreError> {
        Ok(self.online()?.foods.get(&id).cloned())
    }

    fn find_by_name_fragment(&self, fragment: &str) -> Result<Vec<Food>, StoreError> {
        let needle = fragment.to_lowercase();
        Ok(self
            .online()?
            .foods
            .values()
            .filter(|food| food.name.to_lowercase().contains(&needle))
            .cloned()
            .collect())
    }

    fn insert(&self, food: NewFood) -> Result<Food, StoreError> {
        let mut tables = self.online()?;
        if !tables.categories.contains_key(&food.category_id) {
            return Err(foreign_key_violation());
        }
        tables.next_food_id += 1;
        let food = food.into_food(tables.next_food_id);
        tables.foods.insert(food.id, food.clone());
        Ok(food)
    }

    fn update_partial(&self, id: i32, changes: FoodChangeset) -> Result<Option<Food>, StoreError> {
        let mut tables = self.online()?;
        if let Some(category_id) = changes.category_id {
            if !tables.categories.contains_key(&category_id) {
                return Err(foreign_key_violation());
            }
        }
        let food = match tables.foods.get_mut(&id) {
            Some(food) => food,
            None => return Ok(None),
        };
        if !changes.is_noop() {
            changes.apply_to(food);
        }
        Ok(Some(food.clone()))
    }

    fn delete(&self, id: i32) -> Result<bool, StoreError> {
        Ok(self.online()?.foods.remove(&id).is_some())
    }

    fn category_exists(&self, id: i32) -> Result<bool, StoreError> {
        Ok(self.online()?.categories.contains_key(&id))
    }

    fn list_categories(&self) -> Result<Vec<FoodCategory>, StoreError> {
        Ok(self.online()?.categories.values().cloned().collect())
    }

    fn insert_category(&self, category: NewFoodCategory) -> Result<FoodCategory, StoreError> {
        let mut tables = self.online()?;
        tables.next_category_id += 1;
        let category = FoodCategory {
            id: tables.next_category_id,
            name: category.name,
            created_at: category.created_at,
            updated_at: category.updated_at,
        };
        tables.categories.insert(category.id, category.clone());
        Ok(category)
    }
}
