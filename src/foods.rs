use std::sync::Arc;

use actix_web::web;
use chrono::{NaiveDateTime, Utc};
use serde::Deserialize;
use validator::Validate;

use crate::auth::RequestContext;
use crate::cache::{FoodListCache, Lookup};
use crate::error::{ApiError, FieldErrors};
use crate::models::{
    CreateCategoryInput, CreateFoodInput, Food, FoodCategory, NewFood, NewFoodCategory,
    UpdateFoodInput,
};
use crate::repository::Store;

// raw strings so blank values count as absent
#[derive(Debug, Default, Deserialize)]
pub(crate) struct SearchParams {
    pub search: Option<String>,
    pub food_id: Option<String>,
}

#[derive(Debug, PartialEq)]
enum SearchFilter {
    ById(i32),
    ByName(String),
}

impl SearchParams {
    fn filter(&self) -> Result<SearchFilter, ApiError> {
        let present = |value: &Option<String>| {
            value
                .as_deref()
                .map(str::trim)
                .filter(|value| !value.is_empty())
                .map(str::to_string)
        };
        match (present(&self.food_id), present(&self.search)) {
            (Some(food_id), _) => food_id
                .parse::<i32>()
                .map(SearchFilter::ById)
                .map_err(|_| ApiError::field("food_id", "The food id must be an integer.")),
            (None, Some(search)) => Ok(SearchFilter::ByName(search)),
            (None, None) => {
                let mut errors = FieldErrors::new();
                errors.insert(
                    "search".to_string(),
                    vec!["The search field is required when food id is not present.".to_string()],
                );
                errors.insert(
                    "food_id".to_string(),
                    vec!["The food id field is required when search is not present.".to_string()],
                );
                Err(ApiError::Validation(errors))
            }
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct CalculateParams {
    pub serving_size: Option<String>,
}

impl CalculateParams {
    fn serving_size(&self) -> Result<f64, ApiError> {
        let raw = match self.serving_size.as_deref().map(str::trim) {
            Some(raw) if !raw.is_empty() => raw,
            _ => {
                return Err(ApiError::field(
                    "serving_size",
                    "The serving size field is required.",
                ))
            }
        };
        let grams = raw
            .parse::<f64>()
            .map_err(|_| ApiError::field("serving_size", "The serving size must be a number."))?;
        if !grams.is_finite() || grams <= 0.0 {
            return Err(ApiError::field(
                "serving_size",
                "The serving size must be greater than 0.",
            ));
        }
        Ok(grams)
    }
}

fn now() -> NaiveDateTime {
    Utc::now().naive_utc()
}

#[derive(Clone)]
pub(crate) struct FoodService {
    store: Arc<dyn Store>,
    cache: FoodListCache,
}

impl FoodService {
    pub(crate) fn new(store: Arc<dyn Store>, cache: FoodListCache) -> Self {
        FoodService { store, cache }
    }

    async fn blocking<T, F>(&self, f: F) -> Result<T, ApiError>
    where
        F: FnOnce(&dyn Store, &FoodListCache) -> Result<T, ApiError> + Send + 'static,
        T: Send + 'static,
    {
        let store = Arc::clone(&self.store);
        let cache = self.cache.clone();
        web::block(move || f(store.as_ref(), &cache)).await?
    }

    pub(crate) async fn authenticate(
        &self,
        token_hash: String,
    ) -> Result<Option<RequestContext>, ApiError> {
        self.blocking(move |store, _| Ok(store.find_session(&token_hash, now())?))
            .await
    }

    pub(crate) async fn list(&self, ctx: &RequestContext) -> Result<Vec<Food>, ApiError> {
        ctx.require_admin()?;
        self.blocking(|store, cache| match cache.lookup() {
            Lookup::Hit(foods) => Ok(foods),
            Lookup::Miss { generation } => {
                let foods = store.list_foods()?;
                cache.put(generation, &foods);
                Ok(foods)
            }
            Lookup::Bypass => Ok(store.list_foods()?),
        })
        .await
    }

    pub(crate) async fn get(&self, ctx: &RequestContext, id: i32) -> Result<Food, ApiError> {
        ctx.require_admin()?;
        self.blocking(move |store, _| {
            store
                .find_by_id(id)?
                .ok_or_else(|| ApiError::food_not_found(id))
        })
        .await
    }

    // an unknown id yields an empty list
    pub(crate) async fn search(
        &self,
        _ctx: &RequestContext,
        params: SearchParams,
    ) -> Result<Vec<Food>, ApiError> {
        let filter = params.filter()?;
        self.blocking(move |store, _| match filter {
            SearchFilter::ById(id) => Ok(store.find_by_id(id)?.into_iter().collect()),
            SearchFilter::ByName(fragment) => Ok(store.find_by_name_fragment(&fragment)?),
        })
        .await
    }

    pub(crate) async fn calculate(
        &self,
        _ctx: &RequestContext,
        id: i32,
        params: CalculateParams,
    ) -> Result<Food, ApiError> {
        let serving_size = params.serving_size()?;
        let food = self
            .blocking(move |store, _| {
                store
                    .find_by_id(id)?
                    .ok_or_else(|| ApiError::food_not_found(id))
            })
            .await?;
        let scaled = food.scaled(serving_size);
        if !scaled.nutrients_are_finite() {
            return Err(ApiError::field(
                "serving_size",
                "The serving size is too large.",
            ));
        }
        Ok(scaled)
    }

    pub(crate) async fn create(
        &self,
        ctx: &RequestContext,
        input: CreateFoodInput,
    ) -> Result<Food, ApiError> {
        ctx.require_admin()?;
        input.validate()?;
        let user_id = ctx.user_id;
        self.blocking(move |store, cache| {
            ensure_category(store, input.category_id)?;
            let food = store.insert(NewFood::from_input(input, now()))?;
            cache.invalidate();
            log::info!("user {} created food {} ({})", user_id, food.id, food.name);
            Ok(food)
        })
        .await
    }

    pub(crate) async fn update(
        &self,
        ctx: &RequestContext,
        id: i32,
        input: UpdateFoodInput,
    ) -> Result<Food, ApiError> {
        ctx.require_admin()?;
        input.validate()?;
        let user_id = ctx.user_id;
        self.blocking(move |store, cache| {
            let current = store
                .find_by_id(id)?
                .ok_or_else(|| ApiError::food_not_found(id))?;
            if input.is_empty() {
                return Ok(current);
            }
            if let Some(category_id) = input.category_id {
                ensure_category(store, category_id)?;
            }
            let food = store
                .update_partial(id, input.changeset(now()))?
                .ok_or_else(|| ApiError::food_not_found(id))?;
            cache.invalidate();
            log::info!("user {} updated food {}", user_id, id);
            Ok(food)
        })
        .await
    }

    pub(crate) async fn delete(&self, ctx: &RequestContext, id: i32) -> Result<(), ApiError> {
        ctx.require_admin()?;
        let user_id = ctx.user_id;
        self.blocking(move |store, cache| {
            if !store.delete(id)? {
                return Err(ApiError::food_not_found(id));
            }
            cache.invalidate();
            log::info!("user {} deleted food {}", user_id, id);
            Ok(())
        })
        .await
    }

    pub(crate) async fn list_categories(
        &self,
        ctx: &RequestContext,
    ) -> Result<Vec<FoodCategory>, ApiError> {
        ctx.require_admin()?;
        self.blocking(|store, _| Ok(store.list_categories()?)).await
    }

    pub(crate) async fn create_category(
        &self,
        ctx: &RequestContext,
        input: CreateCategoryInput,
    ) -> Result<FoodCategory, ApiError> {
        ctx.require_admin()?;
        input.validate()?;
        self.blocking(move |store, _| {
            let timestamp = now();
            let category = store.insert_category(NewFoodCategory {
                name: input.name,
                created_at: timestamp,
                updated_at: timestamp,
            })?;
            log::info!("created food category {} ({})", category.id, category.name);
            Ok(category)
        })
        .await
    }
}

fn ensure_category(store: &dyn Store, category_id: i32) -> Result<(), ApiError> {
    if store.category_exists(category_id)? {
        Ok(())
    } else {
        Err(ApiError::field(
            "category_id",
            "The selected category id is invalid.",
        ))
    }
}
