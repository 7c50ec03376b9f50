use actix_web::{delete, get, patch, post, web, Error, HttpResponse};
use serde_json::json;

use crate::auth::RequestContext;
use crate::error::{ApiError, FieldErrors};
use crate::foods::{CalculateParams, FoodService, SearchParams};
use crate::models::{CreateCategoryInput, CreateFoodInput, UpdateFoodInput};

#[get("/health")]
async fn health() -> HttpResponse {
    HttpResponse::Ok().json(json!({ "status": "ok" }))
}

// registered ahead of /foods/{id} so "search" is not taken for an id
#[get("/foods/search")]
async fn search_foods(
    ctx: RequestContext,
    params: Result<web::Query<SearchParams>, Error>,
    service: web::Data<FoodService>,
) -> Result<HttpResponse, Error> {
    let foods = service.search(&ctx, params?.into_inner()).await?;
    Ok(HttpResponse::Ok().json(foods))
}

#[get("/foods")]
async fn list_foods(
    ctx: RequestContext,
    service: web::Data<FoodService>,
) -> Result<HttpResponse, Error> {
    let foods = service.list(&ctx).await?;
    Ok(HttpResponse::Ok().json(foods))
}

#[get("/foods/{id}")]
async fn get_food(
    ctx: RequestContext,
    id: Result<web::Path<i32>, Error>,
    service: web::Data<FoodService>,
) -> Result<HttpResponse, Error> {
    let food = service.get(&ctx, id?.into_inner()).await?;
    Ok(HttpResponse::Ok().json(food))
}

//responds with a one-element array holding the scaled food
#[get("/foods/{id}/calculate")]
async fn calculate_serving(
    ctx: RequestContext,
    id: Result<web::Path<i32>, Error>,
    params: Result<web::Query<CalculateParams>, Error>,
    service: web::Data<FoodService>,
) -> Result<HttpResponse, Error> {
    let food = service
        .calculate(&ctx, id?.into_inner(), params?.into_inner())
        .await?;
    Ok(HttpResponse::Ok().json(vec![food]))
}

#[post("/foods")]
async fn create_food(
    ctx: RequestContext,
    input: Result<web::Json<CreateFoodInput>, Error>,
    service: web::Data<FoodService>,
) -> Result<HttpResponse, Error> {
    let food = service.create(&ctx, input?.into_inner()).await?;
    Ok(HttpResponse::Created().json(food))
}

#[patch("/foods/{id}")]
async fn update_food(
    ctx: RequestContext,
    id: Result<web::Path<i32>, Error>,
    input: Result<web::Json<UpdateFoodInput>, Error>,
    service: web::Data<FoodService>,
) -> Result<HttpResponse, Error> {
    let food = service
        .update(&ctx, id?.into_inner(), input?.into_inner())
        .await?;
    Ok(HttpResponse::Ok().json(food))
}

#[delete("/foods/{id}")]
async fn delete_food(
    ctx: RequestContext,
    id: Result<web::Path<i32>, Error>,
    service: web::Data<FoodService>,
) -> Result<HttpResponse, Error> {
    service.delete(&ctx, id?.into_inner()).await?;
    Ok(HttpResponse::NoContent().finish())
}

#[get("/food-categories")]
async fn list_categories(
    ctx: RequestContext,
    service: web::Data<FoodService>,
) -> Result<HttpResponse, Error> {
    let categories = service.list_categories(&ctx).await?;
    Ok(HttpResponse::Ok().json(categories))
}

#[post("/food-categories")]
async fn create_category(
    ctx: RequestContext,
    input: Result<web::Json<CreateCategoryInput>, Error>,
    service: web::Data<FoodService>,
) -> Result<HttpResponse, Error> {
    let category = service
        .create_category(&ctx, input?.into_inner())
        .await?;
    Ok(HttpResponse::Created().json(category))
}

fn input_error(source: &str, detail: impl ToString) -> Error {
    let mut errors = FieldErrors::new();
    errors.insert(source.to_string(), vec![detail.to_string()]);
    ApiError::Validation(errors).into()
}

// body, query and path extractors are taken as Result in the handlers so a
// missing token is reported before malformed input
pub(crate) fn configure(cfg: &mut web::ServiceConfig) {
    cfg.app_data(web::JsonConfig::default().error_handler(|err, _| input_error("body", err)))
        .app_data(web::QueryConfig::default().error_handler(|err, _| input_error("query", err)))
        .app_data(web::PathConfig::default().error_handler(|err, _| input_error("path", err)))
        .service(health)
        .service(search_foods)
        .service(list_foods)
        .service(get_food)
        .service(calculate_serving)
        .service(create_food)
        .service(update_food)
        .service(delete_food)
        .service(list_categories)
        .service(create_category);
}
