// Re-export modules for testing
pub mod config;
pub mod db;
pub mod error;
pub mod importer;
pub mod models;
pub mod repository;
pub mod schema;
pub mod target;
pub mod usda;

// Re-export endpoint functions for integration tests
pub use crate::handlers::{get_food, health, search_foods};

mod handlers {
    use actix_web::{HttpResponse, Responder, get, web};
    use serde::{Deserialize, Serialize};

    use crate::db::DbPool;
    use crate::error::AppError;
    use crate::models::{Pagination, SearchFoodResponse};
    use crate::repository::{self, DEFAULT_SEARCH_LIMIT, MAX_SEARCH_LIMIT};

    #[derive(Serialize)]
    pub struct HealthResponse {
        pub status: String,
        pub message: String,
        pub time: String,
    }

    #[get("/health")]
    pub async fn health() -> impl Responder {
        HttpResponse::Ok().json(HealthResponse {
            status: "ok".to_string(),
            message: "Nutrition API is running".to_string(),
            time: chrono::Utc::now().to_rfc3339(),
        })
    }

    #[derive(Deserialize)]
    pub struct SearchParams {
        #[serde(default)]
        pub q: String,
        pub limit: Option<i64>,
        pub offset: Option<i64>,
    }

    #[get("/api/foods/search")]
    pub async fn search_foods(
        pool: web::Data<DbPool>,
        params: web::Query<SearchParams>,
    ) -> Result<HttpResponse, AppError> {
        let SearchParams { q, limit, offset } = params.into_inner();

        let q = q.trim().to_string();
        if q.is_empty() {
            return Err(AppError::BadRequest("Search query is required".to_string()));
        }

        let limit = match limit {
            Some(l) if l > 0 => l.min(MAX_SEARCH_LIMIT),
            _ => DEFAULT_SEARCH_LIMIT,
        };
        let offset = offset.unwrap_or(0).max(0);

        let (data, total) = web::block(move || -> Result<_, AppError> {
            let mut conn = pool.get()?;
            Ok(repository::search_foods(&mut conn, &q, limit, offset)?)
        })
        .await??;

        Ok(HttpResponse::Ok().json(SearchFoodResponse {
            data,
            pagination: Pagination::new(limit, offset, total),
        }))
    }

    #[get("/api/foods/{id}")]
    pub async fn get_food(
        pool: web::Data<DbPool>,
        path: web::Path<i32>,
    ) -> Result<HttpResponse, AppError> {
        let fdc_id = path.into_inner();

        let food = web::block(move || -> Result<_, AppError> {
            let mut conn = pool.get()?;
            Ok(repository::get_food(&mut conn, fdc_id)?)
        })
        .await??;

        match food {
            Some(food) => Ok(HttpResponse::Ok().json(food)),
            None => Err(AppError::NotFound(format!("Food {fdc_id} does not exist"))),
        }
    }
}
