use actix_web::{App, test, web};
use diesel::PgConnection;
use diesel::r2d2::{ConnectionManager, Pool};
use nutrition_api::db::DbPool;
use nutrition_api::{get_food, health, search_foods};

// Never connects: the handlers under test reject the request first.
fn idle_pool() -> DbPool {
    Pool::builder().build_unchecked(ConnectionManager::<PgConnection>::new(
        "postgres://localhost:1/unused",
    ))
}

#[actix_rt::test]
async fn test_health_endpoint() {
    let app = test::init_service(
        App::new()
            .service(health)
    ).await;

    let req = test::TestRequest::get()
        .uri("/health")
        .to_request();

    let resp = test::call_service(&app, req).await;
    assert!(resp.status().is_success());

    let body = test::read_body(resp).await;
    let body_str = std::str::from_utf8(&body).unwrap();
    assert!(body_str.contains("ok"));
    assert!(body_str.contains("Nutrition API is running"));
}

#[actix_rt::test]
async fn test_search_requires_query() {
    let app = test::init_service(
        App::new()
            .app_data(web::Data::new(idle_pool()))
            .service(search_foods)
            .service(get_food)
    ).await;

    for uri in ["/api/foods/search", "/api/foods/search?q=", "/api/foods/search?q=%20%20"] {
        let req = test::TestRequest::get().uri(uri).to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status().as_u16(), 400, "{uri}");

        let body = test::read_body(resp).await;
        let body_str = std::str::from_utf8(&body).unwrap();
        assert!(body_str.contains("Search query is required"));
    }
}

#[actix_rt::test]
async fn test_food_id_must_be_numeric() {
    let app = test::init_service(
        App::new()
            .app_data(web::Data::new(idle_pool()))
            .service(search_foods)
            .service(get_food)
    ).await;

    let req = test::TestRequest::get()
        .uri("/api/foods/apple")
        .to_request();

    let resp = test::call_service(&app, req).await;
    assert!(resp.status().is_client_error());
}
