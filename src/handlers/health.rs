use crate::models::HealthResponse;
use actix_web::HttpResponse;

/// Health check handler
pub async fn health() -> HttpResponse {
    let response = HealthResponse {
        status: "ok".to_string(),
        message: "Portal session service is running".to_string(),
    };
    HttpResponse::Ok().json(response)
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::{test, web, App};

    #[actix_web::test]
    async fn test_ping() {
        let app = test::init_service(App::new().route("/ping", web::get().to(health))).await;
        let resp = test::call_service(&app, test::TestRequest::get().uri("/ping").to_request()).await;

        assert!(resp.status().is_success());
        let body: serde_json::Value = test::read_body_json(resp).await;
        assert_eq!(body["status"], "ok");
    }
}
