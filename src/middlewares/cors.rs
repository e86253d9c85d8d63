use crate::config::ServerConfig;
use actix_cors::Cors;

/// allowed_origins 为空时放行任意来源
pub fn create_cors(server: &ServerConfig) -> Cors {
    let origins = server.allowed_origins.clone();
    Cors::default()
        .allowed_origin_fn(move |origin, _req_head| {
            if origins.is_empty() {
                return true;
            }
            origin
                .to_str()
                .map(|o| origins.iter().any(|allowed| allowed == o))
                .unwrap_or(false)
        })
        .allowed_methods(vec!["GET", "POST", "PUT", "DELETE", "OPTIONS"])
        .allow_any_header()
        .max_age(3600)
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::{App, HttpResponse, http::StatusCode, test, web};

    fn server(origins: &[&str]) -> ServerConfig {
        ServerConfig {
            host: "127.0.0.1".to_string(),
            port: 8080,
            allowed_origins: origins.iter().map(|o| o.to_string()).collect(),
        }
    }

    #[actix_web::test]
    async fn test_restricted_origins() {
        let app = test::init_service(
            App::new()
                .wrap(create_cors(&server(&["https://shop.example.com"])))
                .route("/ping", web::get().to(HttpResponse::Ok)),
        )
        .await;

        let req = test::TestRequest::get()
            .uri("/ping")
            .insert_header(("Origin", "https://shop.example.com"))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);
        assert!(resp.headers().contains_key("access-control-allow-origin"));

        let req = test::TestRequest::get()
            .uri("/ping")
            .insert_header(("Origin", "https://evil.example.com"))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert!(!resp.headers().contains_key("access-control-allow-origin"));
    }

    #[actix_web::test]
    async fn test_empty_origins_allow_any() {
        let app = test::init_service(
            App::new()
                .wrap(create_cors(&server(&[])))
                .route("/ping", web::get().to(HttpResponse::Ok)),
        )
        .await;

        let req = test::TestRequest::get()
            .uri("/ping")
            .insert_header(("Origin", "https://anywhere.example.com"))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(
            resp.headers().get("access-control-allow-origin").unwrap(),
            "https://anywhere.example.com"
        );
    }
}
