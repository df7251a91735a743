use crate::{
    ad::{
        ad_dto::{CreateAdRequest, UpdateAdRequest, MAX_IMAGES_PER_REQUEST, MAX_IMAGE_BYTES},
        ad_handlers,
        ad_models::{Ad, AdDetail, AdImage, AdListItem, AdStatus, Condition, Currency},
    },
    category::{category_handlers, category_models::Category},
    conversation::{
        conversation_dto::CreateConversationRequest,
        conversation_handlers,
        conversation_models::{
            AdSummary, Conversation, ConversationDetail, ConversationThread, InboxEntry,
            Participant,
        },
    },
    dto::{AdPage, InboxPage, MessagePage},
    message::{
        message_dto::{PostMessageRequest, ReadReceipt},
        message_handlers,
        message_models::Message,
    },
    middleware::auth_middleware,
    state::AppState,
};
use axum::{
    extract::DefaultBodyLimit,
    middleware,
    routing::{delete, get, post},
    Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

/// Room for a full batch of images plus the JSON payload part.
const AD_BODY_LIMIT: usize = MAX_IMAGES_PER_REQUEST * MAX_IMAGE_BYTES + 1024 * 1024;

#[derive(OpenApi)]
#[openapi(
    paths(
        category_handlers::list_categories,
        ad_handlers::list_ads,
        ad_handlers::get_ad,
        ad_handlers::create_ad,
        ad_handlers::update_ad,
        ad_handlers::delete_ad,
        ad_handlers::get_media,
        conversation_handlers::list_conversations,
        conversation_handlers::create_conversation,
        conversation_handlers::get_conversation,
        message_handlers::post_message,
        message_handlers::mark_read,
        message_handlers::delete_message,
        message_handlers::message_stream,
    ),
    components(
        schemas(
            Category,
            Ad,
            AdImage,
            AdListItem,
            AdDetail,
            AdStatus,
            Condition,
            Currency,
            CreateAdRequest,
            UpdateAdRequest,
            AdPage,
            Conversation,
            AdSummary,
            Participant,
            ConversationDetail,
            ConversationThread,
            InboxEntry,
            InboxPage,
            CreateConversationRequest,
            Message,
            MessagePage,
            PostMessageRequest,
            ReadReceipt,
        )
    ),
    tags(
        (name = "categories", description = "Category tree"),
        (name = "ads", description = "Ad catalog and listings"),
        (name = "conversations", description = "Buyer and seller conversations"),
        (name = "messages", description = "Messages and read tracking")
    ),
    modifiers(&SecurityAddon)
)]
struct ApiDoc;

struct SecurityAddon;

impl utoipa::Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                utoipa::openapi::security::SecurityScheme::Http(
                    utoipa::openapi::security::Http::new(
                        utoipa::openapi::security::HttpAuthScheme::Bearer,
                    ),
                ),
            )
        }
    }
}

pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    // Browsing is public; mutating handlers take AuthUser themselves
    let ad_routes = Router::new()
        .route("/", get(ad_handlers::list_ads).post(ad_handlers::create_ad))
        .route(
            "/:slug",
            get(ad_handlers::get_ad)
                .put(ad_handlers::update_ad)
                .delete(ad_handlers::delete_ad),
        )
        .layer(DefaultBodyLimit::max(AD_BODY_LIMIT));

    let conversation_routes = Router::new()
        .route(
            "/",
            get(conversation_handlers::list_conversations)
                .post(conversation_handlers::create_conversation),
        )
        .route("/stream", get(message_handlers::message_stream))
        .route("/:id", get(conversation_handlers::get_conversation))
        .route("/:id/read", post(message_handlers::mark_read))
        .route("/:id/messages", post(message_handlers::post_message))
        .route(
            "/:id/messages/:message_id",
            delete(message_handlers::delete_message),
        )
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            auth_middleware,
        ));

    let api_routes = Router::new()
        .route("/categories", get(category_handlers::list_categories))
        .route("/media/:id", get(ad_handlers::get_media))
        .nest("/ads", ad_routes)
        .nest("/conversations", conversation_routes);

    Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .nest("/api", api_routes)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        auth::jwt::create_access_token,
        state::Config,
        storage::LocalBlobStore,
    };
    use axum::{
        body::Body,
        http::{header::AUTHORIZATION, Method, Request, StatusCode},
    };
    use sqlx::postgres::PgPoolOptions;
    use std::sync::Arc;
    use tower::ServiceExt;
    use uuid::Uuid;

    const SECRET: &str = "test-secret";

    /// Router over a pool that never connects; only requests rejected
    /// before touching the database are meaningful here.
    fn app() -> Router {
        let config = Config {
            database_url: "postgres://localhost/marketplace_test".into(),
            database_max_connections: 1,
            host: "127.0.0.1".into(),
            port: 0,
            jwt_secret: SECRET.into(),
            storage_root: std::env::temp_dir().join("marketplace-router-test"),
            seed_categories: false,
        };
        let db = PgPoolOptions::new()
            .connect_lazy(&config.database_url)
            .unwrap();
        let blob_store = Arc::new(LocalBlobStore::new(config.storage_root.clone()));

        create_router(AppState::new(db, Arc::new(config), blob_store))
    }

    async fn status_of(request: Request<Body>) -> StatusCode {
        app().oneshot(request).await.unwrap().status()
    }

    #[tokio::test]
    async fn test_conversations_require_token() {
        for (method, uri) in [
            (Method::GET, "/api/conversations"),
            (Method::GET, "/api/conversations/stream"),
            (Method::GET, "/api/conversations/1"),
            (Method::POST, "/api/conversations/1/read"),
            (Method::POST, "/api/conversations/1/messages"),
            (Method::DELETE, "/api/conversations/1/messages/2"),
        ] {
            let request = Request::builder()
                .method(method.clone())
                .uri(uri)
                .body(Body::empty())
                .unwrap();
            assert_eq!(status_of(request).await, StatusCode::UNAUTHORIZED, "{method} {uri}");
        }
    }

    #[tokio::test]
    async fn test_invalid_token_is_rejected() {
        let request = Request::builder()
            .uri("/api/conversations")
            .header(AUTHORIZATION, "Bearer not-a-jwt")
            .body(Body::empty())
            .unwrap();
        assert_eq!(status_of(request).await, StatusCode::UNAUTHORIZED);

        let forged = create_access_token(Uuid::new_v4(), "some-other-secret");
        let request = Request::builder()
            .uri("/api/conversations")
            .header(AUTHORIZATION, format!("Bearer {forged}"))
            .body(Body::empty())
            .unwrap();
        assert_eq!(status_of(request).await, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_ad_mutations_require_token() {
        let request = Request::builder()
            .method(Method::POST)
            .uri("/api/ads")
            .body(Body::empty())
            .unwrap();
        assert_eq!(status_of(request).await, StatusCode::UNAUTHORIZED);

        let request = Request::builder()
            .method(Method::DELETE)
            .uri("/api/ads/some-bike")
            .body(Body::empty())
            .unwrap();
        assert_eq!(status_of(request).await, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_invalid_filter_is_rejected_before_querying() {
        let request = Request::builder()
            .uri("/api/ads?currency=GBP")
            .body(Body::empty())
            .unwrap();
        assert_eq!(status_of(request).await, StatusCode::UNPROCESSABLE_ENTITY);

        let request = Request::builder()
            .uri("/api/ads?price_min=abc")
            .body(Body::empty())
            .unwrap();
        assert_eq!(status_of(request).await, StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[test]
    fn test_openapi_documents_every_route() {
        let doc = ApiDoc::openapi();
        for path in [
            "/api/ads",
            "/api/ads/{slug}",
            "/api/categories",
            "/api/media/{id}",
            "/api/conversations",
            "/api/conversations/{id}",
            "/api/conversations/{id}/read",
            "/api/conversations/{id}/messages",
            "/api/conversations/{id}/messages/{message_id}",
            "/api/conversations/stream",
        ] {
            assert!(doc.paths.paths.contains_key(path), "missing {path}");
        }
    }
}
