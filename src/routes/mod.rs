use axum::{
    middleware,
    routing::{get, post, put},
    Router,
};
use crate::{
    handlers::{account, article, auth, category, checkout, comment, contact, like},
    state::AppState,
    utils::jwt::{auth_middleware, superuser_middleware},
};

pub fn create_routes(state: AppState) -> Router {
    // 1. Rutas Públicas (Todo el mundo)
    let public_routes = Router::new()
        .route("/api/articles", get(article::list_articles_handler))
        .route("/api/articles/latest", get(article::latest_articles_handler))
        .route("/api/articles/:id", get(article::get_article_handler))
        .route("/api/search", get(article::search_articles_handler))
        .route("/api/categories", get(category::list_categories_handler))
        .route("/api/categories/:name_en", get(category::get_category_handler))
        .route("/api/auth/register", post(auth::register_handler))
        .route("/api/auth/login", post(auth::login_handler))
        .route("/api/auth/activate/:token", get(auth::activate_handler))
        .route("/api/auth/password/reset", post(auth::password_reset_request_handler))
        .route("/api/auth/password/reset/:token", post(auth::password_reset_confirm_handler))
        .route("/api/contact", post(contact::contact_handler));

    // 2. Rutas de usuarios con sesión (likes, pagos, comentarios, perfil)
    let user_routes = Router::new()
        .route("/api/auth/logout", post(auth::logout_handler))
        .route("/api/auth/password/change", post(auth::password_change_handler))
        .route("/api/users/:id", get(account::get_user_handler).put(account::update_user_handler))
        .route("/api/me/likes", get(account::my_likes_handler))
        .route("/api/articles/:id/like", post(like::toggle_like_handler))
        .route("/api/articles/:id/checkout", post(checkout::checkout_handler))
        .route("/api/articles/:id/access", get(checkout::access_handler))
        .route("/api/articles/:id/comments", post(comment::create_comment_handler))
        .route("/api/comments/:id", axum::routing::delete(comment::delete_comment_handler))
        .route("/api/comments/:id/replies", post(comment::create_reply_handler))
        .route("/api/replies/:id", axum::routing::delete(comment::delete_reply_handler))
        .route_layer(middleware::from_fn_with_state(state.clone(), auth_middleware));

    // 3. Rutas de superusuario (publicar y administrar contenido)
    let admin_routes = Router::new()
        .route("/api/admin/articles", post(article::create_article_handler))
        .route(
            "/api/admin/articles/:id",
            put(article::update_article_handler).delete(article::delete_article_handler),
        )
        .route("/api/admin/categories", post(category::create_category_handler))
        .route(
            "/api/admin/categories/:id",
            put(category::update_category_handler).delete(category::delete_category_handler),
        )
        .route_layer(middleware::from_fn_with_state(state.clone(), superuser_middleware));

    // Fusionamos todo
    Router::new()
        .merge(public_routes)
        .merge(user_routes)
        .merge(admin_routes)
        .with_state(state)
}
