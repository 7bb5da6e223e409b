use utoipa_axum::router::OpenApiRouter;
use utoipa_axum::routes;

use crate::config::AppConfig;
use crate::handlers;
use crate::state::AppState;

pub fn api_routes(config: &AppConfig) -> OpenApiRouter<AppState> {
    OpenApiRouter::new()
        .nest("/blogs", post_routes(config))
        .nest("/users", auth_routes())
}

fn auth_routes() -> OpenApiRouter<AppState> {
    OpenApiRouter::new()
        .routes(routes!(handlers::auth::register))
        .routes(routes!(handlers::auth::login))
        .routes(routes!(handlers::auth::logout))
}

fn post_routes(config: &AppConfig) -> OpenApiRouter<AppState> {
    let uploads = OpenApiRouter::new()
        .routes(routes!(handlers::posts::create_post))
        .routes(routes!(handlers::posts::update_post))
        .layer(handlers::posts::post_body_limit(
            config.staging.max_file_size,
        ));

    OpenApiRouter::new()
        .routes(routes!(handlers::posts::list_posts))
        .routes(routes!(handlers::posts::list_my_posts))
        .routes(routes!(handlers::posts::filter_posts))
        .routes(routes!(handlers::posts::search_posts))
        .routes(routes!(handlers::posts::delete_post))
        .routes(routes!(handlers::posts::get_post))
        .merge(uploads)
}
