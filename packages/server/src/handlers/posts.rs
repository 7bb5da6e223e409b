use axum::Json;
use axum::extract::{DefaultBodyLimit, Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use tracing::instrument;
use uuid::Uuid;

use crate::error::{AppError, ErrorBody};
use crate::extractors::auth::AuthUser;
use crate::extractors::post_form::PostForm;
use crate::models::post::{
    CreatePostResponse, FilterQuery, PostResponse, SearchQuery, UpdatePostResponse,
};
use crate::models::shared::MessageResponse;
use crate::state::AppState;

/// Body limit for create/update. The media size itself is enforced while
/// staging; this only needs to leave room for it plus the text fields.
pub fn post_body_limit(max_file_size: u64) -> DefaultBodyLimit {
    let max_file_size = usize::try_from(max_file_size).unwrap_or(usize::MAX / 2);
    DefaultBodyLimit::max(max_file_size.saturating_mul(2).saturating_add(1024 * 1024))
}

fn parse_post_id(raw: &str) -> Result<Uuid, AppError> {
    Uuid::parse_str(raw.trim()).map_err(|_| AppError::Validation("Invalid ID format".into()))
}

fn into_responses(posts: Vec<crate::entity::post::Model>) -> Json<Vec<PostResponse>> {
    Json(posts.into_iter().map(PostResponse::from).collect())
}

#[utoipa::path(
    post,
    path = "/posts/upload",
    tag = "Posts",
    operation_id = "createPost",
    summary = "Create a post with an image",
    description = "Multipart form with `title`, `description`, `category`, optional comma-separated \
        `tags` and one image file in `media` (jpg, jpeg, png or gif). The image is stored in the \
        media store before the post is saved; if saving fails the image is removed again.",
    request_body(content_type = "multipart/form-data", description = "Post fields and image"),
    responses(
        (status = 201, description = "Post created", body = CreatePostResponse),
        (status = 400, description = "Missing field or rejected file (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 500, description = "Saving the post failed (PERSISTENCE_FAILED)", body = ErrorBody),
        (status = 502, description = "Media store failed (MEDIA_UPLOAD_FAILED)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user, form), fields(user_id = %auth_user.user_id))]
pub async fn create_post(
    auth_user: AuthUser,
    State(state): State<AppState>,
    form: PostForm,
) -> Result<impl IntoResponse, AppError> {
    let (draft, staged) = form.into_draft().await?;
    let post = state.posts.create(&auth_user, draft, staged).await?;

    Ok((
        StatusCode::CREATED,
        Json(CreatePostResponse {
            message: "Media uploaded successfully".into(),
            media_url: post.media_url.clone(),
            post: PostResponse::from(post),
        }),
    ))
}

#[utoipa::path(
    get,
    path = "/posts/all",
    tag = "Posts",
    operation_id = "listPosts",
    summary = "List all posts",
    responses(
        (status = 200, description = "All posts, newest first", body = Vec<PostResponse>),
    ),
)]
#[instrument(skip(state))]
pub async fn list_posts(
    State(state): State<AppState>,
) -> Result<Json<Vec<PostResponse>>, AppError> {
    Ok(into_responses(state.posts.list_all().await?))
}

#[utoipa::path(
    get,
    path = "/posts/user",
    tag = "Posts",
    operation_id = "listMyPosts",
    summary = "List the current user's posts",
    responses(
        (status = 200, description = "The caller's posts, newest first", body = Vec<PostResponse>),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user), fields(user_id = %auth_user.user_id))]
pub async fn list_my_posts(
    auth_user: AuthUser,
    State(state): State<AppState>,
) -> Result<Json<Vec<PostResponse>>, AppError> {
    Ok(into_responses(state.posts.list_for_owner(&auth_user).await?))
}

#[utoipa::path(
    put,
    path = "/posts/update/{id}",
    tag = "Posts",
    operation_id = "updatePost",
    summary = "Update a post",
    description = "Multipart form; every field is optional and blank text fields are ignored. \
        A new image in `media` replaces the old one, which is removed from the media store \
        once the post has been saved. A `tags` field replaces all tags; an empty one clears them.",
    params(("id" = String, Path, description = "Post ID")),
    request_body(content_type = "multipart/form-data", description = "Fields to change"),
    responses(
        (status = 200, description = "Post updated", body = UpdatePostResponse),
        (status = 400, description = "Invalid ID or rejected file (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 404, description = "Not found or not owned by caller (NOT_FOUND_OR_FORBIDDEN)", body = ErrorBody),
        (status = 500, description = "Saving the post failed (PERSISTENCE_FAILED)", body = ErrorBody),
        (status = 502, description = "Media store failed (MEDIA_UPLOAD_FAILED)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user, form), fields(user_id = %auth_user.user_id))]
pub async fn update_post(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
    form: PostForm,
) -> Result<Json<UpdatePostResponse>, AppError> {
    let id = match parse_post_id(&id) {
        Ok(id) => id,
        Err(e) => {
            form.discard().await;
            return Err(e);
        }
    };

    let (changes, staged) = form.into_changes();
    let post = state.posts.update(&auth_user, id, changes, staged).await?;

    Ok(Json(UpdatePostResponse {
        message: "Blog post updated successfully".into(),
        post: PostResponse::from(post),
    }))
}

#[utoipa::path(
    delete,
    path = "/posts/delete/{id}",
    tag = "Posts",
    operation_id = "deletePost",
    summary = "Delete a post",
    description = "Deletes the post and, best effort, its image. A failure to remove the image \
        does not prevent the post from being deleted.",
    params(("id" = String, Path, description = "Post ID")),
    responses(
        (status = 200, description = "Post deleted", body = MessageResponse),
        (status = 400, description = "Invalid ID (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 404, description = "Not found or not owned by caller (NOT_FOUND_OR_FORBIDDEN)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user), fields(user_id = %auth_user.user_id))]
pub async fn delete_post(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<MessageResponse>, AppError> {
    let id = parse_post_id(&id)?;
    state.posts.delete(&auth_user, id).await?;
    Ok(Json(MessageResponse::new("Blog post deleted successfully")))
}

#[utoipa::path(
    get,
    path = "/posts/filter",
    tag = "Posts",
    operation_id = "filterPosts",
    summary = "Filter posts by category",
    description = "Case-insensitive exact category match. A blank category returns every post.",
    params(FilterQuery),
    responses(
        (status = 200, description = "Matching posts", body = Vec<PostResponse>),
    ),
)]
#[instrument(skip(state, query))]
pub async fn filter_posts(
    State(state): State<AppState>,
    Query(query): Query<FilterQuery>,
) -> Result<Json<Vec<PostResponse>>, AppError> {
    Ok(into_responses(
        state
            .posts
            .filter_by_category(query.category.as_deref())
            .await?,
    ))
}

#[utoipa::path(
    get,
    path = "/posts/search",
    tag = "Posts",
    operation_id = "searchPosts",
    summary = "Search posts",
    description = "Matches the term case-insensitively against title, description and author, \
        or exactly against a tag. A blank term returns every post; no match returns `[]`.",
    params(SearchQuery),
    responses(
        (status = 200, description = "Matching posts", body = Vec<PostResponse>),
    ),
)]
#[instrument(skip(state, query))]
pub async fn search_posts(
    State(state): State<AppState>,
    Query(query): Query<SearchQuery>,
) -> Result<Json<Vec<PostResponse>>, AppError> {
    Ok(into_responses(
        state.posts.search(query.search_term.as_deref()).await?,
    ))
}

#[utoipa::path(
    get,
    path = "/posts/{id}",
    tag = "Posts",
    operation_id = "getPost",
    summary = "Get a post",
    params(("id" = String, Path, description = "Post ID")),
    responses(
        (status = 200, description = "The post", body = PostResponse),
        (status = 404, description = "Post not found (NOT_FOUND)", body = ErrorBody),
    ),
)]
#[instrument(skip(state))]
pub async fn get_post(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<PostResponse>, AppError> {
    Ok(Json(PostResponse::from(state.posts.get(&id).await?)))
}
