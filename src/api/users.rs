use actix_web::{
    error::{JsonPayloadError, QueryPayloadError},
    web, HttpRequest, HttpResponse,
};
use serde::{Deserialize, Serialize};

use crate::{
    middleware::UploadedFile,
    models::{CreateUsersRequest, ImportReport, UpdateUserRequest, User},
    services::{CreatedUsers, UserService},
    utils::AppError,
};

#[derive(Debug, Deserialize, utoipa::IntoParams)]
#[into_params(parameter_in = Query)]
pub struct SearchQuery {
    /// Texto ou padrão (case-insensitive) buscado em name, email e mobile
    pub query: Option<String>,
}

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct UsersResponse {
    pub message: String,
    pub count: usize,
    pub users: Vec<User>,
}

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct SearchResponse {
    pub count: usize,
    pub users: Vec<User>,
}

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct MessageResponse {
    pub message: String,
}

#[derive(Debug, Serialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DeleteAllResponse {
    pub message: String,
    pub deleted_count: u64,
}

/// Formulário do import (documentação OpenAPI)
#[derive(utoipa::ToSchema)]
#[allow(dead_code)]
pub struct ImportForm {
    #[schema(value_type = String, format = Binary)]
    file: Vec<u8>,
}

/// Rotas `/users`. As rotas fixas vêm antes de `/{id}`.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/users")
            .app_data(web::JsonConfig::default().error_handler(json_error))
            .app_data(web::QueryConfig::default().error_handler(query_error))
            .route("", web::post().to(create_users))
            .route("", web::get().to(list_users))
            .route("/search", web::get().to(search_users))
            .route("/import", web::post().to(import_users))
            .route("/delete-all", web::delete().to(delete_all_users))
            .route("/{id}", web::get().to(get_user))
            .route("/{id}", web::put().to(update_user))
            .route("/{id}", web::delete().to(delete_user)),
    );
}

fn json_error(err: JsonPayloadError, _req: &HttpRequest) -> actix_web::Error {
    AppError::validation(format!("Invalid request body: {}", err)).into()
}

fn query_error(err: QueryPayloadError, _req: &HttpRequest) -> actix_web::Error {
    AppError::validation(format!("Invalid query string: {}", err)).into()
}

fn log_failure(route: &str, err: &AppError) {
    match err {
        AppError::DatabaseError(_) => log::error!("❌ {} failed: {}", route, err),
        _ => log::warn!("⚠️ {} rejected: {}", route, err),
    }
}

#[utoipa::path(
    post,
    path = "/users",
    tag = "Users",
    request_body = CreateUsersRequest,
    responses(
        (status = 201, description = "User created (single object) or users created (array)", body = UsersResponse),
        (status = 400, description = "Invalid body, duplicated or already used email/mobile")
    )
)]
pub async fn create_users(
    service: web::Data<UserService>,
    body: web::Json<CreateUsersRequest>,
) -> Result<HttpResponse, AppError> {
    log::info!("📝 POST /users");

    let created = service
        .create(body.into_inner())
        .await
        .inspect_err(|e| log_failure("POST /users", e))?;

    Ok(match created {
        CreatedUsers::Single(user) => HttpResponse::Created().json(user),
        CreatedUsers::Batch(users) => HttpResponse::Created().json(UsersResponse {
            message: "Bulk users created successfully".to_string(),
            count: users.len(),
            users,
        }),
    })
}

#[utoipa::path(
    get,
    path = "/users",
    tag = "Users",
    responses(
        (status = 200, description = "All users", body = Vec<User>)
    )
)]
pub async fn list_users(service: web::Data<UserService>) -> Result<HttpResponse, AppError> {
    log::info!("📋 GET /users");

    let users = service.list().await.inspect_err(|e| log_failure("GET /users", e))?;
    Ok(HttpResponse::Ok().json(users))
}

#[utoipa::path(
    get,
    path = "/users/search",
    tag = "Users",
    params(SearchQuery),
    responses(
        (status = 200, description = "Users matching the query", body = SearchResponse),
        (status = 400, description = "Missing or invalid query")
    )
)]
pub async fn search_users(
    service: web::Data<UserService>,
    query: web::Query<SearchQuery>,
) -> Result<HttpResponse, AppError> {
    log::info!("🔎 GET /users/search - query: {:?}", query.query);

    let users = service
        .search(query.query.as_deref())
        .await
        .inspect_err(|e| log_failure("GET /users/search", e))?;

    Ok(HttpResponse::Ok().json(SearchResponse { count: users.len(), users }))
}

#[utoipa::path(
    get,
    path = "/users/{id}",
    tag = "Users",
    params(("id" = String, Path, description = "User id")),
    responses(
        (status = 200, description = "User found", body = User),
        (status = 404, description = "User not found")
    )
)]
pub async fn get_user(
    service: web::Data<UserService>,
    path: web::Path<String>,
) -> Result<HttpResponse, AppError> {
    let id = path.into_inner();
    log::info!("👤 GET /users/{}", id);

    let user = service
        .get_by_id(&id)
        .await
        .inspect_err(|e| log_failure("GET /users/{id}", e))?;

    Ok(HttpResponse::Ok().json(user))
}

#[utoipa::path(
    put,
    path = "/users/{id}",
    tag = "Users",
    params(("id" = String, Path, description = "User id")),
    request_body = UpdateUserRequest,
    responses(
        (status = 200, description = "User updated", body = User),
        (status = 400, description = "Invalid field or email/mobile used by another user"),
        (status = 404, description = "User not found")
    )
)]
pub async fn update_user(
    service: web::Data<UserService>,
    path: web::Path<String>,
    body: web::Json<UpdateUserRequest>,
) -> Result<HttpResponse, AppError> {
    let id = path.into_inner();
    log::info!("🔧 PUT /users/{}", id);

    let user = service
        .update(&id, body.into_inner())
        .await
        .inspect_err(|e| log_failure("PUT /users/{id}", e))?;

    Ok(HttpResponse::Ok().json(user))
}

#[utoipa::path(
    delete,
    path = "/users/{id}",
    tag = "Users",
    params(("id" = String, Path, description = "User id")),
    responses(
        (status = 200, description = "User deleted", body = MessageResponse),
        (status = 404, description = "User not found")
    )
)]
pub async fn delete_user(
    service: web::Data<UserService>,
    path: web::Path<String>,
) -> Result<HttpResponse, AppError> {
    let id = path.into_inner();
    log::info!("🗑️  DELETE /users/{}", id);

    service
        .delete(&id)
        .await
        .inspect_err(|e| log_failure("DELETE /users/{id}", e))?;

    Ok(HttpResponse::Ok().json(MessageResponse {
        message: "User deleted successfully".to_string(),
    }))
}

#[utoipa::path(
    delete,
    path = "/users/delete-all",
    tag = "Users",
    responses(
        (status = 200, description = "All users deleted", body = DeleteAllResponse)
    )
)]
pub async fn delete_all_users(service: web::Data<UserService>) -> Result<HttpResponse, AppError> {
    log::info!("🗑️  DELETE /users/delete-all");

    let deleted_count = service
        .delete_all()
        .await
        .inspect_err(|e| log_failure("DELETE /users/delete-all", e))?;

    Ok(HttpResponse::Ok().json(DeleteAllResponse {
        message: "All users deleted successfully".to_string(),
        deleted_count,
    }))
}

#[utoipa::path(
    post,
    path = "/users/import",
    tag = "Users",
    request_body(content = ImportForm, content_type = "multipart/form-data"),
    responses(
        (status = 201, description = "Users imported", body = UsersResponse),
        (status = 400, description = "Invalid file, or import rejected with a duplicates report", body = ImportReport)
    )
)]
pub async fn import_users(
    service: web::Data<UserService>,
    file: UploadedFile,
) -> Result<HttpResponse, AppError> {
    log::info!("📥 POST /users/import - file: {:?} ({} bytes)", file.filename, file.bytes.len());

    let users = service
        .import(&file.bytes)
        .await
        .inspect_err(|e| log_failure("POST /users/import", e))?;

    Ok(HttpResponse::Created().json(UsersResponse {
        message: "Users imported successfully".to_string(),
        count: users.len(),
        users,
    }))
}
