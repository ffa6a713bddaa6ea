use utoipa::OpenApi;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "User Service API",
        version = "1.0.0",
        description = "CRUD API for user records (name, email, mobile).\n\n**Features:**\n- Single and bulk creation with duplicate checks\n- Case-insensitive search across name, email and mobile\n- Partial updates\n- JSON file import with a duplicates report\n- Health monitoring",
    ),
    paths(
        // Health
        crate::api::health::health_check,

        // Users
        crate::api::users::create_users,
        crate::api::users::list_users,
        crate::api::users::search_users,
        crate::api::users::get_user,
        crate::api::users::update_user,
        crate::api::users::delete_user,
        crate::api::users::delete_all_users,
        crate::api::users::import_users,
    ),
    components(
        schemas(
            // Health
            crate::api::health::HealthResponse,

            // Users
            crate::models::User,
            crate::models::CreateUserRequest,
            crate::models::CreateUsersRequest,
            crate::models::UpdateUserRequest,
            crate::models::ImportReport,
            crate::models::DuplicatesInFile,
            crate::models::ExistingInDatabase,
            crate::models::DuplicateGroup,
            crate::models::ExistingConflict,
            crate::api::users::UsersResponse,
            crate::api::users::SearchResponse,
            crate::api::users::MessageResponse,
            crate::api::users::DeleteAllResponse,
            crate::api::users::ImportForm,
        )
    ),
    tags(
        (name = "Health", description = "Health check endpoint for monitoring service and database status."),
        (name = "Users", description = "User records: create (single or bulk), list, search, update, delete and JSON import."),
    )
)]
pub struct ApiDoc;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_openapi_lists_user_routes() {
        let doc = ApiDoc::openapi();
        let paths = &doc.paths.paths;

        for path in ["/health", "/users", "/users/search", "/users/{id}", "/users/delete-all", "/users/import"] {
            assert!(paths.contains_key(path), "missing {}", path);
        }
    }
}
