use utoipa::OpenApi;
use utoipa::ToSchema;
use uuid::Uuid;

#[derive(ToSchema)]
pub struct HealthResponse { pub status: String }

#[derive(ToSchema)]
pub struct RegisterRequest {
    pub tenant_id: Uuid,
    /// Used only when this registration creates the tenant
    pub tenant_name: Option<String>,
    pub email: String,
    pub name: String,
    pub password: String,
}

#[derive(ToSchema)]
pub struct LoginRequest { pub tenant_id: Uuid, pub email: String, pub password: String }

#[derive(ToSchema)]
pub struct NewIdeaRequest {
    pub title: String,
    pub description: Option<String>,
    pub category_id: Option<Uuid>,
    pub form_variant_id: Option<Uuid>,
    /// Values keyed by form field key
    #[schema(value_type = Object)]
    pub form_data: Option<serde_json::Value>,
}

#[derive(ToSchema)]
pub struct ChangeStatusRequest { pub status_id: Uuid, pub note: Option<String> }

#[derive(OpenApi)]
#[openapi(
    paths(
        crate::routes::health,
        crate::routes::auth::register,
        crate::routes::auth::login,
        crate::routes::auth::logout,
        crate::routes::auth::me,
        crate::routes::ideas::list,
        crate::routes::ideas::create,
        crate::routes::ideas::get_one,
        crate::routes::ideas::change_status,
    ),
    components(
        schemas(
            HealthResponse,
            RegisterRequest,
            LoginRequest,
            NewIdeaRequest,
            ChangeStatusRequest,
        )
    ),
    tags(
        (name = "health"),
        (name = "auth"),
        (name = "ideas")
    )
)]
pub struct ApiDoc;
