use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Debug, Serialize, Deserialize, sqlx::FromRow, ToSchema)]
pub struct Admin {
    pub id: u64,
    pub user_id: String,
    pub name: String,
    pub email: Option<String>,
}
