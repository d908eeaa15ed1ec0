#[derive(sqlx::FromRow, Debug, Clone)]
pub struct Admin {
    pub id: i32,
    pub email: String,
    pub password_hash: String,
}
