use super::*;

pub async fn health_handler() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}
