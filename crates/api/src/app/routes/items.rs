use axum::{
    Json, Router,
    extract::{Extension, Path, Query},
    http::StatusCode,
    routing::{get, post},
};

use billbook_infra::Session;
use billbook_products::{Item, ItemId, ItemUpdate, NewItem};

use crate::app::dto::{self, NameQuery};
use crate::app::errors::{ApiResult, parse_id};
use crate::app::services::AppServices;

pub fn router() -> Router {
    Router::new()
        .route("/", post(create_item).get(list_items))
        .route("/lookup", get(lookup_item))
        .route("/:id", get(get_item).patch(update_item).delete(delete_item))
}

pub async fn create_item(
    Extension(services): Extension<AppServices>,
    Extension(session): Extension<Session>,
    Json(body): Json<NewItem>,
) -> ApiResult<(StatusCode, Json<Item>)> {
    let item = services.book().create_item(&session, body).await?;
    Ok((StatusCode::CREATED, Json(item)))
}

pub async fn list_items(
    Extension(services): Extension<AppServices>,
    Extension(session): Extension<Session>,
) -> ApiResult<Json<serde_json::Value>> {
    Ok(dto::items(services.book().list_items(&session).await?))
}

pub async fn lookup_item(
    Extension(services): Extension<AppServices>,
    Extension(session): Extension<Session>,
    Query(query): Query<NameQuery>,
) -> ApiResult<Json<Option<Item>>> {
    Ok(Json(services.book().find_item(&session, &query.name).await?))
}

pub async fn get_item(
    Extension(services): Extension<AppServices>,
    Extension(session): Extension<Session>,
    Path(id): Path<String>,
) -> ApiResult<Json<Item>> {
    let id: ItemId = parse_id(&id)?;
    Ok(Json(services.book().get_item(&session, id).await?))
}

pub async fn update_item(
    Extension(services): Extension<AppServices>,
    Extension(session): Extension<Session>,
    Path(id): Path<String>,
    Json(body): Json<ItemUpdate>,
) -> ApiResult<Json<Item>> {
    let id: ItemId = parse_id(&id)?;
    Ok(Json(services.book().update_item(&session, id, body).await?))
}

pub async fn delete_item(
    Extension(services): Extension<AppServices>,
    Extension(session): Extension<Session>,
    Path(id): Path<String>,
) -> ApiResult<StatusCode> {
    let id: ItemId = parse_id(&id)?;
    services.book().delete_item(&session, id).await?;
    Ok(StatusCode::NO_CONTENT)
}
