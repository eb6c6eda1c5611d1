//! CRUD endpoints for users, houses, rooms and devices.
//!
//! Every resource shares the same handler set; the entity type picks the
//! table, key field and child policy inside the engine.

use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        Path, Query, State,
    },
    routing::{delete, get},
    Json, Router,
};
use hometree_core::{Device, Entity, EntityListQuery, House, Room, User};
use serde::{de::DeserializeOwned, Serialize};

use crate::error::ApiError;
use crate::json::ListParams;
use crate::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .merge(resource::<User>("users"))
        // Singular path kept for existing clients of the users delete endpoint.
        .route("/user/:key", delete(delete_entity::<User>))
        .merge(resource::<House>("houses"))
        .merge(resource::<Room>("rooms"))
        .merge(resource::<Device>("devices"))
}

fn resource<E>(collection: &str) -> Router<AppState>
where
    E: Entity + Serialize + DeserializeOwned,
    E::Patch: DeserializeOwned,
{
    Router::new()
        .route(
            &format!("/{collection}"),
            get(list_entities::<E>).post(create_entity::<E>),
        )
        .route(
            &format!("/{collection}/"),
            get(list_entities::<E>).post(create_entity::<E>),
        )
        .route(
            &format!("/{collection}/:key"),
            get(read_entity::<E>)
                .put(update_entity::<E>)
                .delete(delete_entity::<E>),
        )
}

async fn create_entity<E>(
    State(state): State<AppState>,
    body: Result<Json<E>, JsonRejection>,
) -> Result<Json<E>, ApiError>
where
    E: Entity + Serialize + DeserializeOwned,
{
    let Json(entity) = body?;
    let created = state.run(move |engine| engine.create(entity)).await?;
    Ok(Json(created))
}

async fn list_entities<E>(
    State(state): State<AppState>,
    params: Result<Query<ListParams>, QueryRejection>,
) -> Result<Json<Vec<E>>, ApiError>
where
    E: Entity + Serialize,
{
    let Query(params) = params?;
    let query = EntityListQuery::from(params);
    let entities = state.run(move |engine| engine.list::<E>(&query)).await?;
    Ok(Json(entities))
}

async fn read_entity<E>(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> Result<Json<E>, ApiError>
where
    E: Entity + Serialize,
{
    let entity = state.run(move |engine| engine.read::<E>(&key)).await?;
    Ok(Json(entity))
}

async fn update_entity<E>(
    State(state): State<AppState>,
    Path(key): Path<String>,
    body: Result<Json<E::Patch>, JsonRejection>,
) -> Result<Json<E>, ApiError>
where
    E: Entity + Serialize,
    E::Patch: DeserializeOwned,
{
    let Json(patch) = body?;
    let updated = state
        .run(move |engine| engine.update::<E>(&key, patch))
        .await?;
    Ok(Json(updated))
}

async fn delete_entity<E>(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> Result<Json<E>, ApiError>
where
    E: Entity + Serialize,
{
    let outcome = state.run(move |engine| engine.delete::<E>(&key)).await?;
    Ok(Json(outcome.entity))
}
