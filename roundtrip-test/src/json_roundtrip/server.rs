use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

use axum::Json;
use axum::Router;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Item {
    pub id: u32,
    pub name: String,
}

#[derive(Debug, Deserialize)]
pub struct NewItem {
    pub name: String,
}

#[derive(Default)]
struct Store {
    next_id: u32,
    items: BTreeMap<u32, Item>,
}

type Shared = Arc<Mutex<Store>>;

pub fn app() -> Router {
    Router::new()
        .route("/items", get(list).post(create))
        .route("/items/{id}", get(fetch).put(update).delete(remove))
        .route("/search", get(search))
        .with_state(Shared::default())
}

fn not_found(id: u32) -> Response {
    (StatusCode::NOT_FOUND, format!("item {id} not found")).into_response()
}

async fn list(State(store): State<Shared>) -> Json<Vec<Item>> {
    let store = store.lock().unwrap_or_else(|e| e.into_inner());
    Json(store.items.values().cloned().collect())
}

async fn create(State(store): State<Shared>, Json(new): Json<NewItem>) -> (StatusCode, Json<Item>) {
    let mut store = store.lock().unwrap_or_else(|e| e.into_inner());
    store.next_id += 1;
    let item = Item {
        id: store.next_id,
        name: new.name,
    };
    store.items.insert(item.id, item.clone());
    (StatusCode::CREATED, Json(item))
}

async fn fetch(State(store): State<Shared>, Path(id): Path<u32>) -> Response {
    let store = store.lock().unwrap_or_else(|e| e.into_inner());
    match store.items.get(&id) {
        Some(item) => Json(item.clone()).into_response(),
        None => not_found(id),
    }
}

async fn update(
    State(store): State<Shared>,
    Path(id): Path<u32>,
    Json(new): Json<NewItem>,
) -> Response {
    let mut store = store.lock().unwrap_or_else(|e| e.into_inner());
    match store.items.get_mut(&id) {
        Some(item) => {
            item.name = new.name;
            Json(item.clone()).into_response()
        }
        None => not_found(id),
    }
}

async fn remove(State(store): State<Shared>, Path(id): Path<u32>) -> Response {
    let mut store = store.lock().unwrap_or_else(|e| e.into_inner());
    match store.items.remove(&id) {
        Some(_) => StatusCode::NO_CONTENT.into_response(),
        None => not_found(id),
    }
}

/// Echo the query string back as a list of pairs.
async fn search(Query(pairs): Query<Vec<(String, String)>>) -> Json<Vec<(String, String)>> {
    Json(pairs)
}
