#![allow(dead_code)]

use ad_rewards::{
    api::{self, AppState},
    config::ServiceConfig,
    ipfs::PinataClient,
    listings::OpenSeaClient,
    store::MemoryStore,
};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use warp::{http::StatusCode, Filter, Rejection, Reply};

pub const API_KEY: &str = "test-opensea-key";
pub const PINATA_KEY: &str = "pk";
pub const PINATA_SECRET: &str = "sk";
pub const DEAD_URL: &str = "http://127.0.0.1:9";

pub fn serve<F>(filter: F) -> String
where
    F: Filter<Error = Rejection> + Clone + Send + Sync + 'static,
    F::Extract: Reply,
{
    let (addr, server) = warp::serve(filter).bind_ephemeral(([127, 0, 0, 1], 0));
    tokio::spawn(server);
    format!("http://{}", addr)
}

pub fn order(token_id: &str, name: &str, wei: &str) -> Value {
    json!({
        "current_price": wei,
        "maker_asset_bundle": { "assets": [{
            "name": name,
            "description": format!("{} description", name),
            "image_url": format!("https://img.example/{}.png", token_id),
            "collection": { "name": "Test Collection" }
        }]},
        "protocol_data": { "parameters": { "offer": [{ "identifierOrCriteria": token_id }] } }
    })
}

/// OpenSea stand-in. Orders are only returned for the expected key and query.
pub fn fake_opensea(
    orders: Vec<Value>,
) -> impl Filter<Extract = impl Reply, Error = Rejection> + Clone {
    let listings = warp::path!("api" / "v2" / "orders" / "ethereum" / "seaport" / "listings")
        .and(warp::get())
        .and(warp::header::exact("x-api-key", API_KEY))
        .and(warp::query::<HashMap<String, String>>())
        .map(move |query: HashMap<String, String>| {
            let expected = query.get("order_by").map(String::as_str) == Some("created_date")
                && query.get("order_direction").map(String::as_str) == Some("desc")
                && query.get("limit").map(String::as_str) == Some("20");
            let orders = if expected { orders.clone() } else { Vec::new() };
            warp::reply::json(&json!({ "orders": orders }))
        });

    let collections = warp::path!("api" / "v1" / "collections")
        .and(warp::get())
        .and(warp::header::exact("x-api-key", API_KEY))
        .map(|| {
            warp::reply::json(&json!({ "collections": [
                {
                    "name": "Test Collection",
                    "description": "things",
                    "image_url": "https://img.example/c.png",
                    "primary_asset_contracts": [{ "address": "0x1111111111111111111111111111111111111111" }],
                    "stats": { "floor_price": 0.5, "total_volume": 120 }
                },
                {}
            ]}))
        });

    let assets = warp::path!("api" / "v1" / "assets")
        .and(warp::get())
        .and(warp::header::exact("x-api-key", API_KEY))
        .map(|| {
            warp::reply::json(&json!({ "assets": [
                { "token_id": "1", "name": "Sold", "last_sale": { "total_price": "3000000000000000000" } },
                { "token_id": "2", "name": "Unsold", "last_sale": null }
            ]}))
        });

    listings.or(collections).or(assets)
}

pub fn failing_upstream(status: u16) -> impl Filter<Extract = impl Reply, Error = Rejection> + Clone {
    warp::any().and_then(move || async move {
        Ok::<_, Rejection>(warp::reply::with_status(
            warp::reply::json(&json!({ "detail": "upstream exploded" })),
            StatusCode::from_u16(status).unwrap(),
        ))
    })
}

pub fn slow_upstream(delay: Duration) -> impl Filter<Extract = impl Reply, Error = Rejection> + Clone {
    warp::any().and_then(move || async move {
        tokio::time::sleep(delay).await;
        Ok::<_, Rejection>(warp::reply::json(&json!({ "orders": [] })))
    })
}

/// Pinata stand-in: hashes are derived from the pinned body.
pub fn fake_pinata() -> impl Filter<Extract = impl Reply, Error = Rejection> + Clone {
    warp::path!("pinning" / "pinJSONToIPFS")
        .and(warp::post())
        .and(warp::header::exact("pinata_api_key", PINATA_KEY))
        .and(warp::header::exact("pinata_secret_api_key", PINATA_SECRET))
        .and(warp::body::json::<Value>())
        .map(|body: Value| {
            let hash = format!("Qm{:08}", body.to_string().len());
            warp::reply::json(&json!({ "IpfsHash": hash, "PinSize": 42, "Timestamp": "2024-01-01T00:00:00Z" }))
        })
}

pub fn opensea_client(base_url: &str, timeout: Duration) -> OpenSeaClient {
    OpenSeaClient::new(base_url, Some(API_KEY.to_string()), 20, timeout).unwrap()
}

/// Full API on an ephemeral port, backed by a fresh in-memory store.
pub fn spawn_app(opensea_url: &str, pinata_url: Option<&str>) -> (String, Arc<MemoryStore>) {
    let store = Arc::new(MemoryStore::new());
    let pinata = match pinata_url {
        Some(url) => PinataClient::new(
            url,
            Some(PINATA_KEY.to_string()),
            Some(PINATA_SECRET.to_string()),
        ),
        None => PinataClient::new(DEAD_URL, None, None),
    }
    .unwrap();

    let state = Arc::new(AppState::new(
        store.clone(),
        opensea_client(opensea_url, Duration::from_secs(2)),
        pinata,
    ));

    let (addr, server) = warp::serve(api::routes(state)).bind_ephemeral(([127, 0, 0, 1], 0));
    tokio::spawn(server);
    (format!("http://{}", addr), store)
}

pub type Recorded = Arc<Mutex<Vec<Value>>>;

/// Balance backend that answers GETs with 404 and takes `delay` to accept each save.
pub fn slow_balance_api(
    delay: Duration,
) -> (impl Filter<Extract = impl Reply, Error = Rejection> + Clone, Recorded) {
    let saved: Recorded = Arc::default();
    let sink = saved.clone();

    let fetch = warp::path!("api" / "tokens").and(warp::get()).map(|| {
        warp::reply::with_status(
            warp::reply::json(&json!({ "error": "User not found" })),
            StatusCode::NOT_FOUND,
        )
    });
    let save = warp::path!("api" / "tokens")
        .and(warp::post())
        .and(warp::body::json::<Value>())
        .and_then(move |body: Value| {
            let sink = sink.clone();
            async move {
                tokio::time::sleep(delay).await;
                sink.lock().unwrap().push(body);
                Ok::<_, Rejection>(warp::reply::with_status(
                    warp::reply::json(&json!({ "message": "User data updated successfully" })),
                    StatusCode::OK,
                ))
            }
        });

    (fetch.or(save), saved)
}

/// JSON-RPC node that only knows `eth_chainId` (anvil's 31337).
pub fn fake_rpc() -> impl Filter<Extract = impl Reply, Error = Rejection> + Clone {
    warp::post()
        .and(warp::body::json::<Value>())
        .map(|request: Value| {
            warp::reply::json(&json!({ "jsonrpc": "2.0", "id": request["id"], "result": "0x7a69" }))
        })
}

pub fn scratch_path(name: &str) -> PathBuf {
    std::env::temp_dir()
        .join(format!("ad_rewards_it_{}_{}", std::process::id(), name))
        .join("session.json")
}

pub fn client_config(balance_url: &str, rpc_url: &str, session_path: &PathBuf) -> ServiceConfig {
    ServiceConfig {
        opensea_url: DEAD_URL.to_string(),
        opensea_api_key: None,
        listing_page_size: 20,
        pinata_url: DEAD_URL.to_string(),
        pinata_api_key: None,
        pinata_secret_api_key: None,
        rpc_url: rpc_url.to_string(),
        private_key: None,
        contract_address: None,
        bind_addr: "127.0.0.1:0".to_string(),
        balance_api_url: balance_url.to_string(),
        session_path: session_path.to_string_lossy().into_owned(),
    }
}
