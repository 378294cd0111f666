//! Serverless-style API routes: marketplace proxy and the token balance document.

use bytes::Bytes;
use log::{error, info, warn};
use serde::Deserialize;
use serde_json::{json, Value};
use std::convert::Infallible;
use std::sync::Arc;
use warp::http::StatusCode;
use warp::reply::{json as json_reply, with_status, Json, WithStatus};
use warp::{Filter, Rejection, Reply};

use crate::balance::AdPerformance;
use crate::ipfs::PinataClient;
use crate::listings::OpenSeaClient;
use crate::store::{TokenData, UserStore};

type Response = WithStatus<Json>;

pub struct AppState {
    pub store: Arc<dyn UserStore>,
    pub opensea: OpenSeaClient,
    pub pinata: PinataClient,
}

impl AppState {
    pub fn new(store: Arc<dyn UserStore>, opensea: OpenSeaClient, pinata: PinataClient) -> Self {
        Self {
            store,
            opensea,
            pinata,
        }
    }
}

#[derive(Debug, Deserialize)]
struct NftQuery {
    #[serde(rename = "type")]
    kind: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TokensQuery {
    address: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SaveTokensRequest {
    address: Option<String>,
    token_data: Option<Value>,
}

fn reply(status: StatusCode, body: Value) -> Response {
    with_status(json_reply(&body), status)
}

fn error_reply(status: StatusCode, message: &str) -> Response {
    reply(status, json!({ "error": message }))
}

fn with_state(
    state: Arc<AppState>,
) -> impl Filter<Extract = (Arc<AppState>,), Error = Infallible> + Clone {
    warp::any().map(move || state.clone())
}

pub fn routes(
    state: Arc<AppState>,
) -> impl Filter<Extract = impl Reply, Error = Infallible> + Clone {
    let health = warp::path!("health")
        .and(warp::get())
        .map(|| reply(StatusCode::OK, json!({ "status": "ok" })));

    let nfts = warp::path!("api" / "nfts")
        .and(warp::get())
        .and(warp::query::<NftQuery>())
        .and(with_state(state.clone()))
        .and_then(get_nfts);

    let get_tokens = warp::path!("api" / "tokens")
        .and(warp::get())
        .and(warp::query::<TokensQuery>())
        .and(with_state(state.clone()))
        .and_then(get_tokens);

    let save_tokens = warp::path!("api" / "tokens")
        .and(warp::post())
        .and(warp::body::bytes())
        .and(with_state(state))
        .and_then(save_tokens);

    health
        .or(nfts)
        .or(get_tokens)
        .or(save_tokens)
        .recover(handle_rejection)
}

async fn get_nfts(query: NftQuery, state: Arc<AppState>) -> Result<Response, Infallible> {
    let (failed, body) = match query.kind.as_deref() {
        Some("collections") => {
            let collections = state.opensea.fetch_collections().await;
            (collections.is_error(), serde_json::to_value(&collections))
        }
        Some("assets") => {
            let assets = state.opensea.fetch_assets().await;
            (assets.is_error(), serde_json::to_value(&assets))
        }
        _ => {
            let listings = state.opensea.fetch_listings().await;
            (listings.is_error(), serde_json::to_value(&listings))
        }
    };

    Ok(match body {
        Ok(body) if failed => reply(StatusCode::INTERNAL_SERVER_ERROR, body),
        Ok(body) => reply(StatusCode::OK, body),
        Err(e) => {
            error!("Failed to encode listings: {}", e);
            error_reply(StatusCode::INTERNAL_SERVER_ERROR, "Error fetching NFTs")
        }
    })
}

async fn get_tokens(query: TokensQuery, state: Arc<AppState>) -> Result<Response, Infallible> {
    let address = match query.address.filter(|a| !a.trim().is_empty()) {
        Some(address) => address,
        None => return Ok(error_reply(StatusCode::BAD_REQUEST, "Invalid input")),
    };

    Ok(match state.store.find(&address) {
        Ok(Some(user)) => {
            let ad_performance = user.data.ad_performance.unwrap_or(AdPerformance {
                impressions: 0,
                clicks: 0,
                earnings: 0.0,
            });
            reply(
                StatusCode::OK,
                json!({
                    "tokens": user.data.tokens.unwrap_or(0),
                    "adPerformance": ad_performance,
                    "tokenHistory": user.data.token_history.unwrap_or_default(),
                }),
            )
        }
        Ok(None) => error_reply(StatusCode::NOT_FOUND, "User not found"),
        Err(e) => {
            error!("Failed to fetch user data for {}: {}", address, e);
            error_reply(StatusCode::INTERNAL_SERVER_ERROR, "Failed to fetch user data")
        }
    })
}

async fn save_tokens(body: Bytes, state: Arc<AppState>) -> Result<Response, Infallible> {
    let invalid = || error_reply(StatusCode::BAD_REQUEST, "Invalid input");

    let request: SaveTokensRequest = match serde_json::from_slice(&body) {
        Ok(request) => request,
        Err(_) => return Ok(invalid()),
    };
    let (address, raw_data) = match (
        request.address.filter(|a| !a.trim().is_empty()),
        request.token_data,
    ) {
        (Some(address), Some(raw_data)) => (address, raw_data),
        _ => return Ok(invalid()),
    };
    let token_data: TokenData = match serde_json::from_value(raw_data.clone()) {
        Ok(data) => data,
        Err(e) => {
            warn!("Rejected token data for {}: {}", address, e);
            return Ok(invalid());
        }
    };

    let ipfs_hash = match state.pinata.pin_json(&raw_data).await {
        Ok(hash) => hash,
        Err(e) => {
            error!("Error in POST request for {}: {}", address, e);
            let message = if e.is_missing_credential() {
                e.to_string()
            } else {
                "Failed to update user data".to_string()
            };
            return Ok(error_reply(StatusCode::INTERNAL_SERVER_ERROR, &message));
        }
    };

    Ok(match state.store.upsert(&address, token_data, ipfs_hash.clone()) {
        Ok(outcome) => {
            info!("Token data for {} saved ({:?})", address, outcome);
            reply(
                StatusCode::OK,
                json!({ "message": "User data updated successfully", "ipfsHash": ipfs_hash }),
            )
        }
        Err(e) => {
            error!("Failed to update user data for {}: {}", address, e);
            error_reply(StatusCode::INTERNAL_SERVER_ERROR, "Failed to update user data")
        }
    })
}

async fn handle_rejection(err: Rejection) -> Result<Response, Infallible> {
    let (status, message) = if err.is_not_found() {
        (StatusCode::NOT_FOUND, "Not found".to_string())
    } else if err.find::<warp::reject::MethodNotAllowed>().is_some() {
        (StatusCode::METHOD_NOT_ALLOWED, "Method Not Allowed".to_string())
    } else if err.find::<warp::reject::InvalidQuery>().is_some() {
        (StatusCode::BAD_REQUEST, "Invalid input".to_string())
    } else {
        warn!("Unhandled rejection: {:?}", err);
        (StatusCode::INTERNAL_SERVER_ERROR, "Internal error".to_string())
    };
    Ok(error_reply(status, &message))
}
