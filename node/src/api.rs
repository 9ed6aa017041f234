//! # REST + WebSocket API
//!
//! Builds the axum router that exposes the provenance node's HTTP
//! interface. All endpoints share application state through axum's
//! `State` extractor.
//!
//! ## Endpoints
//!
//! | Method | Path                  | Description                          |
//! |--------|-----------------------|--------------------------------------|
//! | GET    | `/health`             | Liveness probe                       |
//! | GET    | `/api/status`         | Chain status summary                 |
//! | POST   | `/api/records`        | Submit a harvest record              |
//! | GET    | `/api/records`        | Recently mirrored records            |
//! | GET    | `/api/records/:hash`  | Mirrored record by block hash        |
//! | GET    | `/api/verify/:hash`   | Verify a label hash against the chain|
//! | GET    | `/ws`                 | WebSocket for live record events     |

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        Path, Query, State,
    },
    http::{Method, StatusCode},
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::{broadcast, RwLock};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use verdant_ledger::config::HASH_HEX_LENGTH;
use verdant_ledger::{Chain, Payload};

use crate::metrics::SharedMetrics;
use crate::qr::{verification_qr_data_url, VerificationQr};
use crate::store::{RecordStore, StoredRecord};

/// Default and ceiling for `GET /api/records?limit=`.
const DEFAULT_LIST_LIMIT: usize = 50;
const MAX_LIST_LIMIT: usize = 500;

// ---------------------------------------------------------------------------
// Application State
// ---------------------------------------------------------------------------

/// Shared application state available to all request handlers.
///
/// Cheap to clone, everything is behind `Arc`.
#[derive(Clone)]
pub struct AppState {
    /// Version string surfaced by `/api/status`.
    pub version: String,
    /// Public base URL embedded in QR verification links.
    pub public_url: String,
    /// The in-memory provenance chain. The write lock serializes the
    /// whole read-tip, seal, push sequence for every append.
    pub chain: Arc<RwLock<Chain>>,
    /// Persistent mirror of sealed records.
    pub store: Arc<RecordStore>,
    /// Broadcast channel for live event notifications.
    pub event_tx: broadcast::Sender<LedgerEvent>,
    /// Metric handles, shared with the exposition endpoint.
    pub metrics: SharedMetrics,
}

/// Events pushed to WebSocket subscribers.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum LedgerEvent {
    /// A record was sealed into the chain.
    #[serde(rename = "record_appended")]
    RecordAppended {
        index: u64,
        hash: String,
        short_id: String,
        herb_type: String,
        timestamp: u64,
    },
}

// ---------------------------------------------------------------------------
// Router Construction
// ---------------------------------------------------------------------------

/// Builds the full axum [`Router`] with all API routes, CORS, and tracing.
///
/// The returned router is ready to be served on the configured API port.
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health_handler))
        .route("/api/status", get(status_handler))
        .route(
            "/api/records",
            post(submit_record_handler).get(list_records_handler),
        )
        .route("/api/records/:hash", get(record_by_hash_handler))
        .route("/api/verify/:hash", get(verify_handler))
        .route("/ws", get(ws_handler))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

// ---------------------------------------------------------------------------
// Request & Response Types
// ---------------------------------------------------------------------------

/// Request payload for `POST /api/records`.
#[derive(Debug, Deserialize)]
pub struct SubmitRecordRequest {
    /// Who grew it.
    pub farmer_name: String,
    /// What was grown (e.g. "Tulsi", "Ashwagandha").
    pub herb_type: String,
    /// Where it was grown.
    pub location: String,
    /// Harvest season (free-form, e.g. "monsoon").
    pub season: String,
    /// Price per kilogram. Must be finite and non-negative.
    pub cost_per_kg: f64,
}

/// Response payload for `POST /api/records`.
#[derive(Debug, Serialize, Deserialize)]
pub struct SubmitRecordResponse {
    pub success: bool,
    pub message: String,
    /// Full hex digest of the sealed block. This is what goes on the label.
    pub block_hash: String,
    /// First characters of the digest, for display.
    pub short_id: String,
    /// Index of the sealed block.
    pub index: u64,
    /// Seal time, milliseconds since the Unix epoch.
    pub timestamp: u64,
    /// QR code as a base64 SVG `data:` URL.
    pub qr_code: String,
}

/// Response payload for `GET /api/verify/:hash`.
///
/// `verified` answers "is this hash in the chain"; `chain_intact` answers
/// "does the whole chain still revalidate". A scanner should treat a
/// record as authentic only when both are true.
#[derive(Debug, Serialize, Deserialize)]
pub struct VerifyResponse {
    pub verified: bool,
    /// The sealed payload, exactly as submitted. `None` on a miss.
    pub record: Option<Payload>,
    pub block_index: Option<u64>,
    pub timestamp: Option<u64>,
    pub chain_intact: bool,
    pub message: String,
}

/// Response payload for `GET /api/status`.
#[derive(Debug, Serialize, Deserialize)]
pub struct StatusResponse {
    /// Chain length, genesis included.
    pub total_blocks: u64,
    /// Result of a full revalidation performed for this request.
    pub is_valid: bool,
    /// Digest of the tip block.
    pub latest_hash: String,
    /// Software version of the answering node.
    pub version: String,
    /// RFC 3339 time the response was formed.
    pub timestamp: String,
}

/// Query parameters for `GET /api/records`.
#[derive(Debug, Deserialize)]
pub struct ListQuery {
    pub limit: Option<usize>,
}

/// Generic error body returned by REST endpoints on failure.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// `GET /health` - returns 200 if the node is alive.
///
/// This is the liveness probe for orchestrators (k8s, systemd, etc.).
/// It intentionally does not inspect the chain; that belongs in
/// `/api/status`.
async fn health_handler() -> impl IntoResponse {
    (StatusCode::OK, Json(serde_json::json!({ "status": "ok" })))
}

/// `GET /api/status` - returns the chain status summary.
///
/// Runs a full revalidation on every call, so the `is_valid` field is a
/// fresh verdict, never a cached one.
async fn status_handler(State(state): State<AppState>) -> impl IntoResponse {
    let status = {
        let chain = state.chain.read().await;
        chain.status()
    };

    state.metrics.chain_length.set(status.length as i64);
    state.metrics.chain_valid.set(i64::from(status.is_valid));

    Json(StatusResponse {
        total_blocks: status.length,
        is_valid: status.is_valid,
        latest_hash: status.latest_hash,
        version: state.version.clone(),
        timestamp: chrono::Utc::now().to_rfc3339(),
    })
}

/// `POST /api/records` - seals a harvest record into the chain.
///
/// The full flow: validate the submission, stamp the submission time,
/// seal the payload into a new block under the chain write lock, render
/// the QR code, mirror the row into the record store, and broadcast a
/// live event. A submission that fails validation or sealing leaves the
/// chain untouched.
async fn submit_record_handler(
    State(state): State<AppState>,
    Json(req): Json<SubmitRecordRequest>,
) -> impl IntoResponse {
    if let Err(reason) = validate_submission(&req) {
        return (StatusCode::BAD_REQUEST, Json(ErrorResponse { error: reason })).into_response();
    }

    let submission_time = chrono::Utc::now().to_rfc3339();
    let payload = Payload::new()
        .with("farmer_name", req.farmer_name.as_str())
        .with("herb_type", req.herb_type.as_str())
        .with("location", req.location.as_str())
        .with("season", req.season.as_str())
        .with("cost_per_kg", req.cost_per_kg)
        .with("submission_time", submission_time.as_str());

    let timer = state.metrics.append_latency_seconds.start_timer();
    let (index, timestamp, hash, short_id) = {
        let mut chain = state.chain.write().await;
        match chain.append(payload) {
            Ok(block) => {
                let facts = (
                    block.index,
                    block.timestamp,
                    block.hash.clone(),
                    block.short_id().to_string(),
                );
                state.metrics.chain_length.set(chain.len() as i64);
                facts
            }
            Err(e) => {
                return (
                    StatusCode::BAD_REQUEST,
                    Json(ErrorResponse {
                        error: format!("payload rejected: {e}"),
                    }),
                )
                    .into_response();
            }
        }
    };
    timer.observe_duration();
    state.metrics.records_appended_total.inc();

    let verify_url = format!(
        "{}/api/verify/{}",
        state.public_url.trim_end_matches('/'),
        hash
    );
    let qr_code = match verification_qr_data_url(&VerificationQr {
        block_hash: hash.clone(),
        herb: req.herb_type.clone(),
        farmer: req.farmer_name.clone(),
        verify_url,
    }) {
        Ok(data_url) => data_url,
        Err(e) => {
            // The block is sealed either way; losing the QR render after
            // the fact is a server error, not a rollback.
            tracing::error!(block = %short_id, "failed to render qr code: {}", e);
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse {
                    error: format!("record sealed as {hash}, but qr rendering failed: {e}"),
                }),
            )
                .into_response();
        }
    };

    let row = StoredRecord {
        farmer_name: req.farmer_name,
        herb_type: req.herb_type.clone(),
        location: req.location,
        season: req.season,
        cost_per_kg: req.cost_per_kg,
        submission_time,
        block_index: index,
        block_hash: hash.clone(),
        qr_code: qr_code.clone(),
    };
    // The chain stays the source of truth. A mirror failure is logged and
    // the submission still succeeds.
    if let Err(e) = state.store.insert(&row) {
        tracing::error!(block = %short_id, "failed to mirror record: {}", e);
    }

    let _ = state.event_tx.send(LedgerEvent::RecordAppended {
        index,
        hash: hash.clone(),
        short_id: short_id.clone(),
        herb_type: req.herb_type,
        timestamp,
    });

    tracing::info!(index, block = %short_id, "record sealed");

    (
        StatusCode::CREATED,
        Json(SubmitRecordResponse {
            success: true,
            message: "record sealed into the provenance chain".into(),
            block_hash: hash,
            short_id,
            index,
            timestamp,
            qr_code,
        }),
    )
        .into_response()
}

/// `GET /api/verify/:hash` - checks a label hash against the chain.
///
/// Lookups are exact and case-sensitive over the full lowercase hex
/// digest. A miss is a normal outcome (404 with `verified: false`), not
/// an internal error. Every call also revalidates the entire chain and
/// reports the result as `chain_intact`.
async fn verify_handler(
    Path(hash): Path<String>,
    State(state): State<AppState>,
) -> impl IntoResponse {
    // Full 64-character hex only. Short ids are display sugar, not keys.
    if hash.len() != HASH_HEX_LENGTH || hex::decode(&hash).is_err() {
        state
            .metrics
            .verifications_total
            .with_label_values(&["malformed"])
            .inc();
        return (
            StatusCode::BAD_REQUEST,
            Json(VerifyResponse {
                verified: false,
                record: None,
                block_index: None,
                timestamp: None,
                chain_intact: true,
                message: format!("malformed block hash: expected {HASH_HEX_LENGTH} hex characters"),
            }),
        )
            .into_response();
    }

    let chain = state.chain.read().await;
    let chain_intact = chain.is_valid();
    let found = chain
        .find_by_hash(&hash)
        .map(|block| (block.payload.clone(), block.index, block.timestamp));
    drop(chain);

    state.metrics.chain_valid.set(i64::from(chain_intact));

    match found {
        Some((payload, index, timestamp)) => {
            state
                .metrics
                .verifications_total
                .with_label_values(&["verified"])
                .inc();
            (
                StatusCode::OK,
                Json(VerifyResponse {
                    verified: true,
                    record: Some(payload),
                    block_index: Some(index),
                    timestamp: Some(timestamp),
                    chain_intact,
                    message: if chain_intact {
                        "record found and the chain is intact".into()
                    } else {
                        "record found, but the chain fails validation".into()
                    },
                }),
            )
                .into_response()
        }
        None => {
            state
                .metrics
                .verifications_total
                .with_label_values(&["unknown_hash"])
                .inc();
            (
                StatusCode::NOT_FOUND,
                Json(VerifyResponse {
                    verified: false,
                    record: None,
                    block_index: None,
                    timestamp: None,
                    chain_intact,
                    message: format!("no block with hash {hash} in this chain"),
                }),
            )
                .into_response()
        }
    }
}

/// `GET /api/records` - lists recently mirrored records, newest first.
///
/// Served from the persistent mirror, so rows from before the last
/// restart appear here even though their blocks are no longer in the
/// current chain.
async fn list_records_handler(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> impl IntoResponse {
    let limit = query.limit.unwrap_or(DEFAULT_LIST_LIMIT).min(MAX_LIST_LIMIT);

    match state.store.recent(limit) {
        Ok(rows) => (StatusCode::OK, Json(rows)).into_response(),
        Err(e) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(ErrorResponse {
                error: format!("record store error: {e}"),
            }),
        )
            .into_response(),
    }
}

/// `GET /api/records/:hash` - returns the mirrored row for a block hash.
///
/// This is the label-reprint path: it includes the stored QR code.
/// Returns 404 for a hash this node never mirrored.
async fn record_by_hash_handler(
    Path(hash): Path<String>,
    State(state): State<AppState>,
) -> impl IntoResponse {
    match state.store.get_by_hash(&hash) {
        Ok(Some(row)) => (StatusCode::OK, Json(row)).into_response(),
        Ok(None) => (
            StatusCode::NOT_FOUND,
            Json(ErrorResponse {
                error: format!("no mirrored record for hash {hash}"),
            }),
        )
            .into_response(),
        Err(e) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(ErrorResponse {
                error: format!("record store error: {e}"),
            }),
        )
            .into_response(),
    }
}

/// `GET /ws` - WebSocket upgrade for live event streaming.
///
/// Clients receive JSON-encoded [`LedgerEvent`] messages for each sealed
/// record. The connection is read-only from the server's perspective;
/// client messages are ignored.
async fn ws_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_ws_connection(socket, state))
}

/// Drives a single WebSocket connection, forwarding broadcast events
/// until the client disconnects or the channel is closed.
async fn handle_ws_connection(mut socket: WebSocket, state: AppState) {
    let mut rx = state.event_tx.subscribe();

    loop {
        tokio::select! {
            event = rx.recv() => {
                match event {
                    Ok(ev) => {
                        let payload = match serde_json::to_string(&ev) {
                            Ok(s) => s,
                            Err(e) => {
                                tracing::warn!("ws event not serializable: {e}");
                                continue;
                            }
                        };
                        if socket.send(Message::Text(payload.into())).await.is_err() {
                            // Peer went away.
                            break;
                        }
                    }
                    Err(broadcast::error::RecvError::Lagged(n)) => {
                        tracing::warn!(skipped = n, "slow ws subscriber, events dropped");
                    }
                    Err(broadcast::error::RecvError::Closed) => {
                        break;
                    }
                }
            }
            msg = socket.recv() => {
                match msg {
                    Some(Ok(_)) => {
                        // Push-only channel; client messages are ignored.
                    }
                    _ => break, // Closed or errored.
                }
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Submission Validation
// ---------------------------------------------------------------------------

/// Checks the submitted fields before anything touches the chain.
///
/// The chain core treats payloads as opaque; field requirements are this
/// service's contract with its submission form.
fn validate_submission(req: &SubmitRecordRequest) -> Result<(), String> {
    let required = [
        ("farmer_name", &req.farmer_name),
        ("herb_type", &req.herb_type),
        ("location", &req.location),
        ("season", &req.season),
    ];
    for (field, value) in required {
        if value.trim().is_empty() {
            return Err(format!("{field} must not be empty"));
        }
    }

    if !req.cost_per_kg.is_finite() || req.cost_per_kg < 0.0 {
        return Err("cost_per_kg must be a finite, non-negative number".into());
    }

    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
