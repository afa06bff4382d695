// src/services/api_server.rs
//! API Server for the claim holder
//!
//! REST interface over one claim holder and its trusted issuer directory.
//! Mutating endpoints take the calling identity from the `X-Caller` header;
//! the registry then decides whether that caller may act.
//!
//! Endpoints:
//! - Claim lifecycle: add, get, change, remove, list by topic
//! - Claim id derivation and validity checks
//! - Audit event log
//! - Trusted issuer administration
//! - Manager delegation
//!
//! Numeric topics and schemes in JSON bodies are `0x`-prefixed hex strings;
//! in paths and query strings they may also be decimal.

use axum::{
    extract::{Json, Path, Query, Request, State},
    http::{HeaderMap, StatusCode},
    middleware::{self, Next},
    response::Response,
    routing::{get, post, put},
    Router,
};
use ethers_core::types::{Address, H256, U256};
use log::info;
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::str::FromStr;
use std::sync::{Arc, RwLockReadGuard, RwLockWriteGuard};
use tower::ServiceBuilder;
use tower_http::limit::RequestBodyLimitLayer;

use crate::contracts::claim_registry::{lock_registry, SharedRegistry};
use crate::contracts::trusted_issuers::{IssuerTrust, SharedDirectory, TrustedIssuerDirectory};
use crate::models::claim::{Claim, ClaimId, ClaimRequest};
use crate::models::events::{DirectoryEvent, LoggedEvent};
use crate::models::trusted_issuer::TrustedIssuerRecord;
use crate::services::api_error::ApiError;
use crate::services::verifier::{ClaimValidity, ClaimVerifier};
use crate::utils::crypto::derive_claim_id;

/// Header carrying the calling identity on mutating requests.
pub const CALLER_HEADER: &str = "x-caller";

// API request and response structures

/// Response carrying a claim id
#[derive(Serialize, Deserialize)]
pub struct ClaimIdResponse {
    pub claim_id: ClaimId,
}

/// Response for listing claims by topic
#[derive(Serialize, Deserialize)]
pub struct ClaimIdsResponse {
    pub topic: U256,
    pub claim_ids: Vec<ClaimId>,
}

/// Query for deriving a claim id
#[derive(Deserialize)]
struct DeriveIdQuery {
    issuer: Address,
    topic: String,
}

/// Query for reading the audit log
#[derive(Deserialize)]
struct EventsQuery {
    since: Option<u64>,
}

/// Request payload for adding a trusted issuer
#[derive(Serialize, Deserialize)]
pub struct TrustedIssuerRequest {
    pub issuer: Address,
    pub topics: Vec<U256>,
}

/// Request payload for replacing an issuer's topics
#[derive(Serialize, Deserialize)]
pub struct IssuerTopicsRequest {
    pub topics: Vec<U256>,
}

/// Response for a trust query
#[derive(Serialize, Deserialize)]
pub struct IssuerTrustResponse {
    pub issuer: Address,
    pub topic: U256,
    pub trusted: bool,
}

/// Response describing the trusted issuer directory
#[derive(Serialize, Deserialize)]
pub struct DirectoryInfoResponse {
    pub owner: Address,
    pub trusted_issuer_count: usize,
    pub event_count: usize,
}

/// Response for manager delegation changes
#[derive(Serialize, Deserialize)]
pub struct ManagerResponse {
    pub manager: Address,
    /// Whether the call changed the delegation set
    pub changed: bool,
}

/// API server state containing all service dependencies
#[derive(Clone)]
pub struct ApiServer {
    /// Claim holder, serialized behind a mutex
    registry: SharedRegistry,

    /// Trusted issuer directory the registry was built with
    directory: SharedDirectory,

    /// Validity checks over the same registry
    verifier: Arc<ClaimVerifier>,

    /// Maximum accepted request body size
    max_body_bytes: usize,
}

impl ApiServer {
    /// Creates a new instance of the API server
    ///
    /// # Arguments
    /// * `registry` - Claim holder to expose
    /// * `directory` - Directory the registry consults
    /// * `max_body_bytes` - Request body limit
    pub fn new(registry: SharedRegistry, directory: SharedDirectory, max_body_bytes: usize) -> Self {
        ApiServer {
            verifier: Arc::new(ClaimVerifier::new(registry.clone())),
            registry,
            directory,
            max_body_bytes,
        }
    }

    /// Builds the router with every route and middleware attached.
    pub fn router(&self) -> Router {
        Router::new()
            .route("/claims", post(Self::add_claim_handler))
            .route(
                "/claims/:id",
                get(Self::get_claim_handler)
                    .put(Self::change_claim_handler)
                    .delete(Self::remove_claim_handler),
            )
            .route("/claims/:id/validity", get(Self::claim_validity_handler))
            .route("/topics/:topic/claims", get(Self::claims_by_topic_handler))
            .route("/claim-id", get(Self::derive_claim_id_handler))
            .route("/events", get(Self::events_handler))
            .route(
                "/trusted-issuers",
                get(Self::list_trusted_issuers_handler).post(Self::add_trusted_issuer_handler),
            )
            .route(
                "/trusted-issuers/:issuer",
                put(Self::update_trusted_issuer_handler).delete(Self::remove_trusted_issuer_handler),
            )
            .route("/trusted-issuers/:issuer/topics/:topic", get(Self::issuer_trust_handler))
            .route("/directory", get(Self::directory_info_handler))
            .route("/directory-events", get(Self::directory_events_handler))
            .route(
                "/managers/:manager",
                post(Self::add_manager_handler).delete(Self::remove_manager_handler),
            )
            .layer(
                ServiceBuilder::new()
                    .layer(middleware::from_fn(log_request))
                    .layer(RequestBodyLimitLayer::new(self.max_body_bytes)),
            )
            .with_state(Arc::new(self.clone()))
    }

    /// Starts the API server and begins listening for requests
    ///
    /// # Arguments
    /// * `addr` - Socket address to bind to (e.g., "127.0.0.1:3000")
    pub async fn run(&self, addr: SocketAddr) -> anyhow::Result<()> {
        let app = self.router();
        let listener = tokio::net::TcpListener::bind(addr).await?;
        info!("API server listening on http://{}", addr);
        axum::serve(listener, app).await?;
        Ok(())
    }

    fn directory_ref(&self) -> Result<RwLockReadGuard<'_, TrustedIssuerDirectory>, ApiError> {
        self.directory
            .read()
            .map_err(|_| ApiError::Internal("trusted issuer directory lock poisoned".into()))
    }

    fn directory_mut(&self) -> Result<RwLockWriteGuard<'_, TrustedIssuerDirectory>, ApiError> {
        self.directory
            .write()
            .map_err(|_| ApiError::Internal("trusted issuer directory lock poisoned".into()))
    }

    // =====================
    // Claim Handlers
    // =====================

    /// Adds (or re-asserts) a claim
    ///
    /// # Endpoint
    /// POST /claims
    ///
    /// # Responses
    /// - 200 OK: Returns the claim id
    /// - 401 Unauthorized: Missing X-Caller header
    /// - 403 Forbidden: Caller may not manage this claim
    /// - 422 Unprocessable Entity: Untrusted issuer or malformed claim
    async fn add_claim_handler(
        State(state): State<Arc<ApiServer>>,
        headers: HeaderMap,
        Json(payload): Json<ClaimRequest>,
    ) -> Result<Json<ClaimIdResponse>, ApiError> {
        let caller = caller_from(&headers)?;
        let claim_id = lock_registry(&state.registry).request_add_claim(caller, payload)?;
        Ok(Json(ClaimIdResponse { claim_id }))
    }

    /// Reads a claim
    ///
    /// # Endpoint
    /// GET /claims/:id
    async fn get_claim_handler(
        State(state): State<Arc<ApiServer>>,
        Path(id): Path<String>,
    ) -> Result<Json<Claim>, ApiError> {
        let id = parse_claim_id(&id)?;
        let claim = lock_registry(&state.registry).get_claim(id)?;
        Ok(Json(claim))
    }

    /// Changes a claim and returns the updated record
    ///
    /// # Endpoint
    /// PUT /claims/:id
    ///
    /// # Responses
    /// - 200 OK: Returns the updated claim
    /// - 404 Not Found: No live claim at this id
    /// - 422 Unprocessable Entity: Issuer/topic do not derive the id
    async fn change_claim_handler(
        State(state): State<Arc<ApiServer>>,
        Path(id): Path<String>,
        headers: HeaderMap,
        Json(payload): Json<ClaimRequest>,
    ) -> Result<Json<Claim>, ApiError> {
        let caller = caller_from(&headers)?;
        let id = parse_claim_id(&id)?;
        let mut registry = lock_registry(&state.registry);
        registry.change_claim(caller, id, payload)?;
        Ok(Json(registry.get_claim(id)?))
    }

    /// Removes a claim
    ///
    /// # Endpoint
    /// DELETE /claims/:id
    ///
    /// # Responses
    /// - 204 No Content: Claim removed
    /// - 404 Not Found: No live claim at this id
    async fn remove_claim_handler(
        State(state): State<Arc<ApiServer>>,
        Path(id): Path<String>,
        headers: HeaderMap,
    ) -> Result<StatusCode, ApiError> {
        let caller = caller_from(&headers)?;
        let id = parse_claim_id(&id)?;
        lock_registry(&state.registry).remove_claim(caller, id)?;
        Ok(StatusCode::NO_CONTENT)
    }

    /// Checks whether a claim comes from a trusted issuer
    ///
    /// # Endpoint
    /// GET /claims/:id/validity
    async fn claim_validity_handler(
        State(state): State<Arc<ApiServer>>,
        Path(id): Path<String>,
    ) -> Result<Json<ClaimValidity>, ApiError> {
        let id = parse_claim_id(&id)?;
        Ok(Json(state.verifier.verify_claim(id)?))
    }

    /// Lists live claim ids for a topic in insertion order
    ///
    /// # Endpoint
    /// GET /topics/:topic/claims
    async fn claims_by_topic_handler(
        State(state): State<Arc<ApiServer>>,
        Path(topic): Path<String>,
    ) -> Result<Json<ClaimIdsResponse>, ApiError> {
        let topic = parse_u256(&topic)?;
        let claim_ids = lock_registry(&state.registry).get_claim_ids_by_topic(topic);
        Ok(Json(ClaimIdsResponse { topic, claim_ids }))
    }

    /// Computes the claim id for an issuer/topic pair without touching state
    ///
    /// # Endpoint
    /// GET /claim-id?issuer=0x..&topic=1
    async fn derive_claim_id_handler(Query(query): Query<DeriveIdQuery>) -> Result<Json<ClaimIdResponse>, ApiError> {
        let topic = parse_u256(&query.topic)?;
        Ok(Json(ClaimIdResponse {
            claim_id: derive_claim_id(query.issuer, topic),
        }))
    }

    /// Returns audit log entries, optionally from a sequence number on
    ///
    /// # Endpoint
    /// GET /events?since=0
    async fn events_handler(
        State(state): State<Arc<ApiServer>>,
        Query(query): Query<EventsQuery>,
    ) -> Json<Vec<LoggedEvent>> {
        let registry = lock_registry(&state.registry);
        Json(registry.sink().entries_since(query.since.unwrap_or(0)).to_vec())
    }

    // =====================
    // Trusted Issuer Handlers
    // =====================

    /// Lists trusted issuers with their topics
    ///
    /// # Endpoint
    /// GET /trusted-issuers
    async fn list_trusted_issuers_handler(
        State(state): State<Arc<ApiServer>>,
    ) -> Result<Json<Vec<TrustedIssuerRecord>>, ApiError> {
        let directory = state.directory_ref()?;
        let records = directory
            .trusted_issuers()
            .into_iter()
            .filter_map(|issuer| directory.record(issuer).cloned())
            .collect();
        Ok(Json(records))
    }

    /// Adds a trusted issuer (directory owner only)
    ///
    /// # Endpoint
    /// POST /trusted-issuers
    ///
    /// # Responses
    /// - 201 Created
    /// - 403 Forbidden: Caller is not the directory owner
    /// - 409 Conflict: Issuer already trusted
    async fn add_trusted_issuer_handler(
        State(state): State<Arc<ApiServer>>,
        headers: HeaderMap,
        Json(payload): Json<TrustedIssuerRequest>,
    ) -> Result<StatusCode, ApiError> {
        let caller = caller_from(&headers)?;
        state
            .directory_mut()?
            .add_trusted_issuer(caller, payload.issuer, payload.topics)?;
        Ok(StatusCode::CREATED)
    }

    /// Replaces the topics of a trusted issuer (directory owner only)
    ///
    /// # Endpoint
    /// PUT /trusted-issuers/:issuer
    async fn update_trusted_issuer_handler(
        State(state): State<Arc<ApiServer>>,
        Path(issuer): Path<String>,
        headers: HeaderMap,
        Json(payload): Json<IssuerTopicsRequest>,
    ) -> Result<StatusCode, ApiError> {
        let caller = caller_from(&headers)?;
        let issuer = parse_address(&issuer)?;
        state
            .directory_mut()?
            .update_issuer_topics(caller, issuer, payload.topics)?;
        Ok(StatusCode::NO_CONTENT)
    }

    /// Removes a trusted issuer (directory owner only)
    ///
    /// # Endpoint
    /// DELETE /trusted-issuers/:issuer
    async fn remove_trusted_issuer_handler(
        State(state): State<Arc<ApiServer>>,
        Path(issuer): Path<String>,
        headers: HeaderMap,
    ) -> Result<StatusCode, ApiError> {
        let caller = caller_from(&headers)?;
        let issuer = parse_address(&issuer)?;
        state.directory_mut()?.remove_trusted_issuer(caller, issuer)?;
        Ok(StatusCode::NO_CONTENT)
    }

    /// Whether the directory trusts an issuer for a topic. The subject's
    /// own claims are not directory entries and report `false` here.
    ///
    /// # Endpoint
    /// GET /trusted-issuers/:issuer/topics/:topic
    async fn issuer_trust_handler(
        State(state): State<Arc<ApiServer>>,
        Path((issuer, topic)): Path<(String, String)>,
    ) -> Result<Json<IssuerTrustResponse>, ApiError> {
        let issuer = parse_address(&issuer)?;
        let topic = parse_u256(&topic)?;
        let trusted = state.directory_ref()?.is_trusted_for(issuer, topic);
        Ok(Json(IssuerTrustResponse { issuer, topic, trusted }))
    }

    /// Directory owner and size
    ///
    /// # Endpoint
    /// GET /directory
    async fn directory_info_handler(
        State(state): State<Arc<ApiServer>>,
    ) -> Result<Json<DirectoryInfoResponse>, ApiError> {
        let directory = state.directory_ref()?;
        Ok(Json(DirectoryInfoResponse {
            owner: directory.owner(),
            trusted_issuer_count: directory.trusted_issuers().len(),
            event_count: directory.events().len(),
        }))
    }

    /// Directory administration events
    ///
    /// # Endpoint
    /// GET /directory-events
    async fn directory_events_handler(
        State(state): State<Arc<ApiServer>>,
    ) -> Result<Json<Vec<DirectoryEvent>>, ApiError> {
        let directory = state.directory_ref()?;
        Ok(Json(directory.events().to_vec()))
    }

    // =====================
    // Delegation Handlers
    // =====================

    /// Delegates claim management (subject only)
    ///
    /// # Endpoint
    /// POST /managers/:manager
    async fn add_manager_handler(
        State(state): State<Arc<ApiServer>>,
        Path(manager): Path<String>,
        headers: HeaderMap,
    ) -> Result<Json<ManagerResponse>, ApiError> {
        let caller = caller_from(&headers)?;
        let manager = parse_address(&manager)?;
        let changed = lock_registry(&state.registry).add_manager(caller, manager)?;
        Ok(Json(ManagerResponse { manager, changed }))
    }

    /// Revokes delegated claim management (subject only)
    ///
    /// # Endpoint
    /// DELETE /managers/:manager
    async fn remove_manager_handler(
        State(state): State<Arc<ApiServer>>,
        Path(manager): Path<String>,
        headers: HeaderMap,
    ) -> Result<Json<ManagerResponse>, ApiError> {
        let caller = caller_from(&headers)?;
        let manager = parse_address(&manager)?;
        let changed = lock_registry(&state.registry).remove_manager(caller, manager)?;
        Ok(Json(ManagerResponse { manager, changed }))
    }
}

/// Logs method, path and status of every request.
async fn log_request(request: Request, next: Next) -> Response {
    let method = request.method().clone();
    let path = request.uri().path().to_owned();
    let response = next.run(request).await;
    info!("{} {} -> {}", method, path, response.status().as_u16());
    response
}

/// Reads the calling identity from the `X-Caller` header.
fn caller_from(headers: &HeaderMap) -> Result<Address, ApiError> {
    headers
        .get(CALLER_HEADER)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| Address::from_str(value.trim()).ok())
        .ok_or(ApiError::MissingCaller)
}

fn parse_claim_id(value: &str) -> Result<ClaimId, ApiError> {
    H256::from_str(value).map_err(|_| ApiError::BadRequest(format!("invalid claim id {:?}", value)))
}

fn parse_address(value: &str) -> Result<Address, ApiError> {
    Address::from_str(value).map_err(|_| ApiError::BadRequest(format!("invalid address {:?}", value)))
}

/// Parses a decimal or `0x`-prefixed hex integer.
fn parse_u256(value: &str) -> Result<U256, ApiError> {
    let parsed = match value.strip_prefix("0x") {
        Some("") => None,
        Some(hex) => U256::from_str_radix(hex, 16).ok(),
        None if value.is_empty() => None,
        None => U256::from_dec_str(value).ok(),
    };
    parsed.ok_or_else(|| ApiError::BadRequest(format!("invalid integer {:?}", value)))
}
