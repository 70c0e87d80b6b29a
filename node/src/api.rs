//! # REST API
//!
//! Builds the axum router that exposes a bank deployment over HTTP. All
//! endpoints share application state through axum's `State` extractor.
//!
//! ## Endpoints
//!
//! | Method | Path                           | Description                      |
//! |--------|--------------------------------|----------------------------------|
//! | GET    | `/health`                      | Liveness probe                   |
//! | GET    | `/status`                      | Roles, pause flag, logic version |
//! | GET    | `/balances/:account/:asset`    | Ledger entry                     |
//! | GET    | `/solvency/:asset`             | Ledger total vs. custody         |
//! | GET    | `/nonces/:account`             | Next signed-transfer nonce       |
//! | POST   | `/deposit/native`              | Deposit native coin              |
//! | POST   | `/deposit/token`               | Deposit an approved token amount |
//! | POST   | `/withdraw/native`             | Withdraw native coin             |
//! | POST   | `/withdraw/token`              | Withdraw tokens                  |
//! | POST   | `/transfer`                    | Operator transfer (V2)           |
//! | POST   | `/transfer/signed`             | Holder-signed transfer (V2)      |
//! | POST   | `/admin/pause`                 | Pause (admin)                    |
//! | POST   | `/admin/unpause`               | Unpause (admin)                  |
//! | POST   | `/admin/admin`                 | Replace the admin                |
//! | POST   | `/admin/owner`                 | Transfer ownership               |
//! | POST   | `/admin/upgrade`               | Switch logic revision (owner)    |
//!
//! With devnet enabled, `/devnet/faucet`, `/devnet/tokens`,
//! `/devnet/tokens/:token/mint` and `/devnet/tokens/:token/approve` mint
//! coin, issue tokens and stand in for wallet-side approvals.
//!
//! Request bodies carry a `caller` address that is trusted as the message
//! sender. Bank errors come back as `{ "error": <kind>, "message": <text> }`.

use axum::{
    extract::{Path, State},
    http::{Method, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use vaultbank_contracts::{BankProxy, SharedBank, Solvency};
use vaultbank_protocol::authorization::TransferAuthorization;
use vaultbank_protocol::config::PausePolicy;
use vaultbank_protocol::storage::{LogicVersion, MemoryStore, SledStore, Store, StoreResult};
use vaultbank_protocol::vault::{FungibleToken, NativeError, StandardToken, TokenError, TokenInfo};
use vaultbank_protocol::{Address, AssetId, BankError, BankResult, Receipt};

use crate::metrics::SharedMetrics;

// ---------------------------------------------------------------------------
// Application State
// ---------------------------------------------------------------------------

/// Shared application state available to all request handlers.
///
/// Cheap to clone: everything behind `Arc`.
#[derive(Clone)]
pub struct AppState {
    /// The node's reported version string.
    pub version: String,
    pub bank: Arc<SharedBank>,
    /// Reported by `/status`; the proxy enforces it.
    pub pause_policy: PausePolicy,
    pub metrics: SharedMetrics,
    /// Present when the devnet endpoints are mounted.
    pub devnet: Option<Devnet>,
}

/// Where newly issued devnet tokens keep their state.
#[derive(Clone)]
pub enum TokenStorage {
    /// One sled tree per token, named by [`token_namespace`].
    Sled(SledStore),
    Memory,
}

impl TokenStorage {
    pub fn open(&self, token: &Address) -> StoreResult<Arc<dyn Store>> {
        match self {
            TokenStorage::Sled(db) => Ok(Arc::new(db.namespace(&token_namespace(token))?)),
            TokenStorage::Memory => Ok(Arc::new(MemoryStore::new())),
        }
    }
}

/// The sled tree a token lives in.
pub fn token_namespace(token: &Address) -> String {
    format!("token-{}", token.to_hex())
}

/// Devnet token issuance state.
#[derive(Clone)]
pub struct Devnet {
    pub storage: TokenStorage,
    /// Tokens this node issued, by address. Only these can be minted.
    pub issued: Arc<RwLock<HashMap<Address, Arc<StandardToken>>>>,
}

impl Devnet {
    pub fn new(storage: TokenStorage) -> Self {
        Self {
            storage,
            issued: Arc::new(RwLock::new(HashMap::new())),
        }
    }
}

impl AppState {
    fn devnet(&self) -> Result<&Devnet, ApiError> {
        self.devnet
            .as_ref()
            .ok_or_else(|| ApiError::NotFound("devnet endpoints are disabled".into()))
    }
}

// ---------------------------------------------------------------------------
// Router Construction
// ---------------------------------------------------------------------------

/// Builds the full axum [`Router`] with all API routes, CORS, and tracing.
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers(Any);

    let mut router = Router::new()
        .route("/health", get(health_handler))
        .route("/status", get(status_handler))
        .route("/balances/:account/:asset", get(balance_handler))
        .route("/solvency/:asset", get(solvency_handler))
        .route("/nonces/:account", get(nonce_handler))
        .route("/deposit/native", post(deposit_native_handler))
        .route("/deposit/token", post(deposit_token_handler))
        .route("/withdraw/native", post(withdraw_native_handler))
        .route("/withdraw/token", post(withdraw_token_handler))
        .route("/transfer", post(transfer_handler))
        .route("/transfer/signed", post(transfer_signed_handler))
        .route("/admin/pause", post(pause_handler))
        .route("/admin/unpause", post(unpause_handler))
        .route("/admin/admin", post(update_admin_handler))
        .route("/admin/owner", post(transfer_ownership_handler))
        .route("/admin/upgrade", post(upgrade_handler));

    if state.devnet.is_some() {
        router = router
            .route("/devnet/faucet", post(faucet_handler))
            .route("/devnet/tokens", post(create_token_handler))
            .route("/devnet/tokens/:token/mint", post(mint_handler))
            .route("/devnet/tokens/:token/approve", post(approve_handler));
    }

    router
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Body returned by every endpoint on failure.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Stable error kind, e.g. `InsufficientBalance`.
    pub error: String,
    pub message: String,
}

#[derive(Debug)]
pub enum ApiError {
    Bank(BankError),
    Token(TokenError),
    Native(NativeError),
    BadRequest(String),
    NotFound(String),
    Internal(String),
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self {
            ApiError::Bank(e) => match e.kind() {
                "Unauthorized" => StatusCode::FORBIDDEN,
                "SystemPaused" | "AlreadyPaused" | "AlreadyActive" | "AlreadyInitialized"
                | "Reentrancy" => StatusCode::CONFLICT,
                "ZeroAmount" | "InvalidAddress" => StatusCode::BAD_REQUEST,
                "NotInitialized" => StatusCode::SERVICE_UNAVAILABLE,
                "Storage" => StatusCode::INTERNAL_SERVER_ERROR,
                _ => StatusCode::UNPROCESSABLE_ENTITY,
            },
            ApiError::Token(e) => match e {
                TokenError::UnauthorizedMint => StatusCode::FORBIDDEN,
                TokenError::DuplicateSymbol(_) => StatusCode::CONFLICT,
                TokenError::TokenNotFound(_) => StatusCode::NOT_FOUND,
                TokenError::ZeroAddress => StatusCode::BAD_REQUEST,
                TokenError::Uninitialized | TokenError::Storage(_) => {
                    StatusCode::INTERNAL_SERVER_ERROR
                }
                _ => StatusCode::UNPROCESSABLE_ENTITY,
            },
            ApiError::Native(e) => match e {
                NativeError::ZeroAddress => StatusCode::BAD_REQUEST,
                NativeError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
                _ => StatusCode::UNPROCESSABLE_ENTITY,
            },
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn kind(&self) -> &'static str {
        match self {
            ApiError::Bank(e) => e.kind(),
            ApiError::Token(e) => match e {
                TokenError::InsufficientBalance { .. } => "InsufficientBalance",
                TokenError::InsufficientAllowance { .. } => "InsufficientAllowance",
                TokenError::UnauthorizedMint => "Unauthorized",
                TokenError::SupplyOverflow { .. } => "Overflow",
                TokenError::ZeroAddress => "InvalidAddress",
                TokenError::DuplicateSymbol(_) => "DuplicateSymbol",
                TokenError::TokenNotFound(_) => "TokenNotFound",
                TokenError::Uninitialized | TokenError::Storage(_) => "Storage",
            },
            ApiError::Native(e) => match e {
                NativeError::InsufficientFunds { .. } => "InsufficientBalance",
                NativeError::Overflow { .. } => "Overflow",
                NativeError::Rejected { .. } => "TransferFailed",
                NativeError::ZeroAddress => "InvalidAddress",
                NativeError::Storage(_) => "Storage",
            },
            ApiError::BadRequest(_) => "BadRequest",
            ApiError::NotFound(_) => "NotFound",
            ApiError::Internal(_) => "Internal",
        }
    }

    fn message(&self) -> String {
        match self {
            ApiError::Bank(e) => e.to_string(),
            ApiError::Token(e) => e.to_string(),
            ApiError::Native(e) => e.to_string(),
            ApiError::BadRequest(m) | ApiError::NotFound(m) | ApiError::Internal(m) => m.clone(),
        }
    }
}

impl From<BankError> for ApiError {
    fn from(e: BankError) -> Self {
        ApiError::Bank(e)
    }
}

impl From<TokenError> for ApiError {
    fn from(e: TokenError) -> Self {
        ApiError::Token(e)
    }
}

impl From<NativeError> for ApiError {
    fn from(e: NativeError) -> Self {
        ApiError::Native(e)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(kind = self.kind(), error = %self.message(), "request failed");
        }
        let body = ErrorResponse {
            error: self.kind().to_string(),
            message: self.message(),
        };
        (status, Json(body)).into_response()
    }
}

type ApiResult<T> = Result<T, ApiError>;

fn parse_address(field: &str, raw: &str) -> ApiResult<Address> {
    raw.parse()
        .map_err(|e| ApiError::BadRequest(format!("invalid {}: {}", field, e)))
}

fn parse_asset(raw: &str) -> ApiResult<AssetId> {
    raw.parse()
        .map_err(|e| ApiError::BadRequest(format!("invalid asset: {}", e)))
}

// ---------------------------------------------------------------------------
// Request / Response Types
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub struct CallerRequest {
    pub caller: Address,
}

#[derive(Debug, Deserialize)]
pub struct NativeAmountRequest {
    pub caller: Address,
    pub amount: u64,
}

#[derive(Debug, Deserialize)]
pub struct TokenAmountRequest {
    pub caller: Address,
    pub token: Address,
    pub amount: u64,
}

/// Operator transfer. `external` pays `to` out of custody instead of
/// crediting its ledger entry.
#[derive(Debug, Deserialize)]
pub struct TransferRequest {
    pub caller: Address,
    pub from: Address,
    pub to: Address,
    pub asset: AssetId,
    pub amount: u64,
    #[serde(default)]
    pub external: bool,
}

/// A relayed transfer. `caller` is the relayer, not the account holder.
#[derive(Debug, Deserialize)]
pub struct SignedTransferRequest {
    pub caller: Address,
    pub authorization: TransferAuthorization,
}

#[derive(Debug, Deserialize)]
pub struct UpdateAdminRequest {
    pub caller: Address,
    pub admin: Address,
}

#[derive(Debug, Deserialize)]
pub struct TransferOwnershipRequest {
    pub caller: Address,
    pub owner: Address,
}

#[derive(Debug, Deserialize)]
pub struct UpgradeRequest {
    pub caller: Address,
    pub target: LogicVersion,
}

#[derive(Debug, Deserialize)]
pub struct FaucetRequest {
    pub account: Address,
    pub amount: u64,
}

#[derive(Debug, Deserialize)]
pub struct CreateTokenRequest {
    pub issuer: Address,
    pub name: String,
    pub symbol: String,
    #[serde(default)]
    pub decimals: u8,
}

#[derive(Debug, Deserialize)]
pub struct MintRequest {
    /// Must be the token's issuer.
    pub caller: Address,
    pub to: Address,
    pub amount: u64,
}

#[derive(Debug, Deserialize)]
pub struct ApproveRequest {
    pub owner: Address,
    pub spender: Address,
    pub amount: u64,
}

/// Response payload for `GET /status`.
#[derive(Debug, Serialize, Deserialize)]
pub struct StatusResponse {
    pub version: String,
    /// The proxy's custody address.
    pub bank: Address,
    pub owner: Address,
    pub admin: Address,
    pub paused: bool,
    pub logic_version: LogicVersion,
    pub pause_policy: PausePolicy,
    /// RFC 3339 timestamp of the response.
    pub timestamp: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct BalanceResponse {
    pub account: Address,
    pub asset: AssetId,
    pub balance: u64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct NonceResponse {
    pub account: Address,
    pub nonce: u64,
}

/// Native or token holdings outside the bank, after a devnet mint.
#[derive(Debug, Serialize, Deserialize)]
pub struct HoldingResponse {
    pub account: Address,
    pub asset: AssetId,
    pub held: u64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct AllowanceResponse {
    pub token: Address,
    pub owner: Address,
    pub spender: Address,
    pub allowance: u64,
}

// ---------------------------------------------------------------------------
// Execution
// ---------------------------------------------------------------------------

/// Runs one entry point through the shared handle on the blocking pool,
/// records its outcome, and refreshes the state gauges.
async fn execute<F>(state: &AppState, operation: &'static str, f: F) -> ApiResult<Json<Receipt>>
where
    F: FnOnce(&mut BankProxy) -> BankResult<Receipt> + Send + 'static,
{
    let bank = Arc::clone(&state.bank);
    let started = Instant::now();
    let result = tokio::task::spawn_blocking(move || bank.call(f))
        .await
        .map_err(|e| ApiError::Internal(format!("{} did not complete: {}", operation, e)))?;

    let outcome = match &result {
        Ok(_) => "ok",
        Err(e) => e.kind(),
    };
    state.metrics.observe(operation, outcome, started.elapsed());
    state.metrics.record_state(&state.bank.view());

    Ok(Json(result?))
}

// ---------------------------------------------------------------------------
// Query Handlers
// ---------------------------------------------------------------------------

/// `GET /health`: returns 200 if the node is alive.
async fn health_handler() -> impl IntoResponse {
    (StatusCode::OK, Json(serde_json::json!({ "status": "ok" })))
}

/// `GET /status`: roles, pause flag and active logic, read from
/// committed storage.
async fn status_handler(State(state): State<AppState>) -> ApiResult<Json<StatusResponse>> {
    let view = state.bank.view();
    let roles = view.roles()?;
    Ok(Json(StatusResponse {
        version: state.version.clone(),
        bank: state.bank.address(),
        owner: roles.owner,
        admin: roles.admin,
        paused: view.is_paused()?,
        logic_version: view.logic_version()?,
        pause_policy: state.pause_policy,
        timestamp: chrono::Utc::now().to_rfc3339(),
    }))
}

async fn balance_handler(
    Path((account, asset)): Path<(String, String)>,
    State(state): State<AppState>,
) -> ApiResult<Json<BalanceResponse>> {
    let account = parse_address("account", &account)?;
    let asset = parse_asset(&asset)?;
    let balance = state.bank.view().balance_of(&account, &asset)?;
    Ok(Json(BalanceResponse {
        account,
        asset,
        balance,
    }))
}

async fn solvency_handler(
    Path(asset): Path<String>,
    State(state): State<AppState>,
) -> ApiResult<Json<Solvency>> {
    let asset = parse_asset(&asset)?;
    let solvency = state.bank.view().solvency(&asset)?;
    if !solvency.solvent {
        warn!(%asset, ledger = %solvency.ledger_total, custody = solvency.custody, "ledger exceeds custody");
    }
    Ok(Json(solvency))
}

async fn nonce_handler(
    Path(account): Path<String>,
    State(state): State<AppState>,
) -> ApiResult<Json<NonceResponse>> {
    let account = parse_address("account", &account)?;
    let nonce = state.bank.view().nonce_of(&account)?;
    Ok(Json(NonceResponse { account, nonce }))
}

// ---------------------------------------------------------------------------
// Entry Point Handlers
// ---------------------------------------------------------------------------

async fn deposit_native_handler(
    State(state): State<AppState>,
    Json(req): Json<NativeAmountRequest>,
) -> ApiResult<Json<Receipt>> {
    execute(&state, "deposit_native", move |bank| {
        bank.deposit_native(req.caller, req.amount)
    })
    .await
}

async fn deposit_token_handler(
    State(state): State<AppState>,
    Json(req): Json<TokenAmountRequest>,
) -> ApiResult<Json<Receipt>> {
    execute(&state, "deposit_token", move |bank| {
        bank.deposit_token(req.caller, req.token, req.amount)
    })
    .await
}

async fn withdraw_native_handler(
    State(state): State<AppState>,
    Json(req): Json<NativeAmountRequest>,
) -> ApiResult<Json<Receipt>> {
    execute(&state, "withdraw_native", move |bank| {
        bank.withdraw_native(req.caller, req.amount)
    })
    .await
}

async fn withdraw_token_handler(
    State(state): State<AppState>,
    Json(req): Json<TokenAmountRequest>,
) -> ApiResult<Json<Receipt>> {
    execute(&state, "withdraw_token", move |bank| {
        bank.withdraw_token(req.caller, req.token, req.amount)
    })
    .await
}

/// `POST /transfer`: picks the entry point from the asset and the
/// `external` flag.
async fn transfer_handler(
    State(state): State<AppState>,
    Json(req): Json<TransferRequest>,
) -> ApiResult<Json<Receipt>> {
    let TransferRequest {
        caller,
        from,
        to,
        asset,
        amount,
        external,
    } = req;
    match (asset, external) {
        (AssetId::Native, false) => {
            execute(&state, "transfer_native", move |bank| {
                bank.transfer_native(caller, from, to, amount)
            })
            .await
        }
        (AssetId::Native, true) => {
            execute(&state, "transfer_native_external", move |bank| {
                bank.transfer_native_external(caller, from, to, amount)
            })
            .await
        }
        (AssetId::Token(token), false) => {
            execute(&state, "transfer_token", move |bank| {
                bank.transfer_token(caller, from, to, token, amount)
            })
            .await
        }
        (AssetId::Token(token), true) => {
            execute(&state, "transfer_token_external", move |bank| {
                bank.transfer_token_external(caller, from, to, token, amount)
            })
            .await
        }
    }
}

async fn transfer_signed_handler(
    State(state): State<AppState>,
    Json(req): Json<SignedTransferRequest>,
) -> ApiResult<Json<Receipt>> {
    execute(&state, "transfer_signed", move |bank| {
        bank.transfer_signed(req.caller, &req.authorization)
    })
    .await
}

async fn pause_handler(
    State(state): State<AppState>,
    Json(req): Json<CallerRequest>,
) -> ApiResult<Json<Receipt>> {
    execute(&state, "pause", move |bank| bank.pause(req.caller)).await
}

async fn unpause_handler(
    State(state): State<AppState>,
    Json(req): Json<CallerRequest>,
) -> ApiResult<Json<Receipt>> {
    execute(&state, "unpause", move |bank| bank.unpause(req.caller)).await
}

async fn update_admin_handler(
    State(state): State<AppState>,
    Json(req): Json<UpdateAdminRequest>,
) -> ApiResult<Json<Receipt>> {
    execute(&state, "update_admin", move |bank| {
        bank.update_admin(req.caller, req.admin)
    })
    .await
}

async fn transfer_ownership_handler(
    State(state): State<AppState>,
    Json(req): Json<TransferOwnershipRequest>,
) -> ApiResult<Json<Receipt>> {
    execute(&state, "transfer_ownership", move |bank| {
        bank.transfer_ownership(req.caller, req.owner)
    })
    .await
}

async fn upgrade_handler(
    State(state): State<AppState>,
    Json(req): Json<UpgradeRequest>,
) -> ApiResult<Json<Receipt>> {
    execute(&state, "upgrade_to", move |bank| {
        bank.upgrade_to(req.caller, req.target)
    })
    .await
}

// ---------------------------------------------------------------------------
// Devnet Handlers
// ---------------------------------------------------------------------------

/// `POST /devnet/faucet`: mints native coin straight to an account.
async fn faucet_handler(
    State(state): State<AppState>,
    Json(req): Json<FaucetRequest>,
) -> ApiResult<Json<HoldingResponse>> {
    state.devnet()?;
    let held = state.bank.custody().native.mint(&req.account, req.amount)?;
    info!(account = %req.account, amount = req.amount, "faucet payout");
    Ok(Json(HoldingResponse {
        account: req.account,
        asset: AssetId::Native,
        held,
    }))
}

/// `POST /devnet/tokens`: issues a new token with zero supply and
/// registers it with custody.
async fn create_token_handler(
    State(state): State<AppState>,
    Json(req): Json<CreateTokenRequest>,
) -> ApiResult<(StatusCode, Json<TokenInfo>)> {
    let devnet = state.devnet()?;
    let tokens = &state.bank.custody().tokens;
    let address = TokenInfo::derive_address(&req.issuer, &req.symbol);
    if tokens.get(&address).is_some() {
        return Err(TokenError::DuplicateSymbol(req.symbol).into());
    }

    let store = devnet
        .storage
        .open(&address)
        .map_err(|e| ApiError::Internal(e.to_string()))?;
    let token = Arc::new(StandardToken::create(
        store,
        &req.name,
        &req.symbol,
        req.decimals,
        req.issuer,
    )?);
    tokens.register(token.clone())?;
    devnet.issued.write().insert(address, Arc::clone(&token));

    info!(token = %address, symbol = %req.symbol, issuer = %req.issuer, "token issued");
    Ok((StatusCode::CREATED, Json(token.info()?)))
}

async fn mint_handler(
    Path(token): Path<String>,
    State(state): State<AppState>,
    Json(req): Json<MintRequest>,
) -> ApiResult<Json<HoldingResponse>> {
    let devnet = state.devnet()?;
    let address = parse_address("token", &token)?;
    let token = devnet
        .issued
        .read()
        .get(&address)
        .cloned()
        .ok_or(TokenError::TokenNotFound(address))?;

    token.mint(req.caller, req.to, req.amount)?;
    Ok(Json(HoldingResponse {
        account: req.to,
        asset: AssetId::Token(address),
        held: token.balance_of(&req.to)?,
    }))
}

/// `POST /devnet/tokens/:token/approve`: records an allowance as if
/// `owner` had signed it in their wallet.
async fn approve_handler(
    Path(token): Path<String>,
    State(state): State<AppState>,
    Json(req): Json<ApproveRequest>,
) -> ApiResult<Json<AllowanceResponse>> {
    state.devnet()?;
    let address = parse_address("token", &token)?;
    let token = state.bank.custody().tokens.resolve(&address)?;
    token.approve(req.owner, req.spender, req.amount)?;
    Ok(Json(AllowanceResponse {
        token: address,
        owner: req.owner,
        spender: req.spender,
        allowance: token.allowance(&req.owner, &req.spender)?,
    }))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
