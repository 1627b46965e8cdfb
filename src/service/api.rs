use crate::{
    application::app::Application,
    domain::{
        errors::ApiError,
        models::{ActivityEntry, HistoricalPoint, MarketEntry, TokenSummary, WalletOverview},
    },
    infrastructure::{bc_client::parse_address, shutdown::ShutdownChannel},
};
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

const DEFAULT_ACTIVITY_LIMIT: usize = 10;
const MAX_ACTIVITY_LIMIT: usize = 1000;

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self {
            ApiError::InvalidAddress => StatusCode::BAD_REQUEST,
            ApiError::NoData => StatusCode::NOT_FOUND,
            ApiError::Upstream(_) => StatusCode::BAD_GATEWAY,
            ApiError::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        };
        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}

pub fn router<A>(app: Arc<A>) -> Router
where
    A: Application + Send + Sync + 'static,
{
    Router::new()
        .route("/historical-data", get(historical_data::<A>))
        .route("/tokens/:mint/summary", get(token_summary::<A>))
        .route("/tokens/:mint/activity", get(token_activity::<A>))
        .route("/wallets/:owner/holdings", get(wallet_holdings::<A>))
        .route("/market", get(market::<A>))
        .with_state(app)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}

pub async fn start_server<A>(
    shutdown: ShutdownChannel,
    app: Arc<A>,
    port: u16,
) -> anyhow::Result<()>
where
    A: Application + Send + Sync + 'static,
{
    let listener = tokio::net::TcpListener::bind(("0.0.0.0", port)).await?;

    tracing::info!("API server started on port {}", port);

    axum::serve(listener, router(app))
        .with_graceful_shutdown(shutdown.signalled())
        .await?;

    tracing::warn!("API server stopped");
    Ok(())
}

#[derive(Deserialize)]
struct HistoryQuery {
    address: Option<String>,
}

#[derive(Deserialize)]
struct ActivityQuery {
    limit: Option<usize>,
}

async fn historical_data<A: Application>(
    State(app_state): State<Arc<A>>,
    Query(params): Query<HistoryQuery>,
) -> Result<Json<Vec<HistoricalPoint>>, ApiError> {
    let address = params
        .address
        .filter(|address| !address.is_empty())
        .ok_or(ApiError::InvalidAddress)?;
    app_state.historical_data(&address).await.map(Json)
}

async fn token_summary<A: Application>(
    State(app_state): State<Arc<A>>,
    Path(mint): Path<String>,
) -> Json<TokenSummary> {
    Json(app_state.token_summary(&mint).await)
}

async fn token_activity<A: Application>(
    State(app_state): State<Arc<A>>,
    Path(mint): Path<String>,
    Query(params): Query<ActivityQuery>,
) -> Result<Json<Vec<ActivityEntry>>, ApiError> {
    let limit = params
        .limit
        .unwrap_or(DEFAULT_ACTIVITY_LIMIT)
        .clamp(1, MAX_ACTIVITY_LIMIT);
    app_state.token_activity(&mint, limit).await.map(Json)
}

async fn wallet_holdings<A: Application>(
    State(app_state): State<Arc<A>>,
    Path(owner): Path<String>,
) -> Result<Json<WalletOverview>, ApiError> {
    parse_address(&owner).map_err(|_| ApiError::InvalidAddress)?;
    Ok(Json(app_state.wallet_overview(&owner).await))
}

async fn market<A: Application>(State(app_state): State<Arc<A>>) -> Json<Vec<MarketEntry>> {
    Json(app_state.market().await)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::errors::GatewayError;
    use crate::domain::models::{
        AccountCreation, ActivityStatus, FetchStatus, TransactionOutcome, TransactionSigner,
        TransferRequest, WalletHoldings,
    };
    use axum::body::{to_bytes, Body};
    use axum::http::Request;
    use chrono::NaiveDate;
    use serde_json::Value;
    use solana_sdk::pubkey::Pubkey;
    use tower::ServiceExt;

    /// Serves canned data; `empty_history` switches the history query to the no-data case.
    struct FakeApp {
        empty_history: bool,
    }

    #[async_trait::async_trait]
    impl Application for FakeApp {
        async fn token_summary(&self, mint: &str) -> TokenSummary {
            TokenSummary::unknown(mint, "offline")
        }

        async fn token_activity(
            &self,
            mint: &str,
            limit: usize,
        ) -> Result<Vec<ActivityEntry>, ApiError> {
            parse_address(mint)?;
            Ok((0..limit.min(3))
                .map(|i| ActivityEntry {
                    signature: format!("sig{i}"),
                    block_time: None,
                    status: ActivityStatus::Success,
                    explorer_url: String::new(),
                })
                .collect())
        }

        async fn wallet_overview(&self, owner: &str) -> WalletOverview {
            WalletOverview {
                lamports: Some(1),
                holdings: WalletHoldings {
                    owner: owner.to_string(),
                    holdings: Vec::new(),
                    status: FetchStatus::Fetched,
                },
                distribution: Vec::new(),
            }
        }

        async fn market(&self) -> Vec<MarketEntry> {
            Vec::new()
        }

        async fn historical_data(&self, address: &str) -> Result<Vec<HistoricalPoint>, ApiError> {
            parse_address(address).map_err(|_| ApiError::InvalidAddress)?;
            if self.empty_history {
                return Err(ApiError::NoData);
            }
            Ok(vec![HistoricalPoint {
                date: NaiveDate::from_ymd_opt(2024, 5, 1).unwrap(),
                balance: 12.5,
            }])
        }

        async fn send_tokens(
            &self,
            _request: TransferRequest,
            _creation: AccountCreation,
            _signer: Option<&dyn TransactionSigner>,
        ) -> TransactionOutcome {
            TransactionOutcome::failure("unused")
        }

        async fn create_token_account(
            &self,
            _owner: &str,
            _mint: &str,
            _signer: Option<&dyn TransactionSigner>,
        ) -> TransactionOutcome {
            TransactionOutcome::failure("unused")
        }

        async fn request_airdrop(&self, _address: &str, _sol: f64) -> TransactionOutcome {
            TransactionOutcome::failure(GatewayError::Network("unused".to_string()))
        }
    }

    async fn get(app: FakeApp, uri: &str) -> (StatusCode, Value) {
        let response = router(Arc::new(app))
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&body).unwrap())
    }

    #[tokio::test]
    async fn test_historical_data_returns_series() {
        let uri = format!("/historical-data?address={}", Pubkey::new_unique());
        let (status, body) = get(FakeApp { empty_history: false }, &uri).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body[0]["date"], "2024-05-01");
        assert_eq!(body[0]["balance"], 12.5);
    }

    #[tokio::test]
    async fn test_historical_data_rejects_missing_or_malformed_address() {
        let (status, body) = get(FakeApp { empty_history: false }, "/historical-data").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "Invalid address");

        let (status, _) = get(
            FakeApp { empty_history: false },
            "/historical-data?address=nope",
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_historical_data_without_points_is_not_found() {
        let uri = format!("/historical-data?address={}", Pubkey::new_unique());
        let (status, body) = get(FakeApp { empty_history: true }, &uri).await;

        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"], "No historical data found");
    }

    #[tokio::test]
    async fn test_summary_route_exposes_unknown_status() {
        let uri = format!("/tokens/{}/summary", Pubkey::new_unique());
        let (status, body) = get(FakeApp { empty_history: false }, &uri).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "unknown");
        assert_eq!(body["holder_count"], 0);
    }

    #[tokio::test]
    async fn test_activity_route_applies_limit() {
        let uri = format!("/tokens/{}/activity?limit=2", Pubkey::new_unique());
        let (status, body) = get(FakeApp { empty_history: false }, &uri).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body.as_array().unwrap().len(), 2);

        let (status, _) = get(FakeApp { empty_history: false }, "/tokens/bad/activity").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_holdings_route_validates_owner() {
        let (status, _) = get(FakeApp { empty_history: false }, "/wallets/bad/holdings").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let uri = format!("/wallets/{}/holdings", Pubkey::new_unique());
        let (status, body) = get(FakeApp { empty_history: false }, &uri).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["lamports"], 1);
    }
}
