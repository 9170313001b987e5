use crate::auth::CurrentUser;
use crate::bridge::HostBridge;
use crate::metrics::Metrics;
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use gigboard_market::{
    ChatMessage, DealView, MarketEngine, NewTask, Notification, TaskCategory, TaskFilter,
    TaskResponse, TaskView, User, UserStats, POPULAR_TASKS_LIMIT,
};
use gigboard_types::{DealId, MarketError, TaskId, UserId};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::str::FromStr;
use std::sync::Arc;
use tracing::{error, warn};

pub struct AppState {
    pub market: Arc<MarketEngine>,
    pub bridge: Arc<dyn HostBridge>,
    pub metrics: Metrics,
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/user", get(get_user))
        .route("/api/user/stats", get(get_user_stats))
        .route("/api/tasks", get(list_tasks).post(create_task))
        .route("/api/tasks/popular", get(popular_tasks))
        .route("/api/tasks/:id/respond", post(respond_to_task))
        .route("/api/deals", get(list_deals).post(create_deal))
        .route("/api/deals/:id/messages", post(post_message))
        .route("/api/deals/:id/complete", post(complete_deal))
        .route("/api/notifications", get(list_notifications))
        .route("/metrics", get(get_metrics))
        .with_state(state)
}

/// Error shell mapping the taxonomy onto HTTP statuses and the
/// `{success:false, error}` envelope.
pub struct ApiError(MarketError);

impl From<MarketError> for ApiError {
    fn from(e: MarketError) -> Self {
        Self(e)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            MarketError::Validation(_) | MarketError::InvalidTransition(_) => {
                StatusCode::BAD_REQUEST
            }
            MarketError::Permission(_) => StatusCode::FORBIDDEN,
            MarketError::NotFound(_) => StatusCode::NOT_FOUND,
            MarketError::ExternalService(_) => StatusCode::BAD_GATEWAY,
            MarketError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        if status.is_server_error() {
            error!(error = %self.0, "Request failed");
        }
        (
            status,
            Json(ErrorBody {
                success: false,
                error: self.0.to_string(),
            }),
        )
            .into_response()
    }
}

#[derive(Serialize)]
struct ErrorBody {
    success: bool,
    error: String,
}

#[derive(Serialize)]
struct UserEnvelope {
    success: bool,
    user: User,
}

#[derive(Serialize)]
struct StatsEnvelope {
    success: bool,
    stats: UserStats,
}

#[derive(Serialize)]
struct TasksEnvelope {
    success: bool,
    tasks: Vec<TaskView>,
}

#[derive(Serialize)]
struct TaskEnvelope {
    success: bool,
    task: TaskView,
}

#[derive(Serialize)]
struct ResponseEnvelope {
    success: bool,
    response: TaskResponse,
}

#[derive(Serialize)]
struct DealsEnvelope {
    success: bool,
    deals: Vec<DealView>,
}

#[derive(Serialize)]
struct DealEnvelope {
    success: bool,
    deal: DealView,
}

#[derive(Serialize)]
struct MessageEnvelope {
    success: bool,
    message: ChatMessage,
}

#[derive(Serialize)]
struct NotificationsEnvelope {
    success: bool,
    notifications: Vec<Notification>,
}

#[derive(Deserialize)]
struct TasksQuery {
    category: Option<String>,
    search: Option<String>,
}

#[derive(Deserialize)]
struct DealsQuery {
    status: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RespondBody {
    message: Option<String>,
    proposed_price: Option<gigboard_market::Amount>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct CreateDealBody {
    task_id: Option<String>,
    freelancer_id: Option<UserId>,
}

#[derive(Deserialize)]
struct MessageBody {
    message: Option<String>,
}

async fn health() -> &'static str {
    "OK"
}

async fn get_user(CurrentUser(user): CurrentUser) -> Json<UserEnvelope> {
    Json(UserEnvelope {
        success: true,
        user,
    })
}

async fn get_user_stats(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
) -> Result<Json<StatsEnvelope>, ApiError> {
    let stats = state.market.ledger.user_stats(&user.id).await?;
    Ok(Json(StatsEnvelope {
        success: true,
        stats,
    }))
}

async fn list_tasks(
    State(state): State<Arc<AppState>>,
    Query(query): Query<TasksQuery>,
) -> Result<Json<TasksEnvelope>, ApiError> {
    let filter = task_filter(query)?;
    let tasks = state.market.registry.list_tasks(&filter).await?;
    Ok(Json(TasksEnvelope {
        success: true,
        tasks,
    }))
}

async fn popular_tasks(
    State(state): State<Arc<AppState>>,
) -> Result<Json<TasksEnvelope>, ApiError> {
    let tasks = state
        .market
        .registry
        .popular_tasks(POPULAR_TASKS_LIMIT)
        .await?;
    Ok(Json(TasksEnvelope {
        success: true,
        tasks,
    }))
}

async fn create_task(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
    Json(body): Json<Value>,
) -> Result<Json<TaskEnvelope>, ApiError> {
    let params: NewTask = from_body(body)?;
    let task = state.market.registry.create_task(&user.id, params).await?;
    state.metrics.tasks_created.inc();
    Ok(Json(TaskEnvelope {
        success: true,
        task,
    }))
}

async fn respond_to_task(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<String>,
    Json(body): Json<Value>,
) -> Result<Json<ResponseEnvelope>, ApiError> {
    let task_id = parse_task_id(&id)?;
    let body: RespondBody = from_body(body)?;
    let response = state
        .market
        .registry
        .respond_to_task(&task_id, &user.id, body.message, body.proposed_price)
        .await?;
    state.metrics.responses_submitted.inc();
    Ok(Json(ResponseEnvelope {
        success: true,
        response,
    }))
}

async fn list_deals(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
    Query(query): Query<DealsQuery>,
) -> Result<Json<DealsEnvelope>, ApiError> {
    let status = deal_status_filter(query)?;
    let deals = state.market.ledger.list_deals(&user.id, status).await?;
    Ok(Json(DealsEnvelope {
        success: true,
        deals,
    }))
}

async fn create_deal(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
    Json(body): Json<Value>,
) -> Result<Json<DealEnvelope>, ApiError> {
    let body: CreateDealBody = from_body(body)?;
    let task_id = body
        .task_id
        .ok_or_else(|| MarketError::Validation("taskId is required".to_string()))?;
    let task_id = parse_task_id(&task_id)?;
    let freelancer_id = body
        .freelancer_id
        .ok_or_else(|| MarketError::Validation("freelancerId is required".to_string()))?;

    let deal = state
        .market
        .ledger
        .create_deal(&user.id, &task_id, &freelancer_id)
        .await?;
    state.metrics.deals_created.inc();
    Ok(Json(DealEnvelope {
        success: true,
        deal,
    }))
}

async fn post_message(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<String>,
    Json(body): Json<Value>,
) -> Result<Json<MessageEnvelope>, ApiError> {
    let deal_id = parse_deal_id(&id)?;
    let body: MessageBody = from_body(body)?;
    let message = state
        .market
        .ledger
        .post_message(&deal_id, &user.id, &body.message.unwrap_or_default())
        .await?;
    state.metrics.messages_posted.inc();
    Ok(Json(MessageEnvelope {
        success: true,
        message,
    }))
}

async fn complete_deal(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<String>,
) -> Result<Json<DealEnvelope>, ApiError> {
    let deal_id = parse_deal_id(&id)?;
    let deal = state.market.ledger.complete_deal(&deal_id, &user.id).await?;
    state.metrics.deals_completed.inc();

    // Settlement of the in-memory ledger is done; a pay-form failure is
    // surfaced in the logs only, never retried (see DESIGN.md).
    if let Err(e) = state
        .bridge
        .open_pay_form(
            &deal.deal.client_id,
            deal.deal.amount,
            &format!("Payment for \"{}\"", deal.deal.task_title),
        )
        .await
    {
        warn!(deal_id = %deal.deal.id, error = %e, "⚠️ Pay form request failed");
    }

    Ok(Json(DealEnvelope {
        success: true,
        deal,
    }))
}

async fn list_notifications(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
) -> Result<Json<NotificationsEnvelope>, ApiError> {
    let notifications = state.market.notifications.list_for(&user.id).await?;
    Ok(Json(NotificationsEnvelope {
        success: true,
        notifications,
    }))
}

async fn get_metrics(State(state): State<Arc<AppState>>) -> (StatusCode, String) {
    (StatusCode::OK, state.metrics.gather())
}

fn from_body<T: serde::de::DeserializeOwned>(body: Value) -> Result<T, ApiError> {
    serde_json::from_value(body).map_err(|e| MarketError::Validation(e.to_string()).into())
}

fn task_filter(query: TasksQuery) -> Result<TaskFilter, ApiError> {
    let category = match query.category.as_deref() {
        None | Some("") | Some("all") => None,
        Some(raw) => Some(TaskCategory::from_str(raw).map_err(MarketError::Validation)?),
    };
    Ok(TaskFilter {
        category,
        search: query.search,
    })
}

fn deal_status_filter(query: DealsQuery) -> Result<Option<gigboard_market::DealStatus>, ApiError> {
    match query.status.as_deref() {
        None | Some("") | Some("all") => Ok(None),
        Some(raw) => Ok(Some(
            gigboard_market::DealStatus::from_str(raw).map_err(MarketError::Validation)?,
        )),
    }
}

// Malformed ids cannot name any stored entity, so they read as unknown.
fn parse_task_id(raw: &str) -> Result<TaskId, ApiError> {
    TaskId::parse(raw).map_err(|_| MarketError::NotFound("task".to_string()).into())
}

fn parse_deal_id(raw: &str) -> Result<DealId, ApiError> {
    DealId::parse(raw).map_err(|_| MarketError::NotFound("deal".to_string()).into())
}
