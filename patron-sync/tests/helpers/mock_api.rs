//! In-process stand-in for the membership API
//!
//! Serves `GET /campaigns/:campaign_id/members` from a fixed member list,
//! split into pages addressed by `page[cursor]=cursor-N`.

use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

/// How the next page is advertised
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaginationStyle {
    /// Absolute `links.next` plus `meta.pagination.cursors.next`
    LinksNext,
    /// Only `meta.pagination.cursors.next`
    CursorOnly,
    /// `links.next` always points back at the first page
    Looping,
}

/// One member as the mock serves it
#[derive(Debug, Clone)]
pub struct MockMember {
    pub id: Option<String>,
    pub name: Option<String>,
    pub status: String,
    pub pledge_start: Option<String>,
    pub last_charge: Option<String>,
}

impl MockMember {
    pub fn active(id: &str, name: &str, pledge_start: &str) -> Self {
        Self {
            id: Some(id.to_string()),
            name: Some(name.to_string()),
            status: "active_patron".to_string(),
            pledge_start: Some(pledge_start.to_string()),
            last_charge: Some("2026-10-01T08:00:00.000+00:00".to_string()),
        }
    }

    pub fn with_status(mut self, status: &str) -> Self {
        self.status = status.to_string();
        self
    }

    pub fn without_pledge_start(mut self) -> Self {
        self.pledge_start = None;
        self
    }

    pub fn without_id(mut self) -> Self {
        self.id = None;
        self
    }
}

/// Request as seen by the mock
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub campaign_id: String,
    pub authorization: Option<String>,
    pub query: HashMap<String, String>,
}

struct MockState {
    base_url: String,
    members: Vec<MockMember>,
    per_page: usize,
    style: PaginationStyle,
    failures: Mutex<HashMap<usize, u16>>,
    requests: Mutex<Vec<RecordedRequest>>,
}

/// Handle to a running mock API
#[derive(Clone)]
pub struct MockApi {
    state: Arc<MockState>,
}

impl MockApi {
    /// Bind to an ephemeral port and start serving
    pub async fn spawn(members: Vec<MockMember>, per_page: usize, style: PaginationStyle) -> Self {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let api = Self {
            state: Arc::new(MockState {
                base_url: format!("http://{}", addr),
                members,
                per_page: per_page.max(1),
                style,
                failures: Mutex::new(HashMap::new()),
                requests: Mutex::new(Vec::new()),
            }),
        };

        let app = Router::new()
            .route("/campaigns/:campaign_id/members", get(members_handler))
            .with_state(api.clone());

        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        api
    }

    pub fn base_url(&self) -> &str {
        &self.state.base_url
    }

    /// Respond to page `page_index` (0-based) with `status` instead of data
    pub fn fail_page(&self, page_index: usize, status: u16) {
        self.state.failures.lock().unwrap().insert(page_index, status);
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.state.requests.lock().unwrap().clone()
    }

    fn page_count(&self) -> usize {
        let total = self.state.members.len();
        ((total + self.state.per_page - 1) / self.state.per_page).max(1)
    }

    fn page_body(&self, page_index: usize, campaign_id: &str) -> Value {
        let per_page = self.state.per_page;
        let start = (page_index * per_page).min(self.state.members.len());
        let end = (start + per_page).min(self.state.members.len());
        let slice = &self.state.members[start..end];

        let data: Vec<Value> = slice
            .iter()
            .enumerate()
            .map(|(offset, m)| {
                let user_id = format!("user-{}", start + offset);
                let mut member = json!({
                    "type": "member",
                    "attributes": {
                        "full_name": m.name,
                        "patron_status": m.status,
                        "last_charge_date": m.last_charge,
                        "last_charge_status": "Paid",
                        "pledge_relationship_start": m.pledge_start,
                        "currently_entitled_amount_cents": 500
                    },
                    "relationships": {
                        "user": { "data": { "id": user_id, "type": "user" } }
                    }
                });
                if let Some(id) = &m.id {
                    member["id"] = json!(id);
                }
                member
            })
            .collect();

        let included: Vec<Value> = slice
            .iter()
            .enumerate()
            .map(|(offset, m)| {
                json!({
                    "id": format!("user-{}", start + offset),
                    "type": "user",
                    "attributes": { "full_name": m.name }
                })
            })
            .collect();

        let next_cursor = match self.state.style {
            PaginationStyle::Looping => Some("cursor-0".to_string()),
            _ if page_index + 1 < self.page_count() => Some(format!("cursor-{}", page_index + 1)),
            _ => None,
        };

        let next_link = match self.state.style {
            PaginationStyle::CursorOnly => None,
            _ => next_cursor.as_ref().map(|cursor| {
                format!(
                    "{}/campaigns/{}/members?page%5Bcursor%5D={}",
                    self.state.base_url, campaign_id, cursor
                )
            }),
        };

        json!({
            "data": data,
            "included": included,
            "links": { "next": next_link },
            "meta": {
                "pagination": {
                    "cursors": { "next": next_cursor },
                    "total": self.state.members.len()
                }
            }
        })
    }
}

async fn members_handler(
    State(api): State<MockApi>,
    Path(campaign_id): Path<String>,
    Query(query): Query<HashMap<String, String>>,
    headers: HeaderMap,
) -> Response {
    let page_index = query
        .get("page[cursor]")
        .and_then(|cursor| cursor.strip_prefix("cursor-"))
        .and_then(|n| n.parse::<usize>().ok())
        .unwrap_or(0);

    api.state.requests.lock().unwrap().push(RecordedRequest {
        campaign_id: campaign_id.clone(),
        authorization: headers
            .get("authorization")
            .and_then(|v| v.to_str().ok())
            .map(str::to_string),
        query: query.clone(),
    });

    let failure = api.state.failures.lock().unwrap().get(&page_index).copied();
    if let Some(status) = failure {
        let status = StatusCode::from_u16(status).unwrap();
        return (
            status,
            [("retry-after", "60")],
            Json(json!({ "errors": [{ "status": status.as_u16().to_string() }] })),
        )
            .into_response();
    }

    Json(api.page_body(page_index, &campaign_id)).into_response()
}
