//! Mock history API
//!
//! axum server on an ephemeral port serving
//! `/{market}/currencies/history/{id}/?lang=&limit=&offset=` from canned series.
//! Sources listed as failing answer 503 on every request.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::{json, Value};
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};

/// One request as the server saw it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedRequest {
    pub market: u32,
    pub source_id: u32,
    pub lang: String,
    pub limit: u64,
    pub offset: u64,
}

#[derive(Default)]
struct MockState {
    series: HashMap<u32, Vec<Value>>,
    failing: HashSet<u32>,
    requests: Mutex<Vec<RecordedRequest>>,
}

#[derive(Debug, Deserialize)]
struct PageQuery {
    lang: String,
    limit: u64,
    offset: u64,
}

pub struct MockApi {
    pub base_url: String,
    state: Arc<MockState>,
}

impl MockApi {
    /// Start serving `series`; ids in `failing` always answer 503
    pub async fn start(series: HashMap<u32, Vec<Value>>, failing: &[u32]) -> MockApi {
        let state = Arc::new(MockState {
            series,
            failing: failing.iter().copied().collect(),
            requests: Mutex::new(Vec::new()),
        });

        let app = Router::new()
            .route("/:market/currencies/history/:id/", get(history))
            .with_state(state.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        MockApi {
            base_url: format!("http://{}", addr),
            state,
        }
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.state.requests.lock().unwrap().clone()
    }

    pub fn requests_for(&self, source_id: u32) -> Vec<RecordedRequest> {
        self.requests()
            .into_iter()
            .filter(|r| r.source_id == source_id)
            .collect()
    }
}

async fn history(
    State(state): State<Arc<MockState>>,
    Path((market, source_id)): Path<(u32, u32)>,
    Query(query): Query<PageQuery>,
) -> Response {
    state.requests.lock().unwrap().push(RecordedRequest {
        market,
        source_id,
        lang: query.lang.clone(),
        limit: query.limit,
        offset: query.offset,
    });

    if state.failing.contains(&source_id) {
        return (StatusCode::SERVICE_UNAVAILABLE, "upstream unavailable").into_response();
    }

    let Some(items) = state.series.get(&source_id) else {
        return (StatusCode::NOT_FOUND, "unknown source").into_response();
    };

    let page: Vec<Value> = items
        .iter()
        .skip(query.offset as usize)
        .take(query.limit as usize)
        .cloned()
        .collect();

    Json(json!({ "count": null, "results": page })).into_response()
}

fn persian_digits(ascii: &str) -> String {
    ascii
        .chars()
        .map(|c| match c.to_digit(10) {
            Some(d) => char::from_u32(0x06F0 + d).unwrap_or(c),
            None => c,
        })
        .collect()
}

/// `count` history items with distinct dates, written the way the API does:
/// Persian digits, thousands separators, a missing buy price on every fifth
pub fn history_items(count: usize, base_price: u64) -> Vec<Value> {
    (0..count)
        .map(|i| {
            let month = (i / 28) % 12 + 1;
            let day = i % 28 + 1;
            let year = 1400 + i / (28 * 12);
            let date = persian_digits(&format!("{:04}{:02}{:02}", year, month, day));
            let sell = base_price + i as u64;
            let sell_text = persian_digits(&format!("{},{:03}", sell / 1000, sell % 1000));
            let buy = if i % 5 == 0 {
                json!("null")
            } else {
                json!(sell - 100)
            };
            json!({
                "id": i,
                "slug": "currency",
                "date": date,
                "sell_price": sell_text,
                "buy_price": buy,
            })
        })
        .collect()
}
