//! Integration tests for Comptoir.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p comptoir-integration-tests
//! ```
//!
//! Nothing external is required: order flows run against
//! [`FakeOrdersBackend`], and HTTP behaviour against [`StubServer`], a
//! loopback server answering canned responses.
//!
//! # Test Categories
//!
//! - `order_board` - Filters, confirmation and optimistic status changes
//! - `api_client` - Request shapes and error mapping of the REST client

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use chrono::NaiveDate;
use comptoir_admin::api::OrdersQuery;
use comptoir_admin::cache::QueryCache;
use comptoir_admin::clock::FixedClock;
use comptoir_admin::error::ApiError;
use comptoir_admin::notify::RecordingNotifier;
use comptoir_admin::orders::{OrderSyncController, OrdersBackend, RollbackPolicy, SyncOptions};
use comptoir_core::{
    Address, Customer, Order, OrderId, OrderItem, OrderItemId, OrderStatus, OrdersPage, Pagination,
    PaymentStatus, UserId,
};
use rust_decimal::Decimal;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio::sync::Notify;
use url::Url;

// =============================================================================
// Fixtures
// =============================================================================

/// Monday 9 February 2026.
#[must_use]
pub fn today() -> NaiveDate {
    NaiveDate::from_ymd_opt(2026, 2, 9).unwrap_or_default()
}

/// A single-item order placed this morning in Abidjan.
#[must_use]
pub fn order(id: &str, status: OrderStatus, first: &str, last: &str, phone: &str) -> Order {
    let price = Decimal::new(70_000, 0);
    let shipping = Decimal::new(5_000, 0);
    Order {
        id: OrderId::new(id),
        order_number: format!("CMD-{id}"),
        status,
        payment_status: PaymentStatus::Pending,
        subtotal: price,
        tax: Decimal::ZERO,
        shipping_cost: shipping,
        discount_amount: Decimal::ZERO,
        total: price + shipping,
        customer_note: None,
        items: vec![OrderItem {
            id: OrderItemId::new(format!("item-{id}")),
            product_name: "Classic High Top".to_string(),
            product_sku: None,
            variant_name: "Noir - 42".to_string(),
            quantity: 1,
            unit_price: price,
            total_price: price,
        }],
        user: Customer {
            id: UserId::new(format!("u-{id}")),
            email: None,
            first_name: first.to_string(),
            last_name: last.to_string(),
            phone: phone.to_string(),
        },
        items_count: 1,
        shipping_address: Address {
            street_address: "Boulevard Latrille".to_string(),
            city: "Abidjan".to_string(),
            country: "CI".to_string(),
            ..Address::default()
        },
        billing_address: None,
        created_at: today().and_hms_opt(9, 30, 0).unwrap_or_default().and_utc(),
        updated_at: None,
        paid_at: None,
        shipped_at: None,
        delivered_at: None,
        cancelled_at: None,
    }
}

/// The two orders used throughout the filter tests.
#[must_use]
pub fn sample_orders() -> Vec<Order> {
    vec![
        order("1", OrderStatus::Paid, "Marie", "Kouassi", "+225 07 12 34 56 78"),
        order("2", OrderStatus::Cancelled, "Jean", "Koné", "+225 05 98 76 54 32"),
    ]
}

/// Wrap orders in a single page.
#[must_use]
pub fn page(items: Vec<Order>) -> OrdersPage {
    let total = u32::try_from(items.len()).unwrap_or(u32::MAX);
    OrdersPage {
        items,
        pagination: Pagination {
            page: 1,
            limit: 20,
            total,
            total_pages: 1,
        },
    }
}

// =============================================================================
// Scripted orders backend
// =============================================================================

/// How a scripted status update ends.
#[derive(Debug, Clone)]
pub enum UpdateOutcome {
    Accept,
    /// Refused by the backend with this message.
    Reject(String),
    /// Backend unavailable.
    Unavailable,
}

/// Control over one scripted status update.
#[derive(Debug, Clone, Default)]
pub struct UpdateHandle {
    started: Arc<Notify>,
    release: Arc<Notify>,
}

impl UpdateHandle {
    /// Resolves once the backend received the call.
    pub async fn started(&self) {
        self.started.notified().await;
    }

    /// Let the call complete.
    pub fn release(&self) {
        self.release.notify_one();
    }
}

struct ScriptedUpdate {
    handle: UpdateHandle,
    outcome: UpdateOutcome,
}

#[derive(Default)]
struct FakeState {
    page: Mutex<OrdersPage>,
    script: Mutex<VecDeque<ScriptedUpdate>>,
    queries: Mutex<Vec<OrdersQuery>>,
    fetches: AtomicUsize,
    updates: AtomicUsize,
}

/// In-memory orders backend.
///
/// Status updates not scripted with [`script_update`](Self::script_update)
/// are accepted immediately.
#[derive(Clone, Default)]
pub struct FakeOrdersBackend {
    state: Arc<FakeState>,
}

fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl FakeOrdersBackend {
    /// Backend serving `page` for every query.
    #[must_use]
    pub fn with_page(page: OrdersPage) -> Self {
        let backend = Self::default();
        *lock(&backend.state.page) = page;
        backend
    }

    /// Queue the outcome of the next status update; the call blocks until
    /// the returned handle is released.
    #[must_use]
    pub fn script_update(&self, outcome: UpdateOutcome) -> UpdateHandle {
        let handle = UpdateHandle::default();
        lock(&self.state.script).push_back(ScriptedUpdate {
            handle: handle.clone(),
            outcome,
        });
        handle
    }

    /// Number of list calls received.
    #[must_use]
    pub fn fetches(&self) -> usize {
        self.state.fetches.load(Ordering::SeqCst)
    }

    /// Number of status update calls received.
    #[must_use]
    pub fn updates(&self) -> usize {
        self.state.updates.load(Ordering::SeqCst)
    }

    /// Every list query received, in order.
    #[must_use]
    pub fn queries(&self) -> Vec<OrdersQuery> {
        lock(&self.state.queries).clone()
    }

    /// Status the backend holds for `id`.
    #[must_use]
    pub fn status_of(&self, id: &str) -> Option<OrderStatus> {
        lock(&self.state.page)
            .find(&OrderId::new(id))
            .map(|order| order.status)
    }
}

impl OrdersBackend for FakeOrdersBackend {
    async fn list_orders(&self, query: &OrdersQuery) -> Result<OrdersPage, ApiError> {
        self.state.fetches.fetch_add(1, Ordering::SeqCst);
        lock(&self.state.queries).push(*query);
        Ok(lock(&self.state.page).clone())
    }

    async fn update_order_status(
        &self,
        id: &OrderId,
        status: OrderStatus,
    ) -> Result<Order, ApiError> {
        self.state.updates.fetch_add(1, Ordering::SeqCst);
        let scripted = lock(&self.state.script).pop_front();

        let outcome = match scripted {
            Some(ScriptedUpdate { handle, outcome }) => {
                handle.started.notify_one();
                handle.release.notified().await;
                outcome
            }
            None => UpdateOutcome::Accept,
        };

        match outcome {
            UpdateOutcome::Accept => {
                let mut page = lock(&self.state.page);
                let updated = page
                    .with_order_status(id, status)
                    .ok_or_else(|| ApiError::NotFound(format!("Commande {id} introuvable")))?;
                *page = updated;
                page.find(id)
                    .cloned()
                    .ok_or_else(|| ApiError::NotFound(format!("Commande {id} introuvable")))
            }
            UpdateOutcome::Reject(message) => Err(ApiError::Rejected {
                status: 422,
                message,
            }),
            UpdateOutcome::Unavailable => Err(ApiError::Server {
                status: 503,
                message: "Service indisponible".to_string(),
            }),
        }
    }
}

/// A controller over `backend` with a fixed clock and a recording notifier.
#[must_use]
pub fn controller(
    backend: &FakeOrdersBackend,
    rollback: RollbackPolicy,
) -> (OrderSyncController<FakeOrdersBackend>, Arc<RecordingNotifier>) {
    let notifier = Arc::new(RecordingNotifier::new());
    let controller = OrderSyncController::new(
        backend.clone(),
        QueryCache::default(),
        SyncOptions {
            notifier: notifier.clone(),
            clock: Arc::new(FixedClock(today())),
            rollback,
        },
    );
    (controller, notifier)
}

// =============================================================================
// Stub HTTP server
// =============================================================================

/// Canned HTTP response.
#[derive(Debug, Clone)]
pub struct StubResponse {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: String,
}

impl StubResponse {
    /// JSON response.
    #[must_use]
    pub fn json(status: u16, body: &serde_json::Value) -> Self {
        Self {
            status,
            headers: vec![("Content-Type".to_string(), "application/json".to_string())],
            body: body.to_string(),
        }
    }

    /// Add a header.
    #[must_use]
    pub fn header(mut self, name: &str, value: &str) -> Self {
        self.headers.push((name.to_string(), value.to_string()));
        self
    }
}

/// A request as received by the stub.
#[derive(Debug, Clone, Default)]
pub struct RecordedRequest {
    pub method: String,
    /// Path and query string.
    pub target: String,
    /// Header names are lower-cased.
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
}

impl RecordedRequest {
    /// First value of header `name`.
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        let name = name.to_ascii_lowercase();
        self.headers
            .iter()
            .find(|(key, _)| *key == name)
            .map(|(_, value)| value.as_str())
    }

    /// Body as UTF-8 (lossy).
    #[must_use]
    pub fn body_text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

/// Loopback HTTP/1.1 server answering its canned responses in order, one
/// per connection.
pub struct StubServer {
    base_url: Url,
    requests: Arc<Mutex<Vec<RecordedRequest>>>,
    task: tokio::task::JoinHandle<()>,
}

impl StubServer {
    /// Start serving `responses`.
    ///
    /// # Errors
    ///
    /// Returns error if the listener cannot bind.
    pub async fn start(responses: Vec<StubResponse>) -> std::io::Result<Self> {
        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;
        let base_url = Url::parse(&format!("http://{addr}/api/"))
            .map_err(|e| std::io::Error::other(e.to_string()))?;

        let requests = Arc::new(Mutex::new(Vec::new()));
        let recorded = Arc::clone(&requests);
        let task = tokio::spawn(async move {
            for response in responses {
                let Ok((mut socket, _)) = listener.accept().await else {
                    return;
                };
                if let Ok(request) = read_request(&mut socket).await {
                    lock(&recorded).push(request);
                }
                let _ = socket.write_all(render(&response).as_bytes()).await;
                let _ = socket.shutdown().await;
            }
        });

        Ok(Self {
            base_url,
            requests,
            task,
        })
    }

    /// Base URL to configure the client with (ends in `/api/`).
    #[must_use]
    pub fn base_url(&self) -> Url {
        self.base_url.clone()
    }

    /// Requests received so far.
    #[must_use]
    pub fn requests(&self) -> Vec<RecordedRequest> {
        lock(&self.requests).clone()
    }
}

impl Drop for StubServer {
    fn drop(&mut self) {
        self.task.abort();
    }
}

async fn read_request(socket: &mut tokio::net::TcpStream) -> std::io::Result<RecordedRequest> {
    let mut buffer = Vec::new();
    let mut chunk = [0_u8; 4096];

    let header_end = loop {
        let read = socket.read(&mut chunk).await?;
        if read == 0 {
            return Err(std::io::ErrorKind::UnexpectedEof.into());
        }
        buffer.extend_from_slice(chunk.get(..read).unwrap_or_default());
        if let Some(position) = buffer.windows(4).position(|window| window == b"\r\n\r\n") {
            break position + 4;
        }
    };

    let head = String::from_utf8_lossy(buffer.get(..header_end).unwrap_or_default()).into_owned();
    let mut lines = head.split("\r\n");
    let mut request_line = lines.next().unwrap_or_default().split_whitespace();
    let method = request_line.next().unwrap_or_default().to_string();
    let target = request_line.next().unwrap_or_default().to_string();

    let headers: Vec<(String, String)> = lines
        .filter_map(|line| line.split_once(':'))
        .map(|(name, value)| (name.trim().to_ascii_lowercase(), value.trim().to_string()))
        .collect();

    let content_length = headers
        .iter()
        .find(|(name, _)| name == "content-length")
        .and_then(|(_, value)| value.parse::<usize>().ok())
        .unwrap_or(0);

    let mut body = buffer.get(header_end..).unwrap_or_default().to_vec();
    while body.len() < content_length {
        let read = socket.read(&mut chunk).await?;
        if read == 0 {
            break;
        }
        body.extend_from_slice(chunk.get(..read).unwrap_or_default());
    }

    Ok(RecordedRequest {
        method,
        target,
        headers,
        body,
    })
}

fn render(response: &StubResponse) -> String {
    let mut out = format!("HTTP/1.1 {} Stub\r\n", response.status);
    for (name, value) in &response.headers {
        out.push_str(&format!("{name}: {value}\r\n"));
    }
    out.push_str(&format!(
        "Content-Length: {}\r\nConnection: close\r\n\r\n{}",
        response.body.len(),
        response.body
    ));
    out
}
