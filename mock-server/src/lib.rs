//! In-memory stand-in for the storefront backend.
//!
//! Serves the endpoints the client talks to, with the backend's status codes
//! and `{"detail": ...}` error bodies, including 422 validation lists.

use std::{
    collections::{BTreeMap, HashMap},
    sync::Arc,
};

use axum::{
    extract::{Path, Query, State},
    http::{header::AUTHORIZATION, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post, put},
    Form, Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tokio::{net::TcpListener, sync::RwLock};
use tracing::info;
use uuid::Uuid;

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct UserPublic {
    pub id: i64,
    pub username: String,
    pub email: String,
}

/// Public view of a product. `description` is accepted on input and dropped.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Product {
    pub id: i64,
    pub name: String,
    pub price: f64,
    #[serde(rename = "QT")]
    pub qt: i64,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Token {
    pub access_token: String,
    pub token_type: String,
}

#[derive(Deserialize)]
pub struct LoginForm {
    pub username: String,
    pub password: String,
}

#[derive(Deserialize)]
pub struct ProductQuery {
    pub name: Option<String>,
    pub product_id: Option<i64>,
    pub skip: Option<usize>,
    pub limit: Option<usize>,
}

#[derive(Deserialize)]
pub struct ProductUpdate {
    pub name: Option<String>,
    pub description: Option<String>,
    pub price: Option<f64>,
    #[serde(rename = "QT")]
    pub qt: Option<i64>,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct SaleItemInput {
    pub product_id: i64,
    #[serde(rename = "QT")]
    pub qt: i64,
}

#[derive(Deserialize)]
pub struct SaleInput {
    pub items: Vec<SaleItemInput>,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct SaleItem {
    pub product_id: i64,
    #[serde(rename = "QT")]
    pub qt: i64,
    pub product_price: f64,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Sale {
    pub id: i64,
    pub user_id: i64,
    pub total_price: f64,
    pub items: Vec<SaleItem>,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct DailySales {
    pub total_sales: usize,
    pub total_amount: f64,
}

struct StoredUser {
    public: UserPublic,
    password: String,
}

/// Tokens map to usernames, so renaming a user invalidates their tokens.
#[derive(Default)]
pub struct Store {
    users: Vec<StoredUser>,
    tokens: HashMap<String, String>,
    products: BTreeMap<i64, Product>,
    sales: Vec<Sale>,
    next_user_id: i64,
    next_product_id: i64,
}

pub type Db = Arc<RwLock<Store>>;

/// A non-2xx answer with a `{"detail": ...}` body.
#[derive(Debug)]
pub struct Failure {
    status: StatusCode,
    detail: Value,
}

impl Failure {
    fn new(status: StatusCode, detail: impl Into<Value>) -> Self {
        Self {
            status,
            detail: detail.into(),
        }
    }
}

impl IntoResponse for Failure {
    fn into_response(self) -> Response {
        (self.status, Json(json!({ "detail": self.detail }))).into_response()
    }
}

pub fn app() -> Router {
    let db: Db = Arc::new(RwLock::new(Store::default()));
    Router::new()
        .route("/auth/token", post(login))
        .route("/auth/refresh_token", post(refresh_token))
        .route("/users/", get(list_users).post(create_user))
        .route("/users/{id}", put(update_user).delete(delete_user))
        .route("/products/", get(list_products).post(create_product))
        .route("/products/{id}", put(update_product).delete(delete_product))
        .route("/sales/", post(create_sale))
        .route("/sales/create-payment", post(create_payment))
        .route("/sales/daily_report", get(daily_report))
        .with_state(db)
}

pub async fn run(listener: TcpListener) -> Result<(), std::io::Error> {
    if let Ok(addr) = listener.local_addr() {
        info!(%addr, "mock storefront listening");
    }
    axum::serve(listener, app()).await
}

async fn login(State(db): State<Db>, Form(form): Form<LoginForm>) -> Result<Json<Token>, Failure> {
    let mut store = db.write().await;
    let known = store
        .users
        .iter()
        .any(|u| u.public.username == form.username && u.password == form.password);
    if !known {
        return Err(Failure::new(
            StatusCode::UNAUTHORIZED,
            "Incorrect email or password",
        ));
    }
    Ok(Json(issue_token(&mut store, form.username)))
}

async fn refresh_token(State(db): State<Db>, headers: HeaderMap) -> Result<Json<Token>, Failure> {
    let mut store = db.write().await;
    let user_id = authorize(&store, &headers)?;
    let username = store
        .user(user_id)
        .map(|u| u.public.username.clone())
        .ok_or_else(credentials_failure)?;
    Ok(Json(issue_token(&mut store, username)))
}

fn issue_token(store: &mut Store, username: String) -> Token {
    let access_token = Uuid::new_v4().to_string();
    store.tokens.insert(access_token.clone(), username);
    Token {
        access_token,
        token_type: "bearer".to_string(),
    }
}

async fn list_users(State(db): State<Db>) -> Json<Value> {
    let store = db.read().await;
    let users: Vec<&UserPublic> = store.users.iter().map(|u| &u.public).collect();
    Json(json!({ "users": users }))
}

/// `{username, email, password}` with the 422 list on any bad field.
fn user_schema(body: &Value) -> Result<(String, String, String), Failure> {
    let mut errors = Vec::new();
    let username = require_str(body, "username", &mut errors);
    let email = require_str(body, "email", &mut errors);
    let password = require_str(body, "password", &mut errors);
    if let Some(email) = &email {
        if !looks_like_email(email) {
            errors.push(field_error(
                "email",
                "value is not a valid email address",
                "value_error",
            ));
        }
    }
    match (username, email, password) {
        (Some(username), Some(email), Some(password)) if errors.is_empty() => Ok((username, email, password)),
        _ => Err(Failure::new(StatusCode::UNPROCESSABLE_ENTITY, errors)),
    }
}

async fn create_user(
    State(db): State<Db>,
    Json(body): Json<Value>,
) -> Result<(StatusCode, Json<UserPublic>), Failure> {
    let (username, email, password) = user_schema(&body)?;

    let mut store = db.write().await;
    if store.users.iter().any(|u| u.public.username == username) {
        return Err(Failure::new(StatusCode::CONFLICT, "Username already exists"));
    }
    if store.users.iter().any(|u| u.public.email == email) {
        return Err(Failure::new(StatusCode::CONFLICT, "Email already exists"));
    }

    store.next_user_id += 1;
    let public = UserPublic {
        id: store.next_user_id,
        username,
        email,
    };
    store.users.push(StoredUser {
        public: public.clone(),
        password,
    });
    Ok((StatusCode::CREATED, Json(public)))
}

/// Rewrites the caller's own record whatever the path id says.
async fn update_user(
    State(db): State<Db>,
    Path(_id): Path<i64>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Result<Json<UserPublic>, Failure> {
    let mut store = db.write().await;
    let user_id = authorize(&store, &headers)?;
    let (username, email, password) = user_schema(&body)?;

    let taken = store
        .users
        .iter()
        .any(|u| u.public.id != user_id && (u.public.username == username || u.public.email == email));
    if taken {
        return Err(Failure::new(
            StatusCode::CONFLICT,
            "Username or Email already exists",
        ));
    }

    let user = store
        .users
        .iter_mut()
        .find(|u| u.public.id == user_id)
        .ok_or_else(credentials_failure)?;
    user.public.username = username;
    user.public.email = email;
    user.password = password;
    Ok(Json(user.public.clone()))
}

async fn delete_user(
    State(db): State<Db>,
    Path(id): Path<i64>,
    headers: HeaderMap,
) -> Result<Json<Value>, Failure> {
    let mut store = db.write().await;
    let user_id = authorize(&store, &headers)?;
    if user_id != id {
        return Err(Failure::new(StatusCode::FORBIDDEN, "Not enough permissions"));
    }
    if let Some(pos) = store.users.iter().position(|u| u.public.id == id) {
        let removed = store.users.remove(pos);
        store.tokens.retain(|_, name| *name != removed.public.username);
    }
    Ok(Json(json!({ "message": "User deleted" })))
}

async fn list_products(
    State(db): State<Db>,
    Query(query): Query<ProductQuery>,
) -> Result<Json<Vec<Product>>, Failure> {
    let store = db.read().await;
    let products: Vec<Product> = store
        .products
        .values()
        .filter(|p| query.name.as_deref().map_or(true, |n| p.name.contains(n)))
        .filter(|p| query.product_id.map_or(true, |id| p.id == id))
        .skip(query.skip.unwrap_or(0))
        .take(query.limit.unwrap_or(100))
        .cloned()
        .collect();
    if products.is_empty() {
        return Err(Failure::new(StatusCode::NOT_FOUND, "Product(s) not found"));
    }
    Ok(Json(products))
}

async fn create_product(
    State(db): State<Db>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Result<(StatusCode, Json<Product>), Failure> {
    let mut store = db.write().await;
    authorize(&store, &headers)?;

    let mut errors = Vec::new();
    let name = require_str(&body, "name", &mut errors);
    let price = body.get("price").and_then(Value::as_f64);
    if price.is_none() {
        errors.push(missing_or_invalid(&body, "price", "Input should be a valid number", "float_parsing"));
    }
    let qt = body.get("QT").and_then(Value::as_i64);
    if qt.is_none() {
        errors.push(missing_or_invalid(&body, "QT", "Input should be a valid integer", "int_parsing"));
    }
    let (Some(name), Some(price), Some(qt)) = (name, price, qt) else {
        return Err(Failure::new(StatusCode::UNPROCESSABLE_ENTITY, errors));
    };

    store.next_product_id += 1;
    let product = Product {
        id: store.next_product_id,
        name,
        price,
        qt,
    };
    store.products.insert(product.id, product.clone());
    Ok((StatusCode::CREATED, Json(product)))
}

async fn update_product(
    State(db): State<Db>,
    Path(id): Path<i64>,
    headers: HeaderMap,
    Json(input): Json<ProductUpdate>,
) -> Result<Json<Product>, Failure> {
    let mut store = db.write().await;
    authorize(&store, &headers)?;
    let product = store
        .products
        .get_mut(&id)
        .ok_or_else(|| Failure::new(StatusCode::NOT_FOUND, "Product not found"))?;
    if let Some(name) = input.name {
        product.name = name;
    }
    if let Some(price) = input.price {
        product.price = price;
    }
    if let Some(qt) = input.qt {
        product.qt = qt;
    }
    Ok(Json(product.clone()))
}

async fn delete_product(
    State(db): State<Db>,
    Path(id): Path<i64>,
    headers: HeaderMap,
) -> Result<StatusCode, Failure> {
    let mut store = db.write().await;
    authorize(&store, &headers)?;
    store
        .products
        .remove(&id)
        .map(|_| StatusCode::NO_CONTENT)
        .ok_or_else(|| Failure::new(StatusCode::NOT_FOUND, "Product not found"))
}

/// Price the items against current stock. Nothing is changed.
fn price_items(store: &Store, items: &[SaleItemInput]) -> Result<Vec<SaleItem>, Failure> {
    items
        .iter()
        .map(|item| -> Result<SaleItem, Failure> {
            let product = store
                .products
                .get(&item.product_id)
                .ok_or_else(|| {
                    Failure::new(
                        StatusCode::NOT_FOUND,
                        format!("Produto com ID {} não encontrado", item.product_id),
                    )
                })?;
            if product.qt < item.qt {
                return Err(Failure::new(
                    StatusCode::BAD_REQUEST,
                    format!("Produto {} não tem estoque suficiente.", product.name),
                ));
            }
            Ok(SaleItem {
                product_id: product.id,
                qt: item.qt,
                product_price: product.price,
            })
        })
        .collect()
}

fn total_price(items: &[SaleItem]) -> f64 {
    items.iter().map(|i| i.product_price * i.qt as f64).sum()
}

async fn create_sale(
    State(db): State<Db>,
    headers: HeaderMap,
    Json(input): Json<SaleInput>,
) -> Result<(StatusCode, Json<Sale>), Failure> {
    let mut store = db.write().await;
    let user_id = authorize(&store, &headers)?;
    let items = price_items(&store, &input.items)?;

    for item in &items {
        if let Some(product) = store.products.get_mut(&item.product_id) {
            product.qt -= item.qt;
        }
    }
    let sale = Sale {
        id: store.sales.len() as i64 + 1,
        user_id,
        total_price: total_price(&items),
        items,
    };
    store.sales.push(sale.clone());
    Ok((StatusCode::CREATED, Json(sale)))
}

async fn create_payment(
    State(db): State<Db>,
    headers: HeaderMap,
    Json(input): Json<SaleInput>,
) -> Result<Json<Value>, Failure> {
    let store = db.read().await;
    authorize(&store, &headers)?;
    let items = price_items(&store, &input.items)?;
    Ok(Json(json!({
        "payment_id": "PAY_12345",
        "qr_code_base64": "simulacao-de-qr-code-para-pagamento",
        "total_price": total_price(&items),
    })))
}

/// Every sale in the store counts as today's.
async fn daily_report(State(db): State<Db>, headers: HeaderMap) -> Result<Json<DailySales>, Failure> {
    let store = db.read().await;
    authorize(&store, &headers)?;
    Ok(Json(DailySales {
        total_sales: store.sales.len(),
        total_amount: store.sales.iter().map(|s| s.total_price).sum(),
    }))
}

impl Store {
    fn user(&self, id: i64) -> Option<&StoredUser> {
        self.users.iter().find(|u| u.public.id == id)
    }
}

fn credentials_failure() -> Failure {
    Failure::new(StatusCode::UNAUTHORIZED, "Could not validate credentials")
}

/// Resolve the bearer token to the id of an existing user.
fn authorize(store: &Store, headers: &HeaderMap) -> Result<i64, Failure> {
    let token = headers
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .ok_or_else(|| Failure::new(StatusCode::UNAUTHORIZED, "Not authenticated"))?;
    let username = store.tokens.get(token).ok_or_else(credentials_failure)?;
    store
        .users
        .iter()
        .find(|u| &u.public.username == username)
        .map(|u| u.public.id)
        .ok_or_else(credentials_failure)
}

fn field_error(field: &str, msg: &str, kind: &str) -> Value {
    json!({ "loc": ["body", field], "msg": msg, "type": kind })
}

fn missing_or_invalid(body: &Value, field: &str, msg: &str, kind: &str) -> Value {
    if body.get(field).is_none() {
        field_error(field, "Field required", "missing")
    } else {
        field_error(field, msg, kind)
    }
}

fn require_str(body: &Value, field: &str, errors: &mut Vec<Value>) -> Option<String> {
    let value = body.get(field).and_then(Value::as_str).map(str::to_string);
    if value.is_none() {
        errors.push(missing_or_invalid(body, field, "Input should be a valid string", "string_type"));
    }
    value
}

fn looks_like_email(email: &str) -> bool {
    match email.split_once('@') {
        Some((local, domain)) => !local.is_empty() && domain.contains('.') && !domain.starts_with('.'),
        None => false,
    }
}
