use std::cell::{Cell, RefCell};
use std::num::NonZeroUsize;

use serde_json::{json, Map, Value};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

use crate::catalog::{
    Catalog, CatalogError, ClientOptions, CreateFields, CreateForm, HttpCatalog, Product,
    UpdateFields, UpdateForm,
};
use crate::engine::{SortDirection, SortKey, ViewState};
use crate::session::{Session, SessionError};

fn size(n: usize) -> NonZeroUsize {
    NonZeroUsize::new(n).unwrap()
}

fn numbered(count: i64) -> Vec<Product> {
    (1..=count)
        .map(|i| Product::new(i, format!("Item {i}"), (i * 3 % 7) as f64))
        .collect()
}

fn ids<'a>(products: impl IntoIterator<Item = &'a Product>) -> Vec<i64> {
    products.into_iter().map(|p| p.id).collect()
}

fn apple_banana() -> Vec<Product> {
    vec![Product::new(1, "Apple", 10.0), Product::new(2, "Banana", 5.0)]
}

#[test]
fn search_yields_case_insensitive_subsequence_in_dataset_order() {
    let dataset = vec![
        Product::new(1, "Classic Red T-Shirt", 10.0),
        Product::new(2, "Blue Hoodie", 30.0),
        Product::new(3, "RED sneakers", 50.0),
        Product::new(4, "Fancy Redwood Table", 120.0),
        Product::new(5, "Green Cap", 8.0),
    ];
    let mut state = ViewState::default();
    state.load(dataset.clone());
    state.apply_sort(SortKey::Price);
    state.apply_sort(SortKey::Price);

    for query in ["red", "RED", "", "zzz", " t"] {
        state.apply_search(query);
        let expected: Vec<i64> = dataset
            .iter()
            .filter(|p| p.title.to_lowercase().contains(&query.to_lowercase()))
            .map(|p| p.id)
            .collect();
        assert_eq!(ids(state.view()), expected, "query {query:?}");
        assert_eq!(state.current_page(), 1);
    }
}

#[test]
fn price_descending_is_reverse_of_ascending() {
    let mut state = ViewState::default();
    state.load(vec![
        Product::new(1, "a", 3.5),
        Product::new(2, "b", 1.0),
        Product::new(3, "c", 99.0),
        Product::new(4, "d", 0.0),
        Product::new(5, "e", 12.25),
    ]);
    state.apply_sort(SortKey::Price);
    let ascending = ids(state.view());
    assert_eq!(ascending, vec![4, 2, 1, 5, 3]);

    state.apply_sort(SortKey::Price);
    let mut descending = ids(state.view());
    descending.reverse();
    assert_eq!(descending, ascending);
}

#[test]
fn sorting_by_price_twice_flips_apple_and_banana() {
    let mut state = ViewState::default();
    state.load(apple_banana());

    state.apply_sort(SortKey::Price);
    let titles: Vec<&str> = state.view().map(|p| p.title.as_str()).collect();
    assert_eq!(titles, vec!["Banana", "Apple"]);

    state.apply_sort(SortKey::Price);
    let titles: Vec<&str> = state.view().map(|p| p.title.as_str()).collect();
    assert_eq!(titles, vec!["Apple", "Banana"]);
    assert_eq!(
        state.sort_state(),
        Some((SortKey::Price, SortDirection::Descending))
    );
}

#[test]
fn sort_and_page_size_reset_to_first_page() {
    let mut state = ViewState::new(size(10));
    state.load(numbered(25));
    assert!(state.go_to_page(3));
    state.set_page_size(size(5));
    assert_eq!(state.current_page(), 1);
    assert_eq!(state.total_pages(), 5);

    assert!(state.go_to_page(4));
    state.apply_sort(SortKey::Title);
    assert_eq!(state.current_page(), 1);
}

#[test]
fn second_page_of_fifteen_has_five_rows() {
    let mut state = ViewState::new(size(10));
    state.load(numbered(15));
    assert_eq!(state.total_pages(), 2);
    assert!(state.go_to_page(2));
    assert_eq!(ids(state.visible_slice()), vec![11, 12, 13, 14, 15]);
}

#[test]
fn update_keeps_view_slot_even_when_search_no_longer_matches() {
    let mut state = ViewState::default();
    state.load(apple_banana());
    state.apply_sort(SortKey::Price);
    state.apply_search("Banana");
    assert_eq!(ids(state.view()), vec![2]);

    assert!(state.record_updated(Product::new(2, "Zebra", 5.0)));
    let titles: Vec<&str> = state.view().map(|p| p.title.as_str()).collect();
    assert_eq!(titles, vec!["Zebra"]);
    assert_eq!(state.search_query(), "Banana");

}

#[test]
fn update_under_descending_price_keeps_view_order() {
    let mut state = ViewState::default();
    state.load(apple_banana());
    state.apply_sort(SortKey::Price);
    state.apply_sort(SortKey::Price);
    let titles: Vec<&str> = state.view().map(|p| p.title.as_str()).collect();
    assert_eq!(titles, vec!["Apple", "Banana"]);

    assert!(state.record_updated(Product::new(2, "Zebra", 5.0)));
    let titles: Vec<&str> = state.view().map(|p| p.title.as_str()).collect();
    assert_eq!(titles, vec!["Apple", "Zebra"]);
}

#[test]
fn clearing_search_keeps_remembered_sort_direction() {
    let mut state = ViewState::default();
    state.load(apple_banana());
    state.apply_sort(SortKey::Price);
    state.apply_search("");
    assert_eq!(
        state.sort_state(),
        Some((SortKey::Price, SortDirection::Ascending))
    );

    state.apply_sort(SortKey::Price);
    let titles: Vec<&str> = state.view().map(|p| p.title.as_str()).collect();
    assert_eq!(titles, vec!["Apple", "Banana"]);
}

#[test]
fn created_record_goes_first_and_clears_search() {
    let mut state = ViewState::new(size(2));
    state.load(numbered(5));
    state.apply_sort(SortKey::Title);
    state.apply_search("Item 3");
    state.record_created(Product::new(42, "Fresh", 1.0));

    assert_eq!(state.search_query(), "");
    assert_eq!(state.current_page(), 1);
    assert_eq!(ids(state.view()), vec![42, 1, 2, 3, 4, 5]);
    assert_eq!(ids(state.visible_slice()), vec![42, 1]);
    assert_eq!(
        state.sort_state(),
        Some((SortKey::Title, SortDirection::Ascending))
    );
}

#[test]
fn table_shows_placeholder_rows() {
    let mut state = ViewState::default();
    let out = crate::output::render_table(&state, true);
    assert!(out.contains(crate::output::LOAD_ERROR_MESSAGE));

    state.load(apple_banana());
    state.apply_search("kiwi");
    let out = crate::output::render_table(&state, false);
    assert!(out.contains(crate::output::EMPTY_MESSAGE));
    assert!(out.contains("page 1/1"));
}

#[test]
fn table_lists_visible_rows_with_fallback_category() {
    let mut state = ViewState::new(size(1));
    state.load(apple_banana());
    let out = crate::output::render_table(&state, false);
    assert!(out.contains("#1"));
    assert!(out.contains("Apple"));
    assert!(out.contains("$10"));
    assert!(out.contains("Uncategorized"));
    assert!(!out.contains("Banana"));
}

#[derive(Default)]
struct FakeCatalog {
    products: Vec<Product>,
    fail_list: Cell<bool>,
    fail_writes: Cell<bool>,
    calls: RefCell<Vec<String>>,
}

impl FakeCatalog {
    fn with(products: Vec<Product>) -> Self {
        Self {
            products,
            ..Self::default()
        }
    }

    fn calls(&self) -> Vec<String> {
        self.calls.borrow().clone()
    }

    fn server_error() -> CatalogError {
        CatalogError::Status {
            status: 500,
            message: "boom".to_string(),
        }
    }
}

impl Catalog for FakeCatalog {
    async fn list(&self) -> Result<Vec<Product>, CatalogError> {
        self.calls.borrow_mut().push("list".to_string());
        if self.fail_list.get() {
            return Err(Self::server_error());
        }
        Ok(self.products.clone())
    }

    async fn create(&self, fields: &CreateFields) -> Result<Product, CatalogError> {
        self.calls.borrow_mut().push(format!("create {}", fields.title));
        if self.fail_writes.get() {
            return Err(Self::server_error());
        }
        Ok(Product {
            id: 100,
            title: fields.title.clone(),
            price: fields.price,
            description: Some(fields.description.clone()),
            images: fields.images.clone(),
            ..Product::default()
        })
    }

    async fn update(
        &self,
        id: i64,
        fields: &UpdateFields,
    ) -> Result<Map<String, Value>, CatalogError> {
        self.calls.borrow_mut().push(format!("update {id}"));
        if self.fail_writes.get() {
            return Err(Self::server_error());
        }
        let mut patch = Map::new();
        patch.insert("id".to_string(), json!(id));
        patch.insert("title".to_string(), json!(fields.title));
        patch.insert("price".to_string(), json!(fields.price));
        patch.insert("updatedAt".to_string(), json!("2024-05-01T00:00:00.000Z"));
        Ok(patch)
    }
}

fn lamp_form() -> CreateForm {
    CreateForm {
        title: "Lamp".to_string(),
        price: "19.5".to_string(),
        category_id: "3".to_string(),
        description: "bright".to_string(),
        image: "https://img/lamp.png".to_string(),
    }
}

#[tokio::test]
async fn failed_reload_keeps_previous_dataset() {
    let catalog = FakeCatalog::with(apple_banana());
    let mut session = Session::new(catalog, size(10));
    assert_eq!(session.load().await.unwrap(), 2);
    assert!(!session.load_failed());

    session.catalog().fail_list.set(true);
    assert!(matches!(
        session.load().await,
        Err(SessionError::Catalog(CatalogError::Status { status: 500, .. }))
    ));
    assert!(session.load_failed());
    assert_eq!(ids(session.state().dataset()), vec![1, 2]);

    session.catalog().fail_list.set(false);
    session.load().await.unwrap();
    assert!(!session.load_failed());
}

#[tokio::test]
async fn invalid_create_never_reaches_the_catalog() {
    let mut session = Session::new(FakeCatalog::default(), size(10));
    let mut form = lamp_form();
    form.image = "  ".to_string();
    assert!(matches!(
        session.create(&form).await,
        Err(SessionError::Validation(_))
    ));
    assert!(session.catalog().calls().is_empty());
}

#[tokio::test]
async fn create_prepends_and_clears_search() {
    let mut session = Session::new(FakeCatalog::with(apple_banana()), size(10));
    session.load().await.unwrap();
    session.search("apple");

    let created = session.create(&lamp_form()).await.unwrap();
    assert_eq!(created.id, 100);
    assert_eq!(session.state().search_query(), "");
    assert_eq!(ids(session.state().view()), vec![100, 1, 2]);
    assert_eq!(
        session.catalog().calls(),
        vec!["list".to_string(), "create Lamp".to_string()]
    );
}

#[tokio::test]
async fn failed_create_leaves_state_untouched() {
    let mut session = Session::new(FakeCatalog::with(apple_banana()), size(10));
    session.load().await.unwrap();
    session.search("apple");
    session.catalog().fail_writes.set(true);

    assert!(session.create(&lamp_form()).await.is_err());
    assert_eq!(session.state().search_query(), "apple");
    assert_eq!(ids(session.state().dataset()), vec![1, 2]);
}

#[tokio::test]
async fn update_overlays_response_on_known_record() {
    let mut products = apple_banana();
    products[1].description = Some("yellow".to_string());
    products[1].images = vec!["https://img/banana.png".to_string()];
    let mut session = Session::new(FakeCatalog::with(products), size(10));
    session.load().await.unwrap();
    session.search("banana");

    let mut form = session.edit_form(2).unwrap();
    form.set("title", "Zebra").unwrap();
    let updated = session.update(2, &form).await.unwrap();

    assert_eq!(updated.title, "Zebra");
    assert_eq!(updated.description.as_deref(), Some("yellow"));
    assert_eq!(updated.images, vec!["https://img/banana.png".to_string()]);
    assert!(updated.extra.contains_key("updatedAt"));

    // still listed under the old search
    let titles: Vec<&str> = session
        .state()
        .view()
        .map(|p| p.title.as_str())
        .collect();
    assert_eq!(titles, vec!["Zebra"]);
}

#[tokio::test]
async fn update_of_unknown_or_invalid_record_sends_nothing() {
    let mut session = Session::new(FakeCatalog::with(apple_banana()), size(10));
    session.load().await.unwrap();

    let form = UpdateForm {
        title: "Ghost".to_string(),
        price: "1".to_string(),
        ..UpdateForm::default()
    };
    assert!(matches!(
        session.update(77, &form).await,
        Err(SessionError::UnknownProduct { id: 77 })
    ));

    let mut form = session.edit_form(1).unwrap();
    form.set("price", "free").unwrap();
    assert!(matches!(
        session.update(1, &form).await,
        Err(SessionError::Validation(_))
    ));
    assert_eq!(session.catalog().calls(), vec!["list".to_string()]);
}

#[tokio::test]
async fn next_and_previous_stop_at_the_edges() {
    let mut session = Session::new(FakeCatalog::with(numbered(15)), size(10));
    session.load().await.unwrap();
    assert!(!session.previous_page());
    assert!(session.next_page());
    assert!(!session.next_page());
    assert_eq!(session.state().current_page(), 2);
}

async fn read_request(socket: &mut TcpStream) -> String {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 1024];
    loop {
        let n = socket.read(&mut chunk).await.unwrap();
        if n == 0 {
            break;
        }
        buf.extend_from_slice(&chunk[..n]);
        if let Some(pos) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
            let head = String::from_utf8_lossy(&buf[..pos]).to_lowercase();
            let body_len = head
                .lines()
                .find_map(|l| l.strip_prefix("content-length:"))
                .and_then(|v| v.trim().parse::<usize>().ok())
                .unwrap_or(0);
            if buf.len() >= pos + 4 + body_len {
                break;
            }
        }
    }
    String::from_utf8_lossy(&buf).to_string()
}

// answers exactly one request and hands back what it received
async fn serve_once(
    status_line: &'static str,
    body: &'static str,
) -> (HttpCatalog, tokio::task::JoinHandle<String>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let handle = tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.unwrap();
        let request = read_request(&mut socket).await;
        let response = format!(
            "HTTP/1.1 {status_line}\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{body}",
            body.len()
        );
        socket.write_all(response.as_bytes()).await.unwrap();
        let _ = socket.shutdown().await;
        request
    });
    let catalog = HttpCatalog::new(&ClientOptions {
        api_url: format!("http://{addr}/api/v1/products"),
        timeout_seconds: 5,
        proxy: None,
    })
    .unwrap();
    (catalog, handle)
}

#[tokio::test]
async fn http_list_decodes_products() {
    let (catalog, server) = serve_once(
        "200 OK",
        r#"[{"id":1,"title":"Apple","price":10,"images":["https://img/a.png"],"category":{"id":1,"name":"Fruit"}},{"id":2,"title":"Banana","price":5.5,"images":[]}]"#,
    )
    .await;
    let products = catalog.list().await.unwrap();
    let request = server.await.unwrap();

    assert!(request.starts_with("GET /api/v1/products HTTP/1.1"));
    assert_eq!(ids(&products), vec![1, 2]);
    assert_eq!(products[0].category_name(), Some("Fruit"));
    assert_eq!(products[1].price, 5.5);
}

#[tokio::test]
async fn http_list_survives_sloppy_records() {
    let (catalog, server) = serve_once(
        "200 OK",
        r#"[{"id":1,"title":null,"price":"7.25","images":null},{"title":"missing id"},{"id":3,"title":"Cap","price":8}]"#,
    )
    .await;
    let products = catalog.list().await.unwrap();
    server.await.unwrap();

    assert_eq!(ids(&products), vec![1, 3]);
    assert_eq!(products[0].title, "");
    assert_eq!(products[0].price, 7.25);
    assert!(products[0].images.is_empty());
}

#[tokio::test]
async fn http_create_posts_camel_case_json() {
    let (catalog, server) = serve_once(
        "201 Created",
        r#"{"id":210,"title":"Lamp","price":19.5,"description":"bright","images":["https://img/lamp.png"],"category":{"id":3,"name":"Furniture"}}"#,
    )
    .await;
    let fields = lamp_form().validate().unwrap();
    let created = catalog.create(&fields).await.unwrap();
    let request = server.await.unwrap();

    assert!(request.starts_with("POST /api/v1/products HTTP/1.1"));
    assert!(request.contains(r#""categoryId":3"#));
    assert!(request.contains(r#""images":["https://img/lamp.png"]"#));
    assert_eq!(created.id, 210);
}

#[tokio::test]
async fn http_update_returns_raw_object() {
    let (catalog, server) = serve_once(
        "200 OK",
        r#"{"id":4,"title":"Renamed","price":12,"updatedAt":"2024-05-01T00:00:00.000Z"}"#,
    )
    .await;
    let fields = UpdateForm {
        title: "Renamed".to_string(),
        price: "12".to_string(),
        ..UpdateForm::default()
    }
    .validate()
    .unwrap();
    let patch = catalog.update(4, &fields).await.unwrap();
    let request = server.await.unwrap();

    assert!(request.starts_with("PUT /api/v1/products/4 HTTP/1.1"));
    assert_eq!(patch.get("title"), Some(&json!("Renamed")));
    assert!(patch.contains_key("updatedAt"));
}

#[tokio::test]
async fn http_error_status_carries_server_message() {
    let (catalog, server) = serve_once(
        "400 Bad Request",
        r#"{"message":["price must be a positive number"],"error":"Bad Request","statusCode":400}"#,
    )
    .await;
    let fields = lamp_form().validate().unwrap();
    let err = catalog.create(&fields).await.unwrap_err();
    server.await.unwrap();

    match err {
        CatalogError::Status { status, message } => {
            assert_eq!(status, 400);
            assert_eq!(message, "price must be a positive number");
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[tokio::test]
async fn http_garbage_body_is_a_decode_error() {
    let (catalog, server) = serve_once("200 OK", "<html>maintenance</html>").await;
    let err = catalog.list().await.unwrap_err();
    server.await.unwrap();
    assert!(matches!(err, CatalogError::Decode { .. }));
}

#[tokio::test]
async fn http_unreachable_catalog_is_a_transport_error() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let catalog = HttpCatalog::new(&ClientOptions {
        api_url: format!("http://{addr}/api/v1/products"),
        timeout_seconds: 2,
        proxy: None,
    })
    .unwrap();
    assert!(matches!(
        catalog.list().await,
        Err(CatalogError::Transport { .. })
    ));
}
