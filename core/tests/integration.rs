//! Full CRUD lifecycle test against the live mock server.
//!
//! # Design
//! Starts the mock server on a random port, then drives every store over real
//! HTTP through the `ureq` transport. Validates that request building,
//! multipart encoding, envelope parsing and local patching agree with the
//! server end-to-end.

use tienda_core::views;
use tienda_core::{
    ApiClient, ApiError, CartForm, CartService, CategoryForm, CategoryService, ClientConfig, EntityService,
    EntityStore, ImageFile, LoadState, ProductForm, ProductService, SubmitError, UserForm, UserService,
};
use tokio_util::sync::CancellationToken;

/// Bind a random port and serve the mock API from a background thread.
fn start_mock_server() -> std::net::SocketAddr {
    let std_listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = std_listener.local_addr().unwrap();
    std_listener.set_nonblocking(true).unwrap();

    std::thread::spawn(move || {
        let rt = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap();
        rt.block_on(async {
            let listener = tokio::net::TcpListener::from_std(std_listener).unwrap();
            mock_server::run(listener).await
        })
        .unwrap();
    });

    addr
}

#[tokio::test(flavor = "multi_thread")]
async fn crud_lifecycle() {
    let addr = start_mock_server();
    let client = ApiClient::new(ClientConfig::new(&format!("http://{addr}/")));
    assert_eq!(client.base_url(), format!("http://{addr}"));
    let view = CancellationToken::new();

    // Step 1: mount every store; all empty.
    let mut categories = EntityStore::mount(CategoryService::new(client.clone()), &view).await;
    let mut products = EntityStore::mount(ProductService::new(client.clone()), &view).await;
    let mut users = EntityStore::mount(UserService::new(client.clone()), &view).await;
    let mut cart = EntityStore::mount(CartService::new(client.clone()), &view).await;
    for state in [categories.state(), products.state(), users.state(), cart.state()] {
        assert_eq!(state, LoadState::Ready);
    }
    assert!(categories.items().is_empty());

    // Step 2: create a category (JSON, answered under `body`).
    let dairy = categories
        .submit_create(CategoryForm {
            name: "  Lácteos ".to_string(),
        })
        .await
        .unwrap();
    assert_eq!(dairy.name, "Lácteos");
    assert_eq!(categories.items().len(), 1);

    // Step 3: create a product with an image (multipart).
    let milk = products
        .submit_create(ProductForm {
            description: "Leche".to_string(),
            price: 3.5,
            quantity: 12,
            unit: "litro".to_string(),
            category_id: dairy.id,
            image: Some(ImageFile::new("leche.png", "image/png", b"\x89PNG fake".to_vec())),
        })
        .await
        .unwrap();
    assert_eq!(milk.price, 3.5);
    let image = milk.image_url.clone().unwrap();
    assert_eq!(image, "uploads/leche.png");
    assert_eq!(
        client.resolve_image_url(&image),
        format!("http://{addr}/uploads/leche.png")
    );
    assert_eq!(products.by_category(dairy.id).len(), 1);

    // Step 4: update the product without a new image; the stored one stays.
    let mut edit = ProductForm::from(&milk);
    edit.price = 4.25;
    let updated = products.submit_update(milk.id, edit).await.unwrap();
    assert_eq!(updated.price, 4.25);
    assert_eq!(updated.image_url.as_deref(), Some("uploads/leche.png"));
    assert_eq!(products.find(milk.id).unwrap().price, 4.25);

    // Step 5: create a user with a 3 MiB photo and put the product in their cart.
    let photo = ImageFile::new("ana.jpg", "image/jpeg", vec![0xAB; 3 * 1024 * 1024]);
    let ana = users
        .submit_create(UserForm {
            first_name: "Ana".to_string(),
            last_name: "Ruiz".to_string(),
            document: "12345678".to_string(),
            password: "secreto".to_string(),
            image: Some(photo),
        })
        .await
        .unwrap();
    assert_eq!(ana.full_name(), "Ana Ruiz");
    assert_eq!(ana.image_url.as_deref(), Some("uploads/ana.jpg"));

    let entry = cart
        .submit_create(CartForm {
            user_id: ana.id,
            product_id: milk.id,
        })
        .await
        .unwrap();
    assert_eq!(cart.for_user(ana.id).len(), 1);

    let lines = views::cart_lines(cart.items(), users.items(), products.items());
    assert_eq!(lines[0].user_name, "Ana Ruiz");
    assert_eq!(lines[0].product_name, "Leche");
    assert_eq!(views::cart_total(&lines), 4.25);

    // Step 6: refetching returns what the server stored.
    assert_eq!(cart.refetch().await, LoadState::Ready);
    assert_eq!(cart.items().len(), 1);
    assert_eq!(products.refetch().await, LoadState::Ready);
    assert_eq!(products.find(milk.id).unwrap().price, 4.25);

    // Step 7: delete, then delete again.
    assert!(cart.delete(entry.id).await.unwrap());
    assert!(cart.items().is_empty());

    let err = cart.delete(entry.id).await.unwrap_err();
    assert!(matches!(err, ApiError::Status { status: 404, .. }));
    assert_eq!(err.message(), "Compra no encontrada");

    // Step 8: the server rejects a cart entry for an unknown user.
    let err = cart
        .submit_create(CartForm {
            user_id: 9_999,
            product_id: milk.id,
        })
        .await
        .unwrap_err();
    let SubmitError::Api(err) = err else {
        panic!("expected an API error");
    };
    assert!(matches!(err, ApiError::Status { status: 400, .. }));
    assert_eq!(err.message(), "Datos inválidos");
    assert!(cart.items().is_empty());

    // Step 9: services work without a store.
    let service = CategoryService::new(client.clone());
    assert_eq!(service.list().await.unwrap().len(), 1);
    service.delete(dairy.id).await.unwrap();
    assert!(service.list().await.unwrap().is_empty());
}
