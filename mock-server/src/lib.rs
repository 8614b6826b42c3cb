//! In-memory stand-in for the Tienda REST API.
//!
//! Implements the same wire contract as the real backend: one path per
//! resource for every verb, entity ids in the request body, multipart
//! create/update for products and users, and every response wrapped in a
//! `{ success, data | body, msg, errors }` envelope. Created entities come
//! back under `body`, updated ones under `data`, as the real server does.

use std::{collections::BTreeMap, collections::HashMap, sync::Arc};

use axum::{
    extract::{DefaultBodyLimit, Multipart, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tokio::{net::TcpListener, sync::RwLock};
use tower_http::trace::TraceLayer;
use tracing::info;

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Categoria {
    pub id_categoria: u64,
    pub nombre_categoria: String,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Producto {
    pub id_producto: u64,
    pub cantidad: i64,
    pub descripcion: String,
    pub precio: f64,
    pub unidad: String,
    pub url_imagen: String,
    pub id_categoria: u64,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Usuario {
    pub id_usuario: u64,
    pub nombre: String,
    pub apellido: String,
    pub url_imagen: String,
    pub documento: String,
    pub contrasena: String,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Compra {
    pub id_compra: u64,
    pub id_usuario: u64,
    pub id_producto: u64,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoriaInput {
    pub id_categoria: Option<u64>,
    pub nombre_categoria: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompraInput {
    pub id_compra: Option<u64>,
    pub id_usuario: u64,
    pub id_producto: u64,
}

#[derive(Default, Debug)]
pub struct Tables {
    pub categorias: Vec<Categoria>,
    pub productos: Vec<Producto>,
    pub usuarios: Vec<Usuario>,
    pub carrito: Vec<Compra>,
    next_id: u64,
}

impl Tables {
    fn next_id(&mut self) -> u64 {
        self.next_id += 1;
        self.next_id
    }
}

pub type Db = Arc<RwLock<Tables>>;

/// Largest accepted image upload, matching the client-side check.
pub const MAX_IMAGE_BYTES: usize = 5 * 1024 * 1024;

/// Request body cap: one full-size image plus the text fields and framing.
pub const MAX_BODY_BYTES: usize = MAX_IMAGE_BYTES + 64 * 1024;

type Reply = (StatusCode, Json<Value>);
type FieldErrors = BTreeMap<String, Vec<String>>;

pub fn app() -> Router {
    app_with_db(Db::default())
}

/// Router over an existing database, so tests can seed or inspect it.
pub fn app_with_db(db: Db) -> Router {
    Router::new()
        .route(
            "/categoria",
            get(list_categorias)
                .post(create_categoria)
                .put(update_categoria)
                .delete(delete_categoria),
        )
        .route(
            "/productos",
            get(list_productos)
                .post(create_producto)
                .put(update_producto)
                .delete(delete_producto),
        )
        .route(
            "/usuarios",
            get(list_usuarios)
                .post(create_usuario)
                .put(update_usuario)
                .delete(delete_usuario),
        )
        .route(
            "/carrito",
            get(list_carrito)
                .post(create_compra)
                .put(update_compra)
                .delete(delete_compra),
        )
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .layer(TraceLayer::new_for_http())
        .with_state(db)
}

pub async fn run(listener: TcpListener) -> Result<(), std::io::Error> {
    axum::serve(listener, app()).await
}

// ---------------------------------------------------------------------------
// Envelope helpers
// ---------------------------------------------------------------------------

fn listing<T: Serialize>(items: &[T]) -> Reply {
    (StatusCode::OK, Json(json!({ "success": true, "data": items })))
}

fn created<T: Serialize>(entity: &T, msg: &str) -> Reply {
    (StatusCode::CREATED, Json(json!({ "success": true, "msg": msg, "body": entity })))
}

fn updated<T: Serialize>(entity: &T, msg: &str) -> Reply {
    (StatusCode::OK, Json(json!({ "success": true, "msg": msg, "data": entity })))
}

fn deleted(msg: &str) -> Reply {
    (StatusCode::OK, Json(json!({ "success": true, "msg": msg })))
}

fn failure(status: StatusCode, msg: &str) -> Reply {
    (status, Json(json!({ "success": false, "msg": msg })))
}

fn invalid(errors: FieldErrors) -> Reply {
    (
        StatusCode::BAD_REQUEST,
        Json(json!({ "success": false, "msg": "Datos inválidos", "errors": errors })),
    )
}

fn push_error(errors: &mut FieldErrors, field: &str, message: &str) {
    errors.entry(field.to_string()).or_default().push(message.to_string());
}

/// Read an `{ "<key>": id }` delete body.
fn body_id(body: &Value, key: &str) -> Option<u64> {
    body.get(key).and_then(Value::as_u64)
}

// ---------------------------------------------------------------------------
// Multipart
// ---------------------------------------------------------------------------

/// Text fields plus the stored path of the uploaded image, if any.
#[derive(Debug, Default)]
struct FormFields {
    text: HashMap<String, String>,
    image: Option<String>,
}

impl FormFields {
    fn text(&self, name: &str) -> Option<&str> {
        self.text.get(name).map(String::as_str)
    }

    fn required_text(&self, name: &str, errors: &mut FieldErrors) -> String {
        match self.text(name).map(str::trim) {
            Some(value) if !value.is_empty() => value.to_string(),
            _ => {
                push_error(errors, name, "es requerido");
                String::new()
            }
        }
    }

    fn number<T: std::str::FromStr>(&self, name: &str, errors: &mut FieldErrors) -> Option<T> {
        let parsed = self.text(name).and_then(|v| v.trim().parse::<T>().ok());
        if parsed.is_none() {
            push_error(errors, name, "debe ser numérico");
        }
        parsed
    }
}

async fn read_form(mut multipart: Multipart) -> Result<FormFields, Reply> {
    let mut form = FormFields::default();
    loop {
        let field = match multipart.next_field().await {
            Ok(Some(field)) => field,
            Ok(None) => break,
            Err(e) => return Err(failure(e.status(), &e.body_text())),
        };
        let name = field.name().unwrap_or_default().to_string();
        if name == "imagen" {
            let file_name = field.file_name().unwrap_or("imagen").to_string();
            // Only the path is kept; the bytes are read to drain the part.
            field
                .bytes()
                .await
                .map_err(|e| failure(e.status(), &e.body_text()))?;
            form.image = Some(format!("uploads/{file_name}"));
        } else {
            let value = field
                .text()
                .await
                .map_err(|e| failure(e.status(), &e.body_text()))?;
            form.text.insert(name, value);
        }
    }
    Ok(form)
}

// ---------------------------------------------------------------------------
// /categoria
// ---------------------------------------------------------------------------

async fn list_categorias(State(db): State<Db>) -> Reply {
    listing(&db.read().await.categorias)
}

fn check_nombre_categoria(nombre: &str) -> Result<String, Reply> {
    let nombre = nombre.trim();
    if nombre.chars().count() < 2 {
        let mut errors = FieldErrors::new();
        push_error(&mut errors, "nombreCategoria", "debe tener al menos 2 caracteres");
        return Err(invalid(errors));
    }
    Ok(nombre.to_string())
}

async fn create_categoria(State(db): State<Db>, Json(input): Json<CategoriaInput>) -> Reply {
    let nombre = match check_nombre_categoria(&input.nombre_categoria) {
        Ok(nombre) => nombre,
        Err(reply) => return reply,
    };
    let mut tables = db.write().await;
    let categoria = Categoria {
        id_categoria: tables.next_id(),
        nombre_categoria: nombre,
    };
    tables.categorias.push(categoria.clone());
    info!(id = categoria.id_categoria, "categoria created");
    created(&categoria, "Categoría creada")
}

async fn update_categoria(State(db): State<Db>, Json(input): Json<CategoriaInput>) -> Reply {
    let Some(id) = input.id_categoria else {
        return failure(StatusCode::BAD_REQUEST, "idCategoria es requerido");
    };
    let nombre = match check_nombre_categoria(&input.nombre_categoria) {
        Ok(nombre) => nombre,
        Err(reply) => return reply,
    };
    let mut tables = db.write().await;
    match tables.categorias.iter_mut().find(|c| c.id_categoria == id) {
        Some(categoria) => {
            categoria.nombre_categoria = nombre;
            updated(categoria, "Categoría actualizada")
        }
        None => failure(StatusCode::NOT_FOUND, "Categoría no encontrada"),
    }
}

async fn delete_categoria(State(db): State<Db>, Json(body): Json<Value>) -> Reply {
    let Some(id) = body_id(&body, "idCategoria") else {
        return failure(StatusCode::BAD_REQUEST, "idCategoria es requerido");
    };
    let mut tables = db.write().await;
    let before = tables.categorias.len();
    tables.categorias.retain(|c| c.id_categoria != id);
    if tables.categorias.len() == before {
        return failure(StatusCode::NOT_FOUND, "Categoría no encontrada");
    }
    deleted("Categoría eliminada")
}

// ---------------------------------------------------------------------------
// /productos
// ---------------------------------------------------------------------------

async fn list_productos(State(db): State<Db>) -> Reply {
    listing(&db.read().await.productos)
}

/// Validated product fields shared by create and update.
struct ProductoFields {
    cantidad: i64,
    descripcion: String,
    precio: f64,
    unidad: String,
    id_categoria: u64,
}

fn check_producto(form: &FormFields, tables: &Tables) -> Result<ProductoFields, Reply> {
    let mut errors = FieldErrors::new();
    let descripcion = form.required_text("descripcion", &mut errors);
    let unidad = form.required_text("unidad", &mut errors);
    let precio = form.number::<f64>("precio", &mut errors);
    let cantidad = form.number::<i64>("cantidad", &mut errors);
    let id_categoria = form.number::<u64>("idCategoria", &mut errors);

    if precio.is_some_and(|p| p <= 0.0) {
        push_error(&mut errors, "precio", "debe ser mayor a 0");
    }
    if cantidad.is_some_and(|c| c < 0) {
        push_error(&mut errors, "cantidad", "no puede ser negativa");
    }
    if let Some(id) = id_categoria {
        if !tables.categorias.iter().any(|c| c.id_categoria == id) {
            push_error(&mut errors, "idCategoria", "la categoría no existe");
        }
    }

    match (precio, cantidad, id_categoria) {
        (Some(precio), Some(cantidad), Some(id_categoria)) if errors.is_empty() => Ok(ProductoFields {
            cantidad,
            descripcion,
            precio,
            unidad,
            id_categoria,
        }),
        _ => Err(invalid(errors)),
    }
}

async fn create_producto(State(db): State<Db>, multipart: Multipart) -> Reply {
    let form = match read_form(multipart).await {
        Ok(form) => form,
        Err(reply) => return reply,
    };
    let mut tables = db.write().await;
    let fields = match check_producto(&form, &tables) {
        Ok(fields) => fields,
        Err(reply) => return reply,
    };
    let producto = Producto {
        id_producto: tables.next_id(),
        cantidad: fields.cantidad,
        descripcion: fields.descripcion,
        precio: fields.precio,
        unidad: fields.unidad,
        url_imagen: form.image.unwrap_or_default(),
        id_categoria: fields.id_categoria,
    };
    tables.productos.push(producto.clone());
    info!(id = producto.id_producto, "producto created");
    created(&producto, "Producto creado")
}

async fn update_producto(State(db): State<Db>, multipart: Multipart) -> Reply {
    let form = match read_form(multipart).await {
        Ok(form) => form,
        Err(reply) => return reply,
    };
    let Some(id) = form.text("idProducto").and_then(|v| v.parse::<u64>().ok()) else {
        return failure(StatusCode::BAD_REQUEST, "idProducto es requerido");
    };
    let mut tables = db.write().await;
    let fields = match check_producto(&form, &tables) {
        Ok(fields) => fields,
        Err(reply) => return reply,
    };
    let Some(producto) = tables.productos.iter_mut().find(|p| p.id_producto == id) else {
        return failure(StatusCode::NOT_FOUND, "Producto no encontrado");
    };
    producto.cantidad = fields.cantidad;
    producto.descripcion = fields.descripcion;
    producto.precio = fields.precio;
    producto.unidad = fields.unidad;
    producto.id_categoria = fields.id_categoria;
    if let Some(image) = form.image {
        producto.url_imagen = image;
    }
    updated(producto, "Producto actualizado")
}

async fn delete_producto(State(db): State<Db>, Json(body): Json<Value>) -> Reply {
    let Some(id) = body_id(&body, "idProducto") else {
        return failure(StatusCode::BAD_REQUEST, "idProducto es requerido");
    };
    let mut tables = db.write().await;
    let before = tables.productos.len();
    tables.productos.retain(|p| p.id_producto != id);
    if tables.productos.len() == before {
        return failure(StatusCode::NOT_FOUND, "Producto no encontrado");
    }
    deleted("Producto eliminado")
}

// ---------------------------------------------------------------------------
// /usuarios
// ---------------------------------------------------------------------------

async fn list_usuarios(State(db): State<Db>) -> Reply {
    listing(&db.read().await.usuarios)
}

struct UsuarioFields {
    nombre: String,
    apellido: String,
    documento: String,
    contrasena: String,
}

fn check_usuario(form: &FormFields) -> Result<UsuarioFields, Reply> {
    let mut errors = FieldErrors::new();
    let nombre = form.required_text("nombre", &mut errors);
    let apellido = form.required_text("apellido", &mut errors);
    let documento = form.required_text("documento", &mut errors);
    let contrasena = form.required_text("contrasena", &mut errors);
    if !errors.is_empty() {
        return Err(invalid(errors));
    }
    Ok(UsuarioFields {
        nombre,
        apellido,
        documento,
        contrasena,
    })
}

async fn create_usuario(State(db): State<Db>, multipart: Multipart) -> Reply {
    let form = match read_form(multipart).await {
        Ok(form) => form,
        Err(reply) => return reply,
    };
    let fields = match check_usuario(&form) {
        Ok(fields) => fields,
        Err(reply) => return reply,
    };
    let mut tables = db.write().await;
    let usuario = Usuario {
        id_usuario: tables.next_id(),
        nombre: fields.nombre,
        apellido: fields.apellido,
        url_imagen: form.image.unwrap_or_default(),
        documento: fields.documento,
        contrasena: fields.contrasena,
    };
    tables.usuarios.push(usuario.clone());
    info!(id = usuario.id_usuario, "usuario created");
    created(&usuario, "Usuario creado")
}

async fn update_usuario(State(db): State<Db>, multipart: Multipart) -> Reply {
    let form = match read_form(multipart).await {
        Ok(form) => form,
        Err(reply) => return reply,
    };
    let Some(id) = form.text("idUsuario").and_then(|v| v.parse::<u64>().ok()) else {
        return failure(StatusCode::BAD_REQUEST, "idUsuario es requerido");
    };
    let fields = match check_usuario(&form) {
        Ok(fields) => fields,
        Err(reply) => return reply,
    };
    let mut tables = db.write().await;
    let Some(usuario) = tables.usuarios.iter_mut().find(|u| u.id_usuario == id) else {
        return failure(StatusCode::NOT_FOUND, "Usuario no encontrado");
    };
    usuario.nombre = fields.nombre;
    usuario.apellido = fields.apellido;
    usuario.documento = fields.documento;
    usuario.contrasena = fields.contrasena;
    if let Some(image) = form.image {
        usuario.url_imagen = image;
    }
    updated(usuario, "Usuario actualizado")
}

async fn delete_usuario(State(db): State<Db>, Json(body): Json<Value>) -> Reply {
    let Some(id) = body_id(&body, "idUsuario") else {
        return failure(StatusCode::BAD_REQUEST, "idUsuario es requerido");
    };
    let mut tables = db.write().await;
    let before = tables.usuarios.len();
    tables.usuarios.retain(|u| u.id_usuario != id);
    if tables.usuarios.len() == before {
        return failure(StatusCode::NOT_FOUND, "Usuario no encontrado");
    }
    deleted("Usuario eliminado")
}

// ---------------------------------------------------------------------------
// /carrito
// ---------------------------------------------------------------------------

async fn list_carrito(State(db): State<Db>) -> Reply {
    listing(&db.read().await.carrito)
}

fn check_compra(input: &CompraInput, tables: &Tables) -> Result<(), Reply> {
    let mut errors = FieldErrors::new();
    if !tables.usuarios.iter().any(|u| u.id_usuario == input.id_usuario) {
        push_error(&mut errors, "idUsuario", "el usuario no existe");
    }
    if !tables.productos.iter().any(|p| p.id_producto == input.id_producto) {
        push_error(&mut errors, "idProducto", "el producto no existe");
    }
    if errors.is_empty() {
        Ok(())
    } else {
        Err(invalid(errors))
    }
}

async fn create_compra(State(db): State<Db>, Json(input): Json<CompraInput>) -> Reply {
    let mut tables = db.write().await;
    if let Err(reply) = check_compra(&input, &tables) {
        return reply;
    }
    let compra = Compra {
        id_compra: tables.next_id(),
        id_usuario: input.id_usuario,
        id_producto: input.id_producto,
    };
    tables.carrito.push(compra.clone());
    info!(id = compra.id_compra, "compra created");
    created(&compra, "Producto agregado al carrito")
}

async fn update_compra(State(db): State<Db>, Json(input): Json<CompraInput>) -> Reply {
    let Some(id) = input.id_compra else {
        return failure(StatusCode::BAD_REQUEST, "idCompra es requerido");
    };
    let mut tables = db.write().await;
    if let Err(reply) = check_compra(&input, &tables) {
        return reply;
    }
    match tables.carrito.iter_mut().find(|c| c.id_compra == id) {
        Some(compra) => {
            compra.id_usuario = input.id_usuario;
            compra.id_producto = input.id_producto;
            updated(compra, "Carrito actualizado")
        }
        None => failure(StatusCode::NOT_FOUND, "Compra no encontrada"),
    }
}

async fn delete_compra(State(db): State<Db>, Json(body): Json<Value>) -> Reply {
    let Some(id) = body_id(&body, "idCompra") else {
        return failure(StatusCode::BAD_REQUEST, "idCompra es requerido");
    };
    let mut tables = db.write().await;
    let before = tables.carrito.len();
    tables.carrito.retain(|c| c.id_compra != id);
    if tables.carrito.len() == before {
        return failure(StatusCode::NOT_FOUND, "Compra no encontrada");
    }
    deleted("Compra eliminada")
}
