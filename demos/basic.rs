//! Minimal easyfied example: middleware, declared parameters, validation,
//! a static mount and a second server redirecting to the first.
//!
//! Run with:
//!   RUST_LOG=debug cargo run --example basic
//!
//! Try:
//!   curl http://localhost:3000/hello?name=alice
//!   curl http://localhost:3000/users/42 -H 'authorization: demo'
//!   curl -X POST http://localhost:3000/users \
//!        -H 'authorization: demo' \
//!        -H 'content-type: application/json' \
//!        -d '{"name":"alice","age":31}'
//!   curl http://localhost:3000/files/
//!   curl -i http://localhost:3001/hello?name=bob

use easyfied::{Endpoint, HttpError, Property, Request, RouteMethod, StaticOptions, Validator};
use serde_json::{Value, json};

#[tokio::main]
async fn main() -> Result<(), easyfied::Error> {
    tracing_subscriber::fmt::init();

    easyfied::set_main_port(3000);

    easyfied::add_middleware(authenticate, 0)?;
    easyfied::add_route(RouteMethod::Get, "/hello", Endpoint::new(hello).signature("name, title = ''"), 0)?;
    easyfied::add_route(RouteMethod::Get, "/users/:id", Endpoint::new(get_user).param("id"), 0)?;
    easyfied::add_route(RouteMethod::Post, "/users", Endpoint::new(create_user).param("name").param("age"), 0)?;
    easyfied::add_static("/files", "demos", StaticOptions::new().list_files(true), 0)?;

    easyfied::add_redirect("http://localhost:3000/", 3001, true)?;

    tokio::signal::ctrl_c().await?;
    easyfied::close(3001).await;
    easyfied::close(0).await;
    Ok(())
}

// Every request runs through here. Public paths pass; the failure of
// anything else only surfaces if the terminal route succeeds.
async fn authenticate(req: Request) -> Result<(), HttpError> {
    let path = req.url().route.as_str();
    if path.starts_with("/hello") || path.starts_with("/files") {
        return Ok(());
    }
    match req.header("authorization") {
        Some(_) => Ok(()),
        None => Err(HttpError::not_authenticated("missing authorization header")),
    }
}

// GET /hello?name=alice → text/html
async fn hello(req: Request) -> Result<String, HttpError> {
    let name: String = req.arg_as("name")?;
    let title: String = req.arg_as("title")?;
    Ok(format!("Hello {title} {name}").replace("  ", " "))
}

// GET /users/:id → application/json
async fn get_user(req: Request) -> Value {
    json!({ "id": req.param("id"), "name": "alice" })
}

// POST /users → 201 + JSON, or 400 with the validation message
async fn create_user(req: Request) -> Result<Value, HttpError> {
    let user = json!({ "name": req.arg("name"), "age": req.arg("age") });

    Validator::new("user")
        .has_properties([
            Property::checked("name", Validator::new("name").is_string(2, 32)),
            Property::checked("age", Validator::new("age").is_number().between(0.0, 150.0)),
        ])
        .validate(&user)?;

    req.set_response_code(201);
    Ok(user)
}
