//! End-to-end behaviour over real sockets. Every test owns its ports and
//! closes them before returning.

mod common;

use common::{get, init_tracing, is_listening, send};
use easyfied::{
    Endpoint, Error, HttpError, Request, RouteMethod, ServerOptions, StaticOptions, Validator, registry,
};
use serde_json::{Value, json};

#[tokio::test]
async fn return_values_on_the_wire() {
    init_tracing();
    const PORT: u16 = 38_101;

    registry::add_route(RouteMethod::Get, "/hello", |_: Request| async { "Hello world" }, PORT).unwrap();
    registry::add_route(RouteMethod::Get, "/false", |_: Request| async { false }, PORT).unwrap();
    registry::add_route(RouteMethod::Get, "/float", |_: Request| async { 13.3 }, PORT).unwrap();
    registry::add_route(RouteMethod::Get, "/nothing", |_: Request| async {}, PORT).unwrap();
    registry::add_route(RouteMethod::Get, "/null", |_: Request| async { Value::Null }, PORT).unwrap();
    registry::add_route(RouteMethod::Get, "/json", |_: Request| async { json!({"ok": true}) }, PORT).unwrap();

    let response = get(PORT, "/hello").await;
    assert_eq!(response.status, 200);
    assert_eq!(response.header("content-type"), Some("text/html"));
    assert_eq!(response.text(), "Hello world");

    assert_eq!(get(PORT, "/false").await.text(), "false");
    assert_eq!(get(PORT, "/float").await.text(), "13.3");

    let response = get(PORT, "/nothing").await;
    assert_eq!(response.status, 204);
    assert!(response.body.is_empty());
    assert_eq!(get(PORT, "/null").await.status, 204);

    let response = get(PORT, "/json").await;
    assert_eq!(response.header("content-type"), Some("application/json"));
    assert_eq!(response.text(), r#"{"ok":true}"#);

    let response = get(PORT, "/missing").await;
    assert_eq!(response.status, 404);
    assert_eq!(response.text(), "not found");

    assert!(registry::close(PORT).await);
}

#[tokio::test]
async fn untyped_errors_and_the_default_error() {
    init_tracing();
    const PLAIN: u16 = 38_102;
    const WITH_DEFAULT: u16 = 38_103;

    async fn crash(_: Request) -> Result<String, HttpError> {
        Err("Crashed".into())
    }

    registry::add_route(RouteMethod::Get, "/crash", crash, PLAIN).unwrap();
    let response = get(PLAIN, "/crash").await;
    assert_eq!(response.status, 500);
    assert_eq!(response.text(), "Crashed");

    let options = ServerOptions::new().default_error(503, "Service unavailable");
    let server = registry::initialize(WITH_DEFAULT, &options).unwrap();
    server.add_route(RouteMethod::Get, "/crash", crash).unwrap();
    server
        .add_route(RouteMethod::Get, "/typed", |_: Request| async {
            Err::<(), _>(HttpError::forbidden("typed"))
        })
        .unwrap();

    let response = get(WITH_DEFAULT, "/crash").await;
    assert_eq!(response.status, 503);
    assert_eq!(response.text(), "Service unavailable");
    assert_eq!(get(WITH_DEFAULT, "/typed").await.status, 403);

    let err = registry::initialize(WITH_DEFAULT, &options).unwrap_err();
    assert!(matches!(err, Error::AlreadyInitialized(WITH_DEFAULT)));

    registry::close(PLAIN).await;
    registry::close(WITH_DEFAULT).await;
}

#[tokio::test]
async fn response_codes_are_per_request() {
    init_tracing();
    const PORT: u16 = 38_104;

    registry::add_route(
        RouteMethod::Post,
        "/items",
        |req: Request| async move {
            req.set_response_code(201);
            "created"
        },
        PORT,
    )
    .unwrap();
    registry::add_route(RouteMethod::Get, "/items", |_: Request| async { "listed" }, PORT).unwrap();

    let (created, listed) = tokio::join!(send(PORT, "POST", "/items", &[], ""), get(PORT, "/items"));
    assert_eq!(created.status, 201);
    assert_eq!(created.text(), "created");
    assert_eq!(listed.status, 200);

    registry::close(PORT).await;
}

#[tokio::test]
async fn servers_on_different_ports_are_independent() {
    init_tracing();
    const FIRST: u16 = 38_105;
    const SECOND: u16 = 38_106;

    registry::add_route(RouteMethod::Get, "/who", |_: Request| async { "first" }, FIRST).unwrap();
    registry::add_route(RouteMethod::Get, "/who", |_: Request| async { "second" }, SECOND).unwrap();

    assert_eq!(get(FIRST, "/who").await.text(), "first");
    assert_eq!(get(SECOND, "/who").await.text(), "second");

    assert!(registry::close(FIRST).await);
    assert!(!is_listening(FIRST).await);
    assert!(registry::lookup(FIRST).is_none());
    assert_eq!(get(SECOND, "/who").await.text(), "second");

    assert!(!registry::close(FIRST).await);
    registry::close(SECOND).await;
}

#[tokio::test]
async fn a_closed_port_can_be_registered_again() {
    init_tracing();
    const PORT: u16 = 38_107;

    registry::add_route(RouteMethod::Get, "/old", |_: Request| async { "old" }, PORT).unwrap();
    assert_eq!(get(PORT, "/old").await.status, 200);
    registry::close(PORT).await;

    registry::add_route(RouteMethod::Get, "/new", |_: Request| async { "new" }, PORT).unwrap();
    assert_eq!(registry::lookup(PORT).unwrap().routes().len(), 1);
    assert_eq!(get(PORT, "/old").await.status, 404);
    assert_eq!(get(PORT, "/new").await.text(), "new");

    registry::close(PORT).await;
}

#[tokio::test]
async fn middleware_guards_terminal_routes() {
    init_tracing();
    const PORT: u16 = 38_108;

    async fn guard(req: Request) -> Result<(), HttpError> {
        match req.header("authorization") {
            Some("letmein") => Ok(()),
            _ => Err(HttpError::forbidden("not logged")),
        }
    }

    registry::add_middleware(guard, PORT).unwrap();
    registry::add_route(RouteMethod::Get, "/private", |_: Request| async { "secret" }, PORT).unwrap();

    let response = get(PORT, "/private").await;
    assert_eq!(response.status, 403);
    assert_eq!(response.text(), "not logged");

    let response = send(PORT, "GET", "/private", &[("Authorization", "letmein")], "").await;
    assert_eq!(response.status, 200);
    assert_eq!(response.text(), "secret");

    registry::close(PORT).await;
}

#[tokio::test]
async fn parameters_from_query_path_and_body() {
    init_tracing();
    const PORT: u16 = 38_109;

    let greet = Endpoint::new(|req: Request| async move {
        let name: String = req.arg_as("name")?;
        let title: String = req.arg_as("title")?;
        Ok::<_, HttpError>(format!("Hello {title} {name}"))
    })
    .signature("name, title = 'Mr'");
    registry::add_route(RouteMethod::Get, "/greet", greet, PORT).unwrap();

    let show = Endpoint::new(|req: Request| async move { req.param("id").map(str::to_owned) });
    registry::add_route(RouteMethod::Get, "/users/:id", show, PORT).unwrap();

    let create = Endpoint::new(|req: Request| async move {
        let age = req.arg("age").cloned().unwrap_or_default();
        Validator::new("age").is_number().between(0.0, 150.0).validate(&age)?;
        req.set_response_code(201);
        Ok::<_, HttpError>(json!({"age": age}))
    })
    .param("age");
    registry::add_route(RouteMethod::Post, "/users", create, PORT).unwrap();

    let response = get(PORT, "/greet").await;
    assert_eq!(response.status, 400);
    assert_eq!(response.text(), "A parameter is missing : name");
    assert_eq!(get(PORT, "/greet?NAME=Bond").await.text(), "Hello Mr Bond");
    assert_eq!(get(PORT, "/greet?name=Bond&title=Dr").await.text(), "Hello Dr Bond");

    assert_eq!(get(PORT, "/USERS/AbC").await.text(), "AbC");

    let json_type = [("Content-Type", "application/json")];
    let response = send(PORT, "POST", "/users", &json_type, r#"{"age": 31}"#).await;
    assert_eq!(response.status, 201);
    assert_eq!(response.text(), r#"{"age":31}"#);

    let response = send(PORT, "POST", "/users", &json_type, r#"{"age": 200}"#).await;
    assert_eq!(response.status, 400);
    assert!(response.text().starts_with("Validation error: age  AND : "));

    let response = send(PORT, "POST", "/users", &json_type, "{not json").await;
    assert_eq!(response.status, 400);
    assert_eq!(response.text(), "unable to parse json body");

    registry::close(PORT).await;
}

#[tokio::test]
async fn static_mounts() {
    init_tracing();
    const PORT: u16 = 38_110;

    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("test.png"), [0x89, b'P', b'N', b'G']).unwrap();
    std::fs::create_dir(dir.path().join("sub")).unwrap();
    std::fs::write(dir.path().join("sub").join("a.txt"), "a").unwrap();

    registry::add_static("/file", dir.path(), StaticOptions::new(), PORT).unwrap();
    registry::add_static("/browse", dir.path(), StaticOptions::new().list_files(true), PORT).unwrap();

    let response = get(PORT, "/file/test.png").await;
    assert_eq!(response.status, 200);
    assert_eq!(response.header("content-type"), Some("image/png"));
    assert_eq!(response.body, [0x89, b'P', b'N', b'G']);

    assert_eq!(get(PORT, "/file/nothing.png").await.status, 404);
    assert_eq!(get(PORT, "/file/../Cargo.toml").await.status, 400);
    assert_eq!(get(PORT, "/file/sub").await.status, 404);

    let response = get(PORT, "/browse/sub").await;
    assert_eq!(response.status, 200);
    assert_eq!(response.text(), r#"<a href="/browse/sub/a.txt"> a.txt</a><br/>"#);

    registry::close(PORT).await;
}

#[tokio::test]
async fn redirect_mounts() {
    init_tracing();
    const PORT: u16 = 38_111;

    registry::add_redirect("http://localhost:90/plop?toto=tiit", PORT, true).unwrap();

    let response = get(PORT, "/hw?titi=toto").await;
    assert_eq!(response.status, 301);
    assert_eq!(response.header("location"), Some("http://localhost:90/plop/hw?titi=toto"));

    registry::close(PORT).await;
}

#[tokio::test]
async fn port_zero_is_the_main_port() {
    init_tracing();
    const MAIN: u16 = 38_112;

    registry::set_main_port(MAIN);
    registry::add_route(RouteMethod::Get, "/", |_: Request| async { "main" }, 0).unwrap();

    let server = registry::lookup(0).unwrap();
    assert_eq!(server.port(), MAIN);
    assert_eq!(get(MAIN, "/").await.text(), "main");

    assert!(registry::close(0).await);
    assert!(registry::lookup(MAIN).is_none());
}

#[tokio::test]
async fn handlers_can_extend_their_own_server() {
    init_tracing();
    const PORT: u16 = 38_113;

    registry::add_route(
        RouteMethod::Post,
        "/register",
        |req: Request| async move {
            let server = req.server().ok_or_else(|| HttpError::server_error("no server"))?;
            server
                .add_route(RouteMethod::Get, "/dynamic", |_: Request| async { "registered later" })
                .map_err(|e| HttpError::server_error(e.to_string()))?;
            Ok::<_, HttpError>(())
        },
        PORT,
    )
    .unwrap();

    assert_eq!(get(PORT, "/dynamic").await.status, 404);
    assert_eq!(send(PORT, "POST", "/register", &[], "").await.status, 204);
    assert_eq!(get(PORT, "/dynamic").await.text(), "registered later");

    registry::close(PORT).await;
}

#[tokio::test]
async fn standalone_servers_bind_ephemeral_ports() {
    init_tracing();

    let server = easyfied::Server::bind(0, &ServerOptions::default()).unwrap();
    server.add_route(RouteMethod::Use, "/*", |req: Request| async move { req.method().to_string() }).unwrap();

    let port = server.port();
    assert_ne!(port, 0);
    assert_eq!(send(port, "PATCH", "/any/thing", &[], "").await.text(), "PATCH");
    assert!(registry::lookup(port).is_none());

    server.close().await;
    assert!(!is_listening(port).await);
}

#[tokio::test]
async fn invalid_registrations_are_errors() {
    init_tracing();
    const PORT: u16 = 38_114;

    let err = registry::add_route(RouteMethod::Get, "/:id/:id", |_: Request| async {}, PORT).unwrap_err();
    assert!(matches!(err, Error::InvalidRoute { .. }));

    let err = registry::add_redirect("not a url", PORT, false).unwrap_err();
    assert!(matches!(err, Error::InvalidRedirect { .. }));

    let err = registry::add_route(RouteMethod::Static, "/files", |_: Request| async {}, PORT).unwrap_err();
    assert!(matches!(err, Error::InvalidRoute { .. }));

    assert!(registry::lookup(PORT).unwrap().routes().is_empty());
    registry::close(PORT).await;
}
