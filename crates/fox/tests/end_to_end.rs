//! Whole-request behavior through the in-memory client.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use fox::prelude::*;
use fox_test::TestClient;
use http::{Method, StatusCode};
use serde_json::json;

fn ok() -> Vec<BoxedHandler> {
    handlers![|_ctx| Box::pin(async move { Ok(()) })]
}

fn echo_param(name: &'static str) -> Vec<BoxedHandler> {
    handlers![move |ctx| Box::pin(async move {
        let value = ctx.param_or(name, "").to_string();
        ctx.send_string(&value);
        Ok(())
    })]
}

fn client(app: App) -> TestClient {
    TestClient::from_app(app).unwrap()
}

#[tokio::test]
async fn test_param_route() {
    let mut app = App::new();
    app.get("/:p", echo_param("p"));

    client(app)
        .get("/hello")
        .send()
        .await
        .assert_status(StatusCode::OK)
        .assert_body_eq("hello");
}

#[tokio::test]
async fn test_middleware_runs_before_route() {
    let mut app = App::new();
    app.use_at(
        "/foo",
        handlers![|ctx| Box::pin(async move {
            ctx.write("use,");
            ctx.next().await
        })],
    );
    app.get(
        "/foo/bar",
        handlers![|ctx| Box::pin(async move {
            ctx.write("get");
            Ok(())
        })],
    );

    client(app)
        .get("/foo/bar")
        .send()
        .await
        .assert_status(StatusCode::OK)
        .assert_body_eq("use,get");
}

#[tokio::test]
async fn test_method_not_allowed() {
    let mut app = App::new();
    app.get("/x", ok());
    app.post("/x", ok());

    let response = client(app).delete("/x").send().await;
    response
        .assert_status(StatusCode::METHOD_NOT_ALLOWED)
        .assert_header("allow", "GET, HEAD, POST");
}

#[tokio::test]
async fn test_trailing_slash_follows_strict_routing() {
    let mut relaxed = App::new();
    relaxed.get("/a", ok());
    client(relaxed)
        .get("/a/")
        .send()
        .await
        .assert_status(StatusCode::OK);

    let mut strict = App::with_settings(Settings {
        strict_routing: true,
        ..Settings::default()
    });
    strict.get("/a", ok());
    client(strict)
        .get("/a/")
        .send()
        .await
        .assert_status(StatusCode::NOT_FOUND)
        .assert_body_eq("Cannot GET /a/");
}

#[tokio::test]
async fn test_case_sensitivity() {
    let mut insensitive = App::new();
    insensitive.get("/Users/:name", echo_param("name"));
    client(insensitive)
        .get("/users/Ada")
        .send()
        .await
        .assert_body_eq("Ada");

    let mut sensitive = App::with_settings(Settings {
        case_sensitive: true,
        ..Settings::default()
    });
    sensitive.get("/Users/:name", echo_param("name"));
    client(sensitive)
        .get("/users/Ada")
        .send()
        .await
        .assert_status(StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_unescape_path() {
    let mut app = App::with_settings(Settings {
        unescape_path: true,
        ..Settings::default()
    });
    app.get(
        "/créer",
        handlers![|ctx| Box::pin(async move {
            ctx.send_string("created");
            Ok(())
        })],
    );
    app.get("/files/:name", echo_param("name"));

    let client = client(app);
    client
        .get("/cr%C3%A9er")
        .send()
        .await
        .assert_body_eq("created");
    client
        .get("/files/a%20b.txt")
        .send()
        .await
        .assert_body_eq("a b.txt");
}

#[tokio::test]
async fn test_escaped_path_without_unescape() {
    let mut app = App::new();
    app.get("/créer", ok());

    client(app)
        .get("/cr%C3%A9er")
        .send()
        .await
        .assert_status(StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_optional_and_wildcard() {
    let mut app = App::new();
    app.get("/foo/:a?", echo_param("a"));
    app.get("/static/*", echo_param("*"));

    let client = client(app);
    client.get("/foo").send().await.assert_body_eq("");
    client.get("/foo/bar").send().await.assert_body_eq("bar");
    client
        .get("/static/js/app.js")
        .send()
        .await
        .assert_body_eq("js/app.js");
}

#[tokio::test]
async fn test_automatic_options() {
    let mut app = App::new();
    app.get("/items", ok());
    app.put("/items", ok());

    let response = client(app).options("/items").send().await;
    response
        .assert_status(StatusCode::NO_CONTENT)
        .assert_header("allow", "GET, HEAD, PUT, OPTIONS")
        .assert_empty_body();
}

#[tokio::test]
async fn test_options_disabled_falls_back_to_405() {
    let mut app = App::with_settings(Settings {
        handle_options: false,
        ..Settings::default()
    });
    app.get("/items", ok());

    let response = client(app).options("/items").send().await;
    response
        .assert_status(StatusCode::METHOD_NOT_ALLOWED)
        .assert_header("allow", "GET, HEAD");
}

#[tokio::test]
async fn test_explicit_options_route_wins() {
    let mut app = App::new();
    app.get("/items", ok());
    app.options(
        "/items",
        handlers![|ctx| Box::pin(async move {
            ctx.send_string("custom");
            Ok(())
        })],
    );

    client(app)
        .options("/items")
        .send()
        .await
        .assert_status(StatusCode::OK)
        .assert_body_eq("custom");
}

#[tokio::test]
async fn test_unknown_method_is_400() {
    let mut app = App::new();
    app.get("/x", ok());

    let method = Method::from_bytes(b"PURGE").unwrap();
    client(app)
        .request(method, "/x")
        .send()
        .await
        .assert_status(StatusCode::BAD_REQUEST)
        .assert_body_eq("Invalid http method");
}

#[tokio::test]
async fn test_handler_error_reaches_error_handler() {
    let mut app = App::new();
    app.error_handler(|ctx, err| {
        let body = json!({ "error": err.to_string(), "status": err.status_code().as_u16() });
        ctx.status(err.status_code());
        // A JSON value always serializes.
        let _ = ctx.json(&body);
    });
    app.get(
        "/secret",
        handlers![|_ctx| Box::pin(async move {
            Err(FoxError::new(StatusCode::FORBIDDEN, "no access"))
        })],
    );

    let client = client(app);
    client
        .get("/secret")
        .send()
        .await
        .assert_status(StatusCode::FORBIDDEN)
        .assert_json_eq(&json!({"error": "no access", "status": 403}));
    client
        .get("/missing")
        .send()
        .await
        .assert_status(StatusCode::NOT_FOUND)
        .assert_json_eq(&json!({"error": "Cannot GET /missing", "status": 404}));
}

#[tokio::test]
async fn test_groups_nest() {
    let mut app = App::new();
    {
        let mut api = app.group(
            "/api",
            handlers![|ctx| Box::pin(async move {
                ctx.set_header("x-api", "1")?;
                ctx.next().await
            })],
        );
        let mut v1 = api.group("/v1", Vec::new());
        v1.get("/users/:id", echo_param("id"));
    }
    app.get("/health", ok());

    let client = client(app);
    client
        .get("/api/v1/users/9")
        .send()
        .await
        .assert_header("x-api", "1")
        .assert_body_eq("9");
    client
        .get("/health")
        .send()
        .await
        .assert_status(StatusCode::OK)
        .assert_no_header("x-api");
}

#[tokio::test]
async fn test_all_matches_every_method() {
    let mut app = App::new();
    app.all(
        "/any",
        handlers![|ctx| Box::pin(async move {
            let method = ctx.method().to_string();
            ctx.send_string(&method);
            Ok(())
        })],
    );

    let client = client(app);
    client.delete("/any").send().await.assert_body_eq("DELETE");
    client.patch("/any").send().await.assert_body_eq("PATCH");
}

#[tokio::test]
async fn test_server_header() {
    let mut app = App::with_settings(Settings {
        server_header: Some("fox".to_string()),
        ..Settings::default()
    });
    app.get("/", ok());

    let client = client(app);
    client.get("/").send().await.assert_header("server", "fox");
    client.get("/nope").send().await.assert_header("server", "fox");
}

#[tokio::test]
async fn test_recovered_panic_is_500() {
    fn explode() -> HandlerResult {
        panic!("handler blew up")
    }

    let mut app = App::with_settings(Settings {
        recover_panics: true,
        ..Settings::default()
    });
    app.get("/boom", handlers![|_ctx| Box::pin(async move { explode() })]);
    app.get("/fine", ok());

    let client = client(app);
    client
        .get("/boom")
        .send()
        .await
        .assert_status(StatusCode::INTERNAL_SERVER_ERROR);
    client.get("/fine").send().await.assert_status(StatusCode::OK);
}

#[tokio::test]
async fn test_locals_pass_between_handlers() {
    let mut app = App::new();
    app.use_(handlers![|ctx| Box::pin(async move {
        ctx.set_local("user", "ada".to_string());
        ctx.next().await
    })]);
    app.get(
        "/me",
        handlers![|ctx| Box::pin(async move {
            let user = ctx.local::<String>("user").cloned().unwrap_or_default();
            ctx.send_string(&user);
            Ok(())
        })],
    );

    client(app).get("/me").send().await.assert_body_eq("ada");
}

#[tokio::test]
async fn test_concurrent_requests_share_dispatcher() {
    let hits = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&hits);

    let mut app = App::with_settings(Settings {
        pool_capacity: 4,
        ..Settings::default()
    });
    app.get(
        "/n/:n",
        vec![handler_fn(move |ctx| {
            let counter = Arc::clone(&counter);
            Box::pin(async move {
                counter.fetch_add(1, Ordering::SeqCst);
                tokio::task::yield_now().await;
                let n = ctx.param_or("n", "").to_string();
                ctx.send_string(&n);
                Ok(())
            })
        })],
    );

    let client = client(app);
    let mut tasks = Vec::new();
    for i in 0..32 {
        let client = client.clone();
        tasks.push(tokio::spawn(async move {
            let response = client.get(format!("/n/{i}")).send().await;
            assert_eq!(response.text().unwrap(), i.to_string());
        }));
    }
    for task in tasks {
        task.await.unwrap();
    }

    assert_eq!(hits.load(Ordering::SeqCst), 32);
    assert!(client.dispatcher().pool().idle() <= 4);
}
