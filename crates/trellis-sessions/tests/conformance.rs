//! Store behaviour checked end to end through an application.
//!
//! Every case runs against each bundled store.

mod common;

use std::sync::Arc;

use http::StatusCode;
use trellis_middleware::{Response, ResponseExt};
use trellis_server::App;
use trellis_sessions::{Options, Session, SessionMiddleware, Store, Value};

use common::{body_text, cookie_header, get, set_cookies};

const NAME: &str = "mysession";

fn app(store: Arc<dyn Store>) -> App {
    let mut app = App::new();
    app.use_middleware(SessionMiddleware::new(NAME, store));

    app.get("/set", |ctx, req| {
        let session = trellis_sessions::default(ctx, &req);
        async move {
            let session = session.unwrap();
            session.set("key", "foobar").await.unwrap();
            session.set("other", 2).await.unwrap();
            Response::text(StatusCode::OK, "ok")
        }
    });
    app.get("/get", |ctx, req| {
        let session = trellis_sessions::default(ctx, &req);
        async move {
            let value = session.unwrap().get("key").await.unwrap();
            Response::text(StatusCode::OK, value.and_then(|v| v.as_str().map(str::to_owned)).unwrap_or_default())
        }
    });
    app.get("/delete", |ctx, req| {
        let session = trellis_sessions::default(ctx, &req);
        async move {
            session.unwrap().delete("key").await.unwrap();
            Response::text(StatusCode::OK, "ok")
        }
    });
    app.get("/clear", |ctx, req| {
        let session = trellis_sessions::default(ctx, &req);
        async move {
            session.unwrap().clear().await.unwrap();
            Response::text(StatusCode::OK, "ok")
        }
    });
    app.get("/flash/add", |ctx, req| {
        let session = trellis_sessions::default(ctx, &req);
        async move {
            session.unwrap().add_flash("Hello world").await.unwrap();
            Response::text(StatusCode::OK, "ok")
        }
    });
    app.get("/flash/read", |ctx, req| {
        let session = trellis_sessions::default(ctx, &req);
        async move {
            let flashes = session.unwrap().flashes().await.unwrap();
            Response::text(StatusCode::OK, flashes.len().to_string())
        }
    });
    app.get("/options", |ctx, req| {
        let session = trellis_sessions::default(ctx, &req);
        async move {
            let session: Session = session.unwrap();
            session.set("key", "with-options").await.unwrap();
            session
                .options(Options {
                    path: "/foo/bar/bat".to_string(),
                    domain: Some("localhost".to_string()),
                    max_age: 3600,
                    http_only: true,
                    ..Options::default()
                })
                .await
                .unwrap();
            Response::text(StatusCode::OK, "ok")
        }
    });
    app.get("/count", |ctx, req| {
        let session = trellis_sessions::default(ctx, &req);
        async move {
            let session = session.unwrap();
            let n = session.get("other").await.unwrap().and_then(|v: Value| v.as_i64());
            Response::text(StatusCode::OK, n.map(|n| n.to_string()).unwrap_or_default())
        }
    });

    app
}

async fn get_set(store: Arc<dyn Store>) {
    let app = app(store);

    let first = app.handle(get("/set", None)).await;
    assert_eq!(first.status(), StatusCode::OK);
    let cookie = cookie_header(&first);
    assert!(cookie.starts_with(&format!("{NAME}=")));

    let second = app.handle(get("/get", Some(&cookie))).await;
    assert_eq!(body_text(second).await, "foobar");

    let third = app.handle(get("/count", Some(&cookie))).await;
    assert_eq!(body_text(third).await, "2");
}

async fn delete_key(store: Arc<dyn Store>) {
    let app = app(store);
    let cookie = cookie_header(&app.handle(get("/set", None)).await);

    let deleted = app.handle(get("/delete", Some(&cookie))).await;
    assert_eq!(deleted.status(), StatusCode::OK);

    let read = app.handle(get("/get", Some(&cookie))).await;
    assert_eq!(body_text(read).await, "");
    let untouched = app.handle(get("/count", Some(&cookie))).await;
    assert_eq!(body_text(untouched).await, "2");
}

async fn flashes(store: Arc<dyn Store>) {
    let app = app(store);
    let cookie = cookie_header(&app.handle(get("/flash/add", None)).await);

    let first = app.handle(get("/flash/read", Some(&cookie))).await;
    assert_eq!(body_text(first).await, "1");

    let second = app.handle(get("/flash/read", Some(&cookie))).await;
    assert_eq!(body_text(second).await, "0");
}

async fn clear(store: Arc<dyn Store>) {
    let app = app(store);
    let cookie = cookie_header(&app.handle(get("/set", None)).await);

    app.handle(get("/clear", Some(&cookie))).await;

    let key = app.handle(get("/get", Some(&cookie))).await;
    assert_eq!(body_text(key).await, "");
    let other = app.handle(get("/count", Some(&cookie))).await;
    assert_eq!(body_text(other).await, "");
}

async fn options(store: Arc<dyn Store>) {
    let app = app(store);
    let response = app.handle(get("/options", None)).await;

    let cookies = set_cookies(&response);
    assert_eq!(cookies.len(), 1, "only the latest cookie is sent: {cookies:?}");
    let cookie = &cookies[0];
    assert!(cookie.contains("Path=/foo/bar/bat"), "{cookie}");
    assert!(cookie.contains("Domain=localhost"), "{cookie}");
    assert!(cookie.contains("Max-Age=3600"), "{cookie}");
    assert!(cookie.contains("HttpOnly"), "{cookie}");
}

macro_rules! conformance {
    ($($case:ident),* $(,)?) => {
        mod memory {
            use super::*;
            use trellis_sessions::MemoryStore;

            $(
                #[tokio::test]
                async fn $case() {
                    super::$case(Arc::new(MemoryStore::new())).await;
                }
            )*
        }

        mod filesystem {
            use super::*;
            use trellis_sessions::FilesystemStore;

            $(
                #[tokio::test]
                async fn $case() {
                    let dir = tempfile::tempdir().unwrap();
                    super::$case(Arc::new(FilesystemStore::new(dir.path().join("sessions"), b"secret"))).await;
                }
            )*
        }
    };
}

conformance!(get_set, delete_key, flashes, clear, options);
