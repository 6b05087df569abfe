//! Registry and runtime index clients against a local canned-response server.

use std::sync::{Arc, Mutex};

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

use dockmatrix_core::{DockmatrixError, RuntimeIndex, TagSource};
use upstream_index::{NodeIndexClient, RegistryConfig, RegistryTagSource};

struct Route {
    path: &'static str,
    status: u16,
    headers: Vec<(&'static str, String)>,
    body: String,
}

impl Route {
    fn json(path: &'static str, body: &str) -> Self {
        Route {
            path,
            status: 200,
            headers: Vec::new(),
            body: body.to_string(),
        }
    }

    fn with_header(mut self, name: &'static str, value: &str) -> Self {
        self.headers.push((name, value.to_string()));
        self
    }
}

/// Seen request lines plus their `Authorization` header.
type Seen = Arc<Mutex<Vec<(String, Option<String>)>>>;

async fn serve(routes: Vec<Route>) -> (String, Seen) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let base = format!("http://{}", listener.local_addr().unwrap());
    let seen: Seen = Arc::default();
    let routes = Arc::new(routes);

    let log = seen.clone();
    tokio::spawn(async move {
        loop {
            let Ok((mut socket, _)) = listener.accept().await else {
                return;
            };
            let routes = routes.clone();
            let log = log.clone();
            tokio::spawn(async move {
                let mut buf = Vec::new();
                let mut chunk = [0u8; 1024];
                while !buf.windows(4).any(|w| w == b"\r\n\r\n") {
                    match socket.read(&mut chunk).await {
                        Ok(0) | Err(_) => return,
                        Ok(n) => buf.extend_from_slice(&chunk[..n]),
                    }
                }
                let request = String::from_utf8_lossy(&buf).to_string();
                let path = request
                    .lines()
                    .next()
                    .and_then(|line| line.split_whitespace().nth(1))
                    .unwrap_or("/")
                    .to_string();
                let auth = request
                    .lines()
                    .find(|l| l.to_ascii_lowercase().starts_with("authorization:"))
                    .map(|l| l["authorization:".len()..].trim().to_string());
                log.lock().unwrap().push((path.clone(), auth));

                let response = match routes.iter().find(|r| r.path == path) {
                    Some(route) => {
                        let mut head = format!(
                            "HTTP/1.1 {} OK\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n",
                            route.status,
                            route.body.len()
                        );
                        for (name, value) in &route.headers {
                            head.push_str(&format!("{name}: {value}\r\n"));
                        }
                        format!("{head}\r\n{}", route.body)
                    }
                    None => "HTTP/1.1 404 Not Found\r\ncontent-length: 0\r\nconnection: close\r\n\r\n"
                        .to_string(),
                };
                let _ = socket.write_all(response.as_bytes()).await;
                let _ = socket.shutdown().await;
            });
        }
    });

    (base, seen)
}

fn registry_config(base: &str, with_auth: bool) -> RegistryConfig {
    RegistryConfig {
        registry_url: base.to_string(),
        auth_url: with_auth.then(|| format!("{base}/token")),
        service: "registry.test".to_string(),
        repository: "library/php".to_string(),
    }
}

#[tokio::test]
async fn registry_listing_follows_pagination_with_token() {
    let (base, seen) = serve(vec![
        Route::json(
            "/token?service=registry.test&scope=repository:library/php:pull",
            r#"{"token":"anon-token"}"#,
        ),
        Route::json(
            "/v2/library/php/tags/list",
            r#"{"name":"library/php","tags":["8.2-apache","8.2-fpm"]}"#,
        )
        .with_header(
            "link",
            r#"</v2/library/php/tags/list?last=8.2-fpm&n=2>; rel="next""#,
        ),
        Route::json(
            "/v2/library/php/tags/list?last=8.2-fpm&n=2",
            r#"{"name":"library/php","tags":["8.3-cli"]}"#,
        ),
    ])
    .await;

    let source = RegistryTagSource::new(registry_config(&base, true)).unwrap();
    let listing = source.list_tags().await.unwrap();

    assert_eq!(listing.name, "library/php");
    assert_eq!(listing.tags, vec!["8.2-apache", "8.2-fpm", "8.3-cli"]);

    let seen = seen.lock().unwrap().clone();
    assert_eq!(seen.len(), 3);
    assert_eq!(seen[0].1, None);
    assert_eq!(seen[1].1.as_deref(), Some("Bearer anon-token"));
    assert_eq!(seen[2].1.as_deref(), Some("Bearer anon-token"));
}

#[tokio::test]
async fn registry_link_cycle_stops_after_each_page_once() {
    let (base, seen) = serve(vec![
        Route::json(
            "/v2/library/php/tags/list",
            r#"{"name":"library/php","tags":["8.2-apache"]}"#,
        )
        .with_header("link", r#"</v2/library/php/tags/list?last=8.2-apache>; rel="next""#),
        Route::json(
            "/v2/library/php/tags/list?last=8.2-apache",
            r#"{"name":"library/php","tags":["8.2-fpm"]}"#,
        )
        .with_header("link", r#"</v2/library/php/tags/list>; rel="next""#),
    ])
    .await;

    let source = RegistryTagSource::new(registry_config(&base, false)).unwrap();
    let listing = source.list_tags().await.unwrap();

    assert_eq!(listing.tags, vec!["8.2-apache", "8.2-fpm"]);
    assert_eq!(seen.lock().unwrap().len(), 2);
}

#[tokio::test]
async fn registry_without_auth_lists_directly() {
    let (base, seen) = serve(vec![Route::json(
        "/v2/library/php/tags/list",
        r#"{"name":"library/php","tags":null}"#,
    )])
    .await;

    let source = RegistryTagSource::new(registry_config(&base, false)).unwrap();
    let listing = source.list_tags().await.unwrap();

    assert!(listing.tags.is_empty());
    assert_eq!(seen.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn registry_error_status_is_fatal() {
    let (base, _) = serve(Vec::new()).await;

    let source = RegistryTagSource::new(registry_config(&base, false)).unwrap();
    let err = source.list_tags().await.unwrap_err();

    match err {
        DockmatrixError::Registry(message) => assert!(message.contains("404")),
        other => panic!("expected registry error, got {other:?}"),
    }
}

#[tokio::test]
async fn node_index_is_fetched_and_decoded() {
    let (base, _) = serve(vec![Route::json(
        "/dist/index.json",
        r#"[{"version":"v20.11.0","lts":"Iron"},{"version":"v21.6.1","lts":false}]"#,
    )])
    .await;

    let client = NodeIndexClient::new(format!("{base}/dist/index.json")).unwrap();
    let releases = client.list_releases().await.unwrap();

    assert_eq!(releases.len(), 2);
    assert_eq!(releases[0].version, "v20.11.0");
    assert_eq!(releases[0].lts.channel(), Some("Iron"));
}

#[tokio::test]
async fn node_index_failure_maps_to_runtime_index_error() {
    let (base, _) = serve(Vec::new()).await;

    let client = NodeIndexClient::new(format!("{base}/dist/index.json")).unwrap();
    let err = client.list_releases().await.unwrap_err();

    assert!(matches!(err, DockmatrixError::RuntimeIndex(_)));
}
