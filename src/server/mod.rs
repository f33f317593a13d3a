use axum::{
    routing::get,
    Router,
};
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use crate::coordinator::CacheCoordinator;

pub mod routes;

pub const API_PREFIX: &str = "/api/v1/";

/// Server state
pub struct AppState {
    pub coordinator: CacheCoordinator,
}

pub fn router(coordinator: CacheCoordinator) -> Router {
    let state = Arc::new(AppState { coordinator });

    Router::new()
        .route("/", get(routes::echo))
        .route(API_PREFIX, get(routes::echo))
        .route(&format!("{}barcode/{{barcode}}", API_PREFIX), get(routes::get_barcode))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Bind on all IPv4 addresses. Port 0 picks any free port.
pub async fn bind(port: u16) -> anyhow::Result<TcpListener> {
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = TcpListener::bind(addr).await?;
    Ok(listener)
}

/// Serve until `shutdown` resolves, then drain in-flight requests.
pub async fn start_server(
    listener: TcpListener,
    coordinator: CacheCoordinator,
    shutdown: impl Future<Output = ()> + Send + 'static,
) -> anyhow::Result<()> {
    let addr = listener.local_addr()?;
    tracing::info!("Starting server on {}", addr);

    let app = router(coordinator);
    axum::serve(listener, app.into_make_service_with_connect_info::<SocketAddr>())
        .with_graceful_shutdown(shutdown)
        .await?;

    tracing::info!("API server stopped");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{to_bytes, Body};
    use axum::extract::connect_info::MockConnectInfo;
    use axum::http::{Request, StatusCode};
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tower::ServiceExt;

    use crate::source::DataSource;
    use crate::storage::sqlite::{IN_MEMORY, SqliteBackend};
    use crate::Record;

    async fn app_with(records: &[Record]) -> Router {
        let mut local = SqliteBackend::new();
        local.initialize(IN_MEMORY).await.unwrap();
        for record in records {
            local.store(record).await.unwrap();
        }
        let coordinator = CacheCoordinator::new(Some(Arc::new(local)), None);
        router(coordinator).layer(MockConnectInfo(SocketAddr::from(([127, 0, 0, 1], 4000))))
    }

    async fn send_get(app: Router, uri: &str) -> (StatusCode, Vec<u8>) {
        let response = app
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, body.to_vec())
    }

    #[tokio::test]
    async fn test_barcode_found() {
        let app = app_with(&[Record::new("666", "ISBN1", "Author1", "Title1")]).await;

        let (status, body) = send_get(app, "/api/v1/barcode/666").await;
        assert_eq!(status, StatusCode::OK);

        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"barcode": "666", "isbn": "ISBN1", "author": "Author1", "title": "Title1"})
        );
    }

    #[tokio::test]
    async fn test_barcode_not_found() {
        let app = app_with(&[]).await;

        let (status, body) = send_get(app, "/api/v1/barcode/777").await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert!(json["error"].as_str().unwrap().contains("777"));
    }

    #[tokio::test]
    async fn test_echo() {
        let (status, body) = send_get(app_with(&[]).await, "/api/v1/").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(String::from_utf8(body).unwrap(), "Echo: (/api/v1/) -> (127.0.0.1:4000)\n");

        let (status, _) = send_get(app_with(&[]).await, "/").await;
        assert_eq!(status, StatusCode::OK);
    }

    #[tokio::test]
    async fn test_serves_over_tcp_until_shutdown() {
        let listener = bind(0).await.unwrap();
        let port = listener.local_addr().unwrap().port();
        let (tx, rx) = tokio::sync::oneshot::channel::<()>();

        let server = tokio::spawn(start_server(listener, CacheCoordinator::default(), async move {
            let _ = rx.await;
        }));

        let mut stream = tokio::net::TcpStream::connect(("127.0.0.1", port)).await.unwrap();
        stream
            .write_all(b"GET /api/v1/barcode/1 HTTP/1.1\r\nHost: localhost\r\nConnection: close\r\n\r\n")
            .await
            .unwrap();
        let mut response = String::new();
        stream.read_to_string(&mut response).await.unwrap();
        assert!(response.starts_with("HTTP/1.1 404"));

        tx.send(()).unwrap();
        server.await.unwrap().unwrap();
    }
}
