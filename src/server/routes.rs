use axum::{
    extract::{ConnectInfo, Path, State},
    http::{StatusCode, Uri},
    Json,
};
use serde::Serialize;
use std::net::SocketAddr;
use std::sync::Arc;
use crate::server::AppState;
use crate::Record;

#[derive(Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

/// Echo the request path and peer address
pub async fn echo(uri: Uri, ConnectInfo(addr): ConnectInfo<SocketAddr>) -> String {
    let txt = format!("Echo: ({}) -> ({})", uri.path(), addr);
    tracing::info!("{}", txt);
    txt + "\n"
}

/// Return the cached (or freshly fetched) record for a barcode
pub async fn get_barcode(
    State(state): State<Arc<AppState>>,
    Path(barcode): Path<String>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
) -> Result<Json<Record>, (StatusCode, Json<ErrorResponse>)> {
    tracing::info!(%barcode, peer = %addr, "incoming barcode lookup");

    match state.coordinator.lookup(&barcode).await {
        Some(record) => {
            tracing::info!("Result: {}", record);
            Ok(Json(record))
        }
        None => Err((
            StatusCode::NOT_FOUND,
            Json(ErrorResponse { error: format!("No record found for barcode {}", barcode) }),
        )),
    }
}
