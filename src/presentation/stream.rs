// Newline-delimited JSON streaming of panel snapshots
use crate::domain::panel::StationSnapshot;
use axum::body::Body;
use axum::http::{header, Response, StatusCode};
use axum::response::IntoResponse;
use bytes::{BufMut, Bytes, BytesMut};
use futures::StreamExt;
use tokio::sync::watch;

/// Stream every snapshot change to the panel renderer, one JSON object per
/// line. The current snapshot is emitted immediately on subscribe; the
/// stream ends when the service shuts down.
pub fn snapshot_stream(mut rx: watch::Receiver<StationSnapshot>) -> impl IntoResponse {
    let snapshots = async_stream::stream! {
        loop {
            let snapshot = rx.borrow_and_update().clone();
            yield snapshot;
            if rx.changed().await.is_err() {
                break;
            }
        }
    };

    let body = Body::from_stream(snapshots.map(|snapshot| serialize_line(&snapshot)));

    let response = Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, "application/x-ndjson")
        .header(header::TRANSFER_ENCODING, "chunked")
        .body(body);

    match response {
        Ok(response) => response,
        Err(_) => StatusCode::INTERNAL_SERVER_ERROR.into_response(),
    }
}

fn serialize_line(snapshot: &StationSnapshot) -> Result<Bytes, std::io::Error> {
    let payload = serde_json::to_vec(snapshot).map_err(std::io::Error::other)?;

    let mut line = BytesMut::with_capacity(payload.len() + 1);
    line.put_slice(&payload);
    line.put_u8(b'\n');
    Ok(line.freeze())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_serialized_snapshot_is_one_line() {
        let line = serialize_line(&StationSnapshot::default()).unwrap();
        assert_eq!(line.last(), Some(&b'\n'));
        assert_eq!(line.iter().filter(|b| **b == b'\n').count(), 1);
        let parsed: serde_json::Value =
            serde_json::from_slice(&line[..line.len() - 1]).unwrap();
        assert_eq!(parsed["amplifier"]["input_a"]["status"], "unlinked");
    }
}
