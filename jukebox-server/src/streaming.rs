use axum::{
    body::Body,
    extract::{Path, State},
    http::{header, HeaderMap, StatusCode},
    response::Response,
    routing::get,
};
use jukebox_library::{BlobStore, StorageError};
use tokio_util::io::ReaderStream;

use crate::{
    context::ServerContext,
    errors::{ServerError, ServerResult},
    Router,
};

const AUDIO_CONTENT_TYPE: &str = "audio/mpeg";

/// An inclusive byte range within a blob of a known total size
#[derive(Debug, PartialEq, Eq)]
struct ByteRange {
    start: u64,
    end: u64,
}

impl ByteRange {
    fn length(&self) -> u64 {
        self.end - self.start + 1
    }
}

/// Parses a single-range `bytes=start-end` header against the blob's total
/// size. The end is optional and defaults to the last byte, and is clamped
/// to it. Returns None for anything unparsable, for multi-range requests,
/// and for a start at or past end-of-file.
fn parse_range(header: &str, total: u64) -> Option<ByteRange> {
    let rest = header.strip_prefix("bytes=")?;
    let (start, end) = rest.split_once('-')?;

    let start: u64 = start.trim().parse().ok()?;

    let end: u64 = match end.trim() {
        "" => total.checked_sub(1)?,
        value => value.parse().ok()?,
    };

    let end = end.min(total.checked_sub(1)?);

    if start > end {
        return None;
    }

    Some(ByteRange { start, end })
}

/// Serves an audio blob, honoring byte-range requests so clients can seek
/// without re-downloading from the start
async fn play(
    State(context): State<ServerContext>,
    Path(filename): Path<String>,
    headers: HeaderMap,
) -> ServerResult<Response> {
    let storage = &context.library.storage;

    let total = storage.size(&filename).await.map_err(|e| match e {
        StorageError::NotFound(_) | StorageError::InvalidName(_) => ServerError::NotFound {
            resource: "blob",
            identifier: "filename",
        },
        e => e.into(),
    })?;

    let range = headers
        .get(header::RANGE)
        .and_then(|value| value.to_str().ok());

    let response = match range {
        Some(raw) => {
            let range = parse_range(raw, total).ok_or(ServerError::RangeNotSatisfiable)?;

            let reader = storage
                .read(&filename, Some((range.start, range.end)))
                .await?;

            Response::builder()
                .status(StatusCode::PARTIAL_CONTENT)
                .header(header::CONTENT_TYPE, AUDIO_CONTENT_TYPE)
                .header(
                    header::CONTENT_RANGE,
                    format!("bytes {}-{}/{}", range.start, range.end, total),
                )
                .header(header::CONTENT_LENGTH, range.length())
                .header(header::ACCEPT_RANGES, "bytes")
                .body(Body::from_stream(ReaderStream::new(reader)))
        }
        None => {
            let reader = storage.read(&filename, None).await?;

            Response::builder()
                .status(StatusCode::OK)
                .header(header::CONTENT_TYPE, AUDIO_CONTENT_TYPE)
                .header(header::CONTENT_LENGTH, total)
                .header(header::ACCEPT_RANGES, "bytes")
                .body(Body::from_stream(ReaderStream::new(reader)))
        }
    };

    response.map_err(|e| ServerError::Unknown(e.to_string()))
}

pub fn router() -> Router {
    Router::new().route("/play/:filename", get(play))
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn explicit_range_is_inclusive() {
        let range = parse_range("bytes=0-99", 1000).unwrap();

        assert_eq!(range, ByteRange { start: 0, end: 99 });
        assert_eq!(range.length(), 100);
    }

    #[test]
    fn omitted_end_defaults_to_the_last_byte() {
        let range = parse_range("bytes=500-", 1000).unwrap();

        assert_eq!(range, ByteRange { start: 500, end: 999 });
        assert_eq!(range.length(), 500);
    }

    #[test]
    fn end_is_clamped_to_the_blob_size() {
        let range = parse_range("bytes=900-5000", 1000).unwrap();

        assert_eq!(range, ByteRange { start: 900, end: 999 });
    }

    #[test]
    fn start_past_end_of_file_is_unsatisfiable() {
        assert_eq!(parse_range("bytes=1000-", 1000), None);
        assert_eq!(parse_range("bytes=2000-2100", 1000), None);
    }

    #[test]
    fn garbage_is_unsatisfiable() {
        assert_eq!(parse_range("bytes=", 1000), None);
        assert_eq!(parse_range("bytes=-", 1000), None);
        assert_eq!(parse_range("bytes=abc-", 1000), None);
        assert_eq!(parse_range("items=0-99", 1000), None);
        assert_eq!(parse_range("bytes=0-99,200-299", 1000), None);
    }

    #[test]
    fn empty_blobs_have_no_satisfiable_range() {
        assert_eq!(parse_range("bytes=0-", 0), None);
    }

    #[test]
    fn whole_blob_as_a_range() {
        let range = parse_range("bytes=0-999", 1000).unwrap();

        assert_eq!(range.length(), 1000);
    }
}
