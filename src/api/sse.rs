// =============================================================================
// Server-sent progress streaming for screening jobs (§4.6, §6)
// =============================================================================
//
// Grounded on scheduler-service/sse_stream.py and the teacher's axum router
// conventions. `Content-Type: text/event-stream` is set by axum's `Sse`
// response; `Cache-Control`, `Connection`, and the `X-Accel-Buffering`
// anti-proxy-buffering header are appended on top so no intermediary
// coalesces or buffers individual events. A 15-second heartbeat comment
// keeps the connection alive when a job is quiet between stages.
// =============================================================================

use std::convert::Infallible;
use std::sync::Arc;
use std::time::Duration;

use axum::extract::{Path, State};
use axum::http::{HeaderValue, header};
use axum::response::sse::{Event, Sse};
use axum::response::IntoResponse;
use tokio::sync::broadcast::error::RecvError;

use crate::app_state::AppState;
use crate::jobs::JobManager;

const HEARTBEAT_INTERVAL: Duration = Duration::from_secs(15);

pub async fn stream_job_progress(State(state): State<Arc<AppState>>, Path(job_id): Path<String>) -> impl IntoResponse {
    if !JobManager::is_recognized_job_id(&job_id) {
        return with_sse_headers(Sse::new(async_stream::stream! {
            yield Ok::<_, Infallible>(error_event("unrecognized job_id format"));
        }).into_response());
    }

    let job_manager = state.job_manager.clone();
    let jid = job_id.clone();

    let stream = async_stream::stream! {
        match job_manager.get(&jid).await {
            Ok(None) => {
                yield Ok::<_, Infallible>(error_event("unknown job_id"));
                return;
            }
            Ok(Some(job)) if job.status.is_terminal() => {
                let payload = job.progress_snapshot.as_ref().map(|s| serde_json::to_string(s).unwrap_or_default()).unwrap_or_else(|| "{}".to_string());
                yield Ok(Event::default().event("complete").data(payload));
                return;
            }
            Err(e) => {
                yield Ok(error_event(&format!("lookup failed: {e}")));
                return;
            }
            _ => {}
        }

        let mut rx = job_manager.subscribe(&jid);
        let mut heartbeat = tokio::time::interval(HEARTBEAT_INTERVAL);

        loop {
            tokio::select! {
                _ = heartbeat.tick() => {
                    yield Ok(Event::default().comment("ping"));
                }
                recv = rx.recv() => {
                    match recv {
                        Ok(event) => {
                            let terminal = event.status.is_terminal();
                            let kind = if terminal { "complete" } else { "progress" };
                            let data = serde_json::to_string(&event).unwrap_or_default();
                            yield Ok(Event::default().event(kind).data(data));
                            if terminal {
                                break;
                            }
                        }
                        Err(RecvError::Lagged(_)) => continue,
                        Err(RecvError::Closed) => {
                            yield Ok(error_event("progress channel closed"));
                            break;
                        }
                    }
                }
            }
        }

        job_manager.unsubscribe_if_idle(&jid);
    };

    with_sse_headers(Sse::new(stream).into_response())
}

fn error_event(message: &str) -> Event {
    Event::default().event("error").data(serde_json::json!({ "error": message }).to_string())
}

fn with_sse_headers(mut response: axum::response::Response) -> axum::response::Response {
    let headers = response.headers_mut();
    headers.insert(header::CACHE_CONTROL, HeaderValue::from_static("no-cache"));
    headers.insert(header::CONNECTION, HeaderValue::from_static("keep-alive"));
    headers.insert("X-Accel-Buffering", HeaderValue::from_static("no"));
    response
}
