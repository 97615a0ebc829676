//! Tower middleware that puts an [`AdmissionGate`] in front of HTTP traffic.
//!
//! The service is generic over request and response bodies; the only
//! requirement is that the response body can be built from the rejection
//! JSON (`ResBody: From<String>`), which holds for `axum::body::Body`,
//! `String`, and friends. Auth state and the peer address travel in request
//! extensions: upstream auth middleware inserts [`AuthContext`], and the
//! server glue inserts [`PeerAddr`] from the accepted socket.

use crate::gate::{AdmissionGate, Decision, Rejection};
use crate::key::AuthContext;
use http::header::{HeaderValue, CONTENT_TYPE, RETRY_AFTER};
use http::{Request, Response, StatusCode};
use pin_project::pin_project;
use std::future::Future;
use std::net::SocketAddr;
use std::pin::Pin;
use std::task::{Context, Poll};
use tower_layer::Layer;
use tower_service::Service;

/// Header consulted for the client address when the service sits behind a
/// proxy.
const FORWARDED_FOR: &str = "x-forwarded-for";

/// Transport peer address of a request, inserted into request extensions by
/// the server glue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PeerAddr(pub SocketAddr);

/// Layer applying an [`AdmissionGate`] in front of a service.
#[derive(Debug, Clone)]
pub struct AdmissionLayer {
    gate: AdmissionGate,
}

impl AdmissionLayer {
    /// Create an admission layer. Layered services share the gate's store.
    pub fn new(gate: AdmissionGate) -> Self {
        Self { gate }
    }
}

impl<S> Layer<S> for AdmissionLayer {
    type Service = AdmissionService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        AdmissionService { inner, gate: self.gate.clone() }
    }
}

/// Middleware service enforcing per-client admission.
///
/// Admitted requests pass through untouched; over-quota requests are
/// answered directly with 429 and never reach the inner service.
#[derive(Debug, Clone)]
pub struct AdmissionService<S> {
    inner: S,
    gate: AdmissionGate,
}

impl<S, ReqBody, ResBody> Service<Request<ReqBody>> for AdmissionService<S>
where
    S: Service<Request<ReqBody>, Response = Response<ResBody>>,
    ResBody: From<String>,
{
    type Response = Response<ResBody>;
    type Error = S::Error;
    type Future = ResponseFuture<S::Future, ResBody>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, req: Request<ReqBody>) -> Self::Future {
        let decision = self.gate.admit(&crate::gate::RequestContext {
            path: req.uri().path(),
            auth: req.extensions().get::<AuthContext>(),
            forwarded_for: req
                .headers()
                .get(FORWARDED_FOR)
                .and_then(|value| value.to_str().ok()),
            peer: req.extensions().get::<PeerAddr>().map(|peer| peer.0),
        });

        match decision {
            Decision::Proceed => ResponseFuture::Passthrough { future: self.inner.call(req) },
            Decision::Reject(rejection) => {
                ResponseFuture::Rejected { response: Some(rejection_response(&rejection)) }
            }
        }
    }
}

/// Build the 429 answer for a refused request.
fn rejection_response<B: From<String>>(rejection: &Rejection) -> Response<B> {
    let body = serde_json::to_string(&rejection.body())
        .unwrap_or_else(|_| r#"{"error":"Too Many Requests"}"#.to_string());

    let mut response = Response::new(B::from(body));
    *response.status_mut() = StatusCode::TOO_MANY_REQUESTS;
    response.headers_mut().insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    let retry_secs = rejection.retry_after().as_secs().max(1);
    if let Ok(value) = HeaderValue::from_str(&retry_secs.to_string()) {
        response.headers_mut().insert(RETRY_AFTER, value);
    }
    response
}

/// Response future for [`AdmissionService`]: either the inner service's
/// future or an already-built rejection. No boxing on either path.
#[pin_project(project = ResponseFutureProj)]
pub enum ResponseFuture<F, B> {
    /// Admitted; driving the wrapped service.
    Passthrough {
        #[pin]
        future: F,
    },
    /// Rejected; response ready to emit.
    Rejected { response: Option<Response<B>> },
}

impl<F, B, E> Future for ResponseFuture<F, B>
where
    F: Future<Output = Result<Response<B>, E>>,
{
    type Output = Result<Response<B>, E>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        match self.project() {
            ResponseFutureProj::Passthrough { future } => future.poll(cx),
            ResponseFutureProj::Rejected { response } => match response.take() {
                Some(response) => Poll::Ready(Ok(response)),
                // Contract violation (polled past completion); park forever
                // rather than panic on the request path.
                None => Poll::Pending,
            },
        }
    }
}
