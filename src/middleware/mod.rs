use actix_web::{
    body::EitherBody,
    dev::{self, forward_ready, Service, ServiceRequest, ServiceResponse, Transform},
    http::{header, Method},
    middleware::ErrorHandlerResponse,
    web, Error, FromRequest, HttpRequest, HttpResponse, ResponseError,
};
use futures_util::future::{ok, LocalBoxFuture, Ready};
use std::future::{ready, Ready as StdReady};
use std::rc::Rc;

use crate::error::{ApiError, INTERNAL_ERROR_MESSAGE};
use crate::helper::auth_helpers::AdminClaims;
use crate::models::ApiResponse;
use crate::AppContext;

pub mod rate_limiter;

use rate_limiter::RateDecision;

pub const MISSING_TOKEN_MESSAGE: &str = "Access denied. No token provided.";

fn app_context(req: &HttpRequest) -> Result<&web::Data<AppContext>, ApiError> {
    req.app_data::<web::Data<AppContext>>().ok_or_else(|| {
        ApiError::Internal("AppContext is not registered on the application.".to_string())
    })
}

// --- Admin authentication ---

/// An admin whose bearer token checked out. Taking this as a handler
/// argument rejects the request with 401 before the handler runs.
#[derive(Debug, Clone)]
pub struct AuthenticatedAdmin(pub AdminClaims);

fn bearer_token(req: &HttpRequest) -> Option<&str> {
    req.headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty())
}

impl FromRequest for AuthenticatedAdmin {
    type Error = ApiError;
    type Future = StdReady<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut dev::Payload) -> Self::Future {
        let result = app_context(req).and_then(|ctx| {
            let token = bearer_token(req)
                .ok_or_else(|| ApiError::Unauthorized(MISSING_TOKEN_MESSAGE.to_string()))?;
            ctx.tokens.verify(token).map(AuthenticatedAdmin)
        });
        ready(result)
    }
}

// --- Client address ---

/// Resolves the client address used as the rate-limit key. The first
/// `X-Forwarded-For` entry is only trusted when the server is configured to
/// sit behind a proxy.
pub fn client_ip(req: &HttpRequest, trust_proxy_headers: bool) -> String {
    let forwarded = trust_proxy_headers
        .then(|| {
            req.headers()
                .get("X-Forwarded-For")
                .and_then(|v| v.to_str().ok())
                .and_then(|s| s.split(',').next())
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
        })
        .flatten();

    forwarded
        .or_else(|| req.peer_addr().map(|addr| addr.ip().to_string()))
        .unwrap_or_else(|| {
            log::warn!("Could not determine peer IP address for request to {}", req.path());
            "unknown".to_string()
        })
}

// --- Submission rate limiting ---

/// Limits `POST` requests on the wrapped resource with the context's
/// submission limiter. Other methods pass straight through. Runs before body
/// validation, so rejected-but-admitted submissions still use up a slot.
pub struct SubmissionRateLimit;

impl<S, B> Transform<S, ServiceRequest> for SubmissionRateLimit
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type InitError = ();
    type Transform = SubmissionRateLimitMiddleware<S>;
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ok(SubmissionRateLimitMiddleware { service: Rc::new(service) })
    }
}

pub struct SubmissionRateLimitMiddleware<S> {
    service: Rc<S>,
}

impl<S, B> Service<ServiceRequest> for SubmissionRateLimitMiddleware<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let service = Rc::clone(&self.service);

        if req.method() != Method::POST {
            return Box::pin(async move { Ok(service.call(req).await?.map_into_left_body()) });
        }

        let decision = req.app_data::<web::Data<AppContext>>().map(|ctx| {
            let ip = client_ip(req.request(), ctx.trust_proxy_headers);
            (ip.clone(), ctx.submission_limiter.check(&ip), ctx.submission_limiter.max_attempts())
        });

        Box::pin(async move {
            match decision {
                Some((ip, RateDecision::Limited { retry_after }, limit)) => {
                    log::warn!("Rate limit hit for feedback submission from {}", ip);
                    // Round up so clients never retry a moment too early.
                    let retry_after_secs = retry_after.as_secs() + u64::from(retry_after.subsec_nanos() > 0);
                    let mut response = ApiError::RateLimited { retry_after_secs }.error_response();
                    response.headers_mut().insert(
                        header::HeaderName::from_static("ratelimit-limit"),
                        header::HeaderValue::from(limit),
                    );
                    response.headers_mut().insert(
                        header::HeaderName::from_static("ratelimit-remaining"),
                        header::HeaderValue::from(0_usize),
                    );
                    let (http_req, _payload) = req.into_parts();
                    Ok(ServiceResponse::new(http_req, response).map_into_right_body())
                }
                Some((_, RateDecision::Allowed { remaining }, limit)) => {
                    let mut res = service.call(req).await?;
                    res.headers_mut().insert(
                        header::HeaderName::from_static("ratelimit-limit"),
                        header::HeaderValue::from(limit),
                    );
                    res.headers_mut().insert(
                        header::HeaderName::from_static("ratelimit-remaining"),
                        header::HeaderValue::from(remaining),
                    );
                    Ok(res.map_into_left_body())
                }
                None => {
                    log::error!("AppContext is not registered; submission limiter skipped.");
                    Ok(service.call(req).await?.map_into_left_body())
                }
            }
        })
    }
}

// --- Internal error detail ---

/// `ErrorHandlers` hook for 500 responses. In development the error text is
/// added to the body as `error`; otherwise the response is left untouched.
pub fn add_internal_error_detail<B>(res: ServiceResponse<B>) -> actix_web::Result<ErrorHandlerResponse<B>> {
    let expose = res
        .request()
        .app_data::<web::Data<AppContext>>()
        .map_or(false, |ctx| ctx.expose_error_details);

    let detail = if expose { res.response().error().map(|e| e.to_string()) } else { None };
    let Some(detail) = detail else {
        return Ok(ErrorHandlerResponse::Response(res.map_into_left_body()));
    };

    let (req, _) = res.into_parts();
    let body = ApiResponse::<()> {
        success: false,
        message: Some(INTERNAL_ERROR_MESSAGE.to_string()),
        data: None,
        error: Some(detail),
    };
    let response = HttpResponse::InternalServerError().json(body);
    Ok(ErrorHandlerResponse::Response(ServiceResponse::new(req, response).map_into_right_body()))
}
