use axum::{
    extract::Request,
    http::{HeaderName, HeaderValue},
    middleware::Next,
    response::Response,
};
use uuid::Uuid;

pub static X_REQUEST_ID: HeaderName = HeaderName::from_static("x-request-id");

/// Tags request and response with a fresh `x-request-id`, keeping one the
/// client already sent.
pub async fn request_id(mut req: Request, next: Next) -> Response {
    let rid = req
        .headers()
        .get(&X_REQUEST_ID)
        .cloned()
        .or_else(|| HeaderValue::from_str(&Uuid::new_v4().to_string()).ok());

    if let Some(rid) = &rid {
        req.headers_mut().insert(X_REQUEST_ID.clone(), rid.clone());
    }
    let mut res = next.run(req).await;
    if let Some(rid) = rid {
        res.headers_mut().insert(X_REQUEST_ID.clone(), rid);
    }
    res
}
