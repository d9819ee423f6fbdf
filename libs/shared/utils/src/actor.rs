use axum::{body::Body, http::Request, middleware::Next, response::Response};

/// Identity attached to writes. The authentication layer in front of this
/// service resolves the credential; the core only sees the opaque id.
#[derive(Debug, Clone, Default)]
pub struct Actor {
    pub id: Option<String>,
}

/// Reads the actor id from `X-Actor-Id`, or failing that from the bearer
/// token an upstream auth proxy passes through unchanged. Requests without
/// either proceed as anonymous; authentication is not enforced here.
pub async fn actor_middleware(mut request: Request<Body>, next: Next) -> Response {
    let id = request
        .headers()
        .get("X-Actor-Id")
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
        .or_else(|| {
            request
                .headers()
                .get("Authorization")
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.strip_prefix("Bearer "))
                .map(str::to_string)
        })
        .filter(|v| !v.is_empty());

    request.extensions_mut().insert(Actor { id });

    next.run(request).await
}
