use crate::db::Db;
/// Pinboard router module
///
/// This module provides the core routing and HTTP infrastructure for the
/// message board. It allows for:
///
/// - Method- and path-based routing of HTTP endpoints, with `:param` segments
/// - Global and route-specific middleware (pre and post)
/// - Form-urlencoded body decoding for POST endpoints
///
/// The server loop uses a classic TcpListener and manual HTTP parsing for
/// fine-grained control; one connection carries one request.
use crate::settings::Settings;
use serde::Serialize;
use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Instant;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

const MAX_HEADER_BYTES: usize = 8 * 1024;

#[derive(Clone)]
pub struct AppState {
    pub db: Arc<Db>,
    pub settings: Settings,
}

/// HTTP methods the router dispatches on.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
}

impl Method {
    pub fn parse(raw: &str) -> Option<Method> {
        match raw {
            "GET" => Some(Method::Get),
            "POST" => Some(Method::Post),
            _ => None,
        }
    }
}

/// Represents the outcome of an HTTP handler.
/// Supports HTML, JSON, and custom status/headers.
pub struct Response {
    pub status_code: u16,
    pub body: String,
    pub headers: HashMap<String, String>,
}

impl Response {
    /// Construct a new HTTP 200 response with HTML/text body.
    pub fn ok(body: impl Into<String>) -> Self {
        Response {
            status_code: 200,
            body: body.into(),
            headers: HashMap::new(),
        }
    }

    /// Construct a new HTTP 404 "not found" response.
    pub fn not_found() -> Self {
        Response {
            status_code: 404,
            body: "404 Not Found".to_string(),
            headers: HashMap::new(),
        }
    }

    /// Construct a new HTTP 405 response, for a known path with the wrong method.
    pub fn method_not_allowed() -> Self {
        Response {
            status_code: 405,
            body: "405 Method Not Allowed".to_string(),
            headers: HashMap::new(),
        }
    }

    /// Construct a new HTTP 500 response for unhandled server failures.
    pub fn server_error() -> Self {
        Response {
            status_code: 500,
            body: "500 Internal Server Error".to_string(),
            headers: HashMap::new(),
        }
    }

    /// Construct a new HTTP JSON response.
    /// Accepts any serde-serializable payload, status, and custom headers.
    pub fn json<T: Serialize>(
        data: T,
        status_code: u16,
        mut headers: HashMap<String, String>,
    ) -> Self {
        headers.insert(
            "Content-Type".to_string(),
            "application/json; charset=utf-8".to_string(),
        );
        match serde_json::to_string(&data) {
            Ok(body) => Response {
                status_code,
                body,
                headers,
            },
            Err(_) => Response {
                status_code: 500,
                body: "{\"error\": \"Serialization failed\"}".to_string(),
                headers,
            },
        }
    }
}

/// Holds metadata about the current HTTP request and its extracted path
/// parameters. Middleware and handlers can modify/read this context.
pub struct RequestContext {
    pub method: Method,
    pub path: String,
    pub params: HashMap<String, String>,
    pub start_time: Option<Instant>,
}

/// The request data a handler receives: matched path parameters plus the
/// decoded form fields for POST bodies.
pub struct Request {
    pub method: Method,
    pub path: String,
    pub params: HashMap<String, String>,
    pub form: HashMap<String, String>,
}

/// Type alias for async handler functions for HTTP routes.
pub type Handler = Arc<
    dyn Fn(Request, AppState) -> Pin<Box<dyn Future<Output = Response> + Send>> + Send + Sync,
>;

/// Type alias for synchronous, pre-processing middleware executed before the handler.
/// If a middleware returns Some(Response), request handling stops and this response is sent.
pub type Middleware = Arc<dyn Fn(&mut RequestContext) -> Option<Response> + Send + Sync>;

/// Type alias for post-processing middleware executed after the handler.
/// Post-middleware can inspect/modify the response before it is sent.
pub type PostMiddleware = Arc<dyn Fn(&RequestContext, Response) -> Response + Send + Sync>;

/// Represents a registered HTTP route and its associated handler + middleware.
#[derive(Clone)]
pub struct Route {
    pub method: Method,
    pub path_pattern: String,
    pub handler: Handler,
    pub middlewares: Vec<Middleware>,
}

/// The main application router.
/// Manages all HTTP routes and global middleware.
#[derive(Clone)]
pub struct Router {
    pub routes: Vec<Route>,
    pub middlewares: Vec<Middleware>,
    pub post_middlewares: Vec<PostMiddleware>,
    pub app_state: Option<AppState>,
}

/// Serializes and sends an HTTP Response over a raw TCP socket connection.
async fn send_response(mut socket: TcpStream, response: Response) {
    let mut headers = String::new();
    for (key, value) in response.headers {
        headers.push_str(&format!("{}: {}\r\n", key, value));
    }

    let response_text = format!(
        "HTTP/1.1 {} {}\r\nContent-Length: {}\r\n{}\
\r\n{}",
        response.status_code,
        status_text(response.status_code),
        response.body.len(),
        headers,
        response.body
    );

    let _ = socket.write_all(response_text.as_bytes()).await;
}

/// Maps status codes to HTTP status text for responses.
pub fn status_text(code: u16) -> &'static str {
    match code {
        200 => "OK",
        400 => "Bad Request",
        404 => "Not Found",
        405 => "Method Not Allowed",
        500 => "Internal Server Error",
        _ => "Unknown",
    }
}

/// A raw HTTP request read off the wire, before routing.
struct RawRequest {
    method: String,
    path: String,
    body: Vec<u8>,
}

/// Reads one HTTP request from the socket: request line, headers, then as
/// many body bytes as Content-Length announces. Returns None on a malformed
/// or truncated request.
async fn read_request(socket: &mut TcpStream) -> Option<RawRequest> {
    let mut buffer = Vec::with_capacity(1024);
    let mut chunk = [0u8; 1024];

    let header_end = loop {
        if let Some(pos) = buffer.windows(4).position(|w| w == b"\r\n\r\n") {
            break pos;
        }
        if buffer.len() > MAX_HEADER_BYTES {
            return None;
        }
        let n = socket.read(&mut chunk).await.ok()?;
        if n == 0 {
            return None;
        }
        buffer.extend_from_slice(&chunk[..n]);
    };

    let head = String::from_utf8_lossy(&buffer[..header_end]).to_string();
    let mut lines = head.lines();
    let first_line = lines.next()?;
    let mut parts = first_line.split_whitespace();
    let method = parts.next()?.to_string();
    let path = parts.next()?.to_string();

    let mut content_length = 0;
    for line in lines {
        if let Some((name, value)) = line.split_once(':') {
            if name.trim().eq_ignore_ascii_case("content-length") {
                content_length = value.trim().parse().ok()?;
            }
        }
    }

    let mut body = buffer[header_end + 4..].to_vec();
    while body.len() < content_length {
        let n = socket.read(&mut chunk).await.ok()?;
        if n == 0 {
            break;
        }
        body.extend_from_slice(&chunk[..n]);
    }
    body.truncate(content_length);

    Some(RawRequest { method, path, body })
}

/// Decodes an `application/x-www-form-urlencoded` body into a field map.
pub fn parse_form(body: &[u8]) -> HashMap<String, String> {
    url::form_urlencoded::parse(body).into_owned().collect()
}

async fn handle_connection(
    mut socket: TcpStream,
    routes: Vec<Route>,
    middlewares: Vec<Middleware>,
    post_middlewares: Vec<PostMiddleware>,
    state: AppState,
) {
    let Some(raw) = read_request(&mut socket).await else {
        return;
    };

    // Query strings are not routed on.
    let real_path = raw.path.split('?').next().unwrap_or("/");

    let Some(method) = Method::parse(&raw.method) else {
        // Unrecognized method: 405 only if the path itself is known.
        let response = if routes
            .iter()
            .any(|route| match_path(&route.path_pattern, real_path).is_some())
        {
            Response::method_not_allowed()
        } else {
            Response::not_found()
        };
        send_response(socket, response).await;
        return;
    };
    let mut ctx = RequestContext {
        method,
        path: real_path.to_string(),
        params: HashMap::new(),
        start_time: None,
    };

    for middleware in &middlewares {
        if let Some(response) = (middleware)(&mut ctx) {
            send_response(socket, response).await;
            return;
        }
    }

    let mut response = None;
    let mut path_matched = false;

    for route in &routes {
        if let Some(params) = match_path(&route.path_pattern, &ctx.path) {
            path_matched = true;
            if route.method != method {
                continue;
            }
            ctx.params = params;

            for middleware in &route.middlewares {
                if let Some(response) = (middleware)(&mut ctx) {
                    send_response(socket, response).await;
                    return;
                }
            }

            let request = Request {
                method,
                path: ctx.path.clone(),
                params: ctx.params.clone(),
                form: parse_form(&raw.body),
            };
            response = Some((route.handler)(request, state.clone()).await);
            break;
        }
    }

    let mut response = response.unwrap_or_else(|| {
        if path_matched {
            Response::method_not_allowed()
        } else {
            Response::not_found()
        }
    });

    for post_middleware in &post_middlewares {
        response = (post_middleware)(&ctx, response);
    }

    send_response(socket, response).await;
}

impl Router {
    /// Create a new, empty application router.
    pub fn new() -> Self {
        Router {
            routes: Vec::new(),
            middlewares: Vec::new(),
            post_middlewares: Vec::new(),
            app_state: None,
        }
    }

    /// Register an HTTP route with method, path pattern, handler, and any
    /// route-specific middleware.
    pub fn add_route(
        &mut self,
        method: Method,
        path_pattern: &str,
        handler: Handler,
        middlewares: Vec<Middleware>,
    ) {
        self.routes.push(Route {
            method,
            path_pattern: path_pattern.to_string(),
            handler,
            middlewares,
        });
    }

    /// Add a global pre-middleware to be run before all HTTP handlers.
    pub fn add_middleware(&mut self, middleware: Middleware) {
        self.middlewares.push(middleware);
    }

    /// Add a post-middleware to be run after each HTTP handler.
    pub fn add_post_middleware(&mut self, middleware: PostMiddleware) {
        self.post_middlewares.push(middleware);
    }

    pub fn set_app_state(&mut self, state: AppState) {
        self.app_state = Some(state);
    }

    /// Bind the configured address and serve requests until the process exits.
    ///
    /// This is the typical entry point for production use.
    pub async fn run(
        &mut self,
        settings: Settings,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        let addr = format!("{}:{}", settings.host, settings.port);
        let listener = TcpListener::bind(&addr).await?;
        println!("HTTP Server running on http://{}", addr);
        self.serve(listener).await
    }

    /// Serve requests from an already-bound listener. Split out from
    /// [`run`](Self::run) so tests can bind an ephemeral port themselves.
    pub async fn serve(
        &self,
        listener: TcpListener,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        loop {
            let (socket, _) = listener.accept().await?;
            let routes = self.routes.clone();
            let middlewares = self.middlewares.clone();
            let post_middlewares = self.post_middlewares.clone();
            let state = self
                .app_state
                .clone()
                .ok_or("App state not set in Router")?;
            tokio::spawn(handle_connection(
                socket,
                routes,
                middlewares,
                post_middlewares,
                state,
            ));
        }
    }
}

#[macro_export]
macro_rules! route {
    ($router:expr, $( $method:ident $path:expr => { $handler:expr $(, $middleware:expr )* } ),* $(,)?) => {
        $(
            $router.add_route(
                $crate::router::Method::$method,
                $path,
                std::sync::Arc::new(move |request, state| Box::pin($handler(request, state))),
                vec![$($middleware),*]
            );
        )*
    };
}

/// Matches a path pattern (e.g. `/foo/:id`) against a real path,
/// extracting parameters into a HashMap if matched, or None if not.
pub fn match_path(pattern: &str, path: &str) -> Option<HashMap<String, String>> {
    let pattern_parts: Vec<&str> = pattern.trim_matches('/').split('/').collect();
    let path_parts: Vec<&str> = path.trim_matches('/').split('/').collect();

    if pattern_parts.len() != path_parts.len() {
        return None;
    }

    let mut params = HashMap::new();

    for (p, a) in pattern_parts.iter().zip(path_parts.iter()) {
        if p.starts_with(':') {
            params.insert(p[1..].to_string(), a.to_string());
        } else if p != a {
            return None;
        }
    }

    Some(params)
}
