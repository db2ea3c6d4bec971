//! The two request handlers of the message board.

use crate::model::Message;
use crate::router::{AppState, Request, Response};
use crate::template::{TemplateValue, render_template};
use serde_json::json;
use std::collections::HashMap;

/// `GET /` — render every stored message, newest first.
pub async fn index(_request: Request, state: AppState) -> Response {
    let messages = match Message::all_desc(&state.db).await {
        Ok(rows) => rows,
        Err(e) => {
            log::error!("Listing query failed: {}", e);
            return Response::server_error();
        }
    };

    let has_messages = !messages.is_empty();
    let items = messages
        .into_iter()
        .map(|m| {
            let mut fields = HashMap::new();
            fields.insert("id".to_string(), TemplateValue::Number(m.id as f64));
            fields.insert("message".to_string(), TemplateValue::String(m.message));
            TemplateValue::Object(fields)
        })
        .collect();

    let mut context = HashMap::new();
    context.insert(
        "has_messages".to_string(),
        TemplateValue::Bool(has_messages),
    );
    context.insert("messages".to_string(), TemplateValue::List(items));
    render_template(&state.settings.template.dir, "index.html", &context)
}

/// `POST /submit` — store the `new_message` form field.
///
/// The field must be non-empty after trimming; the stored text is the raw
/// submission, untrimmed, and the JSON echo returns it verbatim.
pub async fn submit(request: Request, state: AppState) -> Response {
    match request.form.get("new_message") {
        Some(text) if !text.trim().is_empty() => {
            if let Err(e) = Message::insert(&state.db, text).await {
                log::error!("Insert failed: {}", e);
                return Response::server_error();
            }
            Response::json(json!({ "message": text }), 200, HashMap::new())
        }
        _ => Response::json(
            json!({ "error": "Message cannot be empty" }),
            400,
            HashMap::new(),
        ),
    }
}
