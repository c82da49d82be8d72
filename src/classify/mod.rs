//! Error Classification
//!
//! Turns a completed HTTP exchange into zero or more error messages. Handlers
//! run newest first; the generic status handler registered at construction
//! always runs last.

mod handlers;

pub use handlers::*;

use serde_json::Value;
use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use thiserror::Error;
use tracing::warn;

use crate::core::{HttpRequest, HttpResponse};
use crate::types::ResponseData;

/// Failure inside a handler. Logged and skipped by the pipeline.
#[derive(Error, Debug, Clone)]
#[error("{message}")]
pub struct HandlerError {
    pub message: String,
}

impl HandlerError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Per-exchange view given to handlers. The exchange is read-only; messages
/// can only be appended.
pub struct ErrorContext<'a> {
    request: &'a HttpRequest,
    response: &'a HttpResponse,
    data: &'a ResponseData,
    messages: Vec<String>,
}

impl<'a> ErrorContext<'a> {
    pub fn new(request: &'a HttpRequest, response: &'a HttpResponse, data: &'a ResponseData) -> Self {
        Self {
            request,
            response,
            data,
            messages: Vec::new(),
        }
    }

    pub fn request(&self) -> &HttpRequest {
        self.request
    }

    pub fn response(&self) -> &HttpResponse {
        self.response
    }

    pub fn data(&self) -> &ResponseData {
        self.data
    }

    /// Decoded JSON body, if any.
    pub fn json(&self) -> Option<&'a Value> {
        self.data.as_json()
    }

    pub fn is_success(&self) -> bool {
        self.response.is_success()
    }

    pub fn messages(&self) -> &[String] {
        &self.messages
    }

    pub fn push(&mut self, message: impl Into<String>) {
        self.messages.push(message.into());
    }

    fn into_messages(self) -> Vec<String> {
        self.messages
    }
}

/// Error handler interface.
///
/// A handler that returns an error or panics is logged and skipped; messages
/// it pushed before failing are kept.
pub trait ErrorHandler: Send + Sync {
    /// Name used in logs.
    fn name(&self) -> &str;

    fn handle(&self, context: &mut ErrorContext<'_>) -> Result<(), HandlerError>;
}

/// Ordered handler chain.
#[derive(Clone)]
pub struct ErrorPipeline {
    handlers: Vec<Arc<dyn ErrorHandler>>,
}

impl ErrorPipeline {
    /// Pipeline holding only the generic status handler.
    pub fn new() -> Self {
        Self {
            handlers: vec![Arc::new(GenericHandler)],
        }
    }

    /// Insert a handler at the front so it runs before every existing one.
    pub fn register(&mut self, handler: impl ErrorHandler + 'static) -> &mut Self {
        self.handlers.insert(0, Arc::new(handler));
        self
    }

    /// Builder flavour of [`register`](Self::register).
    pub fn with_handler(mut self, handler: impl ErrorHandler + 'static) -> Self {
        self.register(handler);
        self
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }

    /// Run every handler against one exchange.
    ///
    /// Pure function of its inputs: the same exchange yields the same messages.
    pub fn classify(
        &self,
        request: &HttpRequest,
        response: &HttpResponse,
        data: &ResponseData,
    ) -> Vec<String> {
        let mut context = ErrorContext::new(request, response, data);
        for handler in &self.handlers {
            match panic::catch_unwind(AssertUnwindSafe(|| handler.handle(&mut context))) {
                Ok(Ok(())) => {}
                Ok(Err(e)) => {
                    warn!(handler = handler.name(), error = %e, "Error handler failed");
                }
                Err(payload) => {
                    warn!(
                        handler = handler.name(),
                        panic = panic_message(payload.as_ref()),
                        "Error handler panicked"
                    );
                }
            }
        }
        context.into_messages()
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    payload
        .downcast_ref::<&str>()
        .copied()
        .or_else(|| payload.downcast_ref::<String>().map(String::as_str))
        .unwrap_or("unknown panic")
}

impl Default for ErrorPipeline {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for ErrorPipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list()
            .entries(self.handlers.iter().map(|h| h.name()))
            .finish()
    }
}

/// `"<host> <status> <reason>"` for any non-2xx response.
#[derive(Clone, Copy, Debug, Default)]
pub struct GenericHandler;

impl ErrorHandler for GenericHandler {
    fn name(&self) -> &str {
        "generic"
    }

    fn handle(&self, context: &mut ErrorContext<'_>) -> Result<(), HandlerError> {
        if context.is_success() {
            return Ok(());
        }
        let host = url::Url::parse(&context.request().url)
            .ok()
            .and_then(|u| u.host_str().map(str::to_string))
            .unwrap_or_else(|| context.request().url.clone());
        let message = format!(
            "{} {} {}",
            host,
            context.response().status,
            context.response().status_text
        );
        context.push(message.trim_end());
        Ok(())
    }
}

/// Message field found by walking a dotted path into the JSON body.
#[derive(Clone, Debug)]
pub struct SimpleFieldHandler {
    path: Vec<String>,
    field: String,
    always: bool,
}

impl SimpleFieldHandler {
    /// `path` is dotted (`"error"`, `"data.error"`); empty means the body root.
    /// With `always`, the handler also fires on 2xx responses.
    pub fn new(path: &str, field: impl Into<String>, always: bool) -> Self {
        Self {
            path: path
                .split('.')
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect(),
            field: field.into(),
            always,
        }
    }
}

impl ErrorHandler for SimpleFieldHandler {
    fn name(&self) -> &str {
        &self.field
    }

    fn handle(&self, context: &mut ErrorContext<'_>) -> Result<(), HandlerError> {
        if !self.always && context.is_success() {
            return Ok(());
        }
        let Some(mut node) = context.json() else {
            return Ok(());
        };
        for segment in &self.path {
            match node.get(segment) {
                Some(child @ Value::Object(_)) => node = child,
                _ => return Ok(()),
            }
        }
        let Some(map) = node.as_object() else {
            return Ok(());
        };
        let Some(message) = map.get(&self.field).and_then(Value::as_str) else {
            return Ok(());
        };

        context.push(message);
        for (key, value) in map {
            if key == &self.field {
                continue;
            }
            match value {
                Value::String(s) => context.push(format!("{}: {}", key, s)),
                Value::Number(_) | Value::Bool(_) => context.push(format!("{}: {}", key, value)),
                _ => {}
            }
        }
        Ok(())
    }
}

/// Handler backed by a closure.
pub struct FnHandler<F> {
    name: String,
    handler: F,
}

impl<F> FnHandler<F>
where
    F: Fn(&mut ErrorContext<'_>) -> Result<(), HandlerError> + Send + Sync,
{
    pub fn new(name: impl Into<String>, handler: F) -> Self {
        Self {
            name: name.into(),
            handler,
        }
    }
}

impl<F> ErrorHandler for FnHandler<F>
where
    F: Fn(&mut ErrorContext<'_>) -> Result<(), HandlerError> + Send + Sync,
{
    fn name(&self) -> &str {
        &self.name
    }

    fn handle(&self, context: &mut ErrorContext<'_>) -> Result<(), HandlerError> {
        (self.handler)(context)
    }
}
