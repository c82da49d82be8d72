//! Built-in handlers for backend-specific error shapes.

use serde_json::Value;

use super::{ErrorContext, FnHandler, HandlerError};

/// Signature of the built-in handlers.
pub type HandlerFn = fn(&mut ErrorContext<'_>) -> Result<(), HandlerError>;

/// `{"errors": {"<key>": "<message>", ...}}` on error statuses.
pub fn errors_map_handler() -> FnHandler<HandlerFn> {
    FnHandler::new("errors_map", errors_map as HandlerFn)
}

/// Per-item `transfer_specs[].error` entries, whatever the status.
pub fn transfer_spec_errors_handler() -> FnHandler<HandlerFn> {
    FnHandler::new("transfer_spec_errors", transfer_spec_errors as HandlerFn)
}

/// GraphQL `errors[].message`, whatever the status.
pub fn graphql_errors_handler() -> FnHandler<HandlerFn> {
    FnHandler::new("graphql_errors", graphql_errors as HandlerFn)
}

fn errors_map(context: &mut ErrorContext<'_>) -> Result<(), HandlerError> {
    if context.is_success() {
        return Ok(());
    }
    let Some(errors) = context
        .json()
        .and_then(|v| v.get("errors"))
        .and_then(Value::as_object)
    else {
        return Ok(());
    };
    for (key, value) in errors {
        if let Some(message) = value.as_str() {
            context.push(format!("{}: {}", key, message));
        }
    }
    Ok(())
}

fn transfer_spec_errors(context: &mut ErrorContext<'_>) -> Result<(), HandlerError> {
    let Some(specs) = context
        .json()
        .and_then(|v| v.get("transfer_specs"))
        .and_then(Value::as_array)
    else {
        return Ok(());
    };
    for error in specs.iter().filter_map(|spec| spec.get("error")) {
        let message = error
            .get("user_message")
            .or_else(|| error.get("reason"))
            .and_then(Value::as_str)
            .ok_or_else(|| {
                HandlerError::new(format!("unrecognized transfer spec error: {}", error))
            })?;
        context.push(message);
    }
    Ok(())
}

fn graphql_errors(context: &mut ErrorContext<'_>) -> Result<(), HandlerError> {
    let Some(errors) = context
        .json()
        .and_then(|v| v.get("errors"))
        .and_then(Value::as_array)
    else {
        return Ok(());
    };
    for message in errors
        .iter()
        .filter_map(|e| e.get("message").and_then(Value::as_str))
    {
        context.push(message);
    }
    Ok(())
}
