//! Message dispatch: control methods, the initialization gate and handler
//! invocation

use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::time::Duration;

use futures::FutureExt;
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::lsp::context::{CancelOutcome, CancellationRegistry, Outbox, RequestContext};
use crate::lsp::error::HandlerError;
use crate::lsp::router::Router;
use crate::rpc::error::{ErrorCode, ResponseError};
use crate::rpc::message::{CancelParams, Message, Notification, Params, Request, Response};
use crate::rpc::method::{ControlMethod, LspMethod, WireName};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ServerState {
    #[default]
    Uninitialized,
    Initialized,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopControl {
    Continue,
    Exit,
}

/// Outcome of dispatching one message
#[derive(Debug)]
pub struct Dispatched {
    pub response: Option<Response>,
    pub state: ServerState,
    pub control: LoopControl,
    /// Notifications queued by the handler, to be written before `response`
    pub notifications: Vec<Notification>,
}

pub struct Dispatcher {
    router: Router,
    cancellations: CancellationRegistry,
    outbox: Outbox,
    request_timeout: Option<Duration>,
}

impl Dispatcher {
    pub fn new(router: Router) -> Self {
        info!(methods = ?router.methods(), "Registered handlers");
        Self {
            router,
            cancellations: CancellationRegistry::new(),
            outbox: Outbox::default(),
            request_timeout: None,
        }
    }

    /// Bounds handler run time. An expired handler is cancelled and its
    /// request answered with `RequestFailed`.
    pub fn with_request_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.request_timeout = timeout;
        self
    }

    pub async fn dispatch(&self, message: Message, state: ServerState) -> Dispatched {
        let mut outcome = Dispatched {
            response: None,
            state,
            control: LoopControl::Continue,
            notifications: Vec::new(),
        };

        match message {
            Message::Request(request) => {
                let (response, next_state, control) = self.dispatch_request(request, state).await;
                outcome.response = Some(response);
                outcome.state = next_state;
                outcome.control = control;
            }
            Message::Notification(notification) => {
                outcome.control = self.dispatch_notification(notification, state).await;
            }
            Message::Response(response) => {
                debug!(id = %response.id, is_error = response.is_error(), "Ignoring client response");
            }
        }

        outcome.notifications = self.outbox.drain();
        outcome
    }

    async fn dispatch_request(
        &self,
        request: Request,
        state: ServerState,
    ) -> (Response, ServerState, LoopControl) {
        let Request { id, method, params } = request;
        debug!(%id, method = %method, "Dispatching request");

        if let Some(control) = ControlMethod::from_wire_name(&method) {
            self.handle_control(control, params);
            return (Response::success(id, Value::Null), state, LoopControl::Continue);
        }

        let lsp_method = LspMethod::from_wire_name(&method);
        if lsp_method == Some(LspMethod::Exit) {
            info!(%id, "Exit received as a request");
            return (Response::success(id, Value::Null), state, LoopControl::Exit);
        }

        let is_initialize = lsp_method == Some(LspMethod::Initialize);
        match state {
            ServerState::Uninitialized if !is_initialize => {
                warn!(%id, method = %method, "Request before initialize");
                let response = Response::from_code(id, ErrorCode::ServerNotInitialized);
                return (response, state, LoopControl::Continue);
            }
            ServerState::Initialized if is_initialize => {
                warn!(%id, "Duplicate initialize request");
                let error = ResponseError::new(ErrorCode::InvalidRequest)
                    .with_message("Server is already initialized");
                return (Response::error(id, error), state, LoopControl::Continue);
            }
            _ => {}
        }

        let Some(handler) = self.router.request_handler(&method) else {
            info!(%id, method = %method, "Method not found");
            let error = ResponseError::new(ErrorCode::MethodNotFound)
                .with_message(format!("Method not found: {}", method));
            return (Response::error(id, error), state, LoopControl::Continue);
        };

        let token = self.cancellations.begin(&id);
        if token.is_cancelled() {
            debug!(%id, method = %method, "Request cancelled before dispatch");
            self.cancellations.finish(&id);
            let response = Response::from_code(id, ErrorCode::RequestCancelled);
            return (response, state, LoopControl::Continue);
        }

        let context = RequestContext::new(id.clone(), token.clone(), self.outbox.clone());
        let invocation = AssertUnwindSafe(async move { handler(context, params).await }).catch_unwind();

        let result = match self.request_timeout {
            None => invocation.await,
            Some(limit) => match tokio::time::timeout(limit, invocation).await {
                Ok(result) => result,
                Err(_) => {
                    token.cancel();
                    warn!(%id, method = %method, timeout_ms = limit.as_millis() as u64, "Request timed out");
                    Ok(Err(HandlerError::with_code(
                        ErrorCode::RequestFailed,
                        format!("Request timed out after {}ms", limit.as_millis()),
                    )))
                }
            },
        };
        self.cancellations.finish(&id);
        debug!(%id, in_flight = self.cancellations.in_flight(), "Request finished");

        let outcome = match result {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(error)) => {
                warn!(%id, method = %method, error = %error, "Request handler failed");
                Err(error.to_response_error())
            }
            Err(panic) => {
                let message = panic_message(panic.as_ref());
                warn!(%id, method = %method, panic = %message, "Request handler panicked");
                Err(ResponseError::new(ErrorCode::InternalError)
                    .with_message(format!("Handler panicked: {}", message)))
            }
        };

        let next_state = if is_initialize && outcome.is_ok() {
            info!("Server initialized");
            ServerState::Initialized
        } else {
            state
        };
        (Response { id, outcome }, next_state, LoopControl::Continue)
    }

    async fn dispatch_notification(&self, notification: Notification, state: ServerState) -> LoopControl {
        let Notification { method, params } = notification;

        if let Some(control) = ControlMethod::from_wire_name(&method) {
            self.handle_control(control, params);
            return LoopControl::Continue;
        }
        if LspMethod::from_wire_name(&method) == Some(LspMethod::Exit) {
            info!("Exit notification received");
            return LoopControl::Exit;
        }
        if state == ServerState::Uninitialized {
            debug!(method = %method, "Dropping notification before initialize");
            return LoopControl::Continue;
        }

        let Some(handler) = self.router.notification_handler(&method) else {
            info!(method = %method, "Unhandled notification");
            return LoopControl::Continue;
        };

        match AssertUnwindSafe(async move { handler(params).await })
            .catch_unwind()
            .await
        {
            Ok(Ok(())) => {}
            Ok(Err(error)) => warn!(method = %method, error = %error, "Notification handler failed"),
            Err(panic) => {
                let message = panic_message(panic.as_ref());
                warn!(method = %method, panic = %message, "Notification handler panicked");
            }
        }
        LoopControl::Continue
    }

    fn handle_control(&self, control: ControlMethod, params: Params) {
        match control {
            ControlMethod::CancelRequest => match params.parse::<CancelParams>() {
                Ok(CancelParams { id }) => {
                    let outcome = self.cancellations.cancel(&id);
                    match outcome {
                        CancelOutcome::Signalled => debug!(%id, "Cancellation signalled"),
                        CancelOutcome::Deferred => debug!(%id, "Cancellation recorded for pending request"),
                        CancelOutcome::AlreadyFinished => debug!(%id, "Cancellation for finished request ignored"),
                    }
                }
                Err(error) => warn!(error = %error, "Malformed $/cancelRequest"),
            },
            ControlMethod::Progress => {
                debug!(params = ?params.as_value(), "Dropping client $/progress");
            }
        }
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(message) = panic.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic payload".to_string()
    }
}
