//! Method name to handler routing table

use std::collections::HashMap;
use std::future::Future;

use futures::FutureExt;
use futures::future::{self, BoxFuture};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::lsp::context::RequestContext;
use crate::lsp::error::HandlerError;
use crate::rpc::message::Params;
use crate::rpc::method::WireName;

pub type RequestFuture = BoxFuture<'static, Result<Value, HandlerError>>;
pub type NotificationFuture = BoxFuture<'static, Result<(), HandlerError>>;

pub type RequestHandler = Box<dyn Fn(RequestContext, Params) -> RequestFuture + Send + Sync>;
pub type NotificationHandler = Box<dyn Fn(Params) -> NotificationFuture + Send + Sync>;

/// Handlers keyed by wire method name. Built once, read-only afterwards.
///
/// Each handler declares its payload type; `params` stay raw until the
/// handler is selected and are decoded right before it runs. A payload that
/// does not fit is answered with `InvalidParams`.
#[derive(Default)]
pub struct Router {
    requests: HashMap<&'static str, RequestHandler>,
    notifications: HashMap<&'static str, NotificationHandler>,
}

impl Router {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn request<M, P, R, F, Fut>(mut self, method: M, handler: F) -> Self
    where
        M: WireName,
        P: DeserializeOwned,
        R: Serialize + Send + 'static,
        F: Fn(RequestContext, P) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<R, HandlerError>> + Send + 'static,
    {
        let boxed: RequestHandler = Box::new(move |context, params| {
            let params = match params.parse::<P>() {
                Ok(params) => params,
                Err(error) => return future::ready(Err(error.into())).boxed(),
            };
            let pending = handler(context, params);
            async move {
                let result = pending.await?;
                Ok::<_, HandlerError>(serde_json::to_value(result)?)
            }
            .boxed()
        });
        self.requests.insert(method.wire_name(), boxed);
        self
    }

    pub fn notification<M, P, F, Fut>(mut self, method: M, handler: F) -> Self
    where
        M: WireName,
        P: DeserializeOwned,
        F: Fn(P) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), HandlerError>> + Send + 'static,
    {
        let boxed: NotificationHandler = Box::new(move |params| match params.parse::<P>() {
            Ok(params) => handler(params).boxed(),
            Err(error) => future::ready(Err(error.into())).boxed(),
        });
        self.notifications.insert(method.wire_name(), boxed);
        self
    }

    pub fn request_handler(&self, method: &str) -> Option<&RequestHandler> {
        self.requests.get(method)
    }

    pub fn notification_handler(&self, method: &str) -> Option<&NotificationHandler> {
        self.notifications.get(method)
    }

    /// Registered method names, sorted.
    pub fn methods(&self) -> Vec<&'static str> {
        let mut methods: Vec<_> = self
            .requests
            .keys()
            .chain(self.notifications.keys())
            .copied()
            .collect();
        methods.sort_unstable();
        methods
    }
}
