use std::sync::Arc;

use futures::future;
use tower_lsp::lsp_types::{
    DidChangeTextDocumentParams, DidCloseTextDocumentParams, DidOpenTextDocumentParams, Hover,
    HoverParams, HoverProviderCapability, InitializeParams, InitializeResult, InitializedParams,
    NumberOrString, ServerCapabilities, ServerInfo, TextDocumentSyncCapability,
    TextDocumentSyncKind, WorkDoneProgressBegin,
};
use tracing::{debug, info, warn};

use crate::analysis::{DocumentStore, TextDocument, hover_at};
use crate::lsp::context::RequestContext;
use crate::lsp::error::HandlerError;
use crate::lsp::router::Router;
use crate::rpc::message::ProgressToken;
use crate::rpc::method::LspMethod;

#[derive(Debug, Default)]
pub struct Backend {
    documents: DocumentStore,
}

impl Backend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn documents(&self) -> &DocumentStore {
        &self.documents
    }

    pub fn server_capabilities() -> ServerCapabilities {
        ServerCapabilities {
            text_document_sync: Some(TextDocumentSyncCapability::Kind(TextDocumentSyncKind::FULL)),
            hover_provider: Some(HoverProviderCapability::Simple(true)),
            ..Default::default()
        }
    }

    /// Builds the routing table for every method this server implements.
    pub fn router(self: Arc<Self>) -> Router {
        let open = Arc::clone(&self);
        let change = Arc::clone(&self);
        let close = Arc::clone(&self);
        let hover = self;

        Router::new()
            .request(LspMethod::Initialize, |_context, params: InitializeParams| {
                future::ready(Ok::<_, HandlerError>(Self::initialize(params)))
            })
            .notification(LspMethod::Initialized, |_: Option<InitializedParams>| {
                info!("Client finished initialization");
                future::ready(Ok::<_, HandlerError>(()))
            })
            .request(LspMethod::Shutdown, |_context, _: ()| {
                info!("Shutdown requested");
                future::ready(Ok::<_, HandlerError>(()))
            })
            .notification(LspMethod::DidOpen, move |params: DidOpenTextDocumentParams| {
                future::ready(open.did_open(params))
            })
            .notification(LspMethod::DidChange, move |params: DidChangeTextDocumentParams| {
                future::ready(change.did_change(params))
            })
            .notification(LspMethod::DidClose, move |params: DidCloseTextDocumentParams| {
                future::ready(close.did_close(params))
            })
            .request(LspMethod::Hover, move |context, params: HoverParams| {
                Arc::clone(&hover).hover(context, params)
            })
    }

    fn initialize(params: InitializeParams) -> InitializeResult {
        let client = params
            .client_info
            .map(|info| info.name)
            .unwrap_or_else(|| "unknown".to_string());
        info!(client = %client, "LSP server initializing");

        InitializeResult {
            capabilities: Self::server_capabilities(),
            server_info: Some(ServerInfo {
                name: "dedukt-lsp".to_string(),
                version: Some(env!("CARGO_PKG_VERSION").to_string()),
            }),
        }
    }

    fn did_open(&self, params: DidOpenTextDocumentParams) -> Result<(), HandlerError> {
        let item = params.text_document;
        self.documents.open(TextDocument {
            uri: item.uri,
            language_id: item.language_id,
            version: item.version,
            text: item.text,
        });
        Ok(())
    }

    fn did_change(&self, mut params: DidChangeTextDocumentParams) -> Result<(), HandlerError> {
        let uri = params.text_document.uri;
        // Full sync: the last change carries the whole text
        let Some(change) = params.content_changes.pop() else {
            debug!(uri = %uri, "didChange without content changes");
            return Ok(());
        };
        if !self
            .documents
            .replace(&uri, params.text_document.version, change.text)
        {
            warn!(uri = %uri, "didChange for a document that is not open");
        }
        Ok(())
    }

    fn did_close(&self, params: DidCloseTextDocumentParams) -> Result<(), HandlerError> {
        let uri = params.text_document.uri;
        if self.documents.close(&uri).is_none() {
            warn!(uri = %uri, "didClose for a document that is not open");
        }
        Ok(())
    }

    async fn hover(
        self: Arc<Self>,
        context: RequestContext,
        params: HoverParams,
    ) -> Result<Option<Hover>, HandlerError> {
        let position_params = params.text_document_position_params;
        let uri = position_params.text_document.uri;
        let Some(document) = self.documents.get(&uri) else {
            debug!(uri = %uri, "Hover on a document that is not open");
            return Ok(None);
        };

        let _progress = params
            .work_done_progress_params
            .work_done_token
            .map(|token| {
                context.begin_progress(
                    progress_token(token),
                    WorkDoneProgressBegin {
                        title: "Analyzing syntax".to_string(),
                        ..Default::default()
                    },
                )
            })
            .transpose()?;

        // Tree-sitter trees stay on the blocking thread
        let cancel = context.cancellation().clone();
        let position = position_params.position;
        let analysis = tokio::task::spawn_blocking(move || hover_at(&document, position, &cancel))
            .await
            .map_err(anyhow::Error::from)?;

        debug!(id = %context.id(), uri = %uri, found = matches!(analysis, Ok(Some(_))), "Hover analysed");
        Ok(analysis?)
    }
}

fn progress_token(token: NumberOrString) -> ProgressToken {
    match token {
        NumberOrString::Number(n) => ProgressToken::Number(i64::from(n)),
        NumberOrString::String(s) => ProgressToken::String(s),
    }
}
