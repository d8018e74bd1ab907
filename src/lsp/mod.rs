// LSP protocol layer
// - server.rs: frame loop over one input/output stream pair
// - dispatcher.rs: control methods, initialization gate, handler invocation
// - router.rs: method name to handler table
// - backend.rs: lifecycle, document sync and hover handlers
// - context.rs: request context, cancellation registry, outbound queue
// - error.rs: handler errors
pub mod backend;
pub mod context;
pub mod dispatcher;
pub mod error;
pub mod router;
pub mod server;
