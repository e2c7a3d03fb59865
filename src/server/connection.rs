// Connection handling module
// Accepts a single TCP connection and serves HTTP/1.1 on it

use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper_util::rt::TokioIo;
use std::net::SocketAddr;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use tokio::net::TcpStream;

use crate::config::ServerContext;
use crate::handler;
use crate::logger;

/// Accept a connection, enforcing `max_connections`, and serve it on its own task.
pub fn accept_connection(stream: TcpStream, peer_addr: SocketAddr, ctx: &Arc<ServerContext>) {
    // Increment first, then check, so concurrent accepts cannot both slip under the limit
    let prev_count = ctx.active_connections.fetch_add(1, Ordering::SeqCst);

    if let Some(max_conn) = ctx.config.performance.max_connections {
        if prev_count >= usize::try_from(max_conn).unwrap_or(usize::MAX) {
            ctx.active_connections.fetch_sub(1, Ordering::SeqCst);
            logger::log_warning(&format!(
                "Max connections reached: {prev_count}/{max_conn}. Connection from {peer_addr} rejected."
            ));
            drop(stream);
            return;
        }
    }

    logger::log_connection_accepted(&peer_addr);
    handle_connection(stream, peer_addr, Arc::clone(ctx));
}

/// Serve one connection; the counter is released when the task ends,
/// whether the client finished, errored, or timed out.
fn handle_connection(stream: TcpStream, peer_addr: SocketAddr, ctx: Arc<ServerContext>) {
    tokio::spawn(async move {
        let io = TokioIo::new(stream);
        let timeout_duration = ctx.config.performance.connection_timeout();

        let mut builder = http1::Builder::new();
        builder.keep_alive(ctx.config.performance.keep_alive);

        let service_ctx = Arc::clone(&ctx);
        let conn = builder.serve_connection(
            io,
            service_fn(move |req| handler::handle_request(req, Arc::clone(&service_ctx), peer_addr)),
        );

        match tokio::time::timeout(timeout_duration, conn).await {
            Ok(Ok(())) => {}
            Ok(Err(err)) => logger::log_connection_error(&err),
            Err(_) => {
                logger::log_warning(&format!(
                    "Connection from {peer_addr} timed out after {} seconds",
                    timeout_duration.as_secs()
                ));
            }
        }

        ctx.active_connections.fetch_sub(1, Ordering::SeqCst);
    });
}
