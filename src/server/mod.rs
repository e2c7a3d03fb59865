// Server module entry point
// Accept loop, connection serving and shutdown handling

pub mod connection;
pub mod listener;
pub mod signal;

use std::future::Future;
use std::sync::Arc;
use tokio::net::TcpListener;

use crate::config::ServerContext;
use crate::logger;

pub use listener::create_listener;
pub use signal::shutdown_signal;

/// Accept connections until `shutdown` resolves.
///
/// In-flight connections keep running on their own tasks after the loop exits.
pub async fn run(
    listener: TcpListener,
    ctx: Arc<ServerContext>,
    shutdown: impl Future<Output = ()>,
) -> std::io::Result<()> {
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            accept_result = listener.accept() => {
                match accept_result {
                    Ok((stream, peer_addr)) => {
                        connection::accept_connection(stream, peer_addr, &ctx);
                    }
                    Err(e) => {
                        logger::log_error(&format!("Failed to accept connection: {e}"));
                    }
                }
            }

            () = &mut shutdown => {
                logger::log_shutdown();
                return Ok(());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use std::fs;
    use std::net::SocketAddr;
    use tempfile::TempDir;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpStream;
    use tokio::sync::oneshot;

    async fn raw_get(addr: SocketAddr, path: &str) -> String {
        let mut stream = TcpStream::connect(addr).await.unwrap();
        let request = format!("GET {path} HTTP/1.1\r\nHost: localhost\r\nConnection: close\r\n\r\n");
        stream.write_all(request.as_bytes()).await.unwrap();
        let mut response = Vec::new();
        stream.read_to_end(&mut response).await.unwrap();
        String::from_utf8_lossy(&response).into_owned()
    }

    #[tokio::test]
    async fn test_serves_over_tcp_until_shutdown() {
        let dir = TempDir::new().unwrap();
        let root = dir.path().join("resources");
        fs::create_dir_all(&root).unwrap();
        fs::write(root.join("index.html"), "<h1>home</h1>").unwrap();
        fs::write(root.join("hello.txt"), "hello world").unwrap();

        let mut cfg = Config::load_from("no/such/config").unwrap();
        cfg.resources.root = root.to_str().unwrap().to_string();
        cfg.resources.default_document = root.join("index.html").to_str().unwrap().to_string();
        cfg.logging.access_log = false;
        let ctx = Arc::new(ServerContext::new(cfg).unwrap());

        let listener = create_listener("127.0.0.1:0".parse().unwrap()).unwrap();
        let addr = listener.local_addr().unwrap();
        let (stop_tx, stop_rx) = oneshot::channel::<()>();
        let server = tokio::spawn(run(listener, ctx, async move {
            let _ = stop_rx.await;
        }));

        let home = raw_get(addr, "/").await;
        assert!(home.starts_with("HTTP/1.1 200 OK"), "{home}");
        assert!(home.ends_with("<h1>home</h1>"));

        let hello = raw_get(addr, "/hello.txt").await;
        assert!(hello.starts_with("HTTP/1.1 200 OK"));
        assert!(hello.contains("content-type: text/plain; charset=utf-8"));
        assert!(hello.ends_with("hello world"));

        let missing = raw_get(addr, "/missing.txt").await;
        assert!(missing.starts_with("HTTP/1.1 404 Not Found"));
        assert!(missing.ends_with(r#"{"detail":"File not found"}"#));

        stop_tx.send(()).unwrap();
        server.await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn test_connection_limit_releases_slots() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("a.txt"), "a").unwrap();

        let mut cfg = Config::load_from("no/such/config").unwrap();
        cfg.resources.root = dir.path().to_str().unwrap().to_string();
        cfg.logging.access_log = false;
        cfg.performance.max_connections = Some(1);
        let ctx = Arc::new(ServerContext::new(cfg).unwrap());

        let listener = create_listener("127.0.0.1:0".parse().unwrap()).unwrap();
        let addr = listener.local_addr().unwrap();
        let (stop_tx, stop_rx) = oneshot::channel::<()>();
        let server = tokio::spawn(run(listener, Arc::clone(&ctx), async move {
            let _ = stop_rx.await;
        }));

        // Sequential connections each get the single slot once the previous one closes
        for _ in 0..3 {
            let resp = raw_get(addr, "/a.txt").await;
            assert!(resp.starts_with("HTTP/1.1 200 OK"), "{resp}");
            for _ in 0..50 {
                if ctx.active_connections.load(std::sync::atomic::Ordering::SeqCst) == 0 {
                    break;
                }
                tokio::time::sleep(std::time::Duration::from_millis(10)).await;
            }
        }

        stop_tx.send(()).unwrap();
        server.await.unwrap().unwrap();
    }
}
