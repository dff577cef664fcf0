#![allow(dead_code)]

use std::{
    net::SocketAddr,
    sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    },
    time::Duration,
};
use tokio::{
    io::{AsyncBufReadExt, AsyncWriteExt, BufReader},
    net::{TcpListener, TcpStream},
    task::JoinHandle,
};

pub struct MockHttpServer {
    pub addr: SocketAddr,
    requests: Arc<AtomicUsize>,
    handle: JoinHandle<()>,
}

impl MockHttpServer {
    pub fn url(&self) -> String {
        format!("http://{}/", self.addr)
    }

    pub fn requests(&self) -> usize {
        self.requests.load(Ordering::SeqCst)
    }
}

impl Drop for MockHttpServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

/// Start a mock HTTP server on localhost
///
/// `status_line` maps the zero based request index to the status line of the
/// answer, e.g. `"200 OK"`. `None` accepts the request and never answers.
pub async fn start_mock_http_server<F>(status_line: F) -> MockHttpServer
where
    F: Fn(usize) -> Option<&'static str> + Send + Sync + 'static,
{
    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("failed to bind mock server");
    let addr = listener.local_addr().expect("failed to get mock server address");
    let requests = Arc::new(AtomicUsize::new(0));
    let status_line = Arc::new(status_line);

    let counter = requests.clone();
    let handle = tokio::spawn(async move {
        loop {
            let Ok((stream, _)) = listener.accept().await else {
                return;
            };
            let index = counter.fetch_add(1, Ordering::SeqCst);
            let status_line = status_line.clone();

            tokio::spawn(async move {
                respond(stream, status_line(index)).await;
            });
        }
    });

    MockHttpServer {
        addr,
        requests,
        handle,
    }
}

async fn respond(mut stream: TcpStream, status_line: Option<&'static str>) {
    let mut reader = BufReader::new(&mut stream);

    // Read HTTP headers
    loop {
        let mut line = String::new();
        if reader.read_line(&mut line).await.is_err() {
            return;
        }

        if line.trim().is_empty() {
            break;
        }
    }

    let Some(status_line) = status_line else {
        // keep the connection open without answering
        tokio::time::sleep(Duration::from_secs(60)).await;
        return;
    };

    let http_response = format!(
        "HTTP/1.1 {status_line}\r\nLocation: http://127.0.0.1:1/\r\nContent-Length: 0\r\nConnection: close\r\n\r\n"
    );
    let _ = stream.write_all(http_response.as_bytes()).await;
}

/// Address of a local port nobody listens on
pub async fn refused_addr() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("failed to bind probe port");
    listener.local_addr().expect("failed to get probe port address")
}
