use std::collections::VecDeque;
use std::io::{Read, Write};
use std::net::{TcpListener, TcpStream};
use std::sync::mpsc;
use std::sync::{Arc, Mutex};
use std::time::Duration;

#[derive(Debug, Clone)]
pub(crate) enum Behavior {
    Respond(u16, String),
    DelayRespond(Duration, u16, String),
}

#[derive(Debug, Clone)]
struct Route {
    path: Option<String>,
    behavior: Behavior,
}

#[derive(Debug, Clone)]
pub(crate) struct RecordedRequest {
    pub(crate) method: String,
    pub(crate) target: String,
    pub(crate) headers: Vec<(String, String)>,
    pub(crate) body: String,
}

impl RecordedRequest {
    pub(crate) fn path(&self) -> &str {
        self.target.split('?').next().unwrap_or_default()
    }

    pub(crate) fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    pub(crate) fn query_param(&self, key: &str) -> Option<String> {
        let parsed = url::Url::parse(&format!("http://test.local{}", self.target)).ok()?;
        parsed
            .query_pairs()
            .find(|(name, _)| name == key)
            .map(|(_, value)| value.into_owned())
    }
}

#[derive(Debug)]
pub(crate) struct TestServer {
    pub(crate) base_url: String,
    requests: Arc<Mutex<Vec<RecordedRequest>>>,
    shutdown_tx: mpsc::Sender<()>,
    join_handle: Option<std::thread::JoinHandle<()>>,
}

impl TestServer {
    // Replies in order, whatever path is requested.
    pub(crate) fn spawn(behaviors: Vec<Behavior>) -> Self {
        let routes = behaviors
            .into_iter()
            .map(|behavior| Route {
                path: None,
                behavior,
            })
            .collect();
        Self::start(routes)
    }

    pub(crate) fn routed(routes: Vec<(&str, Behavior)>) -> Self {
        let routes = routes
            .into_iter()
            .map(|(path, behavior)| Route {
                path: Some(path.to_string()),
                behavior,
            })
            .collect();
        Self::start(routes)
    }

    fn start(routes: VecDeque<Route>) -> Self {
        let listener = TcpListener::bind(("127.0.0.1", 0)).expect("bind test server");
        listener.set_nonblocking(true).expect("set nonblocking");
        let addr = listener.local_addr().expect("local addr");

        let requests = Arc::new(Mutex::new(Vec::new()));
        let requests_clone = Arc::clone(&requests);
        let shared_routes = Arc::new(Mutex::new(routes));
        let (shutdown_tx, shutdown_rx) = mpsc::channel::<()>();

        let join_handle = std::thread::spawn(move || {
            loop {
                if shutdown_rx.try_recv().is_ok() {
                    break;
                }

                match listener.accept() {
                    Ok((mut stream, _)) => {
                        let requests = Arc::clone(&requests_clone);
                        let routes = Arc::clone(&shared_routes);
                        std::thread::spawn(move || {
                            let _ = stream.set_nonblocking(false);
                            let Ok(request) = read_request(&mut stream) else {
                                return;
                            };
                            let behavior = next_behavior(&routes, request.path());
                            requests.lock().expect("lock requests").push(request);
                            serve_behavior(&mut stream, behavior);
                        });
                    }
                    Err(err) if err.kind() == std::io::ErrorKind::WouldBlock => {
                        std::thread::sleep(Duration::from_millis(5));
                    }
                    Err(_) => break,
                }
            }
        });

        Self {
            base_url: format!("http://{addr}"),
            requests,
            shutdown_tx,
            join_handle: Some(join_handle),
        }
    }

    pub(crate) fn request_count(&self) -> usize {
        self.requests.lock().expect("lock requests").len()
    }

    pub(crate) fn requests(&self) -> Vec<RecordedRequest> {
        self.requests.lock().expect("lock requests").clone()
    }

    pub(crate) fn requests_to(&self, path: &str) -> Vec<RecordedRequest> {
        self.requests()
            .into_iter()
            .filter(|request| request.path() == path)
            .collect()
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        let _ = self.shutdown_tx.send(());
        if let Some(handle) = self.join_handle.take() {
            let _ = handle.join();
        }
    }
}

fn next_behavior(routes: &Mutex<VecDeque<Route>>, path: &str) -> Behavior {
    let mut queue = routes.lock().expect("lock routes");
    let position = queue
        .iter()
        .position(|route| route.path.as_deref().is_none_or(|expected| expected == path));
    position
        .and_then(|idx| queue.remove(idx))
        .map(|route| route.behavior)
        .unwrap_or_else(|| Behavior::Respond(200, "default-ok".to_string()))
}

fn read_request(stream: &mut TcpStream) -> std::io::Result<RecordedRequest> {
    stream.set_read_timeout(Some(Duration::from_millis(500)))?;
    let mut buf = [0_u8; 1024];
    let mut data = Vec::new();
    let header_end = loop {
        if let Some(pos) = data.windows(4).position(|window| window == b"\r\n\r\n") {
            break pos + 4;
        }
        match stream.read(&mut buf) {
            Ok(0) => break data.len(),
            Ok(read) => data.extend_from_slice(&buf[..read]),
            Err(err)
                if err.kind() == std::io::ErrorKind::WouldBlock
                    || err.kind() == std::io::ErrorKind::TimedOut =>
            {
                break data.len();
            }
            Err(err) => return Err(err),
        }
    };

    let head = String::from_utf8_lossy(&data[..header_end]).to_string();
    let mut lines = head.split("\r\n");
    let mut request_line = lines.next().unwrap_or_default().split_whitespace();
    let method = request_line.next().unwrap_or_default().to_string();
    let target = request_line.next().unwrap_or_default().to_string();
    let headers = lines
        .filter_map(|line| line.split_once(':'))
        .map(|(key, value)| (key.trim().to_string(), value.trim().to_string()))
        .collect::<Vec<_>>();

    let content_length = headers
        .iter()
        .find(|(key, _)| key.eq_ignore_ascii_case("content-length"))
        .and_then(|(_, value)| value.parse::<usize>().ok())
        .unwrap_or(0);
    let mut body = data[header_end..].to_vec();
    while body.len() < content_length {
        match stream.read(&mut buf) {
            Ok(0) => break,
            Ok(read) => body.extend_from_slice(&buf[..read]),
            Err(_) => break,
        }
    }

    Ok(RecordedRequest {
        method,
        target,
        headers,
        body: String::from_utf8_lossy(&body).to_string(),
    })
}

fn reason_phrase(status: u16) -> &'static str {
    match status {
        200 => "OK",
        204 => "No Content",
        400 => "Bad Request",
        401 => "Unauthorized",
        404 => "Not Found",
        408 => "Request Timeout",
        429 => "Too Many Requests",
        500 => "Internal Server Error",
        503 => "Service Unavailable",
        _ => "Status",
    }
}

fn serve_behavior(stream: &mut TcpStream, behavior: Behavior) {
    match behavior {
        Behavior::Respond(status, body) => {
            let _ = write_response(stream, status, &body);
        }
        Behavior::DelayRespond(delay, status, body) => {
            std::thread::sleep(delay);
            let _ = write_response(stream, status, &body);
        }
    }
}

fn write_response(stream: &mut TcpStream, status: u16, body: &str) -> std::io::Result<()> {
    let reason = reason_phrase(status);
    let payload = body.as_bytes();
    write!(
        stream,
        "HTTP/1.1 {status} {reason}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
        payload.len()
    )?;
    stream.write_all(payload)?;
    stream.flush()
}

pub(crate) fn closed_port_url() -> String {
    let listener = TcpListener::bind(("127.0.0.1", 0)).expect("bind scratch port");
    let addr = listener.local_addr().expect("local addr");
    drop(listener);
    format!("http://{addr}")
}

pub(crate) fn ok(body: &str) -> Behavior {
    Behavior::Respond(200, body.to_string())
}

pub(crate) fn status(code: u16, body: &str) -> Behavior {
    Behavior::Respond(code, body.to_string())
}
