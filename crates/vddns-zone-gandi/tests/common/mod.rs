//! Scripted HTTP stub standing in for the XML-RPC endpoint
//!
//! Answers one canned response per connection, in order, and keeps the
//! request bodies it received.

#![allow(dead_code)]

use std::sync::{Arc, Mutex};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

pub struct StubServer {
    pub url: String,
    requests: Arc<Mutex<Vec<String>>>,
}

impl StubServer {
    /// Start a stub that replies with `responses` as `(status, body)`
    pub async fn start(responses: Vec<(u16, String)>) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let requests = Arc::new(Mutex::new(Vec::new()));
        let seen = requests.clone();

        tokio::spawn(async move {
            for (status, body) in responses {
                let Ok((mut socket, _)) = listener.accept().await else {
                    return;
                };
                let request = read_body(&mut socket).await;
                seen.lock().unwrap().push(request);

                let reply = format!(
                    "HTTP/1.1 {} Stub\r\nContent-Type: text/xml\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                    status,
                    body.len(),
                    body
                );
                let _ = socket.write_all(reply.as_bytes()).await;
                let _ = socket.shutdown().await;
            }
        });

        Self {
            url: format!("http://{}/xmlrpc/", addr),
            requests,
        }
    }

    /// Request bodies received so far
    pub fn requests(&self) -> Vec<String> {
        self.requests.lock().unwrap().clone()
    }
}

async fn read_body(socket: &mut TcpStream) -> String {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 4096];

    let header_end = loop {
        let n = socket.read(&mut chunk).await.unwrap_or(0);
        if n == 0 {
            return String::from_utf8_lossy(&buf).into_owned();
        }
        buf.extend_from_slice(&chunk[..n]);
        if let Some(pos) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
            break pos + 4;
        }
    };

    let headers = String::from_utf8_lossy(&buf[..header_end]).to_ascii_lowercase();
    let content_length = headers
        .lines()
        .find_map(|line| line.strip_prefix("content-length:"))
        .and_then(|v| v.trim().parse::<usize>().ok())
        .unwrap_or(0);

    while buf.len() < header_end + content_length {
        let n = socket.read(&mut chunk).await.unwrap_or(0);
        if n == 0 {
            break;
        }
        buf.extend_from_slice(&chunk[..n]);
    }

    String::from_utf8_lossy(&buf[header_end..]).into_owned()
}

/// Wrap a `<value>` in a method response
pub fn ok(value: &str) -> (u16, String) {
    (
        200,
        format!(
            "<?xml version='1.0'?><methodResponse><params><param>{}</param></params></methodResponse>",
            value
        ),
    )
}

pub fn int(i: i64) -> String {
    format!("<value><int>{}</int></value>", i)
}

pub fn boolean(b: bool) -> String {
    format!("<value><boolean>{}</boolean></value>", u8::from(b))
}

/// A record struct as returned by the record methods
pub fn record(id: i64, name: &str, value: &str) -> String {
    format!(
        "<value><struct>\
           <member><name>id</name><value><int>{}</int></value></member>\
           <member><name>name</name><value><string>{}</string></value></member>\
           <member><name>type</name><value><string>A</string></value></member>\
           <member><name>value</name><value><string>{}</string></value></member>\
           <member><name>ttl</name><value><int>300</int></value></member>\
         </struct></value>",
        id, name, value
    )
}

pub fn array(items: &[String]) -> String {
    format!("<value><array><data>{}</data></array></value>", items.concat())
}

pub fn fault(code: i64, message: &str) -> (u16, String) {
    (
        200,
        format!(
            "<?xml version='1.0'?><methodResponse><fault><value><struct>\
               <member><name>faultCode</name><value><int>{}</int></value></member>\
               <member><name>faultString</name><value><string>{}</string></value></member>\
             </struct></value></fault></methodResponse>",
            code, message
        ),
    )
}
