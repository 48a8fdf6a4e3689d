//! Local OAuth callback receiver
//!
//! When an app's redirect URI points at localhost, convo listens there for
//! the browser redirect and pulls the authorization code out of it.

use anyhow::{Context, Result};
use std::io::{BufRead, BufReader, Write};
use std::net::TcpListener;
use url::Url;

/// True when the redirect URI can be served by a local listener
pub fn is_local(redirect_uri: &str) -> bool {
    Url::parse(redirect_uri).is_ok_and(|url| {
        url.scheme() == "http" && matches!(url.host_str(), Some("localhost" | "127.0.0.1"))
    })
}

/// Bind the redirect URI's port before the user is sent to the consent page
pub fn bind(redirect_uri: &str) -> Result<TcpListener> {
    let url = Url::parse(redirect_uri).context("Invalid redirect URI")?;
    let port = url.port_or_known_default().unwrap_or(80);
    TcpListener::bind(("127.0.0.1", port))
        .with_context(|| format!("Could not listen on port {} for the OAuth callback", port))
}

/// Wait for the OAuth callback and extract the authorization code
pub fn wait_for_code(listener: TcpListener) -> Result<String> {
    let (mut stream, _) = listener.accept().context("Failed to accept connection")?;

    let mut reader = BufReader::new(&stream);
    let mut request_line = String::new();
    reader
        .read_line(&mut request_line)
        .context("Failed to read request")?;

    let result = parse_callback(&request_line);

    let (status, body) = if result.is_ok() {
        ("200 OK", "Authorization complete. You can close this window.")
    } else {
        ("400 Bad Request", "Authorization failed. Please try again.")
    };
    let response = format!(
        "HTTP/1.1 {}\r\nContent-Type: text/html\r\nConnection: close\r\n\r\n<html><body><h1>{}</h1></body></html>",
        status, body
    );
    stream.write_all(response.as_bytes()).ok();

    result
}

/// Parse `GET /path?code=...&scope=... HTTP/1.1`
fn parse_callback(request_line: &str) -> Result<String> {
    let target = request_line
        .split_whitespace()
        .nth(1)
        .context("Malformed callback request")?;

    let url = Url::parse("http://localhost")?
        .join(target)
        .context("Malformed callback path")?;

    let mut code = None;
    for (key, value) in url.query_pairs() {
        match key.as_ref() {
            "error" => anyhow::bail!("OAuth error: {}", value),
            "code" => code = Some(value.into_owned()),
            _ => {}
        }
    }

    code.context("No authorization code received")
}
