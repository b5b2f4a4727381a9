use std::ffi::OsStr;
use std::io::{Read, Write};
use std::net::{TcpListener, TcpStream};
use std::process::{Child, Command, Stdio};
use std::thread;
use std::time::{Duration, Instant};

/// Kills the wrapped child process on drop.
pub struct ChildGuard {
    child: Child,
}

impl Drop for ChildGuard {
    fn drop(&mut self) {
        drop(self.child.kill());
        drop(self.child.wait());
    }
}

/// Spawn the `pacer` binary in the background.
///
/// # Errors
///
/// Returns an error if the process cannot be started.
pub fn spawn_pacer<I, S>(args: I) -> Result<ChildGuard, String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<OsStr>,
{
    let bin = pacer_bin()?;
    let child = Command::new(bin)
        .args(args)
        .env("PACER_LOG", "error")
        .env_remove("PACER_AUTH_TOKEN")
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .spawn()
        .map_err(|err| format!("spawn pacer failed: {}", err))?;
    Ok(ChildGuard { child })
}

/// Pick an available local TCP port.
///
/// # Errors
///
/// Returns an error if a local port cannot be allocated.
pub fn pick_port() -> Result<u16, String> {
    TcpListener::bind("127.0.0.1:0")
        .map_err(|err| format!("bind port failed: {}", err))?
        .local_addr()
        .map_err(|err| format!("port addr failed: {}", err))
        .map(|addr| addr.port())
}

/// Block until `addr` accepts connections.
///
/// # Errors
///
/// Returns an error if nothing is listening before the timeout.
pub fn wait_for_listener(addr: &str, timeout: Duration) -> Result<(), String> {
    let start = Instant::now();
    loop {
        if TcpStream::connect(addr).is_ok() {
            return Ok(());
        }
        if start.elapsed() > timeout {
            return Err(format!("nothing listening on {}", addr));
        }
        thread::sleep(Duration::from_millis(50));
    }
}

/// Send one HTTP/1.1 request and return `(status, body)`.
///
/// # Errors
///
/// Returns an error if the exchange fails or the response is malformed.
pub fn send_request(
    addr: &str,
    method: &str,
    path: &str,
    content_type: Option<&str>,
    body: &str,
) -> Result<(u16, String), String> {
    let mut stream =
        TcpStream::connect(addr).map_err(|err| format!("connect failed: {}", err))?;
    stream
        .set_read_timeout(Some(Duration::from_secs(10)))
        .map_err(|err| format!("set timeout failed: {}", err))?;
    let mut request = format!(
        "{} {} HTTP/1.1\r\nHost: {}\r\nContent-Length: {}\r\nConnection: close\r\n",
        method,
        path,
        addr,
        body.len()
    );
    if let Some(value) = content_type {
        request.push_str("Content-Type: ");
        request.push_str(value);
        request.push_str("\r\n");
    }
    request.push_str("\r\n");
    request.push_str(body);
    stream
        .write_all(request.as_bytes())
        .map_err(|err| format!("write failed: {}", err))?;

    let mut raw = String::new();
    stream
        .read_to_string(&mut raw)
        .map_err(|err| format!("read failed: {}", err))?;
    let (head, body) = raw
        .split_once("\r\n\r\n")
        .ok_or_else(|| format!("malformed response: {}", raw))?;
    let status = head
        .split_whitespace()
        .nth(1)
        .and_then(|code| code.parse::<u16>().ok())
        .ok_or_else(|| format!("missing status in: {}", head))?;
    Ok((status, body.to_owned()))
}

fn pacer_bin() -> Result<String, String> {
    option_env!("CARGO_BIN_EXE_pacer").map_or_else(
        || Err("CARGO_BIN_EXE_pacer missing at compile time.".to_owned()),
        |path| Ok(path.to_owned()),
    )
}
