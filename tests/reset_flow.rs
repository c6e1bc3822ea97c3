use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use gce_windows_password::compute::ComputeClient;
use gce_windows_password::config::ResetConfig;
use gce_windows_password::metadata::{self, Metadata, WindowsKeyEntry};
use gce_windows_password::reset::{self, ResetError};
use rsa::rand_core::OsRng;
use rsa::{BigUint, Oaep, RsaPublicKey};
use sha1::Sha1;
use std::io::{BufRead, BufReader, Read, Write};
use std::net::{TcpListener, TcpStream};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

const PASSWORD: &str = "Xy9!pQ3#vLn8";

fn respond(stream: &mut TcpStream, body: &str) {
    let response = format!(
        "HTTP/1.1 200 OK\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
        body.len(),
        body
    );
    stream.write_all(response.as_bytes()).unwrap();
}

fn agent_encrypt(modulus_b64: &str, exponent_b64: &str, password: &str) -> String {
    let n = BigUint::from_bytes_be(&BASE64.decode(modulus_b64).unwrap());
    let e = BigUint::from_bytes_be(&BASE64.decode(exponent_b64).unwrap());
    let key = RsaPublicKey::new(n, e).unwrap();
    let ciphertext = key
        .encrypt(&mut OsRng, Oaep::new::<Sha1>(), password.as_bytes())
        .unwrap();
    BASE64.encode(ciphertext)
}

/// Stand-in for the compute API plus guest agent. On `setMetadata` it reads
/// the published windows-keys entry and, when `agent_answers`, prepares the
/// encrypted serial response the way the agent would.
fn spawn_compute_stub(agent_answers: bool) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let endpoint = format!("http://{}", listener.local_addr().unwrap());
    let serial_line: Arc<Mutex<Option<String>>> = Arc::new(Mutex::new(None));

    thread::spawn(move || {
        for stream in listener.incoming() {
            let mut stream = stream.unwrap();
            let mut reader = BufReader::new(stream.try_clone().unwrap());

            let mut request_line = String::new();
            reader.read_line(&mut request_line).unwrap();
            let mut content_length = 0usize;
            loop {
                let mut header = String::new();
                reader.read_line(&mut header).unwrap();
                if let Some(value) = header.to_ascii_lowercase().strip_prefix("content-length:") {
                    content_length = value.trim().parse().unwrap();
                }
                if header == "\r\n" || header == "\n" || header.is_empty() {
                    break;
                }
            }
            let mut body = vec![0u8; content_length];
            reader.read_exact(&mut body).unwrap();

            if request_line.contains("/setMetadata") {
                let published: Metadata = serde_json::from_slice(&body).unwrap();
                let item = published
                    .items
                    .iter()
                    .find(|i| i.key == metadata::WINDOWS_KEYS)
                    .expect("windows-keys item was not published");
                let entry: WindowsKeyEntry = serde_json::from_str(&item.value).unwrap();
                if agent_answers {
                    let line = serde_json::json!({
                        "modulus": entry.modulus,
                        "encryptedPassword": agent_encrypt(&entry.modulus, &entry.exponent, PASSWORD),
                        "passwordFound": true,
                        "hashFunction": "sha1",
                        "userName": entry.user_name,
                    })
                    .to_string();
                    *serial_line.lock().unwrap() = Some(line);
                }
                respond(&mut stream, r#"{"name":"operation-1","status":"RUNNING"}"#);
            } else if request_line.contains("/serialPort") {
                let contents = match serial_line.lock().unwrap().clone() {
                    Some(line) => format!("Booting Windows...\n{line}"),
                    None => "Booting Windows...".to_string(),
                };
                let body = serde_json::json!({ "contents": contents }).to_string();
                respond(&mut stream, &body);
            } else {
                respond(
                    &mut stream,
                    r#"{"metadata":{"fingerprint":"fp","items":[{"key":"windows-keys","value":"stale"}]}}"#,
                );
            }
        }
    });

    endpoint
}

fn config(timeout: Duration) -> ResetConfig {
    ResetConfig {
        project: "my-project".into(),
        zone: "us-central1-a".into(),
        instance: "my-instance".into(),
        username: "example-user".into(),
        email: String::new(),
        port: 4,
        timeout,
    }
}

#[test]
fn resets_password_against_stubbed_api() {
    let endpoint = spawn_compute_stub(true);
    let client = ComputeClient::with_endpoint(endpoint, "token");

    let creds = reset::reset_password(&client, &config(Duration::from_secs(30))).unwrap();
    assert_eq!(creds.username, "example-user");
    assert_eq!(creds.password, PASSWORD);
}

#[test]
fn times_out_when_agent_never_answers() {
    let endpoint = spawn_compute_stub(false);
    let client = ComputeClient::with_endpoint(endpoint, "token");

    let err = reset::reset_password(&client, &config(Duration::from_secs(1))).unwrap_err();
    assert!(matches!(err, ResetError::TimedOut { port: 4, .. }));
}
