//! End-to-end tests that run the listingd binary.

use assert_cmd::cargo::CommandCargoExt;
use std::io::{BufRead, BufReader};
use std::process::{Child, Command, Stdio};
use std::time::Duration;

mod api;
mod cli;

/// A running listingd server process, bound to a random localhost port.
#[derive(Debug)]
pub struct TestServer {
    bind_addr: String,
    server_process: Child,
    http_client: reqwest::Client,
}

impl TestServer {
    /// Runs `listingd serve` against the in-memory store.
    pub async fn spawn() -> Self {
        Self::spawn_with(&[]).await
    }

    /// Runs `listingd serve` with additional arguments.
    pub async fn spawn_with(extra_args: &[&str]) -> Self {
        let mut command = Command::cargo_bin("listingd").expect("create the listingd command");
        let command = command
            .arg("serve")
            // bind to port 0 to get a random port assigned:
            .args(["--http-bind", "127.0.0.1:0"])
            .args(extra_args)
            .env("LOG_FILTER", "info")
            .stdout(Stdio::piped());

        let mut server_process = command.spawn().expect("spawn the listingd server process");

        // pipe stdout so we can get the randomly assigned port from the log output:
        let process_stdout = server_process
            .stdout
            .take()
            .expect("should acquire stdout from process");
        let mut lines = BufReader::new(process_stdout).lines();
        let bind_addr = loop {
            let Some(Ok(line)) = lines.next() else {
                panic!("stdout closed unexpectedly");
            };
            if line.contains("bound HTTP listener") {
                if let Some(address) = line.split("address=").last() {
                    break address.trim().to_string();
                }
            }
        };
        // keep draining stdout so the server never blocks on a full pipe
        std::thread::spawn(move || for _ in lines {});

        let server = Self {
            bind_addr,
            server_process,
            http_client: reqwest::Client::new(),
        };
        server.wait_until_ready().await;
        server
    }

    pub fn url(&self, path: &str) -> String {
        format!("http://{}{path}", self.bind_addr)
    }

    pub fn client(&self) -> &reqwest::Client {
        &self.http_client
    }

    async fn wait_until_ready(&self) {
        let mut retries = 0_u32;
        loop {
            if let Ok(response) = self.http_client.get(self.url("/health")).send().await {
                if response.status().is_success() {
                    break;
                }
            }
            assert!(retries < 100, "server did not become ready");
            retries += 1;
            tokio::time::sleep(Duration::from_millis(25)).await;
        }
    }

    pub fn kill(&mut self) {
        self.server_process.kill().expect("kill the server process");
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.kill();
    }
}
