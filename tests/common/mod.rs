#![allow(dead_code)]

use std::time::Duration;

use async_trait::async_trait;
use serde_json::{json, Value};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, DuplexStream, Lines};
use tokio::task::JoinHandle;

use vortex::error::{Result, VortexError};
use vortex::interfaces::transport::LineSink;
use vortex::runtime::Runtime;

const RECV_TIMEOUT: Duration = Duration::from_secs(2);

/// Drives a runtime over in-memory pipes the way Maelstrom drives a node
/// over stdin/stdout.
pub struct NodeHarness {
    input: Option<DuplexStream>,
    output: Lines<BufReader<DuplexStream>>,
    task: JoinHandle<Result<()>>,
}

impl NodeHarness {
    pub fn start(runtime: Runtime) -> Self {
        let (input_tx, input_rx) = tokio::io::duplex(1 << 16);
        let (output_tx, output_rx) = tokio::io::duplex(1 << 20);
        let task = tokio::spawn(runtime.run(input_rx, output_tx));
        Self {
            input: Some(input_tx),
            output: BufReader::new(output_rx).lines(),
            task,
        }
    }

    pub async fn send(&mut self, message: Value) {
        self.send_lines(&[message.to_string()]).await;
    }

    /// Writes all lines in a single write so none can be lost to a loop
    /// that stops halfway through.
    pub async fn send_lines(&mut self, lines: &[String]) {
        let mut buf = String::new();
        for line in lines {
            buf.push_str(line);
            buf.push('\n');
        }
        self.input
            .as_mut()
            .expect("input already closed")
            .write_all(buf.as_bytes())
            .await
            .expect("write to node input");
    }

    pub async fn recv(&mut self) -> Value {
        let line = tokio::time::timeout(RECV_TIMEOUT, self.output.next_line())
            .await
            .expect("timed out waiting for node output")
            .expect("read node output")
            .expect("node output closed");
        serde_json::from_str(&line).expect("node output is one JSON document per line")
    }

    pub async fn init(&mut self, node_id: &str, node_ids: &[&str]) {
        self.send(json!({
            "src": "c0",
            "dest": node_id,
            "body": {"type": "init", "msg_id": 1, "node_id": node_id, "node_ids": node_ids}
        }))
        .await;
        let reply = self.recv().await;
        assert_eq!(reply["body"]["type"], "init_ok");
    }

    /// Closes the input, waits for the loop to stop and returns whatever it
    /// still wrote before its output closed.
    pub async fn finish(mut self) -> (Result<()>, Vec<Value>) {
        drop(self.input.take());
        let result = tokio::time::timeout(Duration::from_secs(5), self.task)
            .await
            .expect("node did not stop")
            .expect("node task panicked");

        let mut rest = Vec::new();
        while let Some(line) = tokio::time::timeout(RECV_TIMEOUT, self.output.next_line())
            .await
            .expect("node output never closed")
            .expect("read node output")
        {
            rest.push(serde_json::from_str(&line).expect("valid JSON line"));
        }
        (result, rest)
    }
}

pub struct FailingSink;

#[async_trait]
impl LineSink for FailingSink {
    async fn write_line(&self, _line: &[u8]) -> Result<()> {
        Err(VortexError::Transport("broken pipe".to_string()))
    }
}

pub fn request(src: &str, dest: &str, body: Value) -> Value {
    json!({"src": src, "dest": dest, "body": body})
}
