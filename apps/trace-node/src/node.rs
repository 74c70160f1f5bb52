//! # Node
//!
//! Owns the contract and the transaction log and runs invocations through
//! them one at a time.
//!
//! ## Invocation Pipeline
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  line ──► Request ──► Contract::simulate                                │
//! │                           │                                             │
//! │            rejected? ─────┼──► Reply::failure (nothing written)         │
//! │                           │                                             │
//! │            query? ────────┼──► Reply::success(tx_id: null)              │
//! │                           ▼                                             │
//! │                  log.append(tx)   ── fails? ──► Reply::failure          │
//! │                           │                                             │
//! │                           ▼                                             │
//! │                  Contract::commit ── fails? ──► NodeError::Diverged     │
//! │                           │                                             │
//! │                           ▼                                             │
//! │                  Reply::success(tx_id)                                  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Requests are served strictly in order, so a simulated transaction can
//! never be overtaken before its commit.

use std::future::Future;

use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use tracing::{debug, info};
use trace_core::{Contract, MemoryLedger};
use trace_db::TransactionRepository;

use crate::error::{NodeError, NodeResult};
use crate::protocol::{Reply, Request};

pub struct Node {
    contract: Contract<MemoryLedger>,
    log: TransactionRepository,
}

impl Node {
    /// Rebuilds the ledger from `log`.
    pub async fn open(log: TransactionRepository, verify_checksum: bool) -> NodeResult<Self> {
        let mut ledger = MemoryLedger::new();
        let replayed = log.replay_into(&mut ledger).await?;

        if verify_checksum {
            let checksum = log.checksum().await?;
            info!(replayed, checksum = %checksum, "Transaction log verified");
        }

        Ok(Node {
            contract: Contract::new(ledger),
            log,
        })
    }

    pub fn contract(&self) -> &Contract<MemoryLedger> {
        &self.contract
    }

    /// Runs one request to completion.
    pub async fn handle(&mut self, request: &Request) -> NodeResult<Reply> {
        let proposal = match self.contract.simulate(&request.identity, &request.invocation) {
            Ok(proposal) => proposal,
            Err(e) => return Ok(Reply::from(e)),
        };

        let Some(tx) = proposal.transaction else {
            return Ok(Reply::success(None, proposal.response));
        };

        if let Err(e) = self.log.append(&tx).await {
            return Ok(Reply::from(e));
        }
        self.contract
            .commit(&tx)
            .map_err(|e| NodeError::Diverged {
                tx_id: tx.tx_id.clone(),
                reason: e.to_string(),
            })?;

        Ok(Reply::success(Some(tx.tx_id), proposal.response))
    }

    /// Decodes and runs one input line.
    pub async fn handle_line(&mut self, line: &str) -> NodeResult<Reply> {
        match serde_json::from_str::<Request>(line) {
            Ok(request) => self.handle(&request).await,
            Err(e) => Ok(Reply::failure("PARSE_ERROR", format!("Invalid request: {e}"))),
        }
    }

    /// Serves requests until `input` ends or `shutdown` resolves.
    ///
    /// Returns the number of requests answered.
    pub async fn serve<R, W, S>(&mut self, input: R, mut output: W, shutdown: S) -> NodeResult<usize>
    where
        R: AsyncBufRead + Unpin,
        W: AsyncWrite + Unpin,
        S: Future<Output = ()>,
    {
        let mut lines = input.lines();
        tokio::pin!(shutdown);
        let mut served = 0;

        loop {
            let line = tokio::select! {
                _ = &mut shutdown => {
                    info!("Shutdown requested, stopping intake");
                    break;
                }
                line = lines.next_line() => line?,
            };
            let Some(line) = line else {
                debug!("Input closed");
                break;
            };
            if line.trim().is_empty() {
                continue;
            }

            let reply = self.handle_line(&line).await?;
            let mut encoded = serde_json::to_vec(&reply)?;
            encoded.push(b'\n');
            output.write_all(&encoded).await?;
            output.flush().await?;
            served += 1;
        }

        Ok(served)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Value};
    use trace_db::{Database, DbConfig};

    fn request(function: &str, args: &[Value]) -> String {
        let args: Vec<String> = args
            .iter()
            .map(|arg| match arg {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            })
            .collect();
        json!({
            "identity": "x509::CN=alice,OU=client::CN=ca,O=Org",
            "function": function,
            "args": args,
        })
        .to_string()
    }

    async fn run(node: &mut Node, lines: &[String]) -> Vec<Value> {
        let input = lines.join("\n");
        let mut output = Vec::new();
        node.serve(input.as_bytes(), &mut output, std::future::pending())
            .await
            .unwrap();
        String::from_utf8(output)
            .unwrap()
            .lines()
            .map(|line| serde_json::from_str(line).unwrap())
            .collect()
    }

    #[tokio::test]
    async fn test_serve_round_trip_and_restart() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let mut node = Node::open(db.transactions(), true).await.unwrap();

        let product = json!({"ID": "P1", "Manufacturer": "M1", "ProductName": "Tea"});
        let replies = run(
            &mut node,
            &[
                request("Create", &[product.clone()]),
                String::new(),
                request("Query", &[json!({"ID": "P1", "Manufacturer": "M1"})]),
                request("Query", &[json!({"ID": "P9", "Manufacturer": "M1"})]),
                "not json".to_string(),
            ],
        )
        .await;

        assert_eq!(replies.len(), 4);
        assert_eq!(replies[0]["ok"], true);
        assert!(replies[0]["tx_id"].is_string());
        assert_eq!(replies[1]["tx_id"], Value::Null);
        assert_eq!(replies[1]["payload"]["ProductName"], "Tea");
        assert_eq!(replies[2]["code"], "NOT_FOUND");
        assert_eq!(replies[3]["code"], "PARSE_ERROR");
        assert_eq!(db.transactions().count().await.unwrap(), 1);

        // A fresh node over the same log sees the product.
        let mut restarted = Node::open(db.transactions(), false).await.unwrap();
        let replies = run(&mut restarted, &[request("Create", &[product])]).await;
        assert_eq!(replies[0]["code"], "ALREADY_EXISTS");
        assert_eq!(restarted.contract().ledger().height(), 1);
    }

    #[tokio::test]
    async fn test_shutdown_stops_intake() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let mut node = Node::open(db.transactions(), false).await.unwrap();

        let (_writer, reader) = tokio::io::duplex(64);
        let mut output = Vec::new();
        let served = node
            .serve(tokio::io::BufReader::new(reader), &mut output, async {})
            .await
            .unwrap();
        assert_eq!(served, 0);
        assert!(output.is_empty());
    }
}
