//! # Citrine Node
//!
//! A standalone CLI demo of the Citrine ledger stack: append blocks,
//! inspect the hash chain and Merkle commitments, and watch gossip fan-out
//! across in-memory peer connections.
//!
//! ## Ledger model
//!
//! ```text
//! block[i].previous_hash == block[i-1].hash
//! block[i].merkle_root   == Merkle root over its transaction payloads
//! gossip: submit → append → announce new block to every registered peer
//! ```

use std::collections::HashMap;
use std::io::{self, Write};
use std::sync::Arc;

use clap::{Parser, Subcommand};
use colored::*;
use mgl_gossip::protocol::decode_response;
use mgl_gossip::{ControlResponse, LedgerNode, MemoryConn, NodeConfigBuilder, PeerId};

// ─── CLI ───────────────────────────────────────────────────────────────────

#[derive(Parser)]
#[command(name = "citrine-node")]
#[command(about = "Append-only Merkle ledger node with gossip fan-out")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Basic demo: single node appends blocks and shows the chain
    Demo,
    /// Gossip scenario: three peers, fan-out, and a dropped-peer failure
    Gossip,
    /// Interactive REPL for manual experimentation
    Interactive,
}

// ─── Pretty printing ──────────────────────────────────────────────────────

fn header(text: &str) {
    let bar = "═".repeat(60);
    println!("\n{}", bar.bright_cyan());
    println!("  {}", text.bold().bright_white());
    println!("{}", bar.bright_cyan());
}

fn section(text: &str) {
    println!("\n{} {}", "▸".bright_yellow(), text.bold());
}

fn step(text: &str) {
    println!("  {} {}", "•".bright_green(), text);
}

fn gossip_arrow(from: &str, to: &str) {
    println!(
        "  {} {} {} {}",
        from.bright_magenta(),
        "──block──▶".bright_cyan(),
        to.bright_magenta(),
        "✓".bright_green()
    );
}

fn show_chain(node: &LedgerNode) {
    let border = "─".repeat(56);
    let chain = node.chain();
    println!("  ┌{}┐", border);
    println!(
        "  │ {:^54} │",
        format!("Node: {} ({} blocks)", node.node_id(), chain.len())
            .bright_yellow()
            .to_string()
    );
    println!("  ├{}┤", border);

    for (i, block) in chain.iter().enumerate() {
        let label = if block.is_genesis() {
            "genesis".to_string()
        } else {
            format!("{} tx", block.transactions.len())
        };
        let line = format!(
            "  #{:<3} {}  prev:{}  root:{}  {}",
            i,
            block.hash.short(),
            block.previous_hash.short(),
            block.merkle_root.short(),
            label
        );
        println!("  │ {:<54} │", line);
    }
    println!("  └{}┘", border);
}

fn integrity_result(valid: bool) {
    if valid {
        println!(
            "\n  {} {}",
            "✓".bright_green().bold(),
            "CHAIN INTACT — every link and hash verifies!"
                .bright_green()
                .bold()
        );
    } else {
        println!(
            "\n  {} {}",
            "✗".bright_red().bold(),
            "CHAIN BROKEN — a link or hash failed verification!"
                .bright_red()
                .bold()
        );
    }
}

// ─── Demo ──────────────────────────────────────────────────────────────────

async fn run_demo() {
    header("DEMO — Appending Blocks & Merkle Commitments");

    let node = LedgerNode::new(NodeConfigBuilder::new().node_id("solo").build());

    section("Phase 1: Fresh ledger");
    show_chain(&node);
    step("Genesis: zero previous hash, sentinel empty-tree Merkle root");

    section("Phase 2: Submit transactions");
    let b1 = node.submit("alice pays bob 5").await;
    step(&format!("block 1 appended: {}", b1.hash.short()));
    let b2 = node.submit("bob pays carol 3").await;
    step(&format!("block 2 appended: {}", b2.hash.short()));
    show_chain(&node);

    section("Phase 3: Merkle commitment of the latest block");
    let tree = node.merkle();
    step(&format!(
        "leaf count = {}, root = {}",
        tree.leaf_count(),
        tree.root_hash().short()
    ));
    step(&format!(
        "root matches block header: {}",
        tree.root_hash() == b2.merkle_root
    ));

    integrity_result(node.ledger().verify());
}

// ─── Gossip ────────────────────────────────────────────────────────────────

async fn run_gossip() {
    header("GOSSIP — Fan-out With a Dropped Peer");

    let node = Arc::new(LedgerNode::new(
        NodeConfigBuilder::new().node_id("hub").build(),
    ));

    section("Phase 1: Three peers connect");
    let mut remotes = Vec::new();
    let mut locals = Vec::new();
    for name in ["peer-1", "peer-2", "peer-3"] {
        let (local, remote) = MemoryConn::pair(name, "hub");
        let local = Arc::new(local);
        node.on_connection_opened(local.clone()).await;
        // Drain the chain + merkle greeting.
        remote.recv().await;
        remote.recv().await;
        step(&format!("{} registered and greeted with the chain", name));
        locals.push(local);
        remotes.push(remote);
    }

    section("Phase 2: A submission fans out to every peer");
    let block = node.submit("hub pays everyone 1").await;
    for (name, remote) in ["peer-1", "peer-2", "peer-3"].iter().zip(&remotes) {
        if let Some(frame) = remote.try_recv().await {
            if matches!(decode_response(&frame), Ok(ControlResponse::Block(b)) if b == block) {
                gossip_arrow("hub", name);
            }
        }
    }

    section("Phase 3: peer-2 dies; fan-out continues for the rest");
    locals[1].set_broken(true);
    step("peer-2 connection broken");

    let report = node.broadcast_latest().await;
    step(&format!(
        "attempted {} / delivered {} / dropped {:?}",
        report.attempted,
        report.delivered,
        report
            .dropped
            .iter()
            .map(|p| p.to_string())
            .collect::<Vec<_>>()
    ));
    step(&format!(
        "registry now holds {} peers",
        node.registry().len()
    ));

    show_chain(&node);
    integrity_result(node.ledger().verify());
}

// ─── Interactive REPL ──────────────────────────────────────────────────────

async fn run_interactive() {
    header("INTERACTIVE REPL — Citrine Ledger Node");

    let node = Arc::new(LedgerNode::new(
        NodeConfigBuilder::new().node_id("repl").build(),
    ));
    let mut remotes: HashMap<String, MemoryConn> = HashMap::new();

    println!();
    println!("  {}", "Commands:".bold().underline());
    println!(
        "    {} <payload>            Append a block with one transaction",
        "submit".bright_cyan()
    );
    println!(
        "    {}                      Show the full chain",
        "chain".bright_cyan()
    );
    println!(
        "    {}                     Show the latest block's Merkle tree",
        "merkle".bright_cyan()
    );
    println!(
        "    {} <name>                Connect a new in-memory peer",
        "peer".bright_cyan()
    );
    println!(
        "    {} <name>                Disconnect a peer",
        "drop".bright_cyan()
    );
    println!(
        "    {}                      List registered peers",
        "peers".bright_cyan()
    );
    println!(
        "    {} <name>               Show frames a peer has received",
        "inbox".bright_cyan()
    );
    println!(
        "    {}                     Verify every link and hash",
        "verify".bright_cyan()
    );
    println!(
        "    {}                       Exit",
        "quit".bright_cyan()
    );
    println!();

    loop {
        print!("{}", "citrine> ".bright_cyan().bold());
        io::stdout().flush().unwrap();

        let mut input = String::new();
        if io::stdin().read_line(&mut input).is_err() || input.is_empty() {
            break;
        }
        let parts: Vec<&str> = input.trim().splitn(2, ' ').collect();
        if parts.is_empty() || parts[0].is_empty() {
            continue;
        }

        match parts[0] {
            "submit" | "s" => {
                let Some(payload) = parts.get(1) else {
                    println!("  {} Usage: submit <payload>", "!".bright_red());
                    continue;
                };
                let block = node.submit(payload.trim().as_bytes().to_vec()).await;
                step(&format!(
                    "block #{} appended: {} (root {})",
                    node.chain().len() - 1,
                    block.hash.short(),
                    block.merkle_root.short()
                ));
            }

            "chain" | "c" => show_chain(&node),

            "merkle" | "m" => {
                let tree = node.merkle();
                if tree.is_empty() {
                    println!(
                        "  {} latest block carries no transactions (sentinel root {})",
                        "○".bright_yellow(),
                        tree.root_hash().short()
                    );
                } else {
                    step(&format!(
                        "{} leaves, root {}",
                        tree.leaf_count(),
                        tree.root_hash().short()
                    ));
                }
            }

            "peer" | "p" => {
                let Some(name) = parts.get(1).map(|s| s.trim().to_string()) else {
                    println!("  {} Usage: peer <name>", "!".bright_red());
                    continue;
                };
                if remotes.contains_key(&name) {
                    println!("  {} Peer '{}' already exists", "!".bright_yellow(), name);
                    continue;
                }
                let (local, remote) = MemoryConn::pair(name.clone(), "repl");
                node.on_connection_opened(Arc::new(local)).await;
                remotes.insert(name.clone(), remote);
                step(&format!("peer '{}' connected (greeted with chain)", name));
            }

            "drop" | "d" => {
                let Some(name) = parts.get(1).map(|s| s.trim().to_string()) else {
                    println!("  {} Usage: drop <name>", "!".bright_red());
                    continue;
                };
                if remotes.remove(&name).is_some() {
                    node.on_connection_closed(&PeerId::new(name.clone())).await;
                    step(&format!("peer '{}' disconnected", name));
                } else {
                    println!("  {} Unknown peer '{}'", "!".bright_red(), name);
                }
            }

            "peers" | "ls" => {
                let ids = node.registry().peer_ids();
                if ids.is_empty() {
                    println!("  {}", "(no peers)".dimmed());
                } else {
                    for id in ids {
                        step(&format!("{}", id));
                    }
                }
            }

            "inbox" | "i" => {
                let Some(name) = parts.get(1).map(|s| s.trim()) else {
                    println!("  {} Usage: inbox <name>", "!".bright_red());
                    continue;
                };
                match remotes.get(name) {
                    Some(remote) => {
                        let mut count = 0;
                        while let Some(frame) = remote.try_recv().await {
                            count += 1;
                            match decode_response(&frame) {
                                Ok(ControlResponse::Block(b)) => {
                                    step(&format!("block announcement: {}", b.hash.short()))
                                }
                                Ok(ControlResponse::Chain(c)) => {
                                    step(&format!("chain snapshot ({} blocks)", c.len()))
                                }
                                Ok(ControlResponse::Merkle(t)) => {
                                    step(&format!("merkle snapshot ({} leaves)", t.leaf_count()))
                                }
                                Err(_) => step("unparseable frame"),
                            }
                        }
                        if count == 0 {
                            println!("  {}", "(inbox empty)".dimmed());
                        }
                    }
                    None => println!("  {} Unknown peer '{}'", "!".bright_red(), name),
                }
            }

            "verify" | "v" => integrity_result(node.ledger().verify()),

            "quit" | "exit" | "q" => {
                println!("  {}", "Goodbye!".dimmed());
                break;
            }

            "help" | "h" | "?" => {
                println!("  submit <payload> | chain | merkle | verify");
                println!("  peer <name> | drop <name> | peers | inbox <name> | quit");
            }

            other => {
                println!(
                    "  {} Unknown command '{}' — type 'help'",
                    "?".bright_yellow(),
                    other
                );
            }
        }
    }
}

// ─── Entry point ───────────────────────────────────────────────────────────

#[tokio::main(flavor = "current_thread")]
async fn main() {
    let cli = Cli::parse();

    match cli.command {
        Commands::Demo => run_demo().await,
        Commands::Gossip => run_gossip().await,
        Commands::Interactive => run_interactive().await,
    }
}
