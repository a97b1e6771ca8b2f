// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Run an LLRP manager against a network interface and print discovered
//! targets live, exercising [`rdmnet::LlrpManager`]'s public API the way
//! a deployment tool would.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use clap::Parser;
use colored::Colorize;

use rdmnet::protocol::llrp::ProbeFilter;
use rdmnet::{Context, LlrpManager, LlrpManagerConfig};

#[derive(Parser, Debug)]
#[command(name = "rdmnet-llrpdump", about = "Discover LLRP-capable RDMnet components on the network")]
struct Args {
    /// Only discover brokers, skipping controllers/devices.
    #[arg(long)]
    brokers_only: bool,

    /// Only discover components with no active broker TCP connection.
    #[arg(long)]
    disconnected_only: bool,

    /// Poll interval, in milliseconds.
    #[arg(long, default_value_t = 50)]
    poll_interval_ms: u64,
}

fn main() -> rdmnet::Result<()> {
    let args = Args::parse();

    let mut filter = ProbeFilter::default();
    if args.brokers_only {
        filter = ProbeFilter::from_bits(filter.bits() | ProbeFilter::BROKERS_ONLY);
    }
    if args.disconnected_only {
        filter = ProbeFilter::from_bits(filter.bits() | ProbeFilter::CLIENT_TCP_CONNECTION_INACTIVE);
    }

    let ctx = Context::new(None)?;
    let config = LlrpManagerConfig { cid: ctx.generate_cid(), filter };
    let mut manager = LlrpManager::create(config, ctx.netints())?;

    let running = Arc::new(AtomicBool::new(true));
    let handler_flag = running.clone();
    ctrlc::set_handler(move || handler_flag.store(false, Ordering::SeqCst))
        .expect("installing Ctrl-C handler should not fail");

    println!("{}", "Starting LLRP discovery — Ctrl-C to stop".bold());
    manager.start_discovery(filter)?;

    let poll_interval = Duration::from_millis(args.poll_interval_ms);
    let mut found = 0usize;
    while running.load(Ordering::SeqCst) {
        let now = Instant::now();
        manager.tick(now)?;
        while let Some(target) = manager.poll_socket()? {
            found += 1;
            println!(
                "{} uid={} cid={} hw={} type={:?}",
                "discovered".green().bold(),
                target.uid,
                target.cid,
                target
                    .hardware_address
                    .iter()
                    .map(|b| format!("{b:02x}"))
                    .collect::<Vec<_>>()
                    .join(":"),
                target.component_type,
            );
        }
        if !manager.is_discovering() {
            break;
        }
        std::thread::sleep(poll_interval);
    }

    println!("{} {found} target(s) found", "done,".bold());
    Ok(())
}
