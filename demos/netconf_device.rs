// Copyright 2020 Joyent, Inc.

//! A toy NETCONF device. Usage: netconf-device [address] [session-config.json]

use std::env;
use std::net::SocketAddr;
use std::process;
use std::sync::Mutex;

use chrono::prelude::*;
use slog::{debug, error, info, o, Drain, Logger};
use tokio::net::TcpListener;

use netconf_wire::config::SessionConfig;
use netconf_wire::message::{ErrorType, NetconfMessage, RpcErrorInfo};
use netconf_wire::server;

const DEVICE_NS: &str = "urn:example:netconf-device";

static RUNNING_CONFIG: &str = "<interfaces xmlns=\"urn:example:interfaces\">\
     <interface><name>eth0</name><enabled>true</enabled></interface>\
     </interfaces>";

fn date_handler(log: &Logger) -> Result<String, RpcErrorInfo> {
    debug!(log, "handling date request");
    let now = Utc::now();
    Ok(format!(
        "<data><clock xmlns=\"{}\"><timestamp>{}</timestamp><iso8601>{}</iso8601></clock></data>",
        DEVICE_NS,
        now.timestamp_millis(),
        now.to_rfc3339()
    ))
}

fn echo_handler(msg: &NetconfMessage, log: &Logger) -> Result<String, RpcErrorInfo> {
    debug!(log, "handling echo request");
    msg.inner_xml()
        .map(str::to_string)
        .map_err(|e| RpcErrorInfo::new(ErrorType::Rpc, "malformed-message", &e.to_string()))
}

fn get_config_handler(msg: &NetconfMessage, log: &Logger) -> Result<String, RpcErrorInfo> {
    debug!(log, "handling get-config request");
    let body = msg.inner_xml().unwrap_or_default();
    if body.contains("<running/>") {
        Ok(format!("<data>{}</data>", RUNNING_CONFIG))
    } else {
        Err(
            RpcErrorInfo::new(ErrorType::Protocol, "invalid-value", "only the running datastore exists")
                .with_info("bad-element", "source"),
        )
    }
}

fn msg_handler(msg: &NetconfMessage, log: &Logger) -> Result<String, RpcErrorInfo> {
    let operation = msg.rpc_operation().ok().flatten().unwrap_or_default();
    match operation.as_str() {
        "get" | "date" => date_handler(log),
        "echo" => echo_handler(msg, log),
        "get-config" => get_config_handler(msg, log),
        _ => Err(RpcErrorInfo::operation_not_supported(&operation)),
    }
}

#[tokio::main]
async fn main() {
    let plain = slog_term::PlainSyncDecorator::new(std::io::stdout());
    let root_log = Logger::root(
        Mutex::new(slog_term::FullFormat::new(plain).build()).fuse(),
        o!("build-id" => "0.1.0"),
    );

    let addr = env::args().nth(1).unwrap_or_else(|| "127.0.0.1:8300".to_string());
    let addr = addr.parse::<SocketAddr>().unwrap_or_else(|e| {
        eprintln!("Failed to parse address: {}", e);
        process::exit(1)
    });
    let config = match env::args().nth(2) {
        Some(path) => SessionConfig::from_file(&path).unwrap_or_else(|e| {
            eprintln!("Failed to load {}: {}", path, e);
            process::exit(1)
        }),
        None => SessionConfig::default(),
    };

    let listener = TcpListener::bind(&addr).await.expect("failed to bind");
    info!(root_log, "listening for netconf sessions"; "address" => addr);

    loop {
        match listener.accept().await {
            Ok((socket, peer)) => {
                let process_log = root_log.new(o!("peer" => peer.to_string()));
                server::make_task(socket, msg_handler, config.clone(), Some(&process_log));
            }
            Err(e) => error!(root_log, "failed to accept socket"; "err" => %e),
        }
    }
}
