// Copyright 2020 Joyent, Inc.

use std::net::SocketAddr;
use std::process;

use clap::{crate_version, value_t, App, Arg, ArgMatches};
use tokio::net::TcpStream;

use netconf_wire::client;
use netconf_wire::config::ClientConfig;
use netconf_wire::error::RequestError;

static APP: &'static str = "netconf-call";
static DEFAULT_HOST: &'static str = "127.0.0.1";
const DEFAULT_PORT: u32 = 8300;

pub fn parse_opts<'a, 'b>(app: String) -> ArgMatches<'a> {
    App::new(app)
        .about("Command-line tool for sending a NETCONF rpc")
        .version(crate_version!())
        .arg(
            Arg::with_name("host")
                .help("DNS name or IP address for remote device")
                .long("host")
                .short("h")
                .takes_value(true)
                .required(false),
        )
        .arg(
            Arg::with_name("port")
                .help("TCP port for remote device (Default: 8300)")
                .long("port")
                .short("p")
                .takes_value(true),
        )
        .arg(
            Arg::with_name("rpc")
                .help("XML body of the rpc, e.g. '<get/>'")
                .long("rpc")
                .short("r")
                .takes_value(true)
                .required(true),
        )
        .arg(
            Arg::with_name("config")
                .help("Client configuration file (JSON)")
                .long("config")
                .short("c")
                .takes_value(true),
        )
        .arg(
            Arg::with_name("count")
                .help("Number of times to send the rpc (Default: 1)")
                .long("count")
                .short("n")
                .takes_value(true),
        )
        .get_matches()
}

#[tokio::main]
async fn main() {
    let matches = parse_opts(APP.to_string());
    let host = String::from(matches.value_of("host").unwrap_or(DEFAULT_HOST));
    let port = value_t!(matches, "port", u32).unwrap_or(DEFAULT_PORT);
    let count = value_t!(matches, "count", u32).unwrap_or(1);
    let addr = [host, String::from(":"), port.to_string()]
        .concat()
        .parse::<SocketAddr>()
        .unwrap_or_else(|e| {
            eprintln!("Failed to parse host and port as valid socket address: {}", e);
            process::exit(1)
        });
    let rpc = String::from(matches.value_of("rpc").unwrap_or_else(|| {
        eprintln!("Failed to parse rpc argument as String");
        process::exit(1)
    }));
    let config = match matches.value_of("config") {
        Some(path) => ClientConfig::from_file(path).unwrap_or_else(|e| {
            eprintln!("Failed to load {}: {}", path, e);
            process::exit(1)
        }),
        None => ClientConfig::default(),
    };

    let stream = TcpStream::connect(&addr).await.unwrap_or_else(|e| {
        eprintln!("Failed to connect to device: {}", e);
        process::exit(1)
    });
    let session = client::connect(stream, &config, None).await.unwrap_or_else(|e| {
        eprintln!("Failed to establish session: {}", e);
        process::exit(1)
    });
    eprintln!("{}", session.session());

    for _ in 0..count {
        match session.rpc(&rpc).await {
            Ok(reply) => println!("{}", reply),
            Err(RequestError::Protocol(e)) => {
                for err in e.errors {
                    eprintln!("rpc-error: {}", err);
                }
            }
            Err(e) => {
                eprintln!("Error: {}", e);
                process::exit(1)
            }
        }
    }

    if let Err(e) = session.close().await {
        eprintln!("Error closing session: {}", e);
    }
}
