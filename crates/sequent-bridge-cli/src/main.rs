//! # Sequent Bridge CLI
//!
//! Offline utilities for inspecting signal catalogs, topics and payloads.

use anyhow::{Context, Result};
use sequent_bridge_core::catalog::{self, Domain, Edge};
use sequent_bridge_core::{Family, SignalSpec};
use sequent_bridge_proto::{parse_payload, Inbound, TopicScheme};
use std::env;

const DEFAULT_CHALLENGE: &str = "heartbeat/challenge";

fn main() -> Result<()> {
    let args: Vec<String> = env::args().collect();

    if args.len() < 2 {
        print_help();
        return Ok(());
    }

    match args[1].as_str() {
        "catalog" => {
            if args.len() < 3 {
                eprintln!("Usage: sequent-bridge catalog <family>");
                std::process::exit(1);
            }
            let family: Family = args[2].parse().context("Unknown board family")?;
            for spec in catalog::signals(family) {
                println!("{}", describe(spec));
            }
        }
        "topic" => {
            if args.len() < 4 {
                eprintln!("Usage: sequent-bridge topic <base> <topic> [challenge]");
                std::process::exit(1);
            }
            let challenge = args.get(4).map_or(DEFAULT_CHALLENGE, String::as_str);
            let scheme = TopicScheme::new(args[2].as_str(), challenge, "");
            match scheme.parse(&args[3]) {
                Some(Inbound::Command(command)) => println!(
                    "command board={} signal={} channel={}",
                    command.board, command.signal, command.channel
                ),
                Some(Inbound::StateRequest) => println!("state request"),
                Some(Inbound::Challenge) => println!("heartbeat challenge"),
                None => {
                    eprintln!("Not an inbound topic: {}", args[3]);
                    std::process::exit(2);
                }
            }
        }
        "payload" => {
            if args.len() < 3 {
                eprintln!("Usage: sequent-bridge payload <text>");
                std::process::exit(1);
            }
            let value = parse_payload(args[2].as_bytes()).context("Invalid payload")?;
            println!("{value:?}");
        }
        "help" | "--help" | "-h" => {
            print_help();
        }
        cmd => {
            eprintln!("Unknown command: {cmd}");
            print_help();
            std::process::exit(1);
        }
    }

    Ok(())
}

fn describe(spec: &SignalSpec) -> String {
    let domain = match spec.domain {
        Domain::Analog { min, max } => format!("analog {min}..={max}"),
        Domain::Measurement => "measurement".to_string(),
        Domain::Binary => "binary".to_string(),
        Domain::Counter => "counter".to_string(),
        Domain::EdgeEnable { edge, companion } => {
            let edge = match edge {
                Edge::Rising => "rising",
                Edge::Falling => "falling",
            };
            format!("{edge} edge enable, pairs with {companion}")
        }
        Domain::ResetPulse { counter } => format!("reset pulse for {counter}"),
    };
    format!(
        "{:<8} {:<12} 1..={}  {domain}",
        spec.direction.as_str(),
        spec.name,
        spec.arity
    )
}

fn print_help() {
    println!(
        r#"Sequent Bridge CLI

USAGE:
    sequent-bridge <COMMAND> [OPTIONS]

COMMANDS:
    catalog <family>                  List the signals of a board family
    topic <base> <topic> [challenge]  Parse an inbound topic
    payload <text>                    Check a command payload
    help                              Show this help message

FAMILIES:
    megaind, megabas, 8relind, 8inputs, rtd

EXAMPLES:
    sequent-bridge catalog megabas
    sequent-bridge topic plant plant/megabas/0/output/triac/2
    sequent-bridge payload 4.25
"#
    );
}
