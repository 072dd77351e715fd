// netsdr test application -- interactive CLI for exercising a NetSDR
// receiver (or anything speaking its control protocol) from a terminal.
//
// Usage:
//   netsdr-test-app --host 192.168.1.100
//   netsdr-test-app --host localhost --tcp-port 50000 --udp-port 60000 \
//       --frequency 14250000 --output iq.bin
//
// Once running, single-letter commands drive the client:
//   c  connect and configure the receiver
//   d  disconnect
//   f  tune to the configured frequency
//   s  toggle IQ streaming (start if stopped, stop if started)
//   q  quit

use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::EnvFilter;

use netsdr::{
    ClientEvent, FileSampleSink, NetSdrClient, TcpControlChannel, UdpStreamChannel,
};

/// Receiver channel used for tuning and capture.
const CHANNEL: u8 = 1;

/// netsdr test application -- drives a receiver from the command line.
#[derive(Parser)]
#[command(name = "netsdr-test-app", version, about)]
struct Cli {
    /// Receiver hostname or IP address.
    #[arg(long)]
    host: String,

    /// Control port on the receiver.
    #[arg(long, default_value_t = 50000)]
    tcp_port: u16,

    /// Local port to receive IQ datagrams on.
    #[arg(long, default_value_t = 60000)]
    udp_port: u16,

    /// Frequency in hertz for the `f` command (e.g. 14250000).
    #[arg(long, default_value_t = 14_250_000)]
    frequency: u64,

    /// File to append decoded IQ samples to (s16le).
    #[arg(long, default_value = "iq.bin")]
    output: String,
}

fn print_help() {
    println!("Commands:");
    println!("  c  connect and configure the receiver");
    println!("  d  disconnect");
    println!("  f  tune to the configured frequency");
    println!("  s  toggle IQ streaming");
    println!("  q  quit");
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    let control = Arc::new(TcpControlChannel::new(format!(
        "{}:{}",
        cli.host, cli.tcp_port
    )));
    let stream = Arc::new(UdpStreamChannel::new(cli.udp_port));
    let sink = Arc::new(
        FileSampleSink::create(&cli.output)
            .await
            .with_context(|| format!("failed to open output file {}", cli.output))?,
    );

    let client = NetSdrClient::new(control, stream, sink);

    // Print control traffic as it arrives.
    let mut events = client.subscribe();
    tokio::spawn(async move {
        while let Ok(event) = events.recv().await {
            match event {
                ClientEvent::Connected => println!("[event] connected"),
                ClientEvent::Disconnected => println!("[event] disconnected"),
                ClientEvent::ControlMessage(bytes) => {
                    println!("[event] control message: {:02X?}", bytes);
                }
            }
        }
    });

    println!(
        "netsdr-test-app -- receiver {}:{}, IQ on UDP {}, output {}",
        cli.host, cli.tcp_port, cli.udp_port, cli.output
    );
    print_help();

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        match line.trim() {
            "c" => match client.connect().await {
                Ok(()) => println!("Connected."),
                Err(e) => println!("Connect failed: {e}"),
            },
            "d" => {
                client.disconnect().await;
                println!("Disconnected.");
            }
            "f" => {
                if !client.is_connected() {
                    println!("Not connected.");
                    continue;
                }
                match client.change_frequency(cli.frequency, CHANNEL).await {
                    Ok(()) => println!("Tuned to {} Hz.", cli.frequency),
                    Err(e) => println!("Tune failed: {e}"),
                }
            }
            "s" => {
                if !client.is_connected() {
                    println!("Not connected.");
                    continue;
                }
                if client.iq_started() {
                    match client.stop_iq().await {
                        Ok(()) => println!("IQ streaming stopped."),
                        Err(e) => println!("Stop failed: {e}"),
                    }
                } else {
                    match client.start_iq().await {
                        Ok(()) => println!("IQ streaming started."),
                        Err(e) => println!("Start failed: {e}"),
                    }
                }
            }
            "q" => break,
            "" => {}
            other => {
                println!("Unknown command: {other}");
                print_help();
            }
        }
    }

    client.disconnect().await;
    Ok(())
}
