//! Poll-loop client that greets an echo server and prints what comes back.
//!
//! Run an echo server on port 9001, then:
//!   cargo run --example echo_client -- 127.0.0.1 9001 /

use std::error::Error;
use std::time::Duration;

use embedws::transport::TcpTransport;
use embedws::{Config, ConnectionConfig, WebSocketClient};

fn main() -> Result<(), Box<dyn Error>> {
    simple_logger::init_with_level(log::Level::Debug)?;

    let mut args = std::env::args().skip(1);
    let host = args.next().unwrap_or_else(|| "127.0.0.1".to_string());
    let port: u16 = args.next().map(|p| p.parse::<u16>()).transpose()?.unwrap_or(9001);
    let path = args.next().unwrap_or_else(|| "/".to_string());

    let transport = TcpTransport::new().with_connect_timeout(Duration::from_secs(5));
    let config = Config::embedded().with_retry_interval(Duration::from_secs(3));
    let mut client = WebSocketClient::new(transport, config);

    let mut sent = 0u32;
    client.set_on_open(move |session| {
        sent += 1;
        if let Err(e) = session.send(&format!("hello #{sent}")) {
            log::warn!("greeting failed: {e}");
        }
    });
    client.set_on_message(|_session, text| log::info!("received: {text}"));
    client.set_on_close(|frame| log::info!("closed: {} {}", frame.code.as_u16(), frame.reason));
    client.set_on_error(|err| log::error!("{err}"));

    client.connect(ConnectionConfig::new(host, port).path(path));

    loop {
        client.poll();
        if !client.state().is_active() {
            break;
        }
        std::thread::sleep(Duration::from_millis(10));
    }
    Ok(())
}
