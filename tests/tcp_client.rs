use std::io::Read;
use std::net::{TcpListener, TcpStream};
use std::thread;
use std::time::Duration;

use opc_client::protocol::opc::{parse_header, CMD_SET_PIXELS, HEADER_LEN};
use opc_client::{ClientConfig, Color, OpcClient};

fn read_message(stream: &mut TcpStream) -> (u8, u8, Vec<u8>) {
    let mut header = [0u8; HEADER_LEN];
    stream.read_exact(&mut header).unwrap();
    let header = parse_header(&header).unwrap();
    let mut payload = vec![0u8; header.length as usize];
    stream.read_exact(&mut payload).unwrap();
    (header.channel, header.command, payload)
}

fn client_for(listener: &TcpListener) -> OpcClient {
    let mut config = ClientConfig::new(listener.local_addr().unwrap().to_string(), 10, 10);
    config.flush_interval_ms = 20;
    OpcClient::from_config(config).unwrap()
}

#[test]
fn streams_frames_to_server() {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let mut client = client_for(&listener);
    client.register_strip(0, 5, 4.0, 2.0, 1.0, 0.0, true);

    let pixels: Vec<Color> = (0..100u8).map(|i| Color::from_argb(0x7F, i, i + 1, i + 2)).collect();
    client.submit_frame(pixels.clone());
    let handle = client.handle();
    let worker = thread::spawn(move || client.run());

    let (mut stream, _) = listener.accept().unwrap();
    stream.set_read_timeout(Some(Duration::from_secs(5))).unwrap();
    let (channel, command, payload) = read_message(&mut stream);
    handle.stop();
    worker.join().unwrap();

    assert_eq!(channel, 0);
    assert_eq!(command, CMD_SET_PIXELS);
    assert_eq!(payload.len(), 15);

    // Reversed strip: logical LED 0 is the rightmost pixel (6, 2)
    let expected: Vec<u8> = [26, 25, 24, 23, 22]
        .iter()
        .flat_map(|&offset: &usize| pixels[offset].to_rgb_bytes())
        .collect();
    assert_eq!(payload, expected);
}

#[test]
fn reconnects_after_server_restart() {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let mut client = client_for(&listener);
    client.register_led(0, 1, 1);
    client.submit_frame(vec![Color::rgb(10, 20, 30); 100]);
    let handle = client.handle();
    let worker = thread::spawn(move || client.run());

    // Take one frame, then hang up
    {
        let (mut stream, _) = listener.accept().unwrap();
        stream.set_read_timeout(Some(Duration::from_secs(5))).unwrap();
        let (_, _, payload) = read_message(&mut stream);
        assert_eq!(payload, vec![10, 20, 30]);
    }

    // The client notices on a later write and dials again
    let (mut stream, _) = listener.accept().unwrap();
    stream.set_read_timeout(Some(Duration::from_secs(5))).unwrap();
    let (_, _, payload) = read_message(&mut stream);
    assert_eq!(payload, vec![10, 20, 30]);

    handle.stop();
    worker.join().unwrap();
    let stats = handle.stats();
    assert!(stats.connect_attempts >= 2);
    assert!(stats.packets_sent >= 2);
}

#[test]
fn tolerates_missing_server() {
    // Nothing listens on this port once the listener is dropped
    let addr = TcpListener::bind("127.0.0.1:0").unwrap().local_addr().unwrap();
    let mut config = ClientConfig::new(addr.to_string(), 4, 4);
    config.flush_interval_ms = 10;
    config.connect_timeout_ms = 100;
    let mut client = OpcClient::from_config(config).unwrap();
    client.register_led(0, 0, 0);
    client.submit_frame(vec![Color::WHITE; 16]);
    let handle = client.handle();
    let worker = thread::spawn(move || client.run());

    thread::sleep(Duration::from_millis(100));
    handle.stop();
    worker.join().unwrap();

    let stats = handle.stats();
    assert!(stats.connect_failures >= 1);
    assert_eq!(stats.connect_failures, stats.connect_attempts);
    assert_eq!(stats.packets_sent, 0);
}
