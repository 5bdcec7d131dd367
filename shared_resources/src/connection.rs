/// ----- CONNECTION MODULE -----
/// Length-prefixed message transport between the controller and its
/// peers. Every message on the wire is a 32-bit big-endian payload
/// length followed by exactly that many bytes of ASCII text, with no
/// terminator.

use std::io::{self, Read, Write};
use std::net::{SocketAddr, TcpListener, TcpStream};

use socket2::{Domain, Protocol, Socket, Type};

/// Payloads larger than this are treated as framing corruption rather
/// than honest traffic.
const MAX_PAYLOAD_LEN: u32 = 1024;

pub fn bind_listener(addr: SocketAddr) -> io::Result<TcpListener> {
    let socket = Socket::new(Domain::IPV4, Type::STREAM, Some(Protocol::TCP))?;
    socket.set_reuse_address(true)?;
    socket.bind(&addr.into())?;
    socket.listen(16)?;
    Ok(socket.into())
}

pub fn connect(addr: SocketAddr) -> io::Result<TcpStream> {
    TcpStream::connect(addr)
}

pub fn send_message(stream: &mut TcpStream, payload: &str) -> io::Result<()> {
    let length = payload.len() as u32;
    stream.write_all(&length.to_be_bytes())?;
    stream.write_all(payload.as_bytes())?;
    Ok(())
}

pub fn receive_message(stream: &mut TcpStream) -> io::Result<String> {
    let mut header = [0u8; 4];
    stream.read_exact(&mut header)?;
    let length = u32::from_be_bytes(header);
    if length > MAX_PAYLOAD_LEN {
        return Err(io::Error::new(
            io::ErrorKind::InvalidData,
            format!("oversized frame of {} bytes", length),
        ));
    }
    let mut payload = vec![0u8; length as usize];
    stream.read_exact(&mut payload)?;
    String::from_utf8(payload)
        .map_err(|_| io::Error::new(io::ErrorKind::InvalidData, "frame is not valid text"))
}

/// Non-blocking poll for a complete frame header. Returns `Ok(None)`
/// when no message is pending; once the header has arrived the rest of
/// the frame is read blocking.
pub fn try_receive_message(stream: &mut TcpStream) -> io::Result<Option<String>> {
    stream.set_nonblocking(true)?;
    let mut header = [0u8; 4];
    let peeked = stream.peek(&mut header);
    stream.set_nonblocking(false)?;
    match peeked {
        Ok(0) => Err(io::ErrorKind::UnexpectedEof.into()),
        Ok(n) if n < header.len() => Ok(None),
        Ok(_) => receive_message(stream).map(Some),
        Err(e) if e.kind() == io::ErrorKind::WouldBlock => Ok(None),
        Err(e) => Err(e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::{IpAddr, Ipv4Addr};
    use std::thread;

    fn local_pair() -> (TcpStream, TcpStream) {
        let addr = SocketAddr::new(IpAddr::V4(Ipv4Addr::LOCALHOST), 0);
        let listener = bind_listener(addr).unwrap();
        let target = listener.local_addr().unwrap();
        let client = thread::spawn(move || connect(target).unwrap());
        let (server, _) = listener.accept().unwrap();
        (client.join().unwrap(), server)
    }

    #[test]
    fn messages_round_trip() {
        let (mut a, mut b) = local_pair();
        for payload in ["CALL 1 3", "STATUS Closed B1 B1", "", "UNAVAILABLE"] {
            send_message(&mut a, payload).unwrap();
            assert_eq!(receive_message(&mut b).unwrap(), payload);
        }
    }

    #[test]
    fn header_counts_payload_bytes_only() {
        let (mut a, b) = local_pair();
        send_message(&mut a, "FLOOR 7").unwrap();
        let mut raw = [0u8; 11];
        (&b).read_exact(&mut raw).unwrap();
        assert_eq!(&raw[..4], &7u32.to_be_bytes());
        assert_eq!(&raw[4..], b"FLOOR 7");
    }

    #[test]
    fn try_receive_reports_pending_and_idle() {
        let (mut a, mut b) = local_pair();
        assert_eq!(try_receive_message(&mut b).unwrap(), None);
        send_message(&mut a, "FLOOR 2").unwrap();
        // Wait for the frame to land in the receive buffer.
        let mut received = None;
        for _ in 0..50 {
            received = try_receive_message(&mut b).unwrap();
            if received.is_some() {
                break;
            }
            thread::sleep(std::time::Duration::from_millis(10));
        }
        assert_eq!(received.as_deref(), Some("FLOOR 2"));
    }

    #[test]
    fn closed_peer_is_an_error() {
        let (a, mut b) = local_pair();
        drop(a);
        assert!(receive_message(&mut b).is_err());
    }

    #[test]
    fn oversized_length_is_rejected() {
        let (a, mut b) = local_pair();
        (&a).write_all(&u32::MAX.to_be_bytes()).unwrap();
        assert!(receive_message(&mut b).is_err());
        drop(a);
    }
}
