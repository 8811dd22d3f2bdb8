use swarmgate::network::message::{Command, Message};

fn full_message() -> Message {
    Message {
        arguments: "4242|10.0.0.1".to_string(),
        command: "conn".to_string(),
        id: "0".to_string(),
        payload: "net-A".to_string(),
        query: "1".to_string(),
    }
}

#[test]
fn roundtrip_preserves_all_fields() {
    let msg = full_message();
    let encoded = msg.encode().unwrap();
    let decoded = Message::decode(&encoded).unwrap();
    assert_eq!(msg, decoded);
}

#[test]
fn encoding_is_a_sorted_dictionary() {
    let msg = Message {
        arguments: "a".to_string(),
        command: "find".to_string(),
        id: "x".to_string(),
        payload: "p".to_string(),
        query: "q".to_string(),
    };
    let encoded = msg.encode().unwrap();
    assert_eq!(
        encoded,
        b"d9:Arguments1:a7:Command4:find2:Id1:x7:Payload1:p5:Query1:qe".to_vec()
    );
}

#[test]
fn compose_fills_wire_placeholders() {
    let msg = Message::compose(Command::Find, "", "", "payload-free");
    assert_eq!(msg.id, "0");
    assert_eq!(msg.query, "0");
    assert_eq!(msg.arguments, "payload-free");
    assert_eq!(msg.command, "find");
    assert!(msg.payload.is_empty());

    let msg = Message::compose(Command::Node, "my-id", "target", "");
    assert_eq!(msg.id, "my-id");
    assert_eq!(msg.query, "target");
}

#[test]
fn empty_command_refuses_to_encode() {
    assert!(Message::default().encode().is_err());
}

#[test]
fn malformed_buffers_fail_decoding() {
    assert!(Message::decode(b"not bencode at all").is_err());
    assert!(Message::decode(b"").is_err());
    assert!(Message::decode(b"d7:Command4:ping").is_err()); // truncated dict
}

#[test]
fn missing_keys_decode_as_empty() {
    let decoded = Message::decode(b"d7:Command4:pinge").unwrap();
    assert_eq!(decoded.command, "ping");
    assert_eq!(decoded.command(), Some(Command::Ping));
    assert!(decoded.id.is_empty());
    assert!(decoded.query.is_empty());
    assert!(decoded.arguments.is_empty());
    assert!(decoded.payload.is_empty());
}

#[test]
fn unknown_command_tags_are_not_commands() {
    assert_eq!(Command::from_tag("bogus"), None);
    let mut msg = full_message();
    msg.command = "gossip".to_string();
    assert_eq!(msg.command(), None);
}

#[test]
fn every_tag_parses_back() {
    for command in [
        Command::Connect,
        Command::Find,
        Command::Node,
        Command::Ping,
        Command::ControlPeer,
        Command::Notify,
        Command::Stop,
        Command::Dhcp,
        Command::RegisterControlPeer,
        Command::Load,
        Command::Unknown,
        Command::Error,
    ] {
        assert_eq!(Command::from_tag(command.tag()), Some(command));
    }
}
