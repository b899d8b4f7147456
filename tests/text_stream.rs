use bytes::Bytes;
use stmp::{
    BinaryCodec, Chunk, Context, Encoding, Error, Kind, MessageParams, Payload, Profile, Status,
    TextCodec,
};

#[test]
fn conversation_over_text_channel() {
    let mut client = TextCodec::new();
    let mut server = TextCodec::new();

    let request = client.build(
        MessageParams::request(42)
            .encoding(Encoding::Json)
            .payload(r#"{"query":"a|b","lang":"中文 😂"}"#),
    );
    let raw = client.build(
        MessageParams::notify(43)
            .encoding(Encoding::Raw)
            .payload(Bytes::from_static(b"\x00\x01|\xFF")),
    );

    let mut received = Vec::new();
    for message in [&request, &raw] {
        for chunk in client.serialize(message).unwrap().into_chunks() {
            if let Some(message) = server.parse(chunk).unwrap() {
                received.push(message);
            }
        }
    }
    assert_eq!(received, vec![request.clone(), raw]);

    let response = server.build(
        MessageParams::response(received[0].id(), Status::NotFound),
    );
    let chunks = server.serialize(&response).unwrap().into_chunks();
    assert_eq!(chunks, vec![Chunk::Text(format!("3|0|{}|36", request.id()))]);
    let reply = client.parse(chunks[0].clone()).unwrap().unwrap();
    assert_eq!(reply.kind(), Kind::Response);
    assert_eq!(reply.id(), request.id());
    assert_eq!(reply.known_status(), Some(Status::NotFound));
}

#[test]
fn profile_detection_routes_streams() {
    let mut binary = BinaryCodec::new();
    let mut text = TextCodec::new();

    let msg = text.build(MessageParams::notify(5).encoding(Encoding::Json).payload("[5]"));
    let bytes = binary.serialize(&msg).unwrap();
    let line = text.serialize(&msg).unwrap();

    assert_eq!(Profile::detect(bytes[0]), Some(Profile::Binary));
    assert_eq!(Profile::detect(line.header().as_bytes()[0]), Some(Profile::Text));

    let from_text = text.parse(line.header()).unwrap().unwrap();
    assert_eq!(from_text, msg);
    assert_eq!(from_text.payload_size(), 0);

    let from_binary = binary.parse(bytes).unwrap();
    assert_eq!(from_binary[0].payload_size(), 3);
    assert_eq!(
        from_binary[0].payload(),
        Some(&Payload::Binary(Bytes::from_static(b"[5]")))
    );
}

#[test]
fn text_header_fed_to_binary_codec_is_rejected() {
    let mut binary = BinaryCodec::new();
    assert_eq!(binary.parse(b"2|0|1".to_vec()), Err(Error::ChunkMangled));

    let mut text = TextCodec::new();
    assert_eq!(text.parse(vec![0x80u8, 0, 0, 0, 1]), Err(Error::ChunkMangled));
    assert_eq!(text.parse("2|0|1"), Err(Error::ChunkMangled));
}
