//! Ping-pong over an in-memory byte pipe using both STMP profiles

use stmp::{BinaryCodec, Context, Encoding, MessageParams, Status, TextCodec};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    println!("STMP Ping-Pong Example");
    println!("======================\n");

    let mut client = BinaryCodec::new();
    let mut server = BinaryCodec::new();

    // Request
    let ping = client.build(
        MessageParams::request(1)
            .encoding(Encoding::Json)
            .payload(r#""ping""#),
    );
    let wire = client.serialize(&ping)?;
    println!("Request id={} encoded to {} bytes", ping.id(), wire.len());

    // Deliver in two pieces, as a socket might
    let (head, tail) = wire.split_at(wire.len() / 2);
    let mut inbox = server.parse(head.to_vec())?;
    inbox.extend(server.parse(tail.to_vec())?);
    let request = &inbox[0];
    println!("Server got action={} id={}", request.action(), request.id());

    // Response
    let pong = server.build(
        MessageParams::response(request.id(), Status::Ok)
            .encoding(Encoding::Json)
            .payload(r#""pong""#),
    );
    let reply = client.parse(server.serialize(&pong)?)?;
    println!("Client got status={} for id={}", reply[0].status(), reply[0].id());

    // Same exchange on the text profile
    let mut browser = TextCodec::new();
    let notify = browser.build(MessageParams::notify(7));
    let frame = browser.serialize(&notify)?;
    println!("Text notify: {:?}", frame.header());

    Ok(())
}
