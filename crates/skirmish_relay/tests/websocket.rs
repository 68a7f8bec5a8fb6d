//! End-to-end relay over real websockets.

use futures::{SinkExt, StreamExt};
use skirmish_protocol::room::{ClientMessage, RelayMessage};
use skirmish_relay::{serve_on, RelayConfig};
use tokio::net::{TcpListener, TcpStream};
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};

type Client = WebSocketStream<MaybeTlsStream<TcpStream>>;

async fn start_relay(grace_ms: u64) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let address = listener.local_addr().unwrap();
    let config = RelayConfig {
        grace_ms,
        sweep_ms: 20,
        ..RelayConfig::default()
    };
    tokio::spawn(async move { serve_on(listener, &config).await });
    format!("ws://{address}/ws")
}

async fn send(client: &mut Client, message: &ClientMessage) {
    let text = serde_json::to_string(message).unwrap();
    client.send(Message::text(text)).await.unwrap();
}

async fn receive(client: &mut Client) -> RelayMessage {
    loop {
        let frame = tokio::time::timeout(std::time::Duration::from_secs(5), client.next())
            .await
            .expect("relay should answer")
            .expect("stream should stay open")
            .unwrap();
        if let Ok(text) = frame.to_text() {
            if !text.is_empty() {
                return serde_json::from_str(text).unwrap();
            }
        }
    }
}

async fn receive_until(
    client: &mut Client,
    wanted: impl Fn(&RelayMessage) -> bool,
) -> RelayMessage {
    loop {
        let message = receive(client).await;
        if wanted(&message) {
            return message;
        }
    }
}

async fn started_match(url: &str) -> (Client, Client) {
    let (mut alice, _) = connect_async(url).await.unwrap();
    let (mut bob, _) = connect_async(url).await.unwrap();
    assert!(matches!(receive(&mut alice).await, RelayMessage::Identity { .. }));
    assert!(matches!(receive(&mut bob).await, RelayMessage::Identity { .. }));

    send(&mut alice, &ClientMessage::CreateRoom).await;
    let RelayMessage::RoomCreated { room_code, .. } = receive(&mut alice).await else {
        panic!("expected room created");
    };
    send(&mut bob, &ClientMessage::JoinRoom { room_code }).await;
    receive_until(&mut bob, |m| matches!(m, RelayMessage::RoomJoined { .. })).await;

    send(&mut alice, &ClientMessage::Ready).await;
    send(&mut bob, &ClientMessage::Ready).await;
    receive_until(&mut alice, |m| *m == RelayMessage::PlayersReady { can_start: true }).await;
    send(&mut alice, &ClientMessage::StartGame).await;
    receive_until(&mut alice, |m| *m == RelayMessage::GameStarted).await;
    receive_until(&mut bob, |m| *m == RelayMessage::GameStarted).await;
    (alice, bob)
}

#[tokio::test]
async fn test_actions_are_relayed_with_sender() {
    let url = start_relay(30_000).await;
    let (mut alice, mut bob) = started_match(&url).await;

    let action = serde_json::json!({
        "action": "unitMove",
        "data": { "unitId": "player-marine-1" }
    });
    send(&mut alice, &ClientMessage::GameAction(action)).await;
    let relayed = receive_until(&mut bob, |m| matches!(m, RelayMessage::GameAction(_))).await;
    let RelayMessage::GameAction(value) = relayed else {
        unreachable!();
    };
    assert_eq!(value["action"], "unitMove");
    assert_eq!(value["data"]["unitId"], "player-marine-1");
    assert!(value["senderId"].is_string());
}

#[tokio::test]
async fn test_dropped_player_loses_after_grace() {
    let url = start_relay(100).await;
    let (mut alice, bob) = started_match(&url).await;
    drop(bob);

    let notice =
        receive_until(&mut alice, |m| matches!(m, RelayMessage::PlayerDisconnected { .. })).await;
    assert!(matches!(notice, RelayMessage::PlayerDisconnected { grace_ms: 100, .. }));
    let verdict = receive_until(&mut alice, |m| matches!(m, RelayMessage::GameOver { .. })).await;
    assert!(matches!(
        verdict,
        RelayMessage::GameOver {
            winner: skirmish_core::team::Team::Player,
            ..
        }
    ));
}
