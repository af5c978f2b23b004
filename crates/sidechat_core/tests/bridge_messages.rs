use serde_json::json;
use sidechat_core::bridge::{BridgeDirection, BridgeMessage, BRIDGE_CHANNEL};

#[test]
fn rejects_values_without_the_channel_marker() {
    for value in [
        json!({ "type": "AI_CHAT_IFRAME_READY" }),
        json!({ "channel": "other-channel", "type": "AI_CHAT_IFRAME_READY" }),
        json!({ "channel": 7, "type": "AI_CHAT_IFRAME_READY" }),
        json!("AI_CHAT_IFRAME_READY"),
        json!(null),
    ] {
        assert_eq!(BridgeMessage::from_value(&value), None, "accepted {value}");
    }
}

#[test]
fn rejects_non_string_or_unknown_types_regardless_of_payload() {
    for value in [
        json!({ "channel": BRIDGE_CHANNEL, "type": 42, "payload": { "text": "x" } }),
        json!({ "channel": BRIDGE_CHANNEL, "payload": { "text": "x" } }),
        json!({ "channel": BRIDGE_CHANNEL, "type": "AI_CHAT_SOMETHING_ELSE" }),
    ] {
        assert_eq!(BridgeMessage::from_value(&value), None, "accepted {value}");
    }
}

#[test]
fn decodes_iframe_ready_with_optional_source() {
    let value = json!({
        "channel": BRIDGE_CHANNEL,
        "type": "AI_CHAT_IFRAME_READY",
        "payload": { "source": "remote-ui" },
    });
    assert_eq!(
        BridgeMessage::from_value(&value),
        Some(BridgeMessage::IframeReady {
            source: Some("remote-ui".to_owned()),
        })
    );

    let bare = json!({ "channel": BRIDGE_CHANNEL, "type": "AI_CHAT_IFRAME_READY" });
    assert_eq!(
        BridgeMessage::from_value(&bare),
        Some(BridgeMessage::IframeReady { source: None })
    );
}

#[test]
fn prefill_event_requires_text() {
    let missing = json!({
        "channel": BRIDGE_CHANNEL,
        "type": "AI_CHAT_PREFILL_EVENT",
        "payload": { "autoSend": true },
    });
    assert_eq!(BridgeMessage::from_value(&missing), None);

    let value = json!({
        "channel": BRIDGE_CHANNEL,
        "type": "AI_CHAT_PREFILL_EVENT",
        "payload": { "text": "hi", "autoSend": true },
    });
    assert_eq!(
        BridgeMessage::from_value(&value),
        Some(BridgeMessage::PrefillEvent {
            text: "hi".to_owned(),
            auto_send: Some(true),
        })
    );
}

#[test]
fn classifies_direction_by_tag() {
    assert_eq!(
        BridgeMessage::IframeReady { source: None }.direction(),
        BridgeDirection::IframeToHost
    );
    assert_eq!(
        BridgeMessage::PrefillRequest.direction(),
        BridgeDirection::IframeToHost
    );
    assert_eq!(
        BridgeMessage::OpenOptions.direction(),
        BridgeDirection::IframeToHost
    );
    assert_eq!(
        BridgeMessage::HostReady { tab_id: None }.direction(),
        BridgeDirection::HostToIframe
    );
    assert_eq!(
        BridgeMessage::PrefillEvent {
            text: String::new(),
            auto_send: None,
        }
        .direction(),
        BridgeDirection::HostToIframe
    );
}

#[test]
fn encoded_messages_carry_channel_and_payload() {
    let value = BridgeMessage::HostReady { tab_id: Some(7) }.to_value();
    assert_eq!(value["channel"], BRIDGE_CHANNEL);
    assert_eq!(value["type"], "AI_CHAT_HOST_READY");
    assert_eq!(value["payload"]["tabId"], 7);

    let value = BridgeMessage::PrefillRequest.to_value();
    assert_eq!(value["channel"], BRIDGE_CHANNEL);
    assert!(value.get("payload").is_none());
}
