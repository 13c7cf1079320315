// Inbound chat events and the outbound actions produced for them.

use serde::{Deserialize, Serialize};

/// "User posted text in a location."
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub sender_id: String,
    pub sender_display_name: String,
    pub location_id: String,
    #[serde(default)]
    pub location_name: String,
    pub text: String,
}

/// A command the platform already recognized.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandInvocation {
    pub command_name: String,
    #[serde(default)]
    pub args: Vec<String>,
    pub sender_id: String,
    #[serde(default)]
    pub sender_display_name: String,
    pub location_id: String,
    #[serde(default)]
    pub location_name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum InboundEvent {
    Message(ChatMessage),
    Command(CommandInvocation),
}

impl InboundEvent {
    pub fn sender_id(&self) -> &str {
        match self {
            InboundEvent::Message(m) => &m.sender_id,
            InboundEvent::Command(c) => &c.sender_id,
        }
    }
}

/// An effect for the platform bridge to carry out.
/// `Reply`, `Delete` and `React` refer to the event that produced them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Action {
    Send { location_id: String, text: String },
    Reply { text: String },
    /// Best effort; the bridge may lack permission.
    Delete,
    React { symbol: String },
}

/// Everything one event produced.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Response {
    pub actions: Vec<Action>,
    /// Whether the ledger changed and needs flushing.
    pub mutated: bool,
}

impl Response {
    pub fn send(&mut self, location_id: &str, text: impl Into<String>) {
        self.actions.push(Action::Send {
            location_id: location_id.to_string(),
            text: text.into(),
        });
    }

    pub fn reply(&mut self, text: impl Into<String>) {
        self.actions.push(Action::Reply { text: text.into() });
    }

    pub fn react(&mut self, symbol: impl Into<String>) {
        self.actions.push(Action::React {
            symbol: symbol.into(),
        });
    }

    /// Texts of all actions, in order. Handy for assertions.
    pub fn texts(&self) -> Vec<&str> {
        self.actions
            .iter()
            .filter_map(|a| match a {
                Action::Send { text, .. } | Action::Reply { text } => Some(text.as_str()),
                _ => None,
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_inbound_message_json() {
        let json = r#"{
            "type": "message",
            "sender_id": "42",
            "sender_display_name": "alice",
            "location_id": "c1",
            "text": "squeak"
        }"#;
        let event: InboundEvent = serde_json::from_str(json).unwrap();
        match event {
            InboundEvent::Message(m) => {
                assert_eq!(m.sender_id, "42");
                assert_eq!(m.location_name, "");
                assert_eq!(m.text, "squeak");
            }
            other => panic!("unexpected event {other:?}"),
        }
    }

    #[test]
    fn test_inbound_command_json() {
        let json = r#"{"type":"command","command_name":"settrap","args":["6"],"sender_id":"1","location_id":"c1"}"#;
        let event: InboundEvent = serde_json::from_str(json).unwrap();
        assert_eq!(event.sender_id(), "1");
        assert!(matches!(event, InboundEvent::Command(ref c) if c.args == vec!["6".to_string()]));
    }

    #[test]
    fn test_action_json_shape() {
        let actions = vec![
            Action::Send {
                location_id: "c1".into(),
                text: "Squeak!".into(),
            },
            Action::Delete,
            Action::React {
                symbol: "🪤".into(),
            },
        ];
        let value = serde_json::to_value(&actions).unwrap();
        assert_eq!(value[0]["type"], "send");
        assert_eq!(value[0]["location_id"], "c1");
        assert_eq!(value[1]["type"], "delete");
        assert_eq!(value[2], serde_json::json!({ "type": "react", "symbol": "🪤" }));
    }
}
