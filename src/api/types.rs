//! Wire records exchanged with the two backends.
//!
//! Every field the backend might omit is `Option` or `#[serde(default)]`, and
//! camelCase aliases are accepted alongside snake_case. Defaults are applied
//! once, in [`crate::core::transform`], so nothing downstream guesses at
//! field presence.

use serde::{Deserialize, Serialize};

// ============================================================================
// Auth
// ============================================================================

#[derive(Deserialize, Debug, Clone, PartialEq)]
pub struct TokenResponse {
    pub access_token: String,
    #[serde(default)]
    pub token_type: Option<String>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct UserProfile {
    pub username: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default, alias = "fullName")]
    pub full_name: Option<String>,
    /// One of the agent-role names for warehouse staff; other values for admins.
    #[serde(default)]
    pub role: Option<String>,
    #[serde(default, alias = "isActive")]
    pub is_active: Option<bool>,
}

/// FastAPI-style error body: `detail` is usually a string, but validation
/// failures send a list of `{loc, msg, type}` objects.
#[derive(Deserialize, Debug)]
pub struct ErrorBody {
    pub detail: Option<serde_json::Value>,
}

// ============================================================================
// Chatbot
// ============================================================================

#[derive(Serialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ChatRequest {
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub conversation_id: Option<String>,
    pub role: String,
}

#[derive(Deserialize, Debug, Clone, PartialEq)]
pub struct ChatResponse {
    #[serde(alias = "conversationId")]
    pub conversation_id: serde_json::Value,
    #[serde(alias = "response", alias = "message")]
    pub reply: String,
}

#[derive(Deserialize, Debug, Clone, Default, PartialEq)]
pub struct WireMessage {
    #[serde(default)]
    pub id: Option<serde_json::Value>,
    #[serde(default)]
    pub role: Option<String>,
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default, alias = "createdAt", alias = "timestamp")]
    pub created_at: Option<String>,
}

#[derive(Deserialize, Debug, Clone, Default, PartialEq)]
pub struct WireConversation {
    pub id: serde_json::Value,
    #[serde(default, alias = "userId", alias = "username")]
    pub user_id: Option<String>,
    #[serde(default, alias = "agentRole")]
    pub role: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default, alias = "lastMessage")]
    pub last_message: Option<String>,
    #[serde(default, alias = "messageCount")]
    pub message_count: Option<usize>,
    #[serde(default, alias = "updatedAt", alias = "lastActivity")]
    pub updated_at: Option<String>,
    #[serde(default)]
    pub messages: Vec<WireMessage>,
}

/// `GET /conversations` answers either a bare list or `{conversations: [...]}`.
#[derive(Deserialize, Debug)]
#[serde(untagged)]
pub enum ConversationList {
    Bare(Vec<WireConversation>),
    Wrapped { conversations: Vec<WireConversation> },
}

impl ConversationList {
    pub fn into_vec(self) -> Vec<WireConversation> {
        match self {
            ConversationList::Bare(list) => list,
            ConversationList::Wrapped { conversations } => conversations,
        }
    }
}

#[derive(Deserialize, Debug)]
#[serde(untagged)]
pub enum SuggestionList {
    Bare(Vec<String>),
    Wrapped { suggestions: Vec<String> },
}

impl SuggestionList {
    pub fn into_vec(self) -> Vec<String> {
        match self {
            SuggestionList::Bare(list) => list,
            SuggestionList::Wrapped { suggestions } => suggestions,
        }
    }
}

#[derive(Deserialize, Debug, Clone, Default, PartialEq)]
pub struct ChatAnalytics {
    #[serde(default, alias = "totalConversations")]
    pub total_conversations: u64,
    #[serde(default, alias = "totalMessages")]
    pub total_messages: u64,
    #[serde(default, alias = "conversationsByRole")]
    pub conversations_by_role: std::collections::BTreeMap<String, u64>,
}

// ============================================================================
// WMS resources
// ============================================================================

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
pub struct InventoryItem {
    #[serde(default)]
    pub id: Option<i64>,
    #[serde(default)]
    pub sku: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub quantity: i64,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default, alias = "reorderLevel")]
    pub reorder_level: Option<i64>,
    #[serde(default, alias = "unitPrice")]
    pub unit_price: Option<f64>,
}

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
pub struct Order {
    #[serde(default)]
    pub id: Option<i64>,
    #[serde(default, alias = "orderNumber")]
    pub order_number: Option<String>,
    #[serde(default, alias = "customerName")]
    pub customer_name: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default, alias = "totalAmount")]
    pub total_amount: Option<f64>,
    #[serde(default)]
    pub items: Vec<serde_json::Value>,
    #[serde(default, alias = "createdAt")]
    pub created_at: Option<String>,
}

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
pub struct ReturnRequest {
    #[serde(default)]
    pub id: Option<i64>,
    #[serde(default, alias = "orderId")]
    pub order_id: Option<i64>,
    #[serde(default)]
    pub reason: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default, alias = "refundAmount")]
    pub refund_amount: Option<f64>,
    #[serde(default, alias = "createdAt")]
    pub created_at: Option<String>,
}

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
pub struct Vehicle {
    #[serde(default)]
    pub id: Option<i64>,
    #[serde(default, alias = "licensePlate")]
    pub license_plate: Option<String>,
    #[serde(default, alias = "vehicleType")]
    pub vehicle_type: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub capacity: Option<f64>,
    #[serde(default, alias = "driverName")]
    pub driver_name: Option<String>,
}

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
pub struct Worker {
    #[serde(default)]
    pub id: Option<i64>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub role: Option<String>,
    #[serde(default)]
    pub shift: Option<String>,
    #[serde(default, alias = "isActive")]
    pub is_active: Option<bool>,
}

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
pub struct Customer {
    #[serde(default)]
    pub id: Option<i64>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub address: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_chat_request_omits_missing_conversation_id() {
        let req = ChatRequest {
            message: "hi".into(),
            conversation_id: None,
            role: "clerk".into(),
        };
        assert_eq!(serde_json::to_value(&req).unwrap(), json!({"message": "hi", "role": "clerk"}));

        let req = ChatRequest { conversation_id: Some("c1".into()), ..req };
        assert_eq!(serde_json::to_value(&req).unwrap()["conversationId"], "c1");
    }

    #[test]
    fn test_chat_response_accepts_either_casing() {
        let camel: ChatResponse =
            serde_json::from_value(json!({"conversationId": "c1", "reply": "ok"})).unwrap();
        let snake: ChatResponse =
            serde_json::from_value(json!({"conversation_id": 7, "response": "ok"})).unwrap();
        assert_eq!(camel.conversation_id, json!("c1"));
        assert_eq!(snake.conversation_id, json!(7));
        assert_eq!(snake.reply, "ok");
    }

    #[test]
    fn test_conversation_list_shapes() {
        let bare: ConversationList = serde_json::from_value(json!([{"id": 1}])).unwrap();
        let wrapped: ConversationList =
            serde_json::from_value(json!({"conversations": [{"id": "a"}, {"id": "b"}]})).unwrap();
        assert_eq!(bare.into_vec().len(), 1);
        assert_eq!(wrapped.into_vec().len(), 2);
    }

    #[test]
    fn test_inventory_item_tolerates_missing_fields() {
        let item: InventoryItem = serde_json::from_value(json!({"sku": "A-1"})).unwrap();
        assert_eq!(item.sku, "A-1");
        assert_eq!(item.quantity, 0);
        assert!(item.unit_price.is_none());
    }
}
