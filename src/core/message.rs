/// Id of the greeting that seeds every conversation.
pub const GREETING_MESSAGE_ID: &str = "initial-bot-message";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Role {
    User,
    Model,
}

impl Role {
    /// Role name used on the OpenAI-compatible wire.
    pub fn to_api_role(self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Model => "assistant",
        }
    }
}

/// Opaque message identifier, unique within one conversation.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MessageId(String);

impl MessageId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }
}

impl std::fmt::Display for MessageId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Hands out message ids in creation order.
#[derive(Debug, Default)]
pub struct MessageIdGenerator {
    next: u64,
}

impl MessageIdGenerator {
    pub fn next_id(&mut self) -> MessageId {
        self.next += 1;
        MessageId(format!("msg-{}", self.next))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub id: MessageId,
    pub role: Role,
    pub content: String,
}

impl Message {
    pub fn new(id: MessageId, role: Role, content: impl Into<String>) -> Self {
        Self {
            id,
            role,
            content: content.into(),
        }
    }

    pub fn is_user(&self) -> bool {
        self.role == Role::User
    }
}
