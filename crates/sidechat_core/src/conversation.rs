/// Transcript text shown while a completion is in flight.
pub const GENERATING_TEXT: &str = "正在生成…";
/// Transcript text for a request the user cancelled. Deliberately distinct
/// from the failure rendering.
pub const CANCELLED_TEXT: &str = "请求已取消";

pub type MessageId = u64;
pub type RequestId = u64;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatMessage {
    pub id: MessageId,
    pub role: Role,
    pub text: String,
}

/// Terminal outcome of a completion request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CompletionOutcome {
    Success(String),
    Cancelled,
    Failed(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct InFlight {
    request_id: RequestId,
    placeholder: MessageId,
}

/// The chat transcript and its in-flight request bookkeeping.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Conversation {
    messages: Vec<ChatMessage>,
    input: String,
    in_flight: Vec<InFlight>,
    next_message_id: MessageId,
    next_request_id: RequestId,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConversationEvent {
    InputChanged(String),
    SendClicked,
    /// The host answered the bridge handshake.
    HostReady,
    /// A prefill arrived over the bridge.
    Prefill { text: String, auto_send: bool },
    CancelClicked,
    CompletionFinished {
        request_id: RequestId,
        outcome: CompletionOutcome,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConversationEffect {
    StartCompletion {
        request_id: RequestId,
        input: String,
    },
    CancelCompletion {
        request_id: RequestId,
    },
    /// Ask the host for any cached prefill. Emitted on the ready signal so
    /// delivery never depends on push timing.
    RequestPrefill,
}

/// Pure update function for the chat UI.
pub fn update(
    mut conversation: Conversation,
    event: ConversationEvent,
) -> (Conversation, Vec<ConversationEffect>) {
    let effects = match event {
        ConversationEvent::InputChanged(text) => {
            conversation.input = text;
            Vec::new()
        }
        ConversationEvent::SendClicked => {
            let input = conversation.input.clone();
            conversation.send(&input)
        }
        ConversationEvent::HostReady => vec![ConversationEffect::RequestPrefill],
        ConversationEvent::Prefill { text, auto_send } => {
            if auto_send && !text.trim().is_empty() && !conversation.is_sending() {
                conversation.send(&text)
            } else {
                conversation.input = text;
                Vec::new()
            }
        }
        ConversationEvent::CancelClicked => conversation
            .in_flight
            .iter()
            .map(|request| ConversationEffect::CancelCompletion {
                request_id: request.request_id,
            })
            .collect(),
        ConversationEvent::CompletionFinished {
            request_id,
            outcome,
        } => {
            conversation.finish(request_id, outcome);
            Vec::new()
        }
    };
    (conversation, effects)
}

impl Conversation {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    pub fn input(&self) -> &str {
        &self.input
    }

    pub fn is_sending(&self) -> bool {
        !self.in_flight.is_empty()
    }

    fn push_message(&mut self, role: Role, text: String) -> MessageId {
        self.next_message_id += 1;
        let id = self.next_message_id;
        self.messages.push(ChatMessage { id, role, text });
        id
    }

    /// Start a completion for `text`. A send issued while a request is in
    /// flight first tears the prior request down.
    fn send(&mut self, text: &str) -> Vec<ConversationEffect> {
        let trimmed = text.trim();
        if trimmed.is_empty() {
            return Vec::new();
        }

        let mut effects: Vec<ConversationEffect> = self
            .in_flight
            .iter()
            .map(|request| ConversationEffect::CancelCompletion {
                request_id: request.request_id,
            })
            .collect();

        self.push_message(Role::User, trimmed.to_owned());
        self.input.clear();
        let placeholder = self.push_message(Role::Assistant, GENERATING_TEXT.to_owned());

        self.next_request_id += 1;
        let request_id = self.next_request_id;
        self.in_flight.push(InFlight {
            request_id,
            placeholder,
        });
        effects.push(ConversationEffect::StartCompletion {
            request_id,
            input: trimmed.to_owned(),
        });
        effects
    }

    fn finish(&mut self, request_id: RequestId, outcome: CompletionOutcome) {
        let Some(position) = self
            .in_flight
            .iter()
            .position(|request| request.request_id == request_id)
        else {
            return;
        };
        let request = self.in_flight.remove(position);
        let text = match outcome {
            CompletionOutcome::Success(text) => text,
            CompletionOutcome::Cancelled => CANCELLED_TEXT.to_owned(),
            CompletionOutcome::Failed(message) => format!("请求失败：{message}"),
        };
        if let Some(message) = self
            .messages
            .iter_mut()
            .find(|message| message.id == request.placeholder)
        {
            message.text = text;
        }
    }
}
