//! In-memory `MessagingPort` for unit tests.

use std::{
    collections::{HashMap, HashSet},
    sync::Mutex,
};

use async_trait::async_trait;

use crate::{
    domain::{ChatId, MessageId, MessageRef},
    errors::Error,
    messaging::{
        port::MessagingPort,
        types::{ChatQuery, InlineKeyboard, ResolvedChat},
    },
    Result,
};

#[derive(Clone, Debug)]
pub(crate) struct Sent {
    pub msg: MessageRef,
    pub text: String,
    pub keyboard: Option<InlineKeyboard>,
}

#[derive(Default)]
pub(crate) struct FakeMessenger {
    next_id: Mutex<i32>,
    pub sent: Mutex<Vec<Sent>>,
    pub edits: Mutex<Vec<(MessageRef, String, Option<InlineKeyboard>)>>,
    pub deleted: Mutex<Vec<MessageRef>>,
    pub answers: Mutex<Vec<(String, Option<String>)>>,
    pub queries: Mutex<Vec<ChatQuery>>,
    failing: Mutex<HashSet<i64>>,
    chats: Mutex<HashMap<String, ResolvedChat>>,
}

impl FakeMessenger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every send to `chat` fails with a transport error.
    pub fn fail_chat(&self, chat: i64) {
        self.failing.lock().unwrap().insert(chat);
    }

    /// Make `key` resolvable by username (`@name`) or by the raw text.
    pub fn add_chat(&self, key: &str, id: i64, title: Option<&str>) {
        self.insert_chat(key.to_string(), id, title);
    }

    /// Reachable only through `ChatQuery::Id`.
    pub fn add_chat_by_id(&self, id: i64, title: Option<&str>) {
        self.insert_chat(id_key(id), id, title);
    }

    fn insert_chat(&self, key: String, id: i64, title: Option<&str>) {
        self.chats.lock().unwrap().insert(
            key,
            ResolvedChat {
                id: ChatId(id),
                title: title.map(|s| s.to_string()),
                kind: "channel".to_string(),
            },
        );
    }

    pub fn sent_to(&self, chat: ChatId) -> Vec<Sent> {
        self.sent
            .lock()
            .unwrap()
            .iter()
            .filter(|s| s.msg.chat_id == chat)
            .cloned()
            .collect()
    }

    pub fn last_sent_to(&self, chat: ChatId) -> Option<Sent> {
        self.sent_to(chat).pop()
    }

    fn alloc(&self, chat_id: ChatId) -> MessageRef {
        let mut guard = self.next_id.lock().unwrap();
        *guard += 1;
        MessageRef {
            chat_id,
            message_id: MessageId(*guard),
        }
    }

    fn push(&self, chat_id: ChatId, text: &str, keyboard: Option<InlineKeyboard>) -> Result<MessageRef> {
        if self.failing.lock().unwrap().contains(&chat_id.0) {
            return Err(Error::Transport(format!("chat {chat_id} unreachable")));
        }
        let msg = self.alloc(chat_id);
        self.sent.lock().unwrap().push(Sent {
            msg,
            text: text.to_string(),
            keyboard,
        });
        Ok(msg)
    }
}

#[async_trait]
impl MessagingPort for FakeMessenger {
    async fn send_text(&self, chat_id: ChatId, text: &str) -> Result<MessageRef> {
        self.push(chat_id, text, None)
    }

    async fn send_keyboard(
        &self,
        chat_id: ChatId,
        text: &str,
        keyboard: InlineKeyboard,
    ) -> Result<MessageRef> {
        self.push(chat_id, text, Some(keyboard))
    }

    async fn edit_text(
        &self,
        msg: MessageRef,
        text: &str,
        keyboard: Option<InlineKeyboard>,
    ) -> Result<()> {
        self.edits
            .lock()
            .unwrap()
            .push((msg, text.to_string(), keyboard));
        Ok(())
    }

    async fn delete_message(&self, msg: MessageRef) -> Result<()> {
        self.deleted.lock().unwrap().push(msg);
        Ok(())
    }

    async fn answer_callback_query(&self, callback_id: &str, text: Option<&str>) -> Result<()> {
        self.answers
            .lock()
            .unwrap()
            .push((callback_id.to_string(), text.map(|s| s.to_string())));
        Ok(())
    }

    async fn resolve_chat(&self, query: ChatQuery) -> Result<ResolvedChat> {
        self.queries.lock().unwrap().push(query.clone());
        let key = match &query {
            ChatQuery::Username(u) => format!("@{u}"),
            ChatQuery::Raw(r) => r.clone(),
            ChatQuery::Id(id) => id_key(*id),
        };
        self.chats
            .lock()
            .unwrap()
            .get(&key)
            .cloned()
            .ok_or_else(|| Error::Transport("Bad Request: chat not found".to_string()))
    }
}

fn id_key(id: i64) -> String {
    format!("#{id}")
}
