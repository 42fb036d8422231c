//! Group chat between users. Only members may see or post to a group.

use thiserror::Error;

use crate::data_models::{ChatGroup, ChatMessage};
use crate::store::ChatStore;

#[derive(Debug, Error)]
pub enum ChatError {
    #[error("Chat not found or you're not a member")]
    NotFound,
    #[error("Group name cannot be empty")]
    EmptyGroupName,
    #[error("Message text cannot be empty")]
    EmptyMessage,
    #[error("User is already a member of this chat")]
    AlreadyMember,
    #[error("User is not a member of this chat")]
    NotMember,
    #[error(transparent)]
    Store(#[from] anyhow::Error),
}

pub struct ChatService<'a, S: ?Sized> {
    store: &'a S,
}

impl<'a, S> ChatService<'a, S>
where
    S: ChatStore + ?Sized,
{
    pub fn new(store: &'a S) -> Self {
        Self { store }
    }

    pub async fn groups(&self, user: &str) -> Result<Vec<ChatGroup>, ChatError> {
        Ok(self.store.groups_for_member(&user.to_lowercase()).await?)
    }

    /// The creator always ends up a member; duplicate members are dropped.
    pub async fn create_group(
        &self,
        creator: &str,
        group_name: &str,
        members: &[String],
    ) -> Result<ChatGroup, ChatError> {
        let group_name = group_name.trim();
        if group_name.is_empty() {
            return Err(ChatError::EmptyGroupName);
        }
        let mut all: Vec<String> = vec![creator.to_lowercase()];
        for member in members {
            let member = member.trim().to_lowercase();
            if !member.is_empty() && !all.contains(&member) {
                all.push(member);
            }
        }
        let group = ChatGroup::new(group_name.to_string(), all);
        self.store.save_group(&group).await?;
        log::info!("chat group {} created by {creator}", group.id);
        Ok(group)
    }

    async fn reload(&self, chat_id: &str) -> Result<ChatGroup, ChatError> {
        self.store.find_group(chat_id).await?.ok_or(ChatError::NotFound)
    }

    /// The group, if it exists and `user` belongs to it.
    async fn member_group(&self, chat_id: &str, user: &str) -> Result<ChatGroup, ChatError> {
        match self.store.find_group(chat_id).await? {
            Some(group) if group.has_member(user) => Ok(group),
            _ => Err(ChatError::NotFound),
        }
    }

    pub async fn messages(&self, chat_id: &str, user: &str) -> Result<Vec<ChatMessage>, ChatError> {
        self.member_group(chat_id, user).await?;
        Ok(self.store.messages(chat_id).await?)
    }

    pub async fn send(&self, chat_id: &str, user: &str, text: &str) -> Result<ChatMessage, ChatError> {
        if text.trim().is_empty() {
            return Err(ChatError::EmptyMessage);
        }
        self.member_group(chat_id, user).await?;
        let message = ChatMessage::new(chat_id.to_string(), user.to_lowercase(), text.to_string());
        self.store.insert_message(&message).await?;
        Ok(message)
    }

    pub async fn add_member(
        &self,
        chat_id: &str,
        user: &str,
        member: &str,
    ) -> Result<ChatGroup, ChatError> {
        self.member_group(chat_id, user).await?;
        if !self.store.add_member(chat_id, &member.trim().to_lowercase()).await? {
            return Err(ChatError::AlreadyMember);
        }
        self.reload(chat_id).await
    }

    pub async fn remove_member(
        &self,
        chat_id: &str,
        user: &str,
        member: &str,
    ) -> Result<ChatGroup, ChatError> {
        self.member_group(chat_id, user).await?;
        if !self.store.remove_member(chat_id, member.trim()).await? {
            return Err(ChatError::NotMember);
        }
        self.reload(chat_id).await
    }
}
