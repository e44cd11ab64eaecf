//! Chat membership rules.
//!
//! Pure checks over a loaded [`Chat`]. Services call these before issuing a
//! store mutation; the store's conditional updates catch what changed in
//! between.

use crate::domain::entities::Chat;
use crate::domain::error::ChatError;

/// Smallest allowed group, admin included.
pub const MIN_GROUP_SIZE: usize = 3;

/// Largest allowed group, admin included.
pub const MAX_GROUP_SIZE: usize = 300;

/// A user may not open a direct chat with themself.
pub fn ensure_distinct_peer(actor: i64, peer: i64) -> Result<(), ChatError> {
    if actor == peer {
        return Err(ChatError::invalid("You cannot chat with yourself"));
    }
    Ok(())
}

/// Build the participant list of a new group: actor first, then the
/// requested users in request order with duplicates removed.
pub fn group_participants(actor: i64, requested: &[i64]) -> Result<Vec<i64>, ChatError> {
    if requested.contains(&actor) {
        return Err(ChatError::invalid(
            "Participants array should not contain the group creator",
        ));
    }

    let mut members = Vec::with_capacity(requested.len() + 1);
    members.push(actor);
    for id in requested {
        if !members.contains(id) {
            members.push(*id);
        }
    }

    if members.len() < MIN_GROUP_SIZE {
        return Err(ChatError::invalid(
            "Seems like you have passed duplicate participants or too few of them",
        ));
    }
    if members.len() > MAX_GROUP_SIZE {
        return Err(ChatError::invalid(format!(
            "A group chat can have at most {} participants",
            MAX_GROUP_SIZE
        )));
    }
    Ok(members)
}

/// Trimmed group name, rejecting blanks.
pub fn group_name(name: &str) -> Result<String, ChatError> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(ChatError::invalid("Group name is required"));
    }
    Ok(trimmed.to_string())
}

/// Unwrap a lookup that must yield a group chat.
pub fn require_group(chat: Option<Chat>) -> Result<Chat, ChatError> {
    match chat {
        Some(chat) if chat.is_group_chat => Ok(chat),
        _ => Err(ChatError::not_found("Group chat does not exist")),
    }
}

/// Unwrap a lookup that must yield a direct chat.
pub fn require_direct(chat: Option<Chat>) -> Result<Chat, ChatError> {
    match chat {
        Some(chat) if !chat.is_group_chat => Ok(chat),
        _ => Err(ChatError::not_found("Chat does not exist")),
    }
}

pub fn require_admin(chat: &Chat, actor: i64) -> Result<(), ChatError> {
    if !chat.is_admin(actor) {
        return Err(ChatError::forbidden("You are not an admin"));
    }
    Ok(())
}

pub fn require_participant(chat: &Chat, actor: i64) -> Result<(), ChatError> {
    if !chat.is_participant(actor) {
        return Err(ChatError::forbidden("You are not a part of this chat"));
    }
    Ok(())
}

/// Admin adds `user` to a group they do not belong to yet.
pub fn check_add(chat: &Chat, actor: i64, user: i64) -> Result<(), ChatError> {
    require_admin(chat, actor)?;
    if chat.is_participant(user) {
        return Err(ChatError::invalid("Participant already in a group chat"));
    }
    if chat.participants.len() >= MAX_GROUP_SIZE {
        return Err(ChatError::invalid(format!(
            "A group chat can have at most {} participants",
            MAX_GROUP_SIZE
        )));
    }
    Ok(())
}

/// Admin removes a current member other than themself.
pub fn check_remove(chat: &Chat, actor: i64, user: i64) -> Result<(), ChatError> {
    require_admin(chat, actor)?;
    if !chat.is_participant(user) {
        return Err(ChatError::invalid("Participant does not exist in the group chat"));
    }
    if chat.is_admin(user) {
        return Err(ChatError::invalid(
            "The admin cannot be removed; delete the group chat instead",
        ));
    }
    Ok(())
}

/// A member leaves. The admin must stay a member while the group exists.
pub fn check_leave(chat: &Chat, actor: i64) -> Result<(), ChatError> {
    require_participant(chat, actor)?;
    if chat.is_admin(actor) {
        return Err(ChatError::invalid(
            "The admin cannot leave the group chat; delete it instead",
        ));
    }
    Ok(())
}

/// Only the admin deletes a group.
pub fn check_delete_group(chat: &Chat, actor: i64) -> Result<(), ChatError> {
    if !chat.is_admin(actor) {
        return Err(ChatError::forbidden("Only admin can delete the group"));
    }
    Ok(())
}

/// Either participant deletes a direct chat.
pub fn check_delete_direct(chat: &Chat, actor: i64) -> Result<(), ChatError> {
    require_participant(chat, actor)
}
