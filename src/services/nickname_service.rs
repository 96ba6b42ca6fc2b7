//! Nickname registration, removal and administrator overrides.

use tracing::{debug, info};

use crate::{
    dto::{admin::ActionResponse, host::MessageRequest},
    error::ServiceError,
    services::{member_service, reaction_service, status_service},
    state::{
        SharedState,
        nicknames::{NicknameError, is_candidate},
        roster::{GuildId, UserId},
    },
};

/// Treat a plain chat message as a nickname registration when it looks like one and the
/// author has none yet. The message is deleted and any pending warning withdrawn.
pub async fn submit_message(
    state: &SharedState,
    guild: GuildId,
    message: MessageRequest,
) -> Result<Option<String>, ServiceError> {
    let user = message.user_id;
    if state.find_session(guild).is_none()
        || !is_candidate(&message.content)
        || state.nicknames().is_registered(user)
    {
        return Ok(None);
    }

    if let Err(err) = state
        .gateway()
        .delete_message(message.channel_id, message.message_id)
        .await
    {
        debug!(user, error = %err, "failed to delete registration message");
    }

    let nickname = state.nicknames().register(user, &message.content)?;
    info!(guild, user, nickname = %nickname, "nickname registered");
    status_service::persist_nicknames(state).await;
    withdraw_warning(state, user).await;

    status_service::notify(
        state,
        message.channel_id,
        format!("<@{user}> ✅ `{nickname}` 닉네임이 등록되었습니다! 이제 이모지를 눌러주세요."),
    )
    .await;
    Ok(Some(nickname))
}

/// Explicit self registration.
pub async fn register(
    state: &SharedState,
    user: UserId,
    nickname: &str,
) -> Result<ActionResponse, ServiceError> {
    let nickname = state
        .nicknames()
        .register(user, nickname)
        .map_err(|err| match err {
            NicknameError::AlreadyRegistered(_) => ServiceError::InvalidState(
                "⚠️ 이미 발로닉네임이 등록되어 있습니다. 먼저 삭제해주세요.".into(),
            ),
            other => other.into(),
        })?;
    status_service::persist_nicknames(state).await;
    withdraw_warning(state, user).await;

    Ok(ActionResponse::new(format!(
        "✅ `{nickname}` 닉네임이 등록되었습니다! 이제 이모지를 눌러주세요."
    )))
}

/// A user deletes their own nickname.
pub async fn delete_own(state: &SharedState, user: UserId) -> Result<ActionResponse, ServiceError> {
    state.nicknames().remove(user).map_err(|err| match err {
        NicknameError::NotRegistered(_) => {
            ServiceError::NotFound("⚠️ 등록된 발로닉네임이 없습니다.".into())
        }
        other => other.into(),
    })?;
    status_service::persist_nicknames(state).await;
    refresh_listing(state, user).await;

    Ok(ActionResponse::new(
        "✅ 발로닉네임이 삭제되었습니다. 다시 닉네임#KR1 형식으로 등록해주세요.",
    ))
}

/// Administrator override of a member's nickname.
pub async fn override_nickname(
    state: &SharedState,
    guild: GuildId,
    member: &str,
    nickname: &str,
) -> Result<ActionResponse, ServiceError> {
    let target = member_service::resolve(state, guild, member)?;
    state.nicknames().set(target.user_id, nickname)?;
    status_service::persist_nicknames(state).await;
    refresh_listing(state, target.user_id).await;

    Ok(ActionResponse::new(format!(
        "✅ {}님의 발로란트 닉네임을 `{}`(으)로 변경했습니다.",
        target.display_name,
        nickname.trim()
    )))
}

async fn withdraw_warning(state: &SharedState, user: UserId) {
    if let Some((_, (channel, message))) = state.pending_warnings().remove(&user) {
        reaction_service::delete_warning(state, channel, message).await;
    }
}

/// Nicknames appear in the status text: refresh the guilds that list `user`.
async fn refresh_listing(state: &SharedState, user: UserId) {
    for session in state.sessions() {
        let listed = session.lock().await.contains(user);
        if listed {
            status_service::refresh_display(state, &session).await;
        }
    }
}
