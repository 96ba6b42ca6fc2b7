//! Business logic behind the admin commands. Every roster change runs under the guild
//! lock through [`AppState::with_rotation`](crate::state::AppState::with_rotation) and
//! ends with one status refresh and one snapshot save.

use rand::{rng, seq::IndexedRandom};
use tracing::{info, warn};

use crate::{
    dto::admin::{
        ActionResponse, BackupResponse, CapacityResponse, ModeChangeResponse, PanelResponse,
        RandomMapResponse, RosterSummary, RotationResponse, SetupRequest, SetupResponse, ids,
    },
    error::ServiceError,
    services::{member_service, status_service},
    state::{
        SharedState,
        reactions::{PANEL_EMOJIS, PANEL_PROMPT, signup_emojis, signup_prompt},
        render::empty_status,
        roster::{ChannelId, GuildId, MessageId, MessageLinks, Roster, RoundCredit, SignupMode},
        rotation::RosterError,
        session::CommunitySession,
    },
};

const SIGNUP_OPENED: &str = "🟢 시참이 시작되었습니다!";
const SIGNUP_CLOSED: &str = "🔴 시참이 마감되었습니다!";

fn viewer_channel(links: &MessageLinks) -> Result<ChannelId, ServiceError> {
    links
        .viewer_channel
        .ok_or_else(|| ServiceError::InvalidState("⚠️ 뷰어 채널을 찾을 수 없습니다.".into()))
}

async fn delete_quietly(state: &SharedState, channel: ChannelId, message: MessageId) {
    if let Err(err) = state.gateway().delete_message(channel, message).await {
        if err.is_not_found() {
            info!(channel, message, "message already deleted");
        } else {
            warn!(channel, message, error = %err, "failed to delete message");
        }
    }
}

/// Post the signup prompt (with its reactions) and an empty status message in `channel`.
async fn post_signup_surfaces(
    state: &SharedState,
    channel: ChannelId,
    mode: SignupMode,
) -> Result<(MessageId, MessageId), ServiceError> {
    let gateway = state.gateway();
    let signup = gateway
        .send_message(channel, signup_prompt(mode).to_string(), None)
        .await?;
    let emojis = signup_emojis(mode).iter().map(|e| e.to_string()).collect();
    if let Err(err) = gateway.add_reactions(channel, signup, emojis).await {
        warn!(channel, message = signup, error = %err, "failed to seed signup reactions");
    }
    let status = gateway
        .send_message(channel, empty_status(&state.config().status_header), None)
        .await?;
    Ok((signup, status))
}

/// Start a fresh roster for `guild`: new signup prompt, new status message, empty lists,
/// signup closed. Only the admin panel link of a previous roster is kept.
pub async fn setup(
    state: &SharedState,
    guild: GuildId,
    request: SetupRequest,
) -> Result<SetupResponse, ServiceError> {
    let mode = SignupMode::from(request.mode);
    let channel = request.viewer_channel_id;
    let (signup, status) = post_signup_surfaces(state, channel, mode).await?;

    let mut links = state
        .find_session(guild)
        .map(|previous| {
            previous.clear_queue();
            previous.links()
        })
        .unwrap_or_default();
    links.viewer_channel = Some(channel);
    links.signup_message = Some(signup);
    links.status_message = Some(status);
    links.last_map_message = None;
    links.party_code = None;
    links.party_code_message = None;

    let capacity = state.config().capacity_for(mode);
    let session = state.install_session(guild, Roster::new(mode, capacity, links));
    info!(guild, ?mode, signup, status, "roster set up");
    status_service::refresh_and_persist(state, &session).await;

    Ok(SetupResponse {
        mode: mode.into(),
        signup_message_id: signup.to_string(),
        status_message_id: status.to_string(),
        capacity,
    })
}

/// Post the admin panel in `channel` and remember it.
pub async fn configure_panel(
    state: &SharedState,
    guild: GuildId,
    channel: ChannelId,
) -> Result<PanelResponse, ServiceError> {
    let session = state.session(guild)?;
    let gateway = state.gateway();
    let message = gateway
        .send_message(channel, PANEL_PROMPT.to_string(), None)
        .await?;
    let emojis = PANEL_EMOJIS.iter().map(|e| e.to_string()).collect();
    if let Err(err) = gateway.add_reactions(channel, message, emojis).await {
        warn!(channel, message, error = %err, "failed to seed panel reactions");
    }

    state
        .with_rotation(&session, |rotation| {
            let links = rotation.roster_mut().links_mut();
            links.admin_channel = Some(channel);
            links.admin_message = Some(message);
        })
        .await;
    status_service::persist(state).await;

    Ok(PanelResponse {
        admin_message_id: message.to_string(),
    })
}

/// Override the participant count for the current round.
pub async fn set_round_capacity(
    state: &SharedState,
    guild: GuildId,
    count: usize,
) -> Result<CapacityResponse, ServiceError> {
    let session = state.session(guild)?;
    let (change, capacity) = state
        .with_rotation(&session, |rotation| {
            (rotation.set_round_capacity(count), rotation.capacity())
        })
        .await;
    status_service::refresh_and_persist(state, &session).await;

    Ok(CapacityResponse::new(
        format!("✅ 이번 판 참가 최대 인원을 **{count}명**으로 설정하고, 명단을 재조정합니다!"),
        capacity,
        change,
    ))
}

/// Lock the participant count across rotations.
pub async fn lock_capacity(
    state: &SharedState,
    guild: GuildId,
    count: usize,
) -> Result<CapacityResponse, ServiceError> {
    let session = state.session(guild)?;
    let (change, capacity) = state
        .with_rotation(&session, |rotation| {
            (rotation.lock_capacity(count), rotation.capacity())
        })
        .await;
    status_service::refresh_and_persist(state, &session).await;

    Ok(CapacityResponse::new(
        format!("🔒 참가 인원을 **{count}명**으로 고정합니다. 로테 돌려도 계속 {count}명입니다!"),
        capacity,
        change,
    ))
}

/// Open or close reaction signups and announce it in the viewer channel.
pub async fn set_signup(
    state: &SharedState,
    guild: GuildId,
    open: bool,
) -> Result<ActionResponse, ServiceError> {
    let session = state.session(guild)?;
    let links = state
        .with_rotation(&session, |rotation| {
            rotation.roster_mut().set_signup_open(open);
            rotation.roster().links().clone()
        })
        .await;

    let notice = if open { SIGNUP_OPENED } else { SIGNUP_CLOSED };
    if let Some(channel) = links.viewer_channel {
        status_service::notify(state, channel, notice).await;
    }
    status_service::refresh_and_persist(state, &session).await;

    Ok(ActionResponse::new(notice))
}

/// Play one round.
pub async fn rotate(state: &SharedState, guild: GuildId) -> Result<RotationResponse, ServiceError> {
    let session = state.session(guild)?;
    let rotated = state.with_rotation(&session, |rotation| rotation.advance()).await;
    info!(
        guild,
        dropped = rotated.dropped.len(),
        promoted = rotated.promoted.len(),
        "rotation advanced"
    );
    status_service::refresh_and_persist(state, &session).await;
    Ok(rotated.into())
}

/// Revert the last rotation.
pub async fn undo(state: &SharedState, guild: GuildId) -> Result<ActionResponse, ServiceError> {
    let session = state.session(guild)?;
    state
        .with_rotation(&session, |rotation| rotation.undo())
        .await?;
    status_service::refresh_and_persist(state, &session).await;
    Ok(ActionResponse::new("✅ 직전 로테이션 상태로 되돌렸습니다!"))
}

async fn summarize(state: &SharedState, session: &CommunitySession) -> RosterSummary {
    let roster = session.lock().await;
    RosterSummary {
        mode: roster.mode().into(),
        text: status_service::render_text(state, session.guild_id(), &roster),
        participants: ids(roster.participants()),
        waitlist: ids(roster.waitlist()),
        capacity: roster.resolve_capacity(state.config().default_capacity),
        signup_open: roster.signup_open(),
        party_code: roster.links().party_code.clone(),
    }
}

/// Current roster and its rendered text.
pub async fn show(state: &SharedState, guild: GuildId) -> Result<RosterSummary, ServiceError> {
    let session = state.session(guild)?;
    Ok(summarize(state, &session).await)
}

/// Refresh the status message, then append the roster to the guild's backup log.
pub async fn backup_now(state: &SharedState, guild: GuildId) -> Result<BackupResponse, ServiceError> {
    let session = state.session(guild)?;
    status_service::refresh_and_persist(state, &session).await;
    let location = status_service::backup(state, &session).await?;
    Ok(BackupResponse {
        message: "✅ 백업이 누적 저장되었습니다.".into(),
        location,
    })
}

/// Empty the roster, delete the map announcement and strip user reactions from the
/// signup message.
pub async fn clear_all(state: &SharedState, guild: GuildId) -> Result<ActionResponse, ServiceError> {
    let session = state.session(guild)?;
    let (map_message, links) = state
        .with_rotation(&session, |rotation| {
            (rotation.clear(), rotation.roster().links().clone())
        })
        .await;

    if let Some(channel) = links.viewer_channel {
        if let Some(message) = map_message {
            delete_quietly(state, channel, message).await;
        }
        if let Some(signup) = links.signup_message {
            if let Err(err) = state.gateway().clear_reactions(channel, signup).await {
                warn!(guild, error = %err, "failed to clear signup reactions");
            }
        }
    }
    status_service::refresh_and_persist(state, &session).await;

    Ok(ActionResponse::new(
        "✅ 참가자/대기자 초기화 및 모든 유저 리액션 해제 완료!",
    ))
}

/// Move a waitlisted member into the participants.
pub async fn promote(
    state: &SharedState,
    guild: GuildId,
    member: &str,
    evict: Option<&str>,
    position: Option<usize>,
) -> Result<ActionResponse, ServiceError> {
    let session = state.session(guild)?;
    let target = member_service::resolve(state, guild, member)?;
    let evict = evict
        .map(|reference| member_service::resolve(state, guild, reference))
        .transpose()?;

    let (promotion, capacity) = state
        .with_rotation(&session, |rotation| {
            rotation
                .promote(
                    target.user_id,
                    evict.as_ref().map(|member| member.user_id),
                    position,
                )
                .map(|promotion| (promotion, rotation.capacity()))
        })
        .await
        .map_err(|err| match err {
            RosterError::NotWaitlisted(_) => ServiceError::NotFound(format!(
                "⚠️ {}님은 대기열에 없습니다.",
                target.display_name
            )),
            other => other.into(),
        })?;
    status_service::refresh_and_persist(state, &session).await;

    let message = match promotion.evicted {
        Some(evicted) => {
            let evicted = member_service::resolve(state, guild, &evicted.to_string())?;
            format!(
                "🔄 참가자가 이미 {capacity}명이라, **{}**님을 대기열 맨 앞으로 이동시키고\n✅ **{}**님을 참가자로 올렸습니다!",
                evicted.display_name, target.display_name
            )
        }
        None => format!("✅ {}님을 참가자로 올렸습니다!", target.display_name),
    };
    Ok(ActionResponse::new(message))
}

/// Send participants to the waitlist front.
pub async fn demote(
    state: &SharedState,
    guild: GuildId,
    members: &[String],
) -> Result<ActionResponse, ServiceError> {
    let session = state.session(guild)?;
    let resolved = members
        .iter()
        .map(|reference| member_service::resolve(state, guild, reference))
        .collect::<Result<Vec<_>, _>>()?;
    let users: Vec<_> = resolved.iter().map(|member| member.user_id).collect();

    let moved = state
        .with_rotation(&session, |rotation| rotation.demote_to_front(&users))
        .await;
    if moved.is_empty() {
        return Err(ServiceError::NotFound(
            "⚠️ 참가자 명단에 해당 유저가 없습니다.".into(),
        ));
    }
    status_service::refresh_and_persist(state, &session).await;

    let names: Vec<_> = resolved
        .iter()
        .filter(|member| moved.contains(&member.user_id))
        .map(|member| member.display_name.as_str())
        .collect();
    Ok(ActionResponse::new(format!(
        "✅ {}님을 대기열 맨 앞으로 이동!",
        names.join(", ")
    )))
}

/// Put a member at a waitlist position, demoting them first when they hold a slot.
pub async fn queue_position(
    state: &SharedState,
    guild: GuildId,
    member: &str,
    position: usize,
) -> Result<ActionResponse, ServiceError> {
    let session = state.session(guild)?;
    let target = member_service::resolve(state, guild, member)?;

    let demotion = state
        .with_rotation(&session, |rotation| rotation.demote(target.user_id, position))
        .await
        .map_err(|err| match err {
            RosterError::NotListed(_) => ServiceError::NotFound(format!(
                "⚠️ {}님은 참가자/대기열에 없습니다.",
                target.display_name
            )),
            other => other.into(),
        })?;
    status_service::refresh_and_persist(state, &session).await;

    let promoted: String = demotion
        .promoted
        .iter()
        .map(|user| format!("🔼 <@{user}>님을 참가자로 올리고, "))
        .collect();
    Ok(ActionResponse::new(format!(
        "{promoted}✅ {}님을 대기열 {}번째로 이동시켰습니다.",
        target.display_name, demotion.position
    )))
}

/// Remove a member from the roster and backfill their slot.
pub async fn delete_participant(
    state: &SharedState,
    guild: GuildId,
    member: &str,
) -> Result<ActionResponse, ServiceError> {
    let session = state.session(guild)?;
    let target = member_service::resolve(state, guild, member)?;

    state
        .with_rotation(&session, |rotation| rotation.delete(target.user_id))
        .await
        .map_err(|err| match err {
            RosterError::NotListed(_) => ServiceError::NotFound(format!(
                "⚠️ {}님은 명단에 없습니다.",
                target.display_name
            )),
            other => other.into(),
        })?;
    status_service::refresh_and_persist(state, &session).await;
    Ok(ActionResponse::new("✅ 삭제 완료"))
}

/// Overwrite the remaining rounds of a listed member.
pub async fn set_round_credit(
    state: &SharedState,
    guild: GuildId,
    member: &str,
    credit: RoundCredit,
) -> Result<ActionResponse, ServiceError> {
    let session = state.session(guild)?;
    let target = member_service::resolve(state, guild, member)?;

    state
        .with_rotation(&session, |rotation| {
            rotation.set_round_credit(target.user_id, credit)
        })
        .await
        .map_err(|err| match err {
            RosterError::NotListed(_) => ServiceError::NotFound(format!(
                "⚠️ {}님은 명단에 없습니다.",
                target.display_name
            )),
            other => other.into(),
        })?;
    status_service::refresh_and_persist(state, &session).await;

    let label = match credit {
        RoundCredit::Fixed => "고정".to_string(),
        RoundCredit::Finite(rounds) => format!("{rounds}판"),
    };
    Ok(ActionResponse::new(format!(
        "✅ {}님의 판수를 **{label}**으로 설정했습니다.",
        target.display_name
    )))
}

/// Add a member with one round, bypassing the signup gate. Requires a registered nickname.
pub async fn add_participant(
    state: &SharedState,
    guild: GuildId,
    member: &str,
) -> Result<RosterSummary, ServiceError> {
    let session = state.session(guild)?;
    let target = member_service::resolve(state, guild, member)?;
    if !state.nicknames().is_registered(target.user_id) {
        return Err(ServiceError::InvalidState(format!(
            "❌ {} 님은 발로란트 닉네임이 등록되어 있지 않습니다.",
            target.display_name
        )));
    }

    state
        .with_rotation(&session, |rotation| rotation.admin_add(target.user_id))
        .await?;
    status_service::refresh_and_persist(state, &session).await;
    Ok(summarize(state, &session).await)
}

/// Switch between the registration and simple modes: new signup surfaces, emptied lists,
/// signup reopened, pending reactions discarded.
pub async fn change_mode(
    state: &SharedState,
    guild: GuildId,
) -> Result<ModeChangeResponse, ServiceError> {
    let session = state.session(guild)?;
    let (links, current) = {
        let roster = session.lock().await;
        (roster.links().clone(), roster.mode())
    };
    let channel = viewer_channel(&links)?;

    for message in [links.signup_message, links.status_message]
        .into_iter()
        .flatten()
    {
        delete_quietly(state, channel, message).await;
    }

    let next = current.toggled();
    let (signup, status) = post_signup_surfaces(state, channel, next).await?;
    let capacity = state.config().capacity_for(next);

    let discarded = state
        .with_rotation(&session, |rotation| {
            let replacement = rotation
                .roster()
                .for_mode_change(next, capacity, signup, status);
            *rotation.roster_mut() = replacement;
            session.clear_queue()
        })
        .await;
    info!(guild, mode = ?next, discarded, "signup mode changed");
    status_service::refresh_and_persist(state, &session).await;

    let message = match next {
        SignupMode::Simple => "🔄 **등록 모드 → 일반시참 모드**로 변경되었습니다.",
        SignupMode::Registration => "🔄 **일반시참 → 등록(티어) 모드**로 변경되었습니다.",
    };
    Ok(ModeChangeResponse {
        message: format!("{message} (🟢 시참 자동 오픈, 기존 명단 초기화됨)"),
        mode: next.into(),
        discarded_events: discarded,
    })
}

/// Announce a random map in the viewer channel, replacing the previous announcement.
pub async fn random_map(state: &SharedState, guild: GuildId) -> Result<RandomMapResponse, ServiceError> {
    let session = state.session(guild)?;
    let map = state
        .config()
        .maps
        .choose(&mut rng())
        .cloned()
        .ok_or_else(|| ServiceError::InvalidState("no maps configured".into()))?;

    let links = session.links();
    let channel = viewer_channel(&links)?;
    if let Some(previous) = links.last_map_message {
        delete_quietly(state, channel, previous).await;
    }

    let message = state
        .gateway()
        .send_message(channel, format!("🎲 이번 내전 맵은 **{map}**!"), None)
        .await?;
    state
        .with_rotation(&session, |rotation| {
            rotation.roster_mut().links_mut().last_map_message = Some(message);
        })
        .await;
    status_service::persist(state).await;

    info!(guild, map = %map, "random map announced");
    Ok(RandomMapResponse {
        map,
        message_id: message.to_string(),
    })
}

/// Show a party code under the signup message, replacing the previous one.
pub async fn party_code(
    state: &SharedState,
    guild: GuildId,
    code: &str,
) -> Result<ActionResponse, ServiceError> {
    let session = state.find_session(guild).ok_or_else(|| {
        ServiceError::NotFound("❌ 먼저 !등록 또는 !일반시참을 실행하세요.".into())
    })?;
    let code = code.trim().to_string();
    let links = session.links();
    let channel = viewer_channel(&links)?;
    if let Some(previous) = links.party_code_message {
        delete_quietly(state, channel, previous).await;
    }

    let message = state
        .gateway()
        .send_message(channel, format!("# (파티코드: {code})"), None)
        .await?;
    state
        .with_rotation(&session, |rotation| {
            let links = rotation.roster_mut().links_mut();
            links.party_code = Some(code);
            links.party_code_message = Some(message);
        })
        .await;
    status_service::persist(state).await;

    Ok(ActionResponse::new(
        "✅ 파티코드가 시작버튼 아래에 표시되었습니다!",
    ))
}
