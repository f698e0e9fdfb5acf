//! Chat routing and cross-team anonymization. TEAM messages stay inside
//! the sender's team; GENERAL messages reach all ten, but each viewer sees
//! opponents as "Player 01".."Player 05" until the match completes.

use crate::player::PlayerId;
use crate::session::messages::ChatChannel;
use crate::team::Cohort;

/// Who receives a message on the given channel.
pub fn chat_recipients(cohort: &Cohort, sender: PlayerId, channel: ChatChannel) -> Vec<PlayerId> {
    match channel {
        ChatChannel::Team => match cohort.side_of(sender) {
            Some(side) => cohort
                .team(side)
                .iter()
                .map(|p| p.player_id)
                .collect(),
            None => Vec::new(),
        },
        ChatChannel::General => cohort.player_ids(),
    }
}

/// The sender name a particular viewer sees. Teammates see the real name;
/// opponents see a positional alias.
pub fn sender_name_for(cohort: &Cohort, sender: PlayerId, viewer: PlayerId) -> String {
    let sender_player = match cohort.get(sender) {
        Some(p) => p,
        None => return String::from("Player ??"),
    };
    let same_team = cohort.side_of(viewer) == Some(sender_player.team);
    if same_team {
        return sender_player.display_name.clone();
    }
    let position = cohort
        .team(sender_player.team)
        .iter()
        .position(|p| p.player_id == sender)
        .unwrap_or(0);
    format!("Player {:02}", position + 1)
}
