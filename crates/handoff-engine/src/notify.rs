// SPDX-FileCopyrightText: 2026 Handoff Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! User- and professional-facing notification texts.

use handoff_core::types::{Notification, NotificationKind, Session};

fn to_user(session: &Session, kind: NotificationKind, text: String) -> Notification {
    Notification {
        conversation_id: session.conversation_id.clone(),
        recipient_id: session.user_id.clone(),
        kind,
        text,
        session_id: Some(session.id.clone()),
    }
}

pub(crate) fn professional_joined(
    session: &Session,
    professional_name: &str,
    role_name: &str,
) -> Notification {
    to_user(
        session,
        NotificationKind::ProfessionalJoined,
        format!(
            "{professional_name} ({role_name}) has joined the conversation. \
             The assistant will stay on as an observer."
        ),
    )
}

pub(crate) fn requesting_new_professional(session: &Session) -> Notification {
    to_user(
        session,
        NotificationKind::RequestingNewProfessional,
        "We're requesting a different professional for you. \
         You'll be notified as soon as they join."
            .to_string(),
    )
}

pub(crate) fn no_professional_available(session: &Session) -> Notification {
    to_user(
        session,
        NotificationKind::NoProfessionalAvailable,
        "No professional is available right now. \
         The assistant will keep helping in the meantime."
            .to_string(),
    )
}

pub(crate) fn session_ended(session: &Session, reason: Option<&str>) -> Notification {
    let text = match reason {
        Some(reason) => format!("Your session with the professional has ended ({reason})."),
        None => "Your session with the professional has ended.".to_string(),
    };
    to_user(session, NotificationKind::SessionEnded, text)
}

pub(crate) fn can_request_again(session: &Session) -> Notification {
    to_user(
        session,
        NotificationKind::CanRequestAgain,
        "You can ask for a professional again at any time.".to_string(),
    )
}

pub(crate) fn confirmation_requested(session: &Session, candidates: &[String]) -> Notification {
    let text = match candidates {
        [single] => format!("{single} can take over your conversation. Do you want to switch?"),
        many => format!(
            "{} professionals can take over your conversation ({}). Do you want to switch?",
            many.len(),
            many.join(", ")
        ),
    };
    to_user(session, NotificationKind::EscalationConfirmationRequested, text)
}

/// Offer sent to a professional under the broadcast strategy.
pub(crate) fn escalation_offered(
    session: &Session,
    professional_id: &str,
    role_name: &str,
) -> Notification {
    Notification {
        conversation_id: session.conversation_id.clone(),
        recipient_id: professional_id.to_string(),
        kind: NotificationKind::EscalationOffered,
        text: format!(
            "A conversation needs a {role_name}. The first professional to accept takes it over."
        ),
        session_id: Some(session.id.clone()),
    }
}
