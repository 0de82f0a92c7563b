//! Chat for matched applications: persistence, unread bookkeeping, and fan-out.
//!
//! Rooms are created only by the lifecycle engine on mutual acceptance. Everything here operates
//! on existing rooms and reports `NotFound` otherwise.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use chrono::Utc;
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

use super::domain::{Caller, ChatRoomId, NewMessage, RoomParticipants};
use super::error::MarketplaceError;
use super::lifecycle::participants_of;
use super::repository::{MarketplaceRepository, Transaction};
use super::views::{ChatPartnerView, MessageView, SentMessage, UnreadCountView};

/// Outbound fan-out seam for stored messages.
pub trait ChatPublisher: Send + Sync {
    fn publish(&self, room: ChatRoomId, message: &MessageView) -> Result<(), PublishError>;

    /// Called once a room has been purged from the store.
    fn close(&self, _room: ChatRoomId) {}
}

#[derive(Debug, thiserror::Error)]
pub enum PublishError {
    #[error("chat channel {channel} unavailable: {reason}")]
    Channel { channel: String, reason: String },
}

/// Subscription topic for a room.
pub fn channel_name(room: ChatRoomId) -> String {
    format!("room:{room}")
}

/// One broadcast channel per room, created on first subscription.
#[derive(Debug)]
pub struct ChatHub {
    capacity: usize,
    channels: Mutex<HashMap<ChatRoomId, broadcast::Sender<MessageView>>>,
}

impl ChatHub {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            channels: Mutex::new(HashMap::new()),
        }
    }

    pub fn subscribe(
        &self,
        room: ChatRoomId,
    ) -> Result<broadcast::Receiver<MessageView>, PublishError> {
        let mut channels = self.channels.lock().map_err(|_| poisoned(room))?;
        let sender = channels
            .entry(room)
            .or_insert_with(|| broadcast::channel(self.capacity).0);
        Ok(sender.subscribe())
    }

    pub fn subscriber_count(&self, room: ChatRoomId) -> usize {
        self.channels
            .lock()
            .ok()
            .and_then(|channels| channels.get(&room).map(broadcast::Sender::receiver_count))
            .unwrap_or(0)
    }
}

impl ChatPublisher for ChatHub {
    fn publish(&self, room: ChatRoomId, message: &MessageView) -> Result<(), PublishError> {
        let mut channels = self.channels.lock().map_err(|_| poisoned(room))?;
        let Some(sender) = channels.get(&room) else {
            return Ok(());
        };

        match sender.send(message.clone()) {
            Ok(delivered) => {
                debug!(channel = %channel_name(room), delivered, "chat message fanned out");
            }
            Err(_) => {
                // every receiver is gone; drop the channel until someone subscribes again
                channels.remove(&room);
            }
        }
        Ok(())
    }

    fn close(&self, room: ChatRoomId) {
        // dropping the sender ends every open feed with `RecvError::Closed`
        match self.channels.lock() {
            Ok(mut channels) => {
                if channels.remove(&room).is_some() {
                    debug!(channel = %channel_name(room), "chat channel closed");
                }
            }
            Err(_) => warn!(channel = %channel_name(room), "chat channel registry poisoned"),
        }
    }
}

fn poisoned(room: ChatRoomId) -> PublishError {
    PublishError::Channel {
        channel: channel_name(room),
        reason: "channel registry mutex poisoned".to_string(),
    }
}

/// Chat channel manager bound to the rooms the lifecycle engine creates.
pub struct ChatChannelManager<R, P> {
    repository: Arc<R>,
    publisher: Arc<P>,
}

impl<R, P> ChatChannelManager<R, P>
where
    R: MarketplaceRepository + 'static,
    P: ChatPublisher + 'static,
{
    pub fn new(repository: Arc<R>, publisher: Arc<P>) -> Self {
        Self {
            repository,
            publisher,
        }
    }

    /// Persist a message from the caller to the other participant, then publish it.
    ///
    /// The stored message is returned even when fan-out fails; `delivered` reports whether the
    /// publisher accepted it. Resending would store a second copy.
    pub fn send(
        &self,
        caller: Caller,
        room: ChatRoomId,
        content: impl Into<String>,
    ) -> Result<SentMessage, MarketplaceError> {
        let content = content.into();

        let view = self.repository.atomically(|tx| -> Result<_, MarketplaceError> {
            let participants = room_participants(tx, room)?;
            let receiver = participants
                .counterpart(caller.user_id)
                .ok_or_else(|| not_a_participant(caller, room))?;

            // sent_at never goes backwards inside a room, even if the wall clock does
            let now = Utc::now();
            let sent_at = match tx.messages_in_room(room)?.last() {
                Some(latest) if latest.sent_at > now => latest.sent_at,
                _ => now,
            };

            let stored = tx.insert_message(NewMessage {
                chat_room_id: room,
                sender_id: caller.user_id,
                receiver_id: receiver,
                content,
                sent_at,
            })?;
            Ok(MessageView::from(&stored))
        })?;

        let delivered = match self.publisher.publish(room, &view) {
            Ok(()) => true,
            Err(err) => {
                warn!(
                    channel = %channel_name(room),
                    message_id = %view.id,
                    error = %err,
                    "chat publish failed, message kept"
                );
                false
            }
        };

        info!(chat_room_id = %room, message_id = %view.id, delivered, "chat message sent");
        Ok(SentMessage {
            message: view,
            delivered,
        })
    }

    /// All messages of the room, oldest first.
    pub fn history(
        &self,
        caller: Caller,
        room: ChatRoomId,
    ) -> Result<Vec<MessageView>, MarketplaceError> {
        self.repository.atomically(|tx| -> Result<_, MarketplaceError> {
            ensure_participant(tx, caller, room)?;
            let messages = tx.messages_in_room(room)?;
            Ok(messages.iter().map(MessageView::from).collect())
        })
    }

    pub fn unread_count(
        &self,
        caller: Caller,
        room: ChatRoomId,
    ) -> Result<UnreadCountView, MarketplaceError> {
        self.repository.atomically(|tx| -> Result<_, MarketplaceError> {
            ensure_participant(tx, caller, room)?;
            let unread = tx
                .messages_in_room(room)?
                .iter()
                .filter(|message| message.receiver_id == caller.user_id && !message.read)
                .count();
            Ok(UnreadCountView { room_id: room, unread })
        })
    }

    /// Flip every currently unread message addressed to the caller. Returns how many flipped.
    pub fn mark_read(&self, caller: Caller, room: ChatRoomId) -> Result<usize, MarketplaceError> {
        let flipped = self.repository.atomically(|tx| -> Result<_, MarketplaceError> {
            ensure_participant(tx, caller, room)?;
            Ok(tx.mark_read(room, caller.user_id)?)
        })?;
        debug!(chat_room_id = %room, reader = %caller.user_id, flipped, "chat messages read");
        Ok(flipped)
    }

    /// Display name of the other participant.
    pub fn chat_partner(
        &self,
        caller: Caller,
        room: ChatRoomId,
    ) -> Result<ChatPartnerView, MarketplaceError> {
        self.repository.atomically(|tx| -> Result<_, MarketplaceError> {
            let participants = ensure_participant(tx, caller, room)?;
            let partner = participants
                .counterpart(caller.user_id)
                .ok_or_else(|| not_a_participant(caller, room))?;
            let name = match tx.find_user(partner)? {
                Some(user) => user.full_name,
                None if partner == participants.provider => "Provider".to_string(),
                None => "Unknown user".to_string(),
            };
            Ok(ChatPartnerView { name })
        })
    }
}

impl<R> ChatChannelManager<R, ChatHub>
where
    R: MarketplaceRepository + 'static,
{
    /// Live feed of `room:{id}` for one of its participants.
    pub fn subscribe(
        &self,
        caller: Caller,
        room: ChatRoomId,
    ) -> Result<broadcast::Receiver<MessageView>, MarketplaceError> {
        self.repository
            .atomically(|tx| ensure_participant(tx, caller, room))?;
        Ok(self.publisher.subscribe(room)?)
    }
}

fn room_participants(
    tx: &dyn Transaction,
    room: ChatRoomId,
) -> Result<RoomParticipants, MarketplaceError> {
    tx.find_chat_room(room)?
        .ok_or_else(|| MarketplaceError::not_found("chat room", room))?;
    let application = tx
        .find_application_by_room(room)?
        .ok_or_else(|| MarketplaceError::not_found("application for chat room", room))?;
    participants_of(tx, &application)
}

fn ensure_participant(
    tx: &dyn Transaction,
    caller: Caller,
    room: ChatRoomId,
) -> Result<RoomParticipants, MarketplaceError> {
    let participants = room_participants(tx, room)?;
    if participants.includes(caller.user_id) {
        Ok(participants)
    } else {
        Err(not_a_participant(caller, room))
    }
}

fn not_a_participant(caller: Caller, room: ChatRoomId) -> MarketplaceError {
    MarketplaceError::unauthorized(format!(
        "user {} is not a participant of chat room {room}",
        caller.user_id
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::marketplace::domain::{MessageId, UserId};

    fn message(room: ChatRoomId) -> MessageView {
        MessageView {
            id: MessageId(1),
            room_id: room,
            sender_id: UserId(1),
            receiver_id: UserId(2),
            content: "hi".to_string(),
            sent_at: Utc::now(),
            read: false,
        }
    }

    #[test]
    fn publish_without_subscribers_is_not_an_error() {
        let hub = ChatHub::new(4);
        hub.publish(ChatRoomId(9), &message(ChatRoomId(9)))
            .expect("publish succeeds");
        assert_eq!(hub.subscriber_count(ChatRoomId(9)), 0);
    }

    #[tokio::test]
    async fn subscribers_receive_only_their_room() {
        let hub = ChatHub::new(4);
        let mut first = hub.subscribe(ChatRoomId(1)).expect("subscribe");
        let mut second = hub.subscribe(ChatRoomId(2)).expect("subscribe");

        hub.publish(ChatRoomId(1), &message(ChatRoomId(1)))
            .expect("publish");

        let received = first.recv().await.expect("message delivered");
        assert_eq!(received.room_id, ChatRoomId(1));
        assert!(matches!(
            second.try_recv(),
            Err(broadcast::error::TryRecvError::Empty)
        ));
    }

    #[test]
    fn channel_is_dropped_once_receivers_leave() {
        let hub = ChatHub::new(4);
        let receiver = hub.subscribe(ChatRoomId(3)).expect("subscribe");
        assert_eq!(hub.subscriber_count(ChatRoomId(3)), 1);
        drop(receiver);

        hub.publish(ChatRoomId(3), &message(ChatRoomId(3)))
            .expect("publish");
        assert_eq!(hub.subscriber_count(ChatRoomId(3)), 0);
    }

    #[tokio::test]
    async fn closing_a_room_ends_open_feeds() {
        let hub = ChatHub::new(4);
        let mut feed = hub.subscribe(ChatRoomId(5)).expect("subscribe");
        assert_eq!(hub.subscriber_count(ChatRoomId(5)), 1);

        hub.close(ChatRoomId(5));

        assert_eq!(hub.subscriber_count(ChatRoomId(5)), 0);
        assert!(matches!(
            feed.recv().await,
            Err(broadcast::error::RecvError::Closed)
        ));
    }

    #[test]
    fn channel_names_are_room_scoped() {
        assert_eq!(channel_name(ChatRoomId(17)), "room:17");
    }
}
